pub mod post_extract;

pub use post_extract::{IntegrationPlan, IntegrationReport, OwnershipContext, PostExtractIntegrator};
