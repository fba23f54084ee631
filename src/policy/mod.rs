pub mod filename_policy;

pub use filename_policy::{BlacklistPolicy, FilenamePolicy};
