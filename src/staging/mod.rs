pub mod staging_manager;

pub use staging_manager::{staging_dir_name, StagingArea, StagingManager};
