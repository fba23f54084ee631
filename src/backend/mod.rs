pub mod command;
pub mod dispatch;
pub mod rar_archive;
pub mod sevenzip;
pub mod zip_archive;

pub use command::{SuccessCheck, ToolOutput, ToolRunner};
pub use dispatch::{ArchiveType, ExtractionDispatcher, ExtractionOutcome, OutcomeCode};
