pub mod local;
pub mod rescan;
pub mod resolver;
pub mod service;

pub use local::LocalStorage;
pub use rescan::FilesystemRescanner;
pub use resolver::StoragePathResolver;
pub use service::{
    join_cloud_path, normalize_cloud_path, Node, NodeKind, NodeLocation, RequestContext,
    ResolvedPath, Rescanner, ScanSummary, StorageService,
};
