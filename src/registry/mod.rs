pub mod cameras;
pub mod models;
pub mod snapshots;

pub use cameras::CameraRegistry;
pub use snapshots::SnapshotRegistry;
