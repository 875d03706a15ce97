pub mod config;
pub mod error;
pub mod probe;
pub mod registry;
pub mod store;
pub mod stream;

pub use error::{Error, Result};

// Re-export main components for easier use
pub use registry::models::{Camera, CameraForm, CameraPatch, CameraStatus, Protocol, Snapshot};
pub use registry::{CameraRegistry, SnapshotRegistry};
pub use store::{FileStore, FsKeyValueStore, KeyValueStore, LocalFileStore, MemoryKeyValueStore};
pub use stream::{MediaPlayer, PlayerEvent, StreamSession, StreamState};
