mod files;
mod kv;

pub use files::{FileStore, LocalFileStore};
pub use kv::{FsKeyValueStore, KeyValueStore, MemoryKeyValueStore};
