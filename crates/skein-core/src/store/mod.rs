pub mod action_table;
pub mod capability_store;
pub mod kv;
pub mod preview_cache;
pub mod search_store;
pub mod timeline;

pub use action_table::ActionStateTable;
pub use capability_store::CapabilityStore;
pub use kv::{FileKvStore, KvStore, MemoryKvStore, StorageError};
pub use preview_cache::{MemoryPreviewCache, PreviewCache, PreviewMetadata};
pub use search_store::SavedSearchStore;
pub use timeline::{EntryKind, ScrollInstruction, TimelineEntry, TimelineState};
