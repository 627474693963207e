//! Cache Module
//!
//! Listings/search cache with versioned entries, FIFO eviction and
//! change-event driven incremental updates.

pub mod clock;
mod entry;
pub mod events;
mod fifo;
mod listings;
mod lock;
pub mod payload;
mod stats;
mod store;
pub mod updater;
pub mod version;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, CacheMetadata, Namespace};
pub use events::{ChangeEvent, ChangeEventLog, ChangeKind, LoggedEvent};
pub use fifo::FifoTracker;
pub use listings::ListingsCache;
pub use payload::{
    CachePayload, ItemSummary, ListingsPayload, SearchPayload, NEWEST_CAPACITY, POPULAR_CAPACITY,
};
pub use stats::CacheStats;
pub use store::CacheStore;
pub use version::Version;
