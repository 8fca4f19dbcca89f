pub mod manager;
pub mod snapshot;
pub mod store;

pub use manager::{BackgroundRefresh, CacheManager, RefreshReport};
pub use snapshot::{load, save, Loaded};
pub use store::CommitCache;
