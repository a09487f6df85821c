// Cache management module
// Author: kelexine (https://github.com/kelexine)

pub mod checksum;
pub mod directory;
pub mod manager;
pub mod models;

pub use checksum::checksum;
pub use directory::CacheDirectory;
pub use manager::{CacheManager, GRACE_WINDOW_SECS};
pub use models::CacheEntry;
