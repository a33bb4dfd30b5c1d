//! Commonly used utilities like handles, pools and timestamps.

#[macro_use]
pub mod handle;
pub mod hash;
pub mod pool;
pub mod time;

pub mod prelude {
    pub use super::handle::{Handle, HandleIndex, HandleLike};
    pub use super::hash::{hash64, FastHashMap, FastHashSet};
    pub use super::pool::{HandlePool, ObjectPool};
    pub use super::time::Timestamp;
}
