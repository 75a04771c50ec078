pub mod handle;
pub mod resource_list;
pub mod staging_pool;

pub use handle::Tracked;
pub use resource_list::{ResourceList, TrackedKind, TrackedObject};
pub use staging_pool::{SharedStagingPool, StagingBlock, StagingMemoryPool};
