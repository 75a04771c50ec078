pub mod binding;
pub mod layout;
pub mod state_cache;
pub mod thread;

pub use binding::{RegisterClass, ResourceBindingInfo, ResourceSlots};
pub use layout::{
    BindableResource, ResourceLayout, ResourceLayoutDescription, ResourceLayoutElementDescription,
    ResourceLayoutElementOptions, ResourceSet, ResourceSetDescription,
};
pub use state_cache::{PipelineStateCache, PipelineStates, StateCache, StateFactory};
pub use thread::{Completion, ExecutionThread, Submission};
