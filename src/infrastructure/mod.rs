// Infrastructure module - Background task handling and retry policy
pub mod backoff;
pub mod task_manager;

pub use backoff::ReconnectPolicy;
pub use task_manager::TaskManager;
