/// Core functionality modules
///
/// Recording work items and the store traits the engine reads through.

pub mod recorder;
pub mod store;

pub use recorder::Recorder;
pub use store::{ActivityLogStore, History, WorkItemStore};
