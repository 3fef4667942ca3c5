mod model;
mod regression;
mod source;
mod summary;
mod task;

#[cfg(test)]
pub mod testing;

pub use model::{Push, DEFAULT_MAX_DEPTH};
pub use regression::RegressionDistance;
pub use source::{CiSource, PushMetadata};
pub use summary::Status;
