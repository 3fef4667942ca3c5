mod cache;
mod client;

pub use cache::{CachedSource, TaskCache};
pub use client::{Endpoints, MozillaClient, PushEntry};
