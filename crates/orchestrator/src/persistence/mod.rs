#![forbid(unsafe_code)]

mod atomic;
mod json;
mod repo;

pub use atomic::write_atomic;
pub use json::JsonRepository;
pub use repo::{MemoryRepository, StateRepository};
