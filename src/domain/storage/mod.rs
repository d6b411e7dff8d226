//! Storage domain - Generic storage abstraction layer

mod entity;
mod repository;

pub use entity::{ListOptions, StorageEntity, StorageKey};
pub use repository::{merge_patch, Storage};
