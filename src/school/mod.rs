//! Client for the teacher endpoints of the school service.

mod api_types;
mod cache;
mod cached_client;
mod client;
mod error;
mod types;

#[cfg(test)]
pub mod testing;

pub use cached_client::CachedCollection;
pub use client::{HttpCollection, RemoteCollection, Resource};
pub use error::Operation;
pub use types::{PhotoRef, PhotoUpload, Teacher, TeacherPayload};
