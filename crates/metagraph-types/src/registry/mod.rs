//! Type registry: batch registration, inheritance resolution and snapshots.

mod batch;
#[allow(clippy::module_inception)]
mod registry;
pub mod resolver;
mod snapshot;
mod store;

pub use registry::TypeRegistry;
pub use snapshot::{ResolvedTypes, TypeSnapshot};
pub use store::{TypeBatch, TypeStore};
