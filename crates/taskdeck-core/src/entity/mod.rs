//! Entity domain module.
//!
//! - `model`: `EntityKind`, `EntityId` and the `Entity` trait
//! - `identity`: temporary id allocation (`IdentityAllocator`)

mod identity;
mod model;

pub use identity::{IdentityAllocator, TEMP_ID_PREFIX};
pub use model::{Entity, EntityId, EntityKind};
