pub mod entity;
pub mod profile;

pub use entity::{EntityId, EntityView};
pub use profile::{ProfileRange, ProfileRecord};
