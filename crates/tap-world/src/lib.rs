//! In-memory world state: a spatial store of decoded columns, tracked
//! entities and their link relations, plus the distance-bounded
//! projection used to hand a working set to a consumer.

mod entity;
mod project;
mod store;

pub use entity::Entity;
pub use project::project;
pub use store::{LinkOp, MapState, WorldStore};
