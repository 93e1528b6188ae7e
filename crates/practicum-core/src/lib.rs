//! Functional core of the practicum sync layer: entity types, collection
//! snapshots, filter keys and the visit-log lifecycle. Nothing in here does I/O.

pub mod entity;
pub mod error;
pub mod filter;
pub mod ids;
pub mod model;
pub mod normalize;
pub mod snapshot;
pub mod types;
pub mod visit;

pub use entity::*;
pub use error::*;
pub use filter::*;
pub use ids::*;
pub use model::*;
pub use normalize::*;
pub use snapshot::*;
pub use types::*;
pub use visit::*;
