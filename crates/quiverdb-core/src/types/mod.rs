//! Core data types.

mod element;
mod graph;
mod id;
mod value;

pub use element::{Direction, ElementType};
pub use graph::{Edge, Vertex};
pub use id::{Id, IdKind};
pub use value::Value;
