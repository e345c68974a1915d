//! shove: kinematic 2D AABB collision world (uniform-grid broadphase,
//! continuous narrowphase, touch/cross/slide/bounce resolution)

pub mod api;
pub mod grid;
pub mod narrowphase;
pub mod types;
pub mod world;

pub use crate::api::*;
pub use crate::narrowphase::Narrowphase;
pub use crate::types::*;
pub use crate::world::{World, BOUNCE, CROSS, SLIDE, TOUCH};
