//! Map persistence and built-in maps

mod demo;
mod map;

pub use demo::demo_map;
pub use map::*;
