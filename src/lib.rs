//! mapsim: entity, trigger and ray-query simulation for map runtimes
//!
//! - [`math`]: vectors, quaternions, bounding boxes
//! - [`game`]: entities, scene, events, triggers, traces, frame driver
//! - [`world`]: map file loading and saving
//! - [`config`]: tuning values

pub mod config;
pub mod error;
pub mod game;
pub mod logging;
pub mod math;
pub mod world;

pub use config::SimConfig;
pub use error::ConfigError;
