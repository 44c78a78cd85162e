// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Colors and skeleton tables used to draw poses.

/// Color definitions.
pub mod color;

/// Landmark names and connection topologies.
pub mod skeleton;

pub use color::Color;
