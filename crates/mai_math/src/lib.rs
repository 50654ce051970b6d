// Re-export glam for convenience
pub use glam::*;

// Scene math types
mod bounds;
mod color;
pub use bounds::Bounds;
pub use color::Color;
