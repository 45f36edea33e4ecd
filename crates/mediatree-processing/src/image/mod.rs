//! Image geometry used by the image provider.

pub mod resize;

pub use resize::{ImageResize, TargetBox};
