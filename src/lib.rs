//! Software rasterizer: a small CPU pipeline that turns triangle meshes into an RGB frame.

pub mod config;
pub mod error;
pub mod scene;

pub use config::RenderConfig;
pub use error::{LoadError, RenderError};
pub use scene::{FrameStats, Scene};
