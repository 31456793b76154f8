//! Software rasterizer with a programmable vertex/fragment pipeline, z-buffering and shadow
//! mapping. `Renderer` ties the pieces together: a depth pass from the light, then a shaded pass
//! from the eye that looks fragments up in the light's depth buffer.

pub mod buffer;
pub mod camera;
pub mod framebuffer;
pub mod geometry;
pub mod gl;
pub mod logging;
pub mod model;
pub mod raster;
pub mod renderer;
pub mod shader;
