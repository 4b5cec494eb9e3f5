// PixelGL
// copyright zipxing@hotmail.com 2022~2024

//! PixelGL is the graphics core of a small game engine: it owns the render
//! surface and the OpenGL context, keeps thread-safe queues of everything
//! that draws or lives on the GPU, and renders one frame per tick.
//!
//! The split follows the threading contract. [`render::manager::GraphicsManager`]
//! stays on the rendering thread and is the only place GPU state is touched.
//! Its cloneable [`render::manager::GfxHandle`] goes everywhere else: worker
//! threads register resources, hand over dead GPU handles for deferred
//! deletion, and request surface changes over a blocking channel that the
//! rendering thread serves between frames.
//!
//! Surface changes that invalidate the GL context (multisampling, screen
//! size, fullscreen) run a fixed destroy / reconfigure / rebuild protocol
//! over every queued resource, so textures and draw-list containers survive
//! a context loss without their owners noticing.

/// initial graphics settings, loadable from toml
pub mod config;

/// crate-wide error type
pub mod error;

/// frames-per-second accounting
pub mod fps;

/// log
pub mod log;

/// Render module: adapters, queues, the manager and the frame loop
pub mod render;

pub use config::GfxConfig;
pub use error::GfxError;
pub use render::adapter::{Adapter, AdapterCaps, DisplayMode};
pub use render::manager::{GfxHandle, GraphicsManager};
pub use render::queue::{Membership, RenderQueue};
pub use render::renderable::{GpuQueueable, RenderPass, Renderable, Video};
pub use render::transform::{Projection, Transform};
