// PixelGL
// copyright zipxing@hotmail.com 2022~2024

//! Implements an Adapter trait. All windowing backend and low-level OpenGL
//! processing is reached through it: surface acquisition, mode changes,
//! fixed frame state, buffer swaps and deferred handle deletion.
//!
//! The adapter stays on the rendering thread for its whole life; it is the
//! single place GL calls are legal.

use crate::error::GfxError;

pub mod headless;
pub mod sdl;

/// One surface configuration. Replacing any field goes through the full
/// destroy-context / reconfigure / rebuild-context protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    /// bits per pixel, 24 or 32
    pub depth: u32,
    pub fullscreen: bool,
    /// multisample level, 0 disables
    pub fsaa: u32,
}

impl DisplayMode {
    /// The alternate bit depth tried when surface acquisition rejects the
    /// configured one.
    pub fn with_other_depth(mut self) -> Self {
        self.depth = if self.depth == 32 { 24 } else { 32 };
        self
    }
}

/// Extension capabilities probed once per context. Shortfalls degrade
/// behaviour, they never abort.
#[derive(Clone, Copy, Debug, Default)]
pub struct AdapterCaps {
    /// No S3TC support, textures take the software decompression path.
    pub needs_manual_des3tc: bool,
    /// Multitexturing available; otherwise surfaces fall back to a single
    /// texture unit.
    pub multi_texture: bool,
}

pub trait Adapter {
    /// Create the surface and GL context for the given mode. Called once at
    /// init and again after `release`.
    fn acquire(&mut self, mode: &DisplayMode) -> Result<(), GfxError>;

    /// Replace the current surface configuration. The old surface stays
    /// valid if this returns an error.
    fn reconfigure(&mut self, mode: &DisplayMode) -> Result<(), GfxError>;

    /// Tear the surface and context down.
    fn release(&mut self);

    /// Highest multisample level the platform accepts for this mode, 0 if
    /// multisampling is unavailable.
    fn probe_max_fsaa(&mut self, mode: &DisplayMode) -> u32;

    fn capabilities(&self) -> AdapterCaps;

    /// Native desktop resolution.
    fn system_size(&self) -> (u32, u32);

    fn set_title(&mut self, title: &str);

    fn set_gamma(&mut self, gamma: f32) -> Result<(), GfxError>;

    /// Show or hide the operating system cursor.
    fn show_system_cursor(&mut self, show: bool);

    fn toggle_mouse_grab(&mut self);

    /// Last platform error string, for surface failure reports.
    fn last_error(&self) -> String;

    /// Viewport, clear color/depth, blend mode, depth test, multisample
    /// toggle. Run after acquisition and after every context rebuild.
    fn setup_scene(&mut self, width: u32, height: u32, fsaa: u32) -> Result<(), GfxError>;

    /// Clear color and depth buffers.
    fn clear_frame(&mut self);

    fn set_depth_test(&mut self, enable: bool);

    fn swap_buffers(&mut self);

    /// Read back the finished frame for a screenshot.
    fn capture_frame(&mut self) -> Result<image::RgbaImage, GfxError>;

    /// Bulk-delete abandoned texture handles.
    fn delete_textures(&mut self, ids: &[u32]);

    /// Delete one abandoned draw-list buffer handle.
    fn delete_buffer(&mut self, id: u32);

    /// Raw GL escape hatch for resource implementations. `None` on
    /// surfaceless adapters.
    fn glow(&self) -> Option<&glow::Context> {
        None
    }

    /// Downcast hook for tooling that must reach the concrete adapter.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
