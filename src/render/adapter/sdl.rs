// PixelGL
// copyright zipxing@hotmail.com 2022~2024

//! SDL2 adapter. Owns the window, the SDL GL context and the glow entry
//! points. A mode change recreates the window and context from scratch; the
//! manager destroys and rebuilds every GPU resource around that, so nothing
//! here tries to keep old GL state alive.

use crate::error::GfxError;
use crate::render::adapter::{Adapter, AdapterCaps, DisplayMode};
use glow::HasContext;
use log::info;
use sdl2::video::{GLProfile, Window};
use sdl2::{Sdl, VideoSubsystem};
use std::num::NonZeroU32;

pub struct SdlAdapter {
    sdl_context: Sdl,
    video: VideoSubsystem,
    title: String,

    window: Option<Window>,
    // owns the GL context, dropping it kills the bindings in `gl`
    pub gl_context: Option<sdl2::video::GLContext>,
    gl: Option<glow::Context>,

    mode: DisplayMode,
    caps: AdapterCaps,
}

impl SdlAdapter {
    pub fn new(title: &str) -> Result<Self, GfxError> {
        let sdl_context = sdl2::init().map_err(GfxError::init)?;
        let video = sdl_context.video().map_err(GfxError::init)?;
        Ok(Self {
            sdl_context,
            video,
            title: title.to_string(),
            window: None,
            gl_context: None,
            gl: None,
            mode: DisplayMode {
                width: 0,
                height: 0,
                depth: 32,
                fullscreen: false,
                fsaa: 0,
            },
            caps: AdapterCaps::default(),
        })
    }

    fn apply_gl_attr(&self, mode: &DisplayMode) {
        let gl_attr = self.video.gl_attr();
        gl_attr.set_context_profile(GLProfile::Core);
        gl_attr.set_context_version(3, 3);
        gl_attr.set_red_size(8);
        gl_attr.set_green_size(8);
        gl_attr.set_blue_size(8);
        gl_attr.set_depth_size(if mode.depth == 32 { 24 } else { 16 });
        gl_attr.set_double_buffer(true);
        if mode.fsaa > 0 {
            gl_attr.set_multisample_buffers(1);
            gl_attr.set_multisample_samples(mode.fsaa as u8);
        } else {
            gl_attr.set_multisample_buffers(0);
            gl_attr.set_multisample_samples(0);
        }
    }

    /// Build window + GL context + glow entry points for the mode. The old
    /// surface stays untouched until this succeeds.
    fn build_surface(
        &mut self,
        mode: &DisplayMode,
    ) -> Result<(Window, sdl2::video::GLContext, glow::Context), GfxError> {
        self.apply_gl_attr(mode);

        let mut builder = self.video.window(&self.title, mode.width, mode.height);
        builder.opengl().position_centered();
        if mode.fullscreen {
            builder.fullscreen();
        }
        let window = builder
            .build()
            .map_err(|e| GfxError::surface(e.to_string()))?;

        let gl_context = window.gl_create_context().map_err(GfxError::surface)?;
        let _ = self.video.gl_set_swap_interval(1);

        let gl = unsafe {
            glow::Context::from_loader_function(|s| self.video.gl_get_proc_address(s) as *const _)
        };
        Ok((window, gl_context, gl))
    }

    fn probe_caps(gl: &glow::Context) -> AdapterCaps {
        let ext = gl.supported_extensions();
        let s3tc = ext.contains("GL_EXT_texture_compression_s3tc");
        AdapterCaps {
            needs_manual_des3tc: !s3tc,
            // multitexturing is core since GL 1.3, the 3.3 core context
            // always carries it
            multi_texture: true,
        }
    }
}

impl Adapter for SdlAdapter {
    fn acquire(&mut self, mode: &DisplayMode) -> Result<(), GfxError> {
        let (window, gl_context, gl) = self
            .build_surface(mode)
            .map_err(|e| GfxError::init(e.to_string()))?;
        self.caps = Self::probe_caps(&gl);
        self.window = Some(window);
        self.gl_context = Some(gl_context);
        self.gl = Some(gl);
        self.mode = *mode;
        info!(
            "surface acquired {}x{} depth {} fsaa {}",
            mode.width, mode.height, mode.depth, mode.fsaa
        );
        Ok(())
    }

    fn reconfigure(&mut self, mode: &DisplayMode) -> Result<(), GfxError> {
        let (window, gl_context, gl) = self.build_surface(mode)?;
        // drop the old surface only after the new one exists
        self.gl = Some(gl);
        self.gl_context = Some(gl_context);
        self.window = Some(window);
        self.caps = Self::probe_caps(self.gl.as_ref().ok_or(GfxError::NotReady)?);
        self.mode = *mode;
        Ok(())
    }

    fn release(&mut self) {
        self.gl = None;
        self.gl_context = None;
        self.window = None;
    }

    fn probe_max_fsaa(&mut self, mode: &DisplayMode) -> u32 {
        for level in [32u32, 16, 8, 4, 2] {
            let probe = DisplayMode {
                fsaa: level,
                ..*mode
            };
            self.apply_gl_attr(&probe);
            let window = self
                .video
                .window(&self.title, 32, 32)
                .opengl()
                .hidden()
                .build();
            if let Ok(w) = window {
                if w.gl_create_context().is_ok() {
                    return level;
                }
            }
        }
        0
    }

    fn capabilities(&self) -> AdapterCaps {
        self.caps
    }

    fn system_size(&self) -> (u32, u32) {
        match self.video.current_display_mode(0) {
            Ok(m) => (m.w.max(0) as u32, m.h.max(0) as u32),
            Err(_) => (0, 0),
        }
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        if let Some(w) = self.window.as_mut() {
            let _ = w.set_title(title);
        }
    }

    fn set_gamma(&mut self, gamma: f32) -> Result<(), GfxError> {
        let w = self.window.as_mut().ok_or(GfxError::NotReady)?;
        w.set_brightness(gamma as f64)
            .map_err(GfxError::surface)
    }

    fn show_system_cursor(&mut self, show: bool) {
        self.sdl_context.mouse().show_cursor(show);
    }

    fn toggle_mouse_grab(&mut self) {
        if let Some(w) = self.window.as_mut() {
            let grabbed = w.grab();
            w.set_grab(!grabbed);
        }
    }

    fn last_error(&self) -> String {
        sdl2::get_error()
    }

    fn setup_scene(&mut self, width: u32, height: u32, fsaa: u32) -> Result<(), GfxError> {
        let gl = self.gl.as_ref().ok_or(GfxError::NotReady)?;
        unsafe {
            gl.viewport(0, 0, width as i32, height as i32);
            gl.clear_color(0.0, 0.0, 0.0, 1.0);
            gl.clear_depth_f32(1.0);
            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LEQUAL);
            gl.enable(glow::BLEND);
            gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
            if fsaa > 0 {
                gl.enable(glow::MULTISAMPLE);
            } else {
                gl.disable(glow::MULTISAMPLE);
            }
        }
        Ok(())
    }

    fn clear_frame(&mut self) {
        if let Some(gl) = self.gl.as_ref() {
            unsafe {
                gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            }
        }
    }

    fn set_depth_test(&mut self, enable: bool) {
        if let Some(gl) = self.gl.as_ref() {
            unsafe {
                if enable {
                    gl.enable(glow::DEPTH_TEST);
                } else {
                    gl.disable(glow::DEPTH_TEST);
                }
            }
        }
    }

    fn swap_buffers(&mut self) {
        if let Some(w) = self.window.as_ref() {
            w.gl_swap_window();
        }
    }

    fn capture_frame(&mut self) -> Result<image::RgbaImage, GfxError> {
        let gl = self.gl.as_ref().ok_or(GfxError::NotReady)?;
        let (w, h) = (self.mode.width, self.mode.height);
        let mut buf = vec![0u8; (w * h * 4) as usize];
        unsafe {
            gl.read_pixels(
                0,
                0,
                w as i32,
                h as i32,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelPackData::Slice(&mut buf),
            );
        }
        // GL reads bottom-up, image rows are top-down
        let stride = (w * 4) as usize;
        for row in 0..(h as usize / 2) {
            let (top, bottom) = buf.split_at_mut((h as usize - row - 1) * stride);
            top[row * stride..row * stride + stride]
                .swap_with_slice(&mut bottom[..stride]);
        }
        image::RgbaImage::from_raw(w, h, buf)
            .ok_or_else(|| GfxError::surface("screenshot buffer size mismatch"))
    }

    fn delete_textures(&mut self, ids: &[u32]) {
        if let Some(gl) = self.gl.as_ref() {
            for id in ids {
                if let Some(nz) = NonZeroU32::new(*id) {
                    unsafe {
                        gl.delete_texture(glow::NativeTexture(nz));
                    }
                }
            }
        }
    }

    fn delete_buffer(&mut self, id: u32) {
        if let (Some(gl), Some(nz)) = (self.gl.as_ref(), NonZeroU32::new(id)) {
            unsafe {
                gl.delete_buffer(glow::NativeBuffer(nz));
            }
        }
    }

    fn glow(&self) -> Option<&glow::Context> {
        self.gl.as_ref()
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
