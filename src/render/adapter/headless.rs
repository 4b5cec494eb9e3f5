// PixelGL
// copyright zipxing@hotmail.com 2022~2024

//! Surfaceless adapter. Accepts every mode, draws nothing, and keeps a
//! journal of the operations performed on it. Used by headless tooling
//! (asset bakers, CI) and by the unit tests, which assert on the journal.

use crate::error::GfxError;
use crate::render::adapter::{Adapter, AdapterCaps, DisplayMode};

#[derive(Clone, Debug, PartialEq)]
pub enum HeadlessOp {
    Acquire(DisplayMode),
    Reconfigure(DisplayMode),
    Release,
    SetupScene(u32, u32, u32),
    ClearFrame,
    DepthTest(bool),
    SwapBuffers,
    DeleteTextures(Vec<u32>),
    DeleteBuffer(u32),
    ShowSystemCursor(bool),
    SetGamma(f32),
    SetTitle(String),
    ToggleMouseGrab,
}

pub struct HeadlessAdapter {
    pub journal: Vec<HeadlessOp>,
    pub max_fsaa: u32,
    pub system_size: (u32, u32),
    /// Fail this many upcoming `reconfigure` calls, for exercising the
    /// revert path.
    pub fail_reconfigures: u32,
    mode: Option<DisplayMode>,
}

impl Default for HeadlessAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessAdapter {
    pub fn new() -> Self {
        Self {
            journal: Vec::new(),
            max_fsaa: 8,
            system_size: (1920, 1080),
            fail_reconfigures: 0,
            mode: None,
        }
    }

    pub fn mode(&self) -> Option<DisplayMode> {
        self.mode
    }

    pub fn count<F: Fn(&HeadlessOp) -> bool>(&self, f: F) -> usize {
        self.journal.iter().filter(|op| f(op)).count()
    }
}

impl Adapter for HeadlessAdapter {
    fn acquire(&mut self, mode: &DisplayMode) -> Result<(), GfxError> {
        self.journal.push(HeadlessOp::Acquire(*mode));
        self.mode = Some(*mode);
        Ok(())
    }

    fn reconfigure(&mut self, mode: &DisplayMode) -> Result<(), GfxError> {
        self.journal.push(HeadlessOp::Reconfigure(*mode));
        if self.fail_reconfigures > 0 {
            self.fail_reconfigures -= 1;
            return Err(GfxError::surface("headless: scripted failure"));
        }
        self.mode = Some(*mode);
        Ok(())
    }

    fn release(&mut self) {
        self.journal.push(HeadlessOp::Release);
        self.mode = None;
    }

    fn probe_max_fsaa(&mut self, _mode: &DisplayMode) -> u32 {
        self.max_fsaa
    }

    fn capabilities(&self) -> AdapterCaps {
        AdapterCaps {
            needs_manual_des3tc: false,
            multi_texture: true,
        }
    }

    fn system_size(&self) -> (u32, u32) {
        self.system_size
    }

    fn set_title(&mut self, title: &str) {
        self.journal.push(HeadlessOp::SetTitle(title.to_string()));
    }

    fn set_gamma(&mut self, gamma: f32) -> Result<(), GfxError> {
        self.journal.push(HeadlessOp::SetGamma(gamma));
        Ok(())
    }

    fn show_system_cursor(&mut self, show: bool) {
        self.journal.push(HeadlessOp::ShowSystemCursor(show));
    }

    fn toggle_mouse_grab(&mut self) {
        self.journal.push(HeadlessOp::ToggleMouseGrab);
    }

    fn last_error(&self) -> String {
        "headless: scripted failure".to_string()
    }

    fn setup_scene(&mut self, width: u32, height: u32, fsaa: u32) -> Result<(), GfxError> {
        self.journal.push(HeadlessOp::SetupScene(width, height, fsaa));
        Ok(())
    }

    fn clear_frame(&mut self) {
        self.journal.push(HeadlessOp::ClearFrame);
    }

    fn set_depth_test(&mut self, enable: bool) {
        self.journal.push(HeadlessOp::DepthTest(enable));
    }

    fn swap_buffers(&mut self) {
        self.journal.push(HeadlessOp::SwapBuffers);
    }

    fn capture_frame(&mut self) -> Result<image::RgbaImage, GfxError> {
        let (w, h) = self
            .mode
            .map(|m| (m.width, m.height))
            .unwrap_or((1, 1));
        Ok(image::RgbaImage::new(w.max(1), h.max(1)))
    }

    fn delete_textures(&mut self, ids: &[u32]) {
        self.journal.push(HeadlessOp::DeleteTextures(ids.to_vec()));
    }

    fn delete_buffer(&mut self, id: u32) {
        self.journal.push(HeadlessOp::DeleteBuffer(id));
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
