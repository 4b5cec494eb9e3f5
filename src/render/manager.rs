// PixelGL
// copyright zipxing@hotmail.com 2022~2024

//! The graphics manager. Owns the render surface through the adapter,
//! drives the per-frame draw loop and the destroy/rebuild protocol around
//! context-invalidating mode changes.
//!
//! The manager itself lives on the rendering thread and is never shared.
//! Everything other threads may touch sits behind [`GfxHandle`], a clone of
//! the shared state: the five resource queues, the abandoned-handle list,
//! cursor state, FPS readout and the request bridge for surface changes.

use crossbeam_channel::Receiver;
use log::{info, warn};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::config::GfxConfig;
use crate::error::GfxError;
use crate::fps::FpsCounter;
use crate::render::adapter::{Adapter, DisplayMode};
use crate::render::bridge::{RequestBridge, RequestOp};
use crate::render::queue::{sort_by_distance, Membership, RenderQueue};
use crate::render::renderable::{GpuQueueable, RenderPass, Renderable, Video};
use crate::render::transform::Projection;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ManagerState {
    Uninitialized,
    Ready,
    Rebuilding,
}

/// Pending cursor visibility transition, consumed at most once per frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CursorState {
    Stay,
    SwitchOn,
    SwitchOff,
}

#[derive(Default)]
struct Abandoned {
    textures: Vec<u32>,
    buffers: Vec<u32>,
}

struct GfxShared {
    objects: RenderQueue<dyn Renderable>,
    gui_front: RenderQueue<dyn Renderable>,
    textures: RenderQueue<dyn GpuQueueable>,
    lists: RenderQueue<dyn GpuQueueable>,
    videos: RenderQueue<dyn Video>,

    /// Exclusive gate between frame rendering and context rebuilds (or a
    /// worker pausing rendering). Contention drops frames, never queues
    /// them.
    frame_lock: Mutex<()>,
    cursor_state: Mutex<CursorState>,
    cursor: Mutex<Option<Arc<dyn Renderable>>>,
    abandoned: Mutex<Abandoned>,
    has_abandoned: AtomicBool,
    take_screenshot: AtomicBool,
    fps: FpsCounter,

    ready: AtomicBool,
    width: AtomicU32,
    height: AtomicU32,
    system_width: AtomicU32,
    system_height: AtomicU32,
    fullscreen: AtomicBool,
    fsaa: AtomicU32,
    fsaa_max: AtomicU32,

    bridge: RequestBridge,
}

/// A held frame lock; rendering skips frames until it is dropped.
pub struct FrameGuard<'a>(#[allow(dead_code)] MutexGuard<'a, ()>);

/// Cloneable, thread-safe half of the graphics manager.
#[derive(Clone)]
pub struct GfxHandle {
    shared: Arc<GfxShared>,
}

impl GfxHandle {
    // --- queue access ---

    pub fn register_object(&self, res: Arc<dyn Renderable>) -> Membership {
        self.shared.objects.register(res)
    }

    pub fn unregister_object(&self, m: Membership) -> Option<Arc<dyn Renderable>> {
        self.shared.objects.unregister(m)
    }

    pub fn register_gui(&self, res: Arc<dyn Renderable>) -> Membership {
        self.shared.gui_front.register(res)
    }

    pub fn unregister_gui(&self, m: Membership) -> Option<Arc<dyn Renderable>> {
        self.shared.gui_front.unregister(m)
    }

    pub fn register_texture(&self, res: Arc<dyn GpuQueueable>) -> Membership {
        self.shared.textures.register(res)
    }

    pub fn unregister_texture(&self, m: Membership) -> Option<Arc<dyn GpuQueueable>> {
        self.shared.textures.unregister(m)
    }

    pub fn register_list(&self, res: Arc<dyn GpuQueueable>) -> Membership {
        self.shared.lists.register(res)
    }

    pub fn unregister_list(&self, m: Membership) -> Option<Arc<dyn GpuQueueable>> {
        self.shared.lists.unregister(m)
    }

    pub fn register_video(&self, res: Arc<dyn Video>) -> Membership {
        self.shared.videos.register(res)
    }

    pub fn unregister_video(&self, m: Membership) -> Option<Arc<dyn Video>> {
        self.shared.videos.unregister(m)
    }

    // --- deferred deletion ---

    /// Hand over texture handles whose owner died off the rendering thread.
    /// Deleted in bulk at the start of the next frame.
    pub fn abandon_textures(&self, ids: &[u32]) {
        if ids.is_empty() {
            return;
        }
        let mut ab = self.shared.abandoned.lock();
        ab.textures.extend_from_slice(ids);
        self.shared.has_abandoned.store(true, Ordering::Release);
    }

    pub fn abandon_buffer(&self, id: u32) {
        let mut ab = self.shared.abandoned.lock();
        ab.buffers.push(id);
        self.shared.has_abandoned.store(true, Ordering::Release);
    }

    // --- cursor and frame control ---

    /// Request showing or hiding the system cursor. Applied by the renderer
    /// on the next frame.
    pub fn show_cursor(&self, show: bool) {
        let mut state = self.shared.cursor_state.lock();
        *state = if show {
            CursorState::SwitchOn
        } else {
            CursorState::SwitchOff
        };
    }

    /// Swap the drawable cursor. Takes the frame lock so the renderer never
    /// sees a half-set cursor.
    pub fn set_cursor(&self, cursor: Option<Arc<dyn Renderable>>) {
        let _frame = self.shared.frame_lock.lock();
        *self.shared.cursor.lock() = cursor;
    }

    pub fn take_screenshot(&self) {
        self.shared.take_screenshot.store(true, Ordering::Release);
    }

    /// Pause rendering while the guard lives. Frames in the meantime are
    /// dropped, not queued.
    pub fn lock_frame(&self) -> FrameGuard<'_> {
        FrameGuard(self.shared.frame_lock.lock())
    }

    // --- queries ---

    pub fn ready(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire)
    }

    pub fn screen_width(&self) -> u32 {
        self.shared.width.load(Ordering::Acquire)
    }

    pub fn screen_height(&self) -> u32 {
        self.shared.height.load(Ordering::Acquire)
    }

    pub fn system_width(&self) -> u32 {
        self.shared.system_width.load(Ordering::Acquire)
    }

    pub fn system_height(&self) -> u32 {
        self.shared.system_height.load(Ordering::Acquire)
    }

    pub fn is_fullscreen(&self) -> bool {
        self.shared.fullscreen.load(Ordering::Acquire)
    }

    pub fn current_fsaa(&self) -> u32 {
        self.shared.fsaa.load(Ordering::Acquire)
    }

    pub fn max_fsaa(&self) -> u32 {
        self.shared.fsaa_max.load(Ordering::Acquire)
    }

    pub fn fps(&self) -> u32 {
        self.shared.fps.fps()
    }

    /// Tag of the topmost tagged GUI object containing the screen point.
    /// Holds the GUI queue lock for the whole scan so a concurrent sort
    /// cannot shuffle the draw order mid-search.
    pub fn get_object_at(&self, x: f32, y: f32) -> Option<String> {
        let w = self.screen_width() as f32;
        let h = self.screen_height() as f32;

        let mut members = self.shared.gui_front.lock();
        sort_by_distance(&mut members);

        // screen coords to flat GUI coords: origin center, y up
        let gx = x - w / 2.0;
        let gy = (h - y) - h / 2.0;

        for m in members.iter().rev() {
            match m.res.tag() {
                Some(tag) if m.res.is_in(gx, gy) => return Some(tag.to_string()),
                _ => {}
            }
        }
        None
    }

    // --- bridged surface changes (worker threads only) ---

    /// Change the multisample level from a worker thread. Blocks until the
    /// rendering thread has rebuilt the context. `Ok(false)` means the
    /// level was rejected (above the probed maximum or refused by the
    /// platform) and the old state is intact.
    pub fn set_fsaa(&self, level: u32) -> Result<bool, GfxError> {
        self.shared
            .bridge
            .dispatch_and_wait(RequestOp::SetFsaa(level))
    }

    pub fn set_fullscreen(&self, fullscreen: bool) -> Result<(), GfxError> {
        self.shared
            .bridge
            .dispatch_and_wait(RequestOp::SetFullScreen(fullscreen))
            .map(|_| ())
    }

    pub fn toggle_fullscreen(&self) -> Result<(), GfxError> {
        self.set_fullscreen(!self.is_fullscreen())
    }

    pub fn set_screen_size(&self, width: u32, height: u32) -> Result<(), GfxError> {
        self.shared
            .bridge
            .dispatch_and_wait(RequestOp::SetScreenSize(width, height))
            .map(|_| ())
    }
}

/// Rendering-thread half. All GPU state mutation happens through `&mut
/// self` here, so exclusive ownership by the rendering thread enforces the
/// single-threaded GL contract.
pub struct GraphicsManager {
    adapter: Box<dyn Adapter>,
    shared: Arc<GfxShared>,
    requests: Receiver<crate::render::bridge::Request>,
    config: GfxConfig,
    mode: DisplayMode,
    gamma: f32,
    state: ManagerState,
    screenshot_sink: Option<Box<dyn FnMut(image::RgbaImage) + Send>>,
}

impl GraphicsManager {
    pub fn new(adapter: Box<dyn Adapter>, config: GfxConfig) -> Self {
        let (bridge, requests) = RequestBridge::new();
        let shared = Arc::new(GfxShared {
            objects: RenderQueue::new(),
            gui_front: RenderQueue::new(),
            textures: RenderQueue::new(),
            lists: RenderQueue::new(),
            videos: RenderQueue::new(),
            frame_lock: Mutex::new(()),
            cursor_state: Mutex::new(CursorState::Stay),
            cursor: Mutex::new(None),
            abandoned: Mutex::new(Abandoned::default()),
            has_abandoned: AtomicBool::new(false),
            take_screenshot: AtomicBool::new(false),
            fps: FpsCounter::new(3),
            ready: AtomicBool::new(false),
            width: AtomicU32::new(0),
            height: AtomicU32::new(0),
            system_width: AtomicU32::new(0),
            system_height: AtomicU32::new(0),
            fullscreen: AtomicBool::new(false),
            fsaa: AtomicU32::new(0),
            fsaa_max: AtomicU32::new(0),
            bridge,
        });
        let mode = DisplayMode {
            width: config.width,
            height: config.height,
            depth: config.depth,
            fullscreen: config.fullscreen,
            fsaa: 0,
        };
        Self {
            adapter,
            shared,
            requests,
            config,
            mode,
            gamma: 1.0,
            state: ManagerState::Uninitialized,
            screenshot_sink: None,
        }
    }

    pub fn handle(&self) -> GfxHandle {
        GfxHandle {
            shared: self.shared.clone(),
        }
    }

    /// Where captured frames go. Encoding and IO are the sink's business.
    pub fn set_screenshot_sink<F: FnMut(image::RgbaImage) + Send + 'static>(&mut self, sink: F) {
        self.screenshot_sink = Some(Box::new(sink));
    }

    pub fn adapter(&mut self) -> &mut dyn Adapter {
        self.adapter.as_mut()
    }

    pub fn ready(&self) -> bool {
        self.state != ManagerState::Uninitialized
    }

    /// Acquire the surface at the configured mode and bring the scene up.
    pub fn init(&mut self) -> Result<(), GfxError> {
        if self.state != ManagerState::Uninitialized {
            return Ok(());
        }

        let max_fsaa = self.adapter.probe_max_fsaa(&self.mode);
        self.shared.fsaa_max.store(max_fsaa, Ordering::Release);

        if self.adapter.acquire(&self.mode).is_err() {
            // configured depth rejected, try the alternate once
            let alt = self.mode.with_other_depth();
            self.adapter.acquire(&alt).map_err(|_| {
                GfxError::init(format!(
                    "failed setting the video mode: {}",
                    self.adapter.last_error()
                ))
            })?;
            self.mode = alt;
        }

        let caps = self.adapter.capabilities();
        if caps.needs_manual_des3tc {
            warn!("graphics card lacks s3tc texture decompression support");
            warn!("switching to the software decompression path, slower and hungrier on video memory");
        }
        if !caps.multi_texture {
            warn!("graphics card lacks multitexturing, layered surfaces fall back to one texture");
        }

        let (sw, sh) = self.adapter.system_size();
        self.shared.system_width.store(sw, Ordering::Release);
        self.shared.system_height.store(sh, Ordering::Release);

        self.adapter
            .setup_scene(self.mode.width, self.mode.height, self.mode.fsaa)?;
        self.state = ManagerState::Ready;

        let want_fsaa = self.config.fsaa.min(max_fsaa);
        if want_fsaa != self.mode.fsaa {
            match self.set_fsaa(want_fsaa) {
                Ok(true) => {}
                Ok(false) => warn!(
                    "fsaa level {} rejected, staying at {}",
                    want_fsaa, self.mode.fsaa
                ),
                Err(e) => return Err(e),
            }
        }

        self.set_gamma(self.config.gamma)?;
        let title = self.config.title.clone();
        self.adapter.set_title(&title);

        self.publish_mode();
        self.shared.ready.store(true, Ordering::Release);
        info!(
            "graphics up: {}x{} fullscreen {} fsaa {}/{}",
            self.mode.width, self.mode.height, self.mode.fullscreen, self.mode.fsaa, max_fsaa
        );
        Ok(())
    }

    /// Evict every queued resource and give the surface back.
    pub fn deinit(&mut self) {
        if self.state == ManagerState::Uninitialized {
            return;
        }
        let adapter = self.adapter.as_mut();
        self.shared.videos.clear_with(|v| {
            v.destroy(adapter);
            v.kicked_out();
        });
        self.shared.lists.clear_with(|l| {
            l.destroy(adapter);
            l.kicked_out();
        });
        self.shared.textures.clear_with(|t| {
            t.destroy(adapter);
            t.kicked_out();
        });
        self.shared.objects.clear_with(|o| o.kicked_out());
        self.shared.gui_front.clear_with(|o| o.kicked_out());

        self.adapter.release();
        self.state = ManagerState::Uninitialized;
        self.shared.ready.store(false, Ordering::Release);
        info!("graphics down");
    }

    // --- surface changes, rendering-thread entry points ---

    /// Change the multisample level. `Ok(false)` when the level is above
    /// the probed maximum or the platform refused it; state is untouched in
    /// both cases. `Ok(true)` when already at the level (no rebuild) or
    /// after a successful rebuild.
    pub fn set_fsaa(&mut self, level: u32) -> Result<bool, GfxError> {
        if self.state == ManagerState::Uninitialized {
            return Err(GfxError::NotReady);
        }
        if self.mode.fsaa == level {
            return Ok(true);
        }
        if level > self.shared.fsaa_max.load(Ordering::Acquire) {
            return Ok(false);
        }
        let applied = self.change_mode(DisplayMode {
            fsaa: level,
            ..self.mode
        })?;
        Ok(applied)
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), GfxError> {
        if self.state == ManagerState::Uninitialized {
            return Err(GfxError::NotReady);
        }
        if self.mode.fullscreen == fullscreen {
            return Ok(());
        }
        self.change_mode(DisplayMode {
            fullscreen,
            ..self.mode
        })?;
        Ok(())
    }

    pub fn toggle_fullscreen(&mut self) -> Result<(), GfxError> {
        self.set_fullscreen(!self.mode.fullscreen)
    }

    pub fn set_screen_size(&mut self, width: u32, height: u32) -> Result<(), GfxError> {
        if self.state == ManagerState::Uninitialized {
            return Err(GfxError::NotReady);
        }
        if self.mode.width == width && self.mode.height == height {
            return Ok(());
        }
        let (old_w, old_h) = (self.mode.width, self.mode.height);
        let applied = self.change_mode(DisplayMode {
            width,
            height,
            ..self.mode
        })?;
        if applied {
            let (new_w, new_h) = (self.mode.width, self.mode.height);
            self.shared
                .gui_front
                .for_each(|o| o.resolution_changed(old_w, old_h, new_w, new_h));
        }
        Ok(())
    }

    pub fn set_gamma(&mut self, gamma: f32) -> Result<(), GfxError> {
        self.adapter.set_gamma(gamma)?;
        self.gamma = gamma;
        Ok(())
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    pub fn toggle_mouse_grab(&mut self) {
        self.adapter.toggle_mouse_grab();
    }

    pub fn set_window_title(&mut self, title: &str) {
        self.adapter.set_title(title);
    }

    /// Drain and execute pending cross-thread requests. Call once per tick
    /// on the rendering thread.
    pub fn process_requests(&mut self) {
        while let Ok(req) = self.requests.try_recv() {
            let result = match req.op {
                RequestOp::SetFsaa(level) => self.set_fsaa(level),
                RequestOp::SetFullScreen(fs) => self.set_fullscreen(fs).map(|_| true),
                RequestOp::SetScreenSize(w, h) => self.set_screen_size(w, h).map(|_| true),
            };
            let _ = req.reply.send(result);
        }
    }

    /// The fixed destroy / reconfigure / rebuild protocol around any
    /// context-invalidating change. Holds the frame lock for the whole
    /// sequence; frames rendered meanwhile are dropped. Returns whether the
    /// new mode was applied (false after a clean revert).
    fn change_mode(&mut self, new_mode: DisplayMode) -> Result<bool, GfxError> {
        let shared = self.shared.clone();
        let _frame = shared.frame_lock.lock();
        self.state = ManagerState::Rebuilding;

        let old_mode = self.mode;
        self.destroy_context();

        let applied = match self.adapter.reconfigure(&new_mode) {
            Ok(()) => {
                self.mode = new_mode;
                true
            }
            Err(_) => {
                // rejected, revert once; a second rejection is fatal
                self.adapter.reconfigure(&old_mode).map_err(|_| {
                    GfxError::surface(format!(
                        "mode change failed and revert failed: {}",
                        self.adapter.last_error()
                    ))
                })?;
                false
            }
        };

        self.rebuild_context()?;
        self.publish_mode();
        self.state = ManagerState::Ready;
        Ok(applied)
    }

    /// Free GPU state of every queued resource; membership survives.
    fn destroy_context(&mut self) {
        let adapter = self.adapter.as_mut();
        self.shared.videos.for_each(|v| v.destroy(adapter));
        self.shared.lists.for_each(|l| l.destroy(adapter));
        self.shared.textures.for_each(|t| t.destroy(adapter));
    }

    /// Re-establish scene state, then rebuild videos, draw-list containers
    /// and textures, in that order.
    fn rebuild_context(&mut self) -> Result<(), GfxError> {
        self.adapter
            .setup_scene(self.mode.width, self.mode.height, self.mode.fsaa)?;
        let adapter = self.adapter.as_mut();
        self.shared.videos.for_each(|v| v.rebuild(adapter));
        self.shared.lists.for_each(|l| l.rebuild(adapter));
        self.shared.textures.for_each(|t| t.rebuild(adapter));
        info!(
            "context rebuilt at {}x{} fsaa {}",
            self.mode.width, self.mode.height, self.mode.fsaa
        );
        Ok(())
    }

    fn publish_mode(&self) {
        self.shared.width.store(self.mode.width, Ordering::Release);
        self.shared
            .height
            .store(self.mode.height, Ordering::Release);
        self.shared
            .fullscreen
            .store(self.mode.fullscreen, Ordering::Release);
        self.shared.fsaa.store(self.mode.fsaa, Ordering::Release);
    }

    // --- frame rendering ---

    /// Render one frame. Call once per tick on the rendering thread.
    pub fn render_frame(&mut self) -> Result<(), GfxError> {
        if self.state == ManagerState::Uninitialized {
            return Ok(());
        }

        self.cleanup_abandoned();
        let shared = self.shared.clone();

        // a rebuild (or a frame-locking worker) in progress: drop the frame
        let Some(_frame) = shared.frame_lock.try_lock() else {
            return Ok(());
        };

        self.apply_cursor_switch();
        self.adapter.clear_frame();

        let (w, h) = (self.mode.width, self.mode.height);
        let mut videos = shared.videos.lock();

        if !videos.is_empty() {
            // cinematic playback suppresses the normal scene
            for m in videos.iter() {
                let mut pass = RenderPass::new(self.adapter.as_mut(), Projection::flat(w, h));
                m.res.render(&mut pass);
            }
            let adapter = self.adapter.as_mut();
            videos.retain(|m| {
                if m.res.is_playing() {
                    true
                } else {
                    m.res.destroy(adapter);
                    m.res.kicked_out();
                    false
                }
            });
            drop(videos);
            self.finish_frame();
            return Ok(());
        }
        // lock order: videos, then objects, then gui-front
        let mut objects = shared.objects.lock();
        let mut gui = shared.gui_front.lock();

        for m in objects.iter() {
            m.res.new_frame();
        }
        for m in gui.iter() {
            m.res.new_frame();
        }
        sort_by_distance(&mut objects);
        sort_by_distance(&mut gui);

        for m in objects.iter() {
            let mut pass = RenderPass::new(self.adapter.as_mut(), Projection::world(w, h));
            m.res.render(&mut pass);
        }

        self.adapter.set_depth_test(false);

        for m in gui.iter() {
            let mut pass = RenderPass::new(self.adapter.as_mut(), Projection::flat(w, h));
            m.res.render(&mut pass);
        }

        if let Some(cursor) = shared.cursor.lock().clone() {
            let mut pass = RenderPass::new(self.adapter.as_mut(), Projection::flat(w, h));
            pass.transform
                .translate(-(w as f32) / 2.0, h as f32 / 2.0, 0.0);
            cursor.render(&mut pass);
        }

        self.adapter.set_depth_test(true);

        drop(gui);
        drop(objects);
        drop(videos);
        self.finish_frame();
        Ok(())
    }

    /// Swap, optional screenshot, FPS accounting.
    fn finish_frame(&mut self) {
        self.adapter.swap_buffers();
        if self.shared.take_screenshot.swap(false, Ordering::AcqRel) {
            match self.adapter.capture_frame() {
                Ok(img) => {
                    if let Some(sink) = self.screenshot_sink.as_mut() {
                        sink(img);
                    }
                }
                Err(e) => warn!("screenshot capture failed: {}", e),
            }
        }
        self.shared.fps.finished_frame();
    }

    fn apply_cursor_switch(&mut self) {
        let mut state = self.shared.cursor_state.lock();
        match *state {
            CursorState::Stay => return,
            CursorState::SwitchOn => self.adapter.show_system_cursor(true),
            CursorState::SwitchOff => self.adapter.show_system_cursor(false),
        }
        *state = CursorState::Stay;
    }

    /// Delete handles abandoned by other threads. One bulk call for
    /// textures, one call per buffer. Cheap no-op when nothing is pending.
    fn cleanup_abandoned(&mut self) {
        if !self.shared.has_abandoned.load(Ordering::Acquire) {
            return;
        }
        let mut ab = self.shared.abandoned.lock();
        if !ab.textures.is_empty() {
            self.adapter.delete_textures(&ab.textures);
        }
        for id in ab.buffers.drain(..) {
            self.adapter.delete_buffer(id);
        }
        ab.textures.clear();
        self.shared.has_abandoned.store(false, Ordering::Release);
    }
}

impl Drop for GraphicsManager {
    fn drop(&mut self) {
        self.deinit();
    }
}
