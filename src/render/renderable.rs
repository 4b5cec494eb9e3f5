// PixelGL
// copyright zipxing@hotmail.com 2022~2024

//! Resource traits implemented by everything the manager can queue:
//! drawable objects, textures, draw-list containers and video decoders.
//!
//! The traits are `Send + Sync` because queue membership is shared across
//! threads, but every method that touches the GPU receives the adapter,
//! which lives on the rendering thread only. Implementations keep their own
//! interior mutability; the manager never needs `&mut` access to a resource.

use crate::render::adapter::Adapter;
use crate::render::transform::{Projection, Transform};

/// Everything a drawable needs for one draw call. Projection and transform
/// are explicit parameters; there is no implicit pipeline state to restore
/// afterwards.
pub struct RenderPass<'a> {
    pub adapter: &'a mut dyn Adapter,
    pub projection: Projection,
    pub transform: Transform,
}

impl<'a> RenderPass<'a> {
    pub fn new(adapter: &'a mut dyn Adapter, projection: Projection) -> Self {
        Self {
            adapter,
            projection,
            transform: Transform::new(),
        }
    }
}

/// A drawable object in the world or GUI-front queue.
pub trait Renderable: Send + Sync {
    /// Distance to the owner, drives draw order: far objects draw first so
    /// near ones land on top.
    fn distance(&self) -> f32;

    /// Optional non-unique tag for hit-testing. Untagged objects are
    /// invisible to `get_object_at`.
    fn tag(&self) -> Option<&str> {
        None
    }

    /// Bounds test in flat GUI space (origin screen center, y up).
    fn is_in(&self, _x: f32, _y: f32) -> bool {
        false
    }

    /// A new frame is starting; advance animations etc.
    fn new_frame(&self) {}

    fn render(&self, pass: &mut RenderPass<'_>);

    /// Forcibly evicted from its queue by a clear operation. Fired exactly
    /// once per eviction and never by a plain destroy.
    fn kicked_out(&self) {}

    /// Screen size changed. Only GUI-front members are notified.
    fn resolution_changed(&self, _old_w: u32, _old_h: u32, _new_w: u32, _new_h: u32) {}
}

/// A GPU-backed resource (texture or draw-list container) that survives a
/// context loss by rebuilding its GPU state.
pub trait GpuQueueable: Send + Sync {
    /// Recreate GPU-side state after a context rebuild.
    fn rebuild(&self, adapter: &mut dyn Adapter);

    /// Release GPU-side state, keeping logical identity and queue
    /// membership.
    fn destroy(&self, adapter: &mut dyn Adapter);

    /// Evicted via a queue clear. Fired exactly once.
    fn kicked_out(&self) {}
}

/// A playing video. While any video is queued the renderer plays videos
/// exclusively and draws nothing else.
pub trait Video: Send + Sync {
    fn render(&self, pass: &mut RenderPass<'_>);

    /// False once playback finished; the renderer then destroys and evicts
    /// the video.
    fn is_playing(&self) -> bool;

    fn rebuild(&self, adapter: &mut dyn Adapter);

    fn destroy(&self, adapter: &mut dyn Adapter);

    fn kicked_out(&self) {}
}
