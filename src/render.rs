// PixelGL
// copyright zipxing@hotmail.com 2022~2024

//! Render module: surface ownership, resource queues and the per-frame
//! draw loop.

/// render adapter interface (sdl, headless) plus the display mode type
pub mod adapter;

/// worker-to-render-thread request channel
pub mod bridge;

/// the graphics manager and its thread-safe handle
pub mod manager;

/// mutex-guarded resource queues and membership handles
pub mod queue;

/// traits for queueable resources: drawables, GPU resources, videos
pub mod renderable;

/// projections and model transforms passed explicitly per draw
pub mod transform;
