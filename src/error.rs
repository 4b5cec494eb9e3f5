// PixelGL
// copyright zipxing@hotmail.com 2022~2024

//! Error taxonomy of the graphics manager.
//!
//! Only two situations are fatal: failing to acquire a surface at startup,
//! and a mode change where both the new and the reverted configuration are
//! rejected by the platform. A rejected mode change that reverts cleanly is
//! reported through the return value, not through an error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GfxError {
    /// Surface or extension setup failed during init. Terminates startup.
    #[error("graphics init failed: {reason}")]
    Init { reason: String },

    /// A mode change was rejected and reverting to the previous mode was
    /// rejected too. The surface is gone; rendering cannot proceed.
    #[error("lost the render surface: {reason}")]
    Surface { reason: String },

    /// Operation needs an initialised manager.
    #[error("graphics manager is not ready")]
    NotReady,

    /// The rendering thread went away while a cross-thread request was
    /// waiting for its reply.
    #[error("request bridge closed, rendering thread gone")]
    BridgeClosed,

    /// Malformed configuration file.
    #[error("bad graphics config: {0}")]
    Config(#[from] toml::de::Error),
}

impl GfxError {
    pub fn init(reason: impl Into<String>) -> Self {
        GfxError::Init {
            reason: reason.into(),
        }
    }

    pub fn surface(reason: impl Into<String>) -> Self {
        GfxError::Surface {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = GfxError::init("no display");
        assert_eq!(format!("{}", e), "graphics init failed: no display");
        let e = GfxError::surface("revert rejected");
        assert_eq!(format!("{}", e), "lost the render surface: revert rejected");
    }
}
