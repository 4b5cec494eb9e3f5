// PixelGL
// copyright zipxing@hotmail.com 2022~2024

//! Initial graphics settings, read once when the manager is initialised.
//! Loadable from a toml file so games can ship a plain config alongside
//! their assets.

use crate::error::GfxError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GfxConfig {
    pub width: u32,
    pub height: u32,
    /// bits per pixel, 24 or 32
    pub depth: u32,
    pub fullscreen: bool,
    /// requested multisample level, clamped to the probed maximum at init
    pub fsaa: u32,
    pub gamma: f32,
    pub title: String,
}

impl Default for GfxConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            depth: 32,
            fullscreen: false,
            fsaa: 0,
            gamma: 1.0,
            title: "pixel_gl".to_string(),
        }
    }
}

impl GfxConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, GfxError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GfxError> {
        let s = fs::read_to_string(path.as_ref())
            .map_err(|e| GfxError::init(format!("read config: {}", e)))?;
        Self::from_toml_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let c = GfxConfig::default();
        assert_eq!(c.width, 800);
        assert_eq!(c.height, 600);
        assert_eq!(c.depth, 32);
        assert!(!c.fullscreen);
        assert_eq!(c.fsaa, 0);
    }

    #[test]
    fn test_config_from_toml() {
        let c = GfxConfig::from_toml_str(
            r#"
            width = 1024
            height = 768
            fullscreen = true
            fsaa = 4
            gamma = 1.2
            "#,
        )
        .unwrap();
        assert_eq!(c.width, 1024);
        assert_eq!(c.height, 768);
        assert!(c.fullscreen);
        assert_eq!(c.fsaa, 4);
        // unspecified fields keep their defaults
        assert_eq!(c.depth, 32);
        assert_eq!(c.title, "pixel_gl");
    }

    #[test]
    fn test_config_bad_toml() {
        assert!(GfxConfig::from_toml_str("width = \"oops\"").is_err());
    }
}
