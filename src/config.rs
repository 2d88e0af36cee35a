//! Configuration management for BannerWarp

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use crate::surface::aspect_ratio;

/// Interactive surface settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SurfaceConfig {
    /// Quiet period before a resize resets the corners
    pub resize_debounce_ms: u64,
    /// Visible handle diameter (px)
    pub handle_size: f64,
    /// Touch target edge length (px)
    pub handle_hit_area: f64,
    /// Supersampling factor for the banner layer
    pub render_scale: f64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            resize_debounce_ms: 100,
            handle_size: 32.0,
            handle_hit_area: 44.0,
            render_scale: 4.0,
        }
    }
}

impl SurfaceConfig {
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }
}

/// The banner shown on the surface; only its proportions matter here
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DesignConfig {
    pub name: String,
    /// SVG viewBox, e.g. "0 0 2560 314"
    pub view_box: String,
    /// Physical size (mm), used when the viewBox has no usable size
    pub width: f64,
    pub height: f64,
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            view_box: "0 0 2560 314".to_string(),
            width: 2560.0,
            height: 314.0,
        }
    }
}

impl DesignConfig {
    pub fn aspect_ratio(&self) -> f64 {
        aspect_ratio(&self.view_box, self.width, self.height)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8092,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub surface: SurfaceConfig,

    #[serde(default)]
    pub design: DesignConfig,
}

impl Config {
    /// Read the configuration at `path`, writing the defaults there first if
    /// the file does not exist yet. The result is always validated.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        let config = match std::fs::read_to_string(path) {
            Ok(content) => {
                let config: Config = toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config from {}", path.display()))?;
                tracing::info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let config = Config::default();
                config.save(path)?;
                tracing::info!("Created default configuration at {}", path.display());
                config
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config from {}", path.display()))
            }
        };

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Reject settings the warp surface cannot work with
    pub fn validate(&self) -> Result<()> {
        let surface = &self.surface;
        ensure!(surface.handle_size > 0.0, "handle_size must be positive");
        ensure!(
            surface.handle_hit_area >= surface.handle_size,
            "handle_hit_area ({}) is smaller than handle_size ({})",
            surface.handle_hit_area,
            surface.handle_size
        );
        ensure!(surface.render_scale >= 1.0, "render_scale must be at least 1");

        let ratio = self.design.aspect_ratio();
        ensure!(
            ratio.is_finite() && ratio > 0.0,
            "design {:?} has no usable size (view_box {:?})",
            self.design.name,
            self.design.view_box
        );
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        tracing::debug!("Saved configuration to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8092);
        assert_eq!(config.surface.resize_debounce(), Duration::from_millis(100));
        assert_eq!(config.surface.handle_size, 32.0);
        assert_eq!(config.surface.handle_hit_area, 44.0);
        assert_eq!(config.surface.render_scale, 4.0);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [surface]
            resize_debounce_ms = 250
            handle_size = 24.0
            handle_hit_area = 48.0
            render_scale = 2.0
            "#,
        )
        .unwrap();
        assert_eq!(config.surface.resize_debounce_ms, 250);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.design, DesignConfig::default());
    }

    #[test]
    fn test_design_aspect_ratio() {
        let design = DesignConfig {
            view_box: "0 0 300 100".to_string(),
            ..DesignConfig::default()
        };
        assert_eq!(design.aspect_ratio(), 3.0);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join(format!("bannerwarp-config-{}", std::process::id()));
        let path = dir.join("config.toml");

        let mut config = Config::default();
        config.surface.render_scale = 3.0;
        config.save(&path).unwrap();

        let loaded = Config::load_or_create(&path).unwrap();
        assert_eq!(loaded.surface, config.surface);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_is_created() {
        let dir = std::env::temp_dir().join(format!("bannerwarp-create-{}", std::process::id()));
        let path = dir.join("nested").join("config.toml");

        let config = Config::load_or_create(&path).unwrap();
        assert_eq!(config.surface, SurfaceConfig::default());
        assert!(path.exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut config = Config::default();
        config.surface.handle_hit_area = 20.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.surface.render_scale = 0.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.design.view_box = String::new();
        config.design.height = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = std::env::temp_dir().join(format!("bannerwarp-invalid-{}", std::process::id()));
        let path = dir.join("config.toml");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "[surface]\nhandle_size = 32.0\nhandle_hit_area = 44.0\nresize_debounce_ms = 100\nrender_scale = 0.25\n").unwrap();

        let err = Config::load_or_create(&path).unwrap_err();
        assert!(format!("{err:#}").contains("render_scale"), "{err:#}");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
