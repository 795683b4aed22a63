//! Loader configuration resource.
//!
//! Settings for a session's load pipeline, read from an INI file. Defaults
//! are safe to start with when the file is missing.
//!
//! # Configuration File Format
//!
//! ```ini
//! [assets]
//! manifest = assets/resources.json
//! base_path = .
//!
//! [loader]
//! workers = 4
//!
//! [audio]
//! autoplay_locked = false
//!
//! [simulation]
//! target_fps = 60
//! ```

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

use crate::resources::loadpipeline::DEFAULT_WORKERS;

/// Default safe values for startup
const DEFAULT_MANIFEST: &str = "assets/resources.json";
const DEFAULT_BASE_PATH: &str = ".";
const DEFAULT_AUTOPLAY_LOCKED: bool = false;
const DEFAULT_TARGET_FPS: u32 = 60;
const DEFAULT_CONFIG_PATH: &str = "./config.ini";

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Manifest URL or path.
    pub manifest: String,
    /// Directory that relative file paths are read from.
    pub base_path: PathBuf,
    /// Loader threads.
    pub workers: usize,
    /// Start with the audio host refusing playback until unlocked.
    pub autoplay_locked: bool,
    /// Tick rate for headless runs.
    pub target_fps: u32,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LoaderConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            manifest: DEFAULT_MANIFEST.to_string(),
            base_path: PathBuf::from(DEFAULT_BASE_PATH),
            workers: DEFAULT_WORKERS,
            autoplay_locked: DEFAULT_AUTOPLAY_LOCKED,
            target_fps: DEFAULT_TARGET_FPS,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;

        // [assets] section
        if let Some(manifest) = config.get("assets", "manifest") {
            self.manifest = manifest;
        }
        if let Some(base_path) = config.get("assets", "base_path") {
            self.base_path = PathBuf::from(base_path);
        }

        // [loader] section
        if let Some(workers) = config.getuint("loader", "workers").ok().flatten() {
            self.workers = (workers as usize).max(1);
        }

        // [audio] section
        if let Some(locked) = config.getbool("audio", "autoplay_locked").ok().flatten() {
            self.autoplay_locked = locked;
        }

        // [simulation] section
        if let Some(fps) = config.getuint("simulation", "target_fps").ok().flatten() {
            self.target_fps = (fps as u32).max(1);
        }

        info!(
            "Loaded config: manifest='{}', base_path={:?}, workers={}, autoplay_locked={}, fps={}",
            self.manifest, self.base_path, self.workers, self.autoplay_locked, self.target_fps
        );

        Ok(())
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        config.set("assets", "manifest", Some(self.manifest.clone()));
        config.set(
            "assets",
            "base_path",
            Some(self.base_path.to_string_lossy().to_string()),
        );
        config.set("loader", "workers", Some(self.workers.to_string()));
        config.set(
            "audio",
            "autoplay_locked",
            Some(self.autoplay_locked.to_string()),
        );
        config.set("simulation", "target_fps", Some(self.target_fps.to_string()));

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }

    /// Seconds per simulated tick.
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.target_fps.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_error_and_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LoaderConfig::with_path(dir.path().join("absent.ini"));
        assert!(config.load_from_file().is_err());
        assert_eq!(config.manifest, DEFAULT_MANIFEST);
        assert_eq!(config.workers, DEFAULT_WORKERS);
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[loader]\nworkers = 2\n\n[audio]\nautoplay_locked = true\n").unwrap();

        let mut config = LoaderConfig::with_path(&path);
        config.load_from_file().unwrap();
        assert_eq!(config.workers, 2);
        assert!(config.autoplay_locked);
        assert_eq!(config.manifest, DEFAULT_MANIFEST);
        assert_eq!(config.target_fps, DEFAULT_TARGET_FPS);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        let mut saved = LoaderConfig::with_path(&path);
        saved.manifest = "http://example.com/game/resources.json".to_string();
        saved.workers = 8;
        saved.target_fps = 30;
        saved.save_to_file().unwrap();

        let mut loaded = LoaderConfig::with_path(&path);
        loaded.load_from_file().unwrap();
        assert_eq!(loaded, saved);
        assert!((loaded.tick_seconds() - 1.0 / 30.0).abs() < 1e-6);
    }
}
