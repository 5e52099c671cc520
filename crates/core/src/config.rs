use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Settings;

/// Configuration manager for controller settings
/// Provides a layered configuration system that separates schema, available options, and persisted
/// values. Configuration is stored in settings.json in the working directory by default
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

/// Available configuration options with validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub general: GeneralConfigSchema,
    pub midi: MidiConfigSchema,
    pub performance: PerformanceConfigSchema,
    pub timing: TimingConfigSchema,
    pub sequencer: SequencerConfigSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfigSchema {
    pub target_frame_rate: ConfigOption<u32>,
    pub use_push2_display: ConfigOption<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiConfigSchema {
    pub midi_in_channel: ConfigOption<i8>,
    pub midi_out_channel: ConfigOption<u8>,
    pub pyramidi_channel: ConfigOption<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfigSchema {
    pub root_midi_note: ConfigOption<u8>,
    pub use_poly_at: ConfigOption<bool>,
    pub channel_at_range_start: ConfigOption<u16>,
    pub channel_at_range_end: ConfigOption<u16>,
    pub poly_at_max_range: ConfigOption<u8>,
    pub poly_at_curve_bending: ConfigOption<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfigSchema {
    pub track_select_quick_press_ms: ConfigOption<u64>,
    pub pad_quick_press_ms: ConfigOption<u64>,
    pub preset_quick_press_ms: ConfigOption<u64>,
    pub settings_quick_press_ms: ConfigOption<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencerConfigSchema {
    pub send_port: ConfigOption<u16>,
    pub receive_port: ConfigOption<u16>,
    pub transport_poll_hz: ConfigOption<u32>,
    pub tracks_poll_hz: ConfigOption<u32>,
}

/// Configuration option with validation and available choices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption<T> {
    pub default: T,
    pub valid_range: Option<(T, T)>,
    pub valid_choices: Option<Vec<T>>,
    pub description: String,
    pub requires_restart: bool,
}

impl<T> ConfigOption<T> {
    fn ranged(default: T, min: T, max: T, description: &str, requires_restart: bool) -> Self {
        Self {
            default,
            valid_range: Some((min, max)),
            valid_choices: None,
            description: description.to_string(),
            requires_restart,
        }
    }

    fn flag(default: T, description: &str, requires_restart: bool) -> Self {
        Self {
            default,
            valid_range: None,
            valid_choices: None,
            description: description.to_string(),
            requires_restart,
        }
    }
}

impl<T: PartialOrd + Copy + std::fmt::Display> ConfigOption<T> {
    /// Push a message onto `errors` when `value` is outside the valid range.
    fn check(&self, name: &str, value: T, errors: &mut Vec<String>) {
        if let Some((min, max)) = self.valid_range {
            if value < min || value > max {
                errors.push(format!("{} must be between {} and {}", name, min, max));
            }
        }
    }
}

/// Persisted configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    pub settings: Settings,
    pub created_at: String,
    pub modified_at: String,
}

impl ConfigManager {
    /// Create a new configuration manager
    /// If no path is provided, defaults to 'settings.json' in the current working directory
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from("settings.json"));

        Self {
            config_path,
            settings: Settings::default(),
        }
    }

    /// Load settings from configuration file
    /// Writes and returns default settings if the file doesn't exist
    pub fn load(&mut self) -> Result<Settings, ConfigError> {
        if !self.config_path.exists() {
            log::info!(
                "No settings file at {}, writing defaults",
                self.config_path.display()
            );
            self.save()?;
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::Read(e.to_string()))?;

        let config_file: ConfigFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        // Validate version compatibility
        if config_file.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "Settings file version {} doesn't match application version {}. Using defaults for new settings.",
                config_file.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        if let Err(errors) = Self::validate_settings(&config_file.settings) {
            for error in &errors {
                log::warn!("Invalid setting in {}: {}", self.config_path.display(), error);
            }
        }

        self.settings = config_file.settings;
        log::info!("Loaded settings from {}", self.config_path.display());
        Ok(self.settings.clone())
    }

    /// Save current settings to configuration file
    pub fn save(&self) -> Result<(), ConfigError> {
        // Ensure config directory exists (if config is in a subdirectory)
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::Write(e.to_string()))?;
            }
        }

        let now = chrono::Utc::now().to_rfc3339();
        let created_at = self.existing_created_at().unwrap_or_else(|| now.clone());

        let config_file = ConfigFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: self.settings.clone(),
            created_at,
            modified_at: now,
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(&self.config_path, content).map_err(|e| ConfigError::Write(e.to_string()))?;

        log::info!("Saved settings to {}", self.config_path.display());
        Ok(())
    }

    fn existing_created_at(&self) -> Option<String> {
        let content = fs::read_to_string(&self.config_path).ok()?;
        let config_file: ConfigFile = serde_json::from_str(&content).ok()?;
        Some(config_file.created_at)
    }

    /// Update settings and save to file
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), ConfigError> {
        Self::validate_settings(&settings).map_err(ConfigError::Validation)?;
        self.settings = settings;
        self.save()
    }

    /// Get current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get configuration schema with available options
    pub fn schema() -> ConfigSchema {
        ConfigSchema {
            general: GeneralConfigSchema {
                target_frame_rate: ConfigOption::ranged(
                    60,
                    10,
                    120,
                    "Main loop refresh rate in frames per second",
                    false,
                ),
                use_push2_display: ConfigOption::flag(
                    true,
                    "Compose and show the display contents",
                    false,
                ),
            },
            midi: MidiConfigSchema {
                midi_in_channel: ConfigOption::ranged(
                    -1,
                    -1,
                    15,
                    "MIDI input channel (0-15), -1 for all channels",
                    false,
                ),
                midi_out_channel: ConfigOption::ranged(
                    0,
                    0,
                    15,
                    "MIDI output channel (0-15)",
                    false,
                ),
                pyramidi_channel: ConfigOption::ranged(
                    15,
                    0,
                    15,
                    "Reserved channel for step sequencer track select/mute (0-15)",
                    false,
                ),
            },
            performance: PerformanceConfigSchema {
                root_midi_note: ConfigOption::ranged(
                    64,
                    0,
                    127,
                    "MIDI note of the bottom-left pad in the melodic layout",
                    false,
                ),
                use_poly_at: ConfigOption::flag(
                    true,
                    "Use polyphonic aftertouch instead of channel aftertouch",
                    false,
                ),
                channel_at_range_start: ConfigOption::ranged(
                    401,
                    401,
                    1999,
                    "Lowest pad pressure reported as channel aftertouch",
                    false,
                ),
                channel_at_range_end: ConfigOption::ranged(
                    800,
                    402,
                    2000,
                    "Pad pressure reported as full channel aftertouch",
                    false,
                ),
                poly_at_max_range: ConfigOption::ranged(
                    40,
                    1,
                    127,
                    "Pressure steps covered by the polyphonic aftertouch curve",
                    false,
                ),
                poly_at_curve_bending: ConfigOption::ranged(
                    50,
                    0,
                    100,
                    "Bending of the polyphonic aftertouch curve",
                    false,
                ),
            },
            timing: TimingConfigSchema {
                track_select_quick_press_ms: ConfigOption::ranged(
                    400,
                    50,
                    2000,
                    "Longest press of a track button still counted as a tap",
                    false,
                ),
                pad_quick_press_ms: ConfigOption::ranged(
                    400,
                    50,
                    2000,
                    "Longest pad press still counted as a tap",
                    false,
                ),
                preset_quick_press_ms: ConfigOption::ranged(
                    400,
                    50,
                    2000,
                    "Longest preset pad press still counted as a tap",
                    false,
                ),
                settings_quick_press_ms: ConfigOption::ranged(
                    200,
                    50,
                    2000,
                    "Longest settings button press still counted as a tap",
                    false,
                ),
            },
            sequencer: SequencerConfigSchema {
                send_port: ConfigOption::ranged(
                    9003,
                    1024,
                    65535,
                    "UDP port the clip sequencer listens on",
                    true,
                ),
                receive_port: ConfigOption::ranged(
                    9004,
                    1024,
                    65535,
                    "UDP port state replies arrive on",
                    true,
                ),
                transport_poll_hz: ConfigOption::ranged(
                    10,
                    1,
                    60,
                    "Transport state requests per second",
                    true,
                ),
                tracks_poll_hz: ConfigOption::ranged(
                    4,
                    1,
                    60,
                    "Clip grid state requests per second",
                    true,
                ),
            },
        }
    }

    /// Validate settings against schema
    pub fn validate_settings(settings: &Settings) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let schema = Self::schema();

        // Validate general settings
        schema.general.target_frame_rate.check(
            "target_frame_rate",
            settings.target_frame_rate,
            &mut errors,
        );

        // Validate MIDI settings
        schema
            .midi
            .midi_in_channel
            .check("midi_in_channel", settings.midi_in_channel, &mut errors);
        schema
            .midi
            .midi_out_channel
            .check("midi_out_channel", settings.midi_out_channel, &mut errors);
        schema
            .midi
            .pyramidi_channel
            .check("pyramidi_channel", settings.pyramidi_channel, &mut errors);

        // Validate performance settings
        let performance = &schema.performance;
        performance
            .root_midi_note
            .check("root_midi_note", settings.root_midi_note, &mut errors);
        performance.channel_at_range_start.check(
            "channel_at_range_start",
            settings.channel_at_range_start,
            &mut errors,
        );
        performance.channel_at_range_end.check(
            "channel_at_range_end",
            settings.channel_at_range_end,
            &mut errors,
        );
        if settings.channel_at_range_start >= settings.channel_at_range_end {
            errors.push("channel_at_range_start must be below channel_at_range_end".to_string());
        }
        performance
            .poly_at_max_range
            .check("poly_at_max_range", settings.poly_at_max_range, &mut errors);
        performance.poly_at_curve_bending.check(
            "poly_at_curve_bending",
            settings.poly_at_curve_bending,
            &mut errors,
        );

        // Validate timing settings
        let timing = &schema.timing;
        timing.track_select_quick_press_ms.check(
            "track_select_quick_press_ms",
            settings.track_select_quick_press_ms,
            &mut errors,
        );
        timing
            .pad_quick_press_ms
            .check("pad_quick_press_ms", settings.pad_quick_press_ms, &mut errors);
        timing.preset_quick_press_ms.check(
            "preset_quick_press_ms",
            settings.preset_quick_press_ms,
            &mut errors,
        );
        timing.settings_quick_press_ms.check(
            "settings_quick_press_ms",
            settings.settings_quick_press_ms,
            &mut errors,
        );

        // Validate sequencer settings
        let sequencer = &schema.sequencer;
        sequencer
            .send_port
            .check("sequencer.send_port", settings.sequencer.send_port, &mut errors);
        sequencer.receive_port.check(
            "sequencer.receive_port",
            settings.sequencer.receive_port,
            &mut errors,
        );
        sequencer.transport_poll_hz.check(
            "sequencer.transport_poll_hz",
            settings.sequencer.transport_poll_hz,
            &mut errors,
        );
        sequencer.tracks_poll_hz.check(
            "sequencer.tracks_poll_hz",
            settings.sequencer.tracks_poll_hz,
            &mut errors,
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Reset settings to defaults
    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.settings = Settings::default();
        self.save()
    }
}

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(String),
    #[error("Failed to write config file: {0}")]
    Write(String),
    #[error("Failed to parse config file: {0}")]
    Parse(String),
    #[error("Failed to serialize config: {0}")]
    Serialize(String),
    #[error("Config validation errors: {}", .0.join(", "))]
    Validation(Vec<String>),
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_config_manager_new() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_settings.json");

        let manager = ConfigManager::new(Some(config_path.clone()));
        assert_eq!(manager.config_path(), config_path);
        assert_eq!(manager.settings(), &Settings::default());
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.json");

        let mut manager = ConfigManager::new(Some(config_path.clone()));
        let settings = manager.load().unwrap();

        assert_eq!(settings, Settings::default());
        assert!(config_path.exists());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_settings.json");

        let mut manager = ConfigManager::new(Some(config_path.clone()));

        // Modify settings
        let mut settings = Settings::default();
        settings.target_frame_rate = 90;
        settings.midi_out_device = Some("Test Synth".to_string());
        settings.pyramidi_channel = 3;

        // Save settings
        manager.update_settings(settings.clone()).unwrap();

        // Load into new manager
        let mut manager2 = ConfigManager::new(Some(config_path));
        let loaded_settings = manager2.load().unwrap();

        assert_eq!(loaded_settings.target_frame_rate, 90);
        assert_eq!(loaded_settings.midi_out_device.as_deref(), Some("Test Synth"));
        assert_eq!(loaded_settings.pyramidi_channel, 3);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.json");
        fs::write(
            &config_path,
            r#"{"version":"0.0.1","settings":{"root_midi_note":48},"created_at":"","modified_at":""}"#,
        )
        .unwrap();

        let mut manager = ConfigManager::new(Some(config_path));
        let settings = manager.load().unwrap();

        assert_eq!(settings.root_midi_note, 48);
        assert_eq!(settings.sequencer.send_port, 9003);
        assert_eq!(settings.midi_in_channel, -1);
    }

    #[test]
    fn test_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.json");
        fs::write(&config_path, "{ not json").unwrap();

        let mut manager = ConfigManager::new(Some(config_path));
        assert!(matches!(manager.load(), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();

        // Valid settings should pass
        assert!(ConfigManager::validate_settings(&settings).is_ok());

        // Invalid settings should fail
        settings.target_frame_rate = 200; // Outside valid range
        assert!(ConfigManager::validate_settings(&settings).is_err());

        settings.target_frame_rate = 60; // Back to valid
        settings.midi_out_channel = 16;
        settings.channel_at_range_start = 900;
        let errors = ConfigManager::validate_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_update_rejects_invalid_settings() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = ConfigManager::new(Some(temp_dir.path().join("settings.json")));

        let mut settings = Settings::default();
        settings.midi_in_channel = 16;

        assert!(matches!(
            manager.update_settings(settings),
            Err(ConfigError::Validation(_))
        ));
        assert_eq!(manager.settings(), &Settings::default());
    }

    #[test]
    fn test_schema_completeness() {
        let schema = ConfigManager::schema();

        // Ensure all settings have corresponding schema entries
        assert!(schema.general.target_frame_rate.default > 0);
        assert!(schema.midi.midi_in_channel.valid_range.is_some());
        assert!(!schema.performance.root_midi_note.description.is_empty());
        assert!(schema.sequencer.receive_port.requires_restart);
    }
}
