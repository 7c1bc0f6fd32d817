//! Configuration management

use crate::speech::backends::linux::LinuxBackend;
use crate::speech::backends::{macos, windows, linux};
use crate::speech::rate::RateMapping;
use crate::speech::SpeakOptions;
use crate::{Result, TalkError};
use ini::Ini;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that points at an alternative config file
pub const CONFIG_ENV: &str = "TALK_CONFIG";

/// Default time allowed for a Linux engine self-test
pub const DEFAULT_SELF_TEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// macOS rate used for Japanese text when none is given
pub const DEFAULT_JAPANESE_RATE: u32 = 200;

/// Default voices for one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceDefaults {
    pub japanese: String,
    pub english: String,
}

impl VoiceDefaults {
    pub fn new(japanese: impl Into<String>, english: impl Into<String>) -> Self {
        Self {
            japanese: japanese.into(),
            english: english.into(),
        }
    }

    /// Default voice for a language class
    pub fn for_language(&self, japanese: bool) -> &str {
        if japanese {
            &self.japanese
        } else {
            &self.english
        }
    }
}

/// Tunables consumed by the voice engines
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub macos_voices: VoiceDefaults,
    pub windows_voices: VoiceDefaults,
    pub linux_voices: VoiceDefaults,

    /// Rate applied to Japanese text on macOS when the caller gives none
    pub japanese_rate: u32,

    pub windows_rate: RateMapping,
    pub spd_rate: RateMapping,

    /// Linux candidate engines in preference order
    pub linux_engines: Vec<LinuxBackend>,

    /// Bound on each Linux engine self-test
    pub self_test_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            macos_voices: VoiceDefaults::new(
                macos::DEFAULT_JAPANESE_VOICE,
                macos::DEFAULT_ENGLISH_VOICE,
            ),
            windows_voices: VoiceDefaults::new(
                windows::DEFAULT_JAPANESE_VOICE,
                windows::DEFAULT_ENGLISH_VOICE,
            ),
            linux_voices: VoiceDefaults::new(
                linux::DEFAULT_JAPANESE_VOICE,
                linux::DEFAULT_ENGLISH_VOICE,
            ),
            japanese_rate: DEFAULT_JAPANESE_RATE,
            windows_rate: RateMapping::WINDOWS,
            spd_rate: RateMapping::SPEECH_DISPATCHER,
            linux_engines: LinuxBackend::ALL.to_vec(),
            self_test_timeout: DEFAULT_SELF_TEST_TIMEOUT,
        }
    }
}

/// User configuration (~/.talk.cfg)
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Config file path
    path: PathBuf,
}

impl Config {
    /// Load configuration from `$TALK_CONFIG` or ~/.talk.cfg
    ///
    /// A missing file yields the built-in defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| TalkError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            debug!("Config file not found, using defaults");
            Self::default_config()
        };

        Ok(Self { ini, path })
    }

    /// Built-in configuration that is not backed by a file
    pub fn defaults() -> Self {
        Self {
            ini: Self::default_config(),
            path: Self::config_path(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| TalkError::Config(format!("Failed to save config: {}", e)))
    }

    /// Resolve the config file location
    fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".talk.cfg")
    }

    /// Expose the config file path for display
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create default configuration
    fn default_config() -> Ini {
        let settings = EngineSettings::default();
        let mut ini = Ini::new();

        ini.with_section(Some("speech")).set("tokenize", "false");

        ini.with_section(Some("voices"))
            .set("macos_japanese", settings.macos_voices.japanese.as_str())
            .set("macos_english", settings.macos_voices.english.as_str())
            .set("windows_japanese", settings.windows_voices.japanese.as_str())
            .set("windows_english", settings.windows_voices.english.as_str())
            .set("linux_japanese", settings.linux_voices.japanese.as_str())
            .set("linux_english", settings.linux_voices.english.as_str());

        ini.with_section(Some("rate"))
            .set("japanese_default", settings.japanese_rate.to_string())
            .set("windows_center", settings.windows_rate.center.to_string())
            .set("windows_step", settings.windows_rate.step.to_string())
            .set("spd_center", settings.spd_rate.center.to_string())
            .set("spd_step", settings.spd_rate.step.to_string());

        let engines = settings
            .linux_engines
            .iter()
            .map(|engine| engine.command())
            .collect::<Vec<_>>()
            .join(", ");
        ini.with_section(Some("linux"))
            .set("engines", engines)
            .set(
                "self_test_timeout_ms",
                settings.self_test_timeout.as_millis().to_string(),
            );

        ini
    }

    /// Get a boolean value from config
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Get a string value from config, treating blank values as unset
    pub fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.ini
            .get_from(Some(section), key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Get an integer value from config
    pub fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Set a value in config
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    /// Preferred voice, if the user pinned one
    pub fn voice(&self) -> Option<String> {
        self.get_string("speech", "voice")
    }

    /// Preferred rate; non-positive values are ignored
    pub fn rate(&self) -> Option<u32> {
        self.get_int("speech", "rate", 0)
            .try_into()
            .ok()
            .filter(|&r: &u32| r > 0)
    }

    /// Speak mixed text token by token by default?
    pub fn tokenize(&self) -> bool {
        self.get_bool("speech", "tokenize", false)
    }

    /// Fill unset fields of `options` from the [speech] section
    pub fn apply_defaults(&self, mut options: SpeakOptions) -> SpeakOptions {
        if options.voice.is_none() {
            options.voice = self.voice();
        }
        if options.rate.is_none() {
            options.rate = self.rate();
        }
        options.tokenize = options.tokenize || self.tokenize();
        options
    }

    /// Build engine tunables, keeping defaults for anything unset or invalid
    pub fn engine_settings(&self) -> EngineSettings {
        let mut settings = EngineSettings::default();

        let voices = |defaults: &mut VoiceDefaults, prefix: &str| {
            if let Some(v) = self.get_string("voices", &format!("{}_japanese", prefix)) {
                defaults.japanese = v;
            }
            if let Some(v) = self.get_string("voices", &format!("{}_english", prefix)) {
                defaults.english = v;
            }
        };
        voices(&mut settings.macos_voices, "macos");
        voices(&mut settings.windows_voices, "windows");
        voices(&mut settings.linux_voices, "linux");

        if let Ok(rate) = u32::try_from(self.get_int("rate", "japanese_default", 0)) {
            if rate > 0 {
                settings.japanese_rate = rate;
            }
        }

        settings.windows_rate.center =
            self.get_int("rate", "windows_center", settings.windows_rate.center);
        settings.windows_rate.step = self.positive_step("windows_step", settings.windows_rate.step);
        settings.spd_rate.center = self.get_int("rate", "spd_center", settings.spd_rate.center);
        settings.spd_rate.step = self.positive_step("spd_step", settings.spd_rate.step);

        if let Some(list) = self.get_string("linux", "engines") {
            let engines = Self::parse_engines(&list);
            if engines.is_empty() {
                warn!("No known engines in [linux] engines = {}, using defaults", list);
            } else {
                settings.linux_engines = engines;
            }
        }

        let timeout = self.get_int(
            "linux",
            "self_test_timeout_ms",
            settings.self_test_timeout.as_millis() as i64,
        );
        if let Ok(ms) = u64::try_from(timeout) {
            if ms > 0 {
                settings.self_test_timeout = Duration::from_millis(ms);
            }
        }

        settings
    }

    fn positive_step(&self, key: &str, default: i64) -> i64 {
        match self.get_int("rate", key, default) {
            step if step > 0 => step,
            step => {
                warn!("Ignoring non-positive rate step {} = {}", key, step);
                default
            }
        }
    }

    fn parse_engines(list: &str) -> Vec<LinuxBackend> {
        let mut engines = Vec::new();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match LinuxBackend::from_command(name) {
                Some(engine) if !engines.contains(&engine) => engines.push(engine),
                Some(_) => {}
                None => warn!("Unknown Linux speech engine in config: {}", name),
            }
        }
        engines
    }
}
