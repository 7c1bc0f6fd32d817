//! Linux backend over command line speech engines
//!
//! No single facility is guaranteed on Linux, so initialization walks an
//! ordered candidate list and adopts the first engine that is both on PATH
//! and passes a quick self-test. An installed engine whose self-test fails
//! is skipped like a missing one.
//!
//! Supported engines:
//! - espeak-ng (multilingual, Japanese capable)
//! - espeak (espeak-ng's predecessor)
//! - festival (English only in practice)
//! - spd-say (speech-dispatcher client)

use crate::config::{EngineSettings, VoiceDefaults};
use crate::platform::{LinuxDistribution, Platform};
use crate::speech::rate::RateMapping;
use crate::speech::runner::{CommandRunner, Invocation};
use crate::speech::{Voice, VoiceEngine};
use crate::{Result, TalkError};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_JAPANESE_VOICE: &str = "ja";
pub const DEFAULT_ENGLISH_VOICE: &str = "en";

static JAPANESE_VOICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)ja|japanese|japan|jp|日本語").expect("valid regex"));

/// A command line speech engine we know how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinuxBackend {
    EspeakNg,
    Espeak,
    Festival,
    SpeechDispatcher,
}

impl LinuxBackend {
    /// Default detection order
    pub const ALL: [LinuxBackend; 4] = [
        LinuxBackend::EspeakNg,
        LinuxBackend::Espeak,
        LinuxBackend::Festival,
        LinuxBackend::SpeechDispatcher,
    ];

    /// Executable name
    pub fn command(&self) -> &'static str {
        match self {
            LinuxBackend::EspeakNg => "espeak-ng",
            LinuxBackend::Espeak => "espeak",
            LinuxBackend::Festival => "festival",
            LinuxBackend::SpeechDispatcher => "spd-say",
        }
    }

    /// Distribution package providing the executable
    pub fn package(&self) -> &'static str {
        match self {
            LinuxBackend::SpeechDispatcher => "speech-dispatcher",
            other => other.command(),
        }
    }

    /// 1 is most preferred
    pub fn priority(&self) -> u8 {
        match self {
            LinuxBackend::EspeakNg => 1,
            LinuxBackend::Espeak => 2,
            LinuxBackend::Festival => 3,
            LinuxBackend::SpeechDispatcher => 4,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            LinuxBackend::EspeakNg => "Lightweight and multilingual, Japanese included",
            LinuxBackend::Espeak => "Older version of espeak-ng, stable",
            LinuxBackend::Festival => "High quality synthesis, strongest in English",
            LinuxBackend::SpeechDispatcher => "Integrated speech system for accessibility",
        }
    }

    /// Arguments for a cheap "does it actually run" check
    pub fn self_test_args(&self) -> &'static [&'static str] {
        match self {
            LinuxBackend::EspeakNg | LinuxBackend::Espeak => &["--voices"],
            LinuxBackend::Festival | LinuxBackend::SpeechDispatcher => &["--help"],
        }
    }

    pub fn from_command(command: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|engine| engine.command() == command)
    }
}

impl fmt::Display for LinuxBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// Linux speech through the first working command line engine
pub struct LinuxEngine {
    runner: Arc<dyn CommandRunner>,
    voices: VoiceDefaults,
    spd_rate: RateMapping,
    candidates: Vec<LinuxBackend>,
    self_test_timeout: Duration,
    active: Option<LinuxBackend>,
    initialized: bool,
    available_voices: Vec<Voice>,
}

impl LinuxEngine {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: &EngineSettings) -> Self {
        Self {
            runner,
            voices: settings.linux_voices.clone(),
            spd_rate: settings.spd_rate,
            candidates: settings.linux_engines.clone(),
            self_test_timeout: settings.self_test_timeout,
            active: None,
            initialized: false,
            available_voices: Vec::new(),
        }
    }

    /// The engine adopted by detection, if any
    pub fn active_engine(&self) -> Option<LinuxBackend> {
        self.active
    }

    /// Candidate engines in detection order
    pub fn candidates(&self) -> &[LinuxBackend] {
        &self.candidates
    }

    /// Scan candidates in order and adopt the first one that works
    pub fn detect_engine(&mut self) -> Option<LinuxBackend> {
        self.active = self
            .candidates
            .iter()
            .copied()
            .find(|engine| self.self_test(*engine));

        if let Some(engine) = self.active {
            info!("Using speech engine {}", engine);
        }
        self.active
    }

    fn self_test(&self, engine: LinuxBackend) -> bool {
        if !self.runner.is_on_path(engine.command()) {
            debug!("{} not found on PATH", engine);
            return false;
        }

        let invocation = Invocation::new(engine.command())
            .args(engine.self_test_args().iter().copied())
            .timeout(self.self_test_timeout);

        match self
            .runner
            .run(&invocation)
            .and_then(|output| output.into_result(&invocation))
        {
            Ok(_) => true,
            Err(e) => {
                info!("{} is installed but not working: {}", engine, e);
                false
            }
        }
    }

    fn active_or_err(&self) -> Result<LinuxBackend> {
        self.active
            .ok_or_else(|| TalkError::EngineUnavailable("No speech engine available".to_string()))
    }

    /// Build the invocation for one utterance on the active engine
    pub fn build_invocation(
        &self,
        engine: LinuxBackend,
        text: &str,
        voice: &str,
        rate: Option<u32>,
        japanese: bool,
    ) -> Invocation {
        match engine {
            LinuxBackend::EspeakNg | LinuxBackend::Espeak => {
                let mut invocation = Invocation::new(engine.command()).args(["-v", voice]);
                if let Some(rate) = rate {
                    // espeak speed is words per minute already
                    invocation = invocation.arg("-s").arg(rate.to_string());
                }
                invocation.arg("--stdin").stdin(text)
            }
            LinuxBackend::Festival => {
                if japanese {
                    warn!("festival has limited Japanese support");
                }
                if rate.is_some() {
                    debug!("festival ignores the rate option");
                }
                Invocation::new(engine.command()).arg("--tts").stdin(text)
            }
            LinuxBackend::SpeechDispatcher => {
                let mut invocation = Invocation::new(engine.command()).arg("-w");
                if voice == self.default_voice(japanese) {
                    invocation = invocation.arg("-l").arg(voice);
                } else {
                    invocation = invocation.arg("-o").arg(voice);
                }
                if let Some(rate) = rate {
                    invocation = invocation.arg("-r").arg(self.spd_rate.map(rate).to_string());
                }
                invocation.arg("--").arg(text)
            }
        }
    }

    /// Parse `espeak --voices` output
    ///
    /// Columns: Pty, Language, Age/Gender, VoiceName, File, Other languages.
    /// The language code is what `-v` accepts, so it becomes the voice name.
    pub fn parse_espeak_voices(output: &str, engine: LinuxBackend) -> Vec<Voice> {
        output
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with("Pty"))
            .filter_map(|line| {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() < 4 {
                    return None;
                }
                let mut voice = Voice::new(parts[1], Platform::Linux)
                    .with_lang(parts[1])
                    .with_description(parts[3..].join(" "))
                    .with_engine(engine.command());
                if let Some(gender) = parts[2].rsplit('/').next().filter(|g| *g != "-" && *g != "--") {
                    voice = voice.with_gender(gender);
                }
                Some(voice)
            })
            .collect()
    }

    /// Parse `spd-say -O` output (one output module per line)
    pub fn parse_spd_voices(output: &str) -> Vec<Voice> {
        output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.eq_ignore_ascii_case("output modules"))
            .map(|name| {
                Voice::new(name, Platform::Linux)
                    .with_lang("unknown")
                    .with_description(format!("Speech Dispatcher voice: {}", name))
                    .with_engine(LinuxBackend::SpeechDispatcher.command())
            })
            .collect()
    }

    /// festival's voice list is not worth parsing; offer the common ones
    pub fn festival_voices() -> Vec<Voice> {
        let festival = LinuxBackend::Festival.command();
        [
            ("default", "en", "Default English voice"),
            ("us1", "en_US", "US English male"),
            ("us2", "en_US", "US English female"),
            ("us3", "en_US", "US English male"),
        ]
        .into_iter()
        .map(|(name, lang, description)| {
            Voice::new(name, Platform::Linux)
                .with_lang(lang)
                .with_description(description)
                .with_engine(festival)
        })
        .collect()
    }

    fn spd_fallback_voices() -> Vec<Voice> {
        vec![Voice::new("default", Platform::Linux)
            .with_lang("en")
            .with_description("Default voice")
            .with_engine(LinuxBackend::SpeechDispatcher.command())]
    }

    fn list_voices(&self, engine: LinuxBackend) -> std::io::Result<Vec<Voice>> {
        match engine {
            LinuxBackend::EspeakNg | LinuxBackend::Espeak => {
                let invocation = Invocation::new(engine.command()).arg("--voices");
                let output = self.runner.run(&invocation)?.into_result(&invocation)?;
                Ok(Self::parse_espeak_voices(&output.stdout, engine))
            }
            LinuxBackend::Festival => Ok(Self::festival_voices()),
            LinuxBackend::SpeechDispatcher => {
                let invocation = Invocation::new(engine.command()).arg("-O");
                let voices = self
                    .runner
                    .run(&invocation)
                    .and_then(|output| output.into_result(&invocation))
                    .map(|output| Self::parse_spd_voices(&output.stdout))
                    .unwrap_or_default();
                if voices.is_empty() {
                    Ok(Self::spd_fallback_voices())
                } else {
                    Ok(voices)
                }
            }
        }
    }

    /// Install guidance for a given distribution family
    pub fn install_instructions_for(&self, distro: LinuxDistribution) -> String {
        let mut lines =
            vec!["No speech synthesis engine found. Install one of the following:".to_string()];
        lines.push(String::new());

        for (index, engine) in self.candidates.iter().enumerate() {
            lines.push(format!(
                "{}. {} (recommended: {}/4)",
                index + 1,
                engine.package(),
                5 - engine.priority()
            ));
            lines.push(format!("   {}", engine.description()));
            lines.push(format!("   {}", distro.install_command(engine.package())));
            lines.push(String::new());
        }

        lines.push("Run talk again after installing.".to_string());
        lines.push(String::new());
        lines.push(
            "Note: Japanese voices may need an additional language package.".to_string(),
        );
        lines.join("\n")
    }
}

impl VoiceEngine for LinuxEngine {
    fn platform(&self) -> Platform {
        Platform::Linux
    }

    fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        if self.detect_engine().is_none() {
            self.show_install_instructions();
            return Err(TalkError::EngineUnavailable(
                "No speech synthesis engine found. Please install one of the supported engines."
                    .to_string(),
            ));
        }

        self.available_voices = self.available_voices();
        self.initialized = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn check_availability(&mut self) -> bool {
        self.detect_engine().is_some()
    }

    fn available_voices(&mut self) -> Vec<Voice> {
        let Some(engine) = self.active else {
            return Vec::new();
        };
        match self.list_voices(engine) {
            Ok(voices) => voices,
            Err(e) => {
                warn!("Failed to list voices: {}", e);
                Vec::new()
            }
        }
    }

    fn cached_voices(&self) -> &[Voice] {
        &self.available_voices
    }

    fn matches_japanese_voice(&self, voice: &Voice) -> bool {
        JAPANESE_VOICE.is_match(&voice.name)
            || voice.lang.as_deref().map_or(false, |lang| JAPANESE_VOICE.is_match(lang))
    }

    fn default_japanese_voice(&self) -> &str {
        &self.voices.japanese
    }

    fn default_english_voice(&self) -> &str {
        &self.voices.english
    }

    fn synthesize(&mut self, text: &str, voice: &str, rate: Option<u32>, japanese: bool) -> Result<()> {
        let engine = self.active_or_err()?;
        let invocation = self.build_invocation(engine, text, voice, rate, japanese);
        debug!("Speaking with: {}", invocation.display());

        self.runner
            .run(&invocation)
            .and_then(|output| output.into_result(&invocation))
            .map(|_| ())
            .map_err(|e| TalkError::synthesis(self.platform(), e))
    }

    fn install_instructions(&self) -> String {
        self.install_instructions_for(LinuxDistribution::detect())
    }
}
