//! macOS backend using the `say` command
//!
//! Text is written to `say` on stdin; voice and rate go in as separate
//! arguments. Rates are passed through unchanged (words per minute).

use crate::config::{EngineSettings, VoiceDefaults};
use crate::platform::Platform;
use crate::speech::runner::{CommandRunner, Invocation};
use crate::speech::{Voice, VoiceEngine};
use crate::{Result, TalkError};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

pub const DEFAULT_JAPANESE_VOICE: &str = "Kyoko";
pub const DEFAULT_ENGLISH_VOICE: &str = "Samantha";

const SAY: &str = "say";

/// `<name...> <ll_CC> # <sample text>`; the name may contain spaces and parentheses
static VOICE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s+([a-z]{2}_[A-Z]{2})\s+#\s*(.*)$").expect("valid regex"));

/// Names and tags that identify Japanese voices
const JAPANESE_NAMES: &[&str] = &["kyoko", "otoya", "kyoto"];
static JAPANESE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(日本語|ja_JP").expect("valid regex"));

/// macOS speech through `say`
pub struct MacOsEngine {
    runner: Arc<dyn CommandRunner>,
    voices: VoiceDefaults,
    japanese_rate: u32,
    initialized: bool,
    available_voices: Vec<Voice>,
}

impl MacOsEngine {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: &EngineSettings) -> Self {
        Self {
            runner,
            voices: settings.macos_voices.clone(),
            japanese_rate: settings.japanese_rate,
            initialized: false,
            available_voices: Vec::new(),
        }
    }

    /// Parse `say -v ?` output into voice descriptors
    pub fn parse_voices(output: &str) -> Vec<Voice> {
        output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let caps = VOICE_LINE.captures(line.trim_end())?;
                let mut voice = Voice::new(caps[1].trim(), Platform::MacOs).with_lang(&caps[2]);
                let sample = caps[3].trim();
                if !sample.is_empty() {
                    voice = voice.with_description(sample);
                }
                Some(voice)
            })
            .collect()
    }

    /// Build the `say` invocation for one utterance
    pub fn build_invocation(&self, text: &str, voice: &str, rate: Option<u32>, japanese: bool) -> Invocation {
        let rate = match rate {
            Some(rate) => Some(rate),
            None if japanese => Some(self.japanese_rate),
            None => None,
        };

        let mut invocation = Invocation::new(SAY).args(["-v", voice]);
        if let Some(rate) = rate {
            invocation = invocation.arg("-r").arg(rate.to_string());
        }
        invocation.stdin(text)
    }
}

impl VoiceEngine for MacOsEngine {
    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        if !self.check_availability() {
            self.show_install_instructions();
            return Err(TalkError::EngineUnavailable(
                "say command is not available on this macOS system".to_string(),
            ));
        }

        self.available_voices = self.available_voices();
        info!("macOS say ready with {} voices", self.available_voices.len());
        self.initialized = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn check_availability(&mut self) -> bool {
        self.runner.is_on_path(SAY)
    }

    fn available_voices(&mut self) -> Vec<Voice> {
        let invocation = Invocation::new(SAY).args(["-v", "?"]);
        match self
            .runner
            .run(&invocation)
            .and_then(|output| output.into_result(&invocation))
        {
            Ok(output) => Self::parse_voices(&output.stdout),
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
        let lower = voice.name.to_lowercase();
        JAPANESE_NAMES.contains(&lower.as_str())
            || JAPANESE_TAG.is_match(&voice.name)
            || voice.lang.as_deref().map_or(false, |lang| JAPANESE_TAG.is_match(lang))
    }

    fn default_japanese_voice(&self) -> &str {
        &self.voices.japanese
    }

    fn default_english_voice(&self) -> &str {
        &self.voices.english
    }

    fn synthesize(&mut self, text: &str, voice: &str, rate: Option<u32>, japanese: bool) -> Result<()> {
        let invocation = self.build_invocation(text, voice, rate, japanese);
        debug!("Speaking with: {}", invocation.display());

        self.runner
            .run(&invocation)
            .and_then(|output| output.into_result(&invocation))
            .map(|_| ())
            .map_err(|e| TalkError::synthesis(self.platform(), e))
    }

    fn install_instructions(&self) -> String {
        [
            "The say command ships with macOS.",
            "If it cannot be found, update macOS to the latest version.",
        ]
        .join("\n")
    }
}
