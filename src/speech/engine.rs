//! Voice engine abstraction
//!
//! Each platform wraps a different native speech command behind the same
//! contract. The trait's provided methods hold the language-aware voice
//! resolution so every platform substitutes defaults the same way; a
//! platform only supplies detection, voice listing and the final command.

use crate::platform::Platform;
use crate::tokenizer::{is_japanese_script, Token};
use crate::Result;
use log::{debug, warn};
use serde::Serialize;

/// Options for a speech request, passed through unchanged to the engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeakOptions {
    /// Pinned voice; replaced by a default when unavailable or of the other language
    pub voice: Option<String>,
    /// Words-per-minute style rate, remapped per engine
    pub rate: Option<u32>,
    /// Split mixed Japanese/English text and speak each run separately
    pub tokenize: bool,
}

impl SpeakOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_rate(mut self, rate: u32) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn tokenized(mut self, tokenize: bool) -> Self {
        self.tokenize = tokenize;
        self
    }
}

/// Normalized description of one native voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Voice {
    pub name: String,
    /// Locale or language tag as reported by the engine, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Backend that reported the voice (Linux only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    pub platform: Platform,
}

impl Voice {
    pub fn new(name: impl Into<String>, platform: Platform) -> Self {
        Self {
            name: name.into(),
            lang: None,
            gender: None,
            description: None,
            engine: None,
            platform,
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }
}

/// A pinned voice whose language class has been looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedVoice {
    pub name: String,
    pub is_japanese: bool,
}

/// Platform speech engine
///
/// Implementations hold their own initialized flag and voice cache.
/// `initialize` must be idempotent.
pub trait VoiceEngine: Send {
    fn platform(&self) -> Platform;

    /// One-time availability detection; populates the voice cache
    ///
    /// Fails with `EngineUnavailable` (after printing install guidance)
    /// when no native facility works.
    fn initialize(&mut self) -> Result<()>;

    fn is_initialized(&self) -> bool;

    /// Probe the native facility without touching initialization state
    fn check_availability(&mut self) -> bool;

    /// Query the native engine for its voices; empty on any failure
    fn available_voices(&mut self) -> Vec<Voice>;

    /// Voices captured by `initialize`
    fn cached_voices(&self) -> &[Voice];

    /// Does this available voice speak Japanese, by name or locale?
    fn matches_japanese_voice(&self, voice: &Voice) -> bool;

    fn default_japanese_voice(&self) -> &str;

    fn default_english_voice(&self) -> &str;

    /// Issue one utterance with a fully resolved voice, blocking until done
    fn synthesize(&mut self, text: &str, voice: &str, rate: Option<u32>, japanese: bool)
        -> Result<()>;

    /// Install guidance for when no speech facility is found
    fn install_instructions(&self) -> String;

    /// Print install guidance to stderr
    fn show_install_instructions(&self) {
        eprintln!("{}", self.install_instructions());
    }

    fn default_voice(&self, japanese: bool) -> &str {
        if japanese {
            self.default_japanese_voice()
        } else {
            self.default_english_voice()
        }
    }

    /// Exact-name lookup in the voice list
    fn is_voice_available(&mut self, name: &str) -> bool {
        self.find_voice(name).is_some()
    }

    /// `None` when the voice is unknown, otherwise its language class
    fn is_japanese_voice(&mut self, name: &str) -> Option<bool> {
        self.find_voice(name)
            .map(|voice| self.matches_japanese_voice(&voice))
    }

    /// Look a voice up in the cache, querying the engine if nothing is cached yet
    fn find_voice(&mut self, name: &str) -> Option<Voice> {
        if self.is_initialized() && !self.cached_voices().is_empty() {
            return self.cached_voices().iter().find(|v| v.name == name).cloned();
        }
        self.available_voices().into_iter().find(|v| v.name == name)
    }

    /// Classify an explicit voice once, warning if it can't be used at all
    fn pin_voice(&mut self, voice: Option<&str>) -> Option<PinnedVoice> {
        let name = voice?;
        match self.is_japanese_voice(name) {
            Some(is_japanese) => Some(PinnedVoice {
                name: name.to_string(),
                is_japanese,
            }),
            None => {
                warn!(
                    "Voice \"{}\" is not available on {}; using the default voice",
                    name,
                    self.platform()
                );
                None
            }
        }
    }

    /// Pick the voice for text of one language class
    fn choose_voice(&self, pinned: Option<&PinnedVoice>, japanese: bool) -> String {
        match pinned {
            Some(pin) if pin.is_japanese == japanese => pin.name.clone(),
            Some(pin) => {
                let fallback = self.default_voice(japanese);
                warn!(
                    "Voice \"{}\" does not speak {} text; using \"{}\"",
                    pin.name,
                    if japanese { "Japanese" } else { "English" },
                    fallback
                );
                fallback.to_string()
            }
            None => self.default_voice(japanese).to_string(),
        }
    }

    /// Speak the whole string as one utterance
    fn speak(&mut self, text: &str, options: &SpeakOptions) -> Result<()> {
        if !self.is_initialized() {
            self.initialize()?;
        }

        let japanese = is_japanese_script(text);
        let pinned = self.pin_voice(options.voice.as_deref());
        let voice = self.choose_voice(pinned.as_ref(), japanese);
        debug!(
            "Speaking {} chars as {} with voice {}",
            text.chars().count(),
            if japanese { "Japanese" } else { "English" },
            voice
        );

        self.synthesize(text, &voice, options.rate, japanese)
    }

    /// Speak tokens in order, one utterance per token
    ///
    /// Blank tokens are skipped. Each utterance finishes before the next
    /// starts; the first failure stops playback.
    fn speak_tokenized(&mut self, tokens: &[Token], options: &SpeakOptions) -> Result<()> {
        if !self.is_initialized() {
            self.initialize()?;
        }

        let pinned = self.pin_voice(options.voice.as_deref());

        for token in tokens.iter().filter(|t| !t.is_blank()) {
            let voice = self.choose_voice(pinned.as_ref(), token.is_japanese);
            debug!("Token {:?} -> voice {}", token.text, voice);
            self.synthesize(&token.text, &voice, options.rate, token.is_japanese)?;
        }

        Ok(())
    }
}
