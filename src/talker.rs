//! Speech orchestration
//!
//! [`Talker`] owns one voice engine and decides between whole-string and
//! per-token playback. The free functions at the bottom of the module share
//! a process-wide [`SharedTalker`] that is built on first use behind a
//! mutex, so concurrent first calls construct exactly one engine.

use crate::config::{Config, EngineSettings};
use crate::speech::{create_engine, SpeakOptions, Voice, VoiceEngine};
use crate::tokenizer::tokenize;
use crate::Result;
use log::{debug, error, warn};
use once_cell::sync::Lazy;
use std::sync::{Mutex, MutexGuard};

/// An engine plus the dispatch logic in front of it
///
/// The free functions in this module share one `Talker` through a
/// [`SharedTalker`]; their calls are serialized behind its lock.
pub struct Talker {
    engine: Box<dyn VoiceEngine>,
}

impl Talker {
    /// Wrap an engine; it is initialized lazily on first use
    pub fn new(engine: Box<dyn VoiceEngine>) -> Self {
        Self { engine }
    }

    /// Build and initialize the engine for the running platform
    pub fn for_current_platform(settings: &EngineSettings) -> Result<Self> {
        let mut talker = Self::new(create_engine(settings)?);
        talker.initialize()?;
        Ok(talker)
    }

    /// Initialize the underlying engine (idempotent)
    pub fn initialize(&mut self) -> Result<()> {
        self.engine.initialize()
    }

    pub fn engine(&self) -> &dyn VoiceEngine {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> &mut dyn VoiceEngine {
        self.engine.as_mut()
    }

    /// Speak `text` as a single utterance
    pub fn speak(&mut self, text: &str, options: &SpeakOptions) -> Result<()> {
        self.engine.speak(text, options)
    }

    /// Speak `text` per language run when `options.tokenize` is set
    ///
    /// Without `tokenize` this is exactly [`Talker::speak`].
    pub fn speak_tokenized(&mut self, text: &str, options: &SpeakOptions) -> Result<()> {
        if !options.tokenize {
            return self.speak(text, options);
        }

        let tokens: Vec<_> = tokenize(text)
            .into_iter()
            .filter(|token| !token.is_blank())
            .collect();
        debug!("Speaking {} tokens", tokens.len());

        self.engine.speak_tokenized(&tokens, options)
    }

    pub fn available_voices(&mut self) -> Vec<Voice> {
        self.engine.available_voices()
    }

    pub fn is_voice_available(&mut self, name: &str) -> Result<bool> {
        self.initialize()?;
        Ok(self.engine.is_voice_available(name))
    }

    pub fn is_japanese_voice(&mut self, name: &str) -> Result<Option<bool>> {
        self.initialize()?;
        Ok(self.engine.is_japanese_voice(name))
    }
}

/// A lazily built talker shared between callers
///
/// The first call builds the talker; a failed build leaves the slot empty
/// so the next call tries again. Calls are serialized: the lock is held
/// for the whole call, so a second caller waits until the current
/// utterance (or tokenized run) has finished.
#[derive(Default)]
pub struct SharedTalker {
    slot: Mutex<Option<Talker>>,
}

impl SharedTalker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Talker>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` against the talker, building it with `build` if needed
    pub fn with_talker<T>(
        &self,
        build: impl FnOnce() -> Result<Talker>,
        f: impl FnOnce(&mut Talker) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.lock();

        let talker = match guard.take() {
            Some(talker) => talker,
            None => build().map_err(|e| {
                error!("Failed to initialize the voice engine: {}", e);
                e
            })?,
        };

        f(guard.insert(talker))
    }

    /// Is a talker currently built?
    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    /// Drop the talker; the next call builds a new one
    pub fn reset(&self) {
        if self.lock().take().is_some() {
            debug!("Voice engine reset");
        }
    }
}

/// Process-wide talker, built on first use
static GLOBAL: Lazy<SharedTalker> = Lazy::new(SharedTalker::new);

fn load_settings() -> EngineSettings {
    match Config::load() {
        Ok(config) => config.engine_settings(),
        Err(e) => {
            warn!("{}; using default engine settings", e);
            EngineSettings::default()
        }
    }
}

fn with_talker<T>(f: impl FnOnce(&mut Talker) -> Result<T>) -> Result<T> {
    GLOBAL.with_talker(|| Talker::for_current_platform(&load_settings()), f)
}

/// Speak `text` with the shared engine
pub fn speak(text: &str, options: &SpeakOptions) -> Result<()> {
    with_talker(|talker| talker.speak(text, options))
}

/// Speak `text`, splitting by language when `options.tokenize` is set
pub fn speak_tokenized(text: &str, options: &SpeakOptions) -> Result<()> {
    with_talker(|talker| talker.speak_tokenized(text, options))
}

/// Voices reported by the shared engine
pub fn available_voices() -> Result<Vec<Voice>> {
    with_talker(|talker| Ok(talker.available_voices()))
}

pub fn is_voice_available(name: &str) -> Result<bool> {
    with_talker(|talker| talker.is_voice_available(name))
}

/// `Ok(None)` when the voice is not installed
pub fn is_japanese_voice(name: &str) -> Result<Option<bool>> {
    with_talker(|talker| talker.is_japanese_voice(name))
}

/// Drop the shared engine; the next call builds and initializes a new one
pub fn reset_engine() {
    GLOBAL.reset();
}
