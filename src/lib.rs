//! talk - cross-platform text-to-speech from the command line
//!
//! Picks a Japanese or English system voice based on the script of the
//! text, optionally splits mixed text into runs and speaks each run with
//! the matching voice. Speech itself is produced by the operating system:
//! `say` on macOS, System.Speech through PowerShell on Windows, and
//! espeak-ng, espeak, festival or speech-dispatcher on Linux.

pub mod config;
pub mod error;
pub mod platform;
pub mod speech;
pub mod talker;
pub mod tokenizer;

pub use error::{Result, TalkError};
pub use platform::{platform_info, Platform, PlatformInfo};
pub use speech::{SpeakOptions, Voice, VoiceEngine};
pub use talker::{
    available_voices, is_japanese_voice, is_voice_available, reset_engine, speak,
    speak_tokenized, SharedTalker, Talker,
};
pub use tokenizer::{is_japanese_script, tokenize, Token};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "talk";
