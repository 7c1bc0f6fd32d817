//! Speech synthesis system

pub mod backends;
pub mod engine;
pub mod factory;
pub mod rate;
pub mod runner;

pub use engine::{PinnedVoice, SpeakOptions, Voice, VoiceEngine};
pub use factory::{create_engine, create_engine_for, create_and_initialize};
pub use runner::{CommandOutput, CommandRunner, Invocation, SystemRunner};
