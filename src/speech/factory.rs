//! Voice engine factory
//!
//! Picks the engine implementation for the running platform. This is the
//! only place that switches on platform.

use super::backends::{LinuxEngine, MacOsEngine, WindowsEngine};
use super::runner::{CommandRunner, SystemRunner};
use super::VoiceEngine;
use crate::config::EngineSettings;
use crate::platform::Platform;
use crate::Result;
use log::info;
use std::sync::Arc;

/// Create an uninitialized engine for the running platform
pub fn create_engine(settings: &EngineSettings) -> Result<Box<dyn VoiceEngine>> {
    let platform = Platform::current()?;
    Ok(create_engine_for(platform, Arc::new(SystemRunner), settings))
}

/// Create an uninitialized engine for `platform` driven by `runner`
pub fn create_engine_for(
    platform: Platform,
    runner: Arc<dyn CommandRunner>,
    settings: &EngineSettings,
) -> Box<dyn VoiceEngine> {
    info!("Creating voice engine for platform: {}", platform);

    match platform {
        Platform::MacOs => Box::new(MacOsEngine::new(runner, settings)),
        Platform::Windows => Box::new(WindowsEngine::new(runner, settings)),
        Platform::Linux => Box::new(LinuxEngine::new(runner, settings)),
    }
}

/// Create and initialize the engine for the running platform
pub fn create_and_initialize(settings: &EngineSettings) -> Result<Box<dyn VoiceEngine>> {
    let mut engine = create_engine(settings)?;
    engine.initialize()?;
    info!("✓ Voice engine for {} initialized", engine.platform());
    Ok(engine)
}
