//! Rate remapping into native engine ranges
//!
//! Callers pass a words-per-minute style integer. Engines with a bounded
//! signed rate scale map it with `clamp(min, max, round((rate - center) / step))`.

use serde::Serialize;

/// Affine mapping from API rate to a bounded native rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateMapping {
    pub center: i64,
    pub step: i64,
    pub min: i64,
    pub max: i64,
}

impl RateMapping {
    /// System.Speech `SpeechSynthesizer.Rate`, -10..=10
    pub const WINDOWS: RateMapping = RateMapping {
        center: 200,
        step: 20,
        min: -10,
        max: 10,
    };

    /// speech-dispatcher `spd-say -r`, -100..=100
    pub const SPEECH_DISPATCHER: RateMapping = RateMapping {
        center: 200,
        step: 2,
        min: -100,
        max: 100,
    };

    /// Map an API rate into the native range
    ///
    /// Halves round toward positive infinity.
    pub fn map(&self, rate: u32) -> i64 {
        let step = self.step.max(1) as f64;
        let scaled = i64::from(rate).saturating_sub(self.center) as f64 / step;
        let rounded = (scaled + 0.5).floor() as i64;
        rounded.clamp(self.min, self.max)
    }
}
