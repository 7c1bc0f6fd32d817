//! Windows TTS backend using SAPI (System.Speech.Synthesis)
//!
//! Each utterance runs a short PowerShell script that builds a
//! `SpeechSynthesizer`, tries to select the requested voice, sets the rate
//! and speaks. The script is fixed; text, voice and rate reach it through
//! environment variables so nothing user-supplied is ever parsed as
//! PowerShell.

use crate::config::{EngineSettings, VoiceDefaults};
use crate::platform::Platform;
use crate::speech::rate::RateMapping;
use crate::speech::runner::{CommandRunner, Invocation};
use crate::speech::{Voice, VoiceEngine};
use crate::{Result, TalkError};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

pub const DEFAULT_JAPANESE_VOICE: &str = "Microsoft Haruka Desktop";
pub const DEFAULT_ENGLISH_VOICE: &str = "Microsoft Zira Desktop";

const ENV_TEXT: &str = "TALK_TEXT";
const ENV_VOICE: &str = "TALK_VOICE";
const ENV_RATE: &str = "TALK_RATE";

const SPEAK_SCRIPT: &str = r#"
Add-Type -AssemblyName System.Speech
$synth = New-Object System.Speech.Synthesis.SpeechSynthesizer
try { $synth.SelectVoice($env:TALK_VOICE) } catch { Write-Warning 'Voice not found, using default' }
if ($env:TALK_RATE) { $synth.Rate = [int]$env:TALK_RATE }
$synth.Speak($env:TALK_TEXT)
"#;

const LIST_SCRIPT: &str = r#"
Add-Type -AssemblyName System.Speech
(New-Object System.Speech.Synthesis.SpeechSynthesizer).GetInstalledVoices() | ForEach-Object {
    $voice = $_.VoiceInfo
    Write-Output ($voice.Name + '|' + $voice.Culture + '|' + $voice.Gender + '|' + $voice.Description)
}
"#;

const PROBE_SCRIPT: &str =
    "try { Add-Type -AssemblyName System.Speech; Write-Output 'OK' } catch { Write-Output 'NG' }";

static JAPANESE_VOICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)haruka|ayumi|ichiro|sayaka|ja-JP|japanese|日本語").expect("valid regex")
});

/// Windows SAPI backend
///
/// Drives System.Speech through PowerShell, one process per utterance.
pub struct WindowsEngine {
    runner: Arc<dyn CommandRunner>,
    voices: VoiceDefaults,
    rate_mapping: RateMapping,
    /// PowerShell executable found during initialization
    powershell: Option<String>,
    initialized: bool,
    available_voices: Vec<Voice>,
}

impl WindowsEngine {
    /// PowerShell executables to try, in order
    const POWERSHELL_CANDIDATES: &'static [&'static str] = &["powershell", "powershell.exe"];

    pub fn new(runner: Arc<dyn CommandRunner>, settings: &EngineSettings) -> Self {
        Self {
            runner,
            voices: settings.windows_voices.clone(),
            rate_mapping: settings.windows_rate,
            powershell: None,
            initialized: false,
            available_voices: Vec::new(),
        }
    }

    /// Find PowerShell on PATH
    fn find_powershell(&self) -> Option<String> {
        Self::POWERSHELL_CANDIDATES
            .iter()
            .find(|candidate| self.runner.is_on_path(candidate))
            .map(|candidate| candidate.to_string())
    }

    fn powershell(&self) -> &str {
        self.powershell
            .as_deref()
            .unwrap_or(Self::POWERSHELL_CANDIDATES[0])
    }

    /// Wrap a script in a non-interactive PowerShell invocation
    fn script(&self, script: &str) -> Invocation {
        Invocation::new(self.powershell()).args([
            "-NoProfile",
            "-NonInteractive",
            "-Command",
            script,
        ])
    }

    /// Map an API rate onto SAPI's -10..=10 scale
    pub fn map_rate(&self, rate: u32) -> i64 {
        self.rate_mapping.map(rate)
    }

    /// Build the PowerShell invocation for one utterance
    pub fn build_invocation(&self, text: &str, voice: &str, rate: Option<u32>) -> Invocation {
        // SAPI reads line breaks as sentence ends; keep one utterance
        let text = text.replace(['\n', '\r'], " ");

        let mut invocation = self
            .script(SPEAK_SCRIPT)
            .env(ENV_TEXT, text)
            .env(ENV_VOICE, voice);
        if let Some(rate) = rate {
            invocation = invocation.env(ENV_RATE, self.map_rate(rate).to_string());
        }
        invocation
    }

    /// Parse `name|culture|gender|description` records
    pub fn parse_voices(output: &str) -> Vec<Voice> {
        output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let mut fields = line.split('|').map(str::trim);
                let name = fields.next().filter(|name| !name.is_empty())?;
                let mut voice = Voice::new(name, Platform::Windows);
                if let Some(lang) = fields.next().filter(|f| !f.is_empty()) {
                    voice = voice.with_lang(lang);
                }
                if let Some(gender) = fields.next().filter(|f| !f.is_empty()) {
                    voice = voice.with_gender(gender);
                }
                let description = fields.collect::<Vec<_>>().join("|");
                if !description.is_empty() {
                    voice = voice.with_description(description);
                }
                Some(voice)
            })
            .collect()
    }
}

impl VoiceEngine for WindowsEngine {
    fn platform(&self) -> Platform {
        Platform::Windows
    }

    fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        if !self.check_availability() {
            self.show_install_instructions();
            return Err(TalkError::EngineUnavailable(
                "PowerShell or System.Speech is not available on this Windows system".to_string(),
            ));
        }

        self.available_voices = self.available_voices();
        info!("Windows SAPI ready with {} voices", self.available_voices.len());
        self.initialized = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// PowerShell reachable and System.Speech loadable
    fn check_availability(&mut self) -> bool {
        let Some(powershell) = self.find_powershell() else {
            debug!("PowerShell not found on PATH");
            return false;
        };
        debug!("Found PowerShell: {}", powershell);
        self.powershell = Some(powershell);

        match self.runner.run(&self.script(PROBE_SCRIPT)) {
            Ok(output) if output.success && output.stdout.trim() == "OK" => {
                debug!("Windows SAPI test successful");
                true
            }
            Ok(output) => {
                debug!("System.Speech not loadable: {}", output.stderr.trim());
                false
            }
            Err(e) => {
                debug!("Failed to test SAPI: {}", e);
                false
            }
        }
    }

    fn available_voices(&mut self) -> Vec<Voice> {
        let invocation = self.script(LIST_SCRIPT);
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
        JAPANESE_VOICE.is_match(&voice.name)
            || voice.lang.as_deref().map_or(false, |lang| JAPANESE_VOICE.is_match(lang))
    }

    fn default_japanese_voice(&self) -> &str {
        &self.voices.japanese
    }

    fn default_english_voice(&self) -> &str {
        &self.voices.english
    }

    fn synthesize(&mut self, text: &str, voice: &str, rate: Option<u32>, _japanese: bool) -> Result<()> {
        let invocation = self.build_invocation(text, voice, rate);
        debug!("Speaking {} chars with voice {}", text.chars().count(), voice);

        self.runner
            .run(&invocation)
            .and_then(|output| output.into_result(&invocation))
            .map(|_| ())
            .map_err(|e| TalkError::synthesis(self.platform(), e))
    }

    fn install_instructions(&self) -> String {
        [
            "On Windows, check the following:",
            "",
            "1. PowerShell is available:",
            "   run \"powershell\" from a command prompt",
            "",
            "2. Speech is enabled:",
            "   Settings > Time & Language > Speech",
            "",
            "3. A Japanese voice is installed:",
            "   Settings > Time & Language > Language > add Japanese",
            "   or fetch the language pack through Windows Update",
            "",
            "4. The .NET Framework is up to date",
        ]
        .join("\n")
    }
}
