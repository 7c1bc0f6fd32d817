//! Voice engine tests
//!
//! Each platform engine runs against a recording command runner, so these
//! tests check the exact native invocations without producing audio.

mod common;

use common::{env_value, exit_with, ok, FakeRunner, ESPEAK_VOICES, SAY_VOICES};
use std::io;
use std::time::Duration;
use talk::config::EngineSettings;
use talk::speech::backends::{LinuxBackend, LinuxEngine, MacOsEngine, WindowsEngine};
use talk::speech::{SpeakOptions, VoiceEngine};
use talk::tokenizer::tokenize;
use talk::TalkError;

fn say_runner() -> std::sync::Arc<FakeRunner> {
    FakeRunner::new(&["say"], |inv| {
        if inv.args == ["-v", "?"] {
            ok(SAY_VOICES)
        } else {
            ok("")
        }
    })
}

/// (voice, rate, text) for each `say` utterance
fn utterances(runner: &FakeRunner) -> Vec<(String, Option<String>, String)> {
    runner
        .stdin_calls()
        .into_iter()
        .map(|inv| {
            let voice = inv.args[1].clone();
            let rate = inv
                .args
                .iter()
                .position(|a| a == "-r")
                .map(|i| inv.args[i + 1].clone());
            (voice, rate, inv.stdin.unwrap_or_default())
        })
        .collect()
}

// ---------------------------------------------------------------- macOS

#[test]
fn test_macos_defaults_per_language() {
    let runner = say_runner();
    let mut engine = MacOsEngine::new(runner.clone(), &EngineSettings::default());

    engine.speak("こんにちは", &SpeakOptions::new()).unwrap();
    engine.speak("Hello \"world\"; rm -rf /", &SpeakOptions::new()).unwrap();

    assert_eq!(
        utterances(&runner),
        vec![
            ("Kyoko".into(), Some("200".into()), "こんにちは".into()),
            ("Samantha".into(), None, "Hello \"world\"; rm -rf /".into()),
        ]
    );
}

#[test]
fn test_macos_rate_passes_through() {
    let runner = say_runner();
    let mut engine = MacOsEngine::new(runner.clone(), &EngineSettings::default());

    engine
        .speak("Fast speech", &SpeakOptions::new().with_rate(300))
        .unwrap();
    engine
        .speak("ゆっくり", &SpeakOptions::new().with_rate(100))
        .unwrap();

    let rates: Vec<_> = utterances(&runner).into_iter().map(|u| u.1).collect();
    assert_eq!(rates, vec![Some("300".into()), Some("100".into())]);
}

#[test]
fn test_macos_mismatched_voice_is_replaced() {
    let runner = say_runner();
    let mut engine = MacOsEngine::new(runner.clone(), &EngineSettings::default());

    // Alex is English; Japanese text gets the Japanese default instead
    engine
        .speak("日本語です", &SpeakOptions::new().with_voice("Alex"))
        .unwrap();
    engine
        .speak("English please", &SpeakOptions::new().with_voice("Alex"))
        .unwrap();

    let voices: Vec<_> = utterances(&runner).into_iter().map(|u| u.0).collect();
    assert_eq!(voices, vec!["Kyoko", "Alex"]);
}

#[test]
fn test_macos_unknown_voice_falls_back() {
    let runner = say_runner();
    let mut engine = MacOsEngine::new(runner.clone(), &EngineSettings::default());

    engine
        .speak("Hello", &SpeakOptions::new().with_voice("Nobody"))
        .unwrap();

    assert_eq!(utterances(&runner)[0].0, "Samantha");
}

#[test]
fn test_macos_is_japanese_voice() {
    let runner = say_runner();
    let mut engine = MacOsEngine::new(runner, &EngineSettings::default());
    engine.initialize().unwrap();

    assert_eq!(engine.is_japanese_voice("Kyoko"), Some(true));
    assert_eq!(engine.is_japanese_voice("Alex"), Some(false));
    assert_eq!(engine.is_japanese_voice("Nobody"), None);
    // Exact match only
    assert_eq!(engine.is_japanese_voice("kyoko"), None);
    assert!(engine.is_voice_available("Samantha"));
    assert!(!engine.is_voice_available("samantha"));
}

#[test]
fn test_macos_initialize_once() {
    let runner = say_runner();
    let mut engine = MacOsEngine::new(runner.clone(), &EngineSettings::default());

    engine.initialize().unwrap();
    engine.initialize().unwrap();
    engine.speak("Hello", &SpeakOptions::new()).unwrap();

    let listings = runner
        .calls()
        .iter()
        .filter(|inv| inv.args == ["-v", "?"])
        .count();
    assert_eq!(listings, 1);
    assert_eq!(engine.cached_voices().len(), 3);
}

#[test]
fn test_macos_unavailable() {
    let runner = FakeRunner::new(&[], |_| ok(""));
    let mut engine = MacOsEngine::new(runner.clone(), &EngineSettings::default());

    let err = engine.speak("Hello", &SpeakOptions::new()).unwrap_err();
    assert!(matches!(err, TalkError::EngineUnavailable(_)));
    assert!(runner.calls().is_empty());
    assert!(!engine.is_initialized());
}

#[test]
fn test_macos_failure_carries_platform() {
    let runner = FakeRunner::new(&["say"], |inv| {
        if inv.stdin.is_some() {
            exit_with(1, "Voice `Kyoko' not found.")
        } else {
            ok(SAY_VOICES)
        }
    });
    let mut engine = MacOsEngine::new(runner, &EngineSettings::default());

    match engine.speak("こんにちは", &SpeakOptions::new()) {
        Err(TalkError::SynthesisFailed { platform, message }) => {
            assert_eq!(platform, "macos");
            assert!(message.contains("not found"));
        }
        other => panic!("expected SynthesisFailed, got {:?}", other),
    }
}

#[test]
fn test_macos_voice_listing_failure_is_empty() {
    let runner = FakeRunner::new(&["say"], |inv| {
        if inv.stdin.is_none() {
            Err(io::Error::new(io::ErrorKind::Other, "boom"))
        } else {
            ok("")
        }
    });
    let mut engine = MacOsEngine::new(runner, &EngineSettings::default());

    engine.initialize().unwrap();
    assert!(engine.available_voices().is_empty());
    assert_eq!(engine.is_japanese_voice("Kyoko"), None);
}

#[test]
fn test_macos_tokenized_dispatch() {
    let runner = say_runner();
    let mut engine = MacOsEngine::new(runner.clone(), &EngineSettings::default());
    let tokens = tokenize("おはよう Good morning みなさん!");

    engine
        .speak_tokenized(&tokens, &SpeakOptions::new().with_voice("Alex").with_rate(150))
        .unwrap();

    assert_eq!(
        utterances(&runner),
        vec![
            ("Kyoko".into(), Some("150".into()), "おはよう".into()),
            ("Alex".into(), Some("150".into()), " Good morning ".into()),
            ("Kyoko".into(), Some("150".into()), "みなさん".into()),
            ("Alex".into(), Some("150".into()), "!".into()),
        ]
    );
}

#[test]
fn test_macos_tokenized_skips_blank_tokens() {
    let runner = say_runner();
    let mut engine = MacOsEngine::new(runner.clone(), &EngineSettings::default());

    engine
        .speak_tokenized(&tokenize("日本 語"), &SpeakOptions::new())
        .unwrap();

    let texts: Vec<_> = utterances(&runner).into_iter().map(|u| u.2).collect();
    assert_eq!(texts, vec!["日本", "語"]);
}

#[test]
fn test_macos_tokenized_japanese_pin() {
    let runner = say_runner();
    let mut engine = MacOsEngine::new(runner.clone(), &EngineSettings::default());

    engine
        .speak_tokenized(&tokenize("Hello世界"), &SpeakOptions::new().with_voice("Kyoko"))
        .unwrap();

    let voices: Vec<_> = utterances(&runner).into_iter().map(|u| u.0).collect();
    assert_eq!(voices, vec!["Samantha", "Kyoko"]);
}

// ---------------------------------------------------------------- Windows

const WINDOWS_VOICES: &str = "\
Microsoft Haruka Desktop|ja-JP|Female|Microsoft Haruka Desktop - Japanese
Microsoft Zira Desktop|en-US|Female|Microsoft Zira Desktop - English (United States)
Microsoft David Desktop|en-US|Male|Microsoft David Desktop - English (United States)
";

fn script_of(inv: &talk::speech::Invocation) -> &str {
    inv.args.last().map(String::as_str).unwrap_or("")
}

fn powershell_runner() -> std::sync::Arc<FakeRunner> {
    FakeRunner::new(&["powershell"], |inv| {
        let script = script_of(inv);
        if script.contains("Write-Output 'OK'") {
            ok("OK\r\n")
        } else if script.contains("GetInstalledVoices") {
            ok(WINDOWS_VOICES)
        } else {
            ok("")
        }
    })
}

fn speech_calls(runner: &FakeRunner) -> Vec<talk::speech::Invocation> {
    runner
        .calls()
        .into_iter()
        .filter(|inv| env_value(inv, "TALK_TEXT").is_some())
        .collect()
}

#[test]
fn test_windows_speak_uses_environment() {
    let runner = powershell_runner();
    let mut engine = WindowsEngine::new(runner.clone(), &EngineSettings::default());

    let text = "It's a 'quoted' $(danger)\nline";
    engine.speak(text, &SpeakOptions::new().with_rate(300)).unwrap();
    engine.speak("こんにちは", &SpeakOptions::new()).unwrap();

    let calls = speech_calls(&runner);
    assert_eq!(calls.len(), 2);

    assert_eq!(calls[0].program, "powershell");
    assert_eq!(env_value(&calls[0], "TALK_TEXT"), Some("It's a 'quoted' $(danger) line"));
    assert_eq!(env_value(&calls[0], "TALK_VOICE"), Some("Microsoft Zira Desktop"));
    assert_eq!(env_value(&calls[0], "TALK_RATE"), Some("5"));
    assert!(!script_of(&calls[0]).contains("danger"));

    assert_eq!(env_value(&calls[1], "TALK_VOICE"), Some("Microsoft Haruka Desktop"));
    assert_eq!(env_value(&calls[1], "TALK_RATE"), None);
}

#[test]
fn test_windows_rate_clamped() {
    let engine = WindowsEngine::new(powershell_runner(), &EngineSettings::default());
    assert_eq!(engine.map_rate(200), 0);
    assert_eq!(engine.map_rate(80), -6);
    assert_eq!(engine.map_rate(90), -5);
    assert_eq!(engine.map_rate(5000), 10);
}

#[test]
fn test_windows_voice_language() {
    let mut engine = WindowsEngine::new(powershell_runner(), &EngineSettings::default());
    engine.initialize().unwrap();

    assert_eq!(engine.is_japanese_voice("Microsoft Haruka Desktop"), Some(true));
    assert_eq!(engine.is_japanese_voice("Microsoft David Desktop"), Some(false));
    assert_eq!(engine.is_japanese_voice("Microsoft Ayumi"), None);
}

#[test]
fn test_windows_tokenized_with_english_pin() {
    let runner = powershell_runner();
    let mut engine = WindowsEngine::new(runner.clone(), &EngineSettings::default());

    engine
        .speak_tokenized(
            &tokenize("Good 朝ですね"),
            &SpeakOptions::new().with_voice("Microsoft David Desktop"),
        )
        .unwrap();

    let voices: Vec<_> = speech_calls(&runner)
        .iter()
        .map(|inv| env_value(inv, "TALK_VOICE").unwrap_or_default().to_string())
        .collect();
    assert_eq!(voices, vec!["Microsoft David Desktop", "Microsoft Haruka Desktop"]);
}

#[test]
fn test_windows_requires_system_speech() {
    let runner = FakeRunner::new(&["powershell"], |_| ok("NG\r\n"));
    let mut engine = WindowsEngine::new(runner, &EngineSettings::default());

    assert!(!engine.check_availability());
    assert!(matches!(
        engine.initialize(),
        Err(TalkError::EngineUnavailable(_))
    ));
}

#[test]
fn test_windows_requires_powershell() {
    let runner = FakeRunner::new(&[], |_| ok("OK"));
    let mut engine = WindowsEngine::new(runner.clone(), &EngineSettings::default());

    assert!(!engine.check_availability());
    assert!(runner.calls().is_empty());
}

// ---------------------------------------------------------------- Linux

fn linux_runner(on_path: &[&str]) -> std::sync::Arc<FakeRunner> {
    FakeRunner::new(on_path, |inv| {
        if inv.args == ["--voices"] {
            ok(ESPEAK_VOICES)
        } else if inv.args == ["-O"] {
            ok("OUTPUT MODULES\nespeak-ng\n")
        } else {
            ok("")
        }
    })
}

#[test]
fn test_linux_detection_order() {
    let runner = linux_runner(&["espeak", "spd-say"]);
    let mut engine = LinuxEngine::new(runner.clone(), &EngineSettings::default());

    engine.initialize().unwrap();
    assert_eq!(engine.active_engine(), Some(LinuxBackend::Espeak));

    let self_test = &runner.calls()[0];
    assert_eq!(self_test.program, "espeak");
    assert_eq!(self_test.timeout, Some(Duration::from_millis(5000)));
}

#[test]
fn test_linux_broken_engine_is_skipped() {
    let runner = FakeRunner::new(&["espeak-ng", "festival"], |inv| {
        if inv.program == "espeak-ng" {
            Err(io::Error::new(io::ErrorKind::TimedOut, "timed out after 5000 ms"))
        } else {
            ok("")
        }
    });
    let mut engine = LinuxEngine::new(runner, &EngineSettings::default());

    engine.initialize().unwrap();
    assert_eq!(engine.active_engine(), Some(LinuxBackend::Festival));
    assert_eq!(engine.cached_voices().len(), 4);
}

#[test]
fn test_linux_nothing_installed() {
    let runner = linux_runner(&[]);
    let mut engine = LinuxEngine::new(runner, &EngineSettings::default());

    assert!(matches!(
        engine.initialize(),
        Err(TalkError::EngineUnavailable(_))
    ));
    assert_eq!(engine.active_engine(), None);
    assert!(engine.available_voices().is_empty());
}

#[test]
fn test_linux_espeak_command() {
    let runner = linux_runner(&["espeak-ng"]);
    let mut engine = LinuxEngine::new(runner.clone(), &EngineSettings::default());

    engine
        .speak("こんにちは", &SpeakOptions::new().with_rate(150))
        .unwrap();
    engine.speak("-v not an option", &SpeakOptions::new()).unwrap();

    let calls = runner.stdin_calls();
    assert_eq!(calls[0].program, "espeak-ng");
    assert_eq!(calls[0].args, vec!["-v", "ja", "-s", "150", "--stdin"]);
    assert_eq!(calls[0].stdin.as_deref(), Some("こんにちは"));
    assert_eq!(calls[1].args, vec!["-v", "en", "--stdin"]);
    assert_eq!(calls[1].stdin.as_deref(), Some("-v not an option"));
}

#[test]
fn test_linux_espeak_voice_language() {
    let runner = linux_runner(&["espeak-ng"]);
    let mut engine = LinuxEngine::new(runner.clone(), &EngineSettings::default());
    engine.initialize().unwrap();

    assert_eq!(engine.is_japanese_voice("ja"), Some(true));
    assert_eq!(engine.is_japanese_voice("en"), Some(false));
    assert_eq!(engine.is_japanese_voice("fr"), None);

    engine
        .speak_tokenized(&tokenize("Hello世界"), &SpeakOptions::new().with_voice("ja"))
        .unwrap();
    let voices: Vec<_> = runner
        .stdin_calls()
        .iter()
        .map(|inv| inv.args[1].clone())
        .collect();
    assert_eq!(voices, vec!["en", "ja"]);
}

#[test]
fn test_linux_speech_dispatcher_command() {
    let runner = linux_runner(&["spd-say"]);
    let mut engine = LinuxEngine::new(runner.clone(), &EngineSettings::default());

    engine
        .speak("Hello there", &SpeakOptions::new().with_rate(250))
        .unwrap();
    engine
        .speak("Hello again", &SpeakOptions::new().with_voice("espeak-ng"))
        .unwrap();

    let speech: Vec<_> = runner
        .calls()
        .into_iter()
        .filter(|inv| inv.args.first().map(String::as_str) == Some("-w"))
        .collect();
    assert_eq!(
        speech[0].args,
        vec!["-w", "-l", "en", "-r", "25", "--", "Hello there"]
    );
    // spd-say modules carry no language, so "espeak-ng" counts as English
    assert_eq!(speech[1].args, vec!["-w", "-o", "espeak-ng", "--", "Hello again"]);
}

#[test]
fn test_linux_speech_dispatcher_listing_fallback() {
    let runner = FakeRunner::new(&["spd-say"], |inv| {
        if inv.args == ["-O"] {
            exit_with(1, "")
        } else {
            ok("")
        }
    });
    let mut engine = LinuxEngine::new(runner, &EngineSettings::default());
    engine.initialize().unwrap();

    let voices = engine.available_voices();
    assert_eq!(voices.len(), 1);
    assert_eq!(voices[0].name, "default");
}

#[test]
fn test_linux_festival_reads_stdin() {
    let runner = linux_runner(&["festival"]);
    let mut engine = LinuxEngine::new(runner.clone(), &EngineSettings::default());

    engine
        .speak("Quote \" and backslash \\", &SpeakOptions::new().with_rate(300))
        .unwrap();

    let calls = runner.stdin_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].args, vec!["--tts"]);
    assert_eq!(calls[0].stdin.as_deref(), Some("Quote \" and backslash \\"));
}

#[test]
fn test_linux_custom_engine_order() {
    let settings = EngineSettings {
        linux_engines: vec![LinuxBackend::SpeechDispatcher, LinuxBackend::EspeakNg],
        self_test_timeout: Duration::from_millis(250),
        ..EngineSettings::default()
    };
    let runner = linux_runner(&["espeak-ng", "spd-say"]);
    let mut engine = LinuxEngine::new(runner.clone(), &settings);

    engine.initialize().unwrap();
    assert_eq!(engine.active_engine(), Some(LinuxBackend::SpeechDispatcher));
    assert_eq!(runner.calls()[0].timeout, Some(Duration::from_millis(250)));
}

#[test]
fn test_linux_install_instructions() {
    use talk::platform::LinuxDistribution;

    let engine = LinuxEngine::new(linux_runner(&[]), &EngineSettings::default());
    let text = engine.install_instructions_for(LinuxDistribution::Debian);

    assert!(text.contains("1. espeak-ng (recommended: 4/4)"));
    assert!(text.contains("sudo apt-get install speech-dispatcher"));
    assert!(text.contains("4. speech-dispatcher (recommended: 1/4)"));
}

#[test]
fn test_linux_synthesis_failure() {
    let runner = FakeRunner::new(&["espeak-ng"], |inv| {
        if inv.stdin.is_some() {
            exit_with(1, "")
        } else {
            ok(ESPEAK_VOICES)
        }
    });
    let mut engine = LinuxEngine::new(runner.clone(), &EngineSettings::default());

    let err = engine
        .speak_tokenized(&tokenize("Hello世界"), &SpeakOptions::new())
        .unwrap_err();
    assert!(matches!(err, TalkError::SynthesisFailed { ref platform, .. } if platform == "linux"));
    // Playback stops at the first failed utterance
    assert_eq!(runner.stdin_calls().len(), 1);
}
