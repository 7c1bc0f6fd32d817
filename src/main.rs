//! talk main entry point
//!
//! Thin command line wrapper over the library: parse arguments, merge the
//! user's config defaults, then speak, list voices or report the platform.

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use log::{debug, info};
use std::process;
use talk::config::Config;
use talk::platform::{is_command_available, platform_info, Platform};
use talk::speech::backends::LinuxBackend;
use talk::speech::{create_engine, SpeakOptions, Voice};

#[derive(Parser, Debug)]
#[command(
    name = "talk",
    version,
    about = "Speak text with the system voice, switching between Japanese and English"
)]
struct Args {
    /// Text to speak (words are joined with a space)
    text: Vec<String>,

    /// Voice to use; replaced by the default when it can't speak the text
    #[arg(short, long)]
    voice: Option<String>,

    /// Speaking rate in words per minute
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    rate: Option<u32>,

    /// Split mixed Japanese/English text and speak each part with its own voice
    #[arg(short, long)]
    tokenize: bool,

    /// List the voices the speech engine reports
    #[arg(long)]
    voices: bool,

    /// Print voice lists as JSON
    #[arg(long, requires = "voices")]
    json: bool,

    /// Print platform information as JSON
    #[arg(long)]
    platform: bool,

    /// Check that a speech facility is installed
    #[arg(long)]
    check: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            process::exit(code);
        }
    };

    // Warnings carry voice substitutions, so they're shown by default
    let level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    debug!("talk version {} starting", talk::VERSION);

    match run(args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Returns `Ok(false)` for failures that were already reported
fn run(args: Args) -> anyhow::Result<bool> {
    if args.platform {
        let info = platform_info()?;
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(true);
    }

    if args.check {
        return check_dependencies();
    }

    if args.voices {
        let voices = talk::available_voices().context("Failed to list voices")?;
        print_voices(&voices, args.json)?;
        return Ok(true);
    }

    let text = args.text.join(" ");
    if text.trim().is_empty() {
        eprintln!("Usage: talk [OPTIONS] <TEXT>...");
        eprintln!("Try 'talk --help' for more information.");
        return Ok(false);
    }

    let config = Config::load()?;
    let mut options = SpeakOptions::new().tokenized(args.tokenize);
    options.voice = args.voice;
    options.rate = args.rate;
    let options = config.apply_defaults(options);
    debug!("Speaking with {:?}", options);

    talk::speak_tokenized(&text, &options)?;
    Ok(true)
}

fn print_voices(voices: &[Voice], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(voices)?);
        return Ok(());
    }

    if voices.is_empty() {
        println!("No voices reported (the engine may not support listing)");
        return Ok(());
    }

    let width = voices.iter().map(|v| v.name.chars().count()).max().unwrap_or(0);
    for voice in voices {
        let lang = voice.lang.as_deref().unwrap_or("-");
        match voice.description.as_deref() {
            Some(description) => println!("{:width$}  {:8}  {}", voice.name, lang, description),
            None => println!("{:width$}  {}", voice.name, lang),
        }
    }
    Ok(())
}

/// Report which native speech facilities are present
fn check_dependencies() -> anyhow::Result<bool> {
    let info = platform_info()?;
    println!("Platform: {} ({})", info.platform, info.architecture);

    let settings = Config::load()?.engine_settings();
    if info.platform == Platform::Linux {
        for engine in LinuxBackend::ALL {
            if is_command_available(engine.command()) {
                println!("✓ {} is installed", engine.command());
            } else {
                println!("✗ {} not found", engine.command());
            }
        }
        info!("Detection order: {:?}", settings.linux_engines);
    }

    let mut engine = create_engine(&settings)?;
    if engine.check_availability() {
        println!("✓ Speech synthesis is available");
        Ok(true)
    } else {
        println!("✗ No usable speech synthesis facility found");
        engine.show_install_instructions();
        Ok(false)
    }
}
