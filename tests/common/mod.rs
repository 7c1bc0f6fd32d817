//! Shared test helpers: a command runner that records invocations
//! instead of starting processes.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};
use talk::speech::{CommandOutput, CommandRunner, Invocation};

type Responder = Box<dyn Fn(&Invocation) -> io::Result<CommandOutput> + Send + Sync>;

pub struct FakeRunner {
    on_path: Vec<String>,
    respond: Responder,
    calls: Mutex<Vec<Invocation>>,
}

impl FakeRunner {
    pub fn new<F>(on_path: &[&str], respond: F) -> Arc<Self>
    where
        F: Fn(&Invocation) -> io::Result<CommandOutput> + Send + Sync + 'static,
    {
        Arc::new(Self {
            on_path: on_path.iter().map(|p| p.to_string()).collect(),
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Every invocation so far, in order
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Invocations that fed text to an engine via stdin
    pub fn stdin_calls(&self) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|inv| inv.stdin.is_some())
            .collect()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        (self.respond)(invocation)
    }

    fn is_on_path(&self, program: &str) -> bool {
        self.on_path.iter().any(|p| p == program)
    }
}

pub fn ok(stdout: &str) -> io::Result<CommandOutput> {
    Ok(CommandOutput {
        success: true,
        code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    })
}

pub fn exit_with(code: i32, stderr: &str) -> io::Result<CommandOutput> {
    Ok(CommandOutput {
        success: false,
        code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    })
}

pub fn env_value<'a>(invocation: &'a Invocation, key: &str) -> Option<&'a str> {
    invocation
        .envs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

pub const SAY_VOICES: &str = "\
Alex                en_US    # Most people recognize me by my voice.
Kyoko               ja_JP    # こんにちは、私の名前はKyokoです。
Samantha            en_US    # Hello, my name is Samantha.
";

pub const ESPEAK_VOICES: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  en              --/M      English_(Great_Britain) gmw/en          (en 2)
 5  ja              --/M      Japanese           jpx/ja
";
