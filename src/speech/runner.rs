//! External process execution
//!
//! Every native speech facility is driven through a [`CommandRunner`].
//! Invocations carry an argument vector, never a shell string, so text
//! containing quotes or shell metacharacters reaches the engine verbatim.

use crate::platform::is_command_available;
use log::debug;
use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// How often a timed invocation checks whether its child has exited
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// One external process call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Written to the child's stdin, which is then closed
    pub stdin: Option<String>,
    pub envs: Vec<(String, String)>,
    /// Kill the child and fail with `TimedOut` after this long
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            envs: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Human readable rendering for logs and error messages
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(char::is_whitespace) || arg.is_empty() {
                line.push_str(&format!("{:?}", arg));
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Turn a non-zero exit into an error carrying stderr
    pub fn into_result(self, invocation: &Invocation) -> io::Result<CommandOutput> {
        if self.success {
            return Ok(self);
        }
        let status = self
            .code
            .map(|code| format!("exit status {}", code))
            .unwrap_or_else(|| "terminated by signal".to_string());
        let stderr = self.stderr.trim();
        let message = if stderr.is_empty() {
            format!("`{}` failed with {}", invocation.program, status)
        } else {
            format!("`{}` failed with {}: {}", invocation.program, status, stderr)
        };
        Err(io::Error::new(io::ErrorKind::Other, message))
    }
}

/// Executes invocations and answers PATH queries
pub trait CommandRunner: Send + Sync {
    /// Run to completion, blocking the caller
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput>;

    /// Is `program` reachable through PATH?
    fn is_on_path(&self, program: &str) -> bool;
}

/// Runs real processes on the host
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn spawn(invocation: &Invocation) -> io::Result<Child> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(invocation.envs.iter().map(|(k, v)| (k, v)))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        cmd.spawn()
    }

    fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<ExitStatus> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                if let Err(e) = child.kill() {
                    debug!("Failed to kill timed out process: {}", e);
                }
                let _ = child.wait(); // reap
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("timed out after {} ms", timeout.as_millis()),
                ));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Drain a child pipe on a helper thread so a chatty process can't block on a full pipe
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        debug!("Running: {}", invocation.display());

        let mut child = Self::spawn(invocation).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("failed to start `{}`: {}", invocation.program, e),
            )
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        if let Some(input) = &invocation.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                // A process that exits early closes the pipe; its exit status tells the story
                if let Err(e) = stdin.write_all(input.as_bytes()) {
                    debug!("Failed to write stdin for {}: {}", invocation.program, e);
                }
            }
        }

        let status = match invocation.timeout {
            Some(timeout) => Self::wait_with_timeout(&mut child, timeout)?,
            None => child.wait()?,
        };

        Ok(CommandOutput {
            success: status.success(),
            code: status.code(),
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        })
    }

    fn is_on_path(&self, program: &str) -> bool {
        is_command_available(program)
    }
}
