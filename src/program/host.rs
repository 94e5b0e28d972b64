//! Process-level collaborators the driver consumes.
//!
//! Everything the engine learns from the outside world (environment,
//! tty-ness, platform, auxiliary probe commands) goes through [`Host`], so
//! detection logic can be exercised without touching the real process.

use std::collections::HashMap;
use std::io;
use std::process::Command;

use crossterm::tty::IsTty;

/// Source of environment facts.
pub trait Host {
    fn env(&self, key: &str) -> Option<String>;

    /// Whether the output stream is a terminal.
    fn is_tty(&self) -> bool;

    fn is_posix(&self) -> bool;

    /// Run a probe command and return its stdout.
    fn run(&self, program: &str, args: &[&str]) -> io::Result<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl Host for SystemHost {
    fn env(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn is_tty(&self) -> bool {
        io::stdout().is_tty()
    }

    fn is_posix(&self) -> bool {
        cfg!(unix)
    }

    fn run(&self, program: &str, args: &[&str]) -> io::Result<String> {
        let out = Command::new(program).args(args).output()?;
        if !out.status.success() {
            return Err(io::Error::other(format!("{program} exited with {}", out.status)));
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

/// Fixed environment for tests and embedding.
#[derive(Debug, Clone)]
pub struct StaticHost {
    vars: HashMap<String, String>,
    commands: HashMap<String, String>,
    tty: bool,
    posix: bool,
}

impl Default for StaticHost {
    fn default() -> Self {
        Self { vars: HashMap::new(), commands: HashMap::new(), tty: true, posix: true }
    }
}

impl StaticHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    /// Register the stdout of `program args...`, keyed by the joined command line.
    pub fn with_command(mut self, cmdline: &str, stdout: &str) -> Self {
        self.commands.insert(cmdline.to_string(), stdout.to_string());
        self
    }

    pub fn posix(mut self, posix: bool) -> Self {
        self.posix = posix;
        self
    }

    pub fn tty(mut self, tty: bool) -> Self {
        self.tty = tty;
        self
    }
}

impl Host for StaticHost {
    fn env(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn is_tty(&self) -> bool {
        self.tty
    }

    fn is_posix(&self) -> bool {
        self.posix
    }

    fn run(&self, program: &str, args: &[&str]) -> io::Result<String> {
        let mut key = program.to_string();
        for a in args {
            key.push(' ');
            key.push_str(a);
        }
        self.commands
            .get(&key)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, key))
    }
}
