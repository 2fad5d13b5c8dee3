//! Runner for `git` subprocesses.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};

/// Captured output of a successful command.
#[derive(Debug, Clone, Default)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
}

/// A single `git` invocation.
#[derive(Debug, Default)]
pub struct GitCommand {
    args: Vec<OsString>,
    env: Vec<(&'static str, &'static str)>,
    redact: Vec<String>,
}

impl GitCommand {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            // Never block on an editor or a credential prompt.
            env: vec![("GIT_EDITOR", "true"), ("GIT_TERMINAL_PROMPT", "0")],
            redact: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Hide `secret` from logs and error messages.
    pub fn redact(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.redact.push(secret);
        }
        self
    }

    fn censor(&self, text: &str) -> String {
        self.redact
            .iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret, "[redacted]"))
    }

    fn display(&self) -> String {
        let rendered: Vec<String> = self
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        self.censor(&format!("git {}", rendered.join(" ")))
    }

    /// Run the command in `dir`, failing on a non-zero exit status.
    pub fn run(&self, dir: &Path, cancel: &CancelToken) -> Result<Output> {
        cancel.check()?;

        let command = self.display();
        tracing::debug!(%command, dir = %dir.display(), "running command");

        let output = Command::new("git")
            .args(&self.args)
            .envs(self.env.iter().copied())
            .current_dir(dir)
            .output()
            .map_err(Error::Spawn)?;

        let stdout = self.censor(&String::from_utf8_lossy(&output.stdout));
        let stderr = self.censor(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(Error::CommandFailed {
                command,
                output: format!("{stdout}{stderr}"),
            });
        }

        tracing::debug!(%command, output = %stdout, "ran command");
        Ok(Output { stdout, stderr })
    }
}
