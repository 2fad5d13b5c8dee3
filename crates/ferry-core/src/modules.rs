//! Module manager and code generation commands.
//!
//! Dependency regeneration is a black box to the engine: it asks the module
//! manager to tidy, vendor and verify a module directory, and runs the
//! configured manifest command. [`GoModules`] drives the `go` toolchain.

use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::Duration;

use ferry_git::CancelToken;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Module information as printed by `go list -json -m`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModuleInfo {
    pub path: String,
    #[serde(default)]
    pub version: String,
}

/// Operations on a module-managed source tree.
#[allow(clippy::missing_errors_doc)]
pub trait ModuleTool {
    /// Resolved requirement of `module` in the module rooted at `dir`.
    fn module_info(&self, dir: &Path, module: &str) -> Result<ModuleInfo>;

    /// Bring the requirement files in line with the sources.
    fn tidy(&self, dir: &Path) -> Result<()>;

    /// Copy dependencies into `vendor/`.
    fn vendor(&self, dir: &Path) -> Result<()>;

    /// Check dependency checksums.
    fn verify(&self, dir: &Path) -> Result<()>;

    /// Point `module` at `replacement` (`path@version`).
    fn replace(&self, dir: &Path, module: &str, replacement: &str) -> Result<()>;

    /// Run an arbitrary generation command in `dir`.
    fn run(&self, dir: &Path, command: &[String]) -> Result<()>;

    /// Tidy, vendor and verify `dir`.
    fn regenerate(&self, dir: &Path) -> Result<()> {
        self.tidy(dir)?;
        self.vendor(dir)?;
        self.verify(dir)
    }

    /// Run `command` until it succeeds, sleeping `backoff[i]` before retry `i`.
    ///
    /// Returns the last failure once `backoff` is exhausted.
    fn run_with_backoff(&self, dir: &Path, command: &[String], backoff: &[Duration]) -> Result<()> {
        let mut last = None;
        for delay in std::iter::once(&Duration::ZERO).chain(backoff) {
            if !delay.is_zero() {
                tracing::info!(command = %command.join(" "), delay = ?delay, "retrying");
                thread::sleep(*delay);
            }
            match self.run(dir, command) {
                Ok(()) => return Ok(()),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => last = Some(e),
            }
        }
        last.map_or(Ok(()), Err)
    }
}

/// [`ModuleTool`] backed by the `go` binary.
#[derive(Debug, Clone, Default)]
pub struct GoModules {
    cancel: CancelToken,
}

impl GoModules {
    /// Create a runner whose commands honor `cancel`.
    #[must_use]
    pub const fn new(cancel: CancelToken) -> Self {
        Self { cancel }
    }

    fn go(&self, dir: &Path, args: &[&str]) -> Result<String> {
        let mut command = vec!["go".to_string()];
        command.extend(args.iter().map(|a| (*a).to_string()));
        run_command(dir, &command, &self.cancel)
    }
}

impl ModuleTool for GoModules {
    fn module_info(&self, dir: &Path, module: &str) -> Result<ModuleInfo> {
        let output = self.go(dir, &["list", "-json", "-m", module])?;
        serde_json::from_str(&output).map_err(|e| Error::DependencyRegenerationFailure {
            command: format!("go list -json -m {module}"),
            dir: dir.to_path_buf(),
            output: format!("unparseable module info: {e}"),
        })
    }

    fn tidy(&self, dir: &Path) -> Result<()> {
        self.go(dir, &["mod", "tidy"]).map(drop)
    }

    fn vendor(&self, dir: &Path) -> Result<()> {
        self.go(dir, &["mod", "vendor"]).map(drop)
    }

    fn verify(&self, dir: &Path) -> Result<()> {
        self.go(dir, &["mod", "verify"]).map(drop)
    }

    fn replace(&self, dir: &Path, module: &str, replacement: &str) -> Result<()> {
        let directive = format!("-replace={module}={replacement}");
        self.go(dir, &["mod", "edit", &directive]).map(drop)
    }

    fn run(&self, dir: &Path, command: &[String]) -> Result<()> {
        run_command(dir, command, &self.cancel).map(drop)
    }
}

/// Run `command` in `dir` with the inherited environment, returning stdout.
fn run_command(dir: &Path, command: &[String], cancel: &CancelToken) -> Result<String> {
    cancel.check()?;

    let rendered = command.join(" ");
    let failure = |output: String| Error::DependencyRegenerationFailure {
        command: rendered.clone(),
        dir: dir.to_path_buf(),
        output,
    };

    let Some((program, args)) = command.split_first() else {
        return Err(failure("empty command".into()));
    };

    tracing::debug!(command = %rendered, dir = %dir.display(), "running command");
    let output = Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| failure(e.to_string()))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() {
        return Err(failure(format!("{stdout}{stderr}")));
    }

    tracing::debug!(command = %rendered, output = %stdout, "ran command");
    Ok(stdout)
}
