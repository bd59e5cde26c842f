//! Typed git process invocation.
//!
//! Every call to the `git` binary goes through [`GitCommand`]: an argument
//! vector plus transient environment, never a shell string. Output is always
//! captured in full.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured result of a finished git process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout and stderr joined, for diagnostics that git splits across both.
    pub fn combined(&self) -> String {
        match (self.stdout.trim(), self.stderr.trim()) {
            ("", err) => err.to_string(),
            (out, "") => out.to_string(),
            (out, err) => format!("{out}\n{err}"),
        }
    }
}

/// A single git invocation.
#[derive(Debug, Clone)]
pub struct GitCommand {
    cwd: PathBuf,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl GitCommand {
    /// Start building a command that runs in `cwd`.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            args: Vec::new(),
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

    /// Add environment variables for this process only.
    ///
    /// Values are never included in the command's display form.
    pub fn envs(mut self, envs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.envs.extend(envs);
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The argument vector as passed to git.
    pub fn argv(&self) -> &[String] {
        &self.args
    }

    /// Run to completion and capture output, whatever the exit status.
    pub fn output(&self) -> Result<GitOutput> {
        tracing::debug!(command = %self, cwd = %self.cwd.display(), "Running git");

        let mut child = Command::new("git")
            .args(&self.args)
            .current_dir(&self.cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn {
                command: self.to_string(),
                source,
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait(&mut child)?;

        Ok(GitOutput {
            code: status.code(),
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }

    /// Run and require a zero exit status.
    pub fn run(&self) -> Result<GitOutput> {
        let output = self.output()?;
        if output.success() {
            Ok(output)
        } else {
            Err(self.failure(&output))
        }
    }

    /// Build the generic failure for a non-zero exit.
    pub fn failure(&self, output: &GitOutput) -> Error {
        Error::CommandFailed {
            command: self.to_string(),
            code: output.code,
            stderr: output.combined(),
        }
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus> {
        let spawn_error = |source| Error::Spawn {
            command: self.to_string(),
            source,
        };

        // A limit past the clock's range behaves like no limit
        let Some((limit, deadline)) = self
            .timeout
            .and_then(|limit| Some((limit, Instant::now().checked_add(limit)?)))
        else {
            return child.wait().map_err(spawn_error);
        };

        loop {
            if let Some(status) = child.try_wait().map_err(spawn_error)? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                if let Err(e) = child.kill() {
                    tracing::warn!(command = %self, error = %e, "Failed to kill timed out git");
                }
                let _ = child.wait();
                return Err(Error::Timeout {
                    command: self.to_string(),
                    after: limit,
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl std::fmt::Display for GitCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "git")?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn display_quotes_arguments_with_spaces_and_hides_env() {
        let cmd = GitCommand::new(".")
            .args(["commit", "-m", "two words"])
            .envs([("GIT_CONFIG_VALUE_0".to_string(), "secret".to_string())]);
        let shown = cmd.to_string();
        assert_eq!(shown, r#"git commit -m "two words""#);
        assert!(!shown.contains("secret"));
    }

    #[test]
    fn captures_non_zero_exit() {
        let temp = TempDir::new().unwrap();
        let output = GitCommand::new(temp.path())
            .args(["rev-parse", "HEAD"])
            .output()
            .unwrap();
        assert!(!output.success());
        assert!(!output.stderr.is_empty());
    }

    #[test]
    fn run_maps_failure_to_command_failed() {
        let temp = TempDir::new().unwrap();
        let err = GitCommand::new(temp.path())
            .args(["rev-parse", "HEAD"])
            .run()
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }), "got: {err}");
    }

    #[test]
    fn huge_timeout_waits_normally() {
        let temp = TempDir::new().unwrap();
        let output = GitCommand::new(temp.path())
            .arg("--version")
            .timeout(Some(Duration::MAX))
            .run()
            .unwrap();
        assert!(output.stdout.starts_with("git version"));
    }

    #[cfg(unix)]
    #[test]
    fn hung_command_is_killed_at_timeout() {
        let temp = TempDir::new().unwrap();
        let started = Instant::now();
        let err = GitCommand::new(temp.path())
            .args(["-c", "alias.hang=!sleep 30", "hang"])
            .timeout(Some(Duration::from_millis(300)))
            .output()
            .unwrap_err();

        assert!(
            matches!(&err, Error::Timeout { after, .. } if *after == Duration::from_millis(300)),
            "got: {err}"
        );
        assert_eq!(err.kind(), crate::ErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn metacharacters_are_passed_literally() {
        let temp = TempDir::new().unwrap();
        let output = GitCommand::new(temp.path())
            .args(["check-ref-format", "--branch", "$(touch pwned)"])
            .output()
            .unwrap();
        assert!(!output.success());
        assert!(!temp.path().join("pwned").exists());
    }
}
