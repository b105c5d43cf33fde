//! External tool invocation.
//!
//! qrencode, magick and pdflatex are black boxes: the pipeline hands each one
//! an argument list (and sometimes stdin bytes) and judges the result by exit
//! status, stdout and stderr alone. [`ToolRunner`] is that boundary.
//! [`SystemToolRunner`] spawns real child processes; tests substitute a fake.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ffi::{OsStr, OsString};
use std::future::Future;
use std::io;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// One external command: program, arguments, optional stdin payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub stdin: Option<Vec<u8>>,
}

impl ToolInvocation {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Bytes written to the child's stdin, which is then closed.
    pub fn stdin(mut self, bytes: Vec<u8>) -> Self {
        self.stdin = Some(bytes);
        self
    }

    /// The program name as a lossy string.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Shell-like rendering for log lines.
    pub fn display(&self) -> String {
        let mut s = self.program_name();
        for a in &self.args {
            s.push(' ');
            s.push_str(&a.to_string_lossy());
        }
        s
    }
}

/// What came back from a finished tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    /// `None` when the child was killed by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

static RE_TEX_ERROR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:!|.+:\d+: )").unwrap());

impl ToolOutput {
    /// Human-readable reason for a failure.
    ///
    /// stderr when the tool wrote any; otherwise TeX-style error lines
    /// (`! ...` or `file:line: ...`) from stdout, or its last lines.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }

        let stdout = String::from_utf8_lossy(&self.stdout);
        let lines: Vec<&str> = stdout.lines().collect();
        let errors: Vec<&str> = lines
            .iter()
            .copied()
            .filter(|l| RE_TEX_ERROR.is_match(l))
            .collect();
        if !errors.is_empty() {
            return errors.join("\n");
        }

        let tail = lines.len().saturating_sub(20);
        let tail = lines[tail..].join("\n");
        if tail.trim().is_empty() {
            match self.code {
                Some(code) => format!("exited with status {code}"),
                None => "terminated by signal".to_string(),
            }
        } else {
            tail
        }
    }
}

/// Runs external tools.
///
/// Implementations must not interpret the arguments: they only start the
/// program, feed stdin, and report what happened. An `Err` means the
/// program could not be run at all (e.g. not installed).
pub trait ToolRunner: Send + Sync {
    fn run(
        &self,
        invocation: &ToolInvocation,
    ) -> impl Future<Output = io::Result<ToolOutput>> + Send;
}

/// Spawns real child processes through `tokio::process`.
///
/// No timeout is applied: a hung tool hangs the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToolRunner;

impl ToolRunner for SystemToolRunner {
    async fn run(&self, invocation: &ToolInvocation) -> io::Result<ToolOutput> {
        debug!("Running: {}", invocation.display());

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;

        // Feed stdin from its own task so a child that writes before it has
        // read everything cannot block us.
        let writer = match (child.stdin.take(), invocation.stdin.clone()) {
            (Some(mut pipe), Some(bytes)) => Some(tokio::spawn(async move {
                let res = pipe.write_all(&bytes).await;
                drop(pipe);
                res
            })),
            _ => None,
        };

        let output = child.wait_with_output().await?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                // The child may exit without draining stdin; its exit status
                // is the authoritative result.
                Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(io::Error::other(e)),
            }
        }

        Ok(ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_builder() {
        let inv = ToolInvocation::new("qrencode")
            .args(["-o", "-"])
            .arg("cashuAbc")
            .stdin(vec![1, 2, 3]);
        assert_eq!(inv.program_name(), "qrencode");
        assert_eq!(inv.args.len(), 3);
        assert_eq!(inv.display(), "qrencode -o - cashuAbc");
        assert_eq!(inv.stdin.as_deref(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn diagnostic_prefers_stderr() {
        let out = ToolOutput {
            success: false,
            code: Some(1),
            stdout: b"noise".to_vec(),
            stderr: "  magick: unable to open image  \n".into(),
        };
        assert_eq!(out.diagnostic(), "magick: unable to open image");
    }

    #[test]
    fn diagnostic_extracts_tex_errors() {
        let stdout = "This is pdfTeX\n(./ecash_notes.tex\n! LaTeX Error: File `tikz.sty' not found.\nType X to quit\n";
        let out = ToolOutput {
            success: false,
            code: Some(1),
            stdout: stdout.as_bytes().to_vec(),
            stderr: String::new(),
        };
        assert_eq!(
            out.diagnostic(),
            "! LaTeX Error: File `tikz.sty' not found."
        );
    }

    #[test]
    fn diagnostic_falls_back_to_tail_then_status() {
        let out = ToolOutput {
            success: false,
            code: Some(3),
            stdout: b"line one\nline two\n".to_vec(),
            stderr: String::new(),
        };
        assert_eq!(out.diagnostic(), "line one\nline two");

        let silent = ToolOutput {
            success: false,
            code: Some(3),
            ..ToolOutput::default()
        };
        assert_eq!(silent.diagnostic(), "exited with status 3");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn system_runner_pipes_stdin() {
        let inv = ToolInvocation::new("cat").stdin(b"hello".to_vec());
        let out = SystemToolRunner.run(&inv).await.expect("cat should run");
        assert!(out.success);
        assert_eq!(out.stdout, b"hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn system_runner_reports_exit_status() {
        let inv = ToolInvocation::new("sh").args(["-c", "echo oops >&2; exit 4"]);
        let out = SystemToolRunner.run(&inv).await.expect("sh should run");
        assert!(!out.success);
        assert_eq!(out.code, Some(4));
        assert_eq!(out.diagnostic(), "oops");
    }

    #[tokio::test]
    async fn system_runner_missing_program_is_err() {
        let inv = ToolInvocation::new("definitely-not-a-real-tool-7f3a");
        assert!(SystemToolRunner.run(&inv).await.is_err());
    }
}
