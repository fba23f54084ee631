use crate::error::{ExtractError, Result};
use std::ffi::OsStr;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How a tool run is judged successful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessCheck {
    /// Exit status zero and at least some output.
    ExitStatus,
    /// More than `min_lines` lines of combined output, regardless of exit
    /// status. Only for tools that report nothing better.
    OutputLines { min_lines: usize },
}

#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn line_count(&self) -> usize {
        self.stdout.lines().count() + self.stderr.lines().count()
    }

    pub fn has_output(&self) -> bool {
        !self.stdout.trim().is_empty() || !self.stderr.trim().is_empty()
    }

    pub fn is_success(&self, check: SuccessCheck) -> bool {
        match check {
            SuccessCheck::ExitStatus => self.status.success() && self.has_output(),
            SuccessCheck::OutputLines { min_lines } => self.line_count() > min_lines,
        }
    }

    /// Last non-empty line of stderr, falling back to stdout.
    pub fn last_line(&self) -> Option<&str> {
        self.stderr
            .lines()
            .rev()
            .chain(self.stdout.lines().rev())
            .map(str::trim)
            .find(|line| !line.is_empty())
    }
}

/// Runs external tools with captured output and a hard time limit.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    timeout: Duration,
}

impl ToolRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn run<I, S>(&self, program: &str, args: I) -> Result<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExtractError::BackendToolFailure {
                tool: program.to_string(),
                message: format!("failed to start: {}", e),
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match self.wait_with_timeout(&mut child) {
            Ok(status) => status,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                // Grandchildren may still hold the pipes open, so the readers are not joined.
                if matches!(e, ExtractError::ToolTimeout { .. }) {
                    log::error!("{} exceeded {:?}, killed", program, self.timeout);
                    return Err(ExtractError::ToolTimeout {
                        tool: program.to_string(),
                        seconds: self.timeout.as_secs(),
                    });
                }
                return Err(e);
            }
        };

        Ok(ToolOutput {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }

    fn wait_with_timeout(&self, child: &mut Child) -> Result<ExitStatus> {
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if start.elapsed() > self.timeout {
                return Err(ExtractError::ToolTimeout {
                    tool: String::new(),
                    seconds: self.timeout.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            String::from_utf8_lossy(&buffer).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn runner() -> ToolRunner {
        ToolRunner::new(Duration::from_secs(10))
    }

    #[test]
    fn test_captures_output() {
        let output = runner()
            .run("sh", ["-c", "echo one; echo two; echo err >&2"])
            .unwrap();
        assert!(output.status.success());
        assert_eq!(output.line_count(), 3);
        assert!(output.is_success(SuccessCheck::ExitStatus));
        assert_eq!(output.last_line(), Some("err"));
    }

    #[test]
    fn test_exit_status_check() {
        let output = runner().run("sh", ["-c", "echo oops; exit 2"]).unwrap();
        assert!(!output.is_success(SuccessCheck::ExitStatus));

        let silent = runner().run("sh", ["-c", "exit 0"]).unwrap();
        assert!(!silent.is_success(SuccessCheck::ExitStatus));
    }

    #[test]
    fn test_output_lines_check() {
        let output = runner()
            .run("sh", ["-c", "printf 'a\\nb\\nc\\nd\\ne\\n'"])
            .unwrap();
        assert!(output.is_success(SuccessCheck::OutputLines { min_lines: 4 }));
        assert!(!output.is_success(SuccessCheck::OutputLines { min_lines: 5 }));
    }

    #[test]
    fn test_timeout_kills_child() {
        let runner = ToolRunner::new(Duration::from_millis(200));
        let start = Instant::now();
        let error = runner.run("sh", ["-c", "sleep 5"]).unwrap_err();
        assert!(matches!(error, ExtractError::ToolTimeout { ref tool, .. } if tool == "sh"));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_missing_program() {
        let error = runner()
            .run("definitely-not-an-installed-tool", ["x"])
            .unwrap_err();
        assert!(matches!(error, ExtractError::BackendToolFailure { .. }));
    }
}
