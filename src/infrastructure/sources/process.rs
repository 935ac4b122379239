use crate::shared::error::AppError;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Runs source CLIs with a hard deadline. The child is killed when the deadline passes.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns stdout on success.
    pub async fn run<S>(&self, program: S, args: &[&str], cwd: &Path) -> Result<String, AppError>
    where
        S: AsRef<OsStr>,
    {
        let program = program.as_ref();
        let label = command_label(program, args);

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        tracing::debug!(target: "sync::source::process", command = %label, "running source command");
        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(|err| AppError::ExternalCommand {
                command: label.clone(),
                message: format!("failed to start: {err}"),
            })?,
            Err(_) => {
                tracing::warn!(
                    target: "sync::source::process",
                    command = %label,
                    timeout_secs = self.timeout.as_secs(),
                    "source command timed out"
                );
                return Err(AppError::Timeout {
                    command: label,
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }

        // 認証エラーの文言はCLIによってstdoutに出る
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = [stderr.trim(), stdout.trim()]
            .into_iter()
            .find(|text| !text.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("exited with {}", output.status));

        Err(AppError::ExternalCommand {
            command: label,
            message,
        })
    }
}

fn command_label(program: &OsStr, args: &[&str]) -> String {
    let name = Path::new(program)
        .file_name()
        .unwrap_or(program)
        .to_string_lossy();
    if args.is_empty() {
        name.into_owned()
    } else {
        format!("{} {}", name, args.join(" "))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_stdout_on_success() {
        let runner = CommandRunner::new(Duration::from_secs(5));
        let out = runner
            .run("sh", &["-c", "echo synced"], Path::new("."))
            .await
            .unwrap();
        assert_eq!(out.trim(), "synced");
    }

    #[tokio::test]
    async fn failure_prefers_stderr_then_stdout() {
        let runner = CommandRunner::new(Duration::from_secs(5));
        let err = runner
            .run("sh", &["-c", "echo 'No WorkOS tokens found, please log in'; exit 1"], Path::new("."))
            .await
            .unwrap_err();
        assert_eq!(err.detail(), "No WorkOS tokens found, please log in");

        let err = runner
            .run("sh", &["-c", "echo out; echo boom >&2; exit 2"], Path::new("."))
            .await
            .unwrap_err();
        assert_eq!(err.detail(), "boom");
    }

    #[tokio::test]
    async fn hung_command_times_out() {
        let runner = CommandRunner::new(Duration::from_millis(100));
        let err = runner
            .run("sleep", &["5"], Path::new("."))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_reported() {
        let runner = CommandRunner::new(Duration::from_secs(5));
        let err = runner
            .run("/nonexistent/granola", &["sync"], Path::new("."))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "EXTERNAL_COMMAND_FAILED");
        assert!(err.to_string().contains("granola sync"));
    }
}
