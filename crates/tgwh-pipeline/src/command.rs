//! External commands run by the TRANSFORM and ENRICH_LOAD stages.

use std::path::Path;

use crate::StageError;

/// Output kept from a finished command.
#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Split a command line on whitespace. No shell quoting is supported.
fn split_command(command_line: &str) -> Option<(&str, Vec<&str>)> {
    let mut parts = command_line.split_whitespace();
    let program = parts.next()?;
    Some((program, parts.collect()))
}

/// Run `command_line` in `cwd` (or the current directory) and wait for it.
///
/// # Errors
///
/// Returns [`StageError::Command`] if the command is empty, cannot be
/// started, or exits unsuccessfully. The error carries the tail of stderr.
pub async fn run_command(command_line: &str, cwd: Option<&Path>) -> Result<CommandOutput, StageError> {
    let fail = |reason: String| StageError::Command {
        command: command_line.to_owned(),
        reason,
    };

    let (program, args) = split_command(command_line).ok_or_else(|| fail("empty command".to_owned()))?;

    let mut command = tokio::process::Command::new(program);
    command.args(&args).kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    tracing::info!(command = command_line, cwd = ?cwd, "running external command");
    let output = command
        .output()
        .await
        .map_err(|e| fail(format!("failed to start: {e}")))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(fail(format!("{}: {}", output.status, tail(&stderr, 20))));
    }

    tracing::debug!(command = command_line, stdout = %tail(&stdout, 20), "command finished");
    Ok(CommandOutput { stdout, stderr })
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_command_separates_program_and_args() {
        let (program, args) = split_command("dbt run --select staging").unwrap();
        assert_eq!(program, "dbt");
        assert_eq!(args, vec!["run", "--select", "staging"]);
        assert!(split_command("   ").is_none());
    }

    #[test]
    fn tail_keeps_last_lines() {
        assert_eq!(tail("a\nb\nc\nd", 2), "c\nd");
        assert_eq!(tail("only", 5), "only");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_command_returns_stdout() {
        let out = run_command("echo transformed", None).await.unwrap();
        assert_eq!(out.stdout.trim(), "transformed");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_is_command_error() {
        let err = run_command("false", None).await.unwrap_err();
        assert!(matches!(err, StageError::Command { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_command_error() {
        let err = run_command("definitely-not-a-real-binary-tgwh", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_given_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_command("pwd", Some(dir.path())).await.unwrap();
        let reported = std::path::PathBuf::from(out.stdout.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }
}
