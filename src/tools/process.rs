use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::time::{Duration, timeout};
use tracing::{debug, warn};

use super::ToolOutcome;

const MAX_OUTPUT_BYTES: usize = 100_000;

/// Find the largest byte index <= `index` that is a valid char boundary.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Keep the head of oversized tool output.
pub(crate) fn truncate_output(mut text: String) -> String {
    if text.len() > MAX_OUTPUT_BYTES {
        text.truncate(floor_char_boundary(&text, MAX_OUTPUT_BYTES));
        text.push_str("\n... [output truncated]");
    }
    text
}

/// The last `n` lines of `text`.
pub(crate) fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

/// Run a program to completion and classify the result.
///
/// The child is killed if `limit` elapses. Spawn failures (missing binary,
/// bad working directory) are errors, not outcomes.
pub(crate) async fn run_process(
    program: &Path,
    args: &[String],
    cwd: Option<&Path>,
    limit: Duration,
) -> Result<ToolOutcome> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    debug!(program = %program.display(), ?args, "spawning process");
    let child = cmd
        .spawn()
        .with_context(|| format!("failed to execute {}", program.display()))?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let output = match timeout(limit, child.wait_with_output()).await {
        Ok(result) => {
            result.with_context(|| format!("failed to wait for {}", program.display()))?
        }
        Err(_) => {
            warn!(program = %program.display(), secs = limit.as_secs(), "process timed out, killed");
            return Ok(ToolOutcome::TimedOut {
                after_secs: limit.as_secs(),
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = truncate_output(format!("{}{}", stderr, stdout));

    if output.status.success() {
        Ok(ToolOutcome::Success { output: combined })
    } else {
        Ok(ToolOutcome::Failure {
            exit_code: output.status.code(),
            diagnostics: combined,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_char_boundary_ascii() {
        assert_eq!(floor_char_boundary("hello", 3), 3);
        assert_eq!(floor_char_boundary("hello", 10), 5);
    }

    #[test]
    fn floor_char_boundary_multibyte() {
        // 'é' is 2 bytes; index 1 falls inside it
        assert_eq!(floor_char_boundary("é", 1), 0);
    }

    #[test]
    fn tail_keeps_last_lines() {
        assert_eq!(tail_lines("a\nb\nc\nd", 2), "c\nd");
        assert_eq!(tail_lines("a\nb", 5), "a\nb");
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_failure_outcome() {
        let outcome = run_process(
            Path::new("sh"),
            &["-c".to_string(), "echo boom >&2; exit 3".to_string()],
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        match outcome {
            ToolOutcome::Failure {
                exit_code,
                diagnostics,
            } => {
                assert_eq!(exit_code, Some(3));
                assert!(diagnostics.contains("boom"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_process_times_out() {
        let outcome = run_process(
            Path::new("sleep"),
            &["5".to_string()],
            None,
            Duration::from_millis(100),
        )
        .await
        .unwrap();

        assert!(matches!(outcome, ToolOutcome::TimedOut { .. }));
    }

    #[tokio::test]
    async fn missing_binary_is_an_error() {
        let result = run_process(
            Path::new("/no/such/binary"),
            &[],
            None,
            Duration::from_secs(1),
        )
        .await;
        assert!(result.is_err());
    }
}
