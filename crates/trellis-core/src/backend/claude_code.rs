//! Claude Code backend.
//!
//! Runs `claude -p --output-format json` as a subprocess, writes the prompt
//! to its stdin, and reads the single JSON result object it prints on exit.

use std::process::Stdio;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::trait_def::Backend;

/// Backend for [Claude Code](https://docs.anthropic.com/en/docs/claude-code)
/// in non-interactive print mode.
#[derive(Debug, Clone)]
pub struct ClaudeCodeBackend {
    /// Path to the `claude` binary. Defaults to `"claude"` (found via `$PATH`).
    binary_path: String,
    /// Model alias or id passed through `--model`, if set.
    model: Option<String>,
}

impl ClaudeCodeBackend {
    /// Create a new backend that will look for `claude` on `$PATH`.
    pub fn new() -> Self {
        Self {
            binary_path: "claude".to_string(),
            model: None,
        }
    }

    /// Create a new backend with a custom binary path.
    ///
    /// Useful for testing or when `claude` is installed in a non-standard
    /// location.
    pub fn with_binary(path: impl Into<String>) -> Self {
        Self {
            binary_path: path.into(),
            model: None,
        }
    }

    /// Select the model to request.
    pub fn model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn binary_path(&self) -> &str {
        &self.binary_path
    }
}

impl Default for ClaudeCodeBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the reply text from the process's stdout.
///
/// `claude --output-format json` prints one object of `"type": "result"`
/// with the reply under `result` and an `is_error` flag. Anything else on
/// stdout is taken verbatim as the reply, so plain-text commands can stand
/// in for `claude`.
fn parse_result_output(stdout: &str) -> Result<Option<String>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let text = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(v) if v.get("type").and_then(|t| t.as_str()) == Some("result") => {
            if v.get("is_error").and_then(|e| e.as_bool()).unwrap_or(false) {
                let message = v
                    .get("result")
                    .and_then(|r| r.as_str())
                    .unwrap_or("unknown error");
                bail!("backend reported an error: {message}");
            }
            v.get("result")
                .and_then(|r| r.as_str())
                .unwrap_or_default()
                .to_string()
        }
        _ => trimmed.to_string(),
    };

    if text.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

/// Wait for the stdin writer task. Returns `false` if it panicked or was
/// cancelled.
async fn join_prompt_writer(writer: JoinHandle<()>) -> bool {
    match writer.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "backend stdin writer task failed");
            false
        }
    }
}

#[async_trait]
impl Backend for ClaudeCodeBackend {
    fn name(&self) -> &str {
        "claude-code"
    }

    async fn complete(&self, prompt: &str) -> Result<Option<String>> {
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("-p").arg("--output-format").arg("json");
        if let Some(model) = &self.model {
            cmd.arg("--model").arg(model);
        }

        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().with_context(|| {
            format!(
                "failed to spawn claude binary at '{}' -- is it installed and on PATH?",
                self.binary_path
            )
        })?;

        // The prompt can be large (it embeds whole plans), so it goes over
        // stdin rather than argv. Writing happens alongside the wait so a
        // chatty child cannot fill its stdout pipe and stall us.
        let writer = child.stdin.take().map(|mut stdin| {
            let prompt = prompt.to_string();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                    warn!(error = %e, "failed to write prompt to backend stdin");
                }
            })
        });

        let output = child
            .wait_with_output()
            .await
            .context("failed to wait for backend process")?;

        if let Some(writer) = writer {
            join_prompt_writer(writer).await;
        }

        debug!(
            status = %output.status,
            stdout_bytes = output.stdout.len(),
            "backend process exited"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "backend exited with {}: {}",
                output.status,
                stderr.trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_result_output(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Write an executable shell script to stand in for `claude`.
    fn fake_binary(dir: &std::path::Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        path.to_str().unwrap().to_string()
    }

    // -- parse_result_output -------------------------------------------------

    #[test]
    fn parse_result_object() {
        let out = r#"{"type":"result","subtype":"success","is_error":false,"result":"hello"}"#;
        assert_eq!(parse_result_output(out).unwrap().as_deref(), Some("hello"));
    }

    #[test]
    fn parse_result_error_flag() {
        let out = r#"{"type":"result","is_error":true,"result":"rate limited"}"#;
        let err = parse_result_output(out).unwrap_err();
        assert!(err.to_string().contains("rate limited"), "got: {err}");
    }

    #[test]
    fn parse_blank_result_is_none() {
        let out = r#"{"type":"result","is_error":false,"result":"   "}"#;
        assert_eq!(parse_result_output(out).unwrap(), None);
        assert_eq!(parse_result_output("\n\n").unwrap(), None);
    }

    #[test]
    fn parse_plain_text_passes_through() {
        assert_eq!(
            parse_result_output("fn main() {}\n").unwrap().as_deref(),
            Some("fn main() {}")
        );
    }

    #[test]
    fn parse_non_result_json_passes_through() {
        let out = r#"{"version":"1.0.0"}"#;
        assert_eq!(parse_result_output(out).unwrap().as_deref(), Some(out));
    }

    // -- join_prompt_writer --------------------------------------------------

    #[tokio::test]
    async fn writer_join_reports_clean_finish() {
        let writer = tokio::spawn(async {});
        assert!(join_prompt_writer(writer).await);
    }

    #[tokio::test]
    async fn writer_join_absorbs_panicked_task() {
        let writer = tokio::spawn(async { panic!("stdin writer blew up") });
        assert!(!join_prompt_writer(writer).await);
    }

    // -- Integration tests with real subprocesses ----------------------------

    #[tokio::test]
    async fn complete_reads_result_from_fake_claude() {
        let tmp = tempfile::tempdir().unwrap();
        let bin = fake_binary(
            tmp.path(),
            "fake_claude.sh",
            "cat > /dev/null\n\
             echo '{\"type\":\"result\",\"is_error\":false,\"result\":\"generated text\"}'\n",
        );

        let backend = ClaudeCodeBackend::with_binary(bin);
        let reply = backend.complete("write something").await.unwrap();
        assert_eq!(reply.as_deref(), Some("generated text"));
    }

    #[tokio::test]
    async fn complete_sends_prompt_on_stdin() {
        let tmp = tempfile::tempdir().unwrap();
        // Echo stdin straight back as plain text.
        let bin = fake_binary(tmp.path(), "cat_claude.sh", "cat\n");

        let backend = ClaudeCodeBackend::with_binary(bin);
        let reply = backend.complete("round trip prompt").await.unwrap();
        assert_eq!(reply.as_deref(), Some("round trip prompt"));
    }

    #[tokio::test]
    async fn complete_passes_model_flag() {
        let tmp = tempfile::tempdir().unwrap();
        let bin = fake_binary(tmp.path(), "args_claude.sh", "cat > /dev/null\necho \"$@\"\n");

        let backend = ClaudeCodeBackend::with_binary(bin).model(Some("sonnet".to_string()));
        let reply = backend.complete("x").await.unwrap().unwrap();
        assert_eq!(reply, "-p --output-format json --model sonnet");
    }

    #[tokio::test]
    async fn complete_empty_output_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let bin = fake_binary(tmp.path(), "quiet_claude.sh", "cat > /dev/null\n");

        let backend = ClaudeCodeBackend::with_binary(bin);
        assert_eq!(backend.complete("x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn complete_nonzero_exit_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let bin = fake_binary(
            tmp.path(),
            "failing_claude.sh",
            "cat > /dev/null\necho 'not logged in' >&2\nexit 3\n",
        );

        let backend = ClaudeCodeBackend::with_binary(bin);
        let err = format!("{:#}", backend.complete("x").await.unwrap_err());
        assert!(err.contains("not logged in"), "got: {err}");
    }

    #[tokio::test]
    async fn complete_binary_not_found_returns_error() {
        let backend = ClaudeCodeBackend::with_binary("/nonexistent/path/to/claude");
        let err = format!("{:#}", backend.complete("x").await.unwrap_err());
        assert!(
            err.contains("failed to spawn claude binary"),
            "error message should mention binary spawn failure, got: {err}"
        );
    }

    #[test]
    fn backend_name_and_defaults() {
        let backend = ClaudeCodeBackend::default();
        assert_eq!(backend.name(), "claude-code");
        assert_eq!(backend.binary_path(), "claude");
    }
}
