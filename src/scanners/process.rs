//! External tool execution.
//!
//! Subfinder, httpx, naabu and nuclei run as child processes with piped
//! stdout/stderr. Output is read incrementally to avoid pipe-buffer stalls,
//! the tool's own chatter on stderr is kept out of the worker's log stream
//! (surfaced at debug only), and cancellation kills the child promptly.

use std::process::Stdio;
use std::time::Instant;

use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error_handling::AppError;

/// Captured output of a finished tool run.
#[derive(Debug)]
pub struct ToolOutput {
    /// Stdout, split into lines
    pub stdout_lines: Vec<String>,
    /// Last few lines of stderr, for error reporting
    pub stderr_tail: String,
}

/// How many trailing stderr lines are kept for error messages.
const STDERR_TAIL_LINES: usize = 10;

/// Runs an external tool to completion, honoring cancellation.
///
/// `stdin` content, when given, is written to the child's stdin which is then
/// closed so list-reading tools see EOF.
///
/// # Errors
///
/// - spawn failures and non-zero exits surface as scanner errors carrying the
///   stderr tail;
/// - cancellation kills the child and surfaces as a timeout error.
pub async fn run_tool(
    cancel: &CancellationToken,
    tool: &str,
    args: &[String],
    stdin: Option<String>,
) -> Result<ToolOutput, AppError> {
    let start = Instant::now();
    debug!("Executing: {tool} {args:?}");

    let mut cmd = Command::new(tool);
    cmd.args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| AppError::scanner(format!("failed to spawn {tool}"), e))?;

    if let Some(content) = stdin {
        let mut handle = child.stdin.take().expect("stdin requested but not piped");
        let tool_name = tool.to_string();
        // Written concurrently with output draining: a large target list must
        // not deadlock against a full stdout pipe
        tokio::spawn(async move {
            if let Err(e) = handle.write_all(content.as_bytes()).await {
                debug!("failed to write {tool_name} stdin: {e}");
            }
        });
    }

    let stdout = BufReader::new(child.stdout.take().expect("stdout piped"));
    let stderr = BufReader::new(child.stderr.take().expect("stderr piped"));

    let drive = async {
        let (stdout_lines, stderr_lines, status) = tokio::join!(
            read_lines(stdout),
            read_lines(stderr),
            child.wait(),
        );
        (stdout_lines, stderr_lines, status)
    };

    let (stdout_lines, stderr_lines, status) = tokio::select! {
        out = drive => out,
        _ = cancel.cancelled() => {
            // kill_on_drop reaps the child once it goes out of scope
            return Err(AppError::timeout(format!(
                "{tool} execution cancelled after {:.1}s",
                start.elapsed().as_secs_f64()
            )));
        }
    };

    let stdout_lines =
        stdout_lines.map_err(|e| AppError::scanner(format!("failed to read {tool} stdout"), e))?;
    let stderr_lines =
        stderr_lines.map_err(|e| AppError::scanner(format!("failed to read {tool} stderr"), e))?;
    let status =
        status.map_err(|e| AppError::scanner(format!("failed to wait for {tool}"), e))?;

    let stderr_tail = tail(&stderr_lines);
    if !stderr_tail.is_empty() {
        debug!("{tool} stderr: {stderr_tail}");
    }

    if !status.success() {
        return Err(AppError::scanner_msg(format!(
            "{tool} exited with {}: {stderr_tail}",
            status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string()),
        )));
    }

    debug!(
        "{tool} finished in {:.1}s with {} output lines",
        start.elapsed().as_secs_f64(),
        stdout_lines.len()
    );

    Ok(ToolOutput {
        stdout_lines,
        stderr_tail,
    })
}

async fn read_lines<R>(reader: BufReader<R>) -> std::io::Result<Vec<String>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = Vec::new();
    let mut reader = reader.lines();
    while let Some(line) = reader.next_line().await? {
        lines.push(line);
    }
    Ok(lines)
}

fn tail(lines: &[String]) -> String {
    let skip = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[skip..].join("\n")
}
