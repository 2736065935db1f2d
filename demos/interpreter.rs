//! # Example: interpreter runner
//!
//! Pipes a snippet of code into an interpreter subprocess under a deadline and
//! prints whatever it wrote, in message-sized chunks.
//!
//! Failures are reported as `"{kind}: {message}"`, an elapsed deadline as
//! `"Timeout while running code"`. Output delivery is itself a task that waits
//! on the first one.
//!
//! ## Run
//! ```bash
//! echo 'print(6 * 7)' | cargo run --example interpreter --features logging -- "python3 -q" 2000
//! echo 'while True: pass' | cargo run --example interpreter --features logging -- python3 500
//! ```

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use safetask::{
    LogWriter, RunnerConfig, SafeResult, Subscribe, TaskError, TaskFactory, TaskRunner,
};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Max characters per delivered message.
const CHUNK_CHARS: usize = 4096;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(command) = args.next() else {
        bail!("usage: interpreter <command> [timeout_ms] < code");
    };
    let timeout_ms: u64 = match args.next() {
        Some(ms) => ms.parse().context("timeout_ms must be an integer")?,
        None => 2000,
    };
    let code = std::io::read_to_string(std::io::stdin()).context("reading code from stdin")?;

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let cfg = RunnerConfig {
        grace: Duration::from_secs(5),
        ..RunnerConfig::default()
    };
    let runner = TaskRunner::builder(cfg).with_subscribers(subs).build()?;

    let interpreters = TaskFactory::new(
        |e: TaskError| e.as_message(),
        || "Timeout while running code".to_string(),
    )
    .with_name("interpreter");

    let output = runner.timeout(
        interpreters.new_task(move |_ctx| run_interpreter(command, code)),
        Duration::from_millis(timeout_ms),
    );

    let delivery = runner.run(
        TaskFactory::new(
            |e: TaskError| format!("Error while sending output: {}", e.as_message()),
            || "Timeout while sending output".to_string(),
        )
        .with_name("delivery")
        .new_task(move |_ctx| deliver(output)),
    );
    println!("{}", delivery.get());

    runner.quit_all()?;
    Ok(())
}

/// Runs `command` with `code` on stdin; stdout and stderr are both collected.
async fn run_interpreter(command: String, code: String) -> Result<String, TaskError> {
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| TaskError::fail("InvalidCommand", "empty interpreter command"))?;

    let mut child = Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(io_error)?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(code.as_bytes()).await.map_err(io_error)?;
        stdin.write_all(b"\n").await.map_err(io_error)?;
    }

    let out = child.wait_with_output().await.map_err(io_error)?;
    let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&out.stderr));
    Ok(text)
}

/// Waits for the interpreter output and prints it chunk by chunk.
async fn deliver(output: SafeResult<String>) -> Result<String, TaskError> {
    let text = output.wait().await;
    let chunks = split_chunks(&text, CHUNK_CHARS);
    for chunk in &chunks {
        println!("{chunk}");
    }
    Ok(format!("delivered {} chunk(s)", chunks.len()))
}

fn io_error(e: std::io::Error) -> TaskError {
    TaskError::fail(format!("{:?}", e.kind()), e.to_string())
}

/// Splits `text` into pieces of at most `max` characters.
///
/// Every character lands in exactly one piece; empty input yields no pieces.
fn split_chunks(text: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let cut = rest
            .char_indices()
            .nth(max)
            .map_or(rest.len(), |(idx, _)| idx);
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_cover_every_char_once() {
        assert!(split_chunks("", 4).is_empty());
        assert_eq!(split_chunks("abcd", 4), vec!["abcd"]);
        assert_eq!(split_chunks("abcdefghi", 4), vec!["abcd", "efgh", "i"]);
        assert_eq!(split_chunks("ééééé", 2), vec!["éé", "éé", "é"]);
    }
}
