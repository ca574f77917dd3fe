//! Running the phase query.
//!
//! [`PodQuery`] is the capability a condition needs from its host: run a
//! command, hand back its standard output and exit code, and forward its
//! standard error to the build log. [`KubectlQuery`] does that with a local
//! `kubectl` process; tests substitute their own implementation.
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::command::{QueryCommand, KUBECTL};
use crate::log::LogSink;

/// What a finished query process left behind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryOutput {
    /// The exit code, or `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Everything the process wrote to standard output.
    pub stdout: Vec<u8>,
}

impl QueryOutput {
    /// Output of a process that exited with `exit_code` after printing `stdout`.
    pub fn new(exit_code: i32, stdout: impl Into<Vec<u8>>) -> Self {
        QueryOutput {
            exit_code: Some(exit_code),
            stdout: stdout.into(),
        }
    }

    /// Whether the process exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a `kubectl` command on behalf of a condition.
///
/// **Note**: this trait is defined using [async-trait](https://crates.io/crates/async-trait).
#[async_trait]
pub trait PodQuery: Send + Sync {
    /// Run `command` with `env` exported to it and wait for it to finish.
    ///
    /// Standard error is written to `sink` line by line. An `Err` means the
    /// command could not be run or its output could not be collected; a
    /// command that ran and failed is reported through
    /// [`QueryOutput::exit_code`].
    async fn run(
        &self,
        command: &QueryCommand,
        env: &HashMap<String, String>,
        sink: &mut dyn LogSink,
    ) -> io::Result<QueryOutput>;
}

/// Runs queries with a local `kubectl` binary.
#[derive(Clone, Debug)]
pub struct KubectlQuery {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl KubectlQuery {
    /// Use the binary at `program` instead of `kubectl` from the `PATH`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        KubectlQuery {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill the process and fail the query if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for KubectlQuery {
    fn default() -> Self {
        KubectlQuery::new(KUBECTL)
    }
}

#[async_trait]
impl PodQuery for KubectlQuery {
    async fn run(
        &self,
        command: &QueryCommand,
        env: &HashMap<String, String>,
        sink: &mut dyn LogSink,
    ) -> io::Result<QueryOutput> {
        debug!(program = %self.program.display(), %command, "launching query");
        let mut child = Command::new(&self.program)
            .args(command.args())
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stderr was not captured"))?;

        // Lines forwarded before a timeout stay in the sink
        let finished = async {
            let mut output = Vec::new();
            let (status, _, _) = tokio::try_join!(
                child.wait(),
                stdout.read_to_end(&mut output),
                forward_lines(stderr, sink),
            )?;
            Ok::<_, io::Error>((status, output))
        };
        let (status, stdout) = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, finished)
                .await
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("{} did not finish within {:?}", command, timeout),
                    )
                })??,
            None => finished.await?,
        };

        debug!(exit_code = ?status.code(), "query finished");
        Ok(QueryOutput {
            exit_code: status.code(),
            stdout,
        })
    }
}

/// Writes each line of `reader` to `sink` as soon as it is complete.
async fn forward_lines(reader: impl AsyncRead + Unpin, sink: &mut dyn LogSink) -> io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    while reader.read_until(b'\n', &mut line).await? > 0 {
        let text = line.strip_suffix(b"\n").unwrap_or(&line);
        let text = text.strip_suffix(b"\r").unwrap_or(text);
        sink.log_line(&String::from_utf8_lossy(text));
        line.clear();
    }
    Ok(())
}
