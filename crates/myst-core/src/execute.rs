/*
 * execute.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Contract with the external cell executor.
 */

//! Execution of code cells.
//!
//! The engine does not run code itself. A [`CellExecutor`] receives a
//! cell's source and kernel name and returns typed outputs. The
//! `code-cells` pass decides when to call it, applies the timeout, and
//! caches the outputs.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use myst_ast::{Node, NodeKind, OutputsPayload};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// One cell to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRequest {
    pub source: String,
    pub kernel: String,
    /// Path of the document the cell belongs to
    pub document: String,
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("no kernel named `{0}`")]
    UnknownKernel(String),

    #[error("kernel `{kernel}` failed: {message}")]
    Kernel { kernel: String, message: String },

    #[error("execution timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error while executing: {0}")]
    Io(#[from] std::io::Error),
}

/// An external executor of code cells.
///
/// Implementations must be `Send + Sync`; one executor is shared by every
/// worker of a build.
#[async_trait]
pub trait CellExecutor: Send + Sync {
    fn name(&self) -> &str;

    /// Run one cell. A cell that raises returns `Ok` with an error output;
    /// `Err` is for failures of the kernel itself.
    async fn execute(&self, request: &CellRequest) -> Result<Vec<OutputsPayload>, ExecutionError>;

    /// Whether this executor can run cells for `kernel`.
    fn supports(&self, _kernel: &str) -> bool {
        true
    }

    /// Whether the executor's runtime is present on this system.
    fn is_available(&self) -> bool {
        true
    }
}

/// Build an `outputs` node from executor results.
pub fn outputs_node(payloads: &[OutputsPayload]) -> Result<Node, serde_json::Error> {
    let children = payloads
        .iter()
        .map(|payload| {
            Ok(Node::new(NodeKind::Output {
                jupyter_data: serde_json::to_value(payload)?,
            }))
        })
        .collect::<Result<Vec<_>, serde_json::Error>>()?;
    Ok(Node::with_children(NodeKind::Outputs, children))
}

/// Runs cells by piping their source to an interpreter's standard input.
///
/// Each kernel name maps to a command line, for example `python3` to
/// `python3 -`. Standard output and standard error become stream outputs;
/// a nonzero exit status adds an error output.
#[derive(Debug, Clone, Default)]
pub struct SubprocessExecutor {
    kernels: HashMap<String, Vec<String>>,
}

impl SubprocessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor with the usual interpreters for Python, R and shell.
    pub fn with_defaults() -> Self {
        SubprocessExecutor::new()
            .kernel("python3", &["python3", "-"])
            .kernel("python", &["python3", "-"])
            .kernel("ir", &["Rscript", "-"])
            .kernel("bash", &["bash", "-s"])
    }

    pub fn kernel(mut self, name: &str, command: &[&str]) -> Self {
        self.kernels.insert(
            name.to_string(),
            command.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    fn command(&self, kernel: &str) -> Option<&[String]> {
        self.kernels.get(kernel).map(Vec::as_slice)
    }
}

#[async_trait]
impl CellExecutor for SubprocessExecutor {
    fn name(&self) -> &str {
        "subprocess"
    }

    async fn execute(&self, request: &CellRequest) -> Result<Vec<OutputsPayload>, ExecutionError> {
        let Some((program, args)) = self.command(&request.kernel).and_then(|c| c.split_first())
        else {
            return Err(ExecutionError::UnknownKernel(request.kernel.clone()));
        };
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| ExecutionError::Kernel {
                kernel: request.kernel.clone(),
                message: err.to_string(),
            })?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request.source.as_bytes()).await?;
            stdin.shutdown().await?;
        }
        let output = child.wait_with_output().await?;

        let mut payloads = Vec::new();
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.is_empty() {
            payloads.push(OutputsPayload::Stream {
                name: "stdout".into(),
                text: stdout.into_owned(),
            });
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            payloads.push(OutputsPayload::Stream {
                name: "stderr".into(),
                text: stderr.clone().into_owned(),
            });
        }
        if !output.status.success() {
            payloads.push(OutputsPayload::Error {
                ename: "ProcessError".into(),
                evalue: output.status.to_string(),
                traceback: stderr.lines().map(str::to_string).collect(),
            });
        }
        Ok(payloads)
    }

    fn supports(&self, kernel: &str) -> bool {
        self.kernels.contains_key(kernel)
    }

    fn is_available(&self) -> bool {
        self.kernels
            .values()
            .filter_map(|c| c.first())
            .any(|program| which::which(program).is_ok())
    }
}

/// Executor that replays canned outputs, keyed by cell source.
///
/// Used in tests and for reproducing builds without kernels.
#[derive(Debug, Clone, Default)]
pub struct ReplayExecutor {
    outputs: IndexMap<String, Vec<OutputsPayload>>,
}

impl ReplayExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: &str, outputs: Vec<OutputsPayload>) -> Self {
        self.outputs.insert(source.to_string(), outputs);
        self
    }
}

#[async_trait]
impl CellExecutor for ReplayExecutor {
    fn name(&self) -> &str {
        "replay"
    }

    async fn execute(&self, request: &CellRequest) -> Result<Vec<OutputsPayload>, ExecutionError> {
        self.outputs
            .get(&request.source)
            .cloned()
            .ok_or_else(|| ExecutionError::Kernel {
                kernel: request.kernel.clone(),
                message: "no recorded outputs for this cell".into(),
            })
    }
}
