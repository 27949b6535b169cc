//! Terraform subprocess execution
//!
//! Every Terraform phase goes through [`ProcessRunner::run_with`]: both
//! output streams are read line by line while the process runs, each line is
//! appended to the [`OperationLog`] under `(cluster, phase)` and echoed at
//! `debug` level. There are no retries and no timeouts at this layer.

use crate::error::{Result, TerraformError};
use crate::oplog::{OperationLog, Phase, Stream};
use crate::outputs::OutputSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Name of the variables file every planning command reads
const VAR_FILE_ARG: &str = "-var-file=terraform.tfvars";

/// One Terraform command line, tagged with the phase it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    phase: Phase,
    args: Vec<String>,
}

impl Invocation {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn as_args(&self) -> &[String] {
        &self.args
    }

    pub fn version() -> Self {
        Self::new(Phase::Version).arg("-version")
    }

    pub fn init() -> Self {
        Self::new(Phase::Init).arg("init")
    }

    /// `apply`, passing each `(key, value)` as `-var key=value`
    pub fn apply<'a>(vars: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut invocation = Self::new(Phase::Apply).args(["apply", VAR_FILE_ARG, "-auto-approve"]);
        for (key, value) in vars {
            invocation = invocation.arg("-var").arg(format!("{}={}", key, value));
        }
        invocation
    }

    pub fn destroy() -> Self {
        Self::new(Phase::Destroy).args(["destroy", VAR_FILE_ARG, "-auto-approve", "-refresh"])
    }

    pub fn refresh() -> Self {
        Self::new(Phase::Refresh).args(["refresh", VAR_FILE_ARG])
    }

    pub fn show_json() -> Self {
        Self::new(Phase::Show).args(["show", "-json"])
    }

    pub fn import(phase: Phase, address: &str, id: &str) -> Self {
        Self::new(phase).args(["import", address, id])
    }

    pub fn state_rm(phase: Phase, address: &str) -> Self {
        Self::new(phase).args(["state", "rm", address])
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // secret -var values stay out of logs
        let mut redact_next = false;
        let mut first = true;
        for arg in &self.args {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            if redact_next {
                let key = arg.split_once('=').map_or(arg.as_str(), |(k, _)| k);
                write!(f, "{}=***", key)?;
                redact_next = false;
            } else {
                f.write_str(arg)?;
                redact_next = arg == "-var";
            }
        }
        Ok(())
    }
}

/// Builds the structured result of a successful run from its stdout
pub trait OutputExtractor {
    fn extract(&self, stdout: &str) -> OutputSet;
}

/// Collects nothing
impl OutputExtractor for () {
    fn extract(&self, _stdout: &str) -> OutputSet {
        OutputSet::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub code: i32,
    pub outputs: OutputSet,
    pub stdout: String,
}

/// Runs the Terraform binary inside a working directory
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    binary: PathBuf,
    log: OperationLog,
}

impl ProcessRunner {
    pub fn new(binary: impl Into<PathBuf>, log: OperationLog) -> Self {
        Self {
            binary: binary.into(),
            log,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    pub async fn run(&self, cluster: &str, invocation: &Invocation, dir: &Path) -> Result<ProcessOutput> {
        self.run_with(cluster, invocation, dir, &()).await
    }

    /// Run `invocation` in `dir`, resolving on exit code 0.
    pub async fn run_with<E>(
        &self,
        cluster: &str,
        invocation: &Invocation,
        dir: &Path,
        extractor: &E,
    ) -> Result<ProcessOutput>
    where
        E: OutputExtractor + ?Sized,
    {
        let phase = invocation.phase();
        tracing::debug!(
            target: "polygon_terraform::runner",
            "Running: {} {} (in {})",
            self.binary.display(),
            invocation,
            dir.display()
        );

        let mut child = Command::new(&self.binary)
            .args(invocation.as_args())
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => TerraformError::BinaryNotFound,
                _ => TerraformError::Io(e),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("terraform stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("terraform stderr was not captured"))?;

        let (out_lines, err_lines, status) = tokio::join!(
            self.stream_lines(stdout, cluster, phase, Stream::Stdout),
            self.stream_lines(stderr, cluster, phase, Stream::Stderr),
            child.wait(),
        );
        let out_lines = out_lines?;
        let err_lines = err_lines?;
        // killed by a signal
        let code = status?.code().unwrap_or(-1);

        if code != 0 {
            tracing::error!("terraform {} failed with exit code {}", phase, code);
            return Err(TerraformError::Process {
                phase,
                code,
                stderr: err_lines.join("\n"),
            });
        }

        let mut stdout = out_lines.join("\n");
        if !stdout.is_empty() {
            stdout.push('\n');
        }

        Ok(ProcessOutput {
            code,
            outputs: extractor.extract(&stdout),
            stdout,
        })
    }

    async fn stream_lines<R>(
        &self,
        reader: R,
        cluster: &str,
        phase: Phase,
        stream: Stream,
    ) -> std::io::Result<Vec<String>>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut collected = Vec::new();

        // terraform output is not guaranteed to be UTF-8
        while reader.read_until(b'\n', &mut buf).await? > 0 {
            let line = String::from_utf8_lossy(&buf)
                .trim_end_matches(['\r', '\n'])
                .to_string();
            buf.clear();

            tracing::debug!(target: "polygon_terraform::runner", "[{}/{}] {}", cluster, phase, line);
            self.log.append(cluster, phase, stream, line.as_str());
            collected.push(line);
        }

        Ok(collected)
    }
}
