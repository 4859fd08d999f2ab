// Subprocess executor - one child process per job

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use docbatch_core::port::{ExecError, JobExecutor};

/// One command to run in a child process.
///
/// Serializable so specs can be built remotely or replayed; `env` entries
/// are explicit per-command variables and are always set, independent of
/// the executor's inheritance allowlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Payload streamed to the child's stdin
    #[serde(default)]
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            working_dir: None,
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Captured output of a successfully exited child.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs each job in its own child process.
///
/// The child environment starts empty; only allowlisted variables are
/// inherited from this process. A non-zero exit becomes an `ExecError`
/// carrying the exit code and stderr, which the scheduler records as a
/// failed outcome. Runaway children are not killed on timeout; the
/// scheduler reclaims the worker slot and the child exits on its own.
pub struct SubprocessExecutor {
    env_allowlist: Vec<String>,
}

impl SubprocessExecutor {
    /// # Example
    /// ```ignore
    /// let executor = SubprocessExecutor::new(
    ///     vec!["PATH".to_string(), "HOME".to_string(), "LANG".to_string()],
    /// );
    /// ```
    pub fn new(env_allowlist: Vec<String>) -> Self {
        Self { env_allowlist }
    }
}

impl JobExecutor<CommandSpec, CommandOutput> for SubprocessExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
        if spec.command.is_empty() {
            return Err(ExecError::InvalidInput("empty command".to_string()));
        }

        let mut command = Command::new(&spec.command);
        command
            .args(&spec.args)
            .env_clear()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        for key in &self.env_allowlist {
            if let Ok(value) = std::env::var(key) {
                command.env(key, value);
            }
        }
        command.envs(&spec.env);

        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        debug!(command = %spec.command, args = ?spec.args, "spawning subprocess");
        let mut child = command
            .spawn()
            .map_err(|e| ExecError::SpawnFailed(e.to_string()))?;

        let writer = match &spec.stdin {
            Some(payload) => {
                let mut stdin = child
                    .stdin
                    .take()
                    .ok_or_else(|| ExecError::Io("child stdin unavailable".to_string()))?;
                let payload = payload.clone();
                // Fed from its own thread while the output pipes are
                // drained below; a sequential write_all deadlocks once
                // payload and stdout both outgrow the pipe buffers
                Some(std::thread::spawn(move || {
                    let result = stdin.write_all(payload.as_bytes());
                    // handle drops here so the child sees EOF
                    result
                }))
            }
            None => None,
        };

        let output = child
            .wait_with_output()
            .map_err(|e| ExecError::Io(e.to_string()))?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // A child may exit without draining its stdin
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(ExecError::Io(e.to_string())),
                Err(_) => {
                    return Err(ExecError::Io("stdin writer thread panicked".to_string()))
                }
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ExecError::Failed(match output.status.code() {
                Some(code) => format!("exit code {code}: {}", stderr.trim()),
                None => format!("terminated by signal: {}", stderr.trim()),
            }));
        }

        info!(
            command = %spec.command,
            stdout_bytes = stdout.len(),
            "subprocess finished"
        );
        Ok(CommandOutput { stdout, stderr })
    }

    fn supports_process_isolation(&self) -> bool {
        true
    }
}
