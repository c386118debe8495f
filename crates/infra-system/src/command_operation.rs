// Command operation - runs a local program once per target
// reason: tokio::process for async child management
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info};

use fanout_core::domain::{OperationError, OperationOutcome, SharedContext, Target};
use fanout_core::port::TargetOperation;

/// Variables passed through from the parent environment by default
pub const DEFAULT_ENV_ALLOWLIST: &[&str] = &[
    "PATH",
    "HOME",
    "USER",
    "LANG",
    "TERM",
    "TMPDIR",
    "SYSTEMROOT",
    "TEMP",
    "TMP",
];

/// Env var carrying the alternate user for remote targets
pub const USER_ENV: &str = "FANOUT_USER";
/// Env var carrying the alternate password for remote targets
pub const PASSWORD_ENV: &str = "FANOUT_PASSWORD";
/// Env var carrying the target host
pub const TARGET_ENV: &str = "FANOUT_TARGET";
/// Set to `1` when the batch runs verbose
pub const VERBOSE_ENV: &str = "FANOUT_VERBOSE";

/// Captured output of one successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

/// Runs `program args...` for every target.
///
/// Arguments may contain `{target}`, `{port}` and `{session}` placeholders.
/// The child sees only allowlisted parent variables, plus `FANOUT_TARGET`,
/// and `FANOUT_USER`/`FANOUT_PASSWORD` when the target is not local and a
/// credential is configured.
///
/// The engine's timeout only stops waiting on the child; the child itself
/// is left to run to completion.
pub struct CommandOperation {
    program: String,
    args: Vec<String>,
    env_allowlist: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandOperation {
    /// Create a command operation
    ///
    /// # Example
    /// ```ignore
    /// let op = CommandOperation::new("ssh", vec!["{target}".into(), "uptime".into()]);
    /// ```
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env_allowlist: DEFAULT_ENV_ALLOWLIST.iter().map(|s| s.to_string()).collect(),
            working_dir: None,
        }
    }

    pub fn with_env_allowlist(mut self, allowlist: Vec<String>) -> Self {
        self.env_allowlist = allowlist;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Substitute target placeholders in every argument
    fn render_args(&self, target: &Target) -> Vec<String> {
        let port = target.port().map(|p| p.to_string()).unwrap_or_default();
        let session = target.session().unwrap_or_default();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{target}", target.host())
                    .replace("{port}", &port)
                    .replace("{session}", session)
            })
            .collect()
    }

    /// Filter environment variables to allowlist only
    fn filter_env(&self, env: &HashMap<String, String>) -> HashMap<String, String> {
        env.iter()
            .filter(|(k, _)| self.env_allowlist.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Full child environment for one target
    fn child_env(&self, target: &Target, ctx: &SharedContext) -> HashMap<String, String> {
        let parent: HashMap<String, String> = std::env::vars().collect();
        let mut env = self.filter_env(&parent);

        env.insert(TARGET_ENV.to_string(), target.host().to_string());
        if ctx.verbose() {
            env.insert(VERBOSE_ENV.to_string(), "1".to_string());
        }
        if let Some(credential) = ctx.credential_for(target.host()) {
            env.insert(USER_ENV.to_string(), credential.username().to_string());
            env.insert(PASSWORD_ENV.to_string(), credential.password().to_string());
        }
        env
    }

    async fn spawn_and_wait(
        &self,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> OperationOutcome<std::process::Output> {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .env_clear()
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let child = command
            .spawn()
            .map_err(|e| OperationError::Spawn(format!("{}: {}", self.program, e)))?;

        child
            .wait_with_output()
            .await
            .map_err(|e| OperationError::Io(e.to_string()))
    }
}

#[async_trait]
impl TargetOperation for CommandOperation {
    type Output = CommandOutput;

    async fn run(&self, target: Target, ctx: Arc<SharedContext>) -> OperationOutcome<CommandOutput> {
        let args = self.render_args(&target);
        let env = self.child_env(&target, &ctx);
        let start = Instant::now();

        debug!(
            host = %target,
            program = %self.program,
            args = ?args,
            credential = ctx.credential_for(target.host()).is_some(),
            "Starting command"
        );

        let output = self.spawn_and_wait(&args, &env).await?;
        let duration_ms = start.elapsed().as_millis() as u64;
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        info!(
            host = %target,
            duration_ms = duration_ms,
            exit_code = ?output.status.code(),
            "Command completed"
        );

        if !output.status.success() {
            return Err(OperationError::NonZeroExit {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr,
            duration_ms,
        })
    }

    fn name(&self) -> &str {
        &self.program
    }
}
