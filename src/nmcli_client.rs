use crate::{
    config::AppConfig,
    services::network::error::{NetworkError, NetworkResult},
};
use log::{debug, error, info, warn};
#[cfg(feature = "mock")]
use mockall::automock;
use std::{fmt, path::PathBuf, process::Stdio, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, Command},
    time::timeout,
};
use trait_variant::make;

/// Budget class of an invocation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Query,
    Mutation,
}

/// One network manager CLI invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NmCommand {
    kind: CommandKind,
    args: Vec<String>,
    secret: Option<String>,
}

impl NmCommand {
    pub fn query<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(CommandKind::Query, args)
    }

    pub fn mutation<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(CommandKind::Mutation, args)
    }

    fn new<I, S>(kind: CommandKind, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NmCommand {
            kind,
            args: args.into_iter().map(Into::into).collect(),
            secret: None,
        }
    }

    /// Mark an argument value that must never be logged
    pub fn with_secret(mut self, secret: &str) -> Self {
        self.secret = Some(secret.to_string());
        self
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// True if the argument vector begins with `prefix`
    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        self.args.len() >= prefix.len() && self.args.iter().zip(prefix).all(|(a, p)| a == p)
    }
}

impl fmt::Display for NmCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<&str> = self
            .args
            .iter()
            .map(|arg| match &self.secret {
                Some(secret) if arg == secret => "******",
                _ => arg.as_str(),
            })
            .collect();
        write!(f, "{}", args.join(" "))
    }
}

/// Captured outcome of one invocation; a non-zero exit is a regular result
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_succeeded: bool,
}

impl CommandResult {
    pub fn success(stdout: &str) -> Self {
        CommandResult {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_succeeded: true,
        }
    }

    pub fn failure(stderr: &str) -> Self {
        CommandResult {
            stdout: String::new(),
            stderr: stderr.to_string(),
            exit_succeeded: false,
        }
    }
}

#[make(Send)]
#[cfg_attr(feature = "mock", automock)]
pub trait CommandRunner {
    async fn run(&self, command: NmCommand) -> NetworkResult<CommandResult>;
}

/// Runs `nmcli` as a child process
#[derive(Clone, Debug)]
pub struct NmcliClient {
    program: PathBuf,
    query_timeout: Duration,
    mutation_timeout: Duration,
}

impl NmcliClient {
    pub fn new() -> Self {
        let config = &AppConfig::get().nmcli;

        Self::with_settings(
            config.binary_path.clone(),
            config.query_timeout,
            config.mutation_timeout,
        )
    }

    pub fn with_settings(
        program: impl Into<PathBuf>,
        query_timeout: Duration,
        mutation_timeout: Duration,
    ) -> Self {
        NmcliClient {
            program: program.into(),
            query_timeout,
            mutation_timeout,
        }
    }

    fn budget(&self, kind: CommandKind) -> Duration {
        match kind {
            CommandKind::Query => self.query_timeout,
            CommandKind::Mutation => self.mutation_timeout,
        }
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }
}

impl Default for NmcliClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for NmcliClient {
    async fn run(&self, command: NmCommand) -> NetworkResult<CommandResult> {
        let budget = self.budget(command.kind());
        info!("exec {} {command}", self.program_name());

        let mut child = Command::new(&self.program)
            .args(command.args())
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| {
                error!("failed to launch {}: {source}", self.program_name());
                NetworkError::LaunchFailure {
                    program: self.program_name(),
                    source,
                }
            })?;

        let waited = timeout(budget, collect_output(&mut child)).await;

        match waited {
            Ok(Ok(result)) => {
                debug!(
                    "exit_succeeded={} stdout={:?} stderr={:?}",
                    result.exit_succeeded, result.stdout, result.stderr
                );
                Ok(result)
            }
            Ok(Err(e)) => {
                error!("failed to collect output of {command}: {e}");
                Err(NetworkError::CommandFailure(format!(
                    "failed to collect command output: {e}"
                )))
            }
            Err(_) => {
                warn!("{command} timed out after {}s", budget.as_secs());

                let indeterminate = terminate(&mut child).await;
                if indeterminate {
                    error!("failed to terminate timed out command {command}");
                }

                Err(NetworkError::Timeout {
                    budget,
                    indeterminate,
                })
            }
        }
    }
}

/// Kill and reap a timed out child; true when it may still be running
async fn terminate(child: &mut Child) -> bool {
    if let Ok(Some(status)) = child.try_wait() {
        debug!("timed out command exited on its own: {status}");
        return false;
    }

    match child.kill().await {
        Ok(()) => false,
        Err(e) => {
            warn!("kill failed: {e}");
            !matches!(child.try_wait(), Ok(Some(_)))
        }
    }
}

async fn collect_output(child: &mut Child) -> std::io::Result<CommandResult> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (status, stdout, stderr) =
        tokio::try_join!(child.wait(), read_pipe(stdout), read_pipe(stderr))?;

    Ok(CommandResult {
        stdout,
        stderr,
        exit_succeeded: status.success(),
    })
}

async fn read_pipe<R>(pipe: Option<R>) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();

    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Split one line of `nmcli -t` output into its fields
///
/// Terse mode escapes `:` and `\` inside values with a backslash.
pub fn split_terse_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => current.push(chars.next().unwrap_or('\\')),
            ':' => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }

    fields.push(current);
    fields
}
