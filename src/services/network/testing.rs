use super::error::{NetworkError, NetworkResult};
use crate::nmcli_client::{CommandResult, CommandRunner, NmCommand};
use std::{
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

type Responder = Box<dyn Fn() -> NetworkResult<CommandResult> + Send + Sync>;

/// Scripted command runner that records every invocation
///
/// Responses are matched by substring against the space-joined argument
/// vector; the first matching rule wins, unmatched commands succeed with
/// empty output.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    rules: Arc<Vec<(String, Responder)>>,
    log: Arc<Mutex<Vec<String>>>,
    delay: Duration,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, pattern: &str, result: CommandResult) -> Self {
        self.rule(pattern, move || Ok(result.clone()))
    }

    pub fn launch_failure(self, pattern: &str) -> Self {
        self.rule(pattern, || {
            Err(NetworkError::LaunchFailure {
                program: "nmcli".to_string(),
                source: io::Error::from(io::ErrorKind::NotFound),
            })
        })
    }

    pub fn timeout(self, pattern: &str) -> Self {
        self.rule(pattern, || {
            Err(NetworkError::Timeout {
                budget: Duration::from_secs(30),
                indeterminate: false,
            })
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn rule<F>(mut self, pattern: &str, responder: F) -> Self
    where
        F: Fn() -> NetworkResult<CommandResult> + Send + Sync + 'static,
    {
        Arc::get_mut(&mut self.rules)
            .expect("rules are configured before the runner is shared")
            .push((pattern.to_string(), Box::new(responder)));
        self
    }

    /// Argument vectors of all started commands, in start order
    pub fn calls(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|entry| entry.strip_prefix("start ").map(str::to_string))
            .collect()
    }

    /// Start and end markers of all commands, in the order they happened
    pub fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, command: NmCommand) -> NetworkResult<CommandResult> {
        let line = command.args().join(" ");
        self.log.lock().unwrap().push(format!("start {line}"));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.log.lock().unwrap().push(format!("end {line}"));

        self.rules
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, responder)| responder())
            .unwrap_or_else(|| Ok(CommandResult::success("")))
    }
}
