use crate::config::models::SimulatorSettings;
use async_trait::async_trait;
use procdesign::core::models::design::ProcessDesign;
use procdesign::core::models::material::{FeedStream, RawMaterial, feed_streams};
use procdesign::core::models::simulation::SimulationResult;
use procdesign::engine::simulator::{SimulationBackend, SimulationError, SimulationSession};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, trace, warn};

/// How long a closed adapter may take to exit before it is killed.
const RELEASE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum AdapterRequest<'a> {
    Open {
        template: Option<&'a Path>,
    },
    Submit {
        materials: &'a [RawMaterial],
        feeds: Vec<FeedStream>,
        property_method: &'a str,
        design: &'a ProcessDesign,
    },
    Close,
}

impl AdapterRequest<'_> {
    fn op(&self) -> &'static str {
        match self {
            AdapterRequest::Open { .. } => "open",
            AdapterRequest::Submit { .. } => "submit",
            AdapterRequest::Close => "close",
        }
    }
}

#[derive(Debug, Deserialize)]
struct AdapterResponse {
    ok: bool,
    #[serde(default)]
    result: Option<SimulationResult>,
    #[serde(default)]
    error: Option<AdapterFailure>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum FailureKind {
    Submission,
    Convergence,
    Connection,
}

#[derive(Debug, Deserialize)]
struct AdapterFailure {
    kind: FailureKind,
    message: String,
    #[serde(default)]
    diagnostics: Vec<String>,
}

impl From<AdapterFailure> for SimulationError {
    fn from(failure: AdapterFailure) -> Self {
        let AdapterFailure {
            kind,
            message,
            diagnostics,
        } = failure;
        match kind {
            FailureKind::Submission => SimulationError::Submission {
                message,
                diagnostics,
            },
            FailureKind::Convergence => SimulationError::Convergence {
                message,
                diagnostics,
            },
            FailureKind::Connection => SimulationError::Connection(message),
        }
    }
}

/// Runs an adapter executable and speaks line-delimited JSON over its stdin and stdout.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    settings: SimulatorSettings,
}

impl ProcessBackend {
    pub fn new(settings: SimulatorSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SimulationBackend for ProcessBackend {
    async fn connect(&self) -> Result<Box<dyn SimulationSession>, SimulationError> {
        let executable = &self.settings.executable;
        info!("Starting simulation adapter '{}'.", executable.display());

        let mut child = Command::new(executable)
            .args(&self.settings.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SimulationError::Connection(format!(
                    "failed to start adapter '{}': {}",
                    executable.display(),
                    e
                ))
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(SimulationError::Connection(
                "adapter pipes are not available".to_string(),
            ));
        };
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "adapter", "{}", line);
                }
            });
        }

        let mut session = ProcessSession {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            in_flight: false,
        };
        session
            .exchange(&AdapterRequest::Open {
                template: self.settings.template.as_deref(),
            })
            .await?;
        Ok(Box::new(session))
    }
}

struct ProcessSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    /// Set while a request awaits its reply. Stays set if that wait was abandoned,
    /// after which the reply stream is out of step and the adapter is only killed.
    in_flight: bool,
}

impl ProcessSession {
    async fn exchange(
        &mut self,
        request: &AdapterRequest<'_>,
    ) -> Result<Option<SimulationResult>, SimulationError> {
        let mut line = serde_json::to_string(request).map_err(|e| {
            SimulationError::Connection(format!("failed to encode '{}' request: {}", request.op(), e))
        })?;
        line.push('\n');
        trace!("-> adapter: {}", line.trim_end());

        let lost = |e: std::io::Error| SimulationError::Connection(format!("adapter pipe closed: {}", e));
        self.in_flight = true;
        self.stdin.write_all(line.as_bytes()).await.map_err(lost)?;
        self.stdin.flush().await.map_err(lost)?;

        let reply = loop {
            match self.stdout.next_line().await.map_err(lost)? {
                Some(reply) if reply.trim().is_empty() => continue,
                Some(reply) => break reply,
                None => {
                    return Err(SimulationError::Connection(format!(
                        "adapter exited while handling '{}'",
                        request.op()
                    )));
                }
            }
        };
        self.in_flight = false;
        trace!("<- adapter: {}", reply);

        let response: AdapterResponse = serde_json::from_str(&reply).map_err(|e| {
            SimulationError::Connection(format!("unreadable adapter response: {}", e))
        })?;
        if response.ok {
            return Ok(response.result);
        }
        Err(match response.error {
            Some(failure) => failure.into(),
            None => SimulationError::Connection(format!(
                "adapter reported a failure for '{}' without details",
                request.op()
            )),
        })
    }
}

#[async_trait]
impl SimulationSession for ProcessSession {
    async fn submit(
        &mut self,
        design: &ProcessDesign,
        materials: &[RawMaterial],
    ) -> Result<SimulationResult, SimulationError> {
        let request = AdapterRequest::Submit {
            materials,
            feeds: feed_streams(materials),
            property_method: design.property_method(),
            design,
        };
        self.exchange(&request).await?.ok_or_else(|| {
            SimulationError::Connection("adapter accepted the design but sent no result".to_string())
        })
    }

    async fn release(mut self: Box<Self>) -> Result<(), SimulationError> {
        let closed = if self.in_flight {
            warn!("Simulation adapter is still busy with an abandoned request; killing it.");
            Err(SimulationError::Connection(
                "adapter was busy when the session was released".to_string(),
            ))
        } else {
            match tokio::time::timeout(RELEASE_GRACE, self.exchange(&AdapterRequest::Close)).await {
                Ok(closed) => closed.map(|_| ()),
                Err(_) => Err(SimulationError::Connection(format!(
                    "adapter did not acknowledge close within {}s",
                    RELEASE_GRACE.as_secs()
                ))),
            }
        };
        if let Err(e) = &closed {
            warn!("Adapter did not acknowledge close: {}", e);
            if let Err(e) = self.child.start_kill() {
                warn!("Failed to kill the simulation adapter: {}", e);
            }
        }

        match tokio::time::timeout(RELEASE_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => debug!("Simulation adapter exited with {}.", status),
            Ok(Err(e)) => warn!("Failed to wait for the simulation adapter: {}", e),
            Err(_) => {
                warn!(
                    "Simulation adapter still running {}s after close; killing it.",
                    RELEASE_GRACE.as_secs()
                );
                if let Err(e) = self.child.kill().await {
                    warn!("Failed to kill the simulation adapter: {}", e);
                }
            }
        }
        closed
    }
}
