use std::path::Path;
use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

use crate::config::SandboxSettings;
use crate::models::SandboxReport;

/// Where pytest-json-report writes inside the container
const REPORT_PATH: &str = "/app/.report.json";

/// Errors that can occur while running code in a container
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Docker is not running. Please start Docker and try again.")]
    DockerUnavailable,

    #[error("Failed to build Docker image: {0}")]
    BuildFailed(String),

    #[error("Docker image build did not finish within {0}s")]
    BuildTimedOut(u64),

    #[error("Docker command failed: {0}")]
    Docker(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    pub fn status_code(&self) -> u16 {
        match self {
            SandboxError::DockerUnavailable => 503,
            SandboxError::BuildFailed(_) => 400,
            SandboxError::BuildTimedOut(_) => 504,
            SandboxError::Docker(_) | SandboxError::Io(_) => 500,
        }
    }
}

/// Dockerfile for a pytest run over the files copied into /app
pub fn dockerfile(base_image: &str) -> String {
    format!(
        "FROM {base_image}\n\
         \n\
         WORKDIR /app\n\
         \n\
         RUN pip install --no-cache-dir pytest pytest-json-report\n\
         \n\
         COPY . .\n\
         \n\
         CMD [\"pytest\", \"-v\", \"--json-report\"]\n"
    )
}

/// Lay out the build context: main.py, optional test_main.py and the Dockerfile
pub fn write_build_context(
    dir: &Path,
    code: &str,
    test_code: Option<&str>,
    base_image: &str,
) -> std::io::Result<()> {
    std::fs::write(dir.join("main.py"), code)?;
    if let Some(tests) = test_code.filter(|t| !t.trim().is_empty()) {
        std::fs::write(dir.join("test_main.py"), tests)?;
    }
    std::fs::write(dir.join("Dockerfile"), dockerfile(base_image))?;
    Ok(())
}

/// Runs submitted code under pytest in a throwaway image and container
///
/// Each run gets its own image tag; the image and container are removed
/// whatever the outcome.
pub struct SandboxRunner {
    docker_bin: String,
    base_image: String,
    timeout: Duration,
    build_timeout: Duration,
    memory_limit: String,
    network_disabled: bool,
}

impl SandboxRunner {
    pub fn from_settings(settings: &SandboxSettings) -> Self {
        Self {
            docker_bin: settings.docker_bin.clone(),
            base_image: settings.base_image.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            build_timeout: Duration::from_secs(settings.build_timeout_secs),
            memory_limit: settings.memory_limit.clone(),
            network_disabled: settings.network_disabled,
        }
    }

    async fn docker(&self, args: &[&str]) -> Result<Output, SandboxError> {
        let output = Command::new(&self.docker_bin)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;
        Ok(output)
    }

    /// Like [`docker`](Self::docker) but non-zero exit is an error
    async fn docker_ok(&self, args: &[&str]) -> Result<String, SandboxError> {
        let output = self.docker(args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SandboxError::Docker(format!(
                "docker {} exited with {:?}: {}",
                args.first().copied().unwrap_or_default(),
                output.status.code(),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// True if the docker CLI can reach a daemon
    pub async fn is_available(&self) -> bool {
        Command::new(&self.docker_bin)
            .arg("info")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Build, run and tear down a pytest container for `code`
    pub async fn run(&self, code: &str, test_code: Option<&str>) -> Result<SandboxReport, SandboxError> {
        tracing::info!("Starting pytest run ({} bytes of code)", code.len());

        if !self.is_available().await {
            tracing::error!("Docker is not running or not accessible");
            return Err(SandboxError::DockerUnavailable);
        }

        let workspace = tempfile::tempdir()?;
        tracing::debug!("Created build context in {:?}", workspace.path());
        write_build_context(workspace.path(), code, test_code, &self.base_image)?;

        let tag = format!("pytest-runner-{}", uuid::Uuid::new_v4());
        let outcome = match self.build_image(&tag, workspace.path()).await {
            Ok(()) => self.run_image(&tag, workspace.path()).await,
            // A build cut short may still have tagged layers
            Err(e @ SandboxError::BuildTimedOut(_)) => Err(e),
            Err(e) => return Err(e),
        };

        if let Err(e) = self.docker_ok(&["rmi", "-f", &tag]).await {
            tracing::warn!("Failed to clean up Docker image {}: {}", tag, e);
        }

        outcome
    }

    async fn build_image(&self, tag: &str, context: &Path) -> Result<(), SandboxError> {
        tracing::info!("Building Docker image {}", tag);

        let context = context.to_string_lossy();
        let build_args = ["build", "--rm", "-t", tag, &context];
        let build = self.docker(&build_args);
        let output = match tokio::time::timeout(self.build_timeout, build).await {
            Ok(output) => output?,
            Err(_) => {
                tracing::error!("Docker build of {} exceeded {}s", tag, self.build_timeout.as_secs());
                return Err(SandboxError::BuildTimedOut(self.build_timeout.as_secs()));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            tracing::debug!("Docker build: {}", line.trim());
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!("Failed to build Docker image: {}", stderr.trim());
            return Err(SandboxError::BuildFailed(stderr.trim().to_string()));
        }

        Ok(())
    }

    async fn run_image(&self, tag: &str, workspace: &Path) -> Result<SandboxReport, SandboxError> {
        let mut create_args = vec!["create", "--memory", self.memory_limit.as_str()];
        if self.network_disabled {
            create_args.extend(["--network", "none"]);
        }
        create_args.push(tag);

        let container = self.docker_ok(&create_args).await?;
        tracing::info!("Running Docker container {}", container);

        let outcome = self.execute(&container, workspace).await;

        if let Err(e) = self.docker_ok(&["rm", "-f", &container]).await {
            tracing::warn!("Failed to remove container {}: {}", container, e);
        }

        outcome
    }

    async fn execute(&self, container: &str, workspace: &Path) -> Result<SandboxReport, SandboxError> {
        self.docker_ok(&["start", container]).await?;

        let (exit_code, timed_out) =
            match tokio::time::timeout(self.timeout, self.docker_ok(&["wait", container])).await {
                Ok(waited) => {
                    let status = waited?;
                    let code = status.parse::<i64>().map_err(|_| {
                        SandboxError::Docker(format!("unexpected docker wait output: {}", status))
                    })?;
                    (code, false)
                }
                Err(_) => {
                    tracing::warn!(
                        "Container {} exceeded {}s, killing it",
                        container,
                        self.timeout.as_secs()
                    );
                    if let Err(e) = self.docker_ok(&["kill", container]).await {
                        tracing::warn!("Failed to kill container {}: {}", container, e);
                    }
                    (-1, true)
                }
            };

        tracing::info!("Container finished with exit code: {}", exit_code);

        let logs = match self.docker(&["logs", container]).await {
            Ok(output) => {
                let mut logs = String::from_utf8_lossy(&output.stdout).to_string();
                logs.push_str(&String::from_utf8_lossy(&output.stderr));
                logs
            }
            Err(e) => {
                tracing::warn!("Failed to read container logs: {}", e);
                String::new()
            }
        };
        tracing::debug!("Container logs: {}", logs);

        let report = self.copy_report(container, workspace).await;

        Ok(SandboxReport {
            exit_code,
            logs,
            report,
            timed_out,
        })
    }

    /// Copy and parse the JSON report; `None` when it is missing or malformed
    async fn copy_report(&self, container: &str, workspace: &Path) -> Option<serde_json::Value> {
        let destination = workspace.join("report.json");
        let source = format!("{}:{}", container, REPORT_PATH);
        let destination_str = destination.to_string_lossy();

        if let Err(e) = self.docker_ok(&["cp", &source, &destination_str]).await {
            tracing::warn!("Failed to copy report from container: {}", e);
            return None;
        }

        let raw = match tokio::fs::read_to_string(&destination).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("No JSON report found: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(report) => {
                tracing::debug!("Found JSON report");
                Some(report)
            }
            Err(e) => {
                tracing::warn!("Malformed JSON report: {}", e);
                None
            }
        }
    }
}
