//! Docker API abstraction for testability.
//!
//! The [`DockerClient`] trait abstracts the bollard Docker API, allowing
//! production code to use [`BollardDockerClient`] while tests use `MockDockerClient`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌────────────────┐
//! │ ContainerChannel │   │ ComposeChannel │
//! └────────┬─────────┘   └───────┬────────┘
//!          └──────────┬──────────┘
//!                     ▼
//!              ┌─────────────┐
//!              │DockerClient │ (trait)
//!              └─────────────┘
//!                  │     │
//!                  ▼     ▼
//!             ┌───────┐ ┌────┐
//!             │Bollard│ │Mock│
//!             └───┬───┘ └────┘
//!                 ▼
//!           Docker Daemon
//! ```
//!
//! # Identifier Validation
//!
//! Container references are either IDs or names. Both are validated before
//! any API call:
//! - Must be 1-128 characters
//! - Must contain only ASCII alphanumerics, `_`, `.` and `-`
//! - Must not start with `-` or `.`

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use depprobe_core::channel::{CommandOutput, ContainerIdentity};
use futures_util::stream::StreamExt;

use crate::error::ChannelError;

/// Label docker compose attaches to every container of a project.
pub const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project";

/// Label docker compose attaches with the service name.
pub const COMPOSE_SERVICE_LABEL: &str = "com.docker.compose.service";

const MAX_IDENTIFIER_LEN: usize = 128;

/// Validates a container or stack reference before it reaches the Docker API.
pub fn validate_identifier(identifier: &str) -> Result<(), ChannelError> {
    let invalid = |reason: &str| ChannelError::InvalidIdentifier {
        identifier: identifier.to_owned(),
        reason: reason.to_owned(),
    };

    if identifier.is_empty() || identifier.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid(&format!(
            "length {} (must be 1-{MAX_IDENTIFIER_LEN})",
            identifier.len()
        )));
    }
    if identifier.starts_with('-') || identifier.starts_with('.') {
        return Err(invalid("must not start with '-' or '.'"));
    }
    if !identifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(invalid("contains characters outside [A-Za-z0-9_.-]"));
    }
    Ok(())
}

/// Trait abstracting the Docker API operations channels need.
///
/// The trait is `Send + Sync + 'static`, allowing safe sharing across async contexts.
///
/// # Implementations
///
/// - [`BollardDockerClient`]: Production implementation using the `bollard` library
/// - `MockDockerClient`: Test implementation with configurable responses (available in tests only)
///
/// # Error Handling
///
/// - **404 errors**: Converted to `ChannelError::ContainerNotFound`
/// - **Connection errors**: Wrapped as `ChannelError::DockerConnection`
/// - **Everything else**: Wrapped as `ChannelError::DockerApi`
pub trait DockerClient: Send + Sync + 'static {
    /// Inspects a container by ID or name.
    ///
    /// # Errors
    ///
    /// - `ChannelError::ContainerNotFound`: Container does not exist (404)
    /// - `ChannelError::InvalidIdentifier`: The reference failed validation
    /// - `ChannelError::DockerApi`: Other API errors
    fn inspect_container(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<ContainerIdentity, ChannelError>> + Send;

    /// Lists running containers, optionally restricted by a `key=value` label filter.
    fn list_running_containers(
        &self,
        label: Option<&str>,
    ) -> impl Future<Output = Result<Vec<ContainerIdentity>, ChannelError>> + Send;

    /// Runs `argv` inside a container and waits for it to finish.
    ///
    /// Stdout and stderr are collected separately. A command that ran and failed
    /// is `Ok` with a non-zero exit code. `Err` means the runtime refused to
    /// start it at all.
    fn exec(
        &self,
        id: &str,
        argv: Vec<String>,
        working_dir: Option<&str>,
    ) -> impl Future<Output = Result<CommandOutput, ChannelError>> + Send;

    /// Checks Docker daemon connectivity.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::DockerConnection` if the daemon is unreachable.
    fn ping(&self) -> impl Future<Output = Result<(), ChannelError>> + Send;
}

/// Production Docker client implementation using `bollard`.
///
/// Internally uses `Arc<bollard::Docker>` for safe sharing across async tasks.
///
/// # Examples
///
/// ```ignore
/// use depprobe_channel::BollardDockerClient;
///
/// // Connect to default Docker socket
/// let client = BollardDockerClient::connect_local(120)?;
///
/// // Or connect to a specific socket
/// let client = BollardDockerClient::connect_with_socket("/run/docker.sock", 120)?;
/// # Ok::<(), depprobe_channel::ChannelError>(())
/// ```
#[derive(Clone)]
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
}

impl BollardDockerClient {
    /// Connects to Docker using the default local socket (or `DOCKER_HOST`).
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::DockerConnection` if the connection fails
    /// (e.g., socket not found, permission denied, daemon not running).
    pub fn connect_local(timeout_secs: u64) -> Result<Self, ChannelError> {
        let docker = bollard::Docker::connect_with_local_defaults()
            .map_err(|e| {
                ChannelError::DockerConnection(format!("failed to connect to docker: {e}"))
            })?
            .with_timeout(Duration::from_secs(timeout_secs));
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects to Docker using a specific socket path.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::DockerConnection` if the connection fails.
    pub fn connect_with_socket(socket_path: &str, timeout_secs: u64) -> Result<Self, ChannelError> {
        let docker = bollard::Docker::connect_with_socket(
            socket_path,
            timeout_secs,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| {
            ChannelError::DockerConnection(format!(
                "failed to connect to docker at {socket_path}: {e}"
            ))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects to the configured socket, or the platform default when `socket` is empty.
    /// The timeout applies to both.
    pub fn connect(socket: &str, timeout_secs: u64) -> Result<Self, ChannelError> {
        if socket.is_empty() {
            Self::connect_local(timeout_secs)
        } else {
            Self::connect_with_socket(socket, timeout_secs)
        }
    }
}

fn is_not_found(err: &bollard::errors::Error) -> bool {
    matches!(
        err,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

impl DockerClient for BollardDockerClient {
    async fn inspect_container(&self, id: &str) -> Result<ContainerIdentity, ChannelError> {
        validate_identifier(id)?;

        let details = self.docker.inspect_container(id, None).await.map_err(|e| {
            if is_not_found(&e) {
                ChannelError::ContainerNotFound(id.to_owned())
            } else {
                ChannelError::DockerApi(format!("inspect container failed: {e}"))
            }
        })?;

        let name = details
            .name
            .map(|n| n.trim_start_matches('/').to_owned())
            .unwrap_or_else(|| id.to_owned());
        let (image, service) = match details.config {
            Some(config) => (
                config.image.unwrap_or_default(),
                config
                    .labels
                    .and_then(|labels| labels.get(COMPOSE_SERVICE_LABEL).cloned()),
            ),
            None => (String::new(), None),
        };
        let state = details
            .state
            .and_then(|s| s.status)
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_owned());

        Ok(ContainerIdentity {
            id: details.id.unwrap_or_default(),
            name,
            image,
            image_id: details.image.unwrap_or_default(),
            state,
            service,
        })
    }

    async fn list_running_containers(
        &self,
        label: Option<&str>,
    ) -> Result<Vec<ContainerIdentity>, ChannelError> {
        use bollard::container::ListContainersOptions;

        let mut filters: HashMap<String, Vec<String>> = HashMap::new();
        filters.insert("status".to_owned(), vec!["running".to_owned()]);
        if let Some(label) = label {
            filters.insert("label".to_owned(), vec![label.to_owned()]);
        }
        let options = ListContainersOptions::<String> {
            all: false,
            filters,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| ChannelError::DockerApi(format!("list containers failed: {e}")))?;

        let mut result = Vec::with_capacity(containers.len());
        for container in containers {
            let name = container
                .names
                .unwrap_or_default()
                .first()
                .map(|n| n.trim_start_matches('/').to_owned())
                .unwrap_or_default();
            let service = container
                .labels
                .and_then(|labels| labels.get(COMPOSE_SERVICE_LABEL).cloned());
            result.push(ContainerIdentity {
                id: container.id.unwrap_or_default(),
                name,
                image: container.image.unwrap_or_default(),
                image_id: container.image_id.unwrap_or_default(),
                state: container.state.unwrap_or_else(|| "running".to_owned()),
                service,
            });
        }

        Ok(result)
    }

    async fn exec(
        &self,
        id: &str,
        argv: Vec<String>,
        working_dir: Option<&str>,
    ) -> Result<CommandOutput, ChannelError> {
        use bollard::container::LogOutput;
        use bollard::exec::{CreateExecOptions, StartExecResults};

        let options = CreateExecOptions::<String> {
            cmd: Some(argv),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            working_dir: working_dir.map(str::to_owned),
            ..Default::default()
        };

        let created = self
            .docker
            .create_exec(id, options)
            .await
            .map_err(|e| ChannelError::DockerApi(format!("create exec failed: {e}")))?;

        let mut stdout = String::new();
        let mut stderr = String::new();

        let started = self
            .docker
            .start_exec(&created.id, None)
            .await
            .map_err(|e| ChannelError::DockerApi(format!("start exec failed: {e}")))?;

        if let StartExecResults::Attached { mut output, .. } = started {
            while let Some(chunk) = output.next().await {
                match chunk {
                    Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
                        stdout.push_str(&String::from_utf8_lossy(&message));
                    }
                    Ok(LogOutput::StdErr { message }) => {
                        stderr.push_str(&String::from_utf8_lossy(&message));
                    }
                    Ok(LogOutput::StdIn { .. }) => {}
                    Err(e) => {
                        return Err(ChannelError::DockerApi(format!(
                            "exec output stream failed: {e}"
                        )));
                    }
                }
            }
        }

        let inspected = self
            .docker
            .inspect_exec(&created.id)
            .await
            .map_err(|e| ChannelError::DockerApi(format!("inspect exec failed: {e}")))?;

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code: inspected.exit_code.unwrap_or(1),
        })
    }

    async fn ping(&self) -> Result<(), ChannelError> {
        self.docker
            .ping()
            .await
            .map_err(|e| ChannelError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }
}

/// 테스트용 Mock Docker 클라이언트
///
/// 설정 가능한 응답을 반환하여 Docker 없이도 채널 로직을 테스트할 수 있습니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockDockerClient {
    /// 실행 중/중지된 컨테이너 목록
    pub containers: Vec<ContainerIdentity>,
    /// 컨테이너 ID → compose 프로젝트 라벨
    pub projects: HashMap<String, String>,
    /// 라벨 필터를 지원하지 않는 런타임 흉내
    pub label_filter_fails: bool,
    /// 컨테이너에 셸이 없는 것처럼 동작
    pub shell_missing: bool,
    /// 공백으로 합친 argv → 결과
    pub exec_results: Vec<(String, CommandOutput)>,
    /// 실행된 argv 기록
    pub exec_calls: std::sync::Mutex<Vec<Vec<String>>>,
}

#[cfg(test)]
impl MockDockerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 테스트용 컨테이너를 추가합니다.
    pub fn with_container(mut self, container: ContainerIdentity) -> Self {
        self.containers.push(container);
        self
    }

    /// compose 프로젝트 라벨이 붙은 컨테이너를 추가합니다.
    pub fn with_project_container(mut self, project: &str, container: ContainerIdentity) -> Self {
        self.projects.insert(container.id.clone(), project.to_owned());
        self.containers.push(container);
        self
    }

    /// 라벨 필터 호출이 실패하도록 설정합니다.
    pub fn with_failing_label_filter(mut self) -> Self {
        self.label_filter_fails = true;
        self
    }

    /// `sh` 실행이 런타임 에러를 내도록 설정합니다.
    pub fn without_shell(mut self) -> Self {
        self.shell_missing = true;
        self
    }

    /// argv(공백 결합)가 일치할 때 돌려줄 결과를 등록합니다.
    pub fn with_exec(mut self, joined_argv: &str, output: CommandOutput) -> Self {
        self.exec_results.push((joined_argv.to_owned(), output));
        self
    }

    pub fn exec_calls(&self) -> Vec<Vec<String>> {
        self.exec_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
impl DockerClient for MockDockerClient {
    async fn inspect_container(&self, id: &str) -> Result<ContainerIdentity, ChannelError> {
        validate_identifier(id)?;
        self.containers
            .iter()
            .find(|c| c.id == id || c.name == id)
            .cloned()
            .ok_or_else(|| ChannelError::ContainerNotFound(id.to_owned()))
    }

    async fn list_running_containers(
        &self,
        label: Option<&str>,
    ) -> Result<Vec<ContainerIdentity>, ChannelError> {
        let running = self.containers.iter().filter(|c| c.state == "running");
        match label {
            None => Ok(running.cloned().collect()),
            Some(_) if self.label_filter_fails => Err(ChannelError::DockerApi(
                "label filter not supported".to_owned(),
            )),
            Some(label) => {
                let project = label
                    .strip_prefix(&format!("{COMPOSE_PROJECT_LABEL}="))
                    .unwrap_or_default();
                Ok(running
                    .filter(|c| self.projects.get(&c.id).map(String::as_str) == Some(project))
                    .cloned()
                    .collect())
            }
        }
    }

    async fn exec(
        &self,
        id: &str,
        argv: Vec<String>,
        _working_dir: Option<&str>,
    ) -> Result<CommandOutput, ChannelError> {
        self.inspect_container(id).await?;
        if let Ok(mut calls) = self.exec_calls.lock() {
            calls.push(argv.clone());
        }
        if self.shell_missing && argv.first().map(String::as_str) == Some("sh") {
            return Err(ChannelError::DockerApi(
                "OCI runtime exec failed: exec failed: unable to start container process: \
                 exec: \"sh\": executable file not found in $PATH"
                    .to_owned(),
            ));
        }
        let joined = argv.join(" ");
        Ok(self
            .exec_results
            .iter()
            .find(|(key, _)| *key == joined)
            .map(|(_, out)| out.clone())
            .unwrap_or_else(|| CommandOutput {
                stdout: String::new(),
                stderr: format!("{joined}: not found"),
                exit_code: 127,
            }))
    }

    async fn ping(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// 테스트용 컨테이너 식별 정보
#[cfg(test)]
pub fn sample_container(id_char: char, name: &str, state: &str) -> ContainerIdentity {
    ContainerIdentity {
        id: std::iter::repeat_n(id_char, 64).collect(),
        name: name.to_owned(),
        image: format!("registry.example.com/team/{name}:1.0"),
        image_id: format!("sha256:{}", std::iter::repeat_n(id_char, 64).collect::<String>()),
        state: state.to_owned(),
        service: None,
    }
}
