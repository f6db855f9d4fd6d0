//! 에러 타입 — 도메인별 에러 정의
//!
//! 에러는 세 계층으로 나뉩니다.
//! - 호출자 실수 ([`ResolveError`]): 존재하지 않는 작업 디렉토리, 잘못된 탐지기 이름
//! - 대상 구성 실패 ([`TargetError`]): 컨테이너 없음/중지됨, 런타임 API 접근 불가
//! - 설정 오류 ([`ConfigError`])
//!
//! 명령 실행 실패는 에러가 아닙니다. 채널은 항상 [`CommandOutput`](crate::channel::CommandOutput)을
//! 돌려주고, 탐지기가 종료 코드를 해석합니다.

/// depprobe 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum DepprobeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 대상 채널 구성 에러 (메시지를 그대로 노출)
    #[error(transparent)]
    Target(#[from] TargetError),

    /// 해석 요청 에러 (메시지를 그대로 노출)
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 대상 채널 구성 에러
///
/// 채널 생성 시점에 즉시 실패합니다. 탐지기는 하나도 실행되지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// 컨테이너/스택 식별자 형식 오류
    #[error("invalid target identifier '{identifier}': {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    /// 컨테이너가 존재하지 않음
    #[error("Container '{0}' not found")]
    ContainerNotFound(String),

    /// 컨테이너가 실행 중이 아님
    #[error("Container '{name}' is not running (status: {status})")]
    ContainerNotRunning { name: String, status: String },

    /// compose 스택에 실행 중인 컨테이너가 없음
    #[error("No running containers found for stack '{0}'")]
    StackEmpty(String),

    /// 컨테이너 런타임 API 에러 (연결 실패 포함)
    #[error("container runtime error: {0}")]
    Runtime(String),
}

/// 해석 요청 에러 (호출자 실수)
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// 작업 디렉토리가 대상에 존재하지 않음
    #[error("Working directory does not exist: {0}")]
    WorkingDirNotFound(String),

    /// 알 수 없는 탐지기 이름
    #[error(
        "Invalid detector names: {}. Available detectors: {}",
        invalid.join(", "),
        available.join(", ")
    )]
    InvalidDetectors {
        invalid: Vec<String>,
        available: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_depprobe_error() {
        let err: DepprobeError = ConfigError::FileNotFound {
            path: "/etc/depprobe.toml".to_owned(),
        }
        .into();
        assert!(matches!(err, DepprobeError::Config(_)));
        assert!(err.to_string().contains("/etc/depprobe.toml"));
    }

    #[test]
    fn target_error_messages_name_the_container() {
        let err = TargetError::ContainerNotRunning {
            name: "web".to_owned(),
            status: "exited".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "Container 'web' is not running (status: exited)"
        );

        let err = TargetError::ContainerNotFound("ghost".to_owned());
        assert_eq!(err.to_string(), "Container 'ghost' not found");
    }

    #[test]
    fn invalid_detectors_lists_both_sides() {
        let err = ResolveError::InvalidDetectors {
            invalid: vec!["foo".to_owned(), "bar".to_owned()],
            available: vec!["dpkg".to_owned(), "pip".to_owned()],
        };
        assert_eq!(
            err.to_string(),
            "Invalid detector names: foo, bar. Available detectors: dpkg, pip"
        );
    }

    #[test]
    fn target_and_resolve_messages_are_not_prefixed() {
        let err: DepprobeError = ResolveError::WorkingDirNotFound("/srv".to_owned()).into();
        assert_eq!(err.to_string(), "Working directory does not exist: /srv");

        let err: DepprobeError = TargetError::StackEmpty("shop".to_owned()).into();
        assert_eq!(err.to_string(), "No running containers found for stack 'shop'");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: DepprobeError = io.into();
        assert!(matches!(err, DepprobeError::Io(_)));
    }
}
