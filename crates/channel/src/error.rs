//! 채널 에러 타입
//!
//! [`ChannelError`]는 채널 생성 중 발생하는 에러를 표현합니다.
//! 명령 실행 실패는 에러가 아니라 종료 코드로 표현되므로 여기에 포함되지 않습니다.
//! `From<ChannelError> for DepprobeError` 변환으로 상위 레이어에서 `?`로 전파합니다.

use depprobe_core::error::{DepprobeError, TargetError};

/// 채널 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker 소켓 연결 실패
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// 컨테이너를 찾을 수 없음
    #[error("Container '{0}' not found")]
    ContainerNotFound(String),

    /// 컨테이너가 실행 중이 아님
    #[error("Container '{name}' is not running (status: {status})")]
    ContainerNotRunning {
        /// 컨테이너 이름
        name: String,
        /// 현재 상태
        status: String,
    },

    /// compose 스택에 실행 중인 컨테이너가 없음
    #[error("No running containers found for stack '{0}'")]
    StackEmpty(String),

    /// 식별자 형식 오류
    #[error("invalid identifier '{identifier}': {reason}")]
    InvalidIdentifier {
        /// 입력된 식별자
        identifier: String,
        /// 거부 사유
        reason: String,
    },
}

impl From<ChannelError> for DepprobeError {
    fn from(err: ChannelError) -> Self {
        let target = match err {
            ChannelError::DockerApi(msg) | ChannelError::DockerConnection(msg) => {
                TargetError::Runtime(msg)
            }
            ChannelError::ContainerNotFound(name) => TargetError::ContainerNotFound(name),
            ChannelError::ContainerNotRunning { name, status } => {
                TargetError::ContainerNotRunning { name, status }
            }
            ChannelError::StackEmpty(stack) => TargetError::StackEmpty(stack),
            ChannelError::InvalidIdentifier { identifier, reason } => {
                TargetError::InvalidIdentifier { identifier, reason }
            }
        };
        DepprobeError::Target(target)
    }
}
