//! 명령 채널 trait — 대상 환경 추상화
//!
//! [`CommandChannel`]은 탐지기가 대상(호스트, 컨테이너, compose 스택)과
//! 통신하는 유일한 경로입니다. 새 대상 종류(예: SSH)를 추가하려면
//! 이 trait만 구현하면 되고 탐지기 코드는 바뀌지 않습니다.
//!
//! # 실패 규약
//! `execute`는 실패하지 않습니다. 실행 자체가 불가능했던 경우(타임아웃, spawn 실패,
//! 셸 부재)는 종료 코드 1과 합성된 stderr로 표현됩니다.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

/// `dyn` 호환 trait에서 사용하는 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 명령 실행 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
}

impl CommandOutput {
    /// 성공(종료 코드 0) 결과
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// 실행 불가 결과 (종료 코드 1, 합성 stderr)
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: message.into(),
            exit_code: 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// 성공했고 stdout이 공백이 아닐 때만 trim된 stdout을 돌려줍니다.
    pub fn stdout_if_success(&self) -> Option<&str> {
        if !self.is_success() {
            return None;
        }
        let trimmed = self.stdout.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

/// 단일 컨테이너의 식별 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerIdentity {
    /// 컨테이너 ID (64자리 hex)
    pub id: String,
    /// 컨테이너 이름 (선행 `/` 제거)
    pub name: String,
    /// 이미지 참조. 레지스트리 경로를 축약하지 않음
    pub image: String,
    /// 이미지 ID (`sha256:...`)
    pub image_id: String,
    /// 런타임 상태 (`running`, `exited`, ...)
    pub state: String,
    /// compose 서비스 라벨
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl fmt::Display for ContainerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) [{}]", self.name, self.image, self.state)
    }
}

/// compose 스택의 식별 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackIdentity {
    /// compose 프로젝트 이름
    pub project: String,
    /// 실행 중인 구성 컨테이너
    pub containers: Vec<ContainerIdentity>,
}

/// 채널이 가리키는 대상
///
/// 채널 생성 시점에 한 번 확정되며 이후 변하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetIdentity {
    Host,
    Container(ContainerIdentity),
    Stack(StackIdentity),
}

impl TargetIdentity {
    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host)
    }

    pub fn is_stack(&self) -> bool {
        matches!(self, Self::Stack(_))
    }

    pub fn container(&self) -> Option<&ContainerIdentity> {
        match self {
            Self::Container(c) => Some(c),
            _ => None,
        }
    }

    pub fn stack(&self) -> Option<&StackIdentity> {
        match self {
            Self::Stack(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for TargetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Container(c) => write!(f, "container:{}", c.name),
            Self::Stack(s) => write!(f, "compose:{}", s.project),
        }
    }
}

/// 대상에 명령을 실행하는 채널
///
/// `Vec<Box<dyn CommandChannel>>` 등으로 다룰 수 있도록 `BoxFuture`를 반환합니다.
pub trait CommandChannel: Send + Sync {
    /// 채널이 가리키는 대상
    fn identity(&self) -> &TargetIdentity;

    /// 명령 문자열을 실행합니다. `working_dir`가 주어지면 그 디렉토리에서 실행합니다.
    fn execute<'a>(
        &'a self,
        command: &'a str,
        working_dir: Option<&'a str>,
    ) -> BoxFuture<'a, CommandOutput>;

    /// 경로 존재 여부
    fn path_exists<'a>(&'a self, path: &'a str) -> BoxFuture<'a, bool>;
}

/// POSIX 셸용 단일 따옴표 인용
///
/// `it's` → `'it'\''s'`
pub fn shell_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_uses_sentinel_exit_code() {
        let out = CommandOutput::failure("Command timed out after 30 seconds");
        assert_eq!(out.exit_code, 1);
        assert!(!out.is_success());
        assert!(out.stdout.is_empty());
    }

    #[test]
    fn stdout_if_success_trims_and_filters() {
        assert_eq!(
            CommandOutput::success("  /usr/lib \n").stdout_if_success(),
            Some("/usr/lib")
        );
        assert_eq!(CommandOutput::success("   ").stdout_if_success(), None);
        assert_eq!(CommandOutput::failure("x").stdout_if_success(), None);
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("/opt/app"), "'/opt/app'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn identity_accessors() {
        let container = ContainerIdentity {
            id: "a".repeat(64),
            name: "web".to_owned(),
            image: "nginx:1.25".to_owned(),
            image_id: "sha256:abc".to_owned(),
            state: "running".to_owned(),
            service: None,
        };
        let identity = TargetIdentity::Container(container);
        assert!(!identity.is_host());
        assert_eq!(identity.container().map(|c| c.name.as_str()), Some("web"));
        assert!(identity.stack().is_none());
        assert_eq!(identity.to_string(), "container:web");
        assert_eq!(TargetIdentity::Host.to_string(), "host");
    }
}
