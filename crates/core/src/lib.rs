#![doc = include_str!("../README.md")]

pub mod channel;
pub mod config;
pub mod error;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, DepprobeError, ResolveError, TargetError};

// 설정
pub use config::DepprobeConfig;

// 명령 채널
pub use channel::{
    BoxFuture, CommandChannel, CommandOutput, ContainerIdentity, StackIdentity, TargetIdentity,
    shell_quote,
};

// 도메인 타입
pub use types::{
    AggregatedResult, Ecosystem, LocationMetadata, Package, RuntimeInfo, Scope, Section,
    ServiceInfo, SourceInfo, SourceKind,
};
