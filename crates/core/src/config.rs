//! 설정 관리 — depprobe.toml 파싱 및 런타임 설정
//!
//! [`DepprobeConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`DEPPROBE_RESOLVER_MAX_WORKERS=8` 형식)
//! 3. 설정 파일 (`depprobe.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), depprobe_core::error::DepprobeError> {
//! use depprobe_core::config::DepprobeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = DepprobeConfig::load("depprobe.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = DepprobeConfig::parse("[resolver]\nmax_workers = 8")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, DepprobeError};

/// 병렬 워커 수 상한
pub const MAX_WORKERS_LIMIT: usize = 64;

/// depprobe 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepprobeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 해석기 설정
    #[serde(default)]
    pub resolver: ResolverConfig,
    /// Docker 연결 설정
    #[serde(default)]
    pub docker: DockerConfig,
}

impl DepprobeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DepprobeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DepprobeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DepprobeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DepprobeError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 기본값에 환경변수 오버라이드만 적용한 설정 (설정 파일이 없을 때)
    pub fn from_env() -> Result<Self, DepprobeError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DepprobeError> {
        toml::from_str(toml_str).map_err(|e| {
            DepprobeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `DEPPROBE_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "DEPPROBE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DEPPROBE_GENERAL_LOG_FORMAT");

        // Resolver
        override_bool(
            &mut self.resolver.skip_system_scope,
            "DEPPROBE_RESOLVER_SKIP_SYSTEM_SCOPE",
        );
        override_bool(
            &mut self.resolver.skip_hash_collection,
            "DEPPROBE_RESOLVER_SKIP_HASH_COLLECTION",
        );
        override_csv(&mut self.resolver.detectors, "DEPPROBE_RESOLVER_DETECTORS");
        override_usize(
            &mut self.resolver.max_workers,
            "DEPPROBE_RESOLVER_MAX_WORKERS",
        );
        override_bool(&mut self.resolver.fail_fast, "DEPPROBE_RESOLVER_FAIL_FAST");
        override_u64(
            &mut self.resolver.command_timeout_secs,
            "DEPPROBE_RESOLVER_COMMAND_TIMEOUT_SECS",
        );

        // Docker
        override_string(&mut self.docker.socket, "DEPPROBE_DOCKER_SOCKET");
        override_u64(
            &mut self.docker.connect_timeout_secs,
            "DEPPROBE_DOCKER_CONNECT_TIMEOUT_SECS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DepprobeError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.resolver.max_workers == 0 || self.resolver.max_workers > MAX_WORKERS_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "resolver.max_workers".to_owned(),
                reason: format!("must be between 1 and {MAX_WORKERS_LIMIT}"),
            }
            .into());
        }

        if self.resolver.command_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "resolver.command_timeout_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.resolver.detectors.iter().any(|d| d.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "resolver.detectors".to_owned(),
                reason: "detector names must not be empty".to_owned(),
            }
            .into());
        }

        if self.docker.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "docker.connect_timeout_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 해석기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// 시스템 범위 탐지기 결과 제외
    pub skip_system_scope: bool,
    /// 위치/패키지 해시 계산 생략
    pub skip_hash_collection: bool,
    /// 실행할 탐지기 이름 (비어 있으면 전체)
    pub detectors: Vec<String>,
    /// 배치 해석 병렬 워커 수
    pub max_workers: usize,
    /// 첫 실패 시 시작 전 요청 취소
    pub fail_fast: bool,
    /// 로컬 명령 타임아웃 (초)
    pub command_timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            skip_system_scope: false,
            skip_hash_collection: false,
            detectors: Vec::new(),
            max_workers: 4,
            fail_fast: false,
            command_timeout_secs: 30,
        }
    }
}

/// Docker 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Docker 소켓 경로 (비어 있으면 플랫폼 기본값)
    pub socket: String,
    /// 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: String::new(),
            connect_timeout_secs: 120,
        }
    }
}

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
