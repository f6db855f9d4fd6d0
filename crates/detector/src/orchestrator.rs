//! 오케스트레이터 — 탐지기 실행과 결과 집계
//!
//! 한 대상에 대한 해석은 엄격히 순차적입니다. 탐지기는 고정된 우선순위대로
//! 같은 채널 위에서 하나씩 실행됩니다.
//!
//! # 실행 흐름
//! ```text
//! 작업 디렉토리 검증 ──실패──▶ ResolveError::WorkingDirNotFound
//!        │
//!        ▼
//! 탐지기별: is_usable ──false──▶ 건너뜀
//!        │ true
//!        ▼
//!   (skip_system_scope) scope == System ──▶ 건너뜀
//!        │
//!        ▼
//!     extract ──▶ source / project / system 병합
//! ```
//!
//! 탐지기의 에러는 `warn!`으로 기록되고 해당 탐지기만 결과에서 빠집니다.

use std::time::Instant;

use depprobe_core::config::ResolverConfig;
use depprobe_core::{
    AggregatedResult, CommandChannel, DepprobeError, ResolveError, Scope, Section,
};
use tracing::{debug, info, warn};

use crate::detectors::{
    DetectContext, Detection, DetectorKind, PackageDetector, default_detectors,
};
use crate::error::DetectorError;

type RegistryFn = dyn Fn() -> Vec<Box<dyn PackageDetector>> + Send + Sync;

/// 오케스트레이터 옵션
#[derive(Debug, Clone, Default)]
pub struct OrchestratorOptions {
    /// system 범위 탐지기 결과 생략
    pub skip_system_scope: bool,
    /// 패키지/위치 해시 계산 생략
    pub skip_hash_collection: bool,
    /// 명시적 Python 가상환경 경로
    pub venv_path: Option<String>,
    /// 실행할 탐지기 이름. 비어 있으면 전체
    pub selected_detectors: Vec<String>,
    /// 대상 식별 탐지기만 실행
    pub only_container_info: bool,
}

impl OrchestratorOptions {
    /// `[resolver]` 설정에서 옵션을 만듭니다.
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            skip_system_scope: config.skip_system_scope,
            skip_hash_collection: config.skip_hash_collection,
            venv_path: None,
            selected_detectors: config.detectors.clone(),
            only_container_info: false,
        }
    }
}

/// 쉼표로 구분된 탐지기 목록을 파싱합니다. 빈 항목은 버립니다.
pub fn parse_detector_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

/// 탐지기 오케스트레이터
///
/// 탐지기 인스턴스는 `resolve` 호출마다 새로 만들어지므로 실행 간 캐시가 없습니다.
pub struct Orchestrator {
    registry: Box<RegistryFn>,
    names: Vec<&'static str>,
    options: OrchestratorOptions,
}

impl Orchestrator {
    /// 기본 탐지기 목록으로 오케스트레이터를 생성합니다.
    ///
    /// # Errors
    ///
    /// 알 수 없는 탐지기 이름이 선택되면 `ResolveError::InvalidDetectors`
    pub fn new(options: OrchestratorOptions) -> Result<Self, DepprobeError> {
        Self::with_registry(default_detectors, options)
    }

    /// 사용자 정의 탐지기 목록으로 오케스트레이터를 생성합니다.
    ///
    /// `registry`는 해석마다 호출되어 우선순위 순서의 새 인스턴스를 돌려줘야 합니다.
    pub fn with_registry<F>(registry: F, options: OrchestratorOptions) -> Result<Self, DepprobeError>
    where
        F: Fn() -> Vec<Box<dyn PackageDetector>> + Send + Sync + 'static,
    {
        let names: Vec<&'static str> = registry().iter().map(|d| d.name()).collect();

        let mut invalid: Vec<String> = Vec::new();
        for name in &options.selected_detectors {
            if !names.contains(&name.as_str()) && !invalid.contains(name) {
                invalid.push(name.clone());
            }
        }
        if !invalid.is_empty() {
            return Err(ResolveError::InvalidDetectors {
                invalid,
                available: names.iter().map(|n| (*n).to_owned()).collect(),
            }
            .into());
        }

        Ok(Self {
            registry: Box::new(registry),
            names,
            options,
        })
    }

    /// 기본 탐지기 이름 (우선순위 순)
    pub fn available_detectors() -> Vec<&'static str> {
        crate::detectors::DETECTOR_NAMES.to_vec()
    }

    /// 이 오케스트레이터가 실행할 수 있는 탐지기 이름 (선택 반영)
    pub fn detector_names(&self) -> Vec<&'static str> {
        self.names
            .iter()
            .copied()
            .filter(|name| self.is_selected(name))
            .collect()
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    fn is_selected(&self, name: &str) -> bool {
        self.options.selected_detectors.is_empty()
            || self.options.selected_detectors.iter().any(|s| s == name)
    }

    /// 채널이 가리키는 대상의 의존성을 해석합니다.
    ///
    /// # Errors
    ///
    /// 작업 디렉토리가 대상에 없으면 `ResolveError::WorkingDirNotFound`.
    /// 탐지기 실패는 에러가 아니며 결과에서 해당 탐지기가 빠질 뿐입니다.
    pub async fn resolve(
        &self,
        channel: &dyn CommandChannel,
        working_dir: Option<&str>,
    ) -> Result<AggregatedResult, DepprobeError> {
        let is_stack = channel.identity().is_stack();

        // compose 스택 채널은 경로를 확인할 수 없음
        if let Some(dir) = working_dir.filter(|_| !is_stack) {
            if !channel.path_exists(dir).await {
                return Err(ResolveError::WorkingDirNotFound(dir.to_owned()).into());
            }
        }

        let ctx = DetectContext {
            working_dir: working_dir.map(str::to_owned),
            venv_path: self.options.venv_path.clone(),
            skip_hash_collection: self.options.skip_hash_collection,
        };

        let started = Instant::now();
        let mut result = AggregatedResult::default();
        let mut project = Section::default();
        let mut system = Section::default();

        for detector in (self.registry)() {
            let name = detector.name();
            let kind = detector.kind();
            if !self.is_selected(name)
                || is_stack != (kind == DetectorKind::StackIdentity)
                || (self.options.only_container_info && !kind.is_identity())
            {
                continue;
            }

            let detection = match self.run_detector(detector.as_ref(), channel, &ctx).await {
                Ok(Some(detection)) => detection,
                Ok(None) => continue,
                Err(e) => {
                    warn!(detector = name, error = %e, "detector failed, omitted from result");
                    continue;
                }
            };

            match detection {
                Detection::Source(source) => {
                    if result.source.is_none() {
                        result.source = Some(source);
                    }
                }
                Detection::Packages(set) => match set.scope {
                    Scope::System if self.options.skip_system_scope => {
                        debug!(detector = name, "system scope result dropped");
                    }
                    Scope::System => {
                        let mut location = set.location;
                        // system 위치에는 지문을 붙이지 않음
                        location.hash = None;
                        system.merge(name, location, set.packages);
                    }
                    Scope::Project => project.merge(name, set.location, set.packages),
                },
            }
        }

        if !project.is_empty() {
            result.project = Some(project);
        }
        if !system.is_empty() {
            result.system = Some(system);
        }

        info!(
            identity = %channel.identity(),
            packages = result.total_packages(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "resolution finished"
        );
        Ok(result)
    }

    async fn run_detector(
        &self,
        detector: &dyn PackageDetector,
        channel: &dyn CommandChannel,
        ctx: &DetectContext,
    ) -> Result<Option<Detection>, DetectorError> {
        let name = detector.name();

        if !detector.is_usable(channel, ctx).await? {
            debug!(detector = name, "not usable on this target");
            return Ok(None);
        }

        if self.options.skip_system_scope
            && detector.kind() == DetectorKind::Packages
            && detector.scope(channel, ctx).await? == Scope::System
        {
            debug!(detector = name, "system scope skipped before extraction");
            return Ok(None);
        }

        let started = Instant::now();
        let detection = detector.extract(channel, ctx).await?;
        debug!(
            detector = name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "detector finished"
        );
        Ok(Some(detection))
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("detectors", &self.names)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depprobe_core::testing::ScriptedChannel;
    use depprobe_core::{ContainerIdentity, StackIdentity, TargetIdentity};

    #[test]
    fn parse_detector_list_trims_and_drops_empty() {
        assert_eq!(parse_detector_list(" pip, npm ,,dpkg "), vec!["pip", "npm", "dpkg"]);
        assert!(parse_detector_list("").is_empty());
        assert!(parse_detector_list(" , ").is_empty());
    }

    #[test]
    fn unknown_detector_names_fail_construction() {
        let options = OrchestratorOptions {
            selected_detectors: vec!["pip".into(), "cargo".into(), "gem".into(), "cargo".into()],
            ..OrchestratorOptions::default()
        };
        let err = Orchestrator::new(options).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Invalid detector names: cargo, gem. Available detectors: "));
        assert!(message.contains("docker-info, host-info, dpkg"));
    }

    #[test]
    fn selection_limits_detector_names() {
        let options = OrchestratorOptions {
            selected_detectors: vec!["npm".into(), "dpkg".into()],
            ..OrchestratorOptions::default()
        };
        let orchestrator = Orchestrator::new(options).unwrap();
        // 우선순위 순서 유지
        assert_eq!(orchestrator.detector_names(), vec!["dpkg", "npm"]);
    }

    #[test]
    fn available_detectors_in_priority_order() {
        assert_eq!(
            Orchestrator::available_detectors(),
            vec![
                "docker-info",
                "host-info",
                "dpkg",
                "apk",
                "java-runtime",
                "pip",
                "npm",
                "compose-info"
            ]
        );
    }

    #[tokio::test]
    async fn missing_working_dir_aborts_run() {
        let orchestrator = Orchestrator::new(OrchestratorOptions::default()).unwrap();
        let channel = ScriptedChannel::host();
        let err = orchestrator
            .resolve(&channel, Some("/does/not/exist"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Working directory does not exist: /does/not/exist"
        );
        assert!(channel.calls().is_empty());
    }

    #[tokio::test]
    async fn bare_host_yields_only_source() {
        let orchestrator = Orchestrator::new(OrchestratorOptions::default()).unwrap();
        let channel = ScriptedChannel::host().with_output("uname -n", "box");
        let result = orchestrator.resolve(&channel, None).await.unwrap();
        assert_eq!(result.source.unwrap().name, "box");
        assert!(result.project.is_none());
        assert!(result.system.is_none());
    }

    #[tokio::test]
    async fn stack_target_runs_only_compose_info() {
        let orchestrator = Orchestrator::new(OrchestratorOptions::default()).unwrap();
        let channel = ScriptedChannel::new(TargetIdentity::Stack(StackIdentity {
            project: "shop".to_owned(),
            containers: vec![ContainerIdentity {
                id: "a".repeat(64),
                name: "shop-web-1".to_owned(),
                image: "nginx:1.25".to_owned(),
                image_id: format!("sha256:{}", "e".repeat(64)),
                state: "running".to_owned(),
                service: Some("web".to_owned()),
            }],
        }));
        let result = orchestrator.resolve(&channel, Some("/app")).await.unwrap();
        let source = result.source.unwrap();
        assert_eq!(source.name, "shop");
        assert_eq!(source.services.unwrap()[0].service, "web");
        assert!(result.project.is_none() && result.system.is_none());
        assert!(channel.calls().is_empty());
    }
}
