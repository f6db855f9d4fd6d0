//! 탐지기 프레임워크
//!
//! 탐지기 하나는 패키지 생태계 하나(또는 대상 식별 정보)를 담당하며
//! 세 가지 연산을 제공합니다.
//!
//! 1. `is_usable`: 환경 전제 조건 확인 후 도구 존재 확인 (전제 조건 실패 시 단락)
//! 2. `scope`: system / project 범위 판정. 추출 없이 계산 가능해야 함
//! 3. `extract`: 목록 명령 실행, 파싱, 위치 확정, 위치 해시
//!
//! 구현체는 [`Detector`] (RPITIT)를 구현하고, 오케스트레이터는
//! 블랭킷 구현으로 얻은 [`PackageDetector`] (dyn 호환)를 통해 다룹니다.
//!
//! # 새 생태계 추가
//! [`Detector`]를 구현하고 [`default_detectors`]의 우선순위 목록에 등록합니다.
//! 다른 컴포넌트는 수정할 필요가 없습니다.

pub mod apk;
pub mod compose_info;
pub mod docker_info;
pub mod dpkg;
pub mod host_info;
pub mod java;
pub mod npm;
pub mod pip;
pub mod venv;

use std::future::Future;

use depprobe_core::{
    BoxFuture, CommandChannel, LocationMetadata, Package, Scope, SourceInfo, shell_quote,
};

use crate::error::DetectorError;
use crate::hashing::{FingerprintProfile, location_hash};

pub use apk::ApkDetector;
pub use compose_info::ComposeInfoDetector;
pub use docker_info::DockerInfoDetector;
pub use dpkg::DpkgDetector;
pub use host_info::HostInfoDetector;
pub use java::JavaRuntimeDetector;
pub use npm::NpmDetector;
pub use pip::PipDetector;

// ─── 공통 타입 ─────────────────────────────────────────────────────────

/// 탐지기 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorKind {
    /// 패키지 목록을 내는 탐지기
    Packages,
    /// 단일 대상(호스트, 컨테이너)의 식별 정보
    TargetIdentity,
    /// compose 스택의 식별 정보
    StackIdentity,
}

impl DetectorKind {
    /// 패키지가 아닌 식별 정보를 내는 종류인지 여부
    pub fn is_identity(&self) -> bool {
        !matches!(self, Self::Packages)
    }
}

/// 한 번의 해석 동안 모든 탐지기가 공유하는 입력
#[derive(Debug, Clone, Default)]
pub struct DetectContext {
    /// 검사할 작업 디렉토리 (대상 기준 경로)
    pub working_dir: Option<String>,
    /// 명시적으로 지정된 가상환경 경로
    pub venv_path: Option<String>,
    /// 해시 수집 생략 여부
    pub skip_hash_collection: bool,
}

/// 탐지기 하나의 패키지 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSet {
    pub scope: Scope,
    pub location: LocationMetadata,
    pub packages: Vec<Package>,
}

/// 탐지기 추출 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// 패키지 목록 (project / system 섹션으로 병합)
    Packages(PackageSet),
    /// 대상 식별 정보 (최상위 `source`)
    Source(SourceInfo),
}

// ─── Detector Trait ────────────────────────────────────────────────────

/// 모든 탐지기가 구현하는 trait
///
/// 탐지기 인스턴스는 해석 한 번마다 새로 만들어집니다. 발견 결과 캐시
/// (가상환경 경로, 도구 존재 여부 등)는 인스턴스의 `OnceCell` 필드에 둡니다.
///
/// # 구현 예시
/// ```ignore
/// struct CargoDetector;
///
/// impl Detector for CargoDetector {
///     fn name(&self) -> &'static str { "cargo" }
///
///     async fn is_usable(&self, channel: &dyn CommandChannel, _ctx: &DetectContext)
///         -> Result<bool, DetectorError> {
///         Ok(tool_available(channel, "cargo --version").await)
///     }
///     async fn scope(&self, _: &dyn CommandChannel, _: &DetectContext)
///         -> Result<Scope, DetectorError> { Ok(Scope::Project) }
///     async fn extract(&self, channel: &dyn CommandChannel, ctx: &DetectContext)
///         -> Result<Detection, DetectorError> { todo!() }
/// }
/// ```
pub trait Detector: Send + Sync {
    /// 결과의 `package-management` 키로 쓰이는 고유 이름
    fn name(&self) -> &'static str;

    fn kind(&self) -> DetectorKind {
        DetectorKind::Packages
    }

    /// 이 대상에서 실행 가능한지 확인합니다.
    fn is_usable(
        &self,
        channel: &dyn CommandChannel,
        ctx: &DetectContext,
    ) -> impl Future<Output = Result<bool, DetectorError>> + Send;

    /// 설치 범위를 판정합니다.
    ///
    /// 오케스트레이터가 system 범위 생략 여부를 결정할 때 추출 전에 호출합니다.
    fn scope(
        &self,
        channel: &dyn CommandChannel,
        ctx: &DetectContext,
    ) -> impl Future<Output = Result<Scope, DetectorError>> + Send;

    /// 패키지 또는 식별 정보를 추출합니다.
    fn extract(
        &self,
        channel: &dyn CommandChannel,
        ctx: &DetectContext,
    ) -> impl Future<Output = Result<Detection, DetectorError>> + Send;
}

// ─── PackageDetector Trait ─────────────────────────────────────────────

/// dyn 호환 탐지기 trait
///
/// `Detector`는 RPITIT를 사용하므로 `dyn Detector`가 불가합니다.
/// `PackageDetector`는 `BoxFuture`를 반환하여 `Vec<Box<dyn PackageDetector>>`로
/// 우선순위 목록을 구성할 수 있게 합니다.
pub trait PackageDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn kind(&self) -> DetectorKind;

    fn is_usable<'a>(
        &'a self,
        channel: &'a dyn CommandChannel,
        ctx: &'a DetectContext,
    ) -> BoxFuture<'a, Result<bool, DetectorError>>;

    fn scope<'a>(
        &'a self,
        channel: &'a dyn CommandChannel,
        ctx: &'a DetectContext,
    ) -> BoxFuture<'a, Result<Scope, DetectorError>>;

    fn extract<'a>(
        &'a self,
        channel: &'a dyn CommandChannel,
        ctx: &'a DetectContext,
    ) -> BoxFuture<'a, Result<Detection, DetectorError>>;
}

/// 모든 `Detector` 구현체에 대한 블랭킷 `PackageDetector` 구현
impl<T: Detector> PackageDetector for T {
    fn name(&self) -> &'static str {
        Detector::name(self)
    }

    fn kind(&self) -> DetectorKind {
        Detector::kind(self)
    }

    fn is_usable<'a>(
        &'a self,
        channel: &'a dyn CommandChannel,
        ctx: &'a DetectContext,
    ) -> BoxFuture<'a, Result<bool, DetectorError>> {
        Box::pin(Detector::is_usable(self, channel, ctx))
    }

    fn scope<'a>(
        &'a self,
        channel: &'a dyn CommandChannel,
        ctx: &'a DetectContext,
    ) -> BoxFuture<'a, Result<Scope, DetectorError>> {
        Box::pin(Detector::scope(self, channel, ctx))
    }

    fn extract<'a>(
        &'a self,
        channel: &'a dyn CommandChannel,
        ctx: &'a DetectContext,
    ) -> BoxFuture<'a, Result<Detection, DetectorError>> {
        Box::pin(Detector::extract(self, channel, ctx))
    }
}

// ─── 등록 목록 ─────────────────────────────────────────────────────────

/// 우선순위 순서의 탐지기 이름
///
/// 시스템 패키지 관리자, 런타임/빌드 도구, 언어 패키지 관리자 순서입니다.
pub const DETECTOR_NAMES: &[&str] = &[
    docker_info::NAME,
    host_info::NAME,
    dpkg::NAME,
    apk::NAME,
    java::NAME,
    pip::NAME,
    npm::NAME,
    compose_info::NAME,
];

/// 우선순위 순서의 새 탐지기 인스턴스 목록
pub fn default_detectors() -> Vec<Box<dyn PackageDetector>> {
    vec![
        Box::new(DockerInfoDetector),
        Box::new(HostInfoDetector),
        Box::new(DpkgDetector),
        Box::new(ApkDetector),
        Box::new(JavaRuntimeDetector::new()),
        Box::new(PipDetector::new()),
        Box::new(NpmDetector::new()),
        Box::new(ComposeInfoDetector),
    ]
}

// ─── 공통 헬퍼 ─────────────────────────────────────────────────────────

/// 명령이 종료 코드 0으로 끝나는지 확인합니다.
pub(crate) async fn tool_available(channel: &dyn CommandChannel, command: &str) -> bool {
    channel.execute(command, None).await.is_success()
}

/// 명령을 실행하고 성공 시 stdout을 돌려줍니다.
pub(crate) async fn run_checked(
    channel: &dyn CommandChannel,
    command: &str,
    working_dir: Option<&str>,
) -> Result<String, DetectorError> {
    let output = channel.execute(command, working_dir).await;
    if output.is_success() {
        Ok(output.stdout)
    } else {
        Err(DetectorError::command_failed(command, &output))
    }
}

/// `/etc/os-release` 내용 (소문자). 읽을 수 없으면 빈 문자열
pub(crate) async fn os_release(channel: &dyn CommandChannel) -> String {
    let output = channel.execute("cat /etc/os-release", None).await;
    if output.is_success() {
        output.stdout.to_lowercase()
    } else {
        String::new()
    }
}

/// 디렉토리의 절대 경로 (심볼릭 링크 해석)
pub(crate) async fn absolute_dir(channel: &dyn CommandChannel, dir: &str) -> Option<String> {
    let command = format!("cd {} && pwd -P", shell_quote(dir));
    channel
        .execute(&command, None)
        .await
        .stdout_if_success()
        .map(str::to_owned)
}

/// 프로젝트 위치 메타데이터
///
/// 해시는 패키지가 하나 이상 있고 해시 수집이 생략되지 않았을 때만 계산합니다.
pub(crate) async fn project_location(
    channel: &dyn CommandChannel,
    location: &str,
    has_packages: bool,
    profile: &FingerprintProfile,
    ctx: &DetectContext,
) -> LocationMetadata {
    let mut metadata = LocationMetadata::at(location);
    if has_packages && !ctx.skip_hash_collection {
        metadata.hash = location_hash(channel, location, profile).await;
    }
    metadata
}

/// `dir`와 `name`을 `/`로 잇습니다.
pub(crate) fn join_path(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depprobe_core::testing::ScriptedChannel;
    use depprobe_core::CommandOutput;

    use crate::hashing::PIP_PROFILE;

    #[test]
    fn registry_order_matches_names() {
        let names: Vec<_> = default_detectors().iter().map(|d| d.name()).collect();
        assert_eq!(names, DETECTOR_NAMES);
    }

    #[test]
    fn system_managers_precede_language_managers() {
        let pos = |n: &str| DETECTOR_NAMES.iter().position(|d| *d == n).unwrap();
        assert!(pos("dpkg") < pos("pip"));
        assert!(pos("apk") < pos("npm"));
        assert!(pos("java-runtime") < pos("pip"));
    }

    #[test]
    fn identity_kinds() {
        assert!(DetectorKind::TargetIdentity.is_identity());
        assert!(DetectorKind::StackIdentity.is_identity());
        assert!(!DetectorKind::Packages.is_identity());
    }

    #[tokio::test]
    async fn project_location_hashes_only_with_packages() {
        let listing = format!("cd '/srv/app' && {}", PIP_PROFILE.listing_command());
        let channel = ScriptedChannel::host().with_output(&listing, "1 ./x\n");
        let ctx = DetectContext::default();

        let empty = project_location(&channel, "/srv/app", false, &PIP_PROFILE, &ctx).await;
        assert!(empty.hash.is_none());
        assert_eq!(channel.call_count("find"), 0);

        let full = project_location(&channel, "/srv/app", true, &PIP_PROFILE, &ctx).await;
        assert_eq!(full.hash.as_deref().map(str::len), Some(64));
    }

    #[tokio::test]
    async fn project_location_respects_skip_hash_collection() {
        let channel = ScriptedChannel::host().with_prefix_output("cd ", "1 ./x\n");
        let ctx = DetectContext {
            skip_hash_collection: true,
            ..DetectContext::default()
        };
        let meta = project_location(&channel, "/srv/app", true, &PIP_PROFILE, &ctx).await;
        assert!(meta.hash.is_none());
        assert!(channel.calls().is_empty());
    }

    #[tokio::test]
    async fn run_checked_maps_failure() {
        let channel = ScriptedChannel::host().with_result(
            "apk list --installed",
            CommandOutput {
                stdout: String::new(),
                stderr: "ERROR: lock".to_owned(),
                exit_code: 99,
            },
        );
        let err = run_checked(&channel, "apk list --installed", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DetectorError::CommandFailed { .. }));
    }

    #[test]
    fn join_path_handles_trailing_slash() {
        assert_eq!(join_path("/app", "venv"), "/app/venv");
        assert_eq!(join_path("/app/", "venv"), "/app/venv");
    }
}
