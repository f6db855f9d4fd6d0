//! Python 패키지 탐지기
//!
//! 가상환경을 먼저 찾고([`venv`](super::venv)), 그 환경의 `pip`로
//! `pip list --format=freeze`를 실행합니다.
//!
//! | 상황 | 범위 | 위치 |
//! |------|------|------|
//! | 가상환경 발견 | project | 가상환경의 site-packages |
//! | 작업 디렉토리 지정, 가상환경 없음 | project | 작업 디렉토리 (패키지 0개) |
//! | 둘 다 없음 | system | `system` |

use depprobe_core::{CommandChannel, Ecosystem, LocationMetadata, Package, Scope, shell_quote};
use tokio::sync::OnceCell;
use tracing::debug;

use super::venv::discover_venv;
use super::{
    DetectContext, Detection, Detector, PackageSet, absolute_dir, join_path, project_location,
    run_checked, tool_available,
};
use crate::error::DetectorError;
use crate::hashing::PIP_PROFILE;

pub const NAME: &str = "pip";

/// 가상환경 밖에서 시도하는 pip 명령 (우선순위 순)
const GLOBAL_PIP_COMMANDS: &[&str] = &["pip", "pip3", "python3 -m pip"];

/// pip 탐지기
#[derive(Debug, Default)]
pub struct PipDetector {
    venv: OnceCell<Option<String>>,
    pip_command: OnceCell<Option<String>>,
}

impl PipDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 발견된 가상환경 경로 (탐색 결과는 "없음"까지 캐시)
    async fn venv(&self, channel: &dyn CommandChannel, ctx: &DetectContext) -> Option<&str> {
        self.venv
            .get_or_init(|| async {
                let found = discover_venv(
                    channel,
                    ctx.working_dir.as_deref(),
                    ctx.venv_path.as_deref(),
                )
                .await;
                debug!(venv = ?found, "python virtual environment discovery finished");
                found
            })
            .await
            .as_deref()
    }

    /// 사용할 pip 명령. 가상환경의 `bin/pip`을 우선합니다.
    async fn pip_command(&self, channel: &dyn CommandChannel, ctx: &DetectContext) -> Option<&str> {
        let venv = self.venv(channel, ctx).await.map(str::to_owned);
        self.pip_command
            .get_or_init(|| async move {
                if let Some(venv) = venv {
                    for bin in ["bin/pip", "bin/pip3"] {
                        let path = join_path(&venv, bin);
                        let command = shell_quote(&path);
                        if channel.path_exists(&path).await
                            && tool_available(channel, &format!("{command} --version")).await
                        {
                            return Some(command);
                        }
                    }
                }
                for command in GLOBAL_PIP_COMMANDS {
                    if tool_available(channel, &format!("{command} --version")).await {
                        return Some((*command).to_owned());
                    }
                }
                None
            })
            .await
            .as_deref()
    }
}

impl Detector for PipDetector {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn is_usable(
        &self,
        channel: &dyn CommandChannel,
        ctx: &DetectContext,
    ) -> Result<bool, DetectorError> {
        if self.pip_command(channel, ctx).await.is_some() {
            return Ok(true);
        }
        // 인터프리터만 있는 프로젝트 디렉토리도 "패키지 0개"로 보고
        if ctx.working_dir.is_some() && self.venv(channel, ctx).await.is_none() {
            return Ok(tool_available(channel, "python3 --version").await);
        }
        Ok(false)
    }

    async fn scope(
        &self,
        channel: &dyn CommandChannel,
        ctx: &DetectContext,
    ) -> Result<Scope, DetectorError> {
        if ctx.working_dir.is_some() || self.venv(channel, ctx).await.is_some() {
            Ok(Scope::Project)
        } else {
            Ok(Scope::System)
        }
    }

    async fn extract(
        &self,
        channel: &dyn CommandChannel,
        ctx: &DetectContext,
    ) -> Result<Detection, DetectorError> {
        let venv = self.venv(channel, ctx).await.map(str::to_owned);

        if let (Some(dir), None) = (ctx.working_dir.as_deref(), venv.as_deref()) {
            debug!(working_dir = dir, "no virtual environment in working directory");
            let location = absolute_dir(channel, dir)
                .await
                .unwrap_or_else(|| dir.to_owned());
            return Ok(Detection::Packages(PackageSet {
                scope: Scope::Project,
                location: LocationMetadata::at(location),
                packages: Vec::new(),
            }));
        }

        let pip = self
            .pip_command(channel, ctx)
            .await
            .ok_or_else(|| DetectorError::CommandFailed {
                command: "pip --version".to_owned(),
                reason: "no pip executable found".to_owned(),
            })?;
        let command = format!("{pip} list --format=freeze");
        let listing = run_checked(channel, &command, ctx.working_dir.as_deref()).await?;
        let packages = parse_freeze(&listing);

        let set = match venv {
            Some(venv) => {
                let site = site_packages(channel, &venv).await;
                let location =
                    project_location(channel, &site, !packages.is_empty(), &PIP_PROFILE, ctx).await;
                PackageSet {
                    scope: Scope::Project,
                    location,
                    packages,
                }
            }
            None => PackageSet {
                scope: Scope::System,
                location: LocationMetadata::system(),
                packages,
            },
        };
        Ok(Detection::Packages(set))
    }
}

/// 가상환경의 site-packages 디렉토리. 찾지 못하면 가상환경 경로 자체
async fn site_packages(channel: &dyn CommandChannel, venv: &str) -> String {
    let python = shell_quote(&join_path(venv, "bin/python"));
    let command = format!("{python} -c 'import site; print(site.getsitepackages()[0])'");
    if let Some(path) = channel.execute(&command, None).await.stdout_if_success() {
        return path.to_owned();
    }

    let command = format!("ls -d {}/lib/python*/site-packages", shell_quote(venv));
    let output = channel.execute(&command, None).await;
    if let Some(first) = output.stdout_if_success().and_then(|s| s.lines().next()) {
        return first.trim().to_owned();
    }

    venv.to_owned()
}

/// `pip list --format=freeze` 출력 파싱
///
/// `name==version`과 `name @ url`을 인식하고, 편집 가능 설치(`-e`)와 주석은 건너뜁니다.
fn parse_freeze(output: &str) -> Vec<Package> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('-'))
        .filter_map(|line| {
            if let Some((name, version)) = line.split_once("==") {
                let version = version.trim_start_matches('=').trim();
                Some(Package::new(name.trim(), version, Ecosystem::Pip))
            } else if let Some((name, url)) = line.split_once(" @ ") {
                Some(Package::new(name.trim(), url.trim(), Ecosystem::Pip))
            } else {
                None
            }
        })
        .collect()
}
