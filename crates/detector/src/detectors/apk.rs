//! Alpine 계열 OS 패키지 탐지기
//!
//! `apk list --installed` 줄 형식:
//! `busybox-1.36.1-r15 x86_64 {busybox} (GPL-2.0-only) [installed]`
//!
//! 이름과 버전은 첫 토큰을 마지막 두 `-`에서 나눠 얻고, 아키텍처는 두 번째
//! 토큰입니다. `apk list`가 없는 구버전은 `apk info -v`로 대체합니다.
//! apk는 패키지 단위 체크섬을 제공하지 않으므로 해시는 만들지 않습니다.

use depprobe_core::{CommandChannel, Ecosystem, LocationMetadata, Package, Scope};
use tracing::debug;

use super::{
    DetectContext, Detection, Detector, PackageSet, os_release, run_checked, tool_available,
};
use crate::error::DetectorError;

pub const NAME: &str = "apk";

const LIST_COMMAND: &str = "apk list --installed";
const INFO_COMMAND: &str = "apk info -v";

/// apk 탐지기
#[derive(Debug, Default)]
pub struct ApkDetector;

impl Detector for ApkDetector {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn is_usable(
        &self,
        channel: &dyn CommandChannel,
        _ctx: &DetectContext,
    ) -> Result<bool, DetectorError> {
        let alpine = os_release(channel).await.contains("alpine")
            || channel.path_exists("/etc/alpine-release").await;
        if !alpine {
            return Ok(false);
        }
        Ok(tool_available(channel, "apk --version").await)
    }

    async fn scope(
        &self,
        _channel: &dyn CommandChannel,
        _ctx: &DetectContext,
    ) -> Result<Scope, DetectorError> {
        Ok(Scope::System)
    }

    async fn extract(
        &self,
        channel: &dyn CommandChannel,
        _ctx: &DetectContext,
    ) -> Result<Detection, DetectorError> {
        let listed = channel.execute(LIST_COMMAND, None).await;
        let mut packages = if listed.is_success() {
            parse_list_installed(&listed.stdout)
        } else {
            Vec::new()
        };

        if packages.is_empty() {
            debug!("apk list unavailable, falling back to apk info");
            let info = run_checked(channel, INFO_COMMAND, None).await?;
            packages = parse_info(&info);
        }

        Ok(Detection::Packages(PackageSet {
            scope: Scope::System,
            location: LocationMetadata::system(),
            packages,
        }))
    }
}

/// `name-ver-rel`을 (이름, `ver-rel`)로 나눕니다.
fn split_name_version(token: &str) -> Option<(&str, String)> {
    let mut parts = token.rsplitn(3, '-');
    let release = parts.next()?;
    let version = parts.next()?;
    let name = parts.next()?;
    if name.is_empty() || version.is_empty() || !release.starts_with('r') {
        return None;
    }
    Some((name, format!("{version}-{release}")))
}

fn parse_list_installed(output: &str) -> Vec<Package> {
    output
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let (name, version) = split_name_version(tokens.next()?)?;
            let version = match tokens.next() {
                Some(arch) if !arch.starts_with('{') => format!("{version} {arch}"),
                _ => version,
            };
            Some(Package::new(name, version, Ecosystem::Apk))
        })
        .collect()
}

fn parse_info(output: &str) -> Vec<Package> {
    output
        .lines()
        .filter_map(|line| {
            let (name, version) = split_name_version(line.trim())?;
            Some(Package::new(name, version, Ecosystem::Apk))
        })
        .collect()
}
