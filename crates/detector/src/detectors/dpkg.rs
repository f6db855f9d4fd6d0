//! Debian 계열 OS 패키지 탐지기
//!
//! `dpkg-query`로 설치된 패키지를 나열합니다. 버전 문자열에는 아키텍처
//! 토큰이 포함됩니다 (`7.88.1-10+deb12u5 amd64`).
//!
//! 패키지 해시는 `/var/lib/dpkg/info/<pkg>.md5sums` (multi-arch 패키지는
//! `<pkg>:<arch>.md5sums`)의 체크섬 목록으로 계산합니다. 모든 목록 파일을
//! 한 번의 명령으로 읽어 패키지 수만큼 명령을 실행하지 않습니다.

use std::collections::HashMap;

use depprobe_core::{CommandChannel, Ecosystem, LocationMetadata, Package, Scope};
use tracing::debug;

use super::{
    DetectContext, Detection, Detector, PackageSet, os_release, run_checked, tool_available,
};
use crate::error::DetectorError;
use crate::hashing::checksum_list_hash;

pub const NAME: &str = "dpkg";

const LIST_COMMAND: &str = "dpkg-query -W -f='${Package}\\t${Version}\\t${Architecture}\\n'";

const MD5SUMS_COMMAND: &str = "for f in /var/lib/dpkg/info/*.md5sums; do \
     [ -f \"$f\" ] && echo \"### $f\" && cat \"$f\"; done; true";

const SECTION_MARKER: &str = "### ";

/// dpkg 탐지기
#[derive(Debug, Default)]
pub struct DpkgDetector;

impl Detector for DpkgDetector {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn is_usable(
        &self,
        channel: &dyn CommandChannel,
        _ctx: &DetectContext,
    ) -> Result<bool, DetectorError> {
        let release = os_release(channel).await;
        let debian_family = release.contains("debian")
            || release.contains("ubuntu")
            || channel.path_exists("/etc/debian_version").await;
        if !debian_family {
            return Ok(false);
        }
        Ok(tool_available(channel, "dpkg-query --version").await)
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
        ctx: &DetectContext,
    ) -> Result<Detection, DetectorError> {
        let listing = run_checked(channel, LIST_COMMAND, None).await?;
        let mut packages = parse_listing(&listing);

        if !ctx.skip_hash_collection && !packages.is_empty() {
            let output = channel.execute(MD5SUMS_COMMAND, None).await;
            let hashes = parse_md5sums(&output.stdout);
            debug!(
                packages = packages.len(),
                manifests = hashes.len(),
                "collected dpkg checksum manifests"
            );
            for (package, arch) in &mut packages {
                let hash = hashes
                    .get(&package.name)
                    .or_else(|| hashes.get(&format!("{}:{arch}", package.name)));
                package.hash = hash.cloned();
            }
        }

        Ok(Detection::Packages(PackageSet {
            scope: Scope::System,
            location: LocationMetadata::system(),
            packages: packages.into_iter().map(|(p, _)| p).collect(),
        }))
    }
}

/// 탭 구분 `이름 / 버전 / 아키텍처` 줄을 파싱합니다. 아키텍처도 함께 돌려줍니다.
fn parse_listing(listing: &str) -> Vec<(Package, String)> {
    listing
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let name = fields.next()?.trim();
            let version = fields.next()?.trim();
            let arch = fields.next().unwrap_or_default().trim();
            if name.is_empty() || version.is_empty() {
                return None;
            }
            let version = if arch.is_empty() {
                version.to_owned()
            } else {
                format!("{version} {arch}")
            };
            Some((Package::new(name, version, Ecosystem::Dpkg), arch.to_owned()))
        })
        .collect()
}

/// `### <path>` 구분자로 이어 붙인 md5sums 파일들을 패키지별 해시로 바꿉니다.
///
/// 키는 파일 이름에서 `.md5sums`를 뗀 값입니다 (`curl`, `libc6:amd64`).
fn parse_md5sums(output: &str) -> HashMap<String, String> {
    let mut sections: Vec<(&str, String)> = Vec::new();
    for line in output.lines() {
        if let Some(path) = line.strip_prefix(SECTION_MARKER) {
            let file = path.rsplit('/').next().unwrap_or(path);
            let key = file.strip_suffix(".md5sums").unwrap_or(file);
            sections.push((key, String::new()));
        } else if let Some((_, content)) = sections.last_mut() {
            content.push_str(line);
            content.push('\n');
        }
    }

    sections
        .into_iter()
        .filter_map(|(key, content)| checksum_list_hash(&content).map(|h| (key.to_owned(), h)))
        .collect()
}
