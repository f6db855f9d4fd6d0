//! 호스트 식별 탐지기
//!
//! 로컬 호스트 채널에서만 실행되며 호스트 이름, OS 이름(`PRETTY_NAME`),
//! 커널(`uname -sr`)을 최상위 `source`로 보고합니다.

use depprobe_core::{CommandChannel, Scope, SourceInfo, SourceKind};

use super::{DetectContext, Detection, Detector, DetectorKind};
use crate::error::DetectorError;

pub const NAME: &str = "host-info";

/// 호스트 식별 탐지기
#[derive(Debug, Default)]
pub struct HostInfoDetector;

impl Detector for HostInfoDetector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::TargetIdentity
    }

    async fn is_usable(
        &self,
        channel: &dyn CommandChannel,
        _ctx: &DetectContext,
    ) -> Result<bool, DetectorError> {
        Ok(channel.identity().is_host())
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
        let hostname = channel
            .execute("uname -n", None)
            .await
            .stdout_if_success()
            .unwrap_or("localhost")
            .to_owned();

        let mut source = SourceInfo::new(SourceKind::Host, hostname);

        let os_release = channel.execute("cat /etc/os-release", None).await;
        if os_release.is_success() {
            source.os = pretty_name(&os_release.stdout);
        }
        source.kernel = channel
            .execute("uname -sr", None)
            .await
            .stdout_if_success()
            .map(str::to_owned);

        Ok(Detection::Source(source))
    }
}

/// os-release의 `PRETTY_NAME` 값 (따옴표 제거)
fn pretty_name(os_release: &str) -> Option<String> {
    os_release
        .lines()
        .find_map(|line| line.trim().strip_prefix("PRETTY_NAME="))
        .map(|value| value.trim_matches(|c| c == '"' || c == '\'').to_owned())
        .filter(|value| !value.is_empty())
}
