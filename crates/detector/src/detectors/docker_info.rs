//! 컨테이너 식별 탐지기
//!
//! 단일 컨테이너 채널에서만 실행되며 컨테이너 이름, 전체 이미지 참조,
//! 이미지 ID를 최상위 `source`로 보고합니다. 명령은 실행하지 않습니다.

use depprobe_core::{CommandChannel, Scope, SourceInfo, SourceKind};

use super::{DetectContext, Detection, Detector, DetectorKind};
use crate::error::DetectorError;

pub const NAME: &str = "docker-info";

/// 컨테이너 식별 탐지기
#[derive(Debug, Default)]
pub struct DockerInfoDetector;

impl Detector for DockerInfoDetector {
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
        Ok(channel.identity().container().is_some())
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
        let container =
            channel
                .identity()
                .container()
                .ok_or_else(|| DetectorError::NotApplicable {
                    detector: NAME.to_owned(),
                    target: channel.identity().to_string(),
                })?;

        let mut source = SourceInfo::new(SourceKind::Container, &container.name);
        source.image = Some(container.image.clone());
        source.hash = Some(container.image_id.clone());
        Ok(Detection::Source(source))
    }
}
