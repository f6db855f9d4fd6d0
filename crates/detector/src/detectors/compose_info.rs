//! compose 스택 식별 탐지기
//!
//! 스택 채널의 구성 컨테이너를 서비스 목록으로 보고합니다. 서비스 이름은
//! compose 서비스 라벨을 우선 사용하고, 없으면 `<stack>-<svc>-<n>` 또는
//! `<stack>_<svc>_<n>` 명명 규칙에서 유도합니다.

use depprobe_core::{
    CommandChannel, ContainerIdentity, Scope, ServiceInfo, SourceInfo, SourceKind,
};

use super::{DetectContext, Detection, Detector, DetectorKind};
use crate::error::DetectorError;

pub const NAME: &str = "compose-info";

/// compose 스택 식별 탐지기
#[derive(Debug, Default)]
pub struct ComposeInfoDetector;

impl Detector for ComposeInfoDetector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::StackIdentity
    }

    async fn is_usable(
        &self,
        channel: &dyn CommandChannel,
        _ctx: &DetectContext,
    ) -> Result<bool, DetectorError> {
        Ok(channel.identity().is_stack())
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
        let stack = channel
            .identity()
            .stack()
            .ok_or_else(|| DetectorError::NotApplicable {
                detector: NAME.to_owned(),
                target: channel.identity().to_string(),
            })?;

        let services = stack
            .containers
            .iter()
            .map(|c| ServiceInfo {
                service: service_name(&stack.project, c),
                container: c.name.clone(),
                image: c.image.clone(),
                hash: c.image_id.clone(),
            })
            .collect();

        let mut source = SourceInfo::new(SourceKind::Compose, &stack.project);
        source.services = Some(services);
        Ok(Detection::Source(source))
    }
}

fn service_name(project: &str, container: &ContainerIdentity) -> String {
    if let Some(service) = container.service.as_deref().filter(|s| !s.is_empty()) {
        return service.to_owned();
    }

    for sep in ['-', '_'] {
        let Some(rest) = container
            .name
            .strip_prefix(project)
            .and_then(|r| r.strip_prefix(sep))
        else {
            continue;
        };
        let service = match rest.rsplit_once(sep) {
            Some((svc, n)) if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => svc,
            _ => rest,
        };
        if !service.is_empty() {
            return service.to_owned();
        }
    }

    container.name.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use depprobe_core::testing::ScriptedChannel;
    use depprobe_core::{StackIdentity, TargetIdentity};

    fn container(name: &str, service: Option<&str>) -> ContainerIdentity {
        ContainerIdentity {
            id: format!("{name}-id"),
            name: name.to_owned(),
            image: format!("docker.io/library/{name}:latest"),
            image_id: format!("sha256:{}", "1".repeat(64)),
            state: "running".to_owned(),
            service: service.map(str::to_owned),
        }
    }

    #[test]
    fn service_name_prefers_label() {
        let c = container("shop-web-1", Some("frontend"));
        assert_eq!(service_name("shop", &c), "frontend");
    }

    #[test]
    fn service_name_from_naming_convention() {
        assert_eq!(service_name("shop", &container("shop-web-1", None)), "web");
        assert_eq!(service_name("shop", &container("shop_db_2", None)), "db");
        assert_eq!(
            service_name("shop", &container("shop-order-worker-3", None)),
            "order-worker"
        );
        assert_eq!(service_name("shop", &container("shop-cache", None)), "cache");
    }

    #[test]
    fn service_name_falls_back_to_container_name() {
        assert_eq!(service_name("shop", &container("redis", None)), "redis");
    }

    #[tokio::test]
    async fn reports_services_for_stack() {
        let channel = ScriptedChannel::new(TargetIdentity::Stack(StackIdentity {
            project: "shop".to_owned(),
            containers: vec![
                container("shop-db-1", Some("db")),
                container("shop-web-1", None),
            ],
        }));
        let ctx = DetectContext::default();
        assert!(ComposeInfoDetector.is_usable(&channel, &ctx).await.unwrap());

        let Detection::Source(source) = ComposeInfoDetector.extract(&channel, &ctx).await.unwrap()
        else {
            panic!("expected source detection");
        };
        assert_eq!(source.kind, SourceKind::Compose);
        assert_eq!(source.name, "shop");
        let services = source.services.unwrap();
        let names: Vec<_> = services.iter().map(|s| s.service.as_str()).collect();
        assert_eq!(names, vec!["db", "web"]);
        assert_eq!(services[1].image, "docker.io/library/shop-web-1:latest");
    }

    #[tokio::test]
    async fn unusable_outside_stack() {
        let channel = ScriptedChannel::host();
        assert!(
            !ComposeInfoDetector
                .is_usable(&channel, &DetectContext::default())
                .await
                .unwrap()
        );
    }
}
