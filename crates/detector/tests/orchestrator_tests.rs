//! 오케스트레이터 통합 테스트
//!
//! 스크립트 채널로 여러 생태계가 섞인 대상을 흉내 내어 격리, 범위 생략,
//! 멱등성, 가상환경 우선순위를 검증합니다.

use depprobe_core::testing::ScriptedChannel;
use depprobe_core::{
    CommandChannel, CommandOutput, ContainerIdentity, Ecosystem, Scope, SourceKind, TargetIdentity,
};
use depprobe_detector::{
    DetectContext, Detection, Detector, DetectorError, Orchestrator, OrchestratorOptions,
    PackageSet, default_detectors,
};

const DPKG_LIST: &str = "dpkg-query -W -f='${Package}\\t${Version}\\t${Architecture}\\n'";

fn debian_container() -> ScriptedChannel {
    debian_container_with(CommandOutput::success(
        "base-files\t12.4\tamd64\ncurl\t7.88.1-10\tamd64\n",
    ))
}

fn debian_container_with(dpkg_listing: CommandOutput) -> ScriptedChannel {
    ScriptedChannel::new(TargetIdentity::Container(ContainerIdentity {
        id: "d".repeat(64),
        name: "api".to_owned(),
        image: "registry.example.com/team/api:1.4".to_owned(),
        image_id: format!("sha256:{}", "9".repeat(64)),
        state: "running".to_owned(),
        service: None,
    }))
    .with_output("cat /etc/os-release", "PRETTY_NAME=\"Debian GNU/Linux 12\"\nID=debian\n")
    .with_output("dpkg-query --version", "Debian dpkg-query version 1.21.22")
    .with_result(DPKG_LIST, dpkg_listing)
    .with_prefix_output("for f in /var/lib/dpkg/info/", "")
    .with_output("printenv VIRTUAL_ENV", "")
    .with_paths(&["/app", "/app/.venv/pyvenv.cfg", "/app/.venv/bin/pip"])
    .with_output("'/app/.venv/bin/pip' --version", "pip 24.0")
    .with_output("'/app/.venv/bin/pip' list --format=freeze", "Django==5.0.1\nsqlparse==0.4.4\n")
    .with_output(
        "'/app/.venv/bin/python' -c 'import site; print(site.getsitepackages()[0])'",
        "/app/.venv/lib/python3.12/site-packages",
    )
    .with_prefix_output(
        "cd '/app/.venv/lib/python3.12/site-packages' && find",
        "1200 ./django/__init__.py \n80 ./sqlparse/__init__.py \n",
    )
}

#[tokio::test]
async fn container_result_has_source_project_and_system() {
    let orchestrator = Orchestrator::new(OrchestratorOptions::default()).unwrap();
    let channel = debian_container();
    let result = orchestrator.resolve(&channel, Some("/app")).await.unwrap();

    let source = result.source.as_ref().unwrap();
    assert_eq!(source.kind, SourceKind::Container);
    assert_eq!(source.image.as_deref(), Some("registry.example.com/team/api:1.4"));

    let system = result.system.as_ref().unwrap();
    assert!(system.package_management["dpkg"].hash.is_none());
    assert_eq!(system.package_management["dpkg"].location, "system");
    assert!(system.packages.iter().all(|p| p.version.ends_with(" amd64")));

    let project = result.project.as_ref().unwrap();
    let pip = &project.package_management["pip"];
    assert_eq!(pip.location, "/app/.venv/lib/python3.12/site-packages");
    assert_eq!(pip.hash.as_deref().map(str::len), Some(64));
    assert_eq!(project.count_of(Ecosystem::Pip), 2);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["source"]["type"], "container");
    assert_eq!(json["project"]["packages"][0]["type"], "pip");
    assert!(json["system"]["package-management"]["dpkg"].get("hash").is_none());
}

#[tokio::test]
async fn failing_tool_does_not_affect_siblings() {
    let channel = debian_container_with(CommandOutput {
        stdout: String::new(),
        stderr: "dpkg-query: error: database locked".to_owned(),
        exit_code: 2,
    });
    let orchestrator = Orchestrator::new(OrchestratorOptions::default()).unwrap();
    let result = orchestrator.resolve(&channel, Some("/app")).await.unwrap();

    assert!(result.system.is_none(), "failed detector contributes nothing");
    assert!(result.source.is_some());
    let project = result.project.unwrap();
    assert_eq!(project.packages.len(), 2);
    assert!(project.package_management.contains_key("pip"));
    assert!(!project.package_management.contains_key("dpkg"));
}

#[tokio::test]
async fn skip_system_scope_drops_system_section() {
    let options = OrchestratorOptions {
        skip_system_scope: true,
        ..OrchestratorOptions::default()
    };
    let orchestrator = Orchestrator::new(options).unwrap();
    let channel = debian_container();
    let result = orchestrator.resolve(&channel, Some("/app")).await.unwrap();

    assert!(result.system.is_none());
    assert!(result.project.is_some());
    // 사용 가능 여부는 확인되지만 목록은 실행되지 않음
    assert_eq!(channel.call_count("dpkg-query --version"), 1);
    assert_eq!(channel.call_count("dpkg-query -W"), 0);
}

#[tokio::test]
async fn resolution_is_idempotent() {
    let orchestrator = Orchestrator::new(OrchestratorOptions::default()).unwrap();
    let channel = debian_container();
    let first = orchestrator.resolve(&channel, Some("/app")).await.unwrap();
    let second = orchestrator.resolve(&channel, Some("/app")).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn explicit_venv_overrides_conventional_dir() {
    let channel = debian_container()
        .with_output("realpath '/opt/custom'", "/opt/custom")
        .with_paths(&["/opt/custom/pyvenv.cfg", "/opt/custom/bin/pip"])
        .with_output("'/opt/custom/bin/pip' --version", "pip 24.0")
        .with_output("'/opt/custom/bin/pip' list --format=freeze", "numpy==1.26.3\n")
        .with_output(
            "'/opt/custom/bin/python' -c 'import site; print(site.getsitepackages()[0])'",
            "/opt/custom/lib/python3.12/site-packages",
        );
    let options = OrchestratorOptions {
        venv_path: Some("/opt/custom".to_owned()),
        skip_hash_collection: true,
        ..OrchestratorOptions::default()
    };
    let orchestrator = Orchestrator::new(options).unwrap();
    let result = orchestrator.resolve(&channel, Some("/app")).await.unwrap();

    let project = result.project.unwrap();
    assert_eq!(
        project.package_management["pip"].location,
        "/opt/custom/lib/python3.12/site-packages"
    );
    assert!(project.package_management["pip"].hash.is_none());
    assert_eq!(project.packages[0].name, "numpy");
}

#[tokio::test]
async fn only_container_info_skips_package_detectors() {
    let options = OrchestratorOptions {
        only_container_info: true,
        ..OrchestratorOptions::default()
    };
    let orchestrator = Orchestrator::new(options).unwrap();
    let channel = debian_container();
    let result = orchestrator.resolve(&channel, None).await.unwrap();
    assert!(result.source.is_some());
    assert!(result.project.is_none() && result.system.is_none());
    assert!(channel.calls().is_empty());
}

#[tokio::test]
async fn selected_detectors_restrict_the_run() {
    let options = OrchestratorOptions {
        selected_detectors: vec!["pip".to_owned()],
        ..OrchestratorOptions::default()
    };
    let orchestrator = Orchestrator::new(options).unwrap();
    let channel = debian_container();
    let result = orchestrator.resolve(&channel, Some("/app")).await.unwrap();
    assert!(result.source.is_none());
    assert!(result.system.is_none());
    assert_eq!(result.project.unwrap().packages.len(), 2);
    assert_eq!(channel.call_count("dpkg"), 0);
}

/// 추출이 항상 실패하는 탐지기
struct BrokenDetector;

impl Detector for BrokenDetector {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn is_usable(
        &self,
        _channel: &dyn CommandChannel,
        _ctx: &DetectContext,
    ) -> Result<bool, DetectorError> {
        Ok(true)
    }

    async fn scope(
        &self,
        _channel: &dyn CommandChannel,
        _ctx: &DetectContext,
    ) -> Result<Scope, DetectorError> {
        Ok(Scope::Project)
    }

    async fn extract(
        &self,
        _channel: &dyn CommandChannel,
        _ctx: &DetectContext,
    ) -> Result<Detection, DetectorError> {
        Err(DetectorError::Parse {
            what: "broken output".to_owned(),
            reason: "always fails".to_owned(),
        })
    }
}

/// 시스템 범위라고 보고하면서 해시를 붙이는 탐지기
struct HashingSystemDetector;

impl Detector for HashingSystemDetector {
    fn name(&self) -> &'static str {
        "hashing-system"
    }

    async fn is_usable(
        &self,
        _channel: &dyn CommandChannel,
        _ctx: &DetectContext,
    ) -> Result<bool, DetectorError> {
        Ok(true)
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
        _channel: &dyn CommandChannel,
        _ctx: &DetectContext,
    ) -> Result<Detection, DetectorError> {
        let mut location = depprobe_core::LocationMetadata::system();
        location.hash = Some("0".repeat(64));
        Ok(Detection::Packages(PackageSet {
            scope: Scope::System,
            location,
            packages: vec![depprobe_core::Package::new("zlib", "1.3", Ecosystem::Apk)],
        }))
    }
}

#[tokio::test]
async fn custom_registry_isolates_errors_and_strips_system_hashes() {
    let orchestrator = Orchestrator::with_registry(
        || {
            let mut detectors = default_detectors();
            detectors.insert(0, Box::new(BrokenDetector));
            detectors.push(Box::new(HashingSystemDetector));
            detectors
        },
        OrchestratorOptions::default(),
    )
    .unwrap();
    assert_eq!(orchestrator.detector_names()[0], "broken");

    let channel = ScriptedChannel::host().with_output("uname -n", "box");
    let result = orchestrator.resolve(&channel, None).await.unwrap();

    assert!(result.project.is_none());
    let system = result.system.unwrap();
    assert!(system.package_management["hashing-system"].hash.is_none());
    assert_eq!(system.packages[0].name, "zlib");
}

#[tokio::test]
async fn installing_a_package_grows_the_system_listing() {
    let orchestrator = Orchestrator::new(OrchestratorOptions::default()).unwrap();

    let before = debian_container_with(CommandOutput::success("base-files\t12.4+deb12u5\tamd64\n"));
    let before = orchestrator.resolve(&before, Some("/app")).await.unwrap();
    let before = before.system.unwrap();
    assert!(before.packages.iter().any(|p| p.name == "base-files"));

    let after = debian_container_with(CommandOutput::success(
        "base-files\t12.4+deb12u5\tamd64\n\
         ca-certificates\t20230311\tall\n\
         curl\t7.88.1-10+deb12u5\tamd64\n\
         libcurl4\t7.88.1-10+deb12u5\tamd64\n",
    ));
    let after = orchestrator.resolve(&after, Some("/app")).await.unwrap();
    let after = after.system.unwrap();

    assert!(after.packages.len() > before.packages.len());
    assert!(after.packages.iter().any(|p| p.name.contains("curl")));
    for package in &after.packages {
        let arch = package.version.rsplit_once(' ').map(|(_, arch)| arch);
        assert!(
            matches!(arch, Some("amd64" | "all")),
            "{} has no architecture in {:?}",
            package.name,
            package.version
        );
    }
}

#[tokio::test]
async fn empty_project_without_venv_reports_bare_pip_location() {
    let channel = ScriptedChannel::host()
        .with_output("uname -n", "build-box")
        .with_paths(&["/srv/empty"])
        .with_output("cd '/srv/empty' && pwd -P", "/srv/empty\n")
        .with_output("python3 --version", "Python 3.12.1");
    let orchestrator = Orchestrator::new(OrchestratorOptions::default()).unwrap();

    let result = orchestrator.resolve(&channel, Some("/srv/empty")).await.unwrap();

    let project = result.project.as_ref().expect("project section present");
    assert_eq!(project.count_of(Ecosystem::Pip), 0);
    assert_eq!(
        project.package_management["pip"],
        depprobe_core::LocationMetadata::at("/srv/empty")
    );

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(
        json["project"]["package-management"]["pip"],
        serde_json::json!({"location": "/srv/empty"})
    );
}
