//! JVM 아카이브 탐지기 (`java-runtime`)
//!
//! 검색 디렉토리(작업 디렉토리 또는 `.`) 아래의 `.jar` 파일을 패키지로 보고합니다.
//! 버전은 `META-INF/MANIFEST.MF`에서 읽고, 매니페스트가 없으면 파일 이름 패턴,
//! 그래도 없으면 `unknown`을 사용합니다.
//!
//! 아카이브 유무와 관계없이 `java`가 설치되어 있으면 런타임 정보
//! (버전, 벤더, 런타임 이름)를 위치 메타데이터의 `runtime`에 기록합니다.
//! 범위는 항상 project입니다.

use std::sync::LazyLock;

use depprobe_core::{
    CommandChannel, CommandOutput, Ecosystem, Package, RuntimeInfo, Scope, shell_quote,
};
use regex::Regex;
use tokio::sync::OnceCell;
use tracing::debug;

use super::{DetectContext, Detection, Detector, PackageSet, absolute_dir, project_location};
use crate::error::DetectorError;
use crate::hashing::JAR_PROFILE;

pub const NAME: &str = "java-runtime";

const JAVA_VERSION_COMMAND: &str = "java -version";

/// 매니페스트 버전 키 (우선순위 순)
const MANIFEST_VERSION_KEYS: &[&str] = &[
    "Implementation-Version",
    "Bundle-Version",
    "Version",
    "Specification-Version",
];

/// 파일 이름 버전 패턴 (우선순위 순, 두 번째 그룹이 버전)
static FILENAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^(.+)[-_](\d+(?:\.\d+)*(?:-[A-Za-z0-9]+)?)$",
        r"^(.+)[-_]v(\d+(?:\.\d+)*)$",
        r"^(.+?)(\d+(?:\.\d+)*(?:-[A-Za-z0-9]+)?)$",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static VERSION_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"version "([^"]+)""#).ok());
static RUNTIME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(.+?Runtime Environment)").ok());
/// 배포판 토큰의 알파벳 접두사 (`Temurin-17.0.9+9`, `Zulu17.46+19-CA`)
static VENDOR_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"Runtime Environment ([A-Za-z]+)").ok());

/// JVM 아카이브 탐지기
#[derive(Debug, Default)]
pub struct JavaRuntimeDetector {
    jars: OnceCell<Vec<String>>,
    java_version: OnceCell<Option<String>>,
}

impl JavaRuntimeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 검색 디렉토리 아래의 JAR 경로 (정렬, 캐시)
    async fn jars(&self, channel: &dyn CommandChannel, search_dir: &str) -> &[String] {
        self.jars
            .get_or_init(|| async {
                let command = format!("find {} -name '*.jar' -type f", shell_quote(search_dir));
                let output = channel.execute(&command, None).await;
                // 읽을 수 없는 하위 디렉토리가 있어도 find는 찾은 경로를 출력함
                if !output.is_success() {
                    debug!(
                        search_dir,
                        exit_code = output.exit_code,
                        stderr = %output.stderr.trim(),
                        "jar discovery incomplete"
                    );
                }
                let mut jars: Vec<String> = output
                    .stdout
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_owned)
                    .collect();
                jars.sort();
                jars
            })
            .await
    }

    /// `java -version` 출력. java가 없으면 `None` (캐시)
    async fn java_version_output(&self, channel: &dyn CommandChannel) -> Option<&str> {
        self.java_version
            .get_or_init(|| async {
                let output = channel.execute(JAVA_VERSION_COMMAND, None).await;
                version_text(&output)
            })
            .await
            .as_deref()
    }
}

fn search_dir(ctx: &DetectContext) -> &str {
    ctx.working_dir.as_deref().unwrap_or(".")
}

/// java는 버전 정보를 stderr로 출력합니다. stderr가 비어 있으면 stdout
fn version_text(output: &CommandOutput) -> Option<String> {
    if !output.is_success() {
        return None;
    }
    let text = if output.stderr.trim().is_empty() {
        &output.stdout
    } else {
        &output.stderr
    };
    Some(text.clone())
}

impl Detector for JavaRuntimeDetector {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn is_usable(
        &self,
        channel: &dyn CommandChannel,
        ctx: &DetectContext,
    ) -> Result<bool, DetectorError> {
        if !self.jars(channel, search_dir(ctx)).await.is_empty() {
            return Ok(true);
        }
        Ok(self.java_version_output(channel).await.is_some())
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
        channel: &dyn CommandChannel,
        ctx: &DetectContext,
    ) -> Result<Detection, DetectorError> {
        let dir = search_dir(ctx);
        let location = absolute_dir(channel, dir)
            .await
            .ok_or_else(|| DetectorError::CommandFailed {
                command: format!("cd {} && pwd -P", shell_quote(dir)),
                reason: "could not resolve search directory".to_owned(),
            })?;

        let jars = self.jars(channel, dir).await;
        let mut packages = Vec::with_capacity(jars.len());
        for jar in jars {
            let version = match manifest_version(channel, jar).await {
                Some(v) => v,
                None => filename_version(jar).unwrap_or_else(|| "unknown".to_owned()),
            };
            packages.push(Package::new(relative_name(jar, dir), version, Ecosystem::Jar));
        }
        packages.sort_by(|a, b| a.name.cmp(&b.name));

        let mut metadata =
            project_location(channel, &location, !packages.is_empty(), &JAR_PROFILE, ctx).await;
        metadata.runtime = self
            .java_version_output(channel)
            .await
            .and_then(parse_runtime_info);

        Ok(Detection::Packages(PackageSet {
            scope: Scope::Project,
            location: metadata,
            packages,
        }))
    }
}

async fn manifest_version(channel: &dyn CommandChannel, jar: &str) -> Option<String> {
    let command = format!("unzip -p {} META-INF/MANIFEST.MF", shell_quote(jar));
    let output = channel.execute(&command, None).await;
    if !output.is_success() {
        return None;
    }
    parse_manifest_version(&output.stdout)
}

/// 매니페스트에서 우선순위가 가장 높은 버전 키의 값
fn parse_manifest_version(manifest: &str) -> Option<String> {
    MANIFEST_VERSION_KEYS.iter().find_map(|key| {
        manifest.lines().find_map(|line| {
            let value = line.trim().strip_prefix(key)?.strip_prefix(':')?.trim();
            (!value.is_empty() && value != "null").then(|| value.to_owned())
        })
    })
}

/// `name-1.2.3.jar`, `name_v1.2.jar`, `name1.2.jar` 형식에서 버전 추출
fn filename_version(jar_path: &str) -> Option<String> {
    let file = jar_path.rsplit('/').next().unwrap_or(jar_path);
    let base = file.strip_suffix(".jar").unwrap_or(file);
    FILENAME_PATTERNS
        .iter()
        .find_map(|re| re.captures(base))
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().to_owned())
}

/// 검색 디렉토리 기준 상대 경로
fn relative_name(jar_path: &str, search_dir: &str) -> String {
    let prefix = format!("{}/", search_dir.trim_end_matches('/'));
    let relative = jar_path.strip_prefix(&prefix).unwrap_or(jar_path);
    relative.strip_prefix("./").unwrap_or(relative).to_owned()
}

fn capture_group(pattern: &Option<Regex>, text: &str) -> Option<String> {
    pattern
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_owned())
}

fn parse_runtime_info(version_output: &str) -> Option<RuntimeInfo> {
    let mut info = RuntimeInfo {
        platform: "java".to_owned(),
        version: capture_group(&VERSION_PATTERN, version_output),
        vendor: None,
        runtime: None,
    };
    for line in version_output.lines().map(str::trim) {
        if line.contains("Runtime Environment") {
            info.runtime = capture_group(&RUNTIME_PATTERN, line);
            info.vendor = capture_group(&VENDOR_PATTERN, line);
        }
    }

    if info.version.is_none() && info.runtime.is_none() && info.vendor.is_none() {
        None
    } else {
        Some(info)
    }
}
