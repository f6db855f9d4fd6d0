//! Node.js 패키지 탐지기
//!
//! 프로젝트가 npm을 쓰는지 판정할 때 경쟁 도구의 lock 파일(`yarn.lock`,
//! `pnpm-lock.yaml`, `bun.lockb`)이 있으면 사용하지 않습니다. 다른 관리자의
//! 프로젝트를 npm으로 잘못 보고하지 않기 위함입니다.
//!
//! 최상위 의존성만 `npm list --json --depth=0`으로 나열합니다. npm은 누락되거나
//! 불필요한 의존성이 있으면 0이 아닌 코드로 끝나지만 JSON은 그대로 출력하므로
//! 종료 코드와 관계없이 stdout을 파싱합니다.

use depprobe_core::{CommandChannel, Ecosystem, LocationMetadata, Package, Scope};
use serde::Deserialize;
use std::collections::BTreeMap;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::{
    DetectContext, Detection, Detector, PackageSet, absolute_dir, join_path, project_location,
    tool_available,
};
use crate::error::DetectorError;
use crate::hashing::NPM_PROFILE;

pub const NAME: &str = "npm";

/// 있으면 npm 프로젝트가 아닌 lock 파일
const COMPETING_LOCKFILES: &[&str] = &["yarn.lock", "pnpm-lock.yaml", "bun.lockb"];

#[derive(Debug, Deserialize)]
struct NpmList {
    #[serde(default)]
    dependencies: BTreeMap<String, NpmDependency>,
}

#[derive(Debug, Deserialize)]
struct NpmDependency {
    version: Option<String>,
}

/// npm 탐지기
#[derive(Debug, Default)]
pub struct NpmDetector {
    project_dir: OnceCell<Option<String>>,
}

impl NpmDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// `package.json` 또는 `node_modules`가 있는 프로젝트 디렉토리의 절대 경로
    async fn project_dir(&self, channel: &dyn CommandChannel, ctx: &DetectContext) -> Option<&str> {
        self.project_dir
            .get_or_init(|| async {
                let dir = search_dir(ctx);
                let is_project = channel.path_exists(&join_path(dir, "package.json")).await
                    || channel.path_exists(&join_path(dir, "node_modules")).await;
                if !is_project {
                    return None;
                }
                Some(
                    absolute_dir(channel, dir)
                        .await
                        .unwrap_or_else(|| dir.to_owned()),
                )
            })
            .await
            .as_deref()
    }
}

fn search_dir(ctx: &DetectContext) -> &str {
    ctx.working_dir.as_deref().unwrap_or(".")
}

impl Detector for NpmDetector {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn is_usable(
        &self,
        channel: &dyn CommandChannel,
        ctx: &DetectContext,
    ) -> Result<bool, DetectorError> {
        if !tool_available(channel, "npm --version").await {
            return Ok(false);
        }

        let dir = search_dir(ctx);
        if channel.path_exists(&join_path(dir, "package.json")).await {
            for lockfile in COMPETING_LOCKFILES {
                if channel.path_exists(&join_path(dir, lockfile)).await {
                    debug!(lockfile, "project managed by another node package manager");
                    return Ok(false);
                }
            }
            return Ok(true);
        }
        Ok(channel
            .path_exists(&join_path(dir, "package-lock.json"))
            .await)
    }

    async fn scope(
        &self,
        channel: &dyn CommandChannel,
        ctx: &DetectContext,
    ) -> Result<Scope, DetectorError> {
        match self.project_dir(channel, ctx).await {
            Some(_) => Ok(Scope::Project),
            None => Ok(Scope::System),
        }
    }

    async fn extract(
        &self,
        channel: &dyn CommandChannel,
        ctx: &DetectContext,
    ) -> Result<Detection, DetectorError> {
        let project_dir = self.project_dir(channel, ctx).await.map(str::to_owned);

        let command = match project_dir {
            Some(_) => "npm list --json --depth=0",
            None => "npm list -g --json --depth=0",
        };
        let output = channel.execute(command, ctx.working_dir.as_deref()).await;
        if !output.is_success() {
            debug!(
                exit_code = output.exit_code,
                "npm list reported problems, parsing output anyway"
            );
        }
        let packages = parse_npm_list(&output.stdout).unwrap_or_else(|e| {
            warn!(error = %e, "unexpected npm list output, reporting no packages");
            Vec::new()
        });

        let set = match project_dir {
            Some(dir) => PackageSet {
                scope: Scope::Project,
                location: project_location(channel, &dir, !packages.is_empty(), &NPM_PROFILE, ctx)
                    .await,
                packages,
            },
            None => PackageSet {
                scope: Scope::System,
                location: LocationMetadata::system(),
                packages,
            },
        };
        Ok(Detection::Packages(set))
    }
}

/// `npm list --json` 출력의 최상위 의존성. 버전이 없는 항목(미설치)은 건너뜁니다.
fn parse_npm_list(stdout: &str) -> Result<Vec<Package>, DetectorError> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    let list: NpmList = serde_json::from_str(stdout).map_err(|e| DetectorError::Parse {
        what: "npm list output".to_owned(),
        reason: e.to_string(),
    })?;
    Ok(list
        .dependencies
        .into_iter()
        .filter_map(|(name, dep)| dep.version.map(|v| Package::new(name, v, Ecosystem::Npm)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use depprobe_core::CommandOutput;
    use depprobe_core::testing::ScriptedChannel;

    const NPM_LIST: &str = r#"{
        "name": "web",
        "version": "1.0.0",
        "dependencies": {
            "express": {"version": "4.18.2", "resolved": "https://registry.npmjs.org/express/-/express-4.18.2.tgz"},
            "lodash": {"version": "4.17.21"},
            "left-pad": {"required": "^1.3.0", "missing": true}
        }
    }"#;

    fn project_ctx() -> DetectContext {
        DetectContext {
            working_dir: Some("/srv/web".to_owned()),
            ..DetectContext::default()
        }
    }

    fn npm_channel() -> ScriptedChannel {
        ScriptedChannel::host().with_output("npm --version", "10.2.4")
    }

    #[tokio::test]
    async fn usable_with_package_json() {
        let channel = npm_channel().with_path("/srv/web/package.json");
        assert!(NpmDetector::new().is_usable(&channel, &project_ctx()).await.unwrap());
    }

    #[tokio::test]
    async fn competing_lockfile_excludes_project() {
        for lockfile in COMPETING_LOCKFILES {
            let channel = npm_channel()
                .with_path("/srv/web/package.json")
                .with_path(&format!("/srv/web/{lockfile}"));
            assert!(
                !NpmDetector::new().is_usable(&channel, &project_ctx()).await.unwrap(),
                "{lockfile} should exclude npm"
            );
        }
    }

    #[tokio::test]
    async fn package_lock_alone_is_enough() {
        let channel = npm_channel().with_path("/srv/web/package-lock.json");
        assert!(NpmDetector::new().is_usable(&channel, &project_ctx()).await.unwrap());
    }

    #[tokio::test]
    async fn missing_npm_short_circuits() {
        let channel = ScriptedChannel::host().with_path("/srv/web/package.json");
        assert!(!NpmDetector::new().is_usable(&channel, &project_ctx()).await.unwrap());
        assert!(channel.calls().iter().all(|c| c == "npm --version"));
    }

    #[tokio::test]
    async fn extract_project_parses_even_on_nonzero_exit() {
        let channel = npm_channel()
            .with_paths(&["/srv/web/package.json", "/srv/web/node_modules"])
            .with_output("cd '/srv/web' && pwd -P", "/srv/web\n")
            .with_result(
                "npm list --json --depth=0",
                CommandOutput {
                    stdout: NPM_LIST.to_owned(),
                    stderr: "npm ERR! missing: left-pad@^1.3.0".to_owned(),
                    exit_code: 1,
                },
            )
            .with_prefix_output("cd '/srv/web' && find", "42 ./package.json \n");
        let detector = NpmDetector::new();
        let ctx = project_ctx();
        assert_eq!(detector.scope(&channel, &ctx).await.unwrap(), Scope::Project);

        let Detection::Packages(set) = detector.extract(&channel, &ctx).await.unwrap() else {
            panic!("expected packages");
        };
        let names: Vec<_> = set.packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["express", "lodash"]);
        assert_eq!(set.location.location, "/srv/web");
        assert_eq!(set.location.hash.as_deref().map(str::len), Some(64));
    }

    #[tokio::test]
    async fn without_project_files_scope_is_system() {
        let channel = npm_channel().with_output(
            "npm list -g --json --depth=0",
            r#"{"dependencies": {"npm": {"version": "10.2.4"}}}"#,
        );
        let detector = NpmDetector::new();
        let ctx = DetectContext::default();
        assert_eq!(detector.scope(&channel, &ctx).await.unwrap(), Scope::System);

        let Detection::Packages(set) = detector.extract(&channel, &ctx).await.unwrap() else {
            panic!("expected packages");
        };
        assert!(set.location.is_system());
        assert!(set.location.hash.is_none());
        assert_eq!(set.packages.len(), 1);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = parse_npm_list("npm ERR! code ELSPROBLEMS").unwrap_err();
        assert!(matches!(err, DetectorError::Parse { .. }));
        assert!(parse_npm_list("").unwrap().is_empty());
        assert!(parse_npm_list("{}").unwrap().is_empty());
    }
}
