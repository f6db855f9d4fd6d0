//! Resolution requests and results.
//!
//! A [`ResolveRequest`] is an immutable value describing one target and its
//! options. A [`ResolveResult`] pairs it with either an aggregated result or
//! an error string, plus the time the request took.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use depprobe_core::{AggregatedResult, TargetError};
use serde::{Deserialize, Serialize};

/// Which target a request resolves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetSpec {
    /// The machine depprobe runs on.
    #[default]
    Host,
    /// One container, by ID or name.
    Container(String),
    /// Every running container of a compose project.
    ComposeStack(String),
}

impl TargetSpec {
    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Container(id) => write!(f, "container:{id}"),
            Self::ComposeStack(stack) => write!(f, "compose:{stack}"),
        }
    }
}

impl FromStr for TargetSpec {
    type Err = TargetError;

    /// Accepts `host`, `container:<id>`, `docker:<id>` and `compose:<stack>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "host" {
            return Ok(Self::Host);
        }

        let (kind, name) = s.split_once(':').ok_or_else(|| TargetError::InvalidIdentifier {
            identifier: s.to_owned(),
            reason: "expected host, container:<id>, docker:<id> or compose:<stack>".to_owned(),
        })?;
        if name.is_empty() {
            return Err(TargetError::InvalidIdentifier {
                identifier: s.to_owned(),
                reason: format!("missing name after '{kind}:'"),
            });
        }

        match kind {
            "container" | "docker" => Ok(Self::Container(name.to_owned())),
            "compose" => Ok(Self::ComposeStack(name.to_owned())),
            other => Err(TargetError::InvalidIdentifier {
                identifier: s.to_owned(),
                reason: format!("unknown target kind '{other}'"),
            }),
        }
    }
}

impl TryFrom<String> for TargetSpec {
    type Error = TargetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TargetSpec> for String {
    fn from(target: TargetSpec) -> Self {
        target.to_string()
    }
}

/// One resolution request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub target: TargetSpec,
    /// Project directory on the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    /// Explicit Python virtual environment, overriding discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venv_path: Option<String>,
    /// Run only the identity detectors.
    #[serde(default)]
    pub only_container_info: bool,
    /// Key for this request in map-shaped batch output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ResolveRequest {
    pub fn new(target: TargetSpec) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn host() -> Self {
        Self::new(TargetSpec::Host)
    }

    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_venv_path(mut self, path: impl Into<String>) -> Self {
        self.venv_path = Some(path.into());
        self
    }

    pub fn with_only_container_info(mut self, only: bool) -> Self {
        self.only_container_info = only;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Outcome of one request.
#[derive(Debug, Clone)]
pub struct ResolveResult {
    pub request: ResolveRequest,
    /// Populated when resolution succeeded.
    pub result: Option<AggregatedResult>,
    /// Populated when resolution failed.
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl ResolveResult {
    pub fn succeeded(request: ResolveRequest, result: AggregatedResult, elapsed: Duration) -> Self {
        Self {
            request,
            result: Some(result),
            error: None,
            elapsed,
        }
    }

    pub fn failed(request: ResolveRequest, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            request,
            result: None,
            error: Some(error.into()),
            elapsed,
        }
    }

    /// True iff no error was recorded.
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_spec_parses_all_forms() {
        assert_eq!("host".parse::<TargetSpec>().unwrap(), TargetSpec::Host);
        assert_eq!(
            "container:web".parse::<TargetSpec>().unwrap(),
            TargetSpec::Container("web".to_owned())
        );
        assert_eq!(
            "docker:abc123".parse::<TargetSpec>().unwrap(),
            TargetSpec::Container("abc123".to_owned())
        );
        assert_eq!(
            "compose:shop".parse::<TargetSpec>().unwrap(),
            TargetSpec::ComposeStack("shop".to_owned())
        );
    }

    #[test]
    fn target_spec_rejects_malformed_input() {
        for input in ["web", "container:", "vm:abc"] {
            let err = input.parse::<TargetSpec>().unwrap_err();
            assert!(
                matches!(err, TargetError::InvalidIdentifier { .. }),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn target_spec_display_is_canonical() {
        let target: TargetSpec = "docker:web".parse().unwrap();
        assert_eq!(target.to_string(), "container:web");
        assert_eq!(TargetSpec::ComposeStack("shop".to_owned()).to_string(), "compose:shop");
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let request: ResolveRequest =
            serde_json::from_str(r#"{"target": "container:api", "working_dir": "/app"}"#).unwrap();
        assert_eq!(request.target, TargetSpec::Container("api".to_owned()));
        assert_eq!(request.working_dir.as_deref(), Some("/app"));
        assert!(!request.only_container_info);
        assert!(request.label.is_none());

        let request: ResolveRequest = serde_json::from_str("{}").unwrap();
        assert!(request.target.is_host());
    }

    #[test]
    fn request_with_bad_target_fails_to_deserialize() {
        let parsed = serde_json::from_str::<ResolveRequest>(r#"{"target": "nope"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn builders_set_fields() {
        let request = ResolveRequest::host()
            .with_working_dir("/srv/app")
            .with_venv_path("/srv/app/.venv")
            .with_only_container_info(true)
            .with_label("srv");
        assert_eq!(request.working_dir.as_deref(), Some("/srv/app"));
        assert_eq!(request.venv_path.as_deref(), Some("/srv/app/.venv"));
        assert!(request.only_container_info);
        assert_eq!(request.label.as_deref(), Some("srv"));
    }

    #[test]
    fn result_success_tracks_error() {
        let ok = ResolveResult::succeeded(
            ResolveRequest::host(),
            AggregatedResult::default(),
            Duration::from_millis(5),
        );
        assert!(ok.success());

        let failed = ResolveResult::failed(
            ResolveRequest::host(),
            "Container 'ghost' not found",
            Duration::ZERO,
        );
        assert!(!failed.success());
        assert!(failed.result.is_none());
    }
}
