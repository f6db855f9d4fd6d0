//! 테스트용 스크립트 채널
//!
//! 실제 호스트나 컨테이너 없이 탐지기와 오케스트레이터를 검증하기 위한
//! [`CommandChannel`] 구현입니다. `testing` feature로만 노출됩니다.
//!
//! ```
//! use depprobe_core::testing::ScriptedChannel;
//!
//! let channel = ScriptedChannel::host()
//!     .with_output("dpkg-query --version", "Debian dpkg-query 1.21")
//!     .with_path("/etc/debian_version");
//! ```

use std::collections::HashSet;
use std::sync::Mutex;

use crate::channel::{BoxFuture, CommandChannel, CommandOutput, TargetIdentity};

/// 규칙 기반 가짜 채널
///
/// 명령은 등록 순서대로 정확히 일치하는 규칙을 먼저, 그다음 접두사 규칙을 찾습니다.
/// 어느 규칙에도 맞지 않으면 종료 코드 127을 돌려줍니다.
pub struct ScriptedChannel {
    identity: TargetIdentity,
    exact: Vec<(String, CommandOutput)>,
    prefix: Vec<(String, CommandOutput)>,
    paths: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedChannel {
    /// 주어진 대상 식별 정보로 빈 채널을 생성합니다.
    pub fn new(identity: TargetIdentity) -> Self {
        Self {
            identity,
            exact: Vec::new(),
            prefix: Vec::new(),
            paths: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 호스트 대상 채널
    pub fn host() -> Self {
        Self::new(TargetIdentity::Host)
    }

    /// 명령이 정확히 일치하면 성공 stdout을 돌려줍니다.
    pub fn with_output(self, command: &str, stdout: &str) -> Self {
        self.with_result(command, CommandOutput::success(stdout))
    }

    /// 명령이 정확히 일치하면 주어진 결과를 돌려줍니다.
    pub fn with_result(mut self, command: &str, output: CommandOutput) -> Self {
        self.exact.push((command.to_owned(), output));
        self
    }

    /// 명령이 접두사로 시작하면 성공 stdout을 돌려줍니다.
    pub fn with_prefix_output(self, prefix: &str, stdout: &str) -> Self {
        self.with_prefix_result(prefix, CommandOutput::success(stdout))
    }

    /// 명령이 접두사로 시작하면 주어진 결과를 돌려줍니다.
    pub fn with_prefix_result(mut self, prefix: &str, output: CommandOutput) -> Self {
        self.prefix.push((prefix.to_owned(), output));
        self
    }

    /// `path_exists`가 참을 돌려줄 경로를 추가합니다.
    pub fn with_path(mut self, path: &str) -> Self {
        self.paths.insert(path.to_owned());
        self
    }

    /// 여러 경로를 한 번에 추가합니다.
    pub fn with_paths(mut self, paths: &[&str]) -> Self {
        self.paths.extend(paths.iter().map(|p| (*p).to_owned()));
        self
    }

    /// 지금까지 실행된 명령 목록
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// 주어진 문자열을 포함하는 명령이 실행된 횟수
    pub fn call_count(&self, needle: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(needle)).count()
    }

    fn lookup(&self, command: &str) -> CommandOutput {
        if let Some((_, out)) = self.exact.iter().find(|(c, _)| c == command) {
            return out.clone();
        }
        if let Some((_, out)) = self
            .prefix
            .iter()
            .find(|(p, _)| command.starts_with(p.as_str()))
        {
            return out.clone();
        }
        CommandOutput {
            stdout: String::new(),
            stderr: format!("sh: {command}: not found"),
            exit_code: 127,
        }
    }
}

impl CommandChannel for ScriptedChannel {
    fn identity(&self) -> &TargetIdentity {
        &self.identity
    }

    fn execute<'a>(
        &'a self,
        command: &'a str,
        _working_dir: Option<&'a str>,
    ) -> BoxFuture<'a, CommandOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command.to_owned());
        }
        let output = self.lookup(command);
        Box::pin(async move { output })
    }

    fn path_exists<'a>(&'a self, path: &'a str) -> BoxFuture<'a, bool> {
        let exists = self.paths.contains(path);
        Box::pin(async move { exists })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exact_rule_wins_over_prefix() {
        let channel = ScriptedChannel::host()
            .with_prefix_output("pip", "prefix")
            .with_output("pip --version", "exact");
        let out = channel.execute("pip --version", None).await;
        assert_eq!(out.stdout, "exact");
        let out = channel.execute("pip list", None).await;
        assert_eq!(out.stdout, "prefix");
    }

    #[tokio::test]
    async fn unmatched_command_reports_not_found() {
        let channel = ScriptedChannel::host();
        let out = channel.execute("npm --version", None).await;
        assert_eq!(out.exit_code, 127);
        assert!(out.stderr.contains("not found"));
    }

    #[tokio::test]
    async fn records_calls_and_paths() {
        let channel = ScriptedChannel::host().with_paths(&["/app", "/app/venv"]);
        assert!(channel.path_exists("/app").await);
        assert!(!channel.path_exists("/srv").await);
        channel.execute("uname -n", None).await;
        channel.execute("uname -sr", None).await;
        assert_eq!(channel.call_count("uname"), 2);
    }
}
