//! 탐지기 에러 타입
//!
//! [`DetectorError`]는 탐지기 하나의 실패를 표현합니다.
//! 오케스트레이터가 탐지기 단위로 잡아 `warn!`으로 기록하고 해당 탐지기만 결과에서
//! 제외하므로, 이 에러는 크레이트 밖으로 전파되지 않습니다.

/// 탐지기 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    /// 필수 명령 실행 실패
    #[error("command '{command}' failed: {reason}")]
    CommandFailed {
        /// 실행한 명령
        command: String,
        /// 실패 사유 (stderr 또는 종료 코드)
        reason: String,
    },

    /// 도구 출력 해석 실패
    #[error("failed to parse {what}: {reason}")]
    Parse {
        /// 해석 대상 (예: "npm list output")
        what: String,
        /// 실패 사유
        reason: String,
    },

    /// 이 대상에서 실행할 수 없는 탐지기
    #[error("detector '{detector}' does not apply to target {target}")]
    NotApplicable {
        /// 탐지기 이름
        detector: String,
        /// 대상 표시 문자열
        target: String,
    },
}

impl DetectorError {
    /// 명령 결과로부터 `CommandFailed`를 만듭니다.
    pub fn command_failed(command: &str, output: &depprobe_core::CommandOutput) -> Self {
        let stderr = output.stderr.trim();
        let reason = if stderr.is_empty() {
            format!("exit code {}", output.exit_code)
        } else {
            format!("exit code {}: {stderr}", output.exit_code)
        };
        Self::CommandFailed {
            command: command.to_owned(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depprobe_core::CommandOutput;

    #[test]
    fn command_failed_includes_stderr() {
        let out = CommandOutput {
            stdout: String::new(),
            stderr: "E: not found\n".to_owned(),
            exit_code: 2,
        };
        let err = DetectorError::command_failed("dpkg-query -W", &out);
        assert_eq!(
            err.to_string(),
            "command 'dpkg-query -W' failed: exit code 2: E: not found"
        );
    }

    #[test]
    fn command_failed_without_stderr_reports_exit_code() {
        let out = CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 127,
        };
        let err = DetectorError::command_failed("npm --version", &out);
        assert!(err.to_string().ends_with("exit code 127"));
    }

    #[test]
    fn not_applicable_display() {
        let err = DetectorError::NotApplicable {
            detector: "docker-info".to_owned(),
            target: "host".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "detector 'docker-info' does not apply to target host"
        );
    }
}
