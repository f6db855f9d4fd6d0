//! Python 가상환경 탐색
//!
//! 우선순위 순으로 후보를 검사하고, `<후보>/pyvenv.cfg`가 존재하는 첫 후보를
//! 선택합니다.
//!
//! 1. 명시적으로 지정된 경로
//! 2. `VIRTUAL_ENV` 환경 변수 (호스트가 아닌 대상만. 호스트에서는 호출자 자신의 값)
//! 3. 작업 디렉토리 자체, 그 다음 `venv`, `.venv`, `env`, `.env`, `virtualenv`
//! 4. 작업 디렉토리 이름으로 찾는 외부 위치 (virtualenvwrapper, pipenv, poetry, pyenv)
//! 5. 제한 깊이의 파일 시스템 검색 (호스트가 아닌 대상만)

use depprobe_core::{CommandChannel, shell_quote};
use tracing::debug;

use super::{absolute_dir, join_path};

/// 가상환경 표식 파일
pub const VENV_MARKER: &str = "pyvenv.cfg";

const CONVENTIONAL_DIRS: &[&str] = &["venv", ".venv", "env", ".env", "virtualenv"];

const SYSTEM_SEARCH_COMMAND: &str =
    "find /opt /home /usr/local /srv /app -maxdepth 4 -name 'pyvenv.cfg' -type f 2>/dev/null";

/// 가상환경 경로를 찾습니다. 없으면 `None`.
pub async fn discover_venv(
    channel: &dyn CommandChannel,
    working_dir: Option<&str>,
    explicit: Option<&str>,
) -> Option<String> {
    let remote = !channel.identity().is_host();

    if let Some(path) = explicit {
        let resolved = channel
            .execute(&format!("realpath {}", shell_quote(path)), None)
            .await
            .stdout_if_success()
            .map(str::to_owned)
            .unwrap_or_else(|| path.trim_end_matches('/').to_owned());
        if is_venv(channel, &resolved).await {
            return Some(resolved);
        }
        debug!(path, "explicit venv path has no pyvenv.cfg, continuing search");
    }

    if remote {
        let env = channel
            .execute("printenv VIRTUAL_ENV", None)
            .await
            .stdout_if_success()
            .map(str::to_owned);
        if let Some(env) = env {
            if is_venv(channel, &env).await {
                return Some(env);
            }
        }
    }

    let search_dir = working_dir.unwrap_or(".");
    if is_venv(channel, search_dir).await {
        return Some(search_dir.to_owned());
    }
    for name in CONVENTIONAL_DIRS {
        let candidate = join_path(search_dir, name);
        if is_venv(channel, &candidate).await {
            return Some(candidate);
        }
    }

    if let Some(dir) = working_dir {
        for candidate in external_candidates(channel, dir).await {
            if is_venv(channel, &candidate).await {
                return Some(candidate);
            }
        }
    }

    if remote {
        // find는 없는 루트 때문에 0이 아닌 코드로 끝날 수 있으므로 stdout만 본다
        let output = channel.execute(SYSTEM_SEARCH_COMMAND, None).await;
        let parent = output
            .stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .and_then(|marker| marker.strip_suffix(&format!("/{VENV_MARKER}")))
            .map(str::to_owned);
        if let Some(candidate) = parent {
            if is_venv(channel, &candidate).await {
                return Some(candidate);
            }
        }
    }

    None
}

async fn is_venv(channel: &dyn CommandChannel, candidate: &str) -> bool {
    channel.path_exists(&join_path(candidate, VENV_MARKER)).await
}

/// 작업 디렉토리 이름(`<base>`)으로 찾는 외부 가상환경 후보
async fn external_candidates(channel: &dyn CommandChannel, working_dir: &str) -> Vec<String> {
    let Some(home) = channel
        .execute("printenv HOME", None)
        .await
        .stdout_if_success()
        .map(str::to_owned)
    else {
        return Vec::new();
    };

    let absolute = absolute_dir(channel, working_dir)
        .await
        .unwrap_or_else(|| working_dir.to_owned());
    let base = match absolute.trim_end_matches('/').rsplit('/').next() {
        Some(base) if !base.is_empty() && base != "." => base.to_owned(),
        _ => return Vec::new(),
    };

    let mut candidates = vec![join_path(&home, &format!(".virtualenvs/{base}"))];
    for prefix in [".local/share/virtualenvs", ".cache/pypoetry/virtualenvs"] {
        let pattern = join_path(&home, &format!("{prefix}/{base}"));
        candidates.extend(expand_glob(channel, &pattern).await);
    }
    candidates.push(join_path(&home, &format!(".pyenv/versions/{base}")));
    candidates
}

/// `<prefix>*`에 일치하는 경로 (pipenv, poetry는 이름 뒤에 해시를 붙임)
async fn expand_glob(channel: &dyn CommandChannel, prefix: &str) -> Vec<String> {
    let command = format!("ls -d {}* 2>/dev/null", shell_quote(prefix));
    let output = channel.execute(&command, None).await;
    if !output.is_success() {
        return Vec::new();
    }
    output
        .stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect()
}
