//! 위치 해시 — 결정적 내용 지문
//!
//! 프로젝트 범위 위치의 내용을 `find` 목록으로 수집하고, 목록을 Rust에서 정규화
//! (공백 줄 제거, 정렬)한 뒤 SHA-256을 계산합니다. 대상의 `sort`나 로케일에
//! 의존하지 않으므로 같은 내용이면 어느 머신에서나 같은 해시가 나옵니다.
//!
//! 모든 해시는 64자리 소문자 hex입니다.
//!
//! # 제약
//! `-printf`는 GNU findutils 기능입니다. busybox `find`만 있는 대상(Alpine 기본
//! 이미지 등)에서는 목록 명령이 실패하고 해시가 생략됩니다.

use depprobe_core::{CommandChannel, shell_quote};
use sha2::{Digest, Sha256};
use tracing::debug;

/// 입력 바이트의 SHA-256 hex 문자열
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(data.as_ref()))
}

/// 목록 정렬 기준
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingOrder {
    /// 크기(숫자) 다음 나머지 줄 (바이트 순)
    SizeThenPath,
    /// 경로 (바이트 순)
    Path,
}

/// 목록 수집 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingMode {
    /// 일반 파일과 심볼릭 링크 전체 (`크기 경로 링크대상`)
    Tree,
    /// `*.jar` 아카이브만 (`크기 경로`)
    Archives,
}

/// 생태계별 지문 프로파일
#[derive(Debug, Clone, Copy)]
pub struct FingerprintProfile {
    /// `find -name`으로 제외할 패턴
    pub prunes: &'static [&'static str],
    pub mode: ListingMode,
}

/// pip: 설치 도구 자체와 바이트코드, 설치 메타데이터 제외
pub const PIP_PROFILE: FingerprintProfile = FingerprintProfile {
    prunes: &[
        "__pycache__",
        "__editable__*",
        "pip",
        "pip-*",
        "setuptools",
        "setuptools-*",
        "pkg_resources",
        "_distutils_hack",
        "distutils-precedence.pth",
        "*.pyc",
        "*.pyo",
        "INSTALLER",
        "RECORD",
        "direct_url.json",
    ],
    mode: ListingMode::Tree,
};

/// npm: 캐시와 임시 파일, 로그 제외
pub const NPM_PROFILE: FingerprintProfile = FingerprintProfile {
    prunes: &[".cache", ".package-lock.json", "*.log", ".npm", "*.tmp", "*.temp"],
    mode: ListingMode::Tree,
};

/// JAR: 아카이브 파일만
pub const JAR_PROFILE: FingerprintProfile = FingerprintProfile {
    prunes: &[],
    mode: ListingMode::Archives,
};

impl FingerprintProfile {
    /// 위치 안에서 실행할 `find` 명령
    pub fn listing_command(&self) -> String {
        match self.mode {
            ListingMode::Archives => "find . -name '*.jar' -type f -printf '%s %p\\n'".to_owned(),
            ListingMode::Tree => {
                let mut command = String::from("find .");
                if !self.prunes.is_empty() {
                    let names: Vec<String> = self
                        .prunes
                        .iter()
                        .map(|p| format!("-name {}", shell_quote(p)))
                        .collect();
                    command.push_str(&format!(" \\( {} \\) -prune -o", names.join(" -o ")));
                }
                command.push_str(" \\( -type f -o -type l \\) -printf '%s %p %l\\n'");
                command
            }
        }
    }

    pub fn order(&self) -> ListingOrder {
        match self.mode {
            ListingMode::Tree => ListingOrder::SizeThenPath,
            ListingMode::Archives => ListingOrder::Path,
        }
    }
}

/// 위치의 내용 지문을 계산합니다.
///
/// 목록 명령이 실패하거나 출력이 비어 있으면 `None`을 반환합니다.
pub async fn location_hash(
    channel: &dyn CommandChannel,
    location: &str,
    profile: &FingerprintProfile,
) -> Option<String> {
    let command = format!("cd {} && {}", shell_quote(location), profile.listing_command());
    let output = channel.execute(&command, None).await;
    if !output.is_success() {
        debug!(
            location,
            exit_code = output.exit_code,
            "location listing failed, hash omitted"
        );
        return None;
    }
    fingerprint_listing(&output.stdout, profile.order())
}

/// `find` 목록을 정규화한 뒤 해시합니다.
///
/// 줄 순서(순회 순서)와 무관하게 같은 줄 집합이면 같은 해시를 돌려줍니다.
pub fn fingerprint_listing(listing: &str, order: ListingOrder) -> Option<String> {
    let mut lines: Vec<&str> = listing
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return None;
    }

    match order {
        ListingOrder::SizeThenPath => lines.sort_by(|a, b| split_size(a).cmp(&split_size(b))),
        ListingOrder::Path => lines.sort_by(|a, b| split_size(a).1.cmp(split_size(b).1)),
    }

    Some(sha256_hex(lines.join("\n")))
}

fn split_size(line: &str) -> (u64, &str) {
    match line.split_once(' ') {
        Some((size, rest)) => match size.parse::<u64>() {
            Ok(size) => (size, rest),
            Err(_) => (0, line),
        },
        None => (0, line),
    }
}

/// 체크섬 목록(`<checksum>  <path>` 줄)의 해시
///
/// 각 줄의 첫 토큰만 정렬해 해시합니다. 토큰이 없으면 `None`.
pub fn checksum_list_hash(content: &str) -> Option<String> {
    let mut sums: Vec<&str> = content
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    if sums.is_empty() {
        return None;
    }
    sums.sort_unstable();
    Some(sha256_hex(sums.join("\n")))
}
