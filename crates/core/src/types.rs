//! 도메인 타입 — 해석 결과 스키마
//!
//! 오케스트레이터가 만들어 CLI/리포팅 계층이 소비하는 데이터 구조입니다.
//! 모든 타입은 JSON 직렬화 형태가 곧 외부 인터페이스입니다.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 패키지 생태계 태그
///
/// 패키지 레코드의 `type` 필드로 직렬화됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    /// Debian 계열 OS 패키지
    Dpkg,
    /// Alpine 계열 OS 패키지
    Apk,
    /// Python 배포판
    Pip,
    /// Node.js 패키지
    Npm,
    /// JVM 아카이브
    Jar,
}

impl Ecosystem {
    /// 직렬화 형태와 동일한 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dpkg => "dpkg",
            Self::Apk => "apk",
            Self::Pip => "pip",
            Self::Npm => "npm",
            Self::Jar => "jar",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 패키지 레코드
///
/// 이름의 유일성은 (생태계, 위치) 쌍 안에서만 보장됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// 패키지 이름
    pub name: String,
    /// 버전 문자열 (OS 패키지는 아키텍처 토큰 포함)
    pub version: String,
    /// 생태계
    #[serde(rename = "type")]
    pub ecosystem: Ecosystem,
    /// 패키지 단위 해시 (64자리 소문자 hex)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Package {
    /// 해시 없는 패키지 레코드를 생성합니다.
    pub fn new(name: impl Into<String>, version: impl Into<String>, ecosystem: Ecosystem) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ecosystem,
            hash: None,
        }
    }

    /// 패키지 해시를 설정합니다.
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.name, self.version, self.ecosystem)
    }
}

/// 설치 범위
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// OS 전역 설치. 작업 디렉토리와 무관
    System,
    /// 특정 디렉토리(가상환경, node_modules 등)에 묶인 설치
    Project,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("system"),
            Self::Project => f.write_str("project"),
        }
    }
}

/// 시스템 범위 위치를 나타내는 예약 문자열
pub const SYSTEM_LOCATION: &str = "system";

/// 런타임 환경 정보 (JVM 등)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    /// 플랫폼 이름 (예: "java")
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
}

/// 패키지 관리자별 위치 메타데이터
///
/// `hash`는 프로젝트 범위이면서 패키지가 하나 이상 발견된 위치에만 존재합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationMetadata {
    /// 절대 경로 또는 `"system"`
    pub location: String,
    /// 위치 내용 지문
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// 런타임 환경 정보
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeInfo>,
}

impl LocationMetadata {
    /// 시스템 범위 위치 (해시 없음)
    pub fn system() -> Self {
        Self::at(SYSTEM_LOCATION)
    }

    /// 주어진 위치의 메타데이터 (해시 없음)
    pub fn at(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            hash: None,
            runtime: None,
        }
    }

    pub fn is_system(&self) -> bool {
        self.location == SYSTEM_LOCATION
    }
}

/// 범위별 결과 섹션 (`project` / `system`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// 여러 생태계의 패키지가 섞여 있을 수 있음. 각 레코드의 `type`으로 구분
    pub packages: Vec<Package>,
    /// 탐지기 이름 → 위치 메타데이터
    #[serde(rename = "package-management")]
    pub package_management: BTreeMap<String, LocationMetadata>,
}

impl Section {
    /// 한 탐지기의 결과를 섹션에 합칩니다.
    pub fn merge(&mut self, detector: &str, location: LocationMetadata, packages: Vec<Package>) {
        self.packages.extend(packages);
        self.package_management.insert(detector.to_owned(), location);
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.package_management.is_empty()
    }

    /// 특정 생태계의 패키지 수
    pub fn count_of(&self, ecosystem: Ecosystem) -> usize {
        self.packages
            .iter()
            .filter(|p| p.ecosystem == ecosystem)
            .count()
    }
}

/// 검사 대상의 출처 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Container,
    Host,
    Compose,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container => f.write_str("container"),
            Self::Host => f.write_str("host"),
            Self::Compose => f.write_str("compose"),
        }
    }
}

/// compose 스택의 서비스 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// 서비스 이름
    pub service: String,
    /// 컨테이너 이름
    pub container: String,
    /// 이미지 참조 (레지스트리 경로 포함)
    pub image: String,
    /// 이미지 ID (`sha256:...`)
    pub hash: String,
}

/// 검사 대상의 식별 정보 (결과의 최상위 `source`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<ServiceInfo>>,
}

impl SourceInfo {
    /// 필수 필드만 채운 출처 정보를 생성합니다.
    pub fn new(kind: SourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            image: None,
            hash: None,
            os: None,
            kernel: None,
            services: None,
        }
    }
}

/// 집계 결과
///
/// 섹션이 없다는 것은 해당 범위에 대해 데이터를 낸 탐지기가 없다는 뜻입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<Section>,
}

impl AggregatedResult {
    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.project.is_none() && self.system.is_none()
    }

    /// 모든 섹션의 패키지 수 합계
    pub fn total_packages(&self) -> usize {
        self.project.as_ref().map_or(0, |s| s.packages.len())
            + self.system.as_ref().map_or(0, |s| s.packages.len())
    }
}
