#![doc = include_str!("../README.md")]

pub mod detectors;
pub mod error;
pub mod hashing;
pub mod orchestrator;

// --- 주요 타입 re-export ---

pub use detectors::{
    DETECTOR_NAMES, DetectContext, Detection, Detector, DetectorKind, PackageDetector, PackageSet,
    default_detectors,
};
pub use error::DetectorError;
pub use hashing::{FingerprintProfile, checksum_list_hash, fingerprint_listing, location_hash};
pub use orchestrator::{Orchestrator, OrchestratorOptions, parse_detector_list};
