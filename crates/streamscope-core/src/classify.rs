//! Capability detection: URL classification and strategy selection
//!
//! Classification is purely lexical. Runtime support is asked through a
//! [`CapabilityProbe`], and only when the URL shape makes the answer relevant,
//! so a runtime without an adaptive engine is never probed for one on a plain
//! MP3 link.

use crate::types::Strategy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

static ADAPTIVE_MANIFEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.m3u8(\?|#|$)").expect("valid manifest pattern"));

static LEGACY_CONTAINER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.flv(\?|#|$)").expect("valid container pattern"));

static FILE_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.[a-z0-9]+$").expect("valid extension pattern"));

/// Lexical classification of a stream URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UrlClass {
    /// Ends in an adaptive manifest suffix (`.m3u8`)
    pub adaptive_manifest: bool,
    /// Ends in a legacy container suffix (`.flv`)
    pub legacy_container: bool,
    /// Last path segment carries no file extension
    pub extensionless: bool,
}

/// True if the URL names an adaptive manifest, ignoring query and fragment
pub fn is_adaptive_manifest(url: &str) -> bool {
    ADAPTIVE_MANIFEST.is_match(url)
}

/// True if the URL names a legacy flash container
pub fn is_legacy_container(url: &str) -> bool {
    LEGACY_CONTAINER.is_match(url)
}

/// True if the last non-empty path segment has no extension.
///
/// Unparseable URLs report `false` so they fall through to native playback.
pub fn is_extensionless(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let last = parsed
        .path()
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("");
    !FILE_EXTENSION.is_match(last)
}

/// Classify a URL. Never fails.
pub fn classify_url(url: &str) -> UrlClass {
    UrlClass {
        adaptive_manifest: is_adaptive_manifest(url),
        legacy_container: is_legacy_container(url),
        extensionless: is_extensionless(url),
    }
}

/// Runtime support checks, delegated to the collaborators
pub trait CapabilityProbe {
    /// Adaptive engine can run here (MSE available)
    fn adaptive_supported(&mut self) -> bool;

    /// Legacy-container engine can run here
    fn legacy_supported(&mut self) -> bool;

    /// Media element plays adaptive manifests without an engine
    fn native_manifest_supported(&mut self) -> bool;
}

/// Fixed capability answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub adaptive: bool,
    pub legacy: bool,
    pub native_manifest: bool,
}

impl Capabilities {
    /// Desktop browser with MSE: both engines, no native manifest playback
    pub fn desktop() -> Self {
        Self {
            adaptive: true,
            legacy: true,
            native_manifest: false,
        }
    }
}

impl CapabilityProbe for Capabilities {
    fn adaptive_supported(&mut self) -> bool {
        self.adaptive
    }

    fn legacy_supported(&mut self) -> bool {
        self.legacy
    }

    fn native_manifest_supported(&mut self) -> bool {
        self.native_manifest
    }
}

/// Pick a strategy; first match wins:
///
/// 1. adaptive manifest with a supported adaptive engine
/// 2. legacy container or extensionless URL with a supported legacy engine
/// 3. anything that is not an adaptive manifest plays natively
/// 4. adaptive manifest the media element can play itself
///
/// `None` means no strategy applies.
pub fn select_strategy(class: &UrlClass, probe: &mut impl CapabilityProbe) -> Option<Strategy> {
    if class.adaptive_manifest && probe.adaptive_supported() {
        return Some(Strategy::Adaptive);
    }
    if (class.legacy_container || class.extensionless) && probe.legacy_supported() {
        return Some(Strategy::Legacy);
    }
    if !class.adaptive_manifest {
        return Some(Strategy::Native);
    }
    if probe.native_manifest_supported() {
        return Some(Strategy::NativeManifest);
    }
    None
}
