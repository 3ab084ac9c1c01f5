use k8s_openapi::apimachinery::pkg::version::Info;
use semver::Version;

use crate::error::{Error, Result};

/// Discovered API server version. Unknown versions fail every gate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VersionInfo {
    version: Option<Version>,
}

impl VersionInfo {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            version: Some(Version::new(major, minor, patch)),
        }
    }

    /// Parses a `gitVersion` such as `v1.28.3-gke.1203001`.
    pub fn parse(git_version: &str) -> Result<Self> {
        let raw = git_version.trim().trim_start_matches('v');
        let version = Version::parse(raw).map_err(|e| {
            Error::InvalidConfig(format!("Invalid server version {git_version:?}: {e}"))
        })?;
        Ok(Self {
            version: Some(version),
        })
    }

    pub fn from_info(info: &Info) -> Result<Self> {
        Self::parse(&info.git_version)
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// Compares major and minor only, so vendor pre-release suffixes do not fail the gate.
    pub fn is_at_least(&self, major: u64, minor: u64) -> bool {
        match &self.version {
            Some(v) => (v.major, v.minor) >= (major, minor),
            None => false,
        }
    }

    pub fn supports_internal_traffic_policy(&self) -> bool {
        self.is_at_least(1, 22)
    }
}
