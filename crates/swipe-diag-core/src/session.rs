//! Session and host context
//!
//! Every entry carries the same per-process metadata: a session id that is
//! generated once and never persisted, the host app version and the device
//! class. The host is probed exactly once, through [`HostCapabilities`],
//! and the result is injected wherever it is needed.

use std::fmt;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Runtime class of the host application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Web,
    Android,
    Ios,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Web => "web",
            Device::Android => "android",
            Device::Ios => "ios",
        }
    }

    /// Whether the host has a native filesystem
    pub fn is_native(&self) -> bool {
        !matches!(self, Device::Web)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "web" => Ok(Device::Web),
            "android" => Ok(Device::Android),
            "ios" => Ok(Device::Ios),
            other => Err(CoreError::InvalidDevice(other.to_string())),
        }
    }
}

/// Build classification of the host application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildProfile {
    Development,
    Production,
}

impl BuildProfile {
    /// Profile of the binary currently running
    pub fn current() -> Self {
        if cfg!(debug_assertions) {
            BuildProfile::Development
        } else {
            BuildProfile::Production
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, BuildProfile::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildProfile::Development => "development",
            BuildProfile::Production => "production",
        }
    }
}

impl Default for BuildProfile {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for BuildProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildProfile {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "debug" => Ok(BuildProfile::Development),
            "production" | "prod" | "release" => Ok(BuildProfile::Production),
            other => Err(CoreError::InvalidBuild(other.to_string())),
        }
    }
}

/// Capability flags of the host, resolved once at startup
///
/// Hosts embedding the core in a browser-class shell construct
/// [`HostCapabilities::web`] explicitly; native hosts usually rely on
/// [`HostCapabilities::detect`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCapabilities {
    /// Whether the host exposes a native filesystem
    pub native: bool,
    /// Operating system name as reported by the host
    pub os: String,
}

impl HostCapabilities {
    /// Probe the compile target
    pub fn detect() -> Self {
        let os = std::env::consts::OS;
        Self {
            native: !matches!(std::env::consts::ARCH, "wasm32" | "wasm64"),
            os: os.to_string(),
        }
    }

    pub fn web() -> Self {
        Self {
            native: false,
            os: "browser".to_string(),
        }
    }

    pub fn android() -> Self {
        Self {
            native: true,
            os: "android".to_string(),
        }
    }

    pub fn ios() -> Self {
        Self {
            native: true,
            os: "ios".to_string(),
        }
    }

    /// Classify the host
    ///
    /// Non-native hosts are `web`; native hosts are `ios` when the OS says
    /// so and `android` otherwise.
    pub fn device(&self) -> Device {
        if !self.native {
            Device::Web
        } else if self.os.eq_ignore_ascii_case("ios") {
            Device::Ios
        } else {
            Device::Android
        }
    }
}

/// Metadata attached to every entry of this process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub session_id: Uuid,
    pub app_version: String,
    pub device: Device,
}

/// Per-process session context
///
/// Constructed once at startup and shared by reference. A new process is a
/// new session: the id is never written anywhere except into entries.
#[derive(Debug, Clone)]
pub struct SessionContext {
    session_id: Uuid,
    app_version: String,
    device: Device,
}

impl SessionContext {
    /// Start a new session
    pub fn new(app_version: impl Into<String>, device: Device) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            app_version: app_version.into(),
            device,
        }
    }

    /// Start a new session classified from host capabilities
    pub fn for_host(app_version: impl Into<String>, host: &HostCapabilities) -> Self {
        Self::new(app_version, host.device())
    }

    /// Rebuild a context with a known session id
    pub fn with_session_id(
        session_id: Uuid,
        app_version: impl Into<String>,
        device: Device,
    ) -> Self {
        Self {
            session_id,
            app_version: app_version.into(),
            device,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Snapshot of the metadata attached to entries
    pub fn metadata(&self) -> SessionMetadata {
        SessionMetadata {
            session_id: self.session_id,
            app_version: self.app_version.clone(),
            device: self.device,
        }
    }
}

/// Current UTC time as an ISO-8601 string with millisecond precision
///
/// The format (`2024-05-01T12:00:00.000Z`) sorts lexicographically in
/// chronological order, which both backends and the query engine rely on.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
