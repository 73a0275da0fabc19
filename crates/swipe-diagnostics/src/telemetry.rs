//! Host `tracing` subscriber setup
//!
//! The subsystem reports its own problems (init failures, dropped batches)
//! and the optional console echo through `tracing`. Hosts without their own
//! subscriber can install one here.
//!
//! ```ignore
//! use swipe_diagnostics::telemetry::SubscriberBuilder;
//!
//! // Pretty human-readable output for development
//! SubscriberBuilder::development().init();
//!
//! // JSON lines for log collection
//! SubscriberBuilder::new().with_json(true).with_level("info").init();
//! ```

use swipe_diag_core::BuildProfile;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Builder for the process-wide `tracing` subscriber
///
/// `RUST_LOG` takes precedence over the configured default level.
#[derive(Debug, Clone)]
pub struct SubscriberBuilder {
    default_level: String,
    json: bool,
    ansi: bool,
    with_target: bool,
}

impl Default for SubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriberBuilder {
    /// Compact console output at `info`
    pub fn new() -> Self {
        Self {
            default_level: "info".to_string(),
            json: false,
            ansi: true,
            with_target: true,
        }
    }

    /// Verbose, human-readable output
    pub fn development() -> Self {
        Self::new().with_level("debug")
    }

    /// JSON lines at `info`, no colors
    pub fn production() -> Self {
        Self::new().with_json(true).with_ansi(false)
    }

    /// Warnings only, no colors
    pub fn testing() -> Self {
        Self::new().with_level("warn").with_ansi(false)
    }

    /// Preset for a build profile
    pub fn for_profile(profile: BuildProfile) -> Self {
        match profile {
            BuildProfile::Development => Self::development(),
            BuildProfile::Production => Self::production(),
        }
    }

    /// Set the default filter directive
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    pub fn default_level(&self) -> &str {
        &self.default_level
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_level))
    }

    /// Install the subscriber globally
    ///
    /// Fails if a global subscriber has already been set.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let registry = Registry::default().with(self.env_filter());

        if self.json {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(self.with_target);
            registry.with(layer).try_init()
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(self.ansi)
                .with_target(self.with_target);
            registry.with(layer).try_init()
        }
    }

    /// Install the subscriber globally, keeping any existing one
    pub fn init(self) {
        if let Err(e) = self.try_init() {
            eprintln!("Warning: tracing subscriber already set: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(SubscriberBuilder::new().default_level(), "info");
        assert_eq!(SubscriberBuilder::development().default_level(), "debug");
        assert_eq!(SubscriberBuilder::testing().default_level(), "warn");

        let prod = SubscriberBuilder::for_profile(BuildProfile::Production);
        assert!(prod.json);
        assert!(!prod.ansi);
    }

    #[test]
    fn test_second_init_is_rejected() {
        // First call may lose to another test in this binary
        let _ = SubscriberBuilder::testing().try_init();
        assert!(SubscriberBuilder::testing().try_init().is_err());
    }
}
