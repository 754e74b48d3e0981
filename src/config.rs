//! Configuration for typeforge.
//!
//! This module provides runtime defaults for the virtual file system and the
//! type manifolds. Use [`ConfigBuilder`] at application startup to override
//! them; components that need a non-global configuration take a [`Config`]
//! directly.

use std::sync::OnceLock;
use std::time::Duration;

use crate::vfs::CachingMode;

/// Global configuration, initialized via [`ConfigBuilder::init`].
static CONFIG: OnceLock<Config> = OnceLock::new();

/// What to do when more than one file backs a single-file model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AmbiguityPolicy {
    /// Generate from the first discovered file and report a warning.
    #[default]
    Warn,
    /// Fail generation for the type.
    Reject,
}

/// Runtime configuration for typeforge.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory-listing freshness policy for new file systems.
    pub caching_mode: CachingMode,
    /// Window during which `FuzzyTimestamps` trusts a listing without a stat.
    pub fuzzy_quantum: Duration,
    /// Handling of ambiguous backing file sets.
    pub ambiguity: AmbiguityPolicy,
    /// User-Agent string for URL-backed file reads.
    /// Example: "my-app/1.0.0"
    pub user_agent: String,
    /// Global timeout for URL-backed file reads.
    pub network_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            caching_mode: CachingMode::CheckTimestamps,
            fuzzy_quantum: Duration::from_millis(16),
            ambiguity: AmbiguityPolicy::Warn,
            user_agent: concat!("typeforge/", env!("CARGO_PKG_VERSION")).to_string(),
            network_timeout: Duration::from_secs(30),
        }
    }
}

/// Configuration builder for fluent API.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    caching_mode: Option<CachingMode>,
    fuzzy_quantum: Option<Duration>,
    ambiguity: Option<AmbiguityPolicy>,
    user_agent: Option<String>,
    network_timeout: Option<Duration>,
}

impl ConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default caching mode for new file systems.
    pub fn caching_mode(mut self, mode: CachingMode) -> Self {
        self.caching_mode = Some(mode);
        self
    }

    /// Set the fuzzy revalidation window.
    pub fn fuzzy_quantum(mut self, quantum: Duration) -> Self {
        self.fuzzy_quantum = Some(quantum);
        self
    }

    /// Set the ambiguous-backing-set policy.
    pub fn ambiguity(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity = Some(policy);
        self
    }

    /// Set the User-Agent string for URL-backed reads.
    ///
    /// Default: "typeforge/{version}"
    ///
    /// # Example
    ///
    /// ```
    /// use typeforge::config::ConfigBuilder;
    ///
    /// ConfigBuilder::new()
    ///     .user_agent("my-app/1.0.0")
    ///     .init();
    /// ```
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set the timeout for URL-backed reads.
    pub fn network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = Some(timeout);
        self
    }

    /// Build the configuration without installing it globally.
    pub fn build(self) -> Config {
        let default = Config::default();
        Config {
            caching_mode: self.caching_mode.unwrap_or(default.caching_mode),
            fuzzy_quantum: self.fuzzy_quantum.unwrap_or(default.fuzzy_quantum),
            ambiguity: self.ambiguity.unwrap_or(default.ambiguity),
            user_agent: self.user_agent.unwrap_or(default.user_agent),
            network_timeout: self.network_timeout.unwrap_or(default.network_timeout),
        }
    }

    /// Build and initialize the global configuration.
    ///
    /// This can only be called once. Subsequent calls are ignored.
    /// Returns `true` if configuration was set, `false` if already initialized.
    pub fn init(self) -> bool {
        CONFIG.set(self.build()).is_ok()
    }
}

/// Initialize typeforge with default configuration.
///
/// This is equivalent to `ConfigBuilder::new().init()`.
pub fn init_default() -> bool {
    ConfigBuilder::new().init()
}

/// Get the current configuration, or default if not initialized.
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.user_agent.starts_with("typeforge/"));
        assert_eq!(config.caching_mode, CachingMode::CheckTimestamps);
        assert_eq!(config.ambiguity, AmbiguityPolicy::Warn);
    }

    #[test]
    fn test_builder() {
        let builder = ConfigBuilder::new().user_agent("test/1.0");
        assert_eq!(builder.user_agent, Some("test/1.0".to_string()));
    }

    #[test]
    fn test_build_keeps_defaults_for_unset_fields() {
        let config = ConfigBuilder::new()
            .caching_mode(CachingMode::FullCaching)
            .ambiguity(AmbiguityPolicy::Reject)
            .build();
        assert_eq!(config.caching_mode, CachingMode::FullCaching);
        assert_eq!(config.ambiguity, AmbiguityPolicy::Reject);
        assert_eq!(config.fuzzy_quantum, Duration::from_millis(16));
    }
}
