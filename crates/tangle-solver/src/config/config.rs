use serde::{Deserialize, Serialize};

use crate::error::{ResolverError, Result};

/// Policy for optional (recommended) dependencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnlyRequires {
    /// Recommends are honoured
    Disabled,
    /// Only hard requirements are considered
    Enabled,
    /// Use `ResolverConfig::only_requires`
    #[default]
    DeferToGlobalPolicy,
}

impl OnlyRequires {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "false" | "disabled" => Some(OnlyRequires::Disabled),
            "true" | "enabled" => Some(OnlyRequires::Enabled),
            "default" => Some(OnlyRequires::DeferToGlobalPolicy),
            _ => None,
        }
    }

    /// Resolve against the global default
    pub fn effective(&self, global: bool) -> bool {
        match self {
            OnlyRequires::Disabled => false,
            OnlyRequires::Enabled => true,
            OnlyRequires::DeferToGlobalPolicy => global,
        }
    }
}

impl From<bool> for OnlyRequires {
    fn from(value: bool) -> Self {
        if value {
            OnlyRequires::Enabled
        } else {
            OnlyRequires::Disabled
        }
    }
}

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ResolverConfig {
    /// Global policy `OnlyRequires::DeferToGlobalPolicy` falls back to
    pub only_requires: bool,

    /// Architecture used for compatibility checks
    pub system_arch: String,

    /// Allow installing items that change the vendor of an installed item
    pub allow_vendor_change: bool,

    /// Upper bound on problems collected after a failed solve
    pub max_problems: usize,

    /// Search budget of the SAT adapter
    pub max_iterations: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            only_requires: false,
            system_arch: std::env::consts::ARCH.to_string(),
            allow_vendor_change: false,
            max_problems: 32,
            max_iterations: 100_000,
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_arch(mut self, arch: impl Into<String>) -> Self {
        self.system_arch = arch.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.system_arch.trim().is_empty() {
            return Err(ResolverError::Config("system-arch must not be empty".to_string()));
        }
        if self.max_problems == 0 {
            return Err(ResolverError::Config("max-problems must be at least 1".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(ResolverError::Config("max-iterations must be at least 1".to_string()));
        }
        Ok(())
    }
}
