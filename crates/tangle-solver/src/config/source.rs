use std::env;
use std::fs;
use std::path::Path;

use super::ResolverConfig;
use crate::error::{ResolverError, Result};

/// Loads resolver configuration from JSON files and `TANGLE_*` variables
#[derive(Debug)]
pub struct ConfigLoader {
    use_environment: bool,
}

impl ConfigLoader {
    pub fn new(use_environment: bool) -> Self {
        Self { use_environment }
    }

    /// Get a TANGLE_* environment variable, ignoring empty values
    pub fn get_env(&self, var: &str) -> Option<String> {
        if !self.use_environment {
            return None;
        }

        env::var(var).ok().filter(|s| !s.is_empty())
    }

    /// Get a configuration value from the environment.
    /// Converts "max-problems" to "TANGLE_MAX_PROBLEMS"
    pub fn get_env_config(&self, key: &str) -> Option<(String, String)> {
        let env_var = format!("TANGLE_{}", key.replace('-', "_").to_uppercase());
        self.get_env(&env_var).map(|value| (env_var, value))
    }

    fn get_env_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get_env_config(key) {
            None => Ok(None),
            Some((var, value)) => match value.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(Some(true)),
                "0" | "false" | "no" | "off" => Ok(Some(false)),
                _ => Err(ResolverError::Config(format!(
                    "{} must be a boolean, got '{}'",
                    var, value
                ))),
            },
        }
    }

    fn get_env_number<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.get_env_config(key) {
            None => Ok(None),
            Some((var, value)) => value.trim().parse().map(Some).map_err(|_| {
                ResolverError::Config(format!("{} must be a number, got '{}'", var, value))
            }),
        }
    }

    /// Load configuration from a JSON file. A missing file yields the defaults.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<ResolverConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(ResolverConfig::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ResolverError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let config: ResolverConfig = serde_json::from_str(&contents)
            .map_err(|e| ResolverError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_environment(&self, config: &mut ResolverConfig) -> Result<()> {
        if let Some(only_requires) = self.get_env_bool("only-requires")? {
            config.only_requires = only_requires;
        }

        if let Some((_, arch)) = self.get_env_config("system-arch") {
            config.system_arch = arch;
        }

        if let Some(allow) = self.get_env_bool("allow-vendor-change")? {
            config.allow_vendor_change = allow;
        }

        if let Some(max_problems) = self.get_env_number("max-problems")? {
            config.max_problems = max_problems;
        }

        if let Some(max_iterations) = self.get_env_number("max-iterations")? {
            config.max_iterations = max_iterations;
        }

        Ok(())
    }

    /// Defaults, then the file (if any), then the environment
    pub fn load(&self, path: Option<&Path>) -> Result<ResolverConfig> {
        let mut config = match path {
            Some(path) => self.load_file(path)?,
            None => ResolverConfig::default(),
        };
        self.apply_environment(&mut config)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_without_environment_ignores_variables() {
        let loader = ConfigLoader::new(false);
        assert!(loader.get_env("PATH").is_none());

        let mut config = ResolverConfig::default();
        loader.apply_environment(&mut config).unwrap();
        assert_eq!(config, ResolverConfig::default());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let loader = ConfigLoader::new(false);
        let config = loader.load_file("/nonexistent/tangle.json").unwrap();
        assert_eq!(config, ResolverConfig::default());
    }
}
