use std::collections::HashSet;
use std::path::Path;

use http::HeaderName;
use secrecy::ExposeSecret;

use crate::{Config, KeyStoreConfig, LedgerConfig};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no model or mount is configured, a mount prefix
    /// is malformed, a model has an invalid header or rate, or a remote
    /// collaborator is misconfigured
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_mounts()?;
        self.validate_models()?;
        self.validate_auth()?;
        self.validate_billing()?;
        Ok(())
    }

    fn validate_mounts(&self) -> anyhow::Result<()> {
        if self.server.mounts.is_empty() {
            anyhow::bail!("at least one [[server.mounts]] entry must be configured");
        }

        let mut seen = HashSet::new();

        for mount in &self.server.mounts {
            let prefix = mount.prefix.as_str();

            if !prefix.is_empty() && !prefix.starts_with('/') {
                anyhow::bail!("mount prefix '{prefix}' must start with '/'");
            }

            if prefix.ends_with('/') {
                anyhow::bail!("mount prefix '{prefix}' must not end with '/'");
            }

            if !seen.insert(prefix) {
                anyhow::bail!("mount prefix '{prefix}' is configured more than once");
            }
        }

        Ok(())
    }

    fn validate_models(&self) -> anyhow::Result<()> {
        if self.models.is_empty() {
            anyhow::bail!("at least one [models.<id>] entry must be configured");
        }

        for (id, model) in &self.models {
            HeaderName::try_from(model.auth_header.as_str())
                .map_err(|e| anyhow::anyhow!("invalid auth_header for model '{id}': {e}"))?;

            for (from, to) in &model.headers {
                HeaderName::try_from(from.as_str())
                    .map_err(|e| anyhow::anyhow!("invalid header '{from}' for model '{id}': {e}"))?;
                HeaderName::try_from(to.as_str())
                    .map_err(|e| anyhow::anyhow!("invalid header '{to}' for model '{id}': {e}"))?;
            }

            if model.cost.rates().iter().any(|rate| !rate.is_finite() || *rate < 0.0) {
                anyhow::bail!("cost rates for model '{id}' must be finite and non-negative");
            }
        }

        Ok(())
    }

    fn validate_auth(&self) -> anyhow::Result<()> {
        match &self.auth {
            KeyStoreConfig::Static(config) => {
                let mut seen = HashSet::new();
                for key in &config.keys {
                    if key.secret.expose_secret().is_empty() {
                        anyhow::bail!("static key '{}' has an empty secret", key.id);
                    }
                    if !seen.insert(key.secret.expose_secret()) {
                        anyhow::bail!("static key '{}' reuses another key's secret", key.id);
                    }
                }
            }
            KeyStoreConfig::Remote(config) => {
                if config.secret.expose_secret().is_empty() {
                    anyhow::bail!("auth.secret must not be empty");
                }

                if config.cache_ttl_seconds == 0 {
                    anyhow::bail!("auth.cache_ttl_seconds must be greater than 0");
                }

                if config.cache_capacity > 1_000_000 {
                    anyhow::bail!("auth.cache_capacity exceeds maximum of 1,000,000");
                }
            }
        }

        Ok(())
    }

    fn validate_billing(&self) -> anyhow::Result<()> {
        if let LedgerConfig::Remote(config) = &self.billing
            && config.secret.expose_secret().is_empty()
        {
            anyhow::bail!("billing.secret must not be empty");
        }

        Ok(())
    }
}
