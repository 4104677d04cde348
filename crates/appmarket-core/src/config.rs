//! Market configuration
//!
//! Loaded from `appmarket.yaml` (or the file named by `APPMARKET_CONF`):
//!
//! ```yaml
//! kubernetes:
//!   common_storage: openebs-jiva-rdbox
//!   common_cert: rdbox-common-tls
//!   common_domain: rdbox.lan
//! registry:
//!   base_url: https://hub.docker.com
//!   timeout_secs: 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "APPMARKET_CONF";

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "appmarket.yaml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Values injected into rewritten charts
    #[serde(default)]
    pub kubernetes: KubernetesConfig,

    /// Registry metadata endpoint used by the multi-arch probe
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Platform values written into `values.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubernetesConfig {
    /// Storage class every chart is pointed at
    #[serde(default = "default_storage")]
    pub common_storage: String,

    /// TLS secret shared by every ingress
    #[serde(default = "default_cert")]
    pub common_cert: String,

    /// Domain ingress hostnames are synthesized under
    #[serde(default = "default_domain")]
    pub common_domain: String,
}

fn default_storage() -> String {
    "openebs-jiva-rdbox".to_string()
}

fn default_cert() -> String {
    "rdbox-common-tls".to_string()
}

fn default_domain() -> String {
    "rdbox.lan".to_string()
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            common_storage: default_storage(),
            common_cert: default_cert(),
            common_domain: default_domain(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_registry_url() -> String {
    "https://hub.docker.com".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_registry_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl MarketConfig {
    /// Load configuration from the environment-selected or default location
    ///
    /// A missing default file is not an error; built-in defaults are used.
    /// A file named explicitly through `APPMARKET_CONF` must exist.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load_from(Path::new(&path)),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let k = &self.kubernetes;
        for (key, value) in [
            ("common_storage", &k.common_storage),
            ("common_cert", &k.common_cert),
            ("common_domain", &k.common_domain),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::InvalidConfig {
                    message: format!("kubernetes.{} must not be empty", key),
                });
            }
        }
        Ok(())
    }

    /// String lookup by `(section, key)`
    pub fn lookup(&self, section: &str, key: &str) -> Option<String> {
        match (section, key) {
            ("kubernetes", "common_storage") => Some(self.kubernetes.common_storage.clone()),
            ("kubernetes", "common_cert") => Some(self.kubernetes.common_cert.clone()),
            ("kubernetes", "common_domain") => Some(self.kubernetes.common_domain.clone()),
            ("registry", "base_url") => Some(self.registry.base_url.clone()),
            ("registry", "timeout_secs") => Some(self.registry.timeout_secs.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = MarketConfig::from_yaml("").unwrap();
        assert_eq!(config.kubernetes.common_storage, "openebs-jiva-rdbox");
        assert_eq!(config.kubernetes.common_domain, "rdbox.lan");
        assert_eq!(config.registry.base_url, "https://hub.docker.com");
        assert_eq!(config.registry.timeout_secs, 10);
    }

    #[test]
    fn test_partial_override() {
        let config = MarketConfig::from_yaml(
            r#"
kubernetes:
  common_domain: example.lan
registry:
  timeout_secs: 3
"#,
        )
        .unwrap();

        assert_eq!(config.kubernetes.common_domain, "example.lan");
        assert_eq!(config.kubernetes.common_cert, "rdbox-common-tls");
        assert_eq!(config.registry.timeout_secs, 3);
    }

    #[test]
    fn test_lookup() {
        let config = MarketConfig::default();
        assert_eq!(
            config.lookup("kubernetes", "common_storage").as_deref(),
            Some("openebs-jiva-rdbox")
        );
        assert_eq!(config.lookup("registry", "timeout_secs").as_deref(), Some("10"));
        assert!(config.lookup("kubernetes", "missing").is_none());
    }

    #[test]
    fn test_empty_value_rejected() {
        let err = MarketConfig::from_yaml("kubernetes:\n  common_cert: ''\n").unwrap_err();
        assert!(err.to_string().contains("common_cert"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("appmarket.yaml");
        std::fs::write(&path, "kubernetes:\n  common_storage: local-path\n").unwrap();

        let config = MarketConfig::load_from(&path).unwrap();
        assert_eq!(config.kubernetes.common_storage, "local-path");
    }
}
