//! Gateway configuration and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizdraft_core::traits::PersistenceGateway;

use crate::file::FileGateway;
use crate::http::HttpGateway;

/// Configuration for a single persistence gateway.
///
/// Note: Custom Debug impl masks API tokens to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GatewayConfig {
    Http {
        base_url: String,
        #[serde(default)]
        api_token: Option<String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    File {
        path: PathBuf,
    },
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayConfig::Http {
                base_url,
                api_token,
                timeout_secs,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("api_token", &api_token.as_ref().map(|_| "***"))
                .field("timeout_secs", timeout_secs)
                .finish(),
            GatewayConfig::File { path } => f.debug_struct("File").field("path", path).finish(),
        }
    }
}

/// Top-level quizdraft configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizdraftConfig {
    /// Gateway configurations keyed by name.
    #[serde(default)]
    pub gateways: HashMap<String, GatewayConfig>,
    /// Gateway to use when none is named.
    #[serde(default = "default_gateway")]
    pub default_gateway: String,
    /// Pause between consecutive store calls, in milliseconds.
    #[serde(default)]
    pub call_delay_ms: u64,
    /// Number of questions to ask for when regenerating.
    #[serde(default = "default_regenerate_count")]
    pub regenerate_count: usize,
}

fn default_gateway() -> String {
    "local".to_string()
}
fn default_regenerate_count() -> usize {
    5
}

impl Default for QuizdraftConfig {
    fn default() -> Self {
        Self {
            gateways: HashMap::new(),
            default_gateway: default_gateway(),
            call_delay_ms: 0,
            regenerate_count: default_regenerate_count(),
        }
    }
}

impl QuizdraftConfig {
    /// Look up a gateway by name, falling back to `default_gateway`.
    pub fn gateway(&self, name: Option<&str>) -> Result<(&str, &GatewayConfig)> {
        let name = name.unwrap_or(&self.default_gateway);
        self.gateways
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .with_context(|| {
                let mut known: Vec<&str> = self.gateways.keys().map(String::as_str).collect();
                known.sort_unstable();
                format!(
                    "gateway '{name}' is not configured (known: {})",
                    if known.is_empty() {
                        "none".to_string()
                    } else {
                        known.join(", ")
                    }
                )
            })
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_gateway_config(config: &GatewayConfig) -> GatewayConfig {
    match config {
        GatewayConfig::Http {
            base_url,
            api_token,
            timeout_secs,
        } => GatewayConfig::Http {
            base_url: resolve_env_vars(base_url),
            api_token: api_token.as_ref().map(|t| resolve_env_vars(t)),
            timeout_secs: *timeout_secs,
        },
        GatewayConfig::File { path } => GatewayConfig::File {
            path: PathBuf::from(resolve_env_vars(&path.to_string_lossy())),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizdraft.toml` in the current directory
/// 2. `~/.config/quizdraft/config.toml`
///
/// `QUIZDRAFT_API_TOKEN` overrides the token of every HTTP gateway.
pub fn load_config() -> Result<QuizdraftConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizdraftConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizdraft.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizdraftConfig::default(),
    };

    if let Ok(token) = std::env::var("QUIZDRAFT_API_TOKEN") {
        apply_token_override(&mut config, &token);
    }

    config.gateways = config
        .gateways
        .iter()
        .map(|(k, v)| (k.clone(), resolve_gateway_config(v)))
        .collect();

    tracing::debug!(
        gateways = config.gateways.len(),
        default = %config.default_gateway,
        "configuration loaded"
    );
    Ok(config)
}

/// Parse configuration from TOML text.
pub fn parse_config(content: &str) -> Result<QuizdraftConfig> {
    Ok(toml::from_str(content)?)
}

fn apply_token_override(config: &mut QuizdraftConfig, token: &str) {
    for gateway in config.gateways.values_mut() {
        if let GatewayConfig::Http { api_token, .. } = gateway {
            *api_token = Some(token.to_string());
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizdraft"))
}

/// Create a gateway instance from its configuration.
pub fn create_gateway(name: &str, config: &GatewayConfig) -> Result<Arc<dyn PersistenceGateway>> {
    tracing::debug!(name, ?config, "creating gateway");
    match config {
        GatewayConfig::Http {
            base_url,
            api_token,
            timeout_secs,
        } => {
            if base_url.is_empty() {
                anyhow::bail!("gateway '{name}' has an empty base_url");
            }
            Ok(Arc::new(HttpGateway::new(
                base_url,
                api_token.clone(),
                *timeout_secs,
            )))
        }
        GatewayConfig::File { path } => Ok(Arc::new(FileGateway::new(path.clone()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_QUIZDRAFT_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_QUIZDRAFT_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_QUIZDRAFT_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("unterminated ${X"), "unterminated ${X");
        std::env::remove_var("_QUIZDRAFT_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = QuizdraftConfig::default();
        assert_eq!(config.default_gateway, "local");
        assert_eq!(config.call_delay_ms, 0);
        assert_eq!(config.regenerate_count, 5);
        assert!(config.gateway(None).is_err());
    }

    #[test]
    fn parse_gateway_config() {
        let config = parse_config(
            r#"
default_gateway = "api"
call_delay_ms = 250

[gateways.api]
type = "http"
base_url = "https://quiz.example.com/api"
api_token = "tok"

[gateways.local]
type = "file"
path = "store.json"
"#,
        )
        .unwrap();
        assert_eq!(config.gateways.len(), 2);
        assert_eq!(config.call_delay_ms, 250);
        let (name, gateway) = config.gateway(None).unwrap();
        assert_eq!(name, "api");
        assert!(matches!(gateway, GatewayConfig::Http { .. }));
        assert!(matches!(
            config.gateway(Some("local")).unwrap().1,
            GatewayConfig::File { .. }
        ));
        let err = config.gateway(Some("nope")).unwrap_err().to_string();
        assert!(err.contains("api, local"));
    }

    #[test]
    fn debug_masks_token() {
        let config = GatewayConfig::Http {
            base_url: "http://x".into(),
            api_token: Some("super-secret".into()),
            timeout_secs: None,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn token_override_hits_http_gateways_only() {
        let mut config = parse_config(
            r#"
[gateways.api]
type = "http"
base_url = "http://x"

[gateways.local]
type = "file"
path = "store.json"
"#,
        )
        .unwrap();
        apply_token_override(&mut config, "from-env");
        match &config.gateways["api"] {
            GatewayConfig::Http { api_token, .. } => {
                assert_eq!(api_token.as_deref(), Some("from-env"))
            }
            other => panic!("expected http, got {other:?}"),
        }
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quizdraft.toml");
        std::fs::write(
            &path,
            "[gateways.local]\ntype = \"file\"\npath = \"/tmp/store.json\"\n",
        )
        .unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        let (_, gateway) = config.gateway(None).unwrap();
        assert!(create_gateway("local", gateway).is_ok());

        assert!(load_config_from(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn empty_base_url_is_refused() {
        let config = GatewayConfig::Http {
            base_url: String::new(),
            api_token: None,
            timeout_secs: None,
        };
        assert!(create_gateway("api", &config).is_err());
    }
}
