//! Configuration module
//!
//! Hook dispatch is configured from the environment. A `.env` file is loaded
//! first when present.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::codec::CodecKind;
use crate::models::{HookType, AVAILABLE_HOOKS};

const TIMEOUT_MS: u64 = 30_000;
const HTTP_CONNECT_TIMEOUT_MS: u64 = 10_000;
const HTTP_SIZE_LIMIT: usize = 64 * 1024;

/// How hook requests reach the handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HookTransport {
    Http,
    Grpc,
    File,
}

impl HookTransport {
    /// Wire encoding spoken over this transport
    pub fn codec_kind(&self) -> CodecKind {
        match self {
            HookTransport::Http | HookTransport::File => CodecKind::Json,
            HookTransport::Grpc => CodecKind::Protobuf,
        }
    }
}

impl Display for HookTransport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            HookTransport::Http => write!(f, "http"),
            HookTransport::Grpc => write!(f, "grpc"),
            HookTransport::File => write!(f, "file"),
        }
    }
}

impl FromStr for HookTransport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" | "https" => Ok(HookTransport::Http),
            "grpc" => Ok(HookTransport::Grpc),
            "file" => Ok(HookTransport::File),
            _ => Err(anyhow::anyhow!("Invalid hook transport: {}", s)),
        }
    }
}

/// Hook dispatch configuration
#[derive(Clone, Debug, Serialize)]
pub struct HookConfig {
    pub transport: HookTransport,
    pub enabled_hooks: Vec<HookType>,
    pub timeout_ms: u64,
    // HTTP transport
    pub http_endpoint: Option<String>,
    /// Uploading client's request headers copied onto the hook request
    pub http_forward_headers: Vec<String>,
    pub http_connect_timeout_ms: u64,
    pub http_size_limit: usize,
    // gRPC transport
    pub grpc_endpoint: Option<String>,
    pub grpc_secure: bool,
    pub grpc_server_tls_certificate: Option<String>,
    pub grpc_client_tls_certificate: Option<String>,
    pub grpc_client_tls_key: Option<String>,
    // File transport
    pub hooks_dir: Option<String>,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            transport: HookTransport::Http,
            enabled_hooks: AVAILABLE_HOOKS.to_vec(),
            timeout_ms: TIMEOUT_MS,
            http_endpoint: None,
            http_forward_headers: Vec::new(),
            http_connect_timeout_ms: HTTP_CONNECT_TIMEOUT_MS,
            http_size_limit: HTTP_SIZE_LIMIT,
            grpc_endpoint: None,
            grpc_secure: false,
            grpc_server_tls_certificate: None,
            grpc_client_tls_certificate: None,
            grpc_client_tls_key: None,
            hooks_dir: None,
        }
    }
}

impl HookConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let transport = lookup("HOOKS_TRANSPORT")
            .unwrap_or_else(|| "http".to_string())
            .parse()?;

        let enabled_hooks = match non_empty("HOOKS_ENABLED_EVENTS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<HookType>()
                        .map_err(|e| anyhow::anyhow!("HOOKS_ENABLED_EVENTS: {}", e))
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => AVAILABLE_HOOKS.to_vec(),
        };

        let http_forward_headers = lookup("HOOKS_HTTP_FORWARD_HEADERS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            transport,
            enabled_hooks,
            timeout_ms: lookup("HOOKS_TIMEOUT_MS")
                .unwrap_or_else(|| TIMEOUT_MS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HOOKS_TIMEOUT_MS must be a valid number"))?,
            http_endpoint: non_empty("HOOKS_HTTP_ENDPOINT"),
            http_forward_headers,
            http_connect_timeout_ms: lookup("HOOKS_HTTP_CONNECT_TIMEOUT_MS")
                .unwrap_or_else(|| HTTP_CONNECT_TIMEOUT_MS.to_string())
                .parse()
                .unwrap_or(HTTP_CONNECT_TIMEOUT_MS),
            http_size_limit: lookup("HOOKS_HTTP_SIZE_LIMIT")
                .unwrap_or_else(|| HTTP_SIZE_LIMIT.to_string())
                .parse()
                .unwrap_or(HTTP_SIZE_LIMIT),
            grpc_endpoint: non_empty("HOOKS_GRPC_ENDPOINT"),
            grpc_secure: lookup("HOOKS_GRPC_SECURE")
                .unwrap_or_else(|| "false".to_string())
                .parse()
                .unwrap_or(false),
            grpc_server_tls_certificate: non_empty("HOOKS_GRPC_SERVER_TLS_CERTIFICATE"),
            grpc_client_tls_certificate: non_empty("HOOKS_GRPC_CLIENT_TLS_CERTIFICATE"),
            grpc_client_tls_key: non_empty("HOOKS_GRPC_CLIENT_TLS_KEY"),
            hooks_dir: non_empty("HOOKS_DIR"),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.timeout_ms == 0 {
            return Err(anyhow::anyhow!("HOOKS_TIMEOUT_MS must be greater than 0"));
        }

        match self.transport {
            HookTransport::Http => {
                let endpoint = self.http_endpoint.as_deref().ok_or_else(|| {
                    anyhow::anyhow!("HOOKS_HTTP_ENDPOINT must be set when using the http transport")
                })?;
                if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                    return Err(anyhow::anyhow!(
                        "HOOKS_HTTP_ENDPOINT must be an http:// or https:// URL"
                    ));
                }
                if self.http_size_limit == 0 {
                    return Err(anyhow::anyhow!(
                        "HOOKS_HTTP_SIZE_LIMIT must be greater than 0"
                    ));
                }
            }
            HookTransport::Grpc => {
                if self.grpc_endpoint.is_none() {
                    return Err(anyhow::anyhow!(
                        "HOOKS_GRPC_ENDPOINT must be set when using the grpc transport"
                    ));
                }
                if self.grpc_client_tls_certificate.is_some() != self.grpc_client_tls_key.is_some()
                {
                    return Err(anyhow::anyhow!(
                        "HOOKS_GRPC_CLIENT_TLS_CERTIFICATE and HOOKS_GRPC_CLIENT_TLS_KEY must be set together"
                    ));
                }
                let has_tls_files = self.grpc_server_tls_certificate.is_some()
                    || self.grpc_client_tls_certificate.is_some();
                if has_tls_files && !self.grpc_secure {
                    return Err(anyhow::anyhow!(
                        "gRPC TLS certificates require HOOKS_GRPC_SECURE=true"
                    ));
                }
            }
            HookTransport::File => {
                if self.hooks_dir.is_none() {
                    return Err(anyhow::anyhow!(
                        "HOOKS_DIR must be set when using the file transport"
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn http_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.http_connect_timeout_ms)
    }

    pub fn codec_kind(&self) -> CodecKind {
        self.transport.codec_kind()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<HookConfig, anyhow::Error> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        HookConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.transport, HookTransport::Http);
        assert_eq!(config.enabled_hooks.len(), AVAILABLE_HOOKS.len());
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.http_size_limit, 64 * 1024);
        assert_eq!(config.codec_kind(), CodecKind::Json);
        // No endpoint configured
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_http_config() {
        let config = config_from(&[
            ("HOOKS_HTTP_ENDPOINT", "http://localhost:8081/hooks"),
            ("HOOKS_HTTP_FORWARD_HEADERS", "Authorization, X-Tenant,"),
            ("HOOKS_ENABLED_EVENTS", "pre-create, post-finish"),
            ("HOOKS_TIMEOUT_MS", "1500"),
        ])
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.http_forward_headers, vec!["Authorization", "X-Tenant"]);
        assert_eq!(
            config.enabled_hooks,
            vec![HookType::PreCreate, HookType::PostFinish]
        );
        assert_eq!(config.timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_unknown_enabled_event_is_rejected() {
        let err = config_from(&[("HOOKS_ENABLED_EVENTS", "pre-create,pre-upload")]).unwrap_err();
        assert!(err.to_string().contains("pre-upload"));
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        assert!(config_from(&[("HOOKS_TIMEOUT_MS", "soon")]).is_err());

        let config = config_from(&[
            ("HOOKS_HTTP_ENDPOINT", "http://localhost/hooks"),
            ("HOOKS_TIMEOUT_MS", "0"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_http_endpoint_must_be_url() {
        let config = config_from(&[("HOOKS_HTTP_ENDPOINT", "localhost:8081")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_grpc_tls_settings() {
        let config = config_from(&[
            ("HOOKS_TRANSPORT", "grpc"),
            ("HOOKS_GRPC_ENDPOINT", "http://localhost:8080"),
        ])
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.codec_kind(), CodecKind::Protobuf);

        let config = config_from(&[
            ("HOOKS_TRANSPORT", "grpc"),
            ("HOOKS_GRPC_ENDPOINT", "https://hooks:8080"),
            ("HOOKS_GRPC_SECURE", "true"),
            ("HOOKS_GRPC_CLIENT_TLS_CERTIFICATE", "/etc/certs/client.pem"),
        ])
        .unwrap();
        assert!(config.validate().is_err());

        let config = config_from(&[
            ("HOOKS_TRANSPORT", "grpc"),
            ("HOOKS_GRPC_ENDPOINT", "https://hooks:8080"),
            ("HOOKS_GRPC_SERVER_TLS_CERTIFICATE", "/etc/certs/ca.pem"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_transport_requires_dir() {
        let config = config_from(&[("HOOKS_TRANSPORT", "file")]).unwrap();
        assert!(config.validate().is_err());

        let config = config_from(&[("HOOKS_TRANSPORT", "file"), ("HOOKS_DIR", "./hooks")]).unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_transport_from_str() {
        assert_eq!("GRPC".parse::<HookTransport>().unwrap(), HookTransport::Grpc);
        assert!("amqp".parse::<HookTransport>().is_err());
    }
}
