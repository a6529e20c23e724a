// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup. Invalid
//! values abort startup with a [`ConfigError`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Database and upload directory | `./data` |
//! | `SECRET_KEY` | Master secret for field encryption | Required |
//! | `SESSION_SECRET` | Session signing secret | Random per process |
//! | `SESSION_TTL_SECS` | Session lifetime in seconds | `86400` |
//! | `TLS_CERT_PATH` | PEM certificate chain (enables HTTPS) | Optional |
//! | `TLS_KEY_PATH` | PEM private key (enables HTTPS) | Optional |
//! | `TRANSFER_CHUNK_SIZE` | Relay chunk size in bytes | `32768` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::logging::LogFormat;
use crate::storage::paths::DATA_ROOT;
use crate::transfer::DEFAULT_CHUNK_SIZE;

/// Environment variable name for the bind address.
pub const HOST_ENV: &str = "HOST";

/// Environment variable name for the bind port.
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory.
///
/// Holds `keeper.redb` and the `uploads/` tree. Uploaded file bytes are
/// stored unencrypted here, so the directory must be private to the server.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the master secret.
///
/// The field encryption key is derived from it. It is never persisted and
/// never logged; losing it makes every sealed field unreadable.
pub const SECRET_KEY_ENV: &str = "SECRET_KEY";

/// Environment variable name for the session signing secret.
pub const SESSION_SECRET_ENV: &str = "SESSION_SECRET";

/// Environment variable name for the session lifetime.
pub const SESSION_TTL_ENV: &str = "SESSION_TTL_SECS";

/// Environment variable names for the TLS certificate pair.
pub const TLS_CERT_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_ENV: &str = "TLS_KEY_PATH";

/// Environment variable name for the relay chunk size.
pub const CHUNK_SIZE_ENV: &str = "TRANSFER_CHUNK_SIZE";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Accepted relay chunk sizes.
pub const MIN_CHUNK_SIZE: usize = 1024;
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// PEM certificate chain and key for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Fully validated server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub secret_key: String,
    pub session_secret: Option<String>,
    pub session_ttl_secs: i64,
    pub tls: Option<TlsPaths>,
    pub chunk_size: usize,
    pub log_format: LogFormat,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("data_dir", &self.data_dir)
            .field("secret_key", &"<redacted>")
            .field(
                "session_secret",
                &self.session_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("tls", &self.tls)
            .field("chunk_size", &self.chunk_size)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let ip: IpAddr = host.trim().parse().map_err(|e| ConfigError::Invalid {
            var: HOST_ENV,
            reason: format!("{e}"),
        })?;
        let port = parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;

        let secret_key = get(SECRET_KEY_ENV).ok_or(ConfigError::Missing(SECRET_KEY_ENV))?;

        let session_ttl_secs = parse_or(get(SESSION_TTL_ENV), SESSION_TTL_ENV, DEFAULT_SESSION_TTL_SECS)?;
        if session_ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                var: SESSION_TTL_ENV,
                reason: "must be positive".into(),
            });
        }

        let tls = match (get(TLS_CERT_ENV), get(TLS_KEY_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_ENV)),
        };

        let chunk_size = parse_or(get(CHUNK_SIZE_ENV), CHUNK_SIZE_ENV, DEFAULT_CHUNK_SIZE)?;
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk_size) {
            return Err(ConfigError::Invalid {
                var: CHUNK_SIZE_ENV,
                reason: format!("must be between {MIN_CHUNK_SIZE} and {MAX_CHUNK_SIZE}"),
            });
        }

        let log_format = match get(LOG_FORMAT_ENV) {
            Some(value) => value.parse().map_err(|reason| ConfigError::Invalid {
                var: LOG_FORMAT_ENV,
                reason,
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr: SocketAddr::new(ip, port),
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DATA_ROOT.to_string())),
            secret_key,
            session_secret: get(SESSION_SECRET_ENV),
            session_ttl_secs,
            tls,
            chunk_size,
            log_format,
        })
    }
}

fn parse_or<T>(value: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match value {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[(SECRET_KEY_ENV, "master")]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.session_ttl_secs, 86_400);
        assert_eq!(config.chunk_size, 32 * 1024);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.tls.is_none());
        assert!(config.session_secret.is_none());
    }

    #[test]
    fn secret_key_is_required() {
        assert!(matches!(
            load(&[]),
            Err(ConfigError::Missing(SECRET_KEY_ENV))
        ));
        assert!(matches!(
            load(&[(SECRET_KEY_ENV, "  ")]),
            Err(ConfigError::Missing(SECRET_KEY_ENV))
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            (SECRET_KEY_ENV, "master"),
            (HOST_ENV, "127.0.0.1"),
            (PORT_ENV, "9443"),
            (DATA_DIR_ENV, "/var/lib/keeper"),
            (SESSION_TTL_ENV, "600"),
            (CHUNK_SIZE_ENV, "65536"),
            (LOG_FORMAT_ENV, "json"),
            (TLS_CERT_ENV, "/etc/keeper/cert.pem"),
            (TLS_KEY_ENV, "/etc/keeper/key.pem"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9443".parse().unwrap());
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/keeper"));
        assert_eq!(config.session_ttl_secs, 600);
        assert_eq!(config.chunk_size, 65_536);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.tls,
            Some(TlsPaths {
                cert: "/etc/keeper/cert.pem".into(),
                key: "/etc/keeper/key.pem".into(),
            })
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (var, value) in [
            (PORT_ENV, "http"),
            (HOST_ENV, "not an ip"),
            (SESSION_TTL_ENV, "0"),
            (CHUNK_SIZE_ENV, "16"),
            (CHUNK_SIZE_ENV, "99999999"),
            (LOG_FORMAT_ENV, "xml"),
        ] {
            let result = load(&[(SECRET_KEY_ENV, "master"), (var, value)]);
            assert!(
                matches!(result, Err(ConfigError::Invalid { .. })),
                "{var}={value}"
            );
        }
    }

    #[test]
    fn tls_needs_both_paths() {
        assert!(matches!(
            load(&[(SECRET_KEY_ENV, "m"), (TLS_CERT_ENV, "/c.pem")]),
            Err(ConfigError::Missing(TLS_KEY_ENV))
        ));
        assert!(matches!(
            load(&[(SECRET_KEY_ENV, "m"), (TLS_KEY_ENV, "/k.pem")]),
            Err(ConfigError::Missing(TLS_CERT_ENV))
        ));
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = load(&[
            (SECRET_KEY_ENV, "super-secret-master"),
            (SESSION_SECRET_ENV, "cookie-signing-secret"),
        ])
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret-master"));
        assert!(!rendered.contains("cookie-signing-secret"));
    }
}
