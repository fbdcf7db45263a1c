//! Interceptor configuration.
//!
//! Loaded from TOML. Every field has a default so a minimal file (or an
//! empty one) is valid:
//!
//! ```toml
//! bind_address = "0.0.0.0:8080"
//! log_filter   = "interceptor=debug,info"
//!
//! [[targets]]
//! host       = "checkout.shop.svc.cluster.local"
//! service    = "checkout"
//! port       = 8080
//! deployment = "checkout"
//! ```
//!
//! Syntax errors come from serde; [`Config::validate`] adds the semantic
//! checks and reports every problem found, not just the first.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::Error;
use crate::routing::Target;

/// Root configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen address, e.g. `"0.0.0.0:8080"`.
    pub bind_address: String,

    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,

    pub targets: Vec<Target>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_owned(),
            log_filter: "info".to_owned(),
            targets: Vec::new(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        fs::read_to_string(path)?.parse()
    }

    pub fn validate(&self) -> Result<(), Error> {
        let mut problems = Vec::new();

        if self.bind_address.parse::<SocketAddr>().is_err() {
            problems.push(format!("bind_address `{}` is not a socket address", self.bind_address));
        }
        for (i, t) in self.targets.iter().enumerate() {
            if t.host.is_empty() {
                problems.push(format!("targets[{i}]: host is empty"));
            }
            if t.service.is_empty() {
                problems.push(format!("targets[{i}]: service is empty"));
            }
            if t.port == 0 {
                problems.push(format!("targets[{i}]: port must be non-zero"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidConfig(problems.join(", ")))
        }
    }

    /// The target registered for `service`, if any.
    pub fn target(&self, service: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.service == service)
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
