use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use thiserror::Error;

use crate::container::{ContainerRuntimeConfig, ContainerRuntimeType};

///////////////////////////////////////////////////////////////////////////////

pub const DEFAULT_IMAGE: &str = "cockroachdb/postgres-test:20170308-1644";
pub const DEFAULT_PG_PORT: u16 = 26257;

/// Where the client container finds the database and its certificates.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct HarnessConfig {
    pub runtime: ContainerRuntimeType,
    pub runtime_binary: Option<PathBuf>,
    pub image: String,
    pub network: Option<String>,
    pub pg_host: String,
    pub pg_port: u16,
    /// Host directory bind-mounted read-only at `/certs`
    pub certs_dir: PathBuf,
    /// Client certificate path inside the container
    pub ssl_cert: String,
    /// Exported as `PGSSLKEY` for tools in the image. The JDBC program ignores
    /// it: the script always converts `/certs/node.key` into `key.pk8`.
    pub ssl_key: String,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "timeoutSecs")]
    pub timeout: Duration,
    pub log_dir: Option<PathBuf>,
    pub container_prefix: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            runtime: ContainerRuntimeType::Docker,
            runtime_binary: None,
            image: DEFAULT_IMAGE.to_owned(),
            network: Some("host".to_owned()),
            pg_host: "localhost".to_owned(),
            pg_port: DEFAULT_PG_PORT,
            certs_dir: PathBuf::from("certs"),
            ssl_cert: "/certs/node.crt".to_owned(),
            ssl_key: "/certs/node.key".to_owned(),
            timeout: Duration::from_secs(300),
            log_dir: None,
            container_prefix: "acceptance".to_owned(),
        }
    }
}

impl HarnessConfig {
    pub fn from_yaml(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_yaml(&s)
    }

    pub fn runtime_config(&self) -> ContainerRuntimeConfig {
        ContainerRuntimeConfig {
            runtime: self.runtime,
            binary: self.runtime_binary.clone(),
        }
    }

    /// Environment of the client container. The JDBC program reads all but
    /// `PGSSLKEY`.
    pub fn client_env(&self) -> Vec<(String, String)> {
        vec![
            ("PGHOST".to_owned(), self.pg_host.clone()),
            ("PGPORT".to_owned(), self.pg_port.to_string()),
            ("PGSSLCERT".to_owned(), self.ssl_cert.clone()),
            ("PGSSLKEY".to_owned(), self.ssl_key.clone()),
        ]
    }
}

///////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config")]
    Parse(#[from] serde_yaml::Error),
}

///////////////////////////////////////////////////////////////////////////////
