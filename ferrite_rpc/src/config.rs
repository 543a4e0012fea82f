use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Whether the connection is a plain request/response transport or is
/// upgraded to a streaming one carrying server pushed notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    Plain,
    Streaming,
}

/// Everything needed to reach and authenticate against a ferrited node.
/// Immutable once the client is constructed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub transport: TransportKind,
    pub user: String,
    pub secret: String,
    /// Expected server certificate material. When absent the server
    /// identity is not checked.
    #[serde(default)]
    pub certificates: Option<Vec<u8>>,
}

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "cannot read config: {}", e),
            ConfigError::ParseError(e) => write!(f, "cannot parse config: {}", e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(error: std::io::Error) -> Self {
        ConfigError::IoError(error)
    }
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(error: ron::error::SpannedError) -> Self {
        ConfigError::ParseError(error)
    }
}

impl ConnectionConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ConnectionConfig, ConfigError> {
        let file = std::fs::File::open(path)?;
        Ok(ron::de::from_reader(file)?)
    }
}

/// The place a locally running ferrited drops its `rpc.cert`.
pub fn default_cert_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("ferrited").join("rpc.cert"))
}
