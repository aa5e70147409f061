//! Configuration management for vBase CLI
//!
//! Settings come from three layers. Command-line flags win over environment
//! variables, which win over the JSON file at `~/.config/vbase/config.json`.

use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CliError;

pub const ENV_NODE_RPC_URL: &str = "VBASE_COMMITMENT_SERVICE_NODE_RPC_URL";
pub const ENV_ADDRESS: &str = "VBASE_COMMITMENT_SERVICE_ADDRESS";
pub const ENV_PRIVATE_KEY: &str = "VBASE_COMMITMENT_SERVICE_PRIVATE_KEY";
pub const ENV_FORWARDER_URL: &str = "VBASE_FORWARDER_URL";
pub const ENV_API_KEY: &str = "VBASE_API_KEY";

/// Stored configuration file. Keys mirror the environment variable names.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    #[serde(rename = "VBASE_COMMITMENT_SERVICE_NODE_RPC_URL")]
    pub node_rpc_url: Option<String>,

    #[serde(rename = "VBASE_COMMITMENT_SERVICE_ADDRESS")]
    pub address: Option<String>,

    #[serde(rename = "VBASE_COMMITMENT_SERVICE_PRIVATE_KEY")]
    pub private_key: Option<String>,

    #[serde(rename = "VBASE_FORWARDER_URL")]
    pub forwarder_url: Option<String>,

    #[serde(rename = "VBASE_API_KEY")]
    pub api_key: Option<String>,
}

impl FileConfig {
    /// Copy with secrets replaced, for display
    pub fn masked(&self) -> Self {
        Self {
            private_key: self.private_key.as_deref().map(mask_secret),
            api_key: self.api_key.as_deref().map(mask_secret),
            ..self.clone()
        }
    }
}

/// The commitment service options, from any layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceOptions {
    pub node_rpc_url: Option<String>,
    pub address: Option<String>,
    pub private_key: Option<String>,
    pub forwarder_url: Option<String>,
    pub api_key: Option<String>,
}

impl ServiceOptions {
    /// Merge the command-line value (flag or its environment variable) over the file.
    pub fn resolve(cli: ServiceOptions, file: &FileConfig) -> Self {
        fn pick(value: Option<String>, stored: &Option<String>) -> Option<String> {
            non_empty(value).or_else(|| non_empty(stored.clone()))
        }

        Self {
            node_rpc_url: pick(cli.node_rpc_url, &file.node_rpc_url),
            address: pick(cli.address, &file.address),
            private_key: pick(cli.private_key, &file.private_key),
            forwarder_url: pick(cli.forwarder_url, &file.forwarder_url),
            api_key: pick(cli.api_key, &file.api_key),
        }
    }
}

impl From<ServiceOptions> for FileConfig {
    fn from(opts: ServiceOptions) -> Self {
        FileConfig {
            node_rpc_url: opts.node_rpc_url,
            address: opts.address,
            private_key: opts.private_key,
            forwarder_url: opts.forwarder_url,
            api_key: opts.api_key,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// How to reach the commitment service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceTarget {
    /// Direct contract access through a blockchain node
    Node {
        rpc_url: String,
        address: String,
        private_key: Option<String>,
    },
    /// Access through the vBase forwarder API
    Forwarder {
        url: String,
        api_key: String,
        private_key: Option<String>,
    },
}

impl ServiceTarget {
    pub fn describe(&self) -> String {
        match self {
            ServiceTarget::Node { rpc_url, address, .. } => {
                format!("node {} (contract {})", rpc_url, address)
            }
            ServiceTarget::Forwarder { url, .. } => format!("forwarder {}", url),
        }
    }
}

/// Validate the options for a commit (write) operation.
pub fn validate_commit_operation(opts: &ServiceOptions) -> Result<ServiceTarget, CliError> {
    if let (Some(rpc_url), Some(address), Some(key)) =
        (&opts.node_rpc_url, &opts.address, &opts.private_key)
    {
        return Ok(ServiceTarget::Node {
            rpc_url: rpc_url.clone(),
            address: address.clone(),
            private_key: Some(key.clone()),
        });
    }

    if let (Some(url), Some(api_key)) = (&opts.forwarder_url, &opts.api_key) {
        return Ok(ServiceTarget::Forwarder {
            url: url.clone(),
            api_key: api_key.clone(),
            private_key: opts.private_key.clone(),
        });
    }

    Err(CliError::usage(
        "For a commit (write) operation, you must specify either \
         [--vb-cs-node-rpc-url, --vb-cs-address, --vb-cs-private-key] \
         or [--vb-forwarder-url, --vb-api-key] with an optional --vb-cs-private-key.",
    ))
}

/// Validate the options for a verify (read) operation.
pub fn validate_verify_operation(opts: &ServiceOptions) -> Result<ServiceTarget, CliError> {
    if let (Some(rpc_url), Some(address)) = (&opts.node_rpc_url, &opts.address) {
        return Ok(ServiceTarget::Node {
            rpc_url: rpc_url.clone(),
            address: address.clone(),
            private_key: opts.private_key.clone(),
        });
    }

    if let (Some(url), Some(api_key)) = (&opts.forwarder_url, &opts.api_key) {
        return Ok(ServiceTarget::Forwarder {
            url: url.clone(),
            api_key: api_key.clone(),
            private_key: opts.private_key.clone(),
        });
    }

    Err(CliError::usage(
        "For a verify (read) operation, you must specify either \
         [--vb-cs-node-rpc-url, --vb-cs-address] \
         or [--vb-forwarder-url, --vb-api-key].",
    ))
}

/// Get the config file path
pub fn get_config_path() -> Result<PathBuf> {
    let base = BaseDirs::new().context("Failed to determine home directory")?;
    Ok(base.home_dir().join(".config").join("vbase").join("config.json"))
}

/// Load configuration from the default file
pub fn load_config() -> Result<FileConfig> {
    load_config_from(&get_config_path()?)
}

/// Load configuration from `path`; a missing file is an empty config.
pub fn load_config_from(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file");
        return Ok(FileConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config: FileConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;

    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
