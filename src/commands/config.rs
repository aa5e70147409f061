//! config command - show where settings come from

use anyhow::Result;
use colored::Colorize;

use crate::config::{self, FileConfig, ServiceOptions};

/// `cli` holds the flag values, already backed by their VBASE_* variables
pub fn execute(path_only: bool, cli: ServiceOptions) -> Result<()> {
    let config_path = config::get_config_path()?;
    if path_only {
        println!("{}", config_path.display());
        return Ok(());
    }

    println!("Config file: {}", config_path.display());
    let stored = if config_path.exists() {
        let stored = config::load_config_from(&config_path)?;
        println!("\n{}", serde_json::to_string_pretty(&stored.masked())?);
        stored
    } else {
        println!("{}", "(not created yet)".bright_black());
        FileConfig::default()
    };

    let overrides = overridden_keys(&cli);
    if !overrides.is_empty() {
        println!();
        println!("{}", "Set by flag or environment".cyan().bold());
        for name in overrides {
            println!("  {}", name.yellow());
        }
    }

    let effective = FileConfig::from(ServiceOptions::resolve(cli, &stored));
    println!();
    println!("{}", "Effective settings".cyan().bold());
    println!("{}", serde_json::to_string_pretty(&effective.masked())?);

    Ok(())
}

/// Names of the settings given on the command line or in the environment
fn overridden_keys(cli: &ServiceOptions) -> Vec<&'static str> {
    [
        (config::ENV_NODE_RPC_URL, &cli.node_rpc_url),
        (config::ENV_ADDRESS, &cli.address),
        (config::ENV_PRIVATE_KEY, &cli.private_key),
        (config::ENV_FORWARDER_URL, &cli.forwarder_url),
        (config::ENV_API_KEY, &cli.api_key),
    ]
    .into_iter()
    .filter(|(_, value)| value.as_deref().is_some_and(|v| !v.is_empty()))
    .map(|(name, _)| name)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overridden_keys_lists_set_values() {
        let cli = ServiceOptions {
            forwarder_url: Some("https://f".into()),
            api_key: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(overridden_keys(&cli), vec![config::ENV_FORWARDER_URL]);
        assert!(overridden_keys(&ServiceOptions::default()).is_empty());
    }

    #[test]
    fn test_masked_config_never_prints_secrets() {
        let stored = FileConfig {
            private_key: Some(
                "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".into(),
            ),
            ..Default::default()
        };
        let json = serde_json::to_string_pretty(&stored.masked()).unwrap();
        assert!(!json.contains("bec39a17"));
        assert!(json.contains("VBASE_COMMITMENT_SERVICE_PRIVATE_KEY"));
    }

    #[test]
    fn test_effective_settings_merge_cli_over_file() {
        let stored = FileConfig {
            api_key: Some("file-api-key-0001".into()),
            forwarder_url: Some("https://file.forwarder".into()),
            ..Default::default()
        };
        let cli = ServiceOptions {
            forwarder_url: Some("https://flag.forwarder".into()),
            ..Default::default()
        };

        let effective = FileConfig::from(ServiceOptions::resolve(cli, &stored)).masked();
        assert_eq!(effective.forwarder_url.as_deref(), Some("https://flag.forwarder"));
        assert_eq!(effective.api_key.as_deref(), Some("file...0001"));
    }
}
