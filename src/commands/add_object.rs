//! add-object command - create an object commitment

use anyhow::{Context, Result};
use colored::Colorize;
use std::io::Read;

use crate::cid;
use crate::client::VBaseClient;
use crate::config::{self, ServiceOptions};
use crate::crypto;

pub async fn execute<R: Read>(
    opts: &ServiceOptions,
    object_cid: Option<String>,
    object_cid_stdin: bool,
    stdin: R,
) -> Result<()> {
    tracing::info!("Adding object...");
    println!("{}", "Adding object...".cyan().bold());

    let cid = cid::read_object_cid(object_cid.as_deref(), object_cid_stdin, stdin)?;
    let target = config::validate_commit_operation(opts)?;

    println!("  {} {}", "Object CID:".bright_black(), cid.as_str().green());
    println!("  {} {}", "Service:".bright_black(), target.describe());
    if let Some(key) = &opts.private_key {
        println!("  {} {}", "Signer:".bright_black(), crypto::address_of(key)?);
    }
    println!();

    let client = VBaseClient::from_target(&target)?;

    let pb = super::spinner("Submitting commitment...");
    let receipt = match client.add_object(&cid).await {
        Ok(receipt) => receipt,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e).context("Failed to add object");
        }
    };
    pb.finish_with_message(format!("{} Commitment recorded", "✓".green()));

    tracing::info!(object_cid = %receipt.object_cid, user = %receipt.user, "object added");
    println!("Added object = {}", serde_json::to_string(&receipt)?);

    Ok(())
}
