//! verify-object command - check a commitment against a timestamp
//!
//! The indexing service lists every commitment to the CID. The one closest to
//! the requested timestamp must lie within the tolerance, and the commitment
//! service must confirm it for the recorded user.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use colored::Colorize;
use std::io::Read;

use crate::cid::{self, ObjectCid};
use crate::client::VBaseClient;
use crate::config::{self, ServiceOptions};
use crate::error::{CliError, ClientError};
use crate::models::ObjectRecord;
use crate::timestamp;

/// Outcome of checking a CID against a target timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The closest commitment is within tolerance and confirmed
    Verified(ObjectRecord),
    /// No commitment exists for the CID
    NotFound,
    /// The closest commitment is further away than the tolerance
    OutsideTolerance { closest: ObjectRecord, delta: Duration },
    /// The commitment service did not confirm the indexed commitment
    Rejected(ObjectRecord),
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified(_))
    }

    fn reason(&self, tolerance: Duration) -> String {
        match self {
            Verification::Verified(record) => format!(
                "commitment by {} at {}",
                record.user,
                timestamp::format_timestamp(&record.timestamp)
            ),
            Verification::NotFound => "no commitment found for this object CID".to_string(),
            Verification::OutsideTolerance { closest, delta } => format!(
                "closest commitment at {} is {} away, tolerance is {}",
                timestamp::format_timestamp(&closest.timestamp),
                format_duration(*delta),
                format_duration(tolerance)
            ),
            Verification::Rejected(record) => format!(
                "commitment service did not confirm the commitment by {} at {}",
                record.user,
                timestamp::format_timestamp(&record.timestamp)
            ),
        }
    }
}

/// Find the closest commitment and confirm it with the commitment service
pub async fn verify_commitment(
    client: &VBaseClient,
    cid: &ObjectCid,
    target: &DateTime<Utc>,
    tolerance: Duration,
) -> Result<Verification, ClientError> {
    let records = client.find_objects(cid).await?;
    tracing::debug!(count = records.len(), "indexed commitments");

    let Some(closest) = timestamp::closest_record(&records, target) else {
        return Ok(Verification::NotFound);
    };

    let delta = timestamp::distance(&closest.timestamp, target);
    if delta > tolerance {
        return Ok(Verification::OutsideTolerance {
            closest: closest.clone(),
            delta,
        });
    }

    if client
        .verify_user_object(&closest.user, cid, &closest.timestamp)
        .await?
    {
        Ok(Verification::Verified(closest.clone()))
    } else {
        Ok(Verification::Rejected(closest.clone()))
    }
}

pub async fn execute<R: Read>(
    opts: &ServiceOptions,
    object_cid: Option<String>,
    object_cid_stdin: bool,
    target: &str,
    tolerance: &str,
    stdin: R,
) -> Result<()> {
    tracing::info!("Verifying object...");
    println!("{}", "Verifying object...".cyan().bold());

    let cid = cid::read_object_cid(object_cid.as_deref(), object_cid_stdin, stdin)?;
    let target_ts = timestamp::parse_timestamp(target)?;
    let tolerance = timestamp::parse_tolerance(tolerance)?;
    let service = config::validate_verify_operation(opts)?;

    println!("  {} {}", "Object CID:".bright_black(), cid.as_str().green());
    println!(
        "  {} {}",
        "Timestamp:".bright_black(),
        timestamp::format_timestamp(&target_ts)
    );
    println!("  {} {}", "Tolerance:".bright_black(), format_duration(tolerance));
    println!("  {} {}", "Service:".bright_black(), service.describe());
    println!();

    let client = VBaseClient::from_target(&service)?;

    let pb = super::spinner("Looking up commitments...");
    let outcome = verify_commitment(&client, &cid, &target_ts, tolerance).await;
    pb.finish_and_clear();
    let outcome = outcome.context("Failed to verify object")?;

    let reason = outcome.reason(tolerance);
    if outcome.is_verified() {
        println!("{}", "Timestamp verification succeeded.".green().bold());
        println!("  {}", reason.bright_black());
        Ok(())
    } else {
        println!("{}", "Timestamp verification failed.".red().bold());
        Err(CliError::VerificationFailed(reason).into())
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.num_seconds();
    let nanos = (d - Duration::seconds(secs)).num_nanoseconds().unwrap_or(0);
    if nanos == 0 {
        return format!("{}s", secs);
    }
    let frac = format!("{:09}", nanos.unsigned_abs());
    format!("{}.{}s", secs, frac.trim_end_matches('0'))
}
