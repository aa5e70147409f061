//! Object CID parsing and input handling

use std::fmt;
use std::io::Read;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::CliError;

/// A 256-bit content identifier in `0x`-prefixed hex form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectCid(String);

fn cid_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^0x[0-9a-fA-F]{64}$").expect("static regex"))
}

/// Whether `s` is a well-formed CID, without trimming
pub fn is_valid_cid(s: &str) -> bool {
    cid_pattern().is_match(s)
}

impl ObjectCid {
    /// Parse a CID, ignoring surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self, CliError> {
        let value = input.trim();
        if !is_valid_cid(value) {
            return Err(CliError::usage(
                "Invalid object CID value. Please specify a valid 256-bit hex string.",
            ));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw 32 bytes of the digest
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        // the pattern guarantees 64 hex digits
        hex::decode_to_slice(&self.0[2..], &mut out).expect("validated hex");
        out
    }
}

impl fmt::Display for ObjectCid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve the CID from `--object-cid` or from `reader` when
/// `--object-cid-stdin` is set. Exactly one source must be given.
pub fn read_object_cid<R: Read>(
    object_cid: Option<&str>,
    from_stdin: bool,
    mut reader: R,
) -> Result<ObjectCid, CliError> {
    let value = match (object_cid, from_stdin) {
        (Some(value), false) => value.to_string(),
        (None, true) => {
            let mut buf = String::new();
            reader.read_to_string(&mut buf).map_err(|e| {
                CliError::usage(format!("Failed to read object CID from stdin: {}", e))
            })?;
            buf
        }
        _ => {
            return Err(CliError::usage(
                "You must specify either --object-cid or --object-cid-stdin.",
            ))
        }
    };

    if value.trim().is_empty() {
        return Err(CliError::usage("Undefined object CID value."));
    }

    tracing::debug!(object_cid = %value.trim(), "read object CID");
    ObjectCid::parse(&value)
}
