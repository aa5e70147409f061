//! Error types for the vBase CLI

use std::process::ExitCode;

/// Errors that end a command with a specific exit status.
///
/// Everything else travels as a plain `anyhow::Error` and exits with status 1.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Bad input or an incomplete option combination.
    #[error("{0}")]
    Usage(String),

    /// The commitment could not be verified against the requested timestamp.
    #[error("{0}")]
    VerificationFailed(String),
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        CliError::Usage(msg.into())
    }

    /// Process exit status, following the usage-error convention of 2.
    pub fn status(&self) -> u8 {
        match self {
            CliError::Usage(_) => 2,
            CliError::VerificationFailed(_) => 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.status())
    }
}

/// Errors from the commitment service adapters.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    /// Forwarder returned a non-2xx status.
    #[error("forwarder {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Response body did not match the expected shape.
    #[error("failed to decode response from {endpoint}")]
    Decode {
        endpoint: String,
        source: reqwest::Error,
    },

    /// Client could not be set up from the given settings.
    #[error("configuration error: {0}")]
    Config(String),

    /// Node RPC or contract call failed.
    #[error("node call {call} failed: {message}")]
    Node { call: &'static str, message: String },

    /// A write was attempted without a signing key.
    #[error("a private key is required to add objects")]
    MissingPrivateKey,

    /// The mined transaction carried no AddObject event.
    #[error("transaction {0} emitted no AddObject event")]
    MissingEvent(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::usage("bad").status(), 2);
        assert_eq!(CliError::VerificationFailed("nope".into()).status(), 1);
    }

    #[test]
    fn test_usage_message_is_verbatim() {
        let err = CliError::usage("Undefined object CID value.");
        assert_eq!(err.to_string(), "Undefined object CID value.");
    }
}
