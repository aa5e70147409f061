//! Cryptographic utilities for EIP-191 signing and verification

use anyhow::{Context, Result};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Signature;

use crate::cid::ObjectCid;

/// Parse a hex private key, with or without the `0x` prefix
pub fn load_wallet(private_key: &str) -> Result<LocalWallet> {
    private_key
        .trim()
        .trim_start_matches("0x")
        .parse::<LocalWallet>()
        .context("Invalid private key format")
}

/// Address controlled by a private key, checksummed
pub fn address_of(private_key: &str) -> Result<String> {
    let wallet = load_wallet(private_key)?;
    Ok(ethers::utils::to_checksum(&wallet.address(), None))
}

/// Sign the raw CID bytes with EIP-191 personal sign.
///
/// Returns the signer's checksummed address and the 65-byte signature as hex.
pub async fn sign_object_cid(cid: &ObjectCid, private_key: &str) -> Result<(String, String)> {
    let wallet = load_wallet(private_key)?;

    let signature: Signature = wallet
        .sign_message(cid.to_bytes())
        .await
        .context("Failed to sign object CID")?;

    Ok((
        ethers::utils::to_checksum(&wallet.address(), None),
        format!("0x{}", hex::encode(signature.to_vec())),
    ))
}

#[cfg(test)]
/// Verify an EIP-191 signature over a CID
pub(crate) fn verify_signature(
    cid: &ObjectCid,
    signature: &str,
    expected_address: &str,
) -> Result<bool> {
    let sig_bytes = hex::decode(signature.trim_start_matches("0x"))
        .context("Invalid signature format")?;
    let signature: Signature = sig_bytes
        .as_slice()
        .try_into()
        .context("Invalid signature length")?;

    let expected: ethers::types::Address = expected_address
        .parse()
        .context("Invalid address format")?;

    Ok(signature.verify(cid.to_bytes().as_slice(), expected).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    // well-known development account #0
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const CID: &str = "0x0a247bc6e60fd864fee095dc892f5c5ae155db244e2f91097de4279240033749";

    #[test]
    fn test_address_of() {
        assert_eq!(address_of(DEV_KEY).unwrap(), DEV_ADDRESS);
        assert_eq!(address_of(&DEV_KEY[2..]).unwrap(), DEV_ADDRESS);
    }

    #[test]
    fn test_bad_private_key() {
        assert!(load_wallet("0x1234").is_err());
        assert!(load_wallet("not a key").is_err());
    }

    #[tokio::test]
    async fn test_sign_and_verify() {
        let cid = ObjectCid::parse(CID).unwrap();
        let (address, signature) = sign_object_cid(&cid, DEV_KEY).await.unwrap();

        assert_eq!(address, DEV_ADDRESS);
        assert_eq!(signature.len(), 2 + 130);
        assert!(verify_signature(&cid, &signature, DEV_ADDRESS).unwrap());

        let other = ObjectCid::parse(&format!("0x{:064x}", 1)).unwrap();
        assert!(!verify_signature(&other, &signature, DEV_ADDRESS).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_signature() {
        let cid = ObjectCid::parse(CID).unwrap();
        assert!(verify_signature(&cid, "0xzz", DEV_ADDRESS).is_err());
        assert!(verify_signature(&cid, "0x1234", DEV_ADDRESS).is_err());
    }
}
