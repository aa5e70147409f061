//! Commitment service accessed directly through a blockchain node

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ethers::contract::{abigen, parse_log};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Filter, TransactionReceipt, H256, U256};

use crate::cid::ObjectCid;
use crate::crypto;
use crate::error::ClientError;
use crate::models::{CommitmentReceipt, ObjectRecord};

abigen!(
    CommitmentServiceContract,
    r#"[
        function addObject(bytes32 objectCid) external
        function verifyUserObject(address user, bytes32 objectCid, uint256 timestamp) external view returns (bool)
        event AddObject(address indexed user, bytes32 indexed objectCid, uint256 timestamp)
    ]"#
);

const ADD_OBJECT_EVENT: &str = "AddObject(address,bytes32,uint256)";

/// First block scanned for AddObject events
const FIRST_BLOCK: u64 = 0;

/// Commitment service backed by a smart contract reached over JSON-RPC
pub struct NodeCommitmentService {
    provider: Provider<Http>,
    address: Address,
    wallet: Option<LocalWallet>,
}

impl NodeCommitmentService {
    pub fn new(
        rpc_url: &str,
        address: &str,
        private_key: Option<&str>,
    ) -> Result<Self, ClientError> {
        let provider = Provider::<Http>::try_from(rpc_url).map_err(|e| ClientError::Node {
            call: "connect",
            message: format!("invalid node RPC URL {}: {}", rpc_url, e),
        })?;

        let address: Address = address.parse().map_err(|e| ClientError::Node {
            call: "connect",
            message: format!("invalid commitment service address {}: {}", address, e),
        })?;

        let wallet = private_key
            .map(crypto::load_wallet)
            .transpose()
            .map_err(|e| ClientError::Node {
                call: "connect",
                message: e.to_string(),
            })?;

        Ok(Self {
            provider,
            address,
            wallet,
        })
    }

    /// Submit an `addObject` transaction and wait for it to be mined
    pub async fn add_object(&self, cid: &ObjectCid) -> Result<CommitmentReceipt, ClientError> {
        let wallet = self.wallet.clone().ok_or(ClientError::MissingPrivateKey)?;

        let chain_id = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| node_error("eth_chainId", e))?;
        let wallet = wallet.with_chain_id(chain_id.as_u64());

        let client = Arc::new(SignerMiddleware::new(self.provider.clone(), wallet));
        let contract = CommitmentServiceContract::new(self.address, client);

        let call = contract.add_object(cid.to_bytes());
        let pending = call
            .send()
            .await
            .map_err(|e| node_error("addObject", e))?;
        tracing::info!(tx = ?pending.tx_hash(), "addObject transaction sent");

        let receipt = pending
            .await
            .map_err(|e| node_error("addObject", e))?
            .ok_or_else(|| ClientError::Node {
                call: "addObject",
                message: "transaction dropped from mempool".to_string(),
            })?;

        receipt_from_logs(&receipt, Some(chain_id.as_u64()))
    }

    /// Ask the contract whether `user` committed `cid` at `timestamp`
    pub async fn verify_user_object(
        &self,
        user: &str,
        cid: &ObjectCid,
        timestamp: &DateTime<Utc>,
    ) -> Result<bool, ClientError> {
        let user: Address = user.parse().map_err(|e| ClientError::Node {
            call: "verifyUserObject",
            message: format!("invalid user address {}: {}", user, e),
        })?;
        let secs = u64::try_from(timestamp.timestamp()).map_err(|_| ClientError::Node {
            call: "verifyUserObject",
            message: format!("timestamp before the Unix epoch: {}", timestamp),
        })?;

        let provider = Arc::new(self.provider.clone());
        let contract = CommitmentServiceContract::new(self.address, provider);
        contract
            .verify_user_object(user, cid.to_bytes(), U256::from(secs))
            .call()
            .await
            .map_err(|e| node_error("verifyUserObject", e))
    }

    /// Index lookup: every AddObject event recorded for `cid`
    ///
    /// Scans from genesis in a single `eth_getLogs` call. Hosted RPC
    /// providers that cap the block range of log queries will reject it;
    /// use a node without that limit or the forwarder's indexing endpoint.
    pub async fn find_objects(&self, cid: &ObjectCid) -> Result<Vec<ObjectRecord>, ClientError> {
        let filter = Filter::new()
            .address(self.address)
            .event(ADD_OBJECT_EVENT)
            .topic2(H256::from(cid.to_bytes()))
            .from_block(FIRST_BLOCK);

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|e| node_error("eth_getLogs", e))?;
        tracing::debug!(count = logs.len(), "fetched AddObject logs");

        let chain_id = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| node_error("eth_chainId", e))?
            .as_u64();

        logs.into_iter()
            .map(|log| {
                let transaction_hash = log.transaction_hash.map(|h| format!("{:?}", h));
                let event: AddObjectFilter =
                    parse_log(log).map_err(|e| node_error("decode AddObject", e))?;
                Ok(ObjectRecord {
                    user: ethers::utils::to_checksum(&event.user, None),
                    object_cid: format!("0x{}", hex::encode(event.object_cid)),
                    timestamp: to_datetime(event.timestamp)?,
                    transaction_hash,
                    chain_id: Some(chain_id),
                })
            })
            .collect()
    }
}

fn node_error(call: &'static str, err: impl std::fmt::Display) -> ClientError {
    ClientError::Node {
        call,
        message: err.to_string(),
    }
}

fn to_datetime(secs: U256) -> Result<DateTime<Utc>, ClientError> {
    Some(secs)
        .filter(|s| *s <= U256::from(i64::MAX as u64))
        .and_then(|s| DateTime::from_timestamp(s.as_u64() as i64, 0))
        .ok_or_else(|| ClientError::Node {
            call: "decode AddObject",
            message: format!("timestamp out of range: {}", secs),
        })
}

/// Build a receipt from the AddObject event of a mined transaction
fn receipt_from_logs(
    receipt: &TransactionReceipt,
    chain_id: Option<u64>,
) -> Result<CommitmentReceipt, ClientError> {
    let tx_hash = format!("{:?}", receipt.transaction_hash);

    let event = receipt
        .logs
        .iter()
        .find_map(|log| parse_log::<AddObjectFilter>(log.clone()).ok())
        .ok_or_else(|| ClientError::MissingEvent(tx_hash.clone()))?;

    Ok(CommitmentReceipt {
        object_cid: format!("0x{}", hex::encode(event.object_cid)),
        user: ethers::utils::to_checksum(&event.user, None),
        timestamp: to_datetime(event.timestamp)?,
        transaction_hash: Some(tx_hash),
        chain_id,
    })
}
