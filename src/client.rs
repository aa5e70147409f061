//! vBase client: one entry point over the node and forwarder services

use chrono::{DateTime, Utc};

use crate::cid::ObjectCid;
use crate::config::ServiceTarget;
use crate::error::ClientError;
use crate::forwarder::ForwarderCommitmentService;
use crate::models::{CommitmentReceipt, ObjectRecord};
use crate::node::NodeCommitmentService;

/// The commitment service a command talks to
pub enum CommitmentService {
    Node(NodeCommitmentService),
    Forwarder(ForwarderCommitmentService),
}

/// Client for object commitments, verification and index lookups
pub struct VBaseClient {
    service: CommitmentService,
}

impl VBaseClient {
    pub fn new(service: CommitmentService) -> Self {
        Self { service }
    }

    /// Connect to whichever service the resolved settings select
    pub fn from_target(target: &ServiceTarget) -> Result<Self, ClientError> {
        let service = match target {
            ServiceTarget::Node {
                rpc_url,
                address,
                private_key,
            } => CommitmentService::Node(NodeCommitmentService::new(
                rpc_url,
                address,
                private_key.as_deref(),
            )?),
            ServiceTarget::Forwarder {
                url,
                api_key,
                private_key,
            } => CommitmentService::Forwarder(ForwarderCommitmentService::new(
                url,
                api_key,
                private_key.as_deref(),
            )?),
        };
        tracing::info!(service = %target.describe(), "commitment service configured");
        Ok(Self::new(service))
    }

    pub async fn add_object(&self, cid: &ObjectCid) -> Result<CommitmentReceipt, ClientError> {
        match &self.service {
            CommitmentService::Node(node) => node.add_object(cid).await,
            CommitmentService::Forwarder(fwd) => fwd.add_object(cid).await,
        }
    }

    pub async fn verify_user_object(
        &self,
        user: &str,
        cid: &ObjectCid,
        timestamp: &DateTime<Utc>,
    ) -> Result<bool, ClientError> {
        match &self.service {
            CommitmentService::Node(node) => node.verify_user_object(user, cid, timestamp).await,
            CommitmentService::Forwarder(fwd) => fwd.verify_user_object(user, cid, timestamp).await,
        }
    }

    /// Indexing service lookup of all commitments to `cid`
    pub async fn find_objects(&self, cid: &ObjectCid) -> Result<Vec<ObjectRecord>, ClientError> {
        match &self.service {
            CommitmentService::Node(node) => node.find_objects(cid).await,
            CommitmentService::Forwarder(fwd) => fwd.find_objects(cid).await,
        }
    }
}
