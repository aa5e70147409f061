//! Commitment service accessed through the vBase forwarder API
//!
//! Endpoints, relative to the forwarder URL:
//! - `POST commitment-service/add-object`
//! - `GET  commitment-service/verify-user-object`
//! - `GET  indexing-service/find-objects`
//!
//! Every request carries the API key in the `X-API-KEY` header.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cid::ObjectCid;
use crate::crypto;
use crate::error::ClientError;
use crate::models::{CommitmentReceipt, ObjectRecord, VerifyResponse};

const API_KEY_HEADER: &str = "x-api-key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Body of an add-object request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddObjectRequest<'a> {
    object_cid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
}

/// Commitment service reached through the forwarder REST API
pub struct ForwarderCommitmentService {
    client: reqwest::Client,
    base_url: String,
    private_key: Option<String>,
}

impl ForwarderCommitmentService {
    pub fn new(
        forwarder_url: &str,
        api_key: &str,
        private_key: Option<&str>,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::HeaderName::from_static(API_KEY_HEADER),
                    reqwest::header::HeaderValue::from_str(api_key)
                        .map_err(|_| ClientError::Config("invalid API key characters".into()))?,
                );
                headers
            })
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        if let Some(key) = private_key {
            crypto::load_wallet(key).map_err(|e| ClientError::Config(e.to_string()))?;
        }

        Ok(Self {
            client,
            base_url: forwarder_url.trim_end_matches('/').to_string(),
            private_key: private_key.map(String::from),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Commit `cid`; signed with the private key when one is configured
    pub async fn add_object(&self, cid: &ObjectCid) -> Result<CommitmentReceipt, ClientError> {
        let (user, signature) = match &self.private_key {
            Some(key) => {
                let (address, sig) = crypto::sign_object_cid(cid, key)
                    .await
                    .map_err(|e| ClientError::Config(e.to_string()))?;
                (Some(address), Some(sig))
            }
            None => (None, None),
        };

        let endpoint = self.endpoint("commitment-service/add-object");
        let body = AddObjectRequest {
            object_cid: cid.as_str(),
            user,
            signature,
        };

        self.send_json(self.client.post(&endpoint).json(&body), &endpoint)
            .await
    }

    pub async fn verify_user_object(
        &self,
        user: &str,
        cid: &ObjectCid,
        timestamp: &DateTime<Utc>,
    ) -> Result<bool, ClientError> {
        let endpoint = self.endpoint("commitment-service/verify-user-object");
        let request = self.client.get(&endpoint).query(&[
            ("user", user.to_string()),
            ("objectCid", cid.to_string()),
            ("timestamp", timestamp.timestamp().to_string()),
        ]);

        let response: VerifyResponse = self.send_json(request, &endpoint).await?;
        Ok(response.verified)
    }

    pub async fn find_objects(&self, cid: &ObjectCid) -> Result<Vec<ObjectRecord>, ClientError> {
        let endpoint = self.endpoint("indexing-service/find-objects");
        let request = self
            .client
            .get(&endpoint)
            .query(&[("objectCid", cid.as_str())]);

        self.send_json(request, &endpoint).await
    }

    /// Send a request and decode a JSON body, mapping HTTP failures
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<T, ClientError> {
        tracing::debug!(endpoint, "forwarder request");

        let response = request.send().await.map_err(|source| ClientError::Http {
            endpoint: endpoint.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|source| ClientError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CID: &str = "0x0a247bc6e60fd864fee095dc892f5c5ae155db244e2f91097de4279240033749";
    const USER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn cid() -> ObjectCid {
        ObjectCid::parse(CID).unwrap()
    }

    #[tokio::test]
    async fn test_add_object_without_key() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/commitment-service/add-object"))
            .and(header("X-API-KEY", "test-api-key"))
            .and(body_partial_json(serde_json::json!({ "objectCid": CID })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "objectCid": CID,
                "user": USER,
                "timestamp": 1_700_000_000,
                "transactionHash": "0xfeed",
                "chainId": 84532
            })))
            .expect(1)
            .mount(&server)
            .await;

        // trailing slash on the base URL is tolerated
        let service =
            ForwarderCommitmentService::new(&format!("{}/", server.uri()), "test-api-key", None)
                .unwrap();
        let receipt = service.add_object(&cid()).await.unwrap();

        assert_eq!(receipt.object_cid, CID);
        assert_eq!(receipt.user, USER);
        assert_eq!(receipt.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(receipt.chain_id, Some(84532));
    }

    #[tokio::test]
    async fn test_add_object_signs_with_private_key() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/commitment-service/add-object"))
            .and(body_partial_json(serde_json::json!({ "objectCid": CID, "user": USER })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "objectCid": CID,
                "user": USER,
                "timestamp": "2023-11-14 22:13:20+00:00"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service =
            ForwarderCommitmentService::new(&server.uri(), "test-api-key", Some(DEV_KEY)).unwrap();
        service.add_object(&cid()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let signature = body["signature"].as_str().unwrap();
        assert!(crypto::verify_signature(&cid(), signature, USER).unwrap());
    }

    #[tokio::test]
    async fn test_verify_user_object() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/commitment-service/verify-user-object"))
            .and(query_param("user", USER))
            .and(query_param("objectCid", CID))
            .and(query_param("timestamp", "1700000000"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "verified": true })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let service = ForwarderCommitmentService::new(&server.uri(), "test-api-key", None).unwrap();
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert!(service.verify_user_object(USER, &cid(), &ts).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_objects() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/indexing-service/find-objects"))
            .and(query_param("objectCid", CID))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "user": USER, "objectCid": CID, "timestamp": 1_700_000_000 },
                { "user": USER, "objectCid": CID, "timestamp": "2023-11-15T00:00:00Z" }
            ])))
            .mount(&server)
            .await;

        let service = ForwarderCommitmentService::new(&server.uri(), "test-api-key", None).unwrap();
        let records = service.find_objects(&cid()).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].timestamp.timestamp(), 1_700_006_400);
    }

    #[tokio::test]
    async fn test_api_error_carries_status_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/indexing-service/find-objects"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad api key"))
            .mount(&server)
            .await;

        let service = ForwarderCommitmentService::new(&server.uri(), "wrong", None).unwrap();
        let err = service.find_objects(&cid()).await.unwrap_err();

        match err {
            ClientError::Api { status, body, .. } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad api key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/commitment-service/verify-user-object"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let service = ForwarderCommitmentService::new(&server.uri(), "test-api-key", None).unwrap();
        let ts = DateTime::from_timestamp(0, 0).unwrap();
        let err = service.verify_user_object(USER, &cid(), &ts).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_transport_error_chain_printed_once() {
        let uri = {
            let server = MockServer::start().await;
            server.uri()
        };

        let service = ForwarderCommitmentService::new(&uri, "test-api-key", None).unwrap();
        let err = service.find_objects(&cid()).await.unwrap_err();
        assert!(matches!(err, ClientError::Http { .. }));

        let chain = format!("{:#}", anyhow::Error::new(err));
        assert!(chain.starts_with("HTTP error calling "));
        assert_eq!(chain.matches("error sending request").count(), 1);
    }

    #[test]
    fn test_new_rejects_bad_inputs() {
        assert!(ForwarderCommitmentService::new("http://localhost", "bad\nkey", None).is_err());
        assert!(ForwarderCommitmentService::new("http://localhost", "key", Some("0x12")).is_err());
    }
}
