//! Jito block-engine JSON-RPC client (`sendBundle`, `getInflightBundleStatuses`)

use super::{classify_rejection, RelayBundleStatus, RelayClient};
use crate::constants::RELAY_BUNDLES_PATH;
use crate::errors::{BundlerError, BundlerResult};
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Bundle id reported when `sendBundle` timed out before returning one
pub const UNKNOWN_BUNDLE_ID: &str = "unknown";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<serde_json::Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct InflightStatuses {
    value: Vec<InflightStatus>,
}

#[derive(Debug, Deserialize)]
struct InflightStatus {
    bundle_id: String,
    status: String,
    landed_slot: Option<u64>,
}

pub struct JitoRelay {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl JitoRelay {
    pub fn new(relay_url: &str) -> BundlerResult<Self> {
        Self::with_timeout(relay_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(relay_url: &str, timeout: Duration) -> BundlerResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BundlerError::RelayTransport(format!("client build error: {}", e)))?;
        Ok(Self {
            http,
            endpoint: format!("{}{}", relay_url.trim_end_matches('/'), RELAY_BUNDLES_PATH),
            timeout,
        })
    }

    /// A `sendBundle` that times out may still have been accepted, so it
    /// surfaces as `RelayTimeout` rather than a transport error.
    fn transport_error(&self, method: &str, e: reqwest::Error) -> BundlerError {
        if e.is_timeout() && method == "sendBundle" {
            logger::error(
                LogTag::Relay,
                &format!(
                    "sendBundle got no answer within {}s; the bundle may still land",
                    self.timeout.as_secs()
                ),
            );
            return BundlerError::RelayTimeout {
                bundle_id: UNKNOWN_BUNDLE_ID.to_string(),
                seconds: self.timeout.as_secs(),
            };
        }
        BundlerError::RelayTransport(format!("{}: {}", method, e))
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> BundlerResult<RpcResponse> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(method, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(method, e))?;

        // Rejections arrive either as HTTP errors or as JSON-RPC errors
        match serde_json::from_str::<RpcResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(classify_rejection(&format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            ))),
            Err(e) => Err(BundlerError::RelayTransport(format!(
                "{}: unparseable response: {}",
                method, e
            ))),
        }
    }
}

fn parse_send_response(response: RpcResponse) -> BundlerResult<String> {
    if let Some(error) = response.error {
        return Err(classify_rejection(&format!(
            "{} (code {})",
            error.message, error.code
        )));
    }
    response
        .result
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .ok_or_else(|| BundlerError::RelayTransport("sendBundle returned no bundle id".to_string()))
}

fn parse_status_response(
    bundle_id: &str,
    response: RpcResponse,
) -> BundlerResult<Option<RelayBundleStatus>> {
    if let Some(error) = response.error {
        return Err(BundlerError::RelayTransport(format!(
            "getInflightBundleStatuses: {} (code {})",
            error.message, error.code
        )));
    }
    let Some(result) = response.result else {
        return Ok(None);
    };
    let statuses: InflightStatuses = serde_json::from_value(result)?;

    Ok(statuses
        .value
        .into_iter()
        .find(|s| s.bundle_id == bundle_id)
        .map(|s| match s.status.as_str() {
            "Landed" => RelayBundleStatus::Landed {
                slot: s.landed_slot,
            },
            "Failed" => RelayBundleStatus::Failed,
            "Invalid" => RelayBundleStatus::Invalid,
            "Pending" => RelayBundleStatus::Pending,
            other => {
                logger::warning(
                    LogTag::Relay,
                    &format!(
                        "Unrecognised status '{}' for bundle {}, treating it as pending",
                        other, bundle_id
                    ),
                );
                RelayBundleStatus::Pending
            }
        }))
}

#[async_trait]
impl RelayClient for JitoRelay {
    async fn send_bundle(&self, encoded_transactions: Vec<String>) -> BundlerResult<String> {
        let count = encoded_transactions.len();
        let params = serde_json::json!([encoded_transactions, { "encoding": "base64" }]);
        let bundle_id = parse_send_response(self.call("sendBundle", params).await?)?;
        logger::debug(
            LogTag::Relay,
            &format!("sendBundle accepted {} transactions as {}", count, bundle_id),
        );
        Ok(bundle_id)
    }

    async fn bundle_status(&self, bundle_id: &str) -> BundlerResult<Option<RelayBundleStatus>> {
        let params = serde_json::json!([[bundle_id]]);
        let response = self.call("getInflightBundleStatuses", params).await?;
        parse_status_response(bundle_id, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RejectionKind;

    fn response(json: &str) -> RpcResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_send_response_bundle_id() {
        let id = parse_send_response(response(
            r#"{"jsonrpc":"2.0","result":"b1a2c3","id":1}"#,
        ))
        .unwrap();
        assert_eq!(id, "b1a2c3");
    }

    #[test]
    fn test_send_response_no_leader() {
        let err = parse_send_response(response(
            r#"{"jsonrpc":"2.0","error":{"code":-32000,"message":"Bundle Dropped, no connected leader up soon"},"id":1}"#,
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            BundlerError::RelayRejected {
                kind: RejectionKind::NoLeader,
                ..
            }
        ));
    }

    #[test]
    fn test_status_response_mapping() {
        let json = r#"{"jsonrpc":"2.0","result":{"context":{"slot":280999999},"value":[
            {"bundle_id":"abc","status":"Landed","landed_slot":281000000},
            {"bundle_id":"def","status":"Pending","landed_slot":null}
        ]},"id":1}"#;
        assert_eq!(
            parse_status_response("abc", response(json)).unwrap(),
            Some(RelayBundleStatus::Landed {
                slot: Some(281000000)
            })
        );
        assert_eq!(
            parse_status_response("def", response(json)).unwrap(),
            Some(RelayBundleStatus::Pending)
        );
        assert_eq!(parse_status_response("zzz", response(json)).unwrap(), None);
    }

    #[test]
    fn test_unrecognised_status_stays_pending() {
        let json = r#"{"jsonrpc":"2.0","result":{"context":{"slot":1},"value":[
            {"bundle_id":"abc","status":"Processing","landed_slot":null}
        ]},"id":1}"#;
        assert_eq!(
            parse_status_response("abc", response(json)).unwrap(),
            Some(RelayBundleStatus::Pending)
        );
    }

    /// Relay pointed at a listener that accepts connections and never
    /// writes a byte back
    fn silent_relay() -> JitoRelay {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming().flatten() {
                held.push(stream);
            }
        });
        JitoRelay::with_timeout(&format!("http://{}", addr), Duration::from_millis(300)).unwrap()
    }

    #[tokio::test]
    async fn test_unanswered_send_is_relay_timeout() {
        let relay = silent_relay();
        let err = relay
            .send_bundle(vec!["AQ==".to_string()])
            .await
            .unwrap_err();

        match &err {
            BundlerError::RelayTimeout { bundle_id, .. } => assert_eq!(bundle_id, UNKNOWN_BUNDLE_ID),
            other => panic!("expected RelayTimeout, got {:?}", other),
        }
        assert!(err.is_outcome_unknown());
        assert!(!err.is_operator_retryable());
    }

    #[tokio::test]
    async fn test_unanswered_status_poll_is_transport_error() {
        let relay = silent_relay();
        let err = relay.bundle_status("abc").await.unwrap_err();
        assert!(matches!(err, BundlerError::RelayTransport(_)));
    }

    #[test]
    fn test_endpoint_path() {
        let relay = JitoRelay::new("https://mainnet.block-engine.jito.wtf/").unwrap();
        assert_eq!(
            relay.endpoint,
            "https://mainnet.block-engine.jito.wtf/api/v1/bundles"
        );
    }
}
