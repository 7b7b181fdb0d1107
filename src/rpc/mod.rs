use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Proxy};
use serde::Deserialize;
use serde_json::{json, Value};
use solana_client::rpc_config::{RpcSignaturesForAddressConfig, RpcTransactionConfig};
use solana_transaction_status::UiTransactionEncoding;
use std::time::Duration;
use tracing::{debug, info, trace};
use crate::error::{RpcError, TrackerError};

/// 每次调用的固定超时
pub const RPC_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RpcSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub use_proxy: bool,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
}

/// One entry of `getSignaturesForAddress`.
///
/// `err` stays raw JSON so that error variants newer than our solana crates
/// do not break decoding of the whole page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    #[serde(default)]
    pub slot: u64,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

impl SignatureInfo {
    pub fn is_failed(&self) -> bool {
        self.err.as_ref().map_or(false, |e| !e.is_null())
    }
}

/// The node calls the tracker needs.
#[async_trait]
pub trait SolanaRpc: Send + Sync {
    async fn get_signatures_for_address(
        &self,
        address: &str,
        config: RpcSignaturesForAddressConfig,
    ) -> Result<Vec<SignatureInfo>, RpcError>;

    /// `Ok(None)` when the node does not know the signature.
    async fn get_transaction(&self, signature: &str) -> Result<Option<Value>, RpcError>;
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// JSON-RPC 2.0 over HTTP(S). One attempt per call, no retry.
pub struct RpcClient {
    http: Client,
    url: String,
}

impl RpcClient {
    pub fn new(settings: &RpcSettings) -> Result<Self, TrackerError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = settings.api_key.as_deref().filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| TrackerError::Config(format!("invalid API key: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(RPC_TIMEOUT);

        if settings.use_proxy {
            if let Some(url) = settings.http_proxy.as_deref() {
                builder = builder.proxy(Proxy::http(url).map_err(proxy_err)?);
            }
            if let Some(url) = settings.https_proxy.as_deref() {
                builder = builder.proxy(Proxy::https(url).map_err(proxy_err)?);
            }
        }

        let http = builder
            .build()
            .map_err(|e| TrackerError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(RpcClient {
            http,
            url: settings.url.clone(),
        })
    }

    /// Sends one request and returns the `result` member (possibly `null`).
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        info!("Sending RPC request: {}", method);
        debug!("Request params: {}", params);

        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self.http.post(&self.url).json(&payload).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RpcError::Status {
                status: status.as_u16(),
                body,
            });
        }
        trace!("RPC response: {}", body);

        let envelope: JsonRpcResponse = serde_json::from_str(&body)
            .map_err(|e| RpcError::InvalidResponse(format!("{}: {}", e, body)))?;
        if let Some(err) = envelope.error {
            return Err(RpcError::Node {
                code: err.code,
                message: err.message,
            });
        }
        Ok(envelope.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl SolanaRpc for RpcClient {
    async fn get_signatures_for_address(
        &self,
        address: &str,
        config: RpcSignaturesForAddressConfig,
    ) -> Result<Vec<SignatureInfo>, RpcError> {
        let params = json!([address, config]);
        let result = self.call("getSignaturesForAddress", params).await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        Vec::<SignatureInfo>::deserialize(&result)
            .map_err(|e| RpcError::InvalidResponse(format!("signature list: {}", e)))
    }

    async fn get_transaction(&self, signature: &str) -> Result<Option<Value>, RpcError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            max_supported_transaction_version: Some(0),
            ..RpcTransactionConfig::default()
        };
        let result = self.call("getTransaction", json!([signature, config])).await?;
        Ok(match result {
            Value::Null => None,
            tx => Some(tx),
        })
    }
}

fn proxy_err(e: reqwest::Error) -> TrackerError {
    TrackerError::Config(format!("invalid proxy URL: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn settings(url: String) -> RpcSettings {
        RpcSettings {
            url,
            api_key: None,
            use_proxy: false,
            http_proxy: None,
            https_proxy: None,
        }
    }

    #[tokio::test]
    async fn test_call_sends_bearer_and_returns_result() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("authorization", "Bearer secret")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "jsonrpc": "2.0",
                "method": "getSlot"
            })))
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":42}"#)
            .create_async()
            .await;

        let mut s = settings(server.url());
        s.api_key = Some("secret".to_string());
        let client = RpcClient::new(&s).unwrap();
        let result = client.call("getSlot", json!([])).await.unwrap();
        assert_eq!(result, json!(42));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_2xx_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let client = RpcClient::new(&settings(server.url())).unwrap();
        match client.call("getSlot", json!([])).await {
            Err(RpcError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_json_and_node_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"method": "broken"})))
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"method": "failing"})))
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"Invalid param"}}"#)
            .create_async()
            .await;

        let client = RpcClient::new(&settings(server.url())).unwrap();
        assert!(matches!(
            client.call("broken", json!([])).await,
            Err(RpcError::InvalidResponse(_))
        ));
        assert!(matches!(
            client.call("failing", json!([])).await,
            Err(RpcError::Node { code: -32602, .. })
        ));
    }

    #[tokio::test]
    async fn test_get_transaction_params_and_null() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({"method": "getTransaction"})),
                Matcher::Regex(r#""params":\["sig1""#.to_string()),
                Matcher::Regex(r#""encoding":"jsonParsed""#.to_string()),
                Matcher::Regex(r#""maxSupportedTransactionVersion":0"#.to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":null}"#)
            .create_async()
            .await;

        let client = RpcClient::new(&settings(server.url())).unwrap();
        assert_eq!(client.get_transaction("sig1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_signatures_decodes_entries() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({"method": "getSignaturesForAddress"})),
                Matcher::Regex(r#""params":\["wallet""#.to_string()),
                Matcher::Regex(r#""limit":100"#.to_string()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,"result":[
                    {"signature":"a","slot":10,"err":null,"memo":null,"blockTime":1700000000,"confirmationStatus":"finalized"},
                    {"signature":"b","slot":9,"err":{"SomeFutureError":{}},"memo":null,"blockTime":null}
                ]}"#,
            )
            .create_async()
            .await;

        let client = RpcClient::new(&settings(server.url())).unwrap();
        let config = RpcSignaturesForAddressConfig {
            limit: Some(100),
            ..Default::default()
        };
        let sigs = client.get_signatures_for_address("wallet", config).await.unwrap();
        assert_eq!(sigs.len(), 2);
        assert!(!sigs[0].is_failed());
        assert!(sigs[1].is_failed());
        assert_eq!(sigs[0].block_time, Some(1_700_000_000));
    }

    #[test]
    fn test_invalid_proxy_is_config_error() {
        let mut s = settings("http://localhost".to_string());
        s.use_proxy = true;
        s.http_proxy = Some("http://proxy.local:99999".to_string());
        assert!(matches!(RpcClient::new(&s), Err(TrackerError::Config(_))));
    }
}
