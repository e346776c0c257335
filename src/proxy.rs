//! Upstream proxy (spec §4.8): after settlement, HOSTED services return a
//! stored content blob; PROXY services get a forwarded HTTP call. Failures
//! here are reported with the settlement evidence already in hand — the
//! caller paid either way, so it must be able to tell paid-but-undelivered
//! apart from unpaid-refused.

use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

use crate::store::models::ServiceKind;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(20);

pub struct ProxyRequest<'a> {
    pub method: Method,
    pub endpoint: &'a str,
    pub payer: &'a str,
    pub tx_hash: &'a str,
    pub body: Option<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Dispatches a settled call to its fulfillment surface and returns the
/// reply envelope with `txHash` not yet merged in — the caller inserts it.
///
/// HOSTED services return their stored content parsed and nested under a
/// `content` key (spec §8 S1: `{content:{x:42}, txHash:…}`). PROXY services
/// get forwarded with a small explicit header set (`X-402-Payer`,
/// `X-402-TxHash`); their JSON response is merged at the top level
/// (spec §4.8/S5: `{…upstream JSON…, txHash:…}`), falling back to a
/// `response` wrapper if the upstream body isn't a JSON object. The call is
/// not retried (at-most-once), matching spec §4.8.
pub async fn fulfill(
    client: &reqwest::Client,
    kind: ServiceKind,
    hosted_content: Option<&str>,
    request: ProxyRequest<'_>,
) -> Result<Value, ProxyError> {
    match kind {
        ServiceKind::Hosted => {
            let content = match hosted_content {
                Some(raw) => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
                None => Value::Null,
            };
            Ok(serde_json::json!({ "content": content }))
        }
        ServiceKind::Proxy => {
            let mut builder = client
                .request(request.method, request.endpoint)
                .timeout(UPSTREAM_TIMEOUT)
                .header("X-402-Payer", request.payer)
                .header("X-402-TxHash", request.tx_hash);
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }
            let response = builder.send().await?;
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            Ok(match body {
                Value::Object(_) => body,
                other => serde_json::json!({ "response": other }),
            })
        }
        ServiceKind::Native => unreachable!("the gateway router rejects NATIVE services before fulfillment"),
    }
}
