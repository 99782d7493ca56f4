//! Per-model usage from the vendor's HTTP API.

use serde::Deserialize;
use std::collections::BTreeMap;

use hookswitch_core::{BackendError, BackendResult, ModelUsage};

/// One model entry in the `/api/usage` payload. The payload also carries
/// non-model scalar fields (billing period start and the like); anything
/// that doesn't deserialize as a usage object is skipped.
#[derive(Debug, Deserialize)]
struct RawModelUsage {
    #[serde(rename = "numRequests", default)]
    num_requests: u64,
    #[serde(rename = "maxRequestUsage")]
    max_request_usage: Option<u64>,
}

pub async fn fetch(
    client: &reqwest::Client,
    api_base: &str,
    token: &str,
) -> BackendResult<BTreeMap<String, ModelUsage>> {
    if token.is_empty() {
        return Err(BackendError::Other("no access token stored".into()));
    }

    let url = format!("{}/api/usage", api_base.trim_end_matches('/'));
    let response = client
        .get(&url)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| BackendError::Other(format!("usage request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(BackendError::Other(format!(
            "usage API returned {status}"
        )));
    }

    let raw: BTreeMap<String, serde_json::Value> = response
        .json()
        .await
        .map_err(|e| BackendError::Other(format!("malformed usage payload: {e}")))?;

    let mut per_model = BTreeMap::new();
    for (model, value) in raw {
        if let Ok(usage) = serde_json::from_value::<RawModelUsage>(value) {
            per_model.insert(
                model,
                ModelUsage {
                    used: usage.num_requests,
                    cap: usage.max_request_usage,
                },
            );
        }
    }
    Ok(per_model)
}

// ─── Tests ────────────────────────────────────────────────────────────────
