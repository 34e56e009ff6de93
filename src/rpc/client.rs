// Bilateral payment-channel node core.
// Written in 2024 by
//     Dr. Maxim Orlovsky <orlovsky@pandoracore.com>
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the MIT License
// along with this software.
// If not, see <https://opensource.org/licenses/MIT>.

//! A minimal synchronous JSON-RPC 2.0 client, used both to reach a peer's
//! channel RPC server and to reach the chain node's wallet RPC.
//!
//! Mirrors the reference implementation's `jsonrpcproxy.Proxy`/`AuthProxy`:
//! a bare URL, an auto-incrementing request id, and an optional HTTP basic
//! auth pair, with every call blocking for the response.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum RpcError {
    /// transport error talking to {0}: {1}
    Transport(String, String),

    /// server returned malformed JSON-RPC response
    MalformedResponse,

    /// server-side RPC error {code}: {message}
    Remote { code: i64, message: String },
}

/// Blocking JSON-RPC 2.0 client over HTTP, one per remote endpoint.
pub struct RpcClient {
    url: String,
    auth: Option<(String, String)>,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> RpcClient {
        RpcClient { url: url.into(), auth: None, next_id: AtomicU64::new(0) }
    }

    pub fn with_auth(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> RpcClient {
        RpcClient {
            url: url.into(),
            auth: Some((username.into(), password.into())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Calls `method` with `params`, blocking until the response arrives,
    /// and deserializes the `result` field into `T`.
    pub fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let payload = serde_json::json!({
            "method": method,
            "params": params,
            "id": id,
            "jsonrpc": "2.0",
        });

        let mut request = ureq::post(&self.url)
            .set("content-type", "application/json");
        if let Some((user, pass)) = &self.auth {
            let credentials = base64::encode(format!("{}:{}", user, pass));
            request = request.set(
                "authorization",
                &format!("Basic {}", credentials),
            );
        }

        let response = request
            .send_string(&payload.to_string())
            .map_err(|err| RpcError::Transport(self.url.clone(), err.to_string()))?;
        let body: Value = response
            .into_json()
            .map_err(|_| RpcError::MalformedResponse)?;

        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(-1);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_owned();
            return Err(RpcError::Remote { code, message });
        }

        let result = body.get("result").ok_or(RpcError::MalformedResponse)?;
        serde_json::from_value(result.clone())
            .map_err(|_| RpcError::MalformedResponse)
    }
}
