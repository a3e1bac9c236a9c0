//! HTTP/JSON stats provider.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::TokioIo;
use serde_json::Value;
use tracing::debug;

use warpstat_core::config::ProviderConfig;
use warpstat_core::{ProviderError, ProviderFuture, StatsDocument, StatsProvider};

/// Reads stats and topology documents from an HTTP endpoint.
///
/// Timeouts are left to the caller; every request is a fresh connection.
#[derive(Debug, Clone)]
pub struct HttpStatsProvider {
    address: String,
    stats_path: String,
    topology_path: String,
    connect_path: String,
}

impl HttpStatsProvider {
    pub fn new(
        address: impl Into<String>,
        stats_path: impl Into<String>,
        topology_path: impl Into<String>,
        connect_path: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            stats_path: stats_path.into(),
            topology_path: topology_path.into(),
            connect_path: connect_path.into(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(
            config.address.clone(),
            config.stats_path.clone(),
            config.topology_path.clone(),
            config.connect_path.clone(),
        )
    }

    /// GET `path` and return the body of a 2xx response.
    async fn get(&self, path: &str) -> Result<Bytes, ProviderError> {
        let uri = format!("http://{}{path}", self.address);

        let stream = tokio::net::TcpStream::connect(&self.address)
            .await
            .map_err(|e| ProviderError::Connect(e.to_string()))?;

        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| ProviderError::Connect(e.to_string()))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = http::Request::builder()
            .method("GET")
            .uri(&uri)
            .header("host", self.address.as_str())
            .header("accept", "application/json")
            .header("user-agent", "warpstat/0.1")
            .body(Empty::<Bytes>::new())
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NOT_IMPLEMENTED {
            debug!(%status, %uri, "provider endpoint unsupported");
            return Err(ProviderError::Unsupported);
        }
        if !status.is_success() {
            debug!(%status, %uri, "provider non-2xx");
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?
            .to_bytes();
        Ok(body)
    }

    async fn get_json(&self, path: &str) -> Result<Value, ProviderError> {
        let body = self.get(path).await?;
        serde_json::from_slice(&body).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

impl StatsProvider for HttpStatsProvider {
    fn target(&self) -> &str {
        &self.address
    }

    fn connect(&self) -> ProviderFuture<'_, ()> {
        Box::pin(async move {
            self.get(&self.connect_path).await?;
            Ok(())
        })
    }

    fn fetch_stats(&self) -> ProviderFuture<'_, StatsDocument> {
        Box::pin(async move {
            let doc = self.get_json(&self.stats_path).await?;
            StatsDocument::from_value(doc)
        })
    }

    fn fetch_topology(&self) -> ProviderFuture<'_, Value> {
        Box::pin(async move { self.get_json(&self.topology_path).await })
    }
}
