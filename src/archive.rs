// src/archive.rs
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::fetch::{decode_body, Transport};

pub const AVAILABILITY_ENDPOINT: &str = "http://archive.org/wayback/available";
const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(10);
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Deserialize)]
struct Availability {
    #[serde(default)]
    archived_snapshots: Snapshots,
}

#[derive(Debug, Default, Deserialize)]
struct Snapshots {
    closest: Option<Closest>,
}

#[derive(Debug, Deserialize)]
struct Closest {
    #[serde(default)]
    available: bool,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Clone)]
pub struct ArchivedPage {
    pub body: String,
    pub snapshot_url: String,
}

/// Closest Wayback Machine snapshot for a URL. Total by contract: every
/// failure (network, payload shape, missing or refused snapshot) collapses
/// to `None` so the caller can move on to the fallback tier.
pub async fn snapshot(transport: &dyn Transport, url: &str) -> Option<ArchivedPage> {
    let query = Url::parse_with_params(AVAILABILITY_ENDPOINT, &[("url", url)]).ok()?;
    let resp = match transport.get(query.as_str(), AVAILABILITY_TIMEOUT).await {
        Ok(resp) if (200..300).contains(&resp.status) => resp,
        Ok(resp) => {
            tracing::debug!(url = %url, status = resp.status, "availability query refused");
            return None;
        }
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "availability query failed");
            return None;
        }
    };

    let availability: Availability = serde_json::from_slice(&resp.body).ok()?;
    let closest = availability.archived_snapshots.closest?;
    if !closest.available || closest.url.is_empty() {
        return None;
    }
    tracing::info!(url = %url, snapshot = %closest.url, "archived snapshot found");

    match transport.get(&closest.url, SNAPSHOT_TIMEOUT).await {
        Ok(resp) if (200..300).contains(&resp.status) => Some(ArchivedPage {
            body: decode_body(&resp.body, resp.content_type.as_deref()),
            snapshot_url: closest.url,
        }),
        Ok(resp) => {
            tracing::debug!(snapshot = %closest.url, status = resp.status, "snapshot fetch refused");
            None
        }
        Err(e) => {
            tracing::debug!(snapshot = %closest.url, error = %e, "snapshot fetch failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchError, RawResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CannedTransport {
        availability: Result<RawResponse, FetchError>,
        snapshot: Option<Result<RawResponse, FetchError>>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn get(&self, url: &str, _timeout: Duration) -> Result<RawResponse, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            if url.starts_with(AVAILABILITY_ENDPOINT) {
                return clone_result(&self.availability);
            }
            clone_result(self.snapshot.as_ref().expect("unexpected snapshot fetch"))
        }
    }

    fn clone_result(r: &Result<RawResponse, FetchError>) -> Result<RawResponse, FetchError> {
        match r {
            Ok(resp) => Ok(resp.clone()),
            Err(FetchError::Http { status }) => Err(FetchError::Http { status: *status }),
            Err(FetchError::Timeout) => Err(FetchError::Timeout),
            Err(FetchError::Network(msg)) => Err(FetchError::Network(msg.clone())),
        }
    }

    fn json_response(body: &str) -> RawResponse {
        RawResponse {
            status: 200,
            final_url: AVAILABILITY_ENDPOINT.to_string(),
            content_type: Some("application/json".into()),
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn returns_the_decoded_snapshot() {
        let transport = CannedTransport {
            availability: Ok(json_response(
                r#"{"archived_snapshots": {"closest": {"available": true,
                    "url": "http://web.archive.org/web/2024/https://x.example/a"}}}"#,
            )),
            snapshot: Some(Ok(RawResponse {
                status: 200,
                final_url: "http://web.archive.org/web/2024/https://x.example/a".into(),
                content_type: Some("text/html; charset=utf-8".into()),
                body: b"<html><body>archived copy</body></html>".to_vec(),
            })),
            requested: Mutex::new(Vec::new()),
        };
        let page = snapshot(&transport, "https://x.example/a").await.unwrap();
        assert!(page.body.contains("archived copy"));
        assert!(page.snapshot_url.starts_with("http://web.archive.org/"));
        // the availability query carries the URL encoded as a query parameter
        let requested = transport.requested.lock().unwrap();
        assert!(requested[0].contains("url=https%3A%2F%2Fx.example%2Fa"));
    }

    #[tokio::test]
    async fn unavailable_snapshot_is_none() {
        let transport = CannedTransport {
            availability: Ok(json_response(
                r#"{"archived_snapshots": {"closest": {"available": false, "url": "http://web.archive.org/x"}}}"#,
            )),
            snapshot: None,
            requested: Mutex::new(Vec::new()),
        };
        assert!(snapshot(&transport, "https://x.example/a").await.is_none());
    }

    #[tokio::test]
    async fn empty_payload_is_none() {
        let transport = CannedTransport {
            availability: Ok(json_response(r#"{"archived_snapshots": {}}"#)),
            snapshot: None,
            requested: Mutex::new(Vec::new()),
        };
        assert!(snapshot(&transport, "https://x.example/a").await.is_none());
    }

    #[tokio::test]
    async fn network_failure_is_none() {
        let transport = CannedTransport {
            availability: Err(FetchError::Timeout),
            snapshot: None,
            requested: Mutex::new(Vec::new()),
        };
        assert!(snapshot(&transport, "https://x.example/a").await.is_none());
    }

    #[tokio::test]
    async fn refused_snapshot_fetch_is_none() {
        let transport = CannedTransport {
            availability: Ok(json_response(
                r#"{"archived_snapshots": {"closest": {"available": true, "url": "http://web.archive.org/x"}}}"#,
            )),
            snapshot: Some(Ok(RawResponse {
                status: 404,
                final_url: "http://web.archive.org/x".into(),
                content_type: None,
                body: Vec::new(),
            })),
            requested: Mutex::new(Vec::new()),
        };
        assert!(snapshot(&transport, "https://x.example/a").await.is_none());
    }
}
