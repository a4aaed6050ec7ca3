//! Poll cadence and the latest-record source
//!
//! The display learns about scans only by asking the server for its latest
//! record on a fixed cadence. [`ticks`] yields that cadence as a stream; a
//! [`LatestSource`] answers each tick.

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reqwest::header::CACHE_CONTROL;
use reqwest::StatusCode;
use rollcall_common::time::now_millis;
use serde_json::Value;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tracing::debug;

use crate::error::{DisplayError, Result};

/// Default poll cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Default per-request timeout for the read endpoint
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// One poll trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Zero-based sequence number within this stream
    pub seq: u64,
    pub at: Instant,
}

/// Infinite tick stream, first tick immediately
///
/// Ticks missed while a slow cycle runs are skipped rather than bursted, so
/// cycles never queue up behind a slow server. Calling again starts a fresh
/// stream. A zero interval is raised to one millisecond.
pub fn ticks(interval: Duration) -> impl Stream<Item = Tick> + Unpin {
    let mut timer = tokio::time::interval(interval.max(Duration::from_millis(1)));
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    IntervalStream::new(timer)
        .enumerate()
        .map(|(seq, at)| Tick { seq: seq as u64, at })
}

/// Where the latest record comes from
#[async_trait]
pub trait LatestSource: Send + Sync {
    /// The raw response body, or `None` when there are no records yet
    async fn fetch_latest(&self) -> Result<Option<Value>>;
}

/// `GET {server}/attendance/latest` over HTTP
pub struct HttpLatestSource {
    http_client: reqwest::Client,
    url: String,
}

impl HttpLatestSource {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            url: format!("{}/attendance/latest", server_url.trim_end_matches('/')),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LatestSource for HttpLatestSource {
    async fn fetch_latest(&self) -> Result<Option<Value>> {
        // Cache-busting query plus no-cache: every poll must reach the server
        let response = self
            .http_client
            .get(&self.url)
            .query(&[("t", now_millis())])
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!("No attendance records yet");
            return Ok(None);
        }

        if !status.is_success() {
            return Err(DisplayError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let value = serde_json::from_slice(&body).map_err(|e| DisplayError::Decode(e.to_string()))?;
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_are_sequenced_and_spaced() {
        let interval = Duration::from_millis(300);
        let start = Instant::now();
        let mut stream = ticks(interval);

        let first = stream.next().await.unwrap();
        let second = stream.next().await.unwrap();
        let third = stream.next().await.unwrap();

        assert_eq!((first.seq, second.seq, third.seq), (0, 1, 2));
        assert_eq!(first.at, start);
        assert_eq!(second.at - first.at, interval);
        assert_eq!(third.at - second.at, interval);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_skip_missed() {
        let interval = Duration::from_millis(300);
        let mut stream = ticks(interval);
        stream.next().await.unwrap();

        // A slow cycle spanning several periods
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let late = stream.next().await.unwrap();
        let next = stream.next().await.unwrap();

        assert_eq!(late.seq, 1);
        // Skip realigns to the schedule instead of firing back-to-back
        assert!(next.at - late.at >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_does_not_panic() {
        let mut stream = ticks(Duration::ZERO);
        let first = stream.next().await.unwrap();
        let second = stream.next().await.unwrap();
        assert_eq!(second.at - first.at, Duration::from_millis(1));
    }

    #[test]
    fn test_http_source_url_normalized() {
        let source = HttpLatestSource::new("http://localhost:10246/", DEFAULT_REQUEST_TIMEOUT).unwrap();
        assert_eq!(source.url(), "http://localhost:10246/attendance/latest");
    }
}
