//! Test doubles shared by the pipeline tests.

use crate::error::{PipelineError, Result};
use crate::http::FetchBytes;
use bytes::Bytes;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{Instant, sleep};

#[derive(Debug, Clone)]
enum Route {
    Ok(Vec<Bytes>),
    Status(StatusCode),
}

/// A scripted web: fixed responses per URL, optional latency, and a call log.
///
/// Unknown URLs answer 404. A route with several bodies serves them in turn
/// and then keeps repeating the last one.
#[derive(Debug)]
pub(crate) struct FakeWeb {
    routes: HashMap<String, Route>,
    latency: HashMap<String, Duration>,
    hits: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<(String, Instant)>>,
    started: Instant,
}

impl FakeWeb {
    pub(crate) fn new() -> Self {
        Self {
            routes: HashMap::new(),
            latency: HashMap::new(),
            hits: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            started: Instant::now(),
        }
    }

    pub(crate) fn page(self, url: &str, body: impl Into<Bytes>) -> Self {
        self.bodies(url, vec![body.into()])
    }

    pub(crate) fn bodies(mut self, url: &str, bodies: Vec<Bytes>) -> Self {
        self.routes.insert(url.to_string(), Route::Ok(bodies));
        self
    }

    pub(crate) fn status(mut self, url: &str, status: u16) -> Self {
        let status = StatusCode::from_u16(status).unwrap();
        self.routes.insert(url.to_string(), Route::Status(status));
        self
    }

    pub(crate) fn latency(mut self, url: &str, delay: Duration) -> Self {
        self.latency.insert(url.to_string(), delay);
        self
    }

    /// Every fetched URL with its start time relative to construction.
    pub(crate) fn calls(&self) -> Vec<(String, Duration)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, at)| (url.clone(), at.duration_since(self.started)))
            .collect()
    }

    pub(crate) fn call_count(&self, url: &str) -> usize {
        self.calls().iter().filter(|(u, _)| u == url).count()
    }
}

impl FetchBytes for FakeWeb {
    async fn fetch_bytes(&self, url: &str) -> Result<Bytes> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));
        let hit = {
            let mut hits = self.hits.lock().unwrap();
            let count = hits.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count - 1
        };

        if let Some(delay) = self.latency.get(url) {
            sleep(*delay).await;
        }

        let not_found = || PipelineError::Status {
            url: url.to_string(),
            status: StatusCode::NOT_FOUND,
        };
        match self.routes.get(url) {
            Some(Route::Ok(bodies)) => bodies
                .get(hit.min(bodies.len().saturating_sub(1)))
                .cloned()
                .ok_or_else(not_found),
            Some(Route::Status(status)) => Err(PipelineError::Status {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(not_found()),
        }
    }
}
