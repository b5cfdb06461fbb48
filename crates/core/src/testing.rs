//! Test doubles shared by the metadata, strategy and lifecycle tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::classify::RequestDescriptor;
use crate::clock::Clock;
use crate::fetch::{FetchOptions, OriginFetcher};
use crate::{Error, Response};

#[derive(Debug, Clone)]
enum Route {
    Respond(u16, Bytes),
    Fail,
}

#[derive(Debug, Default)]
struct FakeState {
    routes: HashMap<String, Route>,
    calls: Vec<(String, FetchOptions)>,
}

/// Scripted origin fetcher that records every call.
///
/// Unscripted URLs fail with a network error.
#[derive(Debug, Clone, Default)]
pub struct FakeFetcher {
    state: Arc<Mutex<FakeState>>,
}

impl FakeFetcher {
    pub fn respond(&self, url: &str, status: u16, body: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .routes
            .insert(url.to_string(), Route::Respond(status, Bytes::from(body.to_string())));
    }

    pub fn fail(&self, url: &str) {
        self.state.lock().unwrap().routes.insert(url.to_string(), Route::Fail);
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|(u, _)| u == url).count()
    }

    pub fn last_options(&self) -> Option<FetchOptions> {
        self.state.lock().unwrap().calls.last().map(|(_, o)| o.clone())
    }
}

#[async_trait]
impl OriginFetcher for FakeFetcher {
    async fn fetch(&self, request: &RequestDescriptor, options: &FetchOptions) -> Result<Response, Error> {
        let url = request.url().to_string();
        let route = {
            let mut state = self.state.lock().unwrap();
            state.calls.push((url.clone(), options.clone()));
            state.routes.get(&url).cloned()
        };

        match route {
            Some(Route::Respond(status, body)) => Ok(Response::new(url, status, body)),
            Some(Route::Fail) | None => Err(Error::Network(format!("unreachable: {url}"))),
        }
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self { now: Arc::new(AtomicI64::new(now_ms)) }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by_ms: i64) {
        self.now.fetch_add(by_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(1_000);
        let other = clock.clone();
        clock.advance(500);
        assert_eq!(other.now_ms(), 1_500);
        other.set(42);
        assert_eq!(clock.now_ms(), 42);
    }
}
