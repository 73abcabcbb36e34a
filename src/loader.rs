use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::data::{self, RepositoryService};
use crate::github::{FetchError, RepositoryItem};

#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    Loading,
    Error(String),
    Ready(Vec<RepositoryItem>),
}

impl FetchState {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }
}

struct PendingFetch {
    request_id: u64,
    cancel_flag: Arc<AtomicBool>,
}

struct FetchResponse {
    request_id: u64,
    identity: String,
    result: Result<Vec<RepositoryItem>, FetchError>,
}

/// Fetches the repository listing for one watched identity at a time.
///
/// Every trigger takes a fresh request id. A response is applied only when its
/// id matches the pending request, so a slow answer for an identity that has
/// since been replaced is dropped on arrival.
pub struct RepoLoader {
    service: Arc<dyn RepositoryService + Send + Sync>,
    identity: Option<String>,
    state: FetchState,
    next_request_id: u64,
    pending: Option<PendingFetch>,
    response_tx: Sender<FetchResponse>,
    response_rx: Receiver<FetchResponse>,
}

impl RepoLoader {
    pub fn new(service: Arc<dyn RepositoryService + Send + Sync>) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            service,
            identity: None,
            state: FetchState::Loading,
            next_request_id: 1,
            pending: None,
            response_tx,
            response_rx,
        }
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Starts a fetch when `identity` differs from the watched one. Returns
    /// whether a fetch was triggered.
    pub fn watch(&mut self, identity: &str) -> bool {
        let identity = identity.trim();
        if self.identity.as_deref() == Some(identity) {
            return false;
        }
        self.identity = Some(identity.to_string());
        self.start();
        true
    }

    /// Fetches the watched identity again after a failure.
    pub fn retry(&mut self) -> bool {
        if !matches!(self.state, FetchState::Error(_)) || self.identity.is_none() {
            return false;
        }
        self.start();
        true
    }

    fn start(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel_flag.store(true, Ordering::SeqCst);
        }

        let identity = self.identity.clone().unwrap_or_default();
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.state = FetchState::Loading;

        if identity.is_empty() {
            warn!(request_id, "no identity to fetch repositories for");
            self.state = FetchState::Error(FetchError::MissingIdentity.to_string());
            return;
        }

        let cancel_flag = Arc::new(AtomicBool::new(false));
        self.pending = Some(PendingFetch {
            request_id,
            cancel_flag: cancel_flag.clone(),
        });
        debug!(request_id, identity = %identity, "fetching repositories");

        let tx = self.response_tx.clone();
        let service = self.service.clone();
        thread::spawn(move || {
            if cancel_flag.load(Ordering::SeqCst) {
                return;
            }
            let result = service.list_repositories(&identity);
            let _ = tx.send(FetchResponse {
                request_id,
                identity,
                result,
            });
        });
    }

    /// Applies any responses that have arrived. Never blocks.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(response) = self.response_rx.try_recv() {
            changed |= self.handle_response(response);
        }
        changed
    }

    /// Blocks until the current fetch settles or `timeout` passes. Returns
    /// whether the state left `Loading`.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_loading() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.response_rx.recv_timeout(remaining) {
                Ok(response) => {
                    self.handle_response(response);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        !self.is_loading()
    }

    fn handle_response(&mut self, response: FetchResponse) -> bool {
        let Some(pending) = &self.pending else {
            debug!(request_id = response.request_id, "dropping response with nothing pending");
            return false;
        };
        if pending.request_id != response.request_id {
            debug!(
                request_id = response.request_id,
                current = pending.request_id,
                identity = %response.identity,
                "dropping stale repository response"
            );
            return false;
        }
        self.pending = None;

        self.state = match response.result {
            Ok(items) => {
                let fetched = items.len();
                let ranked = data::filter_and_rank(items);
                info!(
                    identity = %response.identity,
                    fetched,
                    shown = ranked.len(),
                    "repositories loaded"
                );
                FetchState::Ready(ranked)
            }
            Err(err) => {
                warn!(identity = %response.identity, error = %err, "repository fetch failed");
                FetchState::Error(err.to_string())
            }
        };
        true
    }
}
