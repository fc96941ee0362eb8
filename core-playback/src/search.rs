//! Search flow state.

use crate::item::{ItemResult, PlayableItem};
use crate::repository::MusicRepository;
use core_async::sync::watch;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_MIN_QUERY_LENGTH: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchPhase {
    #[default]
    Initial,
    Searching,
    Success,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchState {
    pub query: String,
    pub results: Vec<PlayableItem>,
    pub phase: SearchPhase,
    pub error: Option<String>,
}

impl SearchState {
    fn from_results(query: String, results: Vec<ItemResult>) -> Self {
        let mut items = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(item) => items.push(item),
                Err(e) => {
                    first_error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        match first_error {
            Some(error) if items.is_empty() => Self {
                query,
                results: Vec::new(),
                phase: SearchPhase::Error,
                error: Some(error),
            },
            _ => Self {
                query,
                results: items,
                phase: SearchPhase::Success,
                error: None,
            },
        }
    }
}

/// Observable search state over a [`MusicRepository`].
///
/// Only the most recent search publishes its outcome; an older search that
/// finishes late is discarded.
#[derive(Clone)]
pub struct SearchStateStore {
    repository: Arc<dyn MusicRepository>,
    min_query_length: usize,
    sender: Arc<watch::Sender<SearchState>>,
    latest: Arc<AtomicU64>,
}

impl SearchStateStore {
    pub fn new(repository: Arc<dyn MusicRepository>) -> Self {
        let (sender, _) = watch::channel(SearchState::default());
        Self {
            repository,
            min_query_length: DEFAULT_MIN_QUERY_LENGTH,
            sender: Arc::new(sender),
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_min_query_length(mut self, length: usize) -> Self {
        self.min_query_length = length;
        self
    }

    pub fn state(&self) -> SearchState {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.sender.subscribe()
    }

    /// Run a search and publish its outcome. Queries shorter than the
    /// minimum length reset the state without touching the repository.
    pub async fn search(&self, query: &str) -> SearchState {
        let query = query.trim().to_string();
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        if query.chars().count() < self.min_query_length {
            let state = SearchState {
                query,
                ..Default::default()
            };
            self.sender.send_replace(state.clone());
            return state;
        }

        self.sender.send_replace(SearchState {
            query: query.clone(),
            phase: SearchPhase::Searching,
            ..Default::default()
        });

        let results = self.repository.search(&query).await;
        let state = SearchState::from_results(query, results);

        if self.latest.load(Ordering::SeqCst) == ticket {
            self.sender.send_replace(state.clone());
        } else {
            debug!(query = %state.query, "Discarding results of a superseded search");
        }
        state
    }

    pub fn reset(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
        self.sender.send_replace(SearchState::default());
    }
}
