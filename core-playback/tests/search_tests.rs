//! Integration tests for the SearchStateStore

use async_trait::async_trait;
use bridge_traits::content::InfoType;
use core_async::sync::Notify;
use core_async::time::{sleep, timeout, Duration};
use core_playback::{
    ItemResult, MusicRepository, PlayableItem, PlaybackError, SearchPhase, SearchStateStore,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Search-only repository with canned answers and optional gates.
#[derive(Default)]
struct CannedRepository {
    answers: Mutex<HashMap<String, Vec<ItemResult>>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    searches: AtomicUsize,
}

impl CannedRepository {
    fn answer(&self, query: &str, results: Vec<ItemResult>) {
        self.answers.lock().insert(query.to_string(), results);
    }

    fn gate(&self, query: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(query.to_string(), gate.clone());
        gate
    }
}

#[async_trait]
impl MusicRepository for CannedRepository {
    async fn load_media_uri(&self, _uri: &str) -> ItemResult {
        Err(PlaybackError::Offline)
    }

    async fn load_playlist_uri(&self, _uri: &str) -> Vec<ItemResult> {
        Vec::new()
    }

    async fn load_auto_playlist_uri(&self, _uri: &str) -> Vec<ItemResult> {
        Vec::new()
    }

    async fn search(&self, query: &str) -> Vec<ItemResult> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().get(query).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        // ItemResult is not Clone; rebuild from the stored answers.
        self.answers
            .lock()
            .get(query)
            .map(|results| {
                results
                    .iter()
                    .map(|result| match result {
                        Ok(item) => Ok(item.clone()),
                        Err(e) => Err(PlaybackError::Resolution {
                            uri: query.to_string(),
                            message: e.to_string(),
                        }),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn song(title: &str) -> PlayableItem {
    PlayableItem::new(title, InfoType::Stream).with_media_uri(format!("https://m.test/{title}"))
}

fn store(repository: &Arc<CannedRepository>) -> SearchStateStore {
    SearchStateStore::new(repository.clone())
}

#[tokio::test]
async fn test_short_query_resets_without_searching() {
    let repository = Arc::new(CannedRepository::default());
    let store = store(&repository);

    let state = store.search(" a ").await;

    assert_eq!(state.phase, SearchPhase::Initial);
    assert_eq!(state.query, "a");
    assert!(state.results.is_empty());
    assert_eq!(repository.searches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_successful_search_publishes_results() {
    let repository = Arc::new(CannedRepository::default());
    repository.answer("lofi", vec![Ok(song("one")), Ok(song("two"))]);
    let store = store(&repository);
    let mut updates = store.subscribe();

    let state = store.search("lofi").await;

    assert_eq!(state.phase, SearchPhase::Success);
    assert_eq!(state.results.len(), 2);
    assert_eq!(store.state(), state);
    assert!(updates.has_changed().unwrap());
    assert_eq!(updates.borrow_and_update().phase, SearchPhase::Success);
}

#[tokio::test]
async fn test_partial_failures_keep_successes() {
    let repository = Arc::new(CannedRepository::default());
    repository.answer(
        "mixed",
        vec![Ok(song("one")), Err(PlaybackError::Offline), Ok(song("two"))],
    );
    let store = store(&repository);

    let state = store.search("mixed").await;

    assert_eq!(state.phase, SearchPhase::Success);
    assert_eq!(state.results, vec![song("one"), song("two")]);
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn test_all_failures_become_error() {
    let repository = Arc::new(CannedRepository::default());
    repository.answer("down", vec![Err(PlaybackError::Offline)]);
    let store = store(&repository);

    let state = store.search("down").await;

    assert_eq!(state.phase, SearchPhase::Error);
    assert!(state.results.is_empty());
    assert!(state.error.unwrap().contains("down"));
}

#[tokio::test]
async fn test_empty_result_is_success() {
    let repository = Arc::new(CannedRepository::default());
    let store = store(&repository);

    let state = store.search("nothing").await;

    assert_eq!(state.phase, SearchPhase::Success);
    assert!(state.results.is_empty());
}

#[tokio::test]
async fn test_searching_phase_is_visible_while_pending() {
    let repository = Arc::new(CannedRepository::default());
    repository.answer("slow", vec![Ok(song("late"))]);
    let gate = repository.gate("slow");
    let store = store(&repository);

    let pending = core_async::spawn({
        let store = store.clone();
        async move { store.search("slow").await }
    });

    let mut updates = store.subscribe();
    let searching = timeout(
        Duration::from_secs(2),
        updates.wait_for(|state| state.phase == SearchPhase::Searching),
    )
    .await;
    assert!(searching.is_ok());
    // Release the watch::Ref read guard before the store publishes again.
    drop(searching);

    gate.notify_one();
    let state = pending.await.unwrap();
    assert_eq!(state.phase, SearchPhase::Success);
    assert_eq!(store.state().results, vec![song("late")]);
}

#[tokio::test]
async fn test_stale_search_does_not_overwrite_newer() {
    let repository = Arc::new(CannedRepository::default());
    repository.answer("old query", vec![Ok(song("old"))]);
    repository.answer("new query", vec![Ok(song("new"))]);
    let gate = repository.gate("old query");
    let store = store(&repository);

    let stale = core_async::spawn({
        let store = store.clone();
        async move { store.search("old query").await }
    });
    while repository.searches.load(Ordering::SeqCst) == 0 {
        sleep(Duration::from_millis(1)).await;
    }

    store.search("new query").await;
    gate.notify_one();
    let stale_state = stale.await.unwrap();

    assert_eq!(stale_state.results, vec![song("old")]);
    let current = store.state();
    assert_eq!(current.query, "new query");
    assert_eq!(current.results, vec![song("new")]);
}

#[tokio::test]
async fn test_custom_minimum_length_and_reset() {
    let repository = Arc::new(CannedRepository::default());
    repository.answer("abc", vec![Ok(song("abc"))]);
    let store = store(&repository).with_min_query_length(4);

    assert_eq!(store.search("abc").await.phase, SearchPhase::Initial);
    assert_eq!(repository.searches.load(Ordering::SeqCst), 0);

    let store = SearchStateStore::new(repository.clone()).with_min_query_length(1);
    assert_eq!(store.search("abc").await.phase, SearchPhase::Success);
    store.reset();
    assert_eq!(store.state().phase, SearchPhase::Initial);
}
