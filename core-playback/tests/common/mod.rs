//! In-memory fakes of the host capabilities shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::content::{
    AudioStream, ContentResolver, InfoType, ResolverOptions, SearchResult, StreamInfo,
};
use bridge_traits::engine::{
    EngineEvent, EngineEvents, EngineListener, EngineState, MediaItem, PlaybackEngine,
};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use core_async::sync::Notify;
use core_async::time::{sleep, timeout, Duration};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const TRACK_DURATION_MS: u64 = 200_000;

/// Audio URL the fake resolver hands out for a page URI.
pub fn stream_url(page_uri: &str) -> String {
    format!("https://cdn.test/audio?src={page_uri}")
}

pub fn watch_uri(id: &str) -> String {
    format!("https://music.youtube.com/watch?v={id}")
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn wait_for(what: &str, mut condition: impl FnMut() -> bool) {
    let polled = timeout(Duration::from_secs(2), async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for {what}");
}

/// Let spawned tasks run to completion of their current work.
pub async fn settle() {
    for _ in 0..20 {
        core_async::task::yield_now().await;
    }
    sleep(Duration::from_millis(20)).await;
}

// ----------------------------------------------------------------------
// Engine
// ----------------------------------------------------------------------

#[derive(Debug)]
struct EngineModel {
    items: Vec<MediaItem>,
    index: Option<usize>,
    state: EngineState,
    play_when_ready: bool,
    position_ms: u64,
    duration_ms: Option<u64>,
    error: Option<String>,
    released: bool,
}

impl EngineModel {
    fn is_playing(&self) -> bool {
        self.state == EngineState::Ready && self.play_when_ready && self.error.is_none()
    }
}

/// Single-threaded media player model. Every mutation reports the events a
/// real player would, computed from the before/after state.
pub struct FakeEngine {
    model: Mutex<EngineModel>,
    listener: Mutex<Option<Arc<dyn EngineListener>>>,
    seeks: Mutex<Vec<u64>>,
    calls: Mutex<Vec<&'static str>>,
    after_duration_read: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            model: Mutex::new(EngineModel {
                items: Vec::new(),
                index: None,
                state: EngineState::Idle,
                play_when_ready: false,
                position_ms: 0,
                duration_ms: None,
                error: None,
                released: false,
            }),
            listener: Mutex::new(None),
            seeks: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            after_duration_read: Mutex::new(None),
        })
    }

    fn mutate(
        &self,
        call: &'static str,
        events: &[EngineEvent],
        change: impl FnOnce(&mut EngineModel),
    ) {
        self.calls.lock().push(call);
        let batch = {
            let mut model = self.model.lock();
            let was_playing = model.is_playing();
            let previous_state = model.state;
            change(&mut model);

            let mut batch: EngineEvents = events.iter().copied().collect();
            if model.is_playing() != was_playing {
                batch.insert(EngineEvent::IsPlayingChanged);
            }
            if model.state != previous_state {
                batch.insert(EngineEvent::PlaybackStateChanged);
            }
            batch
        };

        if batch.is_empty() {
            return;
        }
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener.on_events(batch);
        }
    }

    /// Run `hook` right after the next `duration_ms` read returns its value.
    /// A snapshot reads the duration last, so the hook lands mid-projection.
    pub fn on_next_duration_read(&self, hook: impl FnOnce() + Send + 'static) {
        *self.after_duration_read.lock() = Some(Box::new(hook));
    }

    pub fn set_duration(&self, duration_ms: Option<u64>) {
        self.mutate("set_duration", &[EngineEvent::TimelineChanged], |model| {
            model.duration_ms = duration_ms;
        });
    }

    /// Advance the playhead without reporting an event, as playback does.
    pub fn advance(&self, position_ms: u64) {
        self.model.lock().position_ms = position_ms;
    }

    /// Simulate a fatal playback error.
    pub fn fail(&self, message: &str) {
        self.mutate("fail", &[EngineEvent::PlayerError], |model| {
            model.error = Some(message.to_string());
            model.state = EngineState::Idle;
        });
    }

    /// Simulate the current item reaching its end.
    pub fn finish(&self) {
        self.mutate("finish", &[], |model| model.state = EngineState::Ended);
    }

    pub fn queue_uris(&self) -> Vec<String> {
        self.model
            .lock()
            .items
            .iter()
            .filter_map(|item| item.uri.clone())
            .collect()
    }

    pub fn is_playing_now(&self) -> bool {
        self.model.lock().is_playing()
    }

    pub fn current_index_now(&self) -> Option<usize> {
        self.model.lock().index
    }

    pub fn seeks(&self) -> Vec<u64> {
        self.seeks.lock().clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    pub fn has_listener(&self) -> bool {
        self.listener.lock().is_some()
    }

    pub fn is_released(&self) -> bool {
        self.model.lock().released
    }
}

impl PlaybackEngine for FakeEngine {
    fn set_listener(&self, listener: Option<Arc<dyn EngineListener>>) {
        *self.listener.lock() = listener;
    }

    fn set_media_items(&self, items: Vec<MediaItem>) {
        self.mutate(
            "set_media_items",
            &[EngineEvent::TimelineChanged, EngineEvent::MediaItemTransition],
            |model| {
                model.index = if items.is_empty() { None } else { Some(0) };
                model.items = items;
                model.position_ms = 0;
                model.state = EngineState::Idle;
            },
        );
    }

    fn add_media_items(&self, index: Option<usize>, items: Vec<MediaItem>) {
        self.mutate("add_media_items", &[EngineEvent::TimelineChanged], |model| {
            let count = items.len();
            let at = index.unwrap_or(model.items.len()).min(model.items.len());
            model.items.splice(at..at, items);
            model.index = match model.index {
                Some(current) if at <= current => Some(current + count),
                Some(current) => Some(current),
                None if !model.items.is_empty() => Some(0),
                None => None,
            };
        });
    }

    fn clear_media_items(&self) {
        self.mutate("clear_media_items", &[EngineEvent::TimelineChanged], |model| {
            model.items.clear();
            model.index = None;
            model.position_ms = 0;
            model.state = EngineState::Idle;
        });
    }

    fn prepare(&self) {
        self.mutate("prepare", &[], |model| {
            model.error = None;
            model.state = if model.items.is_empty() {
                EngineState::Ended
            } else {
                EngineState::Ready
            };
            if model.duration_ms.is_none() && !model.items.is_empty() {
                model.duration_ms = Some(TRACK_DURATION_MS);
            }
        });
    }

    fn play(&self) {
        self.mutate("play", &[EngineEvent::PlayWhenReadyChanged], |model| {
            model.play_when_ready = true;
        });
    }

    fn pause(&self) {
        self.mutate("pause", &[EngineEvent::PlayWhenReadyChanged], |model| {
            model.play_when_ready = false;
        });
    }

    fn stop(&self) {
        self.mutate("stop", &[], |model| model.state = EngineState::Idle);
    }

    fn seek_to(&self, position_ms: u64) {
        self.seeks.lock().push(position_ms);
        self.mutate("seek_to", &[EngineEvent::PositionDiscontinuity], |model| {
            model.position_ms = position_ms;
        });
    }

    fn seek_to_next(&self) {
        self.mutate("seek_to_next", &[EngineEvent::MediaItemTransition], |model| {
            if let Some(current) = model.index {
                if current + 1 < model.items.len() {
                    model.index = Some(current + 1);
                    model.position_ms = 0;
                }
            }
        });
    }

    fn seek_to_previous(&self) {
        self.mutate(
            "seek_to_previous",
            &[EngineEvent::MediaItemTransition],
            |model| {
                if let Some(current) = model.index {
                    model.index = Some(current.saturating_sub(1));
                    model.position_ms = 0;
                }
            },
        );
    }

    fn seek_to_item(&self, index: usize) {
        self.mutate("seek_to_item", &[EngineEvent::MediaItemTransition], |model| {
            if index < model.items.len() {
                model.index = Some(index);
                model.position_ms = 0;
            }
        });
    }

    fn release(&self) {
        self.calls.lock().push("release");
        self.model.lock().released = true;
    }

    fn media_items(&self) -> Vec<MediaItem> {
        self.model.lock().items.clone()
    }

    fn current_index(&self) -> Option<usize> {
        self.model.lock().index
    }

    fn position_ms(&self) -> u64 {
        self.model.lock().position_ms
    }

    fn duration_ms(&self) -> Option<u64> {
        let duration = self.model.lock().duration_ms;
        let hook = self.after_duration_read.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        duration
    }

    fn playback_state(&self) -> EngineState {
        self.model.lock().state
    }

    fn play_when_ready(&self) -> bool {
        self.model.lock().play_when_ready
    }

    fn is_playing(&self) -> bool {
        self.model.lock().is_playing()
    }

    fn player_error(&self) -> Option<String> {
        self.model.lock().error.clone()
    }
}

// ----------------------------------------------------------------------
// Content resolver
// ----------------------------------------------------------------------

/// Resolver over fixed tables. Unknown URIs fail with `NotFound`.
#[derive(Default)]
pub struct FakeResolver {
    streams: Mutex<HashMap<String, StreamInfo>>,
    playlists: Mutex<HashMap<String, Vec<StreamInfo>>>,
    related: Mutex<HashMap<String, Vec<StreamInfo>>>,
    searches: Mutex<HashMap<String, Vec<SearchResult>>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    failing_search: Mutex<HashSet<String>>,
    init_calls: AtomicUsize,
    init_failures_left: AtomicUsize,
    resolve_calls: AtomicUsize,
}

impl FakeResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a resolvable stream page titled `title`.
    pub fn add_stream(&self, uri: &str, title: &str) {
        let info = StreamInfo::new(uri, title)
            .with_uploader("Artist - Topic")
            .with_thumbnail(format!("{uri}/small.jpg"))
            .with_thumbnail(format!("{uri}/large.jpg"))
            .with_duration_ms(TRACK_DURATION_MS)
            .with_audio_stream(AudioStream::new(stream_url(uri)));
        self.streams.lock().insert(uri.to_string(), info);
    }

    pub fn insert_stream(&self, info: StreamInfo) {
        self.streams.lock().insert(info.url.clone(), info);
    }

    /// Register a playlist page listing `entries`. Entries resolve only if
    /// registered with [`FakeResolver::add_stream`].
    pub fn add_playlist(&self, uri: &str, entries: &[String]) {
        self.playlists
            .lock()
            .insert(uri.to_string(), listing(entries));
    }

    pub fn add_related(&self, mix_uri: &str, entries: &[String]) {
        self.related
            .lock()
            .insert(mix_uri.to_string(), listing(entries));
    }

    pub fn add_search(&self, query: &str, hits: &[(&str, &str)]) {
        let results = hits
            .iter()
            .map(|(uri, title)| SearchResult {
                url: uri.to_string(),
                name: title.to_string(),
                uploader_name: Some("Searcher".to_string()),
                info_type: InfoType::Stream,
                thumbnails: vec![format!("{uri}/thumb.jpg")],
                duration_ms: Some(TRACK_DURATION_MS),
            })
            .collect();
        self.searches.lock().insert(query.to_string(), results);
    }

    pub fn fail_search(&self, query: &str) {
        self.failing_search.lock().insert(query.to_string());
    }

    /// Hold `resolve_stream(uri)` until the returned gate is notified.
    pub fn gate(&self, uri: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(uri.to_string(), gate.clone());
        gate
    }

    pub fn fail_next_inits(&self, count: usize) {
        self.init_failures_left.store(count, Ordering::SeqCst);
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

fn listing(entries: &[String]) -> Vec<StreamInfo> {
    entries
        .iter()
        .map(|uri| StreamInfo::new(uri.clone(), format!("entry {uri}")))
        .collect()
}

#[async_trait]
impl ContentResolver for FakeResolver {
    async fn initialize(&self, _options: &ResolverOptions) -> BridgeResult<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        let failures = self.init_failures_left.load(Ordering::SeqCst);
        if failures > 0 {
            self.init_failures_left.store(failures - 1, Ordering::SeqCst);
            return Err(BridgeError::OperationFailed("init failed".to_string()));
        }
        Ok(())
    }

    async fn resolve_stream(&self, uri: &str) -> BridgeResult<StreamInfo> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().get(uri).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.streams
            .lock()
            .get(uri)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(uri.to_string()))
    }

    async fn resolve_playlist(&self, uri: &str) -> BridgeResult<Vec<StreamInfo>> {
        self.playlists
            .lock()
            .get(uri)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(uri.to_string()))
    }

    async fn resolve_related(&self, uri: &str) -> BridgeResult<Vec<StreamInfo>> {
        self.related
            .lock()
            .get(uri)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(uri.to_string()))
    }

    async fn search(&self, query: &str) -> BridgeResult<Vec<SearchResult>> {
        if self.failing_search.lock().contains(query) {
            return Err(BridgeError::OperationFailed("search backend down".to_string()));
        }
        Ok(self.searches.lock().get(query).cloned().unwrap_or_default())
    }
}

// ----------------------------------------------------------------------
// Events
// ----------------------------------------------------------------------

/// Next playback event matching `matches`, skipping everything else.
pub async fn expect_event(
    events: &mut core_async::sync::broadcast::Receiver<core_runtime::events::CoreEvent>,
    mut matches: impl FnMut(&core_runtime::events::PlaybackEvent) -> bool,
) -> core_runtime::events::PlaybackEvent {
    use core_runtime::events::CoreEvent;

    let found = timeout(Duration::from_secs(2), async {
        loop {
            match events.recv().await {
                Ok(CoreEvent::Playback(event)) if matches(&event) => return event,
                Ok(_) => continue,
                Err(e) => panic!("event bus failed: {e}"),
            }
        }
    })
    .await;
    found.expect("timed out waiting for playback event")
}
