//! Periodic position sampling while playback runs.

use crate::controller::PlayerView;
use crate::state::PlaybackStateStore;
use core_async::sync::CancellationToken;
use core_async::time::{interval, Duration, MissedTickBehavior};
use parking_lot::Mutex;
use tracing::trace;

/// Copies position and duration from the engine into the state store at a
/// fixed interval.
///
/// At most one loop runs per poller: `start` cancels the previous loop before
/// spawning a new one, and each loop is torn down exactly once, by `stop`,
/// by the next `start`, or by its parent token.
pub struct PositionPoller {
    period: Duration,
    current: Mutex<Option<CancellationToken>>,
}

impl PositionPoller {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            current: Mutex::new(None),
        }
    }

    /// Start sampling `player` into `store`. Does nothing once `parent` is
    /// cancelled.
    pub fn start(&self, player: PlayerView, store: PlaybackStateStore, parent: &CancellationToken) {
        if parent.is_cancelled() {
            return;
        }

        let token = parent.child_token();
        if let Some(previous) = self.current.lock().replace(token.clone()) {
            previous.cancel();
        }

        let period = self.period;
        core_async::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                core_async::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        // Live values: the engine handle never changes but
                        // its position does.
                        let position = player.position_ms();
                        let duration = player.duration_ms().unwrap_or(0);
                        trace!(position, duration, "Position sampled");
                        store.update_position(position, duration);
                    }
                }
            }
        });
    }

    pub fn stop(&self) {
        if let Some(token) = self.current.lock().take() {
            token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }
}

impl Drop for PositionPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
