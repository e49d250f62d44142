use std::collections::HashMap;

use crossbeam_channel::{Receiver, Sender, unbounded};
use render_protocol::{DataSourceHandle, LayerId, LoadingState, LoadingStateChange};
use serde::{Deserialize, Serialize};
use spatial::Extent;
use tracing::{debug, warn};

/// Closed time interval in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: i64,
    pub end: i64,
}

impl TimeInterval {
    pub fn instant(at: i64) -> Self {
        Self { start: at, end: at }
    }
}

/// Data request for one visible layer. The renderer never waits for the
/// response; results come back through
/// [`GridViewRenderer::deliver_features`](crate::GridViewRenderer::deliver_features).
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub layer: LayerId,
    pub source: DataSourceHandle,
    pub time: Option<TimeInterval>,
    pub extent: Extent,
    pub projection: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("server rejected the request: {0}")]
    Server(String),
    #[error("request produced no features")]
    EmptyResult,
}

#[derive(Debug, Default)]
struct LayerLoading {
    pending_tiles: u32,
    state: LoadingState,
}

/// Per-layer loading state derived from tile and feature events.
#[derive(Debug, Default)]
pub struct LoadingTracker {
    layers: HashMap<LayerId, LayerLoading>,
    subscribers: Vec<Sender<LoadingStateChange>>,
}

impl LoadingTracker {
    pub fn state(&self, layer: LayerId) -> LoadingState {
        self.layers
            .get(&layer)
            .map_or(LoadingState::Ok, |loading| loading.state)
    }

    pub fn subscribe(&mut self) -> Receiver<LoadingStateChange> {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        receiver
    }

    pub fn tile_load_start(&mut self, layer: LayerId) {
        let loading = self.layers.entry(layer).or_default();
        loading.pending_tiles += 1;
        self.set_state(layer, LoadingState::Loading);
    }

    pub fn tile_load_end(&mut self, layer: LayerId) {
        let loading = self.layers.entry(layer).or_default();
        loading.pending_tiles = loading.pending_tiles.saturating_sub(1);
        if loading.pending_tiles == 0 {
            self.set_state(layer, LoadingState::Ok);
        }
    }

    pub fn tile_load_error(&mut self, layer: LayerId) {
        let loading = self.layers.entry(layer).or_default();
        loading.pending_tiles = loading.pending_tiles.saturating_sub(1);
        warn!(%layer, "tile failed to load");
        self.set_state(layer, LoadingState::Error);
    }

    pub fn fetch_started(&mut self, layer: LayerId) {
        self.set_state(layer, LoadingState::Loading);
    }

    pub fn fetch_finished(&mut self, layer: LayerId, result: Result<(), &FetchError>) {
        match result {
            Ok(()) | Err(FetchError::EmptyResult) => self.set_state(layer, LoadingState::Ok),
            Err(error) => {
                warn!(%layer, %error, "feature request failed");
                self.set_state(layer, LoadingState::Error);
            }
        }
    }

    pub fn forget(&mut self, layer: LayerId) {
        self.layers.remove(&layer);
    }

    #[cfg(test)]
    pub(crate) fn is_tracking(&self, layer: LayerId) -> bool {
        self.layers.contains_key(&layer)
    }

    fn set_state(&mut self, layer: LayerId, state: LoadingState) {
        let loading = self.layers.entry(layer).or_default();
        if loading.state == state {
            return;
        }
        loading.state = state;
        debug!(%layer, ?state, "loading state changed");
        let change = LoadingStateChange { layer, state };
        self.subscribers
            .retain(|subscriber| subscriber.send(change).is_ok());
    }
}
