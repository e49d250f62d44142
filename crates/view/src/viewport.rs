use crossbeam_channel::{Receiver, Sender, unbounded};
use spatial::Extent;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewportError {
    #[error("invalid viewport: {reason}")]
    InvalidViewport { reason: String },
}

impl ViewportError {
    fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidViewport {
            reason: reason.into(),
        }
    }
}

/// Visible extent and resolution of the primary view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub extent: Extent,
    pub resolution: f64,
    pub max_extent: Option<Extent>,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            extent: Extent::new(0.0, 0.0, 0.0, 0.0),
            resolution: 1.0,
            max_extent: None,
        }
    }
}

impl ViewportState {
    pub fn new(extent: Extent, resolution: f64) -> Self {
        Self {
            extent,
            resolution,
            max_extent: None,
        }
    }

    pub fn with_max_extent(mut self, max_extent: Extent) -> Self {
        self.max_extent = Some(max_extent);
        self
    }

    /// Validating constructor for extents coming from untyped sources.
    pub fn from_parts(
        extent: &[f64],
        resolution: f64,
        max_extent: Option<Extent>,
    ) -> Result<Self, ViewportError> {
        let extent = Extent::from_slice(extent).map_err(|error| ViewportError::invalid(error.to_string()))?;
        let state = Self {
            extent,
            resolution,
            max_extent,
        };
        state.validate()?;
        Ok(state)
    }

    fn validate(&self) -> Result<(), ViewportError> {
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(ViewportError::invalid(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        if !self.extent.is_finite() || self.extent.is_empty() {
            return Err(ViewportError::invalid(format!(
                "extent {:?} is not finite and axis-ordered",
                self.extent.to_array()
            )));
        }
        if let Some(max_extent) = self.max_extent {
            if !max_extent.is_finite() || max_extent.is_empty() {
                return Err(ViewportError::invalid("max extent is not finite and axis-ordered"));
            }
        }
        Ok(())
    }

    /// Extent limited to the max extent, if any.
    pub fn clipped_extent(&self) -> Extent {
        match self.max_extent {
            Some(max_extent) => self.extent.intersection(&max_extent),
            None => self.extent,
        }
    }
}

/// Last published viewport plus its subscribers.
///
/// A new state is published only when the resolution changes or when the
/// new clipped extent is not already covered by the previous one.
#[derive(Debug, Default)]
pub struct ViewportTracker {
    state: ViewportState,
    subscribers: Vec<Sender<ViewportState>>,
}

impl ViewportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewport(&self) -> ViewportState {
        self.state
    }

    /// Returns `Ok(true)` when the state was published.
    ///
    /// The extent is stored clipped to the max extent. An extent lying
    /// entirely outside the max extent would clip to nothing, so it is
    /// rejected with [`ViewportError::InvalidViewport`] and the previous
    /// state stays published.
    pub fn set_viewport(&mut self, state: ViewportState) -> Result<bool, ViewportError> {
        state.validate()?;
        let extent = state.clipped_extent();
        if extent.is_empty() {
            return Err(ViewportError::invalid("extent lies outside the max extent"));
        }
        let next = ViewportState { extent, ..state };

        let resolution_changed = next.resolution != self.state.resolution;
        let covered = self.state.clipped_extent().contains_extent(&next.extent);
        if !resolution_changed && covered {
            return Ok(false);
        }

        debug!(
            extent = ?next.extent.to_array(),
            resolution = next.resolution,
            "viewport changed"
        );
        self.state = next;
        self.subscribers.retain(|subscriber| subscriber.send(next).is_ok());
        Ok(true)
    }

    /// Stream of published states, starting with the current one.
    pub fn subscribe(&mut self) -> Receiver<ViewportState> {
        let (sender, receiver) = unbounded();
        if sender.send(self.state).is_ok() {
            self.subscribers.push(sender);
        }
        receiver
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_state_is_not_republished() {
        let mut tracker = ViewportTracker::new();
        let receiver = tracker.subscribe();
        let state = ViewportState::new(Extent::new(0.0, 0.0, 10.0, 10.0), 2.0);

        assert_eq!(tracker.set_viewport(state), Ok(true));
        assert_eq!(tracker.set_viewport(state), Ok(false));

        let published: Vec<_> = receiver.try_iter().collect();
        assert_eq!(published, vec![ViewportState::default(), state]);
    }

    #[test]
    fn covered_extent_at_same_resolution_is_suppressed() {
        let mut tracker = ViewportTracker::new();
        let outer = ViewportState::new(Extent::new(0.0, 0.0, 10.0, 10.0), 2.0);
        tracker.set_viewport(outer).expect("valid viewport");

        let inner = ViewportState::new(Extent::new(2.0, 2.0, 8.0, 8.0), 2.0);
        assert_eq!(tracker.set_viewport(inner), Ok(false));
        assert_eq!(tracker.viewport(), outer);

        let panned = ViewportState::new(Extent::new(5.0, 0.0, 15.0, 10.0), 2.0);
        assert_eq!(tracker.set_viewport(panned), Ok(true));

        let zoomed = ViewportState::new(Extent::new(6.0, 1.0, 14.0, 9.0), 1.0);
        assert_eq!(tracker.set_viewport(zoomed), Ok(true));
    }

    #[test]
    fn stored_extent_is_clipped_to_max_extent() {
        let mut tracker = ViewportTracker::new();
        let state = ViewportState::new(Extent::new(-20.0, -5.0, 20.0, 5.0), 0.5)
            .with_max_extent(Extent::new(-10.0, -10.0, 10.0, 10.0));
        tracker.set_viewport(state).expect("valid viewport");
        assert_eq!(tracker.viewport().extent, Extent::new(-10.0, -5.0, 10.0, 5.0));
    }

    #[test]
    fn extent_outside_max_extent_keeps_previous_state() {
        let mut tracker = ViewportTracker::new();
        let inside = ViewportState::new(Extent::new(1.0, 1.0, 4.0, 4.0), 1.0)
            .with_max_extent(Extent::new(0.0, 0.0, 5.0, 5.0));
        assert_eq!(tracker.set_viewport(inside), Ok(true));
        let receiver = tracker.subscribe();

        let outside = ViewportState::new(Extent::new(10.0, 10.0, 20.0, 20.0), 1.0)
            .with_max_extent(Extent::new(0.0, 0.0, 5.0, 5.0));
        assert!(matches!(
            tracker.set_viewport(outside),
            Err(ViewportError::InvalidViewport { .. })
        ));
        assert_eq!(tracker.viewport(), inside);
        assert_eq!(receiver.try_iter().count(), 1);
    }

    #[test]
    fn invalid_input_is_rejected_without_publishing() {
        assert!(matches!(
            ViewportState::from_parts(&[0.0, 0.0, 1.0], 1.0, None),
            Err(ViewportError::InvalidViewport { .. })
        ));

        let mut tracker = ViewportTracker::new();
        let receiver = tracker.subscribe();
        let zero_resolution = ViewportState::new(Extent::new(0.0, 0.0, 1.0, 1.0), 0.0);
        assert!(tracker.set_viewport(zero_resolution).is_err());
        assert_eq!(receiver.try_iter().count(), 1);
    }

    #[test]
    fn dropped_subscribers_are_pruned_on_publish() {
        let mut tracker = ViewportTracker::new();
        drop(tracker.subscribe());
        let live = tracker.subscribe();
        assert_eq!(tracker.subscriber_count(), 2);

        tracker
            .set_viewport(ViewportState::new(Extent::new(0.0, 0.0, 4.0, 4.0), 3.0))
            .expect("valid viewport");
        assert_eq!(tracker.subscriber_count(), 1);
        assert_eq!(live.try_iter().count(), 2);
    }
}
