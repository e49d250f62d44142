use model::{Coordinate, Feature, FeatureCollection, Geometry, GeometryType};
use renderer::RenderError;
use tracing::{debug, info, warn};

use crate::DrawSurface;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DrawError {
    #[error("a {0} capture is already running")]
    AlreadyCapturing(GeometryType),
    #[error("no capture is running")]
    NoActiveCapture,
    #[error("invalid {geometry_type} sketch: {reason}")]
    InvalidSketch {
        geometry_type: GeometryType,
        reason: &'static str,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Features captured during one draw session.
#[derive(Debug, Clone, PartialEq)]
pub struct ScratchSource {
    geometry_type: GeometryType,
    features: FeatureCollection,
}

impl ScratchSource {
    fn new(geometry_type: GeometryType) -> Self {
        Self {
            geometry_type,
            features: FeatureCollection::new(),
        }
    }

    pub fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    pub fn features(&self) -> &FeatureCollection {
        &self.features
    }

    pub fn into_features(self) -> FeatureCollection {
        self.features
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Runs at most one draw session at a time.
#[derive(Debug, Default)]
pub struct DrawInteractionController {
    session: Option<ScratchSource>,
}

impl DrawInteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_capturing(&self) -> bool {
        self.session.is_some()
    }

    pub fn geometry_type(&self) -> Option<GeometryType> {
        self.session.as_ref().map(ScratchSource::geometry_type)
    }

    pub fn scratch(&self) -> Option<&ScratchSource> {
        self.session.as_ref()
    }

    /// Attaches the scratch layer and capture interaction to every view.
    /// A running session is left untouched.
    pub fn start_draw(
        &mut self,
        surface: &mut impl DrawSurface,
        geometry_type: GeometryType,
    ) -> Result<(), DrawError> {
        if let Some(running) = self.geometry_type() {
            warn!(%running, requested = %geometry_type, "draw already in progress");
            return Err(DrawError::AlreadyCapturing(running));
        }
        surface.attach_draw(geometry_type)?;
        self.session = Some(ScratchSource::new(geometry_type));
        info!(%geometry_type, "draw started");
        Ok(())
    }

    /// Adds a finished sketch to the scratch source.
    pub fn capture(&mut self, coordinates: &[Coordinate]) -> Result<&Feature, DrawError> {
        let session = self.session.as_mut().ok_or(DrawError::NoActiveCapture)?;
        let geometry = sketch_geometry(session.geometry_type, coordinates)?;
        session.features.push(Feature::new(geometry));
        debug!(
            geometry_type = %session.geometry_type,
            captured = session.features.len(),
            "sketch captured"
        );
        session
            .features
            .iter()
            .last()
            .ok_or(DrawError::NoActiveCapture)
    }

    /// Detaches draw from every view and hands back what was captured.
    /// Returns `None` when no session is running.
    pub fn end_draw(
        &mut self,
        surface: &mut impl DrawSurface,
    ) -> Result<Option<ScratchSource>, DrawError> {
        let Some(scratch) = self.session.take() else {
            debug!(error = %DrawError::NoActiveCapture, "end draw ignored");
            return Ok(None);
        };
        surface.detach_draw()?;
        info!(
            geometry_type = %scratch.geometry_type,
            features = scratch.features.len(),
            "draw ended"
        );
        Ok(Some(scratch))
    }

    /// Ends the session and discards the captured features.
    pub fn cancel_draw(&mut self, surface: &mut impl DrawSurface) -> Result<(), DrawError> {
        if let Some(scratch) = self.session.take() {
            surface.detach_draw()?;
            info!(discarded = scratch.features.len(), "draw cancelled");
        }
        Ok(())
    }
}

fn sketch_geometry(
    geometry_type: GeometryType,
    coordinates: &[Coordinate],
) -> Result<Geometry, DrawError> {
    let invalid = |reason| DrawError::InvalidSketch {
        geometry_type,
        reason,
    };
    if coordinates.iter().any(|coordinate| !coordinate.is_finite()) {
        return Err(invalid("coordinates must be finite"));
    }
    match geometry_type {
        GeometryType::Point => coordinates
            .first()
            .map(|coordinate| Geometry::Point(*coordinate))
            .ok_or_else(|| invalid("a point needs one coordinate")),
        GeometryType::LineString => {
            if coordinates.len() < 2 {
                return Err(invalid("a line needs at least two coordinates"));
            }
            Ok(Geometry::LineString(coordinates.to_vec()))
        }
        GeometryType::Polygon => {
            let mut ring = coordinates.to_vec();
            if ring.len() > 1 && ring.first() == ring.last() {
                ring.pop();
            }
            let mut distinct: Vec<Coordinate> = Vec::with_capacity(ring.len());
            for coordinate in &ring {
                if !distinct.contains(coordinate) {
                    distinct.push(*coordinate);
                }
            }
            if distinct.len() < 3 {
                return Err(invalid("a polygon needs three distinct coordinates"));
            }
            ring.push(ring[0]);
            Ok(Geometry::Polygon(vec![ring]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSurface {
        attached: Option<GeometryType>,
        detach_calls: usize,
    }

    impl DrawSurface for RecordingSurface {
        fn attach_draw(&mut self, geometry_type: GeometryType) -> Result<(), RenderError> {
            self.attached = Some(geometry_type);
            Ok(())
        }

        fn detach_draw(&mut self) -> Result<(), RenderError> {
            self.attached = None;
            self.detach_calls += 1;
            Ok(())
        }
    }

    fn coordinate(x: f64, y: f64) -> Coordinate {
        Coordinate::new(x, y)
    }

    #[test]
    fn second_start_is_rejected_and_keeps_session() {
        let mut surface = RecordingSurface::default();
        let mut controller = DrawInteractionController::new();
        controller
            .start_draw(&mut surface, GeometryType::LineString)
            .expect("first start");
        controller
            .capture(&[coordinate(0.0, 0.0), coordinate(1.0, 1.0)])
            .expect("valid line");

        assert_eq!(
            controller.start_draw(&mut surface, GeometryType::Point),
            Err(DrawError::AlreadyCapturing(GeometryType::LineString))
        );
        assert_eq!(controller.geometry_type(), Some(GeometryType::LineString));
        assert_eq!(surface.attached, Some(GeometryType::LineString));
        assert_eq!(controller.scratch().expect("session").features().len(), 1);
    }

    #[test]
    fn end_draw_detaches_before_returning() {
        let mut surface = RecordingSurface::default();
        let mut controller = DrawInteractionController::new();
        controller
            .start_draw(&mut surface, GeometryType::Point)
            .expect("start");
        controller
            .capture(&[coordinate(3.0, 4.0), coordinate(9.0, 9.0)])
            .expect("point");

        let scratch = controller
            .end_draw(&mut surface)
            .expect("detach succeeds")
            .expect("session was running");
        assert_eq!(surface.attached, None);
        assert!(!controller.is_capturing());
        let feature = scratch.features().iter().next().expect("captured point");
        assert_eq!(feature.geometry, Geometry::Point(coordinate(3.0, 4.0)));

        assert_eq!(controller.end_draw(&mut surface).expect("idle"), None);
        assert_eq!(surface.detach_calls, 1);
    }

    #[test]
    fn polygon_ring_is_closed_and_degenerate_sketches_fail() {
        let mut surface = RecordingSurface::default();
        let mut controller = DrawInteractionController::new();
        assert_eq!(
            controller.capture(&[coordinate(0.0, 0.0)]).map(|_| ()),
            Err(DrawError::NoActiveCapture)
        );
        controller
            .start_draw(&mut surface, GeometryType::Polygon)
            .expect("start");

        let feature = controller
            .capture(&[coordinate(0.0, 0.0), coordinate(4.0, 0.0), coordinate(4.0, 4.0)])
            .expect("triangle");
        let Geometry::Polygon(rings) = &feature.geometry else {
            panic!("expected polygon, got {:?}", feature.geometry);
        };
        assert_eq!(rings[0].len(), 4);
        assert_eq!(rings[0].first(), rings[0].last());

        let degenerate = controller.capture(&[
            coordinate(0.0, 0.0),
            coordinate(1.0, 1.0),
            coordinate(0.0, 0.0),
            coordinate(1.0, 1.0),
        ]);
        assert!(matches!(
            degenerate,
            Err(DrawError::InvalidSketch {
                geometry_type: GeometryType::Polygon,
                ..
            })
        ));
    }

    #[test]
    fn closed_polygon_ring_is_kept_as_drawn() {
        let mut surface = RecordingSurface::default();
        let mut controller = DrawInteractionController::new();
        controller
            .start_draw(&mut surface, GeometryType::Polygon)
            .expect("start");
        let ring = [
            coordinate(0.0, 0.0),
            coordinate(4.0, 0.0),
            coordinate(4.0, 4.0),
            coordinate(0.0, 0.0),
        ];
        controller.capture(&ring).expect("closed triangle");

        let scratch = controller
            .end_draw(&mut surface)
            .expect("detach succeeds")
            .expect("session was running");
        assert_eq!(scratch.features().len(), 1);
        let feature = scratch.features().iter().next().expect("captured polygon");
        assert_eq!(feature.geometry, Geometry::Polygon(vec![ring.to_vec()]));
    }

    #[test]
    fn cancel_discards_captured_features() {
        let mut surface = RecordingSurface::default();
        let mut controller = DrawInteractionController::new();
        controller
            .start_draw(&mut surface, GeometryType::LineString)
            .expect("start");
        assert!(controller.capture(&[coordinate(1.0, 1.0)]).is_err());
        controller.cancel_draw(&mut surface).expect("cancel");
        assert!(!controller.is_capturing());
        assert_eq!(surface.detach_calls, 1);
        controller
            .start_draw(&mut surface, GeometryType::Point)
            .expect("restart after cancel");
    }
}
