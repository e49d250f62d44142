use std::sync::Arc;

use arc_swap::ArcSwap;
use spatial::{Coordinate, Extent, SpatialReference, transform_coordinate};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    #[error("zoom level outside the configured range or not finite")]
    InvalidZoom,
    #[error("view size must be positive")]
    InvalidSize,
    #[error("camera arithmetic produced a non-finite value")]
    NonFiniteValue,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraLimits {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub tile_size: u32,
}

impl Default for CameraLimits {
    fn default() -> Self {
        Self {
            min_zoom: 0.0,
            max_zoom: 28.0,
            tile_size: 256,
        }
    }
}

/// Center, zoom and projection shared by every view instance.
///
/// Values are immutable; changes produce a new camera that replaces the old
/// one in a [`CameraCell`].
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    projection: Arc<SpatialReference>,
    center: Coordinate,
    zoom: f64,
    limits: CameraLimits,
}

impl Camera {
    pub fn new(
        projection: Arc<SpatialReference>,
        center: Coordinate,
        zoom: f64,
        limits: CameraLimits,
    ) -> Result<Self, CameraError> {
        if !center.is_finite() {
            return Err(CameraError::NonFiniteValue);
        }
        if limits.tile_size == 0 || !(limits.min_zoom <= limits.max_zoom) {
            return Err(CameraError::InvalidZoom);
        }
        let camera = Self {
            projection,
            center,
            zoom: limits.min_zoom,
            limits,
        };
        camera.with_zoom(zoom)
    }

    pub fn projection(&self) -> &Arc<SpatialReference> {
        &self.projection
    }

    pub fn center(&self) -> Coordinate {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn limits(&self) -> CameraLimits {
        self.limits
    }

    /// Map units per pixel at the current zoom.
    pub fn resolution(&self) -> f64 {
        self.resolution_at(self.zoom)
    }

    fn resolution_at(&self, zoom: f64) -> f64 {
        self.projection.extent().width() / f64::from(self.limits.tile_size) / zoom.exp2()
    }

    pub fn calculate_extent(&self, width: u32, height: u32) -> Result<Extent, CameraError> {
        if width == 0 || height == 0 {
            return Err(CameraError::InvalidSize);
        }
        let resolution = self.resolution();
        let half_width = checked_mul(f64::from(width), resolution / 2.0)?;
        let half_height = checked_mul(f64::from(height), resolution / 2.0)?;
        Ok(Extent::around(self.center, half_width, half_height))
    }

    pub fn with_zoom(&self, zoom: f64) -> Result<Self, CameraError> {
        if !zoom.is_finite() {
            return Err(CameraError::InvalidZoom);
        }
        Ok(Self {
            zoom: zoom.clamp(self.limits.min_zoom, self.limits.max_zoom),
            ..self.clone()
        })
    }

    /// Zoom by `delta` levels, saturating at the configured range.
    pub fn adjusted_zoom(&self, delta: f64) -> Result<Self, CameraError> {
        self.with_zoom(checked_add(self.zoom, delta)?)
    }

    pub fn panned_by(&self, delta_x: f64, delta_y: f64) -> Result<Self, CameraError> {
        Ok(Self {
            center: Coordinate::new(
                checked_add(self.center.x, delta_x)?,
                checked_add(self.center.y, delta_y)?,
            ),
            ..self.clone()
        })
    }

    /// Centers on `extent` at the largest integral zoom that shows all of it
    /// in a `width` × `height` view.
    pub fn fitted_to(&self, extent: Extent, width: u32, height: u32) -> Result<Self, CameraError> {
        if width == 0 || height == 0 {
            return Err(CameraError::InvalidSize);
        }
        if extent.is_empty() || !extent.is_finite() {
            return Err(CameraError::NonFiniteValue);
        }
        let needed = (extent.width() / f64::from(width)).max(extent.height() / f64::from(height));
        let zoom = if needed > 0.0 {
            (self.resolution_at(0.0) / needed).log2().floor()
        } else {
            self.limits.max_zoom
        };
        Ok(Self {
            center: extent.center(),
            ..self.with_zoom(zoom)?
        })
    }

    /// Same zoom in another projection, center carried over.
    ///
    /// A center that cannot be transformed falls back to the origin.
    pub fn reprojected(&self, projection: Arc<SpatialReference>) -> Self {
        let center = match transform_coordinate(self.center, &self.projection, &projection) {
            Ok(center) => center,
            Err(error) => {
                warn!(
                    from = self.projection.code(),
                    to = projection.code(),
                    %error,
                    "camera center not transformable, recentering on origin"
                );
                Coordinate::ORIGIN
            }
        };
        Self {
            projection,
            center,
            zoom: self.zoom,
            limits: self.limits,
        }
    }
}

/// Owner side of the shared camera. Only the renderer stores into it.
#[derive(Debug)]
pub struct CameraCell {
    current: Arc<ArcSwap<Camera>>,
}

impl CameraCell {
    pub fn new(camera: Camera) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(camera)),
        }
    }

    pub fn load(&self) -> Arc<Camera> {
        self.current.load_full()
    }

    pub fn store(&self, camera: Camera) {
        self.current.store(Arc::new(camera));
    }

    pub fn reader(&self) -> CameraRef {
        CameraRef {
            current: Arc::clone(&self.current),
        }
    }
}

/// Read-only handle held by view instances.
#[derive(Debug, Clone)]
pub struct CameraRef {
    current: Arc<ArcSwap<Camera>>,
}

impl CameraRef {
    pub fn load(&self) -> Arc<Camera> {
        self.current.load_full()
    }
}

fn checked_add(current: f64, delta: f64) -> Result<f64, CameraError> {
    if !delta.is_finite() {
        return Err(CameraError::NonFiniteValue);
    }
    let next = current + delta;
    if !next.is_finite() {
        return Err(CameraError::NonFiniteValue);
    }
    Ok(next)
}

fn checked_mul(left: f64, right: f64) -> Result<f64, CameraError> {
    if !left.is_finite() || !right.is_finite() {
        return Err(CameraError::NonFiniteValue);
    }
    let next = left * right;
    if !next.is_finite() {
        return Err(CameraError::NonFiniteValue);
    }
    Ok(next)
}
