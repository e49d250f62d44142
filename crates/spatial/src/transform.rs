//! Coordinate transforms between registered spatial references.
//!
//! Both sides are parsed from their proj4 definitions. `proj4rs` works in
//! radians for geographic references, so degrees are converted at the edges.

use proj4rs::Proj;
use proj4rs::transform::transform;

use crate::{Coordinate, SpatialError, SpatialReference};

pub fn transform_coordinate(
    coordinate: Coordinate,
    from: &SpatialReference,
    to: &SpatialReference,
) -> Result<Coordinate, SpatialError> {
    if from.code() == to.code() {
        return Ok(coordinate);
    }
    Transformer::new(from, to)?.apply(coordinate)
}

pub fn transform_coordinates(
    coordinates: &[Coordinate],
    from: &SpatialReference,
    to: &SpatialReference,
) -> Result<Vec<Coordinate>, SpatialError> {
    if from.code() == to.code() {
        return Ok(coordinates.to_vec());
    }
    let transformer = Transformer::new(from, to)?;
    coordinates
        .iter()
        .map(|coordinate| transformer.apply(*coordinate))
        .collect()
}

struct Transformer<'a> {
    from: &'a SpatialReference,
    to: &'a SpatialReference,
    source: Proj,
    target: Proj,
}

impl<'a> Transformer<'a> {
    fn new(from: &'a SpatialReference, to: &'a SpatialReference) -> Result<Self, SpatialError> {
        let parse = |reference: &SpatialReference| -> Result<Proj, SpatialError> {
            let definition = reference.proj4_definition().ok_or_else(|| {
                SpatialError::UnsupportedTransform {
                    from: from.code().to_owned(),
                    to: to.code().to_owned(),
                }
            })?;
            Proj::from_proj_string(definition).map_err(|error| SpatialError::Projection {
                from: from.code().to_owned(),
                to: to.code().to_owned(),
                reason: format!("`{}`: {error}", reference.code()),
            })
        };
        Ok(Self {
            source: parse(from)?,
            target: parse(to)?,
            from,
            to,
        })
    }

    fn apply(&self, coordinate: Coordinate) -> Result<Coordinate, SpatialError> {
        let mut point = if self.from.is_geographic() {
            (coordinate.x.to_radians(), coordinate.y.to_radians(), 0.0)
        } else {
            (coordinate.x, coordinate.y, 0.0)
        };
        transform(&self.source, &self.target, &mut point).map_err(|error| {
            SpatialError::Projection {
                from: self.from.code().to_owned(),
                to: self.to.code().to_owned(),
                reason: error.to_string(),
            }
        })?;
        let (x, y, _) = point;
        let projected = if self.to.is_geographic() {
            Coordinate::new(x.to_degrees(), y.to_degrees())
        } else {
            Coordinate::new(x, y)
        };
        if !projected.is_finite() {
            return Err(SpatialError::NonFiniteCoordinate {
                x: projected.x,
                y: projected.y,
                code: self.to.code().to_owned(),
            });
        }
        Ok(projected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EPSG_3035, EPSG_25832, EPSG_32632, Extent, SR_ORG_81, SpatialReferenceRegistry};

    fn assert_close(actual: Coordinate, expected: Coordinate, tolerance: f64) {
        assert!(
            (actual.x - expected.x).abs() < tolerance && (actual.y - expected.y).abs() < tolerance,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn web_mercator_maps_known_points() {
        let registry = SpatialReferenceRegistry::global();
        let wgs84 = registry.wgs84().expect("wgs84");
        let mercator = registry.web_mercator().expect("web mercator");

        let projected = transform_coordinate(Coordinate::new(180.0, 0.0), &wgs84, &mercator)
            .expect("forward transform");
        assert_close(projected, Coordinate::new(20_037_508.342_789_244, 0.0), 1e-3);

        let back = transform_coordinate(
            Coordinate::new(1_113_194.907_932_735_7, 6_446_275.841_017_161),
            &mercator,
            &wgs84,
        )
        .expect("inverse transform");
        assert_close(back, Coordinate::new(10.0, 50.0), 1e-7);
    }

    #[test]
    fn utm_central_meridian_maps_to_false_easting() {
        let registry = SpatialReferenceRegistry::global();
        let wgs84 = registry.wgs84().expect("wgs84");
        let utm = registry.from_code(EPSG_32632).expect("utm 32n");
        let projected = transform_coordinate(Coordinate::new(9.0, 48.0), &wgs84, &utm)
            .expect("forward transform");
        assert_close(projected, Coordinate::new(500_000.0, 5_316_300.225), 1e-2);

        let back = transform_coordinate(projected, &utm, &wgs84).expect("inverse");
        assert_close(back, Coordinate::new(9.0, 48.0), 1e-7);
    }

    #[test]
    fn batch_transform_round_trips_off_meridian() {
        let registry = SpatialReferenceRegistry::global();
        let wgs84 = registry.wgs84().expect("wgs84");
        let utm = registry.from_code(EPSG_25832).expect("etrs89 utm 32n");
        let sources = [Coordinate::new(11.5, 47.25), Coordinate::new(6.75, 53.5)];
        let projected = transform_coordinates(&sources, &wgs84, &utm).expect("forward transform");
        assert!(projected.iter().all(|coordinate| coordinate.x > 166_021.0));
        let back = transform_coordinates(&projected, &utm, &wgs84).expect("inverse");
        for (back, source) in back.into_iter().zip(sources) {
            assert_close(back, source, 1e-6);
        }
    }

    #[test]
    fn laea_origin_maps_to_false_origin() {
        let registry = SpatialReferenceRegistry::global();
        let wgs84 = registry.wgs84().expect("wgs84");
        let laea = registry.from_code(EPSG_3035).expect("laea");
        let projected = transform_coordinate(Coordinate::new(10.0, 52.0), &wgs84, &laea)
            .expect("forward transform");
        assert_close(projected, Coordinate::new(4_321_000.0, 3_210_000.0), 1e-3);

        let source = Coordinate::new(2.35, 48.85);
        let projected = transform_coordinate(source, &wgs84, &laea).expect("forward transform");
        let back = transform_coordinate(projected, &laea, &wgs84).expect("inverse");
        assert_close(back, source, 1e-6);
    }

    #[test]
    fn references_without_definition_are_unsupported() {
        let registry = SpatialReferenceRegistry::global();
        let wgs84 = registry.wgs84().expect("wgs84");
        let geos = registry.from_code(SR_ORG_81).expect("geos");
        let error = transform_coordinate(Coordinate::ORIGIN, &geos, &wgs84)
            .expect_err("geos is unsupported");
        assert!(matches!(error, SpatialError::UnsupportedTransform { .. }));
        assert_eq!(
            transform_coordinate(Coordinate::ORIGIN, &geos, &geos).expect("same reference"),
            Coordinate::ORIGIN
        );
    }

    #[test]
    fn malformed_definition_is_reported() {
        let wgs84 = SpatialReferenceRegistry::global().wgs84().expect("wgs84");
        let broken = SpatialReference::new(
            "LOCAL:3",
            "broken",
            Extent::new(0.0, 0.0, 1.0, 1.0),
            "urn:local:3",
        )
        .expect("valid reference")
        .with_proj4_definition("+proj=nonexistent +units=m");
        let error = transform_coordinate(Coordinate::ORIGIN, &wgs84, &broken)
            .expect_err("unknown projection name");
        assert!(matches!(error, SpatialError::Projection { .. }));
    }
}
