use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::{Extent, SpatialError};

pub const EPSG_4326: &str = "EPSG:4326";
pub const EPSG_3857: &str = "EPSG:3857";
pub const EPSG_32632: &str = "EPSG:32632";
pub const EPSG_25832: &str = "EPSG:25832";
pub const EPSG_3035: &str = "EPSG:3035";
pub const SR_ORG_81: &str = "SR-ORG:81";
/// Code under which older projects stored the geostationary projection.
pub const LEGACY_GEOS_CODE: &str = "EPSG:40453";

#[derive(Debug, Clone, PartialEq)]
pub struct SpatialReference {
    code: String,
    name: String,
    extent: Extent,
    crs_uri: String,
    proj4_definition: Option<String>,
}

impl SpatialReference {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        extent: Extent,
        crs_uri: impl Into<String>,
    ) -> Result<Self, SpatialError> {
        if extent.is_empty() || !extent.is_finite() || extent.width() <= 0.0 || extent.height() <= 0.0
        {
            return Err(SpatialError::InvalidExtent {
                values: extent.to_array().to_vec(),
            });
        }
        Ok(Self {
            code: code.into(),
            name: name.into(),
            extent,
            crs_uri: crs_uri.into(),
            proj4_definition: None,
        })
    }

    pub fn with_proj4_definition(mut self, definition: impl Into<String>) -> Self {
        self.proj4_definition = Some(definition.into());
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn crs_uri(&self) -> &str {
        &self.crs_uri
    }

    pub fn proj4_definition(&self) -> Option<&str> {
        self.proj4_definition.as_deref()
    }

    /// Whether coordinates are longitude/latitude in degrees.
    pub fn is_geographic(&self) -> bool {
        self.proj4_definition().is_some_and(|definition| {
            definition
                .split_whitespace()
                .any(|parameter| matches!(parameter, "+proj=longlat" | "+proj=latlong"))
        })
    }

    pub fn x_coordinate_name(&self) -> &'static str {
        if self.is_geographic() { "longitude" } else { "x" }
    }

    pub fn y_coordinate_name(&self) -> &'static str {
        if self.is_geographic() { "latitude" } else { "y" }
    }
}

impl fmt::Display for SpatialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.name)
    }
}

/// Immutable set of known spatial references keyed by code.
#[derive(Debug, Clone)]
pub struct SpatialReferenceRegistry {
    references: Vec<Arc<SpatialReference>>,
    by_code: HashMap<String, usize>,
}

impl SpatialReferenceRegistry {
    pub fn new(references: Vec<SpatialReference>) -> Result<Self, SpatialError> {
        let mut by_code = HashMap::with_capacity(references.len());
        for (index, reference) in references.iter().enumerate() {
            if by_code.insert(reference.code.clone(), index).is_some() {
                return Err(SpatialError::DuplicateCode {
                    code: reference.code.clone(),
                });
            }
        }
        Ok(Self {
            references: references.into_iter().map(Arc::new).collect(),
            by_code,
        })
    }

    /// Process-wide registry with the built-in references.
    pub fn global() -> &'static Self {
        static REGISTRY: OnceLock<SpatialReferenceRegistry> = OnceLock::new();
        REGISTRY.get_or_init(Self::builtin)
    }

    pub fn from_code(&self, code: &str) -> Result<Arc<SpatialReference>, SpatialError> {
        let code = if code == LEGACY_GEOS_CODE { SR_ORG_81 } else { code };
        self.by_code
            .get(code)
            .map(|index| Arc::clone(&self.references[*index]))
            .ok_or_else(|| SpatialError::UnknownProjection {
                code: code.to_owned(),
            })
    }

    pub fn all(&self) -> &[Arc<SpatialReference>] {
        &self.references
    }

    pub fn wgs84(&self) -> Result<Arc<SpatialReference>, SpatialError> {
        self.from_code(EPSG_4326)
    }

    pub fn web_mercator(&self) -> Result<Arc<SpatialReference>, SpatialError> {
        self.from_code(EPSG_3857)
    }

    /// The built-in table has distinct codes and non-empty extents, so it
    /// skips the checks `new` applies to caller-supplied references.
    fn builtin() -> Self {
        let references: Vec<Arc<SpatialReference>> =
            BUILTIN_REFERENCES.iter().map(|builtin| Arc::new(builtin.reference())).collect();
        let by_code = references
            .iter()
            .enumerate()
            .map(|(index, reference)| (reference.code.clone(), index))
            .collect();
        Self {
            references,
            by_code,
        }
    }
}

struct BuiltinReference {
    code: &'static str,
    name: &'static str,
    extent: [f64; 4],
    crs_uri: &'static str,
    proj4_definition: Option<&'static str>,
}

impl BuiltinReference {
    fn reference(&self) -> SpatialReference {
        let [min_x, min_y, max_x, max_y] = self.extent;
        SpatialReference {
            code: self.code.to_owned(),
            name: self.name.to_owned(),
            extent: Extent::new(min_x, min_y, max_x, max_y),
            crs_uri: self.crs_uri.to_owned(),
            proj4_definition: self.proj4_definition.map(str::to_owned),
        }
    }
}

static BUILTIN_REFERENCES: [BuiltinReference; 6] = [
    BuiltinReference {
        code: EPSG_4326,
        name: "WGS 84",
        extent: [-180.0, -90.0, 180.0, 90.0],
        crs_uri: "http://www.opengis.net/def/crs/EPSG/0/4326",
        proj4_definition: Some("+proj=longlat +datum=WGS84 +no_defs"),
    },
    BuiltinReference {
        code: EPSG_3857,
        name: "WGS84 Web Mercator",
        extent: [-20_037_508.34, -20_037_508.34, 20_037_508.34, 20_037_508.34],
        crs_uri: "http://www.opengis.net/def/crs/EPSG/0/3857",
        proj4_definition: Some(
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs",
        ),
    },
    // No proj4 definition, so transforms to and from it are unsupported.
    BuiltinReference {
        code: SR_ORG_81,
        name: "GEOS - GEOstationary Satellite",
        extent: [-5_568_748.276, -5_568_748.276, 5_568_748.276, 5_568_748.276],
        crs_uri: "http://spatialreference.org/ref/sr-org/81/gml/",
        proj4_definition: None,
    },
    BuiltinReference {
        code: EPSG_32632,
        name: "WGS 84 / UTM 32 N",
        extent: [166_021.4431, 0.0, 833_978.5569, 9_329_005.1825],
        crs_uri: "http://www.opengis.net/def/crs/EPSG/0/32632",
        proj4_definition: Some("+proj=utm +zone=32 +datum=WGS84 +units=m +no_defs"),
    },
    BuiltinReference {
        code: EPSG_25832,
        name: "ETRS89 / UTM 32 N",
        extent: [265_948.8191, 6_421_521.2254, 677_786.3629, 7_288_831.7014],
        crs_uri: "http://www.opengis.net/def/crs/EPSG/0/25832",
        proj4_definition: Some(
            "+proj=utm +zone=32 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
        ),
    },
    BuiltinReference {
        code: EPSG_3035,
        name: "ETRS89-LAEA",
        extent: [2_426_378.0132, 1_528_101.2618, 6_293_974.6215, 5_446_513.5222],
        crs_uri: "http://www.opengis.net/def/crs/EPSG/0/3035",
        proj4_definition: Some(
            "+proj=laea +lat_0=52 +lon_0=10 +x_0=4321000 +y_0=3210000 +ellps=GRS80 +units=m +no_defs",
        ),
    },
];
