//! Vector feature model shared by styling, rendering and drawing.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use spatial::{SpatialError, SpatialReference, transform_coordinates};

pub use spatial::{Coordinate, Extent};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Number(u64),
    Text(String),
}

impl From<u64> for FeatureId {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for FeatureId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl AttributeValue {
    /// Numeric view of the value. Text is parsed leniently.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Textual form used inside style cache keys.
    pub fn key_fragment(&self) -> String {
        self.to_string()
    }

    /// Empty text, zero, NaN and `false` count as absent.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Number(value) => *value != 0.0 && !value.is_nan(),
            Self::Text(text) => !text.is_empty(),
            Self::Bool(value) => *value,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Number(value) => json!(value),
            Self::Text(text) => json!(text),
            Self::Bool(value) => json!(value),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coordinate),
    LineString(Vec<Coordinate>),
    /// Outer ring first, then holes. Rings are closed.
    Polygon(Vec<Vec<Coordinate>>),
}

impl Geometry {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Self::Point(_) => GeometryType::Point,
            Self::LineString(_) => GeometryType::LineString,
            Self::Polygon(_) => GeometryType::Polygon,
        }
    }

    pub fn extent(&self) -> Extent {
        match self {
            Self::Point(coordinate) => Extent::bounding([*coordinate]),
            Self::LineString(coordinates) => Extent::bounding(coordinates.iter().copied()),
            Self::Polygon(rings) => Extent::bounding(rings.iter().flatten().copied()),
        }
    }

    pub fn transform(
        &self,
        from: &SpatialReference,
        to: &SpatialReference,
    ) -> Result<Self, SpatialError> {
        Ok(match self {
            Self::Point(coordinate) => {
                Self::Point(spatial::transform_coordinate(*coordinate, from, to)?)
            }
            Self::LineString(coordinates) => {
                Self::LineString(transform_coordinates(coordinates, from, to)?)
            }
            Self::Polygon(rings) => Self::Polygon(
                rings
                    .iter()
                    .map(|ring| transform_coordinates(ring, from, to))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    pub fn to_geojson(&self) -> Value {
        let position = |coordinate: &Coordinate| json!([coordinate.x, coordinate.y]);
        let coordinates = match self {
            Self::Point(coordinate) => position(coordinate),
            Self::LineString(coordinates) => Value::Array(coordinates.iter().map(position).collect()),
            Self::Polygon(rings) => Value::Array(
                rings
                    .iter()
                    .map(|ring| Value::Array(ring.iter().map(position).collect()))
                    .collect(),
            ),
        };
        json!({
            "type": self.geometry_type().to_string(),
            "coordinates": coordinates,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<FeatureId>,
    pub geometry: Geometry,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: None,
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<FeatureId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    fn to_geojson(&self, from: &SpatialReference, to: &SpatialReference) -> Result<Value, SpatialError> {
        let properties: Map<String, Value> = self
            .attributes
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        let mut feature = json!({
            "type": "Feature",
            "geometry": self.geometry.transform(from, to)?.to_geojson(),
            "properties": properties,
        });
        if let (Some(id), Some(object)) = (&self.id, feature.as_object_mut()) {
            let id = match id {
                FeatureId::Number(value) => json!(value),
                FeatureId::Text(value) => json!(value),
            };
            object.insert("id".to_owned(), id);
        }
        Ok(feature)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    pub fn get(&self, id: &FeatureId) -> Option<&Feature> {
        self.features
            .iter()
            .find(|feature| feature.id.as_ref() == Some(id))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn extent(&self) -> Extent {
        self.features
            .iter()
            .fold(Extent::EMPTY, |extent, feature| extent.union(feature.geometry.extent()))
    }

    /// GeoJSON feature collection with geometries reprojected `from` → `to`.
    pub fn to_geojson(
        &self,
        from: &SpatialReference,
        to: &SpatialReference,
    ) -> Result<Value, SpatialError> {
        let features = self
            .features
            .iter()
            .map(|feature| feature.to_geojson(from, to))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(json!({
            "type": "FeatureCollection",
            "features": features,
        }))
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<T: IntoIterator<Item = Feature>>(iter: T) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
