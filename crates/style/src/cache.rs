use std::collections::HashMap;
use std::sync::Arc;

use model::{AttributeValue, Feature};
use tracing::trace;

use crate::{
    MAX_LABEL_LENGTH, MAX_POINT_RADIUS, MIN_POINT_RADIUS, Stroke, Style, TextStyle,
    VectorSymbology,
};

pub const STYLE_KEY_SEPARATOR: &str = ":::";
/// Key fragment for a style-relevant attribute the feature does not carry.
pub const UNDEFINED_KEY_FRAGMENT: &str = "undefined";

/// Styles of one symbology version, keyed by the style-relevant attribute
/// values of a feature.
#[derive(Debug)]
pub struct StyleCache {
    symbology: Arc<VectorSymbology>,
    entries: HashMap<String, Arc<Style>>,
}

struct RelevantValues<'a> {
    fill: Option<&'a AttributeValue>,
    stroke: Option<&'a AttributeValue>,
    label: Option<&'a AttributeValue>,
    radius: Option<&'a AttributeValue>,
}

impl StyleCache {
    pub fn new(symbology: Arc<VectorSymbology>) -> Self {
        Self {
            symbology,
            entries: HashMap::new(),
        }
    }

    pub fn symbology(&self) -> &Arc<VectorSymbology> {
        &self.symbology
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_style(&mut self, feature: &Feature) -> Arc<Style> {
        let values = self.relevant_values(feature);
        let key = style_key(&values);
        if let Some(style) = self.entries.get(&key) {
            return Arc::clone(style);
        }

        let style = Arc::new(self.build_style(feature, &values));
        trace!(key = %key, entries = self.entries.len() + 1, "style cache miss");
        self.entries.insert(key, Arc::clone(&style));
        style
    }

    fn relevant_values<'a>(&self, feature: &'a Feature) -> RelevantValues<'a> {
        let symbology = &self.symbology;
        let lookup = |attribute: Option<&str>| attribute.and_then(|name| feature.attribute(name));
        RelevantValues {
            fill: if symbology.describes_element_fill() {
                lookup(symbology.fill.attribute.as_deref())
            } else {
                None
            },
            stroke: lookup(symbology.stroke.attribute.as_deref()),
            label: lookup(symbology.text.as_ref().map(|text| text.attribute.as_str())),
            radius: if symbology.describes_radius() {
                lookup(symbology.radius.attribute.as_deref())
            } else {
                None
            },
        }
    }

    fn build_style(&self, feature: &Feature, values: &RelevantValues<'_>) -> Style {
        let symbology = &self.symbology;
        let fill = symbology
            .describes_element_fill()
            .then(|| symbology.fill.resolve(feature));
        let stroke_color = symbology.stroke.resolve(feature);
        let dash = (symbology.stroke_dash.len() > 1).then(|| symbology.stroke_dash.clone());

        let point_radius = symbology.describes_radius().then(|| {
            values
                .radius
                .and_then(AttributeValue::as_number)
                .filter(|value| value.is_finite())
                .map_or(symbology.radius.default, |value| {
                    value * symbology.radius.factor
                })
                .clamp(MIN_POINT_RADIUS, MAX_POINT_RADIUS)
        });

        let text = match (&symbology.text, values.label) {
            (Some(text), Some(label)) if label.is_truthy() => Some(TextStyle {
                label: label.to_string().chars().take(MAX_LABEL_LENGTH).collect(),
                fill: text.fill,
                stroke: stroke_color,
                stroke_width: text.stroke_width,
            }),
            _ => None,
        };

        Style {
            fill,
            stroke: Stroke {
                color: stroke_color,
                width: symbology.stroke_width,
                dash,
            },
            point_radius,
            text,
        }
    }
}

fn style_key(values: &RelevantValues<'_>) -> String {
    [values.fill, values.stroke, values.label, values.radius]
        .iter()
        .map(|value| {
            value.map_or_else(
                || UNDEFINED_KEY_FRAGMENT.to_owned(),
                AttributeValue::key_fragment,
            )
        })
        .collect::<Vec<_>>()
        .join(STYLE_KEY_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColorBreakpoint, ColorParam, Colorizer, ColorizerKind, TextSymbology};
    use model::{Coordinate, Geometry};
    use render_protocol::Rgba;

    fn point(attributes: &[(&str, AttributeValue)]) -> Feature {
        attributes.iter().fold(
            Feature::new(Geometry::Point(Coordinate::new(1.0, 2.0))),
            |feature, (name, value)| feature.with_attribute(*name, value.clone()),
        )
    }

    fn symbology() -> Arc<VectorSymbology> {
        let colorizer = Colorizer::new(
            ColorizerKind::Gradient,
            vec![
                ColorBreakpoint::numeric(0.0, Rgba::BLACK),
                ColorBreakpoint::numeric(100.0, Rgba::WHITE),
            ],
        )
        .expect("ascending breakpoints");
        let mut symbology = VectorSymbology::point();
        symbology.fill = ColorParam::derived(Rgba::RED, "population", colorizer);
        symbology.text = Some(TextSymbology {
            attribute: "name".to_owned(),
            fill: Rgba::WHITE,
            stroke_width: 2.0,
        });
        symbology.radius.attribute = Some("size".to_owned());
        symbology.radius.factor = 2.0;
        Arc::new(symbology)
    }

    #[test]
    fn equal_relevant_values_share_one_style_instance() {
        let mut cache = StyleCache::new(symbology());
        let first = point(&[("population", 50.0.into()), ("other", "a".into())]);
        let second = point(&[("population", 50.0.into()), ("other", "b".into())]);

        let first_style = cache.get_style(&first);
        let second_style = cache.get_style(&second);

        assert!(Arc::ptr_eq(&first_style, &second_style));
        assert_eq!(cache.len(), 1);
        assert_eq!(
            first_style.fill,
            Some(Rgba::new(127.5, 127.5, 127.5, 1.0))
        );
    }

    #[test]
    fn key_marks_missing_values_as_undefined() {
        let cache = StyleCache::new(symbology());
        let feature = point(&[("population", 7.0.into())]);
        let key = style_key(&cache.relevant_values(&feature));
        assert_eq!(key, "7:::undefined:::undefined:::undefined");
    }

    #[test]
    fn radius_scales_by_factor_and_is_clamped() {
        let mut cache = StyleCache::new(symbology());
        let scaled = cache.get_style(&point(&[("size", 4.0.into())]));
        assert_eq!(scaled.point_radius, Some(8.0));

        let huge = cache.get_style(&point(&[("size", 400.0.into())]));
        assert_eq!(huge.point_radius, Some(MAX_POINT_RADIUS));

        let fallback = cache.get_style(&point(&[]));
        assert_eq!(fallback.point_radius, Some(5.0));
    }

    #[test]
    fn label_is_rendered_only_when_present() {
        let mut cache = StyleCache::new(symbology());
        let unlabeled = cache.get_style(&point(&[("name", "".into())]));
        assert_eq!(unlabeled.text, None);

        let labeled =
            cache.get_style(&point(&[("name", "Schleswig-Holstein und Hamburg".into())]));
        let text = labeled.text.as_ref().expect("label style");
        assert_eq!(text.label.chars().count(), MAX_LABEL_LENGTH);
        assert_eq!(text.fill, Rgba::WHITE);
        assert_eq!(text.stroke, Rgba::BLACK);
        assert_eq!(text.stroke_width, 2.0);
    }

    #[test]
    fn line_symbology_ignores_fill_and_single_dash_entries() {
        let mut symbology = VectorSymbology::line();
        symbology.fill.attribute = Some("population".to_owned());
        symbology.stroke_dash.push(4.0);
        let mut cache = StyleCache::new(Arc::new(symbology));

        let style = cache.get_style(
            &Feature::new(Geometry::LineString(vec![
                Coordinate::new(0.0, 0.0),
                Coordinate::new(1.0, 1.0),
            ]))
            .with_attribute("population", 3.0),
        );
        assert_eq!(style.fill, None);
        assert_eq!(style.stroke.dash, None);
        assert_eq!(style.point_radius, None);
    }
}
