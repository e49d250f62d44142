use model::AttributeValue;
use render_protocol::Rgba;
use serde::{Deserialize, Serialize};

use crate::StyleError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BreakpointValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorBreakpoint {
    pub value: BreakpointValue,
    pub rgba: Rgba,
}

impl ColorBreakpoint {
    pub fn numeric(value: f64, rgba: Rgba) -> Self {
        Self {
            value: BreakpointValue::Number(value),
            rgba,
        }
    }

    pub fn text(value: impl Into<String>, rgba: Rgba) -> Self {
        Self {
            value: BreakpointValue::Text(value.into()),
            rgba,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorizerKind {
    Gradient,
    Palette,
}

#[derive(Deserialize)]
struct ColorizerDef {
    kind: ColorizerKind,
    breakpoints: Vec<ColorBreakpoint>,
}

/// Ordered breakpoints mapping attribute values to colors.
///
/// Numeric breakpoints are strictly ascending. Values outside the covered
/// range take the color of the nearest end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ColorizerDef")]
pub struct Colorizer {
    kind: ColorizerKind,
    breakpoints: Vec<ColorBreakpoint>,
}

impl TryFrom<ColorizerDef> for Colorizer {
    type Error = StyleError;

    fn try_from(value: ColorizerDef) -> Result<Self, Self::Error> {
        Self::new(value.kind, value.breakpoints)
    }
}

impl Colorizer {
    pub fn new(kind: ColorizerKind, breakpoints: Vec<ColorBreakpoint>) -> Result<Self, StyleError> {
        let numeric = breakpoints
            .iter()
            .filter(|breakpoint| matches!(breakpoint.value, BreakpointValue::Number(_)))
            .count();
        if numeric != 0 && numeric != breakpoints.len() {
            return Err(StyleError::MixedBreakpoints);
        }
        let mut previous = f64::NEG_INFINITY;
        for (index, breakpoint) in breakpoints.iter().enumerate() {
            if let BreakpointValue::Number(value) = breakpoint.value {
                if !value.is_finite() || value <= previous {
                    return Err(StyleError::UnorderedBreakpoint { index });
                }
                previous = value;
            }
        }
        Ok(Self { kind, breakpoints })
    }

    pub fn kind(&self) -> ColorizerKind {
        self.kind
    }

    pub fn breakpoints(&self) -> &[ColorBreakpoint] {
        &self.breakpoints
    }

    fn is_numeric(&self) -> bool {
        matches!(
            self.breakpoints.first(),
            Some(ColorBreakpoint {
                value: BreakpointValue::Number(_),
                ..
            })
        )
    }

    /// Color for `value`, `None` when no breakpoint applies.
    pub fn lookup(&self, value: &AttributeValue) -> Option<Rgba> {
        if self.breakpoints.is_empty() {
            return None;
        }
        if self.is_numeric() {
            let number = value.as_number().filter(|number| number.is_finite())?;
            return Some(self.lookup_number(number));
        }
        let text = value.to_string();
        self.breakpoints
            .iter()
            .find(|breakpoint| {
                matches!(&breakpoint.value, BreakpointValue::Text(candidate) if *candidate == text)
            })
            .map(|breakpoint| breakpoint.rgba)
    }

    fn lookup_number(&self, number: f64) -> Rgba {
        let values: Vec<(f64, Rgba)> = self
            .breakpoints
            .iter()
            .filter_map(|breakpoint| match breakpoint.value {
                BreakpointValue::Number(value) => Some((value, breakpoint.rgba)),
                BreakpointValue::Text(_) => None,
            })
            .collect();
        let (first_value, first_color) = values[0];
        let (last_value, last_color) = values[values.len() - 1];
        if number <= first_value {
            return first_color;
        }
        if number >= last_value {
            return last_color;
        }
        match self.kind {
            ColorizerKind::Palette => values
                .iter()
                .find(|(value, _)| *value >= number)
                .map_or(last_color, |(_, color)| *color),
            ColorizerKind::Gradient => values
                .windows(2)
                .find(|pair| pair[0].0 <= number && number < pair[1].0)
                .map_or(last_color, |pair| {
                    let (lower, lower_color) = pair[0];
                    let (upper, upper_color) = pair[1];
                    lower_color.interpolate(upper_color, (number - lower) / (upper - lower))
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(kind: ColorizerKind) -> Colorizer {
        Colorizer::new(
            kind,
            vec![
                ColorBreakpoint::numeric(0.0, Rgba::new(0.0, 0.0, 0.0, 1.0)),
                ColorBreakpoint::numeric(10.0, Rgba::new(100.0, 0.0, 0.0, 1.0)),
                ColorBreakpoint::numeric(20.0, Rgba::new(100.0, 200.0, 0.0, 1.0)),
            ],
        )
        .expect("ascending breakpoints")
    }

    #[test]
    fn gradient_interpolates_between_bracketing_breakpoints() {
        let colorizer = ramp(ColorizerKind::Gradient);
        assert_eq!(
            colorizer.lookup(&AttributeValue::from(5.0)),
            Some(Rgba::new(50.0, 0.0, 0.0, 1.0))
        );
        assert_eq!(
            colorizer.lookup(&AttributeValue::from("15")),
            Some(Rgba::new(100.0, 100.0, 0.0, 1.0))
        );
    }

    #[test]
    fn numeric_lookup_clamps_to_outer_breakpoints() {
        let colorizer = ramp(ColorizerKind::Gradient);
        assert_eq!(
            colorizer.lookup(&AttributeValue::from(-3.0)),
            Some(Rgba::new(0.0, 0.0, 0.0, 1.0))
        );
        assert_eq!(
            colorizer.lookup(&AttributeValue::from(99.0)),
            Some(Rgba::new(100.0, 200.0, 0.0, 1.0))
        );
        assert_eq!(colorizer.lookup(&AttributeValue::from("n/a")), None);
    }

    #[test]
    fn palette_picks_first_breakpoint_not_below_value() {
        let colorizer = ramp(ColorizerKind::Palette);
        assert_eq!(
            colorizer.lookup(&AttributeValue::from(10.5)),
            Some(Rgba::new(100.0, 200.0, 0.0, 1.0))
        );
    }

    #[test]
    fn text_breakpoints_match_exactly() {
        let colorizer = Colorizer::new(
            ColorizerKind::Palette,
            vec![
                ColorBreakpoint::text("forest", Rgba::new(0.0, 128.0, 0.0, 1.0)),
                ColorBreakpoint::text("water", Rgba::new(0.0, 0.0, 255.0, 1.0)),
            ],
        )
        .expect("textual breakpoints");
        assert_eq!(
            colorizer.lookup(&AttributeValue::from("water")),
            Some(Rgba::new(0.0, 0.0, 255.0, 1.0))
        );
        assert_eq!(colorizer.lookup(&AttributeValue::from("Water")), None);
    }

    #[test]
    fn invalid_breakpoints_are_rejected() {
        let unordered = Colorizer::new(
            ColorizerKind::Gradient,
            vec![
                ColorBreakpoint::numeric(2.0, Rgba::BLACK),
                ColorBreakpoint::numeric(1.0, Rgba::WHITE),
            ],
        );
        assert_eq!(unordered, Err(StyleError::UnorderedBreakpoint { index: 1 }));

        let mixed = Colorizer::new(
            ColorizerKind::Palette,
            vec![
                ColorBreakpoint::numeric(1.0, Rgba::BLACK),
                ColorBreakpoint::text("x", Rgba::WHITE),
            ],
        );
        assert_eq!(mixed, Err(StyleError::MixedBreakpoints));
    }

    #[test]
    fn deserialization_validates_breakpoints() {
        let json = r#"{"kind":"gradient","breakpoints":[
            {"value":3,"rgba":[0,0,0,1]},{"value":1,"rgba":[1,1,1,1]}]}"#;
        assert!(serde_json::from_str::<Colorizer>(json).is_err());
    }
}
