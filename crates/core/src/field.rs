use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RectError {
    #[error("Malformed rectangle: {0}")]
    Malformed(String),
    #[error("Negative rectangle size: {width}x{height}")]
    NegativeSize { width: i64, height: i64 },
    #[error("Rectangle has no area inside a {image_width}x{image_height} image")]
    EmptyRegion { image_width: u32, image_height: u32 },
}

/// A field rectangle as written in the configuration, in reference-image pixels.
/// Values may be negative or exceed the image; see [`RoiRect::clamp_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// A rectangle known to lie inside an image and to have a positive area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RoiRect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self { x, y, width, height }
    }

    /// Clamp against an image of `image_width` x `image_height`.
    ///
    /// Negative origins move to 0 and the far corner is cut at the image edge.
    /// A negative width or height is rejected rather than clamped.
    pub fn clamp_to(&self, image_width: u32, image_height: u32) -> Result<PixelRegion, RectError> {
        if self.width < 0 || self.height < 0 {
            return Err(RectError::NegativeSize { width: self.width, height: self.height });
        }

        let x = self.x.max(0);
        let y = self.y.max(0);
        let x2 = x.saturating_add(self.width).min(i64::from(image_width));
        let y2 = y.saturating_add(self.height).min(i64::from(image_height));

        if x >= x2 || y >= y2 {
            return Err(RectError::EmptyRegion { image_width, image_height });
        }

        // x < x2 <= image_width, so every value fits in u32.
        Ok(PixelRegion {
            x: x as u32,
            y: y as u32,
            width: (x2 - x) as u32,
            height: (y2 - y) as u32,
        })
    }

    fn from_value(value: &Value) -> Result<Self, RectError> {
        let obj = value
            .as_object()
            .ok_or_else(|| RectError::Malformed(format!("expected an object, got {}", kind_of(value))))?;

        let coord = |key: &str| -> Result<i64, RectError> {
            let v = obj
                .get(key)
                .ok_or_else(|| RectError::Malformed(format!("missing '{key}'")))?;
            coordinate(v).ok_or_else(|| RectError::Malformed(format!("'{key}' is not an integer: {v}")))
        };

        Ok(Self {
            x: coord("x")?,
            y: coord("y")?,
            width: coord("width")?,
            height: coord("height")?,
        })
    }
}

impl fmt::Display for RoiRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {}x{}", self.x, self.y, self.width, self.height)
    }
}

/// Accepts JSON integers, floats (truncated toward zero) and integer strings.
fn coordinate(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            (f.is_finite() && f.abs() < i64::MAX as f64).then(|| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Field name → rectangle mapping, loaded once and shared read-only.
///
/// Entries stay as raw JSON until asked for, so one bad rectangle only affects
/// its own field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldConfig {
    fields: BTreeMap<String, Value>,
}

impl FieldConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|e| match e {
            ConfigError::FieldJson { source, .. } => ConfigError::FieldJson {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|source| ConfigError::FieldJson { path: None, source })
    }

    /// Build a configuration from already-valid rectangles.
    pub fn from_rects<I, S>(rects: I) -> Self
    where
        I: IntoIterator<Item = (S, RoiRect)>,
        S: Into<String>,
    {
        let fields = rects
            .into_iter()
            .map(|(name, r)| {
                let value = serde_json::json!({
                    "x": r.x, "y": r.y, "width": r.width, "height": r.height,
                });
                (name.into(), value)
            })
            .collect();
        Self { fields }
    }

    /// Insert or replace a raw entry.
    pub fn insert_raw(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Field names in iteration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse the rectangle configured for `name`.
    pub fn rect(&self, name: &str) -> Option<Result<RoiRect, RectError>> {
        self.fields.get(name).map(RoiRect::from_value)
    }

    /// Every field with its parsed rectangle.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Result<RoiRect, RectError>)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), RoiRect::from_value(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_well_formed_entries() {
        let cfg = FieldConfig::from_json(
            r#"{"name": {"x": 10, "y": 20, "width": 300, "height": 40}}"#,
        )
        .unwrap();
        assert_eq!(cfg.rect("name").unwrap().unwrap(), RoiRect::new(10, 20, 300, 40));
        assert!(cfg.rect("missing").is_none());
    }

    #[test]
    fn malformed_entry_does_not_poison_others() {
        let cfg = FieldConfig::from_json(
            r#"{
                "age": {"x": 1, "y": 2, "width": 3, "height": 4},
                "bad": [1, 2, 3, 4],
                "partial": {"x": 1, "y": 2, "width": 3},
                "word": {"x": "left", "y": 2, "width": 3, "height": 4}
            }"#,
        )
        .unwrap();

        assert!(cfg.rect("age").unwrap().is_ok());
        assert!(matches!(cfg.rect("bad"), Some(Err(RectError::Malformed(_)))));
        assert!(matches!(cfg.rect("partial"), Some(Err(RectError::Malformed(_)))));
        assert!(matches!(cfg.rect("word"), Some(Err(RectError::Malformed(_)))));
        assert_eq!(cfg.len(), 4);
    }

    #[test]
    fn accepts_floats_and_numeric_strings() {
        let mut cfg = FieldConfig::default();
        cfg.insert_raw("f", json!({"x": 10.9, "y": "20", "width": 5, "height": -0.5}));
        assert_eq!(cfg.rect("f").unwrap().unwrap(), RoiRect::new(10, 20, 5, 0));
    }

    #[test]
    fn names_are_sorted() {
        let cfg = FieldConfig::from_rects([
            ("systolic", RoiRect::new(0, 0, 1, 1)),
            ("age", RoiRect::new(0, 0, 1, 1)),
        ]);
        assert_eq!(cfg.names().collect::<Vec<_>>(), vec!["age", "systolic"]);
    }

    #[test]
    fn clamp_negative_origin_to_zero() {
        let r = RoiRect::new(-5, -10, 20, 20).clamp_to(100, 100).unwrap();
        assert_eq!(r, PixelRegion { x: 0, y: 0, width: 20, height: 20 });
    }

    #[test]
    fn clamp_far_corner_to_image() {
        let r = RoiRect::new(90, 95, 50, 50).clamp_to(100, 100).unwrap();
        assert_eq!(r, PixelRegion { x: 90, y: 95, width: 10, height: 5 });
    }

    #[test]
    fn negative_size_is_rejected() {
        assert!(matches!(
            RoiRect::new(0, 0, -1, 10).clamp_to(100, 100),
            Err(RectError::NegativeSize { .. })
        ));
        assert!(matches!(
            RoiRect::new(0, 0, 10, -1).clamp_to(100, 100),
            Err(RectError::NegativeSize { .. })
        ));
    }

    #[test]
    fn outside_or_empty_is_empty_region() {
        assert!(matches!(
            RoiRect::new(200, 200, 10, 10).clamp_to(100, 100),
            Err(RectError::EmptyRegion { .. })
        ));
        assert!(matches!(
            RoiRect::new(10, 10, 0, 10).clamp_to(100, 100),
            Err(RectError::EmptyRegion { .. })
        ));
    }

    #[test]
    fn huge_values_do_not_overflow() {
        let r = RoiRect::new(i64::MAX - 1, 0, i64::MAX, 10).clamp_to(100, 100);
        assert!(matches!(r, Err(RectError::EmptyRegion { .. })));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field_config.json");
        std::fs::write(&path, r#"{"name": {"x": 1, "y": 1, "width": 1, "height": 1}}"#).unwrap();
        let cfg = FieldConfig::load(&path).unwrap();
        assert_eq!(cfg.len(), 1);

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            FieldConfig::load(&path),
            Err(ConfigError::FieldJson { path: Some(_), .. })
        ));
    }
}
