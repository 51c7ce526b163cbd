//! GeoJSON payload extraction.
//!
//! Assistant answers are free-form text that may embed a GeoJSON-like object,
//! either as the whole response, inside a larger JSON envelope, or dropped
//! mid-sentence into prose. This module locates such a payload and validates
//! it loosely: the `type` must come from the closed GeoJSON set and the
//! type-specific required fields must be present, but coordinate shapes and
//! numeric ranges are not checked.
//!
//! Extraction is total: it never errors, it only reports presence or absence.
//! Parse failures at any stage mean "this stage found nothing".

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// The closed set of GeoJSON types the extractor accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeoType {
    /// A single position.
    Point,
    /// A sequence of positions.
    LineString,
    /// One or more linear rings.
    Polygon,
    /// Multiple points.
    MultiPoint,
    /// Multiple line strings.
    MultiLineString,
    /// Multiple polygons.
    MultiPolygon,
    /// A geometry with properties.
    Feature,
    /// An ordered collection of features.
    FeatureCollection,
}

impl GeoType {
    /// Returns the canonical GeoJSON type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoType::Point => "Point",
            GeoType::LineString => "LineString",
            GeoType::Polygon => "Polygon",
            GeoType::MultiPoint => "MultiPoint",
            GeoType::MultiLineString => "MultiLineString",
            GeoType::MultiPolygon => "MultiPolygon",
            GeoType::Feature => "Feature",
            GeoType::FeatureCollection => "FeatureCollection",
        }
    }
}

impl std::fmt::Display for GeoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeoType {
    type Err = ();

    // Type names are case-sensitive, as in GeoJSON itself.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Point" => Ok(GeoType::Point),
            "LineString" => Ok(GeoType::LineString),
            "Polygon" => Ok(GeoType::Polygon),
            "MultiPoint" => Ok(GeoType::MultiPoint),
            "MultiLineString" => Ok(GeoType::MultiLineString),
            "MultiPolygon" => Ok(GeoType::MultiPolygon),
            "Feature" => Ok(GeoType::Feature),
            "FeatureCollection" => Ok(GeoType::FeatureCollection),
            _ => Err(()),
        }
    }
}

/// A loosely validated GeoJSON geometry, feature, or feature collection found
/// in an assistant answer.
///
/// The payload is handed to the rendering collaborator as-is and never
/// mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPayload {
    geo_type: GeoType,
    value: Value,
}

impl GeoPayload {
    /// Returns the payload's GeoJSON type.
    pub fn geo_type(&self) -> GeoType {
        self.geo_type
    }

    /// Returns the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Consumes the payload and returns the underlying JSON value.
    pub fn into_value(self) -> Value {
        self.value
    }
}

// A `geom`-keyed object wrapping one level of nested object, e.g.
// {"geom": {"type":"Point","coordinates":[...]}, "name":"x"}. Bounded
// nesting keeps the scan linear over arbitrary prose.
const NESTED_GEOM_PATTERN: &str = r#"\{[^{}]*"geom"[^{}]*\{[^{}]*\}[^{}]*\}"#;

// Loose fallback: anything brace-delimited mentioning "geom" on one line.
// Can match text that is not JSON at all; the parse attempt sorts that out.
const SIMPLE_GEOM_PATTERN: &str = r#"\{.*?"geom".*?\}"#;

fn nested_geom_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NESTED_GEOM_PATTERN).unwrap_or_else(|_| unreachable!()))
}

fn simple_geom_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SIMPLE_GEOM_PATTERN).unwrap_or_else(|_| unreachable!()))
}

/// Extracts a GeoJSON-like payload from an assistant answer.
///
/// Stages, first success wins:
///
/// 1. Parse the whole text as JSON; on success only that value is searched.
/// 2. Scan for `geom`-keyed object fragments with one level of nesting; the
///    first fragment that parses becomes the sole candidate.
/// 3. Fall back to the loosest brace-delimited `geom` fragment.
///
/// A candidate that parses but fails validation is not retried against later
/// fragments. Empty input yields `None`.
pub fn extract_geo_payload(text: &str) -> Option<GeoPayload> {
    if text.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return find_in_value(&value);
    }

    // Not a JSON document; look for embedded fragments.
    for fragment in nested_geom_regex().find_iter(text) {
        if let Ok(value) = serde_json::from_str::<Value>(fragment.as_str()) {
            return find_in_value(&value);
        }
    }

    let fragment = simple_geom_regex().find(text)?;
    let value = serde_json::from_str::<Value>(fragment.as_str()).ok()?;
    find_in_value(&value)
}

/// Searches a JSON value for a GeoJSON payload.
///
/// Only objects are searched. Priority within an object:
///
/// 1. a `geom` field whose value validates;
/// 2. the object itself;
/// 3. own keys whose lowercased name contains `geom` or `geometry`, in
///    document order, whose value validates directly;
/// 4. depth-first recursion into object-valued fields, in document order.
///
/// Arrays are not traversed.
pub fn find_in_value(value: &Value) -> Option<GeoPayload> {
    let object = value.as_object()?;

    if let Some(geom) = object.get("geom") {
        if let Some(payload) = validate(geom) {
            return Some(payload);
        }
    }

    if let Some(payload) = validate(value) {
        return Some(payload);
    }

    for (key, field) in object {
        let lowered = key.to_lowercase();
        if lowered.contains("geom") || lowered.contains("geometry") {
            if let Some(payload) = validate(field) {
                return Some(payload);
            }
        }
    }

    // Direct checks over all own keys come first; only then descend.
    for (_, field) in object {
        if field.is_object() {
            if let Some(payload) = find_in_value(field) {
                return Some(payload);
            }
        }
    }

    None
}

/// Validates a value as a GeoJSON payload.
///
/// Structural completeness only: a Feature needs a `geometry` object carrying
/// `type` and `coordinates`; a FeatureCollection needs a `features` array
/// (possibly empty); bare geometries need a `coordinates` field of any shape.
pub fn validate(value: &Value) -> Option<GeoPayload> {
    let object = value.as_object()?;
    let type_name = object.get("type")?.as_str()?;
    let geo_type = GeoType::from_str(type_name).ok()?;

    let complete = match geo_type {
        GeoType::Feature => object
            .get("geometry")
            .and_then(Value::as_object)
            .is_some_and(|geometry| {
                geometry.contains_key("type") && geometry.contains_key("coordinates")
            }),
        GeoType::FeatureCollection => {
            object.get("features").is_some_and(Value::is_array)
        }
        _ => object.contains_key("coordinates"),
    };

    complete.then(|| GeoPayload {
        geo_type,
        value: value.clone(),
    })
}
