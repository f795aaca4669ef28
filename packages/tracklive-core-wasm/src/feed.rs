use geo_types::{Coord, Geometry, LineString, MultiLineString, MultiPoint, Point};
use serde::Deserialize;

use crate::layers;
use crate::models::{Feature, FeatureGeometry};
use crate::module_state::ModuleState;

// One complete snapshot from the push feed. Both collections are optional;
// absence (or JSON null) means "clear that layer", not "keep the old one".
#[derive(Deserialize)]
pub struct PushMessage {
    #[serde(default)]
    pub route: Option<serde_json::Value>,
    #[serde(default)]
    pub trace: Option<serde_json::Value>,
}

/// Parse an inbound text frame. Anything that is not a JSON object is a
/// protocol violation — the feed has no versioning or resend mechanism, so
/// the caller treats the error as fatal to the session.
pub fn parse_message(text: &str) -> Result<PushMessage, String> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| format!("unparsable push message: {}", e))?;
    if !value.is_object() {
        return Err("push message is not a document".to_string());
    }
    serde_json::from_value(value).map_err(|e| format!("malformed push message: {}", e))
}

/// Decode one named geometry collection. `None` or JSON null clears the
/// layer (empty result, no error); so does a collection with zero features.
/// A document that is not a feature collection, or a feature whose geometry
/// cannot be constructed, is an error and propagates to the fatal path.
pub fn decode_collection(doc: Option<&serde_json::Value>) -> Result<Vec<Feature>, String> {
    let doc = match doc {
        Some(doc) if !doc.is_null() => doc,
        _ => return Ok(Vec::new()),
    };

    let raw = doc
        .get("features")
        .and_then(|f| f.as_array())
        .ok_or_else(|| "collection has no features array".to_string())?;

    let mut features = Vec::with_capacity(raw.len());
    for value in raw {
        let feature: Feature = serde_json::from_value(value.clone())
            .map_err(|e| format!("malformed feature: {}", e))?;
        // Construct the geometry now so a bad coordinate payload fails the
        // whole message instead of surfacing later during rendering
        build_geometry(&feature.geometry)?;
        features.push(feature);
    }
    Ok(features)
}

/// Construct a typed geometry from the raw GeoJSON document. The feed only
/// carries planned paths and checkin points, so point and line variants are
/// the full supported set.
pub fn build_geometry(doc: &FeatureGeometry) -> Result<Geometry<f64>, String> {
    match doc.r#type.as_str() {
        "Point" => Ok(Geometry::Point(Point::from(coord(&doc.coordinates)?))),
        "MultiPoint" => {
            let coords = coord_list(&doc.coordinates)?;
            Ok(Geometry::MultiPoint(MultiPoint::from(coords)))
        }
        "LineString" => {
            let coords = coord_list(&doc.coordinates)?;
            Ok(Geometry::LineString(LineString::from(coords)))
        }
        "MultiLineString" => {
            let lines = doc
                .coordinates
                .as_array()
                .ok_or_else(|| "MultiLineString coordinates are not an array".to_string())?
                .iter()
                .map(|line| Ok(LineString::from(coord_list(line)?)))
                .collect::<Result<Vec<_>, String>>()?;
            Ok(Geometry::MultiLineString(MultiLineString::new(lines)))
        }
        other => Err(format!("unsupported geometry type: {}", other)),
    }
}

fn coord(value: &serde_json::Value) -> Result<Coord<f64>, String> {
    let pair = value
        .as_array()
        .ok_or_else(|| "coordinate is not an array".to_string())?;
    if pair.len() < 2 {
        return Err("coordinate has fewer than two components".to_string());
    }
    let x = pair[0]
        .as_f64()
        .ok_or_else(|| "coordinate x is not a number".to_string())?;
    let y = pair[1]
        .as_f64()
        .ok_or_else(|| "coordinate y is not a number".to_string())?;
    Ok(Coord { x, y })
}

fn coord_list(value: &serde_json::Value) -> Result<Vec<Coord<f64>>, String> {
    value
        .as_array()
        .ok_or_else(|| "coordinates are not an array".to_string())?
        .iter()
        .map(coord)
        .collect()
}

/// Replace both layers from one decoded message. Both collections are
/// decoded before either layer is touched, so a bad trace document never
/// leaves a half-updated route behind.
pub fn apply_message_to(state: &mut ModuleState, message: &PushMessage) -> Result<(), String> {
    let route = decode_collection(message.route.as_ref())?;
    let trace = decode_collection(message.trace.as_ref())?;
    state.route_layer.replace(route);
    state.trace_layer.replace(trace);
    Ok(())
}

/// Full handling of one inbound text frame: parse, swap both layers, hand
/// the snapshots to the renderer. Any error is a protocol failure the
/// connection manager turns into a redirect.
pub fn ingest(text: &str) -> Result<(), String> {
    let message = parse_message(text)?;
    ModuleState::with_mut(|state| apply_message_to(state, &message))?;
    layers::push_to_renderer();
    Ok(())
}
