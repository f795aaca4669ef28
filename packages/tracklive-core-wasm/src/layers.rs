use serde::Serialize;

use crate::models::Feature;
use crate::module_state::ModuleState;

// The two vector layers driven by the push feed. Base tile layers live on
// the JS side; only their retry state is tracked here (see backoff.rs).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerName {
    Route,
    Trace,
}

impl LayerName {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerName::Route => "route",
            LayerName::Trace => "trace",
        }
    }
}

// A renderable feature container. The rendering library keeps the actual
// OpenLayers-style source on the JS side; this is the authoritative copy the
// feed replaces on every message.
pub struct FeatureLayer {
    name: LayerName,
    features: Vec<Feature>,
    revision: u64,
}

#[derive(Serialize)]
struct LayerSnapshot<'a> {
    r#type: &'static str,
    features: &'a [Feature],
}

impl FeatureLayer {
    pub fn new(name: LayerName) -> Self {
        FeatureLayer {
            name,
            features: Vec::new(),
            revision: 0,
        }
    }

    pub fn name(&self) -> LayerName {
        self.name
    }

    /// Replace the layer's entire contents. Always clear-then-set, never a
    /// merge; an empty slice leaves the layer empty rather than stale. The
    /// revision is bumped on every swap so the renderer can redraw cheaply.
    pub fn replace(&mut self, features: Vec<Feature>) {
        self.features.clear();
        self.features = features;
        self.revision += 1;
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Serialize the current contents as a GeoJSON feature collection for the
    /// rendering library.
    pub fn snapshot_json(&self) -> String {
        let snapshot = LayerSnapshot {
            r#type: "FeatureCollection",
            features: &self.features,
        };
        serde_json::to_string(&snapshot).unwrap_or_else(|_| {
            String::from("{\"type\":\"FeatureCollection\",\"features\":[]}")
        })
    }
}

/// Hand both layers' current contents to the rendering library. Called once
/// per inbound message, after both layers have been swapped.
pub fn push_to_renderer() {
    let snapshots = ModuleState::with(|state| {
        [&state.route_layer, &state.trace_layer]
            .map(|layer| (layer.name().as_str(), layer.snapshot_json()))
    });
    for (name, json) in snapshots {
        crate::apply_layer_features(name, &json);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Feature, FeatureGeometry};

    fn point(x: f64, y: f64) -> Feature {
        Feature {
            geometry: FeatureGeometry {
                r#type: "Point".to_string(),
                coordinates: serde_json::json!([x, y]),
            },
            properties: serde_json::Value::Null,
        }
    }

    #[test]
    fn replace_is_a_full_swap() {
        let mut layer = FeatureLayer::new(LayerName::Route);
        layer.replace(vec![point(1.0, 2.0), point(3.0, 4.0)]);
        assert_eq!(layer.len(), 2);

        // A smaller set replaces, it does not union with prior content
        layer.replace(vec![point(5.0, 6.0)]);
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.features()[0], point(5.0, 6.0));
    }

    #[test]
    fn replace_with_empty_clears() {
        let mut layer = FeatureLayer::new(LayerName::Trace);
        layer.replace(vec![point(1.0, 2.0)]);
        layer.replace(Vec::new());
        assert!(layer.is_empty());
    }

    #[test]
    fn revision_bumps_on_every_swap() {
        let mut layer = FeatureLayer::new(LayerName::Trace);
        assert_eq!(layer.revision(), 0);
        layer.replace(vec![point(1.0, 2.0)]);
        layer.replace(Vec::new());
        assert_eq!(layer.revision(), 2);
    }

    #[test]
    fn snapshot_is_a_feature_collection() {
        let mut layer = FeatureLayer::new(LayerName::Route);
        layer.replace(vec![point(438700.0, 7264409.0)]);
        let json: serde_json::Value = serde_json::from_str(&layer.snapshot_json()).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"].as_array().unwrap().len(), 1);
    }
}
