// This is the models module containing shared data structures
use serde::{Deserialize, Serialize};

// GeoJSON-like feature structure
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Feature {
    pub geometry: FeatureGeometry,
    #[serde(default)]
    pub properties: serde_json::Value,
}

// Geometry part of a feature
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FeatureGeometry {
    pub r#type: String,
    pub coordinates: serde_json::Value, // Using Value for flexibility with different geometry types
}

impl Feature {
    /// Read a free-form string attribute ("date", "time", "message", ...).
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.properties
            .get(name)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}
