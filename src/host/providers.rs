//! Imagery and terrain provider configurations.
//!
//! These are pure data: the engine never fetches tiles itself. A layer
//! carrying a provider config stays `is_loading` until the host reports the
//! provider ready (`Load`) or failed (`LoadError`).

use std::collections::HashMap;

use serde_json::Value;

/// Supported imagery sources, tagged the way they appear in exported
/// documents.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ImageryProviderConfig {
    UrlTemplate {
        url: String,
        #[serde(default)]
        subdomains: Vec<String>,
        #[serde(default)]
        maximum_level: Option<u32>,
    },
    Wms {
        url: String,
        layers: String,
        #[serde(default)]
        parameters: HashMap<String, Value>,
    },
    Wmts {
        url: String,
        layer: String,
        style: String,
        tile_matrix_set_id: String,
    },
    Tms {
        url: String,
        #[serde(default)]
        file_extension: Option<String>,
    },
    Arcgis {
        url: String,
    },
    Bing {
        url: String,
        key: String,
    },
    Osm {
        #[serde(default)]
        url: Option<String>,
    },
}

/// Supported terrain sources.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TerrainProviderConfig {
    CesiumTerrain {
        url: String,
        #[serde(default)]
        request_vertex_normals: bool,
        #[serde(default)]
        request_water_mask: bool,
    },
    ArcgisTiledElevation {
        url: String,
    },
    VrTheWorld {
        url: String,
    },
    GoogleEarthEnterprise {
        url: String,
    },
    /// The smooth WGS84 ellipsoid; no network fetch involved.
    Ellipsoid,
}

impl TerrainProviderConfig {
    /// Whether realizing this provider involves a network round-trip.
    pub fn is_remote(&self) -> bool {
        match *self {
            TerrainProviderConfig::Ellipsoid => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tagged_round_trip() {
        let raw = json!({ "type": "wms", "url": "https://example.com/wms", "layers": "roads" });
        let config: ImageryProviderConfig = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&config).unwrap()["type"], "wms");

        let terrain: TerrainProviderConfig =
            serde_json::from_value(json!({ "type": "ellipsoid" })).unwrap();
        assert!(!terrain.is_remote());
    }
}
