use std::collections::HashMap;

use super::*;

fn config_from(vars: &[(&str, &str)]) -> Result<EditorConfig, ConfigError> {
    let vars: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    EditorConfig::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn defaults_when_unset() {
    let cfg = config_from(&[]).unwrap();
    assert_eq!(cfg.api_base, DEFAULT_API_BASE);
    assert_eq!(cfg.tile_url, DEFAULT_TILE_URL);
    assert_eq!(cfg.tile_source_layer, "factory");
    assert_eq!(cfg.timeouts, StoreTimeouts::default());
}

#[test]
fn overrides_are_applied_and_trailing_slash_trimmed() {
    let cfg = config_from(&[
        ("FLOORPLAN_API_BASE", "https://plant.example/api/"),
        ("FLOORPLAN_TILE_URL", "https://tiles.example/{z}/{x}/{y}.pbf"),
        ("FLOORPLAN_TILE_SOURCE_LAYER", "hall"),
        ("FLOORPLAN_REQUEST_TIMEOUT_SECS", "5"),
        ("FLOORPLAN_CONNECT_TIMEOUT_SECS", "2"),
    ])
    .unwrap();
    assert_eq!(cfg.api_base, "https://plant.example/api");
    assert_eq!(cfg.timeouts, StoreTimeouts { request_secs: 5, connect_secs: 2 });
    let basemap = cfg.basemap();
    assert_eq!(basemap.tiles_url, "https://tiles.example/{z}/{x}/{y}.pbf");
    assert_eq!(basemap.source_layer, "hall");
}

#[test]
fn unparsable_timeouts_fall_back_to_defaults() {
    let cfg = config_from(&[("FLOORPLAN_REQUEST_TIMEOUT_SECS", "soon")]).unwrap();
    assert_eq!(cfg.timeouts.request_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
}

#[test]
fn non_http_api_base_is_rejected() {
    let err = config_from(&[("FLOORPLAN_API_BASE", "localhost:7998")]).unwrap_err();
    assert_eq!(err, ConfigError::InvalidUrl { var: "FLOORPLAN_API_BASE", value: "localhost:7998".into() });
}

#[test]
fn tile_url_needs_placeholders() {
    let err = config_from(&[("FLOORPLAN_TILE_URL", "http://tiles/{z}/tile.pbf")]).unwrap_err();
    assert!(matches!(err, ConfigError::MissingTilePlaceholders(_)));
    assert!(err.to_string().contains("{z}, {x} and {y}"));
}
