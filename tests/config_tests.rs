//! Partial configuration documents fall back to the defaults

use wheelly_brain::mapping::{OccupancyMap, OccupancyMapConfig, SensorModelConfig};
use wheelly_brain::mission_planning::{GotoConfig, RandomTargetConfig, SecureConfig};
use wheelly_brain::BrainError;

#[test]
fn map_config_defaults() {
    let config: OccupancyMapConfig = serde_json::from_str(r#"{ "grid_size": 0.1 }"#).unwrap();
    assert_eq!(config.grid_size, 0.1);
    assert_eq!(config.safe_distance, 0.3);
    assert_eq!(config.likelihood_threshold, 0.5);
    assert_eq!(config.sensor, SensorModelConfig::default());
    assert!(OccupancyMap::new(config).is_ok());
}

#[test]
fn nested_sensor_override() {
    let config: OccupancyMapConfig =
        serde_json::from_str(r#"{ "sensor": { "max_distance": 2.0, "hold_duration_ms": 1000 } }"#).unwrap();
    assert_eq!(config.grid_size, 0.2);
    assert_eq!(config.sensor.max_distance, 2.0);
    assert_eq!(config.sensor.hold_duration_ms, 1000);
    assert_eq!(config.sensor.no_sensitivity_deg, 30.0);
}

#[test]
fn invalid_map_config_is_rejected() {
    let config: OccupancyMapConfig = serde_json::from_str(r#"{ "grid_size": 0.0 }"#).unwrap();
    assert!(matches!(OccupancyMap::new(config), Err(BrainError::InvalidParameter(_))));

    let config: OccupancyMapConfig = serde_json::from_str(r#"{ "likelihood_threshold": 1.5 }"#).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn state_config_defaults() {
    let goto: GotoConfig = serde_json::from_str(r#"{ "distance": 0.3, "timeout_ms": 5000 }"#).unwrap();
    assert_eq!(goto.distance, 0.3);
    assert_eq!(goto.timeout_ms, Some(5000));
    assert_eq!(goto.approach_distance, GotoConfig::default().approach_distance);

    let secure: SecureConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(secure, SecureConfig::default());

    let random: RandomTargetConfig = serde_json::from_str(r#"{ "center": { "x": 1.0, "y": -1.0 } }"#).unwrap();
    assert_eq!(random.center.x, 1.0);
    assert_eq!(random.center.y, -1.0);
    assert_eq!(random.max_distance, 3.0);
}

#[test]
fn config_round_trip_through_json() {
    let config = OccupancyMapConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    let back: OccupancyMapConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}
