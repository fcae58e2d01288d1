//! Basic example of annotating an activity track with POIs.
//!
//! Run with: cargo run --example annotate_activity

use std::collections::HashMap;

use track_annotator::{
    is_point_on_track, match_pois, poi_points, polyline, PoiLocation, PoiMatchConfig, TrackPoint,
};

fn main() {
    env_logger::init();

    // Summary polyline as an activity provider would deliver it
    let encoded = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";
    let track = match polyline::decode(encoded) {
        Ok(track) => track,
        Err(err) => {
            eprintln!("Could not decode polyline: {err}");
            return;
        }
    };

    println!("Decoded {} track points:", track.len());
    for point in &track {
        println!("  ({:.5}, {:.5})", point.latitude, point.longitude);
    }

    // Named POIs, shaped the way a config file would supply them
    let config_json = r#"{
        "Trailhead": {"lat": 38.5, "lon": -120.2},
        "Summit Hut": {"lat": 43.252, "lon": -126.453},
        "Lake Cabin": {"lat": 40.0, "lon": -116.0}
    }"#;
    let locations: HashMap<String, PoiLocation> =
        serde_json::from_str(config_json).expect("valid POI config");
    let pois = poi_points(&locations);

    let config = PoiMatchConfig::default();
    println!(
        "\nMatching {} POIs (max distance {}m, envelope tolerance {} deg):",
        pois.len(),
        config.max_distance_meters,
        config.box_tolerance_degrees
    );

    match match_pois(&track, &pois, &config) {
        Some(matched) => {
            for name in &matched {
                println!("  on track: {name}");
            }
        }
        None => println!("  no POIs on this track"),
    }

    // The standalone check, for a single point
    let cabin = TrackPoint::new(40.0, -116.0);
    println!(
        "\nLake Cabin within 100m of any track point: {}",
        is_point_on_track(&cabin, &track, config.max_distance_meters)
    );
}
