// THEORY:
// The `FeatureDetector` is the engine of the spatial grouping layer. It looks at
// the gradient field and finds spatially coherent groups of fast-changing water,
// then decides what kind of structure each group is.
//
// Key architectural principles & algorithm steps:
// 1.  **Tiering**: Gradient points are split by magnitude. Points at or above the
//     edge threshold feed the edge pass. Points in the moderate band below it feed
//     the filament/eddy pass. The tiers are disjoint, so no point can end up in
//     two features.
// 2.  **Region Growing**: Within a tier, clusters are grown breadth-first from
//     each unvisited seed. Two points are linked when their great-circle distance
//     is within `cluster_distance_factor × max_distance_miles`. An explicit
//     visited list and work queue keep the traversal iterative.
// 3.  **Geometry**: Each large-enough cluster gets a convex hull, area, perimeter,
//     centroid and bounding-box aspect ratio. A cluster whose hull has no area
//     is dropped; detection carries on with the next one.
// 4.  **Classification**: Strong clusters are edges. Moderate clusters are
//     filaments when elongated, or eddies when round and when enough gradient
//     bearings run along the rim rather than across it.
// 5.  **Scoring & Filtering**: Every feature is scored, then anything smaller than
//     the minimum area is discarded. The survivors are ordered by score.
// 6.  **Stateless Utility**: `detect_features` has no memory between calls.

use crate::config::FeatureSettings;
use crate::core_modules::feature::{
    describe, feature_confidence, temp_diff_c, EddyCore, Feature, FeatureShape, FeatureType, WARM_CORE_THRESHOLD_F,
};
use crate::core_modules::gradient_field::gradient_field::GradientPoint;
use crate::core_modules::utils::geo::geo::{angular_difference, convex_hull, LatLng, Polygon};
use std::collections::VecDeque;
use tracing::{debug, warn};

pub mod feature_detector {
    use super::*;

    /// Finds, classifies and scores every structure in a gradient field.
    ///
    /// The result is sorted by descending score; ids are assigned per kind in
    /// detection order (`edge-0`, `edge-1`, `filament-0`, ...).
    pub fn detect_features(gradients: &[GradientPoint], settings: &FeatureSettings) -> Vec<Feature> {
        // --- 1. Tiering ---
        let strong: Vec<&GradientPoint> = gradients.iter().filter(|g| g.magnitude >= settings.edge_threshold).collect();
        let moderate: Vec<&GradientPoint> = gradients
            .iter()
            .filter(|g| g.magnitude >= settings.weak_threshold && g.magnitude < settings.edge_threshold)
            .collect();

        let link_miles = settings.cluster_distance_factor * settings.max_distance_miles;
        let mut features = Vec::new();

        // --- 2-4. Edge pass ---
        let mut edge_counter = 0;
        for cluster in cluster_points(&strong, link_miles) {
            if cluster.len() < settings.min_edge_points {
                continue;
            }
            let Some(geometry) = ClusterGeometry::measure(&cluster) else {
                warn!(points = cluster.len(), "dropping edge cluster with a degenerate hull");
                continue;
            };
            features.push(build_feature(format!("edge-{}", edge_counter), FeatureShape::Edge, &cluster, geometry));
            edge_counter += 1;
        }

        // --- 2-4. Filament / eddy pass ---
        let mut filament_counter = 0;
        let mut eddy_counter = 0;
        for cluster in cluster_points(&moderate, link_miles) {
            let smallest = settings.min_filament_points.min(settings.min_eddy_points);
            if cluster.len() < smallest {
                continue;
            }
            let Some(geometry) = ClusterGeometry::measure(&cluster) else {
                warn!(points = cluster.len(), "dropping moderate cluster with a degenerate hull");
                continue;
            };

            if geometry.aspect_ratio < settings.filament_max_aspect && cluster.len() >= settings.min_filament_points {
                let shape = FeatureShape::Filament {
                    length_km: geometry.width_km.max(geometry.height_km),
                };
                features.push(build_feature(format!("filament-{}", filament_counter), shape, &cluster, geometry));
                filament_counter += 1;
            } else if geometry.aspect_ratio > settings.eddy_min_aspect && cluster.len() >= settings.min_eddy_points {
                let tangential_fraction = tangential_fraction(&cluster, &geometry.member_centroid, settings.eddy_tangent_tolerance_deg);
                if tangential_fraction < settings.eddy_tangent_consistency {
                    debug!(tangential_fraction, "round cluster rejected as eddy: no rotational pattern");
                    continue;
                }
                let avg = mean_value(&cluster);
                let shape = FeatureShape::Eddy {
                    radius_km: (geometry.area_km2 / std::f64::consts::PI).sqrt(),
                    core: if avg > WARM_CORE_THRESHOLD_F { EddyCore::Warm } else { EddyCore::Cold },
                    tangential_fraction,
                };
                features.push(build_feature(format!("eddy-{}", eddy_counter), shape, &cluster, geometry));
                eddy_counter += 1;
            }
        }

        // --- 5. Area filter and ordering ---
        let detected = features.len();
        features.retain(|f| f.area_km2 >= settings.min_area_km2);
        features.sort_by(|a, b| b.score.cmp(&a.score));

        debug!(
            strong = strong.len(),
            moderate = moderate.len(),
            detected,
            kept = features.len(),
            "feature detection finished"
        );
        features
    }

    /// Breadth-first clustering with a fixed link distance.
    ///
    /// Returns the member points of each cluster, in discovery order.
    pub fn cluster_points<'a>(points: &[&'a GradientPoint], link_miles: f64) -> Vec<Vec<&'a GradientPoint>> {
        let mut visited = vec![false; points.len()];
        let mut clusters = Vec::new();

        for seed in 0..points.len() {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;

            let mut members = Vec::new();
            let mut queue = VecDeque::from([seed]);
            while let Some(current) = queue.pop_front() {
                members.push(points[current]);
                let here = points[current].position();

                for (candidate, point) in points.iter().enumerate() {
                    if !visited[candidate] && here.distance_miles(&point.position()) <= link_miles {
                        visited[candidate] = true;
                        queue.push_back(candidate);
                    }
                }
            }
            clusters.push(members);
        }

        clusters
    }

    /// Fraction of points whose gradient bearing lies within `tolerance_deg` of
    /// the local tangent to a circle around `centre`. The comparison is axial:
    /// both tangent orientations count.
    pub fn tangential_fraction(cluster: &[&GradientPoint], centre: &LatLng, tolerance_deg: f64) -> f64 {
        if cluster.is_empty() {
            return 0.0;
        }
        let tangential = cluster
            .iter()
            .filter(|g| {
                let radial = centre.bearing_to(&g.position());
                let off_tangent = angular_difference(g.direction, radial + 90.0);
                off_tangent.min(180.0 - off_tangent) <= tolerance_deg
            })
            .count();
        tangential as f64 / cluster.len() as f64
    }
}

fn mean_position(positions: &[LatLng]) -> LatLng {
    let n = positions.len().max(1) as f64;
    LatLng::new(
        positions.iter().map(|p| p.lat).sum::<f64>() / n,
        positions.iter().map(|p| p.lng).sum::<f64>() / n,
    )
}

/// Shape measurements of one cluster.
#[derive(Debug, Clone)]
struct ClusterGeometry {
    hull: Polygon,
    area_km2: f64,
    perimeter_km: f64,
    centroid: LatLng,
    /// Mean position of every member, interior points included.
    member_centroid: LatLng,
    width_km: f64,
    height_km: f64,
    aspect_ratio: f64,
}

impl ClusterGeometry {
    /// `None` when the cluster spans no area.
    fn measure(cluster: &[&GradientPoint]) -> Option<Self> {
        let positions: Vec<LatLng> = cluster.iter().map(|g| g.position()).collect();
        let hull = convex_hull(&positions)?;
        let bbox = hull.bbox()?;
        let aspect_ratio = bbox.aspect_ratio()?;
        if aspect_ratio <= 0.0 {
            return None;
        }

        Some(Self {
            area_km2: hull.area_km2(),
            perimeter_km: hull.perimeter_km(),
            centroid: hull.centroid(),
            member_centroid: mean_position(&positions),
            width_km: bbox.width_km(),
            height_km: bbox.height_km(),
            aspect_ratio,
            hull,
        })
    }
}

fn mean_value(cluster: &[&GradientPoint]) -> f64 {
    cluster.iter().map(|g| g.value).sum::<f64>() / cluster.len() as f64
}

fn build_feature(id: String, shape: FeatureShape, cluster: &[&GradientPoint], geometry: ClusterGeometry) -> Feature {
    let min = cluster.iter().map(|g| g.value).fold(f64::INFINITY, f64::min);
    let max = cluster.iter().map(|g| g.value).fold(f64::NEG_INFINITY, f64::max);
    let temp_diff_f = max - min;

    let kind = match shape {
        FeatureShape::Edge => FeatureType::Edge,
        FeatureShape::Filament { .. } => FeatureType::Filament,
        FeatureShape::Eddy { .. } => FeatureType::Eddy,
    };

    let mut feature = Feature {
        id,
        description: describe(&shape, temp_diff_f),
        shape,
        boundary: geometry.hull,
        centroid: geometry.centroid,
        min_temp_f: min,
        max_temp_f: max,
        avg_temp_f: mean_value(cluster),
        temp_diff_f,
        temp_diff_c: temp_diff_c(temp_diff_f),
        area_km2: geometry.area_km2,
        perimeter_km: geometry.perimeter_km,
        aspect_ratio: geometry.aspect_ratio,
        confidence: feature_confidence(kind, temp_diff_f, geometry.aspect_ratio),
        score: 0,
        point_count: cluster.len(),
        color: kind.color(),
    };
    feature.score = feature.compute_score();
    feature
}

#[cfg(test)]
mod tests {
    use super::feature_detector::*;
    use super::*;
    use crate::core_modules::gradient_field::gradient_field::{compute_gradients, ValuedPoint};
    use approx::assert_relative_eq;

    // About half a mile at 39°N.
    const LAT_STEP: f64 = 0.00724;
    const LNG_STEP: f64 = 0.0093;

    /// Two parallel rows, `columns` samples long, with different values.
    fn two_rows(columns: usize, south: f64, north: f64) -> Vec<ValuedPoint> {
        (0..columns)
            .flat_map(|i| {
                let lng = -71.0 + i as f64 * LNG_STEP;
                [
                    ValuedPoint::new(LatLng::new(39.0, lng), south),
                    ValuedPoint::new(LatLng::new(39.0 + LAT_STEP, lng), north),
                ]
            })
            .collect()
    }

    fn gradients_for(points: &[ValuedPoint], settings: &FeatureSettings) -> Vec<GradientPoint> {
        compute_gradients(points, settings.max_distance_miles, settings.min_sample_separation_miles)
    }

    /// Points on a circle with hand-set gradient bearings.
    fn ring(count: usize, radius_km: f64, offset_deg: f64, value: impl Fn(usize) -> f64) -> Vec<GradientPoint> {
        let centre = LatLng::new(39.0, -71.0);
        (0..count)
            .map(|i| {
                let theta = (i as f64 * 360.0 / count as f64).to_radians();
                let lat = centre.lat + radius_km * theta.cos() / 111.195;
                let lng = centre.lng + radius_km * theta.sin() / (111.195 * centre.lat.to_radians().cos());
                let position = LatLng::new(lat, lng);
                GradientPoint {
                    lat,
                    lng,
                    value: value(i),
                    magnitude: 1.0,
                    direction: (centre.bearing_to(&position) + offset_deg).rem_euclid(360.0),
                }
            })
            .collect()
    }

    #[test]
    fn sharp_front_becomes_an_edge() {
        let settings = FeatureSettings::default();
        let gradients = gradients_for(&two_rows(21, 68.0, 74.0), &settings);
        assert!(gradients.iter().all(|g| g.magnitude >= settings.edge_threshold));

        let features = detect_features(&gradients, &settings);
        assert_eq!(features.len(), 1);

        let edge = &features[0];
        assert_eq!(edge.kind(), FeatureType::Edge);
        assert_eq!(edge.id, "edge-0");
        assert_relative_eq!(edge.temp_diff_f, 6.0);
        assert_relative_eq!(edge.avg_temp_f, 71.0);
        assert_relative_eq!(edge.confidence, 1.0);
        assert!(edge.area_km2 >= settings.min_area_km2);
        assert!(edge.aspect_ratio > 0.0 && edge.aspect_ratio < 0.1);
        assert_eq!(edge.point_count, 42);
        assert!(edge.score > 60 && edge.score <= 100);
    }

    #[test]
    fn gentle_elongated_front_becomes_a_filament() {
        let settings = FeatureSettings::default();
        let gradients = gradients_for(&two_rows(21, 70.0, 70.75), &settings);

        let features = detect_features(&gradients, &settings);
        assert_eq!(features.len(), 1);
        match features[0].shape {
            FeatureShape::Filament { length_km } => assert!(length_km > 15.0 && length_km < 17.0),
            ref other => panic!("expected a filament, got {:?}", other),
        }
        assert_eq!(features[0].id, "filament-0");
        assert!(features[0].description.starts_with("Temperature filament"));
    }

    #[test]
    fn uniform_field_has_no_features() {
        let settings = FeatureSettings::default();
        let gradients = gradients_for(&two_rows(21, 70.0, 70.0), &settings);
        assert!(detect_features(&gradients, &settings).is_empty());
    }

    #[test]
    fn small_clusters_are_ignored() {
        let settings = FeatureSettings::default();
        // One column only: two strong points, below the edge minimum.
        let gradients = gradients_for(&two_rows(1, 68.0, 74.0), &settings);
        assert_eq!(gradients.len(), 2);
        assert!(detect_features(&gradients, &settings).is_empty());
    }

    #[test]
    fn short_edges_fall_below_the_area_minimum() {
        let settings = FeatureSettings::default();
        // Three columns: a hull of about one mile by half a mile.
        let gradients = gradients_for(&two_rows(3, 68.0, 74.0), &settings);
        assert!(detect_features(&gradients, &settings).is_empty());

        let permissive = FeatureSettings {
            min_area_km2: 0.1,
            ..FeatureSettings::default()
        };
        assert_eq!(detect_features(&gradients, &permissive).len(), 1);
    }

    #[test]
    fn rotating_ring_becomes_an_eddy() {
        let settings = FeatureSettings::default();
        let gradients = ring(12, 3.0, 90.0, |i| if i % 2 == 0 { 72.0 } else { 75.0 });

        let features = detect_features(&gradients, &settings);
        assert_eq!(features.len(), 1);
        let eddy = &features[0];
        assert_eq!(eddy.id, "eddy-0");
        assert!(eddy.aspect_ratio > 0.8);
        match eddy.shape {
            FeatureShape::Eddy {
                radius_km,
                core,
                tangential_fraction,
            } => {
                assert!(radius_km > 2.5 && radius_km < 3.0);
                assert_eq!(core, EddyCore::Warm);
                assert_relative_eq!(tangential_fraction, 1.0);
            }
            ref other => panic!("expected an eddy, got {:?}", other),
        }
    }

    #[test]
    fn rotation_is_tested_around_the_member_mean() {
        let point = |lat: f64, lng: f64| GradientPoint {
            lat,
            lng,
            value: 70.0,
            magnitude: 1.0,
            direction: 0.0,
        };
        let members = [
            point(39.0, -71.0),
            point(39.0, -70.9),
            point(39.1, -70.9),
            point(39.1, -71.0),
            point(39.09, -70.91),
        ];
        let refs: Vec<&GradientPoint> = members.iter().collect();
        let geometry = ClusterGeometry::measure(&refs).unwrap();

        assert_relative_eq!(geometry.centroid.lat, 39.05, epsilon = 1e-9);
        assert_relative_eq!(geometry.member_centroid.lat, 39.058, epsilon = 1e-9);
        assert_relative_eq!(geometry.member_centroid.lng, -70.942, epsilon = 1e-9);
    }

    #[test]
    fn radial_ring_is_not_an_eddy() {
        let settings = FeatureSettings::default();
        let gradients = ring(12, 3.0, 0.0, |_| 66.0);
        assert!(detect_features(&gradients, &settings).is_empty());
    }

    #[test]
    fn tangent_test_is_axial() {
        let forward = ring(8, 3.0, 90.0, |_| 70.0);
        let backward = ring(8, 3.0, 270.0, |_| 70.0);
        let centre = LatLng::new(39.0, -71.0);
        let refs = |v: &[GradientPoint]| -> f64 {
            let r: Vec<&GradientPoint> = v.iter().collect();
            tangential_fraction(&r, &centre, 45.0)
        };
        assert_relative_eq!(refs(&forward), 1.0);
        assert_relative_eq!(refs(&backward), 1.0);
    }

    #[test]
    fn clustering_links_within_distance() {
        let near = ring(12, 3.0, 0.0, |_| 70.0);
        let mut far = near.clone();
        for g in &mut far {
            g.lat += 1.0;
        }
        let all: Vec<&GradientPoint> = near.iter().chain(far.iter()).collect();
        let clusters = cluster_points(&all, 2.0);
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|c| c.len() == 12));
    }

    #[test]
    fn collinear_cluster_is_dropped() {
        let settings = FeatureSettings {
            min_area_km2: 0.0,
            ..FeatureSettings::default()
        };
        let gradients: Vec<GradientPoint> = (0..6)
            .map(|i| GradientPoint {
                lat: 39.0,
                lng: -71.0 + i as f64 * LNG_STEP,
                value: 70.0 + i as f64,
                magnitude: 3.0,
                direction: 90.0,
            })
            .collect();
        assert!(detect_features(&gradients, &settings).is_empty());
    }
}
