// THEORY:
// The `gradient_field` module is the first spatial stage. It turns a cloud of
// decoded, geolocated values into a field of local rates of change, which the
// feature detector then groups into structures.
//
// Key principles:
// 1.  **Max-neighbour gradient**: For each sample, every other sample within the
//     search radius is a candidate neighbour. The gradient is the largest
//     `|Δvalue| / distance` among them, and its direction is the great-circle
//     bearing towards the neighbour that produced it.
// 2.  **Total output**: Every input sample yields exactly one `GradientPoint`, in
//     input order. A sample with no qualifying neighbour gets magnitude 0, so a
//     uniform field is an all-zero field rather than an empty one.
// 3.  **Brute force**: The search is O(n²). Sample counts per polygon are in the
//     tens to low hundreds, and each row of the search is independent, so rows
//     are spread across the rayon pool instead of building a spatial index.

pub mod gradient_field {
    use crate::core_modules::utils::geo::geo::LatLng;
    use rayon::prelude::*;
    use serde::Serialize;

    /// A decoded value pinned to a position.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct ValuedPoint {
        pub position: LatLng,
        pub value: f64,
    }

    impl ValuedPoint {
        pub fn new(position: LatLng, value: f64) -> Self {
            Self { position, value }
        }
    }

    /// The local rate of change at one sample.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GradientPoint {
        pub lat: f64,
        pub lng: f64,
        /// The decoded value at this sample.
        pub value: f64,
        /// Units per mile, never negative.
        pub magnitude: f64,
        /// Bearing (degrees, [0, 360)) towards the steepest neighbour.
        pub direction: f64,
    }

    impl GradientPoint {
        pub fn position(&self) -> LatLng {
            LatLng::new(self.lat, self.lng)
        }
    }

    /// The largest value difference between two nearby samples.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct ValueBreak {
        pub from: ValuedPoint,
        pub to: ValuedPoint,
        /// Absolute difference of the two values.
        pub difference: f64,
        pub distance_miles: f64,
    }

    impl ValueBreak {
        pub fn midpoint(&self) -> LatLng {
            self.from.position.midpoint(&self.to.position)
        }
    }

    /// Computes one gradient point per input sample.
    ///
    /// Neighbours further than `max_distance_miles` or closer than
    /// `min_separation_miles` are ignored. Coincident samples are always
    /// ignored, whatever the separation setting.
    pub fn compute_gradients(points: &[ValuedPoint], max_distance_miles: f64, min_separation_miles: f64) -> Vec<GradientPoint> {
        points
            .par_iter()
            .enumerate()
            .map(|(i, point)| {
                let mut magnitude = 0.0;
                let mut direction = 0.0;

                for (j, neighbour) in points.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    let distance = point.position.distance_miles(&neighbour.position);
                    if distance <= f64::EPSILON || distance < min_separation_miles || distance > max_distance_miles {
                        continue;
                    }
                    let gradient = (neighbour.value - point.value).abs() / distance;
                    if gradient > magnitude {
                        magnitude = gradient;
                        direction = point.position.bearing_to(&neighbour.position);
                    }
                }

                GradientPoint {
                    lat: point.position.lat,
                    lng: point.position.lng,
                    value: point.value,
                    magnitude,
                    direction,
                }
            })
            .collect()
    }

    /// The pair of samples within `max_distance_miles` with the largest
    /// absolute value difference. `None` when fewer than two samples are in
    /// range of each other.
    pub fn strongest_difference(points: &[ValuedPoint], max_distance_miles: f64) -> Option<ValueBreak> {
        let mut best: Option<ValueBreak> = None;

        for (i, from) in points.iter().enumerate() {
            for to in &points[i + 1..] {
                let distance_miles = from.position.distance_miles(&to.position);
                if distance_miles > max_distance_miles {
                    continue;
                }
                let difference = (from.value - to.value).abs();
                if best.as_ref().is_none_or(|b| difference > b.difference) {
                    best = Some(ValueBreak {
                        from: *from,
                        to: *to,
                        difference,
                        distance_miles,
                    });
                }
            }
        }

        best
    }

    /// The gradient point with the largest magnitude; first one wins ties.
    pub fn steepest(gradients: &[GradientPoint]) -> Option<&GradientPoint> {
        gradients.iter().fold(None, |best: Option<&GradientPoint>, g| match best {
            Some(b) if b.magnitude >= g.magnitude => Some(b),
            _ => Some(g),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::gradient_field::*;
    use crate::core_modules::utils::geo::geo::LatLng;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    // Roughly half a mile north at 39°N.
    const HALF_MILE_LAT: f64 = 0.00724;

    fn point(lat: f64, lng: f64, value: f64) -> ValuedPoint {
        ValuedPoint::new(LatLng::new(lat, lng), value)
    }

    #[test]
    fn two_samples_half_a_mile_apart() {
        let points = [point(39.0, -71.0, 68.0), point(39.0 + HALF_MILE_LAT, -71.0, 74.0)];
        let gradients = compute_gradients(&points, 1.0, 0.01);

        assert_eq!(gradients.len(), 2);
        assert_relative_eq!(gradients[0].magnitude, 12.0, epsilon = 0.05);
        assert_relative_eq!(gradients[1].magnitude, gradients[0].magnitude);
        // First sample looks north, second looks south.
        assert!(gradients[0].direction < 1.0 || gradients[0].direction > 359.0);
        assert_relative_eq!(gradients[1].direction, 180.0, epsilon = 1.0);
        assert_eq!(gradients[0].value, 68.0);
    }

    #[test]
    fn far_and_coincident_neighbours_are_ignored() {
        let points = [
            point(39.0, -71.0, 60.0),
            point(39.0, -71.0, 80.0),
            point(40.0, -71.0, 90.0),
        ];
        let gradients = compute_gradients(&points, 1.0, 0.01);
        assert!(gradients.iter().all(|g| g.magnitude == 0.0));
    }

    #[test]
    fn coincident_samples_stay_finite_without_a_separation_floor() {
        let points = [
            point(39.0, -71.0, 60.0),
            point(39.0, -71.0, 80.0),
            point(39.0 + HALF_MILE_LAT, -71.0, 66.0),
        ];
        let gradients = compute_gradients(&points, 1.0, 0.0);
        assert!(gradients.iter().all(|g| g.magnitude.is_finite()));
        assert_relative_eq!(gradients[0].magnitude, 12.0, epsilon = 0.05);
        assert_relative_eq!(gradients[1].magnitude, 28.0, epsilon = 0.1);
    }

    #[test]
    fn uniform_field_has_zero_gradient() {
        let points: Vec<ValuedPoint> = (0..5)
            .flat_map(|i| (0..5).map(move |j| point(39.0 + i as f64 * 0.005, -71.0 + j as f64 * 0.005, 70.0)))
            .collect();
        let gradients = compute_gradients(&points, 1.0, 0.01);
        assert_eq!(gradients.len(), 25);
        assert!(gradients.iter().all(|g| g.magnitude == 0.0 && g.direction == 0.0));
    }

    #[test]
    fn strongest_difference_picks_the_largest_nearby_pair() {
        let points = [
            point(39.0, -71.0, 70.0),
            point(39.0 + HALF_MILE_LAT, -71.0, 72.0),
            point(39.0 + 2.0 * HALF_MILE_LAT, -71.0, 76.0),
            // Hotter, but far outside the search radius.
            point(41.0, -71.0, 90.0),
        ];
        let found = strongest_difference(&points, 2.0).unwrap();
        assert_relative_eq!(found.difference, 6.0);
        assert_eq!(found.from.value, 70.0);
        assert_eq!(found.to.value, 76.0);
        assert_relative_eq!(found.midpoint().lat, 39.0 + HALF_MILE_LAT);
    }

    #[test]
    fn strongest_difference_needs_two_samples() {
        assert!(strongest_difference(&[point(39.0, -71.0, 70.0)], 2.0).is_none());
        assert!(strongest_difference(&[], 2.0).is_none());
    }

    #[test]
    fn steepest_prefers_first_on_ties() {
        let points = [point(39.0, -71.0, 68.0), point(39.0 + HALF_MILE_LAT, -71.0, 74.0)];
        let gradients = compute_gradients(&points, 1.0, 0.01);
        let top = steepest(&gradients).unwrap();
        assert_eq!(top.value, 68.0);
        assert!(steepest(&[]).is_none());
    }

    proptest! {
        #[test]
        fn magnitudes_are_never_negative(
            samples in prop::collection::vec((38.9f64..39.1, -71.1f64..-70.9, 35.0f64..89.0), 0..40)
        ) {
            let points: Vec<ValuedPoint> = samples.iter().map(|(lat, lng, v)| point(*lat, *lng, *v)).collect();
            let gradients = compute_gradients(&points, 1.0, 0.01);
            prop_assert_eq!(gradients.len(), points.len());
            for g in &gradients {
                prop_assert!(g.magnitude >= 0.0);
                prop_assert!((0.0..360.0).contains(&g.direction));
            }
        }
    }
}
