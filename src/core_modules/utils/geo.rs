// Spherical helpers shared by every stage that reasons about distance or shape.
// Coordinates are WGS84 degrees; distances use the haversine formula on a
// spherical Earth, areas use the spherical-excess ring formula.

pub mod geo {
    use serde::{Deserialize, Serialize};

    /// Mean Earth radius used for distances.
    pub const EARTH_RADIUS_KM: f64 = 6371.0088;
    /// Equatorial radius used for ring areas.
    pub const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.137;
    pub const KM_PER_MILE: f64 = 1.609344;

    /// A single geographic position.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct LatLng {
        pub lat: f64,
        pub lng: f64,
    }

    impl LatLng {
        pub fn new(lat: f64, lng: f64) -> Self {
            Self { lat, lng }
        }

        /// True when the position lies within the WGS84 coordinate domain.
        pub fn is_valid(&self) -> bool {
            self.lat.is_finite()
                && self.lng.is_finite()
                && (-90.0..=90.0).contains(&self.lat)
                && (-180.0..=180.0).contains(&self.lng)
        }

        /// Great-circle distance in kilometres.
        pub fn distance_km(&self, other: &LatLng) -> f64 {
            let d_lat = (other.lat - self.lat).to_radians();
            let d_lng = (other.lng - self.lng).to_radians();
            let a = (d_lat / 2.0).sin().powi(2)
                + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
            let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
            EARTH_RADIUS_KM * c
        }

        /// Great-circle distance in statute miles.
        pub fn distance_miles(&self, other: &LatLng) -> f64 {
            self.distance_km(other) / KM_PER_MILE
        }

        /// Initial great-circle bearing towards `other`, in degrees [0, 360).
        pub fn bearing_to(&self, other: &LatLng) -> f64 {
            let phi1 = self.lat.to_radians();
            let phi2 = other.lat.to_radians();
            let d_lng = (other.lng - self.lng).to_radians();
            let y = d_lng.sin() * phi2.cos();
            let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lng.cos();
            normalize_degrees(y.atan2(x).to_degrees())
        }

        /// Planar midpoint; adequate at the scale of a single analysis polygon.
        pub fn midpoint(&self, other: &LatLng) -> LatLng {
            LatLng::new((self.lat + other.lat) / 2.0, (self.lng + other.lng) / 2.0)
        }

        /// `[lng, lat]` ordering, as used by GeoJSON.
        pub fn to_lng_lat(&self) -> [f64; 2] {
            [self.lng, self.lat]
        }
    }

    /// Wraps any angle into [0, 360).
    pub fn normalize_degrees(angle: f64) -> f64 {
        let wrapped = angle.rem_euclid(360.0);
        if wrapped >= 360.0 { 0.0 } else { wrapped }
    }

    /// Smallest absolute difference between two bearings, in [0, 180].
    pub fn angular_difference(a: f64, b: f64) -> f64 {
        let diff = normalize_degrees(a - b);
        diff.min(360.0 - diff)
    }

    /// An axis-aligned lat/lng box.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct BoundingBox {
        pub west: f64,
        pub south: f64,
        pub east: f64,
        pub north: f64,
    }

    impl BoundingBox {
        pub fn from_points<'a, I>(points: I) -> Option<Self>
        where
            I: IntoIterator<Item = &'a LatLng>,
        {
            let mut iter = points.into_iter();
            let first = iter.next()?;
            let mut bbox = BoundingBox {
                west: first.lng,
                south: first.lat,
                east: first.lng,
                north: first.lat,
            };
            for p in iter {
                bbox.west = bbox.west.min(p.lng);
                bbox.east = bbox.east.max(p.lng);
                bbox.south = bbox.south.min(p.lat);
                bbox.north = bbox.north.max(p.lat);
            }
            Some(bbox)
        }

        pub fn contains(&self, point: &LatLng) -> bool {
            point.lng >= self.west && point.lng <= self.east && point.lat >= self.south && point.lat <= self.north
        }

        /// East-west extent measured along the southern edge.
        pub fn width_km(&self) -> f64 {
            LatLng::new(self.south, self.west).distance_km(&LatLng::new(self.south, self.east))
        }

        /// North-south extent measured along the western edge.
        pub fn height_km(&self) -> f64 {
            LatLng::new(self.south, self.west).distance_km(&LatLng::new(self.north, self.west))
        }

        /// `min(width, height) / max(width, height)`, or `None` for a degenerate box.
        pub fn aspect_ratio(&self) -> Option<f64> {
            let width = self.width_km();
            let height = self.height_km();
            let longest = width.max(height);
            if longest <= f64::EPSILON {
                return None;
            }
            Some(width.min(height) / longest)
        }
    }

    /// A closed ring of positions. The closing vertex is stored explicitly.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(from = "Vec<[f64; 2]>", into = "Vec<[f64; 2]>")]
    pub struct Polygon {
        ring: Vec<LatLng>,
    }

    impl From<Vec<[f64; 2]>> for Polygon {
        fn from(pairs: Vec<[f64; 2]>) -> Self {
            Polygon::from_lng_lat(&pairs)
        }
    }

    impl From<Polygon> for Vec<[f64; 2]> {
        fn from(polygon: Polygon) -> Self {
            polygon.ring.iter().map(LatLng::to_lng_lat).collect()
        }
    }

    impl Polygon {
        /// Builds a polygon from `[lng, lat]` pairs, closing the ring if needed.
        pub fn from_lng_lat(pairs: &[[f64; 2]]) -> Self {
            Self::from_vertices(pairs.iter().map(|[lng, lat]| LatLng::new(*lat, *lng)).collect())
        }

        pub fn from_vertices(mut ring: Vec<LatLng>) -> Self {
            if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
                if first != last {
                    ring.push(first);
                }
            }
            Self { ring }
        }

        /// The closed ring, first vertex repeated at the end.
        pub fn ring(&self) -> &[LatLng] {
            &self.ring
        }

        /// The distinct vertices (ring without the closing duplicate).
        pub fn vertices(&self) -> &[LatLng] {
            match self.ring.len() {
                0 => &self.ring,
                n => &self.ring[..n - 1],
            }
        }

        /// Surface area in km² using the spherical ring-area formula.
        pub fn area_km2(&self) -> f64 {
            let vertices = self.vertices();
            let n = vertices.len();
            if n < 3 {
                return 0.0;
            }
            let mut total = 0.0;
            for i in 0..n {
                let p1 = vertices[i];
                let p2 = vertices[(i + 1) % n];
                let p3 = vertices[(i + 2) % n];
                total += (p3.lng.to_radians() - p1.lng.to_radians()) * p2.lat.to_radians().sin();
            }
            (total * EARTH_EQUATORIAL_RADIUS_KM * EARTH_EQUATORIAL_RADIUS_KM / 2.0).abs()
        }

        /// Length of the closed ring in kilometres.
        pub fn perimeter_km(&self) -> f64 {
            self.ring.windows(2).map(|pair| pair[0].distance_km(&pair[1])).sum()
        }

        /// Vertex centroid. Falls back to (0, 0) for an empty polygon.
        pub fn centroid(&self) -> LatLng {
            let vertices = self.vertices();
            if vertices.is_empty() {
                return LatLng::new(0.0, 0.0);
            }
            let n = vertices.len() as f64;
            let lat = vertices.iter().map(|p| p.lat).sum::<f64>() / n;
            let lng = vertices.iter().map(|p| p.lng).sum::<f64>() / n;
            LatLng::new(lat, lng)
        }

        pub fn bbox(&self) -> Option<BoundingBox> {
            BoundingBox::from_points(self.vertices())
        }

        /// Ray-casting point-in-polygon test.
        pub fn contains(&self, point: &LatLng) -> bool {
            let vertices = self.vertices();
            let n = vertices.len();
            if n < 3 {
                return false;
            }
            let mut inside = false;
            let mut j = n - 1;
            for i in 0..n {
                let (pi, pj) = (vertices[i], vertices[j]);
                if (pi.lat > point.lat) != (pj.lat > point.lat) {
                    let crossing = (pj.lng - pi.lng) * (point.lat - pi.lat) / (pj.lat - pi.lat) + pi.lng;
                    if point.lng < crossing {
                        inside = !inside;
                    }
                }
                j = i;
            }
            inside
        }

        /// Up to `count` cell-centre points of a regular grid laid over the
        /// bounding box, keeping only those inside the polygon.
        pub fn grid_points(&self, count: usize) -> Vec<LatLng> {
            let Some(bbox) = self.bbox() else {
                return Vec::new();
            };
            if count == 0 {
                return Vec::new();
            }
            let grid_size = (count as f64).sqrt().ceil() as usize;
            let lng_step = (bbox.east - bbox.west) / grid_size as f64;
            let lat_step = (bbox.north - bbox.south) / grid_size as f64;

            let mut points = Vec::with_capacity(count);
            for i in 0..grid_size {
                for j in 0..grid_size {
                    let candidate = LatLng::new(
                        bbox.south + lat_step * (j as f64 + 0.5),
                        bbox.west + lng_step * (i as f64 + 0.5),
                    );
                    if self.contains(&candidate) {
                        points.push(candidate);
                    }
                }
            }
            points.truncate(count);
            points
        }
    }

    fn cross(o: &LatLng, a: &LatLng, b: &LatLng) -> f64 {
        (a.lng - o.lng) * (b.lat - o.lat) - (a.lat - o.lat) * (b.lng - o.lng)
    }

    /// Monotone-chain convex hull in lng/lat space.
    ///
    /// Returns `None` when the points do not span a non-zero area (fewer than
    /// three distinct points, or all collinear).
    pub fn convex_hull(points: &[LatLng]) -> Option<Polygon> {
        let mut sorted: Vec<LatLng> = points.iter().copied().filter(LatLng::is_valid).collect();
        sorted.sort_by(|a, b| a.lng.total_cmp(&b.lng).then(a.lat.total_cmp(&b.lat)));
        sorted.dedup();
        if sorted.len() < 3 {
            return None;
        }

        let mut lower: Vec<LatLng> = Vec::with_capacity(sorted.len());
        for p in &sorted {
            while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0 {
                lower.pop();
            }
            lower.push(*p);
        }

        let mut upper: Vec<LatLng> = Vec::with_capacity(sorted.len());
        for p in sorted.iter().rev() {
            while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0 {
                upper.pop();
            }
            upper.push(*p);
        }

        lower.pop();
        upper.pop();
        lower.extend(upper);

        if lower.len() < 3 {
            return None;
        }
        let hull = Polygon::from_vertices(lower);
        if hull.area_km2() <= f64::EPSILON {
            return None;
        }
        Some(hull)
    }
}
