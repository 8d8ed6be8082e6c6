// THEORY:
// The `PixelSample` is the most fundamental unit of the engine. It is a "dumb"
// data container for one colour read off a rendered map tile, together with the
// geographic position it was read at and the layer it came from. It knows a few
// single-pixel heuristics (hue, grayscale test, channel distance) that the
// decoder needs, but nothing about neighbours or physical meaning; turning a
// colour into a temperature or a concentration is the colormap's job.
//
// Key principles:
// 1) Single-pixel scope: nothing here reads other samples.
// 2) Validated at the boundary: `PixelSample::new` enforces the coordinate domain;
//    deserialized samples are re-checked by the pipeline with `is_valid`.

pub mod pixel {
    use crate::core_modules::utils::geo::geo::LatLng;
    use crate::error::{AnalysisError, Result};
    use serde::{Deserialize, Serialize};

    pub type Channel = u8;
    pub type Hue = f64;

    /// Which rendered layer a sample was read from.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Layer {
        /// Sea-surface temperature.
        Sst,
        /// Chlorophyll-a concentration.
        Chl,
    }

    /// An RGB triple as painted by a tile server.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Rgb {
        pub r: Channel,
        pub g: Channel,
        pub b: Channel,
    }

    impl Rgb {
        pub const fn new(r: Channel, g: Channel, b: Channel) -> Self {
            Self { r, g, b }
        }

        /// No chroma at all: grayscale renders mean "no data" or cloud cover.
        pub fn is_grayscale(&self) -> bool {
            self.r == self.g && self.g == self.b
        }

        /// Euclidean distance in RGB space.
        pub fn distance(&self, other: &Rgb) -> f64 {
            let dr = self.r as f64 - other.r as f64;
            let dg = self.g as f64 - other.g as f64;
            let db = self.b as f64 - other.b as f64;
            (dr * dr + dg * dg + db * db).sqrt()
        }

        /// HSV hue in degrees [0, 360). Grayscale colours report 0.
        pub fn hue(&self) -> Hue {
            let r = self.r as f64;
            let g = self.g as f64;
            let b = self.b as f64;
            let max = r.max(g).max(b);
            let min = r.min(g).min(b);
            let delta = max - min;
            if delta == 0.0 {
                return 0.0;
            }

            let sector = if max == r {
                ((g - b) / delta).rem_euclid(6.0)
            } else if max == g {
                (b - r) / delta + 2.0
            } else {
                (r - g) / delta + 4.0
            };

            let hue = sector * 60.0;
            if hue < 0.0 { hue + 360.0 } else { hue }
        }
    }

    /// One colour sample read from a tile inside the analysis polygon.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct PixelSample {
        pub lat: f64,
        pub lng: f64,
        pub r: Channel,
        pub g: Channel,
        pub b: Channel,
        pub layer: Layer,
    }

    impl PixelSample {
        pub fn new(lat: f64, lng: f64, rgb: Rgb, layer: Layer) -> Result<Self> {
            let sample = Self {
                lat,
                lng,
                r: rgb.r,
                g: rgb.g,
                b: rgb.b,
                layer,
            };
            if !sample.is_valid() {
                return Err(AnalysisError::InvalidSample {
                    lat,
                    lng,
                    reason: "coordinates outside lat [-90, 90] / lng [-180, 180]".to_string(),
                });
            }
            Ok(sample)
        }

        /// Channels are `u8` and therefore always in range; only position can be wrong.
        pub fn is_valid(&self) -> bool {
            self.position().is_valid()
        }

        pub fn rgb(&self) -> Rgb {
            Rgb::new(self.r, self.g, self.b)
        }

        pub fn position(&self) -> LatLng {
            LatLng::new(self.lat, self.lng)
        }
    }
}
