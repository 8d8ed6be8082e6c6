// THEORY:
// The `colormap` module reverses what a tile server did when it painted a
// physical quantity as colour. It is the first stage of the pipeline and the
// only one that looks at raw RGB values.
//
// Key architectural principles:
// 1.  **Calibrated Reference Table**: SST decoding starts from an ordered list of
//     calibration points (colour, value, label) sampled from the thermal palette.
// 2.  **Build Once, Read Many**: At construction the decoder expands the table
//     into a quantized lookup map (calibration points plus linearly interpolated
//     intermediate colours). After that the decoder is immutable, so a single
//     instance is shared behind an `Arc` by every analysis, including concurrent
//     ones.
// 3.  **Graceful Degradation**: Lookup falls through four tiers (exact bucket,
//     nearest calibration point, hue band, grayscale sentinel). Every tier
//     returns a value and says how much it trusts it; nothing here fails.
// 4.  **Layer-Specific Algorithms**: Chlorophyll tiles use a different palette and
//     are decoded with a simple greenness/yellowness heuristic that has the same
//     output shape as the SST path.

pub mod colormap {
    use crate::config::DecoderSettings;
    use crate::core_modules::pixel::pixel::{Layer, PixelSample, Rgb};
    use crate::core_modules::utils::geo::geo::angular_difference;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    const INTERPOLATED_CONFIDENCE: f64 = 0.95;
    const HUE_BAND_CONFIDENCE: f64 = 0.7;
    const NO_DATA_CONFIDENCE: f64 = 0.3;
    const CHL_HEURISTIC_CONFIDENCE: f64 = 0.7;
    const CHL_NO_DATA_VALUE: f64 = 1.0;

    /// Copernicus thermal palette, coldest to hottest, in °F.
    const COPERNICUS_THERMAL: [([u8; 3], f64, &str); 19] = [
        ([50, 0, 100], 35.0, "Very Cold - Deep Winter"),
        ([70, 0, 130], 38.0, "Very Cold - Winter"),
        ([90, 0, 160], 41.0, "Cold - Winter"),
        ([0, 0, 200], 44.0, "Cold - Late Winter"),
        ([0, 50, 220], 47.0, "Cold - Early Spring"),
        ([0, 100, 240], 50.0, "Cool - Spring"),
        ([0, 150, 200], 53.0, "Cool - Spring"),
        ([0, 200, 200], 56.0, "Cool - Late Spring"),
        ([0, 220, 180], 59.0, "Moderate - Spring"),
        ([0, 200, 100], 62.0, "Moderate - Late Spring"),
        ([0, 180, 50], 65.0, "Moderate - Early Summer"),
        ([50, 200, 0], 68.0, "Warm - Early Summer"),
        ([150, 200, 0], 71.0, "Warm - Summer"),
        ([200, 200, 0], 74.0, "Warm - Mid Summer"),
        ([220, 180, 0], 77.0, "Very Warm - Summer"),
        ([240, 150, 0], 80.0, "Very Warm - Peak Summer"),
        ([255, 100, 0], 83.0, "Hot - Gulf Stream"),
        ([255, 50, 0], 86.0, "Hot - Tropical"),
        ([255, 0, 0], 89.0, "Very Hot - Peak Gulf Stream"),
    ];

    /// Hue bands of the thermal palette: `(hue_low, hue_high, value_at_high, span)`.
    /// Inside a band the value rises linearly as the hue falls towards `hue_low`.
    const THERMAL_HUE_BANDS: [(f64, f64, f64, f64); 6] = [
        (270.0, 300.0, 35.0, 9.0), // purple
        (210.0, 270.0, 44.0, 9.0), // blue
        (180.0, 210.0, 53.0, 9.0), // cyan
        (120.0, 180.0, 62.0, 9.0), // green
        (60.0, 120.0, 71.0, 6.0),  // yellow-green
        (20.0, 60.0, 77.0, 6.0),   // orange
    ];
    const RED_BAND_BASE: f64 = 83.0;
    const RED_BAND_SPAN: f64 = 6.0;
    const RED_BAND_CENTER_HUE: f64 = 10.0;
    const RED_BAND_HALF_WIDTH: f64 = 20.0;

    /// Identifies the palette a colour was painted with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub enum ColormapId {
        /// Copernicus thermal palette, decoded to °F.
        SstThermal,
        /// Turbo-style chlorophyll palette, decoded to mg/m³.
        ChlTurbo,
    }

    impl From<Layer> for ColormapId {
        fn from(layer: Layer) -> Self {
            match layer {
                Layer::Sst => ColormapId::SstThermal,
                Layer::Chl => ColormapId::ChlTurbo,
            }
        }
    }

    /// Which lookup tier produced a decoded value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum DecodeMethod {
        /// Bucket hit on a calibration point.
        Exact,
        /// Bucket hit on an interpolated colour.
        Interpolated,
        /// Closest calibration point within the distance threshold.
        Nearest,
        /// Hue-band estimate.
        HueBand,
        /// Chlorophyll greenness/yellowness heuristic.
        Heuristic,
        /// Grayscale render; the value is a mid-scale placeholder.
        NoData,
    }

    /// A decoded physical quantity plus the decoder's trust in it.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct PhysicalValue {
        /// °F for SST, mg/m³ for chlorophyll.
        pub value: f64,
        /// In [0, 1].
        pub confidence: f64,
        pub method: DecodeMethod,
    }

    impl PhysicalValue {
        fn new(value: f64, confidence: f64, method: DecodeMethod) -> Self {
            Self {
                value,
                confidence: confidence.clamp(0.0, 1.0),
                method,
            }
        }

        /// Whether the value should take part in statistics.
        pub fn is_reliable(&self, min_confidence: f64) -> bool {
            self.confidence > min_confidence
        }
    }

    /// One reference colour of a palette.
    #[derive(Debug, Clone, PartialEq)]
    pub struct CalibrationPoint {
        pub rgb: Rgb,
        pub value: f64,
        pub label: String,
    }

    impl CalibrationPoint {
        pub fn new(rgb: Rgb, value: f64, label: impl Into<String>) -> Self {
            Self {
                rgb,
                value,
                label: label.into(),
            }
        }
    }

    /// The Copernicus thermal calibration table.
    pub fn copernicus_thermal() -> Vec<CalibrationPoint> {
        COPERNICUS_THERMAL
            .iter()
            .map(|([r, g, b], value, label)| CalibrationPoint::new(Rgb::new(*r, *g, *b), *value, *label))
            .collect()
    }

    #[derive(Debug, Clone, Copy)]
    struct TableEntry {
        value: f64,
        exact: bool,
    }

    /// Immutable colour decoding service. Build once, share everywhere.
    #[derive(Debug, Clone)]
    pub struct ColorValueDecoder {
        calibration: Vec<CalibrationPoint>,
        lookup: HashMap<[u8; 3], TableEntry>,
        quantization_step: u8,
        nearest_distance_threshold: f64,
        mid_scale: f64,
    }

    impl Default for ColorValueDecoder {
        fn default() -> Self {
            Self::new(&DecoderSettings::default())
        }
    }

    impl ColorValueDecoder {
        /// Builds a decoder for the Copernicus thermal palette.
        pub fn new(settings: &DecoderSettings) -> Self {
            Self::with_calibration(copernicus_thermal(), settings)
        }

        /// Builds a decoder from a custom SST calibration table, ordered by value.
        pub fn with_calibration(calibration: Vec<CalibrationPoint>, settings: &DecoderSettings) -> Self {
            let quantization_step = settings.quantization_step.max(1);
            let lookup = Self::build_lookup(&calibration, settings.interpolation_steps.max(1), quantization_step);
            let mid_scale = match (calibration.first(), calibration.last()) {
                (Some(first), Some(last)) => (first.value + last.value) / 2.0,
                _ => 0.0,
            };

            Self {
                calibration,
                lookup,
                quantization_step,
                nearest_distance_threshold: settings.nearest_distance_threshold,
                mid_scale,
            }
        }

        fn build_lookup(calibration: &[CalibrationPoint], steps: u32, quantization_step: u8) -> HashMap<[u8; 3], TableEntry> {
            let mut lookup = HashMap::with_capacity(calibration.len() * steps as usize);

            // Calibration points first so interpolated colours never shadow them.
            for point in calibration {
                lookup.insert(
                    quantize(point.rgb, quantization_step),
                    TableEntry {
                        value: point.value,
                        exact: true,
                    },
                );
            }

            for pair in calibration.windows(2) {
                let (current, next) = (&pair[0], &pair[1]);
                for step in 1..steps {
                    let t = step as f64 / steps as f64;
                    let rgb = Rgb::new(
                        lerp_channel(current.rgb.r, next.rgb.r, t),
                        lerp_channel(current.rgb.g, next.rgb.g, t),
                        lerp_channel(current.rgb.b, next.rgb.b, t),
                    );
                    let value = current.value + (next.value - current.value) * t;
                    lookup
                        .entry(quantize(rgb, quantization_step))
                        .or_insert(TableEntry { value, exact: false });
                }
            }

            lookup
        }

        pub fn calibration(&self) -> &[CalibrationPoint] {
            &self.calibration
        }

        /// Number of buckets in the quantized lookup table.
        pub fn table_len(&self) -> usize {
            self.lookup.len()
        }

        /// Decodes a colour painted with `colormap`. Never fails.
        pub fn decode(&self, rgb: Rgb, colormap: ColormapId) -> PhysicalValue {
            match colormap {
                ColormapId::SstThermal => self.decode_thermal(rgb),
                ColormapId::ChlTurbo => decode_chlorophyll(rgb),
            }
        }

        pub fn decode_sample(&self, sample: &PixelSample) -> PhysicalValue {
            self.decode(sample.rgb(), sample.layer.into())
        }

        fn decode_thermal(&self, rgb: Rgb) -> PhysicalValue {
            if rgb.is_grayscale() {
                return PhysicalValue::new(self.mid_scale, NO_DATA_CONFIDENCE, DecodeMethod::NoData);
            }

            if let Some(entry) = self.lookup.get(&quantize(rgb, self.quantization_step)) {
                return if entry.exact {
                    PhysicalValue::new(entry.value, 1.0, DecodeMethod::Exact)
                } else {
                    PhysicalValue::new(entry.value, INTERPOLATED_CONFIDENCE, DecodeMethod::Interpolated)
                };
            }

            if let Some(nearest) = self.nearest(rgb) {
                return nearest;
            }

            PhysicalValue::new(thermal_value_from_hue(rgb.hue()), HUE_BAND_CONFIDENCE, DecodeMethod::HueBand)
        }

        fn nearest(&self, rgb: Rgb) -> Option<PhysicalValue> {
            let (point, distance) = self
                .calibration
                .iter()
                .map(|point| (point, rgb.distance(&point.rgb)))
                .min_by(|a, b| a.1.total_cmp(&b.1))?;

            if distance >= self.nearest_distance_threshold {
                return None;
            }
            let confidence = (1.0 - distance / self.nearest_distance_threshold).max(0.5);
            Some(PhysicalValue::new(point.value, confidence, DecodeMethod::Nearest))
        }
    }

    fn quantize(rgb: Rgb, step: u8) -> [u8; 3] {
        [(rgb.r / step) * step, (rgb.g / step) * step, (rgb.b / step) * step]
    }

    fn lerp_channel(from: u8, to: u8, t: f64) -> u8 {
        (from as f64 + (to as f64 - from as f64) * t).round().clamp(0.0, 255.0) as u8
    }

    fn round_tenths(value: f64) -> f64 {
        (value * 10.0).round() / 10.0
    }

    /// Piecewise-linear hue to °F mapping for the thermal palette.
    fn thermal_value_from_hue(hue: f64) -> f64 {
        for (hue_low, hue_high, value_at_high, span) in THERMAL_HUE_BANDS {
            if (hue_low..=hue_high).contains(&hue) {
                let value = value_at_high + (hue_high - hue) / (hue_high - hue_low) * span;
                return round_tenths(value);
            }
        }

        // Red wraps around 0°; the hottest colour sits at the band centre.
        let distance = angular_difference(hue, RED_BAND_CENTER_HUE).min(RED_BAND_HALF_WIDTH);
        round_tenths(RED_BAND_BASE + (1.0 - distance / RED_BAND_HALF_WIDTH) * RED_BAND_SPAN)
    }

    /// Greenness/yellowness heuristic for chlorophyll renders, in mg/m³.
    fn decode_chlorophyll(rgb: Rgb) -> PhysicalValue {
        if rgb.is_grayscale() {
            return PhysicalValue::new(CHL_NO_DATA_VALUE, NO_DATA_CONFIDENCE, DecodeMethod::NoData);
        }

        let r = rgb.r as f64;
        let g = rgb.g as f64;
        let b = rgb.b as f64;
        let greenness = g / r.max(b).max(1.0);
        let yellowness = r.min(g) / 255.0;

        let value = if greenness > 1.5 {
            0.5 + greenness * 2.0
        } else if yellowness > 0.5 {
            5.0 + yellowness * 5.0
        } else {
            0.1 + (b / 255.0) * 0.4
        };

        PhysicalValue::new(value, CHL_HEURISTIC_CONFIDENCE, DecodeMethod::Heuristic)
    }

    /// Converts °F to °C.
    pub fn fahrenheit_to_celsius(value: f64) -> f64 {
        (value - 32.0) * 5.0 / 9.0
    }
}
