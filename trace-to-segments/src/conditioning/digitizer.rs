use super::ConditioningError;
use cytometry_common::Real;
use ndarray::{Array1, ArrayView1};
use serde::Deserialize;
use tracing::{info, instrument};

/// Largest supported resolution, so that every code fits in a `u32`.
const MAX_BITS: u32 = 24;

/// Resolution of the digitizer, either as a number of bins or a string such as `"10bit"`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BitDepth {
    Bins(u32),
    Bits(String),
}

impl Default for BitDepth {
    fn default() -> Self {
        Self::Bits("10bit".to_owned())
    }
}

impl BitDepth {
    pub fn num_bins(&self) -> Result<u32, ConditioningError> {
        match self {
            Self::Bins(0) => Err(ConditioningError::InvalidBitDepth("0 bins".to_owned())),
            Self::Bins(bins) => Ok(*bins),
            Self::Bits(text) => {
                let bits = text
                    .trim()
                    .strip_suffix("bit")
                    .and_then(|bits| bits.trim().parse::<u32>().ok())
                    .filter(|bits| (1..=MAX_BITS).contains(bits))
                    .ok_or_else(|| ConditioningError::InvalidBitDepth(text.clone()))?;
                Ok(1 << bits)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum SaturationLevels {
    /// Use the minimum and maximum of the captured signal.
    #[default]
    Auto,
    Fixed { min: Real, max: Real },
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Digitizer {
    #[serde(default)]
    pub bit_depth: BitDepth,
    #[serde(default)]
    pub saturation_levels: SaturationLevels,
}

#[derive(Debug, PartialEq)]
pub struct DigitizedSignal {
    /// Index of the bin each sample falls in, see [Digitizer::capture].
    pub codes: Array1<u32>,
    pub min_level: Real,
    pub max_level: Real,
    /// True if any sample lay outside `[min_level, max_level]`.
    pub is_saturated: bool,
}

impl Digitizer {
    /// Quantizes `signal` onto `num_bins` evenly spaced levels between the saturation levels.
    ///
    /// A sample's code is the number of levels strictly below it, so samples at or below
    /// the minimum level map to 0 and samples above the maximum level map to `num_bins`.
    #[instrument(skip_all, fields(num_samples = signal.len()))]
    pub fn capture(
        &self,
        signal: ArrayView1<'_, Real>,
    ) -> Result<DigitizedSignal, ConditioningError> {
        if signal.is_empty() {
            return Err(ConditioningError::EmptySignal);
        }
        let num_bins = self.bit_depth.num_bins()?;
        let (min_level, max_level) = match self.saturation_levels {
            SaturationLevels::Auto => signal.iter().fold(
                (Real::INFINITY, Real::NEG_INFINITY),
                |(min, max), &value| (min.min(value), max.max(value)),
            ),
            SaturationLevels::Fixed { min, max } => (min, max),
        };
        if min_level > max_level {
            return Err(ConditioningError::InvalidSaturation {
                min: min_level,
                max: max_level,
            });
        }

        let levels = Array1::linspace(min_level, max_level, num_bins as usize)
            .to_vec();
        let codes = signal
            .iter()
            .map(|&value| levels.partition_point(|&level| level < value) as u32)
            .collect();
        let is_saturated = signal
            .iter()
            .any(|&value| value < min_level || value > max_level);
        if is_saturated {
            info!("Signal values have been clipped to the saturation boundaries.");
        }
        Ok(DigitizedSignal {
            codes,
            min_level,
            max_level,
            is_saturated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn bit_depth() {
        assert_eq!(BitDepth::Bits("10bit".to_owned()).num_bins(), Ok(1024));
        assert_eq!(BitDepth::Bits("1bit".to_owned()).num_bins(), Ok(2));
        assert_eq!(BitDepth::Bins(100).num_bins(), Ok(100));
        assert!(BitDepth::Bins(0).num_bins().is_err());
        assert!(BitDepth::Bits("ten bits".to_owned()).num_bins().is_err());
        assert!(BitDepth::Bits("64bit".to_owned()).num_bins().is_err());
    }

    #[test]
    fn auto_levels() {
        let digitizer = Digitizer {
            bit_depth: BitDepth::Bins(5),
            saturation_levels: SaturationLevels::Auto,
        };
        // Levels are 0, 1, 2, 3, 4
        let signal = array![0.0, 0.5, 1.0, 2.5, 4.0];
        let captured = digitizer.capture(signal.view()).unwrap();
        assert_eq!(captured.codes, array![0u32, 1, 1, 3, 4]);
        assert_eq!((captured.min_level, captured.max_level), (0.0, 4.0));
        assert!(!captured.is_saturated);
    }

    #[test]
    fn fixed_levels_saturate() {
        let digitizer = Digitizer {
            bit_depth: BitDepth::Bins(3),
            saturation_levels: SaturationLevels::Fixed { min: 0.0, max: 1.0 },
        };
        let signal = array![-1.0, 0.25, 0.75, 2.0];
        let captured = digitizer.capture(signal.view()).unwrap();
        assert_eq!(captured.codes, array![0u32, 1, 2, 3]);
        assert!(captured.is_saturated);
    }

    #[test]
    fn invalid_input() {
        let digitizer = Digitizer::default();
        let empty = Array1::<Real>::zeros(0);
        assert_eq!(
            digitizer.capture(empty.view()),
            Err(ConditioningError::EmptySignal)
        );
        let inverted = Digitizer {
            saturation_levels: SaturationLevels::Fixed { min: 1.0, max: 0.0 },
            ..Default::default()
        };
        assert!(matches!(
            inverted.capture(array![0.5].view()),
            Err(ConditioningError::InvalidSaturation { .. })
        ));
    }

    #[test]
    fn deserialize() {
        let digitizer: Digitizer = serde_json::from_str(
            r#"{ "bit-depth": "12bit", "saturation-levels": { "fixed": { "min": 0, "max": 2.5 } } }"#,
        )
        .unwrap();
        assert_eq!(digitizer.bit_depth.num_bins(), Ok(4096));
        assert_eq!(
            digitizer.saturation_levels,
            SaturationLevels::Fixed { min: 0.0, max: 2.5 }
        );
    }
}
