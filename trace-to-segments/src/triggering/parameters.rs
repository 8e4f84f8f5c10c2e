use cytometry_common::Real;
use ndarray::ArrayView1;
use serde::Deserialize;
use std::str::FromStr;
use strum::{Display, EnumString};
use thiserror::Error;

/// Converts a median absolute deviation into a standard deviation for normally
/// distributed noise.
const MAD_TO_SIGMA: Real = 0.6745;

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdError {
    #[error("Unknown threshold format: {0:?}, expected a number or a pattern like '3sigma'")]
    UnknownFormat(String),
}

/// Window-finding policies, selected by name at run time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, Display)]
pub enum TriggerScheme {
    /// Fixed-width windows around every rising edge; edges too close to either end of the
    /// buffer are dropped.
    #[strum(serialize = "fixed-window")]
    FixedWindow,
    /// Windows that follow the pulse down to a lower threshold, with optional debouncing.
    #[strum(serialize = "dynamic")]
    Dynamic,
    /// Windows that follow the pulse until it returns to the threshold.
    #[strum(serialize = "dynamic-simple")]
    DynamicSimple,
}

/// Trigger level, either absolute or relative to the noise of the trigger channel.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum Threshold {
    Absolute(Real),
    /// A number of robust standard deviations above the median of the trigger channel.
    Sigma(Real),
}

impl FromStr for Threshold {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_suffix("sigma") {
            Some(sigmas) => Real::from_str(sigmas.trim()).map(Threshold::Sigma),
            None => Real::from_str(s).map(Threshold::Absolute),
        }
        .map_err(|_| ThresholdError::UnknownFormat(s.to_owned()))
    }
}

impl Threshold {
    /// The absolute trigger level for `signal`.
    ///
    /// For [Threshold::Sigma] this is `median + n * MAD / 0.6745`.
    pub fn resolve(&self, signal: ArrayView1<'_, Real>) -> Real {
        match *self {
            Threshold::Absolute(level) => level,
            Threshold::Sigma(sigmas) => {
                let mut values = signal.to_vec();
                let centre = median(&mut values);
                let mut deviations: Vec<_> = values.iter().map(|x| (x - centre).abs()).collect();
                centre + sigmas * median(&mut deviations) / MAD_TO_SIGMA
            }
        }
    }
}

/// The average of the two central values when `values` has even length.
fn median(values: &mut [Real]) -> Real {
    values.sort_by(Real::total_cmp);
    let mid = values.len() / 2;
    match (values.len() % 2, values.get(mid)) {
        (_, None) => Real::NAN,
        (1, Some(&centre)) => centre,
        (_, Some(&upper)) => values
            .get(mid - 1)
            .map_or(upper, |&lower| (lower + upper) / 2.0),
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct TriggerSettings {
    /// One of "fixed-window", "dynamic" or "dynamic-simple". Any other name produces a
    /// warning and an empty result when the triggering system is run.
    pub scheme: String,
    /// Name of the channel whose threshold crossings define the windows.
    pub trigger_channel: String,
    pub threshold: Threshold,
    /// Level the signal must fall to before a "dynamic" window closes. Defaults to the
    /// threshold when absent or NaN.
    #[serde(default)]
    pub lower_threshold: Option<Real>,
    /// Samples to include before each event.
    #[serde(default = "TriggerSettings::default_buffer")]
    pub pre_buffer: usize,
    /// Samples to include after each event.
    #[serde(default = "TriggerSettings::default_buffer")]
    pub post_buffer: usize,
    /// Maximum number of windows to accept, zero or negative for no limit.
    #[serde(default = "TriggerSettings::default_max_triggers")]
    pub max_triggers: i64,
    #[serde(default = "TriggerSettings::default_debounce")]
    pub debounce_enabled: bool,
    /// Number of consecutive samples a "dynamic" pulse must stay above threshold when
    /// debouncing. `None` disables the check.
    #[serde(default)]
    pub min_window_duration: Option<usize>,
}

impl TriggerSettings {
    fn default_buffer() -> usize {
        64
    }

    fn default_max_triggers() -> i64 {
        -1
    }

    fn default_debounce() -> bool {
        true
    }

    pub fn new(
        scheme: impl Into<String>,
        trigger_channel: impl Into<String>,
        threshold: Threshold,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            trigger_channel: trigger_channel.into(),
            threshold,
            lower_threshold: None,
            pre_buffer: Self::default_buffer(),
            post_buffer: Self::default_buffer(),
            max_triggers: Self::default_max_triggers(),
            debounce_enabled: Self::default_debounce(),
            min_window_duration: None,
        }
    }

    pub fn parse_scheme(&self) -> Result<TriggerScheme, strum::ParseError> {
        TriggerScheme::from_str(&self.scheme)
    }

    pub fn trigger_limit(&self) -> Option<usize> {
        usize::try_from(self.max_triggers)
            .ok()
            .filter(|&limit| limit > 0)
    }

    /// The minimum duration to enforce, taking the debounce flag into account.
    pub fn debounce_duration(&self) -> Option<usize> {
        self.min_window_duration.filter(|_| self.debounce_enabled)
    }

    pub fn resolve_lower_threshold(&self, threshold: Real) -> Real {
        self.lower_threshold
            .filter(|lower| !lower.is_nan())
            .unwrap_or(threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use ndarray::array;

    #[test]
    fn scheme_names() {
        assert_eq!(
            TriggerScheme::from_str("fixed-window"),
            Ok(TriggerScheme::FixedWindow)
        );
        assert_eq!(TriggerScheme::from_str("dynamic"), Ok(TriggerScheme::Dynamic));
        assert_eq!(
            TriggerScheme::from_str("dynamic-simple"),
            Ok(TriggerScheme::DynamicSimple)
        );
        assert!(TriggerScheme::from_str("sliding").is_err());
        assert_eq!(TriggerScheme::DynamicSimple.to_string(), "dynamic-simple");
    }

    #[test]
    fn parse_threshold() {
        assert_eq!(Threshold::from_str("0.5"), Ok(Threshold::Absolute(0.5)));
        assert_eq!(Threshold::from_str("3sigma"), Ok(Threshold::Sigma(3.0)));
        assert_eq!(Threshold::from_str(" 2.5 sigma "), Ok(Threshold::Sigma(2.5)));
        assert_eq!(
            Threshold::from_str("3 volts"),
            Err(ThresholdError::UnknownFormat("3 volts".to_owned()))
        );
    }

    #[test]
    fn sigma_threshold() {
        // median = 2, absolute deviations = [1, 0, 0, 1, 8] with median 1
        let signal = array![1.0, 2.0, 2.0, 3.0, 10.0];
        assert_approx_eq!(
            Threshold::Sigma(2.0).resolve(signal.view()),
            2.0 + 2.0 / MAD_TO_SIGMA
        );
        assert_eq!(Threshold::Absolute(4.0).resolve(signal.view()), 4.0);
    }

    #[test]
    fn even_length_median() {
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&mut [7.0]), 7.0);
        assert!(median(&mut []).is_nan());
    }

    #[test]
    fn limits_and_defaults() {
        let mut settings = TriggerSettings::new("dynamic", "forward", Threshold::Absolute(1.0));
        assert_eq!(settings.trigger_limit(), None);
        settings.max_triggers = 0;
        assert_eq!(settings.trigger_limit(), None);
        settings.max_triggers = 3;
        assert_eq!(settings.trigger_limit(), Some(3));

        assert_eq!(settings.debounce_duration(), None);
        settings.min_window_duration = Some(4);
        assert_eq!(settings.debounce_duration(), Some(4));
        settings.debounce_enabled = false;
        assert_eq!(settings.debounce_duration(), None);

        assert_eq!(settings.resolve_lower_threshold(1.0), 1.0);
        settings.lower_threshold = Some(Real::NAN);
        assert_eq!(settings.resolve_lower_threshold(1.0), 1.0);
        settings.lower_threshold = Some(0.25);
        assert_eq!(settings.resolve_lower_threshold(1.0), 0.25);
    }

    #[test]
    fn deserialize() {
        let settings: TriggerSettings = serde_json::from_str(
            r#"{
                "scheme": "dynamic",
                "trigger-channel": "side",
                "threshold": { "sigma": 3 },
                "lower-threshold": 0.1,
                "min-window-duration": 5
            }"#,
        )
        .unwrap();
        assert_eq!(settings.parse_scheme(), Ok(TriggerScheme::Dynamic));
        assert_eq!(settings.threshold, Threshold::Sigma(3.0));
        assert_eq!(settings.pre_buffer, 64);
        assert_eq!(settings.post_buffer, 64);
        assert_eq!(settings.trigger_limit(), None);
        assert_eq!(settings.debounce_duration(), Some(5));
    }
}
