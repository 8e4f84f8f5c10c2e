use super::{
    Channel, TriggerError, TriggerSettings, TriggerWarning, TriggerWindow, schemes::find_windows,
};
use cytometry_common::{Real, SegmentId};
use ndarray::{Array1, ArrayBase, ArrayView1, Data, Dimension};
use tracing::{debug, instrument, warn};

/// Summary of a single call to [TriggeringSystem::run].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunReport {
    /// The absolute level used, if the run got as far as resolving it.
    pub threshold: Option<Real>,
    pub num_windows: usize,
    pub warning: Option<TriggerWarning>,
}

/// Finds trigger windows on one channel and cuts the same windows out of every channel.
///
/// Register the time base and each channel, then call [Self::run]. Registered buffers are
/// copied in, so later changes to the caller's arrays are not seen.
#[derive(Clone, Debug)]
pub struct TriggeringSystem {
    settings: TriggerSettings,
    time: Option<Array1<Real>>,
    channels: Vec<Channel>,
    windows: Vec<TriggerWindow>,
}

fn copy_one_dimensional<S, D>(
    array: &ArrayBase<S, D>,
    name: &str,
) -> Result<Array1<Real>, TriggerError>
where
    S: Data<Elem = Real>,
    D: Dimension,
{
    if array.ndim() != 1 {
        return Err(TriggerError::NotOneDimensional {
            name: name.to_owned(),
            ndim: array.ndim(),
        });
    }
    if array.is_empty() {
        return Err(TriggerError::EmptyBuffer(name.to_owned()));
    }
    Ok(array.iter().copied().collect())
}

impl TriggeringSystem {
    pub fn new(settings: TriggerSettings) -> Self {
        Self {
            settings,
            time: None,
            channels: Vec::new(),
            windows: Vec::new(),
        }
    }

    pub fn settings(&self) -> &TriggerSettings {
        &self.settings
    }

    pub fn time(&self) -> Option<ArrayView1<'_, Real>> {
        self.time.as_ref().map(Array1::view)
    }

    /// Sets the shared time base. It can be set only once.
    pub fn register_time<S, D>(&mut self, time: &ArrayBase<S, D>) -> Result<(), TriggerError>
    where
        S: Data<Elem = Real>,
        D: Dimension,
    {
        if self.time.is_some() {
            return Err(TriggerError::TimeBaseAlreadySet);
        }
        self.time = Some(copy_one_dimensional(time, "time base")?);
        Ok(())
    }

    /// Adds a channel. If several channels share a name, lookups find the first.
    pub fn register_channel<S, D>(
        &mut self,
        name: impl Into<String>,
        signal: &ArrayBase<S, D>,
    ) -> Result<(), TriggerError>
    where
        S: Data<Elem = Real>,
        D: Dimension,
    {
        let name = name.into();
        let signal = copy_one_dimensional(signal, &name)?;
        debug!("Registered channel {name} with {} samples", signal.len());
        self.channels.push(Channel::new(name, signal));
        Ok(())
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    pub fn channel(&self, name: &str) -> Result<&Channel, TriggerError> {
        self.channels
            .iter()
            .find(|channel| channel.name() == name)
            .ok_or_else(|| TriggerError::ChannelNotFound(name.to_owned()))
    }

    /// Windows found by the last run, in ascending order of start index.
    pub fn windows(&self) -> &[TriggerWindow] {
        &self.windows
    }

    pub fn segmented_signal(&self, name: &str) -> Result<&[Real], TriggerError> {
        self.channel(name).map(Channel::segmented_signal)
    }

    pub fn segmented_time(&self, name: &str) -> Result<&[Real], TriggerError> {
        self.channel(name).map(Channel::segmented_time)
    }

    pub fn segment_ids(&self, name: &str) -> Result<&[SegmentId], TriggerError> {
        self.channel(name).map(Channel::segment_ids)
    }

    /// Finds windows on the trigger channel and extracts them from every channel.
    ///
    /// Outputs of any previous run are discarded first. An unknown scheme, or a trigger
    /// channel that never crosses the threshold, is not an error: the outputs are left
    /// empty and the reason is logged and returned in the report.
    #[instrument(skip_all, fields(
        scheme = %self.settings.scheme,
        trigger_channel = %self.settings.trigger_channel,
        num_windows
    ))]
    pub fn run(&mut self) -> Result<RunReport, TriggerError> {
        let time = self.time.as_ref().ok_or(TriggerError::MissingTimeBase)?;
        self.windows.clear();
        self.channels.iter_mut().for_each(Channel::clear_segments);

        let trigger = self.channel(&self.settings.trigger_channel)?;
        let scheme = match self.settings.parse_scheme() {
            Ok(scheme) => scheme,
            Err(_) => {
                let warning = TriggerWarning::UnknownScheme(self.settings.scheme.clone());
                warn!("{warning}");
                return Ok(RunReport {
                    warning: Some(warning),
                    ..Default::default()
                });
            }
        };
        let threshold = self.settings.threshold.resolve(trigger.signal());
        let windows = find_windows(scheme, trigger.signal(), threshold, &self.settings);
        tracing::Span::current().record("num_windows", windows.len());

        if windows.is_empty() {
            let (min, max) = trigger.range();
            let warning = TriggerWarning::NoTriggers {
                channel: trigger.name().to_owned(),
                threshold,
                min,
                max,
            };
            warn!("{warning}");
            return Ok(RunReport {
                threshold: Some(threshold),
                warning: Some(warning),
                ..Default::default()
            });
        }

        for channel in &mut self.channels {
            channel.extract_segments(time.view(), &windows);
        }
        self.windows = windows;
        Ok(RunReport {
            threshold: Some(threshold),
            num_windows: self.windows.len(),
            warning: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triggering::Threshold;
    use ndarray::{Array2, array};

    fn fixed_window_system(pre_buffer: usize, post_buffer: usize) -> TriggeringSystem {
        TriggeringSystem::new(TriggerSettings {
            pre_buffer,
            post_buffer,
            ..TriggerSettings::new("fixed-window", "forward", Threshold::Absolute(1.0))
        })
    }

    fn time_base(len: usize) -> Array1<Real> {
        Array1::from_iter((0..len).map(|i| i as Real * 0.5))
    }

    #[test]
    fn fixed_window_extraction() {
        let mut system = fixed_window_system(0, 1);
        system.register_time(&time_base(7)).unwrap();
        system
            .register_channel("forward", &array![0.0, 0.0, 2.0, 2.0, 2.0, 0.0, 0.0])
            .unwrap();
        system
            .register_channel("side", &array![5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0])
            .unwrap();

        let report = system.run().unwrap();
        assert_eq!(
            report,
            RunReport {
                threshold: Some(1.0),
                num_windows: 1,
                warning: None,
            }
        );
        assert_eq!(system.windows(), &[TriggerWindow::new(0, 2)]);
        assert_eq!(system.segmented_signal("forward").unwrap(), &[0.0, 0.0, 2.0]);
        assert_eq!(system.segmented_signal("side").unwrap(), &[5.0, 6.0, 7.0]);
        assert_eq!(system.segmented_time("side").unwrap(), &[0.0, 0.5, 1.0]);
        assert_eq!(system.segment_ids("side").unwrap(), &[0, 0, 0]);
    }

    #[test]
    fn two_windows_on_every_channel() {
        let mut system = TriggeringSystem::new(TriggerSettings {
            pre_buffer: 0,
            post_buffer: 0,
            ..TriggerSettings::new("dynamic-simple", "forward", Threshold::Absolute(1.0))
        });
        system.register_time(&time_base(8)).unwrap();
        system
            .register_channel("forward", &array![0.0, 3.0, 0.0, 0.0, 2.0, 2.0, 0.0, 0.0])
            .unwrap();
        system
            .register_channel("side", &array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0])
            .unwrap();

        assert_eq!(system.run().unwrap().num_windows, 2);
        assert_eq!(system.segmented_signal("side").unwrap(), &[2.0, 5.0, 6.0]);
        assert_eq!(system.segmented_time("forward").unwrap(), &[0.5, 2.0, 2.5]);
        assert_eq!(system.segment_ids("forward").unwrap(), &[0, 1, 1]);
    }

    #[test]
    fn registered_buffers_are_copies() {
        let mut system = fixed_window_system(0, 1);
        let mut signal = array![0.0, 0.0, 2.0, 2.0, 0.0];
        system.register_time(&time_base(5)).unwrap();
        system.register_channel("forward", &signal).unwrap();
        signal.fill(-1.0);

        system.run().unwrap();
        assert_eq!(system.segmented_signal("forward").unwrap(), &[0.0, 0.0, 2.0]);
    }

    #[test]
    fn run_replaces_previous_results() {
        let mut system = fixed_window_system(0, 1);
        system.register_time(&time_base(7)).unwrap();
        system
            .register_channel("forward", &array![0.0, 0.0, 2.0, 2.0, 2.0, 0.0, 0.0])
            .unwrap();
        system.run().unwrap();
        system.run().unwrap();
        assert_eq!(system.segmented_signal("forward").unwrap().len(), 3);

        system.settings.threshold = Threshold::Absolute(10.0);
        let report = system.run().unwrap();
        assert_eq!(report.num_windows, 0);
        assert!(system.windows().is_empty());
        assert!(system.segmented_signal("forward").unwrap().is_empty());
    }

    #[test]
    fn no_triggers_warning() {
        let mut system = fixed_window_system(0, 0);
        system.register_time(&time_base(3)).unwrap();
        system.register_channel("forward", &array![0.2, 0.9, 0.5]).unwrap();
        let report = system.run().unwrap();
        assert_eq!(
            report.warning,
            Some(TriggerWarning::NoTriggers {
                channel: "forward".to_owned(),
                threshold: 1.0,
                min: 0.2,
                max: 0.9,
            })
        );
        assert!(system.segment_ids("forward").unwrap().is_empty());
    }

    #[test]
    fn unknown_scheme_warning() {
        let mut system = TriggeringSystem::new(TriggerSettings::new(
            "sliding",
            "forward",
            Threshold::Absolute(1.0),
        ));
        system.register_time(&time_base(4)).unwrap();
        system.register_channel("forward", &array![0.0, 2.0, 0.0, 2.0]).unwrap();
        let report = system.run().unwrap();
        assert_eq!(
            report.warning,
            Some(TriggerWarning::UnknownScheme("sliding".to_owned()))
        );
        assert!(system.windows().is_empty());
        assert!(system.segmented_signal("forward").unwrap().is_empty());
    }

    #[test]
    fn sigma_threshold_on_trigger_channel() {
        let mut system = TriggeringSystem::new(TriggerSettings {
            pre_buffer: 0,
            post_buffer: 0,
            ..TriggerSettings::new("dynamic-simple", "forward", Threshold::Sigma(3.0))
        });
        // median 0, MAD 0.1, so the level is about 0.44
        let signal = array![0.1, -0.1, 0.0, 0.1, -0.1, 0.0, 5.0, 0.0, 0.1];
        system.register_time(&time_base(signal.len())).unwrap();
        system.register_channel("forward", &signal).unwrap();
        let report = system.run().unwrap();
        assert!(report.threshold.is_some_and(|level| level > 0.4 && level < 0.5));
        assert_eq!(system.windows(), &[TriggerWindow::new(6, 6)]);
    }

    #[test]
    fn missing_prerequisites() {
        let mut system = fixed_window_system(0, 0);
        system.register_channel("forward", &array![0.0, 2.0]).unwrap();
        assert_eq!(system.run(), Err(TriggerError::MissingTimeBase));

        let mut system = fixed_window_system(0, 0);
        system.register_time(&time_base(2)).unwrap();
        system.register_channel("side", &array![0.0, 2.0]).unwrap();
        assert_eq!(
            system.run(),
            Err(TriggerError::ChannelNotFound("forward".to_owned()))
        );
    }

    #[test]
    fn registration_errors() {
        let mut system = fixed_window_system(0, 0);
        assert_eq!(
            system.register_time(&Array2::<Real>::zeros((2, 2))),
            Err(TriggerError::NotOneDimensional {
                name: "time base".to_owned(),
                ndim: 2
            })
        );
        assert_eq!(
            system.register_channel("forward", &Array1::<Real>::zeros(0)),
            Err(TriggerError::EmptyBuffer("forward".to_owned()))
        );
        system.register_time(&time_base(2)).unwrap();
        assert_eq!(
            system.register_time(&time_base(2)),
            Err(TriggerError::TimeBaseAlreadySet)
        );
        assert_eq!(
            system.segmented_signal("missing"),
            Err(TriggerError::ChannelNotFound("missing".to_owned()))
        );
    }

    #[test]
    fn duplicate_names_resolve_to_first() {
        let mut system = fixed_window_system(0, 0);
        system.register_channel("forward", &array![1.0]).unwrap();
        system.register_channel("forward", &array![2.0]).unwrap();
        assert_eq!(system.channel("forward").unwrap().signal()[0], 1.0);
        assert_eq!(system.channels().count(), 2);
    }

    #[test]
    fn extraction_clips_short_channels() {
        let mut system = fixed_window_system(0, 3);
        system.register_time(&time_base(8)).unwrap();
        system
            .register_channel("forward", &array![0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .unwrap();
        system.register_channel("short", &array![1.0, 2.0, 3.0]).unwrap();
        system.run().unwrap();
        assert_eq!(system.windows(), &[TriggerWindow::new(0, 4)]);
        assert_eq!(system.segmented_signal("forward").unwrap().len(), 5);
        assert_eq!(system.segmented_signal("short").unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(system.segmented_time("short").unwrap(), &[0.0, 0.5, 1.0]);
    }
}
