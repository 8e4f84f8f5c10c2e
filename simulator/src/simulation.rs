use crate::distributions::{DistributionError, FloatRandomDistribution};
use cytometry_common::{Real, SampleRate};
use ndarray::Array1;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::iter::{
    IndexedParallelIterator, IntoParallelIterator, IntoParallelRefIterator, ParallelIterator,
};
use serde::Deserialize;
use thiserror::Error;
use trace_to_segments::{
    conditioning::{
        BaselineWindow, ConditioningError, Digitizer, LowPassFilter, apply_baseline_restoration,
        apply_bessel_lowpass_filter, apply_butterworth_lowpass_filter,
    },
    synthesis::{
        PulseDescriptor, SynthesisError,
        noise::{NoiseError, add_gaussian_noise, add_poisson_noise},
        synthesize,
    },
    triggering::{RunReport, TriggerError, TriggerSettings, TriggeringSystem},
};
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub(crate) enum SimulationError {
    #[error("Simulation must have at least one time bin")]
    NoTimeBins,
    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(SampleRate),
    #[error("Trigger channel {0:?} is not one of the configured channels")]
    UnknownTriggerChannel(String),
    #[error("Particle {index}: {source}")]
    Particle {
        index: usize,
        source: DistributionError,
    },
    #[error("Synthesis: {0}")]
    Synthesis(#[from] SynthesisError),
    #[error("Noise: {0}")]
    Noise(#[from] NoiseError),
    #[error("Conditioning: {0}")]
    Conditioning(#[from] ConditioningError),
    #[error("Triggering: {0}")]
    Trigger(#[from] TriggerError),
}

/// Random properties of the particles crossing the interrogation point.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct ParticlePopulation {
    pub(crate) count: usize,
    /// Seconds after the start of the trace at which each particle's pulse peaks.
    pub(crate) arrival_time: FloatRandomDistribution,
    /// Standard deviation of each pulse, in seconds.
    pub(crate) width: FloatRandomDistribution,
    pub(crate) amplitude: FloatRandomDistribution,
}

impl ParticlePopulation {
    fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<Vec<PulseDescriptor>, SimulationError> {
        (0..self.count)
            .map(|index| {
                let mut sample = |distribution: &FloatRandomDistribution| {
                    distribution
                        .sample(&mut *rng)
                        .map_err(|source| SimulationError::Particle { index, source })
                };
                let center = sample(&self.arrival_time)?;
                let width = sample(&self.width)?;
                let amplitude = sample(&self.amplitude)?;
                Ok(PulseDescriptor::new(width, center, amplitude))
            })
            .collect()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "noise-type")]
pub(crate) enum NoiseSettings {
    Gaussian { mean: Real, sd: Real },
    /// Shot noise; requires the signal to be non-negative.
    Poisson,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct ChannelSettings {
    pub(crate) name: String,
    /// Multiplies every particle's amplitude as seen by this detector.
    #[serde(default = "ChannelSettings::default_coupling_scale")]
    pub(crate) coupling_scale: Real,
    /// Applied in order after synthesis.
    #[serde(default)]
    pub(crate) noise: Vec<NoiseSettings>,
}

impl ChannelSettings {
    fn default_coupling_scale() -> Real {
        1.0
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum FilterFamily {
    Bessel,
    Butterworth,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct FilterSettings {
    pub(crate) family: FilterFamily,
    pub(crate) cutoff_frequency: Real,
    #[serde(default = "FilterSettings::default_order")]
    pub(crate) order: usize,
    #[serde(default = "FilterSettings::default_gain")]
    pub(crate) gain: Real,
}

impl FilterSettings {
    fn default_order() -> usize {
        1
    }

    fn default_gain() -> Real {
        1.0
    }
}

///
/// This struct is created from the configuration JSON file.
///
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct Simulation {
    //  The length of each trace
    pub(crate) time_bins: usize,
    //  Number of samples (time_bins) per second
    pub(crate) sample_rate: SampleRate,
    #[serde(default)]
    pub(crate) background: Real,
    pub(crate) particles: ParticlePopulation,
    pub(crate) channels: Vec<ChannelSettings>,
    #[serde(default)]
    pub(crate) filter: Option<FilterSettings>,
    #[serde(default)]
    pub(crate) baseline: Option<BaselineWindow>,
    //  If present, channels are replaced by their digitized codes before triggering
    #[serde(default)]
    pub(crate) digitizer: Option<Digitizer>,
    pub(crate) trigger: TriggerSettings,
}

pub(crate) struct SimulationOutput {
    pub(crate) system: TriggeringSystem,
    pub(crate) report: RunReport,
}

impl Simulation {
    /// Checks the trace dimensions and that the trigger channel exists.
    pub(crate) fn validate(&self) -> Result<(), SimulationError> {
        if self.time_bins == 0 {
            return Err(SimulationError::NoTimeBins);
        }
        if self.sample_rate.is_nan() || self.sample_rate <= 0.0 {
            return Err(SimulationError::InvalidSampleRate(self.sample_rate));
        }
        if !self
            .channels
            .iter()
            .any(|channel| channel.name == self.trigger.trigger_channel)
        {
            return Err(SimulationError::UnknownTriggerChannel(
                self.trigger.trigger_channel.clone(),
            ));
        }
        Ok(())
    }

    pub(crate) fn time_base(&self) -> Array1<Real> {
        Array1::from_iter((0..self.time_bins).map(|bin| bin as Real / self.sample_rate))
    }

    fn low_pass_filter(&self) -> Option<(FilterFamily, LowPassFilter)> {
        self.filter.as_ref().map(|filter| {
            (
                filter.family,
                LowPassFilter::new(
                    self.sample_rate,
                    filter.cutoff_frequency,
                    filter.order,
                    filter.gain,
                ),
            )
        })
    }

    /// Synthesizes one channel's signal and runs it through the configured conditioning.
    #[instrument(skip_all, fields(channel = %settings.name))]
    fn build_channel(
        &self,
        settings: &ChannelSettings,
        pulses: &[PulseDescriptor],
        time: &Array1<Real>,
        seed: u64,
    ) -> Result<Array1<Real>, SimulationError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let coupled: Vec<_> = pulses
            .iter()
            .map(|pulse| PulseDescriptor {
                amplitude: pulse.amplitude * settings.coupling_scale,
                ..*pulse
            })
            .collect();
        let mut signal = synthesize(&coupled, time.view(), self.background)?;

        for noise in &settings.noise {
            match *noise {
                NoiseSettings::Gaussian { mean, sd } => {
                    add_gaussian_noise(signal.view_mut(), mean, sd, &mut rng)?
                }
                NoiseSettings::Poisson => add_poisson_noise(signal.view_mut(), &mut rng)?,
            }
        }
        if let Some((family, filter)) = self.low_pass_filter() {
            match family {
                FilterFamily::Bessel => apply_bessel_lowpass_filter(signal.view_mut(), &filter)?,
                FilterFamily::Butterworth => {
                    apply_butterworth_lowpass_filter(signal.view_mut(), &filter)?
                }
            }
        }
        if let Some(window) = self.baseline {
            apply_baseline_restoration(signal.view_mut(), window)?;
        }
        if let Some(digitizer) = &self.digitizer {
            let digitized = digitizer.capture(signal.view())?;
            debug!(
                "Digitized between {} and {}",
                digitized.min_level, digitized.max_level
            );
            signal = digitized.codes.mapv(Real::from);
        }
        Ok(signal)
    }

    /// Generates one particle population, builds every channel from it in parallel, and
    /// segments the channels with the trigger settings.
    ///
    /// The same seed always produces the same output.
    #[instrument(skip_all, fields(seed = seed, num_channels = self.channels.len()))]
    pub(crate) fn run(&self, seed: u64) -> Result<SimulationOutput, SimulationError> {
        self.validate()?;
        let mut rng = StdRng::seed_from_u64(seed);
        let pulses = self.particles.generate(&mut rng)?;
        info!("Generated {} particles", pulses.len());

        let time = self.time_base();
        let channel_seeds: Vec<u64> = self.channels.iter().map(|_| rng.random()).collect();
        let signals = self
            .channels
            .par_iter()
            .zip(channel_seeds.into_par_iter())
            .map(|(settings, seed)| self.build_channel(settings, &pulses, &time, seed))
            .collect::<Result<Vec<_>, _>>()?;

        let mut system = TriggeringSystem::new(self.trigger.clone());
        system.register_time(&time)?;
        for (settings, signal) in self.channels.iter().zip(&signals) {
            system.register_channel(settings.name.as_str(), signal)?;
        }
        let report = system.run()?;
        Ok(SimulationOutput { system, report })
    }
}
