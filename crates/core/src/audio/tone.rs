//! Synthesized fallback tone.
//!
//! A short pitch glide with a linear attack and exponential decay, played when
//! no recording is available or a recording fails. The unit-amplitude waveform
//! is computed once per generator and scaled by the requested gain.

use std::f32::consts::TAU;
use std::time::Duration;

use crate::config::{ToneConfig, Waveform};

/// Rendered mono PCM for the fallback tone.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneBuffer {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
    /// Gain the unit-amplitude tone was scaled by. Zero when muted.
    pub gain: f32,
}

impl ToneBuffer {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate.max(1) as f64)
    }

    pub fn is_silent(&self) -> bool {
        self.gain == 0.0
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0_f32, |peak, s| peak.max(s.abs()))
    }

    /// Raw little-endian `f32` samples.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

/// Processing context shared by every tone rendered from one generator. Holds
/// the unit-gain waveform so repeated fallbacks only scale it.
#[derive(Debug)]
struct ToneContext {
    sample_rate: u32,
    unit: Vec<f32>,
}

impl ToneContext {
    fn new(sample_rate: u32, config: &ToneConfig) -> Self {
        let sample_rate = sample_rate.max(1);
        let rate = sample_rate as f32;
        let total = (sample_rate as u64 * config.duration_ms as u64 / 1000) as usize;
        let attack = ((sample_rate as u64 * config.attack_ms as u64 / 1000) as usize).min(total);

        let start_hz = config.start_hz.max(1.0);
        let end_hz = config.end_hz.max(1.0);
        let peak = config.peak_gain.max(f32::EPSILON);
        // Envelope floor relative to the peak; both ends of the decay are
        // strictly positive so the exponential curve is defined.
        let floor = (config.floor_gain / peak).clamp(f32::EPSILON, 1.0);
        let decay_len = total.saturating_sub(attack).max(1) as f32;

        let mut unit = Vec::with_capacity(total);
        let mut phase = 0.0_f32;
        for index in 0..total {
            let progress = index as f32 / total.max(1) as f32;
            let frequency = start_hz * (end_hz / start_hz).powf(progress);

            let envelope = if index < attack {
                floor + (1.0 - floor) * (index as f32 / attack as f32)
            } else {
                floor.powf((index - attack) as f32 / decay_len)
            };

            unit.push(oscillator(config.waveform, phase) * envelope);
            phase = (phase + frequency / rate).fract();
        }

        Self { sample_rate, unit }
    }
}

fn oscillator(waveform: Waveform, phase: f32) -> f32 {
    match waveform {
        Waveform::Sine => (TAU * phase).sin(),
        Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
    }
}

/// Renders the short descending tone used when no recording can be played.
///
/// The context is built on first use and then reused for every call.
#[derive(Debug)]
pub struct ToneGenerator {
    config: ToneConfig,
    sample_rate: u32,
    context: Option<ToneContext>,
    contexts_created: usize,
}

impl ToneGenerator {
    pub fn new(sample_rate: u32, config: ToneConfig) -> Self {
        Self {
            config,
            sample_rate,
            context: None,
            contexts_created: 0,
        }
    }

    /// Number of processing contexts built over the generator's lifetime.
    pub fn contexts_created(&self) -> usize {
        self.contexts_created
    }

    /// Renders one tone. Muted renders keep the full length at zero gain.
    pub fn render(&mut self, muted: bool) -> ToneBuffer {
        let gain = if muted { 0.0 } else { self.config.peak_gain };
        let context = self.context();
        tracing::debug!(muted, samples = context.unit.len(), "synthesizing fallback tone");

        ToneBuffer {
            sample_rate: context.sample_rate,
            samples: context.unit.iter().map(|s| s * gain).collect(),
            gain,
        }
    }

    fn context(&mut self) -> &ToneContext {
        if self.context.is_none() {
            self.contexts_created += 1;
        }
        let (sample_rate, config) = (self.sample_rate, &self.config);
        self.context
            .get_or_insert_with(|| ToneContext::new(sample_rate, config))
    }
}

#[cfg(test)]
mod tests {
    use realfft::RealFftPlanner;

    use super::*;

    const WINDOW: usize = 2048;

    fn generator() -> ToneGenerator {
        ToneGenerator::new(48_000, ToneConfig::default())
    }

    fn dominant_hz(samples: &[f32], sample_rate: u32) -> f32 {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(samples.len());
        let mut input = fft.make_input_vec();
        input.copy_from_slice(samples);
        let mut spectrum = fft.make_output_vec();
        fft.process(&mut input, &mut spectrum).unwrap();

        let (bin, _) = spectrum
            .iter()
            .enumerate()
            .skip(1)
            .fold((0, 0.0_f32), |best, (i, c)| {
                if c.norm() > best.1 {
                    (i, c.norm())
                } else {
                    best
                }
            });
        bin as f32 * sample_rate as f32 / samples.len() as f32
    }

    #[test]
    fn renders_expected_length() {
        let tone = generator().render(false);
        assert_eq!(tone.samples.len(), 10_560);
        assert!((tone.duration().as_secs_f64() - 0.22).abs() < 1e-6);
    }

    #[test]
    fn envelope_rises_then_decays() {
        let tone = generator().render(false);
        assert!(tone.peak() <= 0.06 + 1e-6);
        assert!(tone.peak() > 0.05);

        let head = tone.samples[..48].iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        let attack_end = tone.samples[400..600].iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        let tail = tone.samples[tone.samples.len() - 200..]
            .iter()
            .fold(0.0_f32, |m, s| m.max(s.abs()));

        assert!(head < attack_end);
        assert!(tail < 0.001, "tail {tail}");
    }

    #[test]
    fn pitch_sweeps_downwards() {
        let tone = generator().render(false);
        let head = &tone.samples[480..480 + WINDOW];
        let tail_start = tone.samples.len() * 3 / 4 - WINDOW;
        let tail = &tone.samples[tail_start..tail_start + WINDOW];

        let head_hz = dominant_hz(head, tone.sample_rate);
        let tail_hz = dominant_hz(tail, tone.sample_rate);
        assert!(head_hz > tail_hz + 50.0, "head {head_hz} tail {tail_hz}");
        assert!(head_hz <= 680.0 && tail_hz >= 320.0);
    }

    #[test]
    fn muted_tone_keeps_length_at_zero_gain() {
        let mut generator = generator();
        let audible = generator.render(false);
        let muted = generator.render(true);

        assert!(muted.is_silent());
        assert_eq!(muted.samples.len(), audible.samples.len());
        assert!(muted.samples.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn context_is_reused() {
        let mut generator = generator();
        for muted in [false, true, false, false] {
            generator.render(muted);
        }
        assert_eq!(generator.contexts_created(), 1);
    }

    #[test]
    fn encodes_little_endian_samples() {
        let tone = generator().render(false);
        let bytes = tone.to_le_bytes();
        assert_eq!(bytes.len(), tone.samples.len() * 4);
        assert_eq!(
            f32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]),
            tone.samples[10]
        );
    }
}
