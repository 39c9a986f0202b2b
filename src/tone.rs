use crate::element::ElementRecord;
use serde::Serialize;
use std::f64::consts::PI;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_VOLUME: f64 = 0.3;

const ATTACK_FRACTION: f64 = 0.05;
const RELEASE_FRACTION: f64 = 0.2;
const ATTACK_CAP_SECONDS: f64 = 0.05;
const RELEASE_CAP_SECONDS: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

impl Waveform {
    pub fn for_atomic_number(atomic_number: u32) -> Self {
        match atomic_number {
            0..=2 => Waveform::Sine,
            3..=10 => Waveform::Triangle,
            11..=18 => Waveform::Square,
            _ => Waveform::Sawtooth,
        }
    }

    /// Unit-amplitude sample at `t` seconds for `frequency` Hz.
    pub fn sample(self, frequency: f64, t: f64) -> f64 {
        let cycles = t * frequency;
        match self {
            Waveform::Sine => (2.0 * PI * cycles).sin(),
            Waveform::Square => sign((2.0 * PI * cycles).sin()),
            Waveform::Sawtooth => 2.0 * (cycles - (0.5 + cycles).floor()),
            Waveform::Triangle => 2.0 * (2.0 * (cycles - (cycles + 0.5).floor())).abs() - 1.0,
        }
    }
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Pitch, length and timbre derived from an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToneSpec {
    pub frequency: f64,
    pub duration: f64,
    pub waveform: Waveform,
}

impl ToneSpec {
    pub fn for_element(element: &ElementRecord) -> Self {
        let atomic_number = element.atomic_number;
        let gyromagnetic = element.gyromagnetic_ratio_or_default().abs();
        let base = 220.0 + atomic_number as f64 * 5.0;
        ToneSpec {
            frequency: base * (1.0 + gyromagnetic / 100.0),
            duration: 0.3 + 0.7 * (1.0 - (atomic_number % 10) as f64 / 10.0),
            waveform: Waveform::for_atomic_number(atomic_number),
        }
    }
}

/// Interleaved-ready stereo PCM produced for one element change.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneBuffer {
    pub sample_rate: u32,
    pub spec: ToneSpec,
    pub frames: Vec<[i16; 2]>,
}

impl ToneBuffer {
    pub fn duration_secs(&self) -> f64 {
        self.frames.len() as f64 / self.sample_rate as f64
    }

    pub fn peak(&self) -> i16 {
        self.frames
            .iter()
            .map(|f| f[0].saturating_abs())
            .max()
            .unwrap_or(0)
    }

    /// 16-bit PCM RIFF/WAVE encoding of the buffer.
    pub fn to_wav(&self) -> Vec<u8> {
        const CHANNELS: u16 = 2;
        const BITS: u16 = 16;
        let block_align = CHANNELS * BITS / 8;
        let data_len = (self.frames.len() * block_align as usize) as u32;

        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&CHANNELS.to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.extend_from_slice(&(self.sample_rate * block_align as u32).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&BITS.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for [l, r] in &self.frames {
            out.extend_from_slice(&l.to_le_bytes());
            out.extend_from_slice(&r.to_le_bytes());
        }
        out
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ToneSynthesizer {
    sample_rate: u32,
    volume: f64,
}

impl ToneSynthesizer {
    pub fn new(sample_rate: u32, volume: f64) -> Self {
        ToneSynthesizer {
            sample_rate: sample_rate.max(1),
            volume: volume.clamp(0.0, 1.0),
        }
    }

    pub fn synthesize(&self, element: &ElementRecord) -> ToneBuffer {
        self.render(ToneSpec::for_element(element))
    }

    pub fn render(&self, spec: ToneSpec) -> ToneBuffer {
        let rate = self.sample_rate as f64;
        let len = (rate * spec.duration) as usize;
        let (attack, release) = envelope_lengths(len, self.sample_rate);
        let scale = (i16::MAX as f64) * self.volume;

        let frames = (0..len)
            .map(|i| {
                let t = i as f64 / rate;
                let env = envelope_gain(i, len, attack, release);
                let v = (spec.waveform.sample(spec.frequency, t) * env * scale) as i16;
                [v, v]
            })
            .collect();

        ToneBuffer {
            sample_rate: self.sample_rate,
            spec,
            frames,
        }
    }
}

/// Attack and release lengths in samples. Both are proportional to the tone
/// length with fixed caps; release never reaches into the attack.
pub fn envelope_lengths(len: usize, sample_rate: u32) -> (usize, usize) {
    let rate = sample_rate as f64;
    let attack = ((len as f64 * ATTACK_FRACTION) as usize).min((rate * ATTACK_CAP_SECONDS) as usize);
    let release = ((len as f64 * RELEASE_FRACTION) as usize)
        .min((rate * RELEASE_CAP_SECONDS) as usize)
        .min(len - attack);
    (attack, release)
}

fn envelope_gain(i: usize, len: usize, attack: usize, release: usize) -> f64 {
    if i < attack {
        ramp(i, attack)
    } else if i >= len - release {
        1.0 - ramp(i - (len - release), release)
    } else {
        1.0
    }
}

/// Position `i` of an inclusive 0..1 ramp over `n` samples.
fn ramp(i: usize, n: usize) -> f64 {
    if n <= 1 {
        0.0
    } else {
        i as f64 / (n - 1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::NmrData;

    fn element(atomic_number: u32, gyromagnetic_ratio: Option<f64>) -> ElementRecord {
        let mut e = ElementRecord::new(atomic_number, "X", "Test");
        e.nmr_data = Some(NmrData {
            spin: None,
            gyromagnetic_ratio,
            chemical_shift: None,
        });
        e
    }

    #[test]
    fn test_waveform_boundaries() {
        assert_eq!(Waveform::for_atomic_number(1), Waveform::Sine);
        assert_eq!(Waveform::for_atomic_number(2), Waveform::Sine);
        assert_eq!(Waveform::for_atomic_number(3), Waveform::Triangle);
        assert_eq!(Waveform::for_atomic_number(10), Waveform::Triangle);
        assert_eq!(Waveform::for_atomic_number(11), Waveform::Square);
        assert_eq!(Waveform::for_atomic_number(18), Waveform::Square);
        assert_eq!(Waveform::for_atomic_number(19), Waveform::Sawtooth);
        assert_eq!(Waveform::for_atomic_number(118), Waveform::Sawtooth);
    }

    #[test]
    fn test_frequency_strictly_increasing() {
        for g in [None, Some(26.752), Some(-20.378), Some(0.0)] {
            let mut last = 0.0;
            for n in 1..=118 {
                let f = ToneSpec::for_element(&element(n, g)).frequency;
                assert!(f > last, "n={n} g={g:?}");
                last = f;
            }
        }
    }

    #[test]
    fn test_frequency_formula() {
        let h = ToneSpec::for_element(&ElementRecord::hydrogen());
        assert!((h.frequency - 225.0 * 1.26752).abs() < 1e-9);

        // absent ratio counts as 10, sign is ignored
        let bare = ToneSpec::for_element(&ElementRecord::new(18, "Ar", "Argon"));
        assert!((bare.frequency - 310.0 * 1.1).abs() < 1e-9);
        let neg = ToneSpec::for_element(&element(2, Some(-20.0)));
        assert!((neg.frequency - 230.0 * 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_duration() {
        let d = |n| ToneSpec::for_element(&element(n, None)).duration;
        assert!((d(10) - 1.0).abs() < 1e-12);
        assert!((d(1) - 0.93).abs() < 1e-12);
        assert!((d(9) - 0.37).abs() < 1e-12);
        assert!((d(20) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_buffer_shape() {
        let synth = ToneSynthesizer::new(DEFAULT_SAMPLE_RATE, DEFAULT_VOLUME);
        let buf = synth.synthesize(&ElementRecord::hydrogen());
        assert_eq!(buf.frames.len(), 41_013);
        assert_eq!(buf.frames.len(), (44_100.0 * buf.spec.duration) as usize);
        assert!(buf.frames.iter().all(|[l, r]| l == r));
        assert_eq!(buf.frames[0], [0, 0]);
        assert_eq!(*buf.frames.last().unwrap(), [0, 0]);
        assert!(buf.peak() <= (32_767.0 * 0.3) as i16);
        assert!(buf.peak() > 9_000);
    }

    #[test]
    fn test_square_wave_levels() {
        let synth = ToneSynthesizer::new(DEFAULT_SAMPLE_RATE, DEFAULT_VOLUME);
        let buf = synth.synthesize(&element(12, None));
        let (attack, release) = envelope_lengths(buf.frames.len(), 44_100);
        let full = (32_767.0 * 0.3) as i16;
        let body = &buf.frames[attack..buf.frames.len() - release];
        assert!(body.iter().all(|[l, _]| l.abs() == full || *l == 0));
    }

    #[test]
    fn test_waveform_samples() {
        assert!((Waveform::Sawtooth.sample(1.0, 0.25) - 0.5).abs() < 1e-12);
        assert!((Waveform::Sawtooth.sample(1.0, 0.75) + 0.5).abs() < 1e-12);
        assert!((Waveform::Triangle.sample(1.0, 0.0) + 1.0).abs() < 1e-12);
        assert!((Waveform::Triangle.sample(1.0, 0.5) - 1.0).abs() < 1e-12);
        assert!((Waveform::Sine.sample(1.0, 0.25) - 1.0).abs() < 1e-12);
        assert_eq!(Waveform::Square.sample(1.0, 0.0), 0.0);
        assert_eq!(Waveform::Square.sample(1.0, 0.75), -1.0);
    }

    #[test]
    fn test_envelope_regions_never_overlap() {
        for len in [0usize, 1, 2, 5, 19, 20, 100, 13_230, 44_100] {
            let (attack, release) = envelope_lengths(len, 44_100);
            assert!(attack + release <= len, "len={len}");
        }
        assert_eq!(envelope_lengths(44_100, 44_100), (2_205, 8_820));
        assert_eq!(envelope_lengths(1_000, 44_100), (50, 200));

        // low sample rate: the caps are shorter than the proportional lengths
        assert_eq!(envelope_lengths(100, 50), (2, 10));
    }

    #[test]
    fn test_short_tone_renders() {
        let synth = ToneSynthesizer::new(8, 1.0);
        let buf = synth.synthesize(&element(9, None));
        assert_eq!(buf.frames.len(), 2);
        let empty = ToneSynthesizer::new(1, 1.0).synthesize(&element(9, None));
        assert!(empty.frames.is_empty());
        assert_eq!(empty.peak(), 0);
    }

    #[test]
    fn test_wav_header() {
        let buf = ToneSynthesizer::new(8_000, 0.3).synthesize(&element(5, None));
        let wav = buf.to_wav();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u16::from_le_bytes([wav[22], wav[23]]), 2);
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 8_000);
        assert_eq!(wav.len(), 44 + buf.frames.len() * 4);
    }
}
