/// Sound engine: procedural chiptune effects via rodio, wired to the
/// engine's `Feedback` hooks.
///
/// Fixed effects are rendered to in-memory WAV buffers at init time; the
/// merge chime is rendered per tier on first use and cached. Playback is
/// fire-and-forget through detached sinks.
///
/// Build without the "sound" feature to get the silent stub.

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use log::warn;
    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use mergemode::domain::piece::Tier;
    use mergemode::sim::collab::Feedback;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = std::f32::consts::TAU;

    /// Spawn pops closer together than this collapse into one.
    const POP_SPACING: Duration = Duration::from_millis(60);

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_pop: Arc<Vec<u8>>,
        sfx_thump: Arc<Vec<u8>>,
        sfx_shuffle: Arc<Vec<u8>>,
        sfx_error: Arc<Vec<u8>>,
        sfx_complete: Arc<Vec<u8>>,
        sfx_game_over: Arc<Vec<u8>>,
        merge_chimes: HashMap<Tier, Arc<Vec<u8>>>,
        last_pop: Option<Instant>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("no audio output ({e}); sound disabled");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_pop: Arc::new(make_wav(&gen_sweep(900.0, 1400.0, 0.03, 0.0, 0.12))),
                sfx_thump: Arc::new(make_wav(&gen_sweep(120.0, 60.0, 0.06, 0.2, 0.3))),
                sfx_shuffle: Arc::new(make_wav(&gen_sweep(300.0, 1200.0, 0.25, 0.5, 0.2))),
                sfx_error: Arc::new(make_wav(&gen_notes(&[(110.0, 0.08), (98.0, 0.12)], 0.5, 0.3))),
                sfx_complete: Arc::new(make_wav(&gen_notes(
                    &[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1), (1047.0, 0.3)],
                    0.3,
                    0.3,
                ))),
                sfx_game_over: Arc::new(make_wav(&gen_notes(
                    &[(440.0, 0.14), (370.0, 0.14), (311.0, 0.14), (261.0, 0.3)],
                    0.0,
                    0.3,
                ))),
                merge_chimes: HashMap::new(),
                last_pop: None,
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            let Ok(sink) = Sink::try_new(&self.handle) else { return };
            if let Ok(src) = rodio::Decoder::new(Cursor::new(buf.as_ref().clone())) {
                sink.append(src);
                sink.detach();
            }
        }
    }

    impl Feedback for SoundEngine {
        fn spawned(&mut self, _tier: Tier) {
            let now = Instant::now();
            if self.last_pop.is_some_and(|t| now.duration_since(t) < POP_SPACING) {
                return;
            }
            self.last_pop = Some(now);
            self.play(&self.sfx_pop);
        }

        fn merged(&mut self, tier: Tier) {
            let chime = self
                .merge_chimes
                .entry(tier)
                .or_insert_with(|| Arc::new(make_wav(&gen_chime(tier))))
                .clone();
            self.play(&chime);
        }

        fn reshuffled(&mut self) {
            self.play(&self.sfx_shuffle);
        }

        fn error(&mut self) {
            self.play(&self.sfx_error);
        }

        /// No haptics in a terminal; a low thump stands in.
        fn vibrate(&mut self) {
            self.play(&self.sfx_thump);
        }

        fn level_complete(&mut self) {
            self.play(&self.sfx_complete);
        }

        fn game_over(&mut self) {
            self.play(&self.sfx_game_over);
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: mono f32 samples
    // ════════════════════════════════════════════════════════════

    /// Two-note rising chime; pitch climbs a whole tone per tier.
    fn gen_chime(tier: Tier) -> Vec<f32> {
        let base = 392.0 * 2f32.powf(tier as f32 * 2.0 / 12.0);
        gen_notes(&[(base, 0.05), (base * 1.5, 0.09)], 0.3, 0.25)
    }

    /// Note sequence with an optional octave harmonic and per-note decay.
    fn gen_notes(notes: &[(f32, f32)], octave_mix: f32, volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, dur) in notes {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.7);
                let wave = (t * freq * TAU).sin() * (1.0 - octave_mix)
                    + (t * freq * 2.0 * TAU).sin() * octave_mix;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Linear frequency sweep blended with LCG noise.
    fn gen_sweep(from: f32, to: f32, duration: f32, noise_mix: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut lcg: u32 = 0x2545_f491;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                phase += (from + (to - from) * t) / SAMPLE_RATE as f32;
                lcg = lcg.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                let noise = (lcg as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let tone = (phase * TAU).sin();
                (tone * (1.0 - noise_mix) + noise * noise_mix) * (1.0 - t) * volume
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: 16-bit PCM mono
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        const CHANNELS: u16 = 1;
        const BITS: u16 = 16;
        let block_align = CHANNELS * BITS / 8;
        let byte_rate = SAMPLE_RATE * block_align as u32;
        let data_size = samples.len() as u32 * block_align as u32;

        let mut buf = Vec::with_capacity(44 + data_size as usize);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVEfmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&CHANNELS.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&BITS.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            buf.extend_from_slice(&((s.clamp(-1.0, 1.0) * 32767.0) as i16).to_le_bytes());
        }
        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wav_header_is_consistent() {
            let wav = make_wav(&[0.0, 0.5, -0.5, 1.5]);
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..16], b"WAVEfmt ");
            assert_eq!(&wav[36..40], b"data");
            assert_eq!(wav.len(), 44 + 8);
            // clamped to full scale
            assert_eq!(i16::from_le_bytes([wav[50], wav[51]]), 32767);
        }

        #[test]
        fn higher_tiers_chime_higher() {
            let crossings = |s: &[f32]| s.windows(2).filter(|w| w[0] <= 0.0 && w[1] > 0.0).count();
            assert!(crossings(&gen_chime(8)) > crossings(&gen_chime(1)));
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: a silent stub when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> {
        Some(SoundEngine)
    }
}

#[cfg(not(feature = "sound"))]
impl mergemode::sim::collab::Feedback for SoundEngine {}
