//! Group 8: resampling, mixing and quantization

use std::io::Write;

use super::compare::all_within;
use super::{inputs, VerificationHarness};
use crate::audio::{Channels, SampleRate, MIXBUFFER_SAMPLES};
use crate::error::Result;
use crate::random::SeededRandom;

const LAYOUTS: [(Channels, &str); 2] = [(Channels::Mono, "mono"), (Channels::Stereo, "stereo")];

pub(super) fn run<W: Write>(h: &mut VerificationHarness<'_, W>) -> Result<()> {
    up_sample(h)?;
    mixing(h)?;
    quantize(h)?;
    Ok(())
}

fn up_sample<W: Write>(h: &mut VerificationHarness<'_, W>) -> Result<()> {
    for rate in SampleRate::ALL {
        for (channels, layout) in LAYOUTS {
            let out_len = MIXBUFFER_SAMPLES * channels.count();
            let in_len = out_len / rate.factor();
            let pcm = pcm_samples(h.rng(), in_len);

            h.compare(
                &format!("up_sample_pcm_to_44khz( {}Hz, {layout} )", rate.hz()),
                in_len,
                || vec![0.0f32; out_len],
                |p, d| p.up_sample_pcm_to_44khz(d, &pcm, rate, channels),
                |a, b| all_within(a, b, 1.0),
            )?;
        }
    }

    for rate in SampleRate::ALL {
        for (channels, layout) in LAYOUTS {
            let out_len = MIXBUFFER_SAMPLES * channels.count();
            let num_samples = out_len / rate.factor();
            let frames = num_samples / channels.count();
            let rng = h.rng();
            let decoded: Vec<Vec<f32>> = (0..channels.count())
                .map(|_| (0..frames).map(|_| rng.crandom_float()).collect())
                .collect();
            let ogg: Vec<&[f32]> = decoded.iter().map(Vec::as_slice).collect();

            h.compare(
                &format!("up_sample_ogg_to_44khz( {}Hz, {layout} )", rate.hz()),
                num_samples,
                || vec![0.0f32; out_len],
                |p, d| p.up_sample_ogg_to_44khz(d, &ogg, num_samples, rate, channels),
                |a, b| all_within(a, b, 1.0),
            )?;
        }
    }
    Ok(())
}

/// Full-scale 16-bit samples of both signs
fn pcm_samples(rng: &mut SeededRandom, n: usize) -> Vec<i16> {
    (0..n).map(|_| (rng.crandom_float() * 32768.0) as i16).collect()
}

/// Mix values spanning twice the 16-bit range so both clipping edges are hit
fn wide_mix(rng: &mut SeededRandom, n: usize) -> Vec<f32> {
    (0..n).map(|_| rng.crandom_float() * 65536.0).collect()
}

fn volumes<const N: usize>(rng: &mut SeededRandom) -> [f32; N] {
    std::array::from_fn(|_| rng.random_float())
}

fn mixing<W: Write>(h: &mut VerificationHarness<'_, W>) -> Result<()> {
    let n = MIXBUFFER_SAMPLES;
    let rng = h.rng();
    let mono = inputs::floats(rng, n, 1.0);
    let stereo = inputs::floats(rng, n * 2, 1.0);
    let (last2, current2) = (volumes::<2>(rng), volumes::<2>(rng));
    let (last6, current6) = (volumes::<6>(rng), volumes::<6>(rng));

    h.compare(
        "mix_sound_two_speaker_mono()",
        n,
        || vec![0.0f32; n * 2],
        |p, mix| p.mix_sound_two_speaker_mono(mix, &mono, n, &last2, &current2),
        |a, b| all_within(a, b, 2.0),
    )?;
    h.compare(
        "mix_sound_two_speaker_stereo()",
        n,
        || vec![0.0f32; n * 2],
        |p, mix| p.mix_sound_two_speaker_stereo(mix, &stereo, n, &last2, &current2),
        |a, b| all_within(a, b, 2.0),
    )?;
    h.compare(
        "mix_sound_six_speaker_mono()",
        n,
        || vec![0.0f32; n * 6],
        |p, mix| p.mix_sound_six_speaker_mono(mix, &mono, n, &last6, &current6),
        |a, b| all_within(a, b, 2.0),
    )?;
    h.compare(
        "mix_sound_six_speaker_stereo()",
        n,
        || vec![0.0f32; n * 6],
        |p, mix| p.mix_sound_six_speaker_stereo(mix, &stereo, n, &last6, &current6),
        |a, b| all_within(a, b, 2.0),
    )?;
    Ok(())
}

fn quantize<W: Write>(h: &mut VerificationHarness<'_, W>) -> Result<()> {
    let n = MIXBUFFER_SAMPLES * 2;
    let mix = wide_mix(h.rng(), n);

    h.compare(
        "mixed_sound_to_samples()",
        n,
        || vec![0i16; n],
        |p, s| p.mixed_sound_to_samples(s, &mix),
        |a, b| a == b,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::DEFAULT_SEED;

    #[test]
    fn test_up_sample_sizes_fill_one_mix_block() {
        for rate in SampleRate::ALL {
            for (channels, _) in LAYOUTS {
                let out_len = MIXBUFFER_SAMPLES * channels.count();
                assert_eq!((out_len / rate.factor()) * rate.factor(), out_len);
            }
        }
    }

    #[test]
    fn test_wide_mix_clips_at_both_edges() {
        let mix = wide_mix(&mut SeededRandom::new(DEFAULT_SEED), MIXBUFFER_SAMPLES * 2);
        assert!(mix.iter().any(|&v| v > 32767.0));
        assert!(mix.iter().any(|&v| v < -32768.0));
        assert!(mix.iter().any(|&v| v > -32768.0 && v < 32767.0));
    }

    #[test]
    fn test_pcm_samples_span_both_signs() {
        let pcm = pcm_samples(&mut SeededRandom::new(DEFAULT_SEED), MIXBUFFER_SAMPLES);
        assert!(pcm.iter().any(|&v| v > i16::MAX / 2));
        assert!(pcm.iter().any(|&v| v < i16::MIN / 2));
        assert!(pcm.iter().any(|&v| i32::from(v).abs() > 32_000));
    }

    #[test]
    fn test_volumes_are_unit_range() {
        let v = volumes::<6>(&mut SeededRandom::new(9));
        assert!(v.iter().all(|x| (0.0..1.0).contains(x)));
    }
}
