//! End-to-end behavior of bands and the ensemble through the public API.
//!
//! Run with: cargo test --test ensemble_scenarios

use aurora::color::Rgb;
use aurora::ensemble::BandEnsemble;
use aurora::wave_band::{oscillation_offset, BASE_LIGHT_BRIGHTNESS, SWAY_AMPLITUDE};
use aurora::{Error, WaveBand};
use glam::Vec3;
use proptest::prelude::*;

const EPS: f32 = 1e-4;

fn green() -> Rgb {
    Rgb::new(0.1, 1.0, 0.5)
}

fn violet() -> Rgb {
    Rgb::new(0.5, 0.2, 0.9)
}

fn three_segment_band() -> WaveBand {
    WaveBand::create(Vec3::ZERO, 100.0, 3, 10.0, 1.0, green(), violet()).unwrap()
}

fn ensemble_of(bands: usize) -> BandEnsemble {
    let bands = (0..bands)
        .map(|i| {
            WaveBand::create(
                Vec3::new(0.0, 110.0 + i as f32 * 5.0, 0.0),
                200.0,
                8,
                10.0,
                0.5 + i as f32 * 0.1,
                green(),
                violet(),
            )
            .unwrap()
        })
        .collect();
    BandEnsemble::from_bands(bands).unwrap()
}

#[test]
fn negative_length_is_rejected() {
    let err = WaveBand::create(Vec3::ZERO, -5.0, 10, 1.0, 1.0, green(), violet()).unwrap_err();
    match err {
        Error::InvalidParameter { name, .. } => assert_eq!(name, "length"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn rejected_global_frequency_leaves_bands_untouched() {
    let mut ensemble = ensemble_of(3);
    let before: Vec<f32> = ensemble.bands().iter().map(|b| b.frequency()).collect();

    assert!(ensemble.set_global_frequency(-1.0).is_err());
    assert!(ensemble.set_global_frequency(f32::NAN).is_err());

    let after: Vec<f32> = ensemble.bands().iter().map(|b| b.frequency()).collect();
    assert_eq!(before, after);
}

#[test]
fn middle_segment_offsets_follow_the_wave_formula() {
    let band = three_segment_band();
    let middle = &band.segments()[1];
    assert_eq!(middle.normalized_t(), 0.5);

    // Halfway along the band both oscillations cross zero at elapsed 0
    let offset = oscillation_offset(0.5, 0.0, 1.0, 10.0);
    assert!(offset.y.abs() < EPS);
    assert!(offset.z.abs() < EPS);

    // A quarter of the way along, the wave peaks and the sway is at cos(pi/4)
    let offset = oscillation_offset(0.25, 0.0, 1.0, 10.0);
    assert!((offset.y - 10.0).abs() < EPS);
    assert!((offset.z - SWAY_AMPLITUDE * std::f32::consts::FRAC_1_SQRT_2).abs() < EPS);
}

#[test]
fn zero_amplitude_flattens_wave_but_keeps_sway_and_color() {
    let mut ensemble = ensemble_of(2);
    ensemble.set_global_amplitude(0.0).unwrap();
    // A long frame lands segments exactly on target
    ensemble.update(1.0, 0.7);

    for band in ensemble.bands() {
        for segment in band.segments() {
            let offset = segment.position() - segment.base_position();
            assert!(offset.y.abs() < EPS, "vertical wave should be flat");
            let expected = oscillation_offset(segment.normalized_t(), 0.7, band.frequency(), 0.0);
            assert!((offset.z - expected.z).abs() < EPS);
        }
    }

    let band = &ensemble.bands()[0];
    assert_ne!(band.segments()[0].color(), band.segments()[3].color());
}

#[test]
fn flash_reverts_to_pre_trigger_values() {
    let mut ensemble = ensemble_of(3);
    ensemble.update(0.016, 0.1);
    let amplitudes: Vec<f32> = ensemble.bands().iter().map(|b| b.amplitude()).collect();

    ensemble.trigger_flash(0.5, 3.0, 8.0).unwrap();
    for (band, base) in ensemble.bands().iter().zip(&amplitudes) {
        assert_eq!(band.amplitude(), base + 8.0);
        assert_eq!(band.segments()[0].light_brightness(), BASE_LIGHT_BRIGHTNESS + 3.0);
    }
    assert_eq!(ensemble.pending_reversions(), 3);

    // Not yet due
    ensemble.update(0.016, 0.5);
    assert_eq!(ensemble.bands()[0].active_flashes(), 1);

    ensemble.update(0.016, 0.7);
    for (band, base) in ensemble.bands().iter().zip(&amplitudes) {
        assert_eq!(band.amplitude(), *base);
        assert_eq!(band.active_flashes(), 0);
        for segment in band.segments() {
            assert_eq!(segment.light_brightness(), BASE_LIGHT_BRIGHTNESS);
        }
    }
    assert_eq!(ensemble.pending_reversions(), 0);
}

#[test]
fn overlapping_flashes_fully_revert() {
    let mut ensemble = ensemble_of(1);
    ensemble.trigger_flash(1.0, 2.0, 4.0).unwrap();
    ensemble.update(0.016, 0.5);
    ensemble.trigger_flash(1.0, 1.0, 6.0).unwrap();

    let band = &ensemble.bands()[0];
    assert_eq!(band.amplitude(), 20.0);
    assert_eq!(band.segments()[2].light_brightness(), 5.0);

    // First flash reverts, second stays applied
    ensemble.update(0.016, 1.2);
    let band = &ensemble.bands()[0];
    assert_eq!(band.amplitude(), 16.0);
    assert_eq!(band.segments()[2].light_brightness(), 3.0);

    ensemble.update(0.016, 1.6);
    let band = &ensemble.bands()[0];
    assert_eq!(band.amplitude(), 10.0);
    assert_eq!(band.segments()[2].light_brightness(), BASE_LIGHT_BRIGHTNESS);
}

#[test]
fn shutdown_cancels_reversions_and_rejects_mutation() {
    let mut ensemble = ensemble_of(4);
    ensemble.trigger_flash(2.0, 1.0, 1.0).unwrap();
    assert_eq!(ensemble.pending_reversions(), 4);

    ensemble.shutdown();
    assert!(ensemble.is_shut_down());
    assert!(ensemble.is_empty());
    assert_eq!(ensemble.pending_reversions(), 0);

    ensemble.shutdown();
    ensemble.update(0.016, 10.0);
    assert_eq!(ensemble.set_global_amplitude(1.0), Err(Error::ShutDown));
    assert_eq!(ensemble.trigger_flash(1.0, 1.0, 1.0), Err(Error::ShutDown));
    assert_eq!(ensemble.set_particle_texture("glow"), Err(Error::ShutDown));
}

#[test]
fn reset_returns_every_segment_to_rest() {
    let mut ensemble = ensemble_of(2);
    for frame in 1..30 {
        ensemble.update(0.033, frame as f32 * 0.033);
    }
    ensemble.reset_all_bands();
    ensemble.reset_all_bands();

    for band in ensemble.bands() {
        for segment in band.segments() {
            assert_eq!(segment.position(), segment.base_position());
        }
    }
}

fn run(dts: &[f32]) -> Vec<(Vec3, Rgb)> {
    let mut ensemble = ensemble_of(2);
    let mut elapsed = 0.0;
    for &dt in dts {
        elapsed += dt;
        ensemble.update(dt, elapsed);
    }
    ensemble
        .bands()
        .iter()
        .flat_map(|b| b.segments().iter().map(|s| (s.position(), s.color())))
        .collect()
}

proptest! {
    #[test]
    fn identical_frame_sequences_give_identical_state(
        dts in prop::collection::vec(0.0f32..0.1, 1..40)
    ) {
        prop_assert_eq!(run(&dts), run(&dts));
    }

    #[test]
    fn endpoints_hold_for_any_valid_band(
        length in 0.5f32..1000.0,
        segment_count in 2usize..64,
        amplitude in 0.0f32..50.0,
        frequency in 0.01f32..5.0,
        base in (0.0f32..=1.0, 0.0f32..=1.0, 0.0f32..=1.0),
        fade in (0.0f32..=1.0, 0.0f32..=1.0, 0.0f32..=1.0),
    ) {
        let base = Rgb::new(base.0, base.1, base.2);
        let fade = Rgb::new(fade.0, fade.1, fade.2);
        let band = WaveBand::create(Vec3::ZERO, length, segment_count, amplitude, frequency, base, fade)
            .unwrap();

        let segments = band.segments();
        let last = &segments[segments.len() - 1];
        prop_assert_eq!(segments[0].normalized_t(), 0.0);
        prop_assert_eq!(last.normalized_t(), 1.0);
        prop_assert_eq!(segments[0].color(), base);
        prop_assert_eq!(last.color(), fade);
        prop_assert!((last.base_position().x - length).abs() <= length * 1e-5);
    }
}
