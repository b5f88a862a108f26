//! The band ensemble: every aurora band, updated and controlled together.
//!
//! Batch operations always walk the bands in catalog order. Flash
//! perturbations are reverted by one-shot tasks on the ensemble's
//! [`Scheduler`], which runs off the elapsed time passed to
//! [`BandEnsemble::update`].

use glam::Vec3;
use serde::Serialize;

use crate::catalog::{default_catalog, CatalogSpec};
use crate::error::{ensure_non_negative, ensure_positive, Error, Result};
use crate::scheduler::Scheduler;
use crate::wave_band::{FlashId, WaveBand};

/// Position of a band within its ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BandId(pub usize);

/// What a flash reversion needs to find its offsets again.
///
/// The offsets themselves live on the band, keyed by flash id.
#[derive(Debug, Clone, Copy)]
struct FlashReversion {
    band: BandId,
    generation: u64,
    flash: FlashId,
}

/// Read-only diagnostic view of one band.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandStatus {
    pub band: BandId,
    pub origin: [f32; 3],
    pub length: f32,
    pub segment_count: usize,
    pub frequency: f32,
    pub amplitude: f32,
    pub active_flashes: usize,
}

/// The fixed set of bands animated together.
#[derive(Debug)]
pub struct BandEnsemble {
    bands: Vec<WaveBand>,
    reversions: Scheduler<FlashReversion>,
    particle_texture: Option<String>,
    texture_revision: u64,
    next_flash: u64,
    shut_down: bool,
}

impl BandEnsemble {
    /// Build the ensemble from the built-in catalog.
    pub fn new() -> Result<Self> {
        Self::from_catalog(&default_catalog())
    }

    pub fn from_catalog(catalog: &CatalogSpec) -> Result<Self> {
        let bands = catalog
            .bands
            .iter()
            .map(|spec| spec.build())
            .collect::<Result<Vec<_>>>()?;
        Self::from_bands(bands)
    }

    pub fn from_bands(bands: Vec<WaveBand>) -> Result<Self> {
        if bands.is_empty() {
            return Err(Error::invalid("bands", "ensemble needs at least one band"));
        }
        log::info!(
            "Ensemble created: {} bands, {} segments",
            bands.len(),
            bands.iter().map(|b| b.segment_count()).sum::<usize>()
        );
        Ok(Self {
            bands,
            reversions: Scheduler::new(),
            particle_texture: None,
            texture_revision: 0,
            next_flash: 1,
            shut_down: false,
        })
    }

    pub fn bands(&self) -> &[WaveBand] {
        &self.bands
    }

    pub fn band(&self, id: BandId) -> Option<&WaveBand> {
        self.bands.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn total_segments(&self) -> usize {
        self.bands.iter().map(|b| b.segment_count()).sum()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Number of flash reversions still waiting to fire.
    pub fn pending_reversions(&self) -> usize {
        self.reversions.len()
    }

    /// Flash clock: the elapsed time last passed to `update` or `advance_clock`.
    pub fn now(&self) -> f32 {
        self.reversions.now()
    }

    /// Fire due flash reversions, then advance every band one frame.
    pub fn update(&mut self, dt: f32, elapsed: f32) {
        if self.shut_down {
            return;
        }

        self.advance_clock(elapsed);

        for band in &mut self.bands {
            band.update(dt, elapsed);
        }
    }

    /// Move the flash clock to `elapsed` and fire every reversion now due.
    ///
    /// Call this before applying a mid-frame `trigger_flash` so its
    /// reversion is timed from the current frame, not the previous one.
    pub fn advance_clock(&mut self, elapsed: f32) {
        if self.shut_down {
            return;
        }
        let bands = &mut self.bands;
        self.reversions
            .advance(elapsed, |_, reversion| revert_flash(bands, reversion));
    }

    /// Snap every band back to rest.
    pub fn reset_all_bands(&mut self) {
        for band in &mut self.bands {
            band.reset();
        }
        log::debug!("Reset {} bands", self.bands.len());
    }

    /// Overwrite the frequency of every band.
    pub fn set_global_frequency(&mut self, frequency: f32) -> Result<()> {
        self.ensure_live()?;
        ensure_positive("frequency", frequency)?;
        for band in &mut self.bands {
            band.set_frequency(frequency)?;
        }
        log::info!("Global frequency set to {}", frequency);
        Ok(())
    }

    /// Overwrite the base amplitude of every band.
    ///
    /// Active flash offsets stay on top of the new value until they revert.
    pub fn set_global_amplitude(&mut self, amplitude: f32) -> Result<()> {
        self.ensure_live()?;
        ensure_non_negative("amplitude", amplitude)?;
        for band in &mut self.bands {
            band.set_amplitude(amplitude)?;
        }
        log::info!("Global amplitude set to {}", amplitude);
        Ok(())
    }

    /// Temporarily raise amplitude and light brightness on every band.
    ///
    /// Each band gets its own reversion, due `duration` seconds after the
    /// current clock. Overlapping flashes add up, and each reversion removes
    /// only its own offsets.
    pub fn trigger_flash(
        &mut self,
        duration: f32,
        extra_brightness: f32,
        extra_amplitude: f32,
    ) -> Result<FlashId> {
        self.ensure_live()?;
        ensure_positive("duration", duration)?;
        ensure_non_negative("extra_brightness", extra_brightness)?;
        ensure_non_negative("extra_amplitude", extra_amplitude)?;

        let flash = FlashId(self.next_flash);
        self.next_flash += 1;

        for (i, band) in self.bands.iter_mut().enumerate() {
            let reversion = FlashReversion {
                band: BandId(i),
                generation: band.generation(),
                flash,
            };
            band.push_flash(flash, extra_amplitude, extra_brightness);
            self.reversions.delay(duration, reversion);
        }

        log::info!(
            "Flash {:?}: +{} amplitude, +{} brightness for {}s",
            flash,
            extra_amplitude,
            extra_brightness,
            duration
        );
        Ok(flash)
    }

    /// Set the texture every segment emitter should use.
    pub fn set_particle_texture(&mut self, texture_id: &str) -> Result<()> {
        self.ensure_live()?;
        if texture_id.trim().is_empty() {
            return Err(Error::invalid("texture_id", "must not be empty"));
        }
        self.particle_texture = Some(texture_id.to_string());
        self.texture_revision += 1;
        log::info!("Particle texture set to '{}'", texture_id);
        Ok(())
    }

    pub fn particle_texture(&self) -> Option<&str> {
        self.particle_texture.as_deref()
    }

    /// Bumped on every texture change so bindings can tell when to push it.
    pub fn texture_revision(&self) -> u64 {
        self.texture_revision
    }

    pub fn status(&self) -> Vec<BandStatus> {
        self.bands
            .iter()
            .enumerate()
            .map(|(i, band)| BandStatus {
                band: BandId(i),
                origin: band.origin().to_array(),
                length: band.length(),
                segment_count: band.segment_count(),
                frequency: band.frequency(),
                amplitude: band.amplitude(),
                active_flashes: band.active_flashes(),
            })
            .collect()
    }

    /// Log one status line per band.
    pub fn print_status(&self) {
        if self.shut_down {
            log::info!("Ensemble is shut down");
            return;
        }
        log::info!("Ensemble status: {} bands", self.bands.len());
        for s in self.status() {
            log::info!(
                "  band {:>2}: origin={} length={:.1} frequency={:.3} amplitude={:.3}",
                s.band.0,
                Vec3::from_array(s.origin),
                s.length,
                s.frequency,
                s.amplitude
            );
        }
    }

    /// Cancel pending reversions and release every band. Safe to call twice.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        let cancelled = self.reversions.cancel_all();
        for band in &mut self.bands {
            band.retire();
        }
        let released = self.bands.len();
        self.bands.clear();
        self.shut_down = true;
        log::info!(
            "Ensemble shut down: released {} bands, cancelled {} flash reversions",
            released,
            cancelled
        );
    }

    fn ensure_live(&self) -> Result<()> {
        if self.shut_down {
            Err(Error::ShutDown)
        } else {
            Ok(())
        }
    }
}

fn revert_flash(bands: &mut [WaveBand], reversion: FlashReversion) {
    let Some(band) = bands.get_mut(reversion.band.0) else {
        log::debug!("Flash reversion for missing band {:?} ignored", reversion.band);
        return;
    };
    if band.generation() != reversion.generation {
        log::debug!("Stale flash reversion for band {:?} ignored", reversion.band);
        return;
    }
    if band.remove_flash(reversion.flash) {
        log::trace!(
            "Flash {:?} reverted on band {:?}: amplitude now {}",
            reversion.flash,
            reversion.band,
            band.amplitude()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::wave_band::BASE_LIGHT_BRIGHTNESS;

    fn small_ensemble() -> BandEnsemble {
        let bands = vec![
            WaveBand::create(Vec3::ZERO, 100.0, 3, 10.0, 1.0, Rgb::WHITE, Rgb::BLACK).unwrap(),
            WaveBand::create(Vec3::Y * 120.0, 50.0, 5, 4.0, 0.5, Rgb::BLACK, Rgb::WHITE).unwrap(),
        ];
        BandEnsemble::from_bands(bands).unwrap()
    }

    fn brightness_all(ensemble: &BandEnsemble) -> Vec<f32> {
        ensemble
            .bands()
            .iter()
            .flat_map(|b| b.segments().iter().map(|s| s.light_brightness()))
            .collect()
    }

    #[test]
    fn test_default_ensemble() {
        let ensemble = BandEnsemble::new().unwrap();
        assert_eq!(ensemble.len(), 15);
        assert_eq!(ensemble.total_segments(), default_catalog().total_segments());
    }

    #[test]
    fn test_empty_ensemble_rejected() {
        assert!(BandEnsemble::from_bands(Vec::new()).is_err());
    }

    #[test]
    fn test_set_global_frequency() {
        let mut ensemble = small_ensemble();
        ensemble.set_global_frequency(2.5).unwrap();
        assert!(ensemble.bands().iter().all(|b| b.frequency() == 2.5));
    }

    #[test]
    fn test_invalid_global_frequency_leaves_bands_untouched() {
        let mut ensemble = small_ensemble();
        let before: Vec<f32> = ensemble.bands().iter().map(|b| b.frequency()).collect();

        let err = ensemble.set_global_frequency(-1.0).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
        assert!(ensemble.set_global_frequency(0.0).is_err());

        let after: Vec<f32> = ensemble.bands().iter().map(|b| b.frequency()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_invalid_global_amplitude() {
        let mut ensemble = small_ensemble();
        assert!(ensemble.set_global_amplitude(-0.5).is_err());
        assert_eq!(ensemble.bands()[0].amplitude(), 10.0);
        ensemble.set_global_amplitude(0.0).unwrap();
        assert!(ensemble.bands().iter().all(|b| b.amplitude() == 0.0));
    }

    #[test]
    fn test_flash_round_trip() {
        let mut ensemble = small_ensemble();
        ensemble.update(0.016, 1.0);
        let amplitudes: Vec<f32> = ensemble.bands().iter().map(|b| b.amplitude()).collect();
        let brightness = brightness_all(&ensemble);

        ensemble.trigger_flash(0.5, 3.0, 6.0).unwrap();
        assert_eq!(ensemble.bands()[0].amplitude(), 16.0);
        assert_eq!(ensemble.bands()[1].amplitude(), 10.0);
        assert!(brightness_all(&ensemble).iter().all(|&b| b == BASE_LIGHT_BRIGHTNESS + 3.0));
        assert_eq!(ensemble.pending_reversions(), 2);

        // Not yet due
        ensemble.update(0.016, 1.4);
        assert_eq!(ensemble.bands()[0].amplitude(), 16.0);

        ensemble.update(0.016, 1.5);
        let after: Vec<f32> = ensemble.bands().iter().map(|b| b.amplitude()).collect();
        assert_eq!(after, amplitudes);
        assert_eq!(brightness_all(&ensemble), brightness);
        assert_eq!(ensemble.pending_reversions(), 0);
    }

    #[test]
    fn test_advance_clock_times_flash_from_current_frame() {
        let mut ensemble = small_ensemble();
        ensemble.update(0.25, 0.75);

        ensemble.advance_clock(1.0);
        ensemble.trigger_flash(0.5, 1.0, 1.0).unwrap();
        ensemble.update(0.25, 1.0);
        assert_eq!(ensemble.bands()[0].active_flashes(), 1);

        ensemble.update(0.25, 1.25);
        assert_eq!(ensemble.bands()[0].active_flashes(), 1);

        ensemble.update(0.25, 1.5);
        assert_eq!(ensemble.bands()[0].active_flashes(), 0);
    }

    #[test]
    fn test_overlapping_flashes_fully_revert() {
        let mut ensemble = small_ensemble();
        ensemble.trigger_flash(1.0, 1.0, 2.0).unwrap();
        ensemble.update(0.1, 0.5);
        ensemble.trigger_flash(1.0, 0.5, 3.0).unwrap();
        assert_eq!(ensemble.bands()[0].amplitude(), 15.0);

        // First flash reverts, second still active
        ensemble.update(0.1, 1.0);
        assert_eq!(ensemble.bands()[0].amplitude(), 13.0);
        assert_eq!(ensemble.bands()[0].segments()[0].light_brightness(), 2.5);

        ensemble.update(0.1, 1.5);
        assert_eq!(ensemble.bands()[0].amplitude(), 10.0);
        assert!(brightness_all(&ensemble).iter().all(|&b| b == BASE_LIGHT_BRIGHTNESS));
    }

    #[test]
    fn test_global_amplitude_during_flash() {
        let mut ensemble = small_ensemble();
        ensemble.trigger_flash(1.0, 0.0, 5.0).unwrap();
        ensemble.set_global_amplitude(1.0).unwrap();
        assert_eq!(ensemble.bands()[0].amplitude(), 6.0);

        ensemble.update(0.1, 1.0);
        assert_eq!(ensemble.bands()[0].amplitude(), 1.0);
    }

    #[test]
    fn test_flash_validation() {
        let mut ensemble = small_ensemble();
        assert!(ensemble.trigger_flash(0.0, 1.0, 1.0).is_err());
        assert!(ensemble.trigger_flash(1.0, -1.0, 1.0).is_err());
        assert!(ensemble.trigger_flash(1.0, 1.0, -1.0).is_err());
        assert_eq!(ensemble.pending_reversions(), 0);
        assert_eq!(ensemble.bands()[0].active_flashes(), 0);
    }

    #[test]
    fn test_particle_texture() {
        let mut ensemble = small_ensemble();
        assert!(ensemble.set_particle_texture("").is_err());
        assert_eq!(ensemble.texture_revision(), 0);

        ensemble.set_particle_texture("spark_soft").unwrap();
        assert_eq!(ensemble.particle_texture(), Some("spark_soft"));
        assert_eq!(ensemble.texture_revision(), 1);
    }

    #[test]
    fn test_status() {
        let ensemble = small_ensemble();
        let status = ensemble.status();
        assert_eq!(status.len(), 2);
        assert_eq!(status[1].band, BandId(1));
        assert_eq!(status[1].origin, [0.0, 120.0, 0.0]);
        assert_eq!(status[1].length, 50.0);
        assert_eq!(status[1].frequency, 0.5);
        assert_eq!(status[1].amplitude, 4.0);
        ensemble.print_status();
    }

    #[test]
    fn test_shutdown_cancels_reversions() {
        let mut ensemble = small_ensemble();
        ensemble.trigger_flash(1.0, 1.0, 1.0).unwrap();
        ensemble.shutdown();

        assert!(ensemble.is_shut_down());
        assert!(ensemble.is_empty());
        assert_eq!(ensemble.pending_reversions(), 0);

        // Past the due time: nothing left to fire, nothing to crash on
        ensemble.update(0.1, 5.0);
        ensemble.reset_all_bands();

        // Second shutdown is a no-op
        ensemble.shutdown();
        assert!(ensemble.is_shut_down());
    }

    #[test]
    fn test_mutations_after_shutdown() {
        let mut ensemble = small_ensemble();
        ensemble.shutdown();
        assert_eq!(ensemble.set_global_frequency(1.0), Err(Error::ShutDown));
        assert_eq!(ensemble.set_global_amplitude(1.0), Err(Error::ShutDown));
        assert_eq!(ensemble.trigger_flash(1.0, 1.0, 1.0), Err(Error::ShutDown));
        assert_eq!(ensemble.set_particle_texture("x"), Err(Error::ShutDown));
    }

    #[test]
    fn test_stale_reversion_is_ignored() {
        let mut bands = vec![
            WaveBand::create(Vec3::ZERO, 10.0, 2, 1.0, 1.0, Rgb::WHITE, Rgb::BLACK).unwrap(),
        ];
        bands[0].push_flash(FlashId(7), 2.0, 1.0);
        let reversion = FlashReversion {
            band: BandId(0),
            generation: bands[0].generation(),
            flash: FlashId(7),
        };
        bands[0].retire();
        bands[0].push_flash(FlashId(7), 2.0, 1.0);

        revert_flash(&mut bands, reversion);
        assert_eq!(bands[0].active_flashes(), 1);

        revert_flash(&mut [], reversion);
    }

    #[test]
    fn test_reset_all_bands() {
        let mut ensemble = small_ensemble();
        ensemble.update(0.1, 2.0);
        ensemble.reset_all_bands();
        for band in ensemble.bands() {
            for s in band.segments() {
                assert_eq!(s.position(), s.base_position());
            }
        }
    }
}
