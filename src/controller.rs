//! Frame driver and control surface for the aurora.
//!
//! The controller owns the ensemble, the scene binding, the visibility fade
//! and the ambient cycle. External event sources (input handlers, timers,
//! scripted triggers) never touch that state directly: they hold a
//! [`ControlHandle`], which validates arguments on the caller's side and
//! queues a [`Command`]. Queued commands are applied at the start of the
//! next [`AuroraController::frame`], on the frame thread, so a mutation can
//! never interleave with a band update.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::ambient::{self, AmbientConfig, AmbientSink};
use crate::ensemble::BandEnsemble;
use crate::error::{ensure_non_negative, ensure_positive, Error, Result};
use crate::scene_binding::{SceneBinding, SegmentStyle};
use crate::scene_graph::SceneProvider;
use crate::visibility::{Visibility, VisibilityConfig, VisibilityFade};

/// Everything the controller needs besides the band catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerConfig {
    #[serde(default)]
    pub ambient: AmbientConfig,
    #[serde(default)]
    pub visibility: VisibilityConfig,
    #[serde(default)]
    pub style: SegmentStyle,
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<()> {
        self.ambient
            .validate()
            .map_err(|reason| Error::invalid("ambient", reason))?;
        self.visibility.validate()
    }
}

/// A queued control request.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetGlobalFrequency(f32),
    SetGlobalAmplitude(f32),
    TriggerFlash {
        duration: f32,
        extra_brightness: f32,
        extra_amplitude: f32,
    },
    ResetAll,
    SetParticleTexture(String),
    ToggleVisibility,
    PrintStatus,
    Shutdown,
}

impl Command {
    /// Check the same preconditions the ensemble checks, ahead of queueing.
    pub fn validate(&self) -> Result<()> {
        match self {
            Command::SetGlobalFrequency(v) => ensure_positive("frequency", *v),
            Command::SetGlobalAmplitude(v) => ensure_non_negative("amplitude", *v),
            Command::TriggerFlash {
                duration,
                extra_brightness,
                extra_amplitude,
            } => {
                ensure_positive("duration", *duration)?;
                ensure_non_negative("extra_brightness", *extra_brightness)?;
                ensure_non_negative("extra_amplitude", *extra_amplitude)
            }
            Command::SetParticleTexture(id) if id.trim().is_empty() => {
                Err(Error::invalid("texture_id", "must not be empty"))
            }
            _ => Ok(()),
        }
    }
}

/// Cloneable, thread-safe sender of control commands.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: Sender<Command>,
}

impl ControlHandle {
    /// Validate and queue a command for the next frame.
    pub fn send(&self, command: Command) -> Result<()> {
        command.validate()?;
        self.tx.send(command).map_err(|_| Error::ShutDown)
    }

    pub fn set_global_frequency(&self, frequency: f32) -> Result<()> {
        self.send(Command::SetGlobalFrequency(frequency))
    }

    pub fn set_global_amplitude(&self, amplitude: f32) -> Result<()> {
        self.send(Command::SetGlobalAmplitude(amplitude))
    }

    pub fn trigger_flash(&self, duration: f32, extra_brightness: f32, extra_amplitude: f32) -> Result<()> {
        self.send(Command::TriggerFlash {
            duration,
            extra_brightness,
            extra_amplitude,
        })
    }

    pub fn reset_all(&self) -> Result<()> {
        self.send(Command::ResetAll)
    }

    pub fn set_particle_texture(&self, texture_id: &str) -> Result<()> {
        self.send(Command::SetParticleTexture(texture_id.to_string()))
    }

    pub fn toggle_visibility(&self) -> Result<()> {
        self.send(Command::ToggleVisibility)
    }

    pub fn print_status(&self) -> Result<()> {
        self.send(Command::PrintStatus)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }
}

/// Owns the simulation and drives it one frame at a time.
pub struct AuroraController<P: SceneProvider, A: AmbientSink> {
    ensemble: BandEnsemble,
    scene: P,
    ambient_sink: A,
    binding: Option<SceneBinding>,
    visibility: VisibilityFade,
    ambient: AmbientConfig,
    tx: Sender<Command>,
    rx: Receiver<Command>,
    frames: u64,
}

impl<P: SceneProvider, A: AmbientSink> AuroraController<P, A> {
    /// Bind `ensemble` to `scene` and get ready to run frames.
    ///
    /// Fails on an invalid config before anything is created in `scene`.
    pub fn new(ensemble: BandEnsemble, mut scene: P, ambient_sink: A, config: &ControllerConfig) -> Result<Self> {
        config.validate()?;
        let visibility = VisibilityFade::new(&config.visibility)?;
        let binding = SceneBinding::attach(&mut scene, &ensemble, &config.style);
        let (tx, rx) = unbounded();
        Ok(Self {
            ensemble,
            scene,
            ambient_sink,
            binding: Some(binding),
            visibility,
            ambient: config.ambient.clone(),
            tx,
            rx,
            frames: 0,
        })
    }

    /// A new handle for an external event source.
    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn ensemble(&self) -> &BandEnsemble {
        &self.ensemble
    }

    pub fn scene(&self) -> &P {
        &self.scene
    }

    pub fn ambient_sink(&self) -> &A {
        &self.ambient_sink
    }

    pub fn binding(&self) -> Option<&SceneBinding> {
        self.binding.as_ref()
    }

    pub fn visibility(&self) -> &VisibilityFade {
        &self.visibility
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_shut_down(&self) -> bool {
        self.ensemble.is_shut_down()
    }

    /// Apply a command immediately. `now` is the current elapsed time.
    pub fn apply(&mut self, command: Command, now: f32) -> Result<()> {
        match command {
            Command::SetGlobalFrequency(v) => self.ensemble.set_global_frequency(v),
            Command::SetGlobalAmplitude(v) => self.ensemble.set_global_amplitude(v),
            Command::TriggerFlash {
                duration,
                extra_brightness,
                extra_amplitude,
            } => {
                // Time the reversion from this frame, not the last update
                self.ensemble.advance_clock(now);
                self.ensemble
                    .trigger_flash(duration, extra_brightness, extra_amplitude)
                    .map(|_| ())
            }
            Command::ResetAll => {
                self.ensemble.reset_all_bands();
                Ok(())
            }
            Command::SetParticleTexture(id) => self.ensemble.set_particle_texture(&id),
            Command::ToggleVisibility => {
                if self.is_shut_down() {
                    return Err(Error::ShutDown);
                }
                self.visibility.toggle(now);
                Ok(())
            }
            Command::PrintStatus => {
                self.ensemble.print_status();
                Ok(())
            }
            Command::Shutdown => {
                self.shutdown();
                Ok(())
            }
        }
    }

    /// Run one frame: apply queued commands, advance the simulation, then
    /// push the results to the scene and the ambient sink.
    pub fn frame(&mut self, dt: f32, elapsed: f32) {
        while let Ok(command) = self.rx.try_recv() {
            log::debug!("Applying {:?}", command);
            if let Err(e) = self.apply(command, elapsed) {
                log::warn!("Command rejected: {}", e);
            }
        }

        if self.is_shut_down() {
            return;
        }

        self.ensemble.update(dt, elapsed);
        let transparency = self.visibility.update(elapsed);

        if let Some(binding) = self.binding.as_mut() {
            binding.sync(&mut self.scene, &self.ensemble);
            binding.apply_visibility(&mut self.scene, transparency, self.visibility.lights_enabled());
        }

        self.ambient_sink.apply(ambient::sample(&self.ambient, elapsed));
        self.frames += 1;
        log::trace!("Frame {} at {:.3}s", self.frames, elapsed);
    }

    pub fn visibility_state(&self) -> Visibility {
        self.visibility.state()
    }

    /// Tear everything down once. Later calls do nothing.
    pub fn shutdown(&mut self) {
        if self.is_shut_down() {
            return;
        }
        if let Some(mut binding) = self.binding.take() {
            binding.detach(&mut self.scene);
        }
        self.ensemble.shutdown();
        // Drop anything queued behind the shutdown
        let dropped = self.rx.try_iter().count();
        if dropped > 0 {
            log::debug!("Dropped {} queued commands at shutdown", dropped);
        }
    }
}
