//! Visible/Hidden toggle with an eased transparency fade.
//!
//! Toggling never pauses the simulation; hidden bands keep animating.
//! The fade always starts from the current transparency, so toggling
//! mid-fade reverses smoothly instead of jumping.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, Result};

fn default_fade_duration() -> f32 {
    1.0
}

/// Fade timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityConfig {
    /// Seconds for a full fade.
    #[serde(default = "default_fade_duration")]
    pub fade_duration: f32,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            fade_duration: default_fade_duration(),
        }
    }
}

impl VisibilityConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("fade_duration", self.fade_duration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    fn toggled(self) -> Self {
        match self {
            Visibility::Visible => Visibility::Hidden,
            Visibility::Hidden => Visibility::Visible,
        }
    }

    /// Transparency the fade settles at (0 = opaque).
    pub fn target_transparency(self) -> f32 {
        match self {
            Visibility::Visible => 0.0,
            Visibility::Hidden => 1.0,
        }
    }
}

/// Quadratic ease-out on [0, 1].
fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * (2.0 - t)
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    from: f32,
    to: f32,
    start: f32,
}

/// Visibility state machine plus its in-flight fade.
#[derive(Debug, Clone)]
pub struct VisibilityFade {
    state: Visibility,
    transparency: f32,
    fade: Option<Fade>,
    duration: f32,
}

impl VisibilityFade {
    pub fn new(config: &VisibilityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: Visibility::Visible,
            transparency: 0.0,
            fade: None,
            duration: config.fade_duration,
        })
    }

    pub fn state(&self) -> Visibility {
        self.state
    }

    pub fn transparency(&self) -> f32 {
        self.transparency
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Point lights follow the logical state immediately, not the fade.
    pub fn lights_enabled(&self) -> bool {
        self.state == Visibility::Visible
    }

    /// Flip the state and start a fade at `now`. Returns the new state.
    pub fn toggle(&mut self, now: f32) -> Visibility {
        self.state = self.state.toggled();
        self.fade = Some(Fade {
            from: self.transparency,
            to: self.state.target_transparency(),
            start: now,
        });
        log::info!("Bands now {:?}", self.state);
        self.state
    }

    /// Advance the fade to `now` and return the current transparency.
    pub fn update(&mut self, now: f32) -> f32 {
        if let Some(fade) = self.fade {
            let progress = (now - fade.start) / self.duration;
            if progress >= 1.0 {
                self.transparency = fade.to;
                self.fade = None;
            } else {
                let eased = ease_out(progress);
                self.transparency = fade.from + (fade.to - fade.from) * eased;
            }
        }
        self.transparency
    }
}
