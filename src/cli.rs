use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::ambient::LastAmbient;
use crate::catalog::{default_catalog, CatalogSpec};
use crate::controller::{AuroraController, ControllerConfig};
use crate::ensemble::BandEnsemble;
use crate::run_job::{FrameSnapshot, RunDump, RunJobSpec, RunMetadata};
use crate::scene_graph::SceneGraph;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the aurora headless against an in-memory scene
    Simulate {
        /// Job spec JSON file. Flags below override its fields
        #[arg(long)]
        job: Option<PathBuf>,

        /// Band catalog JSON file (defaults to the built-in catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Controller config JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Frames per second
        #[arg(long)]
        fps: Option<f32>,

        /// Duration in seconds
        #[arg(long)]
        duration: Option<f32>,

        /// Trigger a flash at this elapsed time (repeatable)
        #[arg(long)]
        flash_at: Vec<f32>,

        /// Toggle visibility at this elapsed time (repeatable)
        #[arg(long)]
        toggle_at: Vec<f32>,

        /// Particle texture id
        #[arg(long)]
        texture: Option<String>,

        /// Global frequency override
        #[arg(long)]
        frequency: Option<f32>,

        /// Global amplitude override
        #[arg(long)]
        amplitude: Option<f32>,

        /// Write frame snapshots and run metadata to this JSON file
        #[arg(long)]
        dump: Option<PathBuf>,

        /// Snapshot every Nth frame
        #[arg(long)]
        dump_every: Option<usize>,
    },
    /// Print the built-in band catalog as JSON
    Catalog,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            job,
            catalog,
            config,
            fps,
            duration,
            flash_at,
            toggle_at,
            texture,
            frequency,
            amplitude,
            dump,
            dump_every,
        } => {
            let mut spec = match job {
                Some(path) => RunJobSpec::from_file(&path).map_err(anyhow::Error::msg)?,
                None => RunJobSpec::default(),
            };
            spec.catalog_path = catalog.or(spec.catalog_path);
            spec.config_path = config.or(spec.config_path);
            spec.fps = fps.unwrap_or(spec.fps);
            spec.duration = duration.unwrap_or(spec.duration);
            spec.flash_at.extend(flash_at);
            spec.toggle_at.extend(toggle_at);
            spec.texture = texture.or(spec.texture);
            spec.frequency = frequency.or(spec.frequency);
            spec.amplitude = amplitude.or(spec.amplitude);
            spec.dump_path = dump.or(spec.dump_path);
            spec.dump_every = dump_every.unwrap_or(spec.dump_every);

            let metadata = simulate(spec)?;
            println!(
                "Simulated {} frames ({} flashes, {} visibility toggles)",
                metadata.frame_count, metadata.flashes_triggered, metadata.toggles
            );
            for warning in &metadata.warnings {
                eprintln!("Warning: {}", warning);
            }
        }
        Commands::Catalog => {
            let json = serde_json::to_string_pretty(&default_catalog())?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<ControllerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse config file {:?}", path))
}

#[derive(Debug, Clone, Copy)]
enum ScriptEvent {
    Flash,
    ToggleVisibility,
}

/// Run a job to completion and return its metadata.
///
/// Scripted events go through a [`ControlHandle`](crate::controller::ControlHandle),
/// the same way an input handler would drive a live aurora.
pub fn simulate(spec: RunJobSpec) -> Result<RunMetadata> {
    spec.validate().map_err(anyhow::Error::msg)?;
    let started_at = Utc::now();

    let catalog = match &spec.catalog_path {
        Some(path) => CatalogSpec::from_file(path).map_err(anyhow::Error::msg)?,
        None => default_catalog(),
    };
    let config = match &spec.config_path {
        Some(path) => load_config(path)?,
        None => ControllerConfig::default(),
    };

    let ensemble = BandEnsemble::from_catalog(&catalog).context("Failed to build ensemble")?;
    let mut controller =
        AuroraController::new(ensemble, SceneGraph::new(), LastAmbient::default(), &config)
            .context("Invalid controller config")?;
    let handle = controller.handle();

    if let Some(frequency) = spec.frequency {
        handle.set_global_frequency(frequency).context("Invalid frequency override")?;
    }
    if let Some(amplitude) = spec.amplitude {
        handle.set_global_amplitude(amplitude).context("Invalid amplitude override")?;
    }
    if let Some(texture) = &spec.texture {
        handle.set_particle_texture(texture).context("Invalid particle texture")?;
    }

    let mut events: Vec<(f32, ScriptEvent)> = spec
        .flash_at
        .iter()
        .map(|&t| (t, ScriptEvent::Flash))
        .chain(spec.toggle_at.iter().map(|&t| (t, ScriptEvent::ToggleVisibility)))
        .collect();
    events.sort_by(|a, b| a.0.total_cmp(&b.0));

    let total_frames = spec.total_frames();
    let dt = 1.0 / spec.fps;
    let mut next_event = 0;
    let mut flashes_triggered = 0;
    let mut toggles = 0;
    let mut warnings = Vec::new();
    let mut frames = Vec::new();

    log::info!("Simulating {} frames at {} fps", total_frames, spec.fps);

    for frame in 0..total_frames {
        let elapsed = (frame + 1) as f32 * dt;

        while let Some(&(at, event)) = events.get(next_event) {
            if at > elapsed {
                break;
            }
            next_event += 1;
            let sent = match event {
                ScriptEvent::Flash => handle.trigger_flash(
                    spec.flash.duration,
                    spec.flash.extra_brightness,
                    spec.flash.extra_amplitude,
                ),
                ScriptEvent::ToggleVisibility => handle.toggle_visibility(),
            };
            match (sent, event) {
                (Ok(()), ScriptEvent::Flash) => flashes_triggered += 1,
                (Ok(()), ScriptEvent::ToggleVisibility) => toggles += 1,
                (Err(e), _) => warnings.push(format!("{:?} at {}s rejected: {}", event, at, e)),
            }
        }

        controller.frame(dt, elapsed);

        if spec.dump_path.is_some() && frame % spec.dump_every == 0 {
            frames.push(FrameSnapshot::capture(
                frame,
                elapsed,
                controller.visibility().transparency(),
                controller.ambient_sink().0,
                controller.ensemble(),
            ));
        }
    }

    controller.ensemble().print_status();
    let final_status = controller.ensemble().status();
    controller.shutdown();

    let metadata = RunMetadata {
        job: spec,
        started_at,
        completed_at: Utc::now(),
        frame_count: total_frames,
        flashes_triggered,
        toggles,
        final_status,
        aurora_version: env!("CARGO_PKG_VERSION").to_string(),
        warnings,
    };

    if let Some(path) = &metadata.job.dump_path {
        let dump = RunDump {
            metadata: metadata.clone(),
            frames,
        };
        dump.save(path).map_err(anyhow::Error::msg)?;
        log::info!("Wrote {} snapshots to {:?}", dump.frames.len(), path);
    }

    Ok(metadata)
}
