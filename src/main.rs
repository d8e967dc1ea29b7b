use anyhow::{Context, Result};
use clap::Parser;
use spiderweb::config::{default_settings_path, load_settings, save_settings_atomic, Settings};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(name = "spiderweb")]
#[command(about = "A black widow walking a dot lattice after your mouse, in braille", long_about = None)]
struct Args {
    /// Frame rate cap
    #[arg(long)]
    fps: Option<u32>,

    /// Braille sub-dots per world unit (zoom)
    #[arg(long)]
    scale: Option<f32>,

    /// Monochrome output
    #[arg(long, default_value_t = false)]
    mono: bool,

    /// Start with the HUD hidden
    #[arg(long, default_value_t = false)]
    no_hud: bool,

    /// Let the pointer wander on its own
    #[arg(long, default_value_t = false)]
    wander: bool,

    /// Seed for wander and teleport targets
    #[arg(long)]
    seed: Option<u64>,

    /// Settings file (defaults to the per-user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the resolved settings to the settings file and exit
    #[arg(long, default_value_t = false)]
    write_config: bool,

    /// Write logs here. The terminal belongs to the spider, so nothing is logged without it.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn apply(&self, s: &mut Settings) {
        if let Some(fps) = self.fps {
            s.fps_cap = fps;
        }
        if let Some(scale) = self.scale {
            s.scale = scale;
        }
        if let Some(seed) = self.seed {
            s.seed = seed;
        }
        if self.mono {
            s.enable_color = false;
        }
        if self.no_hud {
            s.show_hud = false;
        }
        if self.wander {
            s.wander = true;
        }
    }
}

fn init_tracing(log_file: Option<&PathBuf>) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file =
        File::create(path).with_context(|| format!("could not open log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file.as_ref())?;

    let path = match &args.config {
        Some(p) => p.clone(),
        None => default_settings_path()?,
    };
    let mut settings = load_settings(&path);
    args.apply(&mut settings);
    settings.validate().context("invalid settings")?;

    if args.write_config {
        save_settings_atomic(&path, &settings)?;
        info!(path = %path.display(), "settings written");
        println!("wrote {}", path.display());
        return Ok(());
    }

    spiderweb::app::run(settings)
}
