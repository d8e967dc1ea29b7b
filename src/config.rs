use crate::canvas::Pixel;
use crate::gait::GaitPhase;
use crate::leg::LEG_COUNT;
use crate::spring::SpringParams;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    f32::consts::PI,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::warn;

pub const MIN_SCALE: f32 = 0.2;
pub const MAX_SCALE: f32 = 2.0;
pub const MIN_FPS: u32 = 10;
pub const MAX_FPS: u32 = 240;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be positive (got {value})")]
    NonPositive { name: &'static str, value: f32 },
    #[error("expected {expected} leg angle offsets, got {got}")]
    LegCount { expected: usize, got: usize },
    #[error("gait groups reference leg {0}, but legs are numbered 0..{}", LEG_COUNT)]
    UnknownLeg(usize),
    #[error("leg {leg} belongs to {count} gait groups, expected exactly one")]
    GaitGroups { leg: usize, count: usize },
    #[error("fps cap {0} outside {}..={}", MIN_FPS, MAX_FPS)]
    Fps(u32),
    #[error("scale {0} outside {}..={}", MIN_SCALE, MAX_SCALE)]
    Scale(f32),
}

/// Fixed colours. Defaults are the black widow on a neumorphic slate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub background: Pixel,
    pub neu_light: Pixel,
    pub neu_shadow: Pixel,
    pub dot_shadow: Pixel,
    pub dot_highlight: Pixel,
    pub dot_core: Pixel,
    pub black: Pixel,
    pub gloss: Pixel,
    pub sheen: Pixel,
    pub red: Pixel,
    pub red_bright: Pixel,
    pub leg: Pixel,
    pub leg_highlight: Pixel,
    pub silk: Pixel,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Pixel::rgb(0x2a, 0x2a, 0x32),
            neu_light: Pixel::rgb(0x35, 0x35, 0x3f),
            neu_shadow: Pixel::rgb(0x1e, 0x1e, 0x24),
            dot_shadow: Pixel::rgb(15, 15, 20).alpha(0.7),
            dot_highlight: Pixel::rgb(65, 65, 75).alpha(0.5),
            dot_core: Pixel::rgb(80, 80, 92).alpha(0.7),
            black: Pixel::rgb(0x0d, 0x0d, 0x0d),
            gloss: Pixel::rgb(0x1a, 0x1a, 0x1a),
            sheen: Pixel::rgb(0x2c, 0x2c, 0x2c),
            red: Pixel::rgb(0xc0, 0x39, 0x2b),
            red_bright: Pixel::rgb(0xe7, 0x4c, 0x3c),
            leg: Pixel::rgb(0x11, 0x11, 0x11),
            leg_highlight: Pixel::rgb(0x29, 0x29, 0x29),
            silk: Pixel::rgb(40, 40, 48),
        }
    }
}

/// Immutable tuning for one walker. Lengths are world units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiderConfig {
    pub grid_spacing: f32,
    pub leg_reach: f32,
    pub body_radius: f32,
    pub head_radius: f32,
    pub abdomen_rx: f32,
    pub abdomen_ry: f32,
    pub eye_radius: f32,

    /// Lattice points closer than `body_radius + candidate_margin` are never candidates.
    pub candidate_margin: f32,
    /// Footholds closer than `body_radius + separation_margin` are never chosen.
    pub separation_margin: f32,
    /// Feet within `body_radius + foot_margin` are tucked under the body and not drawn.
    pub foot_margin: f32,

    pub pull_radius: f32,
    pub pull_strength: f32,
    pub arc_radius: f32,
    pub max_arcs_per_foot: usize,

    pub step_threshold: f32,
    pub too_close: f32,
    pub lift_height: f32,
    pub step_speed: f32,
    pub idle_smoothing: f32,

    pub ideal_reach: f32,
    pub cone_half_angle: f32,
    pub angular_penalty: f32,

    pub gait_group_a: Vec<usize>,
    pub gait_group_b: Vec<usize>,
    /// Preferred leg direction relative to the heading, per leg.
    pub leg_angle_offsets: Vec<f32>,

    pub spring: SpringParams,
    pub palette: Palette,
}

impl Default for SpiderConfig {
    fn default() -> Self {
        Self {
            grid_spacing: 40.0,
            leg_reach: 120.0,
            body_radius: 10.0,
            head_radius: 6.0,
            abdomen_rx: 14.0,
            abdomen_ry: 11.0,
            eye_radius: 1.8,

            candidate_margin: 5.0,
            separation_margin: 8.0,
            foot_margin: 2.0,

            pull_radius: 50.0,
            pull_strength: 8.0,
            arc_radius: 35.0,
            max_arcs_per_foot: 3,

            step_threshold: 1.15,
            too_close: 1.2,
            lift_height: 18.0,
            step_speed: 0.18,
            idle_smoothing: 0.1,

            ideal_reach: 0.65,
            cone_half_angle: PI / 2.5,
            angular_penalty: 30.0,

            gait_group_a: vec![0, 2, 5, 7],
            gait_group_b: vec![1, 3, 4, 6],
            leg_angle_offsets: vec![
                PI * 0.35,
                PI * 0.58,
                PI * 0.76,
                PI * 0.92,
                -PI * 0.35,
                -PI * 0.58,
                -PI * 0.76,
                -PI * 0.92,
            ],

            spring: SpringParams::default(),
            palette: Palette::default(),
        }
    }
}

impl SpiderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("grid_spacing", self.grid_spacing),
            ("leg_reach", self.leg_reach),
            ("body_radius", self.body_radius),
            ("step_speed", self.step_speed),
            ("pull_radius", self.pull_radius),
            ("arc_radius", self.arc_radius),
            ("spring.mass", self.spring.mass),
            ("spring.stiffness", self.spring.stiffness),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }

        if self.leg_angle_offsets.len() != LEG_COUNT {
            return Err(ConfigError::LegCount {
                expected: LEG_COUNT,
                got: self.leg_angle_offsets.len(),
            });
        }

        let mut seen = [0usize; LEG_COUNT];
        for &leg in self.gait_group_a.iter().chain(&self.gait_group_b) {
            if leg >= LEG_COUNT {
                return Err(ConfigError::UnknownLeg(leg));
            }
            seen[leg] += 1;
        }
        if let Some(leg) = seen.iter().position(|&c| c != 1) {
            return Err(ConfigError::GaitGroups {
                leg,
                count: seen[leg],
            });
        }
        Ok(())
    }

    pub fn candidate_exclusion(&self) -> f32 {
        self.body_radius + self.candidate_margin
    }

    pub fn min_separation(&self) -> f32 {
        self.body_radius + self.separation_margin
    }

    pub fn foot_threshold(&self) -> f32 {
        self.body_radius + self.foot_margin
    }

    pub fn step_far(&self) -> f32 {
        self.leg_reach * self.step_threshold
    }

    pub fn step_near(&self) -> f32 {
        self.body_radius * self.too_close
    }

    pub fn group_of(&self, leg: usize) -> GaitPhase {
        if self.gait_group_a.contains(&leg) {
            GaitPhase::A
        } else {
            GaitPhase::B
        }
    }

    /// Which side of the body a leg's knee bends toward: -1 for the first half, +1 for the rest.
    pub fn side_of(&self, leg: usize) -> f32 {
        if leg < LEG_COUNT / 2 {
            -1.0
        } else {
            1.0
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fps_cap: u32,
    /// Canvas pixels (braille sub-dots) per world unit.
    pub scale: f32,
    pub enable_color: bool,
    pub show_hud: bool,
    pub wander: bool,
    pub seed: u64,
    pub spider: SpiderConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps_cap: 60,
            scale: 0.5,
            enable_color: true,
            show_hud: true,
            wander: false,
            seed: 0x5B1D_E12B_u64,
            spider: SpiderConfig::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_FPS..=MAX_FPS).contains(&self.fps_cap) {
            return Err(ConfigError::Fps(self.fps_cap));
        }
        if !(MIN_SCALE..=MAX_SCALE).contains(&self.scale) {
            return Err(ConfigError::Scale(self.scale));
        }
        self.spider.validate()
    }
}

pub fn default_settings_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from("com", "spiderweb", "Spiderweb")
        .context("could not resolve project directories")?;
    Ok(proj.config_dir().join("settings.json"))
}

/// Missing or unreadable files fall back to defaults.
pub fn load_settings(path: &Path) -> Settings {
    let Ok(s) = fs::read_to_string(path) else {
        return Settings::default();
    };
    match serde_json::from_str::<Settings>(&s) {
        Ok(v) => v,
        Err(err) => {
            warn!(path = %path.display(), %err, "ignoring unparsable settings file");
            Settings::default()
        }
    }
}

pub fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("could not create {}", dir.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data)?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

fn atomic_rename(from: &Path, to: &Path) -> Result<()> {
    // Rename-over-existing is not atomic on Windows.
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)?;
    Ok(())
}
