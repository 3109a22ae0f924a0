//! Config - Race setup and validation
//!
//! Configuration is read once at setup. Anything that would make the
//! simulation misbehave later (odd runner counts, inverted ranges, a zero
//! speed floor) is rejected here instead.

use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game_server::track::Track;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("A team needs at least one runner")]
    ZeroRunners,

    #[error("Runner count must be even, got {count}")]
    OddRunnerCount { count: u32 },

    #[error("Invalid range for {field}: {min}..={max}")]
    InvalidRange {
        field: &'static str,
        min: f32,
        max: f32,
    },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("Max speed {max_speed} is below the initial speed ceiling {initial_max}")]
    SpeedCeilingBelowFloor { max_speed: f32, initial_max: f32 },

    #[error("A race needs at least one team")]
    NoTeams,

    #[error("Track has no zones")]
    EmptyTrack,

    #[error("Zone {name} ends before it starts")]
    InvertedZone { name: String },
}

/// Inclusive range that per-team values are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Uniform draw; a degenerate range always yields `min`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.max > self.min {
            rng.gen_range(self.min..=self.max)
        } else {
            self.min
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.max < self.min {
            return Err(ConfigError::InvalidRange {
                field,
                min: self.min,
                max: self.max,
            });
        }
        if self.min <= 0.0 {
            return Err(ConfigError::NonPositive {
                field,
                value: self.min,
            });
        }
        Ok(())
    }
}

/// Per-team tuning shared by every team in a race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamTuning {
    /// Range the base (floor) speed is drawn from
    pub initial_speed: ValueRange,
    /// Range the per-tick speed change is drawn from
    pub acceleration_increment: ValueRange,
    /// Speed ceiling
    pub max_speed: f32,
    /// Energy each runner starts with
    pub max_energy: f32,
    /// Energy burned per unit time while moving
    pub energy_burn: f32,
    /// Runners per team (even)
    pub runner_count: u32,
}

impl Default for TeamTuning {
    fn default() -> Self {
        Self {
            initial_speed: ValueRange::new(1.8, 2.2),
            acceleration_increment: ValueRange::new(0.008, 0.015),
            max_speed: 10.0,
            max_energy: 10.0,
            energy_burn: 0.4,
            runner_count: 4,
        }
    }
}

impl TeamTuning {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runner_count == 0 {
            return Err(ConfigError::ZeroRunners);
        }
        if self.runner_count % 2 != 0 {
            return Err(ConfigError::OddRunnerCount {
                count: self.runner_count,
            });
        }
        self.initial_speed.validate("initial_speed")?;
        self.acceleration_increment
            .validate("acceleration_increment")?;
        if !(self.max_energy > 0.0) {
            return Err(ConfigError::NonPositive {
                field: "max_energy",
                value: self.max_energy,
            });
        }
        if !(self.energy_burn >= 0.0) {
            return Err(ConfigError::NonPositive {
                field: "energy_burn",
                value: self.energy_burn,
            });
        }
        if !(self.max_speed >= self.initial_speed.max) {
            return Err(ConfigError::SpeedCeilingBelowFloor {
                max_speed: self.max_speed,
                initial_max: self.initial_speed.max,
            });
        }
        Ok(())
    }
}

/// Race configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// One lane per name
    pub team_names: Vec<String>,
    pub team: TeamTuning,
    pub track: Track,
    /// Seed for the per-team random draws
    pub seed: u64,
    /// Ticks per second for headless runs
    pub tick_rate: f32,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            team_names: vec!["Red".into(), "Blue".into()],
            team: TeamTuning::default(),
            track: Track::default(),
            seed: 42,
            tick_rate: 60.0,
        }
    }
}

impl RaceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.team_names.is_empty() {
            return Err(ConfigError::NoTeams);
        }
        if !(self.tick_rate > 0.0) {
            return Err(ConfigError::NonPositive {
                field: "tick_rate",
                value: self.tick_rate,
            });
        }
        self.team.validate()?;
        self.track.validate()
    }

    /// Parse and validate a JSON document; omitted fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RaceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Seconds per tick for headless runs
    pub fn tick_delta(&self) -> f32 {
        1.0 / self.tick_rate
    }
}
