//! Track - Lane layout and zone crossing detection
//!
//! A 1-D stand-in for the scene's trigger volumes. Each zone is an
//! interval along the lane with its own rule table. `ZoneTracker`
//! remembers which zones a lane currently overlaps and reports
//! enter/exit crossings after every move.

use serde::{Deserialize, Serialize};

use crate::game_server::boundary::BoundaryLookup;
use crate::game_server::config::ConfigError;
use crate::game_server::stage::{BoundaryEventKind, Direction, RaceStage};

/// Marked interval on the lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub start: f32,
    pub end: f32,
    pub rules: BoundaryLookup,
}

impl Zone {
    pub fn new(name: impl Into<String>, start: f32, end: f32, rules: BoundaryLookup) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            rules,
        }
    }

    pub fn contains(&self, position: f32) -> bool {
        position >= self.start && position <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Distance between the start line and the turn line
    pub length: f32,
    pub zones: Vec<Zone>,
}

impl Default for Track {
    /// Two-ended course: start line, launch, cruise, braking, turn line.
    fn default() -> Self {
        use BoundaryEventKind::{Enter, Exit};
        use Direction::{Forward, Reverse};

        let length = 60.0;
        Self {
            length,
            zones: vec![
                Zone::new(
                    "start-line",
                    -1.0,
                    1.0,
                    BoundaryLookup::default().with(Reverse, Enter, RaceStage::ReverseDirection),
                ),
                Zone::new(
                    "launch",
                    1.0,
                    8.0,
                    BoundaryLookup::default()
                        .with(Forward, Exit, RaceStage::Accelerate)
                        .with(Reverse, Enter, RaceStage::Decelerate),
                ),
                Zone::new(
                    "cruise",
                    20.0,
                    40.0,
                    BoundaryLookup::default()
                        .with(Forward, Enter, RaceStage::Steady)
                        .with(Reverse, Enter, RaceStage::Steady),
                ),
                Zone::new(
                    "braking",
                    52.0,
                    length - 1.0,
                    BoundaryLookup::default()
                        .with(Forward, Enter, RaceStage::Decelerate)
                        .with(Reverse, Exit, RaceStage::Accelerate),
                ),
                Zone::new(
                    "turn-line",
                    length - 1.0,
                    length + 1.0,
                    BoundaryLookup::default().with(Forward, Enter, RaceStage::ReverseDirection),
                ),
            ],
        }
    }
}

impl Track {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zones.is_empty() {
            return Err(ConfigError::EmptyTrack);
        }
        if let Some(zone) = self.zones.iter().find(|z| !(z.end >= z.start)) {
            return Err(ConfigError::InvertedZone {
                name: zone.name.clone(),
            });
        }
        for zone in self.zones.iter().filter(|z| z.rules.has_duplicates()) {
            log::warn!(
                "Zone {} has duplicate rules; the first match wins",
                zone.name
            );
        }
        Ok(())
    }
}

/// A single crossing reported by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub zone: usize,
    pub kind: BoundaryEventKind,
}

/// Zone occupancy for one lane
#[derive(Debug, Clone, Default)]
pub struct ZoneTracker {
    inside: Vec<bool>,
}

impl ZoneTracker {
    /// Capture the starting occupancy without reporting events
    pub fn new(track: &Track, position: f32) -> Self {
        Self {
            inside: track.zones.iter().map(|z| z.contains(position)).collect(),
        }
    }

    /// Crossings caused by moving to `position`: exits first, then enters,
    /// each in zone order.
    pub fn update(&mut self, track: &Track, position: f32) -> Vec<Crossing> {
        let now: Vec<bool> = track.zones.iter().map(|z| z.contains(position)).collect();

        let exits = self
            .inside
            .iter()
            .zip(&now)
            .enumerate()
            .filter(|(_, (was, is))| **was && !**is)
            .map(|(zone, _)| Crossing {
                zone,
                kind: BoundaryEventKind::Exit,
            });
        let enters = self
            .inside
            .iter()
            .zip(&now)
            .enumerate()
            .filter(|(_, (was, is))| !**was && **is)
            .map(|(zone, _)| Crossing {
                zone,
                kind: BoundaryEventKind::Enter,
            });
        let crossings = exits.chain(enters).collect();

        self.inside = now;
        crossings
    }

    pub fn is_inside(&self, zone: usize) -> bool {
        self.inside.get(zone).copied().unwrap_or(false)
    }
}
