//! Boundary - Direction/trigger to stage lookup table
//!
//! Each zone on the track carries an ordered list of rules. When a lane
//! crosses the zone, the crossing kind and the lane's current direction
//! select the stage the lane should move to.

use serde::{Deserialize, Serialize};

use crate::game_server::stage::{BoundaryEventKind, Direction, RaceStage};

/// Pairs a (direction, event) with the stage it leads to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransitionRule {
    pub direction: Direction,
    pub event: BoundaryEventKind,
    pub stage: RaceStage,
}

impl StageTransitionRule {
    pub const fn new(direction: Direction, event: BoundaryEventKind, stage: RaceStage) -> Self {
        Self {
            direction,
            event,
            stage,
        }
    }

    pub fn is_match(&self, event: BoundaryEventKind, direction: Direction) -> bool {
        self.event == event && self.direction == direction
    }
}

/// Returns the stage of the first matching rule, or `Uninitialized`.
pub fn resolve(
    table: &[StageTransitionRule],
    event: BoundaryEventKind,
    direction: Direction,
) -> RaceStage {
    table
        .iter()
        .find(|rule| rule.is_match(event, direction))
        .map(|rule| rule.stage)
        .unwrap_or(RaceStage::Uninitialized)
}

/// Named, ordered rule table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundaryLookup {
    rules: Vec<StageTransitionRule>,
}

impl BoundaryLookup {
    pub fn new(rules: Vec<StageTransitionRule>) -> Self {
        Self { rules }
    }

    /// Builder-style append; later rules lose ties to earlier ones.
    pub fn with(mut self, direction: Direction, event: BoundaryEventKind, stage: RaceStage) -> Self {
        self.rules
            .push(StageTransitionRule::new(direction, event, stage));
        self
    }

    pub fn resolve(&self, event: BoundaryEventKind, direction: Direction) -> RaceStage {
        resolve(&self.rules, event, direction)
    }

    pub fn rules(&self) -> &[StageTransitionRule] {
        &self.rules
    }

    /// True when some (direction, event) pair appears more than once
    pub fn has_duplicates(&self) -> bool {
        self.rules.iter().enumerate().any(|(i, a)| {
            self.rules[i + 1..]
                .iter()
                .any(|b| b.direction == a.direction && b.event == a.event)
        })
    }
}
