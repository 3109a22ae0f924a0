//! Stage - Direction, boundary event and race stage value types
//!
//! Small `Copy` enums shared by the boundary lookup and the team simulation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Movement sense of the active runner along the lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
    Stop,
}

impl Direction {
    /// Signed unit multiplier used to turn scalar speed into velocity
    pub fn sign(self) -> f32 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
            Direction::Stop => 0.0,
        }
    }

    /// Forward and Reverse swap; Stop stays Stop.
    pub fn toggled(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
            Direction::Stop => Direction::Stop,
        }
    }
}

/// Kind of boundary crossing reported by the overlap detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BoundaryEventKind {
    #[default]
    Enter,
    Exit,
    None,
}

/// One phase of a runner's progress through the race.
///
/// `Uninitialized` is the "no rule matched" sentinel returned by the
/// boundary lookup. A simulation never adopts it as its current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RaceStage {
    #[default]
    Wait,
    Start,
    Accelerate,
    Steady,
    Decelerate,
    ReverseDirection,
    Stop,
    Uninitialized,
}

impl RaceStage {
    /// Every stage, sentinel included
    pub const ALL: [RaceStage; 8] = [
        RaceStage::Wait,
        RaceStage::Start,
        RaceStage::Accelerate,
        RaceStage::Steady,
        RaceStage::Decelerate,
        RaceStage::ReverseDirection,
        RaceStage::Stop,
        RaceStage::Uninitialized,
    ];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for BoundaryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for RaceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
