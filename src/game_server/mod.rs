//! Game Server Module
//!
//! Relay race simulation: per-team stage machines, boundary rule tables,
//! the race-start broadcast and a tick loop that drives them.

pub mod stage;
pub mod boundary;
pub mod config;
pub mod team;
pub mod registry;
pub mod track;
pub mod race;
pub mod simulation;

pub use stage::{BoundaryEventKind, Direction, RaceStage};
pub use boundary::{resolve, BoundaryLookup, StageTransitionRule};
pub use config::{ConfigError, RaceConfig, TeamTuning, ValueRange};
pub use team::{Advance, RaceSimulation, StageCause, TeamSignal, TeamSnapshot};
pub use registry::{start_race, RaceTimer, TeamRegistry};
pub use track::{Track, Zone, ZoneTracker};
pub use race::{Lane, Race, RaceEvent, RaceOutcome, RaceResult, RaceSnapshot, RaceStatus};
pub use simulation::{GameServer, GameState, ServerStats};
