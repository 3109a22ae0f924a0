//! Relay Race - stage machine simulation
//!
//! Teams pass a single active runner back and forth along a lane. Zone
//! crossings pick the next stage from per-zone rule tables; every tick
//! evolves speed, energy and distance for the current stage.

pub mod game_server;

use serde::{Deserialize, Serialize};

pub use game_server::{
    BoundaryEventKind, BoundaryLookup, ConfigError, Direction, GameServer, GameState, RaceConfig,
    RaceOutcome, RaceResult, RaceSimulation, RaceSnapshot, RaceStage, RaceStatus,
};

/// Outcome of a headless run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSummary {
    pub ticks: u64,
    pub status: RaceStatus,
    pub elapsed_time: f32,
    pub results: Vec<RaceResult>,
    pub snapshot: RaceSnapshot,
}

/// Run a full race at a fixed `1 / tick_rate` step until every team has
/// stopped or `max_ticks` is reached.
pub fn run_headless(config: RaceConfig, max_ticks: u64) -> Result<RaceSummary, ConfigError> {
    let delta = config.tick_delta();
    let mut server = GameServer::new();
    server.init_race(config)?;
    server.start_race();

    while server.is_running() && server.get_stats().ticks < max_ticks {
        server.tick_with_delta(delta);
    }

    if server.get_state() != GameState::Results {
        log::warn!("Race stopped after {} ticks without finishing", max_ticks);
    }

    let snapshot = server.get_snapshot().unwrap_or_else(|| RaceSnapshot {
        status: RaceStatus::NotStarted,
        elapsed_time: 0.0,
        teams: Vec::new(),
        finisher_count: 0,
    });

    Ok(RaceSummary {
        ticks: server.get_stats().ticks,
        status: snapshot.status,
        elapsed_time: snapshot.elapsed_time,
        results: server.get_results().unwrap_or_default(),
        snapshot,
    })
}
