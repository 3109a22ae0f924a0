//! Simulation - Game server and tick loop
//!
//! Manages the game server state, handles tick updates and exposes the
//! host-facing inputs: start, tick and boundary events.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::game_server::boundary::BoundaryLookup;
use crate::game_server::config::{ConfigError, RaceConfig};
use crate::game_server::race::{Race, RaceEvent, RaceResult, RaceSnapshot, RaceStatus};
use crate::game_server::stage::BoundaryEventKind;

/// Server lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Idle,
    Ready,
    Racing,
    Results,
}

/// Server statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStats {
    pub tick_rate: f32,
    pub avg_tick_time_ms: f32,
    pub team_count: u32,
    pub ticks: u64,
    pub game_state: GameState,
}

/// Main game server
pub struct GameServer {
    /// Current game state
    state: GameState,
    /// Active race (if any)
    race: Option<Race>,
    /// Target tick rate (ticks per second)
    tick_rate: f32,
    /// Last tick timestamp
    last_tick: Instant,
    /// Recent tick durations for averaging
    tick_times: Vec<f32>,
    /// Ticks applied to the current race
    ticks: u64,
    /// Whether the server is running
    running: bool,
}

impl GameServer {
    /// Create a new game server
    pub fn new() -> Self {
        Self {
            state: GameState::Idle,
            race: None,
            tick_rate: 60.0,
            last_tick: Instant::now(),
            tick_times: Vec::with_capacity(60),
            ticks: 0,
            running: false,
        }
    }

    /// Initialize a new race with given config
    pub fn init_race(&mut self, config: RaceConfig) -> Result<(), ConfigError> {
        let tick_rate = config.tick_rate;
        let mut race = Race::new(config)?;
        race.generate_teams();
        race.setup_starting_positions();

        log::info!("Race initialized with {} teams", race.lanes.len());
        self.race = Some(race);
        self.tick_rate = tick_rate;
        self.ticks = 0;
        self.tick_times.clear();
        self.running = false;
        self.state = GameState::Ready;
        Ok(())
    }

    /// Broadcast the start to every team
    pub fn start_race(&mut self) {
        if self.state != GameState::Ready {
            return;
        }
        if let Some(race) = &mut self.race {
            race.start();
            self.state = GameState::Racing;
            self.running = true;
            self.last_tick = Instant::now();
        }
    }

    /// Tick using wall-clock time since the previous tick
    pub fn tick(&mut self) -> Option<RaceSnapshot> {
        let now = Instant::now();
        let delta = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        self.tick_with_delta(delta)
    }

    /// Tick with an explicit delta (deterministic)
    pub fn tick_with_delta(&mut self, delta: f32) -> Option<RaceSnapshot> {
        if !self.running {
            return self.get_snapshot();
        }

        let tick_start = Instant::now();

        if let Some(race) = &mut self.race {
            race.update(delta);
            self.ticks += 1;

            if race.status == RaceStatus::Finished {
                self.state = GameState::Results;
                self.running = false;
            }
        }

        // Record tick time
        let tick_time = tick_start.elapsed().as_secs_f32() * 1000.0;
        self.tick_times.push(tick_time);
        if self.tick_times.len() > 60 {
            self.tick_times.remove(0);
        }

        self.get_snapshot()
    }

    /// Boundary event from an external overlap detector
    pub fn boundary_event(
        &mut self,
        team: usize,
        kind: BoundaryEventKind,
        rules: &BoundaryLookup,
    ) -> bool {
        self.race
            .as_mut()
            .map(|race| race.boundary_event(team, kind, rules))
            .unwrap_or(false)
    }

    /// Get current race snapshot
    pub fn get_snapshot(&self) -> Option<RaceSnapshot> {
        self.race.as_ref().map(|r| r.get_snapshot())
    }

    /// Get race results
    pub fn get_results(&self) -> Option<Vec<RaceResult>> {
        self.race.as_ref().map(|r| r.results.clone())
    }

    /// Drain race events recorded since the last call
    pub fn take_events(&mut self) -> Vec<RaceEvent> {
        self.race
            .as_mut()
            .map(|r| r.take_events())
            .unwrap_or_default()
    }

    /// Get server statistics
    pub fn get_stats(&self) -> ServerStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32
        };

        ServerStats {
            tick_rate: self.tick_rate,
            avg_tick_time_ms: avg_tick_time,
            team_count: self.race.as_ref().map(|r| r.lanes.len() as u32).unwrap_or(0),
            ticks: self.ticks,
            game_state: self.state,
        }
    }

    /// Get current game state
    pub fn get_state(&self) -> GameState {
        self.state
    }

    /// Reset to idle state
    pub fn reset(&mut self) {
        self.state = GameState::Idle;
        self.race = None;
        self.running = false;
        self.ticks = 0;
        self.tick_times.clear();
    }

    /// Pause the simulation
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Resume the simulation
    pub fn resume(&mut self) {
        if self.state == GameState::Racing {
            self.running = true;
            self.last_tick = Instant::now();
        }
    }

    /// Check if server is running
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl Default for GameServer {
    fn default() -> Self {
        Self::new()
    }
}
