//! Race - Team lanes, timing and finish detection
//!
//! Owns one lane per team, the race clock and the results table. Each
//! tick every lane advances its team, moves along the track and feeds
//! zone crossings back into the team's stage machine.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::game_server::boundary::BoundaryLookup;
use crate::game_server::config::{ConfigError, RaceConfig};
use crate::game_server::registry::{start_race, RaceTimer, TeamRegistry};
use crate::game_server::stage::BoundaryEventKind;
use crate::game_server::team::{RaceSimulation, TeamSignal, TeamSnapshot};
use crate::game_server::track::{Track, ZoneTracker};

/// Race status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceStatus {
    NotStarted,
    Racing,
    Finished,
}

/// How a team's race ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceOutcome {
    /// Every runner completed their leg
    Completed,
    /// The active runner ran out of energy
    Depleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceResult {
    pub team: usize,
    pub team_name: String,
    pub outcome: RaceOutcome,
    pub finish_time: f32,
    /// Finishing place; `None` for teams that did not complete
    pub position: Option<u32>,
    pub legs_completed: u32,
}

/// Team signal tagged with the lane it came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaceEvent {
    pub team: usize,
    pub signal: TeamSignal,
}

/// One team on the track
#[derive(Debug, Clone)]
pub struct Lane {
    pub name: String,
    pub sim: RaceSimulation,
    /// Distance from the start line
    pub position: f32,
    tracker: ZoneTracker,
}

impl Lane {
    pub fn new(name: String, sim: RaceSimulation, track: &Track) -> Self {
        Self {
            name,
            sim,
            position: 0.0,
            tracker: ZoneTracker::new(track, 0.0),
        }
    }

    /// Put the body back at `position` without reporting crossings
    pub fn place(&mut self, position: f32, track: &Track) {
        self.position = position;
        self.tracker = ZoneTracker::new(track, position);
    }

    /// Advance the team one tick and apply any zone crossings
    fn step(&mut self, delta: f32, track: &Track) -> Vec<TeamSignal> {
        let step = self.sim.advance(delta);

        if step.is_moving() {
            self.position += step.displacement;

            for crossing in self.tracker.update(track, self.position) {
                let zone = &track.zones[crossing.zone];
                if self.sim.handle_boundary(crossing.kind, &zone.rules) {
                    log::debug!(
                        "{} crossed {} ({}) and the race stage has changed to {}",
                        self.name,
                        zone.name,
                        crossing.kind,
                        self.sim.stage()
                    );
                }
            }
        }

        self.sim.drain_signals()
    }
}

/// Complete race state
#[derive(Debug, Clone)]
pub struct Race {
    /// Race configuration
    pub config: RaceConfig,
    /// Current race status
    pub status: RaceStatus,
    /// One lane per team
    pub lanes: Vec<Lane>,
    /// Race clock, started by the start broadcast
    pub timer: RaceTimer,
    /// Completed and depleted teams in the order they stopped
    pub results: Vec<RaceResult>,
    events: Vec<RaceEvent>,
}

impl Race {
    /// Create a new race with the given configuration
    pub fn new(config: RaceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            status: RaceStatus::NotStarted,
            lanes: Vec::new(),
            timer: RaceTimer::default(),
            results: Vec::new(),
            events: Vec::new(),
        })
    }

    /// Draw each team's base speed and acceleration from the seeded RNG
    pub fn generate_teams(&mut self) {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let tuning = &self.config.team;
        let track = &self.config.track;

        self.lanes = self
            .config
            .team_names
            .iter()
            .map(|name| {
                let sim = RaceSimulation::generate(tuning, &mut rng);
                log::debug!(
                    "{} generated: initial speed {:.3}, increment {:.4}",
                    name,
                    sim.initial_speed(),
                    sim.acceleration_increment()
                );
                Lane::new(name.clone(), sim, track)
            })
            .collect();
    }

    /// Line every team up on the start line
    pub fn setup_starting_positions(&mut self) {
        let track = &self.config.track;
        for lane in &mut self.lanes {
            lane.place(0.0, track);
        }
    }

    /// Broadcast Start to every team and start the clock
    pub fn start(&mut self) {
        if self.status != RaceStatus::NotStarted {
            return;
        }

        let timer = start_race(self);
        self.timer = timer;
        self.status = RaceStatus::Racing;

        for lane in &self.lanes {
            log::info!("{} starts heading {}", lane.name, lane.sim.initial_direction());
        }
    }

    /// Update race state
    pub fn update(&mut self, delta: f32) {
        match self.status {
            RaceStatus::NotStarted | RaceStatus::Finished => {}

            RaceStatus::Racing => {
                self.timer.tick(delta);

                let track = &self.config.track;
                let batches: Vec<Vec<TeamSignal>> = self
                    .lanes
                    .par_iter_mut()
                    .map(|lane| lane.step(delta, track))
                    .collect();

                for (team, signals) in batches.into_iter().enumerate() {
                    for signal in signals {
                        self.record(team, signal);
                    }
                }

                if self.lanes.iter().all(|lane| lane.sim.is_stopped()) {
                    self.timer.stop();
                    self.status = RaceStatus::Finished;
                    log::info!("Race finished after {:.3}s", self.timer.elapsed());
                }
            }
        }
    }

    fn record(&mut self, team: usize, signal: TeamSignal) {
        let settled = self.has_result(team);
        let lane = &self.lanes[team];

        match signal {
            TeamSignal::RunnerChanged { runner_index } => {
                log::info!("{} hands off, runner index now {}", lane.name, runner_index);
            }
            TeamSignal::Finished | TeamSignal::EnergyDepleted if settled => {
                log::warn!("{} already has a result; ignoring {:?}", lane.name, signal);
            }
            TeamSignal::Finished => {
                let position = self
                    .results
                    .iter()
                    .filter(|r| r.outcome == RaceOutcome::Completed)
                    .count() as u32
                    + 1;
                log::info!(
                    "{} finished in place {} at {:.3}s",
                    lane.name,
                    position,
                    self.timer.elapsed()
                );
                self.results.push(RaceResult {
                    team,
                    team_name: lane.name.clone(),
                    outcome: RaceOutcome::Completed,
                    finish_time: self.timer.elapsed(),
                    position: Some(position),
                    legs_completed: lane.sim.runner_index(),
                });
            }
            TeamSignal::EnergyDepleted => {
                log::warn!(
                    "{} runner {} ran out of energy at {:.2}",
                    lane.name,
                    lane.sim.active_runner(),
                    lane.position
                );
                self.results.push(RaceResult {
                    team,
                    team_name: lane.name.clone(),
                    outcome: RaceOutcome::Depleted,
                    finish_time: self.timer.elapsed(),
                    position: None,
                    legs_completed: lane.sim.runner_index(),
                });
            }
            TeamSignal::StageChanged { .. } | TeamSignal::TimerStopped => {}
        }

        self.events.push(RaceEvent { team, signal });
    }

    /// True once the team finished or ran out of energy
    pub fn has_result(&self, team: usize) -> bool {
        self.results.iter().any(|r| r.team == team)
    }

    /// Apply a boundary event reported by an external overlap detector
    ///
    /// Returns false for unknown teams, teams that already have a result
    /// and events that change nothing.
    pub fn boundary_event(
        &mut self,
        team: usize,
        kind: BoundaryEventKind,
        rules: &BoundaryLookup,
    ) -> bool {
        if self.has_result(team) {
            return false;
        }
        match self.lanes.get_mut(team) {
            Some(lane) => lane.sim.handle_boundary(kind, rules),
            None => false,
        }
    }

    /// Same as `boundary_event`, using a zone's rules from the configured track
    pub fn zone_event(&mut self, team: usize, zone: usize, kind: BoundaryEventKind) -> bool {
        if self.has_result(team) {
            return false;
        }
        let Some(zone) = self.config.track.zones.get(zone) else {
            return false;
        };
        match self.lanes.get_mut(team) {
            Some(lane) => lane.sim.handle_boundary(kind, &zone.rules),
            None => false,
        }
    }

    /// Take the events recorded since the last call
    pub fn take_events(&mut self) -> Vec<RaceEvent> {
        std::mem::take(&mut self.events)
    }

    /// Get compact snapshot for display or serialization
    pub fn get_snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            status: self.status,
            elapsed_time: self.timer.elapsed(),
            teams: self.lanes.iter().map(LaneSnapshot::from).collect(),
            finisher_count: self
                .results
                .iter()
                .filter(|r| r.outcome == RaceOutcome::Completed)
                .count() as u32,
        }
    }
}

impl TeamRegistry for Race {
    fn for_each_team(&mut self, f: &(dyn Fn(&mut RaceSimulation) + Sync)) {
        self.lanes.par_iter_mut().for_each(|lane| f(&mut lane.sim));
    }

    fn team_count(&self) -> usize {
        self.lanes.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneSnapshot {
    pub name: String,
    pub position: f32,
    #[serde(flatten)]
    pub team: TeamSnapshot,
}

impl From<&Lane> for LaneSnapshot {
    fn from(lane: &Lane) -> Self {
        Self {
            name: lane.name.clone(),
            position: lane.position,
            team: lane.sim.snapshot(),
        }
    }
}

/// Compact race snapshot for display or serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub status: RaceStatus,
    pub elapsed_time: f32,
    pub teams: Vec<LaneSnapshot>,
    pub finisher_count: u32,
}
