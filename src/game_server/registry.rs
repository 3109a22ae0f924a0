//! Registry - Race-start broadcast and race clock
//!
//! Starting a race writes `Start` into every team. The caller hands in
//! the collection of teams explicitly; each team is reached through a
//! unique `&mut`, so no two writers can ever touch the same team.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::game_server::team::RaceSimulation;

/// Source of every team taking part in a race
pub trait TeamRegistry {
    /// Run `f` once on each team, in any order.
    fn for_each_team(&mut self, f: &(dyn Fn(&mut RaceSimulation) + Sync));

    fn team_count(&self) -> usize;
}

impl TeamRegistry for [RaceSimulation] {
    fn for_each_team(&mut self, f: &(dyn Fn(&mut RaceSimulation) + Sync)) {
        self.par_iter_mut().for_each(|team| f(team));
    }

    fn team_count(&self) -> usize {
        self.len()
    }
}

impl TeamRegistry for Vec<RaceSimulation> {
    fn for_each_team(&mut self, f: &(dyn Fn(&mut RaceSimulation) + Sync)) {
        self.as_mut_slice().for_each_team(f);
    }

    fn team_count(&self) -> usize {
        self.len()
    }
}

/// Elapsed race time, advanced by tick deltas
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceTimer {
    elapsed: f32,
    running: bool,
}

impl RaceTimer {
    pub fn started() -> Self {
        Self {
            elapsed: 0.0,
            running: true,
        }
    }

    pub fn tick(&mut self, delta: f32) {
        if self.running {
            self.elapsed += delta;
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Broadcast `Start` to every team and start the race clock.
pub fn start_race<R: TeamRegistry + ?Sized>(registry: &mut R) -> RaceTimer {
    let timer = RaceTimer::started();
    registry.for_each_team(&|team: &mut RaceSimulation| team.start());
    log::info!("Race started for {} teams", registry.team_count());
    timer
}
