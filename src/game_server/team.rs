//! Team - Per-team race stage machine
//!
//! Each team has one active runner at a time. The simulation owns the
//! current stage, direction, speed, energy and hand-off bookkeeping.
//! Hosts drive it with `advance` once per tick and with boundary events
//! whenever the runner crosses a zone; they read back movement and drain
//! `TeamSignal`s for labels, timers and diagnostics.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game_server::boundary::BoundaryLookup;
use crate::game_server::config::TeamTuning;
use crate::game_server::stage::{BoundaryEventKind, Direction, RaceStage};

/// What caused a stage change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageCause {
    /// A boundary crossing matched a rule
    Boundary(BoundaryEventKind),
    /// Direct request from the host
    Request,
    /// Race-start broadcast
    RaceStart,
    /// Hand-off finished and moved the team on
    HandOff,
    /// Energy ran out mid-tick
    EnergyDepleted,
}

/// Output signals consumed by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TeamSignal {
    StageChanged {
        from: RaceStage,
        to: RaceStage,
        cause: StageCause,
    },
    /// A new runner took over; carries the updated runner index
    RunnerChanged { runner_index: u32 },
    /// Fatal stop: the active runner ran out of energy
    EnergyDepleted,
    /// Last runner completed the final leg
    Finished,
    /// The team entered Stop and the race clock should stop for it
    TimerStopped,
}

/// Movement intent produced by one tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Advance {
    /// Signed speed (speed times direction sign)
    pub velocity: f32,
    /// Translation the host should apply this tick (velocity * delta)
    pub displacement: f32,
    /// True when this tick ended the race for the team by exhaustion
    pub fatally_stopped: bool,
}

impl Advance {
    pub fn is_moving(&self) -> bool {
        self.velocity != 0.0
    }
}

/// Race state for one team
#[derive(Debug, Clone)]
pub struct RaceSimulation {
    stage: RaceStage,
    direction: Direction,
    initial_direction: Direction,
    speed: f32,
    initial_speed: f32,
    acceleration_increment: f32,
    max_speed: f32,
    energy: f32,
    max_energy: f32,
    energy_burn: f32,
    distance_traveled: f32,
    runner_index: u32,
    runner_count: u32,
    depleted: bool,
    signals: Vec<TeamSignal>,
}

impl RaceSimulation {
    /// Build a team with explicit base speed and acceleration increment.
    ///
    /// `tuning` is expected to have passed `TeamTuning::validate`.
    pub fn new(tuning: &TeamTuning, initial_speed: f32, acceleration_increment: f32) -> Self {
        Self {
            stage: RaceStage::Wait,
            direction: Direction::Forward,
            initial_direction: Direction::Forward,
            speed: initial_speed,
            initial_speed,
            acceleration_increment,
            max_speed: tuning.max_speed,
            energy: tuning.max_energy,
            max_energy: tuning.max_energy,
            energy_burn: tuning.energy_burn,
            distance_traveled: 0.0,
            runner_index: 0,
            runner_count: tuning.runner_count,
            depleted: false,
            signals: Vec::new(),
        }
    }

    /// Build a team with base speed and acceleration drawn from the tuning ranges
    pub fn generate<R: Rng + ?Sized>(tuning: &TeamTuning, rng: &mut R) -> Self {
        let initial_speed = tuning.initial_speed.sample(rng);
        let acceleration_increment = tuning.acceleration_increment.sample(rng);
        Self::new(tuning, initial_speed, acceleration_increment)
    }

    /// Starting direction for a team that begins at the far end
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self.initial_direction = direction;
        self
    }

    /// Adopt `candidate` unless it is the sentinel or already current.
    ///
    /// Returns true if the stage changed.
    pub fn request_stage(&mut self, candidate: RaceStage) -> bool {
        self.transition(candidate, StageCause::Request)
    }

    /// Resolve a boundary crossing against `rules` using the current
    /// direction and request the resulting stage.
    pub fn handle_boundary(&mut self, event: BoundaryEventKind, rules: &BoundaryLookup) -> bool {
        let candidate = rules.resolve(event, self.direction);
        self.transition(candidate, StageCause::Boundary(event))
    }

    /// Race-start broadcast target
    pub fn start(&mut self) {
        self.transition(RaceStage::Start, StageCause::RaceStart);
    }

    fn transition(&mut self, candidate: RaceStage, cause: StageCause) -> bool {
        if candidate == RaceStage::Uninitialized || candidate == self.stage {
            return false;
        }

        let from = self.stage;
        self.stage = candidate;
        self.signals.push(TeamSignal::StageChanged {
            from,
            to: candidate,
            cause,
        });
        if candidate == RaceStage::Stop {
            self.signals.push(TeamSignal::TimerStopped);
        }
        true
    }

    /// Run the current stage once and integrate speed, energy and distance.
    pub fn advance(&mut self, delta: f32) -> Advance {
        let sign = self.direction.sign();
        let mut velocity = 0.0;

        match self.stage {
            RaceStage::Wait | RaceStage::Stop | RaceStage::Uninitialized => {}
            RaceStage::Start => {
                velocity = self.speed * sign;
            }
            RaceStage::Accelerate => {
                self.speed = (self.speed + self.acceleration_increment).min(self.max_speed);
                velocity = self.speed * sign;
            }
            RaceStage::Steady => {
                self.speed = self.max_speed;
                velocity = self.speed * sign;
            }
            RaceStage::Decelerate => {
                self.speed = (self.speed - self.acceleration_increment).max(self.initial_speed);
                velocity = self.speed * sign;
            }
            RaceStage::ReverseDirection => self.hand_off(),
        }

        if velocity == 0.0 {
            return Advance::default();
        }

        let frame_distance = self.speed * delta;
        self.distance_traveled += frame_distance;

        let burn_rate = self.energy_burn / self.speed;
        self.energy -= burn_rate * frame_distance;

        if self.energy <= 0.0 {
            self.energy = 0.0;
            self.speed = 0.0;
            self.depleted = true;
            self.transition(RaceStage::Stop, StageCause::EnergyDepleted);
            self.signals.push(TeamSignal::EnergyDepleted);
            return Advance {
                fatally_stopped: true,
                ..Default::default()
            };
        }

        Advance {
            velocity,
            displacement: velocity * delta,
            fatally_stopped: false,
        }
    }

    /// Turn around and pass to the next runner.
    ///
    /// Always leaves ReverseDirection in the same tick, so one entry into
    /// the stage hands off exactly once.
    fn hand_off(&mut self) {
        self.direction = self.direction.toggled();

        if self.runner_index < self.runner_count {
            self.runner_index += 1;
            self.distance_traveled = 0.0;
            self.energy = self.max_energy;
            self.signals.push(TeamSignal::RunnerChanged {
                runner_index: self.runner_index,
            });
        }

        if self.runner_index != self.runner_count {
            self.transition(RaceStage::Start, StageCause::HandOff);
        } else {
            self.transition(RaceStage::Stop, StageCause::HandOff);
            self.signals.push(TeamSignal::Finished);
        }
    }

    /// Take every signal recorded since the last drain
    pub fn drain_signals(&mut self) -> Vec<TeamSignal> {
        std::mem::take(&mut self.signals)
    }

    pub fn stage(&self) -> RaceStage {
        self.stage
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn initial_direction(&self) -> Direction {
        self.initial_direction
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn initial_speed(&self) -> f32 {
        self.initial_speed
    }

    pub fn acceleration_increment(&self) -> f32 {
        self.acceleration_increment
    }

    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    pub fn energy(&self) -> f32 {
        self.energy
    }

    pub fn max_energy(&self) -> f32 {
        self.max_energy
    }

    pub fn distance_traveled(&self) -> f32 {
        self.distance_traveled
    }

    pub fn runner_index(&self) -> u32 {
        self.runner_index
    }

    pub fn runner_count(&self) -> u32 {
        self.runner_count
    }

    /// 1-based number of the runner currently on the track
    pub fn active_runner(&self) -> u32 {
        (self.runner_index + 1).min(self.runner_count)
    }

    /// Stopped with every runner's leg completed
    pub fn is_finished(&self) -> bool {
        self.stage == RaceStage::Stop && self.runner_index == self.runner_count
    }

    /// Stopped by exhaustion
    pub fn is_depleted(&self) -> bool {
        self.depleted
    }

    pub fn is_stopped(&self) -> bool {
        self.stage == RaceStage::Stop
    }

    pub fn snapshot(&self) -> TeamSnapshot {
        TeamSnapshot::from(self)
    }
}

/// Compact team state for display and serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSnapshot {
    pub stage: RaceStage,
    pub direction: Direction,
    pub speed: f32,
    pub energy: f32,
    pub distance_traveled: f32,
    pub runner_index: u32,
    pub runner_count: u32,
    pub active_runner: u32,
    pub depleted: bool,
}

impl From<&RaceSimulation> for TeamSnapshot {
    fn from(sim: &RaceSimulation) -> Self {
        Self {
            stage: sim.stage,
            direction: sim.direction,
            speed: sim.speed,
            energy: sim.energy,
            distance_traveled: sim.distance_traveled,
            runner_index: sim.runner_index,
            runner_count: sim.runner_count,
            active_runner: sim.active_runner(),
            depleted: sim.depleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_server::config::ValueRange;

    fn tuning(max_energy: f32, energy_burn: f32, runner_count: u32) -> TeamTuning {
        TeamTuning {
            initial_speed: ValueRange::new(2.0, 2.0),
            acceleration_increment: ValueRange::new(0.5, 0.5),
            max_speed: 10.0,
            max_energy,
            energy_burn,
            runner_count,
        }
    }

    fn sim(max_energy: f32) -> RaceSimulation {
        RaceSimulation::new(&tuning(max_energy, 8.0, 4), 2.0, 0.5)
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_new_team_waits_without_moving() {
        let mut team = sim(10.0);
        assert_eq!(team.stage(), RaceStage::Wait);
        let step = team.advance(1.0);
        assert!(!step.is_moving());
        assert_eq!(team.energy(), 10.0);
        assert_eq!(team.distance_traveled(), 0.0);
    }

    #[test]
    fn test_redundant_request_is_ignored() {
        for stage in RaceStage::ALL {
            if stage == RaceStage::Uninitialized {
                continue;
            }
            let mut team = sim(10.0);
            team.request_stage(stage);
            team.drain_signals();
            assert!(!team.request_stage(stage));
            assert_eq!(team.stage(), stage);
            assert!(team.drain_signals().is_empty());
        }
    }

    #[test]
    fn test_uninitialized_is_never_adopted() {
        let mut team = sim(10.0);
        team.request_stage(RaceStage::Accelerate);
        assert!(!team.request_stage(RaceStage::Uninitialized));
        assert_eq!(team.stage(), RaceStage::Accelerate);
    }

    #[test]
    fn test_boundary_without_rule_keeps_stage() {
        let mut team = sim(10.0);
        team.start();
        let rules = BoundaryLookup::default().with(
            Direction::Reverse,
            BoundaryEventKind::Enter,
            RaceStage::ReverseDirection,
        );
        assert!(!team.handle_boundary(BoundaryEventKind::Enter, &rules));
        assert_eq!(team.stage(), RaceStage::Start);
    }

    #[test]
    fn test_boundary_records_cause() {
        let mut team = sim(10.0);
        team.start();
        team.drain_signals();
        let rules = BoundaryLookup::default().with(
            Direction::Forward,
            BoundaryEventKind::Exit,
            RaceStage::Accelerate,
        );
        assert!(team.handle_boundary(BoundaryEventKind::Exit, &rules));
        assert_eq!(
            team.drain_signals(),
            vec![TeamSignal::StageChanged {
                from: RaceStage::Start,
                to: RaceStage::Accelerate,
                cause: StageCause::Boundary(BoundaryEventKind::Exit),
            }]
        );
    }

    #[test]
    fn test_accelerate_clamps_at_max_speed() {
        let mut team = sim(1.0e6);
        team.request_stage(RaceStage::Accelerate);
        for _ in 0..40 {
            team.advance(0.01);
            assert!(team.speed() <= 10.0);
        }
        assert_eq!(team.speed(), 10.0);
    }

    #[test]
    fn test_decelerate_floors_at_initial_speed() {
        let mut team = sim(1.0e6);
        team.request_stage(RaceStage::Steady);
        team.advance(0.01);
        team.request_stage(RaceStage::Decelerate);
        for _ in 0..40 {
            team.advance(0.01);
            assert!(team.speed() >= 2.0);
        }
        assert_eq!(team.speed(), 2.0);
    }

    #[test]
    fn test_reverse_velocity_is_negative() {
        let mut team = sim(1.0e6).with_direction(Direction::Reverse);
        team.start();
        let step = team.advance(0.5);
        assert!(close(step.velocity, -2.0));
        assert!(close(step.displacement, -1.0));
    }

    #[test]
    fn test_scenario_speed_profile_and_constant_burn() {
        let mut team = sim(1000.0);
        team.start();

        let step = team.advance(1.0);
        assert!(close(step.velocity, 2.0));
        assert!(close(team.energy(), 992.0));

        team.request_stage(RaceStage::Accelerate);
        let mut expected = 2.0;
        for _ in 0..20 {
            let before = team.energy();
            team.advance(1.0);
            expected = f32::min(expected + 0.5, 10.0);
            assert!(close(team.speed(), expected));
            assert!(close(before - team.energy(), 8.0));
        }
        assert_eq!(team.speed(), 10.0);

        team.request_stage(RaceStage::Steady);
        for _ in 0..3 {
            team.advance(1.0);
            assert_eq!(team.speed(), 10.0);
        }

        team.request_stage(RaceStage::Decelerate);
        let mut expected = 10.0;
        for _ in 0..20 {
            let before = team.energy();
            team.advance(1.0);
            expected = f32::max(expected - 0.5, 2.0);
            assert!(close(team.speed(), expected));
            assert!(close(before - team.energy(), 8.0));
        }

        team.request_stage(RaceStage::ReverseDirection);
        let step = team.advance(1.0);
        assert!(!step.is_moving());
        assert_eq!(team.direction(), Direction::Reverse);
        assert_eq!(team.runner_index(), 1);
        assert_eq!(team.stage(), RaceStage::Start);
        assert_eq!(team.energy(), 1000.0);
        assert_eq!(team.distance_traveled(), 0.0);
    }

    #[test]
    fn test_scenario_ten_energy_exhausts_on_second_moving_tick() {
        let mut team = sim(10.0);
        team.start();
        let first = team.advance(1.0);
        assert!(!first.fatally_stopped);
        assert!(close(team.energy(), 2.0));

        team.request_stage(RaceStage::Accelerate);
        let second = team.advance(1.0);
        assert!(second.fatally_stopped);
        assert_eq!(second.velocity, 0.0);
        assert_eq!(second.displacement, 0.0);
        assert_eq!(team.stage(), RaceStage::Stop);
        assert_eq!(team.speed(), 0.0);
        assert_eq!(team.energy(), 0.0);
        assert!(team.is_depleted());
        assert!(!team.is_finished());
    }

    #[test]
    fn test_exhaustion_signals_are_distinguished() {
        let mut team = sim(10.0);
        team.start();
        team.energy = 0.01;
        team.drain_signals();
        team.advance(1.0);
        let signals = team.drain_signals();
        assert!(signals.contains(&TeamSignal::EnergyDepleted));
        assert!(signals.contains(&TeamSignal::StageChanged {
            from: RaceStage::Start,
            to: RaceStage::Stop,
            cause: StageCause::EnergyDepleted,
        }));
        assert!(!signals.contains(&TeamSignal::Finished));
    }

    #[test]
    fn test_hand_off_sequence_for_four_runners() {
        let mut team = sim(10.0);
        let expected_stage = [
            RaceStage::Start,
            RaceStage::Start,
            RaceStage::Start,
            RaceStage::Stop,
        ];
        for (i, expected) in expected_stage.iter().enumerate() {
            assert!(team.request_stage(RaceStage::ReverseDirection));
            team.advance(0.1);
            assert_eq!(team.runner_index(), i as u32 + 1);
            assert_eq!(team.stage(), *expected);
        }
        assert!(team.is_finished());
        assert!(team.drain_signals().contains(&TeamSignal::Finished));
    }

    #[test]
    fn test_hand_off_runs_once_per_entry() {
        let mut team = sim(10.0);
        team.request_stage(RaceStage::ReverseDirection);
        team.advance(0.1);
        team.advance(0.1);
        team.advance(0.1);
        assert_eq!(team.runner_index(), 1);
    }

    #[test]
    fn test_hand_off_toggles_direction() {
        let mut team = sim(10.0);
        team.request_stage(RaceStage::ReverseDirection);
        team.advance(0.1);
        assert_eq!(team.direction(), Direction::Reverse);
        team.request_stage(RaceStage::ReverseDirection);
        team.advance(0.1);
        assert_eq!(team.direction(), Direction::Forward);
    }

    #[test]
    fn test_hand_off_after_last_runner_does_not_increment() {
        let mut team = RaceSimulation::new(&tuning(10.0, 8.0, 2), 2.0, 0.5);
        for _ in 0..2 {
            team.request_stage(RaceStage::ReverseDirection);
            team.advance(0.1);
        }
        assert!(team.is_finished());
        team.request_stage(RaceStage::ReverseDirection);
        team.advance(0.1);
        assert_eq!(team.runner_index(), 2);
        assert_eq!(team.stage(), RaceStage::Stop);
    }

    #[test]
    fn test_stop_signals_timer_on_entry() {
        let mut team = sim(10.0);
        team.request_stage(RaceStage::Stop);
        team.advance(0.1);
        team.advance(0.1);
        let timer_stops = team
            .drain_signals()
            .into_iter()
            .filter(|s| *s == TeamSignal::TimerStopped)
            .count();
        assert_eq!(timer_stops, 1);
    }

    #[test]
    fn test_final_hand_off_stops_timer_in_same_tick() {
        let mut team = RaceSimulation::new(&tuning(10.0, 8.0, 2), 2.0, 0.5);
        team.request_stage(RaceStage::ReverseDirection);
        team.advance(0.1);
        team.request_stage(RaceStage::ReverseDirection);
        team.drain_signals();
        team.advance(0.1);
        let signals = team.drain_signals();
        assert!(signals.contains(&TeamSignal::Finished));
        assert_eq!(
            signals
                .iter()
                .filter(|s| **s == TeamSignal::TimerStopped)
                .count(),
            1
        );
    }

    #[test]
    fn test_exhaustion_stops_timer_in_same_tick() {
        let mut team = sim(10.0);
        team.start();
        team.energy = 0.01;
        team.drain_signals();
        team.advance(1.0);
        assert!(team.drain_signals().contains(&TeamSignal::TimerStopped));
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut team = sim(10.0);
        team.start();
        team.advance(0.5);
        let snap = team.snapshot();
        assert_eq!(snap.stage, RaceStage::Start);
        assert_eq!(snap.active_runner, 1);
        assert!(close(snap.distance_traveled, 1.0));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn stage_strategy() -> impl Strategy<Value = RaceStage> {
            prop::sample::select(RaceStage::ALL.to_vec())
        }

        proptest! {
            /// Requesting the current stage never changes anything
            #[test]
            fn prop_redundant_request_is_noop(stage in stage_strategy(), ticks in 0usize..5) {
                let mut team = sim(1.0e6);
                team.request_stage(stage);
                for _ in 0..ticks {
                    team.advance(0.1);
                }
                let before = team.stage();
                prop_assert!(!team.request_stage(before));
                prop_assert_eq!(team.stage(), before);
            }

            /// Accelerate never exceeds the ceiling, Decelerate never drops below the floor
            #[test]
            fn prop_speed_bounds(
                increment in 0.001f32..5.0,
                accel_ticks in 0usize..100,
                decel_ticks in 0usize..100,
            ) {
                let mut team = RaceSimulation::new(&tuning(1.0e9, 1.0, 4), 2.0, increment);
                team.request_stage(RaceStage::Accelerate);
                for _ in 0..accel_ticks {
                    team.advance(0.016);
                    prop_assert!(team.speed() <= 10.0);
                    prop_assert!(team.speed() >= 2.0);
                }
                team.request_stage(RaceStage::Decelerate);
                for _ in 0..decel_ticks {
                    team.advance(0.016);
                    prop_assert!(team.speed() >= 2.0);
                    prop_assert!(team.speed() <= 10.0);
                }
            }

            /// Energy only goes down while the runner moves
            #[test]
            fn prop_energy_decreases_while_moving(
                stage in prop::sample::select(vec![
                    RaceStage::Start,
                    RaceStage::Accelerate,
                    RaceStage::Steady,
                    RaceStage::Decelerate,
                ]),
                delta in 0.001f32..0.5,
            ) {
                let mut team = sim(1000.0);
                team.request_stage(stage);
                let before = team.energy();
                let step = team.advance(delta);
                prop_assert!(step.is_moving());
                prop_assert!(team.energy() < before);
                prop_assert!(team.energy() >= 0.0);
            }

            /// Unmatched boundary events leave the stage alone
            #[test]
            fn prop_unmatched_event_preserves_stage(stage in stage_strategy()) {
                let mut team = sim(10.0);
                team.request_stage(stage);
                let before = team.stage();
                team.handle_boundary(BoundaryEventKind::None, &BoundaryLookup::default());
                team.handle_boundary(BoundaryEventKind::Enter, &BoundaryLookup::default());
                prop_assert_eq!(team.stage(), before);
                prop_assert_ne!(team.stage(), RaceStage::Uninitialized);
            }
        }
    }
}
