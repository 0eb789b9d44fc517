use crate::arena::Arena;
use crate::checkpoint::{CheckpointRegistry, PassOutcome};
use crate::error::{EpisodeRule, ScenarioError};
use crate::events::{ContactKind, EventQueue};
use crate::geometry::Pose;
use crate::reward::{shape, RewardEvent, RewardLedger, TickReward};
use crate::rules::{EpisodeRules, GroupAdvance};
use crate::scenario::Scenario;
use crate::schedule::{DelayQueue, EpisodeId};
use crate::sensing::Observation;
use crate::target::{ContactOutcome, TargetId, TargetTracker};
use crate::waypoint::WaypointSequencer;

use super::{
    ActionPair, EpisodeSnapshot, EpisodeSummary, RemovalTicket, StepOutcome, TerminalCause,
};

#[derive(Clone, Debug)]
pub(super) struct Episode {
    scenario: Scenario,
    rules: EpisodeRules,
    id: EpisodeId,
    tick: u32,
    pose: Pose,
    arena: Arena,
    checkpoints: CheckpointRegistry,
    waypoints: WaypointSequencer,
    targets: TargetTracker,
    contacts: EventQueue,
    removals: DelayQueue<TargetId>,
    ledger: RewardLedger,
    done: bool,
    truncated: bool,
    cause: Option<TerminalCause>,
}

impl Episode {
    pub(super) fn new(scenario: Scenario) -> Result<Self, ScenarioError> {
        scenario.validate()?;
        let rules = scenario.rules;

        Ok(Self {
            rules,
            id: EpisodeId::default(),
            tick: 0,
            pose: scenario.start,
            arena: Arena::new(scenario.walls.clone(), scenario.hazards.clone()),
            checkpoints: CheckpointRegistry::new(
                &scenario.checkpoints,
                scenario.checkpoint_radius,
                rules.group_size,
            ),
            waypoints: WaypointSequencer::new(
                scenario.main_path.clone(),
                scenario.branch_path.clone(),
                rules.arrival_radius,
            ),
            targets: TargetTracker::new(
                &scenario.targets,
                scenario.target_radius,
                rules.contact_policy,
            ),
            contacts: EventQueue::default(),
            removals: DelayQueue::new(),
            ledger: RewardLedger::default(),
            done: false,
            truncated: false,
            cause: None,
            scenario,
        })
    }

    /// Starts a fresh episode. Removals still queued by the previous one stay
    /// queued and are dropped when they come due.
    pub(super) fn reset(&mut self) {
        self.id = self.id.next();
        self.tick = 0;
        self.pose = self.scenario.start;
        self.arena.reset();
        self.checkpoints.reset();
        self.waypoints.reset();
        self.targets.reset();
        self.contacts.clear();
        self.ledger = RewardLedger::default();
        self.done = false;
        self.truncated = false;
        self.cause = None;
    }

    pub(super) fn step(&mut self, action: ActionPair) -> StepOutcome {
        if self.done {
            return StepOutcome {
                observation: self.observe(),
                reward: 0.0,
                reward_milli: 0,
                done: true,
                truncated: self.truncated,
                cause: self.cause,
                events: Vec::new(),
            };
        }

        self.tick += 1;

        let blocked = self
            .arena
            .integrate(&mut self.pose, action.forward, action.turn);
        self.arena.sense(
            self.pose.position,
            blocked,
            &self.checkpoints,
            &self.targets,
            &mut self.contacts,
        );

        for target in self.removals.drain_due(self.id, self.tick) {
            self.targets.finalize_removal(target);
        }

        let mut events = Vec::new();
        while let Some(contact) = self.contacts.pop() {
            self.apply_contact(contact, &mut events);
        }
        if let Some(index) = self.waypoints.update(self.pose.position) {
            events.push(RewardEvent::WaypointReached { index });
        }
        events.push(RewardEvent::Step);

        let mut tick_reward = TickReward::default();
        for event in &events {
            let delta = shape(event, &self.rules.reward);
            tick_reward.add(delta);
            self.ledger.record(event, delta);
            if delta.terminal && self.cause.is_none() {
                self.cause = terminal_cause(event);
            }
        }

        if tick_reward.is_terminal() {
            self.done = true;
        } else if self.tick >= self.rules.max_ticks {
            self.done = true;
            self.truncated = true;
            self.cause = Some(TerminalCause::TimeLimit);
        }

        StepOutcome {
            observation: self.observe(),
            reward: tick_reward.value(),
            reward_milli: tick_reward.milli(),
            done: self.done,
            truncated: self.truncated,
            cause: self.cause,
            events,
        }
    }

    fn apply_contact(&mut self, contact: ContactKind, events: &mut Vec<RewardEvent>) {
        match contact {
            ContactKind::Checkpoint(index) => match self.checkpoints.pass(index) {
                PassOutcome::Accepted { .. } => {
                    events.push(RewardEvent::CheckpointPassed { index });
                }
                PassOutcome::AlreadyPassed | PassOutcome::NotOpen => {
                    events.push(RewardEvent::CheckpointRejected { index });
                }
                PassOutcome::OutOfRange => {}
            },
            ContactKind::Target(id) => {
                if let ContactOutcome::Eliminated {
                    target,
                    in_order,
                    exhausted,
                } = self.targets.on_contact(id)
                {
                    events.push(RewardEvent::TargetEliminated { target, in_order });
                    self.schedule_removal(target);
                    if self.rules.group_advance == GroupAdvance::Elimination {
                        self.checkpoints.force_advance();
                    }
                    if exhausted {
                        events.push(RewardEvent::TargetsCleared);
                    }
                }
            }
            ContactKind::Wall(_) => events.push(RewardEvent::WallContact),
            ContactKind::Hazard(_) => events.push(RewardEvent::HazardContact),
        }
    }

    fn schedule_removal(&mut self, target: TargetId) {
        match self.rules.removal_delay_ticks {
            0 => {
                self.targets.finalize_removal(target);
            }
            delay => {
                self.removals
                    .schedule(self.id, self.tick.saturating_add(delay), target);
            }
        }
    }

    pub(super) fn push_contact(&mut self, contact: ContactKind) {
        self.contacts.push(contact);
    }

    pub(super) fn complete_removal(&mut self, ticket: RemovalTicket) -> bool {
        if ticket.episode != self.id {
            return false;
        }
        self.targets.finalize_removal(ticket.target)
    }

    pub(super) fn observe(&self) -> Observation {
        let position = self.pose.position;
        let yaw = self.pose.yaw_deg.to_radians();

        let nearest_checkpoint = self
            .checkpoints
            .active()
            .map(|cp| (cp.position, cp.position.distance(position)))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        let targets_remaining = if self.targets.is_empty() {
            0.0
        } else {
            self.targets.alive().count() as f32 / self.targets.len() as f32
        };

        Observation {
            position,
            heading_sin: yaw.sin(),
            heading_cos: yaw.cos(),
            ray: self
                .arena
                .cast_ray(&self.pose, &self.checkpoints, &self.targets),
            expected_target: self
                .targets
                .expected()
                .map(|t| (t.position, t.position.distance(position))),
            waypoint: self
                .waypoints
                .guidance(position)
                .map(|g| (g.direction, g.distance)),
            nearest_checkpoint,
            open_group: self.checkpoints.open_group(),
            targets_remaining,
        }
    }

    pub(super) fn snapshot(&self) -> EpisodeSnapshot {
        EpisodeSnapshot {
            episode: self.id,
            tick: self.tick,
            pose: self.pose,
            done: self.done,
            expected_target: self.targets.expected().map(|t| (t.id, t.position)),
            alive_targets: self.targets.alive().map(|t| (t.id, t.position)).collect(),
            active_checkpoints: self
                .checkpoints
                .active()
                .map(|cp| (cp.index, cp.position))
                .collect(),
            open_group: self.checkpoints.open_group(),
            waypoint: self.waypoints.guidance(self.pose.position),
            hazards: self.arena.hazards().to_vec(),
            walls: self.arena.walls().to_vec(),
            observation: self.observe(),
        }
    }

    pub(super) fn summary(&self) -> EpisodeSummary {
        EpisodeSummary {
            episode: self.id,
            ticks: self.tick,
            reward_milli: self.ledger.total_milli(),
            reward: self.ledger.total(),
            breakdown: self.ledger.breakdown(),
            checkpoints_passed: self.checkpoints.passed_count() as u32,
            targets_eliminated: self.targets.eliminated_count() as u32,
            waypoints_reached: self.waypoints.cursor() as u32,
            done: self.done,
            truncated: self.truncated,
            cause: self.cause,
        }
    }

    pub(super) fn validate(&self) -> Result<(), EpisodeRule> {
        if !self.pose.is_finite() {
            return Err(EpisodeRule::PoseNonFinite);
        }
        self.checkpoints.validate()?;
        self.waypoints.validate()?;
        self.targets.validate()?;
        if self.tick > self.rules.max_ticks {
            return Err(EpisodeRule::TickLimitExceeded);
        }
        Ok(())
    }

    pub(super) fn id(&self) -> EpisodeId {
        self.id
    }

    pub(super) fn tick(&self) -> u32 {
        self.tick
    }

    pub(super) fn is_done(&self) -> bool {
        self.done
    }

    pub(super) fn scenario(&self) -> &Scenario {
        &self.scenario
    }
}

fn terminal_cause(event: &RewardEvent) -> Option<TerminalCause> {
    match event {
        RewardEvent::HazardContact => Some(TerminalCause::Hazard),
        RewardEvent::WallContact => Some(TerminalCause::Wall),
        RewardEvent::TargetsCleared => Some(TerminalCause::TargetsCleared),
        _ => None,
    }
}
