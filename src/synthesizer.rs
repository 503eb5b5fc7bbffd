//! Synthesizer that converts a [`Requirement`] into a [`TdlDocument`].
//!
//! The entry point is [`TdlSynthesizer`]. Configure it with a [`SynthesisConfig`], then
//! call [`TdlSynthesizer::synthesize`] with a requirement, a [`LocationMap`] and optional
//! [`HeaderOverrides`].

use crate::location::{LocationMap, Pose};
use crate::requirement::{Action, Requirement};
use crate::tdl::{
    Command, GoalBlock, GoalKind, MotionProfile, MoveTarget, Stage, TdlDocument, TdlHeader,
};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Configuration for document synthesis.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Height above a location's base z used for approach, lift, transit and retract (mm).
    pub safety_height: f32,
    /// Height above a location's base z at which the object is grasped or released (mm).
    pub grasp_height: f32,
    /// Profile for free-space moves.
    pub travel: MotionProfile,
    /// Profile for the final approach to a grasp or release height.
    pub precision: MotionProfile,
    /// Gripper opening while approaching and after release (mm).
    pub gripper_open_width: f32,
    /// Gripper opening for the final approach to the object (mm).
    pub gripper_full_width: f32,
    /// Closing width for the grasp (mm).
    pub grasp_width: f32,
    /// End effector id.
    pub tool: String,
    /// Joint velocity limit set during initialization (percent).
    pub joint_velocity: f32,
    /// Duration of each `wait` action (seconds).
    pub wait_seconds: f32,
    /// Add a move to the `home` location in the Finalize block when the map has one.
    pub return_home: bool,
    /// Header used when the caller does not override it.
    pub default_manufacturer: String,
    pub default_model: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            safety_height: 100.0,
            grasp_height: 10.0,
            travel: MotionProfile {
                velocity: 250.0,
                acceleration: 500.0,
            },
            precision: MotionProfile {
                velocity: 50.0,
                acceleration: 100.0,
            },
            gripper_open_width: 60.0,
            gripper_full_width: 85.0,
            grasp_width: 20.0,
            tool: "gripper".to_string(),
            joint_velocity: 30.0,
            wait_seconds: 1.0,
            return_home: true,
            default_manufacturer: "doosan".to_string(),
            default_model: "h2017".to_string(),
        }
    }
}

/// Per-call header values that take precedence over the configured defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeaderOverrides {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
}

/// Which location slot of a requirement a name came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocationSlot {
    Source,
    Target,
}

impl fmt::Display for LocationSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationSlot::Source => f.write_str("source"),
            LocationSlot::Target => f.write_str("target"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SynthesisError {
    #[error("{slot} location '{name}' is not in the location map")]
    UnresolvedLocation { slot: LocationSlot, name: String },
}

/// Builds TDL documents from requirements.
#[derive(Clone, Debug, Default)]
pub struct TdlSynthesizer {
    config: SynthesisConfig,
}

impl TdlSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Synthesizes the full three-block document for `requirement`.
    ///
    /// # Motion
    ///
    /// When the requirement contains both pick and place (move may be explicit or implied)
    /// and both its source and target resolve, the Execute block holds the eight-stage
    /// pick-and-place sequence:
    ///
    /// 1. approach-source: `S + safety_height`, travel profile, gripper open.
    /// 2. move-to-grasp: `S + grasp_height`, precision profile, gripper fully open.
    /// 3. grasp.
    /// 4. lift: `S + safety_height`, travel profile.
    /// 5. move-to-target: `T + safety_height`, travel profile.
    /// 6. lower: `T + grasp_height`, precision profile.
    /// 7. release.
    /// 8. retract: `T + safety_height`, travel profile.
    ///
    /// Otherwise a single travel move to whichever pose resolves (target first, then source),
    /// raised by `safety_height`, is emitted. If nothing resolves, no motion is emitted.
    ///
    /// # Errors
    ///
    /// [`SynthesisError::UnresolvedLocation`] if the requirement names a location missing
    /// from `locations` while it contains a motion action. No default pose is substituted.
    pub fn synthesize(
        &self,
        requirement: &Requirement,
        locations: &LocationMap,
        overrides: &HeaderOverrides,
    ) -> Result<TdlDocument, SynthesisError> {
        let source = self.resolve(requirement, locations, LocationSlot::Source)?;
        let target = self.resolve(requirement, locations, LocationSlot::Target)?;

        let header = TdlHeader {
            manufacturer: overrides
                .manufacturer
                .clone()
                .unwrap_or_else(|| self.config.default_manufacturer.clone()),
            model: overrides
                .model
                .clone()
                .unwrap_or_else(|| self.config.default_model.clone()),
            source_requirement: requirement.source_text.clone(),
            recognized_actions: requirement.actions.clone(),
        };

        let mut document = TdlDocument::new(header);
        document.add_goal(self.initialize_block(requirement));
        document.add_goal(self.execute_block(requirement, source, target));
        document.add_goal(self.finalize_block(locations));
        Ok(document)
    }

    /// Resolves one location slot.
    ///
    /// An absent name yields `Ok(None)`. A name missing from the map is an error only when
    /// the requirement has a motion action that would use it.
    fn resolve(
        &self,
        requirement: &Requirement,
        locations: &LocationMap,
        slot: LocationSlot,
    ) -> Result<Option<Pose>, SynthesisError> {
        let name = match slot {
            LocationSlot::Source => requirement.source_location.as_deref(),
            LocationSlot::Target => requirement.target_location.as_deref(),
        };
        let Some(name) = name else {
            return Ok(None);
        };
        match locations.resolve(name) {
            Some(pose) => {
                debug!(%slot, name, pose = ?pose.to_array(), "resolved location");
                Ok(Some(pose))
            }
            None if requirement.has_motion() => {
                warn!(%slot, name, "location is not in the location map");
                Err(SynthesisError::UnresolvedLocation {
                    slot,
                    name: name.to_string(),
                })
            }
            None => Ok(None),
        }
    }

    fn initialize_block(&self, requirement: &Requirement) -> GoalBlock {
        let description = if requirement.objects.is_empty() {
            "Prepare robot configuration".to_string()
        } else {
            format!(
                "Prepare robot configuration for {}",
                requirement.objects.join(", ")
            )
        };
        let mut block = GoalBlock::new(GoalKind::Initialize, description);
        block.push(Command::SetJointVelocity {
            velocity: self.config.joint_velocity,
        });
        block.push(Command::SetTool {
            tool: self.config.tool.clone(),
        });
        block
    }

    fn execute_block(
        &self,
        requirement: &Requirement,
        source: Option<Pose>,
        target: Option<Pose>,
    ) -> GoalBlock {
        let mut block = GoalBlock::new(GoalKind::Execute, "Execute primary task sequence");

        let motion = if requirement.has_action(Action::Pick)
            && requirement.has_action(Action::Place)
            && let (Some(s), Some(t)) = (source, target)
        {
            self.pick_and_place(s, t)
        } else if requirement.has_motion()
            && let Some(pose) = target.or(source)
        {
            let raised = pose.raised(self.config.safety_height);
            vec![self.linear(raised, self.config.travel, None, None)]
        } else {
            Vec::new()
        };

        let waits: Vec<Command> = requirement
            .actions
            .iter()
            .filter(|a| **a == Action::Wait)
            .map(|_| Command::Wait {
                seconds: self.config.wait_seconds,
            })
            .collect();

        // A wait listed before every motion action runs first.
        let first_motion = requirement.actions.iter().position(|a| a.is_motion());
        let wait_first = requirement
            .actions
            .iter()
            .position(|a| *a == Action::Wait)
            .is_some_and(|w| first_motion.is_none_or(|m| w < m));

        if wait_first {
            block.commands.extend(waits);
            block.commands.extend(motion);
        } else {
            block.commands.extend(motion);
            block.commands.extend(waits);
        }
        debug!(commands = block.commands.len(), "execute block synthesized");
        block
    }

    fn pick_and_place(&self, source: Pose, target: Pose) -> Vec<Command> {
        let c = &self.config;
        vec![
            self.linear(
                source.raised(c.safety_height),
                c.travel,
                Some(c.gripper_open_width),
                Some(Stage::ApproachSource),
            ),
            self.linear(
                source.raised(c.grasp_height),
                c.precision,
                Some(c.gripper_full_width),
                Some(Stage::MoveToGrasp),
            ),
            Command::Grasp {
                width: c.grasp_width,
                stage: Some(Stage::Grasp),
            },
            self.linear(source.raised(c.safety_height), c.travel, None, Some(Stage::Lift)),
            self.linear(
                target.raised(c.safety_height),
                c.travel,
                None,
                Some(Stage::MoveToTarget),
            ),
            self.linear(target.raised(c.grasp_height), c.precision, None, Some(Stage::Lower)),
            Command::Release {
                width: c.gripper_open_width,
                stage: Some(Stage::Release),
            },
            self.linear(target.raised(c.safety_height), c.travel, None, Some(Stage::Retract)),
        ]
    }

    fn finalize_block(&self, locations: &LocationMap) -> GoalBlock {
        let mut block = GoalBlock::new(GoalKind::Finalize, "Return robot to safe state");
        block.push(Command::ReleaseCompliance);
        if self.config.return_home
            && let Some(home) = locations.resolve("home")
        {
            block.push(self.linear(home, self.config.travel, None, None));
        }
        block
    }

    fn linear(
        &self,
        pose: Pose,
        profile: MotionProfile,
        gripper_width: Option<f32>,
        stage: Option<Stage>,
    ) -> Command {
        Command::MoveLinear {
            target: MoveTarget::Pose(pose),
            velocity: profile.velocity,
            acceleration: profile.acceleration,
            tool: self.config.tool.clone(),
            blend: 0.0,
            gripper_width,
            stage,
        }
    }
}
