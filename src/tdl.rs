use crate::location::Pose;
use crate::requirement::Action;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A complete, engine-agnostic task script.
///
/// This is what the synthesizer hands to the validator, the text renderer and the
/// vendor exporters. Goal blocks are stored as an ordered list rather than three fixed
/// fields so that a document read from elsewhere can be checked for missing or
/// misordered blocks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TdlDocument {
    pub header: TdlHeader,
    pub goals: Vec<GoalBlock>,
}

impl TdlDocument {
    pub fn new(header: TdlHeader) -> Self {
        Self {
            header,
            goals: Vec::new(),
        }
    }

    pub fn add_goal(&mut self, goal: GoalBlock) {
        self.goals.push(goal);
    }

    /// The first block of the given kind.
    pub fn goal(&self, kind: GoalKind) -> Option<&GoalBlock> {
        self.goals.iter().find(|g| g.kind == kind)
    }

    /// Commands of the Execute block, empty if the block is missing.
    pub fn execute_commands(&self) -> &[Command] {
        self.goal(GoalKind::Execute)
            .map(|g| g.commands.as_slice())
            .unwrap_or_default()
    }
}

/// Document metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TdlHeader {
    /// Target manufacturer, written verbatim.
    pub manufacturer: String,
    /// Target model, written verbatim.
    pub model: String,
    /// The instruction this document was derived from.
    pub source_requirement: String,
    /// Actions recognized in the instruction.
    #[serde(default)]
    pub recognized_actions: Vec<Action>,
}

/// The three phases of a task, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GoalKind {
    Initialize,
    Execute,
    Finalize,
}

impl GoalKind {
    pub const ORDER: [GoalKind; 3] = [GoalKind::Initialize, GoalKind::Execute, GoalKind::Finalize];

    /// Block name used in rendered TDL.
    pub fn block_name(self) -> &'static str {
        match self {
            GoalKind::Initialize => "Initialize_Process",
            GoalKind::Execute => "Execute_Process",
            GoalKind::Finalize => "Finalize_Process",
        }
    }
}

impl fmt::Display for GoalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.block_name())
    }
}

/// One named phase and its ordered commands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalBlock {
    pub kind: GoalKind,
    pub description: String,
    pub commands: Vec<Command>,
}

impl GoalBlock {
    pub fn new(kind: GoalKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }
}

/// Where a motion goes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveTarget {
    /// A concrete pose.
    Pose(Pose),
    /// A symbolic location that has not been resolved. Never produced by the synthesizer.
    Location(String),
}

impl MoveTarget {
    pub fn pose(&self) -> Option<&Pose> {
        match self {
            MoveTarget::Pose(p) => Some(p),
            MoveTarget::Location(_) => None,
        }
    }
}

/// Which step of the pick-and-place sequence a command performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ApproachSource,
    MoveToGrasp,
    Grasp,
    Lift,
    MoveToTarget,
    Lower,
    Release,
    Retract,
}

impl Stage {
    /// The canonical order of the eight stages.
    pub const SEQUENCE: [Stage; 8] = [
        Stage::ApproachSource,
        Stage::MoveToGrasp,
        Stage::Grasp,
        Stage::Lift,
        Stage::MoveToTarget,
        Stage::Lower,
        Stage::Release,
        Stage::Retract,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Stage::ApproachSource => "approach-source",
            Stage::MoveToGrasp => "move-to-grasp",
            Stage::Grasp => "grasp",
            Stage::Lift => "lift",
            Stage::MoveToTarget => "move-to-target",
            Stage::Lower => "lower",
            Stage::Release => "release",
            Stage::Retract => "retract",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A velocity/acceleration pair for linear motion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    /// Linear velocity in mm/s.
    pub velocity: f32,
    /// Linear acceleration in mm/s².
    pub acceleration: f32,
}

/// The fixed TDL command vocabulary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Joint velocity limit in percent of maximum.
    SetJointVelocity { velocity: f32 },
    /// Activates a tool (end effector) by id.
    SetTool { tool: String },
    /// Straight-line move of the tool center point.
    MoveLinear {
        target: MoveTarget,
        velocity: f32,
        acceleration: f32,
        tool: String,
        /// Blend radius in mm; 0 stops exactly at the target.
        blend: f32,
        /// Gripper opening (mm) commanded for the duration of the move.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gripper_width: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stage: Option<Stage>,
    },
    /// Closes the gripper to `width` mm.
    Grasp {
        width: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stage: Option<Stage>,
    },
    /// Opens the gripper to `width` mm.
    Release {
        width: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stage: Option<Stage>,
    },
    /// Dwell for `seconds`.
    Wait { seconds: f32 },
    /// Leaves force/compliance control.
    ReleaseCompliance,
}

impl Command {
    /// The name of the command in TDL text.
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetJointVelocity { .. } => "SetJointVelocity",
            Command::SetTool { .. } => "SetTool",
            Command::MoveLinear { .. } => "MoveLinear",
            Command::Grasp { .. } => "GraspObject",
            Command::Release { .. } => "ReleaseObject",
            Command::Wait { .. } => "Wait",
            Command::ReleaseCompliance => "ReleaseCompliance",
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Command::MoveLinear { stage, .. }
            | Command::Grasp { stage, .. }
            | Command::Release { stage, .. } => *stage,
            _ => None,
        }
    }

    /// The resolved pose of a move, if this is one.
    pub fn pose(&self) -> Option<&Pose> {
        match self {
            Command::MoveLinear { target, .. } => target.pose(),
            _ => None,
        }
    }

    pub fn is_motion(&self) -> bool {
        matches!(self, Command::MoveLinear { .. })
    }
}
