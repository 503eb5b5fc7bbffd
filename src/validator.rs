//! Structural and semantic checks over a [`TdlDocument`].
//!
//! Validation never fails and never stops early: every problem becomes a [`Finding`] and
//! all of them are collected. Findings are ordered as the document is traversed:
//! document-level findings first, then Initialize, Execute and Finalize, commands in
//! sequence within each block.
//!
//! [`verify`] is a coarser second opinion over the rendered text, and
//! [`confirmation_summary`] is what an operator is shown before the task runs.

use crate::render::render_tdl;
use crate::tdl::{Command, GoalBlock, GoalKind, MoveTarget, TdlDocument};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

static GOAL_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^GOAL\s+([A-Za-z0-9_]+)\(\)\s*\{").unwrap());
static COMMAND_DEFINITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"COMMAND\s*\{\s*DEFINE\s+([A-Za-z0-9_]+)\(").unwrap());

const CONSISTENT: &str = "TDL commands pass logical consistency checks.";
const CONFIRM_PROMPT: &str = "로봇이 위와 같이 동작하는 것이 맞습니까? (예/아니오)";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// One validation result.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    /// The block the finding refers to, `None` for document-level findings.
    pub block: Option<GoalKind>,
    /// Index of the offending command within `block`.
    pub command: Option<usize>,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        match (self.block, self.command) {
            (Some(block), Some(idx)) => write!(f, " [{block}#{idx}]")?,
            (Some(block), None) => write!(f, " [{block}]")?,
            _ => {}
        }
        write!(f, ": {}", self.message)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    /// True when there are no error findings.
    pub fn passed(&self) -> bool {
        !self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }
}

/// Runs both validation passes over `document`.
pub fn validate(document: &TdlDocument) -> ValidationReport {
    let mut v = Collector::default();

    if document.header.manufacturer.trim().is_empty() {
        v.doc(Severity::Warning, "header has no manufacturer");
    }
    if document.header.model.trim().is_empty() {
        v.doc(Severity::Warning, "header has no model");
    }

    let present: Vec<GoalKind> = document.goals.iter().map(|g| g.kind).collect();
    let mut canonical = present.clone();
    canonical.sort();
    canonical.dedup();
    if present.len() == canonical.len() && present != canonical {
        v.doc(
            Severity::Error,
            "goal blocks are out of order; expected Initialize, Execute, Finalize",
        );
    }

    let actions_recognized = !document.header.recognized_actions.is_empty();
    for kind in GoalKind::ORDER {
        let mut blocks = document.goals.iter().filter(|g| g.kind == kind);
        let Some(block) = blocks.next() else {
            v.block(kind, Severity::Error, "goal block is missing");
            continue;
        };
        if blocks.next().is_some() {
            v.block(kind, Severity::Error, "goal block appears more than once");
        }
        if kind == GoalKind::Execute && block.commands.is_empty() {
            if actions_recognized {
                v.block(
                    kind,
                    Severity::Error,
                    "execute block is empty although actions were recognized",
                );
            } else {
                v.block(
                    kind,
                    Severity::Warning,
                    "execute block is empty; no actions were recognized",
                );
            }
        }
        check_block(&mut v, block);
    }

    v.report
}

fn check_block(v: &mut Collector, block: &GoalBlock) {
    for (idx, command) in block.commands.iter().enumerate() {
        let mut err = |message: String| v.command(block.kind, idx, Severity::Error, message);
        match command {
            Command::SetJointVelocity { velocity } => {
                if !velocity.is_finite() || *velocity <= 0.0 {
                    err(format!("joint velocity must be positive, got {velocity}"));
                }
            }
            Command::SetTool { tool } => {
                if tool.trim().is_empty() {
                    err("tool id is empty".to_string());
                }
            }
            Command::MoveLinear {
                target,
                velocity,
                acceleration,
                tool,
                blend,
                gripper_width,
                ..
            } => {
                match target {
                    MoveTarget::Pose(pose) => {
                        if !pose.is_finite() {
                            err(format!("pose has non-finite coordinates: {:?}", pose.to_array()));
                        }
                    }
                    MoveTarget::Location(name) => {
                        err(format!("move target '{name}' is an unresolved location"));
                    }
                }
                if tool.trim().is_empty() {
                    err("tool id is empty".to_string());
                }
                if !velocity.is_finite() || *velocity <= 0.0 {
                    err(format!("velocity must be positive, got {velocity}"));
                }
                if !acceleration.is_finite() || *acceleration <= 0.0 {
                    err(format!("acceleration must be positive, got {acceleration}"));
                }
                if !blend.is_finite() || *blend < 0.0 {
                    err(format!("blend radius must be non-negative, got {blend}"));
                }
                if let Some(width) = gripper_width
                    && (!width.is_finite() || *width < 0.0)
                {
                    err(format!("gripper width must be non-negative, got {width}"));
                }
            }
            Command::Grasp { width, .. } | Command::Release { width, .. } => {
                if !width.is_finite() || *width < 0.0 {
                    err(format!("gripper width must be non-negative, got {width}"));
                }
            }
            Command::Wait { seconds } => {
                if !seconds.is_finite() || *seconds < 0.0 {
                    err(format!("wait duration must be non-negative, got {seconds}"));
                }
            }
            Command::ReleaseCompliance => {}
        }
    }
}

#[derive(Default)]
struct Collector {
    report: ValidationReport,
}

impl Collector {
    fn push(
        &mut self,
        severity: Severity,
        block: Option<GoalKind>,
        command: Option<usize>,
        message: String,
    ) {
        self.report.findings.push(Finding {
            severity,
            block,
            command,
            message,
        });
    }

    fn doc(&mut self, severity: Severity, message: &str) {
        self.push(severity, None, None, message.to_string());
    }

    fn block(&mut self, kind: GoalKind, severity: Severity, message: &str) {
        self.push(severity, Some(kind), None, message.to_string());
    }

    fn command(&mut self, kind: GoalKind, idx: usize, severity: Severity, message: String) {
        self.push(severity, Some(kind), Some(idx), message);
    }
}

/// Outcome of [`verify`]: three independent verdicts plus their explanations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// The rendered text has a goal header and a command definition.
    pub syntax_ok: bool,
    /// At least three goals are rendered and at least one command is defined.
    pub schema_ok: bool,
    /// Every goal has commands and the Execute goal moves the arm.
    pub logical_ok: bool,
    pub details: Vec<String>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.syntax_ok && self.schema_ok && self.logical_ok
    }
}

/// Verifies the rendered form of `document`.
///
/// Unlike [`validate`] this looks at the TDL text a downstream engine would receive, so it
/// also catches a renderer that drops blocks or definitions.
pub fn verify(document: &TdlDocument) -> VerificationReport {
    let text = render_tdl(document);
    let goals = GOAL_HEADER.captures_iter(&text).count();
    let definitions = COMMAND_DEFINITION.captures_iter(&text).count();

    let mut details = Vec::new();
    for goal in &document.goals {
        if goal.commands.is_empty() {
            details.push(format!("Goal {} has no commands", goal.kind.block_name()));
        }
        if goal.kind == GoalKind::Execute && !goal.commands.iter().any(Command::is_motion) {
            details.push(format!(
                "Execute goal {} does not contain any movement commands",
                goal.kind.block_name()
            ));
        }
    }
    let logical_ok = details.is_empty();
    if logical_ok {
        details.push(CONSISTENT.to_string());
    }

    VerificationReport {
        syntax_ok: goals > 0 && definitions > 0,
        schema_ok: goals >= GoalKind::ORDER.len() && definitions > 0,
        logical_ok,
        details,
    }
}

/// A human-readable task breakdown to confirm before execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfirmationSummary {
    pub summary: String,
    pub confirm_prompt: String,
    pub issues: Vec<String>,
}

pub fn confirmation_summary(document: &TdlDocument) -> ConfirmationSummary {
    let steps: Vec<String> = document
        .goals
        .iter()
        .map(|g| g.kind.block_name().replace('_', " "))
        .collect();
    let mut issues = Vec::new();
    if document.goal(GoalKind::Execute).is_none() {
        issues.push("No Execute goal found; confirm task breakdown.".to_string());
    }
    ConfirmationSummary {
        summary: format!(
            "The generated TDL decomposes the task into the following high-level steps: {}. \
             Please confirm that the robot should act this way.",
            steps.join(", ")
        ),
        confirm_prompt: CONFIRM_PROMPT.to_string(),
        issues,
    }
}
