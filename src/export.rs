//! Vendor job-file rendering.
//!
//! A pure downstream step: it consumes a finished [`TdlDocument`] and produces text for a
//! robot vendor's programming environment. Nothing flows back into the pipeline.

use crate::location::Pose;
use crate::tdl::{Command, MoveTarget, TdlDocument};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Job-file dialects that can be rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vendor {
    /// Doosan Robotics DRL.
    Doosan,
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vendor::Doosan => f.write_str("doosan"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ExportError {
    #[error("unsupported vendor '{0}'")]
    UnsupportedVendor(String),
}

impl FromStr for Vendor {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "doosan" => Ok(Vendor::Doosan),
            _ => Err(ExportError::UnsupportedVendor(s.to_string())),
        }
    }
}

/// Digital output wired to the gripper on the reference cell.
const GRIPPER_OUTPUT: u8 = 1;

/// Renders `document` as a job file for `vendor`.
pub fn render_job_file(document: &TdlDocument, vendor: Vendor) -> String {
    match vendor {
        Vendor::Doosan => render_drl(document),
    }
}

fn render_drl(document: &TdlDocument) -> String {
    let header = &document.header;
    let mut lines = vec![
        format!("Title : {}_{}_auto", header.model, header.manufacturer),
        format!("# Source Requirement: {}", header.source_requirement),
        format!("# Manufacturer: {}", header.manufacturer),
        format!("# Model: {}", header.model),
        String::new(),
    ];

    for goal in &document.goals {
        lines.push(format!("# === GOAL {} ===", goal.kind.block_name()));
        lines.push(format!("# {}", goal.description));
        for command in &goal.commands {
            if let Some(stage) = command.stage() {
                lines.push(format!("# {stage}"));
            }
            lines.push(drl_line(command));
        }
        lines.push(String::new());
    }

    let mut out = lines.join("\n").trim_end().to_string();
    out.push('\n');
    out
}

fn drl_line(command: &Command) -> String {
    match command {
        Command::SetJointVelocity { velocity } => format!("set_velj({velocity})"),
        Command::SetTool { tool } => format!("set_tool(\"{tool}\")"),
        Command::MoveLinear {
            target,
            velocity,
            acceleration,
            tool,
            blend,
            ..
        } => match target {
            MoveTarget::Pose(pose) => format!(
                "movel({}, v={velocity}, a={acceleration}, radius={blend})  # tool={tool}",
                posx(pose)
            ),
            MoveTarget::Location(name) => format!("# unresolved location '{name}'; move skipped"),
        },
        Command::Grasp { width, .. } => {
            format!("set_digital_output({GRIPPER_OUTPUT}, ON)  # close gripper (width={width})")
        }
        Command::Release { width, .. } => {
            format!("set_digital_output({GRIPPER_OUTPUT}, OFF)  # open gripper (width={width})")
        }
        Command::Wait { seconds } => format!("wait({seconds})"),
        Command::ReleaseCompliance => "release_compliance_ctrl()".to_string(),
    }
}

fn posx(pose: &Pose) -> String {
    let [x, y, z, rx, ry, rz] = pose.to_array();
    format!("posx({x}, {y}, {z}, {rx}, {ry}, {rz})")
}
