//! TDL text rendering.
//!
//! Layout: a `HEADER` block, one `GOAL` block per goal with each command wrapped as
//! `SPAWN <call> WITH WAIT;`, then one `COMMAND { DEFINE ... }` block for every distinct
//! command the goals use.

use crate::location::Pose;
use crate::tdl::{Command, MoveTarget, TdlDocument};
use std::fmt::Write;

/// Renders `document` as TDL source text.
pub fn render_tdl(document: &TdlDocument) -> String {
    let mut out = String::new();
    let header = &document.header;
    out.push_str("HEADER {\n");
    let _ = writeln!(out, "    Source Requirement: \"{}\"", escape(&header.source_requirement));
    let _ = writeln!(out, "    Manufacturer: {}", header.manufacturer);
    let _ = writeln!(out, "    Model: {}", header.model);
    out.push_str("}\n");

    for goal in &document.goals {
        out.push('\n');
        let _ = writeln!(out, "GOAL {}() {{", goal.kind.block_name());
        let _ = writeln!(out, "    // {}", goal.description);
        for command in &goal.commands {
            let _ = write!(out, "    SPAWN {} WITH WAIT;", call(command));
            if let Some(stage) = command.stage() {
                let _ = write!(out, " // {stage}");
            }
            out.push('\n');
        }
        out.push_str("}\n");
    }

    let mut defined: Vec<&'static str> = Vec::new();
    for command in document.goals.iter().flat_map(|g| &g.commands) {
        let name = command.name();
        if defined.contains(&name) {
            continue;
        }
        defined.push(name);
        let (signature, body) = definition(command);
        out.push('\n');
        out.push_str("COMMAND {\n");
        let _ = writeln!(out, "    DEFINE {name}{signature} {{");
        let _ = writeln!(out, "        {body}");
        out.push_str("    }\n}\n");
    }
    out
}

/// The call expression for one command, e.g. `MoveLinear(PosX(...), 250, 500, "gripper", 0)`.
pub fn call(command: &Command) -> String {
    match command {
        Command::SetJointVelocity { velocity } => format!("SetJointVelocity({velocity})"),
        Command::SetTool { tool } => format!("SetTool(\"{}\")", escape(tool)),
        Command::MoveLinear {
            target,
            velocity,
            acceleration,
            tool,
            blend,
            ..
        } => format!(
            "MoveLinear({}, {velocity}, {acceleration}, \"{}\", {blend})",
            target_literal(target),
            escape(tool)
        ),
        Command::Grasp { width, .. } => format!("GraspObject({width})"),
        Command::Release { width, .. } => format!("ReleaseObject({width})"),
        Command::Wait { seconds } => format!("Wait({seconds})"),
        Command::ReleaseCompliance => "ReleaseCompliance()".to_string(),
    }
}

pub fn pose_literal(pose: &Pose) -> String {
    let [x, y, z, rx, ry, rz] = pose.to_array();
    format!("PosX({x}, {y}, {z}, {rx}, {ry}, {rz})")
}

fn target_literal(target: &MoveTarget) -> String {
    match target {
        MoveTarget::Pose(pose) => pose_literal(pose),
        MoveTarget::Location(name) => format!("Location(\"{}\")", escape(name)),
    }
}

fn definition(command: &Command) -> (&'static str, &'static str) {
    match command {
        Command::SetJointVelocity { .. } => (
            "(velocity)",
            "motion.configure_joint_velocity(velocity);",
        ),
        Command::SetTool { .. } => ("(tool_name)", "tooling.activate(tool_name);"),
        Command::MoveLinear { .. } => (
            "(pose, velocity, acceleration, tool, blend)",
            "motion.execute(type=\"Linear\", pose=pose, vel=velocity, acc=acceleration, tool=tool, blend=blend);",
        ),
        Command::Grasp { .. } => ("(width)", "end_effector.grasp(width=width);"),
        Command::Release { .. } => ("(width)", "end_effector.release(width=width);"),
        Command::Wait { .. } => ("(seconds)", "timer.wait(seconds);"),
        Command::ReleaseCompliance => ("()", "compliance.release();"),
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
