// tests/synthesis.rs
use nl2tdl::{
    Action, Command, GoalKind, HeaderOverrides, HeuristicAnalyzer, LocationMap, LocationSlot,
    MoveTarget, Pose, Requirement, RequirementAnalyzer, Stage, SynthesisConfig, SynthesisError,
    TdlDocument, TdlSynthesizer, Vendor, render_job_file, render_tdl,
};

fn synthesize(text: &str) -> Result<TdlDocument, SynthesisError> {
    let requirement = HeuristicAnalyzer::default().analyze(text);
    TdlSynthesizer::default().synthesize(
        &requirement,
        &LocationMap::builtin(),
        &HeaderOverrides::default(),
    )
}

fn pose_of(command: &Command) -> [f32; 6] {
    command.pose().expect("command should be a resolved move").to_array()
}

#[test]
fn test_transfer_produces_eight_stage_sequence() {
    let doc = synthesize("박스를 A에서 B로 옮겨줘").unwrap();
    let exec = doc.execute_commands();

    assert_eq!(exec.len(), 8, "pick-and-place is eight commands");
    let stages: Vec<Stage> = exec.iter().filter_map(|c| c.stage()).collect();
    assert_eq!(stages, Stage::SEQUENCE.to_vec());

    // Source A is (400, -200, 100); safety 100, grasp 10.
    assert_eq!(pose_of(&exec[0]), [400.0, -200.0, 200.0, 180.0, 0.0, 180.0]);
    assert_eq!(pose_of(&exec[1]), [400.0, -200.0, 110.0, 180.0, 0.0, 180.0]);
    assert_eq!(pose_of(&exec[3]), [400.0, -200.0, 200.0, 180.0, 0.0, 180.0]);
    // Target B is (400, 200, 100).
    assert_eq!(pose_of(&exec[4]), [400.0, 200.0, 200.0, 180.0, 0.0, 180.0]);
    assert_eq!(pose_of(&exec[5]), [400.0, 200.0, 110.0, 180.0, 0.0, 180.0]);
    assert_eq!(pose_of(&exec[7]), [400.0, 200.0, 200.0, 180.0, 0.0, 180.0]);
}

#[test]
fn test_stage_profiles_and_gripper_widths() {
    let doc = synthesize("Transfer the box from A to B").unwrap();
    let exec = doc.execute_commands();

    match &exec[0] {
        Command::MoveLinear {
            velocity,
            acceleration,
            gripper_width,
            blend,
            ..
        } => {
            assert_eq!((*velocity, *acceleration), (250.0, 500.0));
            assert_eq!(*gripper_width, Some(60.0));
            assert_eq!(*blend, 0.0);
        }
        other => panic!("expected a move, got {other:?}"),
    }
    match &exec[1] {
        Command::MoveLinear {
            velocity,
            acceleration,
            gripper_width,
            ..
        } => {
            assert_eq!((*velocity, *acceleration), (50.0, 100.0));
            assert_eq!(*gripper_width, Some(85.0));
        }
        other => panic!("expected a move, got {other:?}"),
    }
    assert_eq!(
        exec[2],
        Command::Grasp {
            width: 20.0,
            stage: Some(Stage::Grasp)
        }
    );
    assert_eq!(
        exec[6],
        Command::Release {
            width: 60.0,
            stage: Some(Stage::Release)
        }
    );
}

#[test]
fn test_pick_from_home_place_at_b() {
    let doc = synthesize("Pick the box from home and place it at B").unwrap();
    let exec = doc.execute_commands();

    assert_eq!(exec.len(), 8);
    assert_eq!(pose_of(&exec[0]), [300.0, 0.0, 600.0, 180.0, 0.0, 180.0]);
}

#[test]
fn test_synthesis_is_deterministic() {
    let requirement =
        HeuristicAnalyzer::default().analyze("Wait, then transfer the box from A to B");
    let map = LocationMap::builtin();
    let overrides = HeaderOverrides {
        manufacturer: None,
        model: Some("m1013".to_string()),
    };
    let synthesizer = TdlSynthesizer::default();

    let first = synthesizer.synthesize(&requirement, &map, &overrides).unwrap();
    let second = synthesizer.synthesize(&requirement, &map, &overrides).unwrap();

    assert_eq!(first, second);
    assert_eq!(render_tdl(&first), render_tdl(&second));
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_location_resolves_the_same_within_a_run() {
    let doc = synthesize("Transfer the box from A to B").unwrap();
    let exec = doc.execute_commands();

    // approach/lift share the source pose, move-to-target/retract the target pose.
    assert_eq!(exec[0].pose(), exec[3].pose());
    assert_eq!(exec[4].pose(), exec[7].pose());

    let map = LocationMap::builtin();
    assert_eq!(map.resolve("a"), map.resolve("a"));
    assert_eq!(map.resolve("A"), map.resolve("a"));
}

#[test]
fn test_document_always_has_three_blocks_in_order() {
    for text in ["", "Move the part to B", "Transfer the box from A to B", "wait"] {
        let doc = synthesize(text).unwrap();
        let kinds: Vec<GoalKind> = doc.goals.iter().map(|g| g.kind).collect();
        assert_eq!(kinds, GoalKind::ORDER.to_vec(), "blocks for {text:?}");
    }
}

#[test]
fn test_initialize_and_finalize_blocks() {
    let doc = synthesize("Transfer the box from A to B").unwrap();

    let init = doc.goal(GoalKind::Initialize).unwrap();
    assert_eq!(init.description, "Prepare robot configuration for box");
    assert_eq!(init.commands[0], Command::SetJointVelocity { velocity: 30.0 });
    assert_eq!(
        init.commands[1],
        Command::SetTool {
            tool: "gripper".to_string()
        }
    );

    let fin = doc.goal(GoalKind::Finalize).unwrap();
    assert_eq!(fin.commands[0], Command::ReleaseCompliance);
    assert_eq!(pose_of(&fin.commands[1]), [300.0, 0.0, 500.0, 180.0, 0.0, 180.0]);
}

#[test]
fn test_no_home_return_when_disabled() {
    let config = SynthesisConfig {
        return_home: false,
        ..Default::default()
    };
    let requirement = HeuristicAnalyzer::default().analyze("Transfer the box from A to B");
    let doc = TdlSynthesizer::new(config)
        .synthesize(&requirement, &LocationMap::builtin(), &HeaderOverrides::default())
        .unwrap();

    let fin = doc.goal(GoalKind::Finalize).unwrap();
    assert_eq!(fin.commands, vec![Command::ReleaseCompliance]);
}

#[test]
fn test_single_move_goes_to_raised_target() {
    let doc = synthesize("Move the part to B").unwrap();
    let exec = doc.execute_commands();

    assert_eq!(exec.len(), 1);
    assert_eq!(exec[0].stage(), None);
    assert_eq!(pose_of(&exec[0]), [400.0, 200.0, 200.0, 180.0, 0.0, 180.0]);
}

#[test]
fn test_wait_before_motion_runs_first() {
    let doc = synthesize("Wait, then transfer the box from A to B").unwrap();
    let exec = doc.execute_commands();

    assert_eq!(exec.len(), 9);
    assert_eq!(exec[0], Command::Wait { seconds: 1.0 });
    assert_eq!(exec[1].stage(), Some(Stage::ApproachSource));
}

#[test]
fn test_wait_after_motion_runs_last() {
    let requirement = Requirement {
        source_text: "move to B and wait".to_string(),
        actions: vec![Action::Move, Action::Wait],
        target_location: Some("B".to_string()),
        ..Default::default()
    };
    let doc = TdlSynthesizer::default()
        .synthesize(&requirement, &LocationMap::builtin(), &HeaderOverrides::default())
        .unwrap();
    let exec = doc.execute_commands();

    assert_eq!(exec.len(), 2);
    assert!(exec[0].is_motion());
    assert_eq!(exec[1], Command::Wait { seconds: 1.0 });
}

#[test]
fn test_unknown_location_fails_motion() {
    let err = synthesize("Transfer the box from A to dock").unwrap_err();
    assert_eq!(
        err,
        SynthesisError::UnresolvedLocation {
            slot: LocationSlot::Target,
            name: "dock".to_string(),
        }
    );
}

#[test]
fn test_unknown_location_is_ignored_without_motion() {
    let doc = synthesize("Wait at dock").unwrap();
    assert_eq!(doc.execute_commands(), &[Command::Wait { seconds: 1.0 }]);
}

#[test]
fn test_no_motion_without_resolvable_location() {
    let doc = synthesize("Place the cup at pallet or at conveyor").unwrap();
    assert!(doc.execute_commands().is_empty());
}

#[test]
fn test_moves_never_carry_symbolic_targets() {
    let doc = synthesize("Pick the box from conveyor and place it at pallet").unwrap();
    for command in doc.goals.iter().flat_map(|g| &g.commands) {
        if let Command::MoveLinear { target, .. } = command {
            assert!(matches!(target, MoveTarget::Pose(_)), "unresolved {target:?}");
        }
    }
}

#[test]
fn test_location_overrides_and_case_insensitive_lookup() {
    let mut overrides = LocationMap::new();
    overrides.insert("Dock", Pose::new(100.0, 100.0, 0.0, 180.0, 0.0, 180.0));
    let map = LocationMap::builtin().with_overrides(&overrides);

    assert_eq!(map.resolve("DOCK"), map.resolve("dock"));
    assert_eq!(map.resolve(" Home "), LocationMap::builtin().resolve("home"));

    let requirement = HeuristicAnalyzer::default().analyze("Transfer the box from A to Dock");
    let doc = TdlSynthesizer::default()
        .synthesize(&requirement, &map, &HeaderOverrides::default())
        .unwrap();
    assert_eq!(
        pose_of(&doc.execute_commands()[4]),
        [100.0, 100.0, 100.0, 180.0, 0.0, 180.0]
    );
}

#[test]
fn test_header_defaults_and_overrides() {
    let doc = synthesize("Move the part to B").unwrap();
    assert_eq!(doc.header.manufacturer, "doosan");
    assert_eq!(doc.header.model, "h2017");
    assert_eq!(doc.header.source_requirement, "Move the part to B");
    assert_eq!(doc.header.recognized_actions, vec![Action::Move]);

    let requirement = HeuristicAnalyzer::default().analyze("Move the part to B");
    let overrides = HeaderOverrides {
        manufacturer: Some("Universal Robots".to_string()),
        model: Some("UR10e".to_string()),
    };
    let doc = TdlSynthesizer::default()
        .synthesize(&requirement, &LocationMap::builtin(), &overrides)
        .unwrap();
    assert_eq!(doc.header.manufacturer, "Universal Robots");
    assert_eq!(doc.header.model, "UR10e");
}

#[test]
fn test_rendered_tdl_layout() {
    let doc = synthesize("박스를 A에서 B로 옮겨줘").unwrap();
    let text = render_tdl(&doc);

    assert!(text.starts_with("HEADER {\n"));
    assert!(text.contains("    Source Requirement: \"박스를 A에서 B로 옮겨줘\"\n"));
    assert!(text.contains("    Manufacturer: doosan\n"));
    assert!(text.contains("GOAL Initialize_Process() {"));
    assert!(text.contains("GOAL Execute_Process() {"));
    assert!(text.contains("GOAL Finalize_Process() {"));
    assert!(text.contains(
        "    SPAWN MoveLinear(PosX(400, -200, 200, 180, 0, 180), 250, 500, \"gripper\", 0) \
         WITH WAIT; // approach-source\n"
    ));
    assert!(text.contains("    SPAWN GraspObject(20) WITH WAIT; // grasp\n"));
    assert!(text.contains("DEFINE MoveLinear(pose, velocity, acceleration, tool, blend) {"));

    // One definition per distinct command.
    assert_eq!(text.matches("COMMAND {").count(), 6);
    assert_eq!(text.matches("DEFINE MoveLinear").count(), 1);
}

#[test]
fn test_doosan_job_file() {
    let doc = synthesize("Transfer the box from A to B").unwrap();
    let job = render_job_file(&doc, Vendor::Doosan);

    assert!(job.starts_with("Title : h2017_doosan_auto\n"));
    assert!(job.contains("# === GOAL Execute_Process ===\n"));
    assert!(job.contains("set_velj(30)\n"));
    assert!(job.contains("set_tool(\"gripper\")\n"));
    assert!(job.contains(
        "movel(posx(400, -200, 200, 180, 0, 180), v=250, a=500, radius=0)  # tool=gripper\n"
    ));
    assert!(job.contains("set_digital_output(1, ON)  # close gripper (width=20)\n"));
    assert!(job.contains("set_digital_output(1, OFF)  # open gripper (width=60)\n"));
    assert!(job.contains("release_compliance_ctrl()"));
    assert!(job.ends_with('\n'));
}

#[test]
fn test_vendor_names() {
    assert_eq!("Doosan".parse::<Vendor>(), Ok(Vendor::Doosan));
    assert!("kuka".parse::<Vendor>().is_err());
}
