// tests/workflow.rs
use nl2tdl::{
    Action, AnalyzerConfig, ConstraintKey, ENV_ENDPOINT, ENV_MODEL, ENV_PROVIDER,
    FallbackAnalyzer, HeaderOverrides, HeuristicAnalyzer, PipelineConfig, ProviderError,
    ProviderKind, Requirement, RequirementAnalyzer, RequirementProvider, Workflow, WorkflowError,
    build_analyzer, load_config, parse_config, parse_requirement_json,
};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A provider that always fails, counting how often it was asked.
#[derive(Default)]
struct BrokenProvider {
    calls: Arc<AtomicUsize>,
}

impl RequirementProvider for BrokenProvider {
    fn name(&self) -> &str {
        "broken"
    }

    fn extract(&self, _text: &str) -> Result<Requirement, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::Status(503))
    }
}

/// A provider that answers with a canned model output.
struct CannedProvider(&'static str);

impl RequirementProvider for CannedProvider {
    fn name(&self) -> &str {
        "canned"
    }

    fn extract(&self, text: &str) -> Result<Requirement, ProviderError> {
        parse_requirement_json(text, self.0)
    }
}

const TRANSFER_TEXT: &str = "박스를 A에서 B로 옮겨줘";

#[test]
fn test_provider_failure_falls_back_to_heuristics() {
    let provider = BrokenProvider::default();
    let analyzer = FallbackAnalyzer::new(provider, HeuristicAnalyzer::default());

    let with_fallback = analyzer.analyze(TRANSFER_TEXT);
    let heuristic = HeuristicAnalyzer::default().analyze(TRANSFER_TEXT);
    assert_eq!(with_fallback, heuristic);
}

#[test]
fn test_provider_is_asked_once_per_analysis() {
    let provider = BrokenProvider::default();
    let calls = Arc::clone(&provider.calls);
    let analyzer = FallbackAnalyzer::new(provider, HeuristicAnalyzer::default());

    analyzer.analyze("pick the box");
    analyzer.analyze("place the box");
    assert_eq!(calls.load(Ordering::SeqCst), 2, "no retries");
}

#[test]
fn test_provider_success_is_used_as_is() {
    let analyzer = FallbackAnalyzer::new(
        CannedProvider(
            r#"Sure, here it is: {"actions": ["pick", "place"], "objects": ["crate"],
            "source_location": "conveyor", "target_location": "pallet",
            "constraints": {"payload_kg": 8.5}}"#,
        ),
        HeuristicAnalyzer::default(),
    );
    let req = analyzer.analyze("something the heuristics would not understand");

    assert_eq!(req.actions, vec![Action::Pick, Action::Place]);
    assert_eq!(req.objects, vec!["crate".to_string()]);
    assert_eq!(req.source_location.as_deref(), Some("conveyor"));
    assert_eq!(req.target_location.as_deref(), Some("pallet"));
    assert_eq!(req.constraints.get(&ConstraintKey::PayloadKg), Some(&8.5));
    assert_eq!(
        req.notes,
        vec!["Detected transfer from conveyor to pallet.".to_string()]
    );
}

#[test]
fn test_provider_schema_violation_falls_back() {
    let analyzer = FallbackAnalyzer::new(
        CannedProvider(r#"{"actions": ["dance"]}"#),
        HeuristicAnalyzer::default(),
    );
    let req = analyzer.analyze("Move the part to B");
    assert_eq!(req.actions, vec![Action::Move]);
    assert_eq!(req.target_location.as_deref(), Some("B"));
}

#[test]
fn test_requirement_json_normalization() {
    let req = parse_requirement_json(
        " transfer it ",
        r#"{"detected_actions": ["transfer", "wait"], "objects": ["Box", "box", " "],
            "source_location": "A", "target_location": "  ",
            "constraints": {"payload_kg": 5, "speed": 3}}"#,
    )
    .unwrap();

    assert_eq!(req.source_text, "transfer it");
    assert_eq!(
        req.actions,
        vec![Action::Wait, Action::Pick, Action::Move, Action::Place]
    );
    assert_eq!(req.objects, vec!["Box".to_string()]);
    assert_eq!(req.source_location.as_deref(), Some("A"));
    assert_eq!(req.target_location, None);
    assert_eq!(req.constraints.len(), 1);
    assert_eq!(req.constraints.get(&ConstraintKey::PayloadKg), Some(&5.0));
}

#[test]
fn test_requirement_json_rejections() {
    assert!(matches!(
        parse_requirement_json("x", "I could not parse that."),
        Err(ProviderError::Response(_))
    ));
    assert!(matches!(
        parse_requirement_json("x", r#"{"actions": ["dance"]}"#),
        Err(ProviderError::Schema(_))
    ));
    assert!(matches!(
        parse_requirement_json("x", r#"{"constraints": {"reach_m": "far"}}"#),
        Err(ProviderError::Schema(_))
    ));
    assert!(matches!(
        parse_requirement_json("x", r#"{"actions": "pick"}"#),
        Err(ProviderError::Schema(_))
    ));

    // Objects that are not requirements at all.
    for reply in [
        "{}",
        r#"{"answer": "sorry, I cannot help"}"#,
        r#"{"actions": ["pick"], "answer": "also this"}"#,
        r#"{"objects": ["box"], "target_location": "B"}"#,
    ] {
        assert!(
            matches!(parse_requirement_json("x", reply), Err(ProviderError::Schema(_))),
            "accepted {reply}"
        );
    }
}

#[test]
fn test_unrelated_json_reply_falls_back() {
    let analyzer = FallbackAnalyzer::new(
        CannedProvider(r#"I'm afraid {"answer": "sorry"}"#),
        HeuristicAnalyzer::default(),
    );
    let req = analyzer.analyze(TRANSFER_TEXT);

    assert_eq!(req.actions, vec![Action::Pick, Action::Move, Action::Place]);
    assert_eq!(req, HeuristicAnalyzer::default().analyze(TRANSFER_TEXT));
}

#[test]
fn test_unreachable_ollama_falls_back() {
    let config = AnalyzerConfig {
        provider: ProviderKind::Ollama,
        endpoint: "http://127.0.0.1:9".to_string(),
        timeout_secs: 2,
        ..Default::default()
    };
    let analyzer = build_analyzer(&config);
    let req = analyzer.analyze(TRANSFER_TEXT);

    assert_eq!(req, HeuristicAnalyzer::default().analyze(TRANSFER_TEXT));
}

#[test]
fn test_workflow_end_to_end() {
    let workflow = Workflow::new(PipelineConfig::default());
    let result = workflow
        .run(TRANSFER_TEXT, &HeaderOverrides::default())
        .unwrap();

    assert_eq!(result.requirement.actions.len(), 3);
    assert_eq!(result.document.execute_commands().len(), 8);
    assert!(result.report.passed());
    assert!(result.verification.passed());
    assert!(result.confirmation.issues.is_empty());
    assert!(result.ranking.is_empty(), "no robot database configured");
    assert_eq!(result.selection_note, None);
    assert!(!result.has_eligible_robot());
}

#[test]
fn test_workflow_with_robot_database() {
    let mut db = tempfile::NamedTempFile::new().unwrap();
    write!(
        db,
        r#"[{{"manufacturer": "Doosan", "model": "H2017", "payload_kg": 20, "reach_m": 1.7}},
            {{"manufacturer": "Doosan", "model": "A0509", "payload_kg": 5, "reach_m": 0.9}}]"#
    )
    .unwrap();
    let config = PipelineConfig {
        robot_db: Some(db.path().to_path_buf()),
        ..Default::default()
    };
    let workflow = Workflow::new(config);
    let result = workflow
        .run(
            "Transfer a 12 kg part from A to B",
            &HeaderOverrides::default(),
        )
        .unwrap();

    assert_eq!(result.ranking.len(), 2);
    assert_eq!(result.ranking[0].spec.model, "H2017");
    assert!(result.ranking[0].eligible);
    assert!(!result.ranking[1].eligible);
    assert!(result.has_eligible_robot());
    assert_eq!(
        result.selection_note,
        Some("At least one robot satisfies payload and reach requirements.")
    );
}

#[test]
fn test_workflow_verification_flags_missing_motion() {
    let result = Workflow::new(PipelineConfig::default())
        .run("wait", &HeaderOverrides::default())
        .unwrap();

    assert!(result.report.passed());
    assert!(!result.verification.logical_ok);
    assert!(result.verification.syntax_ok && result.verification.schema_ok);
}

#[test]
fn test_workflow_reports_missing_database() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        robot_db: Some(dir.path().join("missing.json")),
        ..Default::default()
    };
    let err = Workflow::new(config)
        .run("Move the part to B", &HeaderOverrides::default())
        .unwrap_err();
    assert!(matches!(err, WorkflowError::RobotDatabase(_)));
}

#[test]
fn test_workflow_reports_unresolved_location() {
    let workflow = Workflow::with_analyzer(
        PipelineConfig::default(),
        Box::new(HeuristicAnalyzer::default()),
    );
    let err = workflow
        .run_with_specs("Move the part to dock", &HeaderOverrides::default(), &[])
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Synthesis(_)));
}

#[test]
fn test_config_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
robot_db = "robots_db.json"

[synthesis]
safety_height = 150.0
default_model = "m1013"

[analyzer]
provider = "ollama"
timeout_secs = 5

[locations]
Shelf = [350.0, 400.0, 250.0, 180.0, 0.0, 180.0]
"#
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.synthesis.safety_height, 150.0);
    assert_eq!(config.synthesis.default_model, "m1013");
    assert_eq!(config.synthesis.default_manufacturer, "doosan");
    assert_eq!(config.analyzer.provider, ProviderKind::Ollama);
    assert_eq!(config.analyzer.model, "gemma:2b");
    assert_eq!(config.analyzer.timeout_secs, 5);
    assert_eq!(
        config.robot_db.as_deref(),
        Some(std::path::Path::new("robots_db.json"))
    );

    let map = config.location_map();
    assert!(map.contains("shelf"));
    assert!(map.contains("home"), "built-in entries survive overrides");
}

#[test]
fn test_empty_config_is_default() {
    assert_eq!(parse_config("").unwrap(), PipelineConfig::default());
    assert!(parse_config("[synthesis]\nsafety_height = \"high\"").is_err());
}

#[test]
fn test_env_overrides() {
    let env = |key: &str| match key {
        k if k == ENV_PROVIDER => Some("Ollama".to_string()),
        k if k == ENV_MODEL => Some("llama3".to_string()),
        k if k == ENV_ENDPOINT => Some(String::new()),
        _ => None,
    };
    let config = AnalyzerConfig::default().with_env_overrides(env);

    assert_eq!(config.provider, ProviderKind::Ollama);
    assert_eq!(config.model, "llama3");
    assert_eq!(config.endpoint, "http://localhost:11434", "blank values are ignored");

    let config = config.with_env_overrides(|key| {
        (key == ENV_PROVIDER).then(|| "huggingface".to_string())
    });
    assert_eq!(config.provider, ProviderKind::None);
}

#[test]
fn test_zero_timeout_uses_default() {
    let config = AnalyzerConfig {
        timeout_secs: 0,
        ..Default::default()
    };
    assert_eq!(config.ollama().timeout, Duration::from_secs(60));

    let config = parse_config("[analyzer]\ntimeout_secs = 0").unwrap();
    assert_eq!(config.analyzer.ollama().timeout, Duration::from_secs(60));

    let config = AnalyzerConfig {
        timeout_secs: 7,
        ..Default::default()
    };
    assert_eq!(config.ollama().timeout, Duration::from_secs(7));
}
