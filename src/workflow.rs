//! End-to-end orchestration: text to validated document plus robot ranking.

use crate::analyzer::{RequirementAnalyzer, build_analyzer};
use crate::config::PipelineConfig;
use crate::location::LocationMap;
use crate::requirement::Requirement;
use crate::selector::{
    RankedCandidate, RobotSpec, SelectorError, load_robot_specs, select, selection_note,
};
use crate::synthesizer::{HeaderOverrides, SynthesisError, TdlSynthesizer};
use crate::tdl::TdlDocument;
use crate::validator::{
    ConfirmationSummary, ValidationReport, VerificationReport, confirmation_summary, validate,
    verify,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    RobotDatabase(#[from] SelectorError),
}

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct WorkflowResult {
    pub requirement: Requirement,
    pub document: TdlDocument,
    pub report: ValidationReport,
    /// Checks over the rendered TDL text.
    pub verification: VerificationReport,
    pub confirmation: ConfirmationSummary,
    /// Empty when no robot database is configured.
    pub ranking: Vec<RankedCandidate>,
    /// Verdict over `ranking`, absent when it is empty.
    pub selection_note: Option<&'static str>,
}

impl WorkflowResult {
    /// True when at least one robot meets every constraint.
    pub fn has_eligible_robot(&self) -> bool {
        self.ranking.iter().any(|c| c.eligible)
    }
}

/// Runs analyzer, synthesizer, validator and verifier in sequence and the selector alongside.
pub struct Workflow {
    analyzer: Box<dyn RequirementAnalyzer>,
    synthesizer: TdlSynthesizer,
    locations: LocationMap,
    config: PipelineConfig,
}

impl Workflow {
    /// Builds the analyzer and location table described by `config`.
    pub fn new(config: PipelineConfig) -> Self {
        let analyzer = build_analyzer(&config.analyzer);
        Self::with_analyzer(config, analyzer)
    }

    /// Uses a caller-supplied analyzer instead of the configured one.
    pub fn with_analyzer(config: PipelineConfig, analyzer: Box<dyn RequirementAnalyzer>) -> Self {
        Self {
            analyzer,
            synthesizer: TdlSynthesizer::new(config.synthesis.clone()),
            locations: config.location_map(),
            config,
        }
    }

    pub fn locations(&self) -> &LocationMap {
        &self.locations
    }

    /// Runs the pipeline, loading robot specifications from the configured database.
    pub fn run(
        &self,
        text: &str,
        overrides: &HeaderOverrides,
    ) -> Result<WorkflowResult, WorkflowError> {
        let specs = match &self.config.robot_db {
            Some(path) => load_robot_specs(path)?,
            None => Vec::new(),
        };
        self.run_with_specs(text, overrides, &specs)
    }

    /// Runs the pipeline against an in-memory specification list.
    pub fn run_with_specs(
        &self,
        text: &str,
        overrides: &HeaderOverrides,
        specs: &[RobotSpec],
    ) -> Result<WorkflowResult, WorkflowError> {
        let requirement = self.analyzer.analyze(text);
        let document = self
            .synthesizer
            .synthesize(&requirement, &self.locations, overrides)?;
        let report = validate(&document);
        let verification = verify(&document);
        let confirmation = confirmation_summary(&document);
        let ranking = select(&requirement.constraints, specs);
        let selection_note = selection_note(&ranking);
        info!(
            actions = requirement.actions.len(),
            execute_commands = document.execute_commands().len(),
            passed = report.passed(),
            verified = verification.passed(),
            candidates = ranking.len(),
            "workflow complete"
        );
        Ok(WorkflowResult {
            requirement,
            document,
            report,
            verification,
            confirmation,
            ranking,
            selection_note,
        })
    }
}
