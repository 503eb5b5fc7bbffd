//! Requirement analysis: natural-language text to [`Requirement`].
//!
//! Two capabilities meet here. A [`RequirementAnalyzer`] always produces a requirement;
//! a [`RequirementProvider`] may fail. [`FallbackAnalyzer`] wraps a provider and turns
//! every provider failure into a heuristic analysis, so callers never see the difference.

use crate::config::{AnalyzerConfig, ProviderKind};
use crate::lexicon::Lexicon;
use crate::provider::{OllamaProvider, ProviderError};
use crate::requirement::{Action, ConstraintKey, Requirement, push_unique};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, warn};

static EN_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bfrom\s+(?:(?:the|an)\s+)?([\w-]+)\s+(?:to|into|onto)\s+(?:(?:the|an)\s+)?([\w-]+)",
    )
    .unwrap()
});
static KO_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([\w-]+?)(?:에서|부터)\s*([\w-]+?)(?:으로|로|까지)(?:\s|$|[.,!?])").unwrap()
});
static EN_SOURCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bfrom\s+(?:(?:the|an)\s+)?([\w-]+)").unwrap());
static EN_TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:to|at|into|onto)\s+(?:(?:the|an)\s+)?([\w-]+)").unwrap());
static KO_SOURCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\w-]+?)(?:에서|부터)(?:\s|$|[.,!?])").unwrap());
static KO_TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\w-]+?)(?:으로|로|까지)(?:\s|$|[.,!?])").unwrap());

static MASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*(kilograms?|kgs?|grams?|g|킬로그램|킬로)").unwrap()
});
static LENGTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\d+(?:\.\d+)?)\s*(millimet(?:er|re)s?|centimet(?:er|re)s?|met(?:er|re)s?|mm|cm|m|밀리미터|센티미터|미터)",
    )
    .unwrap()
});

/// Produces a [`Requirement`] from free text. Never fails.
pub trait RequirementAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Requirement;
}

impl<A: RequirementAnalyzer + ?Sized> RequirementAnalyzer for Box<A> {
    fn analyze(&self, text: &str) -> Requirement {
        (**self).analyze(text)
    }
}

/// An external extractor (typically an LLM) that may fail.
pub trait RequirementProvider: Send + Sync {
    /// Short identifier used in log events.
    fn name(&self) -> &str;

    fn extract(&self, text: &str) -> Result<Requirement, ProviderError>;
}

/// Keyword and pattern based analysis driven by a [`Lexicon`].
#[derive(Clone, Debug)]
pub struct HeuristicAnalyzer {
    lexicon: Lexicon,
}

impl Default for HeuristicAnalyzer {
    fn default() -> Self {
        Self::new(Lexicon::standard())
    }
}

impl HeuristicAnalyzer {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    fn detect_actions(&self, lower: &str) -> Vec<Action> {
        let mut actions = Vec::new();
        for (_, action) in self.lexicon.match_actions(lower) {
            push_unique(&mut actions, action);
        }
        actions
    }

    fn detect_objects(&self, text: &str, lower: &str) -> Vec<String> {
        let mut seen: Vec<&str> = Vec::new();
        let mut objects = Vec::new();
        let mut covered_until = 0;
        for (start, end, canonical) in self.lexicon.match_objects(lower) {
            if start < covered_until {
                continue;
            }
            covered_until = end;
            if seen.contains(&canonical) {
                continue;
            }
            seen.push(canonical);
            objects.push(surface(text, lower, start, end).to_string());
        }
        objects
    }

    fn detect_locations(&self, text: &str, lower: &str) -> (Option<String>, Option<String>) {
        for pattern in [&*EN_PAIR, &*KO_PAIR] {
            for caps in pattern.captures_iter(lower) {
                let source = self.location_token(text, lower, &caps, 1);
                let target = self.location_token(text, lower, &caps, 2);
                if let (Some(source), Some(target)) = (source, target)
                    && !source.eq_ignore_ascii_case(&target)
                {
                    return (Some(source), Some(target));
                }
            }
        }

        let sources = self.collect_tokens(text, lower, &[&*EN_SOURCE, &*KO_SOURCE]);
        let targets = self.collect_tokens(text, lower, &[&*EN_TARGET, &*KO_TARGET]);
        let same_token = match (sources.first(), targets.first()) {
            (Some(s), Some(t)) => s.to_lowercase() == t.to_lowercase(),
            _ => false,
        };
        if sources.len() > 1 || targets.len() > 1 || same_token {
            debug!(?sources, ?targets, "ambiguous location phrases; leaving both unresolved");
            return (None, None);
        }
        (sources.into_iter().next(), targets.into_iter().next())
    }

    fn collect_tokens(&self, text: &str, lower: &str, patterns: &[&Regex]) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for pattern in patterns {
            for caps in pattern.captures_iter(lower) {
                if let Some(token) = self.location_token(text, lower, &caps, 1)
                    && !found.iter().any(|f| f.to_lowercase() == token.to_lowercase())
                {
                    found.push(token);
                }
            }
        }
        found
    }

    fn location_token(
        &self,
        text: &str,
        lower: &str,
        caps: &Captures,
        group: usize,
    ) -> Option<String> {
        let m = caps.get(group)?;
        if self.lexicon.is_non_location(m.as_str()) {
            return None;
        }
        Some(surface(text, lower, m.start(), m.end()).to_string())
    }
}

impl RequirementAnalyzer for HeuristicAnalyzer {
    fn analyze(&self, text: &str) -> Requirement {
        let text = text.trim();
        let lower = text.to_lowercase();

        let mut requirement = Requirement {
            source_text: text.to_string(),
            actions: self.detect_actions(&lower),
            objects: self.detect_objects(text, &lower),
            ..Default::default()
        };
        if self.lexicon.matches_composite(&lower) {
            requirement.expand_transfer();
        }

        let (source, target) = self.detect_locations(text, &lower);
        requirement.source_location = source;
        requirement.target_location = target;

        if let Some(kg) = first_quantity(&MASS, &lower) {
            requirement.constraints.insert(ConstraintKey::PayloadKg, kg);
        }
        if let Some(m) = first_quantity(&LENGTH, &lower) {
            requirement.constraints.insert(ConstraintKey::ReachM, m);
        }

        annotate(&mut requirement);
        debug!(
            actions = ?requirement.actions,
            objects = ?requirement.objects,
            source = ?requirement.source_location,
            target = ?requirement.target_location,
            constraints = ?requirement.constraints,
            "heuristic analysis complete"
        );
        requirement
    }
}

/// Adds the human-readable analysis notes shared by every analyzer.
pub(crate) fn annotate(requirement: &mut Requirement) {
    if requirement.objects.is_empty() {
        requirement
            .notes
            .push("No explicit object detected; default handling will be applied.".to_string());
    }
    if let (Some(source), Some(target)) =
        (&requirement.source_location, &requirement.target_location)
    {
        requirement
            .notes
            .push(format!("Detected transfer from {source} to {target}."));
    }
}

/// Wraps a provider and falls back to heuristics whenever it fails.
pub struct FallbackAnalyzer<P> {
    provider: P,
    fallback: HeuristicAnalyzer,
}

impl<P: RequirementProvider> FallbackAnalyzer<P> {
    pub fn new(provider: P, fallback: HeuristicAnalyzer) -> Self {
        Self { provider, fallback }
    }
}

impl<P: RequirementProvider> RequirementAnalyzer for FallbackAnalyzer<P> {
    fn analyze(&self, text: &str) -> Requirement {
        match self.provider.extract(text) {
            Ok(requirement) => {
                debug!(provider = self.provider.name(), "provider analysis accepted");
                requirement
            }
            Err(err) => {
                warn!(
                    provider = self.provider.name(),
                    error = %err,
                    "provider analysis failed; using heuristics"
                );
                self.fallback.analyze(text)
            }
        }
    }
}

/// Selects the analyzer described by `config`.
///
/// A provider that cannot even be constructed is treated like any other provider
/// failure: the heuristic analyzer is returned instead.
pub fn build_analyzer(config: &AnalyzerConfig) -> Box<dyn RequirementAnalyzer> {
    match config.provider {
        ProviderKind::None => Box::new(HeuristicAnalyzer::default()),
        ProviderKind::Ollama => match OllamaProvider::new(config.ollama()) {
            Ok(provider) => Box::new(FallbackAnalyzer::new(provider, HeuristicAnalyzer::default())),
            Err(err) => {
                warn!(error = %err, "could not build ollama provider; using heuristics");
                Box::new(HeuristicAnalyzer::default())
            }
        },
    }
}

/// Original-case slice of `text` for a byte range found in its lowercase copy.
fn surface<'a>(text: &'a str, lower: &'a str, start: usize, end: usize) -> &'a str {
    if text.len() == lower.len()
        && let Some(s) = text.get(start..end)
    {
        return s;
    }
    &lower[start..end]
}

/// First value matched by a `(number)(unit)` pattern, converted to SI base units.
fn first_quantity(pattern: &Regex, lower: &str) -> Option<f64> {
    pattern.captures_iter(lower).find_map(|caps| {
        let whole = caps.get(0)?;
        let glued_before = lower[..whole.start()]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_alphabetic());
        let glued_after = lower[whole.end()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic());
        if glued_before || glued_after {
            return None;
        }
        let value: f64 = caps.get(1)?.as_str().parse().ok()?;
        Some(value * unit_scale(caps.get(2)?.as_str()))
    })
}

fn unit_scale(unit: &str) -> f64 {
    match unit {
        "g" | "gram" | "grams" => 0.001,
        u if u.starts_with("millimet") || u == "mm" || u == "밀리미터" => 0.001,
        u if u.starts_with("centimet") || u == "cm" || u == "센티미터" => 0.01,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_glued_to_letters_is_not_a_quantity() {
        assert_eq!(first_quantity(&LENGTH, "wait 5 minutes"), None);
        assert_eq!(first_quantity(&LENGTH, "reach 1.2 m"), Some(1.2));
        assert_eq!(first_quantity(&MASS, "a 500 g cup"), Some(0.5));
    }
}
