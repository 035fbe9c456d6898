//! Target pattern catalogue

use std::sync::Arc;

use rapidtap_core_types::PatternId;
use rapidtap_policy_center::PatternSpec;
use regex::Regex;

use crate::errors::LocatorError;
use crate::types::LocateMethod;

/// A named target definition.
///
/// The text matcher is compiled once, at construction, from the primary
/// texts: a case-insensitive substring match against any of them.
#[derive(Debug, Clone)]
pub struct TargetPattern {
    id: PatternId,
    texts: Vec<String>,
    view_ids: Vec<String>,
    descriptions: Vec<String>,
    priority: u8,
    critical: bool,
    matcher: Regex,
}

impl TargetPattern {
    pub fn new<I, S>(id: impl Into<String>, texts: I) -> Result<Self, LocatorError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        let texts: Vec<String> = texts
            .into_iter()
            .map(Into::into)
            .filter(|text: &String| !text.trim().is_empty())
            .collect();
        if id.trim().is_empty() {
            return Err(LocatorError::InvalidPattern {
                id,
                reason: "empty identity".into(),
            });
        }
        if texts.is_empty() {
            return Err(LocatorError::InvalidPattern {
                id,
                reason: "no primary text".into(),
            });
        }
        let matcher = compile_matcher(&texts).map_err(|err| LocatorError::InvalidPattern {
            id: id.clone(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            id: PatternId::new(id),
            texts,
            view_ids: Vec::new(),
            descriptions: Vec::new(),
            priority: 3,
            critical: false,
            matcher,
        })
    }

    pub fn from_spec(spec: &PatternSpec) -> Result<Self, LocatorError> {
        Ok(Self::new(spec.id.clone(), spec.texts.iter().cloned())?
            .with_view_ids(spec.view_ids.iter().cloned())
            .with_descriptions(spec.descriptions.iter().cloned())
            .with_priority(spec.priority)
            .with_critical(spec.critical))
    }

    pub fn with_view_ids<I, S>(mut self, view_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.view_ids = view_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_descriptions<I, S>(mut self, descriptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.descriptions = descriptions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn id(&self) -> &PatternId {
        &self.id
    }

    /// Display label: the first primary text.
    pub fn label(&self) -> &str {
        self.texts.first().map(String::as_str).unwrap_or_default()
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn view_ids(&self) -> &[String] {
        &self.view_ids
    }

    pub fn descriptions(&self) -> &[String] {
        &self.descriptions
    }

    /// Lower rank is more urgent.
    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }

    pub fn matches_text(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }

    /// Queries issued for one search method, in listed order.
    pub fn queries(&self, method: LocateMethod) -> &[String] {
        match method {
            LocateMethod::Text => &self.texts,
            LocateMethod::ViewId => &self.view_ids,
            LocateMethod::Description => &self.descriptions,
        }
    }
}

fn compile_matcher(texts: &[String]) -> Result<Regex, regex::Error> {
    let alternation = texts
        .iter()
        .map(|text| regex::escape(text.trim()))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i)(?:{alternation})"))
}

/// Immutable catalogue iterated in ascending priority rank.
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    patterns: Vec<Arc<TargetPattern>>,
}

impl PatternRegistry {
    pub fn new(patterns: Vec<TargetPattern>) -> Result<Self, LocatorError> {
        let mut patterns: Vec<Arc<TargetPattern>> = patterns.into_iter().map(Arc::new).collect();
        for (idx, pattern) in patterns.iter().enumerate() {
            if patterns[..idx].iter().any(|seen| seen.id() == pattern.id()) {
                return Err(LocatorError::DuplicatePattern(pattern.id().to_string()));
            }
        }
        // stable: equal ranks keep declaration order
        patterns.sort_by_key(|pattern| pattern.priority());
        Ok(Self { patterns })
    }

    pub fn from_specs(specs: &[PatternSpec]) -> Result<Self, LocatorError> {
        let patterns = specs
            .iter()
            .map(TargetPattern::from_spec)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(patterns)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<TargetPattern>> {
        self.patterns.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<TargetPattern>> {
        self.patterns.iter().find(|pattern| pattern.id().as_str() == id)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
