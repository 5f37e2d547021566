//! The structured summary: four fixed sections whose leaves are either
//! extracted text or the missing-data marker.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Literal substituted wherever evidence is absent.
pub const MISSING_MARKER: &str = "[not found]";

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// One leaf value of the summary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Field {
    Present(String),
    Missing,
}

impl Field {
    /// Whitespace-normalize `raw`; blank text or a marker spelling becomes [`Field::Missing`].
    pub fn from_raw(raw: &str) -> Self {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() || is_marker(&collapsed) {
            Self::Missing
        } else {
            Self::Present(collapsed)
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// The rendered text: the value itself, or [`MISSING_MARKER`].
    pub fn as_str(&self) -> &str {
        match self {
            Self::Present(text) => text,
            Self::Missing => MISSING_MARKER,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spellings a model uses for "no evidence", all treated as the marker.
fn is_marker(text: &str) -> bool {
    let t = text
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .to_ascii_lowercase();
    matches!(
        t.as_str(),
        "[not found]"
            | "not found"
            | "(not found)"
            | "[none]"
            | "(none)"
            | "none"
            | "none identified"
            | "none noted"
            | "none mentioned"
            | "n/a"
            | "[n/a]"
    )
}

// ---------------------------------------------------------------------------
// Section identifiers
// ---------------------------------------------------------------------------

/// The four sections, in their fixed render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    TlDr,
    Decisions,
    RisksBlockers,
    NextSteps,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::TlDr,
        Section::Decisions,
        Section::RisksBlockers,
        Section::NextSteps,
    ];

    /// 1-based position in the rendered output.
    pub fn number(&self) -> usize {
        match self {
            Self::TlDr => 1,
            Self::Decisions => 2,
            Self::RisksBlockers => 3,
            Self::NextSteps => 4,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::TlDr => "TL;DR",
            Self::Decisions => "Decisions",
            Self::RisksBlockers => "Risks/Blockers",
            Self::NextSteps => "Next Steps",
        }
    }
}

/// The fixed risk sub-fields, in render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Reliability,
    Latency,
    Cost,
    RolloutSafety,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 4] = [
        RiskCategory::Reliability,
        RiskCategory::Latency,
        RiskCategory::Cost,
        RiskCategory::RolloutSafety,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Reliability => "Reliability",
            Self::Latency => "Latency",
            Self::Cost => "Cost",
            Self::RolloutSafety => "Rollout safety",
        }
    }
}

// ---------------------------------------------------------------------------
// Section contents
// ---------------------------------------------------------------------------

/// Risks/Blockers: exactly four independently populated categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSet {
    pub reliability: Field,
    pub latency: Field,
    pub cost: Field,
    pub rollout_safety: Field,
}

impl RiskSet {
    pub fn missing() -> Self {
        Self {
            reliability: Field::Missing,
            latency: Field::Missing,
            cost: Field::Missing,
            rollout_safety: Field::Missing,
        }
    }

    pub fn get(&self, category: RiskCategory) -> &Field {
        match category {
            RiskCategory::Reliability => &self.reliability,
            RiskCategory::Latency => &self.latency,
            RiskCategory::Cost => &self.cost,
            RiskCategory::RolloutSafety => &self.rollout_safety,
        }
    }

    pub fn set(&mut self, category: RiskCategory, value: Field) {
        let slot = match category {
            RiskCategory::Reliability => &mut self.reliability,
            RiskCategory::Latency => &mut self.latency,
            RiskCategory::Cost => &mut self.cost,
            RiskCategory::RolloutSafety => &mut self.rollout_safety,
        };
        *slot = value;
    }

    /// Categories paired with their values, in render order.
    pub fn iter(&self) -> impl Iterator<Item = (RiskCategory, &Field)> {
        RiskCategory::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

impl Default for RiskSet {
    fn default() -> Self {
        Self::missing()
    }
}

/// One action item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextStep {
    pub task: Field,
    pub owner: Field,
    pub due: Field,
}

impl NextStep {
    pub fn missing() -> Self {
        Self {
            task: Field::Missing,
            owner: Field::Missing,
            due: Field::Missing,
        }
    }

    pub fn is_all_missing(&self) -> bool {
        self.task.is_missing() && self.owner.is_missing() && self.due.is_missing()
    }
}

// ---------------------------------------------------------------------------
// SectionSet
// ---------------------------------------------------------------------------

/// The complete structured summary.
///
/// Lists are never empty: [`SectionSet::new`] replaces an empty or
/// all-missing list with a single missing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSet {
    tldr: Vec<Field>,
    decisions: Vec<Field>,
    risks: RiskSet,
    next_steps: Vec<NextStep>,
}

impl SectionSet {
    pub fn new(
        tldr: Vec<Field>,
        decisions: Vec<Field>,
        risks: RiskSet,
        next_steps: Vec<NextStep>,
    ) -> Self {
        Self {
            tldr: present_or_marker(tldr),
            decisions: present_or_marker(decisions),
            risks,
            next_steps: steps_or_marker(next_steps),
        }
    }

    /// Every field missing; renders as the blank template.
    pub fn missing() -> Self {
        Self::new(vec![], vec![], RiskSet::missing(), vec![])
    }

    pub fn tldr(&self) -> &[Field] {
        &self.tldr
    }

    pub fn decisions(&self) -> &[Field] {
        &self.decisions
    }

    pub fn risks(&self) -> &RiskSet {
        &self.risks
    }

    pub fn next_steps(&self) -> &[NextStep] {
        &self.next_steps
    }

    /// Number of leaf fields that hold the marker.
    pub fn missing_count(&self) -> usize {
        let lists = self
            .tldr
            .iter()
            .chain(self.decisions.iter())
            .filter(|f| f.is_missing())
            .count();
        let risks = self.risks.iter().filter(|(_, f)| f.is_missing()).count();
        let steps: usize = self
            .next_steps
            .iter()
            .map(|s| {
                [&s.task, &s.owner, &s.due]
                    .iter()
                    .filter(|f| f.is_missing())
                    .count()
            })
            .sum();
        lists + risks + steps
    }
}

fn present_or_marker(fields: Vec<Field>) -> Vec<Field> {
    let present: Vec<Field> = fields.into_iter().filter(|f| !f.is_missing()).collect();
    if present.is_empty() {
        vec![Field::Missing]
    } else {
        present
    }
}

fn steps_or_marker(steps: Vec<NextStep>) -> Vec<NextStep> {
    let kept: Vec<NextStep> = steps.into_iter().filter(|s| !s.is_all_missing()).collect();
    if kept.is_empty() {
        vec![NextStep::missing()]
    } else {
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_from_raw_normalizes_whitespace() {
        assert_eq!(
            Field::from_raw("  ship   the\tbeta \n build "),
            Field::Present("ship the beta build".into())
        );
    }

    #[test]
    fn field_from_raw_recognizes_marker_spellings() {
        for raw in ["", "   ", "[not found]", "[Not Found]", "not found.", "N/A"] {
            assert!(Field::from_raw(raw).is_missing(), "{raw:?} should be missing");
        }
    }

    #[test]
    fn none_spellings_are_missing() {
        assert!(Field::from_raw("None").is_missing());
        assert!(Field::from_raw("None identified.").is_missing());
        assert!(!Field::from_raw("None of the tests pass").is_missing());
    }

    #[test]
    fn missing_field_renders_marker() {
        assert_eq!(Field::Missing.to_string(), MISSING_MARKER);
        assert_eq!(Field::Present("x".into()).as_str(), "x");
    }

    #[test]
    fn section_order_is_fixed() {
        let numbers: Vec<usize> = Section::ALL.iter().map(|s| s.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(Section::RisksBlockers.title(), "Risks/Blockers");
    }

    #[test]
    fn empty_lists_become_single_marker() {
        let set = SectionSet::new(vec![], vec![Field::Missing, Field::Missing], RiskSet::missing(), vec![]);
        assert_eq!(set.tldr(), &[Field::Missing]);
        assert_eq!(set.decisions(), &[Field::Missing]);
        assert_eq!(set.next_steps().len(), 1);
        assert!(set.next_steps()[0].is_all_missing());
    }

    #[test]
    fn missing_markers_dropped_when_present_values_exist() {
        let set = SectionSet::new(
            vec![Field::Present("a".into()), Field::Missing],
            vec![],
            RiskSet::missing(),
            vec![NextStep::missing()],
        );
        assert_eq!(set.tldr(), &[Field::Present("a".into())]);
    }

    #[test]
    fn risk_set_get_set_roundtrip() {
        let mut risks = RiskSet::missing();
        risks.set(RiskCategory::Cost, Field::Present("GPU spend".into()));
        assert_eq!(risks.get(RiskCategory::Cost).as_str(), "GPU spend");
        let labels: Vec<&str> = risks.iter().map(|(c, _)| c.label()).collect();
        assert_eq!(labels, vec!["Reliability", "Latency", "Cost", "Rollout safety"]);
    }

    #[test]
    fn missing_count_covers_all_leaves() {
        // 1 tldr + 1 decision + 4 risks + 3 next-step slots
        assert_eq!(SectionSet::missing().missing_count(), 9);
    }
}
