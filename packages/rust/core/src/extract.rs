//! Section extraction: ask the completion service for the four sections and
//! parse whatever comes back into a [`SectionSet`].
//!
//! Parsing is tolerant. Headers may be numbered, bolded or prefixed with
//! `#`; bullets may use `-`, `*`, `•` or `1.`. Anything that cannot be placed
//! becomes the missing-data marker and is reported as a [`ShapeRepair`]
//! instead of an error.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use meetnotes_shared::{Corpus, Field, Mode, NextStep, Result, RiskCategory, RiskSet, Section, SectionSet};

use crate::completion::{TextCompletionService, complete_bounded};
use crate::prompts::extraction_prompt;

// ---------------------------------------------------------------------------
// Shape repairs
// ---------------------------------------------------------------------------

/// One deviation from the requested shape that was repaired during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeRepair {
    /// Section header never appeared; the section is all markers.
    MissingSection(Section),
    /// Header present with no usable content under it.
    EmptySection(Section),
    /// Header appeared more than once; the bodies were merged.
    DuplicateSection(Section),
    /// Risk bullet without a recognised category label; dropped.
    UnlabeledRisk(String),
    /// Risk category absent from the response.
    MissingRisk(RiskCategory),
    /// Next-step slot absent from a line (1-based line index).
    MissingStepField { step: usize, slot: &'static str },
    /// Text before the first header; ignored.
    StrayPreamble,
}

impl fmt::Display for ShapeRepair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSection(s) => write!(f, "section {:?} missing", s.title()),
            Self::EmptySection(s) => write!(f, "section {:?} empty", s.title()),
            Self::DuplicateSection(s) => write!(f, "section {:?} repeated, merged", s.title()),
            Self::UnlabeledRisk(text) => write!(f, "risk without category dropped: {text}"),
            Self::MissingRisk(c) => write!(f, "risk category {:?} missing", c.label()),
            Self::MissingStepField { step, slot } => write!(f, "next step {step} has no {slot}"),
            Self::StrayPreamble => f.write_str("text before first header ignored"),
        }
    }
}

/// A parsed summary plus the repairs that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub sections: SectionSet,
    pub repairs: Vec<ShapeRepair>,
}

// ---------------------------------------------------------------------------
// Extraction entry point
// ---------------------------------------------------------------------------

/// Run one completion over `corpus` and parse the response.
///
/// Fails only when the completion itself fails, times out, or is cancelled.
#[instrument(skip_all, fields(%mode, sources = corpus.len()))]
pub async fn extract(
    corpus: &Corpus,
    mode: Mode,
    service: &dyn TextCompletionService,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<Extracted> {
    let prompt = extraction_prompt(corpus, mode);
    let raw = complete_bounded(service, &prompt, deadline, cancel).await?;

    let extracted = parse_sections(&raw);
    for repair in &extracted.repairs {
        debug!(%repair, "shape repaired");
    }
    info!(
        repairs = extracted.repairs.len(),
        missing = extracted.sections.missing_count(),
        "sections extracted"
    );
    Ok(extracted)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:#{1,6}\s*)?(?:\*\*|__)?\s*(?:(?P<num>\d+)\s*[).:]\s*)?(?:\*\*|__)?\s*(?P<name>tl\s*;?\s*dr|decisions?|risks?\s*(?:/|&|and)\s*blockers?|risks?|blockers?|next\s+steps?|action\s+items?)\s*(?:\*\*|__)?\s*(?P<colon>:)?\s*(?:\*\*|__)?\s*(?P<rest>.*)$",
    )
    .expect("valid regex")
});

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*•+]|\d+[.)])\s+(?P<item>.*)$").expect("valid regex"));

static RISK_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<label>[A-Za-z][A-Za-z /&-]{1,30}?)\s*(?:\((?P<note>[^)]*)\))?\s*(?::|[-–]\s)\s*(?P<value>.*)$",
    )
    .expect("valid regex")
});

static STEP_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?P<label>task|owner|assignee|due\s+date|due|deadline)\s*:").expect("valid regex")
});

/// A `|`-separated step segment that opens with a slot label.
static STEP_SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?P<label>task|owner|assignee|due\s+date|due|deadline)\s*:(?P<value>.*)$")
        .expect("valid regex")
});

fn section_for(name: &str) -> Section {
    let name = name.to_ascii_lowercase();
    if name.starts_with("tl") {
        Section::TlDr
    } else if name.starts_with("decision") {
        Section::Decisions
    } else if name.starts_with("risk") || name.starts_with("blocker") {
        Section::RisksBlockers
    } else {
        Section::NextSteps
    }
}

/// Recognise a section header line, returning the section and any inline text.
fn match_header(line: &str) -> Option<(Section, String)> {
    let caps = HEADER_RE.captures(line)?;
    let section = section_for(&caps["name"]);
    let rest = caps.name("rest").map_or("", |m| m.as_str()).trim();
    // "Next steps are unclear" is prose, not a header.
    if !rest.is_empty() && caps.name("colon").is_none() {
        return None;
    }
    // "2. Risks: p99 regressed" is a numbered bullet, not section 3.
    let numbered_elsewhere = caps
        .name("num")
        .is_some_and(|n| n.as_str().parse::<usize>().ok() != Some(section.number()));
    if numbered_elsewhere && !rest.is_empty() {
        return None;
    }
    Some((section, rest.to_string()))
}

/// Parse a raw completion into a [`SectionSet`]. Pure and deterministic.
pub fn parse_sections(raw: &str) -> Extracted {
    let mut repairs = Vec::new();
    let mut bodies: HashMap<Section, Vec<String>> = HashMap::new();
    let mut current: Option<Section> = None;
    let mut preamble = false;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            continue;
        }

        if let Some((section, inline)) = match_header(line) {
            if bodies.contains_key(&section) && current != Some(section) {
                repairs.push(ShapeRepair::DuplicateSection(section));
            }
            let body = bodies.entry(section).or_default();
            if !inline.is_empty() {
                body.push(format!("- {inline}"));
            }
            current = Some(section);
            continue;
        }

        match current {
            Some(section) => bodies.entry(section).or_default().push(line.to_string()),
            None if !trimmed.is_empty() => preamble = true,
            None => {}
        }
    }

    if preamble {
        repairs.push(ShapeRepair::StrayPreamble);
    }

    let mut items_for = |section: Section, repairs: &mut Vec<ShapeRepair>| -> Vec<String> {
        match bodies.remove(&section) {
            None => {
                repairs.push(ShapeRepair::MissingSection(section));
                Vec::new()
            }
            Some(lines) => {
                let items = split_items(&lines);
                if items.is_empty() {
                    repairs.push(ShapeRepair::EmptySection(section));
                }
                items
            }
        }
    };

    let tldr_items = items_for(Section::TlDr, &mut repairs);
    let decision_items = items_for(Section::Decisions, &mut repairs);
    let risk_items = items_for(Section::RisksBlockers, &mut repairs);
    let step_items = items_for(Section::NextSteps, &mut repairs);

    let tldr = tldr_items.iter().map(|i| Field::from_raw(i)).collect();
    let decisions = decision_items.iter().map(|i| Field::from_raw(i)).collect();
    let risks = parse_risks(&risk_items, &mut repairs);
    let next_steps = step_items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_step(i + 1, item, &mut repairs))
        .collect();

    Extracted {
        sections: SectionSet::new(tldr, decisions, risks, next_steps),
        repairs,
    }
}

/// Group body lines into items. A bullet starts an item, a plain line
/// continues the previous one, a blank line ends it.
fn split_items(lines: &[String]) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    let mut open = false;

    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            open = false;
            continue;
        }

        if let Some(caps) = BULLET_RE.captures(line) {
            items.push(strip_emphasis(&caps["item"]));
            open = true;
        } else if open {
            if let Some(last) = items.last_mut() {
                last.push(' ');
                last.push_str(&strip_emphasis(trimmed));
            }
        } else {
            items.push(strip_emphasis(trimmed));
            open = true;
        }
    }

    items.retain(|i| !i.trim().is_empty());
    items
}

/// Drop `**`/`__` only when it wraps the whole item or a leading label.
/// Markers inside a value (`__init__`, `**kwargs`) are kept.
fn strip_emphasis(text: &str) -> String {
    let text = text.trim();
    for mark in ["**", "__"] {
        let Some(inner) = text.strip_prefix(mark) else { continue };
        let Some(end) = inner.find(mark) else { continue };
        let (wrapped, after) = (&inner[..end], &inner[end + mark.len()..]);
        if wrapped.trim().is_empty() {
            continue;
        }
        if after.trim().is_empty() {
            return wrapped.trim().to_string();
        }
        if wrapped.trim_end().ends_with(':') || after.starts_with(':') {
            return format!("{}{}", wrapped.trim(), after).trim().to_string();
        }
    }
    text.to_string()
}

// ----- Risks -----

fn risk_category(label: &str) -> Option<RiskCategory> {
    let key: String = label
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_lowercase();
    match key.as_str() {
        "reliability" | "stability" => Some(RiskCategory::Reliability),
        "latency" | "performance" => Some(RiskCategory::Latency),
        "cost" | "costs" => Some(RiskCategory::Cost),
        k if k.starts_with("rollout") => Some(RiskCategory::RolloutSafety),
        _ => None,
    }
}

fn parse_risks(items: &[String], repairs: &mut Vec<ShapeRepair>) -> RiskSet {
    let mut found: HashMap<RiskCategory, Vec<String>> = HashMap::new();

    for item in items {
        let category = RISK_LABEL_RE.captures(item).and_then(|caps| {
            let category = risk_category(&caps["label"])?;
            let value = caps["value"].trim();
            let value = match caps.name("note").map(|n| n.as_str().trim()) {
                Some(note) if !note.is_empty() && !value.is_empty() => format!("{value} ({note})"),
                _ => value.to_string(),
            };
            Some((category, value))
        });

        match category {
            Some((c, value)) => {
                if !Field::from_raw(&value).is_missing() {
                    found.entry(c).or_default().push(value.trim().to_string());
                } else {
                    found.entry(c).or_default();
                }
            }
            None => repairs.push(ShapeRepair::UnlabeledRisk(item.clone())),
        }
    }

    let mut risks = RiskSet::missing();
    for category in RiskCategory::ALL {
        match found.get(&category) {
            None => repairs.push(ShapeRepair::MissingRisk(category)),
            Some(values) => risks.set(category, Field::from_raw(&values.join("; "))),
        }
    }
    risks
}

// ----- Next steps -----

fn slot_for<'a>(
    label: &str,
    task: &'a mut Option<String>,
    owner: &'a mut Option<String>,
    due: &'a mut Option<String>,
) -> &'a mut Option<String> {
    match label.to_ascii_lowercase().as_str() {
        "task" => task,
        "owner" | "assignee" => owner,
        _ => due,
    }
}

fn parse_step(index: usize, item: &str, repairs: &mut Vec<ShapeRepair>) -> NextStep {
    let mut task: Option<String> = None;
    let mut owner: Option<String> = None;
    let mut due: Option<String> = None;

    if item.contains('|') {
        scan_segments(item, &mut task, &mut owner, &mut due);
    } else {
        scan_labels(item, &mut task, &mut owner, &mut due);
    }

    let mut field = |value: Option<String>, slot: &'static str| {
        let field = value.as_deref().map_or(Field::Missing, Field::from_raw);
        if value.is_none() {
            repairs.push(ShapeRepair::MissingStepField { step: index, slot });
        }
        field
    };

    NextStep {
        task: field(task, "task"),
        owner: field(owner, "owner"),
        due: field(due, "due"),
    }
}

/// `Task: .. | Owner: .. | Due: ..`: a label counts only at the start of a segment,
/// so colons inside a value stay part of it.
fn scan_segments(
    item: &str,
    task: &mut Option<String>,
    owner: &mut Option<String>,
    due: &mut Option<String>,
) {
    let mut lead: Option<String> = None;
    for segment in item.split('|') {
        match STEP_SEGMENT_RE.captures(segment) {
            Some(caps) => {
                let slot = slot_for(&caps["label"], task, owner, due);
                if slot.is_none() {
                    *slot = Some(clean_value(&caps["value"]));
                }
            }
            None if lead.is_none() => {
                let text = clean_value(segment);
                if !text.is_empty() {
                    lead = Some(text);
                }
            }
            None => {}
        }
    }
    if task.is_none() {
        *task = lead;
    }
}

/// Free-form line: labels anywhere, each value running to the next label.
fn scan_labels(
    item: &str,
    task: &mut Option<String>,
    owner: &mut Option<String>,
    due: &mut Option<String>,
) {
    let labels: Vec<_> = STEP_LABEL_RE.captures_iter(item).collect();

    let lead_end = labels.first().map_or(item.len(), |c| c.get(0).map_or(0, |m| m.start()));
    let lead = clean_value(&item[..lead_end]);

    for (i, caps) in labels.iter().enumerate() {
        let Some(whole) = caps.get(0) else { continue };
        let end = labels
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(item.len(), |m| m.start());
        let value = clean_value(&item[whole.end()..end]);

        let slot = slot_for(&caps["label"], task, owner, due);
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    if task.is_none() && !lead.is_empty() {
        *task = Some(lead);
    }
}

/// Trim separators and one unbalanced closing parenthesis from a slot value.
fn clean_value(raw: &str) -> String {
    let mut value = raw
        .trim()
        .trim_matches(|c: char| matches!(c, '|' | ';' | ',' | '-' | '–') || c.is_whitespace())
        .to_string();

    if value.ends_with('(') {
        value.pop();
    }
    if value.ends_with(')') && value.matches(')').count() > value.matches('(').count() {
        value.pop();
    }

    value
        .trim()
        .trim_matches(|c: char| matches!(c, '|' | ';' | ',' | '-' | '–') || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use meetnotes_shared::{MeetNotesError, Provenance, SourceRecord};

    use crate::completion::Prompt;

    const WELL_FORMED: &str = "\
1) TL;DR:
- We agreed to ship the beta on Friday.
- Latency regressed after the cache change.
- Budget is on track.
2) Decisions:
- Ship beta Friday
- Keep the old cache behind a flag
3) Risks/Blockers:
- Reliability: flaky integration tests
- Latency: p99 up 40ms
- Cost: [not found]
- Rollout safety: staged rollout planned
4) Next Steps:
- Task: Fix flaky tests | Owner: Dana | Due: Thursday
- Task: Write rollout doc | Owner: Sam | Due: [not found]
";

    fn present(text: &str) -> Field {
        Field::Present(text.to_string())
    }

    #[test]
    fn parses_well_formed_response() {
        let out = parse_sections(WELL_FORMED);
        let s = &out.sections;

        assert_eq!(s.tldr().len(), 3);
        assert_eq!(s.tldr()[0], present("We agreed to ship the beta on Friday."));
        assert_eq!(s.decisions(), &[present("Ship beta Friday"), present("Keep the old cache behind a flag")]);
        assert_eq!(s.risks().latency, present("p99 up 40ms"));
        assert!(s.risks().cost.is_missing());
        assert_eq!(s.next_steps().len(), 2);
        assert_eq!(s.next_steps()[0].owner, present("Dana"));
        assert!(s.next_steps()[1].due.is_missing());
        assert!(out.repairs.is_empty(), "{:?}", out.repairs);
    }

    #[test]
    fn missing_decisions_section_becomes_marker() {
        let raw = WELL_FORMED.replace("2) Decisions:\n- Ship beta Friday\n- Keep the old cache behind a flag\n", "");
        let out = parse_sections(&raw);

        assert_eq!(out.sections.decisions(), &[Field::Missing]);
        assert_eq!(out.sections.tldr().len(), 3);
        assert_eq!(out.sections.next_steps().len(), 2);
        assert!(out.repairs.contains(&ShapeRepair::MissingSection(Section::Decisions)));
    }

    #[test]
    fn absent_due_slot_is_missing() {
        let raw = "4) Next Steps:\n- Task: Draft plan | Owner: Ana\n";
        let out = parse_sections(raw);
        let step = &out.sections.next_steps()[0];
        assert_eq!(step.task, present("Draft plan"));
        assert_eq!(step.owner, present("Ana"));
        assert!(step.due.is_missing());
        assert!(out.repairs.contains(&ShapeRepair::MissingStepField { step: 1, slot: "due" }));
    }

    #[test]
    fn tolerates_markdown_headers_and_bullet_styles() {
        let raw = "\
Here is the summary.
## **TL;DR**
* First point
  that wraps
• Second point
**Decisions:** Go with vendor B
### Risks & Blockers
1. **Reliability:** retries missing
2. Something unlabeled
Next steps:
- Book review meeting (Owner: Lee, Due: May 3)
";
        let out = parse_sections(raw);
        let s = &out.sections;

        assert_eq!(s.tldr(), &[present("First point that wraps"), present("Second point")]);
        assert_eq!(s.decisions(), &[present("Go with vendor B")]);
        assert_eq!(s.risks().reliability, present("retries missing"));
        assert!(s.risks().latency.is_missing());

        let step = &s.next_steps()[0];
        assert_eq!(step.task, present("Book review meeting"));
        assert_eq!(step.owner, present("Lee"));
        assert_eq!(step.due, present("May 3"));

        assert!(out.repairs.contains(&ShapeRepair::StrayPreamble));
        assert!(out.repairs.contains(&ShapeRepair::UnlabeledRisk("Something unlabeled".into())));
        assert!(out.repairs.contains(&ShapeRepair::MissingRisk(RiskCategory::Latency)));
    }

    #[test]
    fn prose_starting_with_section_word_is_not_a_header() {
        let raw = "1) TL;DR:\n- Next steps are unclear\nDecisions were deferred\n";
        let out = parse_sections(raw);
        assert_eq!(out.sections.tldr().len(), 1);
        assert_eq!(
            out.sections.tldr()[0],
            present("Next steps are unclear Decisions were deferred")
        );
        assert_eq!(out.sections.decisions(), &[Field::Missing]);
    }

    #[test]
    fn duplicate_risk_labels_are_joined() {
        let raw = "3) Risks/Blockers:\n- Cost: GPU spend\n- Cost: vendor fees\n";
        let out = parse_sections(raw);
        assert_eq!(out.sections.risks().cost, present("GPU spend; vendor fees"));
    }

    #[test]
    fn empty_response_yields_blank_template() {
        let out = parse_sections("");
        assert_eq!(out.sections, SectionSet::missing());
        assert_eq!(
            out.repairs
                .iter()
                .filter(|r| matches!(r, ShapeRepair::MissingSection(_)))
                .count(),
            4
        );
    }

    #[test]
    fn numbered_bullet_naming_a_section_stays_in_place() {
        let raw = "\
1) TL;DR:
1. Beta ships Friday.
2. Risks: p99 latency regressed.
3. Budget on track.
2) Decisions:
- Ship beta
3) Risks/Blockers:
- Latency: p99 up 40ms
4) Next Steps:
- Task: Fix cache | Owner: Dana | Due: Thu
";
        let out = parse_sections(raw);
        let s = &out.sections;

        assert_eq!(
            s.tldr(),
            &[
                present("Beta ships Friday."),
                present("Risks: p99 latency regressed."),
                present("Budget on track."),
            ]
        );
        assert_eq!(s.risks().latency, present("p99 up 40ms"));
        assert!(!out.repairs.contains(&ShapeRepair::DuplicateSection(Section::RisksBlockers)));
        assert!(!out.repairs.iter().any(|r| matches!(r, ShapeRepair::UnlabeledRisk(_))));
    }

    #[test]
    fn renumbered_bare_header_is_still_a_header() {
        let raw = "1) TL;DR:\n- Short\n2) Risks/Blockers:\n- Cost: GPU spend\n";
        let out = parse_sections(raw);
        assert_eq!(out.sections.risks().cost, present("GPU spend"));
        assert_eq!(out.sections.tldr(), &[present("Short")]);
    }

    #[test]
    fn colon_inside_piped_step_value_is_kept() {
        let raw = "4) Next Steps:\n- Task: Ask the product owner: scope | Owner: Sam | Due: Fri\n";
        let binding = parse_sections(raw);
        let step = &binding.sections.next_steps()[0];
        assert_eq!(step.task, present("Ask the product owner: scope"));
        assert_eq!(step.owner, present("Sam"));
        assert_eq!(step.due, present("Fri"));
    }

    #[test]
    fn dash_separated_step_slots_are_trimmed() {
        let raw = "4) Next Steps:\n- Task: Fix tests - Owner: Dana - Due: Thu\n";
        let binding = parse_sections(raw);
        let step = &binding.sections.next_steps()[0];
        assert_eq!(step.task, present("Fix tests"));
        assert_eq!(step.owner, present("Dana"));
        assert_eq!(step.due, present("Thu"));
    }

    #[test]
    fn emphasis_inside_values_is_verbatim() {
        let raw = "1) TL;DR:\n- Refactor __init__ and **kwargs handling\n- **Whole item bold**\n";
        let out = parse_sections(raw);
        assert_eq!(
            out.sections.tldr(),
            &[present("Refactor __init__ and **kwargs handling"), present("Whole item bold")]
        );
    }

    #[test]
    fn risk_labels_accept_dash_and_qualifier() {
        let raw = "3) Risks/Blockers:\n- Reliability - flaky tests\n- Rollout safety (canary): staged\n- **Cost**: GPU spend\n";
        let out = parse_sections(raw);
        let risks = out.sections.risks();
        assert_eq!(risks.reliability, present("flaky tests"));
        assert_eq!(risks.rollout_safety, present("staged (canary)"));
        assert_eq!(risks.cost, present("GPU spend"));
        assert!(risks.latency.is_missing());
    }

    #[test]
    fn none_counts_as_missing() {
        let raw = "2) Decisions:\n- None\n4) Next Steps:\n- None identified.\n";
        let out = parse_sections(raw);
        assert_eq!(out.sections.decisions(), &[Field::Missing]);
        assert!(out.sections.next_steps()[0].task.is_missing());
    }

    #[test]
    fn parsing_is_deterministic() {
        assert_eq!(parse_sections(WELL_FORMED), parse_sections(WELL_FORMED));
    }

    struct Fixed(&'static str);

    #[async_trait]
    impl TextCompletionService for Fixed {
        async fn complete(&self, prompt: &Prompt) -> Result<String> {
            assert!(prompt.user.contains("--- SOURCE 1"));
            Ok(self.0.to_string())
        }
    }

    struct Down;

    #[async_trait]
    impl TextCompletionService for Down {
        async fn complete(&self, _prompt: &Prompt) -> Result<String> {
            Err(MeetNotesError::completion_retryable("HTTP 503"))
        }
    }

    fn corpus() -> Corpus {
        Corpus::new(vec![SourceRecord::ok(Provenance::Text, "text #1", "notes")]).unwrap()
    }

    #[tokio::test]
    async fn extract_parses_completion() {
        let cancel = CancellationToken::new();
        let out = extract(&corpus(), Mode::Single, &Fixed(WELL_FORMED), Duration::from_secs(1), &cancel)
            .await
            .unwrap();
        assert_eq!(out.sections.decisions().len(), 2);
    }

    #[tokio::test]
    async fn extract_propagates_completion_failure() {
        let cancel = CancellationToken::new();
        let err = extract(&corpus(), Mode::Single, &Down, Duration::from_secs(1), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
