//! Output formatter: render a [`SectionSet`] in the fixed four-section layout.

use meetnotes_shared::{Section, SectionSet};

/// Render `sections` as text.
///
/// One line per header and per bullet, no blank lines, one trailing newline.
/// The output depends only on `sections`, never on how many sources or
/// which mode produced them.
pub fn format(sections: &SectionSet) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(16);

    for section in Section::ALL {
        lines.push(format!("{}) {}:", section.number(), section.title()));
        match section {
            Section::TlDr => lines.extend(sections.tldr().iter().map(|f| format!("- {f}"))),
            Section::Decisions => lines.extend(sections.decisions().iter().map(|f| format!("- {f}"))),
            Section::RisksBlockers => lines.extend(
                sections
                    .risks()
                    .iter()
                    .map(|(category, f)| format!("- {}: {f}", category.label())),
            ),
            Section::NextSteps => lines.extend(sections.next_steps().iter().map(|s| {
                format!("- Task: {} | Owner: {} | Due: {}", s.task, s.owner, s.due)
            })),
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Every field missing, rendered.
pub fn blank_template() -> String {
    format(&SectionSet::missing())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetnotes_shared::{Field, NextStep, RiskSet};

    fn present(s: &str) -> Field {
        Field::Present(s.into())
    }

    #[test]
    fn blank_template_is_all_markers() {
        assert_eq!(
            blank_template(),
            "\
1) TL;DR:
- [not found]
2) Decisions:
- [not found]
3) Risks/Blockers:
- Reliability: [not found]
- Latency: [not found]
- Cost: [not found]
- Rollout safety: [not found]
4) Next Steps:
- Task: [not found] | Owner: [not found] | Due: [not found]
"
        );
    }

    #[test]
    fn renders_populated_sections_in_fixed_order() {
        let mut risks = RiskSet::missing();
        risks.latency = present("p99 up 40ms");
        let set = SectionSet::new(
            vec![present("a"), present("b"), present("c")],
            vec![present("Ship Friday")],
            risks,
            vec![NextStep {
                task: present("Draft plan"),
                owner: present("Ana"),
                due: Field::Missing,
            }],
        );

        let out = format(&set);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "1) TL;DR:");
        assert_eq!(lines[4], "2) Decisions:");
        assert_eq!(lines[5], "- Ship Friday");
        assert_eq!(lines[8], "- Latency: p99 up 40ms");
        assert_eq!(
            lines.last().copied(),
            Some("- Task: Draft plan | Owner: Ana | Due: [not found]")
        );
        assert!(out.ends_with("]\n") && !out.ends_with("\n\n"));
    }
}
