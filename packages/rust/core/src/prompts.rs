//! Prompt templates sent to the completion service.
//!
//! Every prompt shares the same persona block as its system message. The
//! extraction prompt spells out the exact headers the extractor looks for.

use meetnotes_shared::{Corpus, MISSING_MARKER, Mode, RiskCategory, Section};

use crate::completion::Prompt;

/// Persona and guardrails, used as the system message.
pub fn persona() -> String {
    format!(
        "You write in the first person, as the meeting participant who owns these notes.\n\
         Tone: diplomatic, positive, respectful. Be concise. Avoid repetition and unusual words.\n\
         Never use em dashes.\n\
         Do not invent facts. If information is missing, write {MISSING_MARKER}.\n\
         Do not give legal, financial, HR-sensitive or security-sensitive advice; \
         flag such topics for escalation instead."
    )
}

/// The literal output shape the model is asked to produce.
fn output_shape() -> String {
    let risks = RiskCategory::ALL
        .iter()
        .map(|c| format!("- {}: <value or {MISSING_MARKER}>", c.label()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{n1}) {t1}:\n- <bullet>\n- <bullet>\n- <bullet>\n\
         {n2}) {t2}:\n- <bullet or {MISSING_MARKER}>\n\
         {n3}) {t3}:\n{risks}\n\
         {n4}) {t4}:\n- Task: <value or {m}> | Owner: <value or {m}> | Due: <value or {m}>",
        n1 = Section::TlDr.number(),
        t1 = Section::TlDr.title(),
        n2 = Section::Decisions.number(),
        t2 = Section::Decisions.title(),
        n3 = Section::RisksBlockers.number(),
        t3 = Section::RisksBlockers.title(),
        n4 = Section::NextSteps.number(),
        t4 = Section::NextSteps.title(),
        m = MISSING_MARKER,
    )
}

/// Build the section-extraction prompt for a corpus.
pub fn extraction_prompt(corpus: &Corpus, mode: Mode) -> Prompt {
    let scope = match mode {
        Mode::Single => "Summarize the meeting notes below.".to_string(),
        Mode::Weekly => format!(
            "Merge the {} meeting sources below into a single weekly digest.",
            corpus.current_count()
        ),
    };

    let history_rule = if corpus.history_count() > 0 {
        "Sources tagged `history` are earlier conversation turns. Use them as background only; \
         when they conflict with a current source, the current source wins.\n"
    } else {
        ""
    };

    let user = format!(
        "{scope}\n\n\
         Rules:\n\
         - {tldr}: exactly 3 bullets.\n\
         - {decisions}: one bullet per decision.\n\
         - {risks}: consider reliability, latency, cost and rollout safety; use exactly those four labels.\n\
         - {steps}: one line per action item with Task, Owner and Due separated by ` | `.\n\
         - Write {MISSING_MARKER} for anything the sources do not state. Never leave a field blank.\n\
         - When sources disagree, the earlier source takes precedence over the later one.\n\
         {history_rule}\
         \n\
         Reply with exactly this structure and nothing else:\n\
         {shape}\n\n\
         Sources:\n\n\
         {corpus}",
        tldr = Section::TlDr.title(),
        decisions = Section::Decisions.title(),
        risks = Section::RisksBlockers.title(),
        steps = Section::NextSteps.title(),
        shape = output_shape(),
        corpus = corpus.render(),
    );

    Prompt {
        system: persona(),
        user,
    }
}

pub fn introduction_prompt() -> Prompt {
    Prompt {
        system: persona(),
        user: "Introduce yourself as my meeting-notes assistant in exactly 3 sentences, \
               first person. Say that you turn notes, web pages, PDFs and voice recordings \
               into a short summary with decisions, risks and next steps."
            .to_string(),
    }
}

/// Ask for a critique of a code snippet, optionally grounded in search results.
pub fn critique_prompt(code: &str, local_report: &str, background: Option<&str>) -> Prompt {
    let background = background
        .map(|b| format!("\nBackground from a web search:\n{b}\n"))
        .unwrap_or_default();

    Prompt {
        system: persona(),
        user: format!(
            "Review the code below. Point out likely bugs, performance problems and concrete \
             improvements, and name the language. Give specific suggestions.\n\n\
             A quick static scan already found:\n{local_report}\n\
             {background}\n\
             Code:\n```\n{code}\n```"
        ),
    }
}

/// Ask for a plain-language explanation of a code snippet.
pub fn explain_prompt(code: &str) -> Prompt {
    Prompt {
        system: persona(),
        user: format!(
            "Explain what the code below does in simple terms for someone learning to \
             program. Cover what it does, how data flows through it and its main parts.\n\n\
             Code:\n```\n{code}\n```"
        ),
    }
}
