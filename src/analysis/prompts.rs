//! Prompt templates and fallback placeholder texts.
//!
//! Each prompt opens with a fixed task line so responses and logs can be
//! attributed to a stage.

use crate::models::{KeyEvent, SearchResult};
use crate::utils::truncate_chars;
use std::fmt::Write;

pub const OVERVIEW_TASK: &str =
    "Task: analyse the news headlines below with the given framework and write a professional daily overview.";
pub const EXTRACTION_TASK: &str =
    "You are a professional news editor. Extract the most important events from the news analysis below.";
pub const DEEP_DIVE_TASK: &str =
    "Task: analyse the news event below with the given framework, using the related information when provided.";
pub const SYNTHESIS_TASK: &str =
    "Task: combine the news overview and the key event analyses below into comprehensive insights and advice.";

/// Stage-1 output when the batch is empty.
pub const EMPTY_INPUT_OVERVIEW: &str =
    "# Daily Overview\n\n## Today's Summary\nNo news items were available for this run.";

/// Stage-1 output when generation failed. Its only key-event bullet is below
/// the event length threshold, so extraction moves on to the AI tier.
pub const OVERVIEW_FAILED: &str = "# Daily Overview\n\n## Today's Summary\nOverview generation failed; fallback text in use.\n\n## Categories\n- General\n- Unsorted\n\n## Key Events\n- Failed";

/// Stage-3 output when every synthesis attempt failed.
pub const SYNTHESIS_FAILED: &str = "# Synthesis\n\nSynthesis failed; fallback text in use.";

/// Stands in for the per-event analyses in the degraded synthesis prompt.
const ANALYSES_UNAVAILABLE: &str =
    "## Event analyses\nEvent analyses unavailable; synthesize from the overview alone.\n\n";

const DEEP_DIVE_FRAMEWORK: &str = r#"Framework:

[event headline] (as a level-1 heading)

1. Objective facts
   1. Who did what, where and when.
   2. What is the background.

2. Overall assessment
   1. What is the key point or highlight?
   2. What is the level of impact?
   3. Is it good, bad, neutral, risky, or not worth attention?
   4. What is the most direct driver?
   5. What should a reader do after seeing it?

3. Causes
   1. Events with a clear actor (person, company, industry body, regulator): find the motive.
   2. Events without a clear actor (data releases, objective events): explain the mechanism.

4. Forward projection
   1. Project where this goes based on past and present information. Take a clear position.

5. What individuals can do
   Consider investment, consumption, employment and daily life.

Requirements:
- Use exactly these sections in this order, each as a level-2 heading
- Do not add any other headings, notes or structure
- Output markdown without code blocks
- The first line is a concise headline of the event as a level-1 heading; use the real headline, not the placeholder"#;

const SYNTHESIS_FRAMEWORK: &str = r#"Think through four sections:
- Insight
- Investment implications
- Personal development
- Opportunities and risks

Requirements:
- Output markdown
- Use a level-2 heading for each of the four sections
- Do not bold the headings"#;

/// The stage-1 prompt. `marker` is the text the key-events heading must carry.
pub fn overview_prompt(marker: &str, titles_markdown: &str) -> String {
    format!(
        r#"{OVERVIEW_TASK}

Framework:
- Today's Summary
- Politics
- Macro Economy
- Industry
    - Policy
    - Technology Breakthroughs
    - Supply & Demand
    - Industry Leaders
- Technology
    - Frontier Tech
    - Consumer Electronics
    - Internet & Software
- {marker}

Checklist:
- Output markdown
- Use level-2 headings for the six top-level sections; use level-3 headings for the sub-sections of Industry and Technology
- If a section has no news, write "No news"
- Today's Summary describes the day in one or two plain sentences without categories
- Do not add headings or notes before or after the framework
- Do not use bold or italic

{marker} requirements (strict):
- Pick the 3 most important events across politics, economy, technology and business
- Every event must appear in the headlines; do not invent anything
- Summarize each event in one short sentence of about 10-20 words
- Use exactly this format:
## {marker}
- event description
- event description
- event description

Headlines:
{titles_markdown}"#
    )
}

/// The AI fallback extraction prompt. `summary` should already be truncated.
pub fn extraction_prompt(summary: &str, max_events: usize) -> String {
    format!(
        r#"{EXTRACTION_TASK}

Rules:
1. Weigh politics, economy, technology, business and finance; pick the {max_events} most important events
2. Output exactly {max_events} events, no more and no fewer
3. Every event must be stated in the text; never invent anything
4. Summarize each event in one short sentence of about 10-20 words

Output format (strict):
- event description
- event description
- event description

Example:
- A head of state announces a major economic policy
- The central bank cuts rates by 25 basis points
- A company releases a new generation of AI accelerator chips

News analysis:
=====================================
{summary}
=====================================

Extract {max_events} key events (format only, no commentary):"#
    )
}

/// Deep-dive prompt without enrichment.
pub fn deep_dive_prompt(event: &KeyEvent) -> String {
    format!("{DEEP_DIVE_TASK}\n\n{DEEP_DIVE_FRAMEWORK}\n\nEvent: {event}")
}

/// Deep-dive prompt with search hits appended as an annotated list.
///
/// Without hits this is identical to [`deep_dive_prompt`].
pub fn enriched_deep_dive_prompt(
    event: &KeyEvent,
    hits: &[SearchResult],
    snippet_chars: usize,
) -> String {
    let mut prompt = deep_dive_prompt(event);
    if hits.is_empty() {
        return prompt;
    }
    prompt.push_str("\n\nRelated information:\n");
    for (i, hit) in hits.iter().enumerate() {
        let _ = writeln!(prompt, "{}. [{}]({})", i + 1, hit.title, hit.url);
        if !hit.snippet.is_empty() {
            let _ = writeln!(
                prompt,
                "   Summary: {}...",
                truncate_chars(&hit.snippet, snippet_chars)
            );
        }
    }
    prompt
}

/// Full stage-3 prompt embedding the overview and every analysis.
pub fn synthesis_prompt(overview: &str, analyses: &[String]) -> String {
    let mut prompt = synthesis_head(overview);
    for (i, analysis) in analyses.iter().enumerate() {
        let _ = write!(prompt, "## Event {} analysis\n{}\n\n", i + 1, analysis);
    }
    prompt
}

/// Stage-3 prompt with the analyses replaced by a placeholder.
pub fn degraded_synthesis_prompt(overview: &str) -> String {
    let mut prompt = synthesis_head(overview);
    prompt.push_str(ANALYSES_UNAVAILABLE);
    prompt
}

fn synthesis_head(overview: &str) -> String {
    format!(
        "{SYNTHESIS_TASK}\n\n{SYNTHESIS_FRAMEWORK}\n\n# Overview\n{overview}\n\n# Key event analyses\n"
    )
}

/// Longest error excerpt kept in a deep-dive failure placeholder.
const FAILURE_DETAIL_CHARS: usize = 300;

/// Text recorded for an event whose every analysis attempt failed.
///
/// The error text is cut to a short excerpt, since the placeholder is later
/// embedded in the full synthesis prompt.
pub fn deep_dive_failed(error: &str) -> String {
    format!(
        "# Analysis failed\n\n{}",
        truncate_chars(error, FAILURE_DETAIL_CHARS)
    )
}
