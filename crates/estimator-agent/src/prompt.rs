//! Prompt assembly for effort estimates.
//!
//! The model is told to answer only from the retrieved projects; the context
//! block lists each project with its relevance score and metadata.

use estimator_core::ScoredRecord;
use serde_json::Value;

const PREAMBLE: &str = "\
You are an expert software project estimator in the era of AI.
You will ONLY use the retrieved context (past projects) below to answer the user's request.
Do NOT add any assumptions or invent estimates beyond what the retrieved projects show.";

const INSTRUCTIONS: &str = "\
Instructions:
- Provide a realistic effort estimate in hours or days based ONLY on the context.
- Only include work areas present in the retrieved documents.
- Developers today leverage AI tools to speed up their work; consider which AI tools could help reduce effort for this requirement.
- Suggest relevant AI tools for each work area based on the user's requirement (e.g., frontend design, testing, automation, code generation), but do NOT invent unrelated tools.
- Give a confidence level (Low/Medium/High) and justify briefly.
- Keep your response concise, professional, and strictly aligned with the context.

Answer format:
Estimate: <hours/days>
Work Areas: <list of work areas with estimated hours>
AI Tools: <list of relevant AI tools for each work area>
Confidence: <Low/Medium/High>
Justification: <1-2 sentences>";

/// Placeholder used when retrieval found nothing.
pub const NO_CONTEXT: &str = "(no relevant past projects were found)";

/// Render the retrieved records as a numbered context block.
pub fn format_context(sources: &[ScoredRecord]) -> String {
    if sources.is_empty() {
        return NO_CONTEXT.to_string();
    }

    sources
        .iter()
        .enumerate()
        .map(|(idx, source)| source_block(idx + 1, source))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Header line, one `key: value` line per non-null metadata field, then the
/// trimmed text. Every line ends with a newline.
fn source_block(number: usize, source: &ScoredRecord) -> String {
    let header = format!(
        "[{number}] {} (relevance {:.4})",
        source.id().unwrap_or("unknown"),
        source.final_score
    );
    let fields = source
        .metadata()
        .iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some(format!("{key}: {s}")),
            other => Some(format!("{key}: {other}")),
        });

    std::iter::once(header)
        .chain(fields)
        .chain(std::iter::once(source.text().trim().to_string()))
        .map(|line| line + "\n")
        .collect()
}

/// Build the full estimation prompt for a requirement.
pub fn render(requirement: &str, sources: &[ScoredRecord]) -> String {
    format!(
        "{PREAMBLE}\n\nContext (relevant past projects):\n{}\nUser Requirement:\n{}\n\n{INSTRUCTIONS}\n",
        format_context(sources),
        requirement.trim()
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use estimator_core::{CandidateRecord, Metadata};
    use serde_json::json;

    fn source(id: &str, score: f64) -> ScoredRecord {
        let mut metadata = Metadata::new();
        metadata.insert("effort_hours".to_string(), json!(24));
        metadata.insert("source".to_string(), json!("crm"));
        metadata.insert("notes".to_string(), json!(null));
        ScoredRecord {
            record: CandidateRecord::new(Some(id.to_string()), " Billing page \n", metadata),
            final_score: score,
        }
    }

    #[test]
    fn test_format_context_lists_sources_in_order() {
        let ctx = format_context(&[source("a_0", 0.8), source("b_0", 0.5)]);
        let first = ctx.find("[1] a_0 (relevance 0.8000)").unwrap();
        let second = ctx.find("[2] b_0 (relevance 0.5000)").unwrap();
        assert!(first < second);
        assert!(ctx.contains("effort_hours: 24"));
        assert!(ctx.contains("source: crm"));
        assert!(!ctx.contains("notes"));
        assert!(ctx.contains("Billing page\n"));
    }

    #[test]
    fn test_format_context_exact_layout() {
        let ctx = format_context(&[source("a_0", 0.8), source("b_0", 0.5)]);
        assert_eq!(
            ctx,
            "[1] a_0 (relevance 0.8000)\neffort_hours: 24\nsource: crm\nBilling page\n\
             \n\
             [2] b_0 (relevance 0.5000)\neffort_hours: 24\nsource: crm\nBilling page\n"
        );
    }

    #[test]
    fn test_format_context_empty() {
        assert_eq!(format_context(&[]), NO_CONTEXT);
    }

    #[test]
    fn test_render_places_requirement_after_context() {
        let prompt = render("  Build a billing page  ", &[source("a_0", 0.8)]);
        let context_at = prompt.find("Context (relevant past projects):").unwrap();
        let requirement_at = prompt.find("User Requirement:\nBuild a billing page\n").unwrap();
        assert!(context_at < requirement_at);
        assert!(prompt.ends_with("Justification: <1-2 sentences>\n"));
    }
}
