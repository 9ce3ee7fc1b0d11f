//! LLM-assisted scorer: keyword numbers, LLM-written recommendation.

use async_trait::async_trait;
use tracing::warn;

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::matching::prompts::MATCH_SUMMARY_PROMPT_TEMPLATE;
use crate::matching::scorer::{
    compute_keyword_match, ListingSignals, MatchReport, MatchScorer, SeekerSignals,
};

const PROFILE_EXCERPT_CHARS: usize = 2_000;

/// Keeps the numeric score deterministic so batch pages, cached values and
/// single-listing reports always agree; only the prose comes from the LLM.
pub struct LlmMatchScorer(pub LlmClient);

#[async_trait]
impl MatchScorer for LlmMatchScorer {
    fn backend(&self) -> &'static str {
        "keyword+llm"
    }

    async fn report(
        &self,
        seeker: &SeekerSignals,
        listing: &ListingSignals,
    ) -> Result<MatchReport, AppError> {
        let mut report = compute_keyword_match(seeker, listing);
        if report.score.is_none() {
            return Ok(report);
        }

        let prompt = build_prompt(&report, seeker, listing);
        match self.0.match_summary(&prompt).await {
            Ok(summary) => {
                report.recommendation = summary;
                report.scorer_backend = self.backend().to_string();
            }
            Err(e) => warn!("LLM match summary failed, keeping keyword recommendation: {e}"),
        }
        Ok(report)
    }
}

fn join_or_none(items: impl Iterator<Item = String>) -> String {
    let joined = items.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "none".to_string()
    } else {
        joined
    }
}

fn build_prompt(report: &MatchReport, seeker: &SeekerSignals, listing: &ListingSignals) -> String {
    let score_percent = report
        .score
        .map(|s| ((s * 100.0).round() as u32).to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let excerpt: String = seeker.text.chars().take(PROFILE_EXCERPT_CHARS).collect();
    let strong = join_or_none(report.strong_matches.iter().map(|m| m.skill.clone()));
    let partial = join_or_none(report.partial_matches.iter().map(|m| m.skill.clone()));
    let missing = join_or_none(report.missing_skills.iter().cloned());
    let factors = join_or_none(
        report
            .factors
            .iter()
            .map(|f| format!("{}={}", f.factor, f.score)),
    );

    fill_template(
        MATCH_SUMMARY_PROMPT_TEMPLATE,
        &[
            ("title", listing.title.as_str()),
            ("score_percent", &score_percent),
            ("strong", &strong),
            ("partial", &partial),
            ("missing", &missing),
            ("factors", &factors),
            ("profile_excerpt", excerpt.trim()),
        ],
    )
}

/// Replaces `{name}` placeholders in a single pass over the template.
/// Substituted values are never rescanned, so braces typed by users
/// in listing titles or profile text come through literally.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
