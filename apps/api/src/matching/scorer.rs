//! Match scoring: pluggable, trait-based scorer that measures a job seeker's
//! profile against a listing.
//!
//! Default: `KeywordMatchScorer`, deterministic and free of network calls.
//! `LlmMatchScorer` (see `matching::llm`) keeps the keyword numbers and adds an
//! LLM-written recommendation to single-listing reports.
//!
//! `AppState` holds an `Arc<dyn MatchScorer>`, chosen at startup via config.

use std::cmp::Ordering;
use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::terms::{city_of, contains_term, infer_terms, normalize_term, normalize_text, term_set};

const SKILL_WEIGHT: f64 = 0.7;
const FACTOR_WEIGHT: f64 = 0.3;

const REQUIRED_TERM_WEIGHT: f64 = 1.0;
const PREFERRED_TERM_WEIGHT: f64 = 0.5;
const INFERRED_TERM_WEIGHT: f64 = 1.0;

const SKILL_EVIDENCE_STRENGTH: f64 = 1.0;
const TEXT_EVIDENCE_STRENGTH: f64 = 0.6;

const STRONG_THRESHOLD: f64 = 0.8;
const PARTIAL_THRESHOLD: f64 = 0.4;

// ────────────────────────────────────────────────────────────────────────────
// Inputs
// ────────────────────────────────────────────────────────────────────────────

/// What the scorer knows about a job seeker.
#[derive(Debug, Clone, Default)]
pub struct SeekerSignals {
    pub skills: Vec<String>,
    pub industries: Vec<String>,
    pub preferred_arrangements: Vec<String>,
    pub location: Option<String>,
    /// Headline, bio and extracted resume text, concatenated.
    pub text: String,
}

/// What the scorer knows about a listing.
#[derive(Debug, Clone, Default)]
pub struct ListingSignals {
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub industry: Option<String>,
    pub work_arrangement: String,
    pub location: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Output data models (shared across all scorer backends)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Required,
    Preferred,
    /// Picked out of the title/description because the listing declared no skills.
    Inferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    ProfileSkill,
    ProfileText,
    None,
}

/// One listing requirement and how well the seeker covers it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillMatch {
    pub skill: String,
    pub requirement: RequirementKind,
    pub evidence: Evidence,
    pub strength: f64, // 0.0 – 1.0
}

/// A non-skill dimension that contributed to the score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactorScore {
    pub factor: String,
    pub score: f64,
}

/// Full match report returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    /// 0.0 – 1.0; `None` when not computable (rendered N/A).
    pub score: Option<f64>,
    pub skill_coverage: Option<f64>,
    pub strong_matches: Vec<SkillMatch>,  // strength ≥ 0.8
    pub partial_matches: Vec<SkillMatch>, // 0.4 – 0.79
    pub missing_skills: Vec<String>,      // strength < 0.4
    pub factors: Vec<FactorScore>,
    pub recommendation: String,
    pub scorer_backend: String, // "keyword" | "keyword+llm"
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The match scorer trait. Implement this to swap backends without touching
/// the handlers that surface scores.
///
/// `score` must stay deterministic and cheap: it feeds batch listing pages,
/// the Redis cache and application snapshots.
#[async_trait]
pub trait MatchScorer: Send + Sync {
    fn backend(&self) -> &'static str;

    fn score(&self, seeker: &SeekerSignals, listing: &ListingSignals) -> Option<f64> {
        compute_keyword_match(seeker, listing).score
    }

    async fn report(
        &self,
        seeker: &SeekerSignals,
        listing: &ListingSignals,
    ) -> Result<MatchReport, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// KeywordMatchScorer (default)
// ────────────────────────────────────────────────────────────────────────────

/// Pure-Rust keyword scorer. Fast, deterministic, no LLM call.
///
/// Algorithm:
/// 1. Requirement terms: required skills (weight 1.0), preferred (0.5); when
///    both are empty, vocabulary terms inferred from title + description (1.0).
/// 2. Per term: profile skill → 1.0, whole word in profile text → 0.6, else 0.0.
///    coverage = Σ(strength × weight) / Σ(weight)
/// 3. Factors present on both sides (industry, arrangement, city) score 1 or 0.
/// 4. score = 0.7 × coverage + 0.3 × mean(factors), or coverage alone.
pub struct KeywordMatchScorer;

#[async_trait]
impl MatchScorer for KeywordMatchScorer {
    fn backend(&self) -> &'static str {
        "keyword"
    }

    async fn report(
        &self,
        seeker: &SeekerSignals,
        listing: &ListingSignals,
    ) -> Result<MatchReport, AppError> {
        Ok(compute_keyword_match(seeker, listing))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Core keyword match algorithm
// ────────────────────────────────────────────────────────────────────────────

/// Why a score could not be produced.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Unscorable {
    NoRequirements,
    ProfileIncomplete,
}

pub fn compute_keyword_match(seeker: &SeekerSignals, listing: &ListingSignals) -> MatchReport {
    let terms = requirement_terms(listing);
    if terms.is_empty() {
        return unscorable(Unscorable::NoRequirements);
    }

    let seeker_skills = term_set(&seeker.skills);
    let seeker_text = normalize_text(&seeker.text);
    if seeker_skills.is_empty() && seeker_text.is_empty() {
        return unscorable(Unscorable::ProfileIncomplete);
    }

    let mut strong_matches = Vec::new();
    let mut partial_matches = Vec::new();
    let mut missing_skills = Vec::new();

    let mut total_weight = 0.0_f64;
    let mut total_score = 0.0_f64;

    for (term, kind, weight) in terms {
        total_weight += weight;

        let (evidence, strength) = if seeker_skills.contains(&term) {
            (Evidence::ProfileSkill, SKILL_EVIDENCE_STRENGTH)
        } else if contains_term(&seeker_text, &term) {
            (Evidence::ProfileText, TEXT_EVIDENCE_STRENGTH)
        } else {
            (Evidence::None, 0.0)
        };

        total_score += strength * weight;

        let skill_match = SkillMatch {
            skill: term,
            requirement: kind,
            evidence,
            strength,
        };

        if strength >= STRONG_THRESHOLD {
            strong_matches.push(skill_match);
        } else if strength >= PARTIAL_THRESHOLD {
            partial_matches.push(skill_match);
        } else {
            missing_skills.push(skill_match.skill);
        }
    }

    let coverage = total_score / total_weight;
    let factors = attribute_factors(seeker, listing);
    let raw = if factors.is_empty() {
        coverage
    } else {
        let mean = factors.iter().map(|f| f.score).sum::<f64>() / factors.len() as f64;
        SKILL_WEIGHT * coverage + FACTOR_WEIGHT * mean
    };
    let score = finalize_score(raw);

    let recommendation = build_recommendation(score, &missing_skills);

    MatchReport {
        score,
        skill_coverage: finalize_score(coverage),
        strong_matches,
        partial_matches,
        missing_skills,
        factors,
        recommendation,
        scorer_backend: "keyword".to_string(),
    }
}

/// Clamps to [0, 1] and rounds to 4 decimals. Non-finite input yields `None`.
pub fn finalize_score(raw: f64) -> Option<f64> {
    raw.is_finite()
        .then(|| (raw.clamp(0.0, 1.0) * 10_000.0).round() / 10_000.0)
}

/// Normalized requirement terms with their kind and weight. Required wins
/// over preferred when a skill appears in both lists.
fn requirement_terms(listing: &ListingSignals) -> Vec<(String, RequirementKind, f64)> {
    let mut seen = HashSet::new();
    let mut terms = Vec::new();

    let declared = listing
        .required_skills
        .iter()
        .map(|s| (s, RequirementKind::Required, REQUIRED_TERM_WEIGHT))
        .chain(
            listing
                .preferred_skills
                .iter()
                .map(|s| (s, RequirementKind::Preferred, PREFERRED_TERM_WEIGHT)),
        );

    for (raw, kind, weight) in declared {
        let term = normalize_term(raw);
        if !term.is_empty() && seen.insert(term.clone()) {
            terms.push((term, kind, weight));
        }
    }

    if terms.is_empty() {
        let text = format!("{} {}", listing.title, listing.description);
        for term in infer_terms(&text) {
            if seen.insert(term.clone()) {
                terms.push((term, RequirementKind::Inferred, INFERRED_TERM_WEIGHT));
            }
        }
    }

    terms
}

/// Factors are only present when both sides carry the data.
fn attribute_factors(seeker: &SeekerSignals, listing: &ListingSignals) -> Vec<FactorScore> {
    let mut factors = Vec::new();

    if let Some(industry) = listing.industry.as_deref().map(normalize_term) {
        let wanted = term_set(&seeker.industries);
        if !industry.is_empty() && !wanted.is_empty() {
            factors.push(FactorScore {
                factor: "industry".to_string(),
                score: if wanted.contains(&industry) { 1.0 } else { 0.0 },
            });
        }
    }

    let arrangement = normalize_term(&listing.work_arrangement);
    let preferred = term_set(&seeker.preferred_arrangements);
    if !arrangement.is_empty() && !preferred.is_empty() {
        factors.push(FactorScore {
            factor: "work_arrangement".to_string(),
            score: if preferred.contains(&arrangement) { 1.0 } else { 0.0 },
        });
    }

    if arrangement != "remote" {
        let listing_city = listing.location.as_deref().and_then(city_of);
        let seeker_city = seeker.location.as_deref().and_then(city_of);
        if let (Some(a), Some(b)) = (listing_city, seeker_city) {
            factors.push(FactorScore {
                factor: "location".to_string(),
                score: if a == b { 1.0 } else { 0.0 },
            });
        }
    }

    factors
}

fn unscorable(reason: Unscorable) -> MatchReport {
    let recommendation = match reason {
        Unscorable::NoRequirements => {
            "This listing does not declare any skills to match against.".to_string()
        }
        Unscorable::ProfileIncomplete => {
            "Add skills or upload a resume to your profile to see a match score.".to_string()
        }
    };
    MatchReport {
        score: None,
        skill_coverage: None,
        strong_matches: vec![],
        partial_matches: vec![],
        missing_skills: vec![],
        factors: vec![],
        recommendation,
        scorer_backend: "keyword".to_string(),
    }
}

/// Builds a human-readable recommendation string from score and missing skills.
fn build_recommendation(score: Option<f64>, missing: &[String]) -> String {
    let Some(score) = score else {
        return "A match score could not be computed.".to_string();
    };
    let percent = (score * 100.0).round() as u32;
    let top_missing = missing.iter().take(3).cloned().collect::<Vec<_>>().join(", ");

    if score >= 0.8 {
        "Strong match. Your profile covers the key requirements of this listing.".to_string()
    } else if score >= 0.6 {
        if top_missing.is_empty() {
            format!("Moderate match ({percent}%). Consider listing the matching skills explicitly on your profile.")
        } else {
            format!("Moderate match ({percent}%). Consider adding: {top_missing}.")
        }
    } else if top_missing.is_empty() {
        format!("Low match ({percent}%). The listing's preferences differ from yours.")
    } else {
        format!("Low match ({percent}%). Missing skills: {top_missing}.")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Ranking
// ────────────────────────────────────────────────────────────────────────────

/// Orders by score descending with `None` last, then newest first, then id.
pub fn compare_ranked(
    a: (Option<f64>, DateTime<Utc>, Uuid),
    b: (Option<f64>, DateTime<Utc>, Uuid),
) -> Ordering {
    let by_score = match (a.0, b.0) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_score
        .then_with(|| b.1.cmp(&a.1))
        .then_with(|| a.2.cmp(&b.2))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn seeker(skills: &[&str], text: &str) -> SeekerSignals {
        SeekerSignals {
            skills: skills.iter().map(|s| s.to_string()).collect(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    fn listing(required: &[&str], preferred: &[&str]) -> ListingSignals {
        ListingSignals {
            title: "Engineer".to_string(),
            description: "Build things".to_string(),
            required_skills: required.iter().map(|s| s.to_string()).collect(),
            preferred_skills: preferred.iter().map(|s| s.to_string()).collect(),
            industry: None,
            work_arrangement: "onsite".to_string(),
            location: None,
        }
    }

    #[test]
    fn test_perfect_skill_match_scores_one() {
        let report = compute_keyword_match(
            &seeker(&["Rust", "PostgreSQL"], ""),
            &listing(&["rust", "postgres"], &[]),
        );
        assert_eq!(report.score, Some(1.0));
        assert_eq!(report.strong_matches.len(), 2);
        assert!(report.missing_skills.is_empty());
        assert!(report.recommendation.contains("Strong match"));
    }

    #[test]
    fn test_text_evidence_is_partial() {
        let report = compute_keyword_match(
            &seeker(&[], "Five years running Kubernetes clusters in production"),
            &listing(&["kubernetes"], &[]),
        );
        assert_eq!(report.partial_matches.len(), 1);
        assert_eq!(report.partial_matches[0].evidence, Evidence::ProfileText);
        assert_eq!(report.score, Some(0.6));
    }

    #[test]
    fn test_no_match_lists_missing_skill() {
        let report = compute_keyword_match(&seeker(&["python"], ""), &listing(&["rust"], &[]));
        assert_eq!(report.score, Some(0.0));
        assert_eq!(report.missing_skills, vec!["rust".to_string()]);
        assert!(report.recommendation.contains("rust"));
    }

    #[test]
    fn test_preferred_skills_weigh_half() {
        // required covered (1.0 * 1.0), preferred missing (0.0 * 0.5) → 1.0 / 1.5
        let report = compute_keyword_match(
            &seeker(&["rust"], ""),
            &listing(&["rust"], &["kafka"]),
        );
        assert_eq!(report.score, Some(0.6667));
    }

    #[test]
    fn test_required_wins_over_preferred_duplicate() {
        let terms = requirement_terms(&listing(&["Rust"], &["rust", "go"]));
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].1, RequirementKind::Required);
        assert_eq!(terms[1].0, "go");
    }

    #[test]
    fn test_listing_without_skills_infers_from_description() {
        let mut l = listing(&[], &[]);
        l.description = "You will maintain our Django and PostgreSQL backend.".to_string();
        let report = compute_keyword_match(&seeker(&["django"], ""), &l);
        assert_eq!(report.strong_matches[0].requirement, RequirementKind::Inferred);
        assert_eq!(report.score, Some(0.5));
    }

    #[test]
    fn test_listing_without_any_terms_is_not_computable() {
        let mut l = listing(&[], &[]);
        l.title = "Team member".to_string();
        l.description = "Join our friendly team".to_string();
        let report = compute_keyword_match(&seeker(&["rust"], ""), &l);
        assert_eq!(report.score, None);
        assert!(report.recommendation.contains("does not declare"));
    }

    #[test]
    fn test_empty_profile_is_not_computable() {
        let report = compute_keyword_match(&seeker(&[], "   "), &listing(&["rust"], &[]));
        assert_eq!(report.score, None);
        assert_eq!(report.skill_coverage, None);
        assert!(report.recommendation.contains("profile"));
    }

    #[test]
    fn test_factors_blend_with_coverage() {
        let s = SeekerSignals {
            skills: vec!["rust".to_string()],
            industries: vec!["Fintech".to_string()],
            preferred_arrangements: vec!["remote".to_string()],
            location: Some("Austin, TX".to_string()),
            text: String::new(),
        };
        let mut l = listing(&["rust"], &[]);
        l.industry = Some("fintech".to_string());
        l.work_arrangement = "onsite".to_string();
        l.location = Some("Austin".to_string());

        let report = compute_keyword_match(&s, &l);
        // industry 1, arrangement 0, location 1 → mean 2/3
        assert_eq!(report.factors.len(), 3);
        assert_eq!(report.score, Some(0.9));
    }

    #[test]
    fn test_remote_listing_ignores_location() {
        let s = SeekerSignals {
            skills: vec!["rust".to_string()],
            location: Some("Berlin".to_string()),
            ..Default::default()
        };
        let mut l = listing(&["rust"], &[]);
        l.work_arrangement = "remote".to_string();
        l.location = Some("New York".to_string());
        let report = compute_keyword_match(&s, &l);
        assert!(report.factors.iter().all(|f| f.factor != "location"));
        assert_eq!(report.score, Some(1.0));
    }

    #[test]
    fn test_score_bounded_and_finite() {
        assert_eq!(finalize_score(f64::NAN), None);
        assert_eq!(finalize_score(f64::INFINITY), None);
        assert_eq!(finalize_score(1.7), Some(1.0));
        assert_eq!(finalize_score(-0.2), Some(0.0));
        assert_eq!(finalize_score(0.123456), Some(0.1235));
    }

    #[test]
    fn test_trait_score_matches_report() {
        let scorer = KeywordMatchScorer;
        let s = seeker(&["rust"], "");
        let l = listing(&["rust"], &["sql"]);
        let report = block_on(scorer.report(&s, &l)).unwrap();
        assert_eq!(scorer.score(&s, &l), report.score);
        assert_eq!(scorer.backend(), "keyword");
    }

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn test_compare_ranked_puts_none_last_and_breaks_ties() {
        let now = Utc::now();
        let older = now - Duration::days(1);
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);

        let mut items = vec![
            (None, now, a),
            (Some(0.5), older, a),
            (Some(0.9), older, b),
            (Some(0.5), now, b),
        ];
        items.sort_by(|x, y| compare_ranked(*x, *y));

        assert_eq!(items[0].0, Some(0.9));
        assert_eq!(items[1], (Some(0.5), now, b));
        assert_eq!(items[2], (Some(0.5), older, a));
        assert_eq!(items[3].0, None);
    }

    #[test]
    fn test_recommendation_moderate_lists_missing() {
        let rec = build_recommendation(Some(0.65), &["kafka".to_string()]);
        assert!(rec.contains("65%"));
        assert!(rec.contains("kafka"));
    }

    #[test]
    fn test_recommendation_low_score() {
        let rec = build_recommendation(Some(0.3), &["rust".to_string()]);
        assert!(rec.contains("30%"));
        assert!(rec.contains("rust"));
    }
}
