//! Match scoring between job-seeker profiles and listings.
//!
//! List views call `score_listings` once per page so clients never need a
//! per-listing score request; single-listing views use `MatchScorer::report`.

pub mod cache;
pub mod handlers;
pub mod llm;
pub mod prompts;
pub mod scorer;
pub mod terms;

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::matching::cache::{cache_key, MatchScoreCache};
use crate::matching::scorer::{ListingSignals, MatchScorer, SeekerSignals};
use crate::models::listing::ListingRow;
use crate::models::profile::SeekerProfileRow;

impl From<&SeekerProfileRow> for SeekerSignals {
    fn from(profile: &SeekerProfileRow) -> Self {
        let text = [
            profile.headline.as_deref(),
            profile.bio.as_deref(),
            profile.resume_text.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n");

        Self {
            skills: profile.skills.clone(),
            industries: profile.industries.clone(),
            preferred_arrangements: profile.preferred_arrangements.clone(),
            location: profile.location.clone(),
            text,
        }
    }
}

impl From<&ListingRow> for ListingSignals {
    fn from(listing: &ListingRow) -> Self {
        Self {
            title: listing.title.clone(),
            description: listing.description.clone(),
            required_skills: listing.required_skills.clone(),
            preferred_skills: listing.preferred_skills.clone(),
            industry: listing.industry.clone(),
            work_arrangement: listing.work_arrangement.clone(),
            location: listing.location.clone(),
        }
    }
}

pub async fn load_seeker_profile(
    pool: &PgPool,
    seeker_id: Uuid,
) -> Result<Option<SeekerProfileRow>, sqlx::Error> {
    sqlx::query_as::<_, SeekerProfileRow>("SELECT * FROM seeker_profiles WHERE user_id = $1")
        .bind(seeker_id)
        .fetch_optional(pool)
        .await
}

/// Scores a batch of listings for one seeker: one cache read, in-process
/// scoring of the misses, one cache write.
pub async fn score_listings(
    scorer: &dyn MatchScorer,
    cache: &MatchScoreCache,
    profile: &SeekerProfileRow,
    listings: &[ListingRow],
) -> HashMap<Uuid, Option<f64>> {
    let keys: Vec<String> = listings
        .iter()
        .map(|l| cache_key(profile.user_id, profile.updated_at, l.id, l.updated_at))
        .collect();
    let cached = cache.get_many(&keys).await;

    let seeker = SeekerSignals::from(profile);
    let mut scores = HashMap::with_capacity(listings.len());
    let mut fresh = Vec::new();

    for ((listing, key), hit) in listings.iter().zip(keys).zip(cached) {
        let score = match hit {
            Some(score) => score,
            None => {
                let score = scorer.score(&seeker, &ListingSignals::from(listing));
                fresh.push((key, score));
                score
            }
        };
        scores.insert(listing.id, score);
    }

    tracing::debug!(
        seeker_id = %profile.user_id,
        total = listings.len(),
        computed = fresh.len(),
        "Scored listing batch"
    );

    cache.put_many(&fresh).await;
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::scorer::KeywordMatchScorer;
    use chrono::Utc;

    fn profile(skills: &[&str]) -> SeekerProfileRow {
        SeekerProfileRow {
            user_id: Uuid::new_v4(),
            headline: Some("Backend developer".to_string()),
            bio: None,
            location: None,
            phone: None,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            industries: vec![],
            preferred_arrangements: vec![],
            years_experience: None,
            resume_key: None,
            resume_text: Some("Shipped Kafka pipelines".to_string()),
            updated_at: Utc::now(),
        }
    }

    fn listing(required: &[&str]) -> ListingRow {
        ListingRow {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            title: "Engineer".to_string(),
            description: "Build things".to_string(),
            location: None,
            industry: None,
            work_arrangement: "remote".to_string(),
            employment_type: "full_time".to_string(),
            application_method: "internal".to_string(),
            external_url: None,
            required_skills: required.iter().map(|s| s.to_string()).collect(),
            preferred_skills: vec![],
            salary_min: None,
            salary_max: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_seeker_signals_join_profile_text() {
        let signals = SeekerSignals::from(&profile(&["rust"]));
        assert!(signals.text.contains("Backend developer"));
        assert!(signals.text.contains("Kafka"));
    }

    #[tokio::test]
    async fn test_score_listings_without_cache_scores_every_listing() {
        let cache = MatchScoreCache::disabled();
        let p = profile(&["rust"]);
        let listings = vec![listing(&["rust"]), listing(&["kafka"]), listing(&[])];

        let scores = score_listings(&KeywordMatchScorer, &cache, &p, &listings).await;

        assert_eq!(scores.len(), 3);
        assert_eq!(scores[&listings[0].id], Some(1.0));
        assert_eq!(scores[&listings[1].id], Some(0.6));
        assert_eq!(scores[&listings[2].id], None);
    }
}
