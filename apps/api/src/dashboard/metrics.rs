use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::matching::scorer::finalize_score;
use crate::models::application::{ApplicationStatus, ApplicationWithListingRow};
use crate::models::listing::ListingRow;

pub const RECENT_APPLICATIONS: usize = 5;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub reviewed: i64,
    pub rejected: i64,
}

impl StatusCounts {
    fn record(&mut self, status: &str) {
        match status.parse::<ApplicationStatus>() {
            Ok(ApplicationStatus::Pending) => self.pending += 1,
            Ok(ApplicationStatus::Reviewed) => self.reviewed += 1,
            Ok(ApplicationStatus::Rejected) => self.rejected += 1,
            Err(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingMetrics {
    pub listing_id: Uuid,
    pub title: String,
    pub is_active: bool,
    pub application_count: i64,
    pub pending_count: i64,
    pub average_match_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub total_listings: i64,
    pub active_listings: i64,
    pub total_applications: i64,
    pub status_counts: StatusCounts,
    pub average_match_score: Option<f64>,
    pub listings: Vec<ListingMetrics>,
    pub recent_applications: Vec<ApplicationWithListingRow>,
}

/// Mean of the scored entries; unscored applications are left out.
fn average(scores: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, n) = scores
        .flatten()
        .fold((0.0, 0u32), |(sum, n), s| (sum + s, n + 1));
    if n == 0 {
        None
    } else {
        finalize_score(sum / f64::from(n))
    }
}

/// Builds the dashboard from a business's listings (newest first) and every
/// application against them.
pub fn summarize(
    listings: &[ListingRow],
    mut applications: Vec<ApplicationWithListingRow>,
) -> Dashboard {
    let mut status_counts = StatusCounts::default();
    let mut by_listing: HashMap<Uuid, Vec<&ApplicationWithListingRow>> = HashMap::new();
    for app in &applications {
        status_counts.record(&app.application.status);
        by_listing
            .entry(app.application.listing_id)
            .or_default()
            .push(app);
    }

    let listing_metrics = listings
        .iter()
        .map(|listing| {
            let apps = by_listing.get(&listing.id).map(Vec::as_slice).unwrap_or(&[]);
            ListingMetrics {
                listing_id: listing.id,
                title: listing.title.clone(),
                is_active: listing.is_active,
                application_count: apps.len() as i64,
                pending_count: apps
                    .iter()
                    .filter(|a| a.application.status == ApplicationStatus::Pending.as_str())
                    .count() as i64,
                average_match_score: average(apps.iter().map(|a| a.application.match_score)),
            }
        })
        .collect();

    let average_match_score = average(applications.iter().map(|a| a.application.match_score));
    let total_applications = applications.len() as i64;

    applications.sort_by(|a, b| {
        b.application
            .created_at
            .cmp(&a.application.created_at)
            .then_with(|| a.application.id.cmp(&b.application.id))
    });
    applications.truncate(RECENT_APPLICATIONS);

    Dashboard {
        total_listings: listings.len() as i64,
        active_listings: listings.iter().filter(|l| l.is_active).count() as i64,
        total_applications,
        status_counts,
        average_match_score,
        listings: listing_metrics,
        recent_applications: applications,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::ApplicationRow;
    use chrono::{Duration, Utc};

    fn listing(title: &str, active: bool) -> ListingRow {
        let now = Utc::now();
        ListingRow {
            id: Uuid::new_v4(),
            business_id: Uuid::nil(),
            title: title.to_string(),
            description: String::new(),
            location: None,
            industry: None,
            work_arrangement: "onsite".to_string(),
            employment_type: "full_time".to_string(),
            application_method: "internal".to_string(),
            external_url: None,
            required_skills: vec![],
            preferred_skills: vec![],
            salary_min: None,
            salary_max: None,
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    fn app(
        listing: &ListingRow,
        status: &str,
        score: Option<f64>,
        minutes_ago: i64,
    ) -> ApplicationWithListingRow {
        let at = Utc::now() - Duration::minutes(minutes_ago);
        ApplicationWithListingRow {
            application: ApplicationRow {
                id: Uuid::new_v4(),
                listing_id: listing.id,
                seeker_id: Uuid::new_v4(),
                full_name: format!("applicant {minutes_ago}"),
                email: "a@example.com".to_string(),
                phone: None,
                resume_key: None,
                cover_letter: None,
                status: status.to_string(),
                match_score: score,
                created_at: at,
                updated_at: at,
            },
            listing_title: listing.title.clone(),
        }
    }

    #[test]
    fn test_empty_dashboard() {
        let dash = summarize(&[], vec![]);
        assert_eq!(dash.total_listings, 0);
        assert_eq!(dash.total_applications, 0);
        assert_eq!(dash.average_match_score, None);
        assert!(dash.recent_applications.is_empty());
    }

    #[test]
    fn test_counts_and_averages() {
        let cook = listing("Line Cook", true);
        let host = listing("Host", false);
        let apps = vec![
            app(&cook, "pending", Some(0.8), 1),
            app(&cook, "reviewed", Some(0.4), 2),
            app(&cook, "pending", None, 3),
            app(&host, "rejected", None, 4),
        ];

        let dash = summarize(&[cook.clone(), host.clone()], apps);
        assert_eq!(dash.total_listings, 2);
        assert_eq!(dash.active_listings, 1);
        assert_eq!(dash.total_applications, 4);
        assert_eq!(
            dash.status_counts,
            StatusCounts {
                pending: 2,
                reviewed: 1,
                rejected: 1
            }
        );
        assert_eq!(dash.average_match_score, Some(0.6));

        let cook_metrics = &dash.listings[0];
        assert_eq!(cook_metrics.listing_id, cook.id);
        assert_eq!(cook_metrics.application_count, 3);
        assert_eq!(cook_metrics.pending_count, 2);
        assert_eq!(cook_metrics.average_match_score, Some(0.6));

        let host_metrics = &dash.listings[1];
        assert_eq!(host_metrics.application_count, 1);
        assert_eq!(host_metrics.average_match_score, None);
    }

    #[test]
    fn test_recent_applications_newest_first_and_capped() {
        let cook = listing("Line Cook", true);
        let apps: Vec<_> = (0..8).rev().map(|m| app(&cook, "pending", None, m)).collect();
        let dash = summarize(&[cook], apps);
        assert_eq!(dash.recent_applications.len(), RECENT_APPLICATIONS);
        let names: Vec<_> = dash
            .recent_applications
            .iter()
            .map(|a| a.application.full_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["applicant 0", "applicant 1", "applicant 2", "applicant 3", "applicant 4"]
        );
    }
}
