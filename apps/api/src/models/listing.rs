use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

text_enum!(WorkArrangement {
    Onsite => "onsite",
    Remote => "remote",
    Hybrid => "hybrid",
});

text_enum!(EmploymentType {
    FullTime => "full_time",
    PartTime => "part_time",
    Contract => "contract",
    Internship => "internship",
});

text_enum!(
    /// `internal` listings accept applications here; `external` ones link out.
    ApplicationMethod {
        Internal => "internal",
        External => "external",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ListingRow {
    pub id: Uuid,
    pub business_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub work_arrangement: String,
    pub employment_type: String,
    pub application_method: String,
    pub external_url: Option<String>,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ListingRow {
    pub fn accepts_internal_applications(&self) -> bool {
        self.is_active && self.application_method == ApplicationMethod::Internal.as_str()
    }
}

#[cfg(test)]
impl ListingRow {
    /// Minimal internal-apply listing for unit tests.
    pub fn fixture(business_id: Uuid, is_active: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            business_id,
            title: "Backend Engineer".to_string(),
            description: String::new(),
            location: None,
            industry: None,
            work_arrangement: WorkArrangement::Onsite.as_str().to_string(),
            employment_type: EmploymentType::FullTime.as_str().to_string(),
            application_method: ApplicationMethod::Internal.as_str().to_string(),
            external_url: None,
            required_skills: vec![],
            preferred_skills: vec![],
            salary_min: None,
            salary_max: None,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Listing as returned to clients, decorated with viewer-specific fields.
#[derive(Debug, Clone, Serialize)]
pub struct ListingView {
    #[serde(flatten)]
    pub listing: ListingRow,
    /// `null` when the viewer is not a job seeker or the score is not computable.
    pub match_score: Option<f64>,
    pub is_favorite: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_text_round_trip() {
        for arrangement in WorkArrangement::ALL {
            assert_eq!(
                arrangement.as_str().parse::<WorkArrangement>().unwrap(),
                *arrangement
            );
        }
        assert_eq!(
            "full_time".parse::<EmploymentType>().unwrap(),
            EmploymentType::FullTime
        );
        assert!("freelance".parse::<EmploymentType>().is_err());
    }

    #[test]
    fn test_serde_names_match_as_str() {
        let json = serde_json::to_string(&EmploymentType::PartTime).unwrap();
        assert_eq!(json, "\"part_time\"");
    }

    #[test]
    fn test_view_flattens_listing_and_renders_null_score() {
        let listing = ListingRow {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            title: "Backend Engineer".to_string(),
            description: "Build APIs".to_string(),
            location: None,
            industry: None,
            work_arrangement: "remote".to_string(),
            employment_type: "full_time".to_string(),
            application_method: "internal".to_string(),
            external_url: None,
            required_skills: vec!["rust".to_string()],
            preferred_skills: vec![],
            salary_min: None,
            salary_max: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(listing.accepts_internal_applications());
        let json = serde_json::to_value(ListingView {
            listing,
            match_score: None,
            is_favorite: false,
        })
        .unwrap();
        assert_eq!(json["title"], "Backend Engineer");
        assert!(json["match_score"].is_null());
    }
}
