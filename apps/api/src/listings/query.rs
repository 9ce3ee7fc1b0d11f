//! Listing search parameters and their translation into SQL filters.

use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use crate::errors::AppError;
use crate::models::listing::{EmploymentType, WorkArrangement};
use crate::validation::{non_blank, FieldErrors};

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingSort {
    #[default]
    Newest,
    /// Highest match score first; job seekers only.
    Match,
}

/// Raw query-string parameters for `GET /api/v1/listings`.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub q: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub work_arrangement: Option<String>,
    pub employment_type: Option<String>,
    pub sort: Option<ListingSort>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    pub q: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub work_arrangement: Option<WorkArrangement>,
    pub employment_type: Option<EmploymentType>,
    pub sort: ListingSort,
    pub page: u32,
    pub per_page: u32,
}

impl ListingFilter {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }
}

impl TryFrom<ListingQuery> for ListingFilter {
    type Error = AppError;

    fn try_from(query: ListingQuery) -> Result<Self, Self::Error> {
        let mut errs = FieldErrors::new();

        let work_arrangement = non_blank(query.work_arrangement)
            .and_then(|v| errs.parse_enum("work_arrangement", &v, WorkArrangement::ALL));
        let employment_type = non_blank(query.employment_type)
            .and_then(|v| errs.parse_enum("employment_type", &v, EmploymentType::ALL));

        let page = query.page.unwrap_or(1);
        if page == 0 {
            errs.push("page", "must be at least 1");
        }
        let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE);
        if per_page == 0 || per_page > MAX_PER_PAGE {
            errs.push("per_page", format!("must be between 1 and {MAX_PER_PAGE}"));
        }

        errs.into_result()?;

        Ok(ListingFilter {
            q: non_blank(query.q),
            industry: non_blank(query.industry),
            location: non_blank(query.location),
            work_arrangement,
            employment_type,
            sort: query.sort.unwrap_or_default(),
            page,
            per_page,
        })
    }
}

/// Escapes LIKE wildcards so user input matches literally.
fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Appends `WHERE ...` for active listings matching the filter.
pub fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ListingFilter) {
    builder.push(" WHERE is_active = TRUE");

    if let Some(q) = &filter.q {
        let pattern = like_pattern(q);
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(industry) = &filter.industry {
        builder
            .push(" AND LOWER(industry) = LOWER(")
            .push_bind(industry.clone())
            .push(")");
    }
    if let Some(location) = &filter.location {
        builder
            .push(" AND location ILIKE ")
            .push_bind(like_pattern(location));
    }
    if let Some(arrangement) = filter.work_arrangement {
        builder
            .push(" AND work_arrangement = ")
            .push_bind(arrangement.as_str());
    }
    if let Some(employment) = filter.employment_type {
        builder
            .push(" AND employment_type = ")
            .push_bind(employment.as_str());
    }
}

/// Paginated response envelope.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}
