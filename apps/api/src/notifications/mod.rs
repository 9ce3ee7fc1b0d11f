//! In-app notifications. Writers call `notify`/`notify_all` after the
//! triggering change has committed; a failed insert is logged and never
//! fails the request that caused it.

pub mod handlers;

use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::models::application::ApplicationStatus;
use crate::models::notification::NotificationKind;

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub listing_id: Option<Uuid>,
    pub application_id: Option<Uuid>,
}

impl Notice {
    /// Sent to the listing owner when a seeker applies.
    pub fn application_received(
        business_id: Uuid,
        applicant_name: &str,
        listing_title: &str,
        listing_id: Uuid,
        application_id: Uuid,
    ) -> Self {
        Self {
            user_id: business_id,
            kind: NotificationKind::ApplicationReceived,
            message: format!("{applicant_name} applied to \"{listing_title}\"."),
            listing_id: Some(listing_id),
            application_id: Some(application_id),
        }
    }

    /// Sent to the applicant when the business moves their application.
    pub fn status_changed(
        seeker_id: Uuid,
        listing_title: &str,
        status: ApplicationStatus,
        listing_id: Uuid,
        application_id: Uuid,
    ) -> Self {
        let message = match status {
            ApplicationStatus::Pending => {
                format!("Your application to \"{listing_title}\" is pending again.")
            }
            ApplicationStatus::Reviewed => {
                format!("Your application to \"{listing_title}\" has been reviewed.")
            }
            ApplicationStatus::Rejected => {
                format!("Your application to \"{listing_title}\" was not selected.")
            }
        };
        Self {
            user_id: seeker_id,
            kind: NotificationKind::ApplicationStatusChanged,
            message,
            listing_id: Some(listing_id),
            application_id: Some(application_id),
        }
    }

    /// Sent to pending applicants when a listing is deactivated.
    pub fn listing_closed(
        seeker_id: Uuid,
        listing_title: &str,
        listing_id: Uuid,
        application_id: Uuid,
    ) -> Self {
        Self {
            user_id: seeker_id,
            kind: NotificationKind::ListingClosed,
            message: format!("The listing \"{listing_title}\" is no longer accepting applications."),
            listing_id: Some(listing_id),
            application_id: Some(application_id),
        }
    }
}

pub async fn notify(pool: &PgPool, notice: &Notice) {
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, kind, message, listing_id, application_id)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(notice.user_id)
    .bind(notice.kind.as_str())
    .bind(&notice.message)
    .bind(notice.listing_id)
    .bind(notice.application_id)
    .execute(pool)
    .await;

    if let Err(e) = result {
        warn!(
            user_id = %notice.user_id,
            kind = %notice.kind,
            "Failed to record notification: {e}"
        );
    }
}

pub async fn notify_all(pool: &PgPool, notices: &[Notice]) {
    for notice in notices {
        notify(pool, notice).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_changed_message_per_status() {
        let ids = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let reviewed =
            Notice::status_changed(ids.0, "Line Cook", ApplicationStatus::Reviewed, ids.1, ids.2);
        assert_eq!(reviewed.kind, NotificationKind::ApplicationStatusChanged);
        assert!(reviewed.message.contains("reviewed"));
        assert_eq!(reviewed.user_id, ids.0);

        let rejected =
            Notice::status_changed(ids.0, "Line Cook", ApplicationStatus::Rejected, ids.1, ids.2);
        assert!(rejected.message.contains("not selected"));
    }

    #[test]
    fn test_application_received_targets_business() {
        let business = Uuid::new_v4();
        let notice = Notice::application_received(
            business,
            "Dana Ruiz",
            "Barista",
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        assert_eq!(notice.user_id, business);
        assert_eq!(notice.message, "Dana Ruiz applied to \"Barista\".");
    }

    #[test]
    fn test_listing_closed_links_listing() {
        let listing = Uuid::new_v4();
        let notice = Notice::listing_closed(Uuid::new_v4(), "Barista", listing, Uuid::new_v4());
        assert_eq!(notice.kind, NotificationKind::ListingClosed);
        assert_eq!(notice.listing_id, Some(listing));
    }
}
