//! Enrollment writer: the only place enrollments are created.

use crate::store::{EnrollmentStore, StoreResult};
use coursegate_core::{CourseId, UserId, WebhookLogId};
use coursegate_db::{CreateEnrollment, Enrollment, EnrollmentSource};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Result of a grant. `created` is false when the user already had an
/// active enrollment for the course.
#[derive(Debug, Clone)]
pub struct Grant {
    pub enrollment: Enrollment,
    pub created: bool,
}

#[derive(Clone)]
pub struct EnrollmentWriter {
    store: Arc<dyn EnrollmentStore>,
}

impl EnrollmentWriter {
    pub fn new(store: Arc<dyn EnrollmentStore>) -> Self {
        Self { store }
    }

    /// Ensure the user has an ACTIVE enrollment in the course.
    ///
    /// Idempotent: an existing active row is returned as-is. When a
    /// concurrent grant wins the insert, its row is returned with
    /// `created = false`.
    ///
    /// # Errors
    ///
    /// Returns the store error if the lookup or insert fails for any reason other
    /// than losing the race on the active-enrollment index.
    #[instrument(skip(self))]
    pub async fn grant(
        &self,
        user_id: UserId,
        course_id: CourseId,
        source: EnrollmentSource,
        source_id: Option<WebhookLogId>,
    ) -> StoreResult<Grant> {
        if let Some(existing) = self.store.find_active_enrollment(user_id, course_id).await? {
            debug!("Enrollment already active");
            return Ok(Grant {
                enrollment: existing,
                created: false,
            });
        }

        let data = CreateEnrollment {
            user_id: user_id.into_uuid(),
            course_id: course_id.into_uuid(),
            source,
            source_id: source_id.map(WebhookLogId::into_uuid),
        };

        match self.store.create_active_enrollment(data).await {
            Ok(enrollment) => Ok(Grant {
                enrollment,
                created: true,
            }),
            Err(err) if err.is_unique_violation() => {
                debug!("Lost enrollment insert race, returning winner");
                match self.store.find_active_enrollment(user_id, course_id).await? {
                    Some(winner) => Ok(Grant {
                        enrollment: winner,
                        created: false,
                    }),
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryPurchaseStore;

    #[tokio::test]
    async fn test_second_grant_is_noop() {
        let store = Arc::new(InMemoryPurchaseStore::new());
        let writer = EnrollmentWriter::new(store.clone());
        let user = UserId::new();
        let course = CourseId::new();
        let log = WebhookLogId::new();

        let first = writer
            .grant(user, course, EnrollmentSource::Webhook, Some(log))
            .await
            .unwrap();
        assert!(first.created);
        assert_eq!(first.enrollment.progress, 0);
        assert_eq!(first.enrollment.source_id, Some(log.into_uuid()));

        let second = writer
            .grant(user, course, EnrollmentSource::Reconciliation, None)
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.enrollment.id, first.enrollment.id);
        assert_eq!(store.enrollments_for(user).await.len(), 1);
    }

    /// Reports no active row on lookup so the writer always reaches the
    /// insert, as if another task inserted between check and insert.
    struct BlindLookup(InMemoryPurchaseStore, std::sync::atomic::AtomicBool);

    #[async_trait::async_trait]
    impl EnrollmentStore for BlindLookup {
        async fn find_active_enrollment(
            &self,
            user_id: UserId,
            course_id: CourseId,
        ) -> StoreResult<Option<Enrollment>> {
            if self.1.swap(false, std::sync::atomic::Ordering::SeqCst) {
                return Ok(None);
            }
            self.0.find_active_enrollment(user_id, course_id).await
        }

        async fn create_active_enrollment(&self, data: CreateEnrollment) -> StoreResult<Enrollment> {
            self.0.create_active_enrollment(data).await
        }

        async fn active_course_ids(&self, user_id: UserId) -> StoreResult<Vec<CourseId>> {
            self.0.active_course_ids(user_id).await
        }
    }

    #[tokio::test]
    async fn test_lost_insert_race_returns_winner() {
        let inner = InMemoryPurchaseStore::new();
        let user = UserId::new();
        let course = CourseId::new();
        let winner = inner
            .create_active_enrollment(CreateEnrollment {
                user_id: user.into_uuid(),
                course_id: course.into_uuid(),
                source: EnrollmentSource::Webhook,
                source_id: None,
            })
            .await
            .unwrap();

        let store = Arc::new(BlindLookup(inner.clone(), true.into()));
        let writer = EnrollmentWriter::new(store);
        let grant = writer
            .grant(user, course, EnrollmentSource::Webhook, None)
            .await
            .unwrap();

        assert!(!grant.created);
        assert_eq!(grant.enrollment.id, winner.id);
        assert_eq!(inner.enrollments_for(user).await.len(), 1);
    }
}
