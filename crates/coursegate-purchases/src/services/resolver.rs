//! Product mapping resolution.

use crate::store::{CatalogStore, StoreResult};
use coursegate_core::{ensure_same_tenant, Platform, TenantId};
use coursegate_db::Course;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone)]
pub enum Resolution {
    /// One or more courses unlocked by the product.
    Mapped(Vec<Course>),
    /// No mapping, or a mapping with no courses attached.
    Unmapped,
}

#[derive(Clone)]
pub struct MappingResolver {
    store: Arc<dyn CatalogStore>,
}

impl MappingResolver {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Exact match on (tenant, platform, external id). The same id string on
    /// another platform is a different product. Linked courses owned by
    /// another tenant are dropped.
    ///
    /// # Errors
    ///
    /// Returns the store error when the mapping lookup fails. An unknown product
    /// is [`Resolution::Unmapped`], not an error.
    pub async fn resolve(
        &self,
        tenant_id: TenantId,
        platform: Platform,
        external_product_id: &str,
    ) -> StoreResult<Resolution> {
        let courses = self
            .store
            .mapped_courses(tenant_id, platform, external_product_id)
            .await?;
        let courses: Vec<Course> = courses
            .into_iter()
            .flatten()
            .filter(|course| match ensure_same_tenant(course, tenant_id) {
                Ok(()) => true,
                Err(e) => {
                    warn!(course_id = %course.id, error = %e, "Skipping course linked across tenants");
                    false
                }
            })
            .collect();

        Ok(if courses.is_empty() {
            Resolution::Unmapped
        } else {
            Resolution::Mapped(courses)
        })
    }
}
