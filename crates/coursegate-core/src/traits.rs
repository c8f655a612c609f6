//! Tenant scoping.
//!
//! Every row this engine writes belongs to exactly one tenant. Types that
//! carry a tenant implement [`TenantAware`], and [`ensure_same_tenant`] is
//! the single check used before an operation crosses from one record to
//! another (for example, granting a course to a user).

use crate::error::{CoursegateError, Result};
use crate::ids::TenantId;

/// An entity owned by a tenant.
pub trait TenantAware {
    fn tenant_id(&self) -> TenantId;
}

/// Fails with [`CoursegateError::TenantMismatch`] unless `entity` belongs to
/// `expected`.
///
/// ```
/// use coursegate_core::{ensure_same_tenant, TenantAware, TenantId};
///
/// struct Course {
///     tenant_id: TenantId,
/// }
///
/// impl TenantAware for Course {
///     fn tenant_id(&self) -> TenantId {
///         self.tenant_id
///     }
/// }
///
/// let tenant = TenantId::new();
/// let course = Course { tenant_id: tenant };
/// assert!(ensure_same_tenant(&course, tenant).is_ok());
/// assert!(ensure_same_tenant(&course, TenantId::new()).is_err());
/// ```
pub fn ensure_same_tenant<T: TenantAware + ?Sized>(entity: &T, expected: TenantId) -> Result<()> {
    let actual = entity.tenant_id();
    if actual == expected {
        Ok(())
    } else {
        Err(CoursegateError::TenantMismatch { expected, actual })
    }
}
