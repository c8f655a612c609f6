//! Row models.

pub mod course;
pub mod enrollment;
pub mod integration;
pub mod product_mapping;
pub mod tenant;
pub mod user;
pub mod webhook_log;

pub use course::{Course, CourseStatus, CreateCourse};
pub use enrollment::{CreateEnrollment, Enrollment, EnrollmentSource, EnrollmentStatus};
pub use integration::Integration;
pub use product_mapping::ProductMapping;
pub use tenant::Tenant;
pub use user::{normalize_email, CreateUser, User};
pub use webhook_log::{
    CreateWebhookLog, WebhookLog, WebhookLogFilter, WebhookLogStatus,
};
