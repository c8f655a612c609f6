//! Provider B: one transaction per delivery, gated on payment status.
//!
//! Order-bump lines carry the main product's id at the root
//! (`product_id`); the add-on's own id lives at `product.id`.

use super::fields::{first_id, non_blank, ExternalId};
use super::{NormalizationError, Normalized, PurchaseEvent};
use serde::Deserialize;

/// Payment statuses that grant access.
pub const APPROVED_STATUSES: [&str; 3] = ["PAID", "AUTHORIZED", "MANUALLY_AUTHORIZED"];

const ORDER_BUMP: &str = "order_bump";

/// Case-insensitive allow-list check.
pub fn is_approved_status(status: &str) -> bool {
    let status = status.trim();
    APPROVED_STATUSES
        .iter()
        .any(|approved| approved.eq_ignore_ascii_case(status))
}

/// Product id for one transaction line.
///
/// For order bumps only the nested id counts; a missing nested id yields
/// `None` rather than falling back to the root id.
pub fn line_product_id(
    item_type: Option<&str>,
    root_product_id: Option<&ExternalId>,
    nested_product_id: Option<&ExternalId>,
) -> Option<String> {
    let is_bump = item_type.is_some_and(|t| t.trim().eq_ignore_ascii_case(ORDER_BUMP));
    if is_bump {
        nested_product_id.and_then(ExternalId::normalized)
    } else {
        first_id(&[root_product_id, nested_product_id])
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderBPayload {
    pub event: Option<String>,
    pub status: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub lastname: Option<String>,
    pub customer: Option<Customer>,
    pub product_id: Option<ExternalId>,
    pub product: Option<NestedProduct>,
    pub item_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NestedProduct {
    pub id: Option<ExternalId>,
}

impl ProviderBPayload {
    pub fn event_name(&self) -> String {
        if let Some(event) = non_blank(self.event.as_deref()) {
            return event;
        }
        match non_blank(self.status.as_deref()) {
            Some(status) => format!("transaction.{}", status.to_lowercase()),
            None => "transaction".to_string(),
        }
    }

    fn display_name(&self) -> Option<String> {
        let customer_name = self.customer.as_ref().and_then(|c| c.name.as_deref());
        non_blank(customer_name).or_else(|| {
            let joined = [self.name.as_deref(), self.lastname.as_deref()]
                .into_iter()
                .flatten()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            non_blank(Some(joined.as_str()))
        })
    }

    pub fn normalize(self) -> Result<Normalized, NormalizationError> {
        let event_name = self.event_name();

        let status = match non_blank(self.status.as_deref()) {
            Some(status) if is_approved_status(&status) => status.to_uppercase(),
            Some(status) => {
                return Ok(Normalized::Ignored {
                    reason: format!("status {status} is not an approved payment status"),
                    event_name,
                });
            }
            None => {
                return Ok(Normalized::Ignored {
                    event_name,
                    reason: "transaction has no payment status".to_string(),
                });
            }
        };

        let customer_email = self.customer.as_ref().and_then(|c| c.email.as_deref());
        let email = non_blank(customer_email)
            .or_else(|| non_blank(self.email.as_deref()))
            .ok_or(NormalizationError::MissingEmail)?;

        let product_id = line_product_id(
            self.item_type.as_deref(),
            self.product_id.as_ref(),
            self.product.as_ref().and_then(|p| p.id.as_ref()),
        )
        .ok_or(NormalizationError::NoProducts)?;

        Ok(Normalized::Actionable(PurchaseEvent {
            display_name: self.display_name(),
            email,
            approval_status: status,
            external_product_ids: vec![product_id],
            raw_event_name: event_name,
        }))
    }
}
