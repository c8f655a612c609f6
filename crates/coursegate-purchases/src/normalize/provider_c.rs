//! Provider C: order lifecycle events; only `order.paid` grants access.
//!
//! ```json
//! { "event": "order.paid",
//!   "data": { "order": {
//!       "customer": { "email": "...", "full_name": "..." },
//!       "items": [ { "sku_code": "...", "product_id": "...", "id": "..." } ] } } }
//! ```

use super::fields::{first_id, non_blank, unique_ids, ExternalId};
use super::{NormalizationError, Normalized, PurchaseEvent};
use serde::Deserialize;

pub const ORDER_PAID: &str = "order.paid";

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderCPayload {
    pub event: Option<String>,
    pub data: Option<Data>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Data {
    pub order: Option<Order>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub customer: Option<Customer>,
    pub items: Option<Vec<Item>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub email: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub sku_code: Option<ExternalId>,
    pub product_id: Option<ExternalId>,
    pub id: Option<ExternalId>,
}

impl Item {
    fn external_id(&self) -> Option<String> {
        first_id(&[
            self.sku_code.as_ref(),
            self.product_id.as_ref(),
            self.id.as_ref(),
        ])
    }
}

impl ProviderCPayload {
    pub fn event_name(&self) -> String {
        non_blank(self.event.as_deref()).unwrap_or_else(|| "unknown".to_string())
    }

    pub fn normalize(self) -> Result<Normalized, NormalizationError> {
        let event_name = self.event_name();
        if !event_name.eq_ignore_ascii_case(ORDER_PAID) {
            return Ok(Normalized::Ignored {
                reason: format!("event {event_name} does not grant access"),
                event_name,
            });
        }

        let order = self.data.and_then(|d| d.order);
        let customer = order.as_ref().and_then(|o| o.customer.as_ref());

        let email = non_blank(customer.and_then(|c| c.email.as_deref()))
            .ok_or(NormalizationError::MissingEmail)?;
        let display_name = non_blank(customer.and_then(|c| c.full_name.as_deref()));

        let ids = unique_ids(
            order
                .iter()
                .flat_map(|o| o.items.iter().flatten())
                .filter_map(Item::external_id),
        );
        if ids.is_empty() {
            return Err(NormalizationError::NoProducts);
        }

        Ok(Normalized::Actionable(PurchaseEvent {
            email,
            display_name,
            approval_status: "PAID".to_string(),
            external_product_ids: ids,
            raw_event_name: event_name,
        }))
    }
}
