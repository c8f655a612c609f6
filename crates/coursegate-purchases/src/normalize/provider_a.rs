//! Provider A: every delivery is a completed purchase.
//!
//! ```json
//! { "event": "purchase",
//!   "customer": { "email": "...", "name": "..." },
//!   "products": [ { "id": "..." } ] }
//! ```

use super::fields::{non_blank, unique_ids, ExternalId};
use super::{NormalizationError, Normalized, PurchaseEvent};
use serde::Deserialize;

pub(crate) const DEFAULT_EVENT: &str = "purchase";

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderAPayload {
    pub event: Option<String>,
    pub customer: Option<Customer>,
    pub products: Option<Vec<Product>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: Option<ExternalId>,
}

impl ProviderAPayload {
    pub fn event_name(&self) -> String {
        non_blank(self.event.as_deref()).unwrap_or_else(|| DEFAULT_EVENT.to_string())
    }

    pub fn normalize(self) -> Result<Normalized, NormalizationError> {
        let raw_event_name = self.event_name();
        let customer = self.customer.as_ref();

        let email = non_blank(customer.and_then(|c| c.email.as_deref()))
            .ok_or(NormalizationError::MissingEmail)?;
        let display_name = non_blank(customer.and_then(|c| c.name.as_deref()));

        let ids = unique_ids(
            self.products
                .iter()
                .flatten()
                .filter_map(|p| p.id.as_ref().and_then(ExternalId::normalized)),
        );
        if ids.is_empty() {
            return Err(NormalizationError::NoProducts);
        }

        Ok(Normalized::Actionable(PurchaseEvent {
            email,
            display_name,
            approval_status: "APPROVED".to_string(),
            external_product_ids: ids,
            raw_event_name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> ProviderAPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_extracts_customer_and_products() {
        let payload = parse(json!({
            "event": "purchase.completed",
            "customer": { "email": "ana@example.com", "name": "Ana Souza" },
            "products": [ { "id": "P1" }, { "id": 22 }, { "id": "P1" } ]
        }));

        let Normalized::Actionable(event) = payload.normalize().unwrap() else {
            panic!("expected actionable event");
        };
        assert_eq!(event.email, "ana@example.com");
        assert_eq!(event.display_name.as_deref(), Some("Ana Souza"));
        assert_eq!(event.external_product_ids, vec!["P1", "22"]);
        assert_eq!(event.raw_event_name, "purchase.completed");
    }

    #[test]
    fn test_event_name_defaults_to_purchase() {
        let payload = parse(json!({
            "customer": { "email": "a@b.co" },
            "products": [ { "id": "P1" } ]
        }));
        assert_eq!(payload.event_name(), "purchase");
    }

    #[test]
    fn test_missing_email_is_error() {
        let payload = parse(json!({ "customer": { "name": "x" }, "products": [ { "id": "P1" } ] }));
        assert_eq!(payload.normalize().unwrap_err(), NormalizationError::MissingEmail);
    }

    #[test]
    fn test_products_without_ids_is_error() {
        let payload = parse(json!({
            "customer": { "email": "a@b.co" },
            "products": [ { "id": null }, { "id": "" } ]
        }));
        assert_eq!(payload.normalize().unwrap_err(), NormalizationError::NoProducts);
    }
}
