//! Delivery bodies as each checkout platform sends them.

use serde_json::{json, Value};

pub fn provider_a_purchase(email: &str, name: &str, products: &[&str]) -> Value {
    let products: Vec<Value> = products.iter().map(|id| json!({ "id": id })).collect();
    json!({
        "event": "purchase.completed",
        "customer": { "email": email, "name": name },
        "products": products,
    })
}

pub fn provider_b_transaction(email: &str, status: &str, product_id: &str) -> Value {
    json!({
        "status": status,
        "email": email,
        "name": "Ana",
        "lastname": "Souza",
        "product_id": product_id,
        "item_type": "product",
    })
}

pub fn provider_b_order_bump(email: &str, root_id: &str, bump_id: &str) -> Value {
    json!({
        "status": "PAID",
        "customer": { "email": email, "name": "Ana Souza" },
        "product_id": root_id,
        "product": { "id": bump_id },
        "item_type": "order_bump",
    })
}

pub fn provider_c_order(event: &str, email: &str, skus: &[&str]) -> Value {
    let items: Vec<Value> = skus.iter().map(|sku| json!({ "sku_code": sku })).collect();
    json!({
        "event": event,
        "data": {
            "order": {
                "customer": { "email": email, "full_name": "Ana Souza" },
                "items": items,
            }
        }
    })
}
