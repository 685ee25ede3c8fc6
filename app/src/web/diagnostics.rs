use actix_web::web;
use actix_web::{HttpResponse, Responder};
use serde_json::{json, Value};

use super::ApiContext;

/// Keys whose values never leave the service, wherever they appear in the
/// dump. Location coordinates count as sensitive.
const TO_REDACT: &[&str] = &[
    "password",
    "email",
    "latitude",
    "longitude",
    "lat",
    "lon",
    "acc_email",
    "stripe_key",
];

const REDACTED: &str = "**REDACTED**";

pub(super) async fn handle_diagnostics(context: web::Data<ApiContext>) -> impl Responder {
    let state = context.handle.current();
    let account = context.account.active().await;

    let devices: serde_json::Map<String, Value> = state
        .devices
        .iter()
        .map(|(id, device)| {
            let dump = serde_json::to_value(device).unwrap_or_else(|_| json!({}));
            (id.to_string(), dump)
        })
        .collect();

    let mut dump = json!({
        "account": {
            "email": account.email,
            "password": account.password,
        },
        "cloud": state.cloud,
        "last_refresh": state.last_refresh,
        "devices": devices,
    });

    redact(&mut dump);

    HttpResponse::Ok().json(dump)
}

/// Recursive redaction over the whole dump, arrays included.
fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map.iter_mut() {
                if TO_REDACT.contains(&key.as_str()) {
                    *nested = Value::from(REDACTED);
                } else {
                    redact(nested);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                redact(item);
            }
        }
        _ => {}
    }
}
