mod diagnostics;

use std::sync::Arc;

use actix_web::web::{self, Json};
use actix_web::{HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use webasto::Credentials;

use crate::account::AccountStore;
use crate::adapter::CloudConfig;
use crate::core::entity::DeviceInfo;
use crate::core::{CoordinatorHandle, EntityRegistry};
use crate::platform;

#[derive(Clone)]
pub struct ApiContext {
    pub handle: CoordinatorHandle,
    pub registry: Arc<RwLock<EntityRegistry>>,
    pub account: Arc<AccountStore>,
    pub cloud: CloudConfig,
}

pub fn new_actix_web_scope(context: ApiContext) -> actix_web::Scope {
    web::scope("/api")
        .route("/status", web::get().to(handle_status))
        .route("/devices", web::get().to(handle_devices))
        .route("/entities", web::get().to(handle_entities))
        .route("/entities/{entity_id}", web::put().to(handle_update_entity))
        .route("/account", web::put().to(handle_update_account))
        .route("/diagnostics", web::get().to(diagnostics::handle_diagnostics))
        .app_data(web::Data::new(context))
}

async fn handle_status(context: web::Data<ApiContext>) -> impl Responder {
    let state = context.handle.current();

    HttpResponse::Ok().json(json!({
        "cloud": state.cloud,
        "needs_reauth": state.needs_reauth(),
        "last_refresh": state.last_refresh,
        "devices": state.devices.len(),
    }))
}

async fn handle_devices(context: web::Data<ApiContext>) -> impl Responder {
    let state = context.handle.current();

    let mut devices: Vec<DeviceInfo> = state.devices.values().map(DeviceInfo::for_device).collect();
    devices.sort_by(|a, b| a.identifiers.cmp(&b.identifiers));

    HttpResponse::Ok().json(devices)
}

async fn handle_entities(context: web::Data<ApiContext>) -> impl Responder {
    let state = context.handle.current();
    let registry = context.registry.read().await;

    let entities: Vec<_> = registry
        .entries()
        .iter()
        .map(|entry| {
            json!({
                "entity_id": entry.entity_id,
                "unique_id": entry.unique_id,
                "platform": entry.platform,
                "device_id": entry.device_id,
                "category": entry.category,
                "enabled": entry.enabled,
                "state": entry.enabled.then(|| platform::state_of(entry, &state)),
            })
        })
        .collect();

    HttpResponse::Ok().json(entities)
}

#[derive(Debug, Deserialize)]
struct EntityUpdateDTO {
    enabled: bool,
}

async fn handle_update_entity(
    context: web::Data<ApiContext>,
    path: web::Path<String>,
    Json(dto): Json<EntityUpdateDTO>,
) -> impl Responder {
    let entity_id = path.into_inner();
    let mut registry = context.registry.write().await;

    if !registry.set_enabled(&entity_id, dto.enabled) {
        return HttpResponse::NotFound().json(json!({"error": "unknown_entity"}));
    }

    tracing::info!("Entity {} enabled={}", entity_id, dto.enabled);

    if let Err(e) = registry.persist().await {
        tracing::error!("Error persisting entity registry: {:?}", e);
        return HttpResponse::InternalServerError().json(json!({"error": "storage"}));
    }

    HttpResponse::Ok().json(json!({"entity_id": entity_id, "enabled": dto.enabled}))
}

#[derive(Debug, Deserialize)]
struct AccountDTO {
    email: String,
    password: String,
}

/// Options/reauth flow: validate the submitted credentials against a fresh
/// cloud session, only then persist them and swap them into the running
/// coordinator.
async fn handle_update_account(
    context: web::Data<ApiContext>,
    Json(dto): Json<AccountDTO>,
) -> impl Responder {
    let credentials = Credentials {
        email: dto.email,
        password: dto.password,
    };

    if context.handle.current().is_connected() && context.account.active().await == credentials {
        return HttpResponse::Ok().json(json!({"result": "already_configured"}));
    }

    let probe = context.cloud.new_client(credentials.clone());
    match probe.login().await {
        Ok(()) => tracing::debug!("Authorization OK"),
        Err(e) if e.is_auth() => {
            tracing::debug!("Authorization ERROR");
            return HttpResponse::BadRequest().json(json!({"error": "invalid_auth"}));
        }
        Err(e) => {
            tracing::error!("Error validating credentials: {:?}", e);
            return HttpResponse::BadGateway().json(json!({"error": "cloud_unreachable"}));
        }
    }

    if let Err(e) = context.account.persist(&credentials).await {
        tracing::error!("Error persisting account: {:?}", e);
        return HttpResponse::InternalServerError().json(json!({"error": "storage"}));
    }

    if let Err(e) = context.handle.replace_credentials(credentials).await {
        tracing::error!("Error activating new credentials: {:?}", e);
        return HttpResponse::InternalServerError().json(json!({"error": "activation"}));
    }

    HttpResponse::Ok().json(json!({"result": "updated"}))
}
