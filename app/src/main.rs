use std::sync::Arc;

use settings::Settings;
use tokio::sync::RwLock;

use crate::account::AccountStore;
use crate::core::{EntityRegistry, UpdateCoordinator};
use crate::web::ApiContext;

mod account;
mod adapter;
mod core;
mod frontend;
mod platform;
mod settings;
mod web;

#[tokio::main(flavor = "current_thread")]
pub async fn main() {
    let settings = Settings::new().expect("Error reading configuration");

    settings
        .monitoring
        .init()
        .expect("Error initializing monitoring");

    if let Err(e) = run(settings).await {
        tracing::error!("Setup failed: {:?}", e);
        std::process::exit(1);
    }
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!("Starting webasto-bridge {}", env!("CARGO_PKG_VERSION"));

    let account = Arc::new(
        AccountStore::open(&settings.storage.directory, settings.account.clone()).await?,
    );

    let client = settings.cloud.new_client(account.active().await);
    let (mut coordinator, handle) =
        UpdateCoordinator::new(client, settings.cloud.poll_interval());

    coordinator.first_refresh().await?;

    let state = handle.current();
    let device_ids: Vec<_> = state.devices.keys().cloned().collect();

    let mut registry = EntityRegistry::load(
        settings.storage.directory.join("registry.json"),
        &account.active().await.email,
        &device_ids,
    )
    .await?;

    let added = registry.ensure_entities(&platform::definitions(&state.devices));
    if added > 0 {
        tracing::info!("Registered {} new entities", added);
    }
    registry.persist().await?;

    let registry = Arc::new(RwLock::new(registry));

    let mut mqtt_client = settings.mqtt.new_client();
    let frontend_runner = settings
        .frontend
        .new_runner(&mut mqtt_client, handle.clone(), registry.clone())
        .await?;

    let http_server_exec = {
        let context = ApiContext {
            handle: handle.clone(),
            registry: registry.clone(),
            account: account.clone(),
            cloud: settings.cloud.clone(),
        };
        let http_server = settings.http_server.clone();

        async move {
            http_server
                .run_server(move || vec![web::new_actix_web_scope(context.clone())])
                .await
                .expect("HTTP server execution failed");
        }
    };

    tokio::select!(
        _ = coordinator.run() => {},
        _ = frontend_runner.run() => {},
        _ = mqtt_client.run() => {},
        _ = http_server_exec => {},
    );

    Ok(())
}
