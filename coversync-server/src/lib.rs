use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::app::{AppState, create_app};
use crate::configs::{Settings, Shelly};
use crate::services::{
    ActorOptions, ActorRegistry, CoverActor, EventBus, MqttTransport, Transport,
};

pub mod app;
pub mod configs;
pub mod errors;
pub mod handles;
pub mod models;
pub mod services;

/// Builds one actor per configured device. Actors are not started.
pub async fn build_registry(
    shelly: &Shelly,
    transport: Arc<dyn Transport>,
    events: &Arc<EventBus>,
) -> Arc<ActorRegistry> {
    let registry = Arc::new(ActorRegistry::new());
    let options = ActorOptions {
        optimize_tilt: shelly.optimize_tilt,
    };

    for device in &shelly.devices {
        let actor = CoverActor::new(device.clone(), options, transport.clone(), events.clone());
        tracing::debug!("Registering {}", actor);
        registry.add_actor(Arc::new(actor)).await;
    }

    registry
}

/// Starts every actor, the command listener and the live updates, then serves until
/// [`shutdown_signal`] fires.
pub async fn run(settings: &Arc<Settings>) -> anyhow::Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(MqttTransport::connect(&settings.gateway));
    let events = Arc::new(EventBus::new());
    let registry = build_registry(&settings.shelly, transport.clone(), &events).await;

    if registry.is_empty().await {
        tracing::warn!("No devices configured");
    }

    for actor in registry.get_all_actors().await {
        actor
            .start()
            .await
            .with_context(|| format!("Failed to start actor {}", actor.name()))?;
    }
    tracing::info!("Started {} actors", registry.len().await);

    let state = AppState::new(registry, events.clone());

    state
        .dispatcher
        .clone()
        .listen(transport, settings.gateway.topic.clone())
        .await
        .context("Failed to subscribe to commands")?;

    if let Some(receiver) = events.take_receiver().await {
        state.live_updates.clone().forward(receiver);
    }

    if !settings.web.enabled {
        tracing::info!("Web server disabled");
        shutdown_signal().await;
        tracing::info!("Shutting down");
        return Ok(());
    }

    let ip_addr = settings
        .server
        .host
        .parse::<IpAddr>()
        .with_context(|| format!("Invalid server host {}", settings.server.host))?;

    let address = SocketAddr::from((ip_addr, settings.server.port));

    let listener = TcpListener::bind(&address).await?;

    tracing::info!("listening on {:?}", address);

    serve(listener, &state, shutdown_signal()).await?;

    Ok(())
}

/// Serves the API until `signal` resolves, then ends the live streams so open
/// connections can drain.
pub async fn serve<F>(listener: TcpListener, state: &AppState, signal: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let live_updates = state.live_updates.clone();

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(async move {
            signal.await;
            tracing::info!("Shutting down");
            live_updates.shutdown();
        })
        .await
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
