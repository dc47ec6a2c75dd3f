use scim_gateway::config::GatewayConfig;
use scim_gateway::model::Tenant;
use scim_gateway::server::build_default_router;
use scim_gateway::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init(std::env::var("GATEWAY_LOG_JSON").is_ok());

    let config = GatewayConfig::load()?;
    tracing::info!(bind_addr = %config.bind_addr, "starting scim gateway");

    // Tenant onboarding is admin-driven (spec.md §1 Non-goals); this
    // binary starts with an empty tenant table until an operator loads
    // one via the admin API or a config file.
    let tenants: Vec<Tenant> = Vec::new();

    let router = build_default_router(&config, tenants);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, draining in-flight requests");
}
