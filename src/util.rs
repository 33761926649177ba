/// Resolve once Ctrl+C is received, for graceful server shutdown.
pub(crate) async fn shutdown_signal(server: &'static str) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(server, "Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!(server, "Shutting down");
}
