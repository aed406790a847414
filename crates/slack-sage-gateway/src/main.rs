use slack_sage::Dispatcher;
use slack_sage_adapter_web::SlackWebConnector;
use slack_sage_gateway::{run_stdio, GatewayConfig, McpServer, StopReason};
use slack_sage_observability::LogSettings;
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    slack_sage_observability::init(&LogSettings::from_env());

    let config = GatewayConfig::from_env()
        .inspect_err(|e| error!(error = %e, "refusing to start"))?;
    let connector = SlackWebConnector::with_base_url(config.api_base_url);
    let server = McpServer::new(Dispatcher::slack(connector));

    let stopped = run_stdio(&server)
        .await
        .inspect_err(|e| error!(error = %e, "server stopped"))?;
    if stopped == StopReason::Interrupted {
        // The stdin read is parked on a blocking thread that dropping the
        // runtime would wait on forever.
        std::process::exit(0);
    }
    Ok(())
}
