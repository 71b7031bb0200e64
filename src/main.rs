use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use storefront_chat::connector::api::router;
use storefront_chat::{ChatRole, Cli, Commands, Container, ContainerConfig, SessionId};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let (session_idle_timeout, secure_cookies) = match &cli.command {
        Commands::Serve {
            session_idle_secs,
            secure_cookies,
            ..
        } => (Duration::from_secs(*session_idle_secs), *secure_cookies),
        Commands::Ask { .. } => (storefront_chat::connector::DEFAULT_IDLE_TIMEOUT, false),
    };

    let container = Arc::new(Container::new(ContainerConfig {
        endpoint: cli.endpoint,
        api_key: cli.api_key,
        model: cli.model,
        request_timeout: Duration::from_secs(cli.timeout_secs),
        system_prompt: cli.system_prompt,
        mock_inference: cli.mock_inference,
        session_idle_timeout,
        secure_cookies,
    })?);

    match cli.command {
        Commands::Serve { port, public, .. } => {
            let host = if public { [0, 0, 0, 0] } else { [127, 0, 0, 1] };
            let addr = SocketAddr::from((host, port));

            let sessions = container.session_store();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
                loop {
                    interval.tick().await;
                    if let Err(e) = sessions.purge_expired().await {
                        warn!("Failed to purge expired sessions: {}", e);
                    }
                }
            });

            let app = router::build(container);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Chat front-end listening on http://{}", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            info!("Chat front-end stopped");
        }

        Commands::Ask { message } => {
            let session = SessionId::generate();
            match container
                .send_message_use_case()
                .execute(&session, &message)
                .await?
            {
                Some(conversation) => {
                    let reply = conversation
                        .last_with_role(&ChatRole::Assistant)
                        .unwrap_or_default();
                    println!("{}", reply);
                }
                None => println!("Nothing to send."),
            }
        }
    }

    Ok(())
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
