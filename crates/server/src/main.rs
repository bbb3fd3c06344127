use clap::Parser;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tidekv_server::{Config, Server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tidekv_server=info,tidekv_storage=info".into());
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Replay do AOF acontece aqui, antes de aceitar qualquer conexão
    let server = Server::start(&config).await?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut running = tokio::spawn(server.run(async {
        let _ = stop_rx.await;
    }));

    tokio::select! {
        result = &mut running => return Ok(result??),
        _ = shutdown_signal() => {
            info!("shutdown signal recebido");
        }
    }

    let _ = stop_tx.send(());

    match tokio::time::timeout(config.shutdown_timeout(), running).await {
        Ok(result) => result??,
        Err(_) => warn!(
            "shutdown não terminou em {:?}, forçando saída",
            config.shutdown_timeout()
        ),
    }

    Ok(())
}

/// Completa no primeiro SIGINT (ctrl-c) ou SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("falha ao instalar handler de ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("falha ao instalar handler de SIGTERM: {e}");
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
