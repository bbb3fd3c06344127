use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinSet;
use tokio::time::Duration;
use tracing::{Instrument, error, info, info_span, warn};

use tidekv_common::{TideError, TideResult};
use tidekv_storage::{Aof, Db, aof};

use crate::{Config, Connection, Dispatcher, handle_connection};

/// Servidor TCP com o estado já restaurado do AOF.
///
/// `start` abre o AOF, faz o replay e o bind; `run` atende conexões até o
/// future de shutdown completar.
pub struct Server {
    listener: TcpListener,
    dispatcher: Dispatcher,
    aof: Option<Arc<Aof>>,
    limit: Arc<Semaphore>,
    idle_timeout: Duration,
    sweep_interval: Option<Duration>,
}

impl Server {
    pub async fn start(config: &Config) -> TideResult<Server> {
        let dispatcher = Dispatcher::new(Db::new());

        let aof = match config.aof_path() {
            Some(path) => {
                let aof = Aof::open(path, config.fsync).await?;
                let restored = restore(path, &dispatcher).await?;
                info!(
                    "{restored} comandos restaurados do AOF, {} chaves em memória",
                    dispatcher.db().len()
                );
                Some(Arc::new(aof))
            }
            None => {
                warn!("AOF desligado, nada será persistido");
                None
            }
        };

        let addr = config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| TideError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!("TideKV escutando em {}", listener.local_addr()?);

        Ok(Server {
            listener,
            dispatcher,
            aof,
            limit: Arc::new(Semaphore::new(config.max_connections)),
            idle_timeout: config.idle_timeout(),
            sweep_interval: config.sweep_interval(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn db(&self) -> &Db {
        self.dispatcher.db()
    }

    /// Aceita conexões até `shutdown` completar. Depois espera as conexões
    /// abertas terminarem e fecha o AOF.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> TideResult<()> {
        let (notify_shutdown, _) = broadcast::channel::<()>(1);
        let sweeper = self
            .sweep_interval
            .map(|period| self.db().spawn_expiry_sweeper(period, notify_shutdown.subscribe()));

        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            let permit = tokio::select! {
                permit = self.limit.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = &mut shutdown => break,
            };

            let (socket, addr) = tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok(v) => v,
                        Err(e) => {
                            error!("erro ao aceitar conexão: {e}");
                            continue;
                        }
                    }
                }
                _ = &mut shutdown => break,
            };

            // Descarta tasks já terminadas
            while connections.try_join_next().is_some() {}

            let dispatcher = self.dispatcher.clone();
            let aof = self.aof.clone();
            let idle_timeout = self.idle_timeout;
            let mut shutdown_rx = notify_shutdown.subscribe();

            connections.spawn(
                async move {
                    info!("nova conexão");
                    let conn = Connection::new(socket);
                    if let Err(e) =
                        handle_connection(conn, dispatcher, aof, &mut shutdown_rx, idle_timeout)
                            .await
                    {
                        error!("erro na conexão: {e}");
                    }
                    info!("conexão encerrada");
                    drop(permit);
                }
                .instrument(info_span!("client", %addr)),
            );
        }

        info!("shutdown: parando de aceitar conexões");
        drop(self.listener);
        drop(notify_shutdown);

        while let Some(result) = connections.join_next().await {
            if let Err(e) = result {
                warn!("task de conexão falhou: {e}");
            }
        }
        if let Some(sweeper) = sweeper {
            let _ = sweeper.await;
        }
        if let Some(aof) = &self.aof {
            aof.close().await?;
        }

        info!("shutdown completo");
        Ok(())
    }
}

/// Reexecuta o AOF no dispatcher. Linhas que geram erro são logadas e ignoradas.
///
/// Retorna o número de comandos aplicados.
pub async fn restore(path: &Path, dispatcher: &Dispatcher) -> TideResult<usize> {
    let mut applied = 0;
    aof::replay(path, |line| match dispatcher.dispatch(line) {
        Some(dispatched) if dispatched.reply.is_error() => {
            warn!(
                "AOF: linha ignorada no replay ({}): {}",
                dispatched.reply,
                String::from_utf8_lossy(line)
            );
        }
        Some(_) => applied += 1,
        None => {}
    })
    .await?;

    Ok(applied)
}
