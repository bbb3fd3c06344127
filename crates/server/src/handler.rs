use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};
use tracing::{error, info};

use tidekv_common::ConnectionError;
use tidekv_protocol::Reply;
use tidekv_storage::Aof;

use crate::{Connection, Dispatched, Dispatcher};

/// Loop principal de tratamento de uma conexão.
///
/// Cada linha é aplicada ao Db, gravada no AOF quando o dispatcher pede, e
/// só então respondida. O shutdown só interrompe a espera por uma nova
/// linha, nunca um comando em andamento.
pub async fn handle_connection(
    mut conn: Connection,
    dispatcher: Dispatcher,
    aof: Option<Arc<Aof>>,
    shutdown: &mut broadcast::Receiver<()>,
    idle_timeout: Duration,
) -> Result<(), ConnectionError> {
    loop {
        let line = tokio::select! {
            result = timeout(idle_timeout, conn.read_line()) => match result {
                Ok(line) => line?,
                Err(_) => {
                    info!("conexão ociosa por {idle_timeout:?}, encerrando");
                    return Ok(());
                }
            },
            _ = shutdown.recv() => {
                return Ok(());
            }
        };

        let Some(line) = line else {
            return Ok(()); // EOF
        };

        let Some(Dispatched { reply, loggable }) = dispatcher.dispatch(&line) else {
            continue;
        };

        // Falha no AOF não desfaz a mutação em memória; o cliente recebe a resposta
        if loggable
            && let Some(aof) = &aof
            && let Err(e) = aof.append(&line).await
        {
            error!("falha ao gravar no AOF, memória e log divergem: {e}");
        }

        conn.write_reply(&reply).await?;

        if reply == Reply::Bye {
            info!("cliente enviou QUIT");
            return Ok(());
        }
    }
}
