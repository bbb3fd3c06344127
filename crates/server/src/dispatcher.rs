use tracing::debug;

use tidekv_protocol::{Command, Reply};
use tidekv_storage::Db;

/// Resultado de uma linha processada.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub reply: Reply,
    /// A linha original deve ir para o AOF.
    pub loggable: bool,
}

impl Dispatched {
    fn read(reply: Reply) -> Self {
        Self {
            reply,
            loggable: false,
        }
    }

    fn write(reply: Reply) -> Self {
        Self {
            reply,
            loggable: true,
        }
    }
}

/// Faz o parse de linhas e executa os comandos no Db.
///
/// É o mesmo caminho para clientes e para o replay do AOF, então uma linha
/// gravada produz o mesmo efeito quando é reexecutada.
#[derive(Clone)]
pub struct Dispatcher {
    db: Db,
}

impl Dispatcher {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Processa uma linha (bytes crus). Linha vazia não gera resposta (`None`).
    pub fn dispatch(&self, line: &[u8]) -> Option<Dispatched> {
        let cmd = match Command::from_line(line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => return None,
            Err(e) => return Some(Dispatched::read(Reply::error(e))),
        };

        debug!("comando recebido: {cmd:?}");

        let kind = cmd.kind();
        let dispatched = self.execute(cmd);
        debug_assert!(!dispatched.loggable || kind.is_write());
        Some(dispatched)
    }

    fn execute(&self, cmd: Command) -> Dispatched {
        match cmd {
            Command::Set { key, value } => {
                self.db.set(key, value);
                Dispatched::write(Reply::Ok)
            }
            Command::Get(key) => {
                Dispatched::read(self.db.get(&key).map_or(Reply::Nil, Reply::Bulk))
            }
            Command::Del(key) => {
                self.db.del(&key);
                Dispatched::write(Reply::Ok)
            }
            // EXPIRE em chave ausente não altera nada e não é gravado
            Command::Expire { key, seconds } => {
                let applied = self.db.expire(&key, seconds);
                Dispatched {
                    reply: Reply::Integer(i64::from(applied)),
                    loggable: applied,
                }
            }
            Command::Ttl(key) => Dispatched::read(Reply::Integer(self.db.ttl(&key))),
            Command::Incr(key) => match self.db.incr(&key) {
                Ok(n) => Dispatched::write(Reply::Integer(n)),
                Err(e) => Dispatched::read(Reply::error(e)),
            },
            Command::Flush => {
                self.db.flush();
                Dispatched::write(Reply::Ok)
            }
            Command::Quit => Dispatched::read(Reply::Bye),
        }
    }
}
