/// Erros de leitura de linhas do protocolo.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("linha excede tamanho máximo ({0} bytes)")]
    LineTooLong(usize),
}

/// Erros de armazenamento/engine de dados.
///
/// A mensagem é enviada como está ao cliente, por isso segue o texto do Redis.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StorageError {
    #[error("value is not an integer or out of range")]
    NotAnInteger,
}

/// Erros de conexão TCP.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Erros de parsing/validação de comandos. Também vão para o cliente.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("wrong number of arguments for '{0}'")]
    WrongArity(String),
    #[error("value is not an integer or out of range")]
    NotAnInteger,
}

/// Erros do arquivo append-only.
#[derive(Debug, thiserror::Error)]
pub enum AofError {
    #[error("AOF I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("AOF já foi fechado")]
    Closed,
}

/// Erro top-level do TideKV.
#[derive(Debug, thiserror::Error)]
pub enum TideError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Aof(#[from] AofError),
    #[error("falha ao escutar em {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias.
pub type TideResult<T> = Result<T, TideError>;

// Conversão implícita de io::Error → TideError (via ConnectionError)
impl From<std::io::Error> for TideError {
    fn from(e: std::io::Error) -> Self {
        TideError::Connection(ConnectionError::Io(e))
    }
}
