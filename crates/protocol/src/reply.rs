use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

/// Resposta enviada ao cliente: sempre exatamente uma linha.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok,
    /// Resposta ao QUIT; o servidor fecha a conexão logo depois.
    Bye,
    Nil,
    Integer(i64),
    Bulk(Bytes),
    Error(String),
}

impl Reply {
    /// Cria uma resposta de erro a partir de qualquer erro exibível.
    pub fn error(err: impl fmt::Display) -> Reply {
        Reply::Error(err.to_string())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Serializa a resposta, com `\n` no final, no buffer.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Reply::Bulk(data) => dst.put_slice(data),
            other => dst.put_slice(other.to_string().as_bytes()),
        }
        dst.put_u8(b'\n');
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => f.write_str("OK"),
            Reply::Bye => f.write_str("Bye!"),
            Reply::Nil => f.write_str("(nil)"),
            Reply::Integer(n) => write!(f, "{n}"),
            Reply::Bulk(data) => f.write_str(&String::from_utf8_lossy(data)),
            Reply::Error(msg) => write!(f, "(error) ERR {msg}"),
        }
    }
}
