use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

use tidekv_common::{ConnectionError, INITIAL_BUFFER_CAPACITY, MAX_LINE_SIZE, ProtocolError};
use tidekv_protocol::Reply;

/// Wrapper sobre TcpStream com buffer para leitura de linhas e escrita de respostas.
pub struct Connection {
    stream: BufWriter<TcpStream>,
    buffer: BytesMut,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Lê uma linha completa, sem o terminador. Retorna None no EOF.
    ///
    /// A linha é devolvida como bytes crus, sem validação de encoding. Bytes
    /// pendentes sem `\n` no EOF formam a última linha.
    ///
    /// Cancel-safe: bytes já lidos ficam no buffer para a próxima chamada.
    pub async fn read_line(&mut self) -> Result<Option<Bytes>, ConnectionError> {
        loop {
            if let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
                let mut line = self.buffer.split_to(end + 1);
                line.truncate(end);
                return finish_line(line).map(Some);
            }

            if self.buffer.len() > MAX_LINE_SIZE {
                return Err(ProtocolError::LineTooLong(self.buffer.len()).into());
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let line = self.buffer.split();
                return finish_line(line).map(Some);
            }
        }
    }

    /// Escreve uma resposta (uma linha) no stream.
    pub async fn write_reply(&mut self, reply: &Reply) -> Result<(), ConnectionError> {
        let mut buf = BytesMut::new();
        reply.encode(&mut buf);
        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;
        Ok(())
    }
}

/// Remove um `\r` final e aplica o limite de tamanho.
fn finish_line(mut line: BytesMut) -> Result<Bytes, ConnectionError> {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }

    if line.len() > MAX_LINE_SIZE {
        return Err(ProtocolError::LineTooLong(line.len()).into());
    }

    Ok(line.freeze())
}
