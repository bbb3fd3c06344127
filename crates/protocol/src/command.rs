use bytes::Bytes;

use tidekv_common::CommandError;

use crate::Parse;

/// Quantidade de tokens aceita por um comando (incluindo o nome).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    pub fn accepts(self, tokens: usize) -> bool {
        match self {
            Arity::Exact(n) => tokens == n,
            Arity::AtLeast(n) => tokens >= n,
            Arity::Any => true,
        }
    }
}

/// Tipos de comando conhecidos, sem argumentos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Set,
    Get,
    Del,
    Expire,
    Ttl,
    Incr,
    Flush,
    Quit,
}

impl CommandKind {
    pub const ALL: [CommandKind; 8] = [
        CommandKind::Set,
        CommandKind::Get,
        CommandKind::Del,
        CommandKind::Expire,
        CommandKind::Ttl,
        CommandKind::Incr,
        CommandKind::Flush,
        CommandKind::Quit,
    ];

    /// Nome canônico (maiúsculo) do comando.
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Set => "SET",
            CommandKind::Get => "GET",
            CommandKind::Del => "DEL",
            CommandKind::Expire => "EXPIRE",
            CommandKind::Ttl => "TTL",
            CommandKind::Incr => "INCR",
            CommandKind::Flush => "FLUSH",
            CommandKind::Quit => "QUIT",
        }
    }

    /// Busca case-insensitive pelo nome.
    pub fn from_name(name: &[u8]) -> Option<CommandKind> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().as_bytes().eq_ignore_ascii_case(name))
    }

    pub fn arity(self) -> Arity {
        match self {
            CommandKind::Set => Arity::AtLeast(3),
            CommandKind::Get => Arity::Exact(2),
            CommandKind::Del => Arity::Exact(2),
            CommandKind::Expire => Arity::Exact(3),
            CommandKind::Ttl => Arity::Exact(2),
            CommandKind::Incr => Arity::Exact(2),
            CommandKind::Flush => Arity::Any,
            CommandKind::Quit => Arity::Any,
        }
    }

    /// Comandos que alteram o estado quando bem-sucedidos.
    ///
    /// EXPIRE só altera o estado quando a chave existe; quem decide se a
    /// linha vai para o AOF é o dispatcher, a partir do resultado.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            CommandKind::Set
                | CommandKind::Del
                | CommandKind::Expire
                | CommandKind::Incr
                | CommandKind::Flush
        )
    }
}

/// Enum com todos os comandos suportados.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set { key: Bytes, value: Bytes },
    Get(Bytes),
    Del(Bytes),
    Expire { key: Bytes, seconds: i64 },
    Ttl(Bytes),
    Incr(Bytes),
    Flush,
    Quit,
}

impl Command {
    /// Faz o parse de uma linha em um Command.
    ///
    /// A linha não precisa ser UTF-8: chaves e valores são bytes opacos.
    /// Linha vazia (ou só com espaços) retorna `Ok(None)`.
    pub fn from_line(line: &[u8]) -> Result<Option<Command>, CommandError> {
        let mut parse = Parse::new(line);
        let Some(name) = parse.next_token() else {
            return Ok(None);
        };

        let kind = CommandKind::from_name(name).ok_or_else(|| {
            CommandError::Unknown(String::from_utf8_lossy(name).to_uppercase())
        })?;

        if !kind.arity().accepts(parse.len()) {
            return Err(CommandError::WrongArity(kind.name().to_lowercase()));
        }

        let cmd = match kind {
            CommandKind::Set => {
                let key = parse.next_bytes()?;
                let value = parse.rest_joined()?;
                Command::Set { key, value }
            }
            CommandKind::Get => {
                let key = parse.next_bytes()?;
                parse.finish()?;
                Command::Get(key)
            }
            CommandKind::Del => {
                let key = parse.next_bytes()?;
                parse.finish()?;
                Command::Del(key)
            }
            CommandKind::Expire => {
                let key = parse.next_bytes()?;
                let seconds = parse.next_int()?;
                parse.finish()?;
                Command::Expire { key, seconds }
            }
            CommandKind::Ttl => {
                let key = parse.next_bytes()?;
                parse.finish()?;
                Command::Ttl(key)
            }
            CommandKind::Incr => {
                let key = parse.next_bytes()?;
                parse.finish()?;
                Command::Incr(key)
            }
            // Argumentos extras são ignorados
            CommandKind::Flush => Command::Flush,
            CommandKind::Quit => Command::Quit,
        };

        Ok(Some(cmd))
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Set { .. } => CommandKind::Set,
            Command::Get(_) => CommandKind::Get,
            Command::Del(_) => CommandKind::Del,
            Command::Expire { .. } => CommandKind::Expire,
            Command::Ttl(_) => CommandKind::Ttl,
            Command::Incr(_) => CommandKind::Incr,
            Command::Flush => CommandKind::Flush,
            Command::Quit => CommandKind::Quit,
        }
    }
}
