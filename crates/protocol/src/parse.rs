use bytes::Bytes;

use tidekv_common::CommandError;

/// Cursor sobre os tokens de uma linha de comando.
///
/// A linha é tratada como bytes opacos: os tokens são separados por qualquer
/// sequência de espaços em branco ASCII e o primeiro token é o nome do
/// comando.
pub struct Parse<'a> {
    parts: Vec<&'a [u8]>,
    pos: usize,
}

impl<'a> Parse<'a> {
    pub fn new(line: &'a [u8]) -> Parse<'a> {
        Parse {
            parts: line
                .split(u8::is_ascii_whitespace)
                .filter(|token| !token.is_empty())
                .collect(),
            pos: 0,
        }
    }

    /// Número total de tokens da linha, incluindo o nome do comando.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Retorna o próximo token, se houver.
    pub fn next_token(&mut self) -> Option<&'a [u8]> {
        let token = self.parts.get(self.pos).copied()?;
        self.pos += 1;
        Some(token)
    }

    /// Retorna o próximo token como Bytes.
    pub fn next_bytes(&mut self) -> Result<Bytes, CommandError> {
        self.next_token()
            .map(Bytes::copy_from_slice)
            .ok_or_else(|| self.wrong_arity())
    }

    /// Retorna o próximo token como i64 (base 10, com sinal).
    pub fn next_int(&mut self) -> Result<i64, CommandError> {
        let token = self.next_token().ok_or_else(|| self.wrong_arity())?;
        std::str::from_utf8(token)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(CommandError::NotAnInteger)
    }

    /// Consome todos os tokens restantes, unidos por um único espaço.
    pub fn rest_joined(&mut self) -> Result<Bytes, CommandError> {
        if !self.has_remaining() {
            return Err(self.wrong_arity());
        }
        let rest = self.parts[self.pos..].join(&b' ');
        self.pos = self.parts.len();
        Ok(Bytes::from(rest))
    }

    /// Verifica se todos os argumentos foram consumidos.
    pub fn finish(&self) -> Result<(), CommandError> {
        if self.has_remaining() {
            Err(self.wrong_arity())
        } else {
            Ok(())
        }
    }

    pub fn has_remaining(&self) -> bool {
        self.pos < self.parts.len()
    }

    pub fn remaining(&self) -> usize {
        self.parts.len() - self.pos
    }

    fn wrong_arity(&self) -> CommandError {
        let name = self.parts.first().copied().unwrap_or_default();
        CommandError::WrongArity(String::from_utf8_lossy(name).to_lowercase())
    }
}
