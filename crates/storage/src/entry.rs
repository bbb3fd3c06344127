use bytes::Bytes;
use tokio::time::Instant;

/// Entrada no store: valor + TTL opcional.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub value: Bytes,
    pub expires_at: Option<Instant>,
}

impl Entry {
    pub fn new(value: Bytes, expires_at: Option<Instant>) -> Self {
        Self { value, expires_at }
    }

    /// Uma entrada expira no instante exato do prazo.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|t| now >= t)
    }
}
