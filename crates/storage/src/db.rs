use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval};
use tracing::debug;

use tidekv_common::StorageError;

use crate::entry::Entry;

/// Maior TTL aceito (100 anos); valores acima são limitados a ele.
pub const MAX_TTL_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Estado compartilhado entre todas as conexões.
///
/// Um único lock protege todo o keyspace. Nenhuma I/O acontece com ele
/// adquirido.
#[derive(Default)]
struct SharedState {
    data: Mutex<HashMap<Bytes, Entry>>,
}

/// Handle para o banco de dados in-memory. Chaves e valores são bytes
/// opacos.
///
/// A expiração é preguiçosa: toda operação verifica o prazo da chave que
/// toca e remove a entrada vencida sob o mesmo lock.
#[derive(Clone)]
pub struct Db {
    shared: Arc<SharedState>,
}

impl Db {
    pub fn new() -> Self {
        Db {
            shared: Arc::new(SharedState::default()),
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        let mut data = self.lock();
        live_entry(&mut data, key, Instant::now()).map(|entry| entry.value.clone())
    }

    /// Insere ou sobrescreve o valor. Qualquer TTL anterior é descartado.
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.lock().insert(key, Entry::new(value, None));
    }

    /// Remove a chave. Retorna `true` se havia uma chave viva.
    pub fn del(&self, key: &[u8]) -> bool {
        let removed = self.lock().remove(key);
        removed.is_some_and(|entry| !entry.is_expired_at(Instant::now()))
    }

    /// Define o TTL de uma chave existente.
    ///
    /// Retorna `false` se a chave não existe ou já expirou. Valores não
    /// positivos deixam a chave expirada imediatamente.
    pub fn expire(&self, key: &[u8], seconds: i64) -> bool {
        let now = Instant::now();
        let mut data = self.lock();
        match live_entry(&mut data, key, now) {
            Some(entry) => {
                entry.expires_at = Some(deadline(now, seconds));
                true
            }
            None => false,
        }
    }

    /// TTL restante em segundos (arredondado para cima).
    ///
    /// `-2` se a chave não existe, `-1` se existe sem TTL.
    pub fn ttl(&self, key: &[u8]) -> i64 {
        let now = Instant::now();
        let mut data = self.lock();
        match live_entry(&mut data, key, now) {
            None => -2,
            Some(Entry {
                expires_at: None, ..
            }) => -1,
            Some(Entry {
                expires_at: Some(when),
                ..
            }) => {
                let remaining = when.saturating_duration_since(now);
                remaining.as_nanos().div_ceil(1_000_000_000) as i64
            }
        }
    }

    /// Incrementa o valor inteiro da chave em 1.
    ///
    /// Chave ausente ou expirada é criada com `1` e sem TTL. Um valor que
    /// não é inteiro (ou estouraria i64) não é modificado.
    pub fn incr(&self, key: &[u8]) -> Result<i64, StorageError> {
        let now = Instant::now();
        let mut data = self.lock();
        match live_entry(&mut data, key, now) {
            Some(entry) => {
                let new_val = std::str::from_utf8(&entry.value)
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .and_then(|n| n.checked_add(1))
                    .ok_or(StorageError::NotAnInteger)?;
                entry.value = Bytes::from(new_val.to_string());
                Ok(new_val)
            }
            None => {
                data.insert(
                    Bytes::copy_from_slice(key),
                    Entry::new(Bytes::from_static(b"1"), None),
                );
                Ok(1)
            }
        }
    }

    /// Descarta todo o keyspace.
    pub fn flush(&self) {
        self.lock().clear();
    }

    /// Número de entradas guardadas, incluindo expiradas ainda não coletadas.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove todas as entradas vencidas. Retorna quantas foram removidas.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut data = self.lock();
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired_at(now));
        before - data.len()
    }

    /// Inicia a task de fundo que purga chaves expiradas periodicamente.
    ///
    /// A task termina quando o sender de `shutdown` é dropado.
    pub fn spawn_expiry_sweeper(
        &self,
        period: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let db = self.clone();
        tokio::spawn(async move {
            let mut tick = interval(period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let purged = db.purge_expired();
                        if purged > 0 {
                            debug!("{purged} chaves expiradas removidas");
                        }
                    }
                    _ = shutdown.recv() => return,
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Bytes, Entry>> {
        // Nenhuma seção crítica deixa o mapa inconsistente
        self.shared
            .data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}

/// Retorna a entrada viva da chave, removendo-a se já expirou.
fn live_entry<'a>(
    data: &'a mut HashMap<Bytes, Entry>,
    key: &[u8],
    now: Instant,
) -> Option<&'a mut Entry> {
    if data.get(key).is_some_and(|entry| entry.is_expired_at(now)) {
        data.remove(key);
        debug!("key expirada removida: {}", String::from_utf8_lossy(key));
        return None;
    }
    data.get_mut(key)
}

fn deadline(now: Instant, seconds: i64) -> Instant {
    if seconds <= 0 {
        return now;
    }
    now + Duration::from_secs(seconds.min(MAX_TTL_SECS) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn get_set_basic() {
        let db = Db::new();
        db.set("key".into(), Bytes::from("value"));
        assert_eq!(db.get(b"key"), Some(Bytes::from("value")));
        assert_eq!(db.ttl(b"key"), -1);
    }

    #[test]
    fn binary_keys_and_values() {
        let db = Db::new();
        db.set(Bytes::from_static(b"k\xff"), Bytes::from_static(b"caf\xe9"));
        assert_eq!(db.get(b"k\xff"), Some(Bytes::from_static(b"caf\xe9")));
        assert_eq!(db.get(b"k"), None);
        assert!(db.expire(b"k\xff", 10));
        assert!(db.del(b"k\xff"));
    }

    #[test]
    fn get_nonexistent() {
        let db = Db::new();
        assert_eq!(db.get(b"missing"), None);
        assert_eq!(db.ttl(b"missing"), -2);
    }

    #[test]
    fn del_present_and_absent() {
        let db = Db::new();
        db.set("a".into(), Bytes::from("1"));
        assert!(db.del(b"a"));
        assert!(!db.del(b"a"));
        assert_eq!(db.get(b"a"), None);
    }

    #[test]
    fn expire_absent_key() {
        let db = Db::new();
        assert!(!db.expire(b"missing", 10));
        assert_eq!(db.ttl(b"missing"), -2);
    }

    #[tokio::test(start_paused = true)]
    async fn expire_then_elapse() {
        let db = Db::new();
        db.set("key".into(), Bytes::from("value"));
        assert!(db.expire(b"key", 3));

        let ttl = db.ttl(b"key");
        assert!(ttl > 0 && ttl <= 3, "ttl = {ttl}");

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(db.ttl(b"key"), 2);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(db.get(b"key"), None);
        assert_eq!(db.ttl(b"key"), -2);
        assert!(db.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn expire_on_expired_key_fails_and_removes() {
        let db = Db::new();
        db.set("key".into(), Bytes::from("value"));
        db.expire(b"key", 1);
        tokio::time::advance(Duration::from_secs(1)).await;

        assert_eq!(db.len(), 1);
        assert!(!db.expire(b"key", 10));
        assert_eq!(db.len(), 0);
    }

    #[test]
    fn non_positive_expire_is_immediate() {
        let db = Db::new();
        db.set("a".into(), Bytes::from("1"));
        db.set("b".into(), Bytes::from("2"));

        assert!(db.expire(b"a", 0));
        assert!(db.expire(b"b", -10));
        assert_eq!(db.get(b"a"), None);
        assert_eq!(db.ttl(b"b"), -2);
    }

    #[test]
    fn huge_expire_is_clamped() {
        let db = Db::new();
        db.set("a".into(), Bytes::from("1"));
        assert!(db.expire(b"a", i64::MAX));
        assert_eq!(db.ttl(b"a"), MAX_TTL_SECS);
    }

    #[tokio::test(start_paused = true)]
    async fn set_clears_ttl() {
        let db = Db::new();
        db.set("key".into(), Bytes::from("v1"));
        db.expire(b"key", 5);
        db.set("key".into(), Bytes::from("v2"));
        assert_eq!(db.ttl(b"key"), -1);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(db.get(b"key"), Some(Bytes::from("v2")));
    }

    #[test]
    fn incr_basic() {
        let db = Db::new();
        // INCR em chave inexistente cria com 1, sem TTL
        assert_eq!(db.incr(b"counter"), Ok(1));
        assert_eq!(db.ttl(b"counter"), -1);
        assert_eq!(db.incr(b"counter"), Ok(2));
        assert_eq!(db.incr(b"counter"), Ok(3));
        assert_eq!(db.get(b"counter"), Some(Bytes::from("3")));
    }

    #[test]
    fn incr_negative_value() {
        let db = Db::new();
        db.set("n".into(), Bytes::from("-1"));
        assert_eq!(db.incr(b"n"), Ok(0));
    }

    #[test]
    fn incr_not_integer() {
        let db = Db::new();
        db.set("key".into(), Bytes::from("not_a_number"));
        assert_eq!(db.incr(b"key"), Err(StorageError::NotAnInteger));
        assert_eq!(db.get(b"key"), Some(Bytes::from("not_a_number")));
    }

    #[test]
    fn incr_overflow() {
        let db = Db::new();
        db.set("max".into(), Bytes::from(i64::MAX.to_string()));
        assert_eq!(db.incr(b"max"), Err(StorageError::NotAnInteger));
        assert_eq!(db.get(b"max"), Some(Bytes::from(i64::MAX.to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn incr_preserves_ttl() {
        let db = Db::new();
        db.set("n".into(), Bytes::from("10"));
        db.expire(b"n", 100);
        assert_eq!(db.incr(b"n"), Ok(11));
        assert_eq!(db.ttl(b"n"), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn incr_on_expired_key_restarts() {
        let db = Db::new();
        db.set("n".into(), Bytes::from("41"));
        db.expire(b"n", 1);
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(db.incr(b"n"), Ok(1));
        assert_eq!(db.ttl(b"n"), -1);
    }

    #[test]
    fn flush_empties_keyspace() {
        let db = Db::new();
        db.set("a".into(), Bytes::from("1"));
        db.set("b".into(), Bytes::from("2"));
        db.incr(b"c").unwrap();

        db.flush();
        assert_eq!(db.get(b"a"), None);
        assert_eq!(db.get(b"b"), None);
        assert_eq!(db.get(b"c"), None);
        assert!(db.is_empty());
    }

    #[test]
    fn concurrent_incr_has_no_lost_updates() {
        let db = Db::new();
        let threads = 8;
        let per_thread = 250;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || {
                    (0..per_thread)
                        .map(|_| db.incr(b"counter").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = BTreeSet::new();
        for handle in handles {
            for n in handle.join().unwrap() {
                assert!(seen.insert(n), "valor duplicado: {n}");
            }
        }

        let total = (threads * per_thread) as i64;
        assert_eq!(seen, (1..=total).collect::<BTreeSet<_>>());
        assert_eq!(db.get(b"counter"), Some(Bytes::from(total.to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn purge_expired_removes_only_dead_keys() {
        let db = Db::new();
        db.set("live".into(), Bytes::from("1"));
        db.set("dead".into(), Bytes::from("2"));
        db.expire(b"dead", 1);
        tokio::time::advance(Duration::from_secs(1)).await;

        assert_eq!(db.purge_expired(), 1);
        assert_eq!(db.len(), 1);
        assert_eq!(db.get(b"live"), Some(Bytes::from("1")));
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_purges_and_stops_on_shutdown() {
        let db = Db::new();
        db.set("dead".into(), Bytes::from("x"));
        db.expire(b"dead", 1);

        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        let handle = db.spawn_expiry_sweeper(Duration::from_secs(1), shutdown_rx);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(db.len(), 0);

        drop(shutdown_tx);
        handle.await.unwrap();
    }
}
