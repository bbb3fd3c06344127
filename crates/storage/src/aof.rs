use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use tidekv_common::AofError;

/// Política de fsync.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum FsyncPolicy {
    /// Fsync após cada write.
    Always,
    /// Fsync no máximo uma vez por segundo, no próprio append.
    #[default]
    EverySec,
    /// Sem fsync explícito (deixa pro OS).
    No,
}

impl FromStr for FsyncPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "always" => Ok(FsyncPolicy::Always),
            "everysec" => Ok(FsyncPolicy::EverySec),
            "no" => Ok(FsyncPolicy::No),
            _ => Err(format!("valor inválido: '{s}'. Use: always, everysec, no")),
        }
    }
}

struct AofFile {
    /// `None` depois de `close`.
    file: Option<File>,
    last_sync: Instant,
}

/// Arquivo append-only: uma linha de texto por comando que alterou o estado.
///
/// O mutex interno garante que appends concorrentes nunca intercalem linhas
/// parciais. A ordem das linhas é a ordem de aquisição desse mutex.
pub struct Aof {
    inner: Mutex<AofFile>,
    path: PathBuf,
    policy: FsyncPolicy,
}

impl Aof {
    /// Abre (ou cria) o arquivo em modo append. Nunca trunca.
    pub async fn open(path: impl Into<PathBuf>, policy: FsyncPolicy) -> Result<Aof, AofError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        info!("AOF aberto: {:?} (fsync {:?})", path, policy);

        Ok(Aof {
            inner: Mutex::new(AofFile {
                file: Some(file),
                last_sync: Instant::now(),
            }),
            path,
            policy,
        })
    }

    /// Acrescenta a linha ao arquivo, adicionando `\n` se faltar.
    ///
    /// Quando retorna `Ok`, os bytes já foram entregues ao sistema
    /// operacional. Só `FsyncPolicy::Always` garante que chegaram ao disco.
    pub async fn append(&self, line: &[u8]) -> Result<(), AofError> {
        let mut record = Vec::with_capacity(line.len() + 1);
        record.extend_from_slice(line);
        if record.last() != Some(&b'\n') {
            record.push(b'\n');
        }

        let mut guard = self.inner.lock().await;
        let AofFile { file, last_sync } = &mut *guard;
        let file = file.as_mut().ok_or(AofError::Closed)?;

        file.write_all(&record).await?;
        file.flush().await?;

        let sync_due = match self.policy {
            FsyncPolicy::Always => true,
            FsyncPolicy::EverySec => last_sync.elapsed() >= Duration::from_secs(1),
            FsyncPolicy::No => false,
        };
        if sync_due {
            file.sync_data().await?;
            *last_sync = Instant::now();
        }

        Ok(())
    }

    /// Fecha o arquivo. Appends posteriores falham com `AofError::Closed`.
    pub async fn close(&self) -> Result<(), AofError> {
        let mut guard = self.inner.lock().await;
        if let Some(mut file) = guard.file.take() {
            file.flush().await?;
            if self.policy != FsyncPolicy::No {
                file.sync_data().await?;
            }
            info!("AOF encerrado: {:?}", self.path);
        }
        Ok(())
    }
}

/// Lê o arquivo AOF linha a linha, em ordem, chamando `apply` para cada uma.
///
/// As linhas são entregues sem o terminador (`\n` ou `\r\n`) e sem exigir
/// UTF-8; a última linha pode não ter `\n`. Arquivo inexistente é um
/// histórico vazio. Erros de leitura são propagados. Retorna o número de
/// linhas lidas.
pub async fn replay<F>(path: &Path, mut apply: F) -> Result<usize, AofError>
where
    F: FnMut(&[u8]),
{
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("arquivo AOF não encontrado, iniciando sem dados");
            return Ok(0);
        }
        Err(e) => return Err(e.into()),
    };

    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut count = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let line = strip_terminator(&buf);
        debug!("AOF replay: {}", String::from_utf8_lossy(line));
        apply(line);
        count += 1;
    }

    info!("AOF replay completo: {count} linhas lidas");
    Ok(count)
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
