use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use tidekv_common::{
    DEFAULT_AOF_PATH, DEFAULT_HOST, DEFAULT_PORT, IDLE_TIMEOUT_SECS, MAX_CONNECTIONS,
    SHUTDOWN_TIMEOUT_SECS,
};
use tidekv_storage::FsyncPolicy;

/// Configuração do servidor. Toda flag também pode vir de variável de ambiente.
#[derive(Parser, Debug, Clone)]
#[command(name = "tidekv-server", about = "TideKV in-memory key-value store")]
pub struct Config {
    #[arg(long, env = "TIDEKV_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Porta TCP; 0 escolhe uma porta livre
    #[arg(long, env = "TIDEKV_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Arquivo append-only usado para persistência e recuperação
    #[arg(long, env = "TIDEKV_AOF", value_name = "FILE", default_value = DEFAULT_AOF_PATH)]
    pub aof: PathBuf,

    /// Desliga o AOF: nada é persistido nem restaurado
    #[arg(long, env = "TIDEKV_NO_AOF")]
    pub no_aof: bool,

    /// always, everysec ou no
    #[arg(long, env = "TIDEKV_FSYNC", default_value = "everysec")]
    pub fsync: FsyncPolicy,

    #[arg(long, env = "TIDEKV_MAX_CONNECTIONS", default_value_t = MAX_CONNECTIONS)]
    pub max_connections: usize,

    /// Segundos sem receber comando até a conexão ser encerrada
    #[arg(long, env = "TIDEKV_IDLE_TIMEOUT", value_name = "SECS", default_value_t = IDLE_TIMEOUT_SECS)]
    pub idle_timeout: u64,

    /// Prazo do shutdown gracioso, em segundos
    #[arg(long, env = "TIDEKV_SHUTDOWN_TIMEOUT", value_name = "SECS", default_value_t = SHUTDOWN_TIMEOUT_SECS)]
    pub shutdown_timeout: u64,

    /// Intervalo da purga ativa de chaves expiradas; 0 desliga
    #[arg(long, env = "TIDEKV_SWEEP_INTERVAL", value_name = "SECS", default_value_t = 0)]
    pub sweep_interval: u64,

    /// Logs em JSON
    #[arg(long, env = "TIDEKV_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn aof_path(&self) -> Option<&Path> {
        (!self.no_aof).then_some(self.aof.as_path())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            aof: PathBuf::from(DEFAULT_AOF_PATH),
            no_aof: false,
            fsync: FsyncPolicy::default(),
            max_connections: MAX_CONNECTIONS,
            idle_timeout: IDLE_TIMEOUT_SECS,
            shutdown_timeout: SHUTDOWN_TIMEOUT_SECS,
            sweep_interval: 0,
            log_json: false,
        }
    }
}
