use std::io::{self, Write};

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use tidekv_common::{DEFAULT_HOST, DEFAULT_PORT};

const BYE: &str = "Bye!";

#[derive(Parser, Debug)]
#[command(name = "tidekv-cli", about = "TideKV CLI client")]
struct Args {
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Comando para executar diretamente (modo não interativo)
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let mut stream = BufReader::new(TcpStream::connect(&addr).await?);

    // Modo comando único (via argumentos)
    if let Some(line) = request_line(&args.command) {
        let reply = execute_request(&mut stream, &line).await?;
        println!("{reply}");
        return Ok(());
    }

    println!("Conectado a {addr}");

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        print!("tidekv> ");
        io::stdout().flush()?;

        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break; // EOF
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        match execute_request(&mut stream, line).await {
            Ok(reply) => {
                println!("{reply}");
                if reply == BYE {
                    break;
                }
            }
            Err(e) => {
                println!("(error) {e}");
                break;
            }
        }
    }

    Ok(())
}

/// Junta os argumentos da linha de comando numa linha do protocolo.
fn request_line(args: &[String]) -> Option<String> {
    let line = args.join(" ");
    let line = line.trim();
    (!line.is_empty()).then(|| line.to_string())
}

/// Envia uma linha e lê exatamente uma linha de resposta.
async fn execute_request(stream: &mut BufReader<TcpStream>, line: &str) -> anyhow::Result<String> {
    let socket = stream.get_mut();
    socket.write_all(line.as_bytes()).await?;
    socket.write_all(b"\n").await?;
    socket.flush().await?;

    // Valores são bytes opacos; a exibição é lossy
    let mut reply = Vec::new();
    if stream.read_until(b'\n', &mut reply).await? == 0 {
        anyhow::bail!("servidor fechou a conexão");
    }
    let reply = String::from_utf8_lossy(&reply);
    Ok(reply.trim_end_matches(['\r', '\n']).to_string())
}
