use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use peerlink::config::Config;
use peerlink::{metadata, session};

#[derive(Parser)]
#[command(name = "peerlink", version, about = "Peer-to-peer, end-to-end-encrypted file transfer over a passphrase-derived rendezvous")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Override the rendezvous port used for LAN discovery.
    #[arg(long, global = true)]
    rendezvous_port: Option<u16>,

    /// How long to keep publishing/searching before giving up.
    #[arg(long, global = true, value_name = "SECONDS")]
    discovery_timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Offer a file for transfer and print the passphrase to share.
    Send {
        /// Path of the file to send.
        path: PathBuf,

        /// Plaintext size, in bytes, of each encrypted chunk during transfer.
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<usize>,
    },
    /// Receive a file using a passphrase shared by the sender.
    Receive {
        /// The five-word, dash-joined passphrase printed by `peerlink send`.
        passphrase: String,

        /// Directory to write the received file into. Defaults to the
        /// user's downloads directory, falling back to the current
        /// directory if one cannot be determined.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn build_config(cli: &Cli) -> Config {
    let mut config = Config::default();
    if let Some(port) = cli.rendezvous_port {
        config.rendezvous_port = port;
    }
    if let Some(secs) = cli.discovery_timeout {
        config.discovery_timeout = Duration::from_secs(secs);
    }
    config
}

fn default_output_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn prompt_yes_no(metadata: &metadata::Metadata) -> bool {
    print!("{}", metadata::format_prompt(metadata));
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = build_config(&cli);

    match cli.command {
        Command::Send { path, chunk_size } => {
            let mut config = config;
            if let Some(size) = chunk_size {
                config.chunk_size = size;
            }
            session::run_send(&config, &path).context("send failed")?;
        }
        Command::Receive { passphrase, output } => {
            let output_dir = output.unwrap_or_else(default_output_dir);
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("could not create output directory {}", output_dir.display()))?;

            match session::run_receive(&config, &passphrase, &output_dir, prompt_yes_no)
                .context("receive failed")?
            {
                Some(path) => println!("Saved to {}", path.display()),
                None => println!("Transfer declined."),
            }
        }
    }

    Ok(())
}
