//! Minimal CLI over `keepersession`, mirroring the common `zkCli.sh` shape.

use clap::{Parser, Subcommand};
use keepersession::{ClientConfig, CreateMode, KeeperClient};
use std::time::Duration;

#[derive(Parser)]
struct Cli {
    #[arg(long, default_value = "localhost:2181")]
    connect_string: String,

    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    #[arg(long)]
    chroot: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a persistent znode with the given data.
    Create { path: String, data: String },
    /// Print a znode's data.
    Get { path: String },
    /// List a znode's children.
    Ls { path: String },
}

#[tokio::main]
async fn main() -> keepersession::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut config = ClientConfig::new(&cli.connect_string, Duration::from_secs(cli.timeout_secs))?;
    if let Some(chroot) = &cli.chroot {
        config = config.with_chroot(chroot.clone())?;
    }
    let client = KeeperClient::connect(config);

    match cli.command {
        Command::Create { path, data } => {
            let created = client.create(&path, data.as_bytes(), CreateMode::Persistent).await?;
            println!("Created {created}");
        }
        Command::Get { path } => {
            let (data, stat) = client.get_data(&path, None, None).await?;
            println!("{}", String::from_utf8_lossy(&data));
            println!("czxid = {}, version = {}", stat.czxid, stat.version);
        }
        Command::Ls { path } => {
            let children = client.get_children(&path, None, None).await?;
            for child in children {
                println!("{child}");
            }
        }
    }

    Ok(())
}
