use std::net::SocketAddr;

use clap::Parser;
use demos::EchoService;
use flexi_logger::{detailed_format, Logger};
use log::info;

#[derive(Debug, Parser)]
#[clap(author, version, about = "echo service for the standalone demo")]
struct Args {
    /// 监听地址
    #[clap(short, long, default_value = "127.0.0.1:50051")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _logger = Logger::try_with_env_or_str("info")?
        .format(detailed_format)
        .start()?;
    let args = Args::parse();

    info!("echo server listening on {}", args.addr);
    tonic::transport::Server::builder()
        .add_service(EchoService::new_server())
        .serve_with_shutdown(args.addr, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
