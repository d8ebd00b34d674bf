use std::time::Duration;

use clap::Parser;
use demos::{echo_factory, EnvOverrides};
use flexi_logger::{detailed_format, Logger};
use gecko_rpc::{CallContext, Config, Dispatcher};
use gecko_rpc_proto::{EchoRequest, EchoResponse};
use log::{error, info, warn};

#[derive(Debug, Parser)]
#[clap(author, version, about = "call the echo service through gecko-rpc")]
struct Args {
    /// 配置文件路径
    #[clap(short, long, default_value = "./standalone.toml")]
    config: String,
    #[clap(short, long, default_value = "echo")]
    service: String,
    #[clap(short, long, default_value = "UnaryEcho")]
    method: String,
    #[clap(long, default_value = "hello gecko")]
    message: String,
    /// 不等待连接建立完成就发起调用
    #[clap(long)]
    no_wait: bool,
    /// 单次调用超时，单位秒
    #[clap(long, default_value_t = 5)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _logger = Logger::try_with_env_or_str("info")?
        .format(detailed_format)
        .start()?;
    let args = Args::parse();

    // 获取配置
    let mut cfg = Config::from_path(&args.config).await?;
    EnvOverrides::from_env()?.apply(&mut cfg.client);

    // 建立连接
    let dispatcher = Dispatcher::from_config(&cfg);
    let setup = dispatcher.start(&cfg.client);
    if !args.no_wait {
        let report = setup.wait().await;
        for (service, e) in &report.failed {
            warn!("service '{}' not ready: {}", service, e);
        }
    }

    // 调用
    let ctx = CallContext::new().with_timeout(Duration::from_secs(args.timeout));
    let req = EchoRequest {
        message: args.message,
    };
    match dispatcher
        .call_rpc::<_, EchoRequest, EchoResponse>(ctx, &echo_factory(), &args.service, &args.method, req)
        .await
    {
        Ok(resp) => info!("{} replied: {}", args.service, resp.message),
        Err(e) => error!("call {}/{} failed ({:?}): {}", args.service, args.method, e.kind(), e),
    }

    dispatcher.close_service_conns();
    Ok(())
}
