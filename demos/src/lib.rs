use gecko_rpc::{ClientConfig, ClientFactory};
use gecko_rpc_proto::{
    echo_client::EchoClient,
    echo_server::{Echo, EchoServer},
    EchoRequest, EchoResponse,
};
use log::debug;
use tonic::{transport::Channel, Request, Response, Status};

/// 环境变量覆盖，前缀 GECKO_
/// * GECKO_ADDRESS: 拨号地址
/// * GECKO_SERVICES: 逗号分隔的服务名
#[derive(Debug, Default, serde::Deserialize)]
pub struct EnvOverrides {
    pub address: Option<String>,
    pub services: Option<Vec<String>>,
}

impl EnvOverrides {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("GECKO_").from_env::<EnvOverrides>()
    }

    pub fn apply(self, cfg: &mut ClientConfig) {
        if let Some(address) = self.address {
            cfg.address = address;
        }
        if let Some(services) = self.services {
            cfg.services = services;
        }
    }
}

/// Echo 服务的客户端工厂
pub fn echo_factory() -> ClientFactory<EchoClient<Channel>> {
    ClientFactory::new("gecko.rpc.echo.Echo", EchoClient::<Channel>::new).method(
        "UnaryEcho",
        |mut client: EchoClient<Channel>, req: Request<EchoRequest>| async move {
            client.unary_echo(req).await
        },
    )
}

/// Echo 服务端，原样返回请求内容
pub struct EchoService;

impl EchoService {
    pub fn new_server() -> EchoServer<EchoService> {
        EchoServer::new(Self)
    }
}

#[tonic::async_trait]
impl Echo for EchoService {
    async fn unary_echo(
        &self,
        request: Request<EchoRequest>,
    ) -> Result<Response<EchoResponse>, Status> {
        let message = request.into_inner().message;
        debug!("echo: {}", message);
        Ok(Response::new(EchoResponse { message }))
    }
}
