//! 演示服务 `gecko.rpc.echo.Echo` 的消息、客户端与服务端，由 `proto/echo.proto` 生成

tonic::include_proto!("gecko.rpc.echo");
