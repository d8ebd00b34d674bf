fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 使用随包提供的 protoc，构建机器上不需要另外安装
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    tonic_build::compile_protos("proto/echo.proto")?;
    Ok(())
}
