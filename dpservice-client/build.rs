fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure()
        .build_server(false) // Client only
        .build_client(true)
        .compile_protos(&["proto/dpdk.proto"], &["proto"])?;
    Ok(())
}
