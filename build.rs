fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/auction.proto");

    // protox compiles the descriptor set in-process, so no system protoc is required
    let file_descriptors = protox::compile(["proto/auction.proto"], ["proto"])?;

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_fds(file_descriptors)?;

    Ok(())
}
