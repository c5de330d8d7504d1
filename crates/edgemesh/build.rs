fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["../../proto/edgemesh/v1/edgemesh.proto"], &["../../proto"])?;

    println!("cargo:rerun-if-changed=../../proto/edgemesh/v1/edgemesh.proto");

    Ok(())
}
