use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto");
    println!("cargo:rerun-if-env-changed=PROTOC");

    let proto_root = Path::new("proto");
    let src_proto_dir = Path::new("src/proto");

    let proto_files = discover_proto_files(proto_root)?;
    if proto_files.is_empty() {
        println!("cargo:warning=No .proto files found in proto/ directory");
        return Ok(());
    }

    // The generated client is checked in under src/proto, so a machine without
    // protoc still builds. Regenerate only when a compiler is available.
    if !protoc_available() {
        println!("cargo:warning=protoc not found, using checked-in code in src/proto");
        return Ok(());
    }

    for file in &proto_files {
        println!("cargo:rerun-if-changed={}", file.display());
    }

    if !src_proto_dir.exists() {
        fs::create_dir_all(src_proto_dir)?;
    }

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .build_transport(true)
        .out_dir(src_proto_dir)
        .emit_rerun_if_changed(false)
        .compile(&proto_files, &[proto_root])
        .map_err(|e| {
            eprintln!("Failed to compile protobuf files: {}", e);
            eprintln!("Proto files: {:?}", proto_files);
            e
        })?;

    Ok(())
}

/// Collect all .proto files directly under `proto_root`, sorted for a deterministic build.
fn discover_proto_files(proto_root: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut proto_files = Vec::new();
    if !proto_root.exists() {
        return Ok(proto_files);
    }

    for entry in fs::read_dir(proto_root)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("proto") {
            proto_files.push(path);
        }
    }

    proto_files.sort();
    Ok(proto_files)
}

fn protoc_available() -> bool {
    let protoc = env::var_os("PROTOC").unwrap_or_else(|| "protoc".into());
    Command::new(protoc)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
