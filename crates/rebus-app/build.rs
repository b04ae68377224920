use std::fs;
use std::path::PathBuf;

fn main() {
    let manifest_dir =
        PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("rebus-app manifest dir"));
    let version_path = manifest_dir
        .parent()
        .and_then(|crates| crates.parent())
        .expect("rebus-app lives two levels below the workspace root")
        .join("VERSION");

    println!("cargo:rerun-if-changed={}", version_path.display());

    let raw_version = fs::read_to_string(&version_path).expect("read rebus VERSION file");
    let version = raw_version.trim();
    assert!(
        !version.is_empty(),
        "rebus VERSION file must contain a non-empty version"
    );

    println!("cargo:rustc-env=REBUS_VERSION={version}");
}
