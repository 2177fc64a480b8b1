//! Embeds the release version as `SAMPLEMIND_VERSION`.
//!
//! Resolution order: an explicit `SAMPLEMIND_VERSION` in the build
//! environment, then the nearest git tag, then the package version.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=SAMPLEMIND_VERSION");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");

    let version = env::var("SAMPLEMIND_VERSION")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(git_version)
        .unwrap_or_else(|| format!("{}+nogit", env!("CARGO_PKG_VERSION")));

    println!("cargo:rustc-env=SAMPLEMIND_VERSION={}", version);
}

/// `v1.2.0-3-gabc123-dirty` becomes `1.2.0-3-gabc123-dirty`.
fn git_version() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;

    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();
    let version = described.strip_prefix('v').unwrap_or(described);
    (!version.is_empty()).then(|| version.to_string())
}
