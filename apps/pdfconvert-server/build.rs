//! Exposes the resolved versions of the main libraries as
//! `LOCKED_VERSION_<NAME>` so diagnostics report what was actually linked.

use std::{env, fs, path::PathBuf};

const REPORTED: &[&str] = &["lopdf", "image", "resvg", "axum", "tokio"];

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_default());
    let lockfile = manifest_dir.join("../../Cargo.lock");
    println!("cargo:rerun-if-changed={}", lockfile.display());

    let lock = fs::read_to_string(&lockfile).unwrap_or_default();
    for name in REPORTED {
        let versions = locked_versions(&lock, name);
        let value = if versions.is_empty() {
            "unknown".to_string()
        } else {
            versions.join(", ")
        };
        println!(
            "cargo:rustc-env=LOCKED_VERSION_{}={}",
            name.to_ascii_uppercase(),
            value
        );
    }
}

/// Versions of every `[[package]]` entry called `name` in a Cargo.lock
fn locked_versions(lock: &str, name: &str) -> Vec<String> {
    let wanted = format!("name = \"{}\"", name);
    let mut versions = Vec::new();
    let mut lines = lock.lines().map(str::trim);

    while let Some(line) = lines.next() {
        if line != wanted {
            continue;
        }
        let version = lines
            .next()
            .and_then(|l| l.strip_prefix("version = \""))
            .and_then(|l| l.strip_suffix('"'));
        if let Some(version) = version {
            if !versions.iter().any(|v| v == version) {
                versions.push(version.to_string());
            }
        }
    }
    versions
}
