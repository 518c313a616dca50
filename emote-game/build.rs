//! Build script for emote-game
//!
//! Exposes GIT_HASH, BUILD_TIMESTAMP and BUILD_PROFILE to the binary, which
//! logs them in its startup banner.

use std::process::Command;

/// Short commit hash of the checkout, if built from a git tree
fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string()).filter(|h| !h.is_empty())
}

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env={}={}", key, value);
}

fn main() {
    let unknown = || "unknown".to_string();

    emit("GIT_HASH", &git_short_hash().unwrap_or_else(unknown));
    emit(
        "BUILD_TIMESTAMP",
        &chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    );
    emit("BUILD_PROFILE", &std::env::var("PROFILE").unwrap_or_else(|_| unknown()));
}
