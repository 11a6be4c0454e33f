//! Build script to inject version and git SHA at compile time.
//!
//! Environment variables (set by CI or fall back to defaults):
//! - AMC_VERSION: Version string (defaults to CARGO_PKG_VERSION)
//! - AMC_GIT_SHA: Git commit SHA (defaults to "unknown" or git rev-parse)

use std::process::Command;

fn main() {
    // Version: prefer AMC_VERSION env var, fall back to CARGO_PKG_VERSION
    let version = std::env::var("AMC_VERSION").unwrap_or_else(|_| {
        std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "unknown".into())
    });
    println!("cargo:rustc-env=AMC_VERSION={}", version);

    // Git SHA: prefer AMC_GIT_SHA, then GITHUB_SHA, then try git command
    let git_sha = std::env::var("AMC_GIT_SHA")
        .ok()
        .or_else(|| std::env::var("GITHUB_SHA").ok().and_then(|s| short_sha(&s)))
        .unwrap_or_else(get_git_sha);
    println!("cargo:rustc-env=AMC_GIT_SHA={}", git_sha);

    // Rebuild if these change
    println!("cargo:rerun-if-env-changed=AMC_VERSION");
    println!("cargo:rerun-if-env-changed=AMC_GIT_SHA");
    println!("cargo:rerun-if-env-changed=GITHUB_SHA");
}

/// First seven characters of a commit SHA, `None` when blank.
pub fn short_sha(sha: &str) -> Option<String> {
    let sha = sha.trim();
    if sha.is_empty() {
        return None;
    }
    Some(sha.chars().take(7).collect())
}

fn get_git_sha() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .and_then(|o| {
            if o.status.success() {
                String::from_utf8(o.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
            } else {
                None
            }
        })
        .unwrap_or_else(|| "unknown".into())
}
