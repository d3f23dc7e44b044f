use std::process::Command;

/// Short commit hash of the checkout, if this is a git checkout at all.
fn git_short_hash() -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()?;
    let hash = String::from_utf8(out.stdout).ok()?.trim().to_string();
    (!hash.is_empty()).then_some(hash)
}

fn main() {
    println!("cargo:rerun-if-env-changed=STREAMTASKS_VERSION");

    // Release builds pin the version through the environment.
    let version = std::env::var("STREAMTASKS_VERSION").unwrap_or_else(|_| {
        git_short_hash().map_or_else(
            || env!("CARGO_PKG_VERSION").to_string(),
            |hash| format!("{}+{hash}", env!("CARGO_PKG_VERSION")),
        )
    });
    println!("cargo:rustc-env=STREAMTASKS_VERSION={version}");
}
