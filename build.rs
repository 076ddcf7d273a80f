use std::process::Command;

fn main() {
    // git revision, "unknown" outside a checkout
    let git_hash = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);

    // ffmpeg is needed at runtime for decoding and audio extraction
    let ffmpeg_check = Command::new("ffmpeg")
        .arg("-version")
        .output();

    if ffmpeg_check.is_err() {
        println!("cargo:warning=ffmpeg not found in PATH, decoding and extraction will fail at runtime");
    }

    println!("cargo:rerun-if-changed=build.rs");
}
