fn main() {
    println!("cargo:rerun-if-env-changed=BLOCKPIX_BUILD");
    println!("cargo:rerun-if-env-changed=GITHUB_SHA");

    let target = target_triple_short();
    let sha = git_short_sha().or_else(|| env_short_sha("GITHUB_SHA"));

    let build_id = match std::env::var("BLOCKPIX_BUILD") {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => match sha {
            Some(sha) => format!("{target}+{sha}"),
            None => target,
        },
    };

    println!("cargo:rustc-env=BLOCKPIX_BUILD={}", build_id);
}

fn is_short_sha(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn env_short_sha(name: &str) -> Option<String> {
    let v = std::env::var(name).ok()?;
    let short: String = v.trim().chars().take(7).collect();
    is_short_sha(&short).then(|| short.to_ascii_lowercase())
}

fn git_short_sha() -> Option<String> {
    let out = std::process::Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let s = String::from_utf8(out.stdout).ok()?;
    let s = s.trim();
    is_short_sha(s).then(|| s.to_ascii_lowercase())
}

fn target_triple_short() -> String {
    let os = match std::env::var("CARGO_CFG_TARGET_OS").as_deref() {
        Ok("macos") => "darwin".to_string(),
        Ok(other) => other.to_string(),
        Err(_) => "unknown".to_string(),
    };
    let arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_else(|_| "unknown".to_string());
    format!("{os}-{arch}")
}
