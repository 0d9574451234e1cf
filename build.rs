use chrono::DateTime;
use std::io::Write;
use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn commit_date(timestamp: &str) -> Option<String> {
    let seconds = timestamp.parse::<i64>().ok()?;
    let date = DateTime::from_timestamp(seconds, 0)?;
    Some(date.format("%Y-%m-%d").to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let version = env!("CARGO_PKG_VERSION");

    // Outside a git checkout (e.g. a packaged tarball) only the crate version is known.
    let app_version = match git(&["rev-parse", "--short", "HEAD"]) {
        Some(sha) => {
            let date = git(&["log", "-1", "--format=%ct"])
                .and_then(|ts| commit_date(&ts))
                .unwrap_or_else(|| "unknown date".to_string());
            format!("{} ({} {})", version, sha, date)
        }
        None => version.to_string(),
    };

    let mut stdout = std::io::stdout();
    writeln!(stdout, "cargo:rustc-env=APP_VERSION={}", app_version)?;

    Ok(())
}
