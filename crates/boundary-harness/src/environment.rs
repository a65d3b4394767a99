//! Execution environment banner.

use std::process::Command;

use serde::{Deserialize, Serialize};

/// What the numbers were measured on; printed in the report header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub harness_version: String,
    pub rustc: String,
    pub platform: String,
    pub build_profile: String,
    pub pinned: bool,
}

impl Environment {
    #[must_use]
    pub fn capture(pinned: bool) -> Self {
        Self {
            harness_version: env!("CARGO_PKG_VERSION").to_string(),
            rustc: rustc_version().unwrap_or_else(|| "unknown".to_string()),
            platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            build_profile: if cfg!(debug_assertions) {
                "debug".to_string()
            } else {
                "release".to_string()
            },
            pinned,
        }
    }

    /// One-line banner, e.g. `harness 0.1.0 | rustc 1.85.0 | linux-x86_64 | release | unpinned`.
    #[must_use]
    pub fn banner(&self) -> String {
        format!(
            "harness {} | {} | {} | {} | {}",
            self.harness_version,
            self.rustc,
            self.platform,
            self.build_profile,
            if self.pinned { "pinned cpu0" } else { "unpinned" }
        )
    }
}

fn rustc_version() -> Option<String> {
    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let output = Command::new(rustc).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
