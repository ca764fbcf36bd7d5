use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Longest quiet period honoured; larger configured values are capped.
pub const MAX_QUIET_PERIOD_MS: u64 = 60_000;

/// How the launched server announces that it is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServerFlavor {
    /// Both a listening URL and a separate "ready" line are required.
    #[default]
    ReadyMarker,
    /// The listening URL alone is enough.
    UrlOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShellKind {
    Posix,
    PowerShell,
}

impl Default for ShellKind {
    fn default() -> Self {
        if cfg!(target_os = "windows") {
            ShellKind::PowerShell
        } else {
            ShellKind::Posix
        }
    }
}

/// Regular expressions for the terminal milestones. Capture group 1, when
/// present, is the extracted value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerPatterns {
    pub runtime_version: String,
    pub runtime_installed: String,
    pub bundle_unpacked: String,
    pub failure: String,
    pub server_listening: String,
    pub server_ready: String,
}

impl Default for MarkerPatterns {
    fn default() -> Self {
        Self {
            runtime_version: r"^deno (\d+(?:\.\d+)*)".to_string(),
            runtime_installed: r"Deno was installed successfully(?: to (.+))?".to_string(),
            bundle_unpacked: r"Bundle unpacked(?: to (.+))?".to_string(),
            failure: r"^Error: (.+)".to_string(),
            server_listening: r"Local:\s*(https?://[A-Za-z0-9._~:/?#@!$&'()*+,;=%\[\]-]+)?"
                .to_string(),
            server_ready: r"Ready in \d+(?:\.\d+)?m?s".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchSettings {
    /// Where the application bundle archive is downloaded from.
    pub bundle_url: String,
    pub bundle_file_name: String,
    pub runtime_version: String,
    pub runtime_download_base: String,
    /// Command used when the runtime path was never resolved.
    pub runtime_command: String,
    /// Application directory. `None` lets the engine pick one under the home dir.
    pub app_dir: Option<String>,
    pub server_entrypoint: String,
    pub server_args: Vec<String>,
    pub server_flavor: ServerFlavor,
    pub fallback_port: Option<u16>,
    pub quiet_period_ms: u64,
    /// Attempts allowed for the prerequisite query and the runtime install.
    pub retry_bound: u32,
    /// Quiet periods to wait for an install/unpack marker. `None` waits forever.
    pub marker_wait_limit: Option<u32>,
    pub line_separator: char,
    pub shell: ShellKind,
    pub terminal_rows: u16,
    pub terminal_cols: u16,
    pub markers: MarkerPatterns,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            bundle_url: String::new(),
            bundle_file_name: "lobe-chat_v1.36.11.zip".to_string(),
            runtime_version: "2.1.4".to_string(),
            runtime_download_base: "https://github.com/denoland/deno/releases/download"
                .to_string(),
            runtime_command: "deno".to_string(),
            app_dir: None,
            server_entrypoint: "server.cjs".to_string(),
            server_args: vec!["run".to_string(), "--allow-all".to_string()],
            server_flavor: ServerFlavor::default(),
            fallback_port: None,
            quiet_period_ms: 800,
            retry_bound: 3,
            marker_wait_limit: None,
            line_separator: '\n',
            shell: ShellKind::default(),
            terminal_rows: 24,
            terminal_cols: 80,
            markers: MarkerPatterns::default(),
        }
    }
}

impl LaunchSettings {
    /// Quiet period, capped at [`MAX_QUIET_PERIOD_MS`].
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms.min(MAX_QUIET_PERIOD_MS))
    }

    /// Retry bound, never below a single attempt.
    pub fn attempts_allowed(&self) -> u32 {
        self.retry_bound.max(1)
    }

    pub fn requires_ready_marker(&self) -> bool {
        self.server_flavor == ServerFlavor::ReadyMarker
    }

    pub fn fallback_url(&self) -> Option<String> {
        self.fallback_port
            .map(|port| format!("http://localhost:{port}"))
    }
}
