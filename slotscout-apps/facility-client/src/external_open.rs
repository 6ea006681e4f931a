//!  Slotscout Facility Client
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Hand a booking link to the user's default browser.

use std::process::Stdio;

use tokio::process::Command;

use crate::error::{ClientError, Result};

// Never legal unescaped in a URL, and meaningful to a shell.
const SHELL_METACHARACTERS: [char; 6] = ['"', '<', '>', '^', '|', '`'];

/// Only web links leave the process.
pub fn is_openable(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    (lower.starts_with("https://") || lower.starts_with("http://"))
        && !lower
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || SHELL_METACHARACTERS.contains(&c))
}

/// Program and arguments that hand `url` to the default browser on `os`.
///
/// The URL is always a single argument and no shell sits in between, so
/// `&` and `%` in query strings reach the browser untouched.
fn opener_invocation(os: &str, url: &str) -> (&'static str, Vec<String>) {
    match os {
        "windows" => (
            "rundll32",
            vec!["url.dll,FileProtocolHandler".to_string(), url.to_string()],
        ),
        "macos" => ("open", vec![url.to_string()]),
        _ => ("xdg-open", vec![url.to_string()]),
    }
}

fn platform_command(url: &str) -> Command {
    let (program, args) = opener_invocation(std::env::consts::OS, url);
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd
}

/// Spawn the platform opener and return without waiting for it.
pub fn open_external(url: &str) -> Result<()> {
    let url = url.trim();
    if !is_openable(url) {
        return Err(ClientError::ExternalOpen {
            url: url.to_string(),
            reason: "only http(s) links can be opened".to_string(),
        });
    }

    platform_command(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ClientError::ExternalOpen {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    tracing::info!("Opened {} in the default browser", url);
    Ok(())
}
