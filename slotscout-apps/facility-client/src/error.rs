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

//! Error kinds surfaced by the catalog, session and availability clients.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("catalog read failed ({}): {reason}", .path.display())]
    CatalogRead { path: PathBuf, reason: String },

    #[error("session acquisition failed: {0}")]
    SessionAcquisition(String),

    /// Non-2xx answer, transport failure or undecodable body.
    #[error("{}", upstream_message(.status, .message))]
    UpstreamRequest { status: Option<u16>, message: String },

    #[error("could not open external url {url}: {reason}")]
    ExternalOpen { url: String, reason: String },
}

fn upstream_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("upstream request failed with HTTP {code}: {message}"),
        None => format!("upstream request failed: {message}"),
    }
}

impl ClientError {
    pub(crate) fn catalog(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::CatalogRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn transport(reason: impl std::fmt::Display) -> Self {
        Self::UpstreamRequest {
            status: None,
            message: reason.to_string(),
        }
    }

    /// HTTP status of an upstream failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UpstreamRequest { status, .. } => *status,
            _ => None,
        }
    }

    /// 401/403 from the backend, which usually means the session cookies went stale.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}
