//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Error types for the gateway service.

use thiserror::Error;

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Gateway service error types.
///
/// None of these are process-fatal: a session error ends that session, and
/// the server keeps accepting connections.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Hard I/O failure on the network or serial stream. Would-block and
    /// interrupted conditions never surface here; the buffers swallow them
    /// as zero-byte progress.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial line rejected a control operation.
    #[error("serial line error: {0}")]
    Serial(#[from] serigate_serial::SerialError),

    /// Telnet protocol framing problem.
    #[error("protocol error: {0}")]
    Protocol(#[from] serigate_telnet::TelnetError),

    /// Every serial line in the pool is claimed or failed to open.
    #[error("no serial line available")]
    PoolExhausted,

    /// The server is not running.
    #[error("server not running")]
    ServerNotRunning,

    /// The server is already running.
    #[error("server already running")]
    ServerAlreadyRunning,

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl GatewayError {
    /// Does this error end only the current session, leaving the server
    /// accepting new connections?
    pub fn is_session_scoped(&self) -> bool {
        matches!(
            self,
            GatewayError::Io(_)
                | GatewayError::Serial(_)
                | GatewayError::Protocol(_)
                | GatewayError::PoolExhausted
        )
    }
}
