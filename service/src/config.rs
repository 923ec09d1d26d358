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

//! Resolved gateway configuration.
//!
//! Configuration file parsing lives outside this workspace; whatever reads
//! the operator's config hands the gateway these plain value types.

use std::net::SocketAddr;
use std::time::Duration;

/// How a session carries serial data over TCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Telnet with the RFC2217 Com-Port-Control subset.
    Telnet,
    /// Raw byte pipe with the fixed record framing, no Telnet at all.
    Raw,
}

/// How the server schedules connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    /// One task per accepted connection.
    Concurrent,
    /// One connection served to completion before the next accept.
    Iterative,
}

/// Per-session settings, resolved from the operator's configuration.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Telnet or raw transport.
    pub transport: TransportMode,
    /// Poll interval for modem state changes; bounds the select timeout.
    pub modemstate_poll_interval: Duration,
    /// Poll interval for line state changes; bounds the select timeout.
    pub linestate_poll_interval: Duration,
    /// Disconnect after this much idle time, if set.
    pub idle_timer: Option<Duration>,
    /// Double literal `0xFF` bytes on the serial→socket path.
    pub quote_iac: bool,
    /// Accepted for configuration compatibility; Purge-Data handling is
    /// part of the unimplemented RFC2217 subset.
    pub reply_purge_data: bool,
    /// Capacity of each of the session's three ring buffers.
    pub buffer_size: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            transport: TransportMode::Telnet,
            modemstate_poll_interval: Duration::from_secs(5),
            linestate_poll_interval: Duration::from_secs(5),
            idle_timer: None,
            quote_iac: true,
            reply_purge_data: false,
            buffer_size: 4096,
        }
    }
}

impl SessionSettings {
    /// Settings for a Telnet/RFC2217 session.
    pub fn telnet() -> Self {
        SessionSettings::default()
    }

    /// Settings for a raw gateway session.
    pub fn raw() -> Self {
        SessionSettings {
            transport: TransportMode::Raw,
            ..SessionSettings::default()
        }
    }

    /// Sets the transport mode.
    #[must_use]
    pub fn with_transport(mut self, transport: TransportMode) -> Self {
        self.transport = transport;
        self
    }

    /// Sets both state poll intervals.
    #[must_use]
    pub fn with_poll_intervals(mut self, modemstate: Duration, linestate: Duration) -> Self {
        self.modemstate_poll_interval = modemstate;
        self.linestate_poll_interval = linestate;
        self
    }

    /// Sets or clears the idle disconnect timer.
    #[must_use]
    pub fn with_idle_timer(mut self, idle_timer: Option<Duration>) -> Self {
        self.idle_timer = idle_timer;
        self
    }

    /// Enables or disables IAC quoting on the serial→socket path.
    #[must_use]
    pub fn with_iac_quoting(mut self, quote: bool) -> Self {
        self.quote_iac = quote;
        self
    }

    /// Sets the ring buffer capacity.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }
}

/// Server-level configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_address: SocketAddr,
    /// Concurrent or iterative connection service. The original's third
    /// server type, the raw TCP gateway, is an iterative server whose
    /// sessions use [`TransportMode::Raw`].
    pub service: ServiceMode,
    /// Cap on simultaneously served connections.
    pub max_connections: usize,
    /// Settings applied to every session.
    pub session: SessionSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: "0.0.0.0:1194".parse().expect("static bind address"),
            service: ServiceMode::Concurrent,
            max_connections: 64,
            session: SessionSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Creates a configuration bound to `address` with defaults otherwise.
    pub fn new(address: SocketAddr) -> Self {
        ServerConfig {
            bind_address: address,
            ..ServerConfig::default()
        }
    }

    /// Sets the service mode.
    #[must_use]
    pub fn with_service_mode(mut self, service: ServiceMode) -> Self {
        self.service = service;
        self
    }

    /// Sets the connection cap.
    #[must_use]
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the per-session settings.
    #[must_use]
    pub fn with_session(mut self, session: SessionSettings) -> Self {
        self.session = session;
        self
    }
}
