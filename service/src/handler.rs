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

//! The per-connection handler capability.
//!
//! The acceptance loop does not know how connections are served; it hands
//! each accepted socket, together with the claimed serial line and the
//! session settings, to a [`ConnectionHandler`]. The stock
//! [`GatewayHandler`] runs the standard pump loop; embedders substitute
//! their own handler to interpose on sessions.

use crate::config::SessionSettings;
use crate::error::Result;
use crate::pool::ClaimedLine;
use crate::session::ConnectionSession;
use async_trait::async_trait;
use tokio::net::TcpStream;

/// Serves one accepted connection to completion.
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Runs the connection. The claimed line is released when the handler
    /// returns and drops it.
    async fn handle(
        &self,
        network: TcpStream,
        line: ClaimedLine,
        settings: SessionSettings,
    ) -> Result<()>;
}

/// The stock handler: pumps data between the socket and the serial line
/// according to the configured transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct GatewayHandler;

#[async_trait]
impl ConnectionHandler for GatewayHandler {
    async fn handle(
        &self,
        network: TcpStream,
        line: ClaimedLine,
        settings: SessionSettings,
    ) -> Result<()> {
        ConnectionSession::new(network, line, settings).run().await
    }
}
