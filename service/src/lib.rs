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

//! # Serigate Gateway Service
//!
//! The service layer of the serigate serial-to-network gateway: the
//! acceptance loop, the serial line pool, and the per-connection pump.
//!
//! # Architecture
//!
//! ```text
//! GatewayServer ── accepts, claims a line from SerialPool
//!     ↓
//! ConnectionHandler (GatewayHandler by default)
//!     ↓
//! ConnectionSession ── pump loop over three RingBuffers + TelnetMachine
//! ```
//!
//! Every accepted connection is served by exactly one task that owns its
//! whole [`ConnectionSession`]; nothing per-connection is shared. In
//! concurrent mode connections get their own tasks; in iterative mode one
//! connection is served to completion before the next accept. A session
//! speaks either the Telnet/RFC2217 transport or the raw record transport,
//! chosen by [`SessionSettings`].
//!
//! # Example
//!
//! ```no_run
//! use serigate_service::{
//!     GatewayHandler, GatewayServer, SerialPool, ServerConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("0.0.0.0:2217".parse()?);
//!     let pool = SerialPool::new(vec![/* one factory per configured port */]);
//!     let server = GatewayServer::new(config, pool).await?;
//!     server.start(Arc::new(GatewayHandler)).await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod config;
mod error;
mod handler;
mod pool;
mod raw;
mod server;
mod session;

pub use self::config::{ServerConfig, ServiceMode, SessionSettings, TransportMode};
pub use self::error::{GatewayError, Result};
pub use self::handler::{ConnectionHandler, GatewayHandler};
pub use self::pool::{ClaimedLine, OpenLine, SerialIo, SerialLineFactory, SerialPool};
pub use self::raw::{
    MAX_DATA_LEN, MAX_MESSAGE_LEN, PROTOCOL_VERSION, RAW_CHUNK, RawRecord, RawRecordCodec,
    WIRE_SIZE,
};
pub use self::server::GatewayServer;
pub use self::session::{ConnectionSession, ControlEvent, SessionState};
