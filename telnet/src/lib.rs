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

//! # Serigate Telnet Engine
//!
//! The Telnet and RFC2217 Com-Port-Control engine of the serigate gateway.
//! One [`TelnetMachine`] exists per connection and owns all negotiation
//! state; nothing here is global or shared between connections.
//!
//! ## How it differs from a codec
//!
//! This engine does not decode a byte stream into frames. It operates on
//! the connection's ring buffers *in place*: the pump loop fills the
//! network-inbound buffer, and [`TelnetMachine::negotiate`] scans that
//! buffer for `IAC` sequences, answers them, and removes them, so that
//! whatever remains afterwards is pure payload ready to be drained to the
//! serial line. In the other direction [`escape_iac_chars`] doubles literal
//! `0xFF` bytes in the serial-inbound buffer before it is drained to the
//! network.
//!
//! Replies — negotiation answers, CPC suboption responses, the signature —
//! are appended to a third "housekeeping" buffer which the pump flushes to
//! the peer after every negotiation step, unless the session is suspended.
//!
//! ## Negotiation model
//!
//! Option state is a flat table over all 256 option codes with one enable
//! flag per direction and four already-sent flags. An exact (verb, option)
//! pair is sent at most once per session; that, together with the enable
//! checks, is what prevents negotiation loops. Options the gateway does
//! not negotiate are answered with the negative counterpart of the peer's
//! verb.
//!
//! The gateway negotiates Com Port Control, BINARY (tracking an
//! ASCII/BINARY sub-mode per direction), ECHO, SGA, and LOGOUT (which ends
//! the session by clearing the logged-in flag).

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

pub mod consts;
mod cpc;
mod machine;
mod options;
mod result;

pub use self::cpc::Signature;
pub use self::machine::{TelnetMachine, TransmitMode, escape_iac_chars};
pub use self::options::{OptionTable, TelnetOption, Verb};
pub use self::result::{TelnetError, TelnetResult};
