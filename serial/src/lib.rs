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

//! # Serigate Serial Line Control Surface
//!
//! This crate defines the contract between the gateway core and whatever
//! actually owns the serial device: the [`SerialLineControl`] trait for
//! querying and changing line parameters, and the value types those
//! parameters are expressed in.
//!
//! The value types carry their RFC2217 Com-Port-Control wire encodings
//! directly — [`Parity::None`] *is* wire byte `1`, [`StopBits::Two`] *is*
//! wire byte `2` — so the Telnet layer marshals them without a translation
//! table.
//!
//! Platform line-discipline configuration (termios and friends) is
//! deliberately not implemented here; embedders supply their own
//! [`SerialLineControl`] over a real device. [`VirtualSerialLine`] is an
//! in-memory implementation for tests and for gateways whose "serial side"
//! is itself just a byte stream.

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

mod line;
mod types;

pub use self::line::{SerialLineControl, VirtualSerialLine};
pub use self::types::{DataBits, LineSettings, Parity, SerialError, SerialPortInfo, StopBits};
