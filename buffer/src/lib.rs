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

//! # Serigate Ring Buffers
//!
//! Every serigate connection owns three byte buffers: one for the
//! socket→serial direction, one for serial→socket, and a housekeeping buffer
//! that carries server-generated protocol replies and notices. All three are
//! instances of [`RingBuffer`], a fixed-capacity *linear* byte buffer with an
//! active region delimited by two cursors.
//!
//! ## Why linear and not circular
//!
//! The Telnet layer rewrites buffered data in place while scanning it:
//! negotiation sequences are removed from the middle of the region, and
//! literal `0xFF` bytes get a second `0xFF` inserted next to them. Those
//! splice operations need the active region to be one contiguous slice, so
//! the buffer never wraps. Instead it resets to the arena origin whenever a
//! drain empties it, which in practice happens constantly on an interactive
//! line.
//!
//! ## Cursors
//!
//! - `write_cursor` points at the oldest byte not yet drained.
//! - `read_cursor` points one past the newest byte, i.e. where the next
//!   fill or append will land.
//!
//! The active region is the `len()` bytes starting at `write_cursor`. The
//! buffer is *full* exactly when the cursors meet with data buffered, and
//! *empty* when they meet with none.
//!
//! Fill and drain each perform at most one read or write against the
//! supplied stream, sized to the available room, so a pump loop can await
//! readiness elsewhere and never block mid-transfer. `WouldBlock` and
//! `Interrupted` are reported as zero-byte progress, never as errors.

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

mod ring;

pub use self::ring::{BufferError, RingBuffer, DEFAULT_CAPACITY};
