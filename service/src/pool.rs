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

//! The serial line pool.
//!
//! A gateway serves a bounded set of serial lines. Each accepted connection
//! claims exactly one line for its exclusive duration and the claim is
//! released when the [`ClaimedLine`] drops, after the session has restored
//! the line's original parameters. Advisory lockfile coordination with
//! other programs on the host is out of scope; the pool only arbitrates
//! between this gateway's own connections.

use crate::error::Result;
use serigate_serial::{SerialLineControl, SerialPortInfo};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

/// The duplex byte stream side of a serial line.
pub trait SerialIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> SerialIo for T {}

/// Opens a serial line on demand.
///
/// A factory describes one configured port and can open it into a byte
/// stream plus a control handle. Opening may fail (device unplugged,
/// permissions); the pool then leaves the slot free and tries the next.
pub trait SerialLineFactory: Send + Sync {
    /// Metadata for the port this factory opens.
    fn info(&self) -> &SerialPortInfo;

    /// Opens the device.
    fn open(&self) -> Result<OpenLine>;
}

/// An opened but not yet claimed serial line.
pub struct OpenLine {
    /// The byte stream carrying serial data.
    pub io: Box<dyn SerialIo>,
    /// The line parameter control surface.
    pub control: Box<dyn SerialLineControl>,
}

/// A serial line claimed for one connection's exclusive use.
pub struct ClaimedLine {
    /// The byte stream carrying serial data.
    pub io: Box<dyn SerialIo>,
    /// The line parameter control surface.
    pub control: Box<dyn SerialLineControl>,
    /// Port metadata, used for logging and the RFC2217 signature.
    pub info: SerialPortInfo,
    pub(crate) permit: Option<PoolPermit>,
}

impl ClaimedLine {
    /// Wraps a line that does not belong to any pool, for embedders that
    /// manage a single port themselves.
    pub fn detached(
        io: Box<dyn SerialIo>,
        control: Box<dyn SerialLineControl>,
        info: SerialPortInfo,
    ) -> Self {
        ClaimedLine {
            io,
            control,
            info,
            permit: None,
        }
    }
}

impl std::fmt::Debug for ClaimedLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimedLine")
            .field("info", &self.info)
            .field("pooled", &self.permit.is_some())
            .finish()
    }
}

/// Returns the slot to the pool when the claim ends.
pub(crate) struct PoolPermit {
    inner: Arc<PoolInner>,
    index: usize,
}

impl Drop for PoolPermit {
    fn drop(&mut self) {
        let slot = &self.inner.slots[self.index];
        slot.busy.store(false, Ordering::Release);
        debug!(device = %slot.factory.info().device, "released serial line");
    }
}

struct PoolSlot {
    factory: Box<dyn SerialLineFactory>,
    busy: AtomicBool,
}

struct PoolInner {
    slots: Vec<PoolSlot>,
}

/// A bounded pool of serial lines with busy-flag arbitration.
#[derive(Clone)]
pub struct SerialPool {
    inner: Arc<PoolInner>,
}

impl SerialPool {
    /// Builds a pool over the configured port factories.
    pub fn new(factories: Vec<Box<dyn SerialLineFactory>>) -> Self {
        let slots = factories
            .into_iter()
            .map(|factory| PoolSlot {
                factory,
                busy: AtomicBool::new(false),
            })
            .collect();
        SerialPool {
            inner: Arc::new(PoolInner { slots }),
        }
    }

    /// Number of configured lines.
    pub fn len(&self) -> usize {
        self.inner.slots.len()
    }

    /// True when no lines are configured.
    pub fn is_empty(&self) -> bool {
        self.inner.slots.is_empty()
    }

    /// Number of lines not currently claimed.
    pub fn available(&self) -> usize {
        self.inner
            .slots
            .iter()
            .filter(|slot| !slot.busy.load(Ordering::Acquire))
            .count()
    }

    /// Claims the first free line that opens successfully.
    ///
    /// Returns `None` when every line is busy or failed to open; the caller
    /// turns that into a polite rejection of the connection.
    pub fn claim(&self) -> Option<ClaimedLine> {
        for (index, slot) in self.inner.slots.iter().enumerate() {
            if slot
                .busy
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                match slot.factory.open() {
                    Ok(open) => {
                        let info = slot.factory.info().clone();
                        debug!(device = %info.device, "claimed serial line");
                        return Some(ClaimedLine {
                            io: open.io,
                            control: open.control,
                            info,
                            permit: Some(PoolPermit {
                                inner: Arc::clone(&self.inner),
                                index,
                            }),
                        });
                    }
                    Err(error) => {
                        warn!(
                            %error,
                            device = %slot.factory.info().device,
                            "unable to open serial line"
                        );
                        slot.busy.store(false, Ordering::Release);
                    }
                }
            }
        }
        None
    }
}

impl std::fmt::Debug for SerialPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPool")
            .field("lines", &self.len())
            .field("available", &self.available())
            .finish()
    }
}
