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

//! The per-connection pump loop.
//!
//! A [`ConnectionSession`] owns everything one connection needs: the two
//! halves of the network stream, the two halves of the serial stream, the
//! line control handle, the three ring buffers, and the Telnet engine. It
//! is driven by exactly one task; nothing in here is shared or locked.
//!
//! Each loop iteration waits for the network or the serial side to deliver
//! bytes, or for the poll timer to expire, then moves data along its path:
//!
//! - network → `socket_to_serial` buffer → (Telnet mode) negotiation strips
//!   control sequences in place → serial line;
//! - serial → `serial_to_socket` buffer → (Telnet mode, quoting on) IAC
//!   escaping in place → network;
//! - engine replies accumulate in the `housekeeping` buffer and flush to
//!   the network after every negotiation step.
//!
//! The timer branch accumulates idle time; when the configured idle limit
//! is reached the peer gets a notice and (in Telnet mode) a LOGOUT offer,
//! one more pass to answer, and then the session ends. Control events —
//! break conditions, debug-level adjustments — arrive through a queue that
//! is polled once per iteration, keeping the loop deterministic.

use crate::config::{SessionSettings, TransportMode};
use crate::error::Result;
use crate::pool::{ClaimedLine, SerialIo};
use crate::raw::{MAX_DATA_LEN, RAW_CHUNK, RawRecord, RawRecordCodec, WIRE_SIZE};
use bytes::BytesMut;
use serigate_buffer::RingBuffer;
use serigate_serial::{LineSettings, SerialLineControl, SerialPortInfo};
use serigate_telnet::{
    Signature, TelnetMachine, TelnetOption, Verb, consts, escape_iac_chars,
};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::codec::Encoder;
use tracing::{debug, info, trace, warn};

/// Notice sent to the peer before an idle disconnect.
const IDLE_NOTICE: &[u8] = b"\r\nserigate: terminating idle connection\r\n";

/// Grace period for the peer to answer the logout offer.
const IDLE_GRACE: Duration = Duration::from_millis(250);

/// External control indications, polled once per pump iteration.
///
/// The original delivered these as process signals; here they arrive
/// through a queue so the loop stays deterministic and testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// A break condition on the serial line.
    Break,
    /// Raise or lower the diagnostic verbosity by the given amount.
    AdjustDebugLevel(i8),
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Initial option offers are being sent.
    NegotiatingInit,
    /// Data is being pumped.
    Active,
    /// The idle notice went out; one more pass for the peer's reply.
    IdleWarning,
    /// The pump loop has exited.
    Terminated,
}

/// One connection's pump state. See the module documentation.
pub struct ConnectionSession<N>
where
    N: AsyncRead + AsyncWrite + Send,
{
    network_read: ReadHalf<N>,
    network_write: WriteHalf<N>,
    serial_read: ReadHalf<Box<dyn SerialIo>>,
    serial_write: WriteHalf<Box<dyn SerialIo>>,
    line: Box<dyn SerialLineControl>,
    info: SerialPortInfo,
    original_settings: LineSettings,
    settings: SessionSettings,
    telnet: TelnetMachine,
    socket_to_serial: RingBuffer,
    serial_to_socket: RingBuffer,
    housekeeping: RingBuffer,
    control_tx: mpsc::UnboundedSender<ControlEvent>,
    control_rx: mpsc::UnboundedReceiver<ControlEvent>,
    state: SessionState,
    _permit: Option<crate::pool::PoolPermit>,
}

impl<N> ConnectionSession<N>
where
    N: AsyncRead + AsyncWrite + Send,
{
    /// Builds a session over an accepted network stream and a claimed
    /// serial line. The line's current parameters are captured so they can
    /// be restored at teardown.
    pub fn new(network: N, line: ClaimedLine, settings: SessionSettings) -> Self {
        let (network_read, network_write) = tokio::io::split(network);
        let ClaimedLine {
            io,
            control,
            info,
            permit,
        } = line;
        let (serial_read, serial_write) = tokio::io::split(io);
        let original_settings = control.settings();

        let mut signature =
            Signature::new("serigate", env!("CARGO_PKG_VERSION")).with_device(info.device.clone());
        if let Some(description) = &info.description {
            signature = signature.with_description(description.clone());
        }

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        ConnectionSession {
            network_read,
            network_write,
            serial_read,
            serial_write,
            line: control,
            info,
            original_settings,
            telnet: TelnetMachine::new(signature),
            socket_to_serial: RingBuffer::new("network", settings.buffer_size),
            serial_to_socket: RingBuffer::new("serial", settings.buffer_size),
            housekeeping: RingBuffer::new("housekeeping", settings.buffer_size),
            settings,
            control_tx,
            control_rx,
            state: SessionState::NegotiatingInit,
            _permit: permit,
        }
    }

    /// A handle for injecting [`ControlEvent`]s into this session.
    pub fn control_handle(&self) -> mpsc::UnboundedSender<ControlEvent> {
        self.control_tx.clone()
    }

    /// Runs the pump until the session ends.
    ///
    /// Returns `Ok` for every orderly ending — logout, idle disconnect,
    /// end-of-stream on either side — and `Err` only for hard I/O errors.
    /// Either way the serial line is restored to its original parameters
    /// before returning, and the line claim is released on drop.
    pub async fn run(mut self) -> Result<()> {
        info!(
            device = %self.info.device,
            transport = ?self.settings.transport,
            "gateway session starting"
        );
        let result = match self.settings.transport {
            TransportMode::Telnet => self.run_telnet().await,
            TransportMode::Raw => self.run_raw().await,
        };
        self.state = SessionState::Terminated;

        // hand the line back the way we found it
        if let Err(error) = self.line.apply(&self.original_settings) {
            warn!(%error, "unable to restore original serial line settings");
        }
        match &result {
            Ok(()) => info!(
                device = %self.info.device,
                state = ?self.state,
                "gateway session ended"
            ),
            Err(error) => warn!(
                %error,
                device = %self.info.device,
                "gateway session failed"
            ),
        }
        result
    }

    async fn run_telnet(&mut self) -> Result<()> {
        self.telnet.send_initial_options(&mut self.housekeeping);
        self.flush_housekeeping().await?;
        self.state = SessionState::Active;

        let tick = self.wait_interval();
        let mut idle_accumulated = Duration::ZERO;
        let mut idle = false;

        loop {
            if !self.telnet.client_logged_in() {
                debug!("client logged out");
                break;
            }
            if idle {
                // the peer had its one pass to answer the logout offer
                break;
            }
            if let Some(limit) = self.settings.idle_timer {
                if idle_accumulated >= limit {
                    idle = true;
                    self.enter_idle_warning().await?;
                }
            }

            // move along anything a previous partial write left behind
            if !self.socket_to_serial.is_empty() {
                self.socket_to_serial.drain_to(&mut self.serial_write).await?;
            }
            if !self.serial_to_socket.is_empty() && !self.telnet.suspended() {
                self.serial_to_socket.drain_to(&mut self.network_write).await?;
            }

            let network_room = self.socket_to_serial.room_to_read() > 0;
            let serial_room = self.serial_to_socket.room_to_read() > 0;
            tokio::select! {
                result = self.socket_to_serial.fill_from(&mut self.network_read),
                    if network_room =>
                {
                    let count = result?;
                    if count == 0 && self.socket_to_serial.eof() {
                        debug!("eof on network socket");
                        break;
                    }
                    if count > 0 {
                        idle_accumulated = Duration::ZERO;
                        self.pump_network().await?;
                    }
                }
                result = self.serial_to_socket.fill_from(&mut self.serial_read),
                    if serial_room =>
                {
                    let count = result?;
                    if count == 0 && self.serial_to_socket.eof() {
                        debug!("eof on serial line");
                        break;
                    }
                    if count > 0 {
                        idle_accumulated = Duration::ZERO;
                        self.pump_serial().await?;
                    }
                }
                () = sleep(tick) => {
                    idle_accumulated += tick;
                    trace!(?idle_accumulated, "pump timer expired");
                }
            }

            self.poll_control_events();
        }
        Ok(())
    }

    /// Socket bytes arrived: negotiate in place, flush replies, and drain
    /// the remaining payload to the serial line.
    async fn pump_network(&mut self) -> Result<()> {
        self.socket_to_serial.dump(false);
        if self.socket_to_serial.find_byte(consts::IAC).is_some() {
            self.telnet.negotiate(
                &mut self.socket_to_serial,
                &mut self.housekeeping,
                self.line.as_mut(),
            );
            self.flush_housekeeping().await?;
        }
        let count = self.socket_to_serial.drain_to(&mut self.serial_write).await?;
        metrics::counter!("serigate_bytes_to_serial").increment(count as u64);
        Ok(())
    }

    /// Serial bytes arrived: quote IAC if configured and drain to the
    /// network peer.
    async fn pump_serial(&mut self) -> Result<()> {
        self.telnet.note_data_ready();
        self.serial_to_socket.dump(false);
        if self.settings.quote_iac && self.serial_to_socket.find_byte(consts::IAC).is_some() {
            escape_iac_chars(&mut self.serial_to_socket);
        }
        if !self.telnet.suspended() {
            let count = self.serial_to_socket.drain_to(&mut self.network_write).await?;
            metrics::counter!("serigate_bytes_to_network").increment(count as u64);
            self.network_write.flush().await?;
        }
        Ok(())
    }

    /// Flushes queued protocol replies and notices to the peer, unless the
    /// session is suspended.
    async fn flush_housekeeping(&mut self) -> Result<()> {
        if self.telnet.suspended() {
            return Ok(());
        }
        while !self.housekeeping.is_empty() {
            self.housekeeping.dump(false);
            if self.housekeeping.drain_to(&mut self.network_write).await? == 0 {
                break;
            }
        }
        self.network_write.flush().await?;
        Ok(())
    }

    /// Sends the idle notice and, in Telnet mode, the logout offer, then
    /// pauses briefly so the peer's reply can arrive.
    async fn enter_idle_warning(&mut self) -> Result<()> {
        self.state = SessionState::IdleWarning;
        info!(device = %self.info.device, "terminating idle connection");
        self.housekeeping.append(IDLE_NOTICE);
        if self.settings.transport == TransportMode::Telnet {
            self.telnet
                .send_option(&mut self.housekeeping, Verb::Do, TelnetOption::Logout);
        }
        self.flush_housekeeping().await?;
        sleep(IDLE_GRACE).await;
        Ok(())
    }

    /// The select timeout: the shorter of the state poll intervals, capped
    /// by the idle timer when one is configured.
    fn wait_interval(&self) -> Duration {
        let mut tick = self
            .settings
            .modemstate_poll_interval
            .min(self.settings.linestate_poll_interval);
        if let Some(idle) = self.settings.idle_timer {
            tick = tick.min(idle);
        }
        tick
    }

    /// Drains the control-event queue, once per loop iteration.
    fn poll_control_events(&mut self) {
        while let Ok(event) = self.control_rx.try_recv() {
            match event {
                ControlEvent::Break => self.telnet.note_break(),
                ControlEvent::AdjustDebugLevel(delta) => {
                    info!(delta, "debug level adjustment requested");
                }
            }
        }
    }

    /// The raw gateway loop: no Telnet interpretation, fixed record
    /// framing on the serial→socket path.
    async fn run_raw(&mut self) -> Result<()> {
        self.state = SessionState::Active;
        let tick = self.wait_interval();
        let mut idle_accumulated = Duration::ZERO;
        let mut idle = false;
        let mut socket_chunk = [0u8; RAW_CHUNK];
        let mut serial_chunk = [0u8; MAX_DATA_LEN];
        let mut codec = RawRecordCodec::new();

        loop {
            if idle {
                break;
            }
            if let Some(limit) = self.settings.idle_timer {
                if idle_accumulated >= limit {
                    idle = true;
                    self.state = SessionState::IdleWarning;
                    info!(device = %self.info.device, "terminating idle raw connection");
                    self.network_write.write_all(IDLE_NOTICE).await?;
                }
            }
            tokio::select! {
                result = self.network_read.read(&mut socket_chunk[..RAW_CHUNK - 1]) => {
                    let count = result?;
                    if count == 0 {
                        debug!("eof on network socket");
                        break;
                    }
                    idle_accumulated = Duration::ZERO;
                    trace!(count, "raw socket chunk");
                    // forward as-is, NUL terminated, to the serial line
                    socket_chunk[count] = 0;
                    self.serial_write.write_all(&socket_chunk[..count + 1]).await?;
                    metrics::counter!("serigate_bytes_to_serial").increment((count + 1) as u64);
                }
                result = self.serial_read.read(&mut serial_chunk) => {
                    let count = result?;
                    if count == 0 {
                        debug!("eof on serial line");
                        break;
                    }
                    idle_accumulated = Duration::ZERO;
                    trace!(count, "raw serial chunk");
                    let record = RawRecord::from_serial(&serial_chunk[..count]);
                    let mut wire = BytesMut::with_capacity(WIRE_SIZE);
                    codec.encode(record, &mut wire)?;
                    self.network_write.write_all(&wire).await?;
                    metrics::counter!("serigate_bytes_to_network").increment(wire.len() as u64);
                }
                () = sleep(tick) => {
                    idle_accumulated += tick;
                }
            }
            self.poll_control_events();
        }
        Ok(())
    }
}

impl<N> std::fmt::Debug for ConnectionSession<N>
where
    N: AsyncRead + AsyncWrite + Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("device", &self.info.device)
            .field("transport", &self.settings.transport)
            .field("state", &self.state)
            .finish()
    }
}
