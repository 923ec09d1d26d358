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

use crate::consts::{self, cpc};
use crate::cpc::Signature;
use crate::options::{OptionTable, TelnetOption, Verb};
use serigate_buffer::RingBuffer;
use serigate_serial::SerialLineControl;
use tracing::{debug, info, warn};

/// Transmission sub-mode of one direction of a Telnet connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitMode {
    /// Seven-bit NVT ASCII, the initial mode.
    Ascii,
    /// Eight-bit clean binary, after BINARY is negotiated.
    Binary,
}

impl std::fmt::Display for TransmitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransmitMode::Ascii => write!(f, "ASCII"),
            TransmitMode::Binary => write!(f, "BINARY"),
        }
    }
}

/// The per-connection Telnet negotiation engine.
///
/// One machine exists per gateway session and owns every piece of
/// negotiation state: the option table, the ASCII/BINARY sub-mode of each
/// direction, the logout and suspend flags, the one-shot signature request,
/// and the RFC2217 line/modem state bytes.
///
/// The machine never performs I/O. [`negotiate`](Self::negotiate) rewrites
/// the inbound buffer in place, stripping control sequences as it answers
/// them, and every reply it generates is appended to the housekeeping
/// buffer for the pump loop to flush.
pub struct TelnetMachine {
    pub(crate) options: OptionTable,
    pub(crate) client_mode: TransmitMode,
    pub(crate) server_mode: TransmitMode,
    pub(crate) suspended: bool,
    pub(crate) client_logged_in: bool,
    pub(crate) ask_client_signature: bool,
    pub(crate) signature: Signature,
    pub(crate) linestate: u8,
    pub(crate) modemstate: u8,
    pub(crate) linestate_mask: u8,
    pub(crate) modemstate_mask: u8,
}

impl TelnetMachine {
    /// Creates a fresh engine: every option off, ASCII both ways, client
    /// considered logged in, signature request pending.
    pub fn new(signature: Signature) -> Self {
        TelnetMachine {
            options: OptionTable::new(),
            client_mode: TransmitMode::Ascii,
            server_mode: TransmitMode::Ascii,
            suspended: false,
            client_logged_in: true,
            ask_client_signature: true,
            signature,
            linestate: 0,
            modemstate: 0,
            // these defaults are dictated by RFC2217
            linestate_mask: cpc::DEFAULT_LINESTATE_MASK,
            modemstate_mask: cpc::DEFAULT_MODEMSTATE_MASK,
        }
    }

    /// Is the client still logged in? Cleared when LOGOUT is negotiated.
    pub fn client_logged_in(&self) -> bool {
        self.client_logged_in
    }

    /// Is the session suspended by CPC flow control?
    ///
    /// Flow-control suspend/resume is part of the recognized-but-unhandled
    /// RFC2217 subset, so today this never becomes true; the pump still
    /// honors it everywhere a write is gated on it.
    pub fn suspended(&self) -> bool {
        self.suspended
    }

    /// Sub-mode of the client→server direction.
    pub fn client_mode(&self) -> TransmitMode {
        self.client_mode
    }

    /// Sub-mode of the server→client direction.
    pub fn server_mode(&self) -> TransmitMode {
        self.server_mode
    }

    /// Is `option` enabled client→server?
    pub fn client_option_enabled(&self, option: TelnetOption) -> bool {
        self.options.client_enabled(option)
    }

    /// Is `option` enabled server→client?
    pub fn server_option_enabled(&self, option: TelnetOption) -> bool {
        self.options.server_enabled(option)
    }

    /// Current RFC2217 line state byte.
    pub fn linestate(&self) -> u8 {
        self.linestate
    }

    /// Current RFC2217 modem state byte.
    pub fn modemstate(&self) -> u8 {
        self.modemstate
    }

    /// Mask applied to line state notifications.
    pub fn linestate_mask(&self) -> u8 {
        self.linestate_mask
    }

    /// Mask applied to modem state notifications.
    pub fn modemstate_mask(&self) -> u8 {
        self.modemstate_mask
    }

    /// Records that serial data is ready in the line state byte.
    pub fn note_data_ready(&mut self) {
        self.linestate |= cpc::LINESTATE_DATA_READY;
    }

    /// Records a break condition in the line state byte.
    pub fn note_break(&mut self) {
        self.linestate |= cpc::LINESTATE_BREAK_DETECT;
        info!("break condition signaled on serial line");
    }

    /// Queues the gateway's opening negotiation: Com Port Control, BINARY
    /// both directions, ECHO, and SGA both directions.
    pub fn send_initial_options(&mut self, out: &mut RingBuffer) {
        self.send_option(out, Verb::Do, TelnetOption::ComPortControl);
        self.send_option(out, Verb::Will, TelnetOption::TransmitBinary);
        self.send_option(out, Verb::Do, TelnetOption::TransmitBinary);
        self.send_option(out, Verb::Will, TelnetOption::Echo);
        self.send_option(out, Verb::Will, TelnetOption::SuppressGoAhead);
        self.send_option(out, Verb::Do, TelnetOption::SuppressGoAhead);
    }

    /// Queues `IAC verb option` on the housekeeping buffer, unless that
    /// exact pair already went out this session.
    pub fn send_option(&mut self, out: &mut RingBuffer, verb: Verb, option: TelnetOption) {
        if self.options.was_sent(verb, option) {
            info!(%verb, %option, "telnet option already sent");
            return;
        }
        let frame = [consts::IAC, verb.to_u8(), option.to_u8()];
        let wrote = out.append(&frame);
        if wrote == frame.len() {
            self.options.mark_sent(verb, option);
            info!(%verb, %option, "sent telnet option");
        } else {
            warn!(%verb, %option, "error queueing telnet option");
        }
    }

    /// Scans the inbound buffer for Telnet control sequences, answers them,
    /// and removes them in place so only payload remains for the serial
    /// line.
    ///
    /// The scan covers: escaped literal `0xFF` bytes (one IAC removed, one
    /// kept as payload), verb+option negotiation (answered and removed),
    /// `SB … SE` suboptions (dispatched to the CPC engine when Com Port
    /// Control is enabled client→server, otherwise logged and skipped), and
    /// any other command byte after IAC (treated as a no-op and removed).
    ///
    /// Suboption frames split across reads are not reassembled: when no
    /// `IAC SE` terminator is buffered the scan steps past the three header
    /// bytes and leaves the fragment alone. A trailing sequence whose
    /// option byte has not arrived yet is likewise left for the next fill.
    pub fn negotiate(
        &mut self,
        inbound: &mut RingBuffer,
        out: &mut RingBuffer,
        line: &mut dyn SerialLineControl,
    ) {
        let Some(mut iac) = inbound.find_byte(consts::IAC) else {
            return;
        };
        debug!("processing telnet options received from client");
        // 2 is the minimum telnet command length
        if region_end(inbound) - iac < 2 {
            return;
        }
        loop {
            let Some(next) = inbound.get(iac + 1) else {
                break;
            };
            match next {
                consts::IAC => {
                    // a doubled IAC: drop one, keep the other as payload
                    inbound.remove_range(iac, 1);
                    iac += 1;
                }
                byte if Verb::from_u8(byte).is_some() => {
                    let verb = Verb::from_u8(byte).expect("matched verb byte");
                    let Some(option_byte) = inbound.get(iac + 2) else {
                        // option byte not buffered yet
                        break;
                    };
                    self.respond_option(out, verb, TelnetOption::from_u8(option_byte));
                    inbound.remove_range(iac, 3);
                }
                consts::SB => {
                    let Some(option_byte) = inbound.get(iac + 2) else {
                        break;
                    };
                    let option = TelnetOption::from_u8(option_byte);
                    if option == TelnetOption::ComPortControl
                        && self.options.client_enabled(option)
                    {
                        let offset = iac + 3 - inbound.write_cursor();
                        let payload = &inbound.active()[offset..];
                        if let Err(error) = self.process_cpc_suboption(payload, out, line) {
                            warn!(%error, "dropping telnet CPC suboption");
                        }
                    } else {
                        warn!(%option, "ignoring telnet suboption negotiation");
                    }
                    match inbound.find_byte_at(iac + 3, consts::SE) {
                        Some(se) => {
                            inbound.remove_range(iac, se - iac + 1);
                        }
                        None => {
                            // frame split across reads; skip the header only
                            iac += 3;
                        }
                    }
                }
                byte => {
                    // RFC854: treat anything else after IAC as a no-op
                    warn!(
                        command = consts::command_name(byte),
                        code = byte,
                        "ignoring telnet command"
                    );
                    inbound.remove_range(iac, 2);
                }
            }
            let end = region_end(inbound);
            if end.saturating_sub(iac) < 2 {
                break;
            }
            match inbound.find_byte_at(iac, consts::IAC) {
                Some(position) if end - position >= 2 => iac = position,
                _ => break,
            }
        }
    }

    /// Answers one received verb+option pair.
    fn respond_option(&mut self, out: &mut RingBuffer, verb: Verb, option: TelnetOption) {
        info!(%verb, %option, "received telnet option");
        match option {
            TelnetOption::ComPortControl | TelnetOption::Echo | TelnetOption::SuppressGoAhead => {
                self.respond_known_option(out, verb, option);
            }
            TelnetOption::Logout => {
                self.respond_known_option(out, verb, option);
                if matches!(verb, Verb::Will | Verb::Do) {
                    // client and server agree to the logout
                    self.client_logged_in = false;
                }
            }
            TelnetOption::TransmitBinary => {
                self.respond_binary_option(out, verb, option);
            }
            TelnetOption::Unknown(_) => {
                let answer = match verb {
                    Verb::Will | Verb::Wont => Verb::Dont,
                    Verb::Do | Verb::Dont => Verb::Wont,
                };
                // negative acknowledgement for anything we don't negotiate
                self.send_option(out, answer, option);
            }
        }
    }

    /// Generic accept for options the gateway supports, with the enable
    /// flags breaking option loops.
    fn respond_known_option(&mut self, out: &mut RingBuffer, verb: Verb, option: TelnetOption) {
        match verb {
            Verb::Will => {
                if !self.options.client_enabled(option) {
                    self.send_option(out, Verb::Do, option);
                    self.options.enable_client(option);
                }
            }
            Verb::Wont => {
                if self.options.client_enabled(option) {
                    self.send_option(out, Verb::Dont, option);
                    self.options.disable_client(option);
                }
            }
            Verb::Do => {
                if !self.options.server_enabled(option) {
                    self.send_option(out, Verb::Will, option);
                    self.options.enable_server(option);
                }
            }
            Verb::Dont => {
                if self.options.server_enabled(option) {
                    self.send_option(out, Verb::Wont, option);
                    self.options.disable_server(option);
                }
            }
        }
    }

    /// BINARY gets the generic accept plus the per-direction sub-mode
    /// flags, with mode transitions logged.
    fn respond_binary_option(&mut self, out: &mut RingBuffer, verb: Verb, option: TelnetOption) {
        match verb {
            Verb::Will => {
                if !self.options.client_enabled(option) {
                    self.send_option(out, Verb::Do, option);
                    self.options.enable_client(option);
                    if self.client_mode != TransmitMode::Binary {
                        info!("telnet connection is now in BINARY mode (server <<== client)");
                        self.client_mode = TransmitMode::Binary;
                    }
                }
            }
            Verb::Wont => {
                if self.options.client_enabled(option) {
                    self.send_option(out, Verb::Dont, option);
                    self.options.disable_client(option);
                    if self.client_mode != TransmitMode::Ascii {
                        info!("telnet connection is now in ASCII mode (server <<== client)");
                        self.client_mode = TransmitMode::Ascii;
                    }
                }
            }
            Verb::Do => {
                if !self.options.server_enabled(option) {
                    self.send_option(out, Verb::Will, option);
                    self.options.enable_server(option);
                    if self.server_mode != TransmitMode::Binary {
                        info!("telnet connection is now in BINARY mode (server ==>> client)");
                        self.server_mode = TransmitMode::Binary;
                    }
                }
            }
            Verb::Dont => {
                if self.options.server_enabled(option) {
                    self.send_option(out, Verb::Wont, option);
                    self.options.disable_server(option);
                    if self.server_mode != TransmitMode::Ascii {
                        info!("telnet connection is now in ASCII mode (server ==>> client)");
                        self.server_mode = TransmitMode::Ascii;
                    }
                }
            }
        }
    }
}

/// One past the last byte of the buffer's active region.
fn region_end(buffer: &RingBuffer) -> usize {
    buffer.write_cursor() + buffer.len()
}

/// Doubles every literal `0xFF` in the buffer's active region, in place.
///
/// Called on serial→socket data before it crosses the Telnet boundary so a
/// payload `0xFF` is not taken for a command by the peer. If the buffer
/// runs out of spare room mid-scan the remainder is left unquoted with a
/// warning; the append contract makes truncation non-fatal everywhere else
/// and this path is no different.
pub fn escape_iac_chars(buffer: &mut RingBuffer) {
    let Some(mut iac) = buffer.find_byte(consts::IAC) else {
        return;
    };
    debug!("escaping IAC chars received from serial line");
    loop {
        if let Err(error) = buffer.insert_byte(iac, consts::IAC) {
            warn!(%error, label = buffer.label(), "unable to escape IAC byte");
            return;
        }
        // step past the doubled pair
        iac += 2;
        match buffer.find_byte_at(iac, consts::IAC) {
            Some(position) => iac = position,
            None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serigate_serial::VirtualSerialLine;

    fn machine() -> TelnetMachine {
        TelnetMachine::new(Signature::new("serigate", "0.1.0"))
    }

    fn buffers() -> (RingBuffer, RingBuffer) {
        (
            RingBuffer::new("network", 512),
            RingBuffer::new("housekeeping", 512),
        )
    }

    #[test]
    fn initial_options_go_out_once() {
        let mut engine = machine();
        let (_, mut out) = buffers();
        engine.send_initial_options(&mut out);
        assert_eq!(
            out.active(),
            &[
                consts::IAC, consts::DO, consts::option::COM_PORT_CONTROL,
                consts::IAC, consts::WILL, consts::option::BINARY,
                consts::IAC, consts::DO, consts::option::BINARY,
                consts::IAC, consts::WILL, consts::option::ECHO,
                consts::IAC, consts::WILL, consts::option::SGA,
                consts::IAC, consts::DO, consts::option::SGA,
            ]
        );
        // a second call queues nothing new
        let queued = out.len();
        engine.send_initial_options(&mut out);
        assert_eq!(out.len(), queued);
    }

    #[test]
    fn comport_enables_both_directions_with_one_reply_each() {
        let mut engine = machine();
        let (mut inbound, mut out) = buffers();
        let mut line = VirtualSerialLine::default();

        inbound.append(&[
            consts::IAC, consts::DO, consts::option::COM_PORT_CONTROL,
            consts::IAC, consts::WILL, consts::option::COM_PORT_CONTROL,
        ]);
        engine.negotiate(&mut inbound, &mut out, &mut line);

        assert!(inbound.is_empty());
        assert!(engine.server_option_enabled(TelnetOption::ComPortControl));
        assert!(engine.client_option_enabled(TelnetOption::ComPortControl));
        assert_eq!(
            out.active(),
            &[
                consts::IAC, consts::WILL, consts::option::COM_PORT_CONTROL,
                consts::IAC, consts::DO, consts::option::COM_PORT_CONTROL,
            ]
        );

        // the identical offers again produce no further replies
        out.reset();
        inbound.append(&[
            consts::IAC, consts::DO, consts::option::COM_PORT_CONTROL,
            consts::IAC, consts::WILL, consts::option::COM_PORT_CONTROL,
        ]);
        engine.negotiate(&mut inbound, &mut out, &mut line);
        assert!(inbound.is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn unknown_options_get_negative_acknowledgement() {
        let mut engine = machine();
        let (mut inbound, mut out) = buffers();
        let mut line = VirtualSerialLine::default();

        inbound.append(&[consts::IAC, consts::WILL, 99, consts::IAC, consts::DO, 99]);
        engine.negotiate(&mut inbound, &mut out, &mut line);

        assert!(inbound.is_empty());
        assert_eq!(
            out.active(),
            &[consts::IAC, consts::DONT, 99, consts::IAC, consts::WONT, 99]
        );
    }

    #[test]
    fn logout_clears_the_login_flag() {
        let mut engine = machine();
        let (mut inbound, mut out) = buffers();
        let mut line = VirtualSerialLine::default();

        assert!(engine.client_logged_in());
        inbound.append(&[consts::IAC, consts::DO, consts::option::LOGOUT]);
        engine.negotiate(&mut inbound, &mut out, &mut line);
        assert!(!engine.client_logged_in());
        assert_eq!(
            out.active(),
            &[consts::IAC, consts::WILL, consts::option::LOGOUT]
        );
    }

    #[test]
    fn binary_negotiation_flips_the_modes() {
        let mut engine = machine();
        let (mut inbound, mut out) = buffers();
        let mut line = VirtualSerialLine::default();

        assert_eq!(engine.client_mode(), TransmitMode::Ascii);
        inbound.append(&[
            consts::IAC, consts::WILL, consts::option::BINARY,
            consts::IAC, consts::DO, consts::option::BINARY,
        ]);
        engine.negotiate(&mut inbound, &mut out, &mut line);
        assert_eq!(engine.client_mode(), TransmitMode::Binary);
        assert_eq!(engine.server_mode(), TransmitMode::Binary);

        inbound.append(&[consts::IAC, consts::WONT, consts::option::BINARY]);
        engine.negotiate(&mut inbound, &mut out, &mut line);
        assert_eq!(engine.client_mode(), TransmitMode::Ascii);
        assert_eq!(engine.server_mode(), TransmitMode::Binary);
    }

    #[test]
    fn doubled_iac_passes_through_as_payload() {
        let mut engine = machine();
        let (mut inbound, mut out) = buffers();
        let mut line = VirtualSerialLine::default();

        inbound.append(&[b'a', consts::IAC, consts::IAC, b'b']);
        engine.negotiate(&mut inbound, &mut out, &mut line);
        assert_eq!(inbound.active(), &[b'a', consts::IAC, b'b']);
        assert!(out.is_empty());
    }

    #[test]
    fn stray_command_after_iac_is_dropped() {
        let mut engine = machine();
        let (mut inbound, mut out) = buffers();
        let mut line = VirtualSerialLine::default();

        inbound.append(&[b'x', consts::IAC, consts::BRK, b'y']);
        engine.negotiate(&mut inbound, &mut out, &mut line);
        assert_eq!(inbound.active(), b"xy");
        assert!(out.is_empty());
    }

    #[test]
    fn trailing_partial_command_is_left_buffered() {
        let mut engine = machine();
        let (mut inbound, mut out) = buffers();
        let mut line = VirtualSerialLine::default();

        inbound.append(&[b'x', consts::IAC, consts::WILL]);
        engine.negotiate(&mut inbound, &mut out, &mut line);
        // the verb arrived without its option byte; nothing is consumed yet
        assert_eq!(inbound.active(), &[b'x', consts::IAC, consts::WILL]);
        assert!(out.is_empty());

        // once the option byte shows up the pair is answered
        inbound.append(&[consts::option::ECHO]);
        engine.negotiate(&mut inbound, &mut out, &mut line);
        assert_eq!(inbound.active(), b"x");
        assert_eq!(
            out.active(),
            &[consts::IAC, consts::DO, consts::option::ECHO]
        );
    }

    #[test]
    fn escape_iac_doubles_every_literal() {
        let mut buffer = RingBuffer::new("serial", 512);
        buffer.append(&[1, consts::IAC, 2, consts::IAC, consts::IAC, 3]);
        escape_iac_chars(&mut buffer);
        assert_eq!(
            buffer.active(),
            &[
                1,
                consts::IAC, consts::IAC,
                2,
                consts::IAC, consts::IAC,
                consts::IAC, consts::IAC,
                3
            ]
        );
    }

    #[test]
    fn escape_then_unescape_is_lossless() {
        let mut payload = vec![0u8; 300];
        payload[137] = consts::IAC;
        let mut buffer = RingBuffer::new("serial", 512);
        buffer.append(&payload);
        escape_iac_chars(&mut buffer);
        assert_eq!(buffer.len(), 301);
        assert_eq!(buffer.get(137), Some(consts::IAC));
        assert_eq!(buffer.get(138), Some(consts::IAC));

        // run the escaped bytes through the inbound scan: the doubled IAC
        // collapses back to a single literal
        let mut engine = machine();
        let mut out = RingBuffer::new("housekeeping", 512);
        let mut line = VirtualSerialLine::default();
        let mut inbound = RingBuffer::new("network", 512);
        inbound.append(buffer.active());
        engine.negotiate(&mut inbound, &mut out, &mut line);
        assert_eq!(inbound.active(), &payload[..]);
    }
}
