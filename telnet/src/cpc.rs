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

//! The RFC2217 Com-Port-Control subprotocol engine.
//!
//! Com-Port-Control rides inside Telnet subnegotiation frames:
//! `IAC SB 44 <suboption code> <command> IAC SE`. A command of exactly 1, 2
//! or 4 bytes is a network-order integer; the zero value doubles as the
//! "query, don't set" sentinel for the line-parameter suboptions. Literal
//! `0xFF` bytes inside a command are IAC-doubled on the wire.
//!
//! The gateway implements the subset the original implemented: signature
//! exchange and the four line-parameter suboptions (baud rate, data size,
//! parity, stop size). The remaining codes — control lines, line/modem
//! state masks and notifications, flow control suspend/resume, purge data —
//! are recognized and logged but not acted upon.

use crate::consts::{self, cpc};
use crate::machine::TelnetMachine;
use crate::result::{TelnetError, TelnetResult};
use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, BytesMut};
use serigate_buffer::RingBuffer;
use serigate_serial::{DataBits, Parity, SerialLineControl, StopBits};
use tracing::{debug, info, trace, warn};

/// The gateway's RFC2217 signature: program name and version, optionally
/// followed by the claimed device and its description.
#[derive(Debug, Clone)]
pub struct Signature {
    program: String,
    version: String,
    device: Option<String>,
    description: Option<String>,
}

impl Signature {
    /// Creates a signature from the program name and version string.
    pub fn new(program: impl Into<String>, version: impl Into<String>) -> Self {
        Signature {
            program: program.into(),
            version: version.into(),
            device: None,
            description: None,
        }
    }

    /// Appends the serial device path to the signature.
    #[must_use]
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Appends the device description to the signature.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Renders `"program version[, device][, description]"`.
    pub fn render(&self) -> String {
        let mut text = format!("{} {}", self.program, self.version);
        if let Some(device) = &self.device {
            text.push_str(", ");
            text.push_str(device);
        }
        if let Some(description) = &self.description {
            text.push_str(", ");
            text.push_str(description);
        }
        text
    }
}

impl TelnetMachine {
    /// The signature this session announces.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Parses and dispatches one CPC suboption.
    ///
    /// `data` starts at the suboption code (the byte after `IAC SB 44`) and
    /// runs to the end of the buffered region; the terminating `IAC SE` is
    /// located here. Replies are queued on the housekeeping buffer.
    pub(crate) fn process_cpc_suboption(
        &mut self,
        data: &[u8],
        out: &mut RingBuffer,
        line: &mut dyn SerialLineControl,
    ) -> TelnetResult<()> {
        if data.len() < 3 {
            return Err(TelnetError::TruncatedSuboption {
                available: data.len(),
            });
        }
        let suboptcode = data[0];
        let rest = &data[1..];
        let se = rest
            .iter()
            .position(|&byte| byte == consts::SE)
            .ok_or(TelnetError::UnterminatedSuboption)?;
        if se == 0 || rest[se - 1] != consts::IAC {
            return Err(TelnetError::BadSuboptionTerminator);
        }

        // the command may be empty; cap it and undo IAC doubling
        let mut len = se - 1;
        if len >= cpc::MAX_COMMAND_LEN {
            warn!(
                suboption = cpc::name(suboptcode),
                len, "telnet CPC command truncated to maximum"
            );
            len = cpc::MAX_COMMAND_LEN - 1;
        }
        let mut command = rest[..len].to_vec();
        undouble_iac(&mut command);

        let value = command_value(&command);
        log_suboption("received", suboptcode, value, &command);

        match suboptcode {
            cpc::SIGNATURE_C2S | cpc::SIGNATURE_S2C => self.respond_signature(out, &command),
            cpc::SET_BAUDRATE_C2S | cpc::SET_BAUDRATE_S2C => {
                self.respond_baudrate(out, line, value);
            }
            cpc::SET_DATASIZE_C2S | cpc::SET_DATASIZE_S2C => {
                self.respond_datasize(out, line, value);
            }
            cpc::SET_PARITY_C2S | cpc::SET_PARITY_S2C => self.respond_parity(out, line, value),
            cpc::SET_STOPSIZE_C2S | cpc::SET_STOPSIZE_S2C => {
                self.respond_stopsize(out, line, value);
            }
            other => {
                // recognized but deliberately not acted upon
                debug!(
                    suboption = cpc::name(other),
                    code = other,
                    "telnet CPC suboption not implemented"
                );
            }
        }
        Ok(())
    }

    /// An empty command asks for our signature; a non-empty one carries the
    /// peer's.
    fn respond_signature(&mut self, out: &mut RingBuffer, command: &[u8]) {
        if command.is_empty() {
            let text = self.signature.render();
            self.send_cpc_suboption(out, cpc::SIGNATURE_S2C, text.as_bytes());
            // ask the client for its signature in return, once per session
            if self.ask_client_signature {
                self.send_cpc_suboption(out, cpc::SIGNATURE_C2S, b"");
                self.ask_client_signature = false;
            }
        } else {
            info!(
                signature = %String::from_utf8_lossy(command),
                "telnet CPC client signature"
            );
        }
    }

    /// Zero queries the baud rate; anything else sets it. Either way the
    /// reply carries the line's post-operation rate.
    fn respond_baudrate(&mut self, out: &mut RingBuffer, line: &mut dyn SerialLineControl, value: u64) {
        if value == 0 {
            info!(baud = line.baud_rate(), "telnet CPC client requests the baudrate");
        } else {
            info!(baud = value, "telnet CPC client is setting the baudrate");
            let requested = u32::try_from(value).unwrap_or(u32::MAX);
            if let Err(error) = line.set_baud_rate(requested) {
                warn!(%error, "serial line rejected the baudrate");
            }
        }
        let mut reply = [0u8; 4];
        BigEndian::write_u32(&mut reply, line.baud_rate());
        self.send_cpc_suboption(out, cpc::SET_BAUDRATE_S2C, &reply);
    }

    /// Sentinel zero queries the data size; anything else sets it.
    fn respond_datasize(&mut self, out: &mut RingBuffer, line: &mut dyn SerialLineControl, value: u64) {
        if value == cpc::DATASIZE_REQUEST {
            info!(
                datasize = %line.data_bits(),
                "telnet CPC client requests the data size"
            );
        } else {
            match u8::try_from(value).ok().and_then(DataBits::from_wire) {
                Some(bits) => {
                    info!(datasize = %bits, "telnet CPC client is setting the data size");
                    if let Err(error) = line.set_data_bits(bits) {
                        warn!(%error, "serial line rejected the data size");
                    }
                }
                None => warn!(value, "telnet CPC client sent an invalid data size"),
            }
        }
        self.send_cpc_suboption(out, cpc::SET_DATASIZE_S2C, &[line.data_bits().to_wire()]);
    }

    /// Sentinel zero queries the parity; anything else sets it.
    fn respond_parity(&mut self, out: &mut RingBuffer, line: &mut dyn SerialLineControl, value: u64) {
        if value == cpc::PARITY_REQUEST {
            info!(parity = %line.parity(), "telnet CPC client requests the parity setting");
        } else {
            match u8::try_from(value).ok().and_then(Parity::from_wire) {
                Some(parity) => {
                    info!(%parity, "telnet CPC client is setting the parity");
                    if let Err(error) = line.set_parity(parity) {
                        warn!(%error, "serial line rejected the parity setting");
                    }
                }
                None => warn!(value, "telnet CPC client sent an invalid parity"),
            }
        }
        self.send_cpc_suboption(out, cpc::SET_PARITY_S2C, &[line.parity().to_wire()]);
    }

    /// Sentinel zero queries the stop size; anything else sets it.
    fn respond_stopsize(&mut self, out: &mut RingBuffer, line: &mut dyn SerialLineControl, value: u64) {
        if value == cpc::STOPSIZE_REQUEST {
            info!(
                stopsize = %line.stop_bits(),
                "telnet CPC client requests the number of stop bits"
            );
        } else {
            match u8::try_from(value).ok().and_then(StopBits::from_wire) {
                Some(bits) => {
                    info!(stopsize = %bits, "telnet CPC client is setting the number of stop bits");
                    if let Err(error) = line.set_stop_bits(bits) {
                        warn!(%error, "serial line rejected the stop size");
                    }
                }
                None => warn!(value, "telnet CPC client sent an invalid stop size"),
            }
        }
        self.send_cpc_suboption(out, cpc::SET_STOPSIZE_S2C, &[line.stop_bits().to_wire()]);
    }

    /// Frames `IAC SB 44 <code> <content, IAC doubled> IAC SE` onto the
    /// housekeeping buffer.
    pub(crate) fn send_cpc_suboption(
        &mut self,
        out: &mut RingBuffer,
        suboptcode: u8,
        content: &[u8],
    ) {
        let mut cmdlen = content.len();
        if cmdlen >= cpc::MAX_COMMAND_LEN {
            cmdlen = cpc::MAX_COMMAND_LEN - 1;
        }
        let mut frame = BytesMut::with_capacity(cmdlen * 2 + 6);
        frame.put_u8(consts::IAC);
        frame.put_u8(consts::SB);
        frame.put_u8(consts::option::COM_PORT_CONTROL);
        frame.put_u8(suboptcode);
        for &byte in &content[..cmdlen] {
            if byte == consts::IAC {
                frame.put_u8(consts::IAC);
            }
            frame.put_u8(byte);
        }
        frame.put_u8(consts::IAC);
        frame.put_u8(consts::SE);

        let wrote = out.append(&frame);
        if wrote < frame.len() {
            warn!(
                suboption = cpc::name(suboptcode),
                wrote,
                size = frame.len(),
                "truncated telnet CPC suboption reply"
            );
        } else {
            log_suboption(
                "sent",
                suboptcode,
                command_value(&content[..cmdlen]),
                &content[..cmdlen],
            );
        }
    }
}

/// Collapses doubled IAC bytes in a decoded command, in place.
fn undouble_iac(command: &mut Vec<u8>) {
    let mut index = 0;
    while index < command.len() {
        if command[index] == consts::IAC && command.get(index + 1) == Some(&consts::IAC) {
            command.remove(index + 1);
        }
        index += 1;
    }
}

/// A 1, 2, or 4 byte command is a network-order integer; anything else has
/// no integer interpretation and reads as zero.
fn command_value(command: &[u8]) -> u64 {
    match command.len() {
        1 => u64::from(command[0]),
        2 => u64::from(BigEndian::read_u16(command)),
        4 => u64::from(BigEndian::read_u32(command)),
        _ => 0,
    }
}

/// Logs a suboption's name, value, and (at trace level) a hex dump.
fn log_suboption(prefix: &str, suboptcode: u8, value: u64, command: &[u8]) {
    info!(
        suboption = cpc::name(suboptcode),
        code = suboptcode,
        value,
        "{} telnet CPC suboption",
        prefix
    );
    if command.len() > 1 {
        for chunk in command.chunks(16) {
            trace!("  {chunk:02x?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::TelnetOption;
    use crate::options::Verb;
    use serigate_serial::VirtualSerialLine;

    fn engine_with_comport_enabled() -> TelnetMachine {
        let mut engine = TelnetMachine::new(
            Signature::new("serigate", "0.1.0").with_device("/dev/ttyS0"),
        );
        engine.options.enable_client(TelnetOption::ComPortControl);
        engine
    }

    /// Builds the slice `process_cpc_suboption` sees: suboption code,
    /// command bytes, IAC SE.
    fn suboption(code: u8, command: &[u8]) -> Vec<u8> {
        let mut data = vec![code];
        data.extend_from_slice(command);
        data.push(consts::IAC);
        data.push(consts::SE);
        data
    }

    #[test]
    fn signature_renders_its_parts() {
        let signature = Signature::new("serigate", "0.1.0")
            .with_device("/dev/ttyS0")
            .with_description("bench PSU");
        assert_eq!(signature.render(), "serigate 0.1.0, /dev/ttyS0, bench PSU");
        assert_eq!(Signature::new("serigate", "0.1.0").render(), "serigate 0.1.0");
    }

    #[test]
    fn empty_signature_command_gets_our_signature_and_one_counter_request() {
        let mut engine = engine_with_comport_enabled();
        let mut out = RingBuffer::new("housekeeping", 512);
        let mut line = VirtualSerialLine::default();

        let data = suboption(cpc::SIGNATURE_C2S, b"");
        engine.process_cpc_suboption(&data, &mut out, &mut line).unwrap();

        let mut expected = vec![
            consts::IAC,
            consts::SB,
            consts::option::COM_PORT_CONTROL,
            cpc::SIGNATURE_S2C,
        ];
        expected.extend_from_slice(b"serigate 0.1.0, /dev/ttyS0");
        expected.extend_from_slice(&[consts::IAC, consts::SE]);
        // followed by the one-shot counter-request for the client signature
        expected.extend_from_slice(&[
            consts::IAC,
            consts::SB,
            consts::option::COM_PORT_CONTROL,
            cpc::SIGNATURE_C2S,
            consts::IAC,
            consts::SE,
        ]);
        assert_eq!(out.active(), &expected[..]);

        // a second query is answered but no longer counter-requests
        out.reset();
        engine.process_cpc_suboption(&data, &mut out, &mut line).unwrap();
        assert_eq!(
            out.active()
                .iter()
                .filter(|&&byte| byte == consts::SB)
                .count(),
            1
        );
    }

    #[test]
    fn client_signature_is_accepted_without_reply() {
        let mut engine = engine_with_comport_enabled();
        let mut out = RingBuffer::new("housekeeping", 512);
        let mut line = VirtualSerialLine::default();

        let data = suboption(cpc::SIGNATURE_C2S, b"acme-term 2.4");
        engine.process_cpc_suboption(&data, &mut out, &mut line).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn baud_query_replies_current_rate() {
        let mut engine = engine_with_comport_enabled();
        let mut out = RingBuffer::new("housekeeping", 512);
        let mut line = VirtualSerialLine::default();

        let data = suboption(cpc::SET_BAUDRATE_C2S, &[0, 0, 0, 0]);
        engine.process_cpc_suboption(&data, &mut out, &mut line).unwrap();
        assert_eq!(
            out.active(),
            &[
                consts::IAC,
                consts::SB,
                consts::option::COM_PORT_CONTROL,
                cpc::SET_BAUDRATE_S2C,
                0, 0, 0x25, 0x80, // 9600 big-endian
                consts::IAC,
                consts::SE,
            ]
        );
    }

    #[test]
    fn baud_set_changes_the_line_and_echoes_the_result() {
        let mut engine = engine_with_comport_enabled();
        let mut out = RingBuffer::new("housekeeping", 512);
        let mut line = VirtualSerialLine::default();
        let observer = line.clone();

        let data = suboption(cpc::SET_BAUDRATE_C2S, &[0, 0, 0x4b, 0]); // 19200
        engine.process_cpc_suboption(&data, &mut out, &mut line).unwrap();

        assert_eq!(observer.baud_rate(), 19200);
        assert_eq!(
            out.active(),
            &[
                consts::IAC,
                consts::SB,
                consts::option::COM_PORT_CONTROL,
                cpc::SET_BAUDRATE_S2C,
                0, 0, 0x4b, 0,
                consts::IAC,
                consts::SE,
            ]
        );
    }

    #[test]
    fn parity_set_and_query() {
        let mut engine = engine_with_comport_enabled();
        let mut out = RingBuffer::new("housekeeping", 512);
        let mut line = VirtualSerialLine::default();

        let data = suboption(cpc::SET_PARITY_C2S, &[Parity::Even.to_wire()]);
        engine.process_cpc_suboption(&data, &mut out, &mut line).unwrap();
        assert_eq!(line.parity(), Parity::Even);
        assert_eq!(
            out.active(),
            &[
                consts::IAC,
                consts::SB,
                consts::option::COM_PORT_CONTROL,
                cpc::SET_PARITY_S2C,
                Parity::Even.to_wire(),
                consts::IAC,
                consts::SE,
            ]
        );

        // mark parity is rejected: the reply carries the unchanged setting
        out.reset();
        let data = suboption(cpc::SET_PARITY_C2S, &[Parity::Mark.to_wire()]);
        engine.process_cpc_suboption(&data, &mut out, &mut line).unwrap();
        assert_eq!(line.parity(), Parity::Even);
        assert_eq!(out.active()[4], Parity::Even.to_wire());
    }

    #[test]
    fn datasize_and_stopsize_round_trip() {
        let mut engine = engine_with_comport_enabled();
        let mut out = RingBuffer::new("housekeeping", 512);
        let mut line = VirtualSerialLine::default();

        let data = suboption(cpc::SET_DATASIZE_C2S, &[7]);
        engine.process_cpc_suboption(&data, &mut out, &mut line).unwrap();
        assert_eq!(line.data_bits(), DataBits::Seven);
        assert_eq!(out.active()[4], 7);

        out.reset();
        let data = suboption(cpc::SET_STOPSIZE_C2S, &[2]);
        engine.process_cpc_suboption(&data, &mut out, &mut line).unwrap();
        assert_eq!(line.stop_bits(), StopBits::Two);
        assert_eq!(out.active()[4], 2);
    }

    #[test]
    fn escaped_iac_in_command_is_undoubled_before_interpretation() {
        let mut engine = engine_with_comport_enabled();
        let mut out = RingBuffer::new("housekeeping", 512);
        let mut line = VirtualSerialLine::default();

        // baud 0x00FFFF00 = 16776960; the two 0xFF bytes are doubled on the wire
        let data = suboption(
            cpc::SET_BAUDRATE_C2S,
            &[0, consts::IAC, consts::IAC, consts::IAC, consts::IAC, 0],
        );
        engine.process_cpc_suboption(&data, &mut out, &mut line).unwrap();
        assert_eq!(line.baud_rate(), 0x00ff_ff00);
        // and the echoed reply doubles them again
        assert_eq!(
            out.active(),
            &[
                consts::IAC,
                consts::SB,
                consts::option::COM_PORT_CONTROL,
                cpc::SET_BAUDRATE_S2C,
                0,
                consts::IAC, consts::IAC,
                consts::IAC, consts::IAC,
                0,
                consts::IAC,
                consts::SE,
            ]
        );
    }

    #[test]
    fn unimplemented_suboptions_are_recognized_but_silent() {
        let mut engine = engine_with_comport_enabled();
        let mut out = RingBuffer::new("housekeeping", 512);
        let mut line = VirtualSerialLine::default();

        for code in [
            cpc::SET_CONTROL_C2S,
            cpc::FLOWCONTROL_SUSPEND_C2S,
            cpc::SET_LINESTATE_MASK_C2S,
            cpc::SET_MODEMSTATE_MASK_C2S,
            cpc::PURGE_DATA_C2S,
        ] {
            let data = suboption(code, &[1]);
            engine.process_cpc_suboption(&data, &mut out, &mut line).unwrap();
        }
        assert!(out.is_empty());
        assert!(!engine.suspended());
    }

    #[test]
    fn malformed_frames_are_rejected() {
        let mut engine = engine_with_comport_enabled();
        let mut out = RingBuffer::new("housekeeping", 512);
        let mut line = VirtualSerialLine::default();

        // too short
        assert_eq!(
            engine.process_cpc_suboption(&[cpc::SIGNATURE_C2S], &mut out, &mut line),
            Err(TelnetError::TruncatedSuboption { available: 1 })
        );
        // no SE at all
        assert_eq!(
            engine.process_cpc_suboption(&[cpc::SIGNATURE_C2S, 1, 2, 3], &mut out, &mut line),
            Err(TelnetError::UnterminatedSuboption)
        );
        // SE not preceded by IAC
        assert_eq!(
            engine.process_cpc_suboption(
                &[cpc::SIGNATURE_C2S, 1, consts::SE],
                &mut out,
                &mut line
            ),
            Err(TelnetError::BadSuboptionTerminator)
        );
        assert!(out.is_empty());
    }

    #[test]
    fn send_option_marks_verbs_independently() {
        let mut engine = engine_with_comport_enabled();
        let mut out = RingBuffer::new("housekeeping", 16);
        engine.send_option(&mut out, Verb::Do, TelnetOption::Logout);
        engine.send_option(&mut out, Verb::Do, TelnetOption::Logout);
        assert_eq!(
            out.active(),
            &[consts::IAC, consts::DO, consts::option::LOGOUT]
        );
    }
}
