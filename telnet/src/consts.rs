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

//! Telnet and RFC2217 wire constants.

/// Interpret As Command.
pub const IAC: u8 = 255;
/// Don't perform the option.
pub const DONT: u8 = 254;
/// Request the peer perform the option.
pub const DO: u8 = 253;
/// Refusal to perform the option.
pub const WONT: u8 = 252;
/// Willingness to perform the option.
pub const WILL: u8 = 251;
/// Subnegotiation begin.
pub const SB: u8 = 250;
/// Go ahead.
pub const GA: u8 = 249;
/// Erase line.
pub const EL: u8 = 248;
/// Erase character.
pub const EC: u8 = 247;
/// Are you there.
pub const AYT: u8 = 246;
/// Abort output.
pub const AO: u8 = 245;
/// Interrupt process.
pub const IP: u8 = 244;
/// Break.
pub const BRK: u8 = 243;
/// Data mark.
pub const DM: u8 = 242;
/// No operation.
pub const NOP: u8 = 241;
/// Subnegotiation end.
pub const SE: u8 = 240;

/// Telnet option codes.
pub mod option {
    /// Binary transmission (RFC856).
    pub const BINARY: u8 = 0;
    /// Echo (RFC857).
    pub const ECHO: u8 = 1;
    /// Suppress go ahead (RFC858).
    pub const SGA: u8 = 3;
    /// Logout (RFC727).
    pub const LOGOUT: u8 = 18;
    /// Com Port Control (RFC2217).
    pub const COM_PORT_CONTROL: u8 = 44;
}

/// RFC2217 Com-Port-Control suboption codes and value tables.
pub mod cpc {
    /// Longest accepted suboption command, in bytes.
    pub const MAX_COMMAND_LEN: usize = 256;

    /// Signature exchange, client to server.
    pub const SIGNATURE_C2S: u8 = 0;
    /// Set or query baud rate, client to server.
    pub const SET_BAUDRATE_C2S: u8 = 1;
    /// Set or query data size, client to server.
    pub const SET_DATASIZE_C2S: u8 = 2;
    /// Set or query parity, client to server.
    pub const SET_PARITY_C2S: u8 = 3;
    /// Set or query stop size, client to server.
    pub const SET_STOPSIZE_C2S: u8 = 4;
    /// Set control lines, client to server.
    pub const SET_CONTROL_C2S: u8 = 5;
    /// Line state notification, client to server.
    pub const NOTIFY_LINESTATE_C2S: u8 = 6;
    /// Modem state notification, client to server.
    pub const NOTIFY_MODEMSTATE_C2S: u8 = 7;
    /// Flow control suspend, client to server.
    pub const FLOWCONTROL_SUSPEND_C2S: u8 = 8;
    /// Flow control resume, client to server.
    pub const FLOWCONTROL_RESUME_C2S: u8 = 9;
    /// Set line state mask, client to server.
    pub const SET_LINESTATE_MASK_C2S: u8 = 10;
    /// Set modem state mask, client to server.
    pub const SET_MODEMSTATE_MASK_C2S: u8 = 11;
    /// Purge data, client to server.
    pub const PURGE_DATA_C2S: u8 = 12;

    /// Offset between the client-to-server and server-to-client code sets.
    pub const S2C_OFFSET: u8 = 100;

    /// Signature exchange, server to client.
    pub const SIGNATURE_S2C: u8 = 100;
    /// Set or query baud rate, server to client.
    pub const SET_BAUDRATE_S2C: u8 = 101;
    /// Set or query data size, server to client.
    pub const SET_DATASIZE_S2C: u8 = 102;
    /// Set or query parity, server to client.
    pub const SET_PARITY_S2C: u8 = 103;
    /// Set or query stop size, server to client.
    pub const SET_STOPSIZE_S2C: u8 = 104;
    /// Set control lines, server to client.
    pub const SET_CONTROL_S2C: u8 = 105;
    /// Line state notification, server to client.
    pub const NOTIFY_LINESTATE_S2C: u8 = 106;
    /// Modem state notification, server to client.
    pub const NOTIFY_MODEMSTATE_S2C: u8 = 107;
    /// Flow control suspend, server to client.
    pub const FLOWCONTROL_SUSPEND_S2C: u8 = 108;
    /// Flow control resume, server to client.
    pub const FLOWCONTROL_RESUME_S2C: u8 = 109;
    /// Set line state mask, server to client.
    pub const SET_LINESTATE_MASK_S2C: u8 = 110;
    /// Set modem state mask, server to client.
    pub const SET_MODEMSTATE_MASK_S2C: u8 = 111;
    /// Purge data, server to client.
    pub const PURGE_DATA_S2C: u8 = 112;

    /// Value that turns a Set-Datasize command into a query.
    pub const DATASIZE_REQUEST: u64 = 0;
    /// Value that turns a Set-Parity command into a query.
    pub const PARITY_REQUEST: u64 = 0;
    /// Value that turns a Set-Stopsize command into a query.
    pub const STOPSIZE_REQUEST: u64 = 0;

    /// Line state: data ready.
    pub const LINESTATE_DATA_READY: u8 = 0x01;
    /// Line state: overrun error.
    pub const LINESTATE_OVERRUN_ERROR: u8 = 0x02;
    /// Line state: parity error.
    pub const LINESTATE_PARITY_ERROR: u8 = 0x04;
    /// Line state: framing error.
    pub const LINESTATE_FRAMING_ERROR: u8 = 0x08;
    /// Line state: break detected.
    pub const LINESTATE_BREAK_DETECT: u8 = 0x10;
    /// Line state: transfer holding register empty.
    pub const LINESTATE_THR_EMPTY: u8 = 0x20;
    /// Line state: transfer shift register empty.
    pub const LINESTATE_TSR_EMPTY: u8 = 0x40;
    /// Line state: timeout error.
    pub const LINESTATE_TIMEOUT_ERROR: u8 = 0x80;

    /// Modem state: delta clear to send.
    pub const MODEMSTATE_DELTA_CTS: u8 = 0x01;
    /// Modem state: delta data set ready.
    pub const MODEMSTATE_DELTA_DSR: u8 = 0x02;
    /// Modem state: trailing edge ring indicator.
    pub const MODEMSTATE_TRLEDGE_RI: u8 = 0x04;
    /// Modem state: delta carrier detect.
    pub const MODEMSTATE_DELTA_CD: u8 = 0x08;
    /// Modem state: clear to send.
    pub const MODEMSTATE_CTS: u8 = 0x10;
    /// Modem state: data set ready.
    pub const MODEMSTATE_DSR: u8 = 0x20;
    /// Modem state: ring indicator.
    pub const MODEMSTATE_RI: u8 = 0x40;
    /// Modem state: carrier detect.
    pub const MODEMSTATE_CD: u8 = 0x80;

    /// Default line state mask dictated by RFC2217.
    pub const DEFAULT_LINESTATE_MASK: u8 = 0x00;
    /// Default modem state mask dictated by RFC2217.
    pub const DEFAULT_MODEMSTATE_MASK: u8 = 0xff;

    /// Human-readable name for a suboption code, for the logs.
    pub fn name(code: u8) -> &'static str {
        match code {
            SIGNATURE_C2S | SIGNATURE_S2C => "Signature",
            SET_BAUDRATE_C2S | SET_BAUDRATE_S2C => "Set-Baudrate",
            SET_DATASIZE_C2S | SET_DATASIZE_S2C => "Set-Datasize",
            SET_PARITY_C2S | SET_PARITY_S2C => "Set-Parity",
            SET_STOPSIZE_C2S | SET_STOPSIZE_S2C => "Set-Stopsize",
            SET_CONTROL_C2S | SET_CONTROL_S2C => "Set-Control",
            NOTIFY_LINESTATE_C2S | NOTIFY_LINESTATE_S2C => "Notify-Linestate",
            NOTIFY_MODEMSTATE_C2S | NOTIFY_MODEMSTATE_S2C => "Notify-Modemstate",
            FLOWCONTROL_SUSPEND_C2S | FLOWCONTROL_SUSPEND_S2C => "Flowcontrol-Suspend",
            FLOWCONTROL_RESUME_C2S | FLOWCONTROL_RESUME_S2C => "Flowcontrol-Resume",
            SET_LINESTATE_MASK_C2S | SET_LINESTATE_MASK_S2C => "Set-Linestate-Mask",
            SET_MODEMSTATE_MASK_C2S | SET_MODEMSTATE_MASK_S2C => "Set-Modemstate-Mask",
            PURGE_DATA_C2S | PURGE_DATA_S2C => "Purge-Data",
            _ => "unknown",
        }
    }
}

/// Human-readable name for a Telnet command byte, for the logs.
pub fn command_name(byte: u8) -> &'static str {
    match byte {
        IAC => "IAC",
        DONT => "DONT",
        DO => "DO",
        WONT => "WONT",
        WILL => "WILL",
        SB => "SB",
        GA => "GA",
        EL => "EL",
        EC => "EC",
        AYT => "AYT",
        AO => "AO",
        IP => "IP",
        BRK => "BREAK",
        DM => "DM",
        NOP => "NOP",
        SE => "SE",
        _ => "unknown",
    }
}
