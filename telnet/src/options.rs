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

use crate::consts;

/// The Telnet options the gateway negotiates.
///
/// Anything else on the wire decodes to [`TelnetOption::Unknown`] and is
/// answered with the negative counterpart of whatever the peer offered.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetOption {
    /// Binary transmission [RFC856](https://tools.ietf.org/html/rfc856).
    TransmitBinary,
    /// Echo [RFC857](https://tools.ietf.org/html/rfc857).
    Echo,
    /// Suppress go ahead [RFC858](https://tools.ietf.org/html/rfc858).
    SuppressGoAhead,
    /// Logout [RFC727](https://tools.ietf.org/html/rfc727).
    Logout,
    /// Com Port Control [RFC2217](https://tools.ietf.org/html/rfc2217).
    ComPortControl,
    /// Any option the gateway does not negotiate.
    Unknown(u8),
}

impl TelnetOption {
    /// The option's wire code.
    pub fn to_u8(self) -> u8 {
        match self {
            TelnetOption::TransmitBinary => consts::option::BINARY,
            TelnetOption::Echo => consts::option::ECHO,
            TelnetOption::SuppressGoAhead => consts::option::SGA,
            TelnetOption::Logout => consts::option::LOGOUT,
            TelnetOption::ComPortControl => consts::option::COM_PORT_CONTROL,
            TelnetOption::Unknown(byte) => byte,
        }
    }

    /// Decodes a wire code.
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            consts::option::BINARY => TelnetOption::TransmitBinary,
            consts::option::ECHO => TelnetOption::Echo,
            consts::option::SGA => TelnetOption::SuppressGoAhead,
            consts::option::LOGOUT => TelnetOption::Logout,
            consts::option::COM_PORT_CONTROL => TelnetOption::ComPortControl,
            byte => TelnetOption::Unknown(byte),
        }
    }
}

impl std::fmt::Display for TelnetOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetOption::TransmitBinary => write!(f, "TransmitBinary"),
            TelnetOption::Echo => write!(f, "Echo"),
            TelnetOption::SuppressGoAhead => write!(f, "SuppressGoAhead"),
            TelnetOption::Logout => write!(f, "Logout"),
            TelnetOption::ComPortControl => write!(f, "ComPortControl"),
            TelnetOption::Unknown(option) => write!(f, "Unknown({option})"),
        }
    }
}

impl From<u8> for TelnetOption {
    fn from(byte: u8) -> Self {
        Self::from_u8(byte)
    }
}

impl From<TelnetOption> for u8 {
    fn from(option: TelnetOption) -> Self {
        option.to_u8()
    }
}

/// The four Telnet negotiation verbs.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Verb {
    /// We are willing to perform the option.
    Will,
    /// We refuse to perform the option.
    Wont,
    /// We ask the peer to perform the option.
    Do,
    /// We ask the peer not to perform the option.
    Dont,
}

impl Verb {
    /// The verb's wire code.
    pub fn to_u8(self) -> u8 {
        match self {
            Verb::Will => consts::WILL,
            Verb::Wont => consts::WONT,
            Verb::Do => consts::DO,
            Verb::Dont => consts::DONT,
        }
    }

    /// Decodes a wire code; non-verb bytes yield `None`.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            consts::WILL => Some(Verb::Will),
            consts::WONT => Some(Verb::Wont),
            consts::DO => Some(Verb::Do),
            consts::DONT => Some(Verb::Dont),
            _ => None,
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verb::Will => write!(f, "WILL"),
            Verb::Wont => write!(f, "WONT"),
            Verb::Do => write!(f, "DO"),
            Verb::Dont => write!(f, "DONT"),
        }
    }
}

/// Per-option negotiation flags.
#[derive(Clone, Copy, Debug, Default)]
struct OptionFlags {
    /// WILL was sent for this option.
    sent_will: bool,
    /// DO was sent for this option.
    sent_do: bool,
    /// WONT was sent for this option.
    sent_wont: bool,
    /// DONT was sent for this option.
    sent_dont: bool,
    /// Enabled in the server→client direction.
    server: bool,
    /// Enabled in the client→server direction.
    client: bool,
}

/// Negotiation state for all 256 option codes.
///
/// Two independent enable flags track the two directions of each option,
/// and four sent flags guarantee that an exact (verb, option) pair goes on
/// the wire at most once per session, which is what breaks negotiation
/// loops with ill-behaved peers.
#[derive(Clone, Debug)]
pub struct OptionTable {
    flags: [OptionFlags; 256],
}

impl OptionTable {
    /// Creates a table with every option off and nothing sent.
    pub fn new() -> Self {
        OptionTable {
            flags: [OptionFlags::default(); 256],
        }
    }

    /// Returns every option to off and clears all sent flags.
    pub fn reset(&mut self) {
        self.flags = [OptionFlags::default(); 256];
    }

    /// Is the option enabled client→server?
    pub fn client_enabled(&self, option: TelnetOption) -> bool {
        self.flags[option.to_u8() as usize].client
    }

    /// Marks the option negotiated client→server.
    pub fn enable_client(&mut self, option: TelnetOption) {
        self.flags[option.to_u8() as usize].client = true;
    }

    /// Marks the option off client→server.
    pub fn disable_client(&mut self, option: TelnetOption) {
        self.flags[option.to_u8() as usize].client = false;
    }

    /// Is the option enabled server→client?
    pub fn server_enabled(&self, option: TelnetOption) -> bool {
        self.flags[option.to_u8() as usize].server
    }

    /// Marks the option negotiated server→client.
    pub fn enable_server(&mut self, option: TelnetOption) {
        self.flags[option.to_u8() as usize].server = true;
    }

    /// Marks the option off server→client.
    pub fn disable_server(&mut self, option: TelnetOption) {
        self.flags[option.to_u8() as usize].server = false;
    }

    /// Was this exact (verb, option) pair already sent?
    pub fn was_sent(&self, verb: Verb, option: TelnetOption) -> bool {
        let flags = &self.flags[option.to_u8() as usize];
        match verb {
            Verb::Will => flags.sent_will,
            Verb::Do => flags.sent_do,
            Verb::Wont => flags.sent_wont,
            Verb::Dont => flags.sent_dont,
        }
    }

    /// Records that the (verb, option) pair went on the wire.
    pub fn mark_sent(&mut self, verb: Verb, option: TelnetOption) {
        let flags = &mut self.flags[option.to_u8() as usize];
        match verb {
            Verb::Will => flags.sent_will = true,
            Verb::Do => flags.sent_do = true,
            Verb::Wont => flags.sent_wont = true,
            Verb::Dont => flags.sent_dont = true,
        }
    }
}

impl Default for OptionTable {
    fn default() -> Self {
        OptionTable::new()
    }
}
