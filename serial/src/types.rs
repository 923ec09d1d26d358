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

use thiserror::Error;

/// Errors from serial line control operations.
#[derive(Debug, Error)]
pub enum SerialError {
    /// The line rejected a parameter value it cannot express.
    #[error("unsupported {parameter} value: {value}")]
    Unsupported {
        /// Which parameter was being set.
        parameter: &'static str,
        /// The rejected value, as received.
        value: u32,
    },
    /// The underlying device reported an I/O failure.
    #[error("serial device error: {0}")]
    Device(#[from] std::io::Error),
}

/// Parity mode of a serial line.
///
/// Discriminants are the RFC2217 Set-Parity wire values; `0` is the
/// query sentinel and therefore absent here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Parity {
    /// No parity bit.
    None = 1,
    /// Odd parity.
    Odd = 2,
    /// Even parity.
    Even = 3,
    /// Parity bit always one.
    Mark = 4,
    /// Parity bit always zero.
    Space = 5,
}

impl Parity {
    /// Decodes an RFC2217 parity byte. The query sentinel and unknown
    /// values yield `None`.
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Parity::None),
            2 => Some(Parity::Odd),
            3 => Some(Parity::Even),
            4 => Some(Parity::Mark),
            5 => Some(Parity::Space),
            _ => None,
        }
    }

    /// The RFC2217 wire byte for this parity mode.
    pub fn to_wire(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for Parity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parity::None => write!(f, "none"),
            Parity::Odd => write!(f, "odd"),
            Parity::Even => write!(f, "even"),
            Parity::Mark => write!(f, "mark"),
            Parity::Space => write!(f, "space"),
        }
    }
}

/// Data bits per character.
///
/// Discriminants are the RFC2217 Set-Datasize wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataBits {
    /// Five data bits.
    Five = 5,
    /// Six data bits.
    Six = 6,
    /// Seven data bits.
    Seven = 7,
    /// Eight data bits.
    Eight = 8,
}

impl DataBits {
    /// Decodes an RFC2217 data size byte.
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            5 => Some(DataBits::Five),
            6 => Some(DataBits::Six),
            7 => Some(DataBits::Seven),
            8 => Some(DataBits::Eight),
            _ => None,
        }
    }

    /// The RFC2217 wire byte for this data size.
    pub fn to_wire(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for DataBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// Stop bits per character.
///
/// Discriminants are the RFC2217 Set-Stopsize wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StopBits {
    /// One stop bit.
    One = 1,
    /// Two stop bits.
    Two = 2,
    /// One and a half stop bits.
    OnePointFive = 3,
}

impl StopBits {
    /// Decodes an RFC2217 stop size byte.
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(StopBits::One),
            2 => Some(StopBits::Two),
            3 => Some(StopBits::OnePointFive),
            _ => None,
        }
    }

    /// The RFC2217 wire byte for this stop size.
    pub fn to_wire(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for StopBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopBits::One => write!(f, "1"),
            StopBits::Two => write!(f, "2"),
            StopBits::OnePointFive => write!(f, "1.5"),
        }
    }
}

/// A complete set of line parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    /// Baud rate in bits per second.
    pub baud_rate: u32,
    /// Data bits per character.
    pub data_bits: DataBits,
    /// Parity mode.
    pub parity: Parity,
    /// Stop bits per character.
    pub stop_bits: StopBits,
}

impl Default for LineSettings {
    fn default() -> Self {
        LineSettings {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl std::fmt::Display for LineSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}{}{}",
            self.baud_rate,
            self.data_bits,
            match self.parity {
                Parity::None => "n",
                Parity::Odd => "o",
                Parity::Even => "e",
                Parity::Mark => "m",
                Parity::Space => "s",
            },
            self.stop_bits
        )
    }
}

/// Descriptive metadata for a serial port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerialPortInfo {
    /// Path name of the device, e.g. `/dev/ttyS0`.
    pub device: String,
    /// Free-text description, if the configuration supplied one.
    pub description: Option<String>,
}

impl SerialPortInfo {
    /// Creates port info for a device path.
    pub fn new(device: impl Into<String>) -> Self {
        SerialPortInfo {
            device: device.into(),
            description: None,
        }
    }

    /// Attaches a free-text description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trips() {
        for parity in [
            Parity::None,
            Parity::Odd,
            Parity::Even,
            Parity::Mark,
            Parity::Space,
        ] {
            assert_eq!(Parity::from_wire(parity.to_wire()), Some(parity));
        }
        for bits in [DataBits::Five, DataBits::Six, DataBits::Seven, DataBits::Eight] {
            assert_eq!(DataBits::from_wire(bits.to_wire()), Some(bits));
        }
        for stop in [StopBits::One, StopBits::Two, StopBits::OnePointFive] {
            assert_eq!(StopBits::from_wire(stop.to_wire()), Some(stop));
        }
    }

    #[test]
    fn query_sentinel_is_not_a_value() {
        assert_eq!(Parity::from_wire(0), None);
        assert_eq!(DataBits::from_wire(0), None);
        assert_eq!(StopBits::from_wire(0), None);
    }

    #[test]
    fn settings_display_is_compact() {
        let settings = LineSettings::default();
        assert_eq!(settings.to_string(), "9600 8n1");
    }
}
