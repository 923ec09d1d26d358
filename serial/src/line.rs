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

use crate::types::{DataBits, LineSettings, Parity, SerialError, StopBits};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Control surface over an open serial line.
///
/// Getters are infallible and report the line's current state; a real
/// implementation that cannot query its device should report its last known
/// values, which is what the original termios-backed code effectively did.
/// Setters may reject values the hardware cannot express; the Telnet layer
/// logs such rejections and replies with the line's actual (unchanged)
/// state, so the peer always learns what the line really does.
pub trait SerialLineControl: Send {
    /// Current baud rate in bits per second.
    fn baud_rate(&self) -> u32;

    /// Sets the baud rate.
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), SerialError>;

    /// Current data bits per character.
    fn data_bits(&self) -> DataBits;

    /// Sets the data bits per character.
    fn set_data_bits(&mut self, bits: DataBits) -> Result<(), SerialError>;

    /// Current parity mode.
    fn parity(&self) -> Parity;

    /// Sets the parity mode.
    fn set_parity(&mut self, parity: Parity) -> Result<(), SerialError>;

    /// Current stop bits per character.
    fn stop_bits(&self) -> StopBits;

    /// Sets the stop bits per character.
    fn set_stop_bits(&mut self, bits: StopBits) -> Result<(), SerialError>;

    /// Snapshot of all current parameters.
    fn settings(&self) -> LineSettings {
        LineSettings {
            baud_rate: self.baud_rate(),
            data_bits: self.data_bits(),
            parity: self.parity(),
            stop_bits: self.stop_bits(),
        }
    }

    /// Applies a complete parameter set, e.g. to restore a line to its
    /// original state at connection teardown.
    fn apply(&mut self, settings: &LineSettings) -> Result<(), SerialError> {
        self.set_baud_rate(settings.baud_rate)?;
        self.set_data_bits(settings.data_bits)?;
        self.set_parity(settings.parity)?;
        self.set_stop_bits(settings.stop_bits)?;
        Ok(())
    }
}

impl<T: SerialLineControl + ?Sized> SerialLineControl for Box<T> {
    fn baud_rate(&self) -> u32 {
        (**self).baud_rate()
    }
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), SerialError> {
        (**self).set_baud_rate(baud)
    }
    fn data_bits(&self) -> DataBits {
        (**self).data_bits()
    }
    fn set_data_bits(&mut self, bits: DataBits) -> Result<(), SerialError> {
        (**self).set_data_bits(bits)
    }
    fn parity(&self) -> Parity {
        (**self).parity()
    }
    fn set_parity(&mut self, parity: Parity) -> Result<(), SerialError> {
        (**self).set_parity(parity)
    }
    fn stop_bits(&self) -> StopBits {
        (**self).stop_bits()
    }
    fn set_stop_bits(&mut self, bits: StopBits) -> Result<(), SerialError> {
        (**self).set_stop_bits(bits)
    }
}

/// An in-memory serial line that only remembers its settings.
///
/// Handles are cheap clones sharing one underlying line, so a test or an
/// embedder can keep a handle to observe parameter changes made through the
/// gateway while the session owns another.
///
/// Mark and space parity are rejected the way the original gateway rejected
/// them: logged and left unchanged.
#[derive(Debug, Clone)]
pub struct VirtualSerialLine {
    state: Arc<Mutex<LineSettings>>,
}

impl VirtualSerialLine {
    /// Creates a line with the given initial settings.
    pub fn new(settings: LineSettings) -> Self {
        VirtualSerialLine {
            state: Arc::new(Mutex::new(settings)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LineSettings> {
        self.state.lock().expect("serial line state poisoned")
    }
}

impl Default for VirtualSerialLine {
    fn default() -> Self {
        VirtualSerialLine::new(LineSettings::default())
    }
}

impl SerialLineControl for VirtualSerialLine {
    fn baud_rate(&self) -> u32 {
        self.lock().baud_rate
    }

    fn set_baud_rate(&mut self, baud: u32) -> Result<(), SerialError> {
        if baud == 0 {
            return Err(SerialError::Unsupported {
                parameter: "baud rate",
                value: baud,
            });
        }
        info!(baud, "serial line baud rate changed");
        self.lock().baud_rate = baud;
        Ok(())
    }

    fn data_bits(&self) -> DataBits {
        self.lock().data_bits
    }

    fn set_data_bits(&mut self, bits: DataBits) -> Result<(), SerialError> {
        self.lock().data_bits = bits;
        Ok(())
    }

    fn parity(&self) -> Parity {
        self.lock().parity
    }

    fn set_parity(&mut self, parity: Parity) -> Result<(), SerialError> {
        if matches!(parity, Parity::Mark | Parity::Space) {
            warn!(%parity, "ignoring request to set unsupported parity");
            return Err(SerialError::Unsupported {
                parameter: "parity",
                value: u32::from(parity.to_wire()),
            });
        }
        self.lock().parity = parity;
        Ok(())
    }

    fn stop_bits(&self) -> StopBits {
        self.lock().stop_bits
    }

    fn set_stop_bits(&mut self, bits: StopBits) -> Result<(), SerialError> {
        self.lock().stop_bits = bits;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_line_remembers_settings() {
        let mut line = VirtualSerialLine::default();
        assert_eq!(line.baud_rate(), 9600);
        line.set_baud_rate(19200).unwrap();
        assert_eq!(line.baud_rate(), 19200);
        line.set_parity(Parity::Even).unwrap();
        line.set_data_bits(DataBits::Seven).unwrap();
        line.set_stop_bits(StopBits::Two).unwrap();
        assert_eq!(line.settings().to_string(), "19200 7e2");
    }

    #[test]
    fn clones_share_one_line() {
        let mut line = VirtualSerialLine::default();
        let observer = line.clone();
        line.set_baud_rate(115_200).unwrap();
        assert_eq!(observer.baud_rate(), 115_200);
    }

    #[test]
    fn mark_parity_is_rejected_and_unchanged() {
        let mut line = VirtualSerialLine::default();
        assert!(line.set_parity(Parity::Mark).is_err());
        assert_eq!(line.parity(), Parity::None);
    }

    #[test]
    fn apply_restores_a_snapshot() {
        let mut line = VirtualSerialLine::default();
        let original = line.settings();
        line.set_baud_rate(57600).unwrap();
        line.set_parity(Parity::Odd).unwrap();
        line.apply(&original).unwrap();
        assert_eq!(line.settings(), original);
    }
}
