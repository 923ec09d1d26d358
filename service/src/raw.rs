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

//! The raw TCP transport framing.
//!
//! In raw mode the gateway does no Telnet interpretation at all. The
//! socket→serial path forwards whatever the peer sent, NUL-terminated, to
//! the serial line. The serial→socket path frames each chunk of serial
//! data in a fixed-shape record: a 30-byte message field, a 200-byte data
//! field, and a trailing network-order protocol version word.

use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

/// Size of the record's message field.
pub const MAX_MESSAGE_LEN: usize = 30;
/// Size of the record's data field.
pub const MAX_DATA_LEN: usize = 200;
/// Largest chunk read from the socket in one pass in raw mode.
pub const RAW_CHUNK: usize = 256;
/// Protocol version word carried by every record.
pub const PROTOCOL_VERSION: u16 = 0x8000;
/// Total on-wire size of one record.
pub const WIRE_SIZE: usize = MAX_MESSAGE_LEN + MAX_DATA_LEN + 2;

/// One raw-mode record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    message: Vec<u8>,
    data: Vec<u8>,
}

impl RawRecord {
    /// Builds a record, truncating each field to its wire size.
    pub fn new(message: &[u8], data: &[u8]) -> Self {
        RawRecord {
            message: message[..message.len().min(MAX_MESSAGE_LEN)].to_vec(),
            data: data[..data.len().min(MAX_DATA_LEN)].to_vec(),
        }
    }

    /// Builds the record for a chunk read from the serial line: the data
    /// field carries the chunk with a newline terminator appended.
    pub fn from_serial(chunk: &[u8]) -> Self {
        let take = chunk.len().min(MAX_DATA_LEN - 1);
        let mut data = chunk[..take].to_vec();
        data.push(b'\n');
        RawRecord {
            message: Vec::new(),
            data,
        }
    }

    /// The message field, without padding.
    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// The data field, without padding.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Encoder/decoder for [`RawRecord`] wire frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawRecordCodec;

impl RawRecordCodec {
    /// Creates the codec.
    pub fn new() -> Self {
        RawRecordCodec
    }
}

impl Encoder<RawRecord> for RawRecordCodec {
    type Error = std::io::Error;

    fn encode(&mut self, record: RawRecord, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(WIRE_SIZE);
        dst.put_slice(&record.message);
        dst.put_bytes(0, MAX_MESSAGE_LEN - record.message.len());
        dst.put_slice(&record.data);
        dst.put_bytes(0, MAX_DATA_LEN - record.data.len());
        dst.put_u16(PROTOCOL_VERSION);
        Ok(())
    }
}

impl Decoder for RawRecordCodec {
    type Item = RawRecord;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < WIRE_SIZE {
            return Ok(None);
        }
        let frame = src.split_to(WIRE_SIZE);
        let version = BigEndian::read_u16(&frame[WIRE_SIZE - 2..]);
        if version != PROTOCOL_VERSION {
            warn!(version, expected = PROTOCOL_VERSION, "raw record version mismatch");
        }
        let message_field = &frame[..MAX_MESSAGE_LEN];
        let message_len = message_field
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(MAX_MESSAGE_LEN);
        let data_field = &frame[MAX_MESSAGE_LEN..MAX_MESSAGE_LEN + MAX_DATA_LEN];
        let data_len = data_field
            .iter()
            .rposition(|&byte| byte != 0)
            .map_or(0, |last| last + 1);
        Ok(Some(RawRecord {
            message: message_field[..message_len].to_vec(),
            data: data_field[..data_len].to_vec(),
        }))
    }
}
