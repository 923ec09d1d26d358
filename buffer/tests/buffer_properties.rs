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

//! Property tests for the ring buffer bookkeeping contracts.

use proptest::prelude::*;
use serigate_buffer::RingBuffer;

proptest! {
    /// The buffered count always equals bytes appended minus bytes removed,
    /// and never exceeds capacity, no matter the operation sequence.
    #[test]
    fn bookkeeping_is_exact(
        capacity in 1usize..256,
        ops in prop::collection::vec(
            prop_oneof![
                prop::collection::vec(any::<u8>(), 0..64).prop_map(Op::Append),
                (0usize..64).prop_map(Op::RemoveFront),
            ],
            0..32,
        ),
    ) {
        let mut buffer = RingBuffer::new("prop", capacity);
        let mut expected = 0usize;
        for op in ops {
            match op {
                Op::Append(bytes) => {
                    let copied = buffer.append(&bytes);
                    prop_assert!(copied <= bytes.len());
                    expected += copied;
                }
                Op::RemoveFront(count) => {
                    let removed = buffer.remove_range(buffer.write_cursor(), count);
                    if count >= expected {
                        // documented quirk: the requested count comes back
                        // unclamped when the removal empties the buffer
                        prop_assert_eq!(removed, count);
                        expected = 0;
                    } else {
                        expected -= removed;
                    }
                }
            }
            prop_assert_eq!(buffer.len(), expected);
            prop_assert!(buffer.len() <= buffer.capacity());
        }
    }

    /// Whatever was appended comes back out of the active region in order.
    #[test]
    fn payload_integrity(
        capacity in 8usize..256,
        payload in prop::collection::vec(any::<u8>(), 1..64),
    ) {
        let mut buffer = RingBuffer::new("prop", capacity);
        let copied = buffer.append(&payload);
        prop_assert_eq!(buffer.active(), &payload[..copied]);
    }

    /// Inserting a byte makes it findable at the requested position and
    /// shifts, not overwrites, the bytes after it.
    #[test]
    fn insert_is_a_splice(
        payload in prop::collection::vec(1u8..=255, 1..32),
        offset_seed in any::<usize>(),
    ) {
        let mut buffer = RingBuffer::new("prop", 128);
        buffer.append(&payload);
        let position = offset_seed % (payload.len() + 1);
        buffer.insert_byte(position, 0).unwrap();
        prop_assert_eq!(buffer.len(), payload.len() + 1);
        prop_assert_eq!(buffer.find_byte(0), Some(position));
        prop_assert_eq!(&buffer.active()[..position], &payload[..position]);
        prop_assert_eq!(&buffer.active()[position + 1..], &payload[position..]);
    }
}

#[derive(Clone)]
enum Op {
    Append(Vec<u8>),
    RemoveFront(usize),
}

impl std::fmt::Debug for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Op::Append(bytes) => write!(f, "Append({} bytes)", bytes.len()),
            Op::RemoveFront(count) => write!(f, "RemoveFront({count})"),
        }
    }
}
