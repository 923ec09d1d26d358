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

use criterion::{Criterion, criterion_group, criterion_main};
use serigate_buffer::RingBuffer;
use std::hint::black_box;

fn buffer_benchmarks(c: &mut Criterion) {
    c.bench_function("append_and_consume_4k", |b| {
        let payload = vec![0x41u8; 1024];
        b.iter(|| {
            let mut buffer = RingBuffer::new("bench", 4096);
            for _ in 0..4 {
                buffer.append(&payload);
            }
            black_box(buffer.remove_range(buffer.write_cursor(), 4096));
        });
    });

    c.bench_function("scan_active_region", |b| {
        let mut buffer = RingBuffer::new("bench", 4096);
        let mut payload = vec![0x41u8; 4000];
        payload[3999] = 0xff;
        buffer.append(&payload);
        b.iter(|| black_box(buffer.find_byte(0xff)));
    });

    c.bench_function("splice_middle", |b| {
        b.iter(|| {
            let mut buffer = RingBuffer::new("bench", 4096);
            buffer.append(&[0x41u8; 512]);
            buffer.insert_byte(256, 0xff).unwrap();
            black_box(buffer.remove_range(256, 1));
        });
    });
}

criterion_group!(benches, buffer_benchmarks);
criterion_main!(benches);
