#![no_main]

use gzcodec::{Error, GZip};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Skip very large inputs to avoid OOM
    if data.len() > 1_000_000 {
        return;
    }

    let (level, payload) = match data.split_first() {
        Some((first, rest)) => ((*first % 10) as i32, rest),
        None => (1, data),
    };
    let codec = GZip::new(level);

    let compressed = codec.encode(payload).expect("encode failed");
    let decompressed = codec.decode(&compressed).expect("decode failed");
    assert_eq!(payload, &decompressed[..], "roundtrip failed at level {}", level);

    let mut exact = vec![0u8; payload.len()];
    let written = codec
        .decode_into(&compressed, &mut exact)
        .expect("decode_into failed");
    assert_eq!(payload, &written[..]);

    if !payload.is_empty() {
        let mut short = vec![0u8; payload.len() - 1];
        assert_eq!(
            codec.decode_into(&compressed, &mut short),
            Err(Error::BufferTooSmall {
                capacity: payload.len() - 1
            })
        );
    }
});
