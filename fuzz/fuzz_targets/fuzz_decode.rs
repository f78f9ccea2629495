#![no_main]

use gzcodec::GZip;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary data must never panic, in either mode
    let codec = GZip::default();
    let _ = codec.decode(data);

    let mut out = vec![0u8; data.len().min(64 * 1024)];
    let _ = codec.decode_into(data, &mut out);
});
