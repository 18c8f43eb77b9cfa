//! Fuzz target for signal frame decoding
//!
//! Arbitrary bytes must decode to a frame or a typed error, never a panic.
//! Anything that decodes must re-encode to a stable canonical form.

#![no_main]

use confab_core::FrameCodec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let codec = FrameCodec::new();
    if let Ok(frame) = codec.decode(data) {
        let canonical = codec.encode(&frame).expect("decoded frame must re-encode");
        let again = codec.decode(&canonical).expect("canonical frame must decode");
        // Byte comparison, metric values may be NaN
        assert_eq!(codec.encode(&again).ok(), Some(canonical));
    }
});
