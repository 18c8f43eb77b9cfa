//! Fuzz target for compressed SDP inflation

#![no_main]

use confab_core::compression::decompress_sdp;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = decompress_sdp(data);
});
