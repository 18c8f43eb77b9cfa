//! Fuzz target for join descriptor parsing
//!
//! Malformed JSON and nonsense URLs must be rejected, never panic.

#![no_main]

use confab_core::JoinDescriptor;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = std::str::from_utf8(data) {
        if let Ok(descriptor) = JoinDescriptor::from_json(json) {
            if descriptor.validate().is_ok() {
                let _ = descriptor.signaling_request().url();
            }
        }
    }
});
