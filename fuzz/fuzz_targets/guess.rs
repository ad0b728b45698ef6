#![no_main]

use alloctrace::attribute::{Attribute, guess::Attributor};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    Attributor::default().attribute(data, std::io::sink()).ok();
});
