#![no_main]

use libfuzzer_sys::fuzz_target;
use statsdiff::baseline::{read_baseline, ConflictPolicy};
use statsdiff::filter::StatFilter;

fuzz_target!(|data: &[u8]| {
    let _ = read_baseline(data, &StatFilter::all(), ConflictPolicy::Strict);
});
