#![no_main]

use libfuzzer_sys::fuzz_target;
use statsdiff::expr::{evaluate, Environment};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing and evaluating must never panic, overflow included
        let env: Environment = [("NumIRInsts", i64::MAX), ("NumSILGenFunctions", 0)]
            .into_iter()
            .collect();
        let _ = evaluate(input, &env);
    }
});
