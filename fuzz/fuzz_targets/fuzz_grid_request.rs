#![no_main]

use gridlite_core::{DeleteRequest, GridRequest, SaveRequest};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = std::str::from_utf8(data) {
        if raw.len() > 10_000 {
            return;
        }

        // Parsing and validation must never panic
        if let Ok(request) = GridRequest::from_json(raw) {
            let _ = request.into_query();
        }
        let _ = DeleteRequest::from_json(raw);
        if let Ok(request) = SaveRequest::from_json(raw) {
            let _ = request.row_changes();
        }
    }
});
