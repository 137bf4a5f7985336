#![no_main]

use arbitrary::Arbitrary;
use gridlite::{GridConfig, GridService, TableSeed};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum GridOp {
    List(String),
    Delete(String),
    Save(String),
}

fuzz_target!(|ops: Vec<GridOp>| {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(_) => return,
    };
    let config = GridConfig::default().with_db_path(dir.path().join("fuzz.db"));
    let service = match GridService::new(config) {
        Ok(service) => service,
        Err(_) => return,
    };
    if service.lifecycle(vec![TableSeed::demo()]).setup().is_err() {
        return;
    }

    // Limit operations to prevent timeout
    for op in ops.iter().take(20) {
        let envelope = match op {
            GridOp::List(raw) => service.list_raw(raw),
            GridOp::Delete(raw) => service.delete_raw(raw),
            GridOp::Save(raw) => service.save_raw(raw),
        };
        // Every outcome must serialize into an envelope
        assert!(serde_json::to_string(&envelope).is_ok());
    }
});
