#![no_main]

use libfuzzer_sys::fuzz_target;
use md_blocktree::{BlockStore, SerializeConfig, render};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let Ok(store) = BlockStore::from_json(&input) else {
        return;
    };
    store.verify().expect("parsed tree is consistent");
    let _ = render(&store, &SerializeConfig::default());
    if let Ok(json) = store.to_json() {
        let _ = serde_json::from_str::<serde_json::Value>(&json).expect("snapshot is valid json");
    }
});
