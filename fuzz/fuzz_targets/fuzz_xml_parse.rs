#![no_main]
use libfuzzer_sys::fuzz_target;
use xmlguard::Document;

fuzz_target!(|data: &[u8]| {
    // Parsing arbitrary bytes should never panic, and a parsed document
    // should serialize.
    if let Ok(doc) = Document::parse_bytes(data) {
        let _ = doc.to_xml();
    }
});
