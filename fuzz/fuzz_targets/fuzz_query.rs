#![no_main]
use libfuzzer_sys::fuzz_target;
use xmlguard::query::{query, QueryKind, ValidationCache};
use xmlguard::Document;

fuzz_target!(|data: &[u8]| {
    if let Ok(expr) = std::str::from_utf8(data) {
        if let Ok(doc) = Document::parse_str("<root><child attr=\"val\">text</child></root>") {
            let cache = ValidationCache::new();
            // Validated queries should never panic on any input.
            let _ = query(&cache, &doc, doc.root(), expr, QueryKind::XPath);
            let _ = query(&cache, &doc, doc.root(), expr, QueryKind::Css);
        }
    }
});
