#![no_main]
use libfuzzer_sys::fuzz_target;
use xmlguard::css;

fuzz_target!(|data: &[u8]| {
    if let Ok(selector) = std::str::from_utf8(data) {
        // Compilation should never panic, and error positions must stay
        // inside the selector.
        match css::compile(selector) {
            Ok(xpath) => assert!(xpath.starts_with("//")),
            Err(err) => {
                if let Some(position) = err.position() {
                    assert!(position <= selector.len());
                }
            }
        }
    }
});
