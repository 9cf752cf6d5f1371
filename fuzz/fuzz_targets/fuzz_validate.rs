#![no_main]
use libfuzzer_sys::fuzz_target;
use xmlguard::query::ValidationCache;

fuzz_target!(|data: &[u8]| {
    if let Ok(expr) = std::str::from_utf8(data) {
        let cache = ValidationCache::new();
        let first = cache.check_and_cache(expr);
        // A cached verdict must agree with the first one, and only accepted
        // expressions may be cached.
        assert_eq!(first.is_ok(), cache.contains(expr));
        assert_eq!(first.is_ok(), cache.check_and_cache(expr).is_ok());
    }
});
