//! Fuzz target: `SystemConfig` decoding
//!
//! Feeds arbitrary bytes to the postcard and JSON loaders and verifies:
//! - No panics under arbitrary input
//! - Anything that decodes also validates
//! - A decoded config re-encodes and decodes to the same value
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use loratrack::config::SystemConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = SystemConfig::from_bytes(data) {
        assert!(config.validate().is_ok());
        let bytes = config.to_bytes().expect("re-encode");
        assert_eq!(SystemConfig::from_bytes(&bytes), Ok(config));
    }

    if let Ok(text) = core::str::from_utf8(data) {
        if let Ok(config) = SystemConfig::from_json(text) {
            assert!(config.validate().is_ok());
        }
    }
});
