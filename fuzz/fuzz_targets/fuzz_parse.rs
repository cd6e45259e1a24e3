#![no_main]

use libfuzzer_sys::fuzz_target;
use jfif_io::{decode_segments, scan_segments, ForwardReader};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Scanning arbitrary input should NEVER panic, only return errors
    let pointers = scan_segments(&mut Cursor::new(data));
    let segments = decode_segments(&mut Cursor::new(data));

    // Forward-only reading must agree with seekable reading
    let forward = scan_segments(&mut ForwardReader::new(data));
    if let (Ok(a), Ok(b)) = (&pointers, &forward) {
        assert_eq!(a, b);
    }

    if let Ok(segments) = segments {
        for segment in &segments {
            // Signature matching on application segments
            if segment.marker().is_app() {
                let _ = segment.app_payload();
            }
        }
    }
});
