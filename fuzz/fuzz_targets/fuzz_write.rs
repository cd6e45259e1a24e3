#![no_main]

use libfuzzer_sys::fuzz_target;
use jfif_io::decode_segments;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Decoded segments must re-encode to exactly the bytes they came from
    let mut cursor = Cursor::new(data);
    let Ok(segments) = decode_segments(&mut cursor) else {
        return;
    };

    for segment in &segments {
        let start = segment.pointer.offset as usize;
        let end = segment.pointer.end_offset() as usize;
        let encoded = segment.to_bytes().expect("decoded segment re-encodes");
        assert_eq!(encoded, &data[start..end]);
    }
});
