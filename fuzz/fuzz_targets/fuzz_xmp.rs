#![no_main]

use libfuzzer_sys::fuzz_target;
use jfif_io::{
    xmp::{extended_xmp_guid, extended_xmp_segments, reassemble_extended_xmp, ExtendedXmpChunk},
    Marker, Segment,
};

fuzz_target!(|data: &[u8]| {
    // Chunk headers and GUID lookup on arbitrary bytes
    let _ = ExtendedXmpChunk::parse(data);
    let _ = extended_xmp_guid(data);

    // Arbitrary APP1 payloads fed to reassembly
    let segments: Vec<Segment> = data
        .chunks(97)
        .map(|chunk| {
            let mut payload = b"http://ns.adobe.com/xmp/extension/\0".to_vec();
            payload.extend_from_slice(chunk);
            Segment::new(Marker::APP1, payload)
        })
        .collect();
    if let Some(guid) = data.get(..32) {
        let _ = reassemble_extended_xmp(&segments, &String::from_utf8_lossy(guid));
    }

    // Splitting then reassembling is lossless
    if let Ok(split) = extended_xmp_segments(data) {
        if split.len() > 1 {
            let main = split[0].app_payload().ok().flatten().expect("main packet");
            let guid = extended_xmp_guid(main.payload).expect("guid");
            let rebuilt = reassemble_extended_xmp(&split, &guid).expect("reassemble");
            assert_eq!(rebuilt.as_deref(), Some(data));
        }
    }
});
