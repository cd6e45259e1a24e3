//! Example: List the segments of a JPEG file
//!
//! Prints every segment from SOI through SOS with its offset and size, and
//! names the payload format of application segments.
//!
//! Run: `cargo run --example inspect -- <file>`

use jfif_io::{decode_segments, Marker};
use std::{env, fs::File};

fn main() -> jfif_io::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <image_file>", args[0]);
        std::process::exit(1);
    }

    let filename = &args[1];
    println!("Parsing: {}", filename);

    let mut file = File::open(filename)?;
    let segments = match decode_segments(&mut file) {
        Ok(segments) => segments,
        Err(partial) => {
            eprintln!("Scan stopped: {}", partial.error);
            partial.items
        }
    };

    println!("\n{:>8}  {:<6} {:>6}  Kind", "Offset", "Marker", "Size");
    for segment in &segments {
        let kind = if segment.marker().is_app() {
            match segment.app_payload()? {
                Some(app) => app.signature.name().into_owned(),
                None => "(unknown)".to_string(),
            }
        } else if segment.marker() == Marker::COM {
            String::from_utf8_lossy(segment.payload()).into_owned()
        } else {
            String::new()
        };

        println!(
            "{:>8}  {:<6} {:>6}  {}",
            segment.pointer.offset,
            segment.marker().to_string(),
            segment.payload().len(),
            kind
        );
    }

    Ok(())
}
