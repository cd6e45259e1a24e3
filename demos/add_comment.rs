//! Example: Insert a COM segment before the image data
//!
//! The file is rebuilt in a temporary file and renamed over the original.
//!
//! Run: `cargo run --example add_comment -- <file> <comment>`

use jfif_io::{add, Marker};
use std::env;

fn main() -> jfif_io::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <image_file> <comment>", args[0]);
        std::process::exit(1);
    }

    add(&args[1], Marker::COM, args[2].as_bytes())?;
    println!("Added {} byte comment to {}", args[2].len(), args[1]);

    Ok(())
}
