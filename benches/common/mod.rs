//! Common utilities for Formpipe benchmarks
//!
//! Generates multipart bodies of configurable shape.

#![allow(dead_code)]

pub const BOUNDARY: &str = "bench-boundary-7MA4YWxkTrZu0gW";

pub fn content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// A body with `fields` text fields cycling through the coercion paths.
pub fn text_form(fields: usize) -> Vec<u8> {
    let samples = ["plain words", "42", "-3.5e2", "true", r#"{"k":[1,2,3]}"#];
    let mut body = Vec::new();
    for i in 0..fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"f{i}\"\r\n\r\n{}\r\n",
                samples[i % samples.len()]
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// A body holding a single file of `size` bytes.
pub fn file_form(size: usize) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"upload\"; filename=\"blob.bin\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend((0..size).map(|i| (i % 251) as u8));
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}
