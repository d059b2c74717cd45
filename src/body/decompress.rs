//! Response body decoding by `content-encoding`.

use std::io::{self, Read};

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};

/// Decode `body` according to `encoding`.
///
/// Empty, `identity` and unrecognized encodings return the bytes unchanged.
pub fn decompress(encoding: Option<&str>, body: Vec<u8>) -> io::Result<Vec<u8>> {
    if body.is_empty() {
        return Ok(body);
    }
    let encoding = encoding.map(|e| e.trim().to_ascii_lowercase()).unwrap_or_default();
    match encoding.as_str() {
        "gzip" | "x-gzip" => read_all(GzDecoder::new(&body[..])),
        // Servers disagree on whether deflate means zlib-wrapped or raw.
        "deflate" => read_all(ZlibDecoder::new(&body[..])).or_else(|_| read_all(DeflateDecoder::new(&body[..]))),
        "br" => {
            let mut out = Vec::new();
            brotli::BrotliDecompress(&mut io::Cursor::new(&body), &mut out)?;
            Ok(out)
        }
        _ => Ok(body),
    }
}

fn read_all(mut reader: impl Read) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    reader.read_to_end(&mut out)?;
    Ok(out)
}
