//! Binary encode/decode for the archive format.
//!
//! All integers are little-endian. Strings and byte arrays are
//! length-prefixed with a `u32` length. A file is a header followed by
//! records:
//!
//! ```text
//! [MAGIC "SHOL"] [VERSION u8]
//! [path str] [tag u8] [payload] ...
//! ```
//!
//! Array payloads are `[ndim u8] [dim u64]* [f64]*`, the element count
//! being the product of the dimensions.

use std::io::{Read, Write};

use smallvec::SmallVec;

use crate::archive::{Array, Value};
use crate::error::ArchiveError;
use crate::{FORMAT_VERSION, MAGIC};

const TAG_U64: u8 = 1;
const TAG_F64: u8 = 2;
const TAG_STR: u8 = 3;
const TAG_ARRAY: u8 = 4;
const TAG_BYTES: u8 = 5;

/// Largest array rank accepted when decoding.
const MAX_RANK: u8 = 8;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), ArchiveError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), ArchiveError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), ArchiveError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian f64.
pub fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), ArchiveError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a length-prefixed byte array (u32 length + bytes).
pub fn write_length_prefixed_bytes(w: &mut dyn Write, b: &[u8]) -> Result<(), ArchiveError> {
    let len = u32::try_from(b.len()).map_err(|_| ArchiveError::MalformedRecord {
        detail: format!("byte string of {} bytes exceeds u32 length prefix", b.len()),
    })?;
    write_u32_le(w, len)?;
    w.write_all(b)?;
    Ok(())
}

/// Write a length-prefixed UTF-8 string (u32 length + bytes).
pub fn write_length_prefixed_str(w: &mut dyn Write, s: &str) -> Result<(), ArchiveError> {
    write_length_prefixed_bytes(w, s.as_bytes())
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, ArchiveError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf).map_err(truncated)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, ArchiveError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(truncated)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, ArchiveError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(truncated)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a little-endian f64.
pub fn read_f64_le(r: &mut dyn Read) -> Result<f64, ArchiveError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(truncated)?;
    Ok(f64::from_le_bytes(buf))
}

/// Read a length-prefixed byte array.
pub fn read_length_prefixed_bytes(r: &mut dyn Read) -> Result<Vec<u8>, ArchiveError> {
    let len = read_u32_le(r)? as usize;
    let mut buf = Vec::new();
    (&mut *r).take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(ArchiveError::MalformedRecord {
            detail: format!("expected {len} bytes, got {}", buf.len()),
        });
    }
    Ok(buf)
}

/// Read a length-prefixed UTF-8 string.
pub fn read_length_prefixed_str(r: &mut dyn Read) -> Result<String, ArchiveError> {
    let buf = read_length_prefixed_bytes(r)?;
    String::from_utf8(buf).map_err(|e| ArchiveError::MalformedRecord {
        detail: format!("invalid UTF-8 string: {e}"),
    })
}

fn truncated(e: std::io::Error) -> ArchiveError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        ArchiveError::MalformedRecord {
            detail: "unexpected end of data".into(),
        }
    } else {
        ArchiveError::Io(e)
    }
}

// ── Header ──────────────────────────────────────────────────────

/// Write magic bytes and format version.
pub fn encode_header(w: &mut dyn Write) -> Result<(), ArchiveError> {
    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)
}

/// Read and validate magic bytes and format version.
pub fn decode_header(r: &mut dyn Read) -> Result<(), ArchiveError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => ArchiveError::InvalidMagic,
        _ => ArchiveError::Io(e),
    })?;
    if magic != MAGIC {
        return Err(ArchiveError::InvalidMagic);
    }
    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(ArchiveError::UnsupportedVersion { found: version });
    }
    Ok(())
}

// ── Records ─────────────────────────────────────────────────────

/// Encode one `(path, value)` record.
pub fn encode_record(w: &mut dyn Write, path: &str, value: &Value) -> Result<(), ArchiveError> {
    write_length_prefixed_str(w, path)?;
    match value {
        Value::U64(v) => {
            write_u8(w, TAG_U64)?;
            write_u64_le(w, *v)
        }
        Value::F64(v) => {
            write_u8(w, TAG_F64)?;
            write_f64_le(w, *v)
        }
        Value::Str(s) => {
            write_u8(w, TAG_STR)?;
            write_length_prefixed_str(w, s)
        }
        Value::Array(a) => {
            if a.len() != a.data.len() {
                return Err(ArchiveError::MalformedRecord {
                    detail: format!(
                        "array '{path}' has shape {:?} but {} elements",
                        a.shape,
                        a.data.len()
                    ),
                });
            }
            let rank = u8::try_from(a.shape.len())
                .ok()
                .filter(|&r| r <= MAX_RANK)
                .ok_or_else(|| ArchiveError::MalformedRecord {
                    detail: format!("array '{path}' has rank {}", a.shape.len()),
                })?;
            write_u8(w, TAG_ARRAY)?;
            write_u8(w, rank)?;
            for &d in &a.shape {
                write_u64_le(w, d as u64)?;
            }
            let mut bytes = Vec::with_capacity(a.data.len() * 8);
            for v in &a.data {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            w.write_all(&bytes)?;
            Ok(())
        }
        Value::Bytes(b) => {
            write_u8(w, TAG_BYTES)?;
            write_length_prefixed_bytes(w, b)
        }
    }
}

/// Decode the next record, or `None` at a clean end of stream.
pub fn decode_record(r: &mut dyn Read) -> Result<Option<(String, Value)>, ArchiveError> {
    // Read the path length byte-by-byte to distinguish clean EOF from
    // truncation inside the length prefix.
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < 4 {
        match r.read(&mut len_buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(ArchiveError::MalformedRecord {
                    detail: format!("truncated record header: got {filled} of 4 bytes"),
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ArchiveError::Io(e)),
        }
    }
    let path_len = u32::from_le_bytes(len_buf) as usize;
    let mut path_bytes = Vec::new();
    (&mut *r).take(path_len as u64).read_to_end(&mut path_bytes)?;
    if path_bytes.len() != path_len {
        return Err(ArchiveError::MalformedRecord {
            detail: format!("truncated path: got {} of {path_len} bytes", path_bytes.len()),
        });
    }
    let path = String::from_utf8(path_bytes).map_err(|e| ArchiveError::MalformedRecord {
        detail: format!("invalid UTF-8 path: {e}"),
    })?;

    let value = match read_u8(r)? {
        TAG_U64 => Value::U64(read_u64_le(r)?),
        TAG_F64 => Value::F64(read_f64_le(r)?),
        TAG_STR => Value::Str(read_length_prefixed_str(r)?),
        TAG_ARRAY => Value::Array(decode_array(r, &path)?),
        TAG_BYTES => Value::Bytes(read_length_prefixed_bytes(r)?),
        tag => return Err(ArchiveError::UnknownValueTag { tag }),
    };
    Ok(Some((path, value)))
}

fn decode_array(r: &mut dyn Read, path: &str) -> Result<Array, ArchiveError> {
    let rank = read_u8(r)?;
    if rank > MAX_RANK {
        return Err(ArchiveError::MalformedRecord {
            detail: format!("array '{path}' has rank {rank}"),
        });
    }
    let mut shape: SmallVec<[usize; 3]> = SmallVec::with_capacity(rank as usize);
    for _ in 0..rank {
        shape.push(read_u64_le(r)? as usize);
    }
    let count = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .and_then(|n| n.checked_mul(8).map(|bytes| (n, bytes)))
        .ok_or_else(|| ArchiveError::MalformedRecord {
            detail: format!("array '{path}' shape {shape:?} overflows"),
        })?;
    let (n, byte_len) = count;
    let mut bytes = Vec::new();
    (&mut *r).take(byte_len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != byte_len {
        return Err(ArchiveError::MalformedRecord {
            detail: format!(
                "array '{path}' truncated: got {} of {byte_len} bytes",
                bytes.len()
            ),
        });
    }
    let mut data = Vec::with_capacity(n);
    for chunk in bytes.chunks_exact(8) {
        let mut b = [0u8; 8];
        b.copy_from_slice(chunk);
        data.push(f64::from_le_bytes(b));
    }
    Ok(Array { shape, data })
}
