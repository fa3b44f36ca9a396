//! Binary wire runtime consumed by generated code.
//!
//! The encoding is the Thrift binary protocol: a length-free stream of
//! `(type, field-id)` tagged fields terminated by a stop marker. Struct
//! begin/end frame no bytes in this protocol; a struct IS its fields plus
//! the stop byte. Integers are big-endian; strings are an i32 length prefix
//! followed by UTF-8 bytes; lists/maps carry element-type headers and an
//! i32 count.
//!
//! `int` fields are i64 in generated Rust but 32-bit on the wire, so the
//! checked `write_int`/`read_int` pair is the narrowing/widening boundary;
//! out-of-range values surface as `WireError::IntOutOfRange`, never as
//! silent truncation.
//!
//! Decode errors are recoverable by design (decoding happens at runtime, not
//! build time): everything here returns `Result` with a typed `WireError`
//! and nothing panics on malformed input.

use thiserror::Error;

/// Wire type tags, straight from the Thrift binary protocol.
pub mod ttype {
    pub const STOP: u8 = 0;
    pub const BOOL: u8 = 2;
    pub const BYTE: u8 = 3;
    pub const DOUBLE: u8 = 4;
    pub const I16: u8 = 6;
    pub const I32: u8 = 8;
    pub const I64: u8 = 10;
    pub const STRING: u8 = 11;
    pub const STRUCT: u8 = 12;
    pub const MAP: u8 = 13;
    pub const SET: u8 = 14;
    pub const LIST: u8 = 15;
}

/// Nesting bound for `skip`; malicious input cannot recurse unboundedly.
const MAX_SKIP_DEPTH: usize = 32;

#[derive(Error, Debug, PartialEq)]
pub enum WireError {
    #[error("unexpected end of input at byte {at}")]
    Eof { at: usize },

    #[error("missing required field '{field}' (id {id})")]
    MissingRequiredField { field: &'static str, id: i16 },

    #[error("int value {0} does not fit the 32-bit wire field")]
    IntOutOfRange(i64),

    #[error("'{value}' is not a member of enum {enum_name}")]
    BadEnum { enum_name: &'static str, value: String },

    #[error("string field is not valid utf-8")]
    BadUtf8,

    #[error("negative collection length {0}")]
    BadLength(i32),

    #[error("unknown wire type {0}")]
    UnknownType(u8),

    #[error("skip exceeded nesting depth {MAX_SKIP_DEPTH}")]
    Depth,

    #[error("union decoded with no recognized branch")]
    EmptyUnion,
}

// ————————————————————————————————————————————————————————————————————————————
// WRITER
// ————————————————————————————————————————————————————————————————————————————

#[derive(Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_field_begin(&mut self, ty: u8, id: i16) {
        self.buf.push(ty);
        self.buf.extend_from_slice(&id.to_be_bytes());
    }

    pub fn write_stop(&mut self) {
        self.buf.push(ttype::STOP);
    }

    pub fn write_bool(&mut self, b: bool) {
        self.buf.push(if b { 1 } else { 0 });
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_double(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Checked i64 → i32 narrowing for `int` fields.
    pub fn write_int(&mut self, v: i64) -> Result<(), WireError> {
        let narrow = i32::try_from(v).map_err(|_| WireError::IntOutOfRange(v))?;
        self.write_i32(narrow);
        Ok(())
    }

    pub fn write_string(&mut self, s: &str) -> Result<(), WireError> {
        let len = i32::try_from(s.len()).map_err(|_| WireError::IntOutOfRange(s.len() as i64))?;
        self.write_i32(len);
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    pub fn write_list_begin(&mut self, elem_ty: u8, len: usize) -> Result<(), WireError> {
        self.buf.push(elem_ty);
        let len = i32::try_from(len).map_err(|_| WireError::IntOutOfRange(len as i64))?;
        self.write_i32(len);
        Ok(())
    }

    pub fn write_map_begin(&mut self, key_ty: u8, val_ty: u8, len: usize) -> Result<(), WireError> {
        self.buf.push(key_ty);
        self.buf.push(val_ty);
        let len = i32::try_from(len).map_err(|_| WireError::IntOutOfRange(len as i64))?;
        self.write_i32(len);
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// READER
// ————————————————————————————————————————————————————————————————————————————

pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::Eof { at: self.buf.len() });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// `None` on the stop marker, otherwise the next field's type and id.
    pub fn read_field_begin(&mut self) -> Result<Option<(u8, i16)>, WireError> {
        let ty = self.take(1)?[0];
        if ty == ttype::STOP {
            return Ok(None);
        }
        let id = i16::from_be_bytes(self.take(2)?.try_into().unwrap());
        Ok(Some((ty, id)))
    }

    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        Ok(self.take(1)?[0] != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16, WireError> {
        Ok(i16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn read_i32(&mut self) -> Result<i32, WireError> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_i64(&mut self) -> Result<i64, WireError> {
        Ok(i64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_double(&mut self) -> Result<f64, WireError> {
        Ok(f64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    /// Widening counterpart of `write_int`.
    pub fn read_int(&mut self) -> Result<i64, WireError> {
        Ok(self.read_i32()? as i64)
    }

    pub fn read_string(&mut self) -> Result<String, WireError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(WireError::BadLength(len));
        }
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::BadUtf8)
    }

    pub fn read_list_begin(&mut self) -> Result<(u8, usize), WireError> {
        let elem_ty = self.take(1)?[0];
        let len = self.read_i32()?;
        if len < 0 {
            return Err(WireError::BadLength(len));
        }
        Ok((elem_ty, len as usize))
    }

    pub fn read_map_begin(&mut self) -> Result<(u8, u8, usize), WireError> {
        let key_ty = self.take(1)?[0];
        let val_ty = self.take(1)?[0];
        let len = self.read_i32()?;
        if len < 0 {
            return Err(WireError::BadLength(len));
        }
        Ok((key_ty, val_ty, len as usize))
    }

    /// Skip one value of the given type. Unknown field ids are skipped, not
    /// errors; this is the forward-compatibility half of the reader loop.
    pub fn skip(&mut self, ty: u8) -> Result<(), WireError> {
        self.skip_at_depth(ty, 0)
    }

    fn skip_at_depth(&mut self, ty: u8, depth: usize) -> Result<(), WireError> {
        if depth > MAX_SKIP_DEPTH {
            return Err(WireError::Depth);
        }
        match ty {
            ttype::BOOL | ttype::BYTE => {
                self.take(1)?;
            }
            ttype::I16 => {
                self.take(2)?;
            }
            ttype::I32 => {
                self.take(4)?;
            }
            ttype::I64 | ttype::DOUBLE => {
                self.take(8)?;
            }
            ttype::STRING => {
                let len = self.read_i32()?;
                if len < 0 {
                    return Err(WireError::BadLength(len));
                }
                self.take(len as usize)?;
            }
            ttype::STRUCT => loop {
                match self.read_field_begin()? {
                    None => break,
                    Some((fty, _)) => self.skip_at_depth(fty, depth + 1)?,
                }
            },
            ttype::LIST | ttype::SET => {
                let (elem_ty, len) = self.read_list_begin()?;
                for _ in 0..len {
                    self.skip_at_depth(elem_ty, depth + 1)?;
                }
            }
            ttype::MAP => {
                let (key_ty, val_ty, len) = self.read_map_begin()?;
                for _ in 0..len {
                    self.skip_at_depth(key_ty, depth + 1)?;
                    self.skip_at_depth(val_ty, depth + 1)?;
                }
            }
            other => return Err(WireError::UnknownType(other)),
        }
        Ok(())
    }
}
