//! Binary packing of values
//!
//! The packed form starts with the kind tag byte. Integers are written as
//! little-endian `i32`, floats as the little-endian bits of an `f64`, and
//! every length or count as a little-endian `u32`. A struct writes its
//! elements first and its names after them. Host kinds have no packed form
//! and are written as Uninit.

use std::io::{self, Read, Write};

use crate::error::{DecodeError, DecodeResult};
use crate::kind::Kind;
use crate::runtime::Runtime;
use crate::value::{ErrorValue, Value};

/// Containers nested deeper than this are rejected on decode.
pub const MAX_DEPTH: usize = 256;

// Upper bound on speculative preallocation from an untrusted length prefix.
const MAX_PREALLOC: usize = 4096;

impl Value {
    /// Packed bytes of this value.
    ///
    /// Fails like [`Value::pack_onto`].
    pub fn pack(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.size_estimate());
        self.pack_onto(&mut out)?;
        Ok(out)
    }

    /// Write the packed form to `out`.
    ///
    /// A string or container too long for a `u32` length prefix fails with
    /// [`io::ErrorKind::InvalidInput`]; `out` then holds a partial value.
    pub fn pack_onto<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            Value::Uninit | Value::ApplicPtr(_) | Value::ApplicObj(_) => {
                out.write_all(&[Kind::Uninit.tag()])
            }
            Value::Integer(n) => {
                out.write_all(&[Kind::Integer.tag()])?;
                out.write_all(&n.to_le_bytes())
            }
            Value::Float(f) => {
                out.write_all(&[Kind::Float.tag()])?;
                out.write_all(&f.to_bits().to_le_bytes())
            }
            Value::String(s) => {
                out.write_all(&[Kind::String.tag()])?;
                put_str(out, s)
            }
            Value::Error(err) => {
                out.write_all(&[Kind::Error.tag()])?;
                put_str(out, err.text())
            }
            Value::Array(arr) => {
                out.write_all(&[Kind::Array.tag()])?;
                put_len(out, arr.len())?;
                for element in arr.values() {
                    element.pack_onto(out)?;
                }
                Ok(())
            }
            Value::Struct(arr) => {
                out.write_all(&[Kind::Struct.tag()])?;
                put_len(out, arr.len())?;
                for element in arr.values() {
                    element.pack_onto(out)?;
                }
                put_len(out, arr.names().len())?;
                for name in arr.names() {
                    put_str(out, name)?;
                }
                Ok(())
            }
        }
    }
}

fn put_len<W: Write>(out: &mut W, len: usize) -> io::Result<()> {
    let len = u32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("length {len} does not fit the packed form"),
        )
    })?;
    out.write_all(&len.to_le_bytes())
}

fn put_str<W: Write>(out: &mut W, s: &str) -> io::Result<()> {
    put_len(out, s.len())?;
    out.write_all(s.as_bytes())
}

impl Runtime {
    /// Rebuild a value from a complete packed buffer.
    pub fn unpack(&self, bytes: &[u8]) -> DecodeResult<Value> {
        let mut input = bytes;
        let value = Decoder::new(self, &mut input).value(0)?;
        if !input.is_empty() {
            return Err(DecodeError::trailing_bytes(input.len()));
        }
        Ok(value)
    }

    /// Read one packed value from a stream, leaving anything after it
    /// unread.
    pub fn unpack_from<R: Read>(&self, input: &mut R) -> DecodeResult<Value> {
        Decoder::new(self, input).value(0)
    }
}

struct Decoder<'a, R> {
    runtime: &'a Runtime,
    input: R,
}

impl<'a, R: Read> Decoder<'a, R> {
    fn new(runtime: &'a Runtime, input: R) -> Self {
        Decoder { runtime, input }
    }

    fn bytes<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut buf = [0u8; N];
        self.input.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn len(&mut self) -> DecodeResult<usize> {
        Ok(u32::from_le_bytes(self.bytes()?) as usize)
    }

    fn string(&mut self) -> DecodeResult<String> {
        let len = self.len()?;
        let mut buf = Vec::with_capacity(len.min(MAX_PREALLOC));
        (&mut self.input).take(len as u64).read_to_end(&mut buf)?;
        if buf.len() < len {
            return Err(DecodeError::unexpected_eof());
        }
        Ok(String::from_utf8(buf)?)
    }

    fn elements(&mut self, depth: usize) -> DecodeResult<Vec<Value>> {
        let count = self.len()?;
        let mut values = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            values.push(self.value(depth + 1)?);
        }
        Ok(values)
    }

    fn value(&mut self, depth: usize) -> DecodeResult<Value> {
        let [tag] = self.bytes()?;
        let kind = Kind::from_tag(tag).ok_or_else(|| DecodeError::unknown_tag(tag))?;
        if !kind.is_decodable() {
            return Err(DecodeError::unpackable(kind));
        }
        if matches!(kind, Kind::Array | Kind::Struct) && depth >= MAX_DEPTH {
            return Err(DecodeError::too_deep(MAX_DEPTH));
        }

        let value = match kind {
            Kind::Integer => Value::Integer(i32::from_le_bytes(self.bytes()?)),
            Kind::Float => Value::Float(f64::from_bits(u64::from_le_bytes(self.bytes()?))),
            Kind::String => Value::String(self.string()?),
            Kind::Error => Value::Error(ErrorValue::new(self.string()?)),
            Kind::Array => {
                let values = self.elements(depth)?;
                self.runtime.array(values)
            }
            Kind::Struct => {
                let values = self.elements(depth)?;
                let name_count = self.len()?;
                if name_count != values.len() {
                    return Err(DecodeError::name_count_mismatch(values.len(), name_count));
                }
                let mut names = Vec::with_capacity(name_count.min(MAX_PREALLOC));
                for _ in 0..name_count {
                    names.push(self.string()?);
                }
                self.runtime.struct_value(names.into_iter().zip(values))
            }
            _ => Value::Uninit,
        };
        Ok(value)
    }
}
