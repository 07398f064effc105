//! Deterministic binary encoding of the message model.
//!
//! This is the byte contract used to move Input/Output between processes
//! that may disagree on native integer width or signedness, so every count
//! and id goes on the wire as a signed 64-bit integer (big-endian) and every
//! count is written explicitly. Strings are an i64 byte length followed by
//! UTF-8 bytes. Bools are a single strict 0/1 byte.
//!
//! Decoding is all-or-nothing: `WireDecode::decode` returns a fully built
//! value or a `DecodeError`. A partially populated message is never
//! observable by the caller.

use std::error::Error;
use std::fmt;
use std::io::{self, Read, Write};

use crate::models::{Covariance, Input, Investment, Output};

/// Decode failures. All of these leave nothing behind - the caller never
/// sees a half-read message.
#[derive(Debug)]
pub enum DecodeError {
    /// The stream ended before the message did.
    Truncated,
    /// A count field was negative.
    NegativeCount(i64),
    /// A string length field was negative.
    NegativeStringLength(i64),
    /// String bytes were not valid UTF-8.
    InvalidUtf8,
    /// A bool byte was something other than 0 or 1.
    InvalidBool(u8),
    /// Underlying I/O failure other than EOF.
    Io(io::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated => write!(f, "truncated stream"),
            DecodeError::NegativeCount(n) => write!(f, "negative count: {}", n),
            DecodeError::NegativeStringLength(n) => write!(f, "negative string length: {}", n),
            DecodeError::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
            DecodeError::InvalidBool(b) => write!(f, "invalid bool byte: {}", b),
            DecodeError::Io(e) => write!(f, "read failed: {}", e),
        }
    }
}

impl Error for DecodeError {}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::Truncated
        } else {
            DecodeError::Io(e)
        }
    }
}

/// Primitive writer for the wire format.
pub struct WireWriter<W: Write> {
    inner: W,
}

impl<W: Write> WireWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_i64(&mut self, value: i64) -> io::Result<()> {
        self.inner.write_all(&value.to_be_bytes())
    }

    pub fn write_f64(&mut self, value: f64) -> io::Result<()> {
        self.inner.write_all(&value.to_be_bytes())
    }

    pub fn write_bool(&mut self, value: bool) -> io::Result<()> {
        self.inner.write_all(&[u8::from(value)])
    }

    pub fn write_str(&mut self, value: &str) -> io::Result<()> {
        self.write_i64(value.len() as i64)?;
        self.inner.write_all(value.as_bytes())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Primitive reader for the wire format.
pub struct WireReader<R: Read> {
    inner: R,
}

impl<R: Read> WireReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        let mut buf = [0u8; 8];
        self.inner.read_exact(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        let mut buf = [0u8; 8];
        self.inner.read_exact(&mut buf)?;
        Ok(f64::from_be_bytes(buf))
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf)?;
        match buf[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::InvalidBool(other)),
        }
    }

    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_i64()?;
        if len < 0 {
            return Err(DecodeError::NegativeStringLength(len));
        }
        // Read through `take` so a malicious length cannot force a huge
        // allocation before any bytes arrive.
        let mut bytes = Vec::new();
        let got = (&mut self.inner)
            .take(len as u64)
            .read_to_end(&mut bytes)?;
        if got as u64 != len as u64 {
            return Err(DecodeError::Truncated);
        }
        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
    }

    /// Read a count field (element count preceding a sequence).
    pub fn read_count(&mut self) -> Result<i64, DecodeError> {
        let count = self.read_i64()?;
        if count < 0 {
            return Err(DecodeError::NegativeCount(count));
        }
        Ok(count)
    }
}

pub trait WireEncode {
    fn encode<W: Write>(&self, w: &mut WireWriter<W>) -> io::Result<()>;
}

pub trait WireDecode: Sized {
    fn decode<R: Read>(r: &mut WireReader<R>) -> Result<Self, DecodeError>;
}

/// Encode a message into a fresh byte buffer.
pub fn encode_to_vec<T: WireEncode>(value: &T) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    value.encode(&mut WireWriter::new(&mut buf))?;
    Ok(buf)
}

/// Decode a message from a byte slice.
pub fn decode_from_slice<T: WireDecode>(bytes: &[u8]) -> Result<T, DecodeError> {
    T::decode(&mut WireReader::new(bytes))
}

// --- MESSAGE LAYOUTS ---

impl WireEncode for Investment {
    fn encode<W: Write>(&self, w: &mut WireWriter<W>) -> io::Result<()> {
        w.write_i64(self.id)?;
        w.write_str(&self.name)?;
        w.write_f64(self.expected_return)?;
        w.write_f64(self.allocation)
    }
}

impl WireDecode for Investment {
    fn decode<R: Read>(r: &mut WireReader<R>) -> Result<Self, DecodeError> {
        let id = r.read_i64()?;
        let name = r.read_string()?;
        let expected_return = r.read_f64()?;
        let allocation = r.read_f64()?;
        Ok(Self {
            id,
            name,
            expected_return,
            allocation,
        })
    }
}

impl WireEncode for Covariance {
    fn encode<W: Write>(&self, w: &mut WireWriter<W>) -> io::Result<()> {
        w.write_i64(self.len() as i64)?;
        // Triples come out sorted with lo <= hi, so the byte stream is
        // deterministic for a given matrix.
        for (lo, hi, value) in self.triples() {
            w.write_i64(lo)?;
            w.write_i64(hi)?;
            w.write_f64(value)?;
        }
        Ok(())
    }
}

impl WireDecode for Covariance {
    fn decode<R: Read>(r: &mut WireReader<R>) -> Result<Self, DecodeError> {
        let count = r.read_count()?;
        let mut cov = Covariance::new();
        for _ in 0..count {
            let lo = r.read_i64()?;
            let hi = r.read_i64()?;
            let value = r.read_f64()?;
            cov.set(lo, hi, value);
        }
        Ok(cov)
    }
}

impl WireEncode for Input {
    fn encode<W: Write>(&self, w: &mut WireWriter<W>) -> io::Result<()> {
        w.write_i64(self.investments.len() as i64)?;
        for inv in &self.investments {
            inv.encode(w)?;
        }
        self.covariance.encode(w)?;
        w.write_f64(self.wealth)?;
        w.write_f64(self.rho)
    }
}

impl WireDecode for Input {
    fn decode<R: Read>(r: &mut WireReader<R>) -> Result<Self, DecodeError> {
        let count = r.read_count()?;
        let mut investments = Vec::new();
        for _ in 0..count {
            investments.push(Investment::decode(r)?);
        }
        let covariance = Covariance::decode(r)?;
        let wealth = r.read_f64()?;
        let rho = r.read_f64()?;
        Ok(Self {
            investments,
            covariance,
            wealth,
            rho,
        })
    }
}

impl WireEncode for Output {
    fn encode<W: Write>(&self, w: &mut WireWriter<W>) -> io::Result<()> {
        w.write_bool(self.optimal)?;
        w.write_f64(self.wealth)?;
        w.write_f64(self.rho)?;
        w.write_f64(self.objective_value)?;
        w.write_f64(self.total_return)?;
        w.write_f64(self.total_variance)?;
        w.write_i64(self.investments.len() as i64)?;
        for inv in &self.investments {
            inv.encode(w)?;
        }
        Ok(())
    }
}

impl WireDecode for Output {
    fn decode<R: Read>(r: &mut WireReader<R>) -> Result<Self, DecodeError> {
        let optimal = r.read_bool()?;
        let wealth = r.read_f64()?;
        let rho = r.read_f64()?;
        let objective_value = r.read_f64()?;
        let total_return = r.read_f64()?;
        let total_variance = r.read_f64()?;
        let count = r.read_count()?;
        let mut investments = Vec::new();
        for _ in 0..count {
            investments.push(Investment::decode(r)?);
        }
        Ok(Self {
            optimal,
            wealth,
            rho,
            objective_value,
            total_return,
            total_variance,
            investments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> Input {
        let mut cov = Covariance::new();
        cov.set(0, 0, 10.95);
        cov.set(1, 0, -0.119083); // stored canonically as (0, 1)
        cov.set(1, 1, 9.81777);
        Input::new(
            vec![
                Investment::new(0, "Stock A", 1.00125),
                Investment::new(1, "Stock B", 1.56359),
            ],
            cov,
            100.0,
            0.01,
        )
    }

    #[test]
    fn test_investment_round_trip() {
        let mut inv = Investment::new(42, "Euro Fund (hedged)", 1.5);
        inv.allocation = 12.75;

        let bytes = encode_to_vec(&inv).unwrap();
        let back: Investment = decode_from_slice(&bytes).unwrap();

        assert_eq!(back.id, 42);
        assert_eq!(back.name, "Euro Fund (hedged)");
        assert_eq!(back.expected_return, 1.5);
        assert_eq!(back.allocation, 12.75);
    }

    #[test]
    fn test_nan_fields_survive_as_nan() {
        let inv = Investment::new(7, "Pending", 1.1); // allocation is NaN
        let bytes = encode_to_vec(&inv).unwrap();
        let back: Investment = decode_from_slice(&bytes).unwrap();
        assert!(back.allocation.is_nan());
    }

    #[test]
    fn test_input_round_trip_is_idempotent() {
        let input = sample_input();

        let bytes = encode_to_vec(&input).unwrap();
        let once: Input = decode_from_slice(&bytes).unwrap();
        let bytes_again = encode_to_vec(&once).unwrap();

        // Re-encoding a decoded message reproduces the identical stream.
        assert_eq!(bytes, bytes_again);

        let twice: Input = decode_from_slice(&bytes_again).unwrap();
        assert_eq!(twice.wealth, 100.0);
        assert_eq!(twice.rho, 0.01);
        assert_eq!(twice.investments.len(), 2);
        assert_eq!(twice.covariance.get(0, 1), -0.119083);
    }

    #[test]
    fn test_empty_input_round_trip() {
        // Boundary case: zero investments, empty matrix.
        let input = Input::default();
        let bytes = encode_to_vec(&input).unwrap();
        let back: Input = decode_from_slice(&bytes).unwrap();
        assert!(back.investments.is_empty());
        assert!(back.covariance.is_empty());
        assert!(back.wealth.is_nan());
        assert!(back.rho.is_nan());
    }

    #[test]
    fn test_output_round_trip() {
        let mut out = Output {
            optimal: true,
            wealth: 100.0,
            rho: 0.5,
            objective_value: 123.456,
            total_return: 150.0,
            total_variance: 42.0,
            investments: vec![Investment::new(0, "Stock A", 1.1)],
        };
        out.investments[0].allocation = 100.0;

        let bytes = encode_to_vec(&out).unwrap();
        let back: Output = decode_from_slice(&bytes).unwrap();
        assert!(back.optimal);
        assert_eq!(back.objective_value, 123.456);
        assert_eq!(back.investments[0].allocation, 100.0);
    }

    #[test]
    fn test_infeasible_output_round_trip() {
        let out = Output::infeasible(100.0, 0.9);
        let bytes = encode_to_vec(&out).unwrap();
        let back: Output = decode_from_slice(&bytes).unwrap();
        assert!(!back.optimal);
        assert!(back.objective_value.is_nan());
        assert!(back.investments.is_empty());
    }

    #[test]
    fn test_truncated_stream_is_an_error() {
        let bytes = encode_to_vec(&sample_input()).unwrap();
        for cut in [0, 1, 8, bytes.len() / 2, bytes.len() - 1] {
            let result: Result<Input, _> = decode_from_slice(&bytes[..cut]);
            assert!(result.is_err(), "cut at {} should fail", cut);
        }
    }

    #[test]
    fn test_negative_count_is_rejected() {
        let mut buf = Vec::new();
        WireWriter::new(&mut buf).write_i64(-1).unwrap();
        let result: Result<Input, _> = decode_from_slice(&buf);
        assert!(matches!(result, Err(DecodeError::NegativeCount(-1))));
    }

    #[test]
    fn test_negative_string_length_is_rejected() {
        let mut buf = Vec::new();
        {
            let mut w = WireWriter::new(&mut buf);
            w.write_i64(1).unwrap(); // one investment
            w.write_i64(0).unwrap(); // id
            w.write_i64(-5).unwrap(); // bogus name length
        }
        let result: Result<Input, _> = decode_from_slice(&buf);
        assert!(matches!(result, Err(DecodeError::NegativeStringLength(-5))));
    }

    #[test]
    fn test_bad_bool_byte_is_rejected() {
        let result: Result<Output, _> = decode_from_slice(&[2u8]);
        assert!(matches!(result, Err(DecodeError::InvalidBool(2))));
    }

    #[test]
    fn test_multibyte_names_round_trip() {
        let inv = Investment::new(1, "Fonds Européen 株式", 1.2);
        let bytes = encode_to_vec(&inv).unwrap();
        let back: Investment = decode_from_slice(&bytes).unwrap();
        assert_eq!(back.name, "Fonds Européen 株式");
    }
}
