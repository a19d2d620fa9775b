// PSPP - a program for statistical analysis.
// Copyright (C) 2025 Free Software Foundation, Inc.
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <http://www.gnu.org/licenses/>.

//! Converting big- and little-endian byte arrays to and from primitive types.
//!
//! The binary formats `IB`, `PIB`, and `RB` use a configurable byte order,
//! and `IB` and `PIB` fields may be anywhere from 1 to 8 bytes wide.

pub use binrw::Endian;
use smallvec::SmallVec;

/// Converts a primitive type into a big- or little-endian `[u8]` array.
pub trait ToBytes<T, const N: usize> {
    fn to_bytes(self, value: T) -> [u8; N];
}

impl ToBytes<u64, 8> for Endian {
    fn to_bytes(self, value: u64) -> [u8; 8] {
        match self {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        }
    }
}

impl ToBytes<f64, 8> for Endian {
    fn to_bytes(self, value: f64) -> [u8; 8] {
        self.to_bytes(value.to_bits())
    }
}

/// Parses a `[u8]` array as a big- or little-endian primitive type.
pub trait FromBytes<T, const N: usize> {
    /// Given 'bytes', returns `T`.
    fn parse(self, bytes: [u8; N]) -> T;
}

impl FromBytes<u64, 8> for Endian {
    fn parse(self, bytes: [u8; 8]) -> u64 {
        match self {
            Endian::Big => u64::from_be_bytes(bytes),
            Endian::Little => u64::from_le_bytes(bytes),
        }
    }
}

impl FromBytes<f64, 8> for Endian {
    fn parse(self, bytes: [u8; 8]) -> f64 {
        f64::from_bits(self.parse(bytes))
    }
}

/// Treats `-f64::MAX` as the system-missing value.
impl FromBytes<Option<f64>, 8> for Endian {
    fn parse(self, bytes: [u8; 8]) -> Option<f64> {
        let number: f64 = self.parse(bytes);
        (number != -f64::MAX).then_some(number)
    }
}

/// Integers stored in fields of 1 to 8 bytes.
pub trait VarBytes {
    /// Returns the `width` least-significant bytes of `value`.
    fn put_uint(self, value: u64, width: usize) -> SmallVec<[u8; 8]>;

    /// Interprets up to 8 `bytes` as an unsigned integer.  Bytes past the
    /// first 8 are ignored.
    fn get_uint(self, bytes: &[u8]) -> u64;
}

impl VarBytes for Endian {
    fn put_uint(self, value: u64, width: usize) -> SmallVec<[u8; 8]> {
        let width = width.min(8);
        match self {
            Endian::Big => SmallVec::from_slice(&value.to_be_bytes()[8 - width..]),
            Endian::Little => SmallVec::from_slice(&value.to_le_bytes()[..width]),
        }
    }

    fn get_uint(self, bytes: &[u8]) -> u64 {
        let bytes = &bytes[..bytes.len().min(8)];
        match self {
            Endian::Big => bytes.iter().fold(0, |acc, b| (acc << 8) | u64::from(*b)),
            Endian::Little => bytes
                .iter()
                .rev()
                .fold(0, |acc, b| (acc << 8) | u64::from(*b)),
        }
    }
}
