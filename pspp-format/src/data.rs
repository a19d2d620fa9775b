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

//! Individual pieces of data.
//!
//! A [Datum] is either a number or a fixed-width string.  String data is a
//! [RawString], a sequence of bytes in whatever character encoding the
//! surrounding data uses.  Formats in this crate only ever treat string bytes
//! as opaque, except that text fields are interpreted as Latin-1 so that each
//! byte is exactly one character.

// Warn about missing docs, but not for items declared with `#[cfg(test)]`.
#![cfg_attr(not(test), warn(missing_docs))]

use std::{
    borrow::Cow,
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
    hash::Hash,
    str::from_utf8,
};

use encoding_rs::mem::decode_latin1;
use ordered_float::OrderedFloat;
use serde::Serialize;

/// The type of a value: numeric or string.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum VarType {
    /// A number.
    Numeric,

    /// A string.
    String,
}

impl Display for VarType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VarType::Numeric => write!(f, "numeric"),
            VarType::String => write!(f, "string"),
        }
    }
}

/// The width of a value: numeric, or a string of a particular number of
/// bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum VarWidth {
    /// A number.
    Numeric,

    /// A string with the given number of bytes.
    String(u16),
}

impl VarWidth {
    /// Returns the width as a single number, 0 for numeric and the number of
    /// bytes for strings.
    pub fn as_usize(self) -> usize {
        match self {
            VarWidth::Numeric => 0,
            VarWidth::String(width) => width as usize,
        }
    }

    /// Returns the width of strings, or `None` for numeric widths.
    pub fn as_string_width(self) -> Option<usize> {
        match self {
            VarWidth::Numeric => None,
            VarWidth::String(width) => Some(width as usize),
        }
    }
}

impl From<VarWidth> for VarType {
    fn from(source: VarWidth) -> Self {
        match source {
            VarWidth::Numeric => VarType::Numeric,
            VarWidth::String(_) => VarType::String,
        }
    }
}

impl Display for VarWidth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VarWidth::Numeric => write!(f, "numeric"),
            VarWidth::String(width) => write!(f, "string({width})"),
        }
    }
}

/// An owned string in an unspecified character encoding.
#[derive(Clone, PartialEq, Default, Eq, PartialOrd, Ord, Hash)]
pub struct RawString(pub Vec<u8>);

impl RawString {
    /// Creates a new [RawString] that consists of `n` ASCII spaces.
    pub fn spaces(n: usize) -> Self {
        Self(vec![b' '; n])
    }

    /// Returns the string's contents as a borrowed byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the string's length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the string contains no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Extends or shortens this [RawString] to exactly `len` bytes.  If the
    /// string needs to be extended, does so by appending spaces.
    pub fn resize(&mut self, len: usize) {
        self.0.resize(len, b' ');
    }

    /// Removes any trailing ASCII spaces.
    pub fn trim_end(&mut self) {
        while self.0.last() == Some(&b' ') {
            self.0.pop();
        }
    }

    /// Returns the string interpreted as Latin-1, so that each byte becomes
    /// exactly one character.
    pub fn as_latin1(&self) -> Cow<'_, str> {
        decode_latin1(&self.0)
    }

    /// Compares this string and `other` for equality, ignoring trailing ASCII
    /// spaces in either string.
    pub fn eq_ignore_trailing_spaces(&self, other: &RawString) -> bool {
        fn trimmed(s: &[u8]) -> &[u8] {
            let len = s.iter().rposition(|c| *c != b' ').map_or(0, |i| i + 1);
            &s[..len]
        }
        trimmed(&self.0) == trimmed(&other.0)
    }
}

impl From<Vec<u8>> for RawString {
    fn from(source: Vec<u8>) -> Self {
        Self(source)
    }
}

impl From<&[u8]> for RawString {
    fn from(source: &[u8]) -> Self {
        Self(source.into())
    }
}

impl From<&str> for RawString {
    fn from(source: &str) -> Self {
        source.as_bytes().into()
    }
}

impl Debug for RawString {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let s = from_utf8(&self.0).map_or_else(|_| decode_latin1(&self.0), Cow::from);
        write!(f, "{s:?}")
    }
}

/// A numeric or string value.
#[derive(Clone)]
pub enum Datum {
    /// A numeric value.
    Number(
        /// A number, or `None` for the system-missing value.
        Option<f64>,
    ),
    /// A string value.
    String(
        /// The value, padded with spaces to its width.
        RawString,
    ),
}

impl Debug for Datum {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Datum::Number(Some(number)) => write!(f, "{number:?}"),
            Datum::Number(None) => write!(f, "SYSMIS"),
            Datum::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(Some(l0)), Self::Number(Some(r0))) => {
                OrderedFloat(*l0) == OrderedFloat(*r0)
            }
            (Self::Number(None), Self::Number(None)) => true,
            (Self::String(l0), Self::String(r0)) => l0 == r0,
            _ => false,
        }
    }
}

impl Eq for Datum {}

impl PartialOrd for Datum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Datum {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Datum::Number(a), Datum::Number(b)) => match (a, b) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => a.total_cmp(b),
            },
            (Datum::Number(_), Datum::String(_)) => Ordering::Less,
            (Datum::String(_), Datum::Number(_)) => Ordering::Greater,
            (Datum::String(a), Datum::String(b)) => a.cmp(b),
        }
    }
}

impl Hash for Datum {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Datum::Number(number) => number.map(OrderedFloat).hash(state),
            Datum::String(string) => string.hash(state),
        }
    }
}

impl Datum {
    /// Constructs a new numerical [Datum] for the system-missing value.
    pub const fn sysmis() -> Self {
        Self::Number(None)
    }

    /// Returns true if this is the system-missing value.
    pub fn is_sysmis(&self) -> bool {
        matches!(self, Self::Number(None))
    }

    /// Returns the number inside this datum, or `None` if this is a string
    /// datum.
    pub fn as_number(&self) -> Option<Option<f64>> {
        match self {
            Datum::Number(number) => Some(*number),
            Datum::String(_) => None,
        }
    }

    /// Returns the string inside this datum, or `None` if this is a numeric
    /// datum.
    pub fn as_string(&self) -> Option<&RawString> {
        match self {
            Datum::Number(_) => None,
            Datum::String(s) => Some(s),
        }
    }

    /// Returns the [VarType] corresponding to this datum.
    pub fn var_type(&self) -> VarType {
        match self {
            Self::Number(_) => VarType::Numeric,
            Self::String(_) => VarType::String,
        }
    }

    /// Returns the [VarWidth] corresponding to this datum.  Strings longer
    /// than [u16::MAX] bytes report the maximum width.
    pub fn width(&self) -> VarWidth {
        match self {
            Datum::Number(_) => VarWidth::Numeric,
            Datum::String(s) => VarWidth::String(s.len().try_into().unwrap_or(u16::MAX)),
        }
    }

    /// Returns true if this datum can be resized to `width` without loss,
    /// which requires the same type and, for strings, that only spaces would
    /// be dropped.
    pub fn is_resizable(&self, width: VarWidth) -> bool {
        match (self, width) {
            (Datum::Number(_), VarWidth::Numeric) => true,
            (Datum::String(s), VarWidth::String(new_width)) => {
                let new_len = new_width as usize;
                new_len >= s.len() || s.0[new_len..].iter().all(|c| *c == b' ')
            }
            _ => false,
        }
    }

    /// Resizes this datum to `width`.  A datum of the wrong type is replaced
    /// by the default value for `width`.
    pub fn resize(&mut self, width: VarWidth) {
        match (self, width) {
            (Datum::Number(_), VarWidth::Numeric) => (),
            (Datum::String(s), VarWidth::String(new_width)) => s.resize(new_width as usize),
            (this, width) => *this = Self::default_for_width(width),
        }
    }

    /// Returns the default value for `width`: system-missing for numeric
    /// values, all spaces for strings.
    pub fn default_for_width(width: VarWidth) -> Self {
        match width {
            VarWidth::Numeric => Self::sysmis(),
            VarWidth::String(width) => Self::String(RawString::spaces(width as usize)),
        }
    }

    /// Compares this datum and `other` for equality, ignoring trailing ASCII
    /// spaces in either, if they are both strings.
    pub fn eq_ignore_trailing_spaces(&self, other: &Datum) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a.eq_ignore_trailing_spaces(b),
            _ => self == other,
        }
    }
}

impl From<f64> for Datum {
    fn from(number: f64) -> Self {
        Some(number).into()
    }
}

impl From<Option<f64>> for Datum {
    fn from(value: Option<f64>) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        value.as_bytes().into()
    }
}

impl From<&[u8]> for Datum {
    fn from(value: &[u8]) -> Self {
        Self::String(value.into())
    }
}

impl From<RawString> for Datum {
    fn from(value: RawString) -> Self {
        Self::String(value)
    }
}
