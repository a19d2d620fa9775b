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

use std::{
    fmt::{Display, Write},
    ops::RangeInclusive,
    str::FromStr,
};

use encoding_rs::mem::decode_latin1;
use smallstr::SmallString;
use thiserror::Error as ThisError;

use crate::{
    calendar::{calendar_gregorian_to_offset, DateError},
    data::{Datum, RawString, VarType, VarWidth},
    endian::{Endian, FromBytes, VarBytes},
    format::{DateTemplate, Decimals, Format, Settings as FormatSettings, TemplateItem, Type},
    message::{Diagnostic, Diagnostics, Location, Severity},
    settings::Settings,
};

/// An error parsing a data field.
#[derive(Clone, Debug)]
pub struct ParseError {
    type_: Type,
    input: String,
    kind: ParseErrorKind,
}

impl ParseError {
    pub fn type_(&self) -> Type {
        self.type_
    }

    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }
}

impl std::error::Error for ParseError {}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} cannot be parsed as {}: {}",
            &self.input, &self.type_, &self.kind
        )
    }
}

#[derive(ThisError, Clone, Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Field contents are not numeric.
    #[error("Field contents are not numeric.")]
    NotNumeric,

    /// Invalid numeric syntax.
    #[error("Invalid numeric syntax.")]
    InvalidNumericSyntax,

    /// Number too large to represent.
    #[error("Too-large number set to system-missing.")]
    Overflow,

    /// Number too small to represent.
    #[error("Too-small number set to zero.")]
    Underflow,

    /// Field contains unexpected non-digit.
    #[error("Field contains unexpected non-digit {0:?}.")]
    Nondigit(char),

    /// Field contains unexpected non-hex digit.
    #[error("Field contains unexpected non-hex digit {0:?}.")]
    NonHexDigit(char),

    /// Field contains odd number of hex digits.
    #[error("Field contains {0:?} hex digits but only an even number is allowed.")]
    OddLength(usize),

    /// Field contains invalid BCD digit.
    #[error("Field contains invalid BCD digit ({0:?}).")]
    NonBCDDigit(u8),

    /// Day must be between 1 and 31.
    #[error("Day ({0}) must be between 1 and 31.")]
    InvalidDay(i32),

    /// Syntax error in date field.
    #[error("Syntax error in date field.")]
    DateSyntax,

    /// Julian day must have exactly three digits.
    #[error("Julian day must have exactly three digits.")]
    InvalidYDayLen,

    /// Julian day must be between 1 and 366, inclusive.
    #[error("Julian day ({0}) must be between 1 and 366, inclusive.")]
    InvalidYDay(i32),

    /// Quarter must be between 1 and 4, inclusive.
    #[error("Quarter ({0}) must be between 1 and 4, inclusive.")]
    InvalidQuarter(i32),

    /// Week must be between 1 and 53, inclusive.
    #[error("Week ({0}) must be between 1 and 53, inclusive.")]
    InvalidWeek(i32),

    /// Unrecognized month format.
    #[error("Unrecognized month format.  Months may be specified as Arabic or Roman numerals or as at least 3 letters of their English names.")]
    InvalidMonth,

    /// Delimiter expected between fields in time.
    #[error("Delimiter expected between fields in time.")]
    ExpectedTimeDelimiter,

    /// Delimiter expected between fields in date.
    #[error("Delimiter expected between fields in date.")]
    ExpectedDateDelimiter,

    /// Minute must be between 0 and 59, inclusive.
    #[error("Minute ({0}) must be between 0 and 59, inclusive.")]
    InvalidMinute(i32),

    /// Invalid weekday name.
    #[error("Unrecognized weekday name.  At least the first two letters of an English weekday name must be specified.")]
    InvalidWeekdayName,

    /// Expected character.
    #[error("{0:?} expected in date field.")]
    ExpectedChar(char),

    /// Trailing garbage.
    #[error("Trailing garbage {0:?} follows date.")]
    TrailingGarbage(String),

    /// Invalid date.
    #[error("{0}")]
    InvalidDate(#[from] DateError),

    /// Invalid zoned decimal (Z) syntax.
    #[error("Invalid zoned decimal (Z) syntax.")]
    InvalidZ,
}

/// Parses data fields of a particular format type.
#[derive(Clone, Debug)]
pub struct ParseValue<'a> {
    type_: Type,
    settings: &'a Settings,
    implied_decimals: Option<Decimals>,

    /// Width of string output, `None` to keep the width of the input.
    width: Option<u16>,

    /// Columns of the field, for diagnostics.
    columns: Option<RangeInclusive<i32>>,
}

impl Type {
    pub fn parser(&self) -> ParseValue<'static> {
        ParseValue::new(*self)
    }
}

impl Format {
    /// Returns a parser for fields in this format.  String output is padded
    /// or truncated to the format's variable width.
    pub fn parser(&self) -> ParseValue<'static> {
        ParseValue::new(self.type_()).with_width(self.var_width())
    }
}

impl ParseValue<'static> {
    /// Returns a parser for `type_` that uses the default settings.
    pub fn new(type_: Type) -> Self {
        Self {
            type_,
            settings: Settings::global(),
            implied_decimals: None,
            width: None,
            columns: None,
        }
    }
}

impl<'a> ParseValue<'a> {
    pub fn with_settings<'b>(self, settings: &'b Settings) -> ParseValue<'b> {
        ParseValue {
            type_: self.type_,
            settings,
            implied_decimals: self.implied_decimals,
            width: self.width,
            columns: self.columns,
        }
    }

    /// Sets the number of decimal places to assume for numbers that lack an
    /// explicit decimal point.
    pub fn with_implied_decimals(self, d: Decimals) -> Self {
        Self {
            implied_decimals: if d > 0 { Some(d) } else { None },
            ..self
        }
    }

    /// Sets the width of the output value.  This only matters for string
    /// formats.
    pub fn with_width(self, width: VarWidth) -> Self {
        Self {
            width: width.as_string_width().map(|width| width as u16),
            ..self
        }
    }

    /// Sets the 1-based columns that the field occupies, for use in
    /// diagnostics.
    pub fn with_columns(self, columns: RangeInclusive<i32>) -> Self {
        Self {
            columns: Some(columns),
            ..self
        }
    }

    /// Returns the value to use for a blank field or one that fails to parse.
    pub fn default_value(&self) -> Datum {
        match self.type_.var_type() {
            VarType::Numeric => Datum::Number(self.settings.blanks),
            VarType::String => Datum::String(RawString::spaces(self.width.unwrap_or(0).into())),
        }
    }

    /// Parses `input`, storing the result in `output`.  Returns true if
    /// successful.
    ///
    /// On failure, stores a default value in `output` and adds a warning to
    /// `diagnostics`.  The default is system-missing for a number too large
    /// to represent, zero for one too small, and otherwise the
    /// [default value](Self::default_value).
    pub fn decode(
        &self,
        input: impl AsRef<[u8]>,
        output: &mut Datum,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        match self.parse(input) {
            Ok(datum) => {
                *output = datum;
                true
            }
            Err(error) => {
                *output = match error.kind {
                    ParseErrorKind::Overflow => Datum::sysmis(),
                    ParseErrorKind::Underflow => Datum::Number(Some(0.0)),
                    _ => self.default_value(),
                };
                let location = self
                    .columns
                    .clone()
                    .map(Location::columns)
                    .unwrap_or_default();
                diagnostics.push(
                    Diagnostic::data(Severity::Warning, error.to_string()).with_location(location),
                );
                false
            }
        }
    }

    /// Parses `input`.
    ///
    /// # Input encoding
    ///
    /// `input` is treated as raw bytes.  Text formats interpret each byte as
    /// one Latin-1 character, which keeps binary formats such as `IB` and
    /// `Z` from being mangled by recoding.
    pub fn parse(&self, input: impl AsRef<[u8]>) -> Result<Datum, ParseError> {
        let input = input.as_ref();
        if input.is_empty() {
            return Ok(self.default_value());
        }
        match self.type_ {
            Type::F | Type::Comma | Type::Dot | Type::Dollar | Type::Pct | Type::E => {
                self.parse_text(input, |s| self.parse_number(s, self.type_))
            }
            Type::CC(_) => self.parse_text(input, |s| self.parse_number(s, Type::F)),
            Type::N => self.parse_text(input, |s| self.parse_n(s)),
            Type::Z => self.parse_z(input),
            Type::PIBHex => self.parse_text(input, |s| self.parse_pibhex(s)),
            Type::RBHex => self.parse_text(input, |s| self.parse_rbhex(s)),
            Type::Date
            | Type::ADate
            | Type::EDate
            | Type::JDate
            | Type::SDate
            | Type::QYr
            | Type::MoYr
            | Type::WkYr
            | Type::DateTime
            | Type::YmdHms
            | Type::MTime
            | Type::Time
            | Type::DTime => self.parse_text(input, |s| self.parse_date(s)),
            Type::WkDay => self.parse_text(input, |s| self.parse_wkday(s)),
            Type::Month => self.parse_text(input, |s| self.parse_month(s)),
            Type::P => self.parse_p(input),
            Type::PK => Ok(self.parse_pk(input)),
            Type::IB => Ok(self.parse_ib(input)),
            Type::PIB => Ok(self.parse_pib(input)),
            Type::RB => Ok(self.parse_rb(input)),
            Type::A => Ok(self.parse_a(input)),
            Type::AHex => self.parse_ahex(&decode_latin1(input)),
        }
        .map_err(|kind| ParseError {
            type_: self.type_,
            input: decode_latin1(input).into_owned(),
            kind,
        })
    }

    /// Parses `input` as text.  A field that is all spaces yields the blank
    /// value and a lone `.` yields system-missing, without calling `f`.
    fn parse_text<F>(&self, input: &[u8], f: F) -> Result<Datum, ParseErrorKind>
    where
        F: FnOnce(&str) -> Result<Datum, ParseErrorKind>,
    {
        let input = decode_latin1(input);
        match input.trim_ascii() {
            "" => Ok(Datum::Number(self.settings.blanks)),
            "." => Ok(Datum::sysmis()),
            _ => f(&*input),
        }
    }

    fn implied_decimals(&self) -> i32 {
        self.implied_decimals.map_or(0, i32::from)
    }

    /// Converts `number`, a decimal number in Rust syntax, to a [Datum],
    /// checking for overflow and underflow.
    fn finish_number(number: &str) -> Result<Datum, ParseErrorKind> {
        let value = number
            .parse::<f64>()
            .map_err(|_| ParseErrorKind::InvalidNumericSyntax)?;
        let nonzero = || {
            number
                .split(['e', 'E'])
                .next()
                .is_some_and(|mantissa| mantissa.bytes().any(|b| (b'1'..=b'9').contains(&b)))
        };
        if value.is_infinite() {
            Err(ParseErrorKind::Overflow)
        } else if value == 0.0 && nonzero() {
            Err(ParseErrorKind::Underflow)
        } else {
            Ok(Datum::Number(Some(value)))
        }
    }

    fn parse_number(&self, input: &str, type_: Type) -> Result<Datum, ParseErrorKind> {
        let style = self.settings.formats.number_style(type_);
        let prefix = decode_latin1(style.prefix.bytes());
        let suffix = decode_latin1(style.suffix.bytes());

        let mut p = StrParser::new(input.trim_ascii());
        fn strip_integer(mut input: &str, grouping: Option<char>) -> &str {
            while let Some(rest) = input.strip_prefix(|c: char| c.is_ascii_digit()) {
                let rest = if let Some(grouping) = grouping {
                    rest.strip_prefix(grouping).unwrap_or(rest)
                } else {
                    rest
                };
                input = rest;
            }
            input
        }

        if p.strip_prefix(&prefix) {
            p.strip_ws();
        }
        let sign = p.strip_one_of(&['-', '+']).inspect(|_| p.strip_ws());
        if sign.is_some() && p.strip_prefix(&prefix) {
            p.strip_ws();
        }
        let integer = p.advance(strip_integer(p.0, style.grouping.map(char::from)));
        let (point, fraction) = if p.strip_prefix(style.decimal.as_str()) {
            (true, p.strip_matches(|c| c.is_ascii_digit()))
        } else {
            (false, "")
        };
        let mut exponent = 0i32;
        if p.0.starts_with(['e', 'E', 'd', 'D', '+', '-']) {
            if p.strip_one_of(&['e', 'E', 'd', 'D']).is_some() {
                p.strip_ws();
            }
            let exp_sign = p.strip_one_of(&['-', '+']).inspect(|_| p.strip_ws());
            let digits = p.strip_matches(|c| c.is_ascii_digit());
            if digits.is_empty() {
                return Err(ParseErrorKind::InvalidNumericSyntax);
            }
            // Anything this large overflows or underflows.
            exponent = digits.parse().unwrap_or(99_999);
            if exp_sign == Some('-') {
                exponent = -exponent;
            }
        }
        if p.strip_prefix(&suffix) {
            p.strip_ws();
        }

        if !p.0.is_empty() {
            return Err(ParseErrorKind::NotNumeric);
        }

        let mut number = SmallString::<[u8; 64]>::new();
        if sign == Some('-') {
            number.push('-');
        }
        number.extend(integer.chars().filter(|c| c.is_ascii_digit()));
        if number.trim_start_matches('-').is_empty() && fraction.is_empty() {
            return Err(ParseErrorKind::NotNumeric);
        }
        if !fraction.is_empty() {
            number.push('.');
            number.push_str(fraction);
        }
        if !point {
            exponent -= self.implied_decimals();
        }
        if exponent != 0 {
            write!(&mut number, "e{exponent}").map_err(|_| ParseErrorKind::InvalidNumericSyntax)?;
        }
        Self::finish_number(&number)
    }

    fn parse_n(&self, input: &str) -> Result<Datum, ParseErrorKind> {
        if let Some(nondigit) = input.chars().find(|c| !c.is_ascii_digit()) {
            return Err(ParseErrorKind::Nondigit(nondigit));
        }
        let mut number = SmallString::<[u8; 64]>::from_str(input);
        if let Some(d) = self.implied_decimals {
            write!(&mut number, "e-{d}").map_err(|_| ParseErrorKind::InvalidNumericSyntax)?;
        }
        Self::finish_number(&number)
    }

    fn parse_z(&self, input: &[u8]) -> Result<Datum, ParseErrorKind> {
        let input = input.trim_ascii();
        match input {
            b"" => return Ok(Datum::Number(self.settings.blanks)),
            b"." => return Ok(Datum::sysmis()),
            _ => (),
        }

        enum ZChar {
            Digit(u8),
            SignedDigit(u8, Sign),
            Dot,
            Invalid,
        }

        impl From<u8> for ZChar {
            fn from(b: u8) -> Self {
                match b {
                    b'0'..=b'9' => ZChar::Digit(b - b'0'),
                    b'{' => ZChar::SignedDigit(0, Sign::Positive),
                    b'A'..=b'I' => ZChar::SignedDigit(b - b'A' + 1, Sign::Positive),
                    b'}' => ZChar::SignedDigit(0, Sign::Negative),
                    b'J'..=b'R' => ZChar::SignedDigit(b - b'J' + 1, Sign::Negative),

                    // Zoned bytes, as written by the `Z` output format.
                    0xf0..=0xf9 => ZChar::Digit(b & 0x0f),
                    0xc0..=0xc9 => ZChar::SignedDigit(b & 0x0f, Sign::Positive),
                    0xd0..=0xd9 => ZChar::SignedDigit(b & 0x0f, Sign::Negative),
                    b'.' => ZChar::Dot,
                    _ => ZChar::Invalid,
                }
            }
        }

        let mut number = SmallString::<[u8; 64]>::new();
        let mut sign = None;
        let mut dot = false;
        for c in input.iter().copied().map(ZChar::from) {
            match c {
                ZChar::Digit(digit) if sign.is_none() => {
                    number.push(char::from(b'0' + digit));
                }
                ZChar::SignedDigit(digit, s) if sign.is_none() => {
                    number.push(char::from(b'0' + digit));
                    sign = Some(s);
                }
                ZChar::Dot if !dot => {
                    number.push('.');
                    dot = true;
                }
                _ => return Err(ParseErrorKind::InvalidZ),
            }
        }
        if number.as_str() == "." {
            return Err(ParseErrorKind::InvalidZ);
        }
        match self.implied_decimals {
            Some(d) if !dot => {
                write!(&mut number, "e-{d}").map_err(|_| ParseErrorKind::InvalidZ)?
            }
            _ => (),
        }
        let number = number.parse::<f64>().map_err(|_| ParseErrorKind::InvalidZ)?;
        let number = if sign == Some(Sign::Negative) {
            -number
        } else {
            number
        };
        Ok(Datum::Number(Some(number)))
    }

    fn parse_bcd(input: &[u8]) -> Result<u128, ParseErrorKind> {
        let mut value: u128 = 0;
        for byte in input.iter().copied() {
            let hi = nibble(byte >> 4)?;
            let lo = nibble(byte & 0x0f)?;
            value = value
                .checked_mul(100)
                .and_then(|value| value.checked_add(hi * 10 + lo))
                .ok_or(ParseErrorKind::Overflow)?;
        }
        Ok(value)
    }

    fn apply_decimals(&self, number: f64) -> f64 {
        match self.implied_decimals {
            Some(d) if d > 0 => number / 10.0f64.powi(d as i32),
            _ => number,
        }
    }

    /// Unlike `P`, a bad digit in `PK` yields system-missing rather than an
    /// error.
    fn parse_pk(&self, input: &[u8]) -> Datum {
        match Self::parse_bcd(input) {
            Ok(number) => Datum::Number(Some(self.apply_decimals(number as f64))),
            Err(_) => Datum::sysmis(),
        }
    }

    fn parse_p(&self, input: &[u8]) -> Result<Datum, ParseErrorKind> {
        let Some((&last, head)) = input.split_last() else {
            return Ok(Datum::sysmis());
        };
        let last_digit = nibble(last >> 4)?;
        let number = Self::parse_bcd(head)?
            .checked_mul(10)
            .and_then(|number| number.checked_add(last_digit))
            .ok_or(ParseErrorKind::Overflow)? as f64;
        let number = match last & 0x0f {
            0xb | 0xd => -number,
            _ => number,
        };
        Ok(Datum::Number(Some(self.apply_decimals(number))))
    }

    fn parse_ib(&self, input: &[u8]) -> Datum {
        let number = self.settings.endian.input.get_uint(input);
        let shift = 64 - 8 * input.len().min(8) as u32;
        let number = ((number << shift) as i64) >> shift;
        Datum::Number(Some(self.apply_decimals(number as f64)))
    }

    fn parse_pib(&self, input: &[u8]) -> Datum {
        let number = self.settings.endian.input.get_uint(input);
        Datum::Number(Some(self.apply_decimals(number as f64)))
    }

    fn parse_rb(&self, input: &[u8]) -> Datum {
        match input.get(..8).and_then(|bytes| <[u8; 8]>::try_from(bytes).ok()) {
            Some(bytes) => Datum::Number(self.settings.endian.input.parse(bytes)),
            None => Datum::sysmis(),
        }
    }

    fn parse_a(&self, input: &[u8]) -> Datum {
        let mut string = RawString::from(input);
        if let Some(width) = self.width {
            string.resize(width.into());
        }
        Datum::String(string)
    }

    fn parse_ahex(&self, input: &str) -> Result<Datum, ParseErrorKind> {
        let mut result = Vec::with_capacity(input.len() / 2);
        let mut iter = input.chars();
        while let Some(hi) = iter.next() {
            let Some(lo) = iter.next() else {
                return Err(ParseErrorKind::OddLength(input.len()));
            };
            let Some(hi) = hi.to_digit(16) else {
                return Err(ParseErrorKind::NonHexDigit(hi));
            };
            let Some(lo) = lo.to_digit(16) else {
                return Err(ParseErrorKind::NonHexDigit(lo));
            };
            result.push((hi * 16 + lo) as u8);
        }
        let mut string = RawString(result);
        if let Some(width) = self.width {
            string.resize(width.into());
        }
        Ok(Datum::String(string))
    }

    /// Parses pairs of hex digits, most significant first.
    fn parse_hex(input: &str) -> Result<Vec<u8>, ParseErrorKind> {
        let input = input.trim_ascii();
        if let Some(c) = input.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ParseErrorKind::NonHexDigit(c));
        }
        if input.len() % 2 != 0 {
            return Err(ParseErrorKind::OddLength(input.len()));
        }
        Ok(input
            .as_bytes()
            .chunks(2)
            .map(|pair| (hex_value(pair[0]) << 4) | hex_value(pair[1]))
            .collect())
    }

    fn parse_pibhex(&self, input: &str) -> Result<Datum, ParseErrorKind> {
        let number = Self::parse_hex(input)?
            .into_iter()
            .fold(0.0, |acc, byte| acc * 256.0 + f64::from(byte));
        Ok(Datum::Number(Some(number)))
    }

    fn parse_rbhex(&self, input: &str) -> Result<Datum, ParseErrorKind> {
        let mut bytes = [0; 8];
        for (dst, src) in bytes.iter_mut().zip(Self::parse_hex(input)?) {
            *dst = src;
        }
        Ok(Datum::Number(Endian::Big.parse(bytes)))
    }

    fn parse_date(&self, input: &str) -> Result<Datum, ParseErrorKind> {
        let mut p = StrParser(input.trim_ascii());

        let mut day = 1;
        let mut yday = 1;
        let mut month = 1;
        let mut year = None;
        let mut time_sign = None;
        let mut time = 0.0;

        let mut iter = DateTemplate::new(self.type_, 0).ok_or(ParseErrorKind::DateSyntax)?;
        let template_width = iter.len();
        while let Some(TemplateItem { c, n }) = iter.next() {
            match c {
                'd' if n < 3 => {
                    day = parse_day(&mut p)?;
                }
                'd' => {
                    yday = parse_yday(&mut p)?;
                }
                'm' => {
                    month = parse_month(&mut p)?;
                }
                'y' => {
                    let max_digits = if !iter
                        .clone()
                        .next()
                        .is_some_and(|item| item.c.is_ascii_alphabetic())
                    {
                        usize::MAX
                    } else if p.0.len() >= template_width + 2 {
                        4
                    } else {
                        2
                    };
                    year = Some(parse_year(&mut p, &self.settings.formats, max_digits)?);
                }
                'q' => month = parse_quarter(&mut p)?,
                'w' => yday = parse_week(&mut p)?,
                'D' => {
                    time_sign = Some(parse_sign(&mut p, time_sign));
                    time += parse_time(&mut p)? * 60.0 * 60.0 * 24.0;
                }
                'H' => {
                    time_sign = Some(parse_sign(&mut p, time_sign));
                    time += parse_time(&mut p)? * 60.0 * 60.0;
                }
                'M' => {
                    if self.type_ == Type::MTime {
                        time_sign = Some(parse_sign(&mut p, time_sign));
                    }
                    time += self.parse_minute_second(&mut p)?;
                }
                '-' | '/' | '.' => parse_date_delimiter(&mut p)?,
                ':' => parse_time_delimiter(&mut p)?,
                ' ' => {
                    if self.type_ != Type::MoYr {
                        p.strip_ws();
                    } else {
                        parse_date_delimiter(&mut p)?
                    }
                }
                c => {
                    if p.strip_one_of(&[c.to_ascii_uppercase(), c.to_ascii_lowercase()])
                        .is_none()
                    {
                        return Err(ParseErrorKind::ExpectedChar(c));
                    }
                }
            }
        }
        parse_trailer(&mut p)?;

        let date = if let Some(year) = year {
            let date =
                calendar_gregorian_to_offset(year, month, day, &self.settings.formats)? + yday - 1;
            date as f64 * 60.0 * 60.0 * 24.0
        } else {
            0.0
        };
        let time_date = if time_sign == Some(Sign::Negative) {
            date - time
        } else {
            date + time
        };
        Ok(Datum::Number(Some(time_date)))
    }

    fn parse_minute_second(&self, p: &mut StrParser<'_>) -> Result<f64, ParseErrorKind> {
        let minute = parse_int::<i32>(p)?;
        if self.type_ != Type::MTime && !(0..=59).contains(&minute) {
            return Err(ParseErrorKind::InvalidMinute(minute));
        }
        let time = minute as f64 * 60.0;

        if parse_time_delimiter(p).is_err() || !p.0.starts_with(|c: char| c.is_ascii_digit()) {
            return Ok(time);
        }
        let integer = p.strip_matches(|c| c.is_ascii_digit());
        let fraction = if p.strip_prefix(self.settings.formats.decimal.as_str()) {
            p.strip_matches(|c| c.is_ascii_digit())
        } else {
            ""
        };

        let mut number = SmallString::<[u8; 64]>::new();
        number.push_str(integer);
        number.push('.');
        number.push_str(fraction);
        let seconds = number
            .parse::<f64>()
            .map_err(|_| ParseErrorKind::DateSyntax)?;
        Ok(time + seconds)
    }

    fn parse_wkday(&self, input: &str) -> Result<Datum, ParseErrorKind> {
        let mut p = StrParser(input.trim_ascii());
        let weekday = parse_weekday(&mut p)?;
        parse_trailer(&mut p)?;
        Ok(Datum::Number(Some(weekday as f64)))
    }

    fn parse_month(&self, input: &str) -> Result<Datum, ParseErrorKind> {
        let mut p = StrParser(input.trim_ascii());
        let month = parse_month(&mut p)?;
        parse_trailer(&mut p)?;
        Ok(Datum::Number(Some(month as f64)))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Sign {
    Positive,
    Negative,
}

fn parse_trailer(p: &mut StrParser<'_>) -> Result<(), ParseErrorKind> {
    p.strip_ws();
    if p.0.is_empty() {
        Ok(())
    } else {
        Err(ParseErrorKind::TrailingGarbage(p.0.into()))
    }
}

fn parse_sign(p: &mut StrParser<'_>, sign: Option<Sign>) -> Sign {
    if let Some(sign) = sign {
        sign
    } else if p.strip_one_of(&['-', '+']) == Some('-') {
        Sign::Negative
    } else {
        Sign::Positive
    }
}

fn parse_time(p: &mut StrParser<'_>) -> Result<f64, ParseErrorKind> {
    let number = parse_int::<i32>(p)?;
    if number < 0 {
        return Err(ParseErrorKind::DateSyntax);
    }
    Ok(number as f64)
}

fn parse_day(p: &mut StrParser<'_>) -> Result<i32, ParseErrorKind> {
    let day = parse_int::<i32>(p)?;
    if (1..=31).contains(&day) {
        Ok(day)
    } else {
        Err(ParseErrorKind::InvalidDay(day))
    }
}

fn parse_yday(p: &mut StrParser<'_>) -> Result<i32, ParseErrorKind> {
    let Some(s) = p.0.get(..3) else {
        return Err(ParseErrorKind::InvalidYDayLen);
    };
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseErrorKind::InvalidYDayLen);
    }
    let yday = s.parse().map_err(|_| ParseErrorKind::InvalidYDayLen)?;
    if !(1..=366).contains(&yday) {
        return Err(ParseErrorKind::InvalidYDay(yday));
    }
    p.0 = &p.0[3..];
    Ok(yday)
}

fn parse_month(p: &mut StrParser<'_>) -> Result<i32, ParseErrorKind> {
    if p.0.starts_with(|c: char| c.is_ascii_digit()) {
        let month = parse_int(p)?;
        if (1..=12).contains(&month) {
            return Ok(month);
        }
    } else {
        let name = p.strip_matches(|c| c.is_ascii_alphabetic());

        static ENGLISH_NAMES: [&str; 12] = [
            "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
        ];
        if let Some(month) = match_name(&name[..3.min(name.len())], &ENGLISH_NAMES) {
            return Ok(month);
        }

        static ROMAN_NAMES: [&str; 12] = [
            "i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x", "xi", "xii",
        ];
        if let Some(month) = match_name(&name[..4.min(name.len())], &ROMAN_NAMES) {
            return Ok(month);
        }
    }
    Err(ParseErrorKind::InvalidMonth)
}

fn parse_weekday(p: &mut StrParser<'_>) -> Result<i32, ParseErrorKind> {
    static WEEKDAY_NAMES: [&str; 7] = ["su", "mo", "tu", "we", "th", "fr", "sa"];
    let name = p.strip_matches(|c| c.is_ascii_alphabetic());
    name.get(..2)
        .and_then(|name| match_name(name, &WEEKDAY_NAMES))
        .ok_or(ParseErrorKind::InvalidWeekdayName)
}

fn parse_quarter(p: &mut StrParser<'_>) -> Result<i32, ParseErrorKind> {
    match parse_int(p)? {
        quarter @ 1..=4 => Ok((quarter - 1) * 3 + 1),
        other => Err(ParseErrorKind::InvalidQuarter(other)),
    }
}

fn parse_week(p: &mut StrParser<'_>) -> Result<i32, ParseErrorKind> {
    match parse_int(p)? {
        week @ 1..=53 => Ok((week - 1) * 7 + 1),
        other => Err(ParseErrorKind::InvalidWeek(other)),
    }
}

fn parse_time_delimiter(p: &mut StrParser<'_>) -> Result<(), ParseErrorKind> {
    let delimiter = p.strip_matches(|c| c == ':' || c.is_ascii_whitespace());
    if !delimiter.is_empty() {
        Ok(())
    } else {
        Err(ParseErrorKind::ExpectedTimeDelimiter)
    }
}

fn parse_date_delimiter(p: &mut StrParser<'_>) -> Result<(), ParseErrorKind> {
    let delimiter = p
        .strip_matches(|c| c == '-' || c == '/' || c == '.' || c == ',' || c.is_ascii_whitespace());
    if !delimiter.is_empty() {
        Ok(())
    } else {
        Err(ParseErrorKind::ExpectedDateDelimiter)
    }
}

fn match_name(name: &str, candidates: &[&str]) -> Option<i32> {
    candidates
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(name))
        .map(|index| index as i32 + 1)
}

fn parse_year(
    p: &mut StrParser<'_>,
    settings: &FormatSettings,
    max_digits: usize,
) -> Result<i32, ParseErrorKind> {
    let head = p.clone().strip_matches(|c| c.is_ascii_digit());
    let head = if head.len() > max_digits {
        head.get(..max_digits).ok_or(ParseErrorKind::DateSyntax)?
    } else {
        head
    };

    let year = head
        .parse::<i32>()
        .map_err(|_| ParseErrorKind::DateSyntax)?;
    p.0 = &p.0[head.len()..];
    Ok(settings.epoch.apply(year))
}

fn parse_int<T>(p: &mut StrParser<'_>) -> Result<T, ParseErrorKind>
where
    T: FromStr,
{
    let mut tmp = *p;
    tmp.strip_one_of(&['+', '-']).inspect(|_| tmp.strip_ws());
    tmp.strip_matches(|c| c.is_ascii_digit());
    let number = p
        .up_to(tmp.0)
        .parse::<T>()
        .map_err(|_| ParseErrorKind::DateSyntax)?;
    *p = tmp;
    Ok(number)
}

#[derive(Copy, Clone, Debug)]
struct StrParser<'a>(&'a str);

impl<'a> StrParser<'a> {
    fn new(s: &'a str) -> Self {
        Self(s)
    }

    fn strip_prefix(&mut self, prefix: &str) -> bool {
        if prefix.is_empty() {
            false
        } else if let Some(rest) = self.0.strip_prefix(prefix) {
            self.0 = rest;
            true
        } else {
            false
        }
    }

    fn strip_one_of(&mut self, chars: &[char]) -> Option<char> {
        let mut iter = self.0.chars();
        match iter.next() {
            Some(c) if chars.contains(&c) => {
                self.0 = iter.as_str();
                Some(c)
            }
            _ => None,
        }
    }

    fn strip_matches(&mut self, f: impl Fn(char) -> bool) -> &'a str {
        self.advance(self.0.trim_start_matches(f))
    }

    fn strip_ws(&mut self) {
        self.0 = self.0.trim_start();
    }

    fn advance(&mut self, rest: &'a str) -> &'a str {
        let head = self.up_to(rest);
        self.0 = rest;
        head
    }

    fn up_to(&self, rest: &'a str) -> &'a str {
        &self.0[..self.0.len() - rest.len()]
    }
}

fn nibble(b: u8) -> Result<u128, ParseErrorKind> {
    if b < 10 {
        Ok(b as u128)
    } else {
        Err(ParseErrorKind::NonBCDDigit(b))
    }
}

/// Returns the value of ASCII hex digit `b`, which must already have been
/// validated.
fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use rand::random;

    use crate::{
        calendar::{days_in_month, is_leap_year},
        data::{Datum, VarWidth},
        endian::Endian,
        format::{
            parse::ParseErrorKind,
            Decimal, Epoch, Format, Settings as FormatSettings, Type, CC,
        },
        message::Diagnostics,
        settings::{EndianSettings, Settings},
    };

    fn number(type_: Type, input: &str) -> Option<f64> {
        type_.parser().parse(input).unwrap().as_number().unwrap()
    }

    fn kind(type_: Type, input: impl AsRef<[u8]>) -> ParseErrorKind {
        type_.parser().parse(input).unwrap_err().kind().clone()
    }

    #[test]
    fn f() {
        for (input, expected) in [
            ("123", Some(123.0)),
            ("  123.45", Some(123.45)),
            ("-123.45  ", Some(-123.45)),
            ("+ 5", Some(5.0)),
            (".5", Some(0.5)),
            ("5.", Some(5.0)),
            ("1e3", Some(1000.0)),
            ("1E+3", Some(1000.0)),
            ("1-2", Some(0.01)),
            ("1+2", Some(100.0)),
            ("1d2", Some(100.0)),
            ("1.5e -1", Some(0.15)),
            ("", None),
            ("   ", None),
            (".", None),
            (" . ", None),
        ] {
            assert_eq!(number(Type::F, input), expected, "parsing {input:?}");
        }
        assert_eq!(kind(Type::F, "1,234"), ParseErrorKind::NotNumeric);
        assert_eq!(kind(Type::F, "abc"), ParseErrorKind::NotNumeric);
        assert_eq!(kind(Type::F, "-"), ParseErrorKind::NotNumeric);
        assert_eq!(kind(Type::F, "1e"), ParseErrorKind::InvalidNumericSyntax);
        assert_eq!(kind(Type::F, "1e400"), ParseErrorKind::Overflow);
        assert_eq!(kind(Type::F, "1e-400"), ParseErrorKind::Underflow);
        assert_eq!(number(Type::F, "0e-400"), Some(0.0));
    }

    #[test]
    fn implied_decimals() {
        let parser = Type::F.parser().with_implied_decimals(2);
        let parse = |input: &str| parser.parse(input).unwrap().as_number().unwrap();
        assert_eq!(parse("12345"), Some(123.45));
        assert_eq!(parse("123.45"), Some(123.45));
        assert_eq!(parse("1e2"), Some(1.0));
        assert_eq!(parse("-5"), Some(-0.05));

        let parser = Type::N.parser().with_implied_decimals(1);
        assert_eq!(parser.parse("0123").unwrap(), Datum::Number(Some(12.3)));

        // Zero means no implied decimals.
        let parser = Type::F.parser().with_implied_decimals(0);
        assert_eq!(parser.parse("12345").unwrap(), Datum::Number(Some(12345.0)));
    }

    #[test]
    fn styles() {
        assert_eq!(number(Type::Comma, "1,234.5"), Some(1234.5));
        assert_eq!(number(Type::Comma, "1234.5"), Some(1234.5));
        assert_eq!(number(Type::Dot, "1.234,5"), Some(1234.5));
        assert_eq!(number(Type::Dollar, "$1,234.50"), Some(1234.5));
        assert_eq!(number(Type::Dollar, "-$5"), Some(-5.0));
        assert_eq!(number(Type::Dollar, "$ -5"), Some(-5.0));
        assert_eq!(number(Type::Dollar, "5"), Some(5.0));
        assert_eq!(number(Type::Pct, "50%"), Some(50.0));
        assert_eq!(number(Type::Pct, "-12.5%"), Some(-12.5));
        assert_eq!(number(Type::E, "1.5E+02"), Some(150.0));
        assert_eq!(kind(Type::Pct, "50$"), ParseErrorKind::NotNumeric);

        let settings = Settings::default()
            .with_formats(FormatSettings::default().with_decimal(Decimal::Comma));
        let parse = |type_: Type, input: &str| {
            type_
                .parser()
                .with_settings(&settings)
                .parse(input)
                .unwrap()
                .as_number()
                .unwrap()
        };
        assert_eq!(parse(Type::F, "1,5"), Some(1.5));
        assert_eq!(parse(Type::Comma, "1.234,5"), Some(1234.5));
        assert_eq!(parse(Type::Dot, "1,234.5"), Some(1234.5));
    }

    #[test]
    fn custom_currency_parses_like_f() {
        assert_eq!(number(Type::CC(CC::A), "-1.25"), Some(-1.25));
    }

    #[test]
    fn blanks() {
        let settings = Settings::default().with_blanks(Some(0.0));
        for type_ in [Type::F, Type::Comma, Type::N, Type::Z, Type::Date] {
            let parser = type_.parser().with_settings(&settings);
            assert_eq!(parser.parse("   ").unwrap(), Datum::Number(Some(0.0)));
            assert_eq!(parser.parse("").unwrap(), Datum::Number(Some(0.0)));
            assert_eq!(parser.parse(".").unwrap(), Datum::Number(None));
        }
    }

    #[test]
    fn decode() {
        let parser = Type::F.parser().with_columns(5..=12);
        let mut diagnostics = Diagnostics::new();
        let mut datum = Datum::Number(Some(1.0));

        assert!(parser.decode(" 12.5", &mut datum, &mut diagnostics));
        assert_eq!(datum, Datum::Number(Some(12.5)));
        assert!(diagnostics.is_empty());

        assert!(!parser.decode("12x", &mut datum, &mut diagnostics));
        assert_eq!(datum, Datum::Number(None));
        assert_eq!(diagnostics.len(), 1);
        let message = diagnostics.messages[0].to_string();
        assert!(
            message.starts_with("columns 5-12: warning: \"12x\" cannot be parsed as F: "),
            "{message}"
        );

        assert!(!parser.decode("1e-999", &mut datum, &mut diagnostics));
        assert_eq!(datum, Datum::Number(Some(0.0)));
        assert!(!parser.decode("1e999", &mut datum, &mut diagnostics));
        assert_eq!(datum, Datum::Number(None));
        assert_eq!(diagnostics.len(), 3);

        // Failed numeric fields get the blank value.
        let settings = Settings::default().with_blanks(Some(-1.0));
        let parser = Type::F.parser().with_settings(&settings);
        assert!(!parser.decode("x", &mut datum, &mut diagnostics));
        assert_eq!(datum, Datum::Number(Some(-1.0)));

        // Failed string fields get spaces.
        let parser = Format::new(Type::AHex, 8, 0).unwrap().parser();
        let mut datum = Datum::from("abc");
        assert!(!parser.decode("4x", &mut datum, &mut diagnostics));
        assert_eq!(datum, Datum::from("    "));
        assert!(diagnostics.messages[4].location.is_empty());
    }

    struct TestDate {
        year: i32,
        month: i32,
        day: i32,
        yday: i32,
        hour: i32,
        minute: i32,
        second: i32,
    }

    const fn test_date(
        year: i32,
        month: i32,
        day: i32,
        yday: i32,
        hour: i32,
        minute: i32,
        second: i32,
    ) -> TestDate {
        TestDate {
            year,
            month,
            day,
            yday,
            hour,
            minute,
            second,
        }
    }

    static DATES: [TestDate; 12] = [
        test_date(1648, 6, 10, 162, 0, 0, 0),
        test_date(1680, 6, 30, 182, 4, 50, 38),
        test_date(1716, 7, 24, 206, 12, 31, 35),
        test_date(1819, 8, 2, 214, 1, 26, 0),
        test_date(1903, 4, 19, 109, 7, 36, 5),
        test_date(1929, 8, 25, 237, 15, 43, 49),
        test_date(1941, 9, 29, 272, 4, 25, 9),
        test_date(1943, 10, 7, 280, 2, 57, 52),
        test_date(1992, 3, 17, 77, 16, 45, 44),
        test_date(1996, 2, 25, 56, 21, 30, 57),
        test_date(2038, 11, 10, 314, 22, 30, 4),
        test_date(2094, 7, 18, 199, 1, 56, 51),
    ];

    /// Seconds since the epoch at the start of the given day, computed
    /// independently of the calendar module.
    fn seconds(year: i32, month: i32, day: i32) -> f64 {
        let y = year - 1;
        let days = -577735 + 365 * y + y / 4 - y / 100 + y / 400 + (367 * month - 362) / 12
            - match month {
                1 | 2 => 0,
                _ if is_leap_year(year) => 1,
                _ => 2,
            }
            + day;
        days as f64 * 86400.0
    }

    static ROMAN: [&str; 12] = [
        "i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x", "xi", "xii",
    ];
    static ENGLISH: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];

    impl TestDate {
        /// Ways to write the year, accounting for a 1930 epoch.
        fn years(&self) -> Vec<String> {
            let mut years = vec![self.year.to_string()];
            if (1930..2030).contains(&self.year) {
                years.push(format!("{:02}", self.year % 100));
            }
            years
        }

        fn months(&self) -> Vec<String> {
            let m = self.month as usize - 1;
            vec![
                self.month.to_string(),
                format!("{:02}", self.month),
                ROMAN[m].into(),
                ROMAN[m].to_ascii_uppercase(),
                ENGLISH[m].into(),
                ENGLISH[m][..3].to_ascii_uppercase(),
            ]
        }

        fn days(&self) -> Vec<String> {
            vec![self.day.to_string(), format!("{:02}", self.day)]
        }

        fn seconds(&self) -> f64 {
            seconds(self.year, self.month, self.day)
        }

        fn time(&self) -> f64 {
            (self.hour * 3600 + self.minute * 60 + self.second) as f64
        }
    }

    fn check_dates(type_: Type, inputs: impl Fn(&TestDate) -> Vec<(String, f64)>) {
        let settings =
            Settings::default().with_formats(FormatSettings::default().with_epoch(Epoch(1930)));
        let parser = type_.parser().with_settings(&settings);
        for date in &DATES {
            for (input, expected) in inputs(date) {
                assert_eq!(
                    parser.parse(&input).unwrap(),
                    Datum::Number(Some(expected)),
                    "parsing {input:?} as {type_}"
                );
            }
        }
    }

    /// Joins every combination of `first`, `second`, and `third` with each of
    /// `delimiters`.
    fn combine(
        first: &[String],
        second: &[String],
        third: &[String],
        delimiters: &[&str],
    ) -> Vec<String> {
        let mut result = Vec::new();
        for a in first {
            for b in second {
                for c in third {
                    for d in delimiters {
                        result.push(format!("{a}{d}{b}{d}{c}"));
                    }
                }
            }
        }
        result
    }

    const DATE_DELIMITERS: [&str; 5] = [" ", "-", ".", ",", "/"];

    #[test]
    fn date() {
        check_dates(Type::Date, |date| {
            combine(&date.days(), &date.months(), &date.years(), &DATE_DELIMITERS)
                .into_iter()
                .map(|input| (input, date.seconds()))
                .collect()
        });
    }

    #[test]
    fn adate() {
        check_dates(Type::ADate, |date| {
            combine(&date.months(), &date.days(), &date.years(), &DATE_DELIMITERS)
                .into_iter()
                .map(|input| (input, date.seconds()))
                .collect()
        });
    }

    #[test]
    fn edate() {
        check_dates(Type::EDate, |date| {
            combine(&date.days(), &date.months(), &date.years(), &["."])
                .into_iter()
                .map(|input| (input, date.seconds()))
                .collect()
        });
    }

    #[test]
    fn sdate() {
        check_dates(Type::SDate, |date| {
            combine(&date.years(), &date.months(), &date.days(), &["/", "-"])
                .into_iter()
                .map(|input| (input, date.seconds()))
                .collect()
        });
    }

    #[test]
    fn jdate() {
        check_dates(Type::JDate, |date| {
            date.years()
                .into_iter()
                .map(|year| (format!("{year}{:03}", date.yday), date.seconds()))
                .collect()
        });
    }

    #[test]
    fn qyr() {
        check_dates(Type::QYr, |date| {
            let quarter = (date.month - 1) / 3 + 1;
            let expected = seconds(date.year, (quarter - 1) * 3 + 1, 1);
            let mut inputs = Vec::new();
            for year in date.years() {
                for q in ["q", " Q ", "q "] {
                    inputs.push((format!("{quarter}{q}{year}"), expected));
                }
            }
            inputs
        });
    }

    #[test]
    fn moyr() {
        check_dates(Type::MoYr, |date| {
            let expected = seconds(date.year, date.month, 1);
            let mut inputs = Vec::new();
            for month in date.months() {
                for year in date.years() {
                    for delimiter in ["-", " ", "/"] {
                        inputs.push((format!("{month}{delimiter}{year}"), expected));
                    }
                }
            }
            inputs
        });
    }

    #[test]
    fn wkyr() {
        check_dates(Type::WkYr, |date| {
            let week = (date.yday - 1) / 7 + 1;
            let mut month = date.month;
            let mut day = date.day - (date.yday - 1) % 7;
            if day < 1 {
                month -= 1;
                day += days_in_month(date.year, month);
            }
            let expected = seconds(date.year, month, day);
            let mut inputs = Vec::new();
            for year in date.years() {
                for wk in ["wk", " WK ", "Wk "] {
                    inputs.push((format!("{week}{wk}{year}"), expected));
                }
            }
            inputs
        });
    }

    #[test]
    fn datetime() {
        check_dates(Type::DateTime, |date| {
            let mut inputs = Vec::new();
            for day in date.days() {
                for month in date.months() {
                    let base = format!("{day}-{month}-{}", date.year);
                    inputs.push((
                        format!("{base} {}:{:02}", date.hour, date.minute),
                        date.seconds() + (date.hour * 3600 + date.minute * 60) as f64,
                    ));
                    inputs.push((
                        format!("{base} {:02}:{}:{}", date.hour, date.minute, date.second),
                        date.seconds() + date.time(),
                    ));
                }
            }
            inputs
        });
    }

    #[test]
    fn ymdhms() {
        check_dates(Type::YmdHms, |date| {
            let mut inputs = Vec::new();
            for month in date.months() {
                let base = format!("{}-{month}-{:02}", date.year, date.day);
                inputs.push((
                    format!("{base} {}:{}", date.hour, date.minute),
                    date.seconds() + (date.hour * 3600 + date.minute * 60) as f64,
                ));
                inputs.push((
                    format!("{base} {} {} {}", date.hour, date.minute, date.second),
                    date.seconds() + date.time(),
                ));
            }
            inputs
        });
    }

    #[test]
    fn date_errors() {
        assert_eq!(kind(Type::Date, "32-JAN-2000"), ParseErrorKind::InvalidDay(32));
        assert_eq!(kind(Type::Date, "1-FOO-2000"), ParseErrorKind::InvalidMonth);
        assert_eq!(kind(Type::Date, "1-13-2000"), ParseErrorKind::InvalidMonth);
        assert_eq!(
            kind(Type::Date, "1-JAN-2000 x"),
            ParseErrorKind::TrailingGarbage("x".into())
        );
        assert!(matches!(
            kind(Type::Date, "14-OCT-1582"),
            ParseErrorKind::InvalidDate(_)
        ));
        assert_eq!(kind(Type::JDate, "200"), ParseErrorKind::InvalidYDayLen);
        assert_eq!(kind(Type::JDate, "2000400"), ParseErrorKind::InvalidYDay(400));
        assert_eq!(kind(Type::QYr, "5 Q 2000"), ParseErrorKind::InvalidQuarter(5));
        assert_eq!(kind(Type::WkYr, "54 WK 2000"), ParseErrorKind::InvalidWeek(54));
        assert_eq!(kind(Type::Time, "1:60"), ParseErrorKind::InvalidMinute(60));
        assert_eq!(kind(Type::Time, "1"), ParseErrorKind::ExpectedTimeDelimiter);
        assert_eq!(kind(Type::Date, "1JAN2000"), ParseErrorKind::ExpectedDateDelimiter);
        assert_eq!(kind(Type::QYr, "1 X 2000"), ParseErrorKind::ExpectedChar('Q'));
    }

    #[test]
    fn date_offsets() {
        let parse = |type_: Type, input: &str| number(type_, input).unwrap();
        assert_eq!(parse(Type::Date, "01-JAN-2000"), 152385.0 * 86400.0);
        assert_eq!(parse(Type::ADate, "10/15/1582"), 86400.0);
        assert_eq!(parse(Type::SDate, "2000/01/01"), 152385.0 * 86400.0);
    }

    struct TestTime {
        days: i32,
        hours: i32,
        minutes: i32,
        seconds: f64,
    }

    static TIMES: [TestTime; 8] = [
        TestTime {
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 0.0,
        },
        TestTime {
            days: 1,
            hours: 4,
            minutes: 50,
            seconds: 38.68,
        },
        TestTime {
            days: 5,
            hours: 12,
            minutes: 31,
            seconds: 35.82,
        },
        TestTime {
            days: 3,
            hours: 1,
            minutes: 26,
            seconds: 0.69,
        },
        TestTime {
            days: 52,
            hours: 15,
            minutes: 43,
            seconds: 49.27,
        },
        TestTime {
            days: 0,
            hours: 6,
            minutes: 49,
            seconds: 27.89,
        },
        TestTime {
            days: 555,
            hours: 16,
            minutes: 45,
            seconds: 44.12,
        },
        TestTime {
            days: 22,
            hours: 1,
            minutes: 56,
            seconds: 51.18,
        },
    ];

    fn check_times(type_: Type, inputs: impl Fn(&TestTime) -> Vec<(String, f64)>) {
        let parser = type_.parser();
        for time in &TIMES {
            for (input, expected) in inputs(time) {
                for (sign, factor) in [("", 1.0), ("+", 1.0), ("-", -1.0)] {
                    let input = format!("{sign}{input}");
                    let parsed = parser.parse(&input).unwrap().as_number().unwrap().unwrap();
                    assert_eq!(
                        (parsed * 1000.0).round(),
                        (expected * factor * 1000.0).round(),
                        "parsing {input:?} as {type_}"
                    );
                }
            }
        }
    }

    #[test]
    fn mtime() {
        check_times(Type::MTime, |t| {
            let minutes = t.hours * 60 + t.minutes;
            vec![
                (format!("{minutes}"), minutes as f64 * 60.0),
                (
                    format!("{minutes}:{}", t.seconds),
                    minutes as f64 * 60.0 + t.seconds,
                ),
            ]
        });
    }

    #[test]
    fn time() {
        check_times(Type::Time, |t| {
            let hm = (t.hours * 3600 + t.minutes * 60) as f64;
            vec![
                (format!("{}:{}", t.hours, t.minutes), hm),
                (format!("{:02}:{:02}", t.hours, t.minutes), hm),
                (format!("{}:{}:{}", t.hours, t.minutes, t.seconds), hm + t.seconds),
                (format!("{} {} {}", t.hours, t.minutes, t.seconds), hm + t.seconds),
            ]
        });
        assert_eq!(number(Type::Time, "1:30"), Some(5400.0));
        assert_eq!(number(Type::Time, "-1:30"), Some(-5400.0));
    }

    #[test]
    fn dtime() {
        check_times(Type::DTime, |t| {
            let dhm = (t.days * 86400 + t.hours * 3600 + t.minutes * 60) as f64;
            vec![
                (format!("{} {}:{}", t.days, t.hours, t.minutes), dhm),
                (
                    format!("{:02} {:02}:{:02}:{}", t.days, t.hours, t.minutes, t.seconds),
                    dhm + t.seconds,
                ),
            ]
        });
        assert_eq!(number(Type::DTime, "1 01:00:00"), Some(90000.0));
    }

    #[test]
    fn wkday() {
        for (mut input, expected) in [
            ("sudnay", Some(1.0)),
            ("monady", Some(2.0)),
            ("tuseday", Some(3.0)),
            ("WEDENSDAY", Some(4.0)),
            ("Thrudsay", Some(5.0)),
            ("fRidya", Some(6.0)),
            ("SAturady", Some(7.0)),
            ("sturday", None),
        ] {
            loop {
                let parsed = Type::WkDay
                    .parser()
                    .parse(input)
                    .unwrap_or(Datum::Number(None))
                    .as_number()
                    .unwrap();
                assert_eq!(parsed, expected, "parsing {input:?}");

                if input.len() <= 2 {
                    break;
                }
                input = &input[..input.len() - 1];
            }
        }
        assert_eq!(kind(Type::WkDay, "s"), ParseErrorKind::InvalidWeekdayName);
        assert_eq!(number(Type::WkDay, " . "), None);
    }

    #[test]
    fn month() {
        for (input, expected) in [
            ("i", Some(1.0)),
            ("iii", Some(3.0)),
            ("iiii", None),
            ("iv", Some(4.0)),
            ("viiii", Some(8.0)),
            ("xii", Some(12.0)),
            ("0", None),
            ("1", Some(1.0)),
            ("12", Some(12.0)),
            ("13", None),
            ("JANAURY", Some(1.0)),
            ("fEb", Some(2.0)),
            ("marhc", Some(3.0)),
            ("decmeber", Some(12.0)),
            ("ju", None),
        ] {
            let parsed = Type::Month
                .parser()
                .parse(input)
                .unwrap_or(Datum::Number(None))
                .as_number()
                .unwrap();
            assert_eq!(parsed, expected, "parsing {input}");
        }
    }

    #[test]
    fn pibhex() {
        fn hex_digits() -> impl Iterator<Item = (u8, char)> {
            ((0..=9).zip('0'..='9'))
                .chain((0xa..=0xf).zip('a'..='f'))
                .chain((0xa..=0xf).zip('A'..='F'))
                .chain(std::iter::once((0, 'x')))
        }
        let parser = Type::PIBHex.parser();
        for (a, ac) in hex_digits() {
            for (b, bc) in hex_digits() {
                let s = [ac, bc].into_iter().collect::<String>();
                let parsed = parser
                    .parse(&s)
                    .unwrap_or(Datum::Number(None))
                    .as_number()
                    .unwrap();
                let expected = if ac == 'x' || bc == 'x' {
                    None
                } else {
                    Some((a * 16 + b) as f64)
                };
                assert_eq!(parsed, expected);
            }
        }
        assert_eq!(parser.parse(".").unwrap(), Datum::Number(None));
        assert_eq!(parser.parse("").unwrap(), Datum::Number(None));
        assert_eq!(number(Type::PIBHex, "FFFF"), Some(65535.0));
        assert_eq!(kind(Type::PIBHex, "ABC"), ParseErrorKind::OddLength(3));
        assert_eq!(kind(Type::PIBHex, "-1"), ParseErrorKind::NonHexDigit('-'));
    }

    #[test]
    fn rbhex() {
        for _ in 0..1000 {
            let number = random::<f64>();
            let formatted = format!("{:016x}", number.to_bits());
            let parsed = Type::RBHex
                .parser()
                .parse(&formatted)
                .unwrap()
                .as_number()
                .unwrap()
                .unwrap();
            assert_eq!(parsed, number, "formatted as {formatted:?}");
        }
        assert_eq!(number(Type::RBHex, "3FF8"), Some(1.5));
        assert_eq!(number(Type::RBHex, "FFEFFFFFFFFFFFFF"), None);
        assert_eq!(kind(Type::RBHex, "3FF"), ParseErrorKind::OddLength(3));
    }

    #[test]
    fn rb() {
        let settings = Settings::default().with_endian(EndianSettings::new(Endian::Big));
        let parser = Type::RB.parser().with_settings(&settings);
        for _ in 0..1000 {
            let number = random::<f64>();
            let parsed = parser
                .parse(number.to_be_bytes())
                .unwrap()
                .as_number()
                .unwrap()
                .unwrap();
            assert_eq!(parsed, number);
        }
        assert_eq!(parser.parse([0x3f, 0xf0, 0, 0]).unwrap(), Datum::Number(None));
        assert_eq!(
            parser.parse((-f64::MAX).to_be_bytes()).unwrap(),
            Datum::Number(None)
        );

        let settings = Settings::default().with_endian(EndianSettings::new(Endian::Little));
        let parser = Type::RB.parser().with_settings(&settings);
        assert_eq!(
            parser.parse(2.5f64.to_le_bytes()).unwrap(),
            Datum::Number(Some(2.5))
        );
    }

    #[test]
    fn n() {
        let parser = Type::N.parser();
        for number in 0..=99 {
            let formatted = format!("{:02}", number);
            let parsed = parser
                .parse(&formatted)
                .unwrap()
                .as_number()
                .unwrap()
                .unwrap();
            assert_eq!(parsed, number as f64, "formatted as {formatted:?}");
        }
        assert_eq!(kind(Type::N, " 0"), ParseErrorKind::Nondigit(' '));
        assert_eq!(kind(Type::N, "-1"), ParseErrorKind::Nondigit('-'));
        assert_eq!(kind(Type::N, "1.5"), ParseErrorKind::Nondigit('.'));
        assert_eq!(parser.parse(".").unwrap(), Datum::Number(None));
    }

    #[test]
    fn z() {
        let parser = Type::Z.parser();
        for number in -99i32..=99 {
            for mut formatted in [
                format!("{:02}", number.abs()),
                format!("{:2}", number.abs()),
            ] {
                let last = formatted.pop().unwrap();
                let digit = last.to_digit(10).unwrap() as usize;
                if number >= 0 {
                    formatted.push(b"{ABCDEFGHI"[digit] as char);
                } else {
                    formatted.push(b"}JKLMNOPQR"[digit] as char);
                }
                let parsed = parser
                    .parse(&formatted)
                    .unwrap()
                    .as_number()
                    .unwrap()
                    .unwrap();
                assert_eq!(parsed, number as f64, "formatted as {formatted:?}");
            }
        }
        assert_eq!(parser.parse(".").unwrap(), Datum::Number(None));
        assert_eq!(parser.parse("123").unwrap(), Datum::Number(Some(123.0)));

        // Zoned bytes.
        assert_eq!(
            parser.parse([0xf1, 0xf2, 0xc3]).unwrap(),
            Datum::Number(Some(123.0))
        );
        assert_eq!(
            parser.parse([0xf1, 0xf2, 0xd3]).unwrap(),
            Datum::Number(Some(-123.0))
        );

        assert_eq!(kind(Type::Z, "1.2.3"), ParseErrorKind::InvalidZ);
        assert_eq!(kind(Type::Z, "1A2"), ParseErrorKind::InvalidZ);
        assert_eq!(kind(Type::Z, "1x"), ParseErrorKind::InvalidZ);

        let parser = Type::Z.parser().with_implied_decimals(1);
        for number in -999i32..=999 {
            let tenths = number as f64 / 10.0;
            for mut formatted in [format!("{}", number.abs()), format!("{:.1}", tenths.abs())] {
                let last = formatted.pop().unwrap();
                let digit = last.to_digit(10).unwrap() as usize;
                if number >= 0 {
                    formatted.push(b"{ABCDEFGHI"[digit] as char);
                } else {
                    formatted.push(b"}JKLMNOPQR"[digit] as char);
                }
                let parsed = parser
                    .parse(&formatted)
                    .unwrap()
                    .as_number()
                    .unwrap()
                    .unwrap();
                assert_eq!(parsed, tenths, "formatted as {formatted:?}");
            }
        }
    }

    #[test]
    fn p() {
        let parse = |input: &[u8]| Type::P.parser().parse(input);
        assert_eq!(parse(&[0x12, 0x3f]).unwrap(), Datum::Number(Some(123.0)));
        assert_eq!(parse(&[0x12, 0x3c]).unwrap(), Datum::Number(Some(123.0)));
        assert_eq!(parse(&[0x12, 0x3d]).unwrap(), Datum::Number(Some(-123.0)));
        assert_eq!(parse(&[0x12, 0x3b]).unwrap(), Datum::Number(Some(-123.0)));
        assert_eq!(parse(&[0x0d]).unwrap(), Datum::Number(Some(-0.0)));
        assert_eq!(
            parse(&[0x1a, 0x3f]).unwrap_err().kind(),
            &ParseErrorKind::NonBCDDigit(0xa)
        );

        let parser = Type::P.parser().with_implied_decimals(2);
        assert_eq!(
            parser.parse([0x12, 0x34, 0x5d]).unwrap(),
            Datum::Number(Some(-123.45))
        );
    }

    #[test]
    fn p_too_many_digits() {
        let parser = Format::new(Type::P, 16, 0).unwrap().parser();
        assert_eq!(
            parser.parse([0x99; 24]).unwrap_err().kind(),
            &ParseErrorKind::Overflow
        );

        let mut diagnostics = Diagnostics::new();
        let mut datum = Datum::Number(Some(1.0));
        assert!(!parser.decode([0x99; 24], &mut datum, &mut diagnostics));
        assert_eq!(datum, Datum::sysmis());
        assert_eq!(diagnostics.messages.len(), 1);

        // 38 digits fit in a u128, but the sign byte adds a 39th.
        let mut input = [0x99; 20];
        input[19] = 0x9c;
        assert_eq!(
            parser.parse(input).unwrap_err().kind(),
            &ParseErrorKind::Overflow
        );

        assert_eq!(
            Type::PK.parser().parse([0x99; 24]).unwrap(),
            Datum::sysmis()
        );
    }

    #[test]
    fn pk() {
        let parse = |input: &[u8]| Type::PK.parser().parse(input).unwrap();
        assert_eq!(parse(&[0x12, 0x34]), Datum::Number(Some(1234.0)));
        assert_eq!(parse(&[0x1a]), Datum::Number(None));
        assert_eq!(
            Type::PK
                .parser()
                .with_implied_decimals(1)
                .parse([0x01, 0x25])
                .unwrap(),
            Datum::Number(Some(12.5))
        );
    }

    #[test]
    fn ib_and_pib() {
        let big = Settings::default().with_endian(EndianSettings::new(Endian::Big));
        let little = Settings::default().with_endian(EndianSettings::new(Endian::Little));
        let parse = |type_: Type, settings: &Settings, input: &[u8]| {
            type_
                .parser()
                .with_settings(settings)
                .parse(input)
                .unwrap()
                .as_number()
                .unwrap()
                .unwrap()
        };
        assert_eq!(parse(Type::IB, &big, &[0xff, 0xfe]), -2.0);
        assert_eq!(parse(Type::IB, &little, &[0xfe, 0xff]), -2.0);
        assert_eq!(parse(Type::IB, &big, &[0x80]), -128.0);
        assert_eq!(parse(Type::IB, &big, &[0x7f]), 127.0);
        assert_eq!(parse(Type::IB, &big, &[0xff; 8]), -1.0);
        assert_eq!(parse(Type::PIB, &big, &[0xff, 0xfe]), 65534.0);
        assert_eq!(parse(Type::PIB, &little, &[0xfe, 0xff]), 65534.0);
        assert_eq!(parse(Type::PIB, &big, &[0x01, 0x00, 0x00]), 65536.0);

        let parser = Type::IB.parser().with_settings(&big).with_implied_decimals(2);
        assert_eq!(parser.parse([0x04, 0xd2]).unwrap(), Datum::Number(Some(12.34)));
    }

    #[test]
    fn a() {
        let parser = Format::new(Type::A, 5, 0).unwrap().parser();
        assert_eq!(parser.parse("ab").unwrap(), Datum::from("ab   "));
        assert_eq!(parser.parse("abcdefg").unwrap(), Datum::from("abcde"));
        assert_eq!(parser.parse("").unwrap(), Datum::from("     "));
        assert_eq!(parser.parse("  x").unwrap(), Datum::from("  x  "));

        assert_eq!(
            Type::A.parser().parse("natural").unwrap(),
            Datum::from("natural")
        );
        assert_eq!(
            Type::A
                .parser()
                .with_width(VarWidth::String(3))
                .parse([0xe9, b'x'])
                .unwrap(),
            Datum::String(vec![0xe9, b'x', b' '].into())
        );
    }

    #[test]
    fn ahex() {
        let parser = Type::AHex.parser();

        assert_eq!(
            parser
                .parse("6162636465666768")
                .unwrap()
                .as_string()
                .unwrap()
                .as_latin1(),
            "abcdefgh"
        );
        assert_eq!(
            parser.parse("61626364656667xyzzy").unwrap_err().kind(),
            &ParseErrorKind::NonHexDigit('x')
        );
        assert_eq!(
            parser.parse("616263646566676").unwrap_err().kind(),
            &ParseErrorKind::OddLength(15)
        );

        let parser = Format::new(Type::AHex, 8, 0).unwrap().parser();
        assert_eq!(parser.parse("4142").unwrap(), Datum::from("AB  "));
        assert_eq!(parser.parse("414243444546").unwrap(), Datum::from("ABCD"));
    }

    #[test]
    fn error_message() {
        let error = Type::F.parser().parse("1x").unwrap_err();
        assert_eq!(error.type_(), Type::F);
        assert_eq!(
            error.to_string(),
            "\"1x\" cannot be parsed as F: Field contents are not numeric."
        );
    }
}
