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
    cmp::min,
    fmt::{Display, Formatter, Result as FmtResult, Write as _},
};

use log::trace;
use smallstr::SmallString;
use smallvec::SmallVec;
use thiserror::Error as ThisError;

use crate::{
    calendar::{
        calendar_offset_to_gregorian, month_name, short_month_name, weekday_name, Gregorian,
    },
    data::{Datum, RawString},
    endian::{Endian, ToBytes, VarBytes},
    format::{Category, DateTemplate, Decimal, Format, NumberStyle, TemplateItem, Type},
    message::{Advisory, Diagnostic, Diagnostics, Severity},
    settings::Settings,
};

#[cfg(test)]
mod tests;

/// Bytes of an output field.
type Field = SmallVec<[u8; 40]>;

/// A value that a format cannot represent.  The field is filled with
/// `ERROR` (or asterisks, if it is too narrow) and an error is reported.
#[derive(displaydoc::Display, ThisError, Clone, Debug, PartialEq)]
pub enum EncodeError {
    /// Format {0} cannot represent the system-missing value.
    Missing(Format),

    /// Format {format} cannot represent negative number {number}.
    Negative { format: Format, number: f64 },

    /// Number {number} is too large for format {format}.
    TooLarge { format: Format, number: f64 },

    /// Weekday number {0} is not between 1 and 7.
    InvalidWeekday(f64),

    /// Month number {0} is not between 1 and 12.
    InvalidMonth(f64),

    /// Numeric format {0} cannot display a string value.
    StringInNumericFormat(Format),

    /// String format {0} cannot display a numeric value.
    NumberInStringFormat(Format),
}

/// Encodes a [Datum] in a [Format].
///
/// [encode](Self::encode) produces exactly as many bytes as the format's
/// width.  The [Display] implementation writes the same bytes interpreted as
/// Latin-1, which is mainly useful for text formats.
pub struct DisplayDatum<'a, 'b> {
    format: Format,
    settings: &'b Settings,
    datum: &'a Datum,
}

impl Datum {
    /// Returns an object for encoding this [Datum] as `format` with the
    /// default settings.
    pub fn display(&self, format: Format) -> DisplayDatum<'_, 'static> {
        DisplayDatum::new(format, self)
    }
}

impl Display for DisplayDatum<'_, '_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.encode(&mut Diagnostics::new()).as_latin1())
    }
}

impl<'a> DisplayDatum<'a, 'static> {
    pub fn new(format: Format, datum: &'a Datum) -> Self {
        Self {
            format,
            settings: Settings::global(),
            datum,
        }
    }
}

impl<'a, 'b> DisplayDatum<'a, 'b> {
    pub fn with_settings<'c>(self, settings: &'c Settings) -> DisplayDatum<'a, 'c> {
        DisplayDatum {
            format: self.format,
            settings,
            datum: self.datum,
        }
    }

    /// Encodes the datum.  The result is always exactly as wide as the
    /// format.
    ///
    /// A value too wide for the field yields asterisks.  A value that the
    /// format cannot represent at all yields `ERROR` and adds an error to
    /// `diagnostics`.
    pub fn encode(&self, diagnostics: &mut Diagnostics) -> RawString {
        match self.render(diagnostics) {
            Ok(field) => RawString(field.into_vec()),
            Err(error) => {
                diagnostics.push(Diagnostic::data(Severity::Error, error.to_string()));
                RawString(error_field(self.format.w()).into_vec())
            }
        }
    }

    fn w(&self) -> usize {
        self.format.w()
    }

    fn render(&self, diagnostics: &mut Diagnostics) -> Result<Field, EncodeError> {
        let type_ = self.format.type_();
        let number = match self.datum {
            Datum::String(string) => {
                return match type_ {
                    Type::A => Ok(self.a(string)),
                    Type::AHex => Ok(self.ahex(string)),
                    _ => Err(EncodeError::StringInNumericFormat(self.format)),
                };
            }
            Datum::Number(number) => *number,
        };
        match type_ {
            Type::A | Type::AHex => Err(EncodeError::NumberInStringFormat(self.format)),
            Type::P => Ok(self.p(number)),
            Type::PK => Ok(self.pk(number)),
            Type::IB => Ok(self.ib(number)),
            Type::PIB => Ok(self.pib(number)),
            Type::RB => Ok(self.rb(number)),
            Type::RBHex => Ok(self.rbhex(number)),
            _ => {
                if type_ == Type::Z {
                    diagnostics.advise_once(Advisory::ZonedOutput, || {
                        Diagnostic::data(
                            Severity::Warning,
                            "Quality of zoned decimal (Z) output format code is suspect.  \
                             Check your results.",
                        )
                    });
                }
                let Some(number) = number else {
                    return self.missing();
                };
                if !number.is_finite() {
                    return Ok(self.infinite(number));
                }
                match type_ {
                    Type::F
                    | Type::Comma
                    | Type::Dot
                    | Type::Dollar
                    | Type::Pct
                    | Type::CC(_) => Ok(self.number(number)),
                    Type::E => Ok(self.e(number)),
                    Type::N => self.n(number),
                    Type::Z => self.z(number),
                    Type::PIBHex => Ok(self.pibhex(number)),
                    Type::WkDay => self.wkday(number),
                    Type::Month => self.month(number),
                    _ => Ok(self.date(number)),
                }
            }
        }
    }

    /// Formats `number` in fixed-point notation, falling back to scientific
    /// notation when it doesn't fit.  A custom currency only ever renders in
    /// fixed point with its affixes; otherwise the number is written as
    /// `COMMA`.
    fn number(&self, number: f64) -> Field {
        let type_ = self.format.type_();
        let style = self.settings.formats.number_style(type_);
        let field = if let Type::CC(cc) = type_ {
            self.rounder(number, style)
                .and_then(|rounder| self.decimal(&rounder, style, true))
                .or_else(|| {
                    trace!(
                        "{number} does not fit {} with custom currency {cc:?}, trying COMMA",
                        self.format
                    );
                    let comma = self.settings.formats.number_style(Type::Comma);
                    self.number_with_style(number, comma)
                })
        } else {
            self.number_with_style(number, style)
        };
        field.unwrap_or_else(|| overflow_field(self.w()))
    }

    /// Returns a [Rounder] for `number`, unless it is too big to write in
    /// fixed point.
    fn rounder(&self, number: f64, style: &NumberStyle) -> Option<Rounder> {
        if number.abs() < 1.5 * power10(self.w()) {
            Rounder::new(style, number, self.format.d())
        } else {
            None
        }
    }

    fn number_with_style(&self, number: f64, style: &NumberStyle) -> Option<Field> {
        let field = self.rounder(number, style).and_then(|rounder| {
            self.decimal(&rounder, style, true)
                .or_else(|| self.scientific(number, style, true))
                .or_else(|| self.decimal(&rounder, style, false))
        });
        field.or_else(|| self.scientific(number, style, false))
    }

    /// Formats `number` for the `E` format.  A negative number gives up one
    /// decimal place for its sign.
    fn e(&self, number: f64) -> Field {
        let w = self.w();
        if w < 6 {
            return overflow_field(w);
        }
        let negative = number < 0.0;
        let mut decimals = min(self.format.d(), w - 6);
        if negative {
            decimals = decimals.saturating_sub(1);
        }

        let mut s = SmallString::<[u8; 40]>::new();
        if write!(&mut s, "{:.*E}", decimals, number.abs()).is_err() {
            return overflow_field(w);
        }
        let Some((mantissa, exponent)) = s.split_once('E') else {
            return overflow_field(w);
        };
        let Ok(exponent) = exponent.parse::<i32>() else {
            return overflow_field(w);
        };

        let decimal = decimal_byte(self.settings.formats.number_style(Type::E).decimal);
        let mut output = Field::new();
        if negative {
            output.push(b'-');
        }
        output.extend(mantissa.bytes().map(|c| if c == b'.' { decimal } else { c }));
        let mut exponent_text = SmallString::<[u8; 8]>::new();
        let result = match exponent.unsigned_abs() {
            0..=99 => write!(&mut exponent_text, "E{exponent:+03}"),
            100..=999 => write!(&mut exponent_text, "{exponent:+04}"),
            _ => return overflow_field(w),
        };
        if result.is_err() {
            return overflow_field(w);
        }
        output.extend_from_slice(exponent_text.as_bytes());
        right_align(&output, w)
    }

    fn infinite(&self, number: f64) -> Field {
        if self.w() >= 3 {
            let s = if number.is_nan() {
                "NaN"
            } else if number.is_sign_positive() {
                "+Infinity"
            } else {
                "-Infinity"
            };
            right_align(s.as_bytes(), self.w())
        } else {
            overflow_field(self.w())
        }
    }

    /// Renders the system-missing value as spaces with a `.` where the
    /// decimal point would go.
    fn missing(&self) -> Result<Field, EncodeError> {
        let w = self.w() as isize;
        let d = self.format.d() as isize;
        let dot_position = match self.format.type_() {
            Type::N | Type::Z => return Err(EncodeError::Missing(self.format)),
            Type::Pct => w - d - 2,
            Type::E => w - d - 5,
            _ => w - d - 1,
        };
        let mut field = Field::from_elem(b' ', self.w());
        if let Some(dot) = field.get_mut(dot_position.max(0) as usize) {
            *dot = b'.';
        }
        Ok(field)
    }

    /// Formats `number` in fixed-point notation.  Tries each number of
    /// decimal places from the format's down to zero, returning the first
    /// that fits.
    fn decimal(
        &self,
        rounder: &Rounder,
        style: &NumberStyle,
        require_affixes: bool,
    ) -> Option<Field> {
        let w = self.w();
        let d = self.format.d();
        for decimals in (0..=d).rev() {
            // Make sure there's room for the number's magnitude, plus the
            // negative suffix, plus (if negative) the negative prefix.
            let RounderWidth {
                mut width,
                integer_digits,
                negative,
            } = rounder.width(decimals);
            width += style.neg_suffix.width();
            if negative {
                width += style.neg_prefix.width();
            }
            if width > w {
                continue;
            }

            // If there's room for the prefix and suffix, allocate space.  If
            // the affixes are required, but there's no space, give up.
            let add_affixes = allocate_space(style.affix_width(), w, &mut width);
            if !add_affixes && require_affixes {
                continue;
            }

            // Grouping needs room for a complete set of separators.  None are
            // used if decimal places were requested but all were dropped.
            let grouping = style.grouping.filter(|_| {
                integer_digits > 3
                    && (d == 0 || decimals > 0)
                    && allocate_space((integer_digits - 1) / 3, w, &mut width)
            });

            let magnitude = rounder.format(decimals);
            let mut output = Field::from_elem(b' ', w - width);
            if negative {
                output.extend_from_slice(style.neg_prefix.bytes());
            }
            if add_affixes {
                output.extend_from_slice(style.prefix.bytes());
            }
            let integer = &magnitude[..integer_digits];
            match grouping {
                Some(grouping) => {
                    for (i, digit) in integer.iter().enumerate() {
                        if i > 0 && (integer_digits - i) % 3 == 0 {
                            output.push(decimal_byte(grouping));
                        }
                        output.push(*digit);
                    }
                }
                None => output.extend_from_slice(integer),
            }
            if decimals > 0 {
                output.push(decimal_byte(style.decimal));
                output.extend_from_slice(&magnitude[integer_digits + 1..][..decimals]);
            }
            if add_affixes {
                output.extend_from_slice(style.suffix.bytes());
            }
            if negative {
                output.extend_from_slice(style.neg_suffix.bytes());
            } else {
                output.extend(std::iter::repeat_n(b' ', style.neg_suffix.width()));
            }
            return Some(output);
        }
        None
    }

    /// Formats `number` in scientific notation, with a two-digit exponent
    /// such as `1.5E+10`, or `1.5+100` for a three-digit exponent.
    fn scientific(&self, number: f64, style: &NumberStyle, require_affixes: bool) -> Option<Field> {
        let w = self.w();
        let negative = number < 0.0;

        // Allocate minimum required space: one digit plus a four-character
        // exponent.
        let mut width = 5 + style.neg_suffix.width();
        if negative {
            width += style.neg_prefix.width();
        }
        if width > w {
            return None;
        }

        let add_affixes = allocate_space(style.affix_width(), w, &mut width);
        if require_affixes && !add_affixes {
            return None;
        }

        // Characters available for the fraction, including the decimal
        // point.  A decimal point with no digits after it isn't worth the
        // space.
        let mut fraction_width = min(self.format.d() + 1, w - width).min(16);
        if fraction_width == 1 {
            fraction_width = 0;
        }
        width += fraction_width;

        let mut mantissa = SmallString::<[u8; 40]>::new();
        write!(
            &mut mantissa,
            "{:.*E}",
            fraction_width.saturating_sub(1),
            number.abs()
        )
        .ok()?;
        let (digits, exponent) = mantissa.split_once('E')?;
        let exponent = exponent.parse::<i32>().ok()?;

        let mut body = SmallString::<[u8; 40]>::from_str(digits);
        match exponent.unsigned_abs() {
            0..=99 => write!(&mut body, "E{exponent:+03}").ok()?,
            100..=999 => write!(&mut body, "{exponent:+04}").ok()?,
            _ => return None,
        }

        let mut output = Field::from_elem(b' ', w - width);
        if negative {
            output.extend_from_slice(style.neg_prefix.bytes());
        }
        if add_affixes {
            output.extend_from_slice(style.prefix.bytes());
        }
        output.extend(body.bytes().map(|c| match c {
            b'.' => decimal_byte(style.decimal),
            c => c,
        }));
        if add_affixes {
            output.extend_from_slice(style.suffix.bytes());
        }
        if negative {
            output.extend_from_slice(style.neg_suffix.bytes());
        } else {
            output.extend(std::iter::repeat_n(b' ', style.neg_suffix.width()));
        }
        Some(output)
    }

    fn n(&self, number: f64) -> Result<Field, EncodeError> {
        if number < 0.0 {
            return Err(EncodeError::Negative {
                format: self.format,
                number,
            });
        }
        Ok(match integer_digits(number, self.format.d(), self.w()) {
            Some(digits) => zero_pad(&digits, self.w()),
            None => overflow_field(self.w()),
        })
    }

    fn z(&self, number: f64) -> Result<Field, EncodeError> {
        let digits = integer_digits(number, self.format.d(), self.w()).ok_or(
            EncodeError::TooLarge {
                format: self.format,
                number,
            },
        )?;
        let mut field: Field = zero_pad(&digits, self.w())
            .into_iter()
            .map(|digit| 0xf0 | (digit - b'0'))
            .collect();
        if number < 0.0 && !digits.is_empty() {
            if let Some(last) = field.last_mut() {
                *last &= !0x20;
            }
        }
        Ok(field)
    }

    /// Returns the digits of `number` scaled by the implied decimal places,
    /// or `None` if it is missing or needs more than `n_digits` digits.
    fn bcd_digits(&self, number: Option<f64>, n_digits: usize) -> Option<Field> {
        number.and_then(|number| integer_digits(number, self.format.d(), n_digits))
    }

    fn p(&self, number: Option<f64>) -> Field {
        let n_digits = self.w() * 2 - 1;
        let digits = self.bcd_digits(number, n_digits).unwrap_or_default();
        let negative = !digits.is_empty() && number.is_some_and(|number| number < 0.0);
        let mut field = pack_bcd(&zero_pad(&digits, n_digits));
        if let Some(last) = field.last_mut() {
            *last |= if negative { 0xd } else { 0xf };
        }
        field
    }

    fn pk(&self, number: Option<f64>) -> Field {
        let n_digits = self.w() * 2;
        let digits = self.bcd_digits(number, n_digits).unwrap_or_default();
        pack_bcd(&zero_pad(&digits, n_digits))
    }

    /// Scales `number` by the implied decimal places and rounds it to an
    /// integer, returning zero for the system-missing value.
    fn scaled_integer(&self, number: Option<f64>) -> f64 {
        number.map_or(0.0, |number| (number * power10(self.format.d())).round())
    }

    fn ib(&self, number: Option<f64>) -> Field {
        let number = self.scaled_integer(number);
        let limit = power256(self.w()) / 2.0;
        let integer = if number >= limit || number < -limit || number.is_nan() {
            0
        } else {
            number as i64 as u64
        };
        self.settings
            .endian
            .output
            .put_uint(integer, self.w())
            .into_iter()
            .collect()
    }

    fn pib(&self, number: Option<f64>) -> Field {
        let number = self.scaled_integer(number);
        let integer = if number >= power256(self.w()) || number < 0.0 || number.is_nan() {
            0
        } else {
            number as u64
        };
        self.settings
            .endian
            .output
            .put_uint(integer, self.w())
            .into_iter()
            .collect()
    }

    fn rb(&self, number: Option<f64>) -> Field {
        let bytes: [u8; 8] = self.settings.endian.output.to_bytes(number.unwrap_or(-f64::MAX));
        let mut field = Field::from_slice(&bytes);
        field.resize(self.w(), 0);
        field
    }

    fn rbhex(&self, number: Option<f64>) -> Field {
        let bytes: [u8; 8] = Endian::Big.to_bytes(number.unwrap_or(-f64::MAX));
        let mut field = hex(&bytes[..min(8, self.w() / 2)]);
        field.resize(self.w(), b'0');
        field
    }

    fn pibhex(&self, number: f64) -> Field {
        let n_bytes = self.w() / 2;
        let number = number.round();
        if number < 0.0 || number >= power256(n_bytes) {
            overflow_field(self.w())
        } else {
            let bytes = Endian::Big.put_uint(number as u64, n_bytes);
            hex(&bytes)
        }
    }

    /// Formats a date or time.  When the field shows seconds, the value is
    /// rounded to the displayed precision before it is split into
    /// components, so that `59.999` carries into the minutes instead of
    /// printing `60`.
    fn date(&self, number: f64) -> Field {
        let w = self.w();
        if self.format.type_().category() == Category::Date && number < 0.0 {
            return self.missing().unwrap_or_else(|_| overflow_field(w));
        }
        let Some((mut output, seconds_decimals)) = self.date_text(number) else {
            return overflow_field(w);
        };
        if let Some(decimals) = seconds_decimals {
            let scale = power10(decimals);
            let rounded = (number * scale).round() / scale;
            if rounded != number {
                match self.date_text(rounded) {
                    Some((text, _)) => output = text,
                    None => return overflow_field(w),
                }
            }
        }
        if output.len() > w {
            return overflow_field(w);
        }
        right_align(output.as_bytes(), w)
    }

    /// Renders `number` through the format's date template.  Also returns
    /// the number of decimals written for the seconds, if seconds were
    /// written at all.
    fn date_text(&self, number: f64) -> Option<(SmallString<[u8; 40]>, Option<usize>)> {
        const MINUTE: f64 = 60.0;
        const HOUR: f64 = 60.0 * 60.0;
        const DAY: f64 = 60.0 * 60.0 * 24.0;

        let w = self.w();
        let type_ = self.format.type_();
        let (date, mut time) = if type_.category() == Category::Date {
            let offset = (number / DAY).floor() as i32;
            (calendar_offset_to_gregorian(offset), number % DAY)
        } else {
            (
                Gregorian {
                    year: 0,
                    month: 1,
                    day: 1,
                    yday: 1,
                },
                number,
            )
        };
        let template = DateTemplate::for_format(self.format)?;

        let mut output = SmallString::<[u8; 40]>::new();
        let mut seconds_decimals = None;
        for TemplateItem { c, n } in template {
            let result = match c {
                'd' if n < 3 => write!(&mut output, "{:02}", date.day),
                'd' => write!(&mut output, "{:03}", date.yday),
                'm' if n < 3 => write!(&mut output, "{:02}", date.month),
                'm' => write!(
                    &mut output,
                    "{}",
                    short_month_name(date.month as u32).unwrap_or("???")
                ),
                'y' if n >= 4 => {
                    if date.year <= 9999 {
                        write!(&mut output, "{:04}", date.year)
                    } else if type_ == Type::DateTime || type_ == Type::YmdHms {
                        write!(&mut output, "****")
                    } else {
                        return None;
                    }
                }
                'y' => {
                    let epoch = self.settings.formats.epoch.0;
                    if !(0..=99).contains(&(date.year - epoch)) {
                        return None;
                    }
                    write!(&mut output, "{:02}", date.year % 100)
                }
                'q' => write!(&mut output, "{}", (date.month - 1) / 3 + 1),
                'w' => write!(&mut output, "{:2}", (date.yday - 1) / 7 + 1),
                'D' => {
                    if time < 0.0 {
                        output.push('-');
                    }
                    time = time.abs();
                    let days = (time / DAY).floor();
                    time %= DAY;
                    write!(&mut output, "{days:n$.0}")
                }
                'H' => {
                    if time < 0.0 {
                        output.push('-');
                    }
                    time = time.abs();
                    let hours = (time / HOUR).floor();
                    time %= HOUR;
                    write!(&mut output, "{hours:0n$.0}")
                }
                'M' => {
                    if time < 0.0 {
                        output.push('-');
                    }
                    time = time.abs();
                    let minutes = (time / MINUTE).floor();
                    time %= MINUTE;
                    write!(&mut output, "{minutes:02.0}").ok()?;

                    let excess_width = w as isize - output.len() as isize;
                    if excess_width < 0 || (type_ == Type::MTime && excess_width < 3) {
                        return None;
                    }
                    let d = self.format.d();
                    if excess_width == 3 || excess_width == 4 || (excess_width >= 5 && d == 0) {
                        write!(&mut output, ":{:02.0}", time.floor()).ok()?;
                        seconds_decimals = Some(0);
                    } else if excess_width >= 5 {
                        let d = min(d, excess_width as usize - 4);
                        let width = d + 3;
                        let mut seconds = SmallString::<[u8; 40]>::new();
                        write!(&mut seconds, ":{time:0width$.d$}").ok()?;
                        seconds_decimals = Some(d);
                        let decimal = self.settings.formats.decimal;
                        output.extend(seconds.chars().map(|c| match (c, decimal) {
                            ('.', Decimal::Comma) => ',',
                            (c, _) => c,
                        }));
                    }
                    break;
                }
                c => {
                    output.extend(std::iter::repeat_n(c, n));
                    Ok(())
                }
            };
            result.ok()?;
        }
        Some((output, seconds_decimals))
    }

    fn wkday(&self, number: f64) -> Result<Field, EncodeError> {
        if (1.0..8.0).contains(&number) {
            if let Some(name) = weekday_name(number as u32) {
                return Ok(left_align(name.as_bytes(), self.w()));
            }
        }
        Err(EncodeError::InvalidWeekday(number))
    }

    fn month(&self, number: f64) -> Result<Field, EncodeError> {
        if (1.0..13.0).contains(&number) {
            if let Some(name) = month_name(number as u32) {
                return Ok(left_align(name.as_bytes(), self.w()));
            }
        }
        Err(EncodeError::InvalidMonth(number))
    }

    fn a(&self, string: &RawString) -> Field {
        left_align(string.as_bytes(), self.w())
    }

    fn ahex(&self, string: &RawString) -> Field {
        let mut string = string.clone();
        string.resize(self.w() / 2);
        hex(string.as_bytes())
    }
}

/// Returns the decimal digits of `number.abs() * 10**d` rounded to an
/// integer, without leading zeros, or `None` if that takes more than
/// `max_digits` digits.  Zero yields no digits at all.
fn integer_digits(number: f64, d: usize, max_digits: usize) -> Option<Field> {
    if !number.is_finite() {
        return None;
    }
    let mut s = SmallString::<[u8; 40]>::new();
    write!(&mut s, "{:E}", number.abs()).ok()?;
    let (mantissa, exponent) = s.split_once('E')?;

    // The digits represent `0.DIGITS * 10**exponent`.
    let exponent = exponent.parse::<i64>().ok()? + 1 + d as i64;
    if exponent < 0 {
        return Some(Field::new());
    }
    let exponent = exponent as usize;
    if exponent > max_digits {
        return None;
    }
    let mut digits: Field = mantissa.bytes().filter(u8::is_ascii_digit).collect();
    if exponent < digits.len() {
        let round_up = digits[exponent] >= b'5';
        digits.truncate(exponent);
        if round_up && !increment(&mut digits) {
            digits.insert(0, b'1');
        }
    } else {
        digits.resize(exponent, b'0');
    }
    let leading_zeros = digits.iter().take_while(|c| **c == b'0').count();
    digits.drain(..leading_zeros);
    (digits.len() <= max_digits).then_some(digits)
}

/// Adds one to the decimal number in `digits`.  Returns false if it carried
/// out of the most significant digit, leaving `digits` all zeros.
fn increment(digits: &mut [u8]) -> bool {
    for digit in digits.iter_mut().rev() {
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            return true;
        }
    }
    false
}

/// Packs ASCII decimal digits two per byte.  An odd final digit goes in the
/// high nibble of the last byte.
fn pack_bcd(digits: &[u8]) -> Field {
    digits
        .chunks(2)
        .map(|pair| {
            let hi = pair[0] - b'0';
            let lo = pair.get(1).map_or(0, |digit| digit - b'0');
            (hi << 4) | lo
        })
        .collect()
}

fn zero_pad(digits: &[u8], width: usize) -> Field {
    let mut field = Field::from_elem(b'0', width.saturating_sub(digits.len()));
    field.extend_from_slice(digits);
    field
}

fn right_align(s: &[u8], width: usize) -> Field {
    let s = &s[..min(s.len(), width)];
    let mut field = Field::from_elem(b' ', width - s.len());
    field.extend_from_slice(s);
    field
}

fn left_align(s: &[u8], width: usize) -> Field {
    let mut field = Field::from_slice(&s[..min(s.len(), width)]);
    field.resize(width, b' ');
    field
}

fn overflow_field(width: usize) -> Field {
    Field::from_elem(b'*', width)
}

fn error_field(width: usize) -> Field {
    if width >= 5 {
        right_align(b"ERROR", width)
    } else {
        overflow_field(width)
    }
}

fn hex(bytes: &[u8]) -> Field {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    bytes
        .iter()
        .flat_map(|byte| [DIGITS[usize::from(byte >> 4)], DIGITS[usize::from(byte & 15)]])
        .collect()
}

fn decimal_byte(decimal: Decimal) -> u8 {
    match decimal {
        Decimal::Dot => b'.',
        Decimal::Comma => b',',
    }
}

fn allocate_space(want: usize, capacity: usize, used: &mut usize) -> bool {
    if *used + want <= capacity {
        *used += want;
        true
    } else {
        false
    }
}

/// A representation of a number that can be quickly rounded to any desired
/// number of decimal places (up to a specified maximum).
///
/// Rounding is to nearest, with ties going to the even digit.  A tie is only
/// treated as one if the binary value is exactly halfway.
#[derive(Debug)]
struct Rounder {
    /// Magnitude of number with excess precision.
    string: SmallString<[u8; 40]>,

    /// Number of digits before decimal point.
    integer_digits: usize,

    /// Number of `9`s or `.`s at start of string.
    leading_nines: usize,

    /// Number of `0`s or `.`s at start of string.
    leading_zeros: usize,

    /// Is the number negative?
    negative: bool,
}

impl Rounder {
    fn new(style: &NumberStyle, number: f64, max_decimals: usize) -> Option<Self> {
        // Two digits beyond those requested are usually enough to decide
        // which way to round.  If those digits end in a `5` followed by
        // zeros, though, the value might be an exact tie or just close to
        // one, so we format all of the digits in the binary value.
        let mut string = SmallString::new();
        let precision = max_decimals + 2;
        write!(&mut string, "{:.*}", precision, number.abs()).ok()?;
        let trimmed = string.trim_end_matches('0');
        if trimmed.len() < string.len() && trimmed.ends_with('5') {
            let exact = exact_decimals(number);
            if exact > precision {
                string.clear();
                write!(&mut string, "{:.*}", exact, number.abs()).ok()?;
            }
        }

        if !style.leading_zero && string.starts_with('0') {
            string.remove(0);
        }
        let leading_zeros = string
            .bytes()
            .take_while(|c| *c == b'0' || *c == b'.')
            .count();
        let leading_nines = string
            .bytes()
            .take_while(|c| *c == b'9' || *c == b'.')
            .count();
        let integer_digits = string.bytes().take_while(u8::is_ascii_digit).count();
        let negative = number.is_sign_negative();
        Some(Self {
            string,
            integer_digits,
            leading_nines,
            leading_zeros,
            negative,
        })
    }

    /// Returns a [RounderWidth] for formatting the magnitude to `decimals`
    /// decimal places.
    fn width(&self, decimals: usize) -> RounderWidth {
        let mut width = self.integer_digits;
        if decimals > 0 {
            width += decimals + 1;
        }
        let mut integer_digits = self.integer_digits;
        let mut negative = self.negative;

        if self.should_round_up(decimals) {
            // Rounding up leading `9s` adds a new digit (a `1`).
            if self.leading_nines >= width {
                width += 1;
                integer_digits += 1;
            }
        } else if self.leading_zeros >= width {
            // All digits that remain after rounding are zeros, so drop the
            // negative sign.
            negative = false;
            if self.integer_digits == 0 && decimals == 0 {
                // No digits at all are left.  Display a single zero.
                width += 1;
                integer_digits = 1;
            }
        }
        RounderWidth {
            width,
            integer_digits,
            negative,
        }
    }

    /// Returns true if the number should be rounded up when chopped off at
    /// `decimals` decimal places, false if it should be rounded down.
    fn should_round_up(&self, decimals: usize) -> bool {
        let bytes = self.string.as_bytes();
        let position = self.integer_digits + decimals + 1;
        match bytes.get(position) {
            Some(b'6'..=b'9') => true,
            Some(b'5') => {
                if bytes[position + 1..].iter().any(|c| *c != b'0') {
                    true
                } else {
                    // Exactly halfway: round to even.
                    let previous = if decimals > 0 {
                        bytes.get(position - 1)
                    } else {
                        self.integer_digits
                            .checked_sub(1)
                            .and_then(|index| bytes.get(index))
                    };
                    previous.is_some_and(|digit| (digit - b'0') % 2 == 1)
                }
            }
            _ => false,
        }
    }

    /// Formats the number, rounding to `decimals` decimal places.  Exactly as
    /// many characters as indicated by [Self::width] are written.
    fn format(&self, decimals: usize) -> Field {
        let bytes = self.string.as_bytes();
        let mut base_width = self.integer_digits;
        if decimals > 0 {
            base_width += decimals + 1;
        }

        if self.should_round_up(decimals) {
            if self.leading_nines < base_width {
                // Common case: rounding up doesn't add an extra digit.
                let mut output = Field::from_slice(&bytes[..base_width]);
                for c in output.iter_mut().rev() {
                    match *c {
                        b'9' => *c = b'0',
                        b'0'..=b'8' => {
                            *c += 1;
                            break;
                        }
                        _ => (),
                    }
                }
                output
            } else {
                // Rounding up leading 9s yields a 1 followed by 0s.
                let mut output = Field::new();
                output.push(b'1');
                output.extend(std::iter::repeat_n(b'0', self.integer_digits));
                if decimals > 0 {
                    output.push(b'.');
                    output.extend(std::iter::repeat_n(b'0', decimals));
                }
                output
            }
        } else if self.integer_digits != 0 || decimals != 0 {
            Field::from_slice(&bytes[..base_width])
        } else {
            // No digits remain.  The output is just a zero.
            Field::from_slice(b"0")
        }
    }
}

struct RounderWidth {
    /// Number of characters required to format the number to a specified number
    /// of decimal places.  This includes integer digits and a decimal point and
    /// fractional digits, if any, but it does not include any negative prefix
    /// or suffix or other affixes.
    width: usize,

    /// Number of digits before the decimal point.
    integer_digits: usize,

    /// True if the number is negative and its rounded representation would
    /// include at least one nonzero digit.
    negative: bool,
}

/// Returns the number of decimal places needed to write `number` exactly.
fn exact_decimals(number: f64) -> usize {
    let bits = number.to_bits();
    let biased_exponent = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1 << 52) - 1);
    let (mantissa, exponent) = if biased_exponent == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1 << 52), biased_exponent - 1075)
    };
    if mantissa == 0 {
        return 0;
    }
    let exponent = exponent + mantissa.trailing_zeros() as i32;
    (-exponent).max(0) as usize
}

/// Returns `10^x`.
fn power10(x: usize) -> f64 {
    const POWERS: [f64; 41] = [
        1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9, 1e10, 1e11, 1e12, 1e13, 1e14, 1e15, 1e16,
        1e17, 1e18, 1e19, 1e20, 1e21, 1e22, 1e23, 1e24, 1e25, 1e26, 1e27, 1e28, 1e29, 1e30, 1e31,
        1e32, 1e33, 1e34, 1e35, 1e36, 1e37, 1e38, 1e39, 1e40,
    ];
    POWERS
        .get(x)
        .copied()
        .unwrap_or_else(|| 10.0_f64.powi(x as i32))
}

/// Returns `256^x`.
fn power256(x: usize) -> f64 {
    2.0_f64.powi(8 * x as i32)
}
