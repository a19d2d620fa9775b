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

//! Format specifiers and the settings that affect how they are rendered.
//!
//! A [Format] is a type, a width, and a number of decimal places.  The
//! [Type] determines the legal widths and decimals, which also depend on
//! whether the format is used for input or output (see [Use]).

use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult, Write},
    ops::{Not, RangeInclusive},
    str::{Chars, FromStr},
    sync::LazyLock,
};

use chrono::{Datelike, Local};
use enum_iterator::{all, Sequence};
use enum_map::{Enum, EnumMap};
use flagset::flags;
use log::debug;
use serde::{Deserialize, Serialize};
use smallstr::SmallString;
use smallvec::SmallVec;
use thiserror::Error as ThisError;

use crate::data::{VarType, VarWidth};

mod display;
mod parse;
pub use display::{DisplayDatum, EncodeError};
pub use parse::{ParseError, ParseErrorKind, ParseValue};

#[derive(Clone, ThisError, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown format type {value}.")]
    UnknownFormat { value: u16 },

    #[error("Unknown format type {0:?}.")]
    UnknownType(String),

    #[error("{0:?} is not a valid format specifier.")]
    BadSyntax(String),

    #[error("Format {0} may not be used for input.")]
    NotUsableForInput(Type),

    #[error("{use_} format {format} specifies width {}, but {} requires an even width.", .format.w, .format.type_)]
    OddWidthNotAllowed { use_: Use, format: UncheckedFormat },

    #[error("{use_} format {format} specifies width {}, but {} requires a width between {min} and {max}.", .format.w, .format.type_)]
    BadWidth {
        use_: Use,
        format: UncheckedFormat,
        min: Width,
        max: Width,
    },

    #[error("{use_} format {format} specifies decimal places, but {} format does not allow any decimals.", .format.type_)]
    DecimalsNotAllowedForFormat { use_: Use, format: UncheckedFormat },

    #[error("{use_} format {format} specifies {} decimal places, but with a width of {}, {} does not allow any decimal places.", .format.d, .format.w, .format.type_)]
    DecimalsNotAllowedForWidth { use_: Use, format: UncheckedFormat },

    #[error("{use_} format {format} specifies {} decimal places but, with a width of {}, {} allows at most {max_d} decimal places.", .format.d, .format.w, .format.type_)]
    TooManyDecimalsForWidth {
        use_: Use,
        format: UncheckedFormat,
        max_d: Decimals,
    },

    #[error("Format {0} does not have a customizable number style.")]
    NoNumberStyle(Type),

    #[error("Custom currency string {0:?} must contain exactly three commas or exactly three periods.")]
    BadCustomCurrency(String),
}

/// Whether a format is used for input or output.
///
/// Some formats are only usable for output, and the rules for widths and
/// decimals are more lenient for input.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Use {
    Input,
    Output,
}

impl Use {
    pub fn as_str(&self) -> &'static str {
        match self {
            Use::Input => "Input",
            Use::Output => "Output",
        }
    }
}

impl Display for Use {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

flags! {
    /// Coarse classification of format types.
    pub enum Category: u16 {
        // Numeric formats.
        Basic,
        Custom,
        Legacy,
        Binary,
        Hex,
        Date,
        Time,
        DateComponent,

        // String formats.
        String,
    }
}

impl From<Type> for Category {
    fn from(source: Type) -> Self {
        match source {
            Type::F | Type::Comma | Type::Dot | Type::Dollar | Type::Pct | Type::E => Self::Basic,
            Type::CC(_) => Self::Custom,
            Type::N | Type::Z => Self::Legacy,
            Type::P | Type::PK | Type::IB | Type::PIB | Type::RB => Self::Binary,
            Type::PIBHex | Type::RBHex => Self::Hex,
            Type::Date
            | Type::ADate
            | Type::EDate
            | Type::JDate
            | Type::SDate
            | Type::QYr
            | Type::MoYr
            | Type::WkYr
            | Type::DateTime
            | Type::YmdHms => Self::Date,
            Type::MTime | Type::Time | Type::DTime => Self::Time,
            Type::WkDay | Type::Month => Self::DateComponent,
            Type::A | Type::AHex => Self::String,
        }
    }
}

#[derive(Copy, Clone, Debug, Enum, PartialEq, Eq, Hash, Sequence, Serialize, Deserialize)]
pub enum CC {
    A,
    B,
    C,
    D,
    E,
}

impl CC {
    pub fn as_string(&self) -> &'static str {
        match self {
            CC::A => "A",
            CC::B => "B",
            CC::C => "C",
            CC::D => "D",
            CC::E => "E",
        }
    }
}

impl Display for CC {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.as_string())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Sequence, Serialize)]
pub enum Type {
    // Basic numeric formats.
    F,
    Comma,
    Dot,
    Dollar,
    Pct,
    E,

    // Custom currency formats.
    CC(CC),

    // Legacy numeric formats.
    N,
    Z,

    // Binary and hexadecimal formats.
    P,
    PK,
    IB,
    PIB,
    PIBHex,
    RB,
    RBHex,

    // Time and date formats.
    Date,
    ADate,
    EDate,
    JDate,
    SDate,
    QYr,
    MoYr,
    WkYr,
    DateTime,
    YmdHms,
    MTime,
    Time,
    DTime,

    // Date component formats.
    WkDay,
    Month,

    // String formats.
    A,
    AHex,
}

pub type Width = u16;
pub type SignedWidth = i16;

pub type Decimals = u8;

impl Type {
    pub fn max_width(self) -> Width {
        match self {
            Self::P | Self::PK | Self::PIBHex | Self::RBHex => 16,
            Self::IB | Self::PIB | Self::RB => 8,
            Self::A => 32767,
            Self::AHex => 32767 * 2,
            _ => 40,
        }
    }

    pub fn min_width(self, use_: Use) -> Width {
        match (self, use_) {
            // Input allows narrower fields for some formats, because
            // there's no need to leave room for decorations.
            (Self::F | Self::Comma | Self::Dot | Self::Dollar | Self::Pct, Use::Input) => 1,
            (Self::E, Use::Input) => 1,
            (Self::QYr, Use::Input) => 4,
            (Self::WkYr, Use::Input) => 6,
            (Self::MTime, Use::Input) => 4,
            (Self::DTime, Use::Input) => 11,

            // Basic numeric formats.
            (Self::F | Self::Comma | Self::Dot, _) => 1,
            (Self::Dollar | Self::Pct, _) => 2,
            (Self::E, _) => 6,

            // Custom currency formats.
            (Self::CC(_), _) => 2,

            // Legacy numeric formats.
            (Self::N | Self::Z, _) => 1,

            // Binary and hexadecimal formats.
            (Self::P | Self::PK | Self::IB | Self::PIB, _) => 1,
            (Self::PIBHex | Self::RB, _) => 2,
            (Self::RBHex, _) => 4,

            // Time and date formats.
            (Self::Date, _) => 9,
            (Self::ADate | Self::EDate | Self::SDate, _) => 8,
            (Self::JDate, _) => 5,
            (Self::QYr | Self::MoYr, _) => 6,
            (Self::WkYr, _) => 8,
            (Self::DateTime, _) => 17,
            (Self::YmdHms, _) => 16,
            (Self::MTime | Self::Time, _) => 5,
            (Self::DTime, _) => 8,

            // Date component formats.
            (Self::WkDay, _) => 2,
            (Self::Month, _) => 3,

            // String formats.
            (Self::A, _) => 1,
            (Self::AHex, _) => 2,
        }
    }

    pub fn width_range(self, use_: Use) -> RangeInclusive<Width> {
        self.min_width(use_)..=self.max_width()
    }

    pub fn max_decimals(self, width: Width, use_: Use) -> Decimals {
        let width = width.clamp(1, 40) as SignedWidth;
        let input = use_ == Use::Input;
        let max = match self {
            Self::F | Self::Comma | Self::Dot if input => width,
            Self::F | Self::Comma | Self::Dot => width - 1,
            Self::Dollar | Self::Pct if input => width,
            Self::Dollar | Self::Pct => width - 2,
            Self::E if input => width,
            Self::E => width - 7,
            Self::CC(_) => width - 1,
            Self::N | Self::Z => width,
            Self::P => width * 2 - 1,
            Self::PK => width * 2,
            Self::IB | Self::PIB => max_digits_for_bytes(width as usize) as SignedWidth,
            Self::PIBHex => 0,
            Self::RB | Self::RBHex => 16,
            Self::Date
            | Self::ADate
            | Self::EDate
            | Self::JDate
            | Self::SDate
            | Self::QYr
            | Self::MoYr
            | Self::WkYr => 0,
            Self::DateTime => width - 21,
            Self::YmdHms => width - 20,
            Self::MTime => width - 6,
            Self::Time => width - 9,
            Self::DTime => width - 12,
            Self::WkDay | Self::Month | Self::A | Self::AHex => 0,
        };
        max.clamp(0, 16) as Decimals
    }

    pub fn takes_decimals(self) -> bool {
        self.max_decimals(Width::MAX, Use::Output) > 0
    }

    pub fn category(self) -> Category {
        self.into()
    }

    pub fn is_string(self) -> bool {
        self.category() == Category::String
    }

    /// Returns true if this format type may be used for input.  Custom
    /// currency formats are output-only.
    pub fn usable_for_input(self) -> bool {
        self.category() != Category::Custom
    }

    pub fn width_step(self) -> Width {
        if self.category() == Category::Hex || self == Self::AHex {
            2
        } else {
            1
        }
    }

    pub fn clamp_width(self, width: Width, use_: Use) -> Width {
        let (min, max) = self.width_range(use_).into_inner();
        let width = width.clamp(min, max);
        if self.width_step() == 2 {
            width / 2 * 2
        } else {
            width
        }
    }

    pub fn var_type(self) -> VarType {
        match self {
            Self::A | Self::AHex => VarType::String,
            _ => VarType::Numeric,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::F => "F",
            Self::Comma => "COMMA",
            Self::Dot => "DOT",
            Self::Dollar => "DOLLAR",
            Self::Pct => "PCT",
            Self::E => "E",
            Self::CC(CC::A) => "CCA",
            Self::CC(CC::B) => "CCB",
            Self::CC(CC::C) => "CCC",
            Self::CC(CC::D) => "CCD",
            Self::CC(CC::E) => "CCE",
            Self::N => "N",
            Self::Z => "Z",
            Self::P => "P",
            Self::PK => "PK",
            Self::IB => "IB",
            Self::PIB => "PIB",
            Self::PIBHex => "PIBHEX",
            Self::RB => "RB",
            Self::RBHex => "RBHEX",
            Self::Date => "DATE",
            Self::ADate => "ADATE",
            Self::EDate => "EDATE",
            Self::JDate => "JDATE",
            Self::SDate => "SDATE",
            Self::QYr => "QYR",
            Self::MoYr => "MOYR",
            Self::WkYr => "WKYR",
            Self::DateTime => "DATETIME",
            Self::YmdHms => "YMDHMS",
            Self::MTime => "MTIME",
            Self::Time => "TIME",
            Self::DTime => "DTIME",
            Self::WkDay => "WKDAY",
            Self::Month => "MONTH",
            Self::A => "A",
            Self::AHex => "AHEX",
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Type {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all::<Type>()
            .find(|type_| type_.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownType(s.into()))
    }
}

/// Returns the number of decimal digits needed to represent every unsigned
/// integer with `bytes` bytes.
pub(crate) fn max_digits_for_bytes(bytes: usize) -> usize {
    *[0, 3, 5, 8, 10, 13, 15, 17].get(bytes).unwrap_or(&20)
}

/// A format specifier as written, e.g. `F8.2`, before its type name has been
/// looked up.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct AbstractFormat {
    pub name: String,
    pub w: Width,
    pub d: Decimals,
}

fn split<F>(s: &str, predicate: F) -> (&str, &str)
where
    F: Fn(&char) -> bool,
{
    let rest = s.trim_start_matches(|c| predicate(&c));
    let start = &s[..s.len() - rest.len()];
    (start, rest)
}

impl FromStr for AbstractFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad_syntax = || Error::BadSyntax(s.into());

        let (name, rest) = split(s, char::is_ascii_alphabetic);
        if name.is_empty() {
            return Err(bad_syntax());
        }

        let (w, rest) = split(rest, char::is_ascii_digit);
        let w = w.parse().map_err(|_| bad_syntax())?;

        let (d, rest) = if let Some(rest) = rest.strip_prefix('.') {
            let (d, rest) = split(rest, char::is_ascii_digit);
            (d.parse().map_err(|_| bad_syntax())?, rest)
        } else {
            (0, rest)
        };

        if !rest.is_empty() {
            return Err(bad_syntax());
        }
        Ok(Self {
            name: name.into(),
            w,
            d,
        })
    }
}

impl TryFrom<AbstractFormat> for UncheckedFormat {
    type Error = Error;

    fn try_from(value: AbstractFormat) -> Result<Self, Self::Error> {
        Ok(UncheckedFormat::new(value.name.parse()?, value.w, value.d))
    }
}

/// A format specifier whose width and decimals are valid for its type.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Format {
    type_: Type,
    w: Width,
    d: Decimals,
}

impl Serialize for Format {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut s = SmallString::<[u8; 16]>::new();
        write!(&mut s, "{self}").map_err(serde::ser::Error::custom)?;
        s.serialize(serializer)
    }
}

impl Format {
    pub const F8_2: Format = Format {
        type_: Type::F,
        w: 8,
        d: 2,
    };

    pub fn type_(self) -> Type {
        self.type_
    }
    pub fn w(self) -> usize {
        self.w as usize
    }
    pub fn d(self) -> usize {
        self.d as usize
    }

    /// Returns a new output format, if `type_`, `w`, and `d` are valid for
    /// output.
    pub fn new(type_: Type, w: Width, d: Decimals) -> Option<Self> {
        UncheckedFormat { type_, w, d }.try_into().ok()
    }

    /// Returns a new format for `use_`, or an error explaining why `type_`,
    /// `w`, and `d` are not valid together.
    pub fn try_new(use_: Use, type_: Type, w: Width, d: Decimals) -> Result<Self, Error> {
        UncheckedFormat { type_, w, d }.check(use_)
    }

    pub fn default_for_width(var_width: VarWidth) -> Self {
        match var_width {
            VarWidth::Numeric => Self::F8_2,
            VarWidth::String(w) => Format {
                type_: Type::A,
                w,
                d: 0,
            },
        }
    }

    /// Returns the closest format to `source` that is valid for `use_`.
    ///
    /// If `source` has more decimals than its width allows, the width is
    /// increased to make room for them, if that is possible, and otherwise
    /// the decimals are reduced.
    pub fn fixed_from(source: &UncheckedFormat, use_: Use) -> Self {
        let UncheckedFormat { type_, w, d } = *source;
        let type_ = if use_ == Use::Input && !type_.usable_for_input() {
            Type::F
        } else {
            type_
        };
        let max_w = type_.max_width();
        let mut w = type_.clamp_width(w, use_);
        if d <= type_.max_decimals(Width::MAX, use_) {
            while d > type_.max_decimals(w, use_) && w + type_.width_step() <= max_w {
                w += type_.width_step();
            }
        }
        let d = d.clamp(0, type_.max_decimals(w, use_));
        Self { type_, w, d }
    }

    /// Returns the format that is appropriate for displaying values read
    /// with input format `input`.
    ///
    /// Binary and legacy formats display as `F`, and the output width grows
    /// to make room for the digits, sign, decimal point, grouping, and affixes
    /// that output adds.
    pub fn for_output_from_input(input: Format, settings: &Settings) -> Self {
        let Format { type_, w, d } = input;
        let numeric = Category::Legacy | Category::Binary | Category::Hex;
        let output_type = match type_ {
            Type::AHex => Type::A,
            _ if numeric.contains(type_.category()) => Type::F,
            _ => type_,
        };
        let with_point = Width::from(d > 0);
        let (w, d) = match type_ {
            Type::F | Type::Comma | Type::Dot | Type::Dollar | Type::Pct => {
                let style = settings.number_style(type_);
                let mut output_w = w + style.affix_width() as Width;
                if style.grouping.is_some() && w - Width::from(d) >= 3 {
                    output_w += (w - Width::from(d) - 1) / 3;
                }
                (output_w + with_point, d)
            }
            Type::N => (w + with_point, d),
            Type::Z => (w + 1 + with_point, d),
            Type::E => {
                let d = d.max(3);
                (w.max(Width::from(d) + 7), d)
            }
            Type::PIBHex => (max_digits_for_bytes(w as usize / 2) as Width + 1, d),
            Type::RB | Type::RBHex => (8, 2),
            Type::P | Type::PK => (2 * w + with_point, d),
            Type::IB | Type::PIB => (max_digits_for_bytes(w as usize) as Width + 1 + with_point, d),
            Type::AHex => (w / 2, d),
            _ => (w, d),
        };
        UncheckedFormat::new(output_type, w, d).fix(Use::Output)
    }

    pub fn var_width(self) -> VarWidth {
        match self.type_ {
            Type::A => VarWidth::String(self.w),
            Type::AHex => VarWidth::String(self.w / 2),
            _ => VarWidth::Numeric,
        }
    }

    /// Checks whether this format is also valid for `use_`.
    pub fn check(self, use_: Use) -> Result<Self, Error> {
        UncheckedFormat::from(self).check(use_)
    }

    pub fn resize(&mut self, width: VarWidth) {
        match (self.var_width(), width) {
            (VarWidth::Numeric, VarWidth::Numeric) => {}
            (VarWidth::String(_), VarWidth::String(new_width)) => {
                self.w = if self.type_ == Type::AHex {
                    new_width * 2
                } else {
                    new_width
                };
            }
            _ => *self = Self::default_for_width(width),
        }
    }
}

impl Debug for Format {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{self}")
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        Display::fmt(&UncheckedFormat::from(*self), f)
    }
}

impl TryFrom<UncheckedFormat> for Format {
    type Error = Error;

    fn try_from(source: UncheckedFormat) -> Result<Self, Self::Error> {
        source.check(Use::Output)
    }
}

impl FromStr for Format {
    type Err = Error;

    /// Parses an output format such as `F8.2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<UncheckedFormat>()?.check(Use::Output)
    }
}

impl From<Type> for u16 {
    fn from(source: Type) -> Self {
        match source {
            Type::A => 1,
            Type::AHex => 2,
            Type::Comma => 3,
            Type::Dollar => 4,
            Type::F => 5,
            Type::IB => 6,
            Type::PIBHex => 7,
            Type::P => 8,
            Type::PIB => 9,
            Type::PK => 10,
            Type::RB => 11,
            Type::RBHex => 12,
            Type::Z => 15,
            Type::N => 16,
            Type::E => 17,
            Type::Date => 20,
            Type::Time => 21,
            Type::DateTime => 22,
            Type::ADate => 23,
            Type::JDate => 24,
            Type::DTime => 25,
            Type::WkDay => 26,
            Type::Month => 27,
            Type::MoYr => 28,
            Type::QYr => 29,
            Type::WkYr => 30,
            Type::Pct => 31,
            Type::Dot => 32,
            Type::CC(CC::A) => 33,
            Type::CC(CC::B) => 34,
            Type::CC(CC::C) => 35,
            Type::CC(CC::D) => 36,
            Type::CC(CC::E) => 37,
            Type::EDate => 38,
            Type::SDate => 39,
            Type::MTime => 40,
            Type::YmdHms => 41,
        }
    }
}

impl TryFrom<u16> for Type {
    type Error = Error;

    fn try_from(source: u16) -> Result<Self, Self::Error> {
        all::<Type>()
            .find(|type_| u16::from(*type_) == source)
            .ok_or(Error::UnknownFormat { value: source })
    }
}

/// A format specifier that has not been checked for validity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UncheckedFormat {
    pub type_: Type,

    pub w: Width,

    pub d: Decimals,
}

impl UncheckedFormat {
    pub fn new(type_: Type, w: Width, d: Decimals) -> Self {
        Self { type_, w, d }
    }

    pub fn fix(&self, use_: Use) -> Format {
        Format::fixed_from(self, use_)
    }

    /// Checks that this format is valid for `use_`.
    pub fn check(self, use_: Use) -> Result<Format, Error> {
        let Self { type_, w, d } = self;
        if use_ == Use::Input && !type_.usable_for_input() {
            return Err(Error::NotUsableForInput(type_));
        }

        let (min, max) = type_.width_range(use_).into_inner();
        let max_d = type_.max_decimals(w, use_);
        if w % type_.width_step() != 0 {
            Err(Error::OddWidthNotAllowed { use_, format: self })
        } else if !(min..=max).contains(&w) {
            Err(Error::BadWidth {
                use_,
                format: self,
                min,
                max,
            })
        } else if d > max_d {
            if !type_.takes_decimals() {
                Err(Error::DecimalsNotAllowedForFormat { use_, format: self })
            } else if max_d > 0 {
                Err(Error::TooManyDecimalsForWidth {
                    use_,
                    format: self,
                    max_d,
                })
            } else {
                Err(Error::DecimalsNotAllowedForWidth { use_, format: self })
            }
        } else {
            Ok(Format { type_, w, d })
        }
    }
}

impl From<Format> for UncheckedFormat {
    fn from(format: Format) -> Self {
        Self {
            type_: format.type_,
            w: format.w,
            d: format.d,
        }
    }
}

impl FromStr for UncheckedFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<AbstractFormat>()?.try_into()
    }
}

impl Display for UncheckedFormat {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}{}", self.type_, self.w)?;
        if self.type_.takes_decimals() || self.d > 0 {
            write!(f, ".{}", self.d)?;
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Enum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decimal {
    #[default]
    Dot,
    Comma,
}

impl Decimal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decimal::Dot => ".",
            Decimal::Comma => ",",
        }
    }
}

impl From<Decimal> for char {
    fn from(value: Decimal) -> Self {
        u8::from(value).into()
    }
}

impl From<Decimal> for u8 {
    fn from(value: Decimal) -> Self {
        match value {
            Decimal::Dot => b'.',
            Decimal::Comma => b',',
        }
    }
}

impl TryFrom<char> for Decimal {
    type Error = ();

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            '.' => Ok(Self::Dot),
            ',' => Ok(Self::Comma),
            _ => Err(()),
        }
    }
}

impl Not for Decimal {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Dot => Self::Comma,
            Self::Comma => Self::Dot,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Epoch(pub i32);

impl Epoch {
    /// Applies the epoch to `year`:
    ///
    /// - If `year` is 2 digits (between 0 and 99, inclusive), returns it
    ///   converted it to the correct year considering the epoch.
    ///
    /// - Otherwise, returns `year` unchanged.
    pub fn apply(&self, year: i32) -> i32 {
        match year {
            0..=99 => {
                let century = self.0 / 100 * 100;
                let offset = self.0 - century;
                if year >= offset {
                    year + century
                } else {
                    year + century + 100
                }
            }
            other => other,
        }
    }
}

impl Default for Epoch {
    fn default() -> Self {
        static DEFAULT: LazyLock<Epoch> = LazyLock::new(|| Epoch(Local::now().year() - 69));
        *DEFAULT
    }
}

impl Display for Epoch {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// The format types that have a [NumberStyle].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Enum, Sequence, Serialize)]
pub enum StyleKey {
    F,
    E,
    Comma,
    Dot,
    Dollar,
    Pct,
    CCA,
    CCB,
    CCC,
    CCD,
    CCE,
}

impl From<CC> for StyleKey {
    fn from(cc: CC) -> Self {
        match cc {
            CC::A => Self::CCA,
            CC::B => Self::CCB,
            CC::C => Self::CCC,
            CC::D => Self::CCD,
            CC::E => Self::CCE,
        }
    }
}

impl TryFrom<Type> for StyleKey {
    type Error = Error;

    fn try_from(type_: Type) -> Result<Self, Self::Error> {
        match type_ {
            Type::F => Ok(Self::F),
            Type::E => Ok(Self::E),
            Type::Comma => Ok(Self::Comma),
            Type::Dot => Ok(Self::Dot),
            Type::Dollar => Ok(Self::Dollar),
            Type::Pct => Ok(Self::Pct),
            Type::CC(cc) => Ok(cc.into()),
            _ => Err(Error::NoNumberStyle(type_)),
        }
    }
}

/// Settings that affect formatting of numbers and dates.
#[derive(Clone, Debug, Serialize)]
pub struct Settings {
    pub epoch: Epoch,

    /// Either `'.'` or `','`.
    pub decimal: Decimal,

    /// Format `F`, `E`, `COMMA`, and `DOT` with leading zero (e.g. `0.5`
    /// instead of `.5`)?
    pub leading_zero: bool,

    /// Number styles, including custom currency styles.
    styles: EnumMap<StyleKey, NumberStyle>,
}

impl Default for Settings {
    fn default() -> Self {
        let decimal = Decimal::default();
        let leading_zero = true;
        Self {
            epoch: Epoch::default(),
            decimal,
            leading_zero,
            styles: EnumMap::from_fn(|key| NumberStyle::for_key(key, decimal, leading_zero)),
        }
    }
}

impl Settings {
    /// Rebuilds the styles that depend on the decimal point and leading zero
    /// settings.  Custom currency styles do not.
    fn rebuild_styles(&mut self) {
        for (key, style) in self.styles.iter_mut() {
            if !matches!(
                key,
                StyleKey::CCA | StyleKey::CCB | StyleKey::CCC | StyleKey::CCD | StyleKey::CCE
            ) {
                *style = NumberStyle::for_key(key, self.decimal, self.leading_zero);
            }
        }
    }

    pub fn with_cc(self, cc: CC, style: NumberStyle) -> Self {
        self.with_style(cc.into(), style)
    }

    pub fn set_cc(&mut self, cc: CC, style: NumberStyle) {
        self.set_style(cc.into(), style);
    }

    pub fn with_style(mut self, key: StyleKey, style: NumberStyle) -> Self {
        self.set_style(key, style);
        self
    }

    /// Replaces the number style for `key` by `style`.
    pub fn set_style(&mut self, key: StyleKey, style: NumberStyle) {
        debug!("setting {key:?} number style to \"{style}\"");
        self.styles[key] = style;
    }

    pub fn with_leading_zero(mut self, leading_zero: bool) -> Self {
        self.leading_zero = leading_zero;
        self.rebuild_styles();
        self
    }

    pub fn with_decimal(mut self, decimal: Decimal) -> Self {
        self.decimal = decimal;
        self.rebuild_styles();
        self
    }

    pub fn with_epoch(self, epoch: Epoch) -> Self {
        Self { epoch, ..self }
    }

    pub fn style(&self, key: StyleKey) -> &NumberStyle {
        &self.styles[key]
    }

    /// Returns the number style for `type_`.  Format types without a
    /// customizable style get a plain style with no affixes or grouping.
    pub fn number_style(&self, type_: Type) -> &NumberStyle {
        static DEFAULT: LazyLock<NumberStyle> =
            LazyLock::new(|| NumberStyle::new("", "", Decimal::Dot, None, false));

        match StyleKey::try_from(type_) {
            Ok(key) => &self.styles[key],
            Err(_) => &DEFAULT,
        }
    }
}

/// A numeric output style.  This can express numeric formats in
/// [Category::Basic] and [Category::Custom].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NumberStyle {
    pub neg_prefix: Affix,
    pub prefix: Affix,
    pub suffix: Affix,
    pub neg_suffix: Affix,

    /// Decimal point.
    pub decimal: Decimal,

    /// Grouping character.
    pub grouping: Option<Decimal>,

    /// Format as `.5` or `0.5`?
    pub leading_zero: bool,
}

impl Display for NumberStyle {
    /// Display this number style in the format used for custom currency.
    ///
    /// This format can only accurately represent number styles that include a
    /// grouping character.  If this number style doesn't, it will pretend that
    /// the grouping character is the opposite of the decimal point character.
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let grouping = char::from(!self.decimal);
        write!(
            f,
            "{}{}{}{}{}{}{}",
            self.neg_prefix.display(grouping),
            grouping,
            self.prefix.display(grouping),
            grouping,
            self.suffix.display(grouping),
            grouping,
            self.neg_suffix.display(grouping),
        )
    }
}

impl NumberStyle {
    fn new(
        prefix: &str,
        suffix: &str,
        decimal: Decimal,
        grouping: Option<Decimal>,
        leading_zero: bool,
    ) -> Self {
        Self {
            neg_prefix: Affix::new("-"),
            prefix: Affix::new(prefix),
            suffix: Affix::new(suffix),
            neg_suffix: Affix::new(""),
            decimal,
            grouping,
            leading_zero,
        }
    }

    /// Returns the default style for `key`, given the decimal point and
    /// leading zero settings.
    fn for_key(key: StyleKey, decimal: Decimal, leading_zero: bool) -> Self {
        match key {
            StyleKey::F | StyleKey::E => Self::new("", "", decimal, None, leading_zero),
            StyleKey::Comma => Self::new("", "", decimal, Some(!decimal), leading_zero),
            StyleKey::Dot => Self::new("", "", !decimal, Some(decimal), leading_zero),
            StyleKey::Dollar => Self::new("$", "", decimal, Some(!decimal), false),
            StyleKey::Pct => Self::new("", "%", decimal, None, false),
            StyleKey::CCA | StyleKey::CCB | StyleKey::CCC | StyleKey::CCD | StyleKey::CCE => {
                Self::new("", "", Decimal::Dot, Some(Decimal::Comma), false)
            }
        }
    }

    /// Width of the prefix and suffix, which always appear in output.
    pub fn affix_width(&self) -> usize {
        self.prefix.width() + self.suffix.width()
    }

    /// Width of the negative prefix and suffix, which only appear for
    /// negative numbers.
    pub fn neg_affix_width(&self) -> usize {
        self.neg_prefix.width() + self.neg_suffix.width()
    }
}

/// A prefix or suffix for a [NumberStyle].
///
/// Output fields are measured in bytes, so an affix may only contain
/// characters that fit in one byte.  Other characters are replaced by `?`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Affix {
    /// String contents of affix.
    pub s: String,

    /// Contents of affix as Latin-1 bytes.
    #[serde(skip)]
    bytes: SmallVec<[u8; 16]>,
}

impl Affix {
    /// Maximum number of characters in an affix.
    pub const MAX_LEN: usize = 16;

    fn new(s: impl Into<String>) -> Self {
        let s: String = s.into().chars().take(Self::MAX_LEN).collect();
        let bytes = s.chars().map(|c| u8::try_from(c).unwrap_or(b'?')).collect();
        Self { s, bytes }
    }

    /// Returns the affix encoded as one byte per character.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the width of the affix in output columns.
    pub fn width(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.s.is_empty()
    }

    fn display(&self, escape: char) -> DisplayAffix<'_> {
        DisplayAffix {
            affix: self.s.as_str(),
            escape,
        }
    }
}

pub struct DisplayAffix<'a> {
    affix: &'a str,
    escape: char,
}

impl Display for DisplayAffix<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for c in self.affix.chars() {
            if c == self.escape || c == '\'' {
                f.write_char('\'')?;
            }
            f.write_char(c)?;
        }
        Ok(())
    }
}

impl FromStr for NumberStyle {
    type Err = Error;

    /// Parses a custom currency string `NEG_PREFIX,PREFIX,SUFFIX,NEG_SUFFIX`.
    /// The delimiter is whichever of `,` and `.` appears exactly three times,
    /// and the other one becomes the decimal point.  An apostrophe escapes
    /// the following character.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn find_separator(s: &str) -> Option<Decimal> {
            let mut n_commas = 0;
            let mut n_periods = 0;
            let mut escaped = false;
            for c in s.chars() {
                if escaped {
                    escaped = false;
                } else if c == '\'' {
                    escaped = true;
                } else if c == ',' {
                    n_commas += 1;
                } else if c == '.' {
                    n_periods += 1;
                }
            }

            if n_commas == 3 && n_periods != 3 {
                Some(Decimal::Comma)
            } else if n_periods == 3 && n_commas != 3 {
                Some(Decimal::Dot)
            } else {
                None
            }
        }

        fn take_cc_token(iter: &mut Chars<'_>, grouping: char) -> Affix {
            let mut s = String::new();
            let mut quote = false;
            for c in iter {
                if c == '\'' && !quote {
                    quote = true;
                } else if c == grouping && !quote {
                    break;
                } else {
                    s.push(c);
                    quote = false;
                }
            }
            Affix::new(s)
        }

        let Some(grouping) = find_separator(s) else {
            return Err(Error::BadCustomCurrency(s.into()));
        };
        let mut iter = s.chars();
        let neg_prefix = take_cc_token(&mut iter, grouping.into());
        let prefix = take_cc_token(&mut iter, grouping.into());
        let suffix = take_cc_token(&mut iter, grouping.into());
        let neg_suffix = take_cc_token(&mut iter, grouping.into());
        Ok(Self {
            neg_prefix,
            prefix,
            suffix,
            neg_suffix,
            decimal: !grouping,
            grouping: Some(grouping),
            leading_zero: false,
        })
    }
}

/// An item within a [DateTemplate].
pub struct TemplateItem {
    /// Character in the template.
    pub c: char,

    /// Number of repetitions of the character.
    pub n: usize,
}

/// A template for date and time formats.
#[derive(Clone)]
pub struct DateTemplate(&'static str);

impl DateTemplate {
    /// Returns a [DateTemplate] used for date and time input and output in a
    /// field of the given `type_` and `width`.
    ///
    /// `width` only affects whether a 2-digit year or a 4-digit year is used,
    /// that is, whether the returned string contains `yy` or `yyyy`, and
    /// whether seconds are included, that is, whether the returned string
    /// contains `:SS`.  A caller that doesn't care whether the returned string
    /// contains `yy` or `yyyy` or `:SS` can just specify 0 to omit them.
    pub fn new(type_: Type, width: usize) -> Option<Self> {
        let (short, long) = match type_ {
            Type::F
            | Type::Comma
            | Type::Dot
            | Type::Dollar
            | Type::Pct
            | Type::E
            | Type::CC(_)
            | Type::N
            | Type::Z
            | Type::P
            | Type::PK
            | Type::IB
            | Type::PIB
            | Type::PIBHex
            | Type::RB
            | Type::RBHex
            | Type::WkDay
            | Type::Month
            | Type::A
            | Type::AHex => return None,
            Type::Date => ("dd-mmm-yy", "dd-mmm-yyyy"),
            Type::ADate => ("mm/dd/yy", "mm/dd/yyyy"),
            Type::EDate => ("dd.mm.yy", "dd.mm.yyyy"),
            Type::JDate => ("yyddd", "yyyyddd"),
            Type::SDate => ("yy/mm/dd", "yyyy/mm/dd"),
            Type::QYr => ("q Q yy", "q Q yyyy"),
            Type::MoYr => ("mmm yy", "mmm yyyy"),
            Type::WkYr => ("ww WK yy", "ww WK yyyy"),
            Type::DateTime => ("dd-mmm-yyyy HH:MM", "dd-mmm-yyyy HH:MM:SS"),
            Type::YmdHms => ("yyyy-mm-dd HH:MM", "yyyy-mm-dd HH:MM:SS"),
            Type::MTime => ("MM", "MM:SS"),
            Type::Time => ("HH:MM", "HH:MM:SS"),
            Type::DTime => ("D HH:MM", "D HH:MM:SS"),
        };
        if width >= long.len() {
            Some(DateTemplate(long))
        } else {
            Some(DateTemplate(short))
        }
    }

    pub fn for_format(format: Format) -> Option<Self> {
        Self::new(format.type_(), format.w())
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Iterator for DateTemplate {
    type Item = TemplateItem;

    fn next(&mut self) -> Option<Self::Item> {
        let mut iter = self.0.chars();
        let c = iter.next()?;
        self.0 = iter.as_str();
        let mut n = 1;
        while iter.next() == Some(c) {
            self.0 = iter.as_str();
            n += 1;
        }
        Some(TemplateItem { c, n })
    }
}
