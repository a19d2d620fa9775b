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

//! The configuration snapshot passed to every decode and encode operation.

use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use log::{debug, warn};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error as ThisError;

use crate::{
    endian::Endian,
    format::{Decimal, Epoch, Error as FormatError, NumberStyle, Settings as FormatSettings, CC},
};

/// Byte order, as written in configuration files.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    Big,
    Little,
}

impl From<ByteOrder> for Endian {
    fn from(value: ByteOrder) -> Self {
        match value {
            ByteOrder::Big => Endian::Big,
            ByteOrder::Little => Endian::Little,
        }
    }
}

impl From<Endian> for ByteOrder {
    fn from(value: Endian) -> Self {
        match value {
            Endian::Big => ByteOrder::Big,
            Endian::Little => ByteOrder::Little,
        }
    }
}

fn serialize_endian<S>(endian: &Endian, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    ByteOrder::from(*endian).serialize(serializer)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EndianSettings {
    /// Endianness for reading IB, PIB, and RB formats.
    #[serde(serialize_with = "serialize_endian")]
    pub input: Endian,

    /// Endianness for writing IB, PIB, and RB formats.
    #[serde(serialize_with = "serialize_endian")]
    pub output: Endian,
}

impl Default for EndianSettings {
    fn default() -> Self {
        Self {
            input: Endian::NATIVE,
            output: Endian::NATIVE,
        }
    }
}

impl EndianSettings {
    pub const fn new(endian: Endian) -> Self {
        Self {
            input: endian,
            output: endian,
        }
    }
}

/// Settings for reading and writing data fields.
///
/// A [Settings] is constructed once by the caller and then passed by
/// reference to each conversion, so that conversions don't depend on any
/// hidden global state.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Settings {
    /// Number styles, decimal point, and epoch.
    pub formats: FormatSettings,

    /// Byte order for binary formats.
    pub endian: EndianSettings,

    /// Value for a blank numeric input field, `None` for system-missing.
    pub blanks: Option<f64>,
}

impl Settings {
    /// Returns a shared instance of the default settings.
    pub fn global() -> &'static Settings {
        static GLOBAL: OnceLock<Settings> = OnceLock::new();
        GLOBAL.get_or_init(Settings::default)
    }

    pub fn with_formats(self, formats: FormatSettings) -> Self {
        Self { formats, ..self }
    }

    pub fn with_endian(self, endian: EndianSettings) -> Self {
        Self { endian, ..self }
    }

    pub fn with_blanks(self, blanks: Option<f64>) -> Self {
        Self { blanks, ..self }
    }
}

#[derive(ThisError, Debug)]
pub enum ConfigError {
    #[error("{}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] toml::de::Error),

    #[error("Custom currency {cc}: {source}")]
    CustomCurrency { cc: &'static str, source: FormatError },
}

/// Settings as read from a TOML configuration file.
///
/// Every key is optional and missing keys keep their defaults:
///
/// ```toml
/// epoch = 1930
/// decimal = "comma"
/// leading_zero = false
/// blanks = 0.0
/// input_endian = "big"
/// output_endian = "little"
/// cca = "-,$,,"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub epoch: Option<i32>,
    pub decimal: Option<Decimal>,
    pub leading_zero: Option<bool>,
    pub blanks: Option<f64>,
    pub input_endian: Option<ByteOrder>,
    pub output_endian: Option<ByteOrder>,
    pub cca: Option<String>,
    pub ccb: Option<String>,
    pub ccc: Option<String>,
    pub ccd: Option<String>,
    pub cce: Option<String>,
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("loading configuration from {}", path.display());
        let contents = read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.into(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Builds a settings snapshot from this configuration.
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let mut formats = FormatSettings::default();
        match self.epoch {
            Some(epoch) if epoch >= 1582 => formats = formats.with_epoch(Epoch(epoch)),
            Some(epoch) => warn!("ignoring epoch {epoch}, which precedes the Gregorian calendar"),
            None => (),
        }
        if let Some(decimal) = self.decimal {
            formats = formats.with_decimal(decimal);
        }
        if let Some(leading_zero) = self.leading_zero {
            formats = formats.with_leading_zero(leading_zero);
        }
        for (cc, name, string) in [
            (CC::A, "CCA", self.cca),
            (CC::B, "CCB", self.ccb),
            (CC::C, "CCC", self.ccc),
            (CC::D, "CCD", self.ccd),
            (CC::E, "CCE", self.cce),
        ] {
            if let Some(string) = string {
                let style = string
                    .parse::<NumberStyle>()
                    .map_err(|source| ConfigError::CustomCurrency { cc: name, source })?;
                formats.set_cc(cc, style);
            }
        }

        let mut endian = EndianSettings::default();
        if let Some(input) = self.input_endian {
            endian.input = input.into();
        }
        if let Some(output) = self.output_endian {
            endian.output = output.into();
        }

        debug!("configured epoch {}, decimal {:?}", formats.epoch, formats.decimal);
        Ok(Settings {
            formats,
            endian,
            blanks: self.blanks,
        })
    }
}
