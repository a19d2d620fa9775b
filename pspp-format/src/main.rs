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

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use pspp_format::{
    format::Decimal,
    settings::{ByteOrder, Config, Settings},
};
use thiserror::Error as ThisError;

use crate::{decode::Decode, encode::Encode};

mod decode;
mod encode;

/// Converts values to and from fixed-width data fields.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    options: SettingsOptions,

    /// Increase logging verbosity (may be repeated).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Options that override the configuration file.
#[derive(Args, Clone, Debug)]
struct SettingsOptions {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// First year of the century that two-digit years fall into.
    #[arg(long, global = true)]
    epoch: Option<i32>,

    /// Decimal point, either `.` or `,`.
    #[arg(long, global = true, value_parser = parse_decimal)]
    decimal: Option<Decimal>,

    /// Byte order for IB, PIB, and RB fields, either `big` or `little`.
    #[arg(long, global = true, value_parser = parse_byte_order)]
    endian: Option<ByteOrder>,

    /// Value for blank numeric fields (system-missing if omitted).
    #[arg(long, global = true)]
    blanks: Option<f64>,
}

impl SettingsOptions {
    fn settings(self) -> Result<Settings> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if self.epoch.is_some() {
            config.epoch = self.epoch;
        }
        if self.decimal.is_some() {
            config.decimal = self.decimal;
        }
        if self.endian.is_some() {
            config.input_endian = self.endian;
            config.output_endian = self.endian;
        }
        if self.blanks.is_some() {
            config.blanks = self.blanks;
        }
        Ok(config.into_settings()?)
    }
}

#[derive(Subcommand, Clone, Debug)]
enum Command {
    Decode(Decode),
    Encode(Encode),

    /// Print the effective settings as JSON.
    Settings,
}

impl Command {
    fn run(self, settings: &Settings) -> Result<()> {
        match self {
            Command::Decode(decode) => decode.run(settings),
            Command::Encode(encode) => encode.run(settings),
            Command::Settings => {
                println!("{}", serde_json::to_string_pretty(settings)?);
                Ok(())
            }
        }
    }
}

#[derive(ThisError, Debug)]
#[error("{0}: decimal point must be `.` or `,`")]
struct BadDecimalError(String);

fn parse_decimal(arg: &str) -> Result<Decimal, BadDecimalError> {
    match arg {
        "." => Ok(Decimal::Dot),
        "," => Ok(Decimal::Comma),
        _ => Err(BadDecimalError(arg.into())),
    }
}

#[derive(ThisError, Debug)]
#[error("{0}: unknown byte order")]
struct UnknownByteOrderError(String);

fn parse_byte_order(arg: &str) -> Result<ByteOrder, UnknownByteOrderError> {
    match arg.to_ascii_lowercase().as_str() {
        "big" | "be" => Ok(ByteOrder::Big),
        "little" | "le" => Ok(ByteOrder::Little),
        _ => Err(UnknownByteOrderError(arg.into())),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let settings = cli.options.settings()?;
    cli.command.run(&settings)
}
