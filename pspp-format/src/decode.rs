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

use anyhow::{Context, Result};
use clap::Args;
use log::debug;
use pspp_format::{
    data::Datum,
    format::{UncheckedFormat, Use},
    message::Diagnostics,
    settings::Settings,
};

/// Parse the contents of a data field.
#[derive(Args, Clone, Debug)]
pub struct Decode {
    /// Input format, such as `F8.2` or `DATE11`.
    format: String,

    /// Field contents.
    input: String,

    /// Treat the input as hexadecimal bytes, for binary formats such as
    /// `IB` and `P`.
    #[arg(long)]
    hex: bool,

    /// Number of implied decimal places for input without a decimal point.
    #[arg(long, default_value_t = 0)]
    implied_decimals: u8,
}

impl Decode {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let format = self
            .format
            .parse::<UncheckedFormat>()?
            .check(Use::Input)?;
        let input = if self.hex {
            decode_hex(&self.input)?
        } else {
            self.input.into_bytes()
        };
        debug!("decoding {} bytes as {format}", input.len());

        let mut datum = Datum::Number(None);
        let mut diagnostics = Diagnostics::new();
        let ok = format
            .parser()
            .with_settings(settings)
            .with_implied_decimals(self.implied_decimals)
            .decode(&input, &mut datum, &mut diagnostics);
        for diagnostic in &diagnostics.messages {
            eprintln!("{diagnostic}");
        }
        println!("{datum:?}");
        if !ok {
            std::process::exit(1);
        }
        Ok(())
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let s: String = s.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if let Some(c) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
        anyhow::bail!("{c:?} is not a hexadecimal digit");
    }
    if s.len() % 2 != 0 {
        anyhow::bail!("hexadecimal input must have an even number of digits");
    }
    s.as_bytes()
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair)?;
            u8::from_str_radix(pair, 16)
                .with_context(|| format!("{pair:?} is not a hexadecimal byte"))
        })
        .collect()
}
