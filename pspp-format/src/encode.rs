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
use pspp_format::{
    data::Datum,
    format::{Category, Format},
    message::Diagnostics,
    settings::Settings,
};

/// Write a value into a data field.
#[derive(Args, Clone, Debug)]
pub struct Encode {
    /// Output format, such as `F8.2` or `DATE11`.
    format: String,

    /// Value to write.  For numeric formats, `.` is the system-missing
    /// value.
    value: String,

    /// Print the field as hexadecimal bytes.  This is the default for
    /// binary formats.
    #[arg(long)]
    hex: bool,
}

impl Encode {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let format = self.format.parse::<Format>()?;
        let datum = if format.type_().is_string() {
            Datum::from(self.value.as_str())
        } else if self.value.trim() == "." {
            Datum::Number(None)
        } else {
            let number = self
                .value
                .trim()
                .parse::<f64>()
                .with_context(|| format!("{:?} is not a number", self.value))?;
            Datum::Number(Some(number))
        };

        let mut diagnostics = Diagnostics::new();
        let field = datum
            .display(format)
            .with_settings(settings)
            .encode(&mut diagnostics);
        for diagnostic in &diagnostics.messages {
            eprintln!("{diagnostic}");
        }
        if self.hex || format.type_().category() == Category::Binary {
            let hex: String = field.0.iter().map(|byte| format!("{byte:02X}")).collect();
            println!("{hex}");
        } else {
            println!("|{}|", field.as_latin1());
        }
        Ok(())
    }
}
