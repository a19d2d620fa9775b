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

#![no_main]

use enum_iterator::all;
use libfuzzer_sys::fuzz_target;
use pspp_format::{
    data::Datum,
    format::{Type, UncheckedFormat, Use},
    message::Diagnostics,
};

fuzz_target!(|data: &[u8]| {
    let [selector, width, decimals, rest @ ..] = data else {
        return;
    };
    let types: Vec<Type> = all::<Type>().collect();
    let type_ = types[usize::from(*selector) % types.len()];
    let format = UncheckedFormat::new(type_, u16::from(*width), *decimals).fix(Use::Output);

    let datum = if type_.is_string() {
        Datum::from(rest)
    } else {
        let mut bytes = [0; 8];
        let n = rest.len().min(8);
        bytes[..n].copy_from_slice(&rest[..n]);
        Datum::Number(Some(f64::from_le_bytes(bytes)))
    };
    let field = datum.display(format).encode(&mut Diagnostics::new());
    assert_eq!(field.len(), format.w());
});
