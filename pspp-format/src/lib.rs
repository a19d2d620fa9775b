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

//! Input and output formats for statistical data values.
//!
//! A [Format](format::Format) describes how a [Datum](data::Datum) is
//! written to or read from a fixed-width field: as plain or grouped
//! decimal numbers, scientific notation, zoned or packed decimal, binary
//! integers and floating point, hexadecimal, calendar dates and times, or
//! strings.  [ParseValue](format::ParseValue) turns field contents into
//! values and [DisplayDatum](format::DisplayDatum) turns values into field
//! contents.  Both take a [Settings](settings::Settings) snapshot that
//! carries the decimal point, custom currency styles, two-digit year epoch,
//! and binary byte order.

pub mod calendar;
pub mod data;
pub mod endian;
pub mod format;
pub mod message;
pub mod settings;
