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

//! Diagnostics reported while reading and writing data fields.

use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    ops::RangeInclusive,
    sync::Arc,
};

use enum_map::{Enum, EnumMap};
use flagset::{flags, FlagSet};
use log::trace;

/// Location relevant to a diagnostic message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Location {
    /// File name, if any.
    pub file_name: Option<Arc<String>>,

    /// 1-based line number, if any.
    pub line: Option<i32>,

    /// 1-based first and last column, if any.
    pub columns: Option<RangeInclusive<i32>>,
}

impl Location {
    /// Returns a location that consists of just `columns`.
    pub fn columns(columns: RangeInclusive<i32>) -> Self {
        Self {
            columns: Some(columns),
            ..Self::default()
        }
    }

    pub fn with_line(self, line: i32) -> Self {
        Self {
            line: Some(line),
            ..self
        }
    }

    pub fn with_file_name(self, file_name: Arc<String>) -> Self {
        Self {
            file_name: Some(file_name),
            ..self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file_name.is_none() && self.line.is_none() && self.columns.is_none()
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if let Some(file_name) = &self.file_name {
            write!(f, "{file_name}")?;
            if self.line.is_some() || self.columns.is_some() {
                write!(f, ":")?;
            }
        }

        match (self.line, &self.columns) {
            (Some(line), Some(columns)) if columns.start() < columns.end() => {
                write!(f, "{line}.{}-{}", columns.start(), columns.end())
            }
            (Some(line), Some(columns)) => write!(f, "{line}.{}", columns.start()),
            (Some(line), None) => write!(f, "{line}"),
            (None, Some(columns)) if columns.start() < columns.end() => {
                write!(f, "columns {}-{}", columns.start(), columns.end())
            }
            (None, Some(columns)) => write!(f, "column {}", columns.start()),
            (None, None) => Ok(()),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Enum)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Category {
    General,
    Syntax,
    Data,
}

pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    pub location: Location,
    pub text: String,
}

impl Diagnostic {
    /// Returns a new data diagnostic with the given `severity` and `text`.
    pub fn data(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            category: Category::Data,
            location: Location::default(),
            text: text.into(),
        }
    }

    pub fn with_location(self, location: Location) -> Self {
        Self { location, ..self }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.category != Category::General && !self.location.is_empty() {
            write!(f, "{}: ", self.location)?;
        }
        write!(f, "{}: {}", self.severity, self.text)
    }
}

impl Debug for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self, f)
    }
}

flags! {
    /// Advisories that should be issued at most once per session.
    pub enum Advisory: u8 {
        /// Output in `Z` format has been written.
        ZonedOutput,
    }
}

/// A sink for diagnostics.
///
/// A single [Diagnostics] normally lasts for a whole session of reading or
/// writing data, so that advisories that should appear only once are only
/// issued once.
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub messages: Vec<Diagnostic>,
    issued: FlagSet<Advisory>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        trace!("{diagnostic}");
        self.messages.push(diagnostic);
    }

    /// Adds the diagnostic returned by `f`, if `advisory` has not already been
    /// issued in this session.
    pub fn advise_once<F>(&mut self, advisory: Advisory, f: F)
    where
        F: FnOnce() -> Diagnostic,
    {
        if !self.issued.contains(advisory) {
            self.issued |= advisory;
            self.push(f());
        }
    }

    /// Returns true if `advisory` has been issued.
    pub fn has_advised(&self, advisory: Advisory) -> bool {
        self.issued.contains(advisory)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter()
    }

    /// Returns the number of diagnostics of each severity.
    pub fn counts(&self) -> EnumMap<Severity, usize> {
        let mut counts = EnumMap::default();
        for diagnostic in &self.messages {
            counts[diagnostic.severity] += 1;
        }
        counts
    }

    /// Discards accumulated messages.  Advisories that have already been
    /// issued stay issued.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
