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

use crate::{
    data::Datum,
    endian::Endian,
    format::{Decimal, Epoch, Format, Settings as FormatSettings, CC},
    message::{Diagnostics, Severity},
    settings::{EndianSettings, Settings},
};

fn format(s: &str) -> Format {
    s.parse().unwrap()
}

fn display(value: impl Into<Datum>, fmt: &str) -> String {
    value.into().display(format(fmt)).to_string()
}

fn display_with(value: impl Into<Datum>, fmt: &str, settings: &Settings) -> String {
    value
        .into()
        .display(format(fmt))
        .with_settings(settings)
        .to_string()
}

fn encode_with(value: impl Into<Datum>, fmt: &str, settings: &Settings) -> (Vec<u8>, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let bytes = value
        .into()
        .display(format(fmt))
        .with_settings(settings)
        .encode(&mut diagnostics);
    (bytes.0, diagnostics)
}

fn big_endian() -> Settings {
    Settings::default().with_endian(EndianSettings::new(Endian::Big))
}

fn epoch_1930() -> Settings {
    Settings::default().with_formats(FormatSettings::default().with_epoch(Epoch(1930)))
}

#[test]
fn f() {
    assert_eq!(display(1.0, "F8.2"), "    1.00");
    assert_eq!(display(-1.5, "F8.2"), "   -1.50");
    assert_eq!(display(123456.0, "F6.0"), "123456");
    assert_eq!(display(1234.5678, "F6.2"), "1234.6");
    assert_eq!(display(12345.678, "F6.2"), " 12346");
    assert_eq!(display(None::<f64>, "F8.2"), "     .  ");
}

#[test]
fn rounding() {
    // 0.125 is exactly halfway, but 0.135 is slightly above halfway in
    // binary.
    assert_eq!(display(0.125, "F5.2"), " 0.12");
    assert_eq!(display(0.135, "F5.2"), " 0.14");

    // 9.995 is slightly below halfway in binary.
    assert_eq!(display(9.995, "F5.2"), " 9.99");

    assert_eq!(display(2.5, "F3.0"), "  2");
    assert_eq!(display(3.5, "F3.0"), "  4");
    assert_eq!(display(-2.5, "F3.0"), " -2");

    // Carrying into a new integer digit drops a decimal place.
    assert_eq!(display(99.996, "F5.2"), "100.0");

    // Zero after rounding has no sign.
    assert_eq!(display(-0.004, "F8.2"), "    0.00");
}

#[test]
fn leading_zeros() {
    let with = Settings::default();
    let without =
        Settings::default().with_formats(FormatSettings::default().with_leading_zero(false));
    for (value, expect_without, expect_with) in [
        (0.5, ["  .50", "   .5"], [" 0.50", "  0.5"]),
        (0.99, ["  .99", "  1.0"], [" 0.99", "  1.0"]),
        (0.01, ["  .01", "   .0"], [" 0.01", "  0.0"]),
        (0.0, ["  .00", "   .0"], [" 0.00", "  0.0"]),
        (-0.0, ["  .00", "   .0"], [" 0.00", "  0.0"]),
        (-0.5, [" -.50", "  -.5"], ["-0.50", " -0.5"]),
        (-0.99, [" -.99", " -1.0"], ["-0.99", " -1.0"]),
        (-0.01, [" -.01", "   .0"], ["-0.01", "  0.0"]),
    ] {
        for (i, fmt) in ["F5.2", "F5.1"].into_iter().enumerate() {
            assert_eq!(display_with(value, fmt, &without), expect_without[i]);
            assert_eq!(display_with(value, fmt, &with), expect_with[i]);
        }
    }
}

#[test]
fn grouping_styles() {
    assert_eq!(display(1234567.891, "COMMA12.2"), "1,234,567.89");
    assert_eq!(display(1234567.891, "DOT12.2"), "1.234.567,89");
    assert_eq!(display(1234.5, "DOLLAR12.2"), "   $1,234.50");
    assert_eq!(display(-5.0, "DOLLAR8.2"), "  -$5.00");
    assert_eq!(display(12.5, "PCT6.1"), " 12.5%");

    // Grouping is dropped before digits are.
    assert_eq!(display(1234567.891, "COMMA9.2"), "1234567.9");

    let comma = Settings::default()
        .with_formats(FormatSettings::default().with_decimal(Decimal::Comma));
    assert_eq!(display_with(1234567.891, "COMMA12.2", &comma), "1.234.567,89");
    assert_eq!(display_with(1234567.891, "DOT12.2", &comma), "1,234,567.89");
    assert_eq!(display_with(1.5, "F8.2", &comma), "    1,50");
}

#[test]
fn scientific_fallback() {
    assert_eq!(display(1e10, "F6.0"), " 1E+10");
    assert_eq!(display(1e20, "F8.2"), "1.00E+20");
    assert_eq!(display(1.5e100, "F8.2"), "1.50+100");
    assert_eq!(display(-1e20, "F8.2"), "-1.0E+20");
}

#[test]
fn e() {
    assert_eq!(display(1234.56, "E10.3"), " 1.235E+03");
    assert_eq!(display(-1234.56, "E10.3"), " -1.23E+03");
    assert_eq!(display(123.0, "E6.0"), " 1E+02");
    assert_eq!(display(1e100, "E10.3"), " 1.000+100");
    assert_eq!(display(0.0, "E10.3"), " 0.000E+00");
    assert_eq!(display(None::<f64>, "E10.3"), "  .       ");
}

#[test]
fn non_ascii_cc() {
    let settings = Settings::default().with_formats(
        FormatSettings::default().with_cc(CC::A, "«,¥,£,»".parse().unwrap()),
    );
    for (value, expected) in [
        (1.0, "   ¥1.00£ "),
        (-1.0, "  «¥1.00£»"),
        (1.5, "   ¥1.50£ "),
        (-1.5, "  «¥1.50£»"),
        (0.75, "    ¥.75£ "),
        (1.5e10, "  1.50E+10"),
        (-1.5e10, " -1.50E+10"),
    ] {
        assert_eq!(display_with(value, "CCA10.2", &settings), expected);
    }

    // Each affix character occupies one byte.
    let (bytes, _) = encode_with(1.0, "CCA10.2", &settings);
    assert_eq!(bytes, b"   \xa51.00\xa3 ");
}

#[test]
fn custom_currency_falls_back_to_comma() {
    // The negative suffix leaves no room for any rendering in this style.
    let settings = Settings::default().with_formats(
        FormatSettings::default().with_cc(CC::B, "------,<,>,------".parse().unwrap()),
    );
    assert_eq!(display_with(1234.0, "CCB8.0", &settings), "   1,234");
    assert_eq!(display_with(1234.0, "CCB20.0", &settings), "       <1,234>      ");
}

#[test]
fn custom_currency_overflow_uses_comma_style() {
    let settings = Settings::default().with_formats(
        FormatSettings::default().with_cc(CC::A, "-.EUR ..".parse().unwrap()),
    );
    assert_eq!(display_with(1234.5, "CCA11.1", &settings), "EUR 1.234,5");
    assert_eq!(display_with(1234.5, "CCA7.1", &settings), "1,234.5");
    assert_eq!(display(1234.5, "COMMA7.1"), "1,234.5");
}

#[test]
fn infinities() {
    assert_eq!(display(f64::INFINITY, "F10.2"), " +Infinity");
    assert_eq!(display(f64::NEG_INFINITY, "F10.2"), " -Infinity");
    assert_eq!(display(f64::NAN, "F5.0"), "  NaN");
    assert_eq!(display(f64::INFINITY, "F2.0"), "**");
}

#[test]
fn n() {
    assert_eq!(display(123.0, "N5"), "00123");
    assert_eq!(display(1.234, "N5.2"), "00123");
    assert_eq!(display(0.0, "N3"), "000");
    assert_eq!(display(1234.0, "N3"), "***");

    let (bytes, diagnostics) = encode_with(-1.0, "N5", &Settings::default());
    assert_eq!(bytes, b"ERROR");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics.messages[0].severity, Severity::Error);

    let (bytes, diagnostics) = encode_with(None::<f64>, "N6", &Settings::default());
    assert_eq!(bytes, b" ERROR");
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn z() {
    let settings = Settings::default();
    let mut diagnostics = Diagnostics::new();
    let mut encode = |value: f64, fmt: &str| {
        Datum::from(value)
            .display(format(fmt))
            .with_settings(&settings)
            .encode(&mut diagnostics)
            .0
    };
    assert_eq!(encode(123.0, "Z3"), [0xf1, 0xf2, 0xf3]);
    assert_eq!(encode(-123.0, "Z3"), [0xf1, 0xf2, 0xd3]);
    assert_eq!(encode(1.5, "Z4.1"), [0xf0, 0xf0, 0xf1, 0xf5]);
    assert_eq!(encode(123.0, "Z2"), b"**");

    // The advisory is issued only once, followed by the error for the value
    // that was too large.
    assert_eq!(diagnostics.len(), 2);
    assert_eq!(diagnostics.messages[0].severity, Severity::Warning);
    assert!(diagnostics.messages[0].text.contains("suspect"));
    assert_eq!(diagnostics.messages[1].severity, Severity::Error);
}

#[test]
fn p() {
    let settings = Settings::default();
    let encode = |value: Option<f64>, fmt: &str| encode_with(value, fmt, &settings).0;
    assert_eq!(encode(Some(123.0), "P2"), [0x12, 0x3f]);
    assert_eq!(encode(Some(-123.0), "P3"), [0x00, 0x12, 0x3d]);
    assert_eq!(encode(Some(1.25), "P3.2"), [0x00, 0x12, 0x5f]);
    assert_eq!(encode(Some(12345.0), "P2"), [0x00, 0x0f]);
    assert_eq!(encode(None, "P2"), [0x00, 0x0f]);
}

#[test]
fn pk() {
    let settings = Settings::default();
    let encode = |value: Option<f64>, fmt: &str| encode_with(value, fmt, &settings).0;
    assert_eq!(encode(Some(123.0), "PK2"), [0x01, 0x23]);
    assert_eq!(encode(Some(-123.0), "PK2"), [0x01, 0x23]);
    assert_eq!(encode(Some(12345.0), "PK2"), [0x00, 0x00]);
}

#[test]
fn ib_and_pib() {
    let big = big_endian();
    let little = Settings::default().with_endian(EndianSettings::new(Endian::Little));
    assert_eq!(encode_with(-2.0, "IB2", &big).0, [0xff, 0xfe]);
    assert_eq!(encode_with(-1.5, "IB2.1", &big).0, [0xff, 0xf1]);
    assert_eq!(encode_with(258.0, "PIB2", &big).0, [0x01, 0x02]);
    assert_eq!(encode_with(258.0, "PIB2", &little).0, [0x02, 0x01]);
    assert_eq!(encode_with(300.0, "PIB1", &big).0, [0x00]);
    assert_eq!(encode_with(-1.0, "PIB1", &big).0, [0x00]);
    assert_eq!(encode_with(40000.0, "IB2", &big).0, [0x00, 0x00]);
    assert_eq!(encode_with(None::<f64>, "IB2", &big).0, [0x00, 0x00]);
}

#[test]
fn rb() {
    let big = big_endian();
    assert_eq!(encode_with(1.0, "RB8", &big).0, 1.0f64.to_be_bytes());
    assert_eq!(encode_with(1.0, "RB4", &big).0, [0x3f, 0xf0, 0x00, 0x00]);
    assert_eq!(
        encode_with(None::<f64>, "RB8", &big).0,
        (-f64::MAX).to_be_bytes()
    );
}

#[test]
fn hex_formats() {
    assert_eq!(display(1.0, "RBHEX16"), "3FF0000000000000");
    assert_eq!(display(1.0, "RBHEX8"), "3FF00000");
    assert_eq!(display(255.0, "PIBHEX4"), "00FF");
    assert_eq!(display(256.0, "PIBHEX2"), "**");
    assert_eq!(display(-1.0, "PIBHEX2"), "**");
}

#[test]
fn strings() {
    assert_eq!(display("abc", "A5"), "abc  ");
    assert_eq!(display("abcdef", "A3"), "abc");
    assert_eq!(display("ABC", "AHEX6"), "414243");
    assert_eq!(display("ABC", "AHEX4"), "4142");
    assert_eq!(display("A", "AHEX4"), "4120");
}

#[test]
fn type_mismatch() {
    let (bytes, diagnostics) = encode_with("abc", "F8.2", &Settings::default());
    assert_eq!(bytes, b"   ERROR");
    assert_eq!(diagnostics.messages[0].severity, Severity::Error);
    assert!(diagnostics.messages[0].text.contains("string"));

    let (bytes, diagnostics) = encode_with(1.0, "A8", &Settings::default());
    assert_eq!(bytes, b"   ERROR");
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn wkday_and_month() {
    assert_eq!(display(1.0, "WKDAY9"), "SUNDAY   ");
    assert_eq!(display(4.5, "WKDAY3"), "WED");
    assert_eq!(display(2.0, "MONTH3"), "FEB");
    assert_eq!(display(12.0, "MONTH9"), "DECEMBER ");
    assert_eq!(display(8.0, "WKDAY9"), "    ERROR");
    assert_eq!(display(13.0, "MONTH3"), "***");
    assert_eq!(display(0.0, "MONTH5"), "ERROR");
}

/// Seconds since the epoch for 1 January 2000.
const Y2K: f64 = 152385.0 * 86400.0;

#[test]
fn dates() {
    let settings = epoch_1930();
    let noon = Y2K + 12.0 * 3600.0 + 34.0 * 60.0 + 56.0;
    for (value, fmt, expected) in [
        (Y2K, "DATE11", "01-JAN-2000"),
        (Y2K, "DATE9", "01-JAN-00"),
        (Y2K, "ADATE10", "01/01/2000"),
        (Y2K, "ADATE8", "01/01/00"),
        (Y2K, "EDATE10", "01.01.2000"),
        (Y2K, "SDATE10", "2000/01/01"),
        (Y2K, "JDATE7", "2000001"),
        (Y2K, "JDATE5", "00001"),
        (Y2K, "QYR8", "1 Q 2000"),
        (Y2K, "MOYR8", "JAN 2000"),
        (Y2K, "WKYR10", " 1 WK 2000"),
        (noon, "DATETIME20", "01-JAN-2000 12:34:56"),
        (noon, "DATETIME17", "01-JAN-2000 12:34"),
        (noon + 0.5, "DATETIME23.2", "01-JAN-2000 12:34:56.50"),
        (noon, "YMDHMS19", "2000-01-01 12:34:56"),
        (noon, "DATE11", "01-JAN-2000"),
    ] {
        assert_eq!(display_with(value, fmt, &settings), expected, "{fmt}");
    }
}

#[test]
fn date_edge_cases() {
    // Two-digit years must fall within the century after the epoch.
    let late = Settings::default().with_formats(FormatSettings::default().with_epoch(Epoch(2010)));
    assert_eq!(display_with(Y2K, "DATE9", &late), "*********");
    assert_eq!(display_with(Y2K, "DATE11", &late), "01-JAN-2000");

    assert_eq!(display(-1.0, "DATE11"), "          .");

    // 15 October 1582 is the first day of the Gregorian calendar.
    assert_eq!(display(86400.0, "SDATE10"), "1582/10/15");
}

#[test]
fn times() {
    let time = 3600.0 + 2.0 * 60.0 + 5.0;
    assert_eq!(display(time, "TIME8"), "01:02:05");
    assert_eq!(display(time, "TIME5"), "01:02");
    assert_eq!(display(-time, "TIME9"), "-01:02:05");
    assert_eq!(display(-time, "TIME8"), "  -01:02");
    assert_eq!(display(time + 0.25, "TIME11.2"), "01:02:05.25");

    let dtime = 86400.0 + 2.0 * 3600.0 + 3.0 * 60.0 + 4.0;
    assert_eq!(display(dtime, "DTIME11"), " 1 02:03:04");

    assert_eq!(display(125.5, "MTIME8.2"), "02:05.50");
    assert_eq!(display(125.0, "MTIME5"), "02:05");

    let comma = Settings::default()
        .with_formats(FormatSettings::default().with_decimal(Decimal::Comma));
    assert_eq!(display_with(125.5, "MTIME8.2", &comma), "02:05,50");
}

#[test]
fn seconds_width_thresholds() {
    // 13/32 of a second avoids ties at every precision used below.
    let time = 3600.0 + 2.0 * 60.0 + 5.40625;
    for (fmt, expected) in [
        ("TIME5", "01:02"),
        ("TIME7", "  01:02"),
        ("TIME8", "01:02:05"),
        ("TIME9", " 01:02:05"),
        ("TIME10", "  01:02:05"),
        ("TIME10.1", "01:02:05.4"),
        ("TIME12.2", " 01:02:05.41"),
        ("TIME12.3", "01:02:05.406"),
    ] {
        assert_eq!(display(time, fmt), expected, "{fmt}");
    }

    let dtime = 86400.0 + 2.0 * 3600.0 + 3.0 * 60.0 + 4.40625;
    for (fmt, expected) in [
        ("DTIME8", " 1 02:03"),
        ("DTIME10", "1 02:03:04"),
        ("DTIME11", " 1 02:03:04"),
        ("DTIME12", "  1 02:03:04"),
        ("DTIME13.1", " 1 02:03:04.4"),
        ("DTIME15.3", " 1 02:03:04.406"),
    ] {
        assert_eq!(display(dtime, fmt), expected, "{fmt}");
    }

    let datetime = Y2K + 12.0 * 3600.0 + 34.0 * 60.0 + 56.40625;
    for (fmt, expected) in [
        ("DATETIME17", "01-JAN-2000 12:34"),
        ("DATETIME19", "  01-JAN-2000 12:34"),
        ("DATETIME20", "01-JAN-2000 12:34:56"),
        ("DATETIME21", " 01-JAN-2000 12:34:56"),
        ("DATETIME22", "  01-JAN-2000 12:34:56"),
        ("DATETIME22.1", "01-JAN-2000 12:34:56.4"),
        ("DATETIME24.3", "01-JAN-2000 12:34:56.406"),
    ] {
        assert_eq!(display(datetime, fmt), expected, "{fmt}");
    }
}

#[test]
fn seconds_carry() {
    assert_eq!(display(59.999, "TIME11.2"), "00:01:00.00");
    assert_eq!(display(-59.999, "TIME11.2"), "-00:01:00.0");
    assert_eq!(display(59.6, "TIME8"), "00:01:00");
    assert_eq!(display(3599.7, "TIME8"), "01:00:00");
    assert_eq!(display(86399.6, "DTIME11"), " 1 00:00:00");
    assert_eq!(display(Y2K + 59.999, "DATETIME23.2"), "01-JAN-2000 00:01:00.00");
    assert_eq!(display(Y2K + 86399.6, "DATETIME20"), "02-JAN-2000 00:00:00");

    // Without room for seconds, the minutes are not rounded up.
    assert_eq!(display(59.6, "TIME5"), "00:00");
}

#[test]
fn encode_width_matches_format() {
    let settings = epoch_1930();
    for (value, fmt) in [
        (1.0, "F1.0"),
        (1e300, "F40.16"),
        (-1e-300, "COMMA6.2"),
        (Y2K, "DATETIME40.5"),
        (1e30, "DOLLAR4.0"),
        (1e30, "PCT2.0"),
        (Y2K, "WKYR8"),
    ] {
        let (bytes, _) = encode_with(value, fmt, &settings);
        assert_eq!(bytes.len(), format(fmt).w(), "{fmt}");
    }
}
