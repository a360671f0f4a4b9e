//! Display formatting of field values.
//!
//! Numeric formatting strings follow a small subset of the Python
//! format-spec mini-language: an optional `,` (thousands separator), an
//! optional `.N` (precision) and an optional `d`/`f` type letter. Date
//! formatting strings are `chrono` strftime patterns.

use std::fmt::Write as _;

use crate::{field::FieldDef, value::FieldValue};

/// Render `value` using `field`'s formatting (explicit or kind default).
pub fn format_value(field: &FieldDef, value: &FieldValue) -> String {
  let spec = field.get_formatting();
  match value {
    FieldValue::Int(v) => format_int(*v, spec),
    FieldValue::Float(v) => format_number(*v, spec),
    FieldValue::Date(d) if !spec.is_empty() => {
      let mut out = String::new();
      match write!(out, "{}", d.format(spec)) {
        Ok(()) => out,
        Err(_) => value.to_string(),
      }
    }
    other => other.to_string(),
  }
}

#[derive(Debug, Default, PartialEq)]
struct NumberSpec {
  thousands: bool,
  precision: Option<usize>,
  integer:   bool,
}

fn parse_number_spec(spec: &str) -> NumberSpec {
  let mut out = NumberSpec::default();
  let mut rest = spec;

  if let Some(r) = rest.strip_prefix(',') {
    out.thousands = true;
    rest = r;
  }
  if let Some(r) = rest.strip_prefix('.') {
    let digits: String = r.chars().take_while(char::is_ascii_digit).collect();
    out.precision = digits.parse().ok();
    rest = &r[digits.len()..];
  }
  match rest {
    "d" => out.integer = true,
    "f" if out.precision.is_none() => out.precision = Some(6),
    _ => {}
  }
  out
}

fn format_int(v: i64, spec: &str) -> String {
  let spec = parse_number_spec(spec);
  let mut body = v.unsigned_abs().to_string();
  if let Some(p) = spec.precision
    && !spec.integer
    && p > 0
  {
    body.push('.');
    body.extend(std::iter::repeat_n('0', p));
  }

  let body = if spec.thousands { group_thousands(&body) } else { body };
  if v < 0 { format!("-{body}") } else { body }
}

fn format_number(v: f64, spec: &str) -> String {
  let spec = parse_number_spec(spec);
  let body = match spec.precision {
    Some(p) if !spec.integer => format!("{:.*}", p, v.abs()),
    _ if spec.integer => format!("{:.0}", v.abs().trunc()),
    _ => format!("{}", v.abs()),
  };

  let body = if spec.thousands { group_thousands(&body) } else { body };
  if v.is_sign_negative() && v != 0.0 { format!("-{body}") } else { body }
}

fn group_thousands(body: &str) -> String {
  let (int_part, frac_part) = match body.split_once('.') {
    Some((i, f)) => (i, Some(f)),
    None => (body, None),
  };

  let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
  for (i, c) in int_part.chars().enumerate() {
    if i > 0 && (int_part.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(c);
  }
  match frac_part {
    Some(f) => format!("{grouped}.{f}"),
    None => grouped,
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::{field::FieldKind, sample::DataModality};

  fn field(kind: FieldKind, formatting: Option<&str>) -> FieldDef {
    let mut f = FieldDef::new(DataModality::Static, "x", kind);
    f.formatting = formatting.map(str::to_owned);
    f
  }

  fn int_kind() -> FieldKind { FieldKind::Int { min_value: None, max_value: None, step: None } }

  fn float_kind() -> FieldKind {
    FieldKind::Float { min_value: None, max_value: None, step: None }
  }

  #[test]
  fn ints_group_thousands_by_default() {
    let f = field(int_kind(), None);
    assert_eq!(format_value(&f, &FieldValue::Int(1234567)), "1,234,567");
    assert_eq!(format_value(&f, &FieldValue::Int(-1000)), "-1,000");
    assert_eq!(format_value(&f, &FieldValue::Int(12)), "12");
  }

  #[test]
  fn large_ints_are_exact() {
    let f = field(int_kind(), None);
    assert_eq!(format_value(&f, &FieldValue::Int(9_007_199_254_740_993)), "9,007,199,254,740,993");
    assert_eq!(
      format_value(&f, &FieldValue::Int(i64::MIN)),
      "-9,223,372,036,854,775,808",
    );

    let fixed = field(int_kind(), Some(".2f"));
    assert_eq!(format_value(&fixed, &FieldValue::Int(-5)), "-5.00");
  }

  #[test]
  fn floats_use_two_decimals_by_default() {
    let f = field(float_kind(), None);
    assert_eq!(format_value(&f, &FieldValue::Float(3.14159)), "3.14");
  }

  #[test]
  fn explicit_float_spec() {
    let f = field(float_kind(), Some(",.1f"));
    assert_eq!(format_value(&f, &FieldValue::Float(12345.67)), "12,345.7");
  }

  #[test]
  fn dates_use_strftime() {
    let d = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
    let iso = field(FieldKind::Date { min_value: None, max_value: None }, None);
    assert_eq!(format_value(&iso, &FieldValue::Date(d)), "2024-01-05");

    let custom = field(FieldKind::Date { min_value: None, max_value: None }, Some("%d/%m/%Y"));
    assert_eq!(format_value(&custom, &FieldValue::Date(d)), "05/01/2024");
  }

  #[test]
  fn text_and_binary_are_plain() {
    let f = field(FieldKind::Binary, None);
    assert_eq!(format_value(&f, &FieldValue::Bool(true)), "true");
    let s = field(FieldKind::Str, None);
    assert_eq!(format_value(&s, &FieldValue::Text("note".into())), "note");
  }

  #[test]
  fn number_spec_parsing() {
    assert_eq!(
      parse_number_spec(",.3f"),
      NumberSpec { thousands: true, precision: Some(3), integer: false },
    );
    assert_eq!(
      parse_number_spec(",d"),
      NumberSpec { thousands: true, precision: None, integer: true },
    );
  }
}
