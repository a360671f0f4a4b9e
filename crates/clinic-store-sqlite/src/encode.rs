//! Conversions between [`StoredSample`] and the text columns of `samples`.

use chrono::{DateTime, Utc};
use clinic_core::sample::StoredSample;

use crate::{Error, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn encode_record(record: &StoredSample) -> Result<String> {
  Ok(serde_json::to_string(record)?)
}

pub fn decode_record(key: &str, json: &str) -> Result<StoredSample> {
  let value: serde_json::Value = serde_json::from_str(json)?;
  if !value.is_object() {
    return Err(Error::Corrupt {
      key:     key.to_owned(),
      message: format!("expected a JSON object, found {json:.40}"),
    });
  }
  Ok(serde_json::from_value(value)?)
}
