//! Identifier, timestamp and currency newtypes shared by the record model
use crate::error::RequestError;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid7::uuid7;

/// Length of a hex encoded [`RequestId`]: 16 bytes of a uuid7.
pub const REQUEST_ID_LEN: usize = 32;

// Opaque record identifier. Always stored lower-case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(String);

// Directory account of the submitting employee.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Idir(String);

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeStamp(DateTime<Utc>);

/// Non-negative currency amount. Serialised as a JSON number.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cost(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl RequestId {
    /// Mint a new time-ordered identifier
    pub fn generate() -> Self {
        Self(hex::encode(uuid7().as_bytes()))
    }
    /// Format check only; says nothing about whether a record exists.
    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        let well_formed =
            raw.len() == REQUEST_ID_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit());
        if !well_formed {
            return Err(RequestError::MalformedIdentifier(raw.to_owned()));
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Idir {
    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RequestError::validation("idir", "must not be empty"));
        }
        Ok(Self(trimmed.to_owned()))
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TimeStamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        min: u32,
        sec: u32,
    ) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
    /// Storage keeps nanoseconds in an i64, roughly years 1677 to 2262.
    pub fn is_storable(&self) -> bool {
        self.0.timestamp_nanos_opt().is_some()
    }
}

impl Cost {
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }
    pub fn amount(&self) -> Decimal {
        self.0
    }
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(value: DateTime<Utc>) -> Self {
        TimeStamp(value)
    }
}

impl TryFrom<String> for RequestId {
    type Error = RequestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RequestId> for String {
    fn from(value: RequestId) -> Self {
        value.0
    }
}

impl TryFrom<String> for Idir {
    type Error = RequestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Idir> for String {
    fn from(value: Idir) -> Self {
        value.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Idir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<C> minicbor::Encode<C> for RequestId {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.str(&self.0)?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for RequestId {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let raw = d.str()?;

        RequestId::parse(raw)
            .map_err(|_| minicbor::decode::Error::message("stored request id is malformed"))
    }
}

impl<C> minicbor::Encode<C> for Idir {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.str(&self.0)?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Idir {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let raw = d.str()?;

        Idir::parse(raw).map_err(|_| minicbor::decode::Error::message("stored idir is empty"))
    }
}

impl<C> minicbor::Encode<C> for TimeStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

impl<C> minicbor::Encode<C> for Cost {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.0.serialize())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Cost {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let raw: [u8; 16] = d
            .bytes()?
            .try_into()
            .map_err(|_| minicbor::decode::Error::message("decimal must be 16 bytes"))?;

        Ok(Cost(Decimal::deserialize(raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_well_formed_and_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();

        assert_eq!(a.as_str().len(), REQUEST_ID_LEN);
        assert!(RequestId::parse(a.as_str()).is_ok());
        assert_ne!(a, b);
    }

    #[test]
    fn parse_rejects_wrong_length_and_non_hex() {
        assert!(RequestId::parse("111").is_err());
        assert!(RequestId::parse("6453d4371d73f4c66c983618").is_err());
        assert!(RequestId::parse("zz53d4371d73f4c66c9836180000aaaa").is_err());
    }

    #[test]
    fn parse_normalises_case() {
        let id = RequestId::parse("0192F0AB0000700080000000000000FF").unwrap();
        assert_eq!(id.as_str(), "0192f0ab0000700080000000000000ff");
    }

    #[test]
    fn idir_is_trimmed_and_non_empty() {
        assert_eq!(Idir::parse("  ABC ").unwrap().as_str(), "ABC");
        assert!(Idir::parse("   ").is_err());
    }

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::now();

        let encoding = minicbor::to_vec(original).unwrap();
        let decode: TimeStamp = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn timestamps_outside_nanosecond_range_are_not_storable() {
        assert!(TimeStamp::now().is_storable());
        assert!(!TimeStamp::new_with(1600, 4, 5, 0, 0, 0).unwrap().is_storable());
        assert!(!TimeStamp::new_with(2300, 1, 1, 0, 0, 0).unwrap().is_storable());
    }

    #[test]
    fn cost_keeps_exact_scale_through_cbor() {
        let original = Cost::new(Decimal::new(4546, 2));

        let encoding = minicbor::to_vec(original).unwrap();
        let decode: Cost = minicbor::decode(&encoding).unwrap();

        assert_eq!(decode.amount().to_string(), "45.46");
    }

    #[test]
    fn cost_is_a_json_number() {
        let json = serde_json::to_value(Cost::new(Decimal::new(4546, 2))).unwrap();
        assert!(json.is_number());

        let back: Cost = serde_json::from_str("45.46").unwrap();
        assert_eq!(back.amount(), Decimal::new(4546, 2));
    }
}
