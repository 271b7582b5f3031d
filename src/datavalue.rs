//! Typed datavalues carried by value snaks.
//!
//! Every datavalue arrives as a `{"type": ..., "value": ...}` pair. The `type` tag alone
//! selects the variant; the declared snak datatype is advisory and never consulted here.

use crate::config::{DEFAULT_GLOBE, MAX_TIME_PRECISION};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

static TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<year>[+-]?\d+?)-(?P<month>\d\d)-(?P<day>\d\d)T(?P<hour>\d\d):(?P<minute>\d\d):(?P<second>\d\d)Z?$",
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    String(String),
    WikibaseEntityId(EntityIdValue),
    WikibaseUnmappedEntityId(UnmappedEntityIdValue),
    Time(Time),
    Quantity(Quantity),
    GlobeCoordinate(GlobeCoordinate),
    MonolingualText(MonolingualText),
}

/// Reference to an item, property or lexeme, normalised to its canonical id ("Q42").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityIdValue {
    pub id: String,
    pub entity_type: String,
    pub numeric_id: Option<u64>,
}

/// Reference to an entity whose type this crate does not model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappedEntityIdValue {
    pub value: String,
    pub entity_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Time {
    pub time: String,
    #[serde(default)]
    pub timezone: i64,
    #[serde(default)]
    pub before: i64,
    #[serde(default)]
    pub after: i64,
    pub precision: u8,
    #[serde(rename = "calendarmodel", default)]
    pub calendar_model: String,
}

/// Components of a time string. Month and day are 0 when unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDateTime {
    pub year: i64,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Quantity {
    pub amount: String,
    #[serde(default = "dimensionless")]
    pub unit: String,
    #[serde(rename = "upperBound", default)]
    pub upper_bound: Option<String>,
    #[serde(rename = "lowerBound", default)]
    pub lower_bound: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GlobeCoordinate {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub precision: Option<f64>,
    #[serde(default = "default_globe")]
    pub globe: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonolingualText {
    pub text: String,
    pub language: String,
}

#[derive(Deserialize)]
struct RawEntityId {
    #[serde(rename = "entity-type", default)]
    entity_type: Option<String>,
    #[serde(rename = "numeric-id", default)]
    numeric_id: Option<u64>,
    #[serde(default)]
    id: Option<String>,
}

fn dimensionless() -> String {
    "1".to_string()
}

fn default_globe() -> String {
    DEFAULT_GLOBE.to_string()
}

fn entity_prefix(entity_type: &str) -> Option<char> {
    match entity_type {
        "item" => Some('Q'),
        "property" => Some('P'),
        "lexeme" => Some('L'),
        _ => None,
    }
}

fn infer_entity_type(id: &str) -> Option<&'static str> {
    let mut chars = id.chars();
    let kind = match chars.next()? {
        'Q' => "item",
        'P' => "property",
        'L' => "lexeme",
        _ => return None,
    };
    // "L1-F2" names a form, not the lexeme itself
    let rest = chars.as_str();
    if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
        Some(kind)
    } else {
        None
    }
}

/// Trailing entity id of an entity IRI ("http://www.wikidata.org/entity/Q2" -> "Q2").
pub fn iri_entity_id(iri: &str) -> Option<&str> {
    let id = iri.rsplit('/').next()?;
    infer_entity_type(id).map(|_| id)
}

fn typed<'a, T: Deserialize<'a>>(kind: &'static str, value: &'a Value) -> Result<T> {
    T::deserialize(value).map_err(|e| Error::MalformedDataValue {
        kind,
        reason: e.to_string(),
    })
}

fn malformed(kind: &'static str, reason: impl Into<String>) -> Error {
    Error::MalformedDataValue {
        kind,
        reason: reason.into(),
    }
}

fn parse_entity_id(value: &Value) -> Result<DataValue> {
    let (id, entity_type, numeric_id) = match value {
        Value::String(id) => (Some(id.clone()), None, None),
        Value::Object(_) => {
            let raw: RawEntityId = typed("wikibase-entityid", value)?;
            (raw.id, raw.entity_type, raw.numeric_id)
        }
        other => return Err(malformed("wikibase-entityid", format!("unexpected value {other}"))),
    };

    let entity_type = match entity_type {
        Some(t) => t,
        None => match id.as_deref().and_then(infer_entity_type) {
            Some(t) => t.to_string(),
            None => {
                return Ok(DataValue::WikibaseUnmappedEntityId(UnmappedEntityIdValue {
                    value: id.unwrap_or_else(|| value.to_string()),
                    entity_type: None,
                }))
            }
        },
    };

    let Some(prefix) = entity_prefix(&entity_type) else {
        return Ok(DataValue::WikibaseUnmappedEntityId(UnmappedEntityIdValue {
            value: id.unwrap_or_else(|| value.to_string()),
            entity_type: Some(entity_type),
        }));
    };

    let id = match (id, numeric_id) {
        (Some(id), _) => id,
        (None, Some(n)) => format!("{prefix}{n}"),
        (None, None) => {
            return Err(malformed(
                "wikibase-entityid",
                "neither `id` nor `numeric-id` is present",
            ))
        }
    };
    let numeric_id = numeric_id.or_else(|| id.get(1..).and_then(|n| n.parse().ok()));

    Ok(DataValue::WikibaseEntityId(EntityIdValue {
        id,
        entity_type,
        numeric_id,
    }))
}

impl UnmappedEntityIdValue {
    fn from_raw(value: &Value) -> Self {
        match value {
            Value::String(s) => Self {
                value: s.clone(),
                entity_type: None,
            },
            _ => Self {
                value: value
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string()),
                entity_type: value
                    .get("entity-type")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
        }
    }
}

impl DataValue {
    /// Parses a raw `{type, value}` datavalue. Unknown tags are errors, never coerced.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .ok_or(Error::MissingKey {
                context: "datavalue",
                key: "type",
            })?;
        let value = raw.get("value").ok_or(Error::MissingKey {
            context: "datavalue",
            key: "value",
        })?;

        match kind {
            "string" => value
                .as_str()
                .map(|s| DataValue::String(s.to_string()))
                .ok_or_else(|| malformed("string", format!("expected a string, found {value}"))),
            "wikibase-entityid" => parse_entity_id(value),
            "wikibase-unmapped-entityid" => Ok(DataValue::WikibaseUnmappedEntityId(
                UnmappedEntityIdValue::from_raw(value),
            )),
            "time" => {
                let time: Time = typed("time", value)?;
                if time.precision > MAX_TIME_PRECISION {
                    return Err(malformed(
                        "time",
                        format!("precision {} out of range 0..=14", time.precision),
                    ));
                }
                Ok(DataValue::Time(time))
            }
            "quantity" => typed("quantity", value).map(DataValue::Quantity),
            "globecoordinate" => typed("globecoordinate", value).map(DataValue::GlobeCoordinate),
            "monolingualtext" => typed("monolingualtext", value).map(DataValue::MonolingualText),
            other => Err(Error::UnknownDataValueType(other.to_string())),
        }
    }

    /// The source `type` tag of this value.
    pub fn value_type(&self) -> &'static str {
        match self {
            DataValue::String(_) => "string",
            DataValue::WikibaseEntityId(_) => "wikibase-entityid",
            DataValue::WikibaseUnmappedEntityId(_) => "wikibase-unmapped-entityid",
            DataValue::Time(_) => "time",
            DataValue::Quantity(_) => "quantity",
            DataValue::GlobeCoordinate(_) => "globecoordinate",
            DataValue::MonolingualText(_) => "monolingualtext",
        }
    }

    pub fn as_entity_id(&self) -> Option<&str> {
        match self {
            DataValue::WikibaseEntityId(v) => Some(&v.id),
            _ => None,
        }
    }
}

impl Time {
    pub fn parsed_datetime(&self) -> Option<ParsedDateTime> {
        let caps = TIME_REGEX.captures(&self.time)?;
        Some(ParsedDateTime {
            year: caps["year"].parse().ok()?,
            month: caps["month"].parse().ok()?,
            day: caps["day"].parse().ok()?,
            hour: caps["hour"].parse().ok()?,
            minute: caps["minute"].parse().ok()?,
            second: caps["second"].parse().ok()?,
        })
    }

    pub fn calendar_model_id(&self) -> Option<&str> {
        iri_entity_id(&self.calendar_model)
    }
}

impl Quantity {
    /// Unit entity id, `None` for dimensionless quantities.
    pub fn unit_id(&self) -> Option<&str> {
        if self.unit == "1" {
            None
        } else {
            iri_entity_id(&self.unit)
        }
    }
}

impl GlobeCoordinate {
    pub fn globe_id(&self) -> Option<&str> {
        iri_entity_id(&self.globe)
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::String(s) => write!(f, "String(value={s})"),
            DataValue::WikibaseEntityId(v) => write!(f, "WikibaseEntityId(id={})", v.id),
            DataValue::WikibaseUnmappedEntityId(v) => {
                write!(f, "WikibaseUnmappedEntityId(value={})", v.value)
            }
            DataValue::Time(t) => write!(f, "Time(time={}, precision={})", t.time, t.precision),
            DataValue::Quantity(q) => write!(f, "Quantity(amount={}, unit={})", q.amount, q.unit),
            DataValue::GlobeCoordinate(g) => write!(
                f,
                "GlobeCoordinate(latitude={}, longitude={})",
                g.latitude, g.longitude
            ),
            DataValue::MonolingualText(m) => write!(
                f,
                "MonolingualText(text={}, language={})",
                m.text, m.language
            ),
        }
    }
}
