use crate::datavalue::DataValue;
use crate::error::{Error, Result};
use serde_json::Value;
use std::fmt;

/// Whether a snak carries a known value, an unknown value, or asserts no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnakType {
    Value,
    SomeValue,
    NoValue,
}

impl SnakType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "value" => Some(SnakType::Value),
            "somevalue" => Some(SnakType::SomeValue),
            "novalue" => Some(SnakType::NoValue),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SnakType::Value => "value",
            SnakType::SomeValue => "somevalue",
            SnakType::NoValue => "novalue",
        }
    }
}

impl fmt::Display for SnakType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snak {
    pub snaktype: SnakType,
    pub property_id: String,
    /// Declared datatype of the property ("wikibase-item", "url", ...). Advisory only.
    pub datatype: Option<String>,
    /// Present iff `snaktype` is [`SnakType::Value`].
    pub datavalue: Option<DataValue>,
    pub hash: Option<String>,
}

impl Snak {
    pub fn from_value(raw: &Value) -> Result<Self> {
        let property_id = raw
            .get("property")
            .and_then(Value::as_str)
            .ok_or(Error::MissingKey {
                context: "snak",
                key: "property",
            })?;
        let snaktype_str = raw
            .get("snaktype")
            .and_then(Value::as_str)
            .ok_or(Error::MissingKey {
                context: "snak",
                key: "snaktype",
            })?;
        let snaktype = SnakType::parse(snaktype_str).ok_or_else(|| Error::MalformedSnak {
            property: property_id.to_string(),
            reason: format!("unknown snaktype `{snaktype_str}`"),
        })?;

        // somevalue/novalue snaks legitimately carry no datavalue
        let datavalue = match snaktype {
            SnakType::Value => match raw.get("datavalue") {
                Some(dv) if !dv.is_null() => Some(DataValue::from_value(dv)?),
                _ => {
                    return Err(Error::MalformedSnak {
                        property: property_id.to_string(),
                        reason: "snaktype `value` without a datavalue".to_string(),
                    })
                }
            },
            SnakType::SomeValue | SnakType::NoValue => None,
        };

        Ok(Self {
            snaktype,
            property_id: property_id.to_string(),
            datatype: raw
                .get("datatype")
                .and_then(Value::as_str)
                .map(str::to_string),
            datavalue,
            hash: raw.get("hash").and_then(Value::as_str).map(str::to_string),
        })
    }

    /// Source tag of the datavalue, `None` for somevalue/novalue snaks.
    pub fn value_type(&self) -> Option<&'static str> {
        self.datavalue.as_ref().map(DataValue::value_type)
    }
}

impl fmt::Display for Snak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Snak(snaktype={}, property_id={}, datatype={}, datavalue=",
            self.snaktype,
            self.property_id,
            self.datatype.as_deref().unwrap_or("None")
        )?;
        match &self.datavalue {
            Some(dv) => write!(f, "{dv})"),
            None => f.write_str("None)"),
        }
    }
}
