use rust_decimal::{
    prelude::{FromPrimitive, ToPrimitive},
    Decimal,
};
use serde::{
    de::{self, MapAccess, Visitor},
    ser, Deserialize, Deserializer, Serialize, Serializer,
};
use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
    str::FromStr,
};

/// Key under which `serde_json` hands over the verbatim text of a number.
const JSON_NUMBER_TOKEN: &str = "$serde_json::private::Number";

/// A flat mapping from field names to the values a rule is evaluated against.
///
/// Any JSON object whose values are strings, numbers or booleans deserializes into a [`Record`].
pub type Record = HashMap<String, Value>;

/// A literal inside a rule, or a value inside a [`Record`].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    String(String),
    Number(Decimal),
    Boolean(bool),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ValueKind {
    String,
    Number,
    Boolean,
}

impl Value {
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Number(_) => ValueKind::Number,
            Self::Boolean(_) => ValueKind::Boolean,
        }
    }
}

impl Display for ValueKind {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        };
        write!(formatter, "{name}")
    }
}

impl Display for Value {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::String(value) => write!(formatter, "{}", quote(value)),
            Self::Number(value) => write!(formatter, "{value}"),
            Self::Boolean(value) => write!(formatter, "{value}"),
        }
    }
}

/// Wrap a string in double quotes, escaping what the lexer treats as special.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Undo the escaping applied inside a quoted literal: a backslash keeps the next character as is.
pub(crate) fn unescape(raw: &str) -> String {
    let mut unescaped = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    unescaped.push(escaped);
                }
            }
            other => unescaped.push(other),
        }
    }
    unescaped
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(Decimal::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(Decimal::from(value))
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::String(value) => serializer.serialize_str(value),
            Self::Boolean(value) => serializer.serialize_bool(*value),
            Self::Number(value) => match value.fract().is_zero().then(|| value.to_i64()) {
                Some(Some(integer)) => serializer.serialize_i64(integer),
                _ => serde_json::Number::from_str(&value.to_string())
                    .map_err(ser::Error::custom)?
                    .serialize(serializer),
            },
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

fn parse_number(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a string, a number or a boolean")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Self::Value, E> {
        Ok(Value::Boolean(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(Value::Number(Decimal::from(value)))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(Value::Number(Decimal::from(value)))
    }

    fn visit_i128<E: de::Error>(self, value: i128) -> Result<Self::Value, E> {
        Decimal::from_i128(value)
            .map(Value::Number)
            .ok_or_else(|| E::custom(format!("number {value} is out of range")))
    }

    fn visit_u128<E: de::Error>(self, value: u128) -> Result<Self::Value, E> {
        Decimal::from_u128(value)
            .map(Value::Number)
            .ok_or_else(|| E::custom(format!("number {value} is out of range")))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        parse_number(&value.to_string())
            .or_else(|| Decimal::from_f64(value))
            .map(Value::Number)
            .ok_or_else(|| E::custom(format!("number {value} is out of range")))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(Value::String(value.to_owned()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
        Ok(Value::String(value))
    }

    /// Numbers `serde_json` could not narrow to an integer or a float arrive with their text.
    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        match map.next_key::<String>()? {
            Some(key) if key == JSON_NUMBER_TOKEN => {
                let text = map.next_value::<String>()?;
                parse_number(&text)
                    .map(Value::Number)
                    .ok_or_else(|| de::Error::custom(format!("number {text} is out of range")))
            }
            _ => Err(de::Error::invalid_type(de::Unexpected::Map, &self)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn can_display_a_string_with_quotes_and_escapes() {
        let value = Value::from(r#"say "hi" \o/"#);

        assert_eq!(r#""say \"hi\" \\o/""#, value.to_string());
    }

    #[test]
    fn unescape_reverses_the_quoting() {
        let value = r#"say "hi" \o/"#;
        let quoted = quote(value);

        assert_eq!(value, unescape(&quoted[1..quoted.len() - 1]));
    }

    #[test]
    fn can_display_numbers_and_booleans() {
        assert_eq!("42", Value::from(42).to_string());
        assert_eq!("4.5", Value::Number(Decimal::new(45, 1)).to_string());
        assert_eq!("false", Value::from(false).to_string());
    }

    #[test]
    fn serialize_integral_numbers_as_integers() {
        assert_eq!(json!(42), serde_json::to_value(Value::from(42)).unwrap());
        assert_eq!(
            json!(4.5),
            serde_json::to_value(Value::Number(Decimal::new(45, 1))).unwrap()
        );
    }

    #[test]
    fn can_deserialize_every_kind() {
        let record: Record =
            serde_json::from_value(json!({"a": 1, "b": 2.5, "c": "x", "d": true, "e": -3}))
                .unwrap();

        assert_eq!(Some(&Value::from(1)), record.get("a"));
        assert_eq!(Some(&Value::Number(Decimal::new(25, 1))), record.get("b"));
        assert_eq!(Some(&Value::from("x")), record.get("c"));
        assert_eq!(Some(&Value::from(true)), record.get("d"));
        assert_eq!(Some(&Value::from(-3)), record.get("e"));
    }

    #[test]
    fn return_an_error_when_deserializing_null_or_lists() {
        assert!(serde_json::from_value::<Value>(json!(null)).is_err());
        assert!(serde_json::from_value::<Value>(json!([1, 2])).is_err());
        assert!(serde_json::from_value::<Record>(json!({"a": {"b": 1}})).is_err());
    }

    #[test]
    fn keep_large_integers_exact() {
        let value = Value::Number(Decimal::from_str("12345678901234567890123").unwrap());

        let text = serde_json::to_string(&value).unwrap();

        assert_eq!("12345678901234567890123", text);
        assert_eq!(value, serde_json::from_str::<Value>(&text).unwrap());
    }

    #[test]
    fn keep_long_fractions_exact() {
        let value = Value::Number(Decimal::from_str("0.1234567890123456789").unwrap());

        let text = serde_json::to_string(&value).unwrap();

        assert_eq!("0.1234567890123456789", text);
        assert_eq!(value, serde_json::from_str::<Value>(&text).unwrap());
        assert_eq!(
            value,
            serde_json::from_value::<Value>(serde_json::to_value(&value).unwrap()).unwrap()
        );
    }

    #[test]
    fn can_deserialize_exponents_and_short_floats_exactly() {
        assert_eq!(
            Value::Number(Decimal::new(15, 0)),
            serde_json::from_str::<Value>("1.5e1").unwrap()
        );
        assert_eq!(
            Value::Number(Decimal::new(1, 1)),
            serde_json::from_str::<Value>("0.1").unwrap()
        );
        assert_eq!(
            Value::Number(Decimal::new(30000000000000004, 17)),
            serde_json::from_value::<Value>(json!(0.30000000000000004)).unwrap()
        );
    }

    #[test]
    fn return_an_error_on_a_number_beyond_the_decimal_range() {
        assert!(serde_json::from_str::<Value>("1e40").is_err());
    }

    #[test]
    fn numbers_compare_by_value_regardless_of_scale() {
        assert_eq!(Value::from(2), Value::Number(Decimal::new(20, 1)));
    }
}
