// Typed query arguments
// Each argument carries the type it must be bound as, so the binder never
// has to guess from the value

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One argument for a `?` placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypedArgument {
    /// Bytes bound as a binary stream (pictures, files)
    Binary(Vec<u8>),
    Integer(i32),
    Text(String),
    /// Time of day
    Time(NaiveTime),
    /// Calendar date; the query executor does not bind this type
    Date(NaiveDate),
}

/// The type tag of an argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentKind {
    BinaryStream,
    Integer,
    String,
    Time,
    Date,
}

impl fmt::Display for ArgumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgumentKind::BinaryStream => "binary stream",
            ArgumentKind::Integer => "integer",
            ArgumentKind::String => "string",
            ArgumentKind::Time => "time",
            ArgumentKind::Date => "date",
        };
        f.write_str(name)
    }
}

impl TypedArgument {
    pub fn kind(&self) -> ArgumentKind {
        match self {
            TypedArgument::Binary(_) => ArgumentKind::BinaryStream,
            TypedArgument::Integer(_) => ArgumentKind::Integer,
            TypedArgument::Text(_) => ArgumentKind::String,
            TypedArgument::Time(_) => ArgumentKind::Time,
            TypedArgument::Date(_) => ArgumentKind::Date,
        }
    }
}

impl From<i32> for TypedArgument {
    fn from(value: i32) -> Self {
        TypedArgument::Integer(value)
    }
}

impl From<&str> for TypedArgument {
    fn from(value: &str) -> Self {
        TypedArgument::Text(value.to_string())
    }
}

impl From<String> for TypedArgument {
    fn from(value: String) -> Self {
        TypedArgument::Text(value)
    }
}

impl From<NaiveTime> for TypedArgument {
    fn from(value: NaiveTime) -> Self {
        TypedArgument::Time(value)
    }
}

impl From<NaiveDate> for TypedArgument {
    fn from(value: NaiveDate) -> Self {
        TypedArgument::Date(value)
    }
}

impl From<Vec<u8>> for TypedArgument {
    fn from(value: Vec<u8>) -> Self {
        TypedArgument::Binary(value)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseArgumentError {
    #[error("expected KIND:VALUE, got '{0}'")]
    MissingKind(String),

    #[error("unknown argument kind '{0}' (expected int, str, time, date or bin)")]
    UnknownKind(String),

    #[error("invalid {kind} value '{value}'")]
    InvalidValue { kind: &'static str, value: String },
}

/// Parses the `KIND:VALUE` notation used on the command line,
/// e.g. `int:5`, `str:KPIT`, `time:12:30:00`, `date:2024-01-31`, `bin:raw text`
impl FromStr for TypedArgument {
    type Err = ParseArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| ParseArgumentError::MissingKind(s.to_string()))?;

        let invalid = |kind: &'static str| ParseArgumentError::InvalidValue {
            kind,
            value: value.to_string(),
        };

        match kind.to_ascii_lowercase().as_str() {
            "int" | "integer" => value.trim().parse().map(TypedArgument::Integer).map_err(|_| invalid("integer")),
            "str" | "string" => Ok(TypedArgument::Text(value.to_string())),
            "time" => NaiveTime::parse_from_str(value.trim(), crate::storage::TIME_FORMAT)
                .map(TypedArgument::Time)
                .map_err(|_| invalid("time")),
            "date" => NaiveDate::parse_from_str(value.trim(), crate::storage::DATE_FORMAT)
                .map(TypedArgument::Date)
                .map_err(|_| invalid("date")),
            "bin" | "binary" => Ok(TypedArgument::Binary(value.as_bytes().to_vec())),
            other => Err(ParseArgumentError::UnknownKind(other.to_string())),
        }
    }
}

/// Ordered arguments; element i binds to placeholder i + 1
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentList(Vec<TypedArgument>);

impl ArgumentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, argument: impl Into<TypedArgument>) {
        self.0.push(argument.into());
    }

    pub fn int(mut self, value: i32) -> Self {
        self.0.push(TypedArgument::Integer(value));
        self
    }

    pub fn text(mut self, value: impl Into<String>) -> Self {
        self.0.push(TypedArgument::Text(value.into()));
        self
    }

    pub fn time(mut self, value: NaiveTime) -> Self {
        self.0.push(TypedArgument::Time(value));
        self
    }

    pub fn binary(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.0.push(TypedArgument::Binary(value.into()));
        self
    }

    pub fn date(mut self, value: NaiveDate) -> Self {
        self.0.push(TypedArgument::Date(value));
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TypedArgument> {
        self.0.iter()
    }
}

impl From<Vec<TypedArgument>> for ArgumentList {
    fn from(args: Vec<TypedArgument>) -> Self {
        Self(args)
    }
}

impl FromIterator<TypedArgument> for ArgumentList {
    fn from_iter<I: IntoIterator<Item = TypedArgument>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ArgumentList {
    type Item = &'a TypedArgument;
    type IntoIter = std::slice::Iter<'a, TypedArgument>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line_arguments() {
        assert_eq!("int:5".parse::<TypedArgument>(), Ok(TypedArgument::Integer(5)));
        assert_eq!("str:a:b".parse::<TypedArgument>(), Ok(TypedArgument::Text("a:b".into())));
        assert_eq!(
            "time:12:30:00".parse::<TypedArgument>(),
            Ok(TypedArgument::Time(NaiveTime::from_hms_opt(12, 30, 0).unwrap()))
        );
        assert_eq!(
            "date:2024-01-31".parse::<TypedArgument>().map(|a| a.kind()),
            Ok(ArgumentKind::Date)
        );
    }

    #[test]
    fn test_parse_rejects_malformed_arguments() {
        assert!(matches!(
            "5".parse::<TypedArgument>(),
            Err(ParseArgumentError::MissingKind(_))
        ));
        assert!(matches!(
            "float:1.5".parse::<TypedArgument>(),
            Err(ParseArgumentError::UnknownKind(_))
        ));
        assert!(matches!(
            "int:five".parse::<TypedArgument>(),
            Err(ParseArgumentError::InvalidValue { kind: "integer", .. })
        ));
    }

    #[test]
    fn test_builder_keeps_order() {
        let args = ArgumentList::new().text("KPIT").int(3).binary(vec![1u8, 2]);
        let kinds: Vec<ArgumentKind> = args.iter().map(TypedArgument::kind).collect();
        assert_eq!(
            kinds,
            vec![ArgumentKind::String, ArgumentKind::Integer, ArgumentKind::BinaryStream]
        );
    }
}
