// Stored procedures
// A procedure is a named, pre-parsed statement whose `?` placeholders are
// filled from the arguments of a CALL

use super::parser::{ParsedStatement, Query, QueryParser};
use crate::storage::Value;
use anyhow::{anyhow, Result};

#[derive(Debug, Clone)]
pub struct Procedure {
    pub name: String,
    pub body: ParsedStatement,
}

impl Procedure {
    /// Parse a procedure body
    /// Bodies are single statements and may not call other procedures
    pub fn new(name: &str, body_sql: &str) -> Result<Self> {
        let body = QueryParser::parse(body_sql)
            .map_err(|e| anyhow!("Invalid body for procedure '{}': {}", name, e))?;

        if matches!(body.query, Query::Call { .. }) {
            return Err(anyhow!("Procedure '{}' may not call another procedure", name));
        }

        Ok(Self {
            name: name.to_string(),
            body,
        })
    }

    /// Number of arguments a CALL must supply
    pub fn arity(&self) -> usize {
        self.body.parameter_count
    }

    /// Check a CALL's argument values against the procedure's arity
    pub fn bind_arguments(&self, args: Vec<Value>) -> Result<Vec<Value>> {
        if args.len() != self.arity() {
            return Err(anyhow!(
                "Procedure '{}' expects {} argument(s), got {}",
                self.name,
                self.arity(),
                args.len()
            ));
        }
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_comes_from_body_placeholders() {
        let procedure = Procedure::new(
            "sp_getStationDataByIdAndDate",
            "SELECT * FROM forecaster_station_data WHERE stationCode = ? AND dataDate = ?",
        )
        .unwrap();
        assert_eq!(procedure.arity(), 2);
        assert!(procedure.bind_arguments(vec![Value::Null]).is_err());
    }

    #[test]
    fn test_nested_calls_are_rejected() {
        assert!(Procedure::new("sp_outer", "CALL sp_inner(?)").is_err());
    }
}
