// Station manager
// Weather stations that forecasting lessons draw their data from

use super::{execute_update, fetch_all, fetch_one};
use crate::driver::{ConnectionProvider, ResultRow};
use crate::error::{DalError, DriverError};
use crate::query::ArgumentList;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    /// Station identifier, e.g. "KPIT"
    pub code: String,
    pub name: String,
    pub state: Option<String>,
}

impl Station {
    pub(crate) fn from_row(row: &ResultRow) -> Result<Self, DriverError> {
        Ok(Self {
            code: row.get("stationCode")?,
            name: row.get("stationName")?,
            state: row.get("state")?,
        })
    }
}

pub struct StationManager<'a> {
    provider: &'a dyn ConnectionProvider,
}

impl<'a> StationManager<'a> {
    pub fn new(provider: &'a dyn ConnectionProvider) -> Self {
        Self { provider }
    }

    pub fn insert(&self, station: &Station) -> Result<(), DalError> {
        match &station.state {
            Some(state) => execute_update(
                self.provider,
                "INSERT INTO forecaster_stations (stationCode, stationName, state) VALUES (?, ?, ?)",
                ArgumentList::new()
                    .text(&station.code)
                    .text(&station.name)
                    .text(state),
            )?,
            None => execute_update(
                self.provider,
                "INSERT INTO forecaster_stations (stationCode, stationName) VALUES (?, ?)",
                ArgumentList::new().text(&station.code).text(&station.name),
            )?,
        };
        Ok(())
    }

    /// Update name and state; returns false when no station has the code
    pub fn update(&self, station: &Station) -> Result<bool, DalError> {
        let update = match &station.state {
            Some(state) => execute_update(
                self.provider,
                "UPDATE forecaster_stations SET stationName = ?, state = ? WHERE stationCode = ?",
                ArgumentList::new()
                    .text(&station.name)
                    .text(state)
                    .text(&station.code),
            )?,
            None => execute_update(
                self.provider,
                "UPDATE forecaster_stations SET stationName = ?, state = NULL WHERE stationCode = ?",
                ArgumentList::new().text(&station.name).text(&station.code),
            )?,
        };
        Ok(update.affected > 0)
    }

    pub fn delete(&self, code: &str) -> Result<bool, DalError> {
        let update = execute_update(
            self.provider,
            "DELETE FROM forecaster_stations WHERE stationCode = ?",
            ArgumentList::new().text(code),
        )?;
        Ok(update.affected > 0)
    }

    pub fn all(&self) -> Result<Vec<Station>, DalError> {
        fetch_all(
            self.provider,
            "SELECT * FROM forecaster_stations",
            ArgumentList::new(),
            Station::from_row,
        )
    }

    pub fn by_state(&self, state: &str) -> Result<Vec<Station>, DalError> {
        fetch_all(
            self.provider,
            "{call sp_getStationsByState(?)}",
            ArgumentList::new().text(state),
            Station::from_row,
        )
    }

    /// Find a station by its name or its code
    pub fn obtain(&self, name_or_code: &str) -> Result<Option<Station>, DalError> {
        fetch_one(
            self.provider,
            "SELECT * FROM forecaster_stations WHERE stationName = ? OR stationCode = ?",
            ArgumentList::new().text(name_or_code).text(name_or_code),
            Station::from_row,
        )
    }

    /// Distinct states with at least one station, sorted
    pub fn states(&self) -> Result<Vec<String>, DalError> {
        let states = fetch_all(
            self.provider,
            "SELECT state FROM forecaster_stations WHERE state IS NOT NULL",
            ArgumentList::new(),
            |row| row.get::<String>("state"),
        )?;
        Ok(states.into_iter().collect::<BTreeSet<_>>().into_iter().collect())
    }
}
