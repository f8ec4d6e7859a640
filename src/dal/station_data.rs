// Station data manager
// Key/value observations recorded for a station on a given day

use super::station::Station;
use super::{date_text, fetch_all, fetch_one};
use crate::driver::ConnectionProvider;
use crate::error::DalError;
use crate::query::{ArgumentList, Transaction};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, error};

/// A station together with the data recorded for one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationData {
    pub station: Station,
    pub date: NaiveDate,
    pub data: BTreeMap<String, String>,
}

pub struct StationDataManager<'a> {
    provider: &'a dyn ConnectionProvider,
}

impl<'a> StationDataManager<'a> {
    pub fn new(provider: &'a dyn ConnectionProvider) -> Self {
        Self { provider }
    }

    /// The station with its data for `date`
    /// None when the station does not exist; the map is empty when it has no data
    pub fn get(&self, code: &str, date: NaiveDate) -> Result<Option<StationData>, DalError> {
        let Some(station) = fetch_one(
            self.provider,
            "SELECT * FROM forecaster_stations WHERE stationCode = ?",
            ArgumentList::new().text(code),
            Station::from_row,
        )?
        else {
            return Ok(None);
        };

        let entries = fetch_all(
            self.provider,
            "{call sp_getStationDataByIdAndDate(?, ?)}",
            ArgumentList::new().text(code).text(date_text(date)),
            |row| Ok((row.get::<String>("dataKey")?, row.get::<Option<String>>("dataValue")?)),
        )?;

        let data = entries
            .into_iter()
            .map(|(key, value)| (key, value.unwrap_or_default()))
            .collect();

        Ok(Some(StationData { station, date, data }))
    }

    /// Record every entry of `data` for the station and date
    /// All entries are written or, on any failure, none are
    pub fn add(&self, code: &str, date: NaiveDate, data: &BTreeMap<String, String>) -> Result<usize, DalError> {
        self.add_in_transaction(code, date, data)
            .inspect_err(|e| error!(station = code, %date, error = %e, "Failed to add station data"))
    }

    fn add_in_transaction(
        &self,
        code: &str,
        date: NaiveDate,
        data: &BTreeMap<String, String>,
    ) -> Result<usize, DalError> {
        let transaction = Transaction::begin(self.provider)?;
        let mut statement = transaction.prepare("{call sp_insertStationData(?, ?, ?, ?)}")?;

        statement.bind_string(1, code)?;
        statement.bind_date(2, date)?;
        for (key, value) in data {
            statement.bind_string(3, key)?;
            statement.bind_string(4, value)?;
            statement.execute()?;
        }
        statement.close()?;

        transaction.commit()?;
        debug!(station = code, %date, entries = data.len(), "Added station data");
        Ok(data.len())
    }
}
