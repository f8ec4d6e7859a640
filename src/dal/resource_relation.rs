// Resource relation manager
// Links a weather camera resource to the weather station next to it

use super::{execute_update, fetch_one};
use crate::driver::ConnectionProvider;
use crate::error::DalError;
use crate::query::{ArgumentList, Transaction};

pub struct ResourceRelationManager<'a> {
    provider: &'a dyn ConnectionProvider,
}

impl<'a> ResourceRelationManager<'a> {
    pub fn new(provider: &'a dyn ConnectionProvider) -> Self {
        Self { provider }
    }

    /// Station resource related to a camera, if any
    pub fn related_station(&self, camera_number: i32) -> Result<Option<i32>, DalError> {
        fetch_one(
            self.provider,
            "SELECT stationNumber FROM resource_relation WHERE cameraNumber = ?",
            ArgumentList::new().int(camera_number),
            |row| row.get::<i32>("stationNumber"),
        )
    }

    /// Relate a camera to a station, replacing any earlier relation
    pub fn set(&self, camera_number: i32, station_number: i32) -> Result<(), DalError> {
        let transaction = Transaction::begin(self.provider)?;
        execute_update(
            &transaction,
            "DELETE FROM resource_relation WHERE cameraNumber = ?",
            ArgumentList::new().int(camera_number),
        )?;
        execute_update(
            &transaction,
            "INSERT INTO resource_relation (cameraNumber, stationNumber) VALUES (?, ?)",
            ArgumentList::new().int(camera_number).int(station_number),
        )?;
        transaction.commit()
    }

    pub fn remove(&self, camera_number: i32) -> Result<bool, DalError> {
        let update = execute_update(
            self.provider,
            "DELETE FROM resource_relation WHERE cameraNumber = ?",
            ArgumentList::new().int(camera_number),
        )?;
        Ok(update.affected > 0)
    }
}
