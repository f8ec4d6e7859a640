// Version manager
// Release history of the application, newest release last

use super::{execute_update, fetch_all, timestamp_text};
use crate::driver::{ConnectionProvider, ResultRow};
use crate::error::{DalError, DriverError};
use crate::query::ArgumentList;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A release, identified by `major.minor.release`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: i32,
    pub minor: i32,
    pub release: i32,
    pub notes: String,
    pub release_date: NaiveDateTime,
}

impl Version {
    fn from_row(row: &ResultRow) -> Result<Self, DriverError> {
        Ok(Self {
            major: row.get("majorVersionNumber")?,
            minor: row.get("minorVersionNumber")?,
            release: row.get("minorReleaseNumber")?,
            notes: row.get::<Option<String>>("releaseNotes")?.unwrap_or_default(),
            release_date: row.get("releaseDate")?,
        })
    }

    /// (major, minor, release), the key versions are ordered by
    pub fn number(&self) -> (i32, i32, i32) {
        (self.major, self.minor, self.release)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.release)
    }
}

/// A parsed `major.minor.release` string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionNumber(pub i32, pub i32, pub i32);

impl FromStr for VersionNumber {
    type Err = DalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DalError::InvalidData(format!("'{}' is not a major.minor.release version", s));

        let parts = s
            .trim()
            .split('.')
            .map(|part| part.parse::<i32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        match parts.as_slice() {
            [major, minor, release] => Ok(VersionNumber(*major, *minor, *release)),
            _ => Err(invalid()),
        }
    }
}

pub struct VersionManager<'a> {
    provider: &'a dyn ConnectionProvider,
}

impl<'a> VersionManager<'a> {
    pub fn new(provider: &'a dyn ConnectionProvider) -> Self {
        Self { provider }
    }

    pub fn insert(&self, version: &Version) -> Result<(), DalError> {
        execute_update(
            self.provider,
            "{call sp_insertVersion(?, ?, ?, ?, ?)}",
            ArgumentList::new()
                .int(version.major)
                .int(version.minor)
                .int(version.release)
                .text(&version.notes)
                .text(timestamp_text(version.release_date)),
        )?;
        Ok(())
    }

    /// Every version, oldest first
    pub fn all(&self) -> Result<Vec<Version>, DalError> {
        let mut versions = fetch_all(
            self.provider,
            "{call sp_getAllVersions()}",
            ArgumentList::new(),
            Version::from_row,
        )?;
        versions.sort_by_key(Version::number);
        Ok(versions)
    }

    pub fn most_recent(&self) -> Result<Option<Version>, DalError> {
        Ok(self.all()?.pop())
    }

    /// Replace the release notes; the notes are all that can change
    pub fn update_notes(&self, version: &Version) -> Result<bool, DalError> {
        let update = execute_update(
            self.provider,
            "{call sp_updateVersionNotes(?, ?, ?, ?)}",
            ArgumentList::new()
                .text(&version.notes)
                .int(version.major)
                .int(version.minor)
                .int(version.release),
        )?;
        Ok(update.affected > 0)
    }

    /// Look up a version by its `major.minor.release` string
    pub fn from_string(&self, version: &str) -> Result<Option<Version>, DalError> {
        let VersionNumber(major, minor, release) = version.parse()?;
        Ok(self
            .all()?
            .into_iter()
            .find(|v| v.number() == (major, minor, release)))
    }
}
