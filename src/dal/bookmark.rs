// Bookmark manager
// Saved moments of weather footage, with the camera picture stored as a blob

use super::{execute_update, fetch_all, fetch_one, timestamp_text};
use crate::driver::{ConnectionProvider, ResultRow};
use crate::error::{DalError, DriverError};
use crate::query::ArgumentList;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Assigned by the database on insert
    pub number: Option<i32>,
    pub category_number: i32,
    pub name: String,
    pub created_by: i32,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    /// Encoded image; empty when there is none
    pub camera_picture: Vec<u8>,
    pub notes: String,
}

impl Bookmark {
    fn from_row(row: &ResultRow) -> Result<Self, DriverError> {
        Ok(Self {
            number: Some(row.get("bookmarkNumber")?),
            category_number: row.get("bookmarkCategoryNumber")?,
            name: row.get("name")?,
            created_by: row.get("createdBy")?,
            start_time: row.get("startTime")?,
            end_time: row.get("endTime")?,
            camera_picture: row.get::<Option<Vec<u8>>>("weatherCameraPicture")?.unwrap_or_default(),
            notes: row.get::<Option<String>>("notes")?.unwrap_or_default(),
        })
    }

    fn saved_number(&self) -> Result<i32, DalError> {
        self.number
            .ok_or_else(|| DalError::InvalidData(format!("bookmark '{}' has not been saved", self.name)))
    }
}

pub struct BookmarkManager<'a> {
    provider: &'a dyn ConnectionProvider,
}

impl<'a> BookmarkManager<'a> {
    pub fn new(provider: &'a dyn ConnectionProvider) -> Self {
        Self { provider }
    }

    /// Insert a bookmark; returns its generated number
    pub fn add(&self, bookmark: &Bookmark) -> Result<i32, DalError> {
        let update = execute_update(
            self.provider,
            "INSERT INTO bookmarks (bookmarkCategoryNumber, name, createdBy, startTime, endTime, \
             weatherCameraPicture, notes) VALUES (?, ?, ?, ?, ?, ?, ?)",
            ArgumentList::new()
                .int(bookmark.category_number)
                .text(&bookmark.name)
                .int(bookmark.created_by)
                .text(timestamp_text(bookmark.start_time))
                .text(timestamp_text(bookmark.end_time))
                .binary(bookmark.camera_picture.clone())
                .text(&bookmark.notes),
        )?;
        update.id()
    }

    pub fn update(&self, bookmark: &Bookmark) -> Result<bool, DalError> {
        let number = bookmark.saved_number()?;
        let update = execute_update(
            self.provider,
            "UPDATE bookmarks SET bookmarkCategoryNumber = ?, name = ?, startTime = ?, endTime = ?, \
             weatherCameraPicture = ?, notes = ? WHERE bookmarkNumber = ?",
            ArgumentList::new()
                .int(bookmark.category_number)
                .text(&bookmark.name)
                .text(timestamp_text(bookmark.start_time))
                .text(timestamp_text(bookmark.end_time))
                .binary(bookmark.camera_picture.clone())
                .text(&bookmark.notes)
                .int(number),
        )?;
        Ok(update.affected > 0)
    }

    pub fn remove(&self, number: i32) -> Result<bool, DalError> {
        let update = execute_update(
            self.provider,
            "DELETE FROM bookmarks WHERE bookmarkNumber = ?",
            ArgumentList::new().int(number),
        )?;
        Ok(update.affected > 0)
    }

    /// Remove every bookmark of a category; returns how many were removed
    pub fn remove_by_category(&self, category_number: i32) -> Result<u64, DalError> {
        let update = execute_update(
            self.provider,
            "DELETE FROM bookmarks WHERE bookmarkCategoryNumber = ?",
            ArgumentList::new().int(category_number),
        )?;
        Ok(update.affected)
    }

    pub fn get(&self, number: i32) -> Result<Option<Bookmark>, DalError> {
        fetch_one(
            self.provider,
            "SELECT * FROM bookmarks WHERE bookmarkNumber = ?",
            ArgumentList::new().int(number),
            Bookmark::from_row,
        )
    }

    pub fn all(&self) -> Result<Vec<Bookmark>, DalError> {
        fetch_all(
            self.provider,
            "SELECT * FROM bookmarks",
            ArgumentList::new(),
            Bookmark::from_row,
        )
    }

    pub fn by_category(&self, category_number: i32) -> Result<Vec<Bookmark>, DalError> {
        fetch_all(
            self.provider,
            "SELECT * FROM bookmarks WHERE bookmarkCategoryNumber = ?",
            ArgumentList::new().int(category_number),
            Bookmark::from_row,
        )
    }

    pub fn by_creator(&self, user_number: i32) -> Result<Vec<Bookmark>, DalError> {
        fetch_all(
            self.provider,
            "SELECT * FROM bookmarks WHERE createdBy = ?",
            ArgumentList::new().int(user_number),
            Bookmark::from_row,
        )
    }
}
