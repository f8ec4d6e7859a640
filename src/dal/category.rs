// Bookmark category manager
// Lookups run QueryExecution directly and walk its cursor

use super::{execute_update, Update};
use crate::driver::{ConnectionProvider, ResultRow};
use crate::error::{DalError, DriverError};
use crate::query::{ArgumentList, QueryExecution};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkCategory {
    /// Assigned by the database on insert
    pub number: Option<i32>,
    pub name: String,
    pub notes: String,
    pub order_rank: i32,
}

impl BookmarkCategory {
    pub fn new(name: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            number: None,
            name: name.into(),
            notes: notes.into(),
            order_rank: 0,
        }
    }

    fn from_row(row: &ResultRow) -> Result<Self, DriverError> {
        Ok(Self {
            number: Some(row.get("bookmarkCategoryNumber")?),
            name: row.get("name")?,
            notes: row.get::<Option<String>>("notes")?.unwrap_or_default(),
            order_rank: row.get::<Option<i32>>("orderRank")?.unwrap_or_default(),
        })
    }
}

pub struct CategoryManager<'a> {
    provider: &'a dyn ConnectionProvider,
}

impl<'a> CategoryManager<'a> {
    pub fn new(provider: &'a dyn ConnectionProvider) -> Self {
        Self { provider }
    }

    /// Insert a category; returns it with its generated number
    pub fn add(&self, category: &BookmarkCategory) -> Result<BookmarkCategory, DalError> {
        let update = execute_update(
            self.provider,
            "INSERT INTO bookmark_categories (name, notes, orderRank) VALUES (?, ?, ?)",
            ArgumentList::new()
                .text(&category.name)
                .text(&category.notes)
                .int(category.order_rank),
        )?;

        Ok(BookmarkCategory {
            number: Some(update.id()?),
            ..category.clone()
        })
    }

    pub fn update(&self, category: &BookmarkCategory) -> Result<bool, DalError> {
        let number = Self::number(category)?;
        let update = execute_update(
            self.provider,
            "UPDATE bookmark_categories SET name = ?, notes = ?, orderRank = ? WHERE bookmarkCategoryNumber = ?",
            ArgumentList::new()
                .text(&category.name)
                .text(&category.notes)
                .int(category.order_rank)
                .int(number),
        )?;
        Ok(update.affected > 0)
    }

    pub fn delete(&self, category: &BookmarkCategory) -> Result<bool, DalError> {
        let number = Self::number(category)?;
        let Update { affected, .. } = execute_update(
            self.provider,
            "DELETE FROM bookmark_categories WHERE bookmarkCategoryNumber = ?",
            ArgumentList::new().int(number),
        )?;
        Ok(affected > 0)
    }

    /// Every category, ordered by rank
    pub fn all(&self) -> Result<Vec<BookmarkCategory>, DalError> {
        let mut categories = self.query("SELECT * FROM bookmark_categories", ArgumentList::new())?;
        categories.sort_by_key(|c| c.order_rank);
        Ok(categories)
    }

    pub fn by_number(&self, number: i32) -> Result<Option<BookmarkCategory>, DalError> {
        let categories = self.query(
            "SELECT * FROM bookmark_categories WHERE bookmarkCategoryNumber = ?",
            ArgumentList::new().int(number),
        )?;
        Ok(categories.into_iter().next())
    }

    pub fn by_name(&self, name: &str) -> Result<Option<BookmarkCategory>, DalError> {
        let categories = self.query(
            "SELECT * FROM bookmark_categories WHERE name = ?",
            ArgumentList::new().text(name),
        )?;
        Ok(categories.into_iter().next())
    }

    fn query(&self, sql: &str, args: ArgumentList) -> Result<Vec<BookmarkCategory>, DalError> {
        let mut query = QueryExecution::new(sql, args, self.provider);
        let result = Self::read(&mut query);
        query.close();
        result.inspect_err(|e| error!(sql, error = %e, "Category query failed"))
    }

    fn read(query: &mut QueryExecution<'_>) -> Result<Vec<BookmarkCategory>, DalError> {
        query.execute()?;

        let mut list = Vec::new();
        if let Some(cursor) = query.result_set() {
            while let Some(row) = cursor.next_row()? {
                list.push(BookmarkCategory::from_row(&row)?);
            }
        }
        Ok(list)
    }

    fn number(category: &BookmarkCategory) -> Result<i32, DalError> {
        category
            .number
            .ok_or_else(|| DalError::InvalidData(format!("category '{}' has not been saved", category.name)))
    }
}
