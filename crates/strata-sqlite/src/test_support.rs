//! Shared fixtures for the crate's tests.

use rusqlite::Row;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use strata_core::Entity;

use crate::record::SqlRecord;

/// Schema used by manager and repository tests. `name` is unique so batch
/// rollback can be provoked with a duplicate.
pub(crate) const PLAYERS_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS players (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE, level INTEGER NOT NULL)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Player {
    pub id: i64,
    pub name: String,
    pub level: u32,
}

impl Entity for Player {
    type Id = i64;
    const COLLECTION: &'static str = "players";

    fn id(&self) -> i64 {
        self.id
    }
}

impl SqlRecord for Player {
    const TABLE: &'static str = "players";
    const COLUMNS: &'static [&'static str] = &["name", "level"];

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            Value::Integer(i64::from(self.level)),
        ]
    }

    fn id_value(&self) -> Option<Value> {
        // 0 means "let the engine assign".
        (self.id != 0).then_some(Value::Integer(self.id))
    }

    fn id_param(id: &i64) -> Value {
        Value::Integer(*id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            level: row.get(2)?,
        })
    }

    fn assign_rowid(&mut self, rowid: i64) {
        self.id = rowid;
    }
}

pub(crate) fn player(id: i64, name: &str, level: u32) -> Player {
    Player {
        id,
        name: name.into(),
        level,
    }
}
