//! Row-mapping contract for SQL-backed entities.
//!
//! [`SqlRecord`] describes how an entity lays out in its table — column
//! names, owned parameter values, row decoding — so the connection manager
//! can build generic CRUD statements without inspecting entity fields.

use rusqlite::Row;
use rusqlite::types::Value;

use strata_core::Entity;

/// An [`Entity`] with a relational row layout.
///
/// Column order contract: statements built from this trait select
/// `ID_COLUMN` first, then `COLUMNS` in declared order, and
/// [`SqlRecord::from_row`] must decode in that order.
pub trait SqlRecord: Entity {
    /// Table name.
    const TABLE: &'static str;

    /// Primary key column.
    const ID_COLUMN: &'static str = "id";

    /// Non-id columns, in declared order.
    const COLUMNS: &'static [&'static str];

    /// Owned parameter values matching `COLUMNS`.
    fn values(&self) -> Vec<Value>;

    /// The identity as a parameter value, or `None` when the engine should
    /// assign one on insert (auto-increment semantics).
    fn id_value(&self) -> Option<Value>;

    /// Convert an identity into a parameter value.
    fn id_param(id: &Self::Id) -> Value;

    /// Decode one row in select order (`ID_COLUMN`, then `COLUMNS`).
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Adopt an engine-assigned rowid after insert. Only called when
    /// [`SqlRecord::id_value`] returned `None`.
    fn assign_rowid(&mut self, rowid: i64);
}

/// `SELECT id, cols... FROM table` for `T`.
pub(crate) fn select_sql<T: SqlRecord>() -> String {
    format!(
        "SELECT {}, {} FROM {}",
        T::ID_COLUMN,
        T::COLUMNS.join(", "),
        T::TABLE
    )
}

/// `INSERT` statement and parameters for one entity. The id column is bound
/// only when the caller assigned an identity.
pub(crate) fn insert_sql<T: SqlRecord>(entity: &T) -> (String, Vec<Value>) {
    let mut columns: Vec<&str> = Vec::with_capacity(T::COLUMNS.len() + 1);
    let mut params: Vec<Value> = Vec::with_capacity(T::COLUMNS.len() + 1);
    if let Some(id) = entity.id_value() {
        columns.push(T::ID_COLUMN);
        params.push(id);
    }
    columns.extend_from_slice(T::COLUMNS);
    params.extend(entity.values());

    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        T::TABLE,
        columns.join(", "),
        placeholders.join(", ")
    );
    (sql, params)
}

/// `UPDATE` statement and parameters for one entity (id bound last).
pub(crate) fn update_sql<T: SqlRecord>(entity: &T) -> (String, Vec<Value>) {
    let assignments: Vec<String> = T::COLUMNS
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{col} = ?{}", i + 1))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?{}",
        T::TABLE,
        assignments.join(", "),
        T::ID_COLUMN,
        T::COLUMNS.len() + 1
    );
    let mut params = entity.values();
    params.push(T::id_param(&entity.id()));
    (sql, params)
}

/// `DELETE` statement for `T`, keyed by id.
pub(crate) fn delete_sql<T: SqlRecord>() -> String {
    format!("DELETE FROM {} WHERE {} = ?1", T::TABLE, T::ID_COLUMN)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
