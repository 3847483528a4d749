//! `SQLite`-backed store for rules, parameters, catalogs and employees.
//!
//! Uses a single `Mutex<Connection>`; every trait method holds the lock for one statement
//! or one short transaction.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::{Number, Value};
use tracing::{debug, info};

use super::defaults::{DEFAULT_PARAMETERS, DEFAULT_RULES, DOCUMENT_TYPES, POSITIONS};
use super::StoreError;
use crate::workflows::registration::directory::{
    EmployeeDirectory, EmployeeRecord, ProfileLookup, SavedEmployee,
};
use crate::workflows::registration::domain::CodeDescription;
use crate::workflows::registration::parameters::ParameterSource;
use crate::workflows::registration::remote::RegistrationRequest;
use crate::workflows::registration::rules::{RuleDefinition, RuleStore};
use crate::workflows::registration::scripting::{ReadQueries, Row};

/// Idempotent DDL.
const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS validation_script (
    code TEXT PRIMARY KEY,
    rule_set TEXT NOT NULL DEFAULT 'validation',
    body TEXT NOT NULL,
    state INTEGER NOT NULL DEFAULT 1,
    position INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS system_parameter (
    name TEXT PRIMARY KEY,
    content TEXT
);

CREATE TABLE IF NOT EXISTS document_type (
    code TEXT PRIMARY KEY,
    description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS job_position (
    code TEXT PRIMARY KEY,
    description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS employee (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    names TEXT NOT NULL,
    last_names TEXT NOT NULL,
    type_document TEXT NOT NULL,
    document_number TEXT NOT NULL,
    date_of_birth TEXT NOT NULL,
    date_affiliation_company TEXT NOT NULL,
    position TEXT NOT NULL,
    salary TEXT NOT NULL,
    storage_location_report TEXT,
    date_create TEXT NOT NULL DEFAULT (datetime('now')),
    date_update TEXT,
    UNIQUE (type_document, document_number)
);

CREATE INDEX IF NOT EXISTS idx_validation_script_set ON validation_script (rule_set, state, position);
";

const EMPLOYEE_SELECT: &str = "
SELECT e.id, e.names, e.last_names, e.type_document, d.description, e.document_number,
       e.date_of_birth, e.date_affiliation_company, e.position, p.description, e.salary,
       e.storage_location_report
FROM employee e
LEFT JOIN document_type d ON d.code = e.type_document
LEFT JOIN job_position p ON p.code = e.position";

/// Relational store behind every persistence trait of the registration workflow.
///
/// Create with [`SqliteDatabase::open`] for a file-backed store or
/// [`SqliteDatabase::in_memory`] for tests.
pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(CREATE_TABLES)?;
        debug!(path = %path.display(), "opened intake database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Installs catalogs, rules and parameters that are not present yet.
    /// Existing rows are left untouched so operator edits survive restarts.
    pub fn seed_defaults(&self) -> Result<(), StoreError> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        for (code, description) in DOCUMENT_TYPES {
            tx.execute(
                "INSERT OR IGNORE INTO document_type (code, description) VALUES (?1, ?2)",
                params![code, description],
            )?;
        }
        for (code, description) in POSITIONS {
            tx.execute(
                "INSERT OR IGNORE INTO job_position (code, description) VALUES (?1, ?2)",
                params![code, description],
            )?;
        }
        for rule in DEFAULT_RULES {
            tx.execute(
                "INSERT OR IGNORE INTO validation_script (code, rule_set, body, state, position)
                 VALUES (?1, ?2, ?3, 1, ?4)",
                params![rule.id, rule.rule_set, rule.body, rule.position],
            )?;
        }
        for (name, content) in DEFAULT_PARAMETERS {
            tx.execute(
                "INSERT OR IGNORE INTO system_parameter (name, content) VALUES (?1, ?2)",
                params![name, content],
            )?;
        }

        tx.commit()?;
        info!(
            rules = DEFAULT_RULES.len(),
            parameters = DEFAULT_PARAMETERS.len(),
            "default intake data ensured"
        );
        Ok(())
    }

    /// Creates or replaces a rule.
    pub fn install_rule(
        &self,
        id: &str,
        rule_set: &str,
        position: i64,
        body: &str,
        active: bool,
    ) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO validation_script (code, rule_set, body, state, position)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (code) DO UPDATE SET
                rule_set = excluded.rule_set,
                body = excluded.body,
                state = excluded.state,
                position = excluded.position",
            params![id, rule_set, body, active, position],
        )?;
        Ok(())
    }

    pub fn set_parameter(&self, name: &str, content: &str) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO system_parameter (name, content) VALUES (?1, ?2)
             ON CONFLICT (name) DO UPDATE SET content = excluded.content",
            params![name, content],
        )?;
        Ok(())
    }
}

fn resolve_code(conn: &Connection, table: &str, value: &str) -> rusqlite::Result<String> {
    let sql = format!("SELECT code FROM {table} WHERE code = ?1 OR upper(description) = upper(?1)");
    let code = conn
        .query_row(&sql, [value], |row| row.get::<_, String>(0))
        .optional()?;
    Ok(code.unwrap_or_else(|| value.to_string()))
}

fn employee_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EmployeeRecord> {
    Ok(EmployeeRecord {
        id: row.get(0)?,
        names: row.get(1)?,
        last_names: row.get(2)?,
        document_type: CodeDescription {
            code: row.get(3)?,
            description: row.get(4)?,
        },
        document_number: row.get(5)?,
        date_of_birth: row.get(6)?,
        date_affiliation_company: row.get(7)?,
        position: CodeDescription {
            code: row.get(8)?,
            description: row.get(9)?,
        },
        salary: row.get(10)?,
        report_location: row.get(11)?,
    })
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => SqlValue::Integer(integer),
            None => SqlValue::Real(number.as_f64().unwrap_or_default()),
        },
        Value::String(text) => SqlValue::Text(text.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn to_json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(integer) => Value::from(integer),
        ValueRef::Real(real) => Number::from_f64(real).map_or(Value::Null, Value::Number),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(bytes) => Value::String(STANDARD.encode(bytes)),
    }
}

impl ReadQueries for SqliteDatabase {
    /// Only statements that return rows and leave the connection in autocommit mode are
    /// allowed. SQLite reports `BEGIN`, `SAVEPOINT`, `ATTACH` and `DETACH` as read-only,
    /// so `readonly()` alone does not keep scripts away from connection state.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let conn = self.lock_conn()?;
        let records = {
            let mut stmt = conn.prepare(sql)?;
            if !stmt.readonly() || stmt.column_count() == 0 {
                return Err(StoreError::WriteRejected(sql.trim().to_string()));
            }

            let columns: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect();
            let mut rows = stmt.query(params_from_iter(params.iter().map(to_sql_value)))?;

            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                let mut record = Row::new();
                for (index, column) in columns.iter().enumerate() {
                    record.insert(column.clone(), to_json_value(row.get_ref(index)?));
                }
                records.push(record);
            }
            records
        };

        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK")?;
            return Err(StoreError::WriteRejected(sql.trim().to_string()));
        }
        debug!(sql = sql.trim(), rows = records.len(), "rule query executed");
        Ok(records)
    }
}

impl RuleStore for SqliteDatabase {
    fn active_rules(&self, rule_set: &str) -> Result<Vec<RuleDefinition>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT code, body FROM validation_script
             WHERE state = 1 AND rule_set = ?1
             ORDER BY position, code",
        )?;
        let rules = stmt
            .query_map([rule_set], |row| {
                Ok(RuleDefinition {
                    id: row.get(0)?,
                    body: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    fn find_active(&self, id: &str) -> Result<Option<RuleDefinition>, StoreError> {
        let conn = self.lock_conn()?;
        let rule = conn
            .query_row(
                "SELECT code, body FROM validation_script WHERE code = ?1 AND state = 1",
                [id],
                |row| {
                    Ok(RuleDefinition {
                        id: row.get(0)?,
                        body: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(rule)
    }
}

impl ParameterSource for SqliteDatabase {
    fn get_many(&self, names: &[&str]) -> Result<HashMap<String, String>, StoreError> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; names.len()].join(", ");
        let sql =
            format!("SELECT name, content FROM system_parameter WHERE name IN ({placeholders})");
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(names.iter().copied()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?;

        let mut values = HashMap::new();
        for row in rows {
            let (name, content) = row?;
            if let Some(content) = content {
                values.insert(name, content);
            }
        }
        Ok(values)
    }

    fn get_one(&self, name: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock_conn()?;
        let content = conn
            .query_row(
                "SELECT content FROM system_parameter WHERE name = ?1",
                [name],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(content.flatten())
    }
}

impl EmployeeDirectory for SqliteDatabase {
    fn find(&self, lookup: &ProfileLookup) -> Result<Option<EmployeeRecord>, StoreError> {
        let lookup = lookup.normalized();
        if !lookup.is_searchable() {
            return Ok(None);
        }

        let sql = format!(
            "{EMPLOYEE_SELECT}
             WHERE (?1 IS NULL OR e.id = ?1)
               AND ((?2 IS NULL AND ?3 IS NULL)
                    OR (?2 IS NOT NULL AND ?3 IS NOT NULL
                        AND e.document_number = ?3
                        AND (e.type_document = ?2 OR upper(d.description) = upper(?2))))
             LIMIT 1"
        );
        let conn = self.lock_conn()?;
        let record = conn
            .query_row(
                &sql,
                params![lookup.id, lookup.document_type, lookup.document_number],
                employee_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn save(&self, request: &RegistrationRequest) -> Result<SavedEmployee, StoreError> {
        let date_of_birth = request
            .date_of_birth
            .ok_or_else(|| StoreError::InvalidRecord("date of birth is missing".to_string()))?;
        let date_affiliation = request.date_affiliation_company.ok_or_else(|| {
            StoreError::InvalidRecord("company affiliation date is missing".to_string())
        })?;

        let (id, updated) = {
            let conn = self.lock_conn()?;
            let document_type = resolve_code(&conn, "document_type", &request.document_type)?;
            let position = resolve_code(&conn, "job_position", &request.position)?;

            let existing: Option<i64> = conn
                .query_row(
                    "SELECT id FROM employee WHERE type_document = ?1 AND document_number = ?2",
                    params![document_type, request.document_number],
                    |row| row.get(0),
                )
                .optional()?;

            match existing {
                Some(id) => {
                    conn.execute(
                        "UPDATE employee SET names = ?1, last_names = ?2, date_of_birth = ?3,
                            date_affiliation_company = ?4, position = ?5, salary = ?6,
                            date_update = datetime('now')
                         WHERE id = ?7",
                        params![
                            request.names,
                            request.last_names,
                            date_of_birth,
                            date_affiliation,
                            position,
                            request.salary,
                            id
                        ],
                    )?;
                    (id, true)
                }
                None => {
                    conn.execute(
                        "INSERT INTO employee (names, last_names, type_document, document_number,
                            date_of_birth, date_affiliation_company, position, salary)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                        params![
                            request.names,
                            request.last_names,
                            document_type,
                            request.document_number,
                            date_of_birth,
                            date_affiliation,
                            position,
                            request.salary
                        ],
                    )?;
                    (conn.last_insert_rowid(), false)
                }
            }
        };

        let record = self.find(&ProfileLookup::by_id(id))?.ok_or_else(|| {
            StoreError::InvalidRecord(format!("employee {id} missing after save"))
        })?;
        Ok(SavedEmployee { record, updated })
    }

    fn record_report(
        &self,
        document_type: &str,
        document_number: &str,
        location: &str,
    ) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        let document_type = resolve_code(&conn, "document_type", document_type)?;
        let changed = conn.execute(
            "UPDATE employee SET storage_location_report = ?1
             WHERE type_document = ?2 AND document_number = ?3",
            params![location, document_type, document_number],
        )?;
        debug!(changed, location, "recorded report location");
        Ok(())
    }
}
