use std::sync::Arc;

use rhai::{Array, Dynamic, Engine, EvalAltResult, Position};
use serde_json::Value;

use crate::workflows::registration::storage::StoreError;

type RhaiResultOf<T> = Result<T, Box<EvalAltResult>>;

pub const QUERY_FN: &str = "query";
pub const QUERY_ONE_FN: &str = "query_one";

/// A result row keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// Read-only access to the relational store granted to rule scripts.
pub trait ReadQueries: Send + Sync {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError>;

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, StoreError> {
        Ok(self.query(sql, params)?.into_iter().next())
    }
}

fn script_failure(message: String) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(Dynamic::from(message), Position::NONE).into()
}

fn bind_params(params: Array) -> RhaiResultOf<Vec<Value>> {
    params
        .iter()
        .map(|param| {
            rhai::serde::from_dynamic::<Value>(param)
                .map_err(|err| script_failure(format!("unsupported query parameter: {err}")))
        })
        .collect()
}

fn query_rows(queries: &dyn ReadQueries, sql: &str, params: Array) -> RhaiResultOf<Array> {
    let params = bind_params(params)?;
    let rows = queries
        .query(sql, &params)
        .map_err(|err| script_failure(err.to_string()))?;
    rows.into_iter()
        .map(|row| rhai::serde::to_dynamic(Value::Object(row)))
        .collect()
}

fn query_first(queries: &dyn ReadQueries, sql: &str, params: Array) -> RhaiResultOf<Dynamic> {
    let params = bind_params(params)?;
    match queries
        .query_one(sql, &params)
        .map_err(|err| script_failure(err.to_string()))?
    {
        Some(row) => rhai::serde::to_dynamic(Value::Object(row)),
        None => Ok(Dynamic::UNIT),
    }
}

/// Exposes `query(sql[, params])` returning an array of maps and `query_one(sql[, params])`
/// returning a map or `()`. Store failures surface as script runtime errors.
pub(super) fn register(engine: &mut Engine, queries: Arc<dyn ReadQueries>) {
    let store = Arc::clone(&queries);
    engine.register_fn(QUERY_FN, move |sql: &str| {
        query_rows(store.as_ref(), sql, Array::new())
    });

    let store = Arc::clone(&queries);
    engine.register_fn(QUERY_FN, move |sql: &str, params: Array| {
        query_rows(store.as_ref(), sql, params)
    });

    let store = Arc::clone(&queries);
    engine.register_fn(QUERY_ONE_FN, move |sql: &str| {
        query_first(store.as_ref(), sql, Array::new())
    });

    engine.register_fn(QUERY_ONE_FN, move |sql: &str, params: Array| {
        query_first(queries.as_ref(), sql, params)
    });
}
