//! Rule script execution on top of an embedded [`rhai`] engine.
//!
//! Each script runs in its own [`Scope`]: the shared `context` and the named extras are
//! pushed in before evaluation and read back afterwards, so mutations made by one script
//! are visible to the next while locals never leak between scripts.

mod capabilities;
mod host;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rhai::{Dynamic, Engine, Scope};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::rules::RuleDefinition;
use crate::config::ScriptingConfig;

pub use capabilities::{ReadQueries, Row, QUERY_FN, QUERY_ONE_FN};
pub use host::{OutcomeLog, RuleHelpers};

/// Name under which the record being processed is visible to scripts.
pub const CONTEXT_BINDING: &str = "context";
/// Separator placed between the outputs of consecutive scripts.
pub const OUTPUT_SEPARATOR: &str = ",";

/// Additional named values bound into every script of a run.
#[derive(Debug, Clone, Default)]
pub struct ScriptExtras {
    values: BTreeMap<String, Dynamic>,
}

impl ScriptExtras {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: Dynamic) -> Self {
        self.insert(name, value);
        self
    }

    /// Names are trimmed; blank names and the reserved context name are skipped.
    pub fn insert(&mut self, name: &str, value: Dynamic) {
        let name = name.trim();
        if name.is_empty() {
            warn!("skipping script extra with a blank name");
            return;
        }
        if name == CONTEXT_BINDING {
            warn!(name, "skipping script extra that would shadow the context");
            return;
        }
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Dynamic> {
        self.values.get(name.trim())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("rule {id} does not compile: {message}")]
    Compile { id: String, message: String },
    #[error("rule {id} failed: {message}")]
    Evaluation { id: String, message: String },
    #[error("context cannot be bound to scripts: {0}")]
    Context(String),
}

/// Evaluates ordered rule scripts against a mutable context.
pub struct ScriptEngine {
    engine: Engine,
}

impl fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptEngine").finish_non_exhaustive()
    }
}

impl ScriptEngine {
    pub fn new(queries: Arc<dyn ReadQueries>, config: ScriptingConfig) -> Self {
        let mut engine = Engine::new();
        engine.set_max_operations(config.max_operations);
        engine.on_print(|text| info!(target: "rule_script", "{text}"));
        engine.on_debug(|text, source, position| {
            debug!(target: "rule_script", source = source.unwrap_or("rule"), %position, "{text}")
        });

        host::register(&mut engine);
        capabilities::register(&mut engine, queries);

        Self { engine }
    }

    /// Runs every script in order. See [`ScriptEngine::run_until`].
    pub fn run<C>(
        &self,
        scripts: &[RuleDefinition],
        context: &mut C,
        extras: &mut ScriptExtras,
    ) -> Option<String>
    where
        C: Serialize + DeserializeOwned,
    {
        self.run_until(scripts, context, extras, || false)
    }

    /// Runs scripts in order, checking `halt` after each one.
    ///
    /// Returns the script outputs joined with [`OUTPUT_SEPARATOR`], or `None` as soon as
    /// any script fails. A script returning unit adds nothing to the join, not even a
    /// placeholder. The context is read back after every script, so mutations made
    /// before a failure are kept. A script that leaves the context in a shape `C` cannot
    /// hold fails like a throwing script, and the last readable context is kept.
    pub fn run_until<C, H>(
        &self,
        scripts: &[RuleDefinition],
        context: &mut C,
        extras: &mut ScriptExtras,
        mut halt: H,
    ) -> Option<String>
    where
        C: Serialize + DeserializeOwned,
        H: FnMut() -> bool,
    {
        let mut shared = match rhai::serde::to_dynamic(&*context) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %ScriptError::Context(err.to_string()), "scripts not run");
                return None;
            }
        };

        let mut outputs = Vec::new();
        for script in scripts {
            let evaluated = self.evaluate(script, &mut shared, extras);
            match rhai::serde::from_dynamic::<C>(&shared) {
                Ok(updated) => *context = updated,
                Err(err) => {
                    let err = ScriptError::Context(err.to_string());
                    warn!(rule = %script.id, error = %err, "rule script left the context unreadable");
                    return None;
                }
            }

            match evaluated {
                Ok(Some(output)) => outputs.push(output),
                Ok(None) => {}
                Err(err) => {
                    warn!(rule = %script.id, error = %err, "rule script aborted the run");
                    return None;
                }
            }
            if halt() {
                debug!(rule = %script.id, "script run halted");
                break;
            }
        }

        Some(outputs.join(OUTPUT_SEPARATOR))
    }

    fn evaluate(
        &self,
        script: &RuleDefinition,
        context: &mut Dynamic,
        extras: &mut ScriptExtras,
    ) -> Result<Option<String>, ScriptError> {
        let ast = self
            .engine
            .compile(&script.body)
            .map_err(|err| ScriptError::Compile {
                id: script.id.clone(),
                message: err.to_string(),
            })?;

        let mut scope = Scope::new();
        scope.push_dynamic(CONTEXT_BINDING, context.clone());
        for (name, value) in &extras.values {
            scope.push_dynamic(name.as_str(), value.clone());
        }

        let evaluated = self.engine.eval_ast_with_scope::<Dynamic>(&mut scope, &ast);

        if let Some(value) = scope.get_value::<Dynamic>(CONTEXT_BINDING) {
            *context = value;
        }
        for (name, value) in extras.values.iter_mut() {
            if let Some(updated) = scope.get_value::<Dynamic>(name) {
                *value = updated;
            }
        }

        let output = evaluated.map_err(|err| ScriptError::Evaluation {
            id: script.id.clone(),
            message: err.to_string(),
        })?;
        debug!(rule = %script.id, "rule script evaluated");

        if output.is_unit() {
            Ok(None)
        } else {
            Ok(Some(output.to_string()))
        }
    }
}
