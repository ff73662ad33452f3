//! Evaluation of definition instances.
//!
//! Evaluating an instance first evaluates each of its bases (recursively,
//! with the same keyword inputs) and then calls the instance's body with:
//!
//! - the values of its directly declared inputs,
//! - the value of each base,
//! - its own directly declared attribute values.
//!
//! A keyword argument named like a base overrides that base: the value is
//! used as is and the base is never evaluated.

use std::collections::BTreeMap;

use tracing::{debug, debug_span, trace};

use crate::config::EvalConfig;
use crate::defn::{Args, CallArgs, Defn};
use crate::error::DefnError;
use crate::token::DefnId;
use crate::value::{Kwargs, Value};

/// Counters collected over one top-level evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalStats {
    /// Definition bodies invoked.
    pub evaluations: usize,
    /// Base results served from the per-call cache.
    pub cache_hits: usize,
    /// Bases skipped because a keyword argument supplied their value.
    pub overrides: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvalConfig,
}

impl Evaluator {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    /// An evaluator configured from `DEFN_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(EvalConfig::from_env())
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn evaluate(&self, defn: &Defn, kwargs: &Kwargs) -> Result<Value, DefnError> {
        self.evaluate_with_stats(defn, kwargs).map(|(value, _)| value)
    }

    /// Positional arguments are never accepted; inputs must be named.
    pub fn invoke(&self, defn: &Defn, args: &CallArgs) -> Result<Value, DefnError> {
        if !args.positional.is_empty() {
            return Err(DefnError::PositionalArgsRejected);
        }
        self.evaluate(defn, &args.keywords)
    }

    pub fn evaluate_with_stats(
        &self,
        defn: &Defn,
        kwargs: &Kwargs,
    ) -> Result<(Value, EvalStats), DefnError> {
        let mut run = Run {
            config: &self.config,
            kwargs,
            cache: Vec::new(),
            stats: EvalStats::default(),
        };
        let value = run.eval(defn)?;
        Ok((value, run.stats))
    }
}

/// State of one top-level call.
struct Run<'a> {
    config: &'a EvalConfig,
    kwargs: &'a Kwargs,
    // Values are not `Hash`, and a call tree holds few distinct bases.
    cache: Vec<(DefnId, BTreeMap<String, Value>, Value)>,
    stats: EvalStats,
}

impl Run<'_> {
    fn eval(&mut self, defn: &Defn) -> Result<Value, DefnError> {
        let span = debug_span!("evaluate", defn = %defn.name());
        let _guard = span.enter();

        let missing: Vec<String> = defn
            .inputs(false)
            .filter(|inpt| !self.kwargs.contains_key(&inpt.name))
            .map(|inpt| inpt.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(DefnError::MissingRequiredInputs {
                defn: defn.name().to_string(),
                missing,
            });
        }

        let mut args: BTreeMap<String, Value> = defn
            .inputs(false)
            .filter_map(|inpt| {
                self.kwargs
                    .get(&inpt.name)
                    .map(|value| (inpt.name.clone(), value.clone()))
            })
            .collect();

        let attributes = defn.values(true);

        for base in defn.bases() {
            if let Some(value) = self.kwargs.get(&base.name) {
                debug!(base = %base.name, "using override");
                self.stats.overrides += 1;
                args.insert(base.name.clone(), value.clone());
                continue;
            }

            let relevant: BTreeMap<String, Value> = base
                .defn
                .attributes(true)
                .filter_map(|attr| {
                    attributes
                        .get(&attr.name)
                        .map(|value| (attr.name.clone(), value.clone()))
                })
                .collect();

            let value = self.eval_base(&base.name, base.defn.id(), relevant, |values| {
                base.defn.instance(values)
            })?;
            args.insert(base.name.clone(), value);
        }

        args.extend(defn.values(false));

        if self.config.trace_arguments {
            for (name, value) in &args {
                trace!(defn = %defn.name(), arg = %name, value = %value, "argument");
            }
        }

        self.stats.evaluations += 1;
        let body = defn.defn_type().body().as_ref();
        body(&Args::new(defn.name(), args))
    }

    fn eval_base(
        &mut self,
        name: &str,
        id: DefnId,
        values: BTreeMap<String, Value>,
        instantiate: impl FnOnce(BTreeMap<String, Value>) -> Result<Defn, DefnError>,
    ) -> Result<Value, DefnError> {
        if self.config.memoize_bases {
            let hit = self
                .cache
                .iter()
                .find(|(cached_id, cached_values, _)| *cached_id == id && *cached_values == values)
                .map(|(_, _, value)| value.clone());
            if let Some(value) = hit {
                debug!(base = %name, "cached");
                self.stats.cache_hits += 1;
                return Ok(value);
            }
        }

        debug!(base = %name, "evaluating base");
        let instance = instantiate(values.clone())?;
        let value = self.eval(&instance)?;

        if self.config.memoize_bases {
            self.cache.push((id, values, value.clone()));
        }
        Ok(value)
    }
}
