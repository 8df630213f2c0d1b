//! Runs a chain of transformers over a batch of records.
use log::{debug, warn};
use zng::{EngineConfig, ErrorPolicy, TypeContext, Value, ValueRef};

use crate::eval::{Evaluator, Filter};

/// A filter followed by transformers, applied record by record.
///
/// `quiet` results are always dropped. Other error results are handled
/// by the [`ErrorPolicy`].
pub struct Pipeline {
    filter: Option<Filter>,
    chain: Vec<Box<dyn Evaluator>>,
    policy: ErrorPolicy,
}

impl Pipeline {
    pub fn new(chain: Vec<Box<dyn Evaluator>>, policy: ErrorPolicy) -> Self {
        Self {
            filter: None,
            chain,
            policy,
        }
    }

    pub fn from_config(chain: Vec<Box<dyn Evaluator>>, config: &EngineConfig) -> Self {
        Self::new(chain, config.error_policy)
    }

    /// Only records the filter accepts reach the chain.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// The output for one record, or `None` if it is dropped.
    pub fn process(&mut self, ctx: &TypeContext, this: ValueRef<'_>) -> Option<Value> {
        if let Some(filter) = self.filter.as_mut() {
            if !filter.matches(ctx, this) {
                return None;
            }
        }
        let mut out = this.copy();
        for stage in &mut self.chain {
            if out.is_error() {
                break;
            }
            out = stage.eval(ctx, out.view());
        }
        if out.is_quiet() {
            return None;
        }
        if out.is_error() {
            match self.policy {
                ErrorPolicy::Drop => return None,
                ErrorPolicy::Log => {
                    warn!("Dropping error record {out} (input {this}).");
                    return None;
                }
                ErrorPolicy::Emit => {}
            }
        }
        Some(out)
    }

    pub fn run(&mut self, ctx: &TypeContext, batch: &[Value]) -> Vec<Value> {
        let out: Vec<Value> = batch.iter().filter_map(|v| self.process(ctx, v.view())).collect();
        debug!("Pipeline kept {} of {} records.", out.len(), batch.len());
        out
    }
}
