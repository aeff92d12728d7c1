//! Sequential step runner for multi-step operations
//!
//! A [`Pipeline`] threads one typed value through named steps. Each step
//! consumes the previous step's output and produces the next one, so a
//! step's inputs are exactly what earlier steps established. The first
//! failing step stops the pipeline; its error gets the operation's failure
//! note (for example `failed editing document`) and nothing after it runs.
//!
//! ```ignore
//! let record = Pipeline::new("edit", "failed editing document", data)
//!     .guard("test", |data| collection.require_one(query))?
//!     .then("get", |data| Ok((data, collection.get(query)?)))?
//!     .finish();
//! ```

use tracing::debug;

use myelin_core::{Error, Result};

/// Named steps run strictly in order over a typed value
#[derive(Debug)]
pub struct Pipeline<T> {
    operation: &'static str,
    failure: &'static str,
    steps: Vec<&'static str>,
    value: T,
}

impl<T> Pipeline<T> {
    /// Start a pipeline for `operation` holding `value`
    ///
    /// `failure` is the note attached to whichever step fails.
    pub fn new(operation: &'static str, failure: &'static str, value: T) -> Self {
        debug!(target: "myelin::pipeline", operation, "pipeline started");
        Self {
            operation,
            failure,
            steps: Vec::new(),
            value,
        }
    }

    /// Run an effect step that transforms the carried value
    pub fn then<U, F>(self, step: &'static str, f: F) -> Result<Pipeline<U>>
    where
        F: FnOnce(T) -> Result<U>,
    {
        debug!(target: "myelin::pipeline", operation = self.operation, step, "running step");
        match f(self.value) {
            Ok(value) => {
                let mut steps = self.steps;
                steps.push(step);
                Ok(Pipeline {
                    operation: self.operation,
                    failure: self.failure,
                    steps,
                    value,
                })
            }
            Err(e) => Err(Self::fail_with(self.operation, self.failure, step, e)),
        }
    }

    /// Run a guard step that only inspects the carried value
    pub fn guard<F>(mut self, step: &'static str, f: F) -> Result<Self>
    where
        F: FnOnce(&T) -> Result<()>,
    {
        debug!(target: "myelin::pipeline", operation = self.operation, step, "running guard");
        match f(&self.value) {
            Ok(()) => {
                self.steps.push(step);
                Ok(self)
            }
            Err(e) => Err(Self::fail_with(self.operation, self.failure, step, e)),
        }
    }

    /// Carried value
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Steps completed so far, in order
    pub fn steps(&self) -> &[&'static str] {
        &self.steps
    }

    /// End the pipeline and take the carried value
    pub fn finish(self) -> T {
        debug!(
            target: "myelin::pipeline",
            operation = self.operation,
            steps = self.steps.len(),
            "pipeline finished"
        );
        self.value
    }

    fn fail_with(
        operation: &'static str,
        failure: &'static str,
        step: &'static str,
        error: Error,
    ) -> Error {
        debug!(
            target: "myelin::pipeline",
            operation,
            step,
            error = %error,
            "step failed"
        );
        error.remind(failure)
    }
}
