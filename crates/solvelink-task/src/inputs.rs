//! The inputs a task is built from.

use solvelink_core::map_uri;
use solvelink_core::protocol::{NodeRef, SolveArgs, TaskInstance};
use solvelink_discovery::Requirements;

use crate::error::{Result, TaskError};

/// Editable task inputs. Every field takes part in the solve request, so any
/// change supersedes work started from the previous value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskInputs {
    pub algorithm: Option<String>,
    pub format: Option<String>,
    /// `None` selects the legacy default, `"pathfinding"`.
    pub problem_type: Option<String>,
    /// Map text; sent inline as a data URI.
    pub map: Option<String>,
    pub instance: TaskInstance,
}

impl TaskInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_algorithm(&mut self, id: impl Into<String>) {
        self.algorithm = Some(id.into());
    }

    pub fn set_format(&mut self, id: impl Into<String>) {
        self.format = Some(id.into());
    }

    pub fn set_problem_type(&mut self, id: impl Into<String>) {
        self.problem_type = Some(id.into());
    }

    pub fn set_map(&mut self, content: impl Into<String>) {
        self.map = Some(content.into());
    }

    pub fn set_start(&mut self, node: NodeRef) {
        self.instance.start = Some(node);
    }

    pub fn set_end(&mut self, node: NodeRef) {
        self.instance.end = Some(node);
    }

    /// Append a plant; its pour amount starts at zero.
    pub fn add_plant(&mut self, node: NodeRef) {
        self.instance.add_plant(node);
    }

    pub fn remove_plant(&mut self, index: usize) -> Result<NodeRef> {
        let count = self.instance.plants.len();
        self.instance
            .remove_plant(index)
            .ok_or(TaskError::IndexOutOfRange { what: "plant", index, count })
    }

    pub fn set_pour_amount(&mut self, index: usize, amount: f64) -> Result<()> {
        if self.instance.set_pour_amount(index, amount) {
            Ok(())
        } else {
            Err(TaskError::IndexOutOfRange {
                what: "plant",
                index,
                count: self.instance.plants.len(),
            })
        }
    }

    pub fn add_tap(&mut self, node: NodeRef) {
        self.instance.taps.push(node);
    }

    pub fn remove_tap(&mut self, index: usize) -> Result<NodeRef> {
        let count = self.instance.taps.len();
        if index >= count {
            return Err(TaskError::IndexOutOfRange { what: "tap", index, count });
        }
        Ok(self.instance.taps.remove(index))
    }

    pub fn clear_algorithm(&mut self) {
        self.algorithm = None;
    }

    pub fn clear_format(&mut self) {
        self.format = None;
    }

    pub fn clear_problem_type(&mut self) {
        self.problem_type = None;
    }

    pub fn clear_map(&mut self) {
        self.map = None;
    }

    pub fn clear_start(&mut self) {
        self.instance.start = None;
    }

    pub fn clear_end(&mut self) {
        self.instance.end = None;
    }

    pub fn clear_plants(&mut self) {
        self.instance.clear_plants();
    }

    pub fn clear_taps(&mut self) {
        self.instance.taps.clear();
    }

    /// Names of the inputs still needed before a task can run.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.algorithm.is_none() {
            missing.push("algorithm");
        }
        if self.format.is_none() {
            missing.push("format");
        }
        if self.map.is_none() {
            missing.push("map");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    pub fn requirements(&self) -> Option<Requirements> {
        let req = Requirements::new(self.algorithm.clone()?, self.format.clone()?);
        Some(match &self.problem_type {
            Some(p) => req.with_problem_type(p.clone()),
            None => req,
        })
    }

    /// The solve request for the current inputs, if complete.
    pub fn solve_args(&self) -> Option<SolveArgs> {
        Some(SolveArgs {
            format: self.format.clone()?,
            instances: vec![self.instance.normalized()],
            map_uri: map_uri::encode(self.map.as_deref()?),
            algorithm: self.algorithm.clone()?,
        })
    }

    /// Whether going from `before` to `self` removed a placed point. Such
    /// edits invalidate the previous query and trace outright.
    pub(crate) fn cleared_points_since(&self, before: &TaskInputs) -> bool {
        let (old, new) = (&before.instance, &self.instance);
        (old.start.is_some() && new.start.is_none())
            || (old.end.is_some() && new.end.is_none())
            || (!old.plants.is_empty() && new.plants.is_empty())
            || (!old.taps.is_empty() && new.taps.is_empty())
    }
}
