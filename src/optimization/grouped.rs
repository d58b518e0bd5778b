use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, trace, warn};

use super::{GroupRecord, ParamGroup, StateDict, UpdateRule};
use crate::{
    OptimErr, Result,
    storage::StateStore,
    tensor::{Gradient, ParamId, ParamSlot, Parameter, ops},
};

/// Runs an `UpdateRule` over groups of parameters, keeping the state of each of them.
///
/// Every group carries its own hyperparameters, groups added without explicit ones use
/// the optimizer's defaults. A parameter may only belong to one group.
pub struct GroupedOptimizer<R: UpdateRule> {
    rule: R,
    defaults: R::Hyper,
    groups: Vec<ParamGroup<R::Hyper>>,
    state: StateStore<R::State>,
}

impl<R: UpdateRule> GroupedOptimizer<R> {
    /// Creates a new `GroupedOptimizer` with a single parameter group.
    ///
    /// # Arguments
    /// * `rule` - The update rule to apply on every step.
    /// * `params` - The parameters of the first group.
    /// * `defaults` - The hyperparameters of the first group and of the groups added later
    ///   through `add_param_group`.
    ///
    /// # Returns
    /// An error if `defaults` is invalid or if `params` contains the same parameter twice.
    pub fn new(rule: R, params: Vec<Parameter>, defaults: R::Hyper) -> Result<Self> {
        rule.validate_hyper(&defaults)?;

        let mut optimizer = Self {
            rule,
            defaults: defaults.clone(),
            groups: Vec::new(),
            state: StateStore::new(),
        };

        optimizer.push_group(params, defaults)?;
        Ok(optimizer)
    }

    /// Adds a new parameter group using the default hyperparameters.
    ///
    /// # Returns
    /// A `DuplicateParameter` error if any of the parameters is already tracked.
    pub fn add_param_group(&mut self, params: Vec<Parameter>) -> Result<()> {
        let hyper = self.defaults.clone();
        self.push_group(params, hyper)
    }

    /// Adds a new parameter group with its own hyperparameters.
    ///
    /// # Returns
    /// An error if `hyper` is invalid or if any of the parameters is already tracked.
    pub fn add_param_group_with(&mut self, params: Vec<Parameter>, hyper: R::Hyper) -> Result<()> {
        self.rule.validate_hyper(&hyper)?;
        self.push_group(params, hyper)
    }

    fn push_group(&mut self, params: Vec<Parameter>, hyper: R::Hyper) -> Result<()> {
        let mut seen: HashSet<ParamId> = self.params().map(Parameter::id).collect();

        if let Some(dup) = params.iter().find(|param| !seen.insert(param.id())) {
            return Err(OptimErr::DuplicateParameter { param: dup.id() });
        }

        debug!(group = self.groups.len(), params = params.len(); "added parameter group");
        self.groups.push(ParamGroup::new(params, hyper));
        Ok(())
    }

    pub fn defaults(&self) -> &R::Hyper {
        &self.defaults
    }

    pub fn param_groups(&self) -> &[ParamGroup<R::Hyper>] {
        &self.groups
    }

    /// Replaces the hyperparameters of a group, taking effect on the next step.
    ///
    /// # Arguments
    /// * `group` - The index of the group, in insertion order.
    /// * `hyper` - The new hyperparameters.
    pub fn set_group_hyper(&mut self, group: usize, hyper: R::Hyper) -> Result<()> {
        self.rule.validate_hyper(&hyper)?;

        let groups = self.groups.len();
        let Some(target) = self.groups.get_mut(group) else {
            return Err(OptimErr::NoSuchGroup { group, groups });
        };

        target.set_hyper(hyper);
        Ok(())
    }

    fn params(&self) -> impl Iterator<Item = &Parameter> {
        self.groups.iter().flat_map(|group| group.params())
    }

    /// Returns the state of a parameter, `None` if it was never updated.
    pub fn state(&self, id: ParamId) -> Option<&R::State> {
        self.state.get(id)
    }

    /// Detaches the gradient of every tracked parameter.
    pub fn zero_grad(&self) {
        self.params().for_each(Parameter::clear_grad);
    }

    /// Updates every parameter that has a gradient attached.
    ///
    /// Parameters without a gradient are skipped. A parameter with a sparse gradient is
    /// left untouched, the rest are still updated.
    ///
    /// # Returns
    /// The first `UnsupportedGradientFormat` error found, if any.
    pub fn step(&mut self) -> Result<()> {
        self.update_all()
    }

    /// Calls `closure` to reevaluate the loss and then updates every parameter as `step` does.
    ///
    /// The closure runs exactly once, before any parameter is touched, so it may
    /// recompute the gradients the update will use.
    ///
    /// # Returns
    /// The loss returned by `closure`, or the first error found while updating.
    pub fn step_with<F>(&mut self, closure: F) -> Result<f32>
    where
        F: FnOnce() -> f32,
    {
        let loss = closure();
        self.update_all()?;
        Ok(loss)
    }

    /// Fallible variant of `step_with`, no parameter is touched if `closure` fails.
    pub fn try_step_with<F, E>(&mut self, closure: F) -> std::result::Result<f32, E>
    where
        F: FnOnce() -> std::result::Result<f32, E>,
        E: From<OptimErr>,
    {
        let loss = closure()?;
        self.update_all()?;
        Ok(loss)
    }

    fn update_all(&mut self) -> Result<()> {
        let mut first_err = None;
        let mut updated = 0;

        for (idx, group) in self.groups.iter().enumerate() {
            for param in group.params() {
                match update_param(&self.rule, group.hyper(), &mut self.state, param) {
                    Ok(true) => updated += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(group = idx, param = param.id().get(); "rejected update: {e}");
                        first_err.get_or_insert(e);
                    }
                }
            }
        }

        trace!(updated = updated; "step finished");
        first_err.map_or(Ok(()), Err)
    }
}

fn update_param<R: UpdateRule>(
    rule: &R,
    hyper: &R::Hyper,
    store: &mut StateStore<R::State>,
    param: &Parameter,
) -> Result<bool> {
    let mut slot = param.write();
    let ParamSlot { value, grad } = &mut *slot;

    let grad = match grad {
        Some(Gradient::Dense(grad)) => grad,
        Some(Gradient::Sparse(sparse)) => {
            debug!(param = param.id().get(), nnz = sparse.nnz(); "sparse gradient attached");
            return Err(OptimErr::UnsupportedGradientFormat { param: param.id() });
        }
        None => return Ok(false),
    };

    ops::ensure_same_shape("gradient", grad.shape(), value.shape())?;

    let state = store.get_or_insert_with(param.id(), || rule.init_state(value));
    rule.update(hyper, state, value, grad);

    trace!(param = param.id().get(); "updated parameter");
    Ok(true)
}

impl<R> GroupedOptimizer<R>
where
    R: UpdateRule,
    R::State: Clone,
{
    /// Takes a snapshot of the hyperparameters and of the state of every parameter.
    pub fn state_dict(&self) -> StateDict<R::Hyper, R::State> {
        let mut position = 0;
        let mut groups = Vec::with_capacity(self.groups.len());
        let mut state = BTreeMap::new();

        for group in &self.groups {
            let mut params = Vec::with_capacity(group.params().len());

            for param in group.params() {
                if let Some(s) = self.state.get(param.id()) {
                    state.insert(position, s.clone());
                }

                params.push(position);
                position += 1;
            }

            groups.push(GroupRecord {
                hyper: group.hyper().clone(),
                params,
            });
        }

        StateDict { groups, state }
    }

    /// Replaces the hyperparameters of every group and the state of every parameter.
    ///
    /// The snapshot's groups are matched with this optimizer's groups in order, and the
    /// parameters within them by position. Nothing is modified unless the whole snapshot
    /// fits.
    ///
    /// # Arguments
    /// * `dict` - A snapshot taken with `state_dict`.
    ///
    /// # Returns
    /// A `StateDictMismatch` error if the groups don't line up, or the rule's own error if
    /// any of the hyperparameters or states doesn't fit.
    pub fn load_state_dict(&mut self, dict: StateDict<R::Hyper, R::State>) -> Result<()> {
        if dict.groups.len() != self.groups.len() {
            return Err(OptimErr::StateDictMismatch(format!(
                "got {} groups, expected {}",
                dict.groups.len(),
                self.groups.len()
            )));
        }

        let mut by_position = HashMap::new();

        for (idx, (record, group)) in dict.groups.iter().zip(&self.groups).enumerate() {
            if record.params.len() != group.params().len() {
                return Err(OptimErr::StateDictMismatch(format!(
                    "group {idx} has {} parameters, expected {}",
                    record.params.len(),
                    group.params().len()
                )));
            }

            self.rule.validate_hyper(&record.hyper)?;
            by_position.extend(record.params.iter().copied().zip(group.params()));
        }

        let mut loaded = Vec::with_capacity(dict.state.len());

        for (position, state) in dict.state {
            let Some(param) = by_position.get(&position) else {
                return Err(OptimErr::StateDictMismatch(format!(
                    "there's no parameter at position {position}"
                )));
            };

            self.rule.check_state(&state, &param.value())?;
            loaded.push((param.id(), state));
        }

        self.state.clear();
        for (id, state) in loaded {
            self.state.insert(id, state);
        }

        for (group, record) in self.groups.iter_mut().zip(dict.groups) {
            group.set_hyper(record.hyper);
        }

        debug!(groups = self.groups.len(), states = self.state.len(); "loaded state dict");
        Ok(())
    }
}
