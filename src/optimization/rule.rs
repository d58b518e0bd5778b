use std::fmt::Debug;

use ndarray::ArrayD;

use crate::Result;

/// Defines how a parameter is updated from its gradient.
///
/// An `UpdateRule` owns no parameters nor state, a `GroupedOptimizer` stores both and
/// hands them to the rule one parameter at a time.
pub trait UpdateRule {
    /// The hyperparameters shared by every parameter of a group.
    type Hyper: Clone + Debug;

    /// The state kept for every parameter between steps.
    type State;

    /// Checks that the hyperparameters are inside their domain.
    fn validate_hyper(&self, hyper: &Self::Hyper) -> Result<()>;

    /// Creates the state of a parameter on its first update.
    ///
    /// # Arguments
    /// * `param` - The current value of the parameter.
    fn init_state(&self, param: &ArrayD<f32>) -> Self::State;

    /// Checks that an externally provided state fits the parameter it'll be assigned to.
    fn check_state(&self, state: &Self::State, param: &ArrayD<f32>) -> Result<()>;

    /// Updates the state and the parameter in place.
    ///
    /// # Arguments
    /// * `hyper` - The hyperparameters of the parameter's group.
    /// * `state` - The parameter's state.
    /// * `param` - The parameter to update.
    /// * `grad` - A dense gradient with the same shape as `param`.
    fn update(
        &self,
        hyper: &Self::Hyper,
        state: &mut Self::State,
        param: &mut ArrayD<f32>,
        grad: &ArrayD<f32>,
    );
}
