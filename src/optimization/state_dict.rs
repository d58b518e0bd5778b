use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A snapshot of an optimizer, detached from the identity of its parameters.
///
/// Parameters are referred to by their position when iterating every group in order,
/// so a snapshot taken in one process can be loaded into an optimizer built in another,
/// as long as its groups hold parameters of the same shapes in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDict<H, S> {
    pub groups: Vec<GroupRecord<H>>,
    /// The state of every parameter updated at least once, keyed by position.
    pub state: BTreeMap<usize, S>,
}

/// The hyperparameters of a group and the positions of its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord<H> {
    pub hyper: H,
    pub params: Vec<usize>,
}
