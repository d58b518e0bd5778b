mod adam;
mod group;
mod grouped;
mod rule;
mod state_dict;

pub use adam::{Adam, AdamOptimizer, AdamState, adam_update, bias_corrections, step_size};
pub use group::ParamGroup;
pub use grouped::GroupedOptimizer;
pub use rule::UpdateRule;
pub use state_dict::{GroupRecord, StateDict};
