//! Value objects - Immutable objects defined by their attributes

mod names;
mod reward_key;

pub use names::DisplayName;
pub use reward_key::{RewardKey, RewardKind};
