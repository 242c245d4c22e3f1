pub mod enums;

pub use enums::{AssertionLabel, InvalidEnum, RuleCategory};
