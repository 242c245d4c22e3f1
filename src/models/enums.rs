use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a string does not name any variant of a closed enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field} value: {value:?}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        $(#[$meta])*
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(
    /// Clinical stance a sentence takes on the finding it mentions.
    AssertionLabel {
        Present => "PRESENT",
        Absent => "ABSENT",
        Possible => "POSSIBLE",
        Conditional => "CONDITIONAL",
    }
);

str_enum!(
    /// Family of lexical cue a trigger rule belongs to.
    ///
    /// Categories carry a total order through [`RuleCategory::priority`]:
    /// conditional cues outrank negation cues, which outrank hedging cues.
    RuleCategory {
        Conditional => "conditional",
        Negation => "negation",
        Possibility => "possibility",
    }
);

impl RuleCategory {
    /// Precedence of the category. Lower value wins.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Conditional => 1,
            Self::Negation => 2,
            Self::Possibility => 3,
        }
    }

    /// Label a rule of this category normally forces.
    pub fn default_label(&self) -> AssertionLabel {
        match self {
            Self::Conditional => AssertionLabel::Conditional,
            Self::Negation => AssertionLabel::Absent,
            Self::Possibility => AssertionLabel::Possible,
        }
    }
}

impl PartialOrd for RuleCategory {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RuleCategory {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority().cmp(&other.priority())
    }
}
