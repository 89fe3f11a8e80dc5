use std::str::FromStr;

use crate::errors::Error;

/// Defines the target property for animation data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetPath {
    Translation,
    Rotation,
    Scale,
}

impl TargetPath {
    /// Components per keyframe value.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Self::Translation | Self::Scale => 3,
            Self::Rotation => 4,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Translation => "translation",
            Self::Rotation => "rotation",
            Self::Scale => "scale",
        }
    }
}

impl FromStr for TargetPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "translation" => Ok(Self::Translation),
            "rotation" => Ok(Self::Rotation),
            "scale" => Ok(Self::Scale),
            other => Err(Error::UnknownChannelType(other.to_string())),
        }
    }
}
