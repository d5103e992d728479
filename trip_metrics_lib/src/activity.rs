use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    #[default]
    Run,
    Ride,
    Walk,
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityType::Run => write!(f, "Run"),
            ActivityType::Ride => write!(f, "Ride"),
            ActivityType::Walk => write!(f, "Walk"),
        }
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "run" => Ok(ActivityType::Run),
            "ride" => Ok(ActivityType::Ride),
            "walk" => Ok(ActivityType::Walk),
            _ => Err(format!("Unknown activity type: {}", s)),
        }
    }
}
