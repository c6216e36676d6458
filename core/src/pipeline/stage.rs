use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

use super::state::PipelineState;

/// One phase of the content pipeline. Stages can be revisited in any order;
/// `requires` only describes which prior outputs a stage consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Planning,
    Scripting,
    Visuals,
    Video,
    Expansion,
    CardNews,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Planning,
        Stage::Scripting,
        Stage::Visuals,
        Stage::Video,
        Stage::Expansion,
        Stage::CardNews,
    ];

    /// 1-based position in the workflow.
    pub fn order(self) -> u8 {
        match self {
            Self::Planning => 1,
            Self::Scripting => 2,
            Self::Visuals => 3,
            Self::Video => 4,
            Self::Expansion => 5,
            Self::CardNews => 6,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Scripting => "scripting",
            Self::Visuals => "visuals",
            Self::Video => "video",
            Self::Expansion => "expansion",
            Self::CardNews => "cards",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Planning => "Planning & Analysis",
            Self::Scripting => "Script & Audio",
            Self::Visuals => "Visual Generation",
            Self::Video => "Video Production",
            Self::Expansion => "Expansion (Shorts)",
            Self::CardNews => "Expansion (Card News)",
        }
    }

    /// Check that the outputs this stage consumes exist.
    pub fn requires(self, state: &PipelineState) -> Result<(), SessionError> {
        match self {
            Self::Planning | Self::Video | Self::Expansion => Ok(()),
            Self::Scripting => {
                if state.research_text().trim().is_empty() {
                    Err(SessionError::precondition(
                        "run research in the planning stage first",
                    ))
                } else {
                    Ok(())
                }
            }
            Self::Visuals | Self::CardNews => {
                if state.script_text().trim().is_empty() {
                    Err(SessionError::precondition(
                        "generate a script in the scripting stage first",
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.order(), self.label())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Stage::ALL
            .into_iter()
            .find(|stage| {
                stage.id() == needle
                    || format!("{:?}", stage).to_ascii_lowercase() == needle
                    || stage.order().to_string() == needle
            })
            .ok_or_else(|| format!("unknown stage '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ids_names_and_numbers() {
        assert_eq!("cards".parse::<Stage>().unwrap(), Stage::CardNews);
        assert_eq!("CardNews".parse::<Stage>().unwrap(), Stage::CardNews);
        assert_eq!("3".parse::<Stage>().unwrap(), Stage::Visuals);
        assert!("shorts".parse::<Stage>().is_err());
    }

    #[test]
    fn order_is_contiguous() {
        let orders: Vec<u8> = Stage::ALL.iter().map(|s| s.order()).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn requirements_follow_data_flow() {
        let state = PipelineState::default();
        assert!(Stage::Planning.requires(&state).is_ok());
        assert!(Stage::Expansion.requires(&state).is_ok());
        assert!(Stage::Scripting.requires(&state).unwrap_err().is_precondition());
        assert!(Stage::CardNews.requires(&state).unwrap_err().is_precondition());
    }
}
