//! Click classification: mapping tracked controls to semantic interactions.
//!
//! This is a pure function from a control descriptor to an interaction
//! kind. Toggle controls classify by the state they were in *before* the
//! click was applied, so a click on a muted player reads as an unmute.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A tracked control inside a module's markup, as seen by the click handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum Control {
    /// A video mute toggle. `muted` is the player state before the click.
    Mute { muted: bool },
    /// A card expand/collapse toggle. `expanded` is the state before
    /// the click.
    Expand { expanded: bool },
    /// A tab selector.
    Tab { label: String },
    /// A list filter control.
    Filter { label: String },
}

/// Canonical interaction kinds reported to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    VideoMute,
    VideoUnmute,
    CardExpand,
    CardCollapse,
    TabSwitch,
    FilterChange,
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::VideoMute => "video_mute",
            Self::VideoUnmute => "video_unmute",
            Self::CardExpand => "card_expand",
            Self::CardCollapse => "card_collapse",
            Self::TabSwitch => "tab_switch",
            Self::FilterChange => "filter_change",
        };
        write!(f, "{s}")
    }
}

impl FromStr for InteractionKind {
    type Err = UnknownInteractionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video_mute" => Ok(Self::VideoMute),
            "video_unmute" => Ok(Self::VideoUnmute),
            "card_expand" => Ok(Self::CardExpand),
            "card_collapse" => Ok(Self::CardCollapse),
            "tab_switch" => Ok(Self::TabSwitch),
            "filter_change" => Ok(Self::FilterChange),
            _ => Err(UnknownInteractionKind(s.to_string())),
        }
    }
}

impl Serialize for InteractionKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for InteractionKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown interaction kind strings.
#[derive(Debug, Clone)]
pub struct UnknownInteractionKind(String);

impl fmt::Display for UnknownInteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown interaction kind: {}", self.0)
    }
}

impl std::error::Error for UnknownInteractionKind {}

/// Classifies a clicked control into an interaction kind and detail label.
#[must_use]
pub fn classify(control: &Control) -> (InteractionKind, String) {
    match control {
        Control::Mute { muted: true } => (InteractionKind::VideoUnmute, "player".to_string()),
        Control::Mute { muted: false } => (InteractionKind::VideoMute, "player".to_string()),
        Control::Expand { expanded: true } => (InteractionKind::CardCollapse, "card".to_string()),
        Control::Expand { expanded: false } => (InteractionKind::CardExpand, "card".to_string()),
        Control::Tab { label } => (InteractionKind::TabSwitch, label.clone()),
        Control::Filter { label } => (InteractionKind::FilterChange, label.clone()),
    }
}
