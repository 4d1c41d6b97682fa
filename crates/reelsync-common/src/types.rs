//! Core type definitions for library items and sections.
//!
//! Enums are serialized in lowercase to match the remote server's wire
//! vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of library item as reported by the remote media server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A single movie.
    Movie,
    /// A TV series (show).
    Show,
    /// A season within a show.
    Season,
    /// A single episode within a season.
    Episode,
    /// A music artist.
    Artist,
    /// A music album.
    Album,
    /// An audio track.
    Track,
}

impl ItemKind {
    /// Whether items of this kind may carry collection/set references that
    /// need separate resolution. Only movies do on the remote server.
    #[must_use]
    pub fn may_have_collections(&self) -> bool {
        matches!(self, Self::Movie)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::Show => write!(f, "show"),
            Self::Season => write!(f, "season"),
            Self::Episode => write!(f, "episode"),
            Self::Artist => write!(f, "artist"),
            Self::Album => write!(f, "album"),
            Self::Track => write!(f, "track"),
        }
    }
}

impl std::str::FromStr for ItemKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "movie" => Ok(Self::Movie),
            "show" => Ok(Self::Show),
            "season" => Ok(Self::Season),
            "episode" => Ok(Self::Episode),
            "artist" => Ok(Self::Artist),
            "album" => Ok(Self::Album),
            "track" => Ok(Self::Track),
            _ => Err(crate::Error::invalid_input(format!(
                "Unknown item kind: {s}"
            ))),
        }
    }
}
