//! Catalogue of the platform sockets this workspace knows how to handle.
//!
//! Sockets are defined by the evaluation platform; the catalogue only mirrors
//! the slugs, payload kinds and on-disk locations the platform uses for them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload kind carried by a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketKind {
    /// A directory holding one image file.
    Image,
    /// A single JSON document.
    Json,
}

impl SocketKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for SocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the algorithm reads or writes a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Supplied by the platform.
    Input,
    /// Produced by the algorithm.
    Output,
}

/// A named, typed I/O slot defined by the evaluation platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Socket {
    /// Colour fundus photograph of the retina.
    ColorFundusImage,
    /// Patient age in months.
    AgeInMonths,
    /// Binary segmentation of the retinal vessels.
    BinaryVesselSegmentation,
}

impl Socket {
    /// Every socket in the catalogue.
    pub const ALL: [Self; 3] = [
        Self::ColorFundusImage,
        Self::AgeInMonths,
        Self::BinaryVesselSegmentation,
    ];

    /// Unique identifier the platform uses for the socket.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::ColorFundusImage => "color-fundus-image",
            Self::AgeInMonths => "age-in-months",
            Self::BinaryVesselSegmentation => "binary-vessel-segmentation",
        }
    }

    /// Payload kind of the socket.
    #[must_use]
    pub const fn kind(self) -> SocketKind {
        match self {
            Self::ColorFundusImage | Self::BinaryVesselSegmentation => SocketKind::Image,
            Self::AgeInMonths => SocketKind::Json,
        }
    }

    /// Whether the socket is read or written by the algorithm.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::ColorFundusImage | Self::AgeInMonths => Direction::Input,
            Self::BinaryVesselSegmentation => Direction::Output,
        }
    }

    /// Location of the socket relative to the input or output root.
    ///
    /// Image sockets name a directory, JSON sockets name a file.
    #[must_use]
    pub const fn relative_path(self) -> &'static str {
        match self {
            Self::ColorFundusImage => "images/color-fundus",
            Self::AgeInMonths => "age-in-months.json",
            Self::BinaryVesselSegmentation => "images/binary-vessel-segmentation",
        }
    }
}

impl fmt::Display for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Error returned when a slug names no socket in the catalogue.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown socket '{slug}'")]
pub struct UnknownSocketError {
    slug: String,
}

impl UnknownSocketError {
    /// Creates an error describing the unsupported slug.
    #[must_use]
    pub fn new(slug: impl Into<String>) -> Self {
        Self { slug: slug.into() }
    }

    /// Returns the slug that could not be parsed.
    #[must_use]
    pub fn slug(&self) -> &str {
        self.slug.as_str()
    }
}

impl FromStr for Socket {
    type Err = UnknownSocketError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|socket| socket.slug() == value)
            .ok_or_else(|| UnknownSocketError::new(value))
    }
}
