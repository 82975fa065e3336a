//! Interfaces and the resolver that selects one from the manifest.
//!
//! An [`Interface`] is a combination of input sockets that determines which
//! handler applies. The registry is the closed [`Interface`] enum: every
//! combination the algorithm supports is a variant, and the socket lists are
//! exhaustive `match`es, so adding a combination without wiring its sockets
//! fails to compile. [`resolve`] reduces the manifest to an order independent
//! [`InterfaceKey`] and looks up the variant registered for exactly that key.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::manifest::Manifest;
use crate::socket::Socket;

/// Canonical, order independent key of a set of socket slugs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceKey(Vec<String>);

impl InterfaceKey {
    /// Builds a key by deduplicating and sorting `slugs`.
    #[must_use]
    pub fn from_slugs<I, S>(slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique: BTreeSet<String> = slugs.into_iter().map(Into::into).collect();
        Self(unique.into_iter().collect())
    }

    /// Sorted slugs making up the key.
    #[must_use]
    pub fn slugs(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for InterfaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

/// Input socket combinations the algorithm can handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interface {
    /// A colour fundus photograph accompanied by the patient's age.
    ColorFundusWithAge,
}

impl Interface {
    /// Every registered interface.
    pub const ALL: [Self; 1] = [Self::ColorFundusWithAge];

    /// Input sockets read for the interface.
    #[must_use]
    pub const fn inputs(self) -> &'static [Socket] {
        match self {
            Self::ColorFundusWithAge => &[Socket::ColorFundusImage, Socket::AgeInMonths],
        }
    }

    /// Output sockets the interface must produce.
    #[must_use]
    pub const fn outputs(self) -> &'static [Socket] {
        match self {
            Self::ColorFundusWithAge => &[Socket::BinaryVesselSegmentation],
        }
    }

    /// Canonical key of the interface's input sockets.
    #[must_use]
    pub fn key(self) -> InterfaceKey {
        InterfaceKey::from_slugs(self.inputs().iter().map(|socket| socket.slug()))
    }

    /// Looks up the interface registered for `key`.
    pub fn from_key(key: &InterfaceKey) -> Result<Self, ResolveError> {
        Self::ALL
            .into_iter()
            .find(|interface| interface.key() == *key)
            .ok_or_else(|| ResolveError::UnsupportedInterface { key: key.clone() })
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.key(), f)
    }
}

/// Configuration errors raised while resolving an interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No interface is registered for the observed socket combination.
    #[error("unsupported interface {key}: no handler is registered for this socket combination")]
    UnsupportedInterface {
        /// Key computed from the manifest.
        key: InterfaceKey,
    },
}

/// Resolves the manifest to the one interface registered for its sockets.
///
/// The manifest's slugs are deduplicated and sorted, so entry order and
/// repetition never influence the result.
pub fn resolve(manifest: &Manifest) -> Result<Interface, ResolveError> {
    let key = InterfaceKey::from_slugs(manifest.slugs());
    Interface::from_key(&key)
}
