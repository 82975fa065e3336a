//! Socket contract shared by the harbour algorithm, uploader and evaluation.
//!
//! The evaluation platform describes every run as a set of named sockets. This
//! crate holds the pieces each binary composes:
//!
//! - [`Socket`]: the catalogue of known sockets, their payload kinds and
//!   on-disk locations.
//! - [`Manifest`] and [`resolve`]: reduce the platform's `inputs.json` to the
//!   one [`Interface`] registered for that socket combination.
//! - [`marshal`]: load and store socket payloads as [`PayloadValue`]s.

mod interface;
mod manifest;
pub mod marshal;
mod payload;
mod socket;

pub use interface::{Interface, InterfaceKey, ResolveError, resolve};
pub use manifest::{InterfaceRef, Manifest, ManifestEntry, ManifestError};
pub use marshal::{CodecError, MarshalError};
pub use payload::{ArrayShapeError, ElementType, ImageArray, PayloadValue, SocketValues};
pub use socket::{Direction, Socket, SocketKind, UnknownSocketError};
