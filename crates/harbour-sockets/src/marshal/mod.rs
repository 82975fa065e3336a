//! Moves socket payloads between their on-disk form and in-memory values.
//!
//! Image sockets are directories holding a single image file; the loader picks
//! the file by a fixed extension priority and the writer always emits
//! compressed MetaImage under a fixed file name. JSON sockets are single files
//! parsed as-is. Every call opens and releases its own file handles.

mod metaimage;
mod tiff;

use std::fs;
use std::io;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::payload::{ArrayShapeError, ImageArray, PayloadValue};
use crate::socket::{Socket, SocketKind};

const MARSHAL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::marshal");

/// Image extensions accepted by [`load_image`], in search priority order.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["tif", "tiff", "mha"];

/// File name every stored image is written under.
pub const OUTPUT_IMAGE_FILE_NAME: &str = "output.mha";

/// Failures of the image codecs.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A required MetaImage header field is absent.
    #[error("MetaImage header is missing '{0}'")]
    MissingField(&'static str),
    /// A MetaImage header field could not be interpreted.
    #[error("MetaImage field '{field}' has invalid value '{value}'")]
    InvalidField {
        /// Header field name.
        field: String,
        /// Offending value.
        value: String,
    },
    /// The MetaImage element type is not supported.
    #[error("unsupported MetaImage element type '{0}'")]
    UnsupportedElementType(String),
    /// Pixel data lives in a separate file.
    #[error("detached MetaImage data file '{0}' is not supported")]
    DetachedData(String),
    /// Fewer pixel bytes than the header describes.
    #[error("pixel data holds {actual} bytes but the header describes {expected}")]
    Truncated {
        /// Bytes described by the header.
        expected: usize,
        /// Bytes present.
        actual: usize,
    },
    /// Compressed pixel data could not be inflated.
    #[error("failed to inflate pixel data: {0}")]
    Inflate(#[source] io::Error),
    /// Pixel data could not be compressed.
    #[error("failed to compress pixel data: {0}")]
    Deflate(#[source] io::Error),
    /// The TIFF decoder rejected the file.
    #[error("TIFF decoding failed: {0}")]
    Tiff(#[from] ::tiff::TiffError),
    /// The TIFF colour layout is not supported.
    #[error("unsupported TIFF colour type {0}")]
    UnsupportedColour(String),
    /// Decoded samples do not fit the decoded shape.
    #[error(transparent)]
    Shape(#[from] ArrayShapeError),
}

/// Errors raised while loading or storing socket payloads.
#[derive(Debug, Clone, Error)]
pub enum MarshalError {
    /// An image directory holds none of the accepted extensions.
    #[error("no .tif, .tiff or .mha file found in '{directory}'")]
    NoMatchingFile {
        /// Directory that was searched.
        directory: Utf8PathBuf,
    },
    /// A JSON socket holds malformed content.
    #[error("failed to parse '{path}' as JSON: {source}")]
    ParseFailure {
        /// File that failed to parse.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },
    /// A file or directory could not be read.
    #[error("failed to read '{path}': {source}")]
    Read {
        /// Location that failed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// A file or directory could not be written.
    #[error("failed to write '{path}': {source}")]
    Write {
        /// Location that failed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// An image file could not be decoded.
    #[error("failed to decode image '{path}': {source}")]
    Decode {
        /// Image file.
        path: Utf8PathBuf,
        /// Codec failure.
        #[source]
        source: Arc<CodecError>,
    },
    /// An image could not be encoded.
    #[error("failed to encode image for '{path}': {source}")]
    Encode {
        /// Target file.
        path: Utf8PathBuf,
        /// Codec failure.
        #[source]
        source: Arc<CodecError>,
    },
    /// A JSON value could not be serialised.
    #[error("failed to serialise JSON for '{path}': {source}")]
    Serialise {
        /// Target file.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },
    /// A value of one kind was handed to a socket of another kind.
    #[error("cannot store a {actual} payload in a {expected} socket at '{path}'")]
    KindMismatch {
        /// Target location.
        path: Utf8PathBuf,
        /// Socket kind.
        expected: SocketKind,
        /// Payload kind.
        actual: SocketKind,
    },
}

impl MarshalError {
    fn read(path: &Utf8Path, source: io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source: Arc::new(source),
        }
    }

    fn write(path: &Utf8Path, source: io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source: Arc::new(source),
        }
    }
}

/// Finds the image file [`load_image`] would decode from `directory`.
///
/// Extensions are tried in [`IMAGE_EXTENSIONS`] order and the first extension
/// with a match wins; among files sharing that extension the lexically first
/// name is chosen. A missing directory counts as holding no match.
pub fn find_image_file(directory: &Utf8Path) -> Result<Utf8PathBuf, MarshalError> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Err(MarshalError::NoMatchingFile {
                directory: directory.to_path_buf(),
            });
        }
        Err(error) => return Err(MarshalError::read(directory, error)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|error| MarshalError::read(directory, error))?;
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
            continue;
        };
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    IMAGE_EXTENSIONS
        .iter()
        .find_map(|extension| {
            files
                .iter()
                .find(|path| path.extension() == Some(*extension))
                .cloned()
        })
        .ok_or_else(|| MarshalError::NoMatchingFile {
            directory: directory.to_path_buf(),
        })
}

/// Decodes an image file, choosing the codec by extension.
pub fn read_image_file(path: &Utf8Path) -> Result<ImageArray, MarshalError> {
    let bytes = fs::read(path).map_err(|error| MarshalError::read(path, error))?;
    let decoded = match path.extension() {
        Some("tif" | "tiff") => self::tiff::decode(&bytes),
        _ => metaimage::decode(&bytes),
    };
    decoded.map_err(|source| MarshalError::Decode {
        path: path.to_path_buf(),
        source: Arc::new(source),
    })
}

/// Loads the image held in `directory`.
pub fn load_image(directory: &Utf8Path) -> Result<ImageArray, MarshalError> {
    let path = find_image_file(directory)?;
    let image = read_image_file(&path)?;
    debug!(
        target: MARSHAL_TARGET,
        path = %path,
        shape = ?image.shape(),
        element_type = %image.element_type(),
        "loaded image"
    );
    Ok(image)
}

/// Reads and parses the JSON document at `path`.
pub fn load_json(path: &Utf8Path) -> Result<serde_json::Value, MarshalError> {
    let text = fs::read_to_string(path).map_err(|error| MarshalError::read(path, error))?;
    serde_json::from_str(&text).map_err(|source| MarshalError::ParseFailure {
        path: path.to_path_buf(),
        source: Arc::new(source),
    })
}

/// Writes `image` as compressed MetaImage to `directory/output.mha`.
///
/// The directory and its parents are created when absent; existing
/// directories are reused. Returns the written file's path.
pub fn store_image(directory: &Utf8Path, image: &ImageArray) -> Result<Utf8PathBuf, MarshalError> {
    fs::create_dir_all(directory).map_err(|error| MarshalError::write(directory, error))?;
    let path = directory.join(OUTPUT_IMAGE_FILE_NAME);
    let bytes = metaimage::encode(image).map_err(|source| MarshalError::Encode {
        path: path.clone(),
        source: Arc::new(source),
    })?;
    fs::write(&path, bytes).map_err(|error| MarshalError::write(&path, error))?;
    debug!(
        target: MARSHAL_TARGET,
        path = %path,
        shape = ?image.shape(),
        "stored image"
    );
    Ok(path)
}

/// Writes `value` as pretty-printed JSON to `path`, creating its parent.
pub fn store_json(path: &Utf8Path, value: &serde_json::Value) -> Result<(), MarshalError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| MarshalError::write(parent, error))?;
    }
    let text = serde_json::to_string_pretty(value).map_err(|source| MarshalError::Serialise {
        path: path.to_path_buf(),
        source: Arc::new(source),
    })?;
    fs::write(path, text).map_err(|error| MarshalError::write(path, error))
}

/// Loads the payload of a socket of `kind` found at `location`.
pub fn load(kind: SocketKind, location: &Utf8Path) -> Result<PayloadValue, MarshalError> {
    match kind {
        SocketKind::Image => load_image(location).map(PayloadValue::Image),
        SocketKind::Json => load_json(location).map(PayloadValue::Json),
    }
}

/// Stores `value` for a socket of `kind` at `location`.
///
/// Returns the path of the written file.
pub fn store(
    kind: SocketKind,
    location: &Utf8Path,
    value: &PayloadValue,
) -> Result<Utf8PathBuf, MarshalError> {
    match (kind, value) {
        (SocketKind::Image, PayloadValue::Image(image)) => store_image(location, image),
        (SocketKind::Json, PayloadValue::Json(json)) => {
            store_json(location, json)?;
            Ok(location.to_path_buf())
        }
        (expected, other) => Err(MarshalError::KindMismatch {
            path: location.to_path_buf(),
            expected,
            actual: other.kind(),
        }),
    }
}

/// Loads `socket` from its location under `root`.
pub fn load_socket(socket: Socket, root: &Utf8Path) -> Result<PayloadValue, MarshalError> {
    load(socket.kind(), &root.join(socket.relative_path()))
}

/// Stores `value` for `socket` at its location under `root`.
pub fn store_socket(
    socket: Socket,
    root: &Utf8Path,
    value: &PayloadValue,
) -> Result<Utf8PathBuf, MarshalError> {
    store(socket.kind(), &root.join(socket.relative_path()), value)
}
