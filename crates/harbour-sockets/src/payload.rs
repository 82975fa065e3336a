//! In-memory socket payloads.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::socket::{Socket, SocketKind};

/// Numeric type of the samples stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 64-bit integer.
    U64,
    /// Signed 64-bit integer.
    I64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl ElementType {
    /// Size of one sample in bytes.
    #[must_use]
    pub const fn byte_width(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::U8 => "u8",
            Self::I8 => "i8",
            Self::U16 => "u16",
            Self::I16 => "i16",
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::U64 => "u64",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        };
        f.write_str(label)
    }
}

/// Errors raised when samples do not fit the declared shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArrayShapeError {
    /// The shape has no axes.
    #[error("an image array needs at least one axis")]
    NoAxes,
    /// The sample count differs from the product of the shape.
    #[error("shape {shape:?} describes {expected} samples but {actual} were supplied")]
    SampleCount {
        /// Declared shape.
        shape: Vec<usize>,
        /// Product of the shape.
        expected: usize,
        /// Samples supplied.
        actual: usize,
    },
    /// The product of the shape does not fit in `usize`.
    #[error("shape {shape:?} describes more samples than can be addressed")]
    Overflow {
        /// Declared shape.
        shape: Vec<usize>,
    },
    /// Multi-component pixels need a matching trailing axis.
    #[error("shape {shape:?} has no trailing axis of {components} components")]
    Components {
        /// Declared shape.
        shape: Vec<usize>,
        /// Components per pixel.
        components: usize,
    },
}

/// Dense n-dimensional image in row-major order.
///
/// The first axis varies slowest. Pixels with more than one component (for
/// example RGB) carry the components as a trailing axis. Samples are held as
/// `f64` whatever the on-disk [`ElementType`], which represents every
/// supported element type except 64-bit integers beyond 2^53 exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageArray {
    shape: Vec<usize>,
    components: usize,
    element_type: ElementType,
    samples: Vec<f64>,
}

impl ImageArray {
    /// Builds a single-component array.
    pub fn new(
        shape: Vec<usize>,
        element_type: ElementType,
        samples: Vec<f64>,
    ) -> Result<Self, ArrayShapeError> {
        Self::with_components(shape, 1, element_type, samples)
    }

    /// Builds an array whose pixels carry `components` samples each.
    pub fn with_components(
        shape: Vec<usize>,
        components: usize,
        element_type: ElementType,
        samples: Vec<f64>,
    ) -> Result<Self, ArrayShapeError> {
        if shape.is_empty() {
            return Err(ArrayShapeError::NoAxes);
        }
        if components > 1 && shape.last() != Some(&components) {
            return Err(ArrayShapeError::Components { shape, components });
        }
        let Some(expected) = shape
            .iter()
            .try_fold(1_usize, |total, &extent| total.checked_mul(extent))
        else {
            return Err(ArrayShapeError::Overflow { shape });
        };
        if expected != samples.len() {
            return Err(ArrayShapeError::SampleCount {
                shape,
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            shape,
            components: components.max(1),
            element_type,
            samples,
        })
    }

    /// Identity-like `rows × cols` matrix of `f64`, ones on the main diagonal.
    #[must_use]
    pub fn eye(rows: usize, cols: usize) -> Self {
        let samples = (0..rows)
            .flat_map(|row| (0..cols).map(move |col| if row == col { 1.0 } else { 0.0 }))
            .collect();
        Self {
            shape: vec![rows, cols],
            components: 1,
            element_type: ElementType::F64,
            samples,
        }
    }

    /// Extent of each axis, slowest first.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Spatial extent, i.e. the shape without the component axis.
    #[must_use]
    pub fn spatial_shape(&self) -> &[usize] {
        match self.shape.split_last() {
            Some((_, rest)) if self.components > 1 => rest,
            _ => &self.shape,
        }
    }

    /// Components per pixel.
    #[must_use]
    pub const fn components(&self) -> usize {
        self.components
    }

    /// On-disk element type.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Samples in row-major order.
    #[must_use]
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true when the array holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample at the multi-dimensional `index`, if it is in bounds.
    #[must_use]
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0usize;
        for (position, extent) in index.iter().zip(&self.shape) {
            if position >= extent {
                return None;
            }
            offset = offset * extent + position;
        }
        self.samples.get(offset).copied()
    }
}

/// In-memory value of one socket.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    /// Decoded image.
    Image(ImageArray),
    /// Parsed JSON document.
    Json(serde_json::Value),
}

impl PayloadValue {
    /// Socket kind the value belongs to.
    #[must_use]
    pub const fn kind(&self) -> SocketKind {
        match self {
            Self::Image(_) => SocketKind::Image,
            Self::Json(_) => SocketKind::Json,
        }
    }

    /// Borrows the image, if the value is one.
    #[must_use]
    pub const fn as_image(&self) -> Option<&ImageArray> {
        match self {
            Self::Image(image) => Some(image),
            Self::Json(_) => None,
        }
    }

    /// Borrows the JSON document, if the value is one.
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Image(_) => None,
            Self::Json(value) => Some(value),
        }
    }
}

/// Payloads keyed by socket, owned by a single run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SocketValues {
    values: BTreeMap<Socket, PayloadValue>,
}

impl SocketValues {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` for `socket`, returning any value it replaced.
    pub fn insert(&mut self, socket: Socket, value: PayloadValue) -> Option<PayloadValue> {
        self.values.insert(socket, value)
    }

    /// Value stored for `socket`.
    #[must_use]
    pub fn get(&self, socket: Socket) -> Option<&PayloadValue> {
        self.values.get(&socket)
    }

    /// Image stored for `socket`.
    #[must_use]
    pub fn image(&self, socket: Socket) -> Option<&ImageArray> {
        self.get(socket).and_then(PayloadValue::as_image)
    }

    /// JSON document stored for `socket`.
    #[must_use]
    pub fn json(&self, socket: Socket) -> Option<&serde_json::Value> {
        self.get(socket).and_then(PayloadValue::as_json)
    }

    /// Sockets holding a value, in catalogue order.
    pub fn sockets(&self) -> impl Iterator<Item = Socket> + '_ {
        self.values.keys().copied()
    }

    /// Iterates over the stored values in catalogue order.
    pub fn iter(&self) -> impl Iterator<Item = (Socket, &PayloadValue)> {
        self.values.iter().map(|(socket, value)| (*socket, value))
    }

    /// Number of sockets holding a value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no socket holds a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(Socket, PayloadValue)> for SocketValues {
    fn from_iter<T: IntoIterator<Item = (Socket, PayloadValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
