//! MetaImage (`.mha`) codec for single-file images with embedded pixel data.
//!
//! Only the header fields needed to recover the array are interpreted. The
//! writer always emits little-endian, zlib compressed pixel data.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use super::CodecError;
use crate::payload::{ElementType, ImageArray};

const DATA_FILE_FIELD: &str = "ElementDataFile";

#[derive(Debug, Default)]
struct Header {
    ndims: Option<usize>,
    dim_size: Option<Vec<usize>>,
    element_type: Option<ElementType>,
    channels: usize,
    compressed: bool,
    msb: bool,
}

/// Decodes a MetaImage file held in memory.
pub(crate) fn decode(bytes: &[u8]) -> Result<ImageArray, CodecError> {
    let (header, data) = split_header(bytes)?;
    let ndims = header.ndims.ok_or(CodecError::MissingField("NDims"))?;
    let dims = header.dim_size.ok_or(CodecError::MissingField("DimSize"))?;
    let element_type = header
        .element_type
        .ok_or(CodecError::MissingField("ElementType"))?;
    if dims.len() != ndims {
        return Err(CodecError::InvalidField {
            field: "DimSize".to_owned(),
            value: format!("{dims:?} for NDims = {ndims}"),
        });
    }

    let channels = header.channels.max(1);
    let expected = dims
        .iter()
        .chain([&channels, &element_type.byte_width()])
        .try_fold(1_usize, |total, &extent| total.checked_mul(extent))
        .ok_or_else(|| CodecError::InvalidField {
            field: "DimSize".to_owned(),
            value: format!("{dims:?} overflows the addressable size"),
        })?;

    let raw = if header.compressed {
        // Memory is bounded by the real payload, never by the header's claim.
        let limit = u64::try_from(expected).unwrap_or(u64::MAX).saturating_add(1);
        let mut inflated = Vec::new();
        ZlibDecoder::new(data)
            .take(limit)
            .read_to_end(&mut inflated)
            .map_err(CodecError::Inflate)?;
        inflated
    } else {
        data.to_vec()
    };
    if raw.len() < expected {
        return Err(CodecError::Truncated {
            expected,
            actual: raw.len(),
        });
    }

    let pixels = raw.get(..expected).unwrap_or_default();
    let samples = decode_samples(pixels, element_type, header.msb);

    // MetaImage lists the fastest axis first; arrays list it last.
    let mut shape: Vec<usize> = dims.into_iter().rev().collect();
    if channels > 1 {
        shape.push(channels);
    }
    ImageArray::with_components(shape, channels, element_type, samples).map_err(CodecError::from)
}

/// Encodes `image` as a compressed MetaImage file.
pub(crate) fn encode(image: &ImageArray) -> Result<Vec<u8>, CodecError> {
    let raw = encode_samples(image.samples(), image.element_type());
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw).map_err(CodecError::Deflate)?;
    let compressed = encoder.finish().map_err(CodecError::Deflate)?;

    let dims: Vec<usize> = image.spatial_shape().iter().rev().copied().collect();
    let ndims = dims.len();
    let identity = join((0..ndims * ndims).map(|index| u8::from(index % (ndims + 1) == 0)));
    let zeros = join((0..ndims).map(|_| 0));
    let ones = join((0..ndims).map(|_| 1));
    let dim_size = join(dims.iter());

    let mut header = String::new();
    header.push_str("ObjectType = Image\n");
    header.push_str(&format!("NDims = {ndims}\n"));
    header.push_str("BinaryData = True\n");
    header.push_str("BinaryDataByteOrderMSB = False\n");
    header.push_str("CompressedData = True\n");
    header.push_str(&format!("CompressedDataSize = {}\n", compressed.len()));
    header.push_str(&format!("TransformMatrix = {identity}\n"));
    header.push_str(&format!("Offset = {zeros}\n"));
    header.push_str(&format!("CenterOfRotation = {zeros}\n"));
    header.push_str(&format!("ElementSpacing = {ones}\n"));
    header.push_str(&format!("DimSize = {dim_size}\n"));
    if image.components() > 1 {
        header.push_str(&format!(
            "ElementNumberOfChannels = {}\n",
            image.components()
        ));
    }
    header.push_str(&format!(
        "ElementType = {}\n",
        element_type_name(image.element_type())
    ));
    header.push_str(&format!("{DATA_FILE_FIELD} = LOCAL\n"));

    let mut bytes = header.into_bytes();
    bytes.extend_from_slice(&compressed);
    Ok(bytes)
}

fn join<T: ToString>(values: impl Iterator<Item = T>) -> String {
    values
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_header(bytes: &[u8]) -> Result<(Header, &[u8]), CodecError> {
    let mut header = Header::default();
    let mut rest = bytes;
    loop {
        let Some(newline) = rest.iter().position(|byte| *byte == b'\n') else {
            return Err(CodecError::MissingField(DATA_FILE_FIELD));
        };
        let (line, tail) = rest.split_at(newline);
        rest = tail.get(1..).unwrap_or_default();

        let line = String::from_utf8_lossy(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        match key {
            "NDims" => header.ndims = Some(parse_usize(key, value)?),
            "DimSize" => {
                header.dim_size = Some(
                    value
                        .split_whitespace()
                        .map(|part| parse_usize(key, part))
                        .collect::<Result<_, _>>()?,
                );
            }
            "ElementType" => header.element_type = Some(parse_element_type(value)?),
            "ElementNumberOfChannels" => header.channels = parse_usize(key, value)?,
            "CompressedData" => header.compressed = parse_bool(key, value)?,
            "BinaryDataByteOrderMSB" | "ByteOrderMSB" => header.msb = parse_bool(key, value)?,
            DATA_FILE_FIELD => {
                if value != "LOCAL" {
                    return Err(CodecError::DetachedData(value.to_owned()));
                }
                return Ok((header, rest));
            }
            _ => {}
        }
    }
}

fn parse_usize(field: &str, value: &str) -> Result<usize, CodecError> {
    value.parse().map_err(|_| CodecError::InvalidField {
        field: field.to_owned(),
        value: value.to_owned(),
    })
}

fn parse_bool(field: &str, value: &str) -> Result<bool, CodecError> {
    match value {
        "True" | "true" | "TRUE" => Ok(true),
        "False" | "false" | "FALSE" => Ok(false),
        other => Err(CodecError::InvalidField {
            field: field.to_owned(),
            value: other.to_owned(),
        }),
    }
}

fn parse_element_type(value: &str) -> Result<ElementType, CodecError> {
    match value {
        "MET_UCHAR" => Ok(ElementType::U8),
        "MET_CHAR" => Ok(ElementType::I8),
        "MET_USHORT" => Ok(ElementType::U16),
        "MET_SHORT" => Ok(ElementType::I16),
        "MET_UINT" | "MET_ULONG" => Ok(ElementType::U32),
        "MET_INT" | "MET_LONG" => Ok(ElementType::I32),
        "MET_ULONG_LONG" => Ok(ElementType::U64),
        "MET_LONG_LONG" => Ok(ElementType::I64),
        "MET_FLOAT" => Ok(ElementType::F32),
        "MET_DOUBLE" => Ok(ElementType::F64),
        other => Err(CodecError::UnsupportedElementType(other.to_owned())),
    }
}

const fn element_type_name(element_type: ElementType) -> &'static str {
    match element_type {
        ElementType::U8 => "MET_UCHAR",
        ElementType::I8 => "MET_CHAR",
        ElementType::U16 => "MET_USHORT",
        ElementType::I16 => "MET_SHORT",
        ElementType::U32 => "MET_UINT",
        ElementType::I32 => "MET_INT",
        ElementType::U64 => "MET_ULONG_LONG",
        ElementType::I64 => "MET_LONG_LONG",
        ElementType::F32 => "MET_FLOAT",
        ElementType::F64 => "MET_DOUBLE",
    }
}

macro_rules! decode_as {
    ($bytes:expr, $ty:ty, $msb:expr) => {{
        const WIDTH: usize = std::mem::size_of::<$ty>();
        $bytes
            .chunks_exact(WIDTH)
            .map(|chunk| {
                let mut raw = [0u8; WIDTH];
                raw.copy_from_slice(chunk);
                let value = if $msb {
                    <$ty>::from_be_bytes(raw)
                } else {
                    <$ty>::from_le_bytes(raw)
                };
                value as f64
            })
            .collect::<Vec<f64>>()
    }};
}

fn decode_samples(bytes: &[u8], element_type: ElementType, msb: bool) -> Vec<f64> {
    match element_type {
        ElementType::U8 => decode_as!(bytes, u8, msb),
        ElementType::I8 => decode_as!(bytes, i8, msb),
        ElementType::U16 => decode_as!(bytes, u16, msb),
        ElementType::I16 => decode_as!(bytes, i16, msb),
        ElementType::U32 => decode_as!(bytes, u32, msb),
        ElementType::I32 => decode_as!(bytes, i32, msb),
        ElementType::U64 => decode_as!(bytes, u64, msb),
        ElementType::I64 => decode_as!(bytes, i64, msb),
        ElementType::F32 => decode_as!(bytes, f32, msb),
        ElementType::F64 => decode_as!(bytes, f64, msb),
    }
}

macro_rules! encode_as {
    ($samples:expr, $ty:ty) => {
        $samples
            .iter()
            .flat_map(|sample| (*sample as $ty).to_le_bytes())
            .collect::<Vec<u8>>()
    };
}

fn encode_samples(samples: &[f64], element_type: ElementType) -> Vec<u8> {
    match element_type {
        ElementType::U8 => encode_as!(samples, u8),
        ElementType::I8 => encode_as!(samples, i8),
        ElementType::U16 => encode_as!(samples, u16),
        ElementType::I16 => encode_as!(samples, i16),
        ElementType::U32 => encode_as!(samples, u32),
        ElementType::I32 => encode_as!(samples, i32),
        ElementType::U64 => encode_as!(samples, u64),
        ElementType::I64 => encode_as!(samples, i64),
        ElementType::F32 => encode_as!(samples, f32),
        ElementType::F64 => encode_as!(samples, f64),
    }
}
