//! TIFF decoding for `.tif` and `.tiff` inputs. Only the first page is read.

use std::io::Cursor;

use ::tiff::ColorType;
use ::tiff::decoder::{Decoder, DecodingResult};

use super::CodecError;
use crate::payload::{ElementType, ImageArray};

/// Decodes the first page of a TIFF file held in memory.
pub(crate) fn decode(bytes: &[u8]) -> Result<ImageArray, CodecError> {
    let mut decoder = Decoder::new(Cursor::new(bytes))?;
    let (width, height) = decoder.dimensions()?;
    let components = components_of(decoder.colortype()?)?;

    let (element_type, samples) = match decoder.read_image()? {
        DecodingResult::U8(data) => (ElementType::U8, widen(data)),
        DecodingResult::I8(data) => (ElementType::I8, widen(data)),
        DecodingResult::U16(data) => (ElementType::U16, widen(data)),
        DecodingResult::I16(data) => (ElementType::I16, widen(data)),
        DecodingResult::U32(data) => (ElementType::U32, widen(data)),
        DecodingResult::I32(data) => (ElementType::I32, widen(data)),
        DecodingResult::U64(data) => (ElementType::U64, lossy(data, |v| v as f64)),
        DecodingResult::I64(data) => (ElementType::I64, lossy(data, |v| v as f64)),
        DecodingResult::F32(data) => (ElementType::F32, widen(data)),
        DecodingResult::F64(data) => (ElementType::F64, data),
    };

    let mut shape = vec![height as usize, width as usize];
    if components > 1 {
        shape.push(components);
    }
    ImageArray::with_components(shape, components, element_type, samples).map_err(CodecError::from)
}

fn components_of(colour: ColorType) -> Result<usize, CodecError> {
    match colour {
        ColorType::Gray(_) => Ok(1),
        ColorType::GrayA(_) => Ok(2),
        ColorType::RGB(_) => Ok(3),
        ColorType::RGBA(_) | ColorType::CMYK(_) => Ok(4),
        other => Err(CodecError::UnsupportedColour(format!("{other:?}"))),
    }
}

fn widen<T: Into<f64>>(data: Vec<T>) -> Vec<f64> {
    data.into_iter().map(Into::into).collect()
}

fn lossy<T>(data: Vec<T>, convert: impl Fn(T) -> f64) -> Vec<f64> {
    data.into_iter().map(convert).collect()
}

#[cfg(test)]
mod tests {
    use ::tiff::encoder::{TiffEncoder, colortype};

    use super::*;

    fn encode_gray16(width: u32, height: u32, data: &[u16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut cursor).expect("encoder");
            encoder
                .write_image::<colortype::Gray16>(width, height, data)
                .expect("write image");
        }
        cursor.into_inner()
    }

    #[test]
    fn decodes_grayscale_as_rows_by_columns() {
        let bytes = encode_gray16(3, 2, &[0, 1, 2, 3, 4, 5]);
        let image = decode(&bytes).expect("tiff should decode");
        assert_eq!(image.shape(), [2, 3]);
        assert_eq!(image.element_type(), ElementType::U16);
        assert_eq!(image.get(&[1, 0]), Some(3.0));
    }

    #[test]
    fn decodes_rgb_with_component_axis() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut cursor).expect("encoder");
            encoder
                .write_image::<colortype::RGB8>(1, 1, &[10, 20, 30])
                .expect("write image");
        }
        let image = decode(&cursor.into_inner()).expect("tiff should decode");
        assert_eq!(image.shape(), [1, 1, 3]);
        assert_eq!(image.samples(), [10.0, 20.0, 30.0]);
    }

    #[test]
    fn rejects_non_tiff_bytes() {
        assert!(matches!(
            decode(b"ObjectType = Image\n"),
            Err(CodecError::Tiff(_))
        ));
    }
}
