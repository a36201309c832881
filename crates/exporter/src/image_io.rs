//! Image encoding for dataset sinks
//!
//! Pixel arrays are encoded here (colour -> JPEG, depth -> 16-bit PNG);
//! encoded blobs are probed and passed through untouched.

use std::io::Cursor;

use contracts::{ContractError, ImagePayload};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, ImageBuffer, ImageDecoder, ImageFormat, ImageReader, Luma, RgbImage};

/// JPEG quality used for colour frames
pub const JPEG_QUALITY: u8 = 95;

/// Image bytes ready to be written to disk
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl EncodedImage {
    /// File extension for the detected format
    pub fn extension(&self) -> &'static str {
        extension(self.format)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

pub fn extension(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("bin")
}

/// Detect the container format of an encoded blob from its content
///
/// # Errors
/// `Format` if no known signature matches
pub fn detect_format(what: &str, data: &[u8]) -> Result<ImageFormat, ContractError> {
    image::guess_format(data).map_err(|e| ContractError::format(what, e.to_string()))
}

/// Format, dimensions and colour type of an encoded blob
fn probe(what: &str, data: &[u8]) -> Result<(ImageFormat, (u32, u32), ColorType), ContractError> {
    let format = detect_format(what, data)?;
    let decoder = ImageReader::with_format(Cursor::new(data), format)
        .into_decoder()
        .map_err(|e| ContractError::format(what, e.to_string()))?;
    Ok((format, decoder.dimensions(), decoder.color_type()))
}

/// Rows of a pixel array, checked against width, height and step
fn rows<'a>(
    what: &str,
    data: &'a [u8],
    width: u32,
    height: u32,
    step: u32,
    bytes_per_pixel: usize,
) -> Result<impl Iterator<Item = &'a [u8]>, ContractError> {
    let row_len = width as usize * bytes_per_pixel;
    let step = step as usize;
    if step < row_len || data.len() < step * height as usize {
        return Err(ContractError::consistency(format!(
            "{what} buffer of {} bytes does not hold {width}x{height} pixels with step {step}",
            data.len()
        )));
    }
    Ok(data
        .chunks(step.max(1))
        .take(height as usize)
        .map(move |row| &row[..row_len]))
}

/// Encode a colour image; pixel arrays become RGB8 JPEG
pub fn encode_colour(payload: &ImagePayload) -> Result<EncodedImage, ContractError> {
    match payload {
        ImagePayload::Encoded { data } => {
            let (format, (width, height), _) = probe("colour", data)?;
            Ok(EncodedImage {
                format,
                width,
                height,
                data: data.to_vec(),
            })
        }
        ImagePayload::Pixels {
            width,
            height,
            encoding,
            step,
            data,
            ..
        } => {
            let rgb = to_rgb8(*width, *height, encoding, *step, data)?;
            let mut buf = Vec::new();
            JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
                .encode_image(&rgb)
                .map_err(|e| ContractError::Other(format!("jpeg encoding failed: {e}")))?;
            Ok(EncodedImage {
                format: ImageFormat::Jpeg,
                width: *width,
                height: *height,
                data: buf,
            })
        }
    }
}

fn to_rgb8(
    width: u32,
    height: u32,
    encoding: &str,
    step: u32,
    data: &[u8],
) -> Result<RgbImage, ContractError> {
    // (bytes per pixel, [r, g, b] channel offsets)
    let (bpp, channels): (usize, [usize; 3]) = match encoding {
        "rgb8" => (3, [0, 1, 2]),
        "bgr8" => (3, [2, 1, 0]),
        "rgba8" => (4, [0, 1, 2]),
        "bgra8" => (4, [2, 1, 0]),
        "mono8" | "8UC1" => (1, [0, 0, 0]),
        other => {
            return Err(ContractError::consistency(format!(
                "unsupported colour encoding '{other}'"
            )))
        }
    };

    let mut out = Vec::with_capacity(width as usize * height as usize * 3);
    for row in rows("colour", data, width, height, step, bpp)? {
        for px in row.chunks_exact(bpp) {
            out.extend(channels.iter().map(|&c| px[c]));
        }
    }

    RgbImage::from_raw(width, height, out)
        .ok_or_else(|| ContractError::consistency("colour buffer size mismatch"))
}

/// Encode a depth image as 16-bit single channel PNG
///
/// # Errors
/// `Format` for undetectable blobs, `Consistency` for blobs that are not
/// 16-bit grey PNGs or pixel arrays with a different encoding.
pub fn encode_depth(payload: &ImagePayload) -> Result<EncodedImage, ContractError> {
    match payload {
        ImagePayload::Encoded { data } => {
            let (format, (width, height), color) = probe("depth", data)?;
            if format != ImageFormat::Png || color != ColorType::L16 {
                return Err(ContractError::consistency(format!(
                    "depth blob is {format:?} {color:?}, expected 16-bit grey PNG"
                )));
            }
            Ok(EncodedImage {
                format,
                width,
                height,
                data: data.to_vec(),
            })
        }
        ImagePayload::Pixels {
            width,
            height,
            encoding,
            step,
            big_endian,
            data,
        } => {
            if !crate::assemble::DEPTH_ENCODINGS.contains(&encoding.as_str()) {
                return Err(ContractError::consistency(format!(
                    "depth encoding '{encoding}' is not 16-bit"
                )));
            }

            let swap = *big_endian != cfg!(target_endian = "big");
            let mut samples = Vec::with_capacity(*width as usize * *height as usize);
            for row in rows("depth", data, *width, *height, *step, 2)? {
                let row: Vec<u16> = bytemuck::pod_collect_to_vec(row);
                if swap {
                    samples.extend(row.into_iter().map(u16::swap_bytes));
                } else {
                    samples.extend(row);
                }
            }

            let img: ImageBuffer<Luma<u16>, Vec<u16>> =
                ImageBuffer::from_raw(*width, *height, samples)
                    .ok_or_else(|| ContractError::consistency("depth buffer size mismatch"))?;

            let mut cursor = Cursor::new(Vec::new());
            img.write_to(&mut cursor, ImageFormat::Png)
                .map_err(|e| ContractError::Other(format!("png encoding failed: {e}")))?;
            Ok(EncodedImage {
                format: ImageFormat::Png,
                width: *width,
                height: *height,
                data: cursor.into_inner(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn pixels(width: u32, height: u32, encoding: &str, step: u32, data: Vec<u8>) -> ImagePayload {
        ImagePayload::Pixels {
            width,
            height,
            encoding: encoding.into(),
            step,
            big_endian: false,
            data: Bytes::from(data),
        }
    }

    #[test]
    fn test_bgr_to_rgb_with_padding() {
        // 2x1 bgr8 with 2 bytes of row padding
        let data = vec![1, 2, 3, 4, 5, 6, 0, 0];
        let rgb = to_rgb8(2, 1, "bgr8", 8, &data).unwrap();
        assert_eq!(rgb.as_raw(), &vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn test_colour_pixels_become_jpeg() {
        let encoded = encode_colour(&pixels(4, 2, "rgb8", 12, vec![200; 24])).unwrap();
        assert_eq!(encoded.format, ImageFormat::Jpeg);
        assert_eq!(encoded.extension(), "jpg");
        assert_eq!(image::guess_format(&encoded.data).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_depth_pixels_round_trip_values() {
        let values: [u16; 4] = [0, 1000, 65535, 42];
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let encoded = encode_depth(&pixels(2, 2, "16UC1", 4, data)).unwrap();

        let decoded = image::load_from_memory(&encoded.data).unwrap().into_luma16();
        assert_eq!(decoded.as_raw(), &values.to_vec());
    }

    #[test]
    fn test_big_endian_depth() {
        let data = vec![0x03, 0xe8];
        let payload = ImagePayload::Pixels {
            width: 1,
            height: 1,
            encoding: "mono16".into(),
            step: 2,
            big_endian: true,
            data: Bytes::from(data),
        };
        let encoded = encode_depth(&payload).unwrap();
        let decoded = image::load_from_memory(&encoded.data).unwrap().into_luma16();
        assert_eq!(decoded.as_raw(), &vec![1000]);
    }

    #[test]
    fn test_depth_blob_accepts_png16() {
        let img: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_raw(2, 1, vec![7, 9]).unwrap();
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();

        let encoded = encode_depth(&ImagePayload::Encoded {
            data: Bytes::from(cursor.into_inner()),
        })
        .unwrap();
        assert_eq!(encoded.dimensions(), (2, 1));
    }

    #[test]
    fn test_depth_blob_rejects_jpeg() {
        let jpeg = encode_colour(&pixels(2, 2, "mono8", 2, vec![0; 4])).unwrap();
        let err = encode_depth(&ImagePayload::Encoded {
            data: Bytes::from(jpeg.data),
        })
        .unwrap_err();
        assert!(matches!(err, ContractError::Consistency { .. }));
    }

    #[test]
    fn test_unknown_blob_is_format_error() {
        let err = encode_colour(&ImagePayload::Encoded {
            data: Bytes::from_static(b"not an image"),
        })
        .unwrap_err();
        assert!(matches!(err, ContractError::Format { .. }));
    }

    #[test]
    fn test_short_buffer_rejected() {
        let err = encode_colour(&pixels(4, 4, "rgb8", 12, vec![0; 10])).unwrap_err();
        assert!(matches!(err, ContractError::Consistency { .. }));
    }
}
