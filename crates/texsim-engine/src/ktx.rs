//! KTX2 container decoding.
//!
//! Uncompressed 8-bit formats are expanded to RGBA8 directly, after undoing
//! Zstandard or ZLIB supercompression. Basis Universal payloads (ETC1S in
//! BasisLZ, or UASTC) are handed to a [`Ktx2Transcoder`] if one is
//! installed. Only the first image of mip level 0 is decoded.

use std::borrow::Cow;
use std::io::Read;
use std::sync::Arc;

use ktx2::{Format, SupercompressionScheme};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::texture::{Ktx2TargetFormat, Texture2D, TextureFormat};

/// KTX2 file identifier.
pub const KTX2_IDENTIFIER: [u8; 12] = [
    0xAB, 0x4B, 0x54, 0x58, 0x20, 0x32, 0x30, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];

/// Khronos data format descriptor color models for Basis payloads.
const KHR_DF_MODEL_ETC1S: u8 = 163;
const KHR_DF_MODEL_UASTC: u8 = 166;

/// Basis Universal payload flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasisFormat {
    /// ETC1S with BasisLZ supercompression.
    Etc1s,
    /// UASTC, possibly Zstandard-compressed.
    Uastc,
}

/// Input handed to a [`Ktx2Transcoder`].
#[derive(Debug)]
pub struct TranscodeRequest<'a> {
    pub source: BasisFormat,
    pub width: u32,
    pub height: u32,
    /// Level 0 payload, with any Zstandard compression already removed.
    pub level_data: &'a [u8],
    /// Supercompression global data (BasisLZ codebooks), empty for UASTC.
    pub global_data: &'a [u8],
    pub target: Ktx2TargetFormat,
}

/// Pluggable Basis Universal transcoder.
///
/// Implementations return RGBA8 texels for the request's dimensions.
pub trait Ktx2Transcoder: Send + Sync {
    fn transcode(&self, request: &TranscodeRequest<'_>) -> Result<Vec<u8>>;
}

/// Transcoder compiled into this crate, if any.
pub fn default_transcoder() -> Option<Arc<dyn Ktx2Transcoder>> {
    #[cfg(feature = "basis-universal")]
    {
        Some(Arc::new(crate::basis::BasisUniversalTranscoder::new()))
    }
    #[cfg(not(feature = "basis-universal"))]
    {
        None
    }
}

/// Returns true if `bytes` starts with the KTX2 identifier.
pub fn is_ktx2(bytes: &[u8]) -> bool {
    bytes.starts_with(&KTX2_IDENTIFIER)
}

#[derive(Debug, Clone, Copy)]
enum Layout {
    Rgba,
    Bgra,
    Rgb,
    Rg,
    R,
}

impl Layout {
    const fn bytes_per_texel(self) -> usize {
        match self {
            Self::Rgba | Self::Bgra => 4,
            Self::Rgb => 3,
            Self::Rg => 2,
            Self::R => 1,
        }
    }

    const fn texture_format(self) -> TextureFormat {
        match self {
            Self::Rgba | Self::Bgra => TextureFormat::R8G8B8A8,
            Self::Rgb => TextureFormat::R8G8B8,
            Self::Rg => TextureFormat::LuminanceAlpha,
            Self::R => TextureFormat::Luminance,
        }
    }

    fn expand(self, src: &[u8], dst: &mut Vec<u8>) {
        let n = self.bytes_per_texel();
        for t in src.chunks_exact(n) {
            let rgba = match self {
                Self::Rgba => [t[0], t[1], t[2], t[3]],
                Self::Bgra => [t[2], t[1], t[0], t[3]],
                Self::Rgb => [t[0], t[1], t[2], 255],
                Self::Rg => [t[0], t[0], t[0], t[1]],
                Self::R => [t[0], t[0], t[0], 255],
            };
            dst.extend_from_slice(&rgba);
        }
    }
}

fn layout_of(format: Format) -> Result<Layout> {
    let layout = match format {
        Format::R8G8B8A8_UNORM | Format::R8G8B8A8_SRGB => Layout::Rgba,
        Format::B8G8R8A8_UNORM | Format::B8G8R8A8_SRGB => Layout::Bgra,
        Format::R8G8B8_UNORM | Format::R8G8B8_SRGB => Layout::Rgb,
        Format::R8G8_UNORM => Layout::Rg,
        Format::R8_UNORM => Layout::R,
        other => {
            return Err(EngineError::UnsupportedFormat(format!(
                "KTX2 vkFormat {other:?}"
            )))
        }
    };
    Ok(layout)
}

/// Decode a KTX2 file into a texture.
pub fn decode(
    bytes: &[u8],
    priority_formats: &[Ktx2TargetFormat],
    transcoder: Option<&dyn Ktx2Transcoder>,
) -> Result<Texture2D> {
    let reader =
        ktx2::Reader::new(bytes).map_err(|e| EngineError::Decode(format!("KTX2 header: {e}")))?;
    let header = reader.header();

    if header.pixel_depth > 1 {
        return Err(EngineError::UnsupportedFormat(format!(
            "3D KTX2 texture (depth {})",
            header.pixel_depth
        )));
    }
    let width = header.pixel_width;
    let height = header.pixel_height.max(1);

    let level = reader
        .levels()
        .next()
        .ok_or_else(|| EngineError::InvalidData("KTX2 file has no mip levels".into()))?;

    let scheme = header.supercompression_scheme;
    debug!(
        width,
        height,
        format = ?header.format,
        supercompression = ?scheme,
        levels = header.level_count,
        "decoding KTX2"
    );

    match header.format {
        Some(format) => {
            let layout = layout_of(format)?;
            let payload = supercompression_decode(level.data, scheme, level.uncompressed_byte_length)?;
            let image_len = width as usize * height as usize * layout.bytes_per_texel();
            let image = payload.get(..image_len).ok_or_else(|| {
                EngineError::InvalidData(format!(
                    "level 0 holds {} bytes, {width}x{height} {layout:?} needs {image_len}",
                    payload.len()
                ))
            })?;
            let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
            layout.expand(image, &mut rgba);
            Texture2D::from_rgba8(width, height, layout.texture_format(), rgba)
        }
        None => {
            let source = match (scheme, dfd_color_model(bytes, &header)) {
                (Some(SupercompressionScheme::BasisLZ), _) | (_, Some(KHR_DF_MODEL_ETC1S)) => {
                    BasisFormat::Etc1s
                }
                (_, Some(KHR_DF_MODEL_UASTC)) => BasisFormat::Uastc,
                (_, model) => {
                    return Err(EngineError::UnsupportedFormat(format!(
                        "KTX2 with undefined vkFormat and color model {model:?}"
                    )))
                }
            };
            let transcoder = transcoder.ok_or_else(|| {
                EngineError::UnsupportedFormat(format!(
                    "{source:?} KTX2 payload needs a Basis Universal transcoder"
                ))
            })?;

            let level_data = match source {
                BasisFormat::Etc1s => Cow::Borrowed(level.data),
                BasisFormat::Uastc => {
                    supercompression_decode(level.data, scheme, level.uncompressed_byte_length)?
                }
            };
            let target = Ktx2TargetFormat::select(priority_formats);
            let request = TranscodeRequest {
                source,
                width,
                height,
                level_data: &level_data,
                global_data: global_data(bytes, &header)?,
                target,
            };
            debug!(?source, ?target, "transcoding Basis Universal payload");
            let rgba = transcoder.transcode(&request)?;
            Texture2D::from_rgba8(width, height, TextureFormat::R8G8B8A8, rgba)
        }
    }
}

fn supercompression_decode(
    data: &[u8],
    scheme: Option<SupercompressionScheme>,
    uncompressed_len: u64,
) -> Result<Cow<'_, [u8]>> {
    let Some(scheme) = scheme else {
        return Ok(Cow::Borrowed(data));
    };
    let decoded = match scheme {
        SupercompressionScheme::Zstandard => {
            let decoder = zstd::stream::read::Decoder::new(data)
                .map_err(|e| EngineError::Decode(format!("Zstandard: {e}")))?;
            inflate(decoder, uncompressed_len, "Zstandard")?
        }
        SupercompressionScheme::ZLIB => {
            inflate(flate2::read::ZlibDecoder::new(data), uncompressed_len, "ZLIB")?
        }
        other => {
            return Err(EngineError::UnsupportedFormat(format!(
                "supercompression {other:?} on a non-Basis payload"
            )))
        }
    };
    Ok(Cow::Owned(decoded))
}

/// Decompress a level that must expand to exactly `expected` bytes.
///
/// The output grows with the stream rather than the header's claim, and
/// reading stops one byte past `expected`.
fn inflate(reader: impl Read, expected: u64, scheme: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    reader
        .take(expected.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| EngineError::Decode(format!("{scheme}: {e}")))?;
    if out.len() as u64 != expected {
        return Err(EngineError::InvalidData(format!(
            "{scheme} level does not expand to the declared {expected} bytes (read {})",
            out.len()
        )));
    }
    Ok(out)
}

/// Color model byte of the first data format descriptor block.
fn dfd_color_model(bytes: &[u8], header: &ktx2::Header) -> Option<u8> {
    // dfdTotalSize (4 bytes), then the block header words (8 bytes)
    let offset = header.index.dfd_byte_offset as usize + 12;
    if header.index.dfd_byte_length < 13 {
        return None;
    }
    bytes.get(offset).copied()
}

fn global_data<'a>(bytes: &'a [u8], header: &ktx2::Header) -> Result<&'a [u8]> {
    let start = usize::try_from(header.index.sgd_byte_offset)
        .map_err(|_| EngineError::InvalidData("SGD offset overflows".into()))?;
    let len = usize::try_from(header.index.sgd_byte_length)
        .map_err(|_| EngineError::InvalidData("SGD length overflows".into()))?;
    start
        .checked_add(len)
        .and_then(|end| bytes.get(start..end))
        .ok_or_else(|| EngineError::InvalidData("SGD outside file".into()))
}
