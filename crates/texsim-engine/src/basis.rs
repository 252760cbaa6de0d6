//! Basis Universal transcoding through the `basis-universal` bindings.
//!
//! UASTC levels are unpacked to RGBA8 by the low-level slice transcoder.
//! ETC1S (BasisLZ) needs the KTX2 global codebooks to be fed to a
//! transcoder the bindings do not expose, so it is rejected.

use basis_universal::{DecodeFlags, LowLevelUastcTranscoder, SliceParametersUastc, TranscoderBlockFormat};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::ktx::{BasisFormat, Ktx2Transcoder, TranscodeRequest};

/// UASTC block edge, in texels.
const UASTC_BLOCK_DIM: u32 = 4;
/// Size of one UASTC block.
const UASTC_BLOCK_BYTES: usize = 16;

/// [`Ktx2Transcoder`] backed by the Basis Universal C++ transcoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasisUniversalTranscoder;

impl BasisUniversalTranscoder {
    pub fn new() -> Self {
        Self
    }
}

impl Ktx2Transcoder for BasisUniversalTranscoder {
    fn transcode(&self, request: &TranscodeRequest<'_>) -> Result<Vec<u8>> {
        if request.source == BasisFormat::Etc1s {
            return Err(EngineError::UnsupportedFormat(
                "ETC1S (BasisLZ) KTX2 payloads cannot be transcoded; re-encode as UASTC".into(),
            ));
        }

        let num_blocks_x = request.width.div_ceil(UASTC_BLOCK_DIM).max(1);
        let num_blocks_y = request.height.div_ceil(UASTC_BLOCK_DIM).max(1);
        let slice_len = num_blocks_x as usize * num_blocks_y as usize * UASTC_BLOCK_BYTES;
        let slice = request.level_data.get(..slice_len).ok_or_else(|| {
            EngineError::InvalidData(format!(
                "UASTC level holds {} bytes, {}x{} needs {slice_len}",
                request.level_data.len(),
                request.width,
                request.height
            ))
        })?;
        debug!(num_blocks_x, num_blocks_y, "transcoding UASTC slice");

        // Native transcoder state is created per call.
        let transcoder = LowLevelUastcTranscoder::new();
        let mut rgba = transcoder
            .transcode_slice(
                slice,
                SliceParametersUastc {
                    num_blocks_x,
                    num_blocks_y,
                    has_alpha: true,
                    original_width: request.width,
                    original_height: request.height,
                },
                DecodeFlags::HIGH_QUALITY,
                TranscoderBlockFormat::RGBA32,
            )
            .map_err(|e| EngineError::Decode(format!("UASTC transcode failed: {e:?}")))?;

        let image_len = request.width as usize * request.height as usize * 4;
        if rgba.len() < image_len {
            return Err(EngineError::Decode(format!(
                "UASTC transcode produced {} bytes, expected {image_len}",
                rgba.len()
            )));
        }
        rgba.truncate(image_len);
        Ok(rgba)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ktx::{self, tests::build_ktx2};
    use crate::texture::{Ktx2TargetFormat, TextureFormat};
    use basis_universal::{
        BasisTextureFormat, Compressor, CompressorParams, TranscodeParameters, Transcoder,
        TranscoderTextureFormat,
    };

    const KHR_DF_MODEL_UASTC: u8 = 166;
    const KHR_DF_MODEL_ETC1S: u8 = 163;

    fn checker(width: u32, height: u32) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| {
                let (x, y) = (i % width, i / width);
                let v = if (x / 4 + y / 4) % 2 == 0 { 230 } else { 20 };
                [v, (x * 16) as u8, (y * 16) as u8, 255]
            })
            .collect()
    }

    /// Encode RGBA8 texels as a single-slice UASTC `.basis` file.
    fn uastc_basis_file(texels: &[u8], width: u32, height: u32) -> Vec<u8> {
        let mut params = CompressorParams::new();
        params.set_basis_format(BasisTextureFormat::UASTC4x4);
        params.set_generate_mipmaps(false);
        params.source_image_mut(0).init(texels, width, height, 4);

        let mut compressor = Compressor::default();
        unsafe {
            assert!(compressor.init(&params));
            compressor.process().unwrap();
        }
        compressor.basis_file().to_vec()
    }

    #[test]
    fn uastc_ktx2_matches_basis_transcoder() {
        let (width, height) = (16, 8);
        let basis = uastc_basis_file(&checker(width, height), width, height);

        // A UASTC .basis file ends with its slice data, the same raw blocks a
        // KTX2 level carries.
        let slice_len = (width / 4 * height / 4) as usize * UASTC_BLOCK_BYTES;
        let blocks = &basis[basis.len() - slice_len..];
        let file = build_ktx2(0, width, height, 0, KHR_DF_MODEL_UASTC, blocks, blocks.len());

        let texture = ktx::decode(&file, &[], Some(&BasisUniversalTranscoder::new())).unwrap();
        assert_eq!((texture.width(), texture.height()), (width, height));
        assert_eq!(texture.format(), TextureFormat::R8G8B8A8);

        let mut reference = Transcoder::new();
        reference.prepare_transcoding(&basis).unwrap();
        let expected = reference
            .transcode_image_level(
                &basis,
                TranscoderTextureFormat::RGBA32,
                TranscodeParameters {
                    image_index: 0,
                    level_index: 0,
                    ..Default::default()
                },
            )
            .unwrap();
        reference.end_transcoding();

        assert_eq!(texture.pixels(), &expected[..texture.pixels().len()]);
    }

    #[test]
    fn etc1s_is_unsupported() {
        let file = build_ktx2(0, 4, 4, 1, KHR_DF_MODEL_ETC1S, &[0; 8], 0);
        assert!(matches!(
            ktx::decode(&file, &[Ktx2TargetFormat::R8G8B8A8], Some(&BasisUniversalTranscoder)),
            Err(EngineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn short_uastc_level_is_invalid() {
        let file = build_ktx2(0, 8, 8, 0, KHR_DF_MODEL_UASTC, &[0; 32], 32);
        assert!(matches!(
            ktx::decode(&file, &[], Some(&BasisUniversalTranscoder)),
            Err(EngineError::InvalidData(_))
        ));
    }
}
