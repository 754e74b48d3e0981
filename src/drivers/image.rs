//! Image files.
//!
//! Image types are named `<base>_<ext>` (`logo.png` → `logo_png`) so an image
//! and a data file with the same base name never claim the same FQN.

use crate::codegen::ClassBuilder;
use crate::diagnostic::DiagnosticSink;
use crate::fqn::FqnCache;
use crate::manifold::{GenError, GenResult, TypeManifold};
use crate::model::SingleFileModel;
use crate::vfs::File;

/// Header facts read from an image file.
#[derive(Debug)]
pub struct ImageInfo {
    /// MIME type implied by the extension.
    pub mime_type: &'static str,
    /// File size in bytes.
    pub length: u64,
    /// Pixel dimensions, when the header carries them.
    pub size: Option<(u32, u32)>,
    decls: FqnCache<()>,
}

impl ImageInfo {
    /// Read the header of `bytes`, an image with extension `ext`.
    pub fn parse(fqn: &str, ext: &str, bytes: &[u8]) -> GenResult<Self> {
        let ext = ext.to_ascii_lowercase();
        let (mime_type, size) = match ext.as_str() {
            "png" => ("image/png", png_size(bytes)),
            "jpg" | "jpeg" => ("image/jpeg", jpeg_size(bytes)),
            "gif" => ("image/gif", gif_size(bytes)),
            "bmp" => ("image/bmp", bmp_size(bytes)),
            "wbmp" => ("image/vnd.wap.wbmp", wbmp_size(bytes)),
            other => return Err(GenError::malformed(fqn, format!("not an image extension: {other}"))),
        };
        let size = size.ok_or_else(|| GenError::malformed(fqn, format!("not a valid {ext} image")))?;
        Ok(Self {
            mime_type,
            length: bytes.len() as u64,
            size,
            decls: FqnCache::new(),
        })
    }
}

/// `None`: wrong signature. `Some(None)`: valid, dimensions unknown.
type Header = Option<Option<(u32, u32)>>;

fn be32(bytes: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_be_bytes(bytes.get(at..at + 4)?.try_into().ok()?))
}

fn le16(bytes: &[u8], at: usize) -> Option<u32> {
    Some(u16::from_le_bytes(bytes.get(at..at + 2)?.try_into().ok()?).into())
}

fn png_size(bytes: &[u8]) -> Header {
    const SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
    if !bytes.starts_with(SIGNATURE) {
        return None;
    }
    let ihdr = bytes.get(12..16) == Some(b"IHDR".as_slice());
    Some(ihdr.then(|| Some((be32(bytes, 16)?, be32(bytes, 20)?))).flatten())
}

fn gif_size(bytes: &[u8]) -> Header {
    if !(bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")) {
        return None;
    }
    Some(le16(bytes, 6).zip(le16(bytes, 8)))
}

fn bmp_size(bytes: &[u8]) -> Header {
    if !bytes.starts_with(b"BM") {
        return None;
    }
    let dim = |at: usize| -> Option<u32> {
        let raw = i32::from_le_bytes(bytes.get(at..at + 4)?.try_into().ok()?);
        Some(raw.unsigned_abs())
    };
    Some(dim(18).zip(dim(22)))
}

fn jpeg_size(bytes: &[u8]) -> Header {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut at = 2;
    while let (Some(&0xFF), Some(&marker)) = (bytes.get(at), bytes.get(at + 1)) {
        let len = u16::from_be_bytes(bytes.get(at + 2..at + 4)?.try_into().ok()?) as usize;
        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            let height = u16::from_be_bytes(bytes.get(at + 5..at + 7)?.try_into().ok()?);
            let width = u16::from_be_bytes(bytes.get(at + 7..at + 9)?.try_into().ok()?);
            return Some(Some((width.into(), height.into())));
        }
        at += 2 + len;
    }
    Some(None)
}

fn wbmp_size(bytes: &[u8]) -> Header {
    // Type 0, fixed header 0, then width and height as multi-byte integers.
    if bytes.first() != Some(&0) {
        return None;
    }
    let mut at = 2;
    let mut read = || -> Option<u32> {
        let mut value: u32 = 0;
        loop {
            let byte = *bytes.get(at)?;
            at += 1;
            value = value.checked_mul(128)? | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Some(value);
            }
        }
    };
    let width = read();
    let height = read();
    Some(width.zip(height))
}

/// Manifold for image resources.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageManifold;

impl TypeManifold for ImageManifold {
    type Artifact = ImageInfo;

    fn name(&self) -> &'static str {
        "image"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["png", "jpg", "jpeg", "gif", "bmp", "wbmp"]
    }

    fn type_name_for_file(&self, default_fqn: &str, file: &File) -> Option<String> {
        Some(format!("{default_fqn}_{}", file.extension().to_ascii_lowercase()))
    }

    fn parse(&self, fqn: &str, file: &File) -> GenResult<ImageInfo> {
        let bytes = file.read_bytes()?;
        ImageInfo::parse(fqn, file.extension(), &bytes)
    }

    fn declarations<'a>(&self, artifact: &'a ImageInfo) -> &'a FqnCache<()> {
        &artifact.decls
    }

    fn contribute(
        &self,
        fqn: &str,
        _existing: Option<&str>,
        model: &SingleFileModel<ImageInfo>,
        artifact: &ImageInfo,
        _sink: &mut dyn DiagnosticSink,
    ) -> GenResult<String> {
        let class = build_class(super::resource_class(fqn, model), artifact);
        Ok(super::unit(fqn).class(class).build())
    }
}

fn build_class(class: ClassBuilder, info: &ImageInfo) -> ClassBuilder {
    let length = i64::try_from(info.length).unwrap_or(i64::MAX);
    let class = class
        .constant("String", "MIME_TYPE", info.mime_type)
        .constant("long", "LENGTH", &length);
    match info.size {
        Some((width, height)) => class
            .constant_raw("int", "WIDTH", width.to_string())
            .constant_raw("int", "HEIGHT", height.to_string()),
        None => class,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = b"\x89PNG\r\n\x1a\n\0\0\0\x0dIHDR".to_vec();
        bytes.extend(width.to_be_bytes());
        bytes.extend(height.to_be_bytes());
        bytes.extend([8, 6, 0, 0, 0]);
        bytes
    }

    #[test]
    fn test_png_header() {
        let info = ImageInfo::parse("ns.logo_png", "PNG", &png(16, 32)).unwrap();
        assert_eq!(info.mime_type, "image/png");
        assert_eq!(info.size, Some((16, 32)));
        assert_eq!(info.length, 29);
    }

    #[test]
    fn test_gif_and_bmp_headers() {
        let mut gif = b"GIF89a".to_vec();
        gif.extend([10, 0, 20, 0]);
        assert_eq!(ImageInfo::parse("x", "gif", &gif).unwrap().size, Some((10, 20)));

        let mut bmp = b"BM".to_vec();
        bmp.resize(18, 0);
        bmp.extend(5i32.to_le_bytes());
        bmp.extend((-7i32).to_le_bytes());
        assert_eq!(ImageInfo::parse("x", "bmp", &bmp).unwrap().size, Some((5, 7)));
    }

    #[test]
    fn test_jpeg_skips_to_frame() {
        let bytes = [
            0xFF, 0xD8, // SOI
            0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00, // APP0
            0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x30, 0x00, 0x40, 0x03, // SOF0 48x64
        ];
        let info = ImageInfo::parse("x", "jpeg", &bytes).unwrap();
        assert_eq!(info.size, Some((64, 48)));
    }

    #[test]
    fn test_wbmp_header() {
        let info = ImageInfo::parse("x", "wbmp", &[0, 0, 0x81, 0x00, 0x05]).unwrap();
        assert_eq!(info.size, Some((128, 5)));
    }

    #[test]
    fn test_bad_signature_is_malformed() {
        let err = ImageInfo::parse("ns.fake_png", "png", b"not a png").unwrap_err();
        assert!(matches!(err, GenError::Malformed { .. }));
    }

    #[test]
    fn test_generated_class() {
        let info = ImageInfo::parse("x", "png", &png(2, 3)).unwrap();
        let code = build_class(ClassBuilder::new("logo_png"), &info).build();
        assert_eq!(
            code,
            "public class logo_png {\n    public static final String MIME_TYPE = \"image/png\";\n    public static final long LENGTH = 29L;\n    public static final int WIDTH = 2;\n    public static final int HEIGHT = 3;\n}\n"
        );
    }
}
