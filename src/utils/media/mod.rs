//! Image content validation: a content-type allow-list backed by magic bytes.
//!
//! Only raster formats that cannot carry active content are accepted. SVG
//! (scriptable), BMP and TIFF are not, and never will be, on the list.

/// Minimum buffer length before any signature is checked.
pub const MIN_SNIFF_BYTES: usize = 12;

/// How a format is recognised from its leading bytes.
enum Signature {
    Prefix(&'static [u8]),
    Check(fn(&[u8]) -> bool),
}

/// An allow-listed image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Avif,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 5] = [
        ImageFormat::Jpeg,
        ImageFormat::Png,
        ImageFormat::Gif,
        ImageFormat::Webp,
        ImageFormat::Avif,
    ];

    /// Canonical MIME type, used verbatim in the proxied response.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Avif => "image/avif",
        }
    }

    /// Look up an allow-listed format from a `Content-Type` header value.
    ///
    /// Parameters (`; charset=...`) are ignored and matching is case-insensitive.
    pub fn from_content_type(ct: &str) -> Option<Self> {
        let essence = ct.split(';').next().unwrap_or("").trim();
        Self::ALL
            .into_iter()
            .find(|f| f.mime_type().eq_ignore_ascii_case(essence))
    }

    fn signature(self) -> Signature {
        match self {
            ImageFormat::Jpeg => Signature::Prefix(&[0xFF, 0xD8, 0xFF]),
            ImageFormat::Png => Signature::Prefix(&[0x89, 0x50, 0x4E, 0x47]),
            ImageFormat::Gif => Signature::Prefix(b"GIF8"),
            ImageFormat::Webp => Signature::Check(|d| &d[0..4] == b"RIFF" && &d[8..12] == b"WEBP"),
            // ISO-BMFF box header: size (4 bytes) then "ftyp"
            ImageFormat::Avif => Signature::Check(|d| &d[4..8] == b"ftyp"),
        }
    }

    /// Whether `data` starts with this format's signature.
    pub fn matches(self, data: &[u8]) -> bool {
        if data.len() < MIN_SNIFF_BYTES {
            return false;
        }
        match self.signature() {
            Signature::Prefix(magic) => data.starts_with(magic),
            Signature::Check(check) => check(data),
        }
    }
}

/// Validate a fetched buffer against its declared content type.
///
/// Fails when the declared type is not allow-listed, when the buffer is too
/// short to sniff, or when the leading bytes belong to something else.
pub fn validate(data: &[u8], claimed_content_type: &str) -> bool {
    ImageFormat::from_content_type(claimed_content_type).is_some_and(|f| f.matches(data))
}
