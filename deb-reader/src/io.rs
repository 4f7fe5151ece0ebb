// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! I/O helpers. */

use {
    crate::error::{DebError, Result},
    std::{borrow::Cow, io::Read},
    strum::{Display, EnumIter, EnumString},
};

/// Compression format of `.deb` archive members.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Compression {
    /// No compression (no extension).
    None,

    /// Gzip compression (`.gz` or `.gzip` extension).
    Gzip,

    /// XZ compression (`.xz` extension).
    Xz,

    /// Bzip2 compression (`.bzip2` extension).
    Bzip2,
}

impl Compression {
    /// Resolve the compression format from a member name suffix.
    ///
    /// `codec` is the text following the final `.` of e.g. `data.tar.xz`.
    pub fn from_codec(codec: &str) -> Result<Self> {
        match codec {
            "gz" | "gzip" => Ok(Self::Gzip),
            "xz" => Ok(Self::Xz),
            "bzip2" => Ok(Self::Bzip2),
            _ => Err(DebError::UnsupportedCompression(codec.to_string())),
        }
    }

    /// The canonical member name suffix for this format.
    pub fn codec(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Gzip => "gz",
            Self::Xz => "xz",
            Self::Bzip2 => "bzip2",
        }
    }
}

/// Wrap a reader with transparent decompression.
///
/// Formats whose cargo feature is disabled are rejected as unsupported.
pub fn read_decompressed<'a>(
    stream: impl Read + 'a,
    compression: Compression,
) -> Result<Box<dyn Read + 'a>> {
    Ok(match compression {
        Compression::None => Box::new(stream),
        #[cfg(feature = "gzip")]
        Compression::Gzip => Box::new(libflate::gzip::Decoder::new(stream)?),
        #[cfg(feature = "xz")]
        Compression::Xz => Box::new(xz2::read::XzDecoder::new(stream)),
        #[cfg(feature = "bzip2")]
        Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(stream)),
        #[allow(unreachable_patterns)]
        other => return Err(DebError::UnsupportedCompression(other.codec().to_string())),
    })
}

/// Character encoding used to decode text members.
#[derive(Clone, Copy, Debug, Default, Display, EnumIter, EnumString, Eq, PartialEq)]
pub enum TextEncoding {
    /// 7-bit ASCII. Bytes above `0x7f` decode to `?`.
    #[default]
    #[strum(to_string = "ascii", serialize = "us-ascii")]
    Ascii,

    /// UTF-8. Invalid sequences decode to U+FFFD.
    #[strum(to_string = "utf-8", serialize = "utf8")]
    Utf8,

    /// ISO-8859-1. Every byte decodes to the code point of the same value.
    #[strum(to_string = "latin1", serialize = "iso-8859-1")]
    Latin1,
}

impl TextEncoding {
    /// Decode bytes to a string.
    pub fn decode<'a>(&self, data: &'a [u8]) -> Cow<'a, str> {
        match self {
            Self::Ascii => {
                if data.is_ascii() {
                    // ASCII is a subset of UTF-8.
                    String::from_utf8_lossy(data)
                } else {
                    Cow::Owned(
                        data.iter()
                            .map(|b| if b.is_ascii() { *b as char } else { '?' })
                            .collect(),
                    )
                }
            }
            Self::Utf8 => String::from_utf8_lossy(data),
            Self::Latin1 => Cow::Owned(data.iter().map(|b| *b as char).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::str::FromStr, strum::IntoEnumIterator};

    #[test]
    fn codec_resolution() -> Result<()> {
        assert_eq!(Compression::from_codec("gz")?, Compression::Gzip);
        assert_eq!(Compression::from_codec("gzip")?, Compression::Gzip);
        assert_eq!(Compression::from_codec("xz")?, Compression::Xz);
        assert_eq!(Compression::from_codec("bzip2")?, Compression::Bzip2);

        for codec in ["zst", "bz2", "lzma", "", "GZ"] {
            assert!(matches!(
                Compression::from_codec(codec),
                Err(DebError::UnsupportedCompression(c)) if c == codec
            ));
        }

        Ok(())
    }

    #[test]
    fn uncompressed_passthrough() -> Result<()> {
        let mut reader = read_decompressed(std::io::Cursor::new(b"plain"), Compression::None)?;
        let mut data = vec![];
        reader.read_to_end(&mut data)?;
        assert_eq!(data, b"plain");

        Ok(())
    }

    #[cfg(feature = "xz")]
    #[test]
    fn xz_decompression() -> Result<()> {
        use std::io::Write;

        let mut encoder = xz2::write::XzEncoder::new(vec![], 6);
        encoder.write_all(b"hello, xz")?;
        let compressed = encoder.finish()?;

        let mut reader = read_decompressed(std::io::Cursor::new(compressed), Compression::Xz)?;
        let mut data = String::new();
        reader.read_to_string(&mut data)?;
        assert_eq!(data, "hello, xz");

        Ok(())
    }

    #[test]
    fn text_decoding() {
        let data = b"caf\xe9";

        assert_eq!(TextEncoding::Ascii.decode(b"plain"), "plain");
        assert_eq!(TextEncoding::Ascii.decode(data), "caf?");
        assert_eq!(TextEncoding::Latin1.decode(data), "caf\u{e9}");
        assert_eq!(TextEncoding::Utf8.decode(data), "caf\u{fffd}");
        assert_eq!(TextEncoding::Utf8.decode("café".as_bytes()), "café");
    }

    #[test]
    fn encoding_names() {
        assert_eq!(TextEncoding::from_str("ascii").unwrap(), TextEncoding::Ascii);
        assert_eq!(TextEncoding::from_str("utf8").unwrap(), TextEncoding::Utf8);
        assert_eq!(TextEncoding::from_str("iso-8859-1").unwrap(), TextEncoding::Latin1);
        assert!(TextEncoding::from_str("ebcdic").is_err());
        assert_eq!(TextEncoding::Utf8.to_string(), "utf-8");
        assert_eq!(TextEncoding::default(), TextEncoding::Ascii);

        for encoding in TextEncoding::iter() {
            assert_eq!(TextEncoding::from_str(&encoding.to_string()).unwrap(), encoding);
        }
    }
}
