// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Interfaces for .deb package files.

The .deb file format is documented at <https://manpages.debian.org/unstable/dpkg-dev/deb.5.en.html>.
*/

use {
    crate::{control::ControlFields, error::Result, io::Compression},
    std::borrow::Cow,
};

pub mod reader;

pub use reader::DebReader;

/// The role of a member of a .deb `ar` archive, as derived from its name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MemberKind {
    /// `debian-binary`, holding the package format version.
    DebianBinary,

    /// `control.tar[.<codec>]`, holding package metadata.
    ControlTar(Option<String>),

    /// `data.tar[.<codec>]`, holding installed file content.
    DataTar(Option<String>),

    /// Anything else. Ignored.
    Other,
}

impl MemberKind {
    /// Classify a member by its `ar` name.
    pub fn from_name(name: &str) -> Self {
        if name == "debian-binary" {
            Self::DebianBinary
        } else if let Some(codec) = tar_codec(name, "control.tar") {
            Self::ControlTar(codec)
        } else if let Some(codec) = tar_codec(name, "data.tar") {
            Self::DataTar(codec)
        } else {
            Self::Other
        }
    }

    /// Resolve the compression of a tar member.
    ///
    /// Returns `None` for members that aren't tar archives.
    pub fn compression(&self) -> Option<Result<Compression>> {
        match self {
            Self::ControlTar(codec) | Self::DataTar(codec) => Some(match codec {
                Some(codec) => Compression::from_codec(codec),
                None => Ok(Compression::None),
            }),
            Self::DebianBinary | Self::Other => None,
        }
    }
}

/// `Some(None)` for an exact match, `Some(Some(codec))` for `<stem>.<codec>`.
fn tar_codec(name: &str, stem: &str) -> Option<Option<String>> {
    let tail = name.strip_prefix(stem)?;

    if tail.is_empty() {
        Some(None)
    } else {
        tail.strip_prefix('.').map(|codec| Some(codec.to_string()))
    }
}

/// Normalize the name of a tar entry.
///
/// A leading `./` is removed. Anything else passes through.
pub fn normalize_name(path: &[u8]) -> String {
    let path = String::from_utf8_lossy(path);

    match path {
        Cow::Borrowed(s) => s.strip_prefix("./").unwrap_or(s).to_string(),
        Cow::Owned(s) => match s.strip_prefix("./") {
            Some(stripped) => stripped.to_string(),
            None => s,
        },
    }
}

/// The outcome of reading a .deb file.
///
/// Members not requested from the reader are `None`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DebReadResult {
    /// Parsed fields of the `control` file.
    pub control: Option<ControlFields>,

    /// Raw bytes of the `control` file, before text decoding.
    pub control_data: Option<Vec<u8>>,

    /// Normalized names of all entries in the data archive, in archive order.
    pub files: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use {super::*, crate::error::DebError};

    #[test]
    fn member_classification() {
        assert_eq!(MemberKind::from_name("debian-binary"), MemberKind::DebianBinary);
        assert_eq!(MemberKind::from_name("control.tar"), MemberKind::ControlTar(None));
        assert_eq!(
            MemberKind::from_name("control.tar.xz"),
            MemberKind::ControlTar(Some("xz".into()))
        );
        assert_eq!(
            MemberKind::from_name("data.tar.gz"),
            MemberKind::DataTar(Some("gz".into()))
        );
        assert_eq!(MemberKind::from_name("data.tar"), MemberKind::DataTar(None));
        assert_eq!(MemberKind::from_name("data.tarx"), MemberKind::Other);
        assert_eq!(MemberKind::from_name("_gpgorigin"), MemberKind::Other);
        assert_eq!(MemberKind::from_name("debian-binary.gz"), MemberKind::Other);
    }

    #[test]
    fn member_compression() -> Result<()> {
        assert!(MemberKind::DebianBinary.compression().is_none());
        assert!(MemberKind::Other.compression().is_none());

        let kind = MemberKind::from_name("data.tar");
        assert_eq!(kind.compression().transpose()?, Some(Compression::None));

        let kind = MemberKind::from_name("control.tar.gzip");
        assert_eq!(kind.compression().transpose()?, Some(Compression::Gzip));

        let kind = MemberKind::from_name("data.tar.zst");
        assert!(matches!(
            kind.compression(),
            Some(Err(DebError::UnsupportedCompression(codec))) if codec == "zst"
        ));

        Ok(())
    }

    #[test]
    fn name_normalization() {
        assert_eq!(normalize_name(b"./usr/bin/foo"), "usr/bin/foo");
        assert_eq!(normalize_name(b"usr/share/doc/foo"), "usr/share/doc/foo");
        assert_eq!(normalize_name(b"./"), "");
        assert_eq!(normalize_name(b"control"), "control");
        assert_eq!(normalize_name(b"/etc/foo"), "/etc/foo");
        assert_eq!(normalize_name(b"././x"), "./x");
        assert_eq!(normalize_name(b"./caf\xe9"), "caf\u{fffd}");
    }
}
