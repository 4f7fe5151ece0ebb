// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use thiserror::Error;

/// Primary crate error type.
#[derive(Debug, Error)]
pub enum DebError {
    #[error("ar archive error: {0}")]
    Ar(#[from] ar_archive::Error),

    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("unsupported package version: {0:?}")]
    UnsupportedVersion(String),

    #[error("unsupported compression in deb archive member: {0:?}")]
    UnsupportedCompression(String),

    #[error("control archive contains no entries")]
    ControlTarEmpty,

    #[error("corrupt control archive: {0}")]
    ControlTarCorrupt(std::io::Error),

    #[error("corrupt data archive: {0}")]
    DataTarCorrupt(std::io::Error),

    #[error("no control file found in control archive")]
    ControlFileNotFound,

    #[error("no control.tar member found in deb archive")]
    ControlTarNotFound,

    #[error("no data.tar member found in deb archive")]
    DataTarNotFound,
}

impl DebError {
    /// Whether this error is caused by malformed or incomplete package content.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::Ar(ar_archive::Error::BadMagic)
                | Self::Ar(ar_archive::Error::TruncatedHeader)
                | Self::Ar(ar_archive::Error::BadHeaderNumber { .. })
                | Self::Ar(ar_archive::Error::BadEntryMagic)
                | Self::ControlTarEmpty
                | Self::ControlTarCorrupt(_)
                | Self::DataTarCorrupt(_)
                | Self::ControlFileNotFound
                | Self::ControlTarNotFound
                | Self::DataTarNotFound
        )
    }

    /// Whether this error is caused by a package feature this crate doesn't support.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedVersion(_) | Self::UnsupportedCompression(_)
        )
    }
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, DebError>;
