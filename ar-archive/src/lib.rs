// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Unix `ar` archive reading.

The `ar` format is a flat container of named members. Each member is
described by a fixed 60 byte ASCII header followed by the member data, which
is padded to an even offset. See <https://en.wikipedia.org/wiki/Ar_(Unix)>.

[ArReader] is a forward-only cursor over the members of an archive. Each
member is exposed as an [ArEntry], which reads through a [BoundedReader] that
cannot read past the member. When an entry is dropped, the underlying stream
is advanced to the start of the next member regardless of how much of the
entry was consumed.

Whether the underlying stream supports random access is expressed through
the [ArchiveSource] trait. [Sequential] wraps any [std::io::Read] and
[Seekable] wraps a [std::io::Read] + [std::io::Seek].
*/

pub mod bounded;
pub use bounded::{ArchiveSource, BoundedReader, Seekable, Sequential};
pub mod reader;
pub use reader::{ArBufferedEntry, ArEntry, ArHeader, ArReader, BufferedEntries};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not an ar archive: bad magic value")]
    BadMagic,

    #[error("unexpected end of stream in entry header")]
    TruncatedHeader,

    #[error("invalid integer in {field} header field: {value:?}")]
    BadHeaderNumber { field: &'static str, value: String },

    #[error("entry header does not end with the expected terminator")]
    BadEntryMagic,
}

/// Result type for this crate.
pub type ArResult<T> = Result<T, Error>;
