// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reading of `ar` archive members.

use {
    crate::{
        bounded::{ArchiveSource, BoundedReader, Seekable, Sequential},
        ArResult, Error,
    },
    chrono::{DateTime, TimeZone, Utc},
    log::trace,
    std::{
        io::{Cursor, Read, Seek, SeekFrom},
        str::FromStr,
    },
};

/// Global header at the start of every archive.
pub const MAGIC: &[u8] = b"!<arch>\n";

/// Size in bytes of a member header.
pub const HEADER_LENGTH: usize = 60;

/// Terminator of every member header.
pub const HEADER_MAGIC: &[u8] = b"`\n";

/// Upper bound of the initial buffer allocated for a buffered entry.
const BUFFER_CAPACITY_HINT: u64 = 64 * 1024;

/// Read until `buf` is full or the reader hits EOF.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut offset = 0;

    while offset < buf.len() {
        match reader.read(&mut buf[offset..]) {
            Ok(0) => break,
            Ok(count) => offset += count,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    Ok(offset)
}

fn header_string(data: &[u8]) -> String {
    String::from_utf8_lossy(data).trim_end_matches(' ').to_string()
}

fn header_number<T: FromStr>(field: &'static str, data: &[u8]) -> ArResult<T> {
    let value = header_string(data);

    let bad_number = || Error::BadHeaderNumber {
        field,
        value: value.clone(),
    };

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad_number());
    }

    value.parse::<T>().map_err(|_| bad_number())
}

/// A parsed `ar` member header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArHeader {
    /// Member name, with trailing `/` (GNU style) removed.
    pub name: String,
    /// Modification time as seconds since UNIX epoch.
    pub mtime: u64,
    pub uid: u32,
    pub gid: u32,
    /// File mode, as the raw octal text of the header.
    pub mode: String,
    /// Size of the member data in bytes, excluding padding.
    pub size: u64,
}

impl ArHeader {
    /// Parse a header from its fixed-width representation.
    ///
    /// Layout is name(16) mtime(12) uid(6) gid(6) mode(8) size(10) magic(2).
    pub fn from_bytes(data: &[u8; HEADER_LENGTH]) -> ArResult<Self> {
        if &data[58..60] != HEADER_MAGIC {
            return Err(Error::BadEntryMagic);
        }

        Ok(Self {
            name: header_string(&data[0..16])
                .trim_end_matches('/')
                .to_string(),
            mtime: header_number("modification time", &data[16..28])?,
            uid: header_number("owner id", &data[28..34])?,
            gid: header_number("group id", &data[34..40])?,
            mode: header_string(&data[40..48]),
            size: header_number("size", &data[48..58])?,
        })
    }

    /// Modified time as a [DateTime].
    ///
    /// [None] if the timestamp is out of range.
    pub fn modified_time(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.mtime)
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    /// Number of padding bytes following the member data.
    ///
    /// Members are aligned on 2 bytes.
    pub fn padding(&self) -> u8 {
        (self.size % 2) as u8
    }
}

/// A forward-only reader of `ar` archive members.
///
/// Members are obtained with [Self::next_entry], which behaves like a cursor: the
/// returned [ArEntry] borrows the reader, so only one member can be alive at a
/// time. When it goes away, the stream is advanced to the next member header.
pub struct ArReader<S: ArchiveSource> {
    source: S,
    finished: bool,
}

impl<R: Read> ArReader<Sequential<R>> {
    /// Construct a new instance from a forward-only reader.
    pub fn new(reader: R) -> ArResult<Self> {
        Self::from_source(Sequential::new(reader))
    }
}

impl<R: Read + Seek> ArReader<Seekable<R>> {
    /// Construct a new instance from a reader supporting random access.
    ///
    /// Skipping over unread member data is performed by seeking instead of reading.
    pub fn new_seekable(reader: R) -> ArResult<Self> {
        Self::from_source(Seekable::new(reader))
    }
}

impl<S: ArchiveSource> ArReader<S> {
    /// Construct a new instance from an [ArchiveSource].
    ///
    /// The archive magic is validated immediately.
    pub fn from_source(mut source: S) -> ArResult<Self> {
        let mut magic = [0u8; 8];
        let count = read_full(&mut source, &mut magic)?;

        if count != magic.len() || magic != MAGIC {
            return Err(Error::BadMagic);
        }

        Ok(Self {
            source,
            finished: false,
        })
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Consume self, returning the underlying source.
    pub fn into_inner(self) -> S {
        self.source
    }

    fn read_header(&mut self) -> ArResult<Option<ArHeader>> {
        let mut data = [0u8; HEADER_LENGTH];

        match read_full(&mut self.source, &mut data)? {
            0 => Ok(None),
            HEADER_LENGTH => {
                let header = ArHeader::from_bytes(&data)?;
                trace!("read ar header {:?}", header);

                Ok(Some(header))
            }
            _ => Err(Error::TruncatedHeader),
        }
    }

    /// Obtain the next member of the archive.
    ///
    /// `None` at end of archive. Once an error is returned, the reader is exhausted.
    pub fn next_entry(&mut self) -> Option<ArResult<ArEntry<'_, S>>> {
        if self.finished {
            return None;
        }

        let header = match self.read_header() {
            Ok(Some(header)) => header,
            Ok(None) => {
                self.finished = true;
                return None;
            }
            Err(e) => {
                self.finished = true;
                return Some(Err(e));
            }
        };

        let start = match self.source.position().transpose() {
            Ok(start) => start,
            Err(e) => {
                self.finished = true;
                return Some(Err(e.into()));
            }
        };

        let padding = header.padding();
        let data = BoundedReader::from_parts(&mut self.source, start, header.size, Some(padding));

        Some(Ok(ArEntry { header, data }))
    }

    /// Obtain the next member of the archive, with its data copied into memory.
    ///
    /// The returned entry doesn't borrow the reader.
    pub fn next_entry_buffered(&mut self) -> Option<ArResult<ArBufferedEntry>> {
        let entry = match self.next_entry()? {
            Ok(entry) => entry,
            Err(e) => return Some(Err(e)),
        };

        let res = entry.into_buffered();
        if res.is_err() {
            self.finished = true;
        }

        Some(res)
    }

    /// Obtain an [Iterator] of members having their data copied into memory.
    pub fn buffered_entries(&mut self) -> BufferedEntries<'_, S> {
        BufferedEntries { reader: self }
    }
}

/// A member of an `ar` archive being streamed from its source.
///
/// Implements [Read] for obtaining the member data. [Seek] works if the
/// archive source supports it.
pub struct ArEntry<'a, S: ArchiveSource> {
    header: ArHeader,
    data: BoundedReader<&'a mut S>,
}

impl<'a, S: ArchiveSource> ArEntry<'a, S> {
    /// The parsed header of this member.
    pub fn header(&self) -> &ArHeader {
        &self.header
    }

    /// The name of this member.
    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// Bytes of member data not yet read.
    pub fn remaining(&self) -> u64 {
        self.data.remaining()
    }

    /// Skip to the end of this member, propagating I/O errors.
    ///
    /// Dropping the entry has the same effect, but errors are only logged.
    pub fn finish(mut self) -> ArResult<()> {
        self.data.release()?;

        Ok(())
    }

    /// Copy the remaining member data into memory.
    ///
    /// The declared size only caps the initial allocation. A source holding less
    /// data than declared is an error.
    pub fn into_buffered(mut self) -> ArResult<ArBufferedEntry> {
        let capacity = std::cmp::min(self.data.remaining(), BUFFER_CAPACITY_HINT);
        let mut data = Vec::with_capacity(capacity as usize);
        self.data.read_to_end(&mut data)?;
        self.data.release()?;

        Ok(ArBufferedEntry {
            header: self.header.clone(),
            data: Cursor::new(data),
        })
    }
}

impl<'a, S: ArchiveSource> Read for ArEntry<'a, S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.data.read(buf)
    }
}

impl<'a, S: ArchiveSource> Seek for ArEntry<'a, S> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.data.seek(pos)
    }
}

/// A member of an `ar` archive whose data is held in memory.
#[derive(Clone, Debug)]
pub struct ArBufferedEntry {
    header: ArHeader,
    data: Cursor<Vec<u8>>,
}

impl ArBufferedEntry {
    /// The parsed header of this member.
    pub fn header(&self) -> &ArHeader {
        &self.header
    }

    /// The name of this member.
    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// The full member data.
    pub fn data(&self) -> &[u8] {
        self.data.get_ref()
    }

    /// Consume self, returning the member data.
    pub fn into_data(self) -> Vec<u8> {
        self.data.into_inner()
    }
}

impl Read for ArBufferedEntry {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.data.read(buf)
    }
}

impl Seek for ArBufferedEntry {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.data.seek(pos)
    }
}

/// Iterator over [ArBufferedEntry] of an [ArReader].
pub struct BufferedEntries<'a, S: ArchiveSource> {
    reader: &'a mut ArReader<S>,
}

impl<'a, S: ArchiveSource> Iterator for BufferedEntries<'a, S> {
    type Item = ArResult<ArBufferedEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_entry_buffered()
    }
}
