// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded views over a region of a larger stream.

use {
    log::{trace, warn},
    std::io::{Read, Seek, SeekFrom},
};

fn unsupported_seek() -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "source stream does not support seeking",
    )
}

/// A byte stream an archive is read from.
///
/// Sources are always readable. Random access is optional and is probed at
/// run-time: sources that cannot seek return [None] from the positioning
/// methods.
pub trait ArchiveSource: Read {
    /// The current absolute offset of the stream.
    fn position(&mut self) -> Option<std::io::Result<u64>>;

    /// Move the stream to an absolute offset.
    fn seek_to(&mut self, offset: u64) -> Option<std::io::Result<u64>>;
}

impl<S: ArchiveSource + ?Sized> ArchiveSource for &mut S {
    fn position(&mut self) -> Option<std::io::Result<u64>> {
        (**self).position()
    }

    fn seek_to(&mut self, offset: u64) -> Option<std::io::Result<u64>> {
        (**self).seek_to(offset)
    }
}

/// An [ArchiveSource] that can only be read forward.
#[derive(Clone, Debug)]
pub struct Sequential<R>(R);

impl<R: Read> Sequential<R> {
    pub fn new(reader: R) -> Self {
        Self(reader)
    }

    pub fn get_ref(&self) -> &R {
        &self.0
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.0
    }

    pub fn into_inner(self) -> R {
        self.0
    }
}

impl<R: Read> Read for Sequential<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R: Read> ArchiveSource for Sequential<R> {
    fn position(&mut self) -> Option<std::io::Result<u64>> {
        None
    }

    fn seek_to(&mut self, _offset: u64) -> Option<std::io::Result<u64>> {
        None
    }
}

/// An [ArchiveSource] supporting random access.
#[derive(Clone, Debug)]
pub struct Seekable<R>(R);

impl<R: Read + Seek> Seekable<R> {
    pub fn new(reader: R) -> Self {
        Self(reader)
    }

    pub fn get_ref(&self) -> &R {
        &self.0
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.0
    }

    pub fn into_inner(self) -> R {
        self.0
    }
}

impl<R: Read + Seek> Read for Seekable<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R: Read + Seek> ArchiveSource for Seekable<R> {
    fn position(&mut self) -> Option<std::io::Result<u64>> {
        Some(self.0.stream_position())
    }

    fn seek_to(&mut self, offset: u64) -> Option<std::io::Result<u64>> {
        Some(self.0.seek(SeekFrom::Start(offset)))
    }
}

/// A reader exposing exactly `length` bytes of a source stream.
///
/// Reads never cross the length boundary, even if the source holds more data.
///
/// When padding is configured, releasing the reader (explicitly through
/// [Self::release] or implicitly on drop) leaves the source positioned exactly
/// `length + padding` bytes after where this reader started, no matter how
/// much was read. Sequential sources are advanced by discarding content.
/// Seekable sources are advanced with an absolute seek.
#[derive(Debug)]
pub struct BoundedReader<S: ArchiveSource> {
    source: S,
    /// Absolute offset of the region in the source, if the source can seek.
    start: Option<u64>,
    length: u64,
    position: u64,
    padding: Option<u8>,
    released: bool,
}

impl<S: ArchiveSource> BoundedReader<S> {
    /// Construct a reader over the next `length` bytes of `source`.
    pub fn new(mut source: S, length: u64, padding: Option<u8>) -> std::io::Result<Self> {
        let start = source.position().transpose()?;

        Ok(Self::from_parts(source, start, length, padding))
    }

    pub(crate) fn from_parts(
        source: S,
        start: Option<u64>,
        length: u64,
        padding: Option<u8>,
    ) -> Self {
        Self {
            source,
            start,
            length,
            position: 0,
            padding,
            released: false,
        }
    }

    /// The declared length of the region.
    pub fn len(&self) -> u64 {
        self.length
    }

    /// Whether the region is empty.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The current offset within the region.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Number of bytes left before the end of the region.
    pub fn remaining(&self) -> u64 {
        self.length.saturating_sub(self.position)
    }

    /// Whether the source supports seeking.
    pub fn is_seekable(&self) -> bool {
        self.start.is_some()
    }

    /// Advance the source past the end of the region and its padding.
    ///
    /// Does nothing if no padding was configured. Subsequent calls are no-ops and
    /// subsequent reads return EOF.
    ///
    /// A source ending before the end of the region is an error. A source ending
    /// inside the padding is not.
    pub fn release(&mut self) -> std::io::Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let remaining = self.remaining();
        self.position = self.length;

        let padding = match self.padding {
            Some(padding) => padding as u64,
            None => return Ok(()),
        };

        if let Some(start) = self.start {
            if let Some(res) = self.source.seek_to(start + self.length + padding) {
                res?;
                return Ok(());
            }
        }

        let skipped = std::io::copy(
            &mut (&mut self.source).take(remaining),
            &mut std::io::sink(),
        )?;
        if skipped < remaining {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "stream ended {} bytes before end of bounded region",
                    remaining - skipped
                ),
            ));
        }

        let skipped = std::io::copy(&mut (&mut self.source).take(padding), &mut std::io::sink())?;
        if skipped < padding {
            trace!("stream ended inside region padding");
        }

        Ok(())
    }
}

impl<S: ArchiveSource> Read for BoundedReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = self.remaining();
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let wanted = std::cmp::min(buf.len() as u64, remaining) as usize;
        let count = self.source.read(&mut buf[0..wanted])?;
        self.position += count as u64;

        Ok(count)
    }
}

impl<S: ArchiveSource> Seek for BoundedReader<S> {
    /// Seek within the region.
    ///
    /// The resulting position is clamped to `[0, length]`.
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let start = self.start.ok_or_else(unsupported_seek)?;

        if self.released {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "bounded region already released",
            ));
        }

        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(offset) => self.position as i128 + offset as i128,
            SeekFrom::End(offset) => self.length as i128 + offset as i128,
        };
        let position = target.clamp(0, self.length as i128) as u64;

        self.source
            .seek_to(start + position)
            .ok_or_else(unsupported_seek)??;
        self.position = position;

        Ok(position)
    }
}

impl<S: ArchiveSource> Drop for BoundedReader<S> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("error skipping to end of bounded region: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::io::Cursor};

    fn source_data() -> Vec<u8> {
        (0u8..100).collect()
    }

    #[test]
    fn read_stops_at_length() -> std::io::Result<()> {
        let mut cursor = Cursor::new(source_data());
        let mut reader = BoundedReader::new(Sequential::new(&mut cursor), 10, None)?;

        let mut buffer = [0u8; 64];
        let mut total = 0;
        loop {
            let count = reader.read(&mut buffer)?;
            if count == 0 {
                break;
            }
            total += count;
        }

        assert_eq!(total, 10);
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.read(&mut buffer)?, 0);

        Ok(())
    }

    #[test]
    fn read_to_end_is_bounded() -> std::io::Result<()> {
        let mut cursor = Cursor::new(source_data());
        cursor.set_position(20);

        let mut data = vec![];
        BoundedReader::new(Sequential::new(&mut cursor), 5, None)?.read_to_end(&mut data)?;

        assert_eq!(data, vec![20, 21, 22, 23, 24]);
        assert_eq!(cursor.position(), 25);

        Ok(())
    }

    #[test]
    fn sequential_release_skips_content_and_padding() -> std::io::Result<()> {
        let mut cursor = Cursor::new(source_data());
        cursor.set_position(4);

        {
            let mut reader = BoundedReader::new(Sequential::new(&mut cursor), 7, Some(1))?;
            let mut buffer = [0u8; 3];
            reader.read_exact(&mut buffer)?;
            assert_eq!(buffer, [4, 5, 6]);
        }

        assert_eq!(cursor.position(), 4 + 7 + 1);

        Ok(())
    }

    #[test]
    fn seekable_release_seeks_past_padding() -> std::io::Result<()> {
        let mut cursor = Cursor::new(source_data());
        cursor.set_position(5);

        {
            let mut reader = BoundedReader::new(Seekable::new(&mut cursor), 9, Some(1))?;
            assert!(reader.is_seekable());
            let mut buffer = [0u8; 2];
            reader.read_exact(&mut buffer)?;
        }

        assert_eq!(cursor.position(), 5 + 9 + 1);

        Ok(())
    }

    #[test]
    fn unread_region_is_skipped() -> std::io::Result<()> {
        let mut cursor = Cursor::new(source_data());

        drop(BoundedReader::new(Sequential::new(&mut cursor), 30, Some(0))?);
        assert_eq!(cursor.position(), 30);

        Ok(())
    }

    #[test]
    fn no_padding_leaves_cursor_alone() -> std::io::Result<()> {
        let mut cursor = Cursor::new(source_data());

        {
            let mut reader = BoundedReader::new(Sequential::new(&mut cursor), 30, None)?;
            let mut buffer = [0u8; 4];
            reader.read_exact(&mut buffer)?;
        }

        assert_eq!(cursor.position(), 4);

        Ok(())
    }

    #[test]
    fn explicit_release_is_idempotent() -> std::io::Result<()> {
        let mut cursor = Cursor::new(source_data());

        {
            let mut reader = BoundedReader::new(Sequential::new(&mut cursor), 3, Some(1))?;
            reader.release()?;
            reader.release()?;

            let mut buffer = [0u8; 4];
            assert_eq!(reader.read(&mut buffer)?, 0);
        }

        assert_eq!(cursor.position(), 4);

        Ok(())
    }

    #[test]
    fn release_of_truncated_region_fails() -> std::io::Result<()> {
        let mut cursor = Cursor::new(vec![0u8; 4]);

        let mut reader = BoundedReader::new(Sequential::new(&mut cursor), 10, Some(0))?;
        let err = reader.release().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);

        Ok(())
    }

    #[test]
    fn missing_final_padding_is_tolerated() -> std::io::Result<()> {
        let mut cursor = Cursor::new(vec![0u8; 3]);

        let mut reader = BoundedReader::new(Sequential::new(&mut cursor), 3, Some(1))?;
        reader.release()?;

        Ok(())
    }

    #[test]
    fn sequential_seek_unsupported() -> std::io::Result<()> {
        let mut cursor = Cursor::new(source_data());

        let mut reader = BoundedReader::new(Sequential::new(&mut cursor), 10, Some(0))?;
        let err = reader.seek(SeekFrom::Start(2)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);

        Ok(())
    }

    #[test]
    fn seek_clamps_to_region() -> std::io::Result<()> {
        let mut cursor = Cursor::new(source_data());
        cursor.set_position(10);

        let mut reader = BoundedReader::new(Seekable::new(&mut cursor), 20, Some(0))?;

        assert_eq!(reader.seek(SeekFrom::End(50))?, 20);
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.seek(SeekFrom::Current(-100))?, 0);
        assert_eq!(reader.seek(SeekFrom::Start(5))?, 5);

        let mut buffer = [0u8; 2];
        reader.read_exact(&mut buffer)?;
        assert_eq!(buffer, [15, 16]);
        assert_eq!(reader.position(), 7);

        assert_eq!(reader.seek(SeekFrom::End(-1))?, 19);
        let mut data = vec![];
        reader.read_to_end(&mut data)?;
        assert_eq!(data, vec![29]);

        Ok(())
    }
}
