// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! .deb file reading functionality. */

use {
    crate::{
        control::{ControlFields, ControlStanzaReader},
        deb::{normalize_name, DebReadResult, MemberKind},
        error::{DebError, Result},
        io::{read_decompressed, Compression, TextEncoding},
    },
    ar_archive::{ArReader, ArchiveSource, Seekable, Sequential},
    log::{debug, trace, warn},
    std::io::{BufRead, BufReader, Cursor, Read, Seek},
};

/// The only supported binary package format version.
const DEBIAN_BINARY_VERSION: &str = "2.0";

/// A reader of .deb files.
///
/// A .deb binary package file is an ar archive with 3 entries:
///
/// 1. `debian-binary` holding the version of the binary package format.
/// 2. `control.tar[.<ext>]` holding package metadata.
/// 3. `data.tar[.<ext>]` holding file content.
///
/// The archive is consumed in a single forward pass. Members are streamed from
/// the source unless [DebReader::buffered] is enabled.
pub struct DebReader<S: ArchiveSource> {
    archive: ArReader<S>,
    encoding: TextEncoding,
    buffered: bool,
}

impl<R: Read> DebReader<Sequential<R>> {
    /// Construct a new instance from a reader.
    ///
    /// The `ar` magic is validated immediately.
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self::from_archive(ArReader::new(reader)?))
    }
}

impl<R: Read + Seek> DebReader<Seekable<R>> {
    /// Construct a new instance from a seekable reader.
    ///
    /// Unread member data is skipped by seeking instead of reading.
    pub fn new_seekable(reader: R) -> Result<Self> {
        Ok(Self::from_archive(ArReader::new_seekable(reader)?))
    }
}

impl<S: ArchiveSource> DebReader<S> {
    /// Construct an instance from an existing `ar` reader.
    pub fn from_archive(archive: ArReader<S>) -> Self {
        Self {
            archive,
            encoding: TextEncoding::default(),
            buffered: false,
        }
    }

    /// Set the encoding used to decode the `control` file.
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Whether to copy each `ar` member into memory before processing it.
    pub fn buffered(mut self, buffered: bool) -> Self {
        self.buffered = buffered;
        self
    }

    /// Read the package.
    ///
    /// `want_control` and `want_files` select which of the `control` fields and
    /// the data file manifest are extracted. Requested content that is absent
    /// from the package is an error. Members that aren't requested are skipped
    /// without being decompressed.
    pub fn read(mut self, want_control: bool, want_files: bool) -> Result<DebReadResult> {
        let mut visitor = MemberVisitor::new(self.encoding, want_control, want_files);

        if self.buffered {
            while let Some(entry) = self.archive.next_entry_buffered() {
                let mut entry = entry?;
                let name = entry.name().to_string();

                visitor.visit(&name, &mut entry)?;
            }
        } else {
            while let Some(entry) = self.archive.next_entry() {
                let mut entry = entry?;
                let name = entry.name().to_string();

                visitor.visit(&name, &mut entry)?;
                entry.finish()?;
            }
        }

        visitor.finish()
    }

    /// Read only the `control` fields.
    pub fn read_control(self) -> Result<ControlFields> {
        self.read(true, false)?
            .control
            .ok_or(DebError::ControlTarNotFound)
    }

    /// Read only the data file manifest.
    pub fn read_files(self) -> Result<Vec<String>> {
        self.read(false, true)?
            .files
            .ok_or(DebError::DataTarNotFound)
    }

    /// Read both the `control` fields and the data file manifest.
    pub fn read_all(self) -> Result<DebReadResult> {
        self.read(true, true)
    }
}

/// Per-member dispatch and accumulated state of a single pass.
struct MemberVisitor {
    encoding: TextEncoding,
    want_control: bool,
    want_files: bool,
    control_seen: bool,
    data_seen: bool,
    result: DebReadResult,
}

impl MemberVisitor {
    fn new(encoding: TextEncoding, want_control: bool, want_files: bool) -> Self {
        Self {
            encoding,
            want_control,
            want_files,
            control_seen: false,
            data_seen: false,
            result: DebReadResult::default(),
        }
    }

    fn visit(&mut self, name: &str, data: &mut dyn Read) -> Result<()> {
        let kind = MemberKind::from_name(name);
        debug!("deb member {} is {:?}", name, kind);

        match kind {
            MemberKind::DebianBinary => check_version(data),
            MemberKind::ControlTar(_) => {
                if self.control_seen {
                    warn!("ignoring extra control member {}", name);
                    return Ok(());
                }
                self.control_seen = true;

                if self.want_control {
                    let mut archive = open_tar(&kind, data)?;
                    let (raw, fields) = self.read_control_tar(&mut archive)?;
                    self.result.control_data = Some(raw);
                    self.result.control = Some(fields);
                }

                Ok(())
            }
            MemberKind::DataTar(_) => {
                if self.data_seen {
                    warn!("ignoring extra data member {}", name);
                    return Ok(());
                }
                self.data_seen = true;

                if self.want_files {
                    let mut archive = open_tar(&kind, data)?;
                    self.result.files = Some(read_data_tar(&mut archive)?);
                }

                Ok(())
            }
            MemberKind::Other => Ok(()),
        }
    }

    /// Find the `control` file and return its raw and parsed content.
    fn read_control_tar(
        &self,
        archive: &mut tar::Archive<impl Read>,
    ) -> Result<(Vec<u8>, ControlFields)> {
        let mut seen_entry = false;

        for entry in archive.entries().map_err(DebError::ControlTarCorrupt)? {
            let mut entry = entry.map_err(DebError::ControlTarCorrupt)?;
            seen_entry = true;

            if normalize_name(&entry.path_bytes()) == "control" {
                let mut data = vec![];
                entry
                    .read_to_end(&mut data)
                    .map_err(DebError::ControlTarCorrupt)?;

                let text = self.encoding.decode(&data).into_owned();
                let fields = ControlStanzaReader::new(Cursor::new(text.as_bytes()))
                    .collect::<Result<Vec<_>>>()?;
                let fields = ControlFields::from_fields(&text, fields);

                return Ok((data, fields));
            }
        }

        Err(if seen_entry {
            DebError::ControlFileNotFound
        } else {
            DebError::ControlTarEmpty
        })
    }

    fn finish(self) -> Result<DebReadResult> {
        if self.want_control && self.result.control.is_none() {
            return Err(DebError::ControlTarNotFound);
        }
        if self.want_files && self.result.files.is_none() {
            return Err(DebError::DataTarNotFound);
        }

        Ok(self.result)
    }
}

/// Verify the first line of `debian-binary`. The rest of the member is ignored.
fn check_version(data: &mut dyn Read) -> Result<()> {
    let mut line = vec![];
    BufReader::new(data).read_until(b'\n', &mut line)?;

    let text = TextEncoding::Ascii.decode(&line);
    let version = text.trim_end_matches('\n').trim_end_matches('\r');

    if version == DEBIAN_BINARY_VERSION {
        debug!("debian-binary version {}", version);
        Ok(())
    } else {
        Err(DebError::UnsupportedVersion(version.to_string()))
    }
}

fn open_tar<'a>(
    kind: &MemberKind,
    data: &'a mut dyn Read,
) -> Result<tar::Archive<Box<dyn Read + 'a>>> {
    let compression = kind.compression().unwrap_or(Ok(Compression::None))?;

    Ok(tar::Archive::new(read_decompressed(data, compression)?))
}

fn read_data_tar(archive: &mut tar::Archive<impl Read>) -> Result<Vec<String>> {
    let mut files = vec![];

    for entry in archive.entries().map_err(DebError::DataTarCorrupt)? {
        let entry = entry.map_err(DebError::DataTarCorrupt)?;
        let name = normalize_name(&entry.path_bytes());
        trace!("data entry {}", name);

        files.push(name);
    }

    Ok(files)
}
