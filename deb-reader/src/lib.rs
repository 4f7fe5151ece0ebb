// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Debian binary package reading.

This crate reads Debian binary package (`.deb`) files in a single forward pass
over any [std::io::Read], extracting metadata and the list of installed files
without writing anything to disk.

The canonical home of this crate is <https://github.com/indygreg/PyOxidizer>. Please file issues
and pull requests there.

# A Tour of Functionality

A `.deb` file is an `ar` archive holding a `debian-binary` version marker, a
`control.tar[.<codec>]` member with package metadata and a `data.tar[.<codec>]`
member with the installed files. The `ar` container is read by the `ar-archive`
crate.

[deb::reader::DebReader] is the main interface. [deb::reader::DebReader::read]
extracts either or both of the `control` fields and the data file manifest into
a [deb::DebReadResult].

The `control` file consists of `Name: value` fields. [control::ControlFields]
holds the parsed fields with case insensitive lookup.
[control::ControlStanzaParser] and [control::ControlStanzaReader] are the
lower-level parsing primitives.

Tar members may be compressed with gzip, xz or bzip2. See [io::Compression].
Each codec is behind a cargo feature (`gzip`, `xz` and `bzip2`), all enabled by
default.

# Example

```no_run
use deb_reader::deb::DebReader;

let fh = std::fs::File::open("package.deb")?;
let res = DebReader::new(std::io::BufReader::new(fh))?.read_all()?;

if let Some(control) = res.control {
    println!("{:?} {:?}", control.package(), control.version());
}
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

pub mod control;
pub mod deb;
pub mod error;
pub mod io;
