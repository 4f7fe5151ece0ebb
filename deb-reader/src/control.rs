// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Control file parsing.

The `control` file of a binary package is a *stanza* of `Name: value` fields.
A line beginning with a space continues the value of the previous field.
See <https://www.debian.org/doc/debian-policy/ch-controlfields.html>.

Parsing is lenient: the whole file is read as one flat set of fields, blank
lines are skipped and lines that are neither a field nor a continuation are
ignored.
*/

use {
    crate::error::Result,
    log::debug,
    std::io::BufRead,
};

/// A field of a control stanza, as its raw value lines.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StanzaField {
    /// Field name, verbatim.
    pub name: String,
    /// Value lines. The first line is the text after the colon. Following lines
    /// are continuation lines with leading spaces removed.
    pub lines: Vec<String>,
}

impl StanzaField {
    /// The value with lines joined by newlines.
    pub fn value(&self) -> String {
        self.lines.join("\n")
    }
}

/// Holds parsing state for control stanzas.
///
/// Instances are fed lines of text and emit a [StanzaField] each time a new
/// field starts, as the previous field is then complete.
#[derive(Clone, Debug, Default)]
pub struct ControlStanzaParser {
    field: Option<StanzaField>,
}

impl ControlStanzaParser {
    /// Write a line to the parser.
    ///
    /// A trailing line ending is ignored. Returns the previous field if this line
    /// starts a new one.
    pub fn write_line(&mut self, line: &str) -> Option<StanzaField> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.trim().is_empty() {
            return None;
        }

        if line.starts_with(' ') {
            match self.field.as_mut() {
                Some(field) => field.lines.push(line.trim_start_matches(' ').to_string()),
                None => debug!("ignoring continuation line before any field: {:?}", line),
            }

            return None;
        }

        match line.split_once(':') {
            Some((name, value)) => self.field.replace(StanzaField {
                name: name.to_string(),
                lines: vec![value.trim().to_string()],
            }),
            None => {
                debug!("ignoring malformed control line: {:?}", line);
                None
            }
        }
    }

    /// Finish parsing, returning the last field, if any.
    pub fn finish(self) -> Option<StanzaField> {
        self.field
    }
}

/// Parse all fields of a control stanza held in a string.
pub fn parse_stanza(text: &str) -> Vec<StanzaField> {
    let mut parser = ControlStanzaParser::default();

    let mut fields = text
        .lines()
        .filter_map(|line| parser.write_line(line))
        .collect::<Vec<_>>();
    fields.extend(parser.finish());

    fields
}

/// A streaming reader of [StanzaField].
///
/// Instances are bound to a reader of decoded text and can be consumed as an
/// iterator.
pub struct ControlStanzaReader<R: BufRead> {
    reader: R,
    parser: Option<ControlStanzaParser>,
}

impl<R: BufRead> ControlStanzaReader<R> {
    /// Create a new instance bound to a reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            parser: Some(ControlStanzaParser::default()),
        }
    }

    /// Consumes the instance, returning the original reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead> Iterator for ControlStanzaReader<R> {
    type Item = Result<StanzaField>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let parser = self.parser.as_mut()?;

            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                // .read_line() indicates EOF by Ok(0).
                Ok(0) => return self.parser.take()?.finish().map(Ok),
                Ok(_) => {
                    if let Some(field) = parser.write_line(&line) {
                        return Some(Ok(field));
                    }
                }
                Err(e) => {
                    self.parser = None;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

/// The fields of a package `control` file.
///
/// Field names are case insensitive on lookup. Iteration follows the order in
/// which names were first seen and reports them with their first-seen casing.
///
/// The special field named `""` holds the full original control text.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ControlFields {
    fields: Vec<(String, String)>,
}

impl ControlFields {
    /// Parse control text.
    pub fn from_text(text: &str) -> Self {
        Self::from_fields(text, parse_stanza(text))
    }

    /// Construct an instance from the original text and its parsed fields.
    ///
    /// Value lines are joined with newlines. A later field with the same name
    /// replaces the value of the earlier one.
    pub fn from_fields(text: &str, fields: impl IntoIterator<Item = StanzaField>) -> Self {
        let mut res = Self {
            fields: vec![(String::new(), text.to_string())],
        };

        for field in fields {
            if field.name.is_empty() {
                debug!("ignoring control field without a name");
                continue;
            }

            let value = field.value();
            res.set(field.name, value);
        }

        res
    }

    fn set(&mut self, name: String, value: String) {
        let lower = name.to_lowercase();

        match self.fields.iter_mut().find(|(k, _)| k.to_lowercase() == lower) {
            Some(entry) => entry.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Obtain the value of a field.
    pub fn get(&self, name: &str) -> Option<&str> {
        let lower = name.to_lowercase();

        self.fields
            .iter()
            .find(|(k, _)| k.to_lowercase() == lower)
            .map(|(_, v)| v.as_str())
    }

    /// Whether a named field is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over all `(name, value)` pairs, including the `""` entry.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over parsed fields, excluding the `""` entry.
    pub fn iter_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| !k.is_empty())
    }

    /// Number of entries, including the `""` entry.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The original control text.
    pub fn original_text(&self) -> &str {
        self.get("").unwrap_or_default()
    }

    /// The `Package` field.
    pub fn package(&self) -> Option<&str> {
        self.get("Package")
    }

    /// The `Version` field.
    pub fn version(&self) -> Option<&str> {
        self.get("Version")
    }

    /// The `Architecture` field.
    pub fn architecture(&self) -> Option<&str> {
        self.get("Architecture")
    }

    /// The raw `Depends` field.
    pub fn depends(&self) -> Option<&str> {
        self.get("Depends")
    }
}

#[cfg(test)]
mod tests {
    use {super::*, indoc::indoc};

    #[test]
    fn continuation_and_blank_lines() {
        let text = "Package: foo\nVersion: 1.0\n Continuation\n\nDepends: bar\n";
        let fields = ControlFields::from_text(text);

        assert_eq!(fields.package(), Some("foo"));
        assert_eq!(fields.version(), Some("1.0\nContinuation"));
        assert_eq!(fields.depends(), Some("bar"));
        assert_eq!(fields.original_text(), text);
        assert_eq!(fields.len(), 4);
    }

    #[test]
    fn stanza_fields_in_order() {
        let fields = parse_stanza(indoc! {"
            Package: foo
            Description: short
              long line one
             .
             long line two
            Architecture: amd64
        "});

        assert_eq!(
            fields,
            vec![
                StanzaField {
                    name: "Package".into(),
                    lines: vec!["foo".into()],
                },
                StanzaField {
                    name: "Description".into(),
                    lines: vec![
                        "short".into(),
                        "long line one".into(),
                        ".".into(),
                        "long line two".into()
                    ],
                },
                StanzaField {
                    name: "Architecture".into(),
                    lines: vec!["amd64".into()],
                },
            ]
        );
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let fields = ControlFields::from_text(indoc! {"
             orphan continuation
            Package: foo
            this line has no colon
             continued
            Version: 2
        "});

        assert_eq!(fields.package(), Some("foo\ncontinued"));
        assert_eq!(fields.version(), Some("2"));
        assert_eq!(
            fields.iter_fields().map(|(k, _)| k).collect::<Vec<_>>(),
            vec!["Package", "Version"]
        );
    }

    #[test]
    fn whitespace_only_lines_are_blank() {
        let fields = ControlFields::from_text("A: x\n   \n\t\nB: y\n");

        assert_eq!(fields.get("A"), Some("x"));
        assert_eq!(fields.get("B"), Some("y"));
    }

    #[test]
    fn name_verbatim_value_trimmed() {
        let fields = parse_stanza("Name :  spaced value \t\nUrl: http://example.com:80/\n");

        assert_eq!(fields[0].name, "Name ");
        assert_eq!(fields[0].lines, vec!["spaced value".to_string()]);
        assert_eq!(fields[1].name, "Url");
        assert_eq!(fields[1].value(), "http://example.com:80/");
    }

    #[test]
    fn case_insensitive_lookup() {
        let fields = ControlFields::from_text("Package: foo\nInstalled-Size: 42\n");

        assert_eq!(fields.get("package"), Some("foo"));
        assert_eq!(fields.get("INSTALLED-SIZE"), Some("42"));
        assert!(fields.contains("installed-size"));
        assert!(!fields.contains("Missing"));
    }

    #[test]
    fn later_field_replaces_value_in_place() {
        let fields = ControlFields::from_text("Package: foo\nVersion: 1\npackage: bar\n");

        assert_eq!(fields.get("Package"), Some("bar"));
        assert_eq!(
            fields.iter_fields().collect::<Vec<_>>(),
            vec![("Package", "bar"), ("Version", "1")]
        );
    }

    #[test]
    fn empty_field_name_keeps_original_text() {
        let text = ": sneaky\nPackage: foo\n";
        let fields = ControlFields::from_text(text);

        assert_eq!(fields.original_text(), text);
        assert_eq!(fields.package(), Some("foo"));
    }

    #[test]
    fn crlf_line_endings() {
        let fields = ControlFields::from_text("Package: foo\r\nDescription: a\r\n b\r\n");

        assert_eq!(fields.package(), Some("foo"));
        assert_eq!(fields.get("Description"), Some("a\nb"));
    }

    #[test]
    fn empty_text() {
        let fields = ControlFields::from_text("");

        assert_eq!(fields.len(), 1);
        assert_eq!(fields.original_text(), "");
        assert_eq!(fields.iter_fields().count(), 0);
    }

    #[test]
    fn stanza_reader_matches_parse() -> Result<()> {
        let text = indoc! {"
            Package: foo
            Version: 1.0
             Continuation

            Depends: bar
        "};

        let fields = ControlStanzaReader::new(std::io::Cursor::new(text))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(fields, parse_stanza(text));
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1].value(), "1.0\nContinuation");

        Ok(())
    }
}
