// ABOUTME: Best-effort version rewrite inside an external XML build descriptor.
// ABOUTME: Replaces recognized version elements or inserts one into the first PropertyGroup.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::io::Cursor;
use std::path::Path;

/// Element names recognized as version fields, in lookup order.
const VERSION_ELEMENTS: [&[u8]; 4] = [
    b"Version",
    b"AssemblyVersion",
    b"FileVersion",
    b"PackageVersion",
];

/// Write `new_version` into the descriptor's version field(s).
///
/// Every recognized version element has its text replaced; when none exist,
/// a `<Version>` element is inserted into the first `<PropertyGroup>`.
/// Returns whether the file was updated. The contract is best-effort: a
/// missing file or one with no recognized location returns `Ok(false)` and
/// the caller proceeds with the in-memory version only.
pub fn rewrite_descriptor_version(path: &Path, new_version: &str) -> std::io::Result<bool> {
    if !path.is_file() {
        tracing::warn!(path = %path.display(), "build descriptor not found");
        return Ok(false);
    }

    let content = std::fs::read_to_string(path)?;
    match rewrite_version(&content, new_version) {
        Ok(Some(updated)) => {
            std::fs::write(path, updated)?;
            Ok(true)
        }
        Ok(None) => Ok(false),
        Err(reason) => {
            tracing::warn!(path = %path.display(), reason, "could not rewrite build descriptor");
            Ok(false)
        }
    }
}

fn is_version_element(name: &[u8]) -> bool {
    VERSION_ELEMENTS.contains(&name)
}

/// Two passes: scan for an existing version element, then rewrite or insert.
fn rewrite_version(content: &str, new_version: &str) -> Result<Option<String>, String> {
    let has_version_element = scan_for_version_element(content)?;

    let mut reader = Reader::from_str(content);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();

    let mut updated = false;
    let mut in_version_element = false;
    let mut wrote_version_text = false;
    let mut inserted = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if is_version_element(e.name().as_ref()) => {
                in_version_element = true;
                wrote_version_text = false;
                write(&mut writer, Event::Start(e))?;
            }
            Ok(Event::Text(_)) if in_version_element => {
                if !wrote_version_text {
                    write(&mut writer, Event::Text(BytesText::new(new_version)))?;
                    wrote_version_text = true;
                    updated = true;
                }
            }
            Ok(Event::End(e)) if is_version_element(e.name().as_ref()) => {
                // An empty element emits no text event; write the version anyway.
                if in_version_element && !wrote_version_text {
                    write(&mut writer, Event::Text(BytesText::new(new_version)))?;
                    updated = true;
                }
                in_version_element = false;
                write(&mut writer, Event::End(e))?;
            }
            // Self-closing version element: expand it with the new text.
            Ok(Event::Empty(e)) if is_version_element(e.name().as_ref()) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                write(&mut writer, Event::Start(BytesStart::new(name.as_str())))?;
                write(&mut writer, Event::Text(BytesText::new(new_version)))?;
                write(&mut writer, Event::End(BytesEnd::new(name.as_str())))?;
                updated = true;
            }
            Ok(Event::Start(e))
                if !has_version_element && !inserted && e.name().as_ref() == b"PropertyGroup" =>
            {
                write(&mut writer, Event::Start(e))?;
                write(&mut writer, Event::Text(BytesText::new("\n    ")))?;
                write(&mut writer, Event::Start(BytesStart::new("Version")))?;
                write(&mut writer, Event::Text(BytesText::new(new_version)))?;
                write(&mut writer, Event::End(BytesEnd::new("Version")))?;
                inserted = true;
                updated = true;
            }
            Ok(Event::Eof) => break,
            Ok(event) => write(&mut writer, event)?,
            Err(e) => {
                return Err(format!(
                    "XML parse error at position {}: {e}",
                    reader.buffer_position()
                ));
            }
        }
        buf.clear();
    }

    if !updated {
        return Ok(None);
    }

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map(Some).map_err(|e| e.to_string())
}

fn scan_for_version_element(content: &str) -> Result<bool, String> {
    let mut reader = Reader::from_str(content);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if is_version_element(e.name().as_ref()) => {
                return Ok(true);
            }
            Ok(Event::Eof) => return Ok(false),
            Ok(_) => {}
            Err(e) => return Err(e.to_string()),
        }
        buf.clear();
    }
}

fn write(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<(), String> {
    writer.write_event(event).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_existing_version_text() {
        let doc = "<Project><PropertyGroup><Version>1.0.0</Version></PropertyGroup></Project>";
        let result = rewrite_version(doc, "2.0.0").unwrap().unwrap();
        assert!(result.contains("<Version>2.0.0</Version>"));
        assert!(!result.contains("1.0.0"));
    }

    #[test]
    fn replaces_all_recognized_elements() {
        let doc = "<Project><PropertyGroup>\
            <AssemblyVersion>1.0.0</AssemblyVersion>\
            <FileVersion>1.0.0</FileVersion>\
            </PropertyGroup></Project>";
        let result = rewrite_version(doc, "3.1.4").unwrap().unwrap();
        assert!(result.contains("<AssemblyVersion>3.1.4</AssemblyVersion>"));
        assert!(result.contains("<FileVersion>3.1.4</FileVersion>"));
    }

    #[test]
    fn fills_in_an_empty_version_element() {
        let doc = "<Project><PropertyGroup><Version></Version></PropertyGroup></Project>";
        let result = rewrite_version(doc, "2.0.0").unwrap().unwrap();
        assert!(result.contains("<Version>2.0.0</Version>"));
    }

    #[test]
    fn inserts_version_into_first_property_group() {
        let doc = "<Project><PropertyGroup><OutputType>Exe</OutputType></PropertyGroup>\
            <PropertyGroup/></Project>";
        let result = rewrite_version(doc, "1.2.3").unwrap().unwrap();
        assert_eq!(result.matches("<Version>1.2.3</Version>").count(), 1);
    }

    #[test]
    fn no_recognized_location_leaves_file_alone() {
        let doc = "<Project><ItemGroup/></Project>";
        assert!(rewrite_version(doc, "1.2.3").unwrap().is_none());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let updated =
            rewrite_descriptor_version(&dir.path().join("missing.xml"), "1.0.0").unwrap();
        assert!(!updated);
    }
}
