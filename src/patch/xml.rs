// ABOUTME: Patches key/value pairs inside the appSettings section of XML .config files.
// ABOUTME: Streams events through quick-xml so untouched markup passes through unchanged.

use super::PatchError;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::io::Cursor;
use std::path::Path;

/// Patch an XML `.config` file in place.
///
/// Existing `<add key value/>` entries under `<appSettings>` get their value
/// overwritten; missing keys are appended as new entries. Returns whether
/// the file was rewritten; a file whose values already match is untouched.
pub fn patch_xml_config(path: &Path, pairs: &[(String, String)]) -> Result<bool, PatchError> {
    let content = std::fs::read_to_string(path).map_err(|source| PatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let rewritten = rewrite_app_settings(&content, pairs).map_err(|reason| PatchError::Format {
        path: path.to_path_buf(),
        reason,
    })?;

    match rewritten {
        Some(updated) => {
            std::fs::write(path, updated).map_err(|source| PatchError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Returns the rewritten document, or `None` when nothing changed.
fn rewrite_app_settings(
    content: &str,
    pairs: &[(String, String)],
) -> Result<Option<String>, String> {
    let mut reader = Reader::from_str(content);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();

    let mut in_app_settings = false;
    let mut found_section = false;
    let mut changed = false;
    let mut seen = vec![false; pairs.len()];

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"appSettings" => {
                in_app_settings = true;
                found_section = true;
                write(&mut writer, Event::Start(e))?;
            }
            Ok(Event::Start(e)) if in_app_settings && e.name().as_ref() == b"add" => {
                match rewrite_add(&e, pairs, &mut seen)? {
                    Some(updated) => {
                        changed = true;
                        write(&mut writer, Event::Start(updated))?;
                    }
                    None => write(&mut writer, Event::Start(e))?,
                }
            }
            Ok(Event::Empty(e)) if in_app_settings && e.name().as_ref() == b"add" => {
                match rewrite_add(&e, pairs, &mut seen)? {
                    Some(updated) => {
                        changed = true;
                        write(&mut writer, Event::Empty(updated))?;
                    }
                    None => write(&mut writer, Event::Empty(e))?,
                }
            }
            // Self-closing section: expand it so entries can be appended.
            Ok(Event::Empty(e)) if e.name().as_ref() == b"appSettings" => {
                found_section = true;
                write(&mut writer, Event::Start(e))?;
                write(&mut writer, Event::Text(BytesText::new("\n")))?;
                if append_missing_entries(&mut writer, pairs, &mut seen)? {
                    changed = true;
                }
                write(&mut writer, Event::End(BytesEnd::new("appSettings")))?;
            }
            Ok(Event::End(e)) if in_app_settings && e.name().as_ref() == b"appSettings" => {
                if append_missing_entries(&mut writer, pairs, &mut seen)? {
                    changed = true;
                }
                in_app_settings = false;
                write(&mut writer, Event::End(e))?;
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

    if !found_section {
        return Err("no appSettings section found".to_string());
    }
    if !changed {
        return Ok(None);
    }

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map(Some).map_err(|e| e.to_string())
}

fn write(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<(), String> {
    writer.write_event(event).map_err(|e| e.to_string())
}

/// Append an `<add/>` entry for every configured key not yet seen.
fn append_missing_entries(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    pairs: &[(String, String)],
    seen: &mut [bool],
) -> Result<bool, String> {
    let mut appended = false;
    for (idx, (key, value)) in pairs.iter().enumerate() {
        if seen[idx] {
            continue;
        }
        seen[idx] = true;
        let mut add = BytesStart::new("add");
        add.push_attribute(("key", key.as_str()));
        add.push_attribute(("value", value.as_str()));
        write(writer, Event::Text(BytesText::new("  ")))?;
        write(writer, Event::Empty(add))?;
        write(writer, Event::Text(BytesText::new("\n")))?;
        appended = true;
    }
    Ok(appended)
}

/// Rebuild an `<add>` element with the desired value for a configured key.
///
/// Marks the key as seen; returns `None` when the key is not configured or
/// the value already matches (so the caller can pass the element through).
fn rewrite_add(
    element: &BytesStart<'_>,
    pairs: &[(String, String)],
    seen: &mut [bool],
) -> Result<Option<BytesStart<'static>>, String> {
    let mut key = None;
    let mut current_value = None;
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
        match attr.key.as_ref() {
            b"key" => key = Some(value),
            b"value" => current_value = Some(value),
            _ => {}
        }
    }

    let Some(key) = key else { return Ok(None) };
    let Some(idx) = pairs.iter().position(|(k, _)| *k == key) else {
        return Ok(None);
    };
    seen[idx] = true;

    let new_value = pairs[idx].1.as_str();
    if current_value.as_deref() == Some(new_value) {
        return Ok(None);
    }

    let mut updated = BytesStart::new("add");
    let mut wrote_value = false;
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        if attr.key.as_ref() == b"value" {
            updated.push_attribute(("value", new_value));
            wrote_value = true;
        } else {
            let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            updated.push_attribute((name.as_str(), value.as_ref()));
        }
    }
    if !wrote_value {
        updated.push_attribute(("value", new_value));
    }

    Ok(Some(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<configuration>
  <appSettings>
    <add key="ApiUrl" value="http://localhost" />
    <add key="Retries" value="3" />
  </appSettings>
</configuration>"#;

    #[test]
    fn overwrites_existing_key() {
        let result = rewrite_app_settings(SAMPLE, &pairs(&[("ApiUrl", "http://t")]))
            .unwrap()
            .unwrap();
        assert!(result.contains(r#"key="ApiUrl" value="http://t""#));
        assert!(result.contains(r#"key="Retries" value="3""#));
    }

    #[test]
    fn inserts_missing_key_once() {
        let result = rewrite_app_settings(SAMPLE, &pairs(&[("Endpoint", "http://t")]))
            .unwrap()
            .unwrap();
        assert_eq!(result.matches("Endpoint").count(), 1);
        assert!(result.contains(r#"<add key="Endpoint" value="http://t"/>"#));
    }

    #[test]
    fn self_closing_section_accepts_inserts() {
        let doc = r#"<configuration><appSettings/></configuration>"#;
        let result = rewrite_app_settings(doc, &pairs(&[("Endpoint", "http://t")]))
            .unwrap()
            .unwrap();
        assert!(result.contains(r#"<add key="Endpoint" value="http://t"/>"#));
        assert!(result.contains("</appSettings>"));

        // A second pass sees the expanded section and changes nothing.
        let second = rewrite_app_settings(&result, &pairs(&[("Endpoint", "http://t")])).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn matching_values_leave_document_unchanged() {
        let result =
            rewrite_app_settings(SAMPLE, &pairs(&[("Retries", "3")])).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn missing_app_settings_section_is_a_format_error() {
        let doc = "<configuration><other/></configuration>";
        let err = rewrite_app_settings(doc, &pairs(&[("A", "1")])).unwrap_err();
        assert!(err.contains("appSettings"));
    }

    #[test]
    fn malformed_xml_is_a_format_error() {
        let doc = r#"<configuration><appSettings><add key=oops></configuration>"#;
        let err = rewrite_app_settings(doc, &pairs(&[("A", "1")]));
        assert!(err.is_err());
    }

    #[test]
    fn rewrite_is_idempotent() {
        let first = rewrite_app_settings(SAMPLE, &pairs(&[("ApiUrl", "http://t")]))
            .unwrap()
            .unwrap();
        let second = rewrite_app_settings(&first, &pairs(&[("ApiUrl", "http://t")])).unwrap();
        assert!(second.is_none());
    }
}
