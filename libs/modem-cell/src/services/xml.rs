// =====================================================================================
// XML FLATTENER
// =====================================================================================

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ModemError;
use crate::models::RawFieldRecord;

/// Flattens a device response into `tag -> text` for each direct child of
/// the root element. Text is kept exactly as sent; an element without text
/// maps to `None`. Grandchildren are ignored.
pub fn flatten(body: &str) -> Result<RawFieldRecord, ModemError> {
    let mut reader = Reader::from_str(body);
    let mut record = RawFieldRecord::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut current: Option<(String, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                depth += 1;
                match depth {
                    1 => {
                        if seen_root {
                            return Err(ModemError::Parse("multiple root elements".to_string()));
                        }
                        seen_root = true;
                    }
                    2 => current = Some((tag_name(&element)?, String::new())),
                    _ => {}
                }
            }
            Event::Empty(element) => match depth {
                0 => {
                    if seen_root {
                        return Err(ModemError::Parse("multiple root elements".to_string()));
                    }
                    seen_root = true;
                }
                1 => {
                    record.insert(tag_name(&element)?, None);
                }
                _ => {}
            },
            Event::Text(text) if depth == 2 => {
                if let Some((_, buffer)) = current.as_mut() {
                    buffer.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) if depth == 2 => {
                if let Some((_, buffer)) = current.as_mut() {
                    let text = std::str::from_utf8(&data)
                        .map_err(|e| ModemError::Parse(format!("invalid CDATA: {}", e)))?;
                    buffer.push_str(text);
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    if let Some((tag, text)) = current.take() {
                        let text = if text.is_empty() { None } else { Some(text) };
                        record.insert(tag, text);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::DocType(_) => {
                return Err(ModemError::Parse(
                    "document type declarations are not accepted".to_string(),
                ));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(ModemError::Parse("empty document".to_string()));
    }
    if depth != 0 {
        return Err(ModemError::Parse("unexpected end of document".to_string()));
    }

    Ok(record)
}

fn tag_name(element: &BytesStart<'_>) -> Result<String, ModemError> {
    std::str::from_utf8(element.name().as_ref())
        .map(str::to_string)
        .map_err(|e| ModemError::Parse(format!("invalid tag name: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_flatten_keeps_text_verbatim() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
<rssi>-69dBm</rssi>
<sinr>&gt;=30dB</sinr>
<band>3</band>
<cell_id/>
<pci></pci>
</response>"#;

        let record = flatten(body).unwrap();

        assert_eq!(record.len(), 5);
        assert_eq!(record["rssi"].as_deref(), Some("-69dBm"));
        assert_eq!(record["sinr"].as_deref(), Some(">=30dB"));
        assert_eq!(record["band"].as_deref(), Some("3"));
        assert_eq!(record["cell_id"], None);
        assert_eq!(record["pci"], None);
    }

    #[test]
    fn test_flatten_ignores_grandchildren() {
        let record = flatten("<r><a>1</a><b><c>2</c></b></r>").unwrap();

        assert_eq!(record["a"].as_deref(), Some("1"));
        assert!(record.contains_key("b"));
        assert!(!record.contains_key("c"));
    }

    #[test]
    fn test_flatten_cdata() {
        let record = flatten("<r><msg><![CDATA[a < b]]></msg></r>").unwrap();
        assert_eq!(record["msg"].as_deref(), Some("a < b"));
    }

    #[test]
    fn test_flatten_self_closing_root() {
        assert!(flatten("<response/>").unwrap().is_empty());
    }

    #[test]
    fn test_flatten_empty_body_is_an_error() {
        assert_matches!(flatten(""), Err(ModemError::Parse(_)));
        assert_matches!(flatten("   \n"), Err(ModemError::Parse(_)));
    }

    #[test]
    fn test_flatten_truncated_body_is_an_error() {
        assert_matches!(flatten("<response><rssi>-69dBm</rssi>"), Err(ModemError::Parse(_)));
    }

    #[test]
    fn test_flatten_rejects_doctype() {
        let body = r#"<!DOCTYPE r [<!ENTITY x "boom">]><r><a>&x;</a></r>"#;
        assert_matches!(flatten(body), Err(ModemError::Parse(_)));
    }
}
