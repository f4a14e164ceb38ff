//! Small helpers shared by the rpm-md XML parsers.

use quick_xml::events::BytesStart;

/// Attribute value by key, with entity references expanded
pub(crate) fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| unescape(&String::from_utf8_lossy(&attr.value)))
}

/// Expand entity references in a raw attribute value
pub(crate) fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        match tail.find(';') {
            Some(end) => {
                push_entity(&mut out, tail[..end].as_bytes());
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Element name as an owned string
pub(crate) fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Append the expansion of an entity reference (`amp`, `#233`, `#x2014`)
pub(crate) fn push_entity(text: &mut String, entity: &[u8]) {
    let entity = String::from_utf8_lossy(entity);
    let resolved = match entity.as_ref() {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        other => other.strip_prefix('#').and_then(|num| {
            let code = match num.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse().ok(),
            };
            code.and_then(char::from_u32)
        }),
    };

    match resolved {
        Some(c) => text.push(c),
        None => {
            text.push('&');
            text.push_str(&entity);
            text.push(';');
        }
    }
}
