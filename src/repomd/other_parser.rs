use crate::error::{DnfDbusError, Result};
use crate::repomd::model::{OtherPackage, RpmChangelog};
use crate::repomd::xml::{attribute, element_name, push_entity};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::BufRead;

pub struct OtherXmlParser;

impl OtherXmlParser {
    /// Parse other.xml and extract per-package changelogs
    pub fn parse<R: BufRead>(reader: R) -> Result<Vec<OtherPackage>> {
        let mut xml_reader = Reader::from_reader(reader);

        let mut packages = Vec::new();
        let mut buf = Vec::new();
        let mut current_package: Option<OtherPackage> = None;
        let mut current_entry: Option<RpmChangelog> = None;
        let mut current_text = String::new();

        loop {
            let event = xml_reader.read_event_into(&mut buf);
            let is_empty = matches!(event, Ok(Event::Empty(_)));
            match event {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match element_name(&e).as_str() {
                    "package" => {
                        current_package = Some(OtherPackage {
                            pkgid: attribute(&e, b"pkgid"),
                            name: attribute(&e, b"name").unwrap_or_default(),
                            arch: attribute(&e, b"arch").unwrap_or_default(),
                            ..Default::default()
                        });
                    }
                    "version" => {
                        if let Some(pkg) = current_package.as_mut() {
                            pkg.epoch = attribute(&e, b"epoch").and_then(|v| v.parse().ok());
                            pkg.version = attribute(&e, b"ver").unwrap_or_default();
                            pkg.release = attribute(&e, b"rel").unwrap_or_default();
                        }
                    }
                    "changelog" => {
                        current_text.clear();
                        let entry = RpmChangelog {
                            author: attribute(&e, b"author").unwrap_or_default(),
                            date: attribute(&e, b"date")
                                .and_then(|v| v.parse().ok())
                                .unwrap_or(0),
                            text: String::new(),
                        };
                        match (is_empty, current_package.as_mut()) {
                            (true, Some(pkg)) => pkg.changelogs.push(entry),
                            (false, _) => current_entry = Some(entry),
                            _ => {}
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    if current_entry.is_some() {
                        current_text
                            .push_str(&xml_reader.decoder().decode(&e).unwrap_or_default());
                    }
                }
                Ok(Event::GeneralRef(e)) => {
                    if current_entry.is_some() {
                        push_entity(&mut current_text, &e);
                    }
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"package" => {
                        if let Some(pkg) = current_package.take() {
                            packages.push(pkg);
                        }
                    }
                    b"changelog" => {
                        if let (Some(mut entry), Some(pkg)) =
                            (current_entry.take(), current_package.as_mut())
                        {
                            entry.text = std::mem::take(&mut current_text);
                            pkg.changelogs.push(entry);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(DnfDbusError::XmlParse(format!(
                        "other.xml at byte {}: {}",
                        xml_reader.buffer_position(),
                        e
                    )))
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(packages)
    }
}
