use crate::error::{DnfDbusError, Result};
use crate::repomd::model::{RepoDataIndex, RpmPackage};
use crate::repomd::xml::{attribute, element_name, push_entity};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::BufRead;

pub struct PrimaryXmlParser;

impl PrimaryXmlParser {
    /// Parse primary.xml and extract the package fields the catalog serves
    pub fn parse<R: BufRead>(reader: R) -> Result<Vec<RpmPackage>> {
        let mut xml_reader = Reader::from_reader(reader);

        let mut packages = Vec::new();
        let mut buf = Vec::new();
        let mut current_package: Option<RpmPackage> = None;
        let mut current_text = String::new();
        let mut pkgid_checksum = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    let name = element_name(&e);
                    match name.as_str() {
                        "package" => {
                            current_package = Some(RpmPackage::default());
                        }
                        "version" => {
                            if let Some(pkg) = current_package.as_mut() {
                                pkg.epoch = attribute(&e, b"epoch").and_then(|v| v.parse().ok());
                                pkg.version = attribute(&e, b"ver").unwrap_or_default();
                                pkg.release = attribute(&e, b"rel").unwrap_or_default();
                            }
                        }
                        "size" => {
                            if let Some(pkg) = current_package.as_mut() {
                                pkg.download_size =
                                    attribute(&e, b"package").and_then(|v| v.parse().ok());
                                pkg.install_size =
                                    attribute(&e, b"installed").and_then(|v| v.parse().ok());
                            }
                        }
                        "checksum" => {
                            pkgid_checksum = attribute(&e, b"pkgid").as_deref() == Some("YES");
                            current_text.clear();
                        }
                        "name" | "arch" | "summary" | "description" | "url" | "rpm:license" => {
                            current_text.clear();
                        }
                        _ => {}
                    }
                }
                Ok(Event::Text(e)) => {
                    current_text.push_str(&xml_reader.decoder().decode(&e).unwrap_or_default());
                }
                Ok(Event::GeneralRef(e)) => push_entity(&mut current_text, &e),
                Ok(Event::End(e)) => {
                    let e_name = e.name();
                    let name = String::from_utf8_lossy(e_name.as_ref());
                    if name == "package" {
                        if let Some(pkg) = current_package.take() {
                            packages.push(pkg);
                        }
                    } else if let Some(pkg) = current_package.as_mut() {
                        let text = std::mem::take(&mut current_text);
                        match name.as_ref() {
                            "name" => pkg.name = text,
                            "arch" => pkg.arch = text,
                            "summary" => pkg.summary = text,
                            "description" => pkg.description = text,
                            "url" if !text.is_empty() => pkg.url = Some(text),
                            "rpm:license" if !text.is_empty() => pkg.license = Some(text),
                            "checksum" if pkgid_checksum => pkg.pkgid = Some(text),
                            _ => {}
                        }
                    }
                    current_text.clear();
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(DnfDbusError::XmlParse(format!(
                        "primary.xml at byte {}: {}",
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

/// Which `<data>` block of repomd.xml is being read
#[derive(Debug, Clone, PartialEq)]
enum Section {
    None,
    Data(String),
}

pub struct RepomdXmlParser;

impl RepomdXmlParser {
    /// Locate primary, other and comps files in repomd.xml
    pub fn parse<R: BufRead>(reader: R) -> Result<RepoDataIndex> {
        let mut xml_reader = Reader::from_reader(reader);
        let mut buf = Vec::new();
        let mut section = Section::None;
        let mut index = RepoDataIndex::default();
        let mut compressed_group: Option<String> = None;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"data" => {
                        section = Section::Data(attribute(&e, b"type").unwrap_or_default());
                    }
                    b"location" => {
                        if let (Section::Data(kind), Some(href)) =
                            (&section, attribute(&e, b"href"))
                        {
                            match kind.as_str() {
                                "primary" => index.primary = Some(href),
                                "other" => index.other = Some(href),
                                "group" => index.group = Some(href),
                                k if k.starts_with("group_") && compressed_group.is_none() => {
                                    compressed_group = Some(href)
                                }
                                _ => {}
                            }
                        }
                    }
                    _ => {}
                },
                Ok(Event::End(e)) => {
                    if e.name().as_ref() == b"data" {
                        section = Section::None;
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(DnfDbusError::XmlParse(format!("repomd.xml: {}", e))),
                _ => {}
            }
            buf.clear();
        }

        if index.group.is_none() {
            index.group = compressed_group;
        }
        Ok(index)
    }
}
