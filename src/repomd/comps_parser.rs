use crate::error::{DnfDbusError, Result};
use crate::repomd::model::{CompsCategory, CompsGroup, GroupPackage, PackageOptionType};
use crate::repomd::xml::{attribute, element_name, push_entity};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::BufRead;

/// Parsed comps.xml: categories plus groups with their package lists
#[derive(Debug, Clone, Default)]
pub struct CompsDocument {
    pub categories: Vec<CompsCategory>,
    pub groups: Vec<(CompsGroup, Vec<GroupPackage>)>,
}

/// Top-level comps element being read
#[derive(Debug)]
enum Section {
    None,
    Group(CompsGroup, Vec<GroupPackage>, Translations),
    Category(CompsCategory, Translations),
    /// environments and langpacks are not served
    Skipped,
}

/// Best-matching translated name/description seen so far
#[derive(Debug, Default)]
struct Translations {
    name: Option<(u8, String)>,
    description: Option<(u8, String)>,
    untranslated_description: String,
}

impl Translations {
    fn offer(slot: &mut Option<(u8, String)>, score: u8, text: String) {
        if slot.as_ref().is_none_or(|(best, _)| score > *best) {
            *slot = Some((score, text));
        }
    }
}

pub struct CompsXmlParser;

impl CompsXmlParser {
    /// Parse comps.xml; `ui_name`/`ui_description` use the translation for `locale`
    /// when one exists (e.g. "da_DK" matches `xml:lang="da_DK"` or `"da"`).
    pub fn parse<R: BufRead>(reader: R, locale: Option<&str>) -> Result<CompsDocument> {
        let mut xml_reader = Reader::from_reader(reader);
        let mut buf = Vec::new();
        let mut doc = CompsDocument::default();
        let mut section = Section::None;
        let mut current_text = String::new();
        let mut current_lang: Option<String> = None;
        let mut current_option = PackageOptionType::default();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = element_name(&e);
                    match (name.as_str(), &section) {
                        ("group", Section::None) => {
                            section =
                                Section::Group(CompsGroup::default(), Vec::new(), Translations::default())
                        }
                        ("category", Section::None) => {
                            section =
                                Section::Category(CompsCategory::default(), Translations::default())
                        }
                        ("environment" | "langpacks", Section::None) => section = Section::Skipped,
                        ("packagereq", _) => {
                            current_option = attribute(&e, b"type")
                                .map(|t| PackageOptionType::from_comps(&t))
                                .unwrap_or_default();
                        }
                        _ => {}
                    }
                    current_lang = attribute(&e, b"xml:lang");
                    current_text.clear();
                }
                Ok(Event::Text(e)) => {
                    current_text.push_str(&xml_reader.decoder().decode(&e).unwrap_or_default());
                }
                Ok(Event::GeneralRef(e)) => push_entity(&mut current_text, &e),
                Ok(Event::End(e)) => {
                    let text = std::mem::take(&mut current_text).trim().to_string();
                    let score = lang_score(current_lang.take().as_deref(), locale);
                    let e_name = e.name();
                    let tag = e_name.as_ref();
                    let closes_section = matches!(
                        (tag, &section),
                        (b"group", Section::Group(..))
                            | (b"category", Section::Category(..))
                            | (b"environment" | b"langpacks", Section::Skipped)
                    );
                    if closes_section {
                        match std::mem::replace(&mut section, Section::None) {
                            Section::Group(mut group, packages, tr) => {
                                group.ui_name = tr.name.map_or_else(|| group.name.clone(), |t| t.1);
                                group.ui_description =
                                    tr.description.map_or(tr.untranslated_description, |t| t.1);
                                doc.groups.push((group, packages));
                            }
                            Section::Category(mut category, tr) => {
                                category.ui_name =
                                    tr.name.map_or_else(|| category.name.clone(), |t| t.1);
                                category.ui_description =
                                    tr.description.map_or(tr.untranslated_description, |t| t.1);
                                doc.categories.push(category);
                            }
                            Section::None | Section::Skipped => {}
                        }
                    } else {
                        match (tag, &mut section) {
                            (b"id", Section::Group(group, ..)) => group.id = text,
                            (b"id", Section::Category(category, _)) => category.id = text,
                            (b"name", Section::Group(group, _, tr)) => {
                                apply_name(&mut group.name, tr, score, text)
                            }
                            (b"name", Section::Category(category, tr)) => {
                                apply_name(&mut category.name, tr, score, text)
                            }
                            (b"description", Section::Group(_, _, tr) | Section::Category(_, tr)) => {
                                apply_description(tr, score, text)
                            }
                            (b"packagereq", Section::Group(_, packages, _)) if !text.is_empty() => {
                                packages.push(GroupPackage {
                                    name: text,
                                    option_type: current_option,
                                });
                            }
                            (b"groupid", Section::Category(category, _)) if !text.is_empty() => {
                                category.group_ids.push(text);
                            }
                            _ => {}
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(DnfDbusError::XmlParse(format!(
                        "comps.xml at byte {}: {}",
                        xml_reader.buffer_position(),
                        e
                    )))
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(doc)
    }
}

/// 0 = untranslated, 1 = language match, 2 = exact locale match, None = other language
fn lang_score(lang: Option<&str>, locale: Option<&str>) -> Option<u8> {
    let Some(lang) = lang else {
        return Some(0);
    };
    let locale = locale?;
    let locale = locale.split(['.', '@']).next().unwrap_or(locale);
    if lang == locale {
        Some(2)
    } else if locale.split('_').next() == Some(lang) {
        Some(1)
    } else {
        None
    }
}

fn apply_name(name: &mut String, tr: &mut Translations, score: Option<u8>, text: String) {
    match score {
        Some(0) => *name = text,
        Some(score) => Translations::offer(&mut tr.name, score, text),
        None => {}
    }
}

fn apply_description(tr: &mut Translations, score: Option<u8>, text: String) {
    match score {
        Some(0) => tr.untranslated_description = text,
        Some(score) => Translations::offer(&mut tr.description, score, text),
        None => {}
    }
}
