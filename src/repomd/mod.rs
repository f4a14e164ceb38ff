pub mod comps_parser;
pub mod fetch;
pub mod model;
pub mod other_parser;
pub mod parser;
mod xml;

pub use comps_parser::{CompsDocument, CompsXmlParser};
pub use fetch::MetadataReader;
pub use other_parser::OtherXmlParser;
pub use parser::{PrimaryXmlParser, RepomdXmlParser};
