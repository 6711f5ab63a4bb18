pub mod annotation;
pub mod list_parser;
pub mod list_serializer;

pub use annotation::{extract_annotations, strip_annotations};
pub use list_parser::{ParsedList, parse_list};
pub use list_serializer::{serialize_list, serialize_subtree};
