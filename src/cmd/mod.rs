mod doc_links;
mod find_entities;
mod make_commands;
mod page2tsv;
mod tsv2page;

pub use doc_links::{cmd_annotate_tsv, cmd_extract_doc_links};
pub use find_entities::{cmd_find_entities, FindEntitiesArgs};
pub use make_commands::cmd_make_page2tsv_commands;
pub use page2tsv::{cmd_page2tsv, Page2TsvArgs};
pub use tsv2page::cmd_tsv2page;
