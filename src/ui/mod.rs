pub mod embeds;
pub mod lists;
