pub mod reconcile;
pub mod wikitext;

pub use reconcile::{reconcile, reconcile_page, FixedRegionLookup, JsonArchive, Outcome};
pub use wikitext::SimpleWikiDocument;
