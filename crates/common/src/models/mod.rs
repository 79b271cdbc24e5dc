//! Data models
//!
//! `PaperRecord` is the node value stored in the citation graph; `ApiPaper`
//! is the wire shape returned by the bibliographic service.

mod paper;

pub use paper::{ApiAuthor, ApiExternalIds, ApiPaper, PaperRecord};
