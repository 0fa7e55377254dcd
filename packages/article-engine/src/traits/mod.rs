//! Collaborator trait seams.
//!
//! Every external system the pipeline touches sits behind an object-safe
//! async trait so stages can be exercised against mocks. Real
//! implementations live next to their traits where they are small
//! (search, media fetch) or in separate packages (the completion client).

pub mod cms;
pub mod completion;
pub mod fetcher;
pub mod relational;
pub mod searcher;
pub mod spreadsheet;
pub mod vector_index;
