#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod backend;
pub mod config;
pub mod corpus;
pub mod document;
pub mod error;
pub mod fusion;
pub mod monitor;
pub mod sparse;
pub mod stats;

pub use backend::{Batches, DocumentStream, SearchBackend};
pub use document::{Distance, DocId, Document, IndexSchema, Payload, SearchHit, SparseVector};
pub use error::{Error, Result};
