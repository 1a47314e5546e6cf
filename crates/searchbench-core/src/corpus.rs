//! JSONL corpus access.
//!
//! A corpus is one JSON document per line, pre-embedded, ids assigned
//! as ordinals at generation time. Corpora are read lazily so a run
//! never holds the whole dataset in memory; every call to `stream`
//! starts a fresh pass from the first line.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::backend::DocumentStream;
use crate::document::Document;
use crate::error::{Error, Result};

pub struct JsonlCorpus {
    path: PathBuf,
}

impl JsonlCorpus {
    /// Open a corpus file. Fails early if the file is not there, so a
    /// misconfigured path surfaces before any backend is touched.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(Error::Corpus(format!(
                "corpus file not found: {}",
                path.display()
            )));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start a fresh lazy pass over the corpus. Blank lines are
    /// skipped; a malformed line yields an error carrying its line
    /// number.
    pub fn stream(&self) -> anyhow::Result<DocumentStream<'static>> {
        let file = File::open(&self.path)
            .with_context(|| format!("opening corpus {}", self.path.display()))?;
        let reader = BufReader::new(file);
        let iter = reader
            .lines()
            .enumerate()
            .filter_map(|(line_no, line)| match line {
                Ok(text) if text.trim().is_empty() => None,
                Ok(text) => Some(
                    serde_json::from_str::<Document>(&text)
                        .with_context(|| format!("corpus line {}", line_no + 1)),
                ),
                Err(e) => Some(Err(anyhow::Error::from(e))),
            });
        Ok(Box::new(iter))
    }

    /// Count documents with one streaming pass.
    pub fn len(&self) -> anyhow::Result<u64> {
        let mut count = 0u64;
        for doc in self.stream()? {
            doc?;
            count += 1;
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> anyhow::Result<bool> {
        Ok(self.stream()?.next().is_none())
    }
}
