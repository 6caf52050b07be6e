use anyhow::{anyhow, Context};
use domain::FaqRecord;
use serde::Deserialize;
use shared::types::Result;
use shared::utils::{is_supported_source, normalize_text};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    question: String,
    #[serde(default)]
    answer: String,
}

/// Validated FAQ records plus a digest of the raw source bytes.
#[derive(Debug, Clone)]
pub struct FaqSource {
    pub records: Vec<FaqRecord>,
    pub skipped: usize,
    pub hash: String,
}

pub fn load_faq_source(path: impl AsRef<Path>) -> Result<FaqSource> {
    let path = path.as_ref();
    if !is_supported_source(path) {
        return Err(anyhow!(
            "unsupported FAQ source '{}': expected a .json file",
            path.display()
        ));
    }
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    parse_faq_source(&bytes).with_context(|| format!("parsing {}", path.display()))
}

/// Parse a JSON array of `{question, answer}` objects. Blank entries and
/// repeated questions are dropped; the first occurrence wins.
pub fn parse_faq_source(bytes: &[u8]) -> Result<FaqSource> {
    let hash = format!("{:x}", md5::compute(bytes));
    let raw: Vec<RawRecord> = serde_json::from_slice(bytes)?;

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(raw.len());
    let mut skipped = 0;
    for (i, item) in raw.into_iter().enumerate() {
        let question = item.question.trim();
        let answer = item.answer.trim();
        if question.is_empty() || answer.is_empty() {
            warn!(item = i, "skipping FAQ entry with empty question or answer");
            skipped += 1;
            continue;
        }
        if !seen.insert(normalize_text(question)) {
            warn!(item = i, question, "skipping duplicate FAQ question");
            skipped += 1;
            continue;
        }
        records.push(FaqRecord {
            question: question.to_string(),
            answer: answer.to_string(),
        });
    }
    Ok(FaqSource {
        records,
        skipped,
        hash,
    })
}
