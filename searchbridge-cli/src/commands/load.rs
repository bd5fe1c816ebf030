use anyhow::{bail, Context, Result};
use searchbridge::work::WriteOutcome;
use searchbridge::{Backend, Config, DocumentWriteResult};
use serde_json::Value;
use std::fs::File;
use std::future::Future;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::time::Instant;

/// Source for documents to load
pub enum DocumentSource {
    FromFile(PathBuf),
    FromStdin,
}

impl DocumentSource {
    pub fn reader(&self) -> io::Result<Box<dyn BufRead + Send>> {
        match self {
            DocumentSource::FromFile(path) => {
                let file = File::open(path)?;
                Ok(Box::new(BufReader::new(file)))
            }
            DocumentSource::FromStdin => Ok(Box::new(BufReader::new(io::stdin()))),
        }
    }
}

pub struct LoadOptions {
    pub id_field: String,
    pub routing_field: Option<String>,
    pub refresh: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct LoadTally {
    created: usize,
    updated: usize,
    failed: usize,
}

impl LoadTally {
    fn record(&mut self, result: searchbridge::Result<DocumentWriteResult>) {
        match result {
            Ok(r) if r.outcome == WriteOutcome::Created => self.created += 1,
            Ok(_) => self.updated += 1,
            Err(e) => {
                self.failed += 1;
                eprintln!("  {}", e);
            }
        }
    }
}

/// Await every handle of operations already sent and count their outcomes.
async fn settle<F>(handles: &mut Vec<F>, tally: &mut LoadTally)
where
    F: Future<Output = searchbridge::Result<DocumentWriteResult>>,
{
    for result in futures::future::join_all(handles.drain(..)).await {
        tally.record(result);
    }
}

/// Ids and routing keys may be strings or numbers in the source documents.
fn field_as_string(doc: &Value, field: &str) -> Option<String> {
    match doc.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub async fn run_load(
    config: &Config,
    logical: &str,
    source: DocumentSource,
    options: &LoadOptions,
) -> Result<()> {
    let backend = Backend::connect(config)
        .await
        .with_context(|| format!("Failed to connect to {}", config.client.url))?;
    let index = backend.index(logical)?;
    let context = backend.create_context();
    let reader = source.reader().context("Failed to open input")?;
    let start = Instant::now();

    let mut tally = LoadTally::default();
    let mut handles = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: Value = serde_json::from_str(&line)
            .with_context(|| format!("Invalid JSON on line {}", line_no + 1))?;

        let id = field_as_string(&doc, &options.id_field)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let routing_key = options
            .routing_field
            .as_deref()
            .and_then(|field| field_as_string(&doc, field));

        let work = index.index_document(&id, routing_key.as_deref(), doc)?;
        handles.push(context.enqueue(work).await?);
        // A threshold flush just sent everything queued so far
        if context.pending() == 0 {
            settle(&mut handles, &mut tally).await;
        }
    }

    let report = if options.refresh {
        context.refresh(&[index.names().write_alias.clone()]).await?
    } else {
        context.flush().await?
    };
    tracing::debug!("Final flush sent {} items in {} batches", report.items, report.batches);

    settle(&mut handles, &mut tally).await;

    println!();
    println!("Load completed:");
    println!("  Created: {}", tally.created);
    println!("  Updated: {}", tally.updated);
    println!("  Failed:  {}", tally.failed);
    println!("  Time:    {:.2}s", start.elapsed().as_secs_f64());

    if tally.failed > 0 {
        bail!("{} document(s) were rejected", tally.failed);
    }
    Ok(())
}
