//! Input readers for blacklists and traffic logs.
//!
//! A file is either one address per line, or a CSV whose header names the
//! address column. Malformed addresses, including empty or missing CSV
//! fields, are passed through untouched; the manager is the one that
//! rejects them.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use hashbrown::HashSet;

/// One traffic record to classify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficRecord {
    /// Raw address text
    pub address: String,
    /// Ground truth from the label column, when the file has one
    pub labelled_attack: Option<bool>,
}

/// Column positions found in a CSV header.
#[derive(Debug, Clone, Copy)]
struct Columns {
    address: usize,
    label: Option<usize>,
}

/// Read a blacklist file, dropping blank lines and repeated addresses.
///
/// First-occurrence order is kept.
pub fn read_addresses(path: &Path, ip_column: &str) -> anyhow::Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read blacklist {}", path.display()))?;
    let records = parse_records(&contents, ip_column, None)
        .with_context(|| format!("failed to parse blacklist {}", path.display()))?;
    Ok(dedupe(records.into_iter().map(|record| record.address)))
}

/// Read a traffic log. Repeats are kept, since every record is a request.
pub fn read_traffic(
    path: &Path,
    ip_column: &str,
    label_column: &str,
) -> anyhow::Result<Vec<TrafficRecord>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read traffic log {}", path.display()))?;
    parse_records(&contents, ip_column, Some(label_column))
        .with_context(|| format!("failed to parse traffic log {}", path.display()))
}

/// Drop repeated addresses, keeping first-occurrence order.
pub fn dedupe<I>(addresses: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    addresses
        .into_iter()
        .filter(|address| seen.insert(address.clone()))
        .collect()
}

/// Whether a label marks the record as attack traffic.
pub fn label_is_attack(label: &str) -> bool {
    let label = label.trim().to_ascii_lowercase();
    ["ddos", "attack", "malicious"]
        .iter()
        .any(|marker| label.contains(marker))
}

fn parse_records(
    contents: &str,
    ip_column: &str,
    label_column: Option<&str>,
) -> anyhow::Result<Vec<TrafficRecord>> {
    let mut lines = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .peekable();

    let Some(&first) = lines.peek() else {
        return Ok(Vec::new());
    };

    let header: Vec<&str> = split_fields(first).collect();
    let Some(address) = header.iter().position(|field| *field == ip_column) else {
        if first.contains(',') {
            bail!("header has no {ip_column:?} column");
        }
        return Ok(lines
            .map(|line| TrafficRecord {
                address: line.to_string(),
                labelled_attack: None,
            })
            .collect());
    };
    let columns = Columns {
        address,
        label: label_column.and_then(|name| header.iter().position(|field| *field == name)),
    };
    lines.next();

    Ok(lines
        .map(|line| {
            let fields: Vec<&str> = split_fields(line).collect();
            let labelled_attack = columns
                .label
                .and_then(|index| fields.get(index))
                .map(|label| label_is_attack(label));
            TrafficRecord {
                address: fields
                    .get(columns.address)
                    .copied()
                    .unwrap_or_default()
                    .to_string(),
                labelled_attack,
            }
        })
        .collect())
}

fn split_fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(',').map(|field| field.trim().trim_matches('"'))
}
