//! Reading branch traces.
//!
//! A text trace holds one [`BranchRecord`] per line:
//!
//! ```text
//! # pc       kind  outcome target
//! 40001000   br    T       40000f00
//! 40001004   call  T       40002000
//! ```
//!
//! Addresses are hexadecimal (with or without a `0x` prefix), the kind is an
//! [`OpType::mnemonic`], and the outcome is `T` or `N`. Blank lines and
//! anything following a `#` are ignored.

use std::fmt;
use std::path::Path;

use crate::branch::*;
use crate::error::TraceError;

impl fmt::Display for BranchRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let outcome = match self.outcome {
            Outcome::T => 'T',
            Outcome::N => 'N',
        };
        write!(f, "{:08x} {} {} {:08x}",
            self.pc, self.kind.mnemonic(), outcome, self.tgt
        )
    }
}

fn parse_addr(s: &str) -> Result<u32, String> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u32::from_str_radix(digits, 16)
        .map_err(|e| format!("bad address '{}': {}", s, e))
}

/// Parse a single (non-empty, comment-free) record.
fn parse_record(line: &str) -> Result<BranchRecord, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [pc, kind, outcome, tgt] = fields[..] else {
        return Err(format!("expected 4 fields, found {}", fields.len()));
    };

    let kind = OpType::from_mnemonic(kind)
        .ok_or_else(|| format!("unknown instruction kind '{}'", kind))?;
    let outcome = match outcome {
        "T" | "t" => Outcome::T,
        "N" | "n" => Outcome::N,
        _ => return Err(format!("bad outcome '{}'", outcome)),
    };
    Ok(BranchRecord {
        pc: parse_addr(pc)?,
        kind,
        outcome,
        tgt: parse_addr(tgt)?,
    })
}

/// A trace of instructions read from a text file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextTrace {
    pub name: String,
    records: Vec<BranchRecord>,
}
impl TextTrace {
    pub fn new(name: impl ToString, records: Vec<BranchRecord>) -> Self {
        Self { name: name.to_string(), records }
    }

    /// Parse a trace from a string. Line numbers in errors start at 1.
    pub fn parse(name: impl ToString, text: &str) -> Result<Self, TraceError> {
        let mut records = Vec::new();
        for (num, line) in text.lines().enumerate() {
            let line = match line.split_once('#') {
                Some((data, _comment)) => data,
                None => line,
            }.trim();
            if line.is_empty() {
                continue;
            }
            let record = parse_record(line).map_err(|reason| {
                TraceError::Malformed { line: num + 1, reason }
            })?;
            records.push(record);
        }
        Ok(Self::new(name, records))
    }

    /// Read a trace from a file. The trace is named after the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| {
            TraceError::Io { path: path.to_path_buf(), source }
        })?;
        let name = path.file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(name, &text)
    }

    pub fn name(&self) -> &str { &self.name }

    /// Return the number of records
    pub fn num_entries(&self) -> usize { self.records.len() }

    /// Return a slice of records.
    pub fn as_slice(&self) -> &[BranchRecord] { &self.records }

    /// Return a truncated slice of records
    pub fn as_slice_trunc(&self, limit: usize) -> &[BranchRecord] {
        &self.records[..limit.min(self.records.len())]
    }

    /// Render the trace back into its text format.
    pub fn to_text(&self) -> String {
        self.records.iter().map(|r| format!("{}\n", r)).collect()
    }
}
