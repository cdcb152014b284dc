use crate::error::HairpinError;
use crate::util::open_buf_reader;

use anyhow::{self, Context};
use std::collections::HashMap;
use std::io::BufRead;

const NA: &str = "NA";
const SEP: char = '\t';

/// Columns of the per-variant statistics table used by the hairpin
/// rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatField {
    Start,
    ReadsUnique,
    MadPos,
    SdPos,
    PosUsedStats,
    PosPrime,
    MadNeg,
    SdNeg,
    NegUsedStats,
    NegPrime,
}

impl StatField {
    pub const ALL: [StatField; 10] = [
        StatField::Start,
        StatField::ReadsUnique,
        StatField::MadPos,
        StatField::SdPos,
        StatField::PosUsedStats,
        StatField::PosPrime,
        StatField::MadNeg,
        StatField::SdNeg,
        StatField::NegUsedStats,
        StatField::NegPrime,
    ];

    /// exact column name in the header row
    pub fn column(&self) -> &'static str {
        match self {
            StatField::Start => "Start",
            StatField::ReadsUnique => "Var_reads_unique",
            StatField::MadPos => "MAD_var_pos_reads",
            StatField::SdPos => "SD_var_pos_reads",
            StatField::PosUsedStats => "Var_pos_reads_used_stats",
            StatField::PosPrime => "Var_pos_5_prime_15%_reads",
            StatField::MadNeg => "MAD_var_neg_reads",
            StatField::SdNeg => "SD_var_neg_reads",
            StatField::NegUsedStats => "Var_neg_reads_used_stats",
            StatField::NegPrime => "Var_neg_5_prime_15%_reads",
        }
    }

    pub fn from_column(name: &str) -> Option<Self> {
        StatField::ALL.into_iter().find(|f| f.column() == name)
    }
}

/// Column positions of the required fields in one statistics table
///
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    index: HashMap<StatField, usize>,
}

impl FieldIndex {
    /// Map the header row to column positions. Required names that
    /// do not appear in the header are left out; unrelated columns
    /// are ignored.
    ///
    /// * `header` - column names in table order
    pub fn resolve<S: AsRef<str>>(header: &[S]) -> Self {
        let mut index = HashMap::new();
        for (j, name) in header.iter().enumerate() {
            if let Some(field) = StatField::from_column(name.as_ref().trim()) {
                index.entry(field).or_insert(j);
            }
        }
        FieldIndex { index }
    }

    pub fn get(&self, field: StatField) -> Option<usize> {
        self.index.get(&field).copied()
    }

    /// Fail on the first required column that the header lacks.
    pub fn require_all(&self) -> Result<(), HairpinError> {
        match StatField::ALL.iter().find(|f| !self.index.contains_key(*f)) {
            Some(f) => Err(HairpinError::MissingColumn(f.column())),
            None => Ok(()),
        }
    }

    fn token<'a>(&self, row: &[&'a str], field: StatField) -> Result<&'a str, HairpinError> {
        self.get(field)
            .and_then(|j| row.get(j).copied())
            .map(str::trim)
            .ok_or(HairpinError::ShortRow(field.column()))
    }
}

/// Read-support statistics of one variant position. `NA` in the
/// table becomes `None`, never zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatRecord {
    pub start: i64,
    pub reads_unique: f64,
    pub mad_pos: Option<f64>,
    pub sd_pos: Option<f64>,
    pub pos_used_stats: Option<f64>,
    pub pos_prime: Option<f64>,
    pub mad_neg: Option<f64>,
    pub sd_neg: Option<f64>,
    pub neg_used_stats: Option<f64>,
    pub neg_prime: Option<f64>,
}

impl StatRecord {
    /// Build a record from one tab-split row of the table
    ///
    /// * `index` - resolved header positions
    /// * `row` - tokens of the row
    pub fn from_tokens(index: &FieldIndex, row: &[&str]) -> Result<Self, HairpinError> {
        let number = |field: StatField| -> Result<f64, HairpinError> {
            let token = index.token(row, field)?;
            parse_number(token).ok_or_else(|| malformed(field, token))
        };

        let nullable = |field: StatField| -> Result<Option<f64>, HairpinError> {
            let token = index.token(row, field)?;
            if token == NA {
                return Ok(None);
            }
            parse_number(token)
                .map(Some)
                .ok_or_else(|| malformed(field, token))
        };

        let start_token = index.token(row, StatField::Start)?;
        let start = start_token
            .parse::<i64>()
            .map_err(|_| malformed(StatField::Start, start_token))?;

        Ok(StatRecord {
            start,
            reads_unique: number(StatField::ReadsUnique)?,
            mad_pos: nullable(StatField::MadPos)?,
            sd_pos: nullable(StatField::SdPos)?,
            pos_used_stats: nullable(StatField::PosUsedStats)?,
            pos_prime: nullable(StatField::PosPrime)?,
            mad_neg: nullable(StatField::MadNeg)?,
            sd_neg: nullable(StatField::SdNeg)?,
            neg_used_stats: nullable(StatField::NegUsedStats)?,
            neg_prime: nullable(StatField::NegPrime)?,
        })
    }

    /// Value of a nullable field, or a `NullField` error naming it
    pub fn require(&self, field: StatField) -> Result<f64, HairpinError> {
        let value = match field {
            StatField::Start => Some(self.start as f64),
            StatField::ReadsUnique => Some(self.reads_unique),
            StatField::MadPos => self.mad_pos,
            StatField::SdPos => self.sd_pos,
            StatField::PosUsedStats => self.pos_used_stats,
            StatField::PosPrime => self.pos_prime,
            StatField::MadNeg => self.mad_neg,
            StatField::SdNeg => self.sd_neg,
            StatField::NegUsedStats => self.neg_used_stats,
            StatField::NegPrime => self.neg_prime,
        };
        value.ok_or(HairpinError::NullField {
            column: field.column(),
            start: self.start,
        })
    }
}

fn parse_number(token: &str) -> Option<f64> {
    fast_float::parse::<f64, _>(token).ok()
}

fn malformed(field: StatField, token: &str) -> HairpinError {
    HairpinError::Malformed {
        column: field.column(),
        token: token.into(),
    }
}

/// Streaming reader over the data rows of a statistics table. The
/// header is consumed and validated on open; rows are parsed one at
/// a time.
pub struct StatTable {
    lines: std::io::Lines<Box<dyn BufRead>>,
    index: FieldIndex,
    line_no: usize,
}

impl StatTable {
    pub fn from_path(stat_file: &str) -> anyhow::Result<Self> {
        let buf = open_buf_reader(stat_file)
            .with_context(|| format!("failed to open statistics table: {}", stat_file))?;
        Self::from_reader(buf)
            .with_context(|| format!("statistics table misformatted: {}", stat_file))
    }

    pub fn from_reader(buf: Box<dyn BufRead>) -> anyhow::Result<Self> {
        let mut lines = buf.lines();

        let header = match lines.next() {
            Some(line) => line?,
            None => return Err(HairpinError::EmptyTable.into()),
        };

        let columns: Vec<&str> = header.trim_end_matches('\r').split(SEP).collect();
        let index = FieldIndex::resolve(&columns);
        index.require_all()?;

        Ok(StatTable {
            lines,
            index,
            line_no: 1,
        })
    }
}

impl Iterator for StatTable {
    type Item = anyhow::Result<StatRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let row: Vec<&str> = line.split(SEP).collect();
            let line_no = self.line_no;
            return Some(
                StatRecord::from_tokens(&self.index, &row)
                    .with_context(|| format!("statistics line {}", line_no)),
            );
        }
    }
}
