use crate::error::HairpinError;
use crate::hairpin;
use crate::stats::StatRecord;

use anyhow::{self, Context};

/// A variant record as seen by the merger: a 1-based position and a
/// FILTER set that can grow.
pub trait Variant {
    fn position(&self) -> i64;

    /// Add `id` to the FILTER set unless it is already there.
    fn add_filter(&mut self, id: &str) -> anyhow::Result<()>;
}

/// Destination of merged variants
pub trait VariantSink {
    type Record: Variant;

    /// Bring a freshly read record into the output's header space.
    /// Called before the record is tagged.
    fn adopt(&mut self, _record: &mut Self::Record) {}

    fn write(&mut self, record: &Self::Record) -> anyhow::Result<()>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub written: usize,
    pub flagged: usize,
}

/// Walk variants and statistics rows in lock-step. Each variant is
/// paired with the row at the same index, checked for matching
/// position, tagged `HP` if it fails the hairpin rule and written
/// out. Both streams must end together.
///
/// * `variants` - variant records in file order
/// * `stats` - statistics rows in file order
/// * `sink` - output
pub fn merge<VI, SI, W>(variants: VI, stats: SI, sink: &mut W) -> anyhow::Result<MergeSummary>
where
    W: VariantSink,
    VI: IntoIterator<Item = anyhow::Result<W::Record>>,
    SI: IntoIterator<Item = anyhow::Result<StatRecord>>,
{
    let mut variants = variants.into_iter();
    let mut stats = stats.into_iter();
    let mut summary = MergeSummary::default();

    loop {
        let (mut record, stat) = match (variants.next(), stats.next()) {
            (None, None) => break,
            (Some(record), None) => {
                let record = record?;
                return Err(HairpinError::ExtraVariants(record.position()).into());
            }
            (None, Some(stat)) => {
                let stat = stat.context("statistics table misformatted")?;
                return Err(HairpinError::ExtraStatRows(stat.start).into());
            }
            (Some(record), Some(stat)) => (
                record?,
                stat.context("statistics table misformatted")?,
            ),
        };

        let position = record.position();
        if stat.start != position {
            return Err(HairpinError::PositionMismatch {
                variant: position,
                stat: stat.start,
            }
            .into());
        }

        sink.adopt(&mut record);

        let passes = hairpin::passes(&stat).context("statistics table misformatted")?;
        if !passes {
            log::debug!("position {}: {}", position, hairpin::FILTER_ID);
            record.add_filter(hairpin::FILTER_ID)?;
            summary.flagged += 1;
        }

        sink.write(&record)?;
        summary.written += 1;
    }

    Ok(summary)
}
