//! Streaming aggregates.

use crate::error::PipelineResult;
use crate::source::RowSource;
use crate::stream::RowStream;

/// Count-and-sum fold for a streamed numeric column.
///
/// Two accumulators, nothing buffered. An average over zero values is
/// reported as `None`, never computed as `0/0`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunningAverage {
    count: u64,
    sum: f64,
}

impl RunningAverage {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// The average so far, or `None` when no values were seen.
    pub fn finish(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Fold a lazy column of numbers into its average in one pass.
pub fn average_of<I>(values: I) -> PipelineResult<Option<f64>>
where
    I: IntoIterator<Item = PipelineResult<f64>>,
{
    let mut acc = RunningAverage::default();
    for value in values {
        acc.push(value?);
    }
    Ok(acc.finish())
}

/// Stream the `age` column of `source` and average it without buffering.
pub fn average_age<S: RowSource + ?Sized>(source: &S) -> PipelineResult<Option<f64>> {
    let ages = RowStream::open(source)?.map(|row| row.map(|r| f64::from(r.age)));
    average_of(ages)
}
