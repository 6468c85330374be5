use crate::{
    error::{OversizedRecordSnafu, Result},
    record::CurrentRecord,
};

/// How encoded events are folded into the current record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulationMode {
    /// Concatenate events into one record up to the maximum record size.
    Combine,
    /// Every event is its own record.
    PassThrough,
}

/// What the combiner must do with an encoded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Append the event to the current record.
    Append,
    /// Move the current record to the batch, then append the event.
    FlushThenAppend,
    /// Replace the current record with the event, then move it to the batch.
    Replace,
}

impl AccumulationMode {
    pub fn from_combine(combine: bool) -> Self {
        if combine {
            AccumulationMode::Combine
        } else {
            AccumulationMode::PassThrough
        }
    }

    /// Decides how an encoded event of `line_len` bytes is accumulated.
    pub fn admit(
        &self,
        current: &CurrentRecord,
        line_len: usize,
        record_size: u64,
    ) -> Result<Admission> {
        match self {
            AccumulationMode::PassThrough => Ok(Admission::Replace),
            AccumulationMode::Combine => {
                if line_len as u64 > record_size {
                    return OversizedRecordSnafu {
                        size: line_len,
                        max_size: record_size,
                    }
                    .fail();
                }

                if (current.len() + line_len) as u64 >= record_size {
                    Ok(Admission::FlushThenAppend)
                } else {
                    Ok(Admission::Append)
                }
            }
        }
    }
}
