use crate::record::CombinedRecord;

/// A batch of combined records, submitted to the uploader in one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    records: Vec<CombinedRecord>,
    length: u64,
    cnt: usize,
}

impl Batch {
    pub fn records(&self) -> &[CombinedRecord] {
        &self.records
    }

    /// Returns the total size of the records, in bytes.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the number of events across all records.
    pub fn cnt(&self) -> usize {
        self.cnt
    }

    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the batch must be submitted before adding `incoming` bytes.
    ///
    /// The record count check looks at the current count: a batch that
    /// already holds `max_records` records is full.
    pub fn is_at_capacity(&self, incoming: usize, batch_size: u64, max_records: usize) -> bool {
        self.length + incoming as u64 >= batch_size || self.records.len() >= max_records
    }

    pub fn push(&mut self, record: CombinedRecord) {
        self.length += record.len() as u64;
        self.cnt += record.cnt;
        self.records.push(record);
    }

    /// Empties the batch and releases its records.
    pub fn clear(&mut self) {
        self.records = Vec::new();
        self.length = 0;
        self.cnt = 0;
    }
}
