use leo_observability::Counter;

pub struct CombinerMetrics {
    pub written_bytes: Counter<u64>,
    pub written_events: Counter<u64>,
    pub submitted_batches: Counter<u64>,
    pub submitted_records: Counter<u64>,
}

impl Default for CombinerMetrics {
    fn default() -> Self {
        let meter = leo_observability::meter("combiner");
        Self {
            written_bytes: meter
                .u64_counter("combiner.written.bytes")
                .with_unit("By")
                .with_description("bytes of encoded events written to the combiner")
                .build(),
            written_events: meter
                .u64_counter("combiner.written.events")
                .with_unit("{event}")
                .with_description("number of events written to the combiner")
                .build(),
            submitted_batches: meter
                .u64_counter("combiner.submitted.batches")
                .with_unit("{batch}")
                .with_description("number of batches accepted by the uploader")
                .build(),
            submitted_records: meter
                .u64_counter("combiner.submitted.records")
                .with_unit("{record}")
                .with_description("number of combined records accepted by the uploader")
                .build(),
        }
    }
}
