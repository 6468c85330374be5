#![allow(dead_code)]

use std::{
    fs,
    sync::{Arc, Mutex},
};

use leo_combiner::{
    Combiner, CombinerOptions, CorrelationInput, Event, EventOptions, SendResult, UploaderOptions,
    WriterUploader,
};
use serde_json::{Value, json};
use tempfile::NamedTempFile;

pub const TEST_ID: &str = "integration-bot";
pub const TEST_TIMESTAMP: u64 = 1_700_000_000_000;

/// A combiner writing to a temporary file, plus the checkpoints it reported.
pub struct FileCombiner {
    pub combiner: Combiner,
    pub uploader: Arc<WriterUploader<fs::File>>,
    pub checkpoints: Arc<Mutex<Vec<String>>>,
    pub file: NamedTempFile,
}

pub fn create_file_combiner(
    uploader_options: UploaderOptions,
    options: CombinerOptions,
) -> FileCombiner {
    let file = NamedTempFile::new().expect("create temp file");
    let writer = file.reopen().expect("reopen temp file");
    let uploader = Arc::new(WriterUploader::new(writer, uploader_options));

    let checkpoints = Arc::new(Mutex::new(Vec::new()));
    let checkpointer = {
        let checkpoints = checkpoints.clone();
        move |result: &SendResult| {
            if let Some(eid) = result.checkpoint() {
                checkpoints.lock().unwrap().push(eid.to_string());
            }
        }
    };

    let combiner = Combiner::new(
        TEST_ID,
        options,
        uploader.clone(),
        None,
        Arc::new(checkpointer),
    )
    .expect("create combiner");

    FileCombiner {
        combiner,
        uploader,
        checkpoints,
        file,
    }
}

impl FileCombiner {
    pub fn written_lines(&self) -> Vec<Value> {
        read_lines(&self.file)
    }

    pub fn checkpoints(&self) -> Vec<String> {
        self.checkpoints.lock().unwrap().clone()
    }
}

/// Returns every JSON line written to the file so far.
pub fn read_lines(file: &NamedTempFile) -> Vec<Value> {
    fs::read_to_string(file.path())
        .expect("read temp file")
        .lines()
        .map(|line| serde_json::from_str(line).expect("parse written line"))
        .collect()
}

pub fn test_event(n: usize) -> Event {
    Event::new(
        "order.created",
        json!({ "order": n, "item": "widget" }),
        CorrelationInput::with_id(format!("{n}")).with_source("orders"),
    )
    .with_options(EventOptions {
        timestamp: Some(TEST_TIMESTAMP),
        ..Default::default()
    })
}
