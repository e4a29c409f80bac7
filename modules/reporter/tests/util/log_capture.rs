use std::{
    fmt,
    sync::{Arc, Mutex},
};
use tracing::{
    Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{Layer, layer::Context};

/// The fields of one captured log record that the tests look at.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogRecord {
    pub message: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A tracing layer that keeps every event in memory.
#[derive(Clone, Default)]
pub struct LogCapture {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl LogCapture {
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Returns the records that carry coordinates.
    pub fn fix_records(&self) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.latitude.is_some() && r.longitude.is_some())
            .collect()
    }
}

struct RecordVisitor<'a>(&'a mut LogRecord);

impl Visit for RecordVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        match field.name() {
            "latitude" => self.0.latitude = Some(value),
            "longitude" => self.0.longitude = Some(value),
            _ => (),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0.message = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut record = LogRecord::default();
        event.record(&mut RecordVisitor(&mut record));
        self.records.lock().unwrap().push(record);
    }
}
