//! Uncaught script errors.

use hotspot_core::events::{EventData, JsErrorData};

use crate::element::truncate_chars;
use crate::recorder::Record;

const MAX_STACK_CHARS: usize = 500;

/// What the host knows about an uncaught error.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorReport {
    pub message: String,
    pub filename: Option<String>,
    pub line: Option<u32>,
    pub col: Option<u32>,
    pub stack: Option<String>,
}

#[derive(Debug, Default)]
pub struct ErrorDetector;

impl ErrorDetector {
    pub fn on_error(&self, report: ErrorReport, rec: &mut dyn Record) {
        let message = if report.message.is_empty() {
            "Unknown error".to_string()
        } else {
            report.message
        };

        rec.record(EventData::JsError(JsErrorData {
            message,
            filename: report.filename.filter(|f| !f.is_empty()),
            line: report.line.filter(|&l| l > 0),
            col: report.col.filter(|&c| c > 0),
            stack: report
                .stack
                .filter(|s| !s.is_empty())
                .map(|s| truncate_chars(&s, MAX_STACK_CHARS)),
        }));
    }
}
