//! Page visibility changes.

use hotspot_core::events::{EventData, VisibilityData};

use crate::recorder::Record;

#[derive(Debug, Default)]
pub struct PageVisibilityDetector;

impl PageVisibilityDetector {
    /// `state` is the host's visibility state name, such as `"hidden"`.
    pub fn on_change(&self, hidden: bool, state: &str, rec: &mut dyn Record) {
        rec.record(EventData::Visibility(VisibilityData {
            hidden,
            state: state.to_string(),
        }));
    }
}
