//! Identifier generation
//!
//! Units and entries are identified by a prefix and a millisecond clock
//! reading (`u-1714564800000`, `f-1714564800123`). The generator never goes
//! backwards and never repeats a value, so several items created within the
//! same millisecond still get distinct ids.

use chrono::Utc;

pub const UNIT_PREFIX: &str = "u";
pub const ENTRY_PREFIX: &str = "f";

#[derive(Debug, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id for `prefix`, skipping values `taken` reports as in use
    pub fn next(&mut self, prefix: &str, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let value = Utc::now().timestamp_millis().max(self.last + 1);
            self.last = value;
            let id = format!("{}-{}", prefix, value);
            if !taken(&id) {
                return id;
            }
        }
    }
}
