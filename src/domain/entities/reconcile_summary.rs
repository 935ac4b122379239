use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    pub inserted_count: u64,
    pub updated_count: u64,
    pub unchanged_count: u64,
}

impl ReconcileSummary {
    pub fn total(&self) -> u64 {
        self.inserted_count + self.updated_count + self.unchanged_count
    }

    pub fn describe(&self) -> String {
        format!(
            "{} new, {} updated, {} unchanged",
            self.inserted_count, self.updated_count, self.unchanged_count
        )
    }
}
