use anyhow::Result;
use async_trait::async_trait;
use tokio::time::{sleep, Duration};

use super::{ScanKind, ScanOutcome, ScanProgress, ScanProvider};
use crate::logging::log_scan_stage;

pub const STAGES: [&str; 5] = [
    "Searching UK news sources...",
    "Analyzing government announcements...",
    "Cross-referencing previous policies...",
    "Detecting potential reversals...",
    "Compiling results...",
];

/// Walks the stage list with a pause per stage and never finds anything.
pub struct SimulatedScan {
    stage_delay: Duration,
}

impl SimulatedScan {
    pub fn new(stage_delay: Duration) -> Self {
        Self { stage_delay }
    }
}

#[async_trait]
impl ScanProvider for SimulatedScan {
    fn kind(&self) -> ScanKind {
        ScanKind::Simulated
    }

    async fn scan(&self, progress: &mut (dyn ScanProgress + Send)) -> Result<ScanOutcome> {
        for (i, stage) in STAGES.iter().enumerate() {
            progress.stage(stage);
            log_scan_stage(self.kind().as_str(), stage, i + 1, STAGES.len());
            sleep(self.stage_delay).await;
        }
        Ok(ScanOutcome::NoNewUturns)
    }
}
