//! End-to-end snapping run: load, batch, snap every batch, write.
//!
//! A run moves through `Idle → Loading → Batching → Snapping(1..N) → Writing →
//! Done`. Any error moves it straight to `Aborted`. Results are only ever held
//! in memory until every batch has succeeded; the first failed batch drops
//! everything accumulated so far and the output file is not touched.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::config::SnapConfig;
use crate::error::AppError;
use crate::snap::{OrsSnapClient, SnapTransport};
use crate::table::{load_table, split_batches, write_snapped_table, Batch, SnappedPoint};

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Stage of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Loading,
    Batching,
    /// Waiting on batch `batch` (1-based) of `total`.
    Snapping { batch: usize, total: usize },
    Writing,
    Done,
    Aborted,
}

impl RunState {
    /// `Done` and `Aborted` end a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Aborted)
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub rows: usize,
    pub batches: usize,
    pub output_path: PathBuf,
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry points
// ─────────────────────────────────────────────────────────────────────────────

/// Runs the pipeline against the real ORS endpoint named in `config`.
///
/// # Errors
///
/// Returns the `AppError` that aborted the run. The configuration is checked
/// before the HTTP client is built, so a placeholder key never reaches the
/// network.
pub async fn run(config: &SnapConfig) -> Result<RunReport, AppError> {
    config.validate()?;
    let client = OrsSnapClient::from_config(config)?;
    Pipeline::new(config, &client).run().await
}

/// Snaps one batch. A result count that differs from the point count is a
/// `ResponseShape` error, which fails the whole run.
async fn snap_batch(
    batch: &Batch<'_>,
    total: usize,
    transport: &dyn SnapTransport,
) -> Result<Vec<SnappedPoint>, AppError> {
    let number = batch.index + 1;
    info!(
        "[SNAP] Processing batch {}/{} (points {} to {})...",
        number,
        total,
        batch.start_row,
        batch.end_row()
    );

    let snapped = transport.snap(batch.points).await.map_err(|e| {
        warn!("[SNAP] Batch {}/{} failed: {}", number, total, e);
        e
    })?;

    if snapped.len() != batch.len() {
        warn!(
            "[SNAP] Batch {}/{} returned {} points for {} submitted",
            number,
            total,
            snapped.len(),
            batch.len()
        );
        return Err(AppError::ResponseShape(format!(
            "batch {} submitted {} points but received {}",
            number,
            batch.len(),
            snapped.len()
        )));
    }

    info!("[SNAP] Batch {} successful. {} points snapped.", number, batch.len());
    Ok(snapped)
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────────

/// A single run over one configuration and one transport.
pub struct Pipeline<'a> {
    config: &'a SnapConfig,
    transport: &'a dyn SnapTransport,
    state: RunState,
    history: Vec<RunState>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a SnapConfig, transport: &'a dyn SnapTransport) -> Self {
        Self {
            config,
            transport,
            state: RunState::Idle,
            history: vec![RunState::Idle],
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    /// Drives the run to `Done` or `Aborted`.
    ///
    /// # Errors
    ///
    /// Returns the error that moved the run to `Aborted`, or
    /// `AppError::Unexpected` if this pipeline has already run.
    pub async fn run(&mut self) -> Result<RunReport, AppError> {
        if self.state != RunState::Idle {
            return Err(AppError::Unexpected(format!(
                "pipeline already ran (state: {:?})",
                self.state
            )));
        }

        let result = self.drive().await;
        match &result {
            Ok(report) => {
                self.transition(RunState::Done);
                info!(
                    "[PIPELINE] Finished: {} rows in {} batches written to {}",
                    report.rows,
                    report.batches,
                    report.output_path.display()
                );
            }
            Err(e) => {
                self.transition(RunState::Aborted);
                warn!("[PIPELINE] Aborted: {}", e);
            }
        }
        result
    }

    async fn drive(&mut self) -> Result<RunReport, AppError> {
        let config = self.config;
        config.validate()?;

        self.transition(RunState::Loading);
        let table = load_table(&config.input_path, &config.columns).await?;

        self.transition(RunState::Batching);
        let (snapped, total) = {
            let batches = split_batches(table.coordinates(), config.batch_size)?;
            info!(
                "[PIPELINE] Total points: {}. Splitting into {} batch requests of size up to {}.",
                table.len(),
                batches.len(),
                config.batch_size.as_usize()
            );

            let total = batches.len();
            let mut snapped: Vec<SnappedPoint> = Vec::with_capacity(table.len());
            for batch in &batches {
                self.transition(RunState::Snapping {
                    batch: batch.index + 1,
                    total,
                });
                snapped.extend(snap_batch(batch, total, self.transport).await?);
            }
            (snapped, total)
        };

        if snapped.len() != table.len() {
            return Err(AppError::ResponseShape(format!(
                "received {} snapped points for {} rows",
                snapped.len(),
                table.len()
            )));
        }

        self.transition(RunState::Writing);
        let rows = table.len();
        let output_path =
            write_snapped_table(table, snapped, &config.output_path, &config.columns).await?;

        Ok(RunReport {
            rows,
            batches: total,
            output_path,
        })
    }

    fn transition(&mut self, next: RunState) {
        debug!("[PIPELINE] {:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
    }
}
