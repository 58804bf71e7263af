//! Drives the stages in order against one connection.

use common::{CleaningReport, PipelineState, PipelineSummary, UnitFailure};
use sea_orm::DatabaseConnection;
use tracing::{error, info, instrument};

use crate::analysis::run_analysis;
use crate::backup::run_backups;
use crate::cleaning::run_cleaning;
use crate::maintenance::run_maintenance;
use crate::validation::run_validation;
use crate::CleaningContext;

/// One pipeline run.
///
/// Failures are recorded in the summary and never change which stages run.
#[derive(Debug)]
pub struct Pipeline {
    ctx: CleaningContext,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(ctx: CleaningContext) -> Self {
        Self {
            ctx,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn advance(&mut self) {
        self.state = self.state.next();
        info!(state = ?self.state, "Pipeline stage started");
    }

    #[instrument(skip_all)]
    pub async fn run(&mut self, db: &DatabaseConnection) -> PipelineSummary {
        info!(today = %self.ctx.today, tie_break = %self.ctx.tie_break, "Starting pipeline");

        self.advance();
        let pre_analysis = run_analysis(db, &self.ctx).await;

        self.advance();
        let backups = run_backups(db).await;

        self.advance();
        let cleaning = match run_cleaning(db, &self.ctx).await {
            Ok(report) => report,
            Err(e) => {
                error!("Cleaning stage could not run: {}", e);
                CleaningReport {
                    failure: Some(UnitFailure::new("cleaning", &e)),
                    ..Default::default()
                }
            }
        };

        self.advance();
        let post_analysis = run_analysis(db, &self.ctx).await;
        let validation = run_validation(db, &self.ctx).await;

        self.advance();
        let maintenance = run_maintenance(db).await;

        self.advance();
        let summary = PipelineSummary {
            state: self.state,
            pre_analysis,
            backups,
            cleaning,
            post_analysis,
            validation,
            maintenance,
        };
        info!(failures = summary.failure_count(), "Pipeline finished");
        summary
    }
}
