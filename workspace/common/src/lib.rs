//! Report and configuration types shared between the pipeline crate and the CLI.
//! Everything here is plain data: serializable for `--json` output and
//! printable through `Display` for the operator console.

mod reports;
mod tables;

pub use reports::{
    AnalysisReport, BackupOutcome, BackupStatus, CheckResult, CheckRow, CleaningReport,
    MaintenanceOutcome, MaintenanceReport, PipelineState, PipelineSummary, RowCountReport,
    ScriptReport, StepReport, TableCount, UnitFailure, UserProfile, ValidationFinding,
    ValidationReport,
};
pub use tables::{ProfileTable, TieBreak};
