use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tables::ProfileTable;

/// A unit of work that failed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    /// Name of the check, step or table the failure belongs to.
    pub unit: String,
    pub error: String,
}

impl UnitFailure {
    pub fn new(unit: impl Into<String>, error: impl ToString) -> Self {
        Self {
            unit: unit.into(),
            error: error.to_string(),
        }
    }
}

// ===================== Analysis =====================

/// One line of a diagnostic row-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRow {
    pub label: String,
    pub count: i64,
}

/// Row-set produced by a single analysis check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub rows: Vec<CheckRow>,
}

impl CheckResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, count: i64) {
        self.rows.push(CheckRow {
            label: label.into(),
            count,
        });
    }

    /// Count recorded under `label`, if the check produced it.
    pub fn count_of(&self, label: &str) -> Option<i64> {
        self.rows.iter().find(|r| r.label == label).map(|r| r.count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub checks: Vec<CheckResult>,
    pub failures: Vec<UnitFailure>,
}

impl AnalysisReport {
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for check in &self.checks {
            writeln!(f, "[{}]", check.name)?;
            if check.rows.is_empty() {
                writeln!(f, "  (no rows)")?;
            }
            for row in &check.rows {
                writeln!(f, "  {:<48} {:>8}", row.label, row.count)?;
            }
        }
        for failure in &self.failures {
            writeln!(f, "[{}] FAILED: {}", failure.unit, failure.error)?;
        }
        Ok(())
    }
}

// ===================== Backup =====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackupStatus {
    Created { rows: i64 },
    AlreadyPresent { rows: i64 },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupOutcome {
    pub table: ProfileTable,
    pub status: BackupStatus,
}

impl BackupOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, BackupStatus::Failed { .. })
    }
}

impl fmt::Display for BackupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backup = self.table.backup_table_name();
        match &self.status {
            BackupStatus::Created { rows } => write!(f, "{backup}: created with {rows} rows"),
            BackupStatus::AlreadyPresent { rows } => {
                write!(f, "{backup}: already present ({rows} rows), left untouched")
            }
            BackupStatus::Failed { error } => write!(f, "{backup}: FAILED: {error}"),
        }
    }
}

// ===================== Cleaning =====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: String,
    pub rows_affected: u64,
}

/// Outcome of the cleaning stage. When `failure` is set the stage was rolled
/// back and `steps` lists what had run before the failing step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub steps: Vec<StepReport>,
    pub committed: bool,
    pub failure: Option<UnitFailure>,
}

impl CleaningReport {
    pub fn rows_affected(&self, step: &str) -> Option<u64> {
        self.steps
            .iter()
            .find(|s| s.step == step)
            .map(|s| s.rows_affected)
    }
}

impl fmt::Display for CleaningReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, step) in self.steps.iter().enumerate() {
            writeln!(
                f,
                "  {:>2}. {:<40} {:>8} rows",
                position + 1,
                step.step,
                step.rows_affected
            )?;
        }
        match (&self.failure, self.committed) {
            (Some(failure), _) => writeln!(
                f,
                "  step '{}' FAILED, stage rolled back: {}",
                failure.unit, failure.error
            ),
            (None, true) => writeln!(f, "  committed"),
            (None, false) => writeln!(f, "  not committed"),
        }
    }
}

// ===================== Validation =====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub rule: String,
    pub violations: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub findings: Vec<ValidationFinding>,
    pub failures: Vec<UnitFailure>,
}

impl ValidationReport {
    /// True when every rule ran and found nothing.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.findings.iter().all(|f| f.violations == 0)
    }

    pub fn violations(&self, rule: &str) -> Option<i64> {
        self.findings
            .iter()
            .find(|f| f.rule == rule)
            .map(|f| f.violations)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for finding in &self.findings {
            let mark = if finding.violations == 0 { "ok" } else { "!!" };
            writeln!(f, "  [{mark}] {:<40} {:>8}", finding.rule, finding.violations)?;
        }
        for failure in &self.failures {
            writeln!(f, "  [??] {:<40} FAILED: {}", failure.unit, failure.error)?;
        }
        Ok(())
    }
}

// ===================== Maintenance =====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceOutcome {
    pub table: ProfileTable,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub tables: Vec<MaintenanceOutcome>,
}

impl fmt::Display for MaintenanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.tables {
            match &outcome.error {
                None => writeln!(f, "  {}: reindexed and analyzed", outcome.table)?,
                Some(error) => writeln!(f, "  {}: FAILED: {}", outcome.table, error)?,
            }
        }
        Ok(())
    }
}

// ===================== Pipeline =====================

/// Linear lifecycle of a pipeline run. `Done` is reached even when units failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Analyzing,
    BackingUp,
    Cleaning,
    Validating,
    Maintaining,
    Done,
}

impl PipelineState {
    pub fn next(self) -> PipelineState {
        match self {
            PipelineState::Idle => PipelineState::Analyzing,
            PipelineState::Analyzing => PipelineState::BackingUp,
            PipelineState::BackingUp => PipelineState::Cleaning,
            PipelineState::Cleaning => PipelineState::Validating,
            PipelineState::Validating => PipelineState::Maintaining,
            PipelineState::Maintaining | PipelineState::Done => PipelineState::Done,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub state: PipelineState,
    pub pre_analysis: AnalysisReport,
    pub backups: Vec<BackupOutcome>,
    pub cleaning: CleaningReport,
    pub post_analysis: AnalysisReport,
    pub validation: ValidationReport,
    pub maintenance: MaintenanceReport,
}

impl PipelineSummary {
    /// Number of units (checks, backups, cleaning stage, maintenance tables) that failed.
    pub fn failure_count(&self) -> usize {
        self.pre_analysis.failures.len()
            + self.backups.iter().filter(|b| b.is_failed()).count()
            + usize::from(self.cleaning.failure.is_some())
            + self.post_analysis.failures.len()
            + self.validation.failures.len()
            + self
                .maintenance
                .tables
                .iter()
                .filter(|t| t.error.is_some())
                .count()
    }
}

impl fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== Analysis (before cleaning)")?;
        write!(f, "{}", self.pre_analysis)?;
        writeln!(f, "== Backup")?;
        for backup in &self.backups {
            writeln!(f, "  {backup}")?;
        }
        writeln!(f, "== Cleaning")?;
        write!(f, "{}", self.cleaning)?;
        writeln!(f, "== Analysis (after cleaning)")?;
        write!(f, "{}", self.post_analysis)?;
        writeln!(f, "== Validation")?;
        write!(f, "{}", self.validation)?;
        writeln!(f, "== Maintenance")?;
        write!(f, "{}", self.maintenance)?;
        writeln!(
            f,
            "== Finished in state {:?} with {} failed unit(s)",
            self.state,
            self.failure_count()
        )
    }
}

// ===================== Report =====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCount {
    pub table: String,
    pub rows: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCountReport {
    pub tables: Vec<TableCount>,
}

impl RowCountReport {
    pub fn rows(&self, table: &str) -> Option<i64> {
        self.tables.iter().find(|t| t.table == table).map(|t| t.rows)
    }
}

impl fmt::Display for RowCountReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for count in &self.tables {
            writeln!(f, "  {:<24} {:>10}", count.table, count.rows)?;
        }
        Ok(())
    }
}

// ===================== Script =====================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptReport {
    pub executed: usize,
    pub failed: Vec<UnitFailure>,
}

impl fmt::Display for ScriptReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} statement(s) executed, {} failed",
            self.executed,
            self.failed.len()
        )?;
        for failure in &self.failed {
            writeln!(f, "  {}: {}", failure.unit, failure.error)?;
        }
        Ok(())
    }
}

// ===================== Profile =====================

/// A user profile with its credential email, one role, the current division
/// and activity counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i32,
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub profile_json: Option<serde_json::Value>,
    pub role: Option<String>,
    pub current_division: Option<String>,
    pub log_count: i64,
    pub role_count: i64,
    pub division_count: i64,
    pub created_at: NaiveDateTime,
}

impl fmt::Display for UserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        writeln!(f, "user #{}", self.id)?;
        writeln!(f, "  username:  {}", or_dash(&self.username))?;
        writeln!(f, "  full name: {}", or_dash(&self.full_name))?;
        writeln!(f, "  email:     {}", or_dash(&self.email))?;
        writeln!(
            f,
            "  born:      {}",
            self.birth_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string())
        )?;
        writeln!(f, "  phone:     {}", or_dash(&self.phone_number))?;
        writeln!(f, "  role:      {}", or_dash(&self.role))?;
        writeln!(f, "  division:  {}", or_dash(&self.current_division))?;
        writeln!(
            f,
            "  counts:    {} logs, {} roles, {} divisions",
            self.log_count, self.role_count, self.division_count
        )
    }
}
