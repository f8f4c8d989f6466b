//! An interactive grading session: document slots, one report, and an
//! explicit state machine.
//!
//! [`Session`] models the front-of-house flow around the library: attach up
//! to three documents, run one evaluation at a time, then export the report.
//! The state machine makes the busy discipline explicit — while an
//! evaluation or export is running the session rejects every other mutation
//! instead of interleaving work, and a failed evaluation parks in
//! [`SessionState::Failed`] with the error preserved until the caller
//! changes an input or runs again.

use crate::config::EvaluationConfig;
use crate::document::{Document, DocumentRole};
use crate::error::EvalError;
use crate::evaluate::{self, EvaluationStats};
use crate::export;
use crate::pipeline::input;
use crate::report::EvaluationReport;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where a session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No report yet; inputs may be attached freely.
    Idle,
    /// An evaluation is running; the session rejects all other work.
    Evaluating,
    /// A report is available for display and export.
    Reported,
    /// An export is running; the session rejects all other work.
    Exporting,
    /// The last evaluation failed; see [`Session::last_error`].
    Failed,
}

/// One grading session.
#[derive(Debug)]
pub struct Session {
    config: EvaluationConfig,
    state: SessionState,
    question_paper: Option<Document>,
    answer_sheet: Option<Document>,
    model_answer: Option<Document>,
    report: Option<EvaluationReport>,
    stats: Option<EvaluationStats>,
    last_error: Option<String>,
}

impl Session {
    pub fn new(config: EvaluationConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            question_paper: None,
            answer_sheet: None,
            model_answer: None,
            report: None,
            stats: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True while an evaluation or export is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            SessionState::Evaluating | SessionState::Exporting
        )
    }

    pub fn report(&self) -> Option<&EvaluationReport> {
        self.report.as_ref()
    }

    pub fn stats(&self) -> Option<&EvaluationStats> {
        self.stats.as_ref()
    }

    /// Message of the most recent failure, if the last action failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn document(&self, role: DocumentRole) -> Option<&Document> {
        self.slot(role).as_ref()
    }

    /// Both required documents are attached and the session is free.
    pub fn can_evaluate(&self) -> bool {
        !self.is_busy() && self.question_paper.is_some() && self.answer_sheet.is_some()
    }

    /// Attach a document to its role slot, validating the file up front.
    ///
    /// Replacing a document clears the previous failure but keeps any
    /// existing report until the next evaluation overwrites it.
    pub fn attach(&mut self, role: DocumentRole, path: &Path) -> Result<(), EvalError> {
        self.ensure_not_busy()?;
        let document = input::resolve_document(role, path)?;
        info!("{}: attached '{}'", role, document.display_name);
        *self.slot_mut(role) = Some(document);
        self.last_error = None;
        if self.state == SessionState::Failed {
            self.state = if self.report.is_some() {
                SessionState::Reported
            } else {
                SessionState::Idle
            };
        }
        Ok(())
    }

    /// Detach a document from its role slot.
    pub fn detach(&mut self, role: DocumentRole) -> Result<(), EvalError> {
        self.ensure_not_busy()?;
        *self.slot_mut(role) = None;
        Ok(())
    }

    /// Run one evaluation over the attached documents.
    ///
    /// Requires both the question paper and the answer sheet. On failure the
    /// session moves to [`SessionState::Failed`] and keeps the message; any
    /// prior report is discarded either way, matching what the user saw
    /// start the moment grading began.
    pub async fn run_evaluation(&mut self) -> Result<&EvaluationReport, EvalError> {
        self.ensure_not_busy()?;
        let (Some(qp), Some(answers)) = (self.question_paper.clone(), self.answer_sheet.clone())
        else {
            return Err(EvalError::MissingInput);
        };

        self.state = SessionState::Evaluating;
        self.report = None;
        self.stats = None;
        self.last_error = None;

        match evaluate::evaluate_documents(&qp, &answers, self.model_answer.as_ref(), &self.config)
            .await
        {
            Ok(output) => {
                self.stats = Some(output.stats);
                self.state = SessionState::Reported;
                Ok(&*self.report.insert(output.report))
            }
            Err(e) => {
                warn!("Evaluation failed: {}", e);
                self.last_error = Some(e.to_string());
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Export the current report to PDF per the config's export options.
    ///
    /// A failed export leaves the report intact and the session back in
    /// [`SessionState::Reported`].
    pub async fn export_report(&mut self) -> Result<PathBuf, EvalError> {
        self.ensure_not_busy()?;
        let Some(report) = self.report.clone().filter(|r| !r.is_empty()) else {
            return Err(EvalError::ReportMissing);
        };

        self.state = SessionState::Exporting;
        let result = export::export_report(&report, &self.config.export).await;
        self.state = SessionState::Reported;

        match result {
            Ok(path) => Ok(path),
            Err(e) => {
                warn!("Export failed: {}", e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Drop all documents, the report, and any failure, keeping the config.
    pub fn reset(&mut self) -> Result<(), EvalError> {
        self.ensure_not_busy()?;
        self.question_paper = None;
        self.answer_sheet = None;
        self.model_answer = None;
        self.report = None;
        self.stats = None;
        self.last_error = None;
        self.state = SessionState::Idle;
        Ok(())
    }

    fn ensure_not_busy(&self) -> Result<(), EvalError> {
        if self.is_busy() {
            return Err(EvalError::Internal(format!(
                "session is busy ({:?})",
                self.state
            )));
        }
        Ok(())
    }

    fn slot(&self, role: DocumentRole) -> &Option<Document> {
        match role {
            DocumentRole::QuestionPaper => &self.question_paper,
            DocumentRole::AnswerSheet => &self.answer_sheet,
            DocumentRole::ModelAnswerKey => &self.model_answer,
        }
    }

    fn slot_mut(&mut self, role: DocumentRole) -> &mut Option<Document> {
        match role {
            DocumentRole::QuestionPaper => &mut self.question_paper,
            DocumentRole::AnswerSheet => &mut self.answer_sheet,
            DocumentRole::ModelAnswerKey => &mut self.model_answer,
        }
    }
}
