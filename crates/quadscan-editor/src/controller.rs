//! Drives a [`Workflow`] against a [`ProcessingGateway`].
//!
//! The controller is the single top-level owner of session state. Every
//! method borrows the workflow only for the synchronous begin/complete
//! halves of an operation, never across an `.await`, so UI event handlers
//! can keep reading and mutating it while requests are in flight.

use std::cell::{Ref, RefCell, RefMut};

use web_time::Instant;

use crate::config::{EditorConfig, OutputPreferences};
use crate::error::{Operation, WorkflowError};
use crate::gateway::{ProcessingGateway, ResultRef, Rotation, UploadFile};
use crate::prefs::{PreferenceStore, load_output_mode, save_output_mode};
use crate::workflow::{Completion, Workflow};

/// Session controller.
pub struct Controller<G, P> {
    workflow: RefCell<Workflow>,
    gateway: G,
    store: RefCell<P>,
}

impl<G: ProcessingGateway, P: PreferenceStore> Controller<G, P> {
    /// Start a session. The persisted output mode, if any, becomes the
    /// default choice.
    #[must_use]
    pub fn new(config: EditorConfig, gateway: G, store: P) -> Self {
        let prefs = OutputPreferences {
            mode: load_output_mode(&store).unwrap_or_default(),
            ..OutputPreferences::default()
        };
        Self {
            workflow: RefCell::new(Workflow::new(config, prefs)),
            gateway,
            store: RefCell::new(store),
        }
    }

    /// Read the workflow.
    ///
    /// # Panics
    ///
    /// Panics if called while the workflow is mutably borrowed, which
    /// only happens inside [`update`](Self::update).
    #[must_use]
    pub fn workflow(&self) -> Ref<'_, Workflow> {
        self.workflow.borrow()
    }

    /// Mutate the workflow synchronously (pointer input, frames, resets).
    pub fn update<R>(&self, f: impl FnOnce(&mut Workflow) -> R) -> R {
        let mut workflow: RefMut<'_, Workflow> = self.workflow.borrow_mut();
        f(&mut workflow)
    }

    /// The gateway in use.
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// The preference store in use.
    #[must_use]
    pub fn store(&self) -> Ref<'_, P> {
        self.store.borrow()
    }

    /// Upload `file` and enter the select step.
    ///
    /// # Errors
    ///
    /// Validation, busy, and gateway failures; see
    /// [`Workflow::begin_upload`] and [`Workflow::complete_upload`].
    #[allow(clippy::future_not_send)] // WASM is single-threaded
    pub async fn upload(&self, file: UploadFile) -> Result<Completion, WorkflowError> {
        let ticket = self.workflow.borrow_mut().begin_upload(&file)?;
        log::debug!("uploading {} ({} bytes)", file.name, file.bytes.len());
        let outcome = self.gateway.upload(&file).await;
        self.workflow.borrow_mut().complete_upload(ticket, outcome)
    }

    /// Submit the current selection for processing.
    ///
    /// The chosen output mode is persisted at submission.
    ///
    /// # Errors
    ///
    /// Validation, busy, and gateway failures; see
    /// [`Workflow::begin_submit`] and [`Workflow::complete_process`].
    #[allow(clippy::future_not_send)] // WASM is single-threaded
    pub async fn submit(&self) -> Result<Completion, WorkflowError> {
        let ticket = self.workflow.borrow_mut().begin_submit()?;
        save_output_mode(&mut *self.store.borrow_mut(), ticket.request().prefs.mode);
        let outcome = self.gateway.process(ticket.request()).await;
        self.workflow.borrow_mut().complete_process(ticket, outcome)
    }

    /// Record new output parameters. In the result step this persists the
    /// mode and returns the deadline after which
    /// [`flush_reprocess`](Self::flush_reprocess) will issue a request.
    pub fn choose_preferences(&self, prefs: OutputPreferences, now: Instant) -> Option<Instant> {
        let deadline = self.workflow.borrow_mut().choose_preferences(prefs, now);
        if deadline.is_some() {
            save_output_mode(&mut *self.store.borrow_mut(), prefs.mode);
        }
        deadline
    }

    /// Issue the coalesced reprocess if it is due.
    ///
    /// Returns `Ok(None)` when nothing was due; callers may invoke this
    /// freely after every debounce sleep.
    ///
    /// A failed reprocess also restores the persisted mode to the one in
    /// effect after the revert.
    ///
    /// # Errors
    ///
    /// Gateway failures; see [`Workflow::complete_reprocess`].
    #[allow(clippy::future_not_send)] // WASM is single-threaded
    pub async fn flush_reprocess(&self, now: Instant) -> Result<Option<Completion>, WorkflowError> {
        let Some(ticket) = self.workflow.borrow_mut().begin_due_reprocess(now) else {
            return Ok(None);
        };
        let outcome = self.gateway.reprocess(ticket.request()).await;
        let completion = self.workflow.borrow_mut().complete_reprocess(ticket, outcome);
        if completion.is_err() {
            // The failed mode was saved when chosen; store what is in effect now.
            let mode = self.workflow.borrow().prefs().mode;
            save_output_mode(&mut *self.store.borrow_mut(), mode);
        }
        completion.map(Some)
    }

    /// Rotate the current result.
    ///
    /// # Errors
    ///
    /// Step, busy, and gateway failures; see [`Workflow::begin_rotate`].
    #[allow(clippy::future_not_send)] // WASM is single-threaded
    pub async fn rotate(&self, rotation: Rotation) -> Result<Completion, WorkflowError> {
        let ticket = self.workflow.borrow_mut().begin_rotate(rotation)?;
        let outcome = self
            .gateway
            .rotate(ticket.result(), ticket.rotation())
            .await;
        self.workflow.borrow_mut().complete_rotate(ticket, outcome)
    }

    /// Fetch the current result's bytes for saving.
    ///
    /// # Errors
    ///
    /// Step and gateway failures.
    #[allow(clippy::future_not_send)] // WASM is single-threaded
    pub async fn download(&self) -> Result<(ResultRef, Vec<u8>), WorkflowError> {
        let target = self.workflow.borrow().download_target()?;
        let bytes = self
            .gateway
            .download(&target)
            .await
            .map_err(|e| WorkflowError::gateway(Operation::Download, e))?;
        Ok((target, bytes))
    }

    /// Return to the select step with the last submitted selection.
    ///
    /// # Errors
    ///
    /// See [`Workflow::back_to_select`].
    pub fn back_to_select(&self) -> Result<(), WorkflowError> {
        self.workflow.borrow_mut().back_to_select()
    }

    /// Discard the session and return to the upload step.
    pub fn start_over(&self) {
        self.workflow.borrow_mut().start_over();
    }
}
