//! The Upload → Select → Result step machine.
//!
//! [`Workflow`] is sans-IO. Every gateway interaction is split into a
//! `begin_*` call, which validates, issues a [`RequestToken`], and returns
//! a ticket describing the request, and a `complete_*` call, which takes
//! the ticket back with the gateway's outcome. A ticket whose token has
//! been superseded completes as [`Completion::Stale`] without touching
//! any state, so responses may arrive in any order.
//!
//! Failures never mutate the step, the snapshot, or the result.

use std::fmt;

use web_time::Instant;

use crate::config::{EditorConfig, OutputPreferences};
use crate::corners::{CornerSet, MAX_CORNERS, SelectionPhase};
use crate::debounce::Debouncer;
use crate::drag::{FrameHandle, FrameScheduler};
use crate::editor::{Editor, Repaint};
use crate::error::{GatewayError, Operation, ValidationError, WorkflowError};
use crate::gateway::{
    ImageRef, ProcessRequest, RenderedResult, ReprocessRequest, ResultRef, Rotation, UploadFile,
    UploadReply,
};
use crate::mapper::CoordinateMapper;
use crate::pointer::PointerEvent;
use crate::render::BaseImage;
use crate::token::{RequestToken, Slot, TokenLedger};
use crate::types::{CanvasPoint, Dimensions, SourcePoint};

/// Workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Step {
    /// Choosing a file.
    #[default]
    Upload,
    /// Marking corners on the uploaded image.
    Select,
    /// Viewing and refining the processed result.
    Result,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Upload => "uploading",
            Self::Select => "selecting corners",
            Self::Result => "viewing the result",
        })
    }
}

/// Outcome of applying a gateway response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The response was current and has been applied.
    Applied,
    /// A newer request superseded this one; the response was dropped.
    Stale,
}

/// The uploaded source image.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Service identifier.
    pub image_ref: ImageRef,
    /// Natural size of the decoded preview.
    pub natural: Dimensions,
    /// Pixels at canvas resolution.
    pub base: BaseImage,
}

/// Geometry of a submitted selection in both spaces.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedSelection {
    /// Source image size at submission.
    pub source: Dimensions,
    /// Canvas surface size at submission.
    pub canvas: Dimensions,
    /// Corners as placed, or `None` for the whole image.
    pub corners_canvas: Option<[CanvasPoint; MAX_CORNERS]>,
    /// The same corners scaled into source space.
    pub corners_source: Option<[SourcePoint; MAX_CORNERS]>,
}

/// Durable record of what was last submitted and produced.
///
/// Seeded on upload, replaced wholesale after each successful process or
/// reprocess, and only read when returning to the select step.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSnapshot {
    /// Image the selection belongs to.
    pub source_image: ImageRef,
    /// Output parameters of the last successful render.
    pub prefs: OutputPreferences,
    /// Last submitted selection; `None` until the first submission.
    pub selection: Option<SubmittedSelection>,
    /// Last result produced by the service.
    pub last_processed: Option<ResultRef>,
}

/// The result currently shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    /// Service identifier.
    pub result_ref: ResultRef,
    /// Encoded image.
    pub image: Vec<u8>,
    /// Bumped on every change, including rotations that keep the ref.
    pub revision: u64,
}

/// An issued upload.
#[derive(Debug)]
pub struct UploadTicket {
    token: RequestToken,
}

/// An issued first-time process request.
#[derive(Debug)]
pub struct ProcessTicket {
    token: RequestToken,
    request: ProcessRequest,
    selection: SubmittedSelection,
}

impl ProcessTicket {
    /// Request to send.
    #[must_use]
    pub const fn request(&self) -> &ProcessRequest {
        &self.request
    }
}

/// An issued reprocess request.
#[derive(Debug)]
pub struct ReprocessTicket {
    token: RequestToken,
    request: ReprocessRequest,
}

impl ReprocessTicket {
    /// Request to send.
    #[must_use]
    pub const fn request(&self) -> &ReprocessRequest {
        &self.request
    }
}

/// An issued rotation.
#[derive(Debug)]
pub struct RotateTicket {
    token: RequestToken,
    result: ResultRef,
    rotation: Rotation,
}

impl RotateTicket {
    /// Result being rotated.
    #[must_use]
    pub const fn result(&self) -> &ResultRef {
        &self.result
    }

    /// Direction.
    #[must_use]
    pub const fn rotation(&self) -> Rotation {
        self.rotation
    }
}

/// The whole client-side state of one scanning session.
#[derive(Debug)]
pub struct Workflow {
    step: Step,
    config: EditorConfig,
    image: Option<LoadedImage>,
    editor: Option<Editor>,
    snapshot: Option<WorkflowSnapshot>,
    result: Option<ResultView>,
    prefs: OutputPreferences,
    tokens: TokenLedger,
    reprocess: Debouncer<OutputPreferences>,
    revision: u64,
}

impl Workflow {
    /// A fresh session in the upload step.
    #[must_use]
    pub fn new(config: EditorConfig, prefs: OutputPreferences) -> Self {
        Self {
            step: Step::Upload,
            reprocess: Debouncer::new(config.reprocess_debounce),
            config,
            image: None,
            editor: None,
            snapshot: None,
            result: None,
            prefs,
            tokens: TokenLedger::new(),
            revision: 0,
        }
    }

    fn require(&self, operation: Operation, step: Step) -> Result<(), WorkflowError> {
        if self.step == step {
            Ok(())
        } else {
            Err(WorkflowError::WrongStep {
                operation,
                step: self.step,
            })
        }
    }

    // -- upload ----------------------------------------------------------

    /// Validate `file` and issue an upload.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::WrongStep`] outside the upload step.
    /// - [`WorkflowError::Validation`] if the file is missing, empty, or
    ///   not an accepted image type.
    /// - [`WorkflowError::Busy`] while another upload is in flight.
    pub fn begin_upload(&mut self, file: &UploadFile) -> Result<UploadTicket, WorkflowError> {
        self.require(Operation::Upload, Step::Upload)?;
        file.validate()?;
        if self.tokens.is_busy(Slot::Upload) {
            return Err(WorkflowError::Busy(Operation::Upload));
        }
        Ok(UploadTicket {
            token: self.tokens.issue(Slot::Upload),
        })
    }

    /// Apply an upload outcome: decode the preview, size the canvas, and
    /// enter the select step with an empty selection.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Gateway`] if the upload failed or the
    /// preview cannot be decoded.
    pub fn complete_upload(
        &mut self,
        ticket: UploadTicket,
        outcome: Result<UploadReply, GatewayError>,
    ) -> Result<Completion, WorkflowError> {
        if !self.tokens.settle(ticket.token) {
            return Ok(Completion::Stale);
        }
        let fail = |err| WorkflowError::gateway(Operation::Upload, err);
        let reply = outcome.map_err(fail)?;
        let decoded = image::load_from_memory(&reply.preview)
            .map_err(|e| fail(e.into()))?
            .to_rgba8();
        let natural = Dimensions::new(decoded.width(), decoded.height());
        let mapper = CoordinateMapper::for_image(natural, self.config.max_canvas);
        let base = BaseImage::from_rgba(&decoded, mapper.canvas())
            .map_err(|e| fail(GatewayError::Image(e.to_string())))?;
        log::info!(
            "loaded {} ({natural}, canvas {})",
            reply.image_ref,
            mapper.canvas()
        );

        self.snapshot = Some(WorkflowSnapshot {
            source_image: reply.image_ref.clone(),
            prefs: self.prefs,
            selection: None,
            last_processed: None,
        });
        self.editor = Some(Editor::new(mapper, &self.config));
        self.image = Some(LoadedImage {
            image_ref: reply.image_ref,
            natural,
            base,
        });
        self.result = None;
        self.reprocess.cancel();
        self.step = Step::Select;
        Ok(Completion::Applied)
    }

    // -- selection -------------------------------------------------------

    /// Feed a pointer event to the editor. Ignored outside the select step.
    pub fn handle_pointer(
        &mut self,
        event: &PointerEvent,
        frames: &mut impl FrameScheduler,
    ) -> Repaint {
        match (self.step, self.editor.as_mut()) {
            (Step::Select, Some(editor)) => editor.handle_event(event, frames),
            _ => Repaint::None,
        }
    }

    /// A frame scheduled by the editor fired.
    pub fn on_frame(&mut self, handle: FrameHandle) -> Repaint {
        self.editor
            .as_mut()
            .map_or(Repaint::None, |editor| editor.on_frame(handle))
    }

    /// Clear the selection.
    pub fn reset_selection(&mut self) {
        if let Some(editor) = self.editor.as_mut() {
            editor.reset();
        }
    }

    /// Whether the process action is currently available.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.step == Step::Select
            && !self.tokens.is_busy(Slot::Render)
            && self
                .editor
                .as_ref()
                .is_some_and(|editor| editor.corners().submittable())
    }

    // -- process ---------------------------------------------------------

    /// Snapshot the selection into source space and issue a process
    /// request with the current preferences.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::WrongStep`] outside the select step.
    /// - [`ValidationError::IncompleteSelection`] with 1 to 3 corners.
    /// - [`WorkflowError::Busy`] while a render is in flight.
    pub fn begin_submit(&mut self) -> Result<ProcessTicket, WorkflowError> {
        self.require(Operation::Process, Step::Select)?;
        let (Some(editor), Some(image)) = (self.editor.as_ref(), self.image.as_ref()) else {
            return Err(WorkflowError::WrongStep {
                operation: Operation::Process,
                step: self.step,
            });
        };
        if let SelectionPhase::Placing(placed) = editor.phase() {
            return Err(ValidationError::IncompleteSelection { placed }.into());
        }
        if self.tokens.is_busy(Slot::Render) {
            return Err(WorkflowError::Busy(Operation::Process));
        }

        let mapper = editor.mapper();
        let corners_canvas = editor.corners().as_quad();
        let corners_source = corners_canvas.map(|quad| quad.map(|p| mapper.to_source(p)));
        let selection = SubmittedSelection {
            source: mapper.source(),
            canvas: mapper.canvas(),
            corners_canvas,
            corners_source,
        };
        let request = ProcessRequest {
            image: image.image_ref.clone(),
            corners: corners_source,
            prefs: self.prefs,
        };
        Ok(ProcessTicket {
            token: self.tokens.issue(Slot::Render),
            request,
            selection,
        })
    }

    /// Apply a process outcome: record the snapshot and show the result.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Gateway`] if processing failed; the
    /// workflow stays in the select step with the selection intact.
    pub fn complete_process(
        &mut self,
        ticket: ProcessTicket,
        outcome: Result<RenderedResult, GatewayError>,
    ) -> Result<Completion, WorkflowError> {
        if !self.tokens.settle(ticket.token) {
            return Ok(Completion::Stale);
        }
        let rendered = outcome.map_err(|e| WorkflowError::gateway(Operation::Process, e))?;
        self.snapshot = Some(WorkflowSnapshot {
            source_image: ticket.request.image,
            prefs: ticket.request.prefs,
            selection: Some(ticket.selection),
            last_processed: Some(rendered.result_ref.clone()),
        });
        self.show(rendered);
        self.reprocess.cancel();
        self.step = Step::Result;
        Ok(Completion::Applied)
    }

    fn show(&mut self, rendered: RenderedResult) {
        self.revision += 1;
        self.result = Some(ResultView {
            result_ref: rendered.result_ref,
            image: rendered.image,
            revision: self.revision,
        });
    }

    // -- preferences and reprocess --------------------------------------

    /// The user picked new output parameters.
    ///
    /// In the result step this schedules a coalesced reprocess and returns
    /// its deadline; call [`begin_due_reprocess`](Self::begin_due_reprocess)
    /// once it has passed. Elsewhere the choice only applies to the next
    /// submission.
    pub fn choose_preferences(&mut self, prefs: OutputPreferences, now: Instant) -> Option<Instant> {
        self.prefs = prefs;
        (self.step == Step::Result).then(|| self.reprocess.trigger(prefs, now))
    }

    /// Issue the coalesced reprocess if its window has elapsed.
    ///
    /// Geometry comes from the snapshot, never from the live editor. The
    /// new request supersedes any render still in flight.
    pub fn begin_due_reprocess(&mut self, now: Instant) -> Option<ReprocessTicket> {
        if self.step != Step::Result {
            self.reprocess.cancel();
            return None;
        }
        let prefs = self.reprocess.take_due(now)?;
        let snapshot = self.snapshot.as_ref()?;
        let prior = snapshot.last_processed.clone()?;
        let request = ReprocessRequest {
            process: ProcessRequest {
                image: snapshot.source_image.clone(),
                corners: snapshot
                    .selection
                    .as_ref()
                    .and_then(|selection| selection.corners_source),
                prefs,
            },
            prior,
        };
        Some(ReprocessTicket {
            token: self.tokens.issue(Slot::Render),
            request,
        })
    }

    /// Apply a reprocess outcome.
    ///
    /// Success replaces the result and the snapshot's result reference and
    /// parameters; geometry is kept. Failure reverts the chosen parameters
    /// to those of the last successful render, unless the user has already
    /// picked newer ones.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Gateway`] if reprocessing failed.
    pub fn complete_reprocess(
        &mut self,
        ticket: ReprocessTicket,
        outcome: Result<RenderedResult, GatewayError>,
    ) -> Result<Completion, WorkflowError> {
        if !self.tokens.settle(ticket.token) {
            return Ok(Completion::Stale);
        }
        let rendered = match outcome {
            Ok(rendered) => rendered,
            Err(err) => {
                if !self.reprocess.is_pending()
                    && let Some(snapshot) = &self.snapshot
                {
                    self.prefs = snapshot.prefs;
                }
                return Err(WorkflowError::gateway(Operation::Reprocess, err));
            }
        };
        if let Some(old) = self.snapshot.take() {
            self.snapshot = Some(WorkflowSnapshot {
                prefs: ticket.request.process.prefs,
                last_processed: Some(rendered.result_ref.clone()),
                ..old
            });
        }
        self.show(rendered);
        Ok(Completion::Applied)
    }

    // -- rotate / download ----------------------------------------------

    /// Issue a rotation of the current result.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::WrongStep`] outside the result step.
    /// - [`WorkflowError::Busy`] while a render is in flight.
    pub fn begin_rotate(&mut self, rotation: Rotation) -> Result<RotateTicket, WorkflowError> {
        self.require(Operation::Rotate, Step::Result)?;
        if self.tokens.is_busy(Slot::Render) {
            return Err(WorkflowError::Busy(Operation::Rotate));
        }
        let result = self
            .result
            .as_ref()
            .map(|view| view.result_ref.clone())
            .ok_or(WorkflowError::WrongStep {
                operation: Operation::Rotate,
                step: self.step,
            })?;
        Ok(RotateTicket {
            token: self.tokens.issue(Slot::Render),
            result,
            rotation,
        })
    }

    /// Apply a rotation outcome. The snapshot is not touched.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Gateway`] if the rotation failed.
    pub fn complete_rotate(
        &mut self,
        ticket: RotateTicket,
        outcome: Result<Vec<u8>, GatewayError>,
    ) -> Result<Completion, WorkflowError> {
        if !self.tokens.settle(ticket.token) {
            return Ok(Completion::Stale);
        }
        let image = outcome.map_err(|e| WorkflowError::gateway(Operation::Rotate, e))?;
        self.show(RenderedResult {
            result_ref: ticket.result,
            image,
        });
        Ok(Completion::Applied)
    }

    /// The result to download.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::WrongStep`] outside the result step.
    pub fn download_target(&self) -> Result<ResultRef, WorkflowError> {
        self.require(Operation::Download, Step::Result)?;
        self.result
            .as_ref()
            .map(|view| view.result_ref.clone())
            .ok_or(WorkflowError::WrongStep {
                operation: Operation::Download,
                step: self.step,
            })
    }

    // -- navigation ------------------------------------------------------

    /// Return from the result to the select step, restoring the editor to
    /// exactly the selection last submitted.
    ///
    /// Any render still in flight is orphaned. A whole-image submission
    /// restores an empty selection.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::WrongStep`] outside the result step.
    pub fn back_to_select(&mut self) -> Result<(), WorkflowError> {
        if self.step != Step::Result {
            return Err(WorkflowError::WrongStep {
                operation: Operation::Process,
                step: self.step,
            });
        }
        self.tokens.invalidate(Slot::Render);
        self.reprocess.cancel();

        if let (Some(image), Some(editor)) = (self.image.as_ref(), self.editor.as_mut()) {
            let restored = self.snapshot.as_ref().and_then(|snapshot| {
                let selection = snapshot.selection.as_ref()?;
                (snapshot.source_image == image.image_ref).then_some(selection)
            });
            match restored {
                Some(selection) => {
                    let mapper = CoordinateMapper::new(selection.source, selection.canvas)
                        .with_display_size(editor.mapper().display());
                    let corners = selection
                        .corners_canvas
                        .and_then(|quad| CornerSet::from_points(&quad))
                        .unwrap_or_default();
                    *editor = Editor::new(mapper, &self.config);
                    editor.restore(corners);
                }
                None => editor.reset(),
            }
        }
        self.step = Step::Select;
        Ok(())
    }

    /// Discard everything and return to the upload step. The chosen
    /// preferences are kept as the default for the next image.
    pub fn start_over(&mut self) {
        self.tokens.invalidate_all();
        self.reprocess.cancel();
        self.image = None;
        self.editor = None;
        self.snapshot = None;
        self.result = None;
        self.step = Step::Upload;
    }

    // -- accessors -------------------------------------------------------

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> Step {
        self.step
    }

    /// Configuration.
    #[must_use]
    pub const fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Currently chosen output parameters.
    #[must_use]
    pub const fn prefs(&self) -> OutputPreferences {
        self.prefs
    }

    /// Loaded source image.
    #[must_use]
    pub const fn image(&self) -> Option<&LoadedImage> {
        self.image.as_ref()
    }

    /// Selection editor for the loaded image.
    #[must_use]
    pub const fn editor(&self) -> Option<&Editor> {
        self.editor.as_ref()
    }

    /// Mutable selection editor.
    pub const fn editor_mut(&mut self) -> Option<&mut Editor> {
        self.editor.as_mut()
    }

    /// Durable snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&WorkflowSnapshot> {
        self.snapshot.as_ref()
    }

    /// Result being shown.
    #[must_use]
    pub const fn result(&self) -> Option<&ResultView> {
        self.result.as_ref()
    }

    /// Whether a request in `slot` is outstanding.
    #[must_use]
    pub const fn is_busy(&self, slot: Slot) -> bool {
        self.tokens.is_busy(slot)
    }

    /// Whether a coalesced reprocess is waiting for its window.
    #[must_use]
    pub const fn reprocess_pending(&self) -> bool {
        self.reprocess.is_pending()
    }
}
