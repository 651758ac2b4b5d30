use std::rc::Rc;
use std::time::Duration;

use dioxus::prelude::*;
use gloo_timers::future::TimeoutFuture;
use quadscan_editor::{
    Completion, Controller, DisplayPoint, DragSession, Editor, EditorConfig, FrameHandle,
    MAX_CORNERS, Notice, OutputPreferences, PointerEvent, Repaint, Rotation, SelectionPhase,
    SelectionStyle, Severity, Slot, Step, UploadFile, WorkflowError, render, render_into,
};
use quadscan_io::{
    BrowserFrames, FileUpload, HttpGateway, LocalStorage, NoticeBanner, OutputControls,
    ResultPanel, SelectionCanvas, download, raster,
};
use tiny_skia::Pixmap;
use web_time::Instant;

const STYLE: &str = include_str!("style.css");

type Session = Controller<HttpGateway, LocalStorage>;

fn main() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log_level()).is_err() {
        log::warn!("a logger was already installed");
    }
    dioxus::launch(app);
}

/// Console verbosity: everything in debug builds, warnings up otherwise.
const fn log_level() -> log::Level {
    if cfg!(debug_assertions) {
        log::Level::Debug
    } else {
        log::Level::Warn
    }
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

/// Handles shared by every event handler.
///
/// All fields are `Copy`, so closures capture the whole struct by value.
/// The [`Session`] is the single owner of workflow state; the signals
/// only tell Dioxus what to re-render.
#[derive(Clone, Copy)]
struct Ui {
    session: CopyValue<Rc<Session>>,
    frames: CopyValue<Option<BrowserFrames>>,
    /// Bumped whenever the workflow changes in a way the page shows.
    revision: Signal<u64>,
    picture: Signal<Option<Rc<Pixmap>>>,
    marker: Signal<Option<DisplayPoint>>,
    notice: Signal<Option<Notice>>,
    notice_seq: Signal<u64>,
    /// Object URL of the displayed result, tagged with its revision.
    result_url: Signal<Option<(u64, String)>>,
}

impl Ui {
    fn new() -> Self {
        let session = Controller::new(
            EditorConfig::default(),
            HttpGateway::from_window(),
            LocalStorage,
        );
        let mut ui = Self {
            session: CopyValue::new(Rc::new(session)),
            frames: CopyValue::new(None),
            revision: Signal::new(0),
            picture: Signal::new(None),
            marker: Signal::new(None),
            notice: Signal::new(None),
            notice_seq: Signal::new(0),
            result_url: Signal::new(None),
        };
        let frames = BrowserFrames::new(move |handle| ui.frame(handle));
        ui.frames.set(Some(frames));
        ui
    }

    fn session(self) -> Rc<Session> {
        self.session.cloned()
    }

    fn bump(mut self) {
        self.revision += 1;
    }

    /// Spawn `op` and re-render once it has sent its request.
    fn launch(self, op: impl Future<Output = ()> + 'static) {
        spawn(op);
        // Tasks are polled in spawn order.
        spawn(async move { self.bump() });
    }

    // -- canvas ----------------------------------------------------------

    /// Re-render the selection, reusing the previous pixmap's buffer once
    /// the canvas has finished painting it.
    fn redraw(mut self) {
        let session = self.session();
        let previous = self.picture.with_mut(Option::take);
        let picture = {
            let workflow = session.workflow();
            match (workflow.step(), workflow.image(), workflow.editor()) {
                (Step::Select, Some(image), Some(editor)) => {
                    let corners = editor.drawn_corners();
                    let dragging = editor.is_dragging();
                    let style = SelectionStyle::default();
                    Some(match previous {
                        Some(mut pixmap) => {
                            let target = Rc::make_mut(&mut pixmap);
                            render_into(target, &image.base, &corners, dragging, &style);
                            pixmap
                        }
                        None => Rc::new(render(&image.base, &corners, dragging, &style)),
                    })
                }
                _ => None,
            }
        };
        self.picture.set(picture);
        self.track_marker();
    }

    fn track_marker(mut self) {
        let session = self.session();
        let marker = session
            .workflow()
            .editor()
            .and_then(Editor::drag)
            .map(DragSession::visual);
        if *self.marker.peek() != marker {
            self.marker.set(marker);
        }
    }

    fn apply(self, repaint: Repaint) {
        match repaint {
            Repaint::None => {}
            Repaint::Handles => self.track_marker(),
            Repaint::Canvas => {
                self.redraw();
                self.bump();
            }
        }
    }

    fn pointer(mut self, event: PointerEvent) {
        let session = self.session();
        let repaint = {
            let mut frames = self.frames.write();
            let Some(frames) = frames.as_mut() else {
                return;
            };
            session.update(|workflow| workflow.handle_pointer(&event, frames))
        };
        self.apply(repaint);
    }

    fn frame(self, handle: FrameHandle) {
        let repaint = self.session().update(|workflow| workflow.on_frame(handle));
        self.apply(repaint);
    }

    // -- notices ---------------------------------------------------------

    fn show(mut self, notice: Notice) {
        self.notice_seq += 1;
        let seq = *self.notice_seq.peek();
        let dismiss_after = notice.auto_dismiss;
        self.notice.set(Some(notice));
        if let Some(after) = dismiss_after {
            spawn(async move {
                TimeoutFuture::new(millis(after)).await;
                if *self.notice_seq.peek() == seq {
                    self.notice.set(None);
                }
            });
        }
    }

    fn report(self, err: &WorkflowError) {
        log::debug!("{err}");
        self.show(err.notice());
    }

    fn clear_notice(mut self) {
        if self.notice.peek().is_some() {
            self.notice.set(None);
        }
    }

    // -- results ---------------------------------------------------------

    fn refresh_result(mut self) {
        let session = self.session();
        let next = {
            let workflow = session.workflow();
            let view = workflow.result();
            let shown = self.result_url.peek().as_ref().map(|(revision, _)| *revision);
            if shown == view.map(|view| view.revision) {
                return;
            }
            view.and_then(|view| match raster::bytes_to_blob_url(&view.image) {
                Ok(url) => Some((view.revision, url)),
                Err(err) => {
                    log::warn!("cannot display result: {err}");
                    None
                }
            })
        };
        let old = self.result_url.peek().as_ref().map(|(_, url)| url.clone());
        self.result_url.set(next);
        if let Some(old) = old {
            raster::revoke_blob_url(&old);
        }
    }

    fn finish(self, outcome: Result<Completion, WorkflowError>) {
        match outcome {
            Ok(Completion::Applied) => {
                self.redraw();
                self.refresh_result();
            }
            Ok(Completion::Stale) => {}
            Err(err) => self.report(&err),
        }
        self.bump();
    }

    // -- actions ---------------------------------------------------------

    fn upload(self, file: UploadFile) {
        self.clear_notice();
        self.launch(async move {
            let outcome = self.session().upload(file).await;
            self.finish(outcome);
        });
    }

    fn submit(self) {
        self.clear_notice();
        self.launch(async move {
            let outcome = self.session().submit().await;
            self.finish(outcome);
        });
    }

    fn choose(self, prefs: OutputPreferences) {
        let deadline = self.session().choose_preferences(prefs, Instant::now());
        self.bump();
        let Some(deadline) = deadline else {
            return;
        };
        spawn(async move {
            TimeoutFuture::new(millis(deadline.saturating_duration_since(Instant::now()))).await;
            // Earlier sleeps find nothing due; only the last one sends.
            self.launch(async move {
                match self.session().flush_reprocess(Instant::now()).await {
                    Ok(Some(completion)) => self.finish(Ok(completion)),
                    Ok(None) => {}
                    Err(err) => self.finish(Err(err)),
                }
            });
        });
    }

    fn rotate(self, rotation: Rotation) {
        self.clear_notice();
        self.launch(async move {
            let outcome = self.session().rotate(rotation).await;
            self.finish(outcome);
        });
    }

    fn download(self) {
        spawn(async move {
            match self.session().download().await {
                Ok((target, bytes)) => {
                    if let Err(err) = download::trigger_download(&bytes, &target.0) {
                        self.show(Notice {
                            severity: Severity::Banner,
                            message: format!("Download failed: {err}"),
                            auto_dismiss: Some(Notice::BANNER_TIMEOUT),
                        });
                    }
                }
                Err(err) => self.report(&err),
            }
        });
    }

    fn reset_selection(self) {
        self.session().update(|workflow| workflow.reset_selection());
        self.redraw();
        self.bump();
    }

    fn back(self) {
        self.clear_notice();
        if let Err(err) = self.session().back_to_select() {
            self.report(&err);
        }
        self.redraw();
        self.bump();
    }

    fn start_over(self) {
        self.session().start_over();
        self.clear_notice();
        self.redraw();
        self.refresh_result();
        self.bump();
    }
}

fn step_title(step: Step) -> &'static str {
    match step {
        Step::Upload => "1. Upload a photo of a document",
        Step::Select => "2. Mark the four corners",
        Step::Result => "3. Review your scan",
    }
}

fn phase_hint(phase: Option<SelectionPhase>) -> String {
    match phase {
        Some(SelectionPhase::Placing(placed)) => {
            format!("{placed} of {MAX_CORNERS} corners placed.")
        }
        Some(SelectionPhase::Complete) => "Drag a corner to adjust it.".into(),
        Some(SelectionPhase::Empty) | None => {
            "Click the four corners of the document, or process the whole image as is.".into()
        }
    }
}

/// Root application component.
///
/// Owns the session controller and switches between the upload,
/// corner-selection, and result views.
#[allow(clippy::too_many_lines)]
fn app() -> Element {
    let ui = use_hook(Ui::new);
    let _ = (ui.revision)();

    let session = ui.session();
    let (step, prefs, uploading, rendering, can_submit, surface, phase) = {
        let workflow = session.workflow();
        (
            workflow.step(),
            workflow.prefs(),
            workflow.is_busy(Slot::Upload),
            workflow.is_busy(Slot::Render) || workflow.reprocess_pending(),
            workflow.can_submit(),
            workflow.editor().map(|editor| editor.mapper().canvas()),
            workflow.editor().map(Editor::phase),
        )
    };
    let result_url = ui.result_url.read().as_ref().map(|(_, url)| url.clone());

    rsx! {
        style { dangerous_inner_html: STYLE }

        div { class: "app",
            header {
                h1 { "quadscan" }
                p { class: "muted", "{step_title(step)}" }
            }

            NoticeBanner {
                notice: (ui.notice)(),
                on_dismiss: move |_| ui.clear_notice(),
            }

            main {
                {match step {
                    Step::Upload => rsx! {
                        FileUpload {
                            busy: uploading,
                            on_upload: move |file| ui.upload(file),
                        }
                    },
                    Step::Select => rsx! {
                        p { class: "hint", "{phase_hint(phase)}" }
                        if let Some(surface) = surface {
                            SelectionCanvas {
                                canvas: surface,
                                picture: ui.picture,
                                marker: ui.marker,
                                on_pointer: move |event| ui.pointer(event),
                            }
                        }
                        OutputControls {
                            prefs,
                            on_change: move |prefs| ui.choose(prefs),
                        }
                        div { class: "actions",
                            button {
                                class: "button",
                                onclick: move |_| ui.reset_selection(),
                                "Reset corners"
                            }
                            button {
                                class: "button",
                                onclick: move |_| ui.start_over(),
                                "Choose another image"
                            }
                            button {
                                class: "button primary",
                                disabled: !can_submit,
                                onclick: move |_| ui.submit(),
                                if rendering { "Processing..." } else { "Process" }
                            }
                        }
                    },
                    Step::Result => rsx! {
                        OutputControls {
                            prefs,
                            on_change: move |prefs| ui.choose(prefs),
                        }
                        ResultPanel {
                            image_url: result_url,
                            busy: rendering,
                            on_rotate: move |rotation| ui.rotate(rotation),
                            on_download: move |_| ui.download(),
                            on_back: move |_| ui.back(),
                            on_start_over: move |_| ui.start_over(),
                        }
                    },
                }}
            }
        }
    }
}
