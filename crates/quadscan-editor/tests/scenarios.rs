//! End-to-end workflow scenarios against a scripted gateway.
//!
//! Requests can be held open and released in any order to check that
//! only the newest response for a slot is ever applied.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::{Cell, RefCell};
use std::io::Cursor;
use std::rc::Rc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::executor::{LocalPool, block_on};
use futures::task::LocalSpawnExt;
use image::{ImageFormat, Rgba, RgbaImage};
use quadscan_editor::{
    CanvasPoint, Completion, Controller, DisplayPoint, EditorConfig, GatewayError, ImageRef,
    MemoryPreferences, OUTPUT_MODE_KEY, OutputMode, OutputPreferences, PreferenceStore,
    ProcessRequest, ProcessingGateway, ProcessingOption, RenderedResult, ReprocessRequest,
    ResultRef, Rotation, SelectionPhase, SourcePoint, Step, UploadFile, UploadReply,
    WorkflowError,
};
use web_time::Instant;

type Reply = Result<RenderedResult, GatewayError>;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Upload(String),
    Process(ProcessRequest),
    Reprocess(ReprocessRequest),
    Rotate(ResultRef, Rotation),
}

/// Gateway whose render calls either answer immediately or wait for the
/// test to release them.
struct Scripted {
    preview: (u32, u32),
    calls: RefCell<Vec<Call>>,
    hold: Cell<bool>,
    held: RefCell<Vec<oneshot::Sender<Reply>>>,
    produced: Cell<u32>,
}

impl Scripted {
    fn new(width: u32, height: u32) -> Self {
        Self {
            preview: (width, height),
            calls: RefCell::new(Vec::new()),
            hold: Cell::new(false),
            held: RefCell::new(Vec::new()),
            produced: Cell::new(0),
        }
    }

    fn next_result(&self) -> RenderedResult {
        let n = self.produced.get() + 1;
        self.produced.set(n);
        let name = format!("result_{n}.png");
        RenderedResult {
            image: name.as_bytes().to_vec(),
            result_ref: ResultRef(name),
        }
    }

    async fn respond(&self) -> Reply {
        if !self.hold.get() {
            return Ok(self.next_result());
        }
        let (tx, rx) = oneshot::channel();
        self.held.borrow_mut().push(tx);
        rx.await
            .unwrap_or_else(|_| Err(GatewayError::Transport("dropped".into())))
    }

    /// Answer the `index`-th held request (in issue order).
    fn release(&self, index: usize, reply: Reply) {
        let tx = std::mem::replace(&mut self.held.borrow_mut()[index], oneshot::channel().0);
        tx.send(reply).unwrap();
    }

    fn reprocess_calls(&self) -> Vec<ReprocessRequest> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Reprocess(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    fn process_calls(&self) -> Vec<ProcessRequest> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Process(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }
}

impl ProcessingGateway for Scripted {
    async fn upload(&self, file: &UploadFile) -> Result<UploadReply, GatewayError> {
        self.calls.borrow_mut().push(Call::Upload(file.name.clone()));
        let (w, h) = self.preview;
        let img = RgbaImage::from_pixel(w, h, Rgba([240, 240, 240, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        Ok(UploadReply {
            image_ref: ImageRef(format!("20240101_000000_{}", file.name)),
            preview: out.into_inner(),
        })
    }

    async fn process(&self, request: &ProcessRequest) -> Reply {
        self.calls.borrow_mut().push(Call::Process(request.clone()));
        self.respond().await
    }

    async fn reprocess(&self, request: &ReprocessRequest) -> Reply {
        self.calls.borrow_mut().push(Call::Reprocess(request.clone()));
        self.respond().await
    }

    async fn rotate(&self, result: &ResultRef, rotation: Rotation) -> Result<Vec<u8>, GatewayError> {
        self.calls
            .borrow_mut()
            .push(Call::Rotate(result.clone(), rotation));
        Ok(b"rotated".to_vec())
    }

    async fn download(&self, result: &ResultRef) -> Result<Vec<u8>, GatewayError> {
        Ok(result.0.as_bytes().to_vec())
    }
}

type Session = Controller<Scripted, MemoryPreferences>;

fn session(width: u32, height: u32) -> Session {
    Controller::new(
        EditorConfig::default(),
        Scripted::new(width, height),
        MemoryPreferences::new(),
    )
}

fn upload(session: &Session) {
    let file = UploadFile {
        name: "receipt.jpg".into(),
        bytes: vec![0xff, 0xd8, 0xff],
    };
    assert_eq!(block_on(session.upload(file)), Ok(Completion::Applied));
    assert_eq!(session.workflow().step(), Step::Select);
}

fn place(session: &Session, points: &[(f64, f64)]) {
    session.update(|wf| {
        let editor = wf.editor_mut().unwrap();
        for &(x, y) in points {
            editor.press_start(DisplayPoint::new(x, y));
        }
    });
}

fn corners(session: &Session) -> Vec<CanvasPoint> {
    session
        .workflow()
        .editor()
        .unwrap()
        .corners()
        .points()
        .to_vec()
}

const SQUARE: [(f64, f64); 4] = [(10.0, 10.0), (100.0, 10.0), (100.0, 100.0), (10.0, 100.0)];

fn canvas(points: &[(f64, f64)]) -> Vec<CanvasPoint> {
    points.iter().map(|&(x, y)| CanvasPoint::new(x, y)).collect()
}

fn grayscale() -> OutputPreferences {
    OutputPreferences {
        mode: OutputMode::Grayscale,
        processing: ProcessingOption::Enhanced,
    }
}

#[test]
fn fifth_placement_is_a_no_op() {
    let s = session(800, 600);
    upload(&s);
    place(&s, &SQUARE);
    place(&s, &[(400.0, 400.0)]);
    assert_eq!(corners(&s), canvas(&SQUARE));
    assert_eq!(
        s.gateway().calls.borrow().as_slice(),
        &[Call::Upload("receipt.jpg".into())]
    );
    assert_eq!(
        s.workflow().editor().unwrap().phase(),
        SelectionPhase::Complete
    );
}

#[test]
fn quad_is_sent_in_source_space_in_placement_order() {
    let s = session(1600, 1200);
    upload(&s);
    place(&s, &SQUARE);
    assert_eq!(block_on(s.submit()), Ok(Completion::Applied));

    let calls = s.gateway().process_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].corners,
        Some([
            SourcePoint::new(20.0, 20.0),
            SourcePoint::new(200.0, 20.0),
            SourcePoint::new(200.0, 200.0),
            SourcePoint::new(20.0, 200.0),
        ])
    );
    assert_eq!(calls[0].image, ImageRef("20240101_000000_receipt.jpg".into()));
    assert_eq!(s.workflow().step(), Step::Result);
}

#[test]
fn whole_image_submission_restores_empty_selection() {
    let s = session(800, 600);
    upload(&s);
    assert_eq!(block_on(s.submit()), Ok(Completion::Applied));
    assert_eq!(s.gateway().process_calls()[0].corners, None);
    assert_eq!(
        s.workflow().result().unwrap().result_ref,
        ResultRef("result_1.png".into())
    );

    s.back_to_select().unwrap();
    assert_eq!(s.workflow().step(), Step::Select);
    assert!(corners(&s).is_empty());

    // New points start a fresh selection.
    place(&s, &[(50.0, 50.0)]);
    assert_eq!(
        s.workflow().editor().unwrap().phase(),
        SelectionPhase::Placing(1)
    );
    assert!(!s.workflow().can_submit());
}

#[test]
fn back_to_select_restores_last_submitted_quad() {
    let s = session(800, 600);
    upload(&s);
    place(&s, &SQUARE);
    block_on(s.submit()).unwrap();

    // Live editor state drifting while the result is shown is irrelevant.
    s.update(|wf| {
        let editor = wf.editor_mut().unwrap();
        editor.reset();
        editor.press_start(DisplayPoint::new(500.0, 500.0));
    });
    s.back_to_select().unwrap();
    assert_eq!(corners(&s), canvas(&SQUARE));

    // A newer submission becomes what is restored next time.
    let second = [(20.0, 20.0), (300.0, 20.0), (300.0, 300.0), (20.0, 300.0)];
    s.update(|wf| wf.reset_selection());
    place(&s, &second);
    block_on(s.submit()).unwrap();
    s.back_to_select().unwrap();
    assert_eq!(corners(&s), canvas(&second));
}

#[test]
fn rapid_toggles_issue_one_reprocess_with_final_parameters() {
    let s = session(800, 600);
    upload(&s);
    place(&s, &SQUARE);
    block_on(s.submit()).unwrap();
    let geometry = s.workflow().snapshot().unwrap().selection.clone();

    let t0 = Instant::now();
    let final_prefs = OutputPreferences {
        mode: OutputMode::Grayscale,
        processing: ProcessingOption::Plain,
    };
    assert!(s.choose_preferences(grayscale(), t0).is_some());
    let deadline = s
        .choose_preferences(final_prefs, t0 + Duration::from_millis(30))
        .unwrap();

    // The first toggle's window has elapsed but the second reset it.
    assert_eq!(
        block_on(s.flush_reprocess(t0 + Duration::from_millis(110))),
        Ok(None)
    );
    assert_eq!(
        block_on(s.flush_reprocess(deadline)),
        Ok(Some(Completion::Applied))
    );
    assert_eq!(block_on(s.flush_reprocess(deadline)), Ok(None));

    let calls = s.gateway().reprocess_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].process.prefs, final_prefs);
    assert_eq!(calls[0].prior, ResultRef("result_1.png".into()));

    let wf = s.workflow();
    let snapshot = wf.snapshot().unwrap();
    assert_eq!(snapshot.last_processed, Some(ResultRef("result_2.png".into())));
    assert_eq!(snapshot.prefs, final_prefs);
    assert_eq!(snapshot.selection, geometry);
    assert_eq!(wf.result().unwrap().result_ref, ResultRef("result_2.png".into()));
}

#[test]
fn reprocess_uses_stored_geometry_not_live_corners() {
    let s = session(1600, 1200);
    upload(&s);
    place(&s, &SQUARE);
    block_on(s.submit()).unwrap();
    let submitted = s.gateway().process_calls()[0].corners;

    s.update(|wf| wf.reset_selection());
    let t0 = Instant::now();
    let deadline = s.choose_preferences(grayscale(), t0).unwrap();
    block_on(s.flush_reprocess(deadline)).unwrap();

    let calls = s.gateway().reprocess_calls();
    assert_eq!(calls[0].process.corners, submitted);
    assert!(submitted.is_some());
}

/// Issue two reprocess requests, both held open, and return the pool
/// plus the collected outcomes in completion order.
fn two_held_reprocesses(
    s: &Rc<Session>,
) -> (LocalPool, Rc<RefCell<Vec<Result<Option<Completion>, WorkflowError>>>>) {
    let mut pool = LocalPool::new();
    let outcomes = Rc::new(RefCell::new(Vec::new()));
    s.gateway().hold.set(true);

    let t0 = Instant::now();
    let second_at = t0 + Duration::from_millis(500);
    for (prefs, at) in [(grayscale(), t0), (OutputPreferences::default(), second_at)] {
        let deadline = s.choose_preferences(prefs, at).unwrap();
        let (s, outcomes) = (Rc::clone(s), Rc::clone(&outcomes));
        pool.spawner()
            .spawn_local(async move {
                let outcome = s.flush_reprocess(deadline).await;
                outcomes.borrow_mut().push(outcome);
            })
            .unwrap();
        // Let the request go out before the next toggle.
        pool.run_until_stalled();
    }
    (pool, outcomes)
}

#[test]
fn late_stale_response_is_discarded() {
    let s = Rc::new(session(800, 600));
    upload(&s);
    block_on(s.submit()).unwrap();

    let (mut pool, outcomes) = two_held_reprocesses(&s);
    pool.run_until_stalled();
    assert_eq!(s.gateway().held.borrow().len(), 2);

    // Newer request answers first.
    let newer = RenderedResult {
        result_ref: ResultRef("newer.png".into()),
        image: b"newer".to_vec(),
    };
    s.gateway().release(1, Ok(newer));
    pool.run_until_stalled();
    // Older request answers afterwards.
    let older = RenderedResult {
        result_ref: ResultRef("older.png".into()),
        image: b"older".to_vec(),
    };
    s.gateway().release(0, Ok(older));
    pool.run_until_stalled();

    assert_eq!(
        *outcomes.borrow(),
        vec![Ok(Some(Completion::Applied)), Ok(Some(Completion::Stale))]
    );
    let wf = s.workflow();
    assert_eq!(wf.result().unwrap().result_ref, ResultRef("newer.png".into()));
    assert_eq!(
        wf.snapshot().unwrap().last_processed,
        Some(ResultRef("newer.png".into()))
    );
    assert_eq!(wf.snapshot().unwrap().prefs, OutputPreferences::default());
}

#[test]
fn early_stale_response_is_discarded() {
    let s = Rc::new(session(800, 600));
    upload(&s);
    block_on(s.submit()).unwrap();

    let (mut pool, outcomes) = two_held_reprocesses(&s);
    pool.run_until_stalled();

    // The superseded request answers first and is ignored.
    let older = RenderedResult {
        result_ref: ResultRef("older.png".into()),
        image: b"older".to_vec(),
    };
    s.gateway().release(0, Ok(older));
    pool.run_until_stalled();
    assert_eq!(
        s.workflow().result().unwrap().result_ref,
        ResultRef("result_1.png".into())
    );
    assert!(s.workflow().is_busy(quadscan_editor::Slot::Render));

    let newer = RenderedResult {
        result_ref: ResultRef("newer.png".into()),
        image: b"newer".to_vec(),
    };
    s.gateway().release(1, Ok(newer));
    pool.run_until_stalled();

    assert_eq!(
        *outcomes.borrow(),
        vec![Ok(Some(Completion::Stale)), Ok(Some(Completion::Applied))]
    );
    assert_eq!(
        s.workflow().result().unwrap().result_ref,
        ResultRef("newer.png".into())
    );
}

#[test]
fn stale_failure_is_not_reported() {
    let s = Rc::new(session(800, 600));
    upload(&s);
    block_on(s.submit()).unwrap();

    let (mut pool, outcomes) = two_held_reprocesses(&s);
    pool.run_until_stalled();
    s.gateway()
        .release(0, Err(GatewayError::Transport("timeout".into())));
    pool.run_until_stalled();
    assert_eq!(*outcomes.borrow(), vec![Ok(Some(Completion::Stale))]);
}

#[test]
fn gateway_failure_reports_banner_and_keeps_state() {
    let s = Rc::new(session(800, 600));
    upload(&s);
    place(&s, &SQUARE);
    s.gateway().hold.set(true);

    let mut pool = LocalPool::new();
    let outcome = Rc::new(RefCell::new(None));
    {
        let (s, outcome) = (Rc::clone(&s), Rc::clone(&outcome));
        pool.spawner()
            .spawn_local(async move {
                *outcome.borrow_mut() = Some(s.submit().await);
            })
            .unwrap();
    }
    pool.run_until_stalled();
    // Busy while in flight.
    assert!(!s.workflow().can_submit());

    s.gateway().release(
        0,
        Err(GatewayError::Service {
            status: Some(500),
            message: "perspective failed".into(),
        }),
    );
    pool.run_until_stalled();

    let err = outcome.borrow_mut().take().unwrap().unwrap_err();
    let notice = err.notice();
    assert_eq!(notice.message, "process failed: perspective failed");
    assert_eq!(notice.auto_dismiss, Some(Duration::from_secs(5)));
    assert_eq!(s.workflow().step(), Step::Select);
    assert_eq!(corners(&s), canvas(&SQUARE));
    assert!(s.workflow().snapshot().unwrap().selection.is_none());
    assert!(s.workflow().can_submit());
}

#[test]
fn start_over_orphans_inflight_process() {
    let s = Rc::new(session(800, 600));
    upload(&s);
    s.gateway().hold.set(true);

    let mut pool = LocalPool::new();
    let outcome = Rc::new(RefCell::new(None));
    {
        let (s, outcome) = (Rc::clone(&s), Rc::clone(&outcome));
        pool.spawner()
            .spawn_local(async move {
                *outcome.borrow_mut() = Some(s.submit().await);
            })
            .unwrap();
    }
    pool.run_until_stalled();
    s.start_over();
    let late = RenderedResult {
        result_ref: ResultRef("late.png".into()),
        image: Vec::new(),
    };
    s.gateway().release(0, Ok(late));
    pool.run_until_stalled();

    assert_eq!(*outcome.borrow(), Some(Ok(Completion::Stale)));
    assert_eq!(s.workflow().step(), Step::Upload);
    assert!(s.workflow().result().is_none());
}

#[test]
fn rotate_and_download_current_result() {
    let s = session(800, 600);
    upload(&s);
    block_on(s.submit()).unwrap();
    let snapshot = s.workflow().snapshot().cloned();

    assert_eq!(
        block_on(s.rotate(Rotation::CounterClockwise)),
        Ok(Completion::Applied)
    );
    assert_eq!(s.workflow().result().unwrap().image, b"rotated");
    assert!(s.gateway().calls.borrow().contains(&Call::Rotate(
        ResultRef("result_1.png".into()),
        Rotation::CounterClockwise
    )));
    assert_eq!(s.workflow().snapshot().cloned(), snapshot);

    let (name, bytes) = block_on(s.download()).unwrap();
    assert_eq!(name, ResultRef("result_1.png".into()));
    assert_eq!(bytes, b"result_1.png");
}

#[test]
fn output_mode_is_persisted_on_submit_and_toggle() {
    let s = session(800, 600);
    upload(&s);
    s.update(|wf| wf.choose_preferences(grayscale(), Instant::now()));
    // Choosing in the select step does not persist yet.
    assert_eq!(s.store().get(OUTPUT_MODE_KEY), None);
    block_on(s.submit()).unwrap();
    assert_eq!(s.store().get(OUTPUT_MODE_KEY).as_deref(), Some("grayscale"));

    s.choose_preferences(OutputPreferences::default(), Instant::now());
    assert_eq!(s.store().get(OUTPUT_MODE_KEY).as_deref(), Some("color"));

    // Start over keeps the last choice as the default.
    s.start_over();
    assert_eq!(s.workflow().prefs().mode, OutputMode::Color);
}

#[test]
fn failed_reprocess_restores_persisted_mode() {
    let s = Rc::new(session(800, 600));
    upload(&s);
    block_on(s.submit()).unwrap();
    assert_eq!(s.store().get(OUTPUT_MODE_KEY).as_deref(), Some("color"));

    s.gateway().hold.set(true);
    let deadline = s.choose_preferences(grayscale(), Instant::now()).unwrap();
    assert_eq!(s.store().get(OUTPUT_MODE_KEY).as_deref(), Some("grayscale"));

    let mut pool = LocalPool::new();
    let outcome = Rc::new(RefCell::new(None));
    {
        let (s, outcome) = (Rc::clone(&s), Rc::clone(&outcome));
        pool.spawner()
            .spawn_local(async move {
                *outcome.borrow_mut() = Some(s.flush_reprocess(deadline).await);
            })
            .unwrap();
    }
    pool.run_until_stalled();
    s.gateway()
        .release(0, Err(GatewayError::Transport("timeout".into())));
    pool.run_until_stalled();

    assert!(outcome.borrow_mut().take().unwrap().is_err());
    assert_eq!(s.workflow().prefs().mode, OutputMode::Color);
    assert_eq!(s.store().get(OUTPUT_MODE_KEY).as_deref(), Some("color"));
}
