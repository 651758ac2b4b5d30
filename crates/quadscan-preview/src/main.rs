//! Replay clicks and drags on a local image through the corner editor,
//! save the rendered selection, and print the processing request the web
//! app would send.

use std::path::PathBuf;

use clap::Parser;
use quadscan_editor::wire::ProcessBody;
use quadscan_editor::{
    BaseImage, ClientRect, CoordinateMapper, Dimensions, DisplaySize, Editor, EditorConfig,
    ImageRef, MAX_CORNERS, ManualFrames, MouseAdapter, MouseInput, OutputMode, OutputPreferences,
    PointerPhase, PointerUnifier, ProcessRequest, SelectionStyle, SnapPolicy, SourcePoint,
    ValidationError, render, to_rgba_image,
};

/// Render a corner selection over an image and print the resulting
/// `/process` request body.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Input image path.
    input: PathBuf,

    /// Where to save the rendered selection (PNG recommended).
    #[arg(short, long)]
    output: PathBuf,

    /// Click at "X,Y" in display pixels. Repeat up to four times; clicks
    /// on an existing corner start and end a zero-length drag.
    #[arg(long = "click", value_name = "X,Y", value_parser = parse_pair)]
    clicks: Vec<(f64, f64)>,

    /// Drag from one display point to another, "X1,Y1:X2,Y2". Applied
    /// after all clicks.
    #[arg(long = "drag", value_name = "X1,Y1:X2,Y2", value_parser = parse_drag)]
    drags: Vec<((f64, f64), (f64, f64))>,

    /// On-screen size of the canvas as "WxH". Defaults to the canvas
    /// size (no CSS scaling).
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    display: Option<(f64, f64)>,

    /// Largest canvas surface as "WxH".
    #[arg(long, value_name = "WxH", value_parser = parse_dimensions, default_value = "800x600")]
    max_canvas: Dimensions,

    /// Snap released corners to a grid of this many canvas pixels.
    #[arg(long, value_name = "STEP")]
    snap: Option<f64>,

    /// Output color mode for the printed request.
    #[arg(long, default_value = "color")]
    mode: OutputMode,
}

fn parse_pair(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'X,Y', got: '{s}'"))?;
    let x: f64 = x
        .trim()
        .parse()
        .map_err(|e| format!("invalid X '{x}': {e}"))?;
    let y: f64 = y
        .trim()
        .parse()
        .map_err(|e| format!("invalid Y '{y}': {e}"))?;
    Ok((x, y))
}

fn parse_drag(s: &str) -> Result<((f64, f64), (f64, f64)), String> {
    let (from, to) = s
        .split_once(':')
        .ok_or_else(|| format!("expected 'X1,Y1:X2,Y2', got: '{s}'"))?;
    Ok((parse_pair(from)?, parse_pair(to)?))
}

fn parse_size(s: &str) -> Result<(f64, f64), String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("expected 'WxH', got: '{s}'"))?;
    let w: f64 = w.parse().map_err(|e| format!("invalid width '{w}': {e}"))?;
    let h: f64 = h.parse().map_err(|e| format!("invalid height '{h}': {e}"))?;
    if w <= 0.0 || h <= 0.0 {
        return Err(format!("size must be positive, got {s}"));
    }
    Ok((w, h))
}

fn parse_dimensions(s: &str) -> Result<Dimensions, String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("expected 'WxH', got: '{s}'"))?;
    let w: u32 = w.parse().map_err(|e| format!("invalid width '{w}': {e}"))?;
    let h: u32 = h.parse().map_err(|e| format!("invalid height '{h}': {e}"))?;
    let dims = Dimensions::new(w, h);
    if dims.is_empty() {
        return Err(format!("size must be non-zero, got {s}"));
    }
    Ok(dims)
}

/// Feeds synthetic mouse events through the same path browser input takes.
struct Replay {
    unifier: PointerUnifier,
    frames: ManualFrames,
    rect: ClientRect,
}

impl Replay {
    fn send(&mut self, editor: &mut Editor, phase: PointerPhase, (x, y): (f64, f64)) {
        let raw = MouseInput {
            phase,
            client_x: x,
            client_y: y,
            button: 0,
        };
        if let Some(event) = self.unifier.accept::<MouseAdapter>(&raw, &self.rect) {
            editor.handle_event(&event, &mut self.frames);
        }
        for handle in self.frames.drain() {
            editor.on_frame(handle);
        }
    }

    fn click(&mut self, editor: &mut Editor, at: (f64, f64)) {
        self.send(editor, PointerPhase::Press, at);
        self.send(editor, PointerPhase::Release, at);
    }

    fn drag(&mut self, editor: &mut Editor, from: (f64, f64), to: (f64, f64)) {
        self.send(editor, PointerPhase::Press, from);
        self.send(editor, PointerPhase::Move, to);
        self.send(editor, PointerPhase::Release, to);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    log::info!("reading image from {}", args.input.display());
    let image = image::open(&args.input)?.to_rgba8();
    let natural = Dimensions::new(image.width(), image.height());

    let config = EditorConfig {
        max_canvas: args.max_canvas,
        snap: args.snap.map_or(SnapPolicy::Off, |step| SnapPolicy::Grid { step }),
        ..EditorConfig::default()
    };
    let mut mapper = CoordinateMapper::for_image(natural, config.max_canvas);
    if let Some((width, height)) = args.display {
        mapper = mapper.with_display_size(DisplaySize::new(width, height));
    }
    let display = mapper.display();
    log::info!(
        "source {natural}, canvas {}, display {:.0}x{:.0}",
        mapper.canvas(),
        display.width,
        display.height
    );

    let base = BaseImage::from_rgba(&image, mapper.canvas())?;
    let mut editor = Editor::new(mapper, &config);
    let mut replay = Replay {
        unifier: PointerUnifier::new(),
        frames: ManualFrames::new(),
        rect: ClientRect {
            left: 0.0,
            top: 0.0,
            width: display.width,
            height: display.height,
        },
    };
    for &at in &args.clicks {
        replay.click(&mut editor, at);
    }
    for &(from, to) in &args.drags {
        replay.drag(&mut editor, from, to);
    }

    let rendered = render(
        &base,
        &editor.drawn_corners(),
        false,
        &SelectionStyle::default(),
    );
    log::info!("saving to {}", args.output.display());
    to_rgba_image(&rendered).save(&args.output)?;

    let corners = match editor.corners().len() {
        0 => None,
        MAX_CORNERS => <[SourcePoint; MAX_CORNERS]>::try_from(editor.source_corners()).ok(),
        placed => return Err(ValidationError::IncompleteSelection { placed }.into()),
    };
    let request = ProcessRequest {
        image: ImageRef(
            args.input
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        ),
        corners,
        prefs: OutputPreferences {
            mode: args.mode,
            ..OutputPreferences::default()
        },
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&ProcessBody::from(&request))?
    );
    Ok(())
}
