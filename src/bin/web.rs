use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

#[path = "../background.rs"]
mod background;
#[path = "../catalog.rs"]
mod catalog;
#[path = "../cli.rs"]
mod cli;
#[path = "../config.rs"]
mod config;
#[path = "../element.rs"]
mod element;
#[path = "../grid.rs"]
mod grid;
#[path = "../logger.rs"]
mod logger;
#[path = "../orbital.rs"]
mod orbital;
#[path = "../orchestrator.rs"]
mod orchestrator;
#[path = "../particles.rs"]
mod particles;
#[path = "../tone.rs"]
mod tone;

use catalog::ElementCatalog;
use clap::Parser;
use cli::Args;
use config::EngineConfig;
use element::ElementRecord;
use orchestrator::{Command, Orchestrator, RenderSnapshot, ToneSink};
use tone::ToneBuffer;

/// Publishes each tone as a WAV blob for the browser to fetch and play.
struct WavSink {
    latest: watch::Sender<Option<Arc<Vec<u8>>>>,
}

impl ToneSink for WavSink {
    fn play(&mut self, tone: ToneBuffer) {
        self.latest.send_replace(Some(Arc::new(tone.to_wav())));
    }
}

#[derive(Clone)]
struct AppState {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Arc<RenderSnapshot>>,
    tone: watch::Receiver<Option<Arc<Vec<u8>>>>,
    elements: Arc<Vec<ElementRecord>>,
    backgrounds: Arc<Vec<Vec<u8>>>,
}

async fn index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

async fn snapshot(State(state): State<AppState>) -> impl IntoResponse {
    let snap = state.snapshots.borrow().clone();
    Json(snap.as_ref().clone())
}

async fn command(State(state): State<AppState>, Json(cmd): Json<Command>) -> StatusCode {
    match state.commands.send(cmd).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn tone_wav(State(state): State<AppState>) -> impl IntoResponse {
    let latest = state.tone.borrow().clone();
    match latest {
        Some(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "audio/wav")],
            bytes.as_ref().clone(),
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn background_png(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> impl IntoResponse {
    match state.backgrounds.get(index) {
        Some(png) if !png.is_empty() => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/png")],
            png.clone(),
        )
            .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Renders every background layer at screen size. A layer that fails to
/// encode is served as 404.
fn encode_backgrounds(config: &EngineConfig) -> Vec<Vec<u8>> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    background::render_layers(config.screen_width, config.screen_height, &mut rng)
        .iter()
        .enumerate()
        .map(|(i, img)| {
            background::encode_png(img).unwrap_or_else(|e| {
                log::warn!("Background layer {i} failed to encode: {e}");
                Vec::new()
            })
        })
        .collect()
}

async fn catalog_records(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.elements.as_ref().clone())
}

/// Sole owner of the engine: applies commands between ticks and publishes a
/// fresh snapshot after every tick.
async fn run_engine(
    mut engine: Orchestrator<WavSink>,
    mut commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<Arc<RenderSnapshot>>,
    tick: Duration,
) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            now = interval.tick() => {
                let dt = now.duration_since(last_tick).as_millis() as u64;
                last_tick = now;
                engine.tick(dt);
                snapshots.send_replace(Arc::new(engine.snapshot()));
            }
            cmd = commands.recv() => match cmd {
                Some(cmd) => {
                    log::debug!("Command {:?}", cmd);
                    engine.apply(cmd);
                }
                None => break,
            },
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = logger::init() {
        eprintln!("logger: {e}");
    }
    let args = Args::parse();

    let (config, msg) = EngineConfig::load(args.config.as_deref());
    log::info!("{msg}");
    let catalog_path = args.catalog.as_deref().or(config.catalog_path.as_deref());
    let catalog = ElementCatalog::load_or_fallback(catalog_path);
    let records = Arc::new(catalog.records().to_vec());
    let backgrounds = Arc::new(encode_backgrounds(&config));

    let (tone_tx, tone_rx) = watch::channel(None);
    let engine = Orchestrator::new(catalog, &config, WavSink { latest: tone_tx });
    let (snap_tx, snap_rx) = watch::channel(Arc::new(engine.snapshot()));
    let (cmd_tx, cmd_rx) = mpsc::channel(64);

    let tick = Duration::from_millis(config.tick_interval_ms());
    tokio::spawn(run_engine(engine, cmd_rx, snap_tx, tick));

    let state = AppState {
        commands: cmd_tx,
        snapshots: snap_rx,
        tone: tone_rx,
        elements: records,
        backgrounds,
    };
    let app = Router::new()
        .route("/", get(index))
        .route("/snapshot", get(snapshot))
        .route("/command", post(command))
        .route("/tone", get(tone_wav))
        .route("/catalog", get(catalog_records))
        .route("/background/:index", get(background_png))
        .with_state(state);

    let addr: SocketAddr = match config.bind_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            log::warn!("Bad bind address {:?} ({e}); using 127.0.0.1:3000", config.bind_addr);
            SocketAddr::from(([127, 0, 0, 1], 3000))
        }
    };
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Cannot bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    println!("Serving on http://{addr}");
    if let Err(e) = axum::serve(listener, app).await {
        log::error!("Server error: {e}");
    }
}

const INDEX_HTML: &str = r##"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8" />
<title>Proton Fusion Drift</title>
<style>
  html, body { margin: 0; background: #0a0a1e; color: #dcdcff; font-family: sans-serif; overflow: hidden; }
  canvas { display: block; margin: 0 auto; cursor: grab; }
</style>
</head>
<body>
<canvas id="view" width="1024" height="768"></canvas>
<script>
const canvas = document.getElementById("view");
const ctx = canvas.getContext("2d");
const CELL = 80, GRID_OFFSET = [50, 100];
const CONTROLS = [
  "Controls:", "Space/Right - Next Element", "Left - Previous Element", "I - Toggle Info",
  "O - Toggle Orbitals", "E - Toggle Electrons", "Mouse Wheel - Zoom", "Mouse Drag - Move View",
  "R - Reset View", "G - Toggle Quantum Grid", "B - Cycle Background",
];
let snap = null, inFlight = false, lastTones = null;
const layers = [];

const rgba = (c, a) => `rgba(${c[0]},${c[1]},${c[2]},${a})`;
const send = (cmd) => fetch("/command", {
  method: "POST", headers: { "Content-Type": "application/json" }, body: JSON.stringify(cmd),
});

function playTone(seq) {
  new Audio(`/tone?seq=${seq}`).play().catch(() => {});
}

function layer(index) {
  if (!layers[index]) {
    layers[index] = new Image();
    layers[index].src = `/background/${index}`;
  }
  return layers[index];
}

function drawBackground(s) {
  const bg = s.background, img = layer(bg.layer), w = canvas.width, h = canvas.height;
  if (img.complete && img.naturalWidth > 0) {
    ctx.save();
    ctx.globalAlpha = bg.alpha / 255;
    for (let x = -1; x < 2; x++) {
      for (let y = -1; y < 2; y++) {
        const dx = Math.sin(bg.distortion + x * 0.5) * 5, dy = Math.cos(bg.distortion + y * 0.5) * 5;
        ctx.drawImage(img, x * w + bg.offset[0] + dx, y * h + bg.offset[1] + dy, w, h);
      }
    }
    ctx.restore();
  }
  ctx.fillStyle = `rgba(0,0,0,${bg.overlay_alpha / 255})`;
  ctx.fillRect(0, 0, w, h);
}

function drawGrid(s) {
  if (s.grid.alpha === 0) return;
  ctx.save();
  ctx.globalAlpha = s.grid.alpha / 255;
  const centerOf = (x, y) => [GRID_OFFSET[0] + x * CELL + CELL / 2, GRID_OFFSET[1] + y * CELL + CELL / 2];
  for (const c of s.grid.cells) {
    const x = GRID_OFFSET[0] + c.x * CELL, y = GRID_OFFSET[1] + c.y * CELL;
    ctx.strokeStyle = rgba(c.color, c.color[3] / 255);
    ctx.strokeRect(x, y, CELL, CELL);
    if (!c.active) continue;
    const hi = c.color.map((v, i) => Math.min(255, v + (i === 3 ? 50 : 100)));
    ctx.fillStyle = rgba(hi, hi[3] / 255);
    ctx.fillRect(x + 2.5, y + 2.5, CELL - 5, CELL - 5);
    ctx.strokeStyle = rgba(hi, 80 / 255);
    ctx.lineWidth = 2;
    const [cx, cy] = centerOf(c.x, c.y);
    for (const [ox, oy] of s.grid.active_cells) {
      if (ox === c.x && oy === c.y) continue;
      const [tx, ty] = centerOf(ox, oy);
      ctx.beginPath(); ctx.moveTo(cx, cy); ctx.lineTo(tx, ty); ctx.stroke();
    }
    ctx.lineWidth = 1;
    ctx.fillStyle = "rgba(255,255,255,0.8)";
    ctx.font = "14px sans-serif";
    ctx.fillText("Q", cx - 5, cy + 5);
  }
  ctx.restore();
}

function drawParticles(s) {
  for (const p of s.particles) {
    const a = p.alpha / 255;
    ctx.fillStyle = rgba(p.color, a / 3);
    ctx.beginPath(); ctx.arc(p.x, p.y, p.size * 2, 0, Math.PI * 2); ctx.fill();
    ctx.fillStyle = rgba(p.color, a);
    ctx.beginPath(); ctx.arc(p.x, p.y, p.size, 0, Math.PI * 2); ctx.fill();
  }
}

function drawAtom(s) {
  const [cx, cy] = s.center, n = s.nucleus, zoom = s.view.zoom;
  if (s.view.show_orbitals) {
    n.ring_radii.forEach((r, i) => {
      ctx.lineWidth = 3;
      ctx.strokeStyle = rgba(n.color, 30 / 255);
      ctx.beginPath(); ctx.arc(cx, cy, n.glow_radii[i], 0, Math.PI * 2); ctx.stroke();
      ctx.lineWidth = 1;
      ctx.strokeStyle = rgba(n.color, 80 / 255);
      ctx.beginPath(); ctx.arc(cx, cy, r, 0, Math.PI * 2); ctx.stroke();
    });
  }
  ctx.fillStyle = rgba(n.color, 1);
  ctx.beginPath(); ctx.arc(cx, cy, n.radius * zoom * n.pulse, 0, Math.PI * 2); ctx.fill();
  ctx.fillStyle = "rgb(204,102,255)";
  ctx.beginPath(); ctx.arc(cx, cy, 8 * n.pulse, 0, Math.PI * 2); ctx.fill();
  n.wave_radii.forEach((r, i) => {
    ctx.lineWidth = 2;
    ctx.strokeStyle = rgba(n.color, (100 - (i + 1) * 20) / 255);
    ctx.beginPath(); ctx.arc(cx, cy, Math.max(0, r), 0, Math.PI * 2); ctx.stroke();
  });
  ctx.lineWidth = 1;
  if (s.view.show_electrons) {
    for (const e of s.electrons) {
      ctx.fillStyle = rgba(e.color, 1);
      ctx.beginPath(); ctx.arc(cx + e.x * zoom, cy + e.y * zoom, e.size, 0, Math.PI * 2); ctx.fill();
    }
  }
}

function drawPanel(x, y, w, h) {
  ctx.fillStyle = "rgba(20,10,40,0.7)"; ctx.fillRect(x, y, w, h);
  ctx.strokeStyle = "rgba(100,80,150,0.6)"; ctx.strokeRect(x, y, w, h);
}

function drawInfo(s) {
  if (!s.view.show_info) return;
  const e = s.element, x = 50, y = 300;
  drawPanel(x - 10, y - 10, 320, 310);
  ctx.fillStyle = "rgb(255,255,150)"; ctx.font = "64px sans-serif"; ctx.fillText(e.symbol, x, y + 55);
  ctx.fillStyle = "rgb(220,220,255)"; ctx.font = "40px sans-serif"; ctx.fillText(e.name, x, y + 115);
  ctx.font = "22px sans-serif";
  ctx.fillText(`Atomic Number: ${e.atomic_number}`, x, y + 155);
  ctx.fillText(`Atomic Mass: ${e.atomic_mass ?? "N/A"}`, x, y + 183);
  ctx.fillText(`Melting Point: ${e.melting_point ?? "N/A"} K`, x, y + 211);
  ctx.fillText(`Boiling Point: ${e.boiling_point ?? "N/A"} K`, x, y + 239);
  ctx.fillText(`Density: ${e.density ?? "N/A"} g/cm³`, x, y + 267);
  ctx.fillStyle = "rgb(50,50,80)"; ctx.fillRect(x, y + 282, 300, 10);
  ctx.fillStyle = "rgb(100,150,255)"; ctx.fillRect(x, y + 282, 300 * s.progress, 10);
}

function drawControls() {
  drawPanel(15, 15, 250, 25 + CONTROLS.length * 25);
  ctx.font = "17px sans-serif";
  CONTROLS.forEach((line, i) => {
    ctx.fillStyle = i === 0 ? "rgb(255,255,150)" : "rgb(220,220,255)";
    ctx.fillText(line, 20, 38 + i * 25);
  });
}

function drawTransition(s) {
  if (s.transition === null) return;
  const p = s.transition, w = canvas.width, h = canvas.height;
  const rising = p < 0.5, alpha = rising ? p * 2 : (1 - p) * 2, wave = h * alpha;
  ctx.strokeStyle = `rgba(150,100,255,${alpha})`; ctx.lineWidth = 3;
  for (let x = 0; x < w; x += 5) {
    const off = Math.sin(x / 50 + p * 10) * 20;
    ctx.beginPath();
    if (rising) { ctx.moveTo(x, h - wave + off); ctx.lineTo(x, h); }
    else { ctx.moveTo(x, 0); ctx.lineTo(x, wave + off); }
    ctx.stroke();
  }
  ctx.lineWidth = 1;
}

function draw(s) {
  ctx.fillStyle = "rgb(10,10,30)";
  ctx.fillRect(0, 0, canvas.width, canvas.height);
  drawBackground(s);
  drawGrid(s);
  drawParticles(s);
  drawAtom(s);
  drawInfo(s);
  drawControls();
  ctx.fillStyle = "rgb(220,220,255)"; ctx.font = "17px sans-serif";
  ctx.fillText(s.status, canvas.width - 400, 35);
  drawTransition(s);
}

async function frame() {
  if (!inFlight) {
    inFlight = true;
    try {
      const res = await fetch("/snapshot");
      snap = await res.json();
      if (lastTones !== null && snap.tones !== lastTones) playTone(snap.tones);
      lastTones = snap.tones;
    } catch (_) {}
    inFlight = false;
  }
  if (snap) draw(snap);
  requestAnimationFrame(frame);
}

const KEYS = {
  " ": "advance_next", ArrowRight: "advance_next", ArrowLeft: "advance_previous",
  i: "toggle_info", o: "toggle_orbitals", e: "toggle_electrons", r: "reset_view", g: "toggle_grid_overlay",
  b: "cycle_background",
};
window.addEventListener("keydown", (ev) => {
  const type = KEYS[ev.key];
  if (type) { ev.preventDefault(); send({ type }); }
});
canvas.addEventListener("wheel", (ev) => {
  ev.preventDefault();
  send({ type: "zoom", delta: ev.deltaY < 0 ? 1 : -1 });
}, { passive: false });
let drag = null;
canvas.addEventListener("mousedown", (ev) => { if (ev.button === 0) drag = [ev.clientX, ev.clientY]; });
window.addEventListener("mouseup", () => { drag = null; });
window.addEventListener("mousemove", (ev) => {
  if (!drag) return;
  const dx = ev.clientX - drag[0], dy = ev.clientY - drag[1];
  drag = [ev.clientX, ev.clientY];
  if (dx || dy) send({ type: "pan", dx, dy });
});
requestAnimationFrame(frame);
</script>
</body>
</html>
"##;
