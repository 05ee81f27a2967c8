//! Headless simulator: drives the engine through the demo room, either on a
//! scripted walk or from control commands typed on stdin.

use clap::Parser;
use echobeacon::{
    args::{BeaconArgs, InteractiveCommand, RunMode, WalkCommand},
    command::ControlCommand,
    config::EngineConfig,
    engine::Engine,
    geometry::Seconds,
    ocr_sim::SimulatedOcr,
    room::SyntheticRoom,
    Point, Pose,
};
use log::{debug, info, warn};
use spin_sleep::LoopHelper;
use std::{
    error::Error,
    io::{self, BufRead},
    sync::mpsc::{self, TryRecvError},
    thread::spawn,
};

// Example:
// cargo run --bin echobeacon -- --seed 3 walk --distance 6 --read
// cargo run --bin echobeacon -- interactive --ocr-latency 2

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = BeaconArgs::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let dt: Seconds = 1.0 / args.tick_rate.max(1.0);

    match args.command {
        RunMode::Walk(walk) => run_walk(config, args.seed, args.tick_rate, dt, walk),
        RunMode::Interactive(opts) => run_interactive(config, args.seed, args.tick_rate, dt, opts),
    }
}

fn build_engine(
    config: EngineConfig,
    seed: Option<u64>,
    room: SyntheticRoom,
    ocr_latency: Seconds,
) -> Engine<SyntheticRoom> {
    let ocr = SimulatedOcr::new(room.signs().to_vec(), ocr_latency);
    let builder = Engine::builder(room)
        .config(config)
        .capture_service(Box::new(ocr));
    match seed {
        Some(seed) => builder.seed(seed),
        None => builder,
    }
    .build()
}

fn start_pose(room: &SyntheticRoom) -> Pose {
    let (_, half_depth) = room.half_extents();
    Pose::new(Point::new(0.0, 1.6, -half_depth + 1.0), Point::new(0.0, 0.0, 1.0))
}

fn run_walk(
    config: EngineConfig,
    seed: Option<u64>,
    tick_rate: f64,
    dt: Seconds,
    walk: WalkCommand,
) -> Result<(), Box<dyn Error>> {
    let room = SyntheticRoom::demo();
    let mut pose = start_pose(&room);
    let mut engine = build_engine(config, seed, room, 0.0);

    if let Some(seconds) = walk.time_refresh {
        engine.apply(ControlCommand::RefreshTime(seconds), &pose)?;
    }
    engine.apply(ControlCommand::Obstacles(true), &pose)?;
    println!("start {}: {} annotation(s)", pose.position, engine.registry().len());

    let mut pacer = LoopHelper::builder().build_with_target_rate(tick_rate);
    let mut walked = 0.0;
    while walked < walk.distance {
        pacer.loop_start();
        let step = (walk.speed * dt).min(walk.distance - walked);
        walked += step;
        pose.position = pose.position + pose.forward.normalized() * step;

        if engine.tick(&pose, dt).regenerated {
            println!(
                "{:6.2}s at {}: regenerated, {} beacon(s)",
                engine.clock(),
                pose.position,
                engine.registry().iter().filter(|a| a.kind().is_beacon()).count()
            );
        }
        pacer.loop_sleep();
    }

    if walk.read {
        engine.request_capture(&pose)?;
        while engine.capture_in_flight() {
            pacer.loop_start();
            engine.tick(&pose, dt);
            pacer.loop_sleep();
        }
        engine.apply(ControlCommand::ReadText, &pose)?;
    }

    for feedback in engine.drain_feedback() {
        println!("said: {}", feedback);
    }
    print_annotations(&engine, &pose);
    Ok(())
}

enum Line {
    Command(String),
    Closed,
}

fn run_interactive(
    config: EngineConfig,
    seed: Option<u64>,
    tick_rate: f64,
    dt: Seconds,
    opts: InteractiveCommand,
) -> Result<(), Box<dyn Error>> {
    let room = SyntheticRoom::demo();
    let mut pose = start_pose(&room);
    let mut engine = build_engine(config, seed, room, opts.ocr_latency);

    let (tx, rx) = mpsc::channel::<Line>();
    let _stdin_thread = spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(Line::Command(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("failed to read stdin: {}", e);
                    break;
                }
            }
        }
        let _ = tx.send(Line::Closed);
    });

    println!("commands: forward <m>, turn <deg>, show, quit, or any control command");
    let mut pacer = LoopHelper::builder().build_with_target_rate(tick_rate);
    loop {
        pacer.loop_start();

        match rx.try_recv() {
            Ok(Line::Command(line)) => {
                if !handle_line(&mut engine, &mut pose, line.trim()) {
                    break;
                }
            }
            Ok(Line::Closed) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        let report = engine.tick(&pose, dt);
        if report.regenerated {
            info!("regenerated at {}", pose.position);
        }
        if let Some(id) = report.capture_completed {
            debug!("capture {} completed", id);
        }
        for feedback in engine.drain_feedback() {
            println!("said: {}", feedback);
        }

        pacer.loop_sleep();
    }
    Ok(())
}

/// Applies one line of input. Returns `false` when the user asked to quit.
fn handle_line(engine: &mut Engine<SyntheticRoom>, pose: &mut Pose, line: &str) -> bool {
    let mut words = line.split_whitespace();
    match (words.next(), words.next().map(str::parse::<f64>)) {
        (None, _) => {}
        (Some("quit" | "exit"), _) => return false,
        (Some("show"), _) => print_annotations(engine, pose),
        (Some("forward"), Some(Ok(meters))) => {
            let (hx, hz) = engine.probe().half_extents();
            let next = pose.position + pose.forward.normalized() * meters;
            pose.position = Point::new(
                next.x.clamp(-hx + 0.2, hx - 0.2),
                next.y,
                next.z.clamp(-hz + 0.2, hz - 0.2),
            );
            println!("now at {}", pose.position);
        }
        (Some("turn"), Some(Ok(degrees))) => {
            // Positive turns right, about world up.
            let (sin, cos) = degrees.to_radians().sin_cos();
            let f = pose.forward;
            pose.forward = Point::new(f.x * cos + f.z * sin, f.y, f.z * cos - f.x * sin);
            println!("now facing {}", pose.forward);
        }
        _ => {
            if let Err(e) = engine.apply_str(line, pose) {
                println!("{}", e);
            }
        }
    }
    true
}

fn print_annotations(engine: &Engine<SyntheticRoom>, pose: &Pose) {
    for view in engine.annotations_view(pose) {
        println!(
            "{:>5} {:<8} {} pitch {:.2} volume {:.2}{}{}",
            view.id.to_string(),
            view.kind.label(),
            view.position,
            view.audio.pitch,
            view.audio.volume,
            if view.muted { " (muted)" } else { "" },
            view.text.map(|t| format!(" \"{}\"", t)).unwrap_or_default(),
        );
    }
}
