mod gui;

use std::time::Duration;

use echobeacon::command::ControlCommand;
use echobeacon::config::EngineConfig;
use echobeacon::engine::Engine;
use echobeacon::ocr_sim::SimulatedOcr;
use echobeacon::room::SyntheticRoom;
use echobeacon::{Point, Pose};
use gui::engage_gui;

fn main() {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => match EngineConfig::from_path(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("could not read {}: {}", path, e);
                return;
            }
        },
        None => EngineConfig::default(),
    };

    let room = SyntheticRoom::demo();
    let ocr = SimulatedOcr::new(room.signs().to_vec(), 1.0);
    let mut engine = Engine::builder(room)
        .config(config)
        .capture_service(Box::new(ocr))
        .build();

    let (_, hz) = engine.probe().half_extents();
    let start = Pose::new(Point::new(0.0, 1.6, -hz + 1.0), Point::new(0.0, 0.0, 1.0));
    if let Err(e) = engine.apply(ControlCommand::Obstacles(true), &start) {
        eprintln!("{}", e);
        return;
    }

    let _ = engage_gui(engine, Duration::from_millis(100));
}
