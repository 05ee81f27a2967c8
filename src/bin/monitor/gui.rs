use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::{
    error::Error,
    io,
    time::{Duration, Instant},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame, Terminal,
};

use echobeacon::annotation::MarkerColor;
use echobeacon::command::ControlCommand;
use echobeacon::engine::Engine;
use echobeacon::room::SyntheticRoom;
use echobeacon::{Point, Pose};

const SPEED: f64 = 0.8;
const FEEDBACK_LINES: usize = 4;

struct App {
    engine: Engine<SyntheticRoom>,
    pose: Pose,
    dt: f64,
    walls: Vec<(f64, f64)>,
    obstacles: Vec<(f64, f64)>,
    beacons: Vec<(f64, f64)>,
    walls_marked: Vec<(f64, f64)>,
    muted: Vec<(f64, f64)>,
    text: Vec<(f64, f64)>,
    user: Vec<(f64, f64)>,
    said: Vec<String>,
}

/// Outline of every box in the room, sampled every 10 cm.
fn outline(min: (f64, f64), max: (f64, f64)) -> Vec<(f64, f64)> {
    let steps = |a: f64, b: f64| ((b - a) / 0.1).ceil().max(1.0) as usize;
    let (nx, nz) = (steps(min.0, max.0), steps(min.1, max.1));
    let mut pts = Vec::new();
    for i in 0..=nx {
        let x = min.0 + (max.0 - min.0) * i as f64 / nx as f64;
        pts.push((x, min.1));
        pts.push((x, max.1));
    }
    for j in 0..=nz {
        let z = min.1 + (max.1 - min.1) * j as f64 / nz as f64;
        pts.push((min.0, z));
        pts.push((max.0, z));
    }
    pts
}

impl App {
    fn new(engine: Engine<SyntheticRoom>, dt: f64) -> App {
        let room = engine.probe();
        let (hx, hz) = room.half_extents();
        let walls = outline((-hx, -hz), (hx, hz));
        let obstacles = room
            .obstacles()
            .iter()
            .flat_map(|o| outline((o.min.x, o.min.z), (o.max.x, o.max.z)))
            .collect();

        App {
            pose: Pose::new(Point::new(0.0, 1.6, -hz + 1.0), Point::new(0.0, 0.0, 1.0)),
            engine,
            dt,
            walls,
            obstacles,
            beacons: vec![],
            walls_marked: vec![],
            muted: vec![],
            text: vec![],
            user: vec![],
            said: vec![],
        }
    }

    fn command(&mut self, command: ControlCommand) {
        if let Err(e) = self.engine.apply(command, &self.pose) {
            self.said.push(e.to_string());
        }
    }

    /// Walks up and down the middle of the room, turning at each end.
    fn on_tick(&mut self) {
        let (_, hz) = self.engine.probe().half_extents();
        let next = self.pose.position + self.pose.forward * (SPEED * self.dt);
        if next.z.abs() > hz - 1.0 {
            self.pose.forward = -self.pose.forward;
        } else {
            self.pose.position = next;
        }

        self.engine.tick(&self.pose, self.dt);
        self.said
            .extend(self.engine.drain_feedback().iter().map(|f| f.to_string()));
        let keep = self.said.len().saturating_sub(FEEDBACK_LINES);
        self.said.drain(..keep);

        self.beacons.clear();
        self.walls_marked.clear();
        self.muted.clear();
        self.text.clear();
        for view in self.engine.annotations_view(&self.pose) {
            let xz = (view.position.x, view.position.z);
            match view.color {
                MarkerColor::Red => self.beacons.push(xz),
                MarkerColor::Orange => self.walls_marked.push(xz),
                MarkerColor::Gray => self.muted.push(xz),
                MarkerColor::Cyan => self.text.push(xz),
            }
        }
        let p = self.pose.position;
        let f = self.pose.forward;
        self.user = vec![(p.x, p.z), (p.x + f.x * 0.3, p.z + f.z * 0.3)];
    }
}

pub fn engage_gui(engine: Engine<SyntheticRoom>, tick_rate: Duration) -> Result<(), Box<dyn Error>> {
    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // create app and run it
    let app = App::new(engine, tick_rate.as_secs_f64());
    let res = run_app(&mut terminal, app, tick_rate);

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    tick_rate: Duration,
) -> io::Result<()> {
    let mut last_tick = Instant::now();
    let mut obstacles_on = true;
    let mut spotlight_on = false;
    loop {
        terminal.draw(|f| ui(f, &mut app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Char('o') => {
                        obstacles_on = !obstacles_on;
                        app.command(ControlCommand::Obstacles(obstacles_on));
                    }
                    KeyCode::Char('s') => {
                        spotlight_on = !spotlight_on;
                        app.command(ControlCommand::Spotlight(spotlight_on));
                    }
                    KeyCode::Char('l') => app.command(ControlCommand::LocateText),
                    KeyCode::Char('r') => app.command(ControlCommand::ReadText),
                    KeyCode::Char('c') => app.command(ControlCommand::ClearText),
                    KeyCode::Char('+') => app.command(ControlCommand::MoreSamples),
                    KeyCode::Char('-') => app.command(ControlCommand::FewerSamples),
                    _ => {}
                }
            }
        }
        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
}

fn scatter<'a>(name: &'a str, color: Color, data: &'a [(f64, f64)]) -> Dataset<'a> {
    Dataset::default()
        .name(name)
        .marker(symbols::Marker::Dot)
        .graph_type(GraphType::Scatter)
        .style(Style::default().fg(color))
        .data(data)
}

fn labels(half: f64) -> Vec<Span<'static>> {
    [-half, 0.0, half]
        .iter()
        .map(|v| Span::from(format!("{:.1}", v)))
        .collect()
}

fn ui(f: &mut Frame, app: &mut App) {
    let (hx, hz) = app.engine.probe().half_extents();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(FEEDBACK_LINES as u16 + 2)])
        .split(f.size());

    let chart = Chart::new(vec![
        scatter("Room", Color::DarkGray, &app.walls),
        scatter("Furniture", Color::White, &app.obstacles),
        scatter("Obstacle", Color::Red, &app.beacons),
        scatter("Wall", Color::Rgb(255, 165, 0), &app.walls_marked),
        scatter("Muted", Color::Gray, &app.muted),
        scatter("Text", Color::Cyan, &app.text),
        scatter("You", Color::Green, &app.user),
    ])
    .block(
        Block::default()
            .title(" Annotations (q quit, o obstacles, s spotlight, l locate, r read) ")
            .borders(Borders::ALL),
    )
    .x_axis(
        Axis::default()
            .title(Span::styled("X", Style::default().fg(Color::Red)))
            .style(Style::default().fg(Color::White))
            .bounds([-hx - 0.5, hx + 0.5])
            .labels(labels(hx)),
    )
    .y_axis(
        Axis::default()
            .title(Span::styled("Z", Style::default().fg(Color::Red)))
            .style(Style::default().fg(Color::White))
            .bounds([-hz - 0.5, hz + 0.5])
            .labels(labels(hz)),
    );
    f.render_widget(chart, chunks[0]);

    let said: Vec<Line> = app.said.iter().map(|s| Line::from(s.as_str())).collect();
    let status = Paragraph::new(said).block(
        Block::default()
            .title(format!(" {} annotation(s) ", app.engine.registry().len()))
            .borders(Borders::ALL),
    );
    f.render_widget(status, chunks[1]);
}
