/// Terminal front-end for the SW3D software renderer
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color as TermColor, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use std::io::{self, stdout, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sw3d_core::{
    pick, Camera, CameraMove, Color, Mesh, ModelTransform, OrbitController, RenderEngine,
    RenderSettings, RenderStats, RenderTarget, Texture, TriangulatorKind, Vec3,
};

pub mod obj;
pub mod renderer;

pub use obj::{load_obj, parse_obj};
pub use renderer::TerminalSurface;

/// Terminal cells are roughly twice as tall as they are wide.
const CELL_ASPECT: f64 = 2.0;

/// Degrees per frame of the idle spin around X and Y.
const SPIN_STEP: (f64, f64) = (0.4, 0.6);

/// Main application struct for terminal 3D rendering
pub struct TerminalApp {
    mesh: Mesh,
    transform: ModelTransform,
    camera: Camera,
    orbit: OrbitController,
    engine: RenderEngine,
    triangulator: TriangulatorKind,
    settings: RenderSettings,
    surface: TerminalSurface,
    spinning: bool,
    running: bool,
    stats: RenderStats,
    status: String,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(mesh: Mesh) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        let (width, height) = (width as usize, height as usize);

        let mut camera = Camera::new(width as u32, height as u32).position(Vec3::new(0.0, 1.5, 5.0));
        camera.set_aspect_ratio(cell_aspect(width, height));
        let orbit = OrbitController::new(&camera);

        let texture = Texture::checkerboard(64, 8, Color::WHITE, Color::GREY)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        let mut settings = RenderSettings::default()
            .with_fill_color(Color::new(0.9, 0.8, 0.6))
            .with_wireframe_color(Color::CYAN)
            .with_texture(Arc::new(texture));
        settings.texture_enabled = false;

        let triangulator = TriangulatorKind::default();
        Ok(Self {
            mesh,
            transform: ModelTransform::default(),
            camera,
            orbit,
            engine: RenderEngine::with_kind(triangulator),
            triangulator,
            settings,
            surface: TerminalSurface::new(width, height),
            spinning: true,
            running: true,
            stats: RenderStats::default(),
            status: String::new(),
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide
        )?;

        let result = self.main_loop();

        // Cleanup
        execute!(
            stdout(),
            DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        )?;
        terminal::disable_raw_mode()?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                let event = event::read()?;
                self.handle_event(event);
            }

            self.update();
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(width, height) => {
                let (width, height) = (width as usize, height as usize);
                self.surface.resize(width, height);
                self.camera.set_aspect_ratio(cell_aspect(width, height));
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, KeyEvent { code, kind, .. }: KeyEvent) {
        if kind == KeyEventKind::Release {
            return;
        }
        let settings = &mut self.settings;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('w') | KeyCode::Up => self.orbit.move_camera(CameraMove::Forward, &mut self.camera),
            KeyCode::Char('s') | KeyCode::Down => self.orbit.move_camera(CameraMove::Backward, &mut self.camera),
            KeyCode::Char('a') | KeyCode::Left => self.orbit.move_camera(CameraMove::Left, &mut self.camera),
            KeyCode::Char('d') | KeyCode::Right => self.orbit.move_camera(CameraMove::Right, &mut self.camera),
            KeyCode::Char('e') => self.orbit.move_camera(CameraMove::Up, &mut self.camera),
            KeyCode::Char('c') => self.orbit.move_camera(CameraMove::Down, &mut self.camera),
            KeyCode::Char('+') | KeyCode::Char('=') => self.orbit.scroll(1.0, &mut self.camera),
            KeyCode::Char('-') => self.orbit.scroll(-1.0, &mut self.camera),
            KeyCode::Char('r') => {
                self.orbit.reset(&mut self.camera);
                self.transform.reset();
            }
            KeyCode::Char(' ') => self.spinning = !self.spinning,
            KeyCode::Char('1') => settings.wireframe = !settings.wireframe,
            KeyCode::Char('2') => settings.filled = !settings.filled,
            KeyCode::Char('3') => settings.z_buffer = !settings.z_buffer,
            KeyCode::Char('4') => settings.backface_culling = !settings.backface_culling,
            KeyCode::Char('5') => settings.triangulation = !settings.triangulation,
            KeyCode::Char('6') => settings.rasterization = !settings.rasterization,
            KeyCode::Char('7') => settings.texture_enabled = !settings.texture_enabled,
            KeyCode::Char('8') => settings.lighting = !settings.lighting,
            KeyCode::Char('t') => {
                self.triangulator = self.triangulator.toggled();
                self.engine.set_triangulator(self.triangulator.build());
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, MouseEvent { kind, column, row, .. }: MouseEvent) {
        // Rows count double so a drag turns the same amount both ways.
        let (x, y) = (column as f64, row as f64 * CELL_ASPECT);
        match kind {
            MouseEventKind::Down(MouseButton::Left) => self.orbit.mouse_pressed(x, y),
            MouseEventKind::Drag(MouseButton::Left) => {
                self.spinning = false;
                self.orbit.mouse_dragged(x, y, &mut self.camera);
            }
            MouseEventKind::Up(MouseButton::Left) => self.orbit.mouse_released(),
            MouseEventKind::ScrollUp => self.orbit.scroll(1.0, &mut self.camera),
            MouseEventKind::ScrollDown => self.orbit.scroll(-1.0, &mut self.camera),
            MouseEventKind::Down(MouseButton::Right) => self.pick(column as f64, row as f64),
            _ => {}
        }
    }

    fn pick(&mut self, x: f64, y: f64) {
        let (width, height) = (self.surface.width(), self.surface.height());
        self.status = match pick(&self.mesh, Some(&self.transform), &self.camera, x, y, width, height) {
            Ok(result) => format!(
                "picked polygon {} vertex {}",
                describe(result.polygon_index),
                describe(result.vertex_index)
            ),
            Err(e) => format!("pick failed: {}", e),
        };
    }

    fn update(&mut self) {
        if self.spinning {
            self.transform.rotate_by(Vec3::new(SPIN_STEP.0, SPIN_STEP.1, 0.0));
        }
    }

    fn render(&mut self) -> io::Result<()> {
        let (width, height) = (self.surface.width(), self.surface.height());
        if width == 0 || height == 0 {
            return Ok(());
        }

        match self.engine.render(
            &mut self.surface,
            &self.camera,
            &self.mesh,
            Some(&self.transform),
            width,
            height,
            &self.settings,
        ) {
            Ok(stats) => self.stats = stats,
            Err(e) => log::warn!("frame not rendered: {}", e),
        }

        // Output to terminal
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.surface.draw(&mut stdout)?;

        // Draw UI overlay
        let flag = |on: bool| if on { "on" } else { "off" };
        let settings = &self.settings;
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(TermColor::Yellow),
            Print(format!(
                "SW3D | FPS {:.1} | drawn {} culled {} | {:?} | {}",
                self.fps,
                self.stats.polygons_drawn,
                self.stats.polygons_culled,
                self.triangulator,
                self.status
            )),
            terminal::Clear(ClearType::UntilNewLine),
            cursor::MoveTo(0, 1),
            Print(format!(
                "1 wire {} 2 fill {} 3 zbuf {} 4 cull {} 5 tri {} 6 raster {} 7 tex {} 8 light {} | t triangulator  drag orbit  scroll zoom  right-click pick  q quit",
                flag(settings.wireframe),
                flag(settings.filled),
                flag(settings.z_buffer),
                flag(settings.backface_culling),
                flag(settings.triangulation),
                flag(settings.rasterization),
                flag(settings.texture_enabled),
                flag(settings.lighting),
            )),
            terminal::Clear(ClearType::UntilNewLine),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

/// Camera aspect ratio for a grid of `width x height` character cells.
pub fn cell_aspect(width: usize, height: usize) -> f64 {
    width.max(1) as f64 / (height.max(1) as f64 * CELL_ASPECT)
}

fn describe(index: Option<usize>) -> String {
    index.map_or_else(|| "-".to_string(), |i| i.to_string())
}
