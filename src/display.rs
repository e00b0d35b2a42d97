use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use log::debug;
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// Surface is what the render sink paints on. It should abstract the
/// implementation details, so a variety of kinds of screen would work.
///
/// Painting works like a 2D canvas context: pick a fill colour, then fill
/// rectangles with it.
pub trait Surface {
    fn set_fill(&mut self, color: Color);

    /// fill a rectangle in surface pixels with the current fill colour
    fn fill_rect(&mut self, x: usize, y: usize, width: usize, height: usize);

    /// show whatever has been painted so far
    fn present(&mut self) -> Result<(), io::Error>;
}

/// device resolution in cells
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution(pub usize, pub usize);

impl Resolution {
    pub fn pixel_count(&self) -> usize {
        self.0 * self.1
    }

    /// surface pixels needed at `size` pixels per cell
    pub fn surface_size(&self, size: usize) -> (usize, usize) {
        (self.0 * size, self.1 * size)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    pub on: Color,
    pub off: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            on: Color::White,
            off: Color::Black,
        }
    }
}

/// Paints framebuffer snapshots onto a surface, one `size` x `size` square
/// per cell, whole grid every time.
pub struct RenderSink<S: Surface> {
    surface: S,
    resolution: Resolution,
    size: usize,
    palette: Palette,
}

impl<S: Surface> RenderSink<S> {
    pub fn new(surface: S, resolution: Resolution, size: usize, palette: Palette) -> Self {
        RenderSink {
            surface,
            resolution,
            size,
            palette,
        }
    }

    pub fn render(&mut self, snapshot: &[u8]) -> Result<(), io::Error> {
        // make sure we're given exactly the right amount of data to draw
        if snapshot.len() != self.resolution.pixel_count() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "framebuffer has {} cells, expected {}",
                    snapshot.len(),
                    self.resolution.pixel_count()
                ),
            ));
        }
        let width = self.resolution.0;
        let size = self.size;
        for (i, &cell) in snapshot.iter().enumerate() {
            let (x, y) = (i % width, i / width);
            // colour has to be set before the fill, otherwise every cell
            // comes out in the previous cell's colour
            self.surface.set_fill(if cell != 0 {
                self.palette.on
            } else {
                self.palette.off
            });
            self.surface.fill_rect(x * size, y * size, size, size);
        }
        self.surface.present()
    }

    /// paint an all-off frame
    pub fn clear(&mut self) -> Result<(), io::Error> {
        let blank = vec![0; self.resolution.pixel_count()];
        self.render(&blank)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

const TITLE: &str = "CHIP-8 | enter play, space pause, bksp reset, [ ] program, esc quit";

/// colour buffer in a terminal, presented using TUI and crossterm
pub struct TermSurface {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    width: usize,
    height: usize,
    cells: Vec<Color>,
    fill: Color,
}

impl TermSurface {
    pub fn new(width: usize, height: usize) -> Result<TermSurface, io::Error> {
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;
        terminal.clear()?;
        Ok(TermSurface {
            terminal,
            width,
            height,
            cells: vec![Color::Black; width * height],
            fill: Color::Black,
        })
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.width - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.height - 1) as f64, 0.0]
    }
}

/// group cells into one point list per colour, in tui canvas coordinates
/// (y grows upward, so rows go negative)
fn points_by_color(cells: &[Color], width: usize) -> Vec<(Color, Vec<(f64, f64)>)> {
    let mut groups: Vec<(Color, Vec<(f64, f64)>)> = Vec::new();
    for (i, &color) in cells.iter().enumerate() {
        let point = ((i % width) as f64, -1.0 * (i / width) as f64);
        match groups.iter_mut().find(|(c, _)| *c == color) {
            Some((_, points)) => points.push(point),
            None => groups.push((color, vec![point])),
        }
    }
    groups
}

impl Surface for TermSurface {
    fn set_fill(&mut self, color: Color) {
        self.fill = color;
    }

    fn fill_rect(&mut self, x: usize, y: usize, width: usize, height: usize) {
        for row in y..(y + height).min(self.height) {
            for col in x..(x + width).min(self.width) {
                self.cells[row * self.width + col] = self.fill;
            }
        }
    }

    fn present(&mut self) -> Result<(), io::Error> {
        let groups = points_by_color(&self.cells, self.width);
        let (x_bounds, y_bounds) = (self.x_bounds(), self.y_bounds());
        let (width, height) = (self.width as u16, self.height as u16);
        self.terminal.draw(|f| {
            // canvas plus border, clipped so a small terminal doesn't panic
            let area = Rect::new(0, 0, 2 + width, 2 + height).intersection(f.size());
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title(TITLE)
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(x_bounds)
                .y_bounds(y_bounds)
                .marker(Marker::Block)
                .paint(|ctx| {
                    for (color, points) in &groups {
                        ctx.draw(&Points {
                            coords: points.as_slice(),
                            color: *color,
                        });
                    }
                });
            f.render_widget(canvas, area);
        })?;
        Ok(())
    }
}

impl Drop for TermSurface {
    fn drop(&mut self) {
        if let Err(e) = self.terminal.show_cursor() {
            debug!("failed to restore cursor: {}", e);
        }
        if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen) {
            debug!("failed to leave alternate screen: {}", e);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SurfaceOp {
    Fill(Color),
    Rect {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    Present,
}

/// records what gets painted; useful for testing
#[derive(Default)]
pub struct DummySurface {
    pub ops: Vec<SurfaceOp>,
}

impl DummySurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Surface for DummySurface {
    fn set_fill(&mut self, color: Color) {
        self.ops.push(SurfaceOp::Fill(color));
    }

    fn fill_rect(&mut self, x: usize, y: usize, width: usize, height: usize) {
        self.ops.push(SurfaceOp::Rect {
            x,
            y,
            width,
            height,
        });
    }

    fn present(&mut self) -> Result<(), io::Error> {
        self.ops.push(SurfaceOp::Present);
        Ok(())
    }
}
