//! Countdown display
//!
//! A [`Frame`] describes what the pie should look like once a tick lands;
//! [`Render`] implementations draw it.

use std::f64::consts::TAU;
use std::io::{self, Write};
use std::time::Duration;

use crate::ticks::{TickDescriptor, Units};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Blue,
    Red,
}

impl From<Units> for Color {
    fn from(units: Units) -> Self {
        match units {
            Units::Minutes => Color::Blue,
            Units::Seconds => Color::Red,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub tick: TickDescriptor,
    pub total_secs: u64,
    /// Arc end angle in radians, `TAU` for a full pie.
    pub angle: f64,
    pub color: Color,
    /// How long the transition into this frame should take.
    pub transition: Duration,
}

impl Frame {
    pub fn new(tick: TickDescriptor, total_secs: u64, transition: Duration) -> Self {
        let angle = if total_secs == 0 {
            0.0
        } else {
            TAU * tick.time as f64 / total_secs as f64
        };
        Self {
            tick,
            total_secs,
            angle,
            color: tick.units.into(),
            transition,
        }
    }

    /// Fraction of the pie still showing.
    pub fn fraction(&self) -> f64 {
        self.angle / TAU
    }

    pub fn is_final(&self) -> bool {
        self.tick.time == 0
    }
}

/// Display collaborator driven by countdown ticks.
pub trait Render {
    /// Draw `frame`, transitioning from `previous` when a frame was already shown.
    ///
    /// May be called while a previous transition is still in flight; the new
    /// frame replaces it.
    fn render(&mut self, previous: Option<&Frame>, frame: &Frame);
}

const BAR_WIDTH: usize = 20;

/// Draws the countdown as a coloured bar on a single terminal line.
pub struct TerminalRenderer<W: Write> {
    out: W,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, frame: &Frame) -> io::Result<()> {
        let filled = ((frame.fraction() * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
        let color = match frame.color {
            Color::Blue => "\x1b[34m",
            Color::Red => "\x1b[31m",
        };

        write!(
            self.out,
            "\r⏱️  {color}{:>4}{}\x1b[0m [{color}{}\x1b[0m{}]",
            frame.tick.label,
            frame.tick.units.suffix(),
            "█".repeat(filled),
            "░".repeat(BAR_WIDTH - filled),
        )?;

        if frame.is_final() {
            writeln!(self.out, " Time's up!\x07")?;
        }
        self.out.flush()
    }
}

impl<W: Write> Render for TerminalRenderer<W> {
    fn render(&mut self, _previous: Option<&Frame>, frame: &Frame) {
        // A terminal line cannot animate, so the frame is drawn in its final state
        if let Err(err) = self.draw(frame) {
            tracing::warn!(error = %err, "failed to draw countdown frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(time: u64, label: u64, units: Units) -> TickDescriptor {
        TickDescriptor { time, label, units }
    }

    #[test]
    fn test_frame_angle_and_color() {
        let frame = Frame::new(tick(50, 50, Units::Seconds), 100, Duration::from_millis(500));
        assert!((frame.angle - std::f64::consts::PI).abs() < 1e-9);
        assert_eq!(frame.color, Color::Red);
        assert!(!frame.is_final());

        let frame = Frame::new(tick(120, 2, Units::Minutes), 120, Duration::ZERO);
        assert!((frame.angle - TAU).abs() < 1e-9);
        assert_eq!(frame.color, Color::Blue);
    }

    #[test]
    fn test_terminal_output() {
        let mut renderer = TerminalRenderer::new(Vec::new());

        let start = Frame::new(tick(100, 2, Units::Minutes), 100, Duration::ZERO);
        renderer.render(None, &start);
        let end = Frame::new(tick(0, 0, Units::Seconds), 100, Duration::ZERO);
        renderer.render(Some(&start), &end);

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        let lines: Vec<&str> = out.split('\r').filter(|s| !s.is_empty()).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("2m"));
        assert!(lines[0].contains(&"█".repeat(BAR_WIDTH)));
        assert!(lines[1].contains("0s"));
        assert!(lines[1].contains(&"░".repeat(BAR_WIDTH)));
        assert!(lines[1].ends_with("Time's up!\x07\n"));
    }
}
