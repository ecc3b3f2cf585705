//! Draggable guidelines.
//!
//! A guideline is a thin box spanning the window along one axis. Other boxes
//! attach to its edges, so dragging the guideline moves them too.

use trellis_constraint::{Attribute, BoxVars, Constraint, Relation, Strength};

use crate::bounds::Bounds;
use crate::error::LayoutError;
use crate::window::Window;

/// Axis a guideline spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    /// Spans top to bottom; dragged horizontally
    Vertical,
    /// Spans left to right; dragged vertically
    Horizontal,
}

/// Strength of the pins holding a guideline at its position.
const POSITION_STRENGTH: Strength = Strength::STRONG;

/// A guideline placed in a [`Window`].
///
/// It stays tied to the window's current constraint session;
/// [`Window::reset`] drops its pins until [`Guideline::attach`] runs again.
#[derive(Debug, Clone)]
pub struct Guideline {
    label: String,
    vars: BoxVars,
    orientation: Orientation,
    position: f64,
    thickness: f64,
}

impl Guideline {
    /// Create a guideline centred on `position`.
    pub fn new(
        window: &mut Window,
        label: &str,
        orientation: Orientation,
        position: f64,
        thickness: f64,
    ) -> Result<Self, LayoutError> {
        let guideline = Self {
            label: label.to_string(),
            vars: window.create_box(label)?,
            orientation,
            position,
            thickness,
        };
        guideline.attach(window)?;
        Ok(guideline)
    }

    /// Span the window and pin the guideline at its current position.
    ///
    /// [`Window::reset`] drops these constraints; call this again afterwards
    /// to keep using the guideline.
    pub fn attach(&self, window: &mut Window) -> Result<(), LayoutError> {
        let root = window.vars().clone();
        let (span_start, span_end) = match self.orientation {
            Orientation::Vertical => (Attribute::Top, Attribute::Bottom),
            Orientation::Horizontal => (Attribute::Left, Attribute::Right),
        };
        for attr in [span_start, span_end] {
            window.add_constraint(&Constraint::relate(
                &self.vars,
                attr,
                Relation::Equal,
                &root,
                attr,
                1.0,
                0.0,
                Strength::REQUIRED,
            ))?;
        }

        let (start, end) = self.edges();
        let (lo, hi) = self.pinned_values(self.position);
        window.add_pin(&self.vars, start, lo, POSITION_STRENGTH)?;
        window.add_pin(&self.vars, end, hi, POSITION_STRENGTH)?;
        Ok(())
    }

    /// Edges pinned to the guideline's position.
    fn edges(&self) -> (Attribute, Attribute) {
        match self.orientation {
            Orientation::Vertical => (Attribute::Left, Attribute::Right),
            Orientation::Horizontal => (Attribute::Top, Attribute::Bottom),
        }
    }

    fn pinned_values(&self, position: f64) -> (f64, f64) {
        let half = self.thickness / 2.0;
        (position - half, position + half)
    }

    /// Move the guideline by `delta`, clamped to the window extent.
    pub fn drag_by(&mut self, window: &mut Window, delta: f64) -> Result<(), LayoutError> {
        let extent = match self.orientation {
            Orientation::Vertical => window.options().width,
            Orientation::Horizontal => window.options().height,
        };
        let position = (self.position + delta).clamp(0.0, extent);
        let (start, end) = self.edges();
        let (lo, hi) = self.pinned_values(position);

        window.move_pin(self.vars.get(start), lo)?;
        window.move_pin(self.vars.get(end), hi)?;
        window.tableau_mut().finish_updates()?;
        self.position = position;
        Ok(())
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vars(&self) -> &BoxVars {
        &self.vars
    }

    pub fn bounds(&self, window: &mut Window) -> Result<Bounds, LayoutError> {
        window.read_bounds(&self.vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowOptions;
    use trellis_constraint::SolverError;

    fn window() -> Window {
        Window::new(WindowOptions {
            width: 1000.0,
            height: 300.0,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_vertical_guideline_spans_window() {
        let mut w = window();
        let g = Guideline::new(&mut w, "split", Orientation::Vertical, 500.0, 4.0).unwrap();
        let b = g.bounds(&mut w).unwrap();
        assert!(b.approx_eq(&Bounds::new(498.0, 0.0, 4.0, 300.0), 1e-6), "{:?}", b);
        assert!((b.center().x - g.position()).abs() < 1e-6);
    }

    #[test]
    fn test_drag_moves_attached_box() {
        let mut w = window();
        let mut g = Guideline::new(&mut w, "split", Orientation::Vertical, 500.0, 4.0).unwrap();
        let root = w.vars().clone();
        let right = w.create_box("right").unwrap();
        w.add_constraint(&Constraint::relate(
            &right,
            Attribute::Left,
            Relation::Equal,
            g.vars(),
            Attribute::Right,
            1.0,
            0.0,
            Strength::REQUIRED,
        ))
        .unwrap();
        w.add_constraint(&Constraint::relate(
            &right,
            Attribute::Right,
            Relation::Equal,
            &root,
            Attribute::Right,
            1.0,
            0.0,
            Strength::REQUIRED,
        ))
        .unwrap();
        assert!((w.bounds("right").unwrap().width - 498.0).abs() < 1e-6);

        g.drag_by(&mut w, 200.0).unwrap();
        assert_eq!(g.position(), 700.0);
        let b = w.bounds("right").unwrap();
        assert!((b.x - 702.0).abs() < 1e-6 && (b.width - 298.0).abs() < 1e-6, "{:?}", b);

        w.resize(800.0, 300.0).unwrap();
        assert!((w.bounds("right").unwrap().width - 98.0).abs() < 1e-6);
    }

    #[test]
    fn test_drag_clamps_to_window() {
        let mut w = window();
        let mut g = Guideline::new(&mut w, "split", Orientation::Horizontal, 100.0, 2.0).unwrap();
        g.drag_by(&mut w, 10_000.0).unwrap();
        assert_eq!(g.position(), 300.0);
        g.drag_by(&mut w, -10_000.0).unwrap();
        assert_eq!(g.position(), 0.0);

        g.drag_by(&mut w, 150.0).unwrap();
        let b = g.bounds(&mut w).unwrap();
        assert!(b.approx_eq(&Bounds::new(0.0, 149.0, 1000.0, 2.0), 1e-6), "{:?}", b);
    }

    #[test]
    fn test_reset_detaches_until_attached_again() {
        let mut w = window();
        let mut g = Guideline::new(&mut w, "split", Orientation::Vertical, 500.0, 4.0).unwrap();
        g.drag_by(&mut w, -100.0).unwrap();
        w.reset().unwrap();

        assert!(g.bounds(&mut w).unwrap().approx_eq(&Bounds::default(), 1e-6));
        assert_eq!(
            g.drag_by(&mut w, 10.0).unwrap_err(),
            LayoutError::Solver(SolverError::UnknownEditVariable {
                name: "split.Left".to_string()
            })
        );
        assert_eq!(g.position(), 400.0);

        g.attach(&mut w).unwrap();
        let b = g.bounds(&mut w).unwrap();
        assert!(b.approx_eq(&Bounds::new(398.0, 0.0, 4.0, 300.0), 1e-6), "{:?}", b);
        g.drag_by(&mut w, 10.0).unwrap();
        assert!((g.bounds(&mut w).unwrap().x - 408.0).abs() < 1e-6);
    }

    #[test]
    fn test_user_pin_does_not_capture_drag() {
        let mut w = window();
        let mut g = Guideline::new(&mut w, "split", Orientation::Vertical, 500.0, 4.0).unwrap();
        w.add_constraint(&Constraint::pin(
            g.vars(),
            Attribute::Left,
            Relation::Equal,
            100.0,
            Strength::WEAK,
        ))
        .unwrap();

        g.drag_by(&mut w, 100.0).unwrap();
        let b = g.bounds(&mut w).unwrap();
        assert!(b.approx_eq(&Bounds::new(598.0, 0.0, 4.0, 300.0), 1e-6), "{:?}", b);
    }
}
