//! The window root box and the boxes laid out inside it.

use glam::DVec2;
use indexmap::IndexMap;
use tracing::debug;
use trellis_constraint::{
    Attribute, BoxVars, Constraint, Expression, Relation, SolverError, Strength, Tableau, Variable,
};

use crate::bounds::Bounds;
use crate::error::LayoutError;

/// Options for a window's constraint session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowOptions {
    /// Initial window width
    pub width: f64,
    /// Initial window height
    pub height: f64,
    /// Strength of the window edge pins. Must be below REQUIRED so that
    /// resizing can edit them.
    pub edge_strength: Strength,
    /// Strength of intrinsic content sizes
    pub content_strength: Strength,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            edge_strength: Strength::REQUIRED.weaker(),
            content_strength: Strength::MIN,
        }
    }
}

/// A window: the root box of a layout, owning the solver session.
///
/// Every box is created through the window so that its structural
/// constraints are in place before anything else refers to it.
#[derive(Debug, Clone)]
pub struct Window {
    tableau: Tableau,
    options: WindowOptions,
    vars: BoxVars,
    boxes: IndexMap<String, BoxVars>,
    content_sizes: IndexMap<String, (f64, f64)>,
    /// Pinned variable -> edit handle of the pin the window owns
    pins: IndexMap<Variable, Variable>,
}

impl Window {
    pub fn new(options: WindowOptions) -> Result<Self, LayoutError> {
        validate_size(options.width, options.height)?;
        let mut tableau = Tableau::new();
        let vars = BoxVars::new(tableau.allocator_mut(), "window");
        let mut window = Self {
            tableau,
            options,
            vars,
            boxes: IndexMap::new(),
            content_sizes: IndexMap::new(),
            pins: IndexMap::new(),
        };
        window.install_root()?;
        Ok(window)
    }

    /// Structural constraints of the root plus its edge pins.
    fn install_root(&mut self) -> Result<(), LayoutError> {
        add_structural(&mut self.tableau, &self.vars)?;
        let (width, height) = (self.options.width, self.options.height);
        let pins = [
            (Attribute::Left, 0.0),
            (Attribute::Top, 0.0),
            (Attribute::Right, width),
            (Attribute::Bottom, height),
            (Attribute::Width, width),
            (Attribute::Height, height),
        ];
        let (vars, strength) = (self.vars.clone(), self.options.edge_strength);
        for (attribute, value) in pins {
            self.add_pin(&vars, attribute, value, strength)?;
        }
        Ok(())
    }

    /// Pin `vars.attribute` to `value` and remember the pin so that
    /// [`move_pin`](Self::move_pin) edits it even after other pins land on
    /// the same variable.
    pub(crate) fn add_pin(
        &mut self,
        vars: &BoxVars,
        attribute: Attribute,
        value: f64,
        strength: Strength,
    ) -> Result<(), LayoutError> {
        self.tableau
            .add(&Constraint::pin(vars, attribute, Relation::Equal, value, strength))?;
        let var = vars.get(attribute);
        if !strength.is_required() {
            if let Some(record) = self.tableau.edit_record(var) {
                self.pins.insert(var.clone(), record.plus_error.clone());
            }
        }
        Ok(())
    }

    /// Edit a pin placed by [`add_pin`](Self::add_pin). Call
    /// `finish_updates` on the tableau after a batch.
    pub(crate) fn move_pin(&mut self, var: &Variable, value: f64) -> Result<(), LayoutError> {
        let handle = self
            .pins
            .get(var)
            .cloned()
            .ok_or_else(|| SolverError::UnknownEditVariable {
                name: var.name().to_string(),
            })?;
        self.tableau.update_edit(&handle, value)?;
        Ok(())
    }

    /// Allocate a box and register its structural constraints.
    pub fn create_box(&mut self, label: &str) -> Result<BoxVars, LayoutError> {
        if self.boxes.contains_key(label) {
            return Err(LayoutError::DuplicateBox {
                label: label.to_string(),
            });
        }
        let vars = BoxVars::new(self.tableau.allocator_mut(), label);
        add_structural(&mut self.tableau, &vars)?;
        debug!(label, "created box");
        self.boxes.insert(label.to_string(), vars.clone());
        Ok(vars)
    }

    pub fn box_vars(&self, label: &str) -> Result<&BoxVars, LayoutError> {
        self.boxes.get(label).ok_or_else(|| LayoutError::UnknownBox {
            label: label.to_string(),
        })
    }

    /// The root box's variables.
    pub fn vars(&self) -> &BoxVars {
        &self.vars
    }

    pub fn options(&self) -> &WindowOptions {
        &self.options
    }

    pub fn add_constraint(&mut self, constraint: &Constraint) -> Result<(), LayoutError> {
        self.tableau.add(constraint)?;
        Ok(())
    }

    pub fn add_expression_constraint(
        &mut self,
        lhs: Expression,
        relation: Relation,
        rhs: Expression,
        strength: Strength,
    ) -> Result<(), LayoutError> {
        self.tableau.add_constraint(lhs, relation, rhs, strength)?;
        Ok(())
    }

    /// Give a box an intrinsic size at the content strength. Later calls
    /// edit the existing size constraints.
    pub fn set_content_size(&mut self, label: &str, width: f64, height: f64) -> Result<(), LayoutError> {
        if !(width >= 0.0 && height >= 0.0) {
            return Err(LayoutError::InvalidSize { width, height });
        }
        let vars = self.box_vars(label)?.clone();
        if self.content_sizes.contains_key(label) {
            self.move_pin(&vars.width, width)?;
            self.move_pin(&vars.height, height)?;
            self.tableau.finish_updates()?;
        } else {
            self.add_content_size(&vars, width, height)?;
        }
        self.content_sizes.insert(label.to_string(), (width, height));
        Ok(())
    }

    fn add_content_size(&mut self, vars: &BoxVars, width: f64, height: f64) -> Result<(), LayoutError> {
        let strength = self.options.content_strength;
        self.add_pin(vars, Attribute::Width, width, strength)?;
        self.add_pin(vars, Attribute::Height, height, strength)?;
        Ok(())
    }

    /// Move the window's right and bottom edges.
    pub fn resize(&mut self, width: f64, height: f64) -> Result<(), LayoutError> {
        validate_size(width, height)?;
        debug!(width, height, "resizing window");
        let vars = self.vars.clone();
        self.move_pin(&vars.right, width)?;
        self.move_pin(&vars.bottom, height)?;
        self.move_pin(&vars.width, width)?;
        self.move_pin(&vars.height, height)?;
        self.tableau.finish_updates()?;
        self.options.width = width;
        self.options.height = height;
        Ok(())
    }

    /// Solved geometry of a box.
    pub fn bounds(&mut self, label: &str) -> Result<Bounds, LayoutError> {
        let vars = self.box_vars(label)?.clone();
        self.read_bounds(&vars)
    }

    /// Solved geometry of the window itself.
    pub fn window_bounds(&mut self) -> Result<Bounds, LayoutError> {
        let vars = self.vars.clone();
        self.read_bounds(&vars)
    }

    /// Solved geometry of every box, in creation order.
    pub fn layout(&mut self) -> Result<IndexMap<String, Bounds>, LayoutError> {
        let boxes: Vec<(String, BoxVars)> = self
            .boxes
            .iter()
            .map(|(label, vars)| (label.clone(), vars.clone()))
            .collect();
        let mut out = IndexMap::with_capacity(boxes.len());
        for (label, vars) in boxes {
            let bounds = self.read_bounds(&vars)?;
            out.insert(label, bounds);
        }
        Ok(out)
    }

    /// The most recently created box containing `point`.
    pub fn hit_test(&mut self, point: DVec2) -> Result<Option<String>, LayoutError> {
        let layout = self.layout()?;
        Ok(layout
            .into_iter()
            .rev()
            .find(|(_, bounds)| bounds.contains(point))
            .map(|(label, _)| label))
    }

    pub(crate) fn read_bounds(&mut self, vars: &BoxVars) -> Result<Bounds, LayoutError> {
        let t = &mut self.tableau;
        Ok(Bounds::new(
            t.get_result_or_default(&vars.left, 0.0)?,
            t.get_result_or_default(&vars.top, 0.0)?,
            t.get_result_or_default(&vars.width, 0.0)?,
            t.get_result_or_default(&vars.height, 0.0)?,
        ))
    }

    pub fn tableau(&self) -> &Tableau {
        &self.tableau
    }

    pub fn tableau_mut(&mut self) -> &mut Tableau {
        &mut self.tableau
    }

    /// Drop every user constraint. Boxes keep their variables, structural
    /// constraints and content sizes; the window keeps its current size.
    ///
    /// Guidelines lose their span and position pins, so existing
    /// [`Guideline`](crate::Guideline) values stop working: their boxes read
    /// back unconstrained and dragging fails with
    /// [`SolverError::UnknownEditVariable`] until
    /// [`Guideline::attach`](crate::Guideline::attach) runs again.
    pub fn reset(&mut self) -> Result<(), LayoutError> {
        self.tableau.reset();
        self.pins.clear();
        self.install_root()?;
        let boxes: Vec<BoxVars> = self.boxes.values().cloned().collect();
        for vars in &boxes {
            add_structural(&mut self.tableau, vars)?;
        }
        let sizes: Vec<(String, (f64, f64))> = self
            .content_sizes
            .iter()
            .map(|(label, size)| (label.clone(), *size))
            .collect();
        for (label, (width, height)) in sizes {
            let vars = self.box_vars(&label)?.clone();
            self.add_content_size(&vars, width, height)?;
        }
        Ok(())
    }
}

fn add_structural(tableau: &mut Tableau, vars: &BoxVars) -> Result<(), LayoutError> {
    for (lhs, rhs) in vars.structural_constraints() {
        tableau.add_constraint(lhs, Relation::Equal, rhs, Strength::REQUIRED)?;
    }
    Ok(())
}

fn validate_size(width: f64, height: f64) -> Result<(), LayoutError> {
    if width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite() {
        Ok(())
    } else {
        Err(LayoutError::InvalidSize { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn window(width: f64, height: f64) -> Window {
        Window::new(WindowOptions {
            width,
            height,
            ..Default::default()
        })
        .unwrap()
    }

    fn panel(window: &mut Window) -> BoxVars {
        let root = window.vars().clone();
        let panel = window.create_box("panel").unwrap();
        let attach = |attr, to, offset, relation| {
            Constraint::relate(&panel, attr, relation, &root, to, 1.0, offset, Strength::REQUIRED)
        };
        window
            .add_constraint(&attach(Attribute::Left, Attribute::Left, 10.0, Relation::Equal))
            .unwrap();
        window
            .add_constraint(&attach(Attribute::Top, Attribute::Top, 10.0, Relation::Equal))
            .unwrap();
        window
            .add_constraint(&attach(Attribute::Right, Attribute::Right, -10.0, Relation::LessOrEqual))
            .unwrap();
        panel
    }

    #[test]
    fn test_window_pins() {
        let mut w = window(800.0, 600.0);
        let b = w.window_bounds().unwrap();
        assert!(b.approx_eq(&Bounds::new(0.0, 0.0, 800.0, 600.0), 1e-6));
        assert_eq!(w.options().edge_strength, Strength::STRONG);
    }

    #[test]
    fn test_invalid_size() {
        let err = Window::new(WindowOptions {
            width: 0.0,
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, LayoutError::InvalidSize { width: 0.0, height: 600.0 });

        let mut w = window(100.0, 100.0);
        assert!(matches!(w.resize(-1.0, 10.0), Err(LayoutError::InvalidSize { .. })));
        assert!(matches!(
            w.set_content_size("nothing", 1.0, 1.0),
            Err(LayoutError::UnknownBox { .. })
        ));
    }

    #[test]
    fn test_content_size_within_window() {
        let mut w = window(800.0, 600.0);
        panel(&mut w);
        w.set_content_size("panel", 200.0, 100.0).unwrap();
        let b = w.bounds("panel").unwrap();
        assert!(b.approx_eq(&Bounds::new(10.0, 10.0, 200.0, 100.0), 1e-6));
    }

    #[test]
    fn test_resize_squeezes_and_restores_content() {
        let mut w = window(800.0, 600.0);
        panel(&mut w);
        w.set_content_size("panel", 200.0, 100.0).unwrap();

        w.resize(150.0, 300.0).unwrap();
        let b = w.bounds("panel").unwrap();
        assert!(b.approx_eq(&Bounds::new(10.0, 10.0, 130.0, 100.0), 1e-6), "{:?}", b);
        assert!(w
            .window_bounds()
            .unwrap()
            .approx_eq(&Bounds::new(0.0, 0.0, 150.0, 300.0), 1e-6));

        w.resize(1000.0, 300.0).unwrap();
        let b = w.bounds("panel").unwrap();
        assert!(b.approx_eq(&Bounds::new(10.0, 10.0, 200.0, 100.0), 1e-6), "{:?}", b);
        assert_eq!(w.options().width, 1000.0);
    }

    #[test]
    fn test_content_size_edit() {
        let mut w = window(1000.0, 300.0);
        panel(&mut w);
        w.set_content_size("panel", 200.0, 100.0).unwrap();
        w.set_content_size("panel", 400.0, 50.0).unwrap();
        let b = w.bounds("panel").unwrap();
        assert!(b.approx_eq(&Bounds::new(10.0, 10.0, 400.0, 50.0), 1e-6), "{:?}", b);
    }

    #[test]
    fn test_duplicate_and_unknown_boxes() {
        let mut w = window(100.0, 100.0);
        w.create_box("a").unwrap();
        assert_eq!(
            w.create_box("a").unwrap_err(),
            LayoutError::DuplicateBox { label: "a".to_string() }
        );
        assert!(matches!(w.bounds("b"), Err(LayoutError::UnknownBox { .. })));
    }

    #[test]
    fn test_infeasible_constraint_surfaces_solver_error() {
        let mut w = window(100.0, 100.0);
        let a = w.create_box("a").unwrap();
        w.add_expression_constraint(
            Expression::from(&a.width),
            Relation::Equal,
            Expression::from_constant(10.0),
            Strength::REQUIRED,
        )
        .unwrap();
        let err = w
            .add_expression_constraint(
                Expression::from(&a.width),
                Relation::Equal,
                Expression::from_constant(20.0),
                Strength::REQUIRED,
            )
            .unwrap_err();
        assert_eq!(err, LayoutError::Solver(SolverError::Infeasible));
    }

    #[test]
    fn test_layout_and_reset() {
        let mut w = window(800.0, 600.0);
        panel(&mut w);
        w.create_box("free").unwrap();
        w.set_content_size("panel", 200.0, 100.0).unwrap();

        let layout = w.layout().unwrap();
        assert_eq!(layout.keys().collect::<Vec<_>>(), vec!["panel", "free"]);
        assert!(layout["panel"].approx_eq(&Bounds::new(10.0, 10.0, 200.0, 100.0), 1e-6));

        w.reset().unwrap();
        let b = w.bounds("panel").unwrap();
        assert!((b.width - 200.0).abs() < 1e-6);
        assert!(w
            .window_bounds()
            .unwrap()
            .approx_eq(&Bounds::new(0.0, 0.0, 800.0, 600.0), 1e-6));
    }

    #[test]
    fn test_content_size_edit_keeps_its_own_pin() {
        let mut w = window(800.0, 600.0);
        let panel = panel(&mut w);
        w.set_content_size("panel", 200.0, 100.0).unwrap();
        w.add_constraint(&Constraint::pin(
            &panel,
            Attribute::Width,
            Relation::Equal,
            300.0,
            Strength::WEAK,
        ))
        .unwrap();
        assert!((w.bounds("panel").unwrap().width - 300.0).abs() < 1e-6);

        w.set_content_size("panel", 50.0, 100.0).unwrap();
        let b = w.bounds("panel").unwrap();
        assert!(b.approx_eq(&Bounds::new(10.0, 10.0, 300.0, 100.0), 1e-6), "{:?}", b);
    }

    #[test]
    fn test_resize_ignores_user_edge_pins() {
        let mut w = window(800.0, 600.0);
        let root = w.vars().clone();
        w.add_constraint(&Constraint::pin(
            &root,
            Attribute::Width,
            Relation::Equal,
            500.0,
            Strength::WEAK,
        ))
        .unwrap();

        w.resize(1000.0, 600.0).unwrap();
        let b = w.window_bounds().unwrap();
        assert!(b.approx_eq(&Bounds::new(0.0, 0.0, 1000.0, 600.0), 1e-6), "{:?}", b);
    }

    #[test]
    fn test_required_edges_cannot_resize() {
        let mut w = Window::new(WindowOptions {
            edge_strength: Strength::REQUIRED,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            w.resize(100.0, 100.0).unwrap_err(),
            LayoutError::Solver(SolverError::UnknownEditVariable {
                name: "window.Right".to_string()
            })
        );
    }

    #[test]
    fn test_hit_test_prefers_latest_box() {
        let mut w = window(800.0, 600.0);
        panel(&mut w);
        w.set_content_size("panel", 200.0, 100.0).unwrap();
        let root = w.vars().clone();
        let badge = w.create_box("badge").unwrap();
        for (attr, offset) in [(Attribute::Left, 20.0), (Attribute::Top, 20.0)] {
            w.add_constraint(&Constraint::relate(
                &badge,
                attr,
                Relation::Equal,
                &root,
                attr,
                1.0,
                offset,
                Strength::REQUIRED,
            ))
            .unwrap();
        }
        w.set_content_size("badge", 10.0, 10.0).unwrap();

        assert_eq!(w.hit_test(DVec2::new(25.0, 25.0)).unwrap().as_deref(), Some("badge"));
        assert_eq!(w.hit_test(DVec2::new(100.0, 50.0)).unwrap().as_deref(), Some("panel"));
        assert_eq!(w.hit_test(DVec2::new(500.0, 500.0)).unwrap(), None);
    }

    fn panel_window(width: f64, height: f64) -> Window {
        let mut w = window(width, height);
        panel(&mut w);
        w.set_content_size("panel", 200.0, 100.0).unwrap();
        w
    }

    proptest! {
        #[test]
        fn resize_sequences_match_fresh_window(
            sizes in prop::collection::vec((30.0f64..2000.0, 30.0f64..2000.0), 1..6),
        ) {
            let mut w = panel_window(800.0, 600.0);
            w.layout().unwrap();
            for (width, height) in sizes {
                w.resize(width, height).unwrap();
                let incremental = w.layout().unwrap();

                let mut fresh = panel_window(width, height);
                let rebuilt = fresh.layout().unwrap();
                for (label, bounds) in &rebuilt {
                    prop_assert!(
                        incremental[label].approx_eq(bounds, 1e-6),
                        "{}: {:?} != {:?}", label, incremental[label], bounds
                    );
                }
                prop_assert!(w.window_bounds().unwrap().approx_eq(&fresh.window_bounds().unwrap(), 1e-6));
            }
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_options_serde() {
        let options = WindowOptions::default();
        let json = serde_json::to_string(&options).unwrap();
        let back: WindowOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }
}
