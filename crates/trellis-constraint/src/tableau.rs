//! The incremental simplex tableau.
//!
//! Every constraint is turned into an expression that must equal zero, with
//! slack variables for inequalities and a pair of error variables for each
//! optional equality. The tableau keeps each basic variable as a row
//! expressed over parametric variables. Reading the value of a basic
//! variable is then a lookup of its row constant, and every parametric
//! variable sits at zero.
//!
//! Optional constraints are minimised through an error objective whose
//! coefficients are [`SymbolicWeight`]s, so violation of a stronger
//! constraint always costs more than any violation of a weaker one.
//!
//! Solving is lazy. Adding a constraint marks the tableau unsolved and the
//! next read runs the primal simplex. Editing the constant of an optional
//! equality shifts row constants directly, and [`Tableau::finish_updates`]
//! repairs feasibility with the dual simplex.
//!
//! Every variable, including the collaborator-owned ones, is assumed to be
//! nonnegative.

use std::fmt;
use std::mem;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

use crate::constraint::Constraint;
use crate::error::SolverError;
use crate::expression::{Coefficient, Expression};
use crate::strength::{Relation, Strength};
use crate::variable::{Variable, VariableAllocator, VariableKind};
use crate::weight::SymbolicWeight;
use crate::{approx_eq, near_zero, EPSILON};

/// Bookkeeping for an optional single-variable equality whose constant can
/// be edited after insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct EditRecord {
    /// Error variable absorbing overshoot (`ep`)
    pub plus_error: Variable,
    /// Error variable absorbing undershoot (`em`)
    pub minus_error: Variable,
    /// The value the variable was last asked to take
    pub original_value: f64,
    /// Coefficient of the variable in the constraint expression
    pub coefficient: f64,
}

/// Expression form of a constraint, before it enters the tableau.
struct Formed {
    expression: Expression,
    errors: Vec<Variable>,
    edit: Option<(Variable, EditRecord)>,
}

/// The Cassowary-style solver state.
#[derive(Debug, Clone)]
pub struct Tableau {
    allocator: VariableAllocator,
    /// Basic variable -> its row over parametric variables
    rows: IndexMap<Variable, Expression>,
    parametric: IndexSet<Variable>,
    error_objective: Expression<SymbolicWeight>,
    /// Weight each error variable carries in the objective
    error_weights: IndexMap<Variable, SymbolicWeight>,
    /// Edit records keyed by their plus error variable
    edits: IndexMap<Variable, EditRecord>,
    /// Edited variable -> plus error of its most recent record
    edit_targets: IndexMap<Variable, Variable>,
    added_expressions: u32,
    artificial_count: u32,
    solved: bool,
    /// Edits applied since the last `finish_updates`
    pending_edits: bool,
}

impl Default for Tableau {
    fn default() -> Self {
        Self::new()
    }
}

impl Tableau {
    /// Create an empty tableau with a fresh variable allocator.
    pub fn new() -> Self {
        Self::with_allocator(VariableAllocator::new())
    }

    /// Create an empty tableau that allocates from `allocator`.
    pub fn with_allocator(allocator: VariableAllocator) -> Self {
        Self {
            allocator,
            rows: IndexMap::new(),
            parametric: IndexSet::new(),
            error_objective: Expression::new(),
            error_weights: IndexMap::new(),
            edits: IndexMap::new(),
            edit_targets: IndexMap::new(),
            added_expressions: 0,
            artificial_count: 0,
            solved: true,
            pending_edits: false,
        }
    }

    /// Allocate a collaborator-owned variable for this session.
    pub fn new_variable(&mut self, name: impl Into<Arc<str>>) -> Variable {
        self.allocator.normal(name)
    }

    pub fn allocator_mut(&mut self) -> &mut VariableAllocator {
        &mut self.allocator
    }

    /// Add `lhs <relation> rhs` at the given strength.
    ///
    /// REQUIRED constraints that cannot hold alongside the existing ones are
    /// rejected with [`SolverError::Infeasible`] and leave the tableau as it
    /// was.
    pub fn add_constraint(
        &mut self,
        lhs: Expression,
        relation: Relation,
        rhs: Expression,
        strength: Strength,
    ) -> Result<(), SolverError> {
        if self.pending_edits {
            self.finish_updates()?;
        }
        self.solved = false;

        let Formed {
            mut expression,
            errors,
            edit,
        } = self.form_expression(lhs, relation, rhs, strength);
        debug!(%relation, %strength, expression = %expression, "adding constraint");

        for var in expression.variables() {
            if let Some(row) = self.rows.get(&var) {
                expression.substitute(&var, row);
            }
        }
        if expression.constant() < 0.0 {
            expression.negate();
        }

        match self.choose_subject(&expression) {
            Some(subject) => self.install_row(subject, expression),
            None => self.add_with_artificial(expression)?,
        }

        let weight = strength.weight();
        for error in errors {
            self.error_objective.add_variable(error.clone(), weight);
            self.error_weights.insert(error, weight);
        }
        if let Some((var, record)) = edit {
            self.edit_targets.insert(var, record.plus_error.clone());
            self.edits.insert(record.plus_error.clone(), record);
        }
        Ok(())
    }

    /// Add a declarative box constraint.
    pub fn add(&mut self, constraint: &Constraint) -> Result<(), SolverError> {
        let (lhs, rhs) = constraint.to_expressions()?;
        self.add_constraint(lhs, constraint.relation(), rhs, constraint.strength())
    }

    /// Build `lhs - rhs` with slack and error variables attached.
    fn form_expression(
        &mut self,
        lhs: Expression,
        relation: Relation,
        rhs: Expression,
        strength: Strength,
    ) -> Formed {
        let mut expression = lhs - rhs;
        if relation == Relation::LessOrEqual {
            expression.negate();
        }

        let mut errors = Vec::new();
        let mut edit = None;

        if strength.is_required() {
            if relation != Relation::Equal {
                let slack = self.internal(VariableKind::Slack, "s");
                expression.add_variable(slack, -1.0);
            }
        } else if relation == Relation::Equal {
            let single = match expression.len() {
                1 => expression.terms().next().map(|(v, c)| (v.clone(), *c)),
                _ => None,
            };
            let plus = self.internal(VariableKind::Error, "ep");
            let minus = self.sibling_error();
            if let Some((var, coefficient)) = single {
                edit = Some((
                    var,
                    EditRecord {
                        plus_error: plus.clone(),
                        minus_error: minus.clone(),
                        original_value: -expression.constant() / coefficient,
                        coefficient,
                    },
                ));
            }
            expression.add_variable(plus.clone(), -1.0);
            expression.add_variable(minus.clone(), 1.0);
            errors.push(plus);
            errors.push(minus);
        } else {
            let slack = self.internal(VariableKind::Slack, "s");
            let minus = self.sibling_error();
            expression.add_variable(slack, -1.0);
            expression.add_variable(minus.clone(), 1.0);
            errors.push(minus);
        }

        Formed {
            expression,
            errors,
            edit,
        }
    }

    /// Allocate an internal variable named `{prefix}{n}` for the next
    /// constraint number `n`.
    fn internal(&mut self, kind: VariableKind, prefix: &str) -> Variable {
        self.added_expressions += 1;
        self.allocator
            .allocate(kind, format!("{}{}", prefix, self.added_expressions))
    }

    /// The `em{n}` error variable sharing the current constraint number.
    fn sibling_error(&mut self) -> Variable {
        self.allocator
            .allocate(VariableKind::Error, format!("em{}", self.added_expressions))
    }

    /// Lowest-id variable new to the tableau with a negative coefficient.
    fn choose_subject(&self, expression: &Expression) -> Option<Variable> {
        expression
            .terms()
            .filter(|(var, c)| **c < -EPSILON && !self.contains(var))
            .map(|(var, _)| var)
            .min()
            .cloned()
    }

    fn install_row(&mut self, subject: Variable, mut expression: Expression) {
        if let Some(coefficient) = expression.remove_variable(&subject) {
            expression.scale(-1.0 / coefficient);
        }
        self.parametric.extend(expression.variables());
        trace!(subject = %subject, row = %expression, "new row");
        self.rows.insert(subject, expression);
    }

    /// Phase 1: make an artificial variable basic for the row, drive it to
    /// zero, then drop it.
    fn add_with_artificial(&mut self, expression: Expression) -> Result<(), SolverError> {
        let fresh: Vec<Variable> = expression
            .variables()
            .into_iter()
            .filter(|v| !self.contains(v))
            .collect();
        self.parametric.extend(expression.variables());

        self.artificial_count += 1;
        let artificial = self.allocator.allocate(
            VariableKind::Artificial,
            format!("a{}", self.artificial_count),
        );
        debug!(artificial = %artificial, "no subject, running phase 1");

        let mut objective = expression.clone();
        self.rows.insert(artificial.clone(), expression);
        let outcome = self.optimize(&mut objective);

        if outcome.is_err() || !near_zero(objective.constant()) {
            self.withdraw_artificial(&artificial, &fresh);
            outcome?;
            debug!(residual = objective.constant(), "required constraint is infeasible");
            return Err(SolverError::Infeasible);
        }

        let entering = self
            .rows
            .get(&artificial)
            .map(|row| row.variables().into_iter().min());
        match entering {
            Some(Some(entering)) => self.pivot(&entering, &artificial, &mut objective)?,
            Some(None) => {
                self.rows.swap_remove(&artificial);
            }
            None => {}
        }
        self.strike(&artificial);
        Ok(())
    }

    fn withdraw_artificial(&mut self, artificial: &Variable, fresh: &[Variable]) {
        if self.rows.swap_remove(artificial).is_none() {
            self.strike(artificial);
        }
        for var in fresh {
            self.parametric.swap_remove(var);
        }
    }

    /// Remove a variable from every row, fixing it at zero.
    fn strike(&mut self, var: &Variable) {
        for row in self.rows.values_mut() {
            row.remove_variable(var);
        }
        self.parametric.swap_remove(var);
    }

    /// Rewrite `objective` over parametric variables only.
    fn reduce<T: Coefficient>(&self, objective: &mut Expression<T>) {
        for var in objective.variables() {
            if let Some(row) = self.rows.get(&var) {
                objective.substitute(&var, row);
            }
        }
    }

    /// Minimise `objective` with the primal simplex, starting from the
    /// current (feasible) basis.
    ///
    /// The entering variable is the lowest-id one with a negative objective
    /// coefficient; the exiting row passes the minimum-ratio test, ties going
    /// to the lowest id.
    pub fn optimize<T: Coefficient>(
        &mut self,
        objective: &mut Expression<T>,
    ) -> Result<(), SolverError> {
        self.reduce(objective);
        loop {
            let entering = objective
                .terms()
                .filter(|(_, c)| c.is_negative())
                .map(|(var, _)| var)
                .min()
                .cloned();
            let Some(entering) = entering else {
                return Ok(());
            };

            let mut best: Option<(f64, &Variable)> = None;
            for (basic, row) in &self.rows {
                let c = row.coefficient(&entering);
                if c >= -EPSILON {
                    continue;
                }
                let ratio = -row.constant() / c;
                let better = match best {
                    None => true,
                    Some((r, b)) => ratio < r - EPSILON || (approx_eq(ratio, r) && basic < b),
                };
                if better {
                    best = Some((ratio, basic));
                }
            }

            let Some((_, exiting)) = best else {
                debug!(entering = %entering, "objective is unbounded");
                return Err(SolverError::Unbounded);
            };
            let exiting = exiting.clone();
            self.pivot(&entering, &exiting, objective)?;
        }
    }

    /// Swap `exiting` (basic) for `entering` (parametric in its row).
    pub fn pivot<T: Coefficient>(
        &mut self,
        entering: &Variable,
        exiting: &Variable,
        objective: &mut Expression<T>,
    ) -> Result<(), SolverError> {
        let invalid = || SolverError::InvalidPivot {
            entering: entering.name().to_string(),
            exiting: exiting.name().to_string(),
        };
        if entering == exiting {
            return Err(invalid());
        }
        let Some(mut row) = self.rows.swap_remove(exiting) else {
            return Err(invalid());
        };
        let Some(coefficient) = row.remove_variable(entering) else {
            self.rows.insert(exiting.clone(), row);
            return Err(invalid());
        };

        row.add_variable(exiting.clone(), -1.0);
        row.scale(-1.0 / coefficient);

        objective.substitute(entering, &row);
        for other in self.rows.values_mut() {
            other.substitute(entering, &row);
        }

        self.parametric.swap_remove(entering);
        self.parametric.insert(exiting.clone());
        trace!(entering = %entering, exiting = %exiting, "pivot");
        self.rows.insert(entering.clone(), row);
        Ok(())
    }

    /// Phase 2: minimise the error objective. No-op when already solved.
    pub fn solve(&mut self) -> Result<(), SolverError> {
        if self.pending_edits {
            self.finish_updates()?;
        }
        if self.solved {
            return Ok(());
        }
        debug!(rows = self.rows.len(), "solving");
        let mut objective = mem::take(&mut self.error_objective);
        let outcome = self.optimize(&mut objective);
        self.error_objective = objective;
        outcome?;
        self.solved = true;
        Ok(())
    }

    /// Dual simplex: restore feasibility after edits while keeping the
    /// error objective optimal.
    pub fn resolve(&mut self) -> Result<(), SolverError> {
        debug!("resolving");
        let mut objective = mem::take(&mut self.error_objective);
        let outcome = self.dual_optimize(&mut objective);
        self.error_objective = objective;
        outcome
    }

    fn dual_optimize(
        &mut self,
        objective: &mut Expression<SymbolicWeight>,
    ) -> Result<(), SolverError> {
        self.reduce(objective);
        loop {
            let exiting = self
                .rows
                .iter()
                .filter(|(_, row)| row.constant() < -EPSILON)
                .map(|(basic, _)| basic)
                .min()
                .cloned();
            let Some(exiting) = exiting else {
                return Ok(());
            };

            let mut best: Option<(SymbolicWeight, &Variable)> = None;
            if let Some(row) = self.rows.get(&exiting) {
                for (var, a) in row.terms() {
                    if *a <= EPSILON {
                        continue;
                    }
                    let ratio = objective.coefficient(var).scaled(1.0 / *a);
                    let better = match &best {
                        None => true,
                        Some((r, b)) => ratio < *r || (ratio == *r && var < *b),
                    };
                    if better {
                        best = Some((ratio, var));
                    }
                }
            }

            let Some((_, entering)) = best else {
                debug!(exiting = %exiting, "no entering variable for infeasible row");
                return Err(SolverError::Unsolvable);
            };
            let entering = entering.clone();
            self.pivot(&entering, &exiting, objective)?;
        }
    }

    /// Move the edit variable `var` to `value`.
    ///
    /// Edits the most recent optional equality pinning `var`. The change is
    /// applied to row constants only; call
    /// [`finish_updates`](Self::finish_updates) after a batch of edits.
    pub fn update_constraint(&mut self, var: &Variable, value: f64) -> Result<(), SolverError> {
        let handle = self
            .edit_targets
            .get(var)
            .cloned()
            .ok_or_else(|| SolverError::UnknownEditVariable {
                name: var.name().to_string(),
            })?;
        self.update_edit(&handle, value)
    }

    /// Move the edit constraint whose plus error variable is `handle`.
    ///
    /// Unlike [`update_constraint`](Self::update_constraint) this keeps
    /// addressing the same constraint after later pins on the variable.
    pub fn update_edit(&mut self, handle: &Variable, value: f64) -> Result<(), SolverError> {
        let record = self
            .edits
            .get(handle)
            .cloned()
            .ok_or_else(|| SolverError::UnknownEditVariable {
                name: handle.name().to_string(),
            })?;

        // Edits assume an optimal basis; only the first one of a batch may
        // need to solve.
        if !self.pending_edits && !self.solved {
            self.solve()?;
        }

        let delta = -record.coefficient * (value - record.original_value);
        let shifts: Vec<(Variable, f64)> = if self.rows.contains_key(&record.plus_error) {
            vec![(record.plus_error.clone(), delta)]
        } else if self.rows.contains_key(&record.minus_error) {
            vec![(record.minus_error.clone(), -delta)]
        } else {
            self.rows
                .iter()
                .filter_map(|(basic, row)| {
                    let c = row.coefficient(&record.plus_error);
                    (c != 0.0).then(|| (basic.clone(), -c * delta))
                })
                .collect()
        };
        // The objective is reduced, so its constant moves with every basic
        // error variable's row.
        for (basic, shift) in shifts {
            if let Some(row) = self.rows.get_mut(&basic) {
                row.add_constant(shift);
            }
            if let Some(weight) = self.error_weights.get(&basic) {
                self.error_objective.add_constant(*weight * shift);
            }
        }
        debug!(edit = %handle, from = record.original_value, to = value, "edit");

        if let Some(record) = self.edits.get_mut(handle) {
            record.original_value = value;
        }
        self.solved = false;
        self.pending_edits = true;
        Ok(())
    }

    /// Edit the constraint's left-hand variable.
    pub fn update(&mut self, constraint: &Constraint, value: f64) -> Result<(), SolverError> {
        let var = constraint.left_variable()?.clone();
        self.update_constraint(&var, value)
    }

    /// Re-solve after a batch of edits.
    pub fn finish_updates(&mut self) -> Result<(), SolverError> {
        self.pending_edits = false;
        if self.rows.values().any(|row| row.constant() < -EPSILON) {
            self.resolve()?;
        }
        Ok(())
    }

    /// Value of `var`, solving first if needed. `None` when the variable was
    /// never part of a constraint.
    pub fn get_result(&mut self, var: &Variable) -> Result<Option<f64>, SolverError> {
        self.solve()?;
        if let Some(row) = self.rows.get(var) {
            return Ok(Some(row.constant()));
        }
        if self.parametric.contains(var) {
            return Ok(Some(0.0));
        }
        Ok(None)
    }

    pub fn get_result_or_default(&mut self, var: &Variable, default: f64) -> Result<f64, SolverError> {
        Ok(self.get_result(var)?.unwrap_or(default))
    }

    /// Forget every constraint. The allocator keeps counting, so variables
    /// handed out earlier never collide with new ones.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.parametric.clear();
        self.error_objective.reset();
        self.error_weights.clear();
        self.edits.clear();
        self.edit_targets.clear();
        self.added_expressions = 0;
        self.artificial_count = 0;
        self.solved = true;
        self.pending_edits = false;
    }

    /// True when `var` is basic or parametric.
    pub fn contains(&self, var: &Variable) -> bool {
        self.rows.contains_key(var) || self.parametric.contains(var)
    }

    pub fn is_basic(&self, var: &Variable) -> bool {
        self.rows.contains_key(var)
    }

    pub fn is_parametric(&self, var: &Variable) -> bool {
        self.parametric.contains(var)
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Each edited variable with its most recent record.
    pub fn edit_variables(&self) -> impl Iterator<Item = (&Variable, &EditRecord)> {
        self.edit_targets
            .iter()
            .filter_map(|(var, handle)| self.edits.get(handle).map(|record| (var, record)))
    }

    pub fn edit_record(&self, var: &Variable) -> Option<&EditRecord> {
        self.edit_targets.get(var).and_then(|handle| self.edits.get(handle))
    }

    pub fn error_objective(&self) -> &Expression<SymbolicWeight> {
        &self.error_objective
    }
}

impl fmt::Display for Tableau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Objective: {}", self.error_objective)?;
        let mut rows: Vec<_> = self.rows.iter().collect();
        rows.sort_by(|a, b| a.0.cmp(b.0));
        for (basic, row) in rows {
            writeln!(f, "{} = {}", basic.name(), row)?;
        }
        for (var, record) in self.edit_variables() {
            writeln!(
                f,
                "edit {}: {} ({}, {})",
                var.name(),
                record.original_value,
                record.plus_error.name(),
                record.minus_error.name()
            )?;
        }
        Ok(())
    }
}
