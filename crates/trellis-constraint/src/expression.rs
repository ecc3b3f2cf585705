//! Linear expressions: `constant + Σ(coefficient × variable)`.
//!
//! Expressions are generic over the coefficient type. Tableau rows use plain
//! `f64` coefficients; the error objective uses [`SymbolicWeight`]
//! coefficients so that strengths compare lexicographically. Both satisfy
//! [`Coefficient`].

use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::variable::Variable;
use crate::weight::SymbolicWeight;
use crate::{approx_eq, near_zero, EPSILON};

/// Arithmetic a coefficient type must support to live inside an [`Expression`].
pub trait Coefficient:
    Clone
    + fmt::Debug
    + fmt::Display
    + Add<Output = Self>
    + Sub<Output = Self>
    + AddAssign
    + SubAssign
    + Neg<Output = Self>
{
    fn zero() -> Self;

    fn one() -> Self;

    /// Multiply by a scalar.
    fn scaled(&self, factor: f64) -> Self;

    /// Within epsilon of zero.
    fn approx_zero(&self) -> bool;

    fn approx_eq(&self, other: &Self) -> bool;

    /// Strictly below zero, beyond epsilon.
    fn is_negative(&self) -> bool;
}

impl Coefficient for f64 {
    fn zero() -> Self {
        0.0
    }

    fn one() -> Self {
        1.0
    }

    fn scaled(&self, factor: f64) -> Self {
        self * factor
    }

    fn approx_zero(&self) -> bool {
        near_zero(*self)
    }

    fn approx_eq(&self, other: &Self) -> bool {
        approx_eq(*self, *other)
    }

    fn is_negative(&self) -> bool {
        *self < -EPSILON
    }
}

/// A linear expression over [`Variable`]s.
///
/// No term ever holds a coefficient within epsilon of zero; such terms are
/// dropped as soon as a mutation produces them.
#[derive(Debug, Clone)]
pub struct Expression<T: Coefficient = f64> {
    terms: IndexMap<Variable, T>,
    constant: T,
}

impl<T: Coefficient> Default for Expression<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Coefficient> Expression<T> {
    /// The zero expression.
    pub fn new() -> Self {
        Self {
            terms: IndexMap::new(),
            constant: T::zero(),
        }
    }

    /// Create a constant expression.
    pub fn from_constant(value: T) -> Self {
        Self {
            terms: IndexMap::new(),
            constant: value,
        }
    }

    /// Create an expression from a single variable with unit coefficient.
    pub fn from_variable(var: Variable) -> Self {
        let mut expr = Self::new();
        expr.add_variable(var, T::one());
        expr
    }

    /// Add `coefficient × var`, merging with an existing term.
    pub fn add_variable(&mut self, var: Variable, coefficient: T) {
        match self.terms.entry(var) {
            Entry::Occupied(mut entry) => {
                *entry.get_mut() += coefficient;
                if entry.get().approx_zero() {
                    entry.swap_remove();
                }
            }
            Entry::Vacant(entry) => {
                if !coefficient.approx_zero() {
                    entry.insert(coefficient);
                }
            }
        }
    }

    pub fn add_constant(&mut self, value: T) {
        self.constant += value;
    }

    /// Add `multiplier × other` to this expression.
    pub fn add_expression(&mut self, other: &Expression<T>, multiplier: f64) {
        self.constant += other.constant.scaled(multiplier);
        for (var, coefficient) in &other.terms {
            self.add_variable(var.clone(), coefficient.scaled(multiplier));
        }
    }

    /// Multiply every coefficient and the constant by a scalar.
    pub fn scale(&mut self, factor: f64) {
        self.constant = self.constant.scaled(factor);
        for coefficient in self.terms.values_mut() {
            *coefficient = coefficient.scaled(factor);
        }
        self.terms.retain(|_, c| !c.approx_zero());
    }

    pub fn negate(&mut self) {
        self.scale(-1.0);
    }

    /// Coefficient of `var`, zero when absent.
    pub fn coefficient(&self, var: &Variable) -> T {
        self.terms.get(var).cloned().unwrap_or_else(T::zero)
    }

    pub fn contains(&self, var: &Variable) -> bool {
        self.terms.contains_key(var)
    }

    /// Drop the term for `var`, returning its coefficient.
    pub fn remove_variable(&mut self, var: &Variable) -> Option<T> {
        self.terms.swap_remove(var)
    }

    /// Every variable with a term in this expression. Order carries no meaning.
    pub fn variables(&self) -> Vec<Variable> {
        self.terms.keys().cloned().collect()
    }

    /// Slack and error variables with a term in this expression.
    pub fn slack_variables(&self) -> Vec<Variable> {
        self.terms
            .keys()
            .filter(|v| v.is_pivotable())
            .cloned()
            .collect()
    }

    pub fn terms(&self) -> impl Iterator<Item = (&Variable, &T)> {
        self.terms.iter()
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// True when the expression has no variable terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn constant(&self) -> T {
        self.constant.clone()
    }

    pub fn set_constant(&mut self, value: T) {
        self.constant = value;
    }

    /// Replace `var` with `replacement`.
    ///
    /// If `var` has coefficient `c` here, its term is removed and
    /// `c × replacement` is added in its place.
    pub fn substitute(&mut self, var: &Variable, replacement: &Expression<f64>) -> &mut Self {
        if let Some(coefficient) = self.terms.swap_remove(var) {
            self.constant += coefficient.scaled(replacement.constant);
            for (v, c) in &replacement.terms {
                self.add_variable(v.clone(), coefficient.scaled(*c));
            }
        }
        self
    }

    /// Clear all terms and the constant.
    pub fn reset(&mut self) {
        self.terms.clear();
        self.constant = T::zero();
    }
}

impl Expression<f64> {
    /// Lift a scalar expression into a weighted one: every coefficient and
    /// the constant become `weight × value`.
    pub fn weighted(&self, weight: &SymbolicWeight) -> Expression<SymbolicWeight> {
        let mut out = Expression::from_constant(weight.scaled(self.constant));
        for (var, c) in &self.terms {
            out.add_variable(var.clone(), weight.scaled(*c));
        }
        out
    }
}

impl<T: Coefficient> PartialEq for Expression<T> {
    fn eq(&self, other: &Self) -> bool {
        if !self.constant.approx_eq(&other.constant) || self.terms.len() != other.terms.len() {
            return false;
        }
        self.terms.iter().all(|(var, c)| {
            other
                .terms
                .get(var)
                .map(|oc| oc.approx_eq(c))
                .unwrap_or(false)
        })
    }
}

impl From<Variable> for Expression {
    fn from(var: Variable) -> Self {
        Expression::from_variable(var)
    }
}

impl From<&Variable> for Expression {
    fn from(var: &Variable) -> Self {
        Expression::from_variable(var.clone())
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Expression::from_constant(value)
    }
}

impl<T: Coefficient> fmt::Display for Expression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (var, c) in &self.terms {
            write!(f, "{}{} + ", c, var.name())?;
        }
        write!(f, "{}", self.constant)
    }
}

// Expression ⊕ Expression

impl<T: Coefficient> AddAssign<&Expression<T>> for Expression<T> {
    fn add_assign(&mut self, rhs: &Expression<T>) {
        self.add_expression(rhs, 1.0);
    }
}

impl<T: Coefficient> AddAssign for Expression<T> {
    fn add_assign(&mut self, rhs: Expression<T>) {
        self.add_expression(&rhs, 1.0);
    }
}

impl<T: Coefficient> SubAssign<&Expression<T>> for Expression<T> {
    fn sub_assign(&mut self, rhs: &Expression<T>) {
        self.add_expression(rhs, -1.0);
    }
}

impl<T: Coefficient> SubAssign for Expression<T> {
    fn sub_assign(&mut self, rhs: Expression<T>) {
        self.add_expression(&rhs, -1.0);
    }
}

impl<T: Coefficient> Add for Expression<T> {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += &rhs;
        self
    }
}

impl<T: Coefficient> Sub for Expression<T> {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self {
        self -= &rhs;
        self
    }
}

impl<T: Coefficient> Neg for Expression<T> {
    type Output = Self;

    fn neg(mut self) -> Self {
        self.negate();
        self
    }
}

// Expression ⊗ scalar

impl<T: Coefficient> MulAssign<f64> for Expression<T> {
    fn mul_assign(&mut self, rhs: f64) {
        self.scale(rhs);
    }
}

impl<T: Coefficient> Mul<f64> for Expression<T> {
    type Output = Self;

    fn mul(mut self, rhs: f64) -> Self {
        self.scale(rhs);
        self
    }
}

impl Mul<Expression> for f64 {
    type Output = Expression;

    fn mul(self, rhs: Expression) -> Expression {
        rhs * self
    }
}

// Expression ⊕ constant

impl<T: Coefficient> AddAssign<f64> for Expression<T> {
    fn add_assign(&mut self, rhs: f64) {
        self.constant += T::one().scaled(rhs);
    }
}

impl<T: Coefficient> SubAssign<f64> for Expression<T> {
    fn sub_assign(&mut self, rhs: f64) {
        self.constant -= T::one().scaled(rhs);
    }
}

impl<T: Coefficient> Add<f64> for Expression<T> {
    type Output = Self;

    fn add(mut self, rhs: f64) -> Self {
        self += rhs;
        self
    }
}

impl<T: Coefficient> Sub<f64> for Expression<T> {
    type Output = Self;

    fn sub(mut self, rhs: f64) -> Self {
        self -= rhs;
        self
    }
}

// Expression ⊕ Variable

impl<T: Coefficient> AddAssign<Variable> for Expression<T> {
    fn add_assign(&mut self, rhs: Variable) {
        self.add_variable(rhs, T::one());
    }
}

impl<T: Coefficient> AddAssign<&Variable> for Expression<T> {
    fn add_assign(&mut self, rhs: &Variable) {
        self.add_variable(rhs.clone(), T::one());
    }
}

impl<T: Coefficient> SubAssign<Variable> for Expression<T> {
    fn sub_assign(&mut self, rhs: Variable) {
        self.add_variable(rhs, -T::one());
    }
}

impl<T: Coefficient> SubAssign<&Variable> for Expression<T> {
    fn sub_assign(&mut self, rhs: &Variable) {
        self.add_variable(rhs.clone(), -T::one());
    }
}

impl<T: Coefficient> Add<Variable> for Expression<T> {
    type Output = Self;

    fn add(mut self, rhs: Variable) -> Self {
        self += rhs;
        self
    }
}

impl<T: Coefficient> Add<&Variable> for Expression<T> {
    type Output = Self;

    fn add(mut self, rhs: &Variable) -> Self {
        self += rhs;
        self
    }
}

impl<T: Coefficient> Sub<Variable> for Expression<T> {
    type Output = Self;

    fn sub(mut self, rhs: Variable) -> Self {
        self -= rhs;
        self
    }
}

impl<T: Coefficient> Sub<&Variable> for Expression<T> {
    type Output = Self;

    fn sub(mut self, rhs: &Variable) -> Self {
        self -= rhs;
        self
    }
}

// Variable arithmetic, for both owned and borrowed variables. Every form
// builds a scalar expression.
macro_rules! variable_ops {
    ($($ty:ty),*) => {$(
        impl Add<f64> for $ty {
            type Output = Expression;

            fn add(self, rhs: f64) -> Expression {
                <Expression>::from(self) + rhs
            }
        }

        impl Sub<f64> for $ty {
            type Output = Expression;

            fn sub(self, rhs: f64) -> Expression {
                <Expression>::from(self) - rhs
            }
        }

        impl Mul<f64> for $ty {
            type Output = Expression;

            fn mul(self, rhs: f64) -> Expression {
                <Expression>::from(self) * rhs
            }
        }

        impl Mul<$ty> for f64 {
            type Output = Expression;

            fn mul(self, rhs: $ty) -> Expression {
                <Expression>::from(rhs) * self
            }
        }

        impl Neg for $ty {
            type Output = Expression;

            fn neg(self) -> Expression {
                -<Expression>::from(self)
            }
        }

        impl Add<Variable> for $ty {
            type Output = Expression;

            fn add(self, rhs: Variable) -> Expression {
                <Expression>::from(self) + rhs
            }
        }

        impl Add<&Variable> for $ty {
            type Output = Expression;

            fn add(self, rhs: &Variable) -> Expression {
                <Expression>::from(self) + rhs
            }
        }

        impl Sub<Variable> for $ty {
            type Output = Expression;

            fn sub(self, rhs: Variable) -> Expression {
                <Expression>::from(self) - rhs
            }
        }

        impl Sub<&Variable> for $ty {
            type Output = Expression;

            fn sub(self, rhs: &Variable) -> Expression {
                <Expression>::from(self) - rhs
            }
        }

        impl Add<Expression> for $ty {
            type Output = Expression;

            fn add(self, rhs: Expression) -> Expression {
                <Expression>::from(self) + rhs
            }
        }

        impl Sub<Expression> for $ty {
            type Output = Expression;

            fn sub(self, rhs: Expression) -> Expression {
                <Expression>::from(self) - rhs
            }
        }
    )*};
}

variable_ops!(Variable, &Variable);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::{VariableAllocator, VariableKind};

    fn vars() -> (Variable, Variable, Variable) {
        let mut alloc = VariableAllocator::new();
        (alloc.normal("x"), alloc.normal("y"), alloc.normal("z"))
    }

    #[test]
    fn test_arithmetic_merges_terms() {
        let (x, y, z) = vars();
        let mut e = 6.0 * &x + &y + 3.0 * &z + 7.0;
        let other = 9.0 * &z + -2.0 * &y;
        e += other;
        e += &y;
        e += &y;
        let doubled = e.clone();
        e += doubled;
        let mut e = 3.0 * e;
        e.remove_variable(&y);

        assert_eq!(e.coefficient(&x), 36.0);
        assert_eq!(e.coefficient(&z), 72.0);
        assert!(!e.contains(&y));
        assert_eq!(e.constant(), 42.0);
    }

    #[test]
    fn test_zero_terms_are_cleared() {
        let (x, y, _) = vars();
        let mut e = &x + &y;
        e -= &x;
        assert!(!e.contains(&x));
        assert_eq!(e.len(), 1);

        e.add_variable(y.clone(), -1.0 + 1e-9);
        assert!(e.is_empty());
    }

    #[test]
    fn test_substitute() {
        let (x, y, z) = vars();
        // e1 = -2x - y, x := -2y + z + 3  =>  e1 = 3y - 2z - 6
        let mut e1 = -2.0 * &x - &y;
        let e2 = -2.0 * &y + &z + 3.0;
        e1.substitute(&x, &e2);

        assert!(!e1.contains(&x));
        assert_eq!(e1.coefficient(&y), 3.0);
        assert_eq!(e1.coefficient(&z), -2.0);
        assert_eq!(e1.constant(), -6.0);
    }

    #[test]
    fn test_substitute_absent_variable_is_noop() {
        let (x, y, z) = vars();
        let mut e = &y + 1.0;
        let before = e.clone();
        e.substitute(&x, &Expression::from(&z));
        assert_eq!(e, before);
    }

    #[test]
    fn test_behavioral_equality() {
        let (x, y, z) = vars();
        let e = Expression::from(&x);
        let mut e2 = 2.5 * &x + 51.6 * &y;
        let em = 0.5 * &x + 17.2 * &y;
        e2 -= &em;
        e2 -= &em;
        e2 -= &em;
        assert_eq!(e, e2);
        assert_ne!(&x + &z, e);
        assert_ne!(Expression::from(&x) + 1.0, e);
    }

    #[test]
    fn test_slack_variables_filter() {
        let mut alloc = VariableAllocator::new();
        let x = alloc.normal("x");
        let s = alloc.allocate(VariableKind::Slack, "s1");
        let e = alloc.allocate(VariableKind::Error, "em1");
        let a = alloc.allocate(VariableKind::Artificial, "a1");
        let mut expr = Expression::from(&x);
        expr.add_variable(s.clone(), -1.0);
        expr.add_variable(e.clone(), 1.0);
        expr.add_variable(a, 1.0);

        let mut slack = expr.slack_variables();
        slack.sort();
        assert_eq!(slack, vec![s, e]);
        assert_eq!(expr.variables().len(), 4);
    }

    #[test]
    fn test_symbolic_expressions() {
        let (x, y, z) = vars();
        let a: Expression<SymbolicWeight> = Expression::from_variable(x.clone());
        let b: Expression<SymbolicWeight> = Expression::from_variable(x.clone());
        assert_eq!(a, b);

        let sum = a + b;
        let mut expected = Expression::new();
        expected.add_variable(x.clone(), SymbolicWeight::splat(2.0));
        assert_eq!(sum, expected);

        let mut cancel: Expression<SymbolicWeight> = Expression::new();
        cancel.add_variable(x.clone(), SymbolicWeight::from([1.7, 33.7541, 0.0, 0.0, 0.0]));
        cancel.add_variable(x.clone(), SymbolicWeight::from([-1.7, -33.7541, 0.0, 0.0, 0.0]));
        assert!(cancel.is_empty());

        cancel += 1.5;
        cancel += &x;
        // x := y + 3z
        let replacement = &y + 3.0 * &z;
        cancel.substitute(&x, &replacement);
        assert_eq!(cancel.coefficient(&y), SymbolicWeight::splat(1.0));
        assert_eq!(cancel.coefficient(&z), SymbolicWeight::splat(3.0));
        assert_eq!(cancel.constant(), SymbolicWeight::splat(1.5));
    }

    #[test]
    fn test_weighted_lift() {
        let (x, _, _) = vars();
        let w = SymbolicWeight::from([1.0, 2.0, 0.0, 0.0, 0.0]);
        let lifted = (2.0 * &x + 1.5).weighted(&w);
        assert_eq!(lifted.coefficient(&x), SymbolicWeight::from([2.0, 4.0, 0.0, 0.0, 0.0]));
        assert_eq!(lifted.constant(), SymbolicWeight::from([1.5, 3.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_reset_and_display() {
        let (x, _, _) = vars();
        let mut e = 3.0 * &x + 5.0;
        assert_eq!(e.to_string(), "3x + 5");
        e.reset();
        assert!(e.is_empty());
        assert_eq!(e.constant(), 0.0);
    }
}
