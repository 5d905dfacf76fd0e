//! Arena factor graph: variables and factors live in two flat vectors and
//! reference each other by dense integer index. No pointer cycles.

/// A discrete variable with a finite state domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Var {
    pub states: usize,
}

impl Var {
    pub fn new(states: usize) -> Self {
        Self { states }
    }
}

/// A factor over one or two variables. The value table is flattened
/// row-major over the joint domain: for a pairwise factor over (a, b) with
/// domain sizes (Ka, Kb), entry (i, j) sits at `i * Kb + j`, so the
/// same-state diagonal of a K x K factor is `k * (K + 1)`.
#[derive(Debug, Clone)]
pub struct Factor {
    vars: Vec<usize>,
    values: Vec<f64>,
}

impl Factor {
    pub fn unary(var: usize, values: Vec<f64>) -> Self {
        Self { vars: vec![var], values }
    }

    /// A zero-initialised pairwise factor; entries are filled with `set`.
    pub fn pairwise_zeroed(a: usize, b: usize, states_a: usize, states_b: usize) -> Self {
        Self {
            vars: vec![a, b],
            values: vec![0.0; states_a * states_b],
        }
    }

    pub fn vars(&self) -> &[usize] {
        &self.vars
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn set(&mut self, idx: usize, value: f64) {
        self.values[idx] = value;
    }
}

/// Joint model over all variables: the factor collection plus the
/// variable-to-factor adjacency derived from it.
#[derive(Debug, Clone)]
pub struct FactorGraph {
    vars: Vec<Var>,
    factors: Vec<Factor>,
    var_factors: Vec<Vec<usize>>,
}

impl FactorGraph {
    pub fn new(vars: Vec<Var>, factors: Vec<Factor>) -> Self {
        let mut var_factors = vec![Vec::new(); vars.len()];
        for (f, factor) in factors.iter().enumerate() {
            for &v in factor.vars() {
                var_factors[v].push(f);
            }
        }
        Self { vars, factors, var_factors }
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn num_factors(&self) -> usize {
        self.factors.len()
    }

    pub fn var(&self, v: usize) -> Var {
        self.vars[v]
    }

    pub fn factor(&self, f: usize) -> &Factor {
        &self.factors[f]
    }

    /// Indices of the factors adjacent to a variable.
    pub fn factors_of(&self, v: usize) -> &[usize] {
        &self.var_factors[v]
    }
}
