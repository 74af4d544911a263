//! LP/MILP program container and backend dispatch.
//!
//! Formulations add variables and constraints to a [`LinearProgram`]; solving
//! hands the whole model to one of the `good_lp` backends and returns a tagged
//! [`SolveOutcome`]. Only [`SolveOutcome::Solved`] carries values, so nothing
//! can read a model whose satisfiability was never established.
//!
//! | Backend | Problem class | Feature |
//! |---------|---------------|---------|
//! | microlp | LP + MILP | `solver-microlp` (default) |
//! | clarabel | LP | `solver-clarabel` (default) |
//! | HiGHS | LP + MILP | `solver-highs` |
//!
//! microlp and HiGHS receive the time budget natively; every backend is also
//! checked against it once the solve returns.

use crate::error::{ControlError, SolveStage};
use good_lp::{
    variable, variables, Constraint, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable, VariableDefinition,
};
use shatter_core::{SolverBackend, SolverSettings};
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Minimise,
    Maximise,
}

/// Variable values from a solved model.
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    values: HashMap<Variable, f64>,
}

impl Assignment {
    pub fn value(&self, var: Variable) -> f64 {
        self.values.get(&var).copied().unwrap_or(0.0)
    }
}

/// Tagged result of a solve.
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    Solved(Assignment),
    Infeasible,
    Unbounded,
    Unknown(String),
}

impl SolveOutcome {
    pub fn into_result(self, stage: SolveStage) -> Result<Assignment, ControlError> {
        match self {
            SolveOutcome::Solved(assignment) => Ok(assignment),
            SolveOutcome::Infeasible => Err(ControlError::infeasible(
                stage,
                "no assignment satisfies the constraint system",
            )),
            SolveOutcome::Unbounded => Err(ControlError::Unbounded { stage }),
            SolveOutcome::Unknown(message) => Err(ControlError::Solver { stage, message }),
        }
    }
}

/// Variables and constraints of one model, owned for the duration of a call.
pub struct LinearProgram {
    stage: SolveStage,
    vars: ProblemVariables,
    tracked: Vec<Variable>,
    constraints: Vec<Constraint>,
    integer_vars: usize,
}

impl LinearProgram {
    pub fn new(stage: SolveStage) -> Self {
        Self {
            stage,
            vars: variables!(),
            tracked: Vec::new(),
            constraints: Vec::new(),
            integer_vars: 0,
        }
    }

    pub fn stage(&self) -> SolveStage {
        self.stage
    }

    /// Add a continuous variable.
    pub fn add_var(&mut self, definition: VariableDefinition) -> Variable {
        let var = self.vars.add(definition);
        self.tracked.push(var);
        var
    }

    /// Add an integer variable bounded to `[min, max]`.
    pub fn add_integer(&mut self, min: f64, max: f64) -> Variable {
        self.integer_vars += 1;
        self.add_var(variable().integer().min(min).max(max))
    }

    /// Add a 0/1 indicator variable.
    pub fn add_binary(&mut self) -> Variable {
        self.integer_vars += 1;
        self.add_var(variable().binary())
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn num_variables(&self) -> usize {
        self.tracked.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn has_integers(&self) -> bool {
        self.integer_vars > 0
    }

    /// Solve with `backend` and check the outcome.
    ///
    /// Backends with a native limit stop at `settings.time_limit_seconds`.
    /// The elapsed time is also measured around the backend call; a solve that
    /// runs past the budget is reported as [`ControlError::Timeout`] even if
    /// the backend produced values.
    pub fn solve(
        self,
        sense: Sense,
        objective: Expression,
        backend: SolverBackend,
        settings: &SolverSettings,
    ) -> Result<Assignment, ControlError> {
        let stage = self.stage;
        if self.has_integers() && !backend.supports_integers() {
            return Err(ControlError::UnsupportedBackend {
                backend,
                reason: format!(
                    "{stage} model has {} integer variables; {backend} solves LPs only",
                    self.integer_vars
                ),
            });
        }

        debug!(
            %stage,
            %backend,
            variables = self.num_variables(),
            constraints = self.num_constraints(),
            integers = self.integer_vars,
            "solving model"
        );

        let budget = settings.time_limit();
        let start = Instant::now();
        let outcome = dispatch(self, sense, objective, backend, budget.as_secs_f64())?;
        let elapsed = start.elapsed();

        if elapsed > budget {
            return Err(ControlError::Timeout {
                stage,
                elapsed,
                budget,
            });
        }
        debug!(%stage, ?elapsed, solved = matches!(outcome, SolveOutcome::Solved(_)), "solve finished");
        outcome.into_result(stage)
    }
}

fn dispatch(
    program: LinearProgram,
    sense: Sense,
    objective: Expression,
    backend: SolverBackend,
    time_limit_seconds: f64,
) -> Result<SolveOutcome, ControlError> {
    let LinearProgram {
        vars,
        tracked,
        constraints,
        ..
    } = program;
    let problem = match sense {
        Sense::Minimise => vars.minimise(objective),
        Sense::Maximise => vars.maximise(objective),
    };

    match backend {
        SolverBackend::Microlp => {
            #[cfg(feature = "solver-microlp")]
            {
                use good_lp::WithTimeLimit;
                let model = problem
                    .using(good_lp::solvers::microlp::microlp)
                    .with_time_limit(time_limit_seconds);
                Ok(collect(model, constraints, &tracked))
            }
            #[cfg(not(feature = "solver-microlp"))]
            {
                drop((problem, tracked, constraints));
                Err(not_compiled(backend, "solver-microlp"))
            }
        }
        SolverBackend::Clarabel => {
            #[cfg(feature = "solver-clarabel")]
            {
                let model = problem.using(good_lp::solvers::clarabel::clarabel);
                Ok(collect(model, constraints, &tracked))
            }
            #[cfg(not(feature = "solver-clarabel"))]
            {
                drop((problem, tracked, constraints));
                Err(not_compiled(backend, "solver-clarabel"))
            }
        }
        SolverBackend::Highs => {
            #[cfg(feature = "solver-highs")]
            {
                let model = problem
                    .using(good_lp::solvers::highs::highs)
                    .set_time_limit(time_limit_seconds);
                Ok(collect(model, constraints, &tracked))
            }
            #[cfg(not(feature = "solver-highs"))]
            {
                drop((problem, tracked, constraints));
                Err(not_compiled(backend, "solver-highs"))
            }
        }
    }
}

#[allow(dead_code)]
fn not_compiled(backend: SolverBackend, feature: &str) -> ControlError {
    ControlError::UnsupportedBackend {
        backend,
        reason: format!("rebuild with the `{feature}` feature"),
    }
}

#[allow(dead_code)]
fn collect<M>(mut model: M, constraints: Vec<Constraint>, tracked: &[Variable]) -> SolveOutcome
where
    M: SolverModel<Error = ResolutionError>,
{
    for constraint in constraints {
        model = model.with(constraint);
    }
    match model.solve() {
        Ok(solution) => SolveOutcome::Solved(Assignment {
            values: tracked.iter().map(|&v| (v, solution.value(v))).collect(),
        }),
        Err(ResolutionError::Infeasible) => SolveOutcome::Infeasible,
        Err(ResolutionError::Unbounded) => SolveOutcome::Unbounded,
        Err(other) => SolveOutcome::Unknown(other.to_string()),
    }
}
