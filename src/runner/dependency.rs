//! Dependency graph and execution leveling.
//!
//! [`DependencyGraph`] holds the name-level relationships between steps and
//! performs validation (unknown references, duplicates, cycles).
//! [`ExecutionGraph`] layers an actual step set into [`ExecutionLevel`]s:
//! a step's level is the length of its longest dependency chain, and steps
//! sharing a level keep the order they were supplied in.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{BootstepError, Result};
use crate::steps::Step;

/// Represents the dependency relationships between steps.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Step names in input order.
    order: Vec<String>,
    /// Map of step name to its direct dependencies, in declaration order.
    dependencies: HashMap<String, Vec<String>>,
    /// Map of step name to steps that depend on it.
    dependents: HashMap<String, HashSet<String>>,
}

impl DependencyGraph {
    /// Create a new dependency graph builder.
    pub fn builder() -> DependencyGraphBuilder {
        DependencyGraphBuilder::new()
    }

    /// Get the direct dependencies of a step.
    pub fn dependencies_of(&self, step: &str) -> Option<&[String]> {
        self.dependencies.get(step).map(Vec::as_slice)
    }

    /// Check if a step exists in the graph.
    pub fn contains(&self, step: &str) -> bool {
        self.dependencies.contains_key(step)
    }

    /// All step names, in the order they were added.
    pub fn steps(&self) -> &[String] {
        &self.order
    }

    /// Get the number of steps in the graph.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Find a cycle in the graph, returning the path if one exists.
    ///
    /// The search visits steps in input order, so the reported cycle is
    /// deterministic. A self-dependency is reported as `[a, a]`.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Unvisited,
            Visiting,
            Visited,
        }

        fn dfs<'a>(
            node: &'a str,
            graph: &'a DependencyGraph,
            state: &mut HashMap<&'a str, State>,
            path: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            state.insert(node, State::Visiting);
            path.push(node);

            for dep in graph.dependencies.get(node).into_iter().flatten() {
                match state.get(dep.as_str()) {
                    Some(State::Visiting) => {
                        let start = path.iter().position(|s| *s == dep).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            path[start..].iter().map(|s| s.to_string()).collect();
                        cycle.push(dep.clone());
                        return Some(cycle);
                    }
                    Some(State::Unvisited) => {
                        if let Some(cycle) = dfs(dep, graph, state, path) {
                            return Some(cycle);
                        }
                    }
                    Some(State::Visited) | None => {}
                }
            }

            path.pop();
            state.insert(node, State::Visited);
            None
        }

        let mut state: HashMap<&str, State> = self
            .order
            .iter()
            .map(|s| (s.as_str(), State::Unvisited))
            .collect();
        let mut path = Vec::new();

        for step in &self.order {
            if state.get(step.as_str()) == Some(&State::Unvisited) {
                if let Some(cycle) = dfs(step, self, &mut state, &mut path) {
                    return Some(cycle);
                }
            }
        }

        None
    }

    /// Longest dependency chain length for every step.
    ///
    /// Returns an error if a cycle is detected.
    pub fn step_levels(&self) -> Result<HashMap<String, usize>> {
        if let Some(cycle) = self.find_cycle() {
            return Err(BootstepError::CircularDependency {
                cycle: cycle.join(" -> "),
            });
        }

        fn level_of<'a>(
            node: &'a str,
            graph: &'a DependencyGraph,
            memo: &mut HashMap<&'a str, usize>,
        ) -> usize {
            if let Some(&level) = memo.get(node) {
                return level;
            }
            let level = graph
                .dependencies
                .get(node)
                .into_iter()
                .flatten()
                .map(|dep| level_of(dep, graph, memo) + 1)
                .max()
                .unwrap_or(0);
            memo.insert(node, level);
            level
        }

        let mut memo: HashMap<&str, usize> = HashMap::with_capacity(self.order.len());
        for step in &self.order {
            level_of(step, self, &mut memo);
        }

        Ok(memo
            .into_iter()
            .map(|(name, level)| (name.to_string(), level))
            .collect())
    }

    /// Group step names by level, level 0 first.
    ///
    /// Within a level, names keep their input order.
    pub fn levels(&self) -> Result<Vec<Vec<String>>> {
        let step_levels = self.step_levels()?;
        let depth = step_levels.values().max().map_or(0, |max| max + 1);

        let mut groups: Vec<Vec<String>> = vec![Vec::new(); depth];
        for step in &self.order {
            groups[step_levels[step]].push(step.clone());
        }

        Ok(groups)
    }

    /// Get all transitive dependents of a step, in input order.
    ///
    /// Returns steps that depend on the given step, directly or indirectly.
    pub fn transitive_dependents(&self, step: &str) -> Vec<String> {
        let mut found = HashSet::new();
        let mut to_visit = vec![step];

        while let Some(current) = to_visit.pop() {
            if let Some(dependents) = self.dependents.get(current) {
                for dep in dependents {
                    if found.insert(dep.as_str()) {
                        to_visit.push(dep);
                    }
                }
            }
        }

        self.order
            .iter()
            .filter(|name| found.contains(name.as_str()))
            .cloned()
            .collect()
    }
}

/// Builder for constructing a DependencyGraph.
#[derive(Debug, Default)]
pub struct DependencyGraphBuilder {
    dependencies: IndexMap<String, Vec<String>>,
    duplicates: Vec<String>,
}

impl DependencyGraphBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step with its dependencies.
    pub fn add_step(mut self, name: impl Into<String>, depends_on: Vec<String>) -> Self {
        let name = name.into();
        if self.dependencies.contains_key(&name) {
            self.duplicates.push(name);
            return self;
        }

        let mut deps: Vec<String> = Vec::with_capacity(depends_on.len());
        for dep in depends_on {
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }
        self.dependencies.insert(name, deps);
        self
    }

    /// Build the dependency graph.
    ///
    /// Returns an error if a step name is used twice or any dependency
    /// references a non-existent step. Cycles are reported later, by
    /// [`DependencyGraph::levels`] and [`DependencyGraph::find_cycle`].
    pub fn build(self) -> Result<DependencyGraph> {
        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(BootstepError::DuplicateStep { name });
        }

        for (step, deps) in &self.dependencies {
            for dep in deps {
                if !self.dependencies.contains_key(dep) {
                    return Err(BootstepError::MissingDependency {
                        step: step.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let mut dependents: HashMap<String, HashSet<String>> = self
            .dependencies
            .keys()
            .map(|step| (step.clone(), HashSet::new()))
            .collect();

        for (step, deps) in &self.dependencies {
            for dep in deps {
                if let Some(set) = dependents.get_mut(dep) {
                    set.insert(step.clone());
                }
            }
        }

        let order = self.dependencies.keys().cloned().collect();

        Ok(DependencyGraph {
            order,
            dependencies: self.dependencies.into_iter().collect(),
            dependents,
        })
    }
}

/// A group of mutually independent steps that may run concurrently.
#[derive(Clone)]
pub struct ExecutionLevel {
    index: usize,
    steps: Vec<Arc<dyn Step>>,
}

impl ExecutionLevel {
    /// Position of this level, 0 first.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Steps in this level, in input order.
    pub fn steps(&self) -> &[Arc<dyn Step>] {
        &self.steps
    }

    /// Names of the steps in this level.
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Debug for ExecutionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionLevel")
            .field("index", &self.index)
            .field("steps", &self.names())
            .finish()
    }
}

/// Validated, leveled step set for one run.
#[derive(Clone)]
pub struct ExecutionGraph {
    levels: Vec<ExecutionLevel>,
    step_count: usize,
    graph: DependencyGraph,
}

impl ExecutionGraph {
    /// Validate and level `steps`.
    ///
    /// Fails with `DuplicateStep`, `MissingDependency` or
    /// `CircularDependency`; no partial graph is returned.
    pub fn create(steps: &[Arc<dyn Step>]) -> Result<Self> {
        let graph = steps
            .iter()
            .fold(DependencyGraph::builder(), |builder, step| {
                builder.add_step(step.name(), step.depends_on().to_vec())
            })
            .build()?;

        let step_levels = graph.step_levels()?;
        let depth = step_levels.values().max().map_or(0, |max| max + 1);

        let mut levels: Vec<ExecutionLevel> = (0..depth)
            .map(|index| ExecutionLevel {
                index,
                steps: Vec::new(),
            })
            .collect();
        for step in steps {
            levels[step_levels[step.name()]]
                .steps
                .push(Arc::clone(step));
        }

        Ok(Self {
            levels,
            step_count: steps.len(),
            graph,
        })
    }

    /// Levels in execution order.
    pub fn levels(&self) -> &[ExecutionLevel] {
        &self.levels
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Total number of steps across all levels.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Level a step was assigned to.
    pub fn level_of(&self, step: &str) -> Option<usize> {
        self.levels
            .iter()
            .find(|level| level.steps.iter().any(|s| s.name() == step))
            .map(ExecutionLevel::index)
    }

    /// Step names grouped by level.
    pub fn level_names(&self) -> Vec<Vec<String>> {
        self.levels
            .iter()
            .map(|level| level.names().into_iter().map(str::to_string).collect())
            .collect()
    }

    /// Steps that can never run once `step` has failed.
    pub fn blocked_by(&self, step: &str) -> Vec<String> {
        self.graph.transitive_dependents(step)
    }
}

impl fmt::Debug for ExecutionGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionGraph")
            .field("levels", &self.level_names())
            .field("step_count", &self.step_count)
            .finish()
    }
}
