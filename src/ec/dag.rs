//! Linear Dependency Graph
//!
//! A decode or encode plan is a set of linear-combination nodes
//! `target = Σ coef_i · source_i` over GF(2^8). Nodes live in a per-graph
//! arena and are addressed by handle; targets at or above `n` are virtual
//! symbols that exist only inside the graph that created them.
//!
//! Nodes can be bound into a co-scheduled unit. Lowering turns every unit
//! into one [`ComputeTask`], so bound nodes sharing their sources are
//! computed by a single multiply pass.

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::Serialize;

use crate::ec::matrix::Matrix;
use crate::error::{Error, Result};

/// One linear combination node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinearNode {
    /// Block (or virtual symbol) produced by this node
    pub target: usize,
    /// Ordered source indices
    pub sources: Vec<usize>,
    /// Coefficient per source
    pub coefficients: Vec<u8>,
}

/// A flat unit of work for the executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputeTask {
    /// Indices written by this task, one per coefficient row
    pub targets: Vec<usize>,
    /// Indices read by this task, one per coefficient column
    pub children: Vec<usize>,
    /// `targets.len() x children.len()` coefficient matrix
    pub coefficients: Matrix,
}

/// Dependency graph of linear combination nodes
#[derive(Debug, Clone, Default, Serialize)]
pub struct EcDag {
    nodes: Vec<LinearNode>,
    bindings: Vec<Vec<usize>>,
    #[serde(skip)]
    by_target: HashMap<usize, usize>,
    #[serde(skip)]
    bound: HashMap<usize, usize>,
}

impl EcDag {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the node `target = Σ coefficients[i] · sources[i]`
    pub fn join(&mut self, target: usize, sources: Vec<usize>, coefficients: Vec<u8>) -> Result<()> {
        if sources.is_empty() {
            return Err(Error::Graph(format!("node {} has no sources", target)));
        }
        if sources.len() != coefficients.len() {
            return Err(Error::Graph(format!(
                "node {} has {} sources but {} coefficients",
                target,
                sources.len(),
                coefficients.len()
            )));
        }
        if sources.contains(&target) {
            return Err(Error::Graph(format!("node {} depends on itself", target)));
        }
        if self.by_target.contains_key(&target) {
            return Err(Error::Graph(format!("node {} is already defined", target)));
        }

        self.by_target.insert(target, self.nodes.len());
        self.nodes.push(LinearNode {
            target,
            sources,
            coefficients,
        });
        Ok(())
    }

    /// Bind already-joined targets into one co-scheduled unit
    pub fn bind(&mut self, targets: &[usize]) -> Result<()> {
        if targets.len() < 2 {
            return Ok(());
        }
        let mut handles = Vec::with_capacity(targets.len());
        for t in targets {
            let handle = *self
                .by_target
                .get(t)
                .ok_or_else(|| Error::Graph(format!("cannot bind unknown node {}", t)))?;
            if self.bound.contains_key(t) || handles.contains(&handle) {
                return Err(Error::Graph(format!("node {} is already bound", t)));
            }
            handles.push(handle);
        }

        let binding_id = self.bindings.len();
        for t in targets {
            self.bound.insert(*t, binding_id);
        }
        self.bindings.push(targets.to_vec());
        Ok(())
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no node was joined
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> &[LinearNode] {
        &self.nodes
    }

    /// Look up the node producing `target`
    pub fn node(&self, target: usize) -> Option<&LinearNode> {
        self.by_target.get(&target).map(|&h| &self.nodes[h])
    }

    /// Co-scheduled units declared with [`EcDag::bind`]
    pub fn bindings(&self) -> &[Vec<usize>] {
        &self.bindings
    }

    /// Leaf indices: sources that are never produced inside the graph
    pub fn inputs(&self) -> BTreeSet<usize> {
        self.nodes
            .iter()
            .flat_map(|n| n.sources.iter().copied())
            .filter(|s| !self.by_target.contains_key(s))
            .collect()
    }

    /// Scheduling units in dependency order, each as a list of node handles
    fn scheduled_units(&self) -> Result<Vec<Vec<usize>>> {
        let mut units: Vec<Vec<usize>> = Vec::new();
        let mut unit_of = vec![0usize; self.nodes.len()];
        let mut binding_unit: HashMap<usize, usize> = HashMap::new();

        for (handle, node) in self.nodes.iter().enumerate() {
            let unit = match self.bound.get(&node.target) {
                Some(&binding) => *binding_unit.entry(binding).or_insert_with(|| {
                    units.push(Vec::new());
                    units.len() - 1
                }),
                None => {
                    units.push(Vec::new());
                    units.len() - 1
                }
            };
            units[unit].push(handle);
            unit_of[handle] = unit;
        }

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); units.len()];
        let mut indegree = vec![0usize; units.len()];
        for (unit, handles) in units.iter().enumerate() {
            let mut deps = BTreeSet::new();
            for &h in handles {
                for src in &self.nodes[h].sources {
                    if let Some(&producer) = self.by_target.get(src) {
                        let dep = unit_of[producer];
                        if dep == unit {
                            return Err(Error::Graph(format!(
                                "bound node {} depends on node {} of the same unit",
                                self.nodes[h].target, src
                            )));
                        }
                        deps.insert(dep);
                    }
                }
            }
            indegree[unit] = deps.len();
            for dep in deps {
                dependents[dep].push(unit);
            }
        }

        let mut ready: VecDeque<usize> = (0..units.len()).filter(|&u| indegree[u] == 0).collect();
        let mut order = Vec::with_capacity(units.len());
        while let Some(unit) = ready.pop_front() {
            order.push(unit);
            for &next in &dependents[unit] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    ready.push_back(next);
                }
            }
        }

        if order.len() != units.len() {
            return Err(Error::Graph("dependency cycle detected".to_string()));
        }

        Ok(order.into_iter().map(|u| std::mem::take(&mut units[u])).collect())
    }

    /// Targets in an order where every node follows the nodes it reads
    pub fn topological_order(&self) -> Result<Vec<usize>> {
        Ok(self
            .scheduled_units()?
            .into_iter()
            .flatten()
            .map(|h| self.nodes[h].target)
            .collect())
    }

    /// Lower the graph into flat compute tasks, one per scheduling unit
    pub fn lower(&self) -> Result<Vec<ComputeTask>> {
        let units = self.scheduled_units()?;
        let mut tasks = Vec::with_capacity(units.len());

        for handles in units {
            let mut children: Vec<usize> = Vec::new();
            for &h in &handles {
                for src in &self.nodes[h].sources {
                    if !children.contains(src) {
                        children.push(*src);
                    }
                }
            }

            let mut coefficients = Matrix::zeros(handles.len(), children.len());
            for (row, &h) in handles.iter().enumerate() {
                let node = &self.nodes[h];
                for (src, &coef) in node.sources.iter().zip(&node.coefficients) {
                    if let Some(col) = children.iter().position(|c| c == src) {
                        coefficients[(row, col)] ^= coef;
                    }
                }
            }

            tasks.push(ComputeTask {
                targets: handles.iter().map(|&h| self.nodes[h].target).collect(),
                children,
                coefficients,
            });
        }

        Ok(tasks)
    }
}

// =============================================================================
// Tests
// =============================================================================
