//! Graph Executor
//!
//! Evaluates lowered compute tasks over in-memory block buffers. Physical
//! blocks (index `< n`) are read from and written to [`StripeBuffers`];
//! virtual symbols get scratch buffers that live only for one run.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, instrument, trace};

use crate::ec::dag::{ComputeTask, EcDag};
use crate::ec::galois::multiply_accumulate;
use crate::error::{Error, Result};

/// Equally sized block buffers of one stripe, keyed by block index
#[derive(Debug, Clone, Default)]
pub struct StripeBuffers {
    block_size: usize,
    blocks: BTreeMap<usize, Vec<u8>>,
}

impl StripeBuffers {
    /// Create an empty buffer set for blocks of `block_size` bytes
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            blocks: BTreeMap::new(),
        }
    }

    /// Block size in bytes
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Insert (or replace) a block
    pub fn insert(&mut self, index: usize, data: Vec<u8>) -> Result<()> {
        if data.len() != self.block_size {
            return Err(Error::BufferSizeMismatch {
                expected: self.block_size,
                actual: data.len(),
            });
        }
        self.blocks.insert(index, data);
        Ok(())
    }

    /// Borrow a block
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.blocks.get(&index).map(Vec::as_slice)
    }

    /// Remove a block, returning its contents
    pub fn remove(&mut self, index: usize) -> Option<Vec<u8>> {
        self.blocks.remove(&index)
    }

    /// Whether a block is present
    pub fn contains(&self, index: usize) -> bool {
        self.blocks.contains_key(&index)
    }

    /// Indices of the present blocks, ascending
    pub fn indices(&self) -> Vec<usize> {
        self.blocks.keys().copied().collect()
    }

    /// Number of present blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True when no block is present
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Lower a graph and evaluate it against `buffers`.
///
/// `n` is the number of physical blocks; targets at or above it are treated
/// as virtual symbols and discarded once the run finishes.
pub fn execute_graph(graph: &EcDag, buffers: &mut StripeBuffers, n: usize) -> Result<()> {
    let tasks = graph.lower()?;
    execute_tasks(&tasks, buffers, n)
}

/// Evaluate already-lowered tasks in order
#[instrument(skip(tasks, buffers), fields(tasks = tasks.len(), block_size = buffers.block_size()))]
pub fn execute_tasks(tasks: &[ComputeTask], buffers: &mut StripeBuffers, n: usize) -> Result<()> {
    let mut scratch: HashMap<usize, Vec<u8>> = HashMap::new();

    for task in tasks {
        let mut outputs = vec![Vec::with_capacity(buffers.block_size()); task.targets.len()];
        {
            let mut inputs: Vec<&[u8]> = Vec::with_capacity(task.children.len());
            for &child in &task.children {
                let buf = if child < n {
                    buffers.get(child)
                } else {
                    scratch.get(&child).map(Vec::as_slice)
                };
                inputs.push(buf.ok_or(Error::MissingBlock { index: child })?);
            }
            multiply_accumulate(&mut outputs, &inputs, &task.coefficients)?;
        }

        trace!(targets = ?task.targets, children = ?task.children, "executed task");

        for (&target, data) in task.targets.iter().zip(outputs) {
            if target < n {
                buffers.insert(target, data)?;
            } else {
                scratch.insert(target, data);
            }
        }
    }

    debug!(virtual_symbols = scratch.len(), "graph execution complete");
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
