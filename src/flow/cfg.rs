//! # Control Flow Graph
//!
//! Partitions a normalized [`Body`] into basic blocks. Every label opens a
//! block, so blocks are contiguous statement ranges and a single forward pass
//! is enough to find them and their edges.

use crate::ast::{Body, Statement};
use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Range;

/// Block identifier. The derived order is Entry, then labels by index, then Exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockId {
    /// Synthetic start block
    Entry,
    /// Block opened by the label with this index
    Label(usize),
    /// Synthetic end block
    Exit,
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockId::Entry => write!(f, "entry"),
            BlockId::Label(index) => write!(f, "block_{}", index),
            BlockId::Exit => write!(f, "exit"),
        }
    }
}

/// A basic block in the control flow graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block ID
    pub id: BlockId,
    /// Predecessor block IDs
    pub predecessors: BTreeSet<BlockId>,
    /// Successor block IDs
    pub successors: BTreeSet<BlockId>,
    /// Statement indices covered by this block
    pub statements: Range<usize>,
}

impl Block {
    fn new(id: BlockId) -> Self {
        Self {
            id,
            predecessors: BTreeSet::new(),
            successors: BTreeSet::new(),
            statements: 0..0,
        }
    }

    /// True if the block holds no statements
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Control Flow Graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFlowGraph {
    blocks: BTreeMap<BlockId, Block>,
    label_count: usize,
}

impl ControlFlowGraph {
    /// Build the CFG of a normalized body
    pub fn compute(body: &Body) -> Result<Self> {
        let mut cfg = ControlFlowGraph {
            blocks: BTreeMap::new(),
            label_count: body.label_count(),
        };

        cfg.blocks.insert(BlockId::Entry, Block::new(BlockId::Entry));
        for label in body.labels() {
            let id = BlockId::Label(label.index());
            cfg.blocks.insert(id, Block::new(id));
        }
        cfg.blocks.insert(BlockId::Exit, Block::new(BlockId::Exit));

        let mut current = BlockId::Entry;
        // Nothing precedes the first statement, so Entry falls into it
        let mut falls_through = true;

        for (i, statement) in body.statements().iter().enumerate() {
            match statement {
                Statement::Label(label) => {
                    let next = BlockId::Label(label.index());
                    if falls_through {
                        cfg.add_edge(current, next)?;
                    }
                    current = next;
                    cfg.block_mut(current)?.statements = i..i;
                }
                Statement::Jump(target) => {
                    cfg.add_edge(current, BlockId::Label(target.index()))?;
                }
                Statement::Branch { statement, .. } => match statement.as_ref() {
                    Statement::Jump(target) => {
                        cfg.add_edge(current, BlockId::Label(target.index()))?
                    }
                    Statement::Return(_) => cfg.add_edge(current, BlockId::Exit)?,
                    other => {
                        return Err(Error::invariant(format!(
                            "branch at statement {} guards {:?}, expected a jump or return",
                            i, other
                        )))
                    }
                },
                Statement::Return(_) | Statement::Quit => {
                    cfg.add_edge(current, BlockId::Exit)?;
                }
                _ => {}
            }

            falls_through = !statement.is_terminator();
            cfg.block_mut(current)?.statements.end = i + 1;
        }

        // Running off the end returns like an implicit `return 0`
        if falls_through {
            cfg.add_edge(current, BlockId::Exit)?;
        }

        Ok(cfg)
    }

    fn block_mut(&mut self, id: BlockId) -> Result<&mut Block> {
        self.blocks
            .get_mut(&id)
            .ok_or_else(|| Error::invariant(format!("no block for {}", id)))
    }

    fn add_edge(&mut self, from: BlockId, to: BlockId) -> Result<()> {
        if !self.blocks.contains_key(&to) {
            return Err(Error::invariant(format!(
                "edge from {} targets missing block {}",
                from, to
            )));
        }

        self.block_mut(from)?.successors.insert(to);
        self.block_mut(to)?.predecessors.insert(from);
        Ok(())
    }

    /// Look up a block
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    /// All blocks in id order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// Number of blocks, including Entry and Exit
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: Entry and Exit are present in every graph
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The synthetic entry block
    pub fn entry(&self) -> Option<&Block> {
        self.block(BlockId::Entry)
    }

    /// The synthetic exit block
    pub fn exit(&self) -> Option<&Block> {
        self.block(BlockId::Exit)
    }

    /// First real block to execute
    pub fn start(&self) -> BlockId {
        self.entry()
            .and_then(|entry| entry.successors.iter().next().copied())
            .unwrap_or(BlockId::Exit)
    }

    /// Block reached by falling off the end of `id`
    pub fn fall_through(&self, id: BlockId) -> BlockId {
        match id {
            BlockId::Entry => self.start(),
            BlockId::Label(index) if index + 1 < self.label_count => BlockId::Label(index + 1),
            _ => BlockId::Exit,
        }
    }
}
