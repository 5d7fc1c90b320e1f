//! Repeat expander.
//!
//! Replays a block sequence `n` times without pulling it from its producer
//! more than once. The sequence is forked into `n` views over a shared spine:
//! blocks are appended to the spine as the leading view pulls them and are
//! dropped again once every live view has moved past them, so memory is
//! bounded by how far the views drift apart.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::sample::{AudioBlock, BlockStream};
use crate::sync::PoisonlessLock;

/// `blocks` concatenated with itself `n` times. `n == 1` is a passthrough.
pub fn repeat(blocks: BlockStream, n: usize) -> BlockStream {
    match n {
        0 => Box::new(std::iter::empty()),
        1 => blocks,
        n => Box::new(tee(blocks, n).into_iter().flatten()),
    }
}

/// Fork `source` into `n` independently advancing views that all see the same
/// blocks in the same order.
pub fn tee<I>(source: I, n: usize) -> Vec<TeeView<I>>
where
    I: Iterator<Item = AudioBlock>,
{
    let spine = Arc::new(Mutex::new(Spine {
        source,
        exhausted: false,
        blocks: VecDeque::new(),
        offset: 0,
        cursors: vec![Some(0); n],
    }));

    (0..n)
        .map(|id| TeeView {
            spine: spine.clone(),
            id,
        })
        .collect()
}

struct Spine<I> {
    source: I,
    exhausted: bool,
    /// Buffered blocks; `blocks[0]` has absolute index `offset`
    blocks: VecDeque<AudioBlock>,
    offset: usize,
    /// Absolute position of each view, `None` once the view is dropped
    cursors: Vec<Option<usize>>,
}

impl<I> Spine<I> {
    fn release(&mut self, id: usize) {
        self.cursors[id] = None;
        self.compact();
    }

    /// Drop blocks that every live view has already consumed.
    fn compact(&mut self) {
        let slowest = self
            .cursors
            .iter()
            .flatten()
            .min()
            .copied()
            .unwrap_or(self.offset + self.blocks.len());

        while self.offset < slowest && self.blocks.pop_front().is_some() {
            self.offset += 1;
        }
    }
}

impl<I: Iterator<Item = AudioBlock>> Spine<I> {
    fn next_for(&mut self, id: usize) -> Option<AudioBlock> {
        let pos = self.cursors[id]?;

        let block = if pos < self.offset + self.blocks.len() {
            self.blocks[pos - self.offset].clone()
        } else if self.exhausted {
            return None;
        } else {
            match self.source.next() {
                Some(block) => {
                    self.blocks.push_back(block.clone());
                    block
                }
                None => {
                    self.exhausted = true;
                    return None;
                }
            }
        };

        self.cursors[id] = Some(pos + 1);
        self.compact();
        Some(block)
    }
}

pub struct TeeView<I> {
    spine: Arc<Mutex<Spine<I>>>,
    id: usize,
}

impl<I> TeeView<I> {
    /// Number of blocks currently held by the shared spine.
    pub fn buffered(&self) -> usize {
        self.spine.plock().blocks.len()
    }
}

impl<I: Iterator<Item = AudioBlock>> Iterator for TeeView<I> {
    type Item = AudioBlock;

    fn next(&mut self) -> Option<AudioBlock> {
        self.spine.plock().next_for(self.id)
    }
}

impl<I> Drop for TeeView<I> {
    fn drop(&mut self) {
        self.spine.plock().release(self.id);
    }
}
