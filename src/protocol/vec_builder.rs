//! Allocation guard for length-prefixed data.
//!
//! Lengths on the wire are attacker/bug controlled. Instead of trusting them for a single up-front allocation we
//! grow the output in bounded blocks, so that a bogus length fails with an IO error once the input runs dry rather
//! than with an out-of-memory abort.

use std::io::Read;

/// Maximum number of bytes preallocated per block.
const BLOCK_SIZE_BYTES: usize = 1024 * 10;

#[derive(Debug)]
pub struct VecBuilder<T> {
    block_elements: usize,
    blocks: Vec<Vec<T>>,
    remaining: usize,
}

impl<T> VecBuilder<T> {
    pub fn new(expected_elements: usize) -> Self {
        let block_elements = (BLOCK_SIZE_BYTES / std::mem::size_of::<T>().max(1)).max(1);

        Self {
            block_elements,
            blocks: vec![],
            remaining: expected_elements,
        }
    }

    pub fn push(&mut self, element: T) {
        let needs_block = match self.blocks.last() {
            Some(block) => block.len() == block.capacity(),
            None => true,
        };
        if needs_block {
            let size = self.remaining.clamp(1, self.block_elements);
            self.blocks.push(Vec::with_capacity(size));
        }

        if let Some(block) = self.blocks.last_mut() {
            block.push(element);
        }
        self.remaining = self.remaining.saturating_sub(1);
    }
}

impl VecBuilder<u8> {
    /// Fill the builder with exactly the expected number of bytes.
    pub fn read_exact<R>(mut self, reader: &mut R) -> Result<Self, std::io::Error>
    where
        R: Read,
    {
        while self.remaining > 0 {
            let size = self.remaining.min(self.block_elements);
            let mut block = vec![0u8; size];
            reader.read_exact(&mut block)?;
            self.remaining -= size;
            self.blocks.push(block);
        }

        Ok(self)
    }
}

impl<T> From<VecBuilder<T>> for Vec<T> {
    fn from(builder: VecBuilder<T>) -> Self {
        let mut blocks = builder.blocks.into_iter();
        let mut out = blocks.next().unwrap_or_default();
        for block in blocks {
            out.extend(block);
        }
        out
    }
}
