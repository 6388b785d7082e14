use crate::search::{Cell, CostFunction, DoubleHeap};

/// Storage of the cells that remain to be explored by a search.
pub trait CellBuffer {
    fn push(&mut self, cell: Cell);

    /// Next cell to explore, `None` if the buffer is exhausted.
    fn pop(&mut self) -> Option<Cell>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all cells.
    fn flush(&mut self);
}

/// Depth-first exploration: the last cell pushed is the first one explored.
#[derive(Default, Clone, Debug)]
pub struct CellStack {
    cells: Vec<Cell>,
}

impl CellStack {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CellBuffer for CellStack {
    fn push(&mut self, cell: Cell) {
        self.cells.push(cell)
    }

    fn pop(&mut self) -> Option<Cell> {
        self.cells.pop()
    }

    fn len(&self) -> usize {
        self.cells.len()
    }

    fn flush(&mut self) {
        self.cells.clear()
    }
}

/// Best-first exploration alternating between two orderings.
impl<C1: CostFunction<Cell>, C2: CostFunction<Cell>> CellBuffer for DoubleHeap<Cell, C1, C2> {
    fn push(&mut self, cell: Cell) {
        DoubleHeap::push(self, cell)
    }

    fn pop(&mut self) -> Option<Cell> {
        DoubleHeap::pop(self).ok()
    }

    fn len(&self) -> usize {
        DoubleHeap::len(self)
    }

    fn flush(&mut self) {
        DoubleHeap::flush(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::IntervalBox;
    use crate::search::{Depth, MaxDiam};

    fn cell(id: u64, depth: u32, width: f64) -> Cell {
        let mut c = Cell::root(IntervalBox::from_bounds(&[(0.0, width)]));
        c.id = id;
        c.depth = depth;
        c
    }

    fn drain(buffer: &mut dyn CellBuffer) -> Vec<u64> {
        std::iter::from_fn(|| buffer.pop().map(|c| c.id)).collect()
    }

    #[test]
    fn test_stack() {
        let mut stack = CellStack::new();
        for i in 0..3 {
            stack.push(cell(i, 0, 1.0));
        }
        assert_eq!(stack.len(), 3);
        assert_eq!(drain(&mut stack), vec![2, 1, 0]);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_double_heap_buffer() {
        let mut heap = DoubleHeap::new(MaxDiam, Depth, 0.0).unwrap();
        heap.push(cell(0, 5, 1.0));
        heap.push(cell(1, 1, 8.0));
        heap.push(cell(2, 3, 4.0));
        assert_eq!(CellBuffer::len(&heap), 3);
        assert_eq!(drain(&mut heap), vec![1, 2, 0]);

        let mut heap = DoubleHeap::new(MaxDiam, Depth, 100.0).unwrap();
        heap.push(cell(0, 5, 1.0));
        heap.push(cell(1, 1, 8.0));
        heap.push(cell(2, 3, 4.0));
        assert_eq!(drain(&mut heap), vec![0, 2, 1]);
        heap.push(cell(3, 0, 1.0));
        CellBuffer::flush(&mut heap);
        assert!(CellBuffer::is_empty(&heap));
        assert_eq!(CellBuffer::pop(&mut heap).map(|c| c.id), None);
    }
}
