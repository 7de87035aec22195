use std::ops::Range;
use std::sync::mpsc;
use std::sync::Arc;

use threadpool::ThreadPool;

use crate::error::RenderError;

/// Splits `0..len` into `block_count` contiguous ranges of equal size, the last one absorbs
/// the remainder. Ranges are disjoint and together cover `0..len` exactly.
pub fn block_ranges(len: usize, block_count: usize) -> Vec<Range<usize>> {
    let block_count = block_count.max(1);
    let block_size = len / block_count;
    let mut ranges = Vec::with_capacity(block_count);
    for i in 0..block_count {
        let start = i * block_size;
        let end = match i + 1 == block_count {
            true => len,
            false => start + block_size,
        };
        ranges.push(start..end);
    }
    return ranges;
}

/// Fans a per-element map over a worker pool and joins before returning.
///
/// Each submitted task owns one block of the input and produces the matching block of the
/// output, so no two tasks ever touch the same output slot. Tasks never submit work of
/// their own. Without a pool the map runs inline on the calling thread.
pub struct ParallelStage {
    pool: Option<ThreadPool>,
    block_count: usize,
}

impl ParallelStage {
    /// `workers == 0` disables the pool.
    pub fn new(workers: usize, block_count: usize) -> Self {
        let pool = match workers {
            0 => None,
            n => Some(ThreadPool::with_name(String::from("raster-worker"), n)),
        };
        return Self {
            pool,
            block_count: block_count.max(1),
        };
    }

    pub fn block_count(&self) -> usize {
        return self.block_count;
    }

    pub fn workers(&self) -> usize {
        return self.pool.as_ref().map_or(0, |pool| pool.max_count());
    }

    /// Output element `i` is always `f(i, &input[i])`.
    pub fn map<T, R, F>(&self, input: &Arc<Vec<T>>, f: Arc<F>) -> Result<Vec<R>, RenderError>
    where
        T: Send + Sync + 'static,
        R: Send + 'static,
        F: Fn(usize, &T) -> R + Send + Sync + 'static,
    {
        let pool = match &self.pool {
            Some(pool) => pool,
            None => return Ok(input.iter().enumerate().map(|(i, v)| (*f)(i, v)).collect()),
        };

        let (tx, rx) = mpsc::channel::<(usize, Vec<R>)>();
        let mut submitted = 0;
        for (block_index, range) in block_ranges(input.len(), self.block_count).into_iter().enumerate() {
            if range.is_empty() {
                continue;
            }
            log::trace!("block {} -> {:?}", block_index, range);
            let tx = tx.clone();
            let input = Arc::clone(input);
            let f = Arc::clone(&f);
            pool.execute(move || {
                let start = range.start;
                let block: Vec<R> = input[range].iter().enumerate().map(|(k, v)| (*f)(start + k, v)).collect();
                // Receiver only goes away when the frame was already abandoned.
                let _ = tx.send((block_index, block));
            });
            submitted += 1;
        }
        drop(tx);

        // Barrier: the iterator ends once every task has finished and dropped its sender.
        // A panicking task drops its sender without sending, which shows up as a missing block.
        let mut blocks: Vec<(usize, Vec<R>)> = rx.iter().collect();
        if blocks.len() != submitted {
            return Err(RenderError::WorkerFailed { submitted, received: blocks.len() });
        }

        blocks.sort_by_key(|(block_index, _)| *block_index);
        let mut output = Vec::with_capacity(input.len());
        for (_, block) in blocks {
            output.extend(block);
        }
        return Ok(output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_exact_cover(len: usize, blocks: usize) {
        let ranges = block_ranges(len, blocks);
        assert_eq!(ranges.len(), blocks.max(1));
        let mut next = 0;
        for range in &ranges {
            assert_eq!(range.start, next);
            next = range.end;
        }
        assert_eq!(next, len);
    }

    #[test]
    fn ranges_cover_input_exactly() {
        for len in [0, 1, 5, 7, 8, 9, 100, 1001] {
            for blocks in [1, 6, 8, 12] {
                assert_exact_cover(len, blocks);
            }
        }
    }

    #[test]
    fn last_range_absorbs_remainder() {
        let ranges = block_ranges(10, 4);
        assert_eq!(ranges, vec![0..2, 2..4, 4..6, 6..10]);
    }

    #[test]
    fn parallel_map_preserves_order() {
        let stage = ParallelStage::new(4, 8);
        let input = Arc::new((0..1003).collect::<Vec<u32>>());
        let output = stage.map(&input, Arc::new(|_: usize, v: &u32| v * 2)).unwrap();
        assert_eq!(output, (0..1003).map(|v| v * 2).collect::<Vec<u32>>());
    }

    #[test]
    fn inline_map_matches_parallel_map() {
        let input = Arc::new((0..37).collect::<Vec<i64>>());
        let f = Arc::new(|i: usize, v: &i64| v * v - i as i64);
        let inline = ParallelStage::new(0, 8).map(&input, Arc::clone(&f)).unwrap();
        let pooled = ParallelStage::new(3, 8).map(&input, f).unwrap();
        assert_eq!(inline, pooled);
    }

    #[test]
    fn fewer_elements_than_blocks() {
        let stage = ParallelStage::new(2, 12);
        let input = Arc::new(vec![1.0f32, 2.0, 3.0]);
        let output = stage.map(&input, Arc::new(|_: usize, v: &f32| v + 1.0)).unwrap();
        assert_eq!(output, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn panicking_task_is_reported() {
        let stage = ParallelStage::new(2, 4);
        let input = Arc::new((0..16).collect::<Vec<u32>>());
        let result = stage.map(
            &input,
            Arc::new(|_: usize, v: &u32| {
                if *v == 5 {
                    panic!("bad vertex");
                }
                *v
            }),
        );
        assert_eq!(result.unwrap_err(), RenderError::WorkerFailed { submitted: 4, received: 3 });
    }
}
