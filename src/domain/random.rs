use rand::{thread_rng, Rng};

/// Source of uniform choices for prize draws and promotion templates.
pub trait RandomSource: Send {
    /// Returns an index in `0..len`. Callers never pass zero.
    fn pick(&mut self, len: usize) -> usize;
}

/// Draws from the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick(&mut self, len: usize) -> usize {
        thread_rng().gen_range(0..len)
    }
}
