pub mod fmt;
pub mod intern;
#[cfg(test)]
pub(crate) mod test_utils;

/// Runs `f`, first switching to a fresh stack segment if the current one is
/// nearly exhausted. Every recursive walk over the tree goes through here.
pub fn grow_stack<R>(f: impl FnOnce() -> R) -> R {
    const RED_ZONE: usize = 128 * 1024;
    const GROW_BY: usize = 2 * 1024 * 1024;
    stacker::maybe_grow(RED_ZONE, GROW_BY, f)
}

pub trait BreakableIteratorExt<I>: Iterator
where
    I: Iterator,
{
    /// Yields items up to (and including) the first one for which
    /// `stop_predicate` holds.
    fn up_to<P>(self, stop_predicate: P) -> Break<I, P>
    where
        P: FnMut(&I::Item) -> bool;
}

impl<I> BreakableIteratorExt<I> for I
where
    I: Iterator,
{
    fn up_to<P>(self, stop_predicate: P) -> Break<I, P>
    where
        P: FnMut(&I::Item) -> bool,
    {
        Break {
            iter: self,
            stop_predicate,
            finished: false,
        }
    }
}

pub struct Break<I, P> {
    iter: I,
    stop_predicate: P,
    finished: bool,
}

impl<I, P> Iterator for Break<I, P>
where
    I: Iterator,
    P: FnMut(&I::Item) -> bool,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let next = self.iter.next()?;
        self.finished = (self.stop_predicate)(&next);
        Some(next)
    }
}
