/// Pair of resources used as source and destination of consecutive passes.
///
/// Instead of swapping the resources themselves, we keep track of which one is
/// currently the source (the "active" one) - each [`Self::swap()`] turns last
/// pass' destination into next pass' source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DoubleBuffered<T> {
    items: [T; 2],
    active: usize,
}

impl<T> DoubleBuffered<T> {
    /// Creates a pair where `a` is the initial source.
    pub fn new(a: T, b: T) -> Self {
        Self {
            items: [a, b],
            active: 0,
        }
    }

    pub fn src(&self) -> &T {
        &self.items[self.active]
    }

    pub fn dst(&self) -> &T {
        &self.items[1 - self.active]
    }

    pub fn swap(&mut self) {
        self.active = 1 - self.active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap() {
        let mut target = DoubleBuffered::new("a", "b");

        assert_eq!(&"a", target.src());
        assert_eq!(&"b", target.dst());

        target.swap();

        assert_eq!(&"b", target.src());
        assert_eq!(&"a", target.dst());

        target.swap();

        assert_eq!(&"a", target.src());
        assert_eq!(&"b", target.dst());
    }
}
