/// A closed range `[min, max]` along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    /// Create a new interval given min and max values.
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Returns the size of the interval (max - min).
    pub fn size(&self) -> f32 {
        self.max - self.min
    }

    /// Midpoint of the interval.
    pub fn center(&self) -> f32 {
        (self.min + self.max) * 0.5
    }

    /// True for intervals that contain nothing (min > max).
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Grow the interval so it contains `x`.
    pub fn include(&self, x: f32) -> Interval {
        Interval::new(self.min.min(x), self.max.max(x))
    }

    /// An empty interval (min > max, contains nothing).
    pub const EMPTY: Interval = Interval {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_size() {
        let interval = Interval::new(2.0, 7.0);
        assert_eq!(interval.size(), 5.0);
        assert_eq!(interval.center(), 4.5);
    }

    #[test]
    fn test_interval_include_grows_empty() {
        let grown = Interval::EMPTY.include(3.0).include(-1.0);
        assert_eq!(grown, Interval::new(-1.0, 3.0));
        assert!(!grown.is_empty());
    }

    #[test]
    fn test_interval_empty() {
        let empty = Interval::EMPTY;
        assert!(empty.is_empty());
        assert_eq!(empty.include(2.0), Interval::new(2.0, 2.0));
    }
}
