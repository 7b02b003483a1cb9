use std::fmt;
use std::panic::Location;

/// Source location of an allocation request.
///
/// A site is opaque identifying data for the ledger: it is compared, ordered
/// and printed, never parsed. Sites are `Copy` and hold a `&'static str` so
/// that recording one from inside the allocator never allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Site {
    pub file: &'static str,
    pub line: u32,
}

impl Site {
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// Site of the caller, propagated through any chain of `#[track_caller]` functions.
    ///
    /// ```rust
    /// use leakcensus::Site;
    ///
    /// let site = Site::caller();
    /// assert_eq!(site.file, file!());
    /// assert_eq!(site.line, line!() - 2);
    /// ```
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }
}

impl From<&'static Location<'static>> for Site {
    fn from(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Expands to the [`Site`] of the macro invocation.
///
/// ```rust
/// let site = leakcensus::site!();
/// assert_eq!(site.file, file!());
/// ```
#[macro_export]
macro_rules! site {
    () => {
        $crate::Site::new(file!(), line!())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn nested() -> Site {
        Site::caller()
    }

    #[test]
    fn test_caller_propagates_through_track_caller() {
        let expected_line = line!() + 1;
        let site = nested();
        assert_eq!(site.file, file!());
        assert_eq!(site.line, expected_line);
    }

    #[test]
    fn test_ordering_is_file_then_line() {
        let mut sites = vec![
            Site::new("b.rs", 1),
            Site::new("a.rs", 20),
            Site::new("a.rs", 3),
        ];
        sites.sort();
        assert_eq!(
            sites,
            vec![
                Site::new("a.rs", 3),
                Site::new("a.rs", 20),
                Site::new("b.rs", 1),
            ]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Site::new("src/main.rs", 42).to_string(), "src/main.rs:42");
    }
}
