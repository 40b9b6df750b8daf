use std::fmt;

/// Wrap a formatting closure into an ad-hoc [`Display`](fmt::Display) value.
///
/// Backs the `display(&Grammar)` accessors on items, states, productions and
/// conflicts, which need the grammar at hand to resolve symbol names.
pub fn display_fn<F>(f: F) -> impl fmt::Display
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    struct FmtWith<F>(F);
    impl<F> fmt::Display for FmtWith<F>
    where
        F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
    {
        fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            (self.0)(formatter)
        }
    }
    FmtWith(f)
}
