//! Console line filters.
//!
//! A filter answers one question per line: forward it to the console
//! (`true`) or hide it (`false`). Filters may keep state between lines.

pub trait LineFilter: Send {
    fn filter(&mut self, line: &str) -> bool;
}

impl<F> LineFilter for F
where
    F: FnMut(&str) -> bool + Send,
{
    fn filter(&mut self, line: &str) -> bool {
        self(line)
    }
}


/// Hides the first line starting with `prefix`, forwards everything else.
#[derive(Debug, Clone)]
pub struct OneTimeLineFilter {
    prefix: String,
    matched: bool,
}

impl OneTimeLineFilter {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        debug_assert!(!prefix.is_empty(), "one-time filter prefix must not be empty");
        Self { prefix, matched: false }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn has_matched(&self) -> bool {
        self.matched
    }
}

impl LineFilter for OneTimeLineFilter {
    fn filter(&mut self, line: &str) -> bool {
        if !self.matched && line.starts_with(&self.prefix) {
            self.matched = true;
            return false;
        }
        true
    }
}


/// Hides a line when any member hides it.
///
/// Every member sees every line, even after an earlier member already voted
/// to hide it, so one-time members never miss their match.
#[derive(Default)]
pub struct CompoundLineFilter {
    filters: Vec<Box<dyn LineFilter>>,
}

impl CompoundLineFilter {
    pub fn new(filters: Vec<Box<dyn LineFilter>>) -> Self {
        Self { filters }
    }

    /// One [`OneTimeLineFilter`] per prefix, in order.
    pub fn suppress_once<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            prefixes
                .into_iter()
                .map(|p| Box::new(OneTimeLineFilter::new(p)) as Box<dyn LineFilter>)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl LineFilter for CompoundLineFilter {
    fn filter(&mut self, line: &str) -> bool {
        // no short-circuit: call the member first, then combine
        self.filters
            .iter_mut()
            .fold(true, |forward, f| f.filter(line) && forward)
    }
}
