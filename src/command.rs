/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// One stage of a pipeline, linked to the stage on its left.
///
/// The parser hands out the *right-most* stage as the head of the chain;
/// following [`Command::predecessor`] walks toward the first-typed stage, so
/// `a | b | c` is `c -> b -> a`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Command {
    /// Program name followed by its arguments.
    pub argv: Vec<String>,
    /// Set on the head stage when the line ended with `&`.
    pub background: bool,
    /// File to read standard input from.
    pub input: Option<String>,
    /// File to write standard output to (created or truncated).
    pub output: Option<String>,
    /// The stage feeding this one through a pipe.
    pub predecessor: Option<Box<Command>>,
}

impl Command {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stage with neither arguments nor redirections.
    pub fn is_empty(&self) -> bool {
        self.argv.is_empty() && self.input.is_none() && self.output.is_none()
    }

    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    pub fn has_redirections(&self) -> bool {
        self.input.is_some() || self.output.is_some()
    }

    /// Iterates from this stage leftward through its predecessors.
    pub fn stages(&self) -> Stages<'_> {
        Stages { next: Some(self) }
    }

    #[cfg(test)]
    pub(crate) fn stage_count(&self) -> usize {
        self.stages().count()
    }

    /// Detaches the chain into its stages, first-typed stage first.
    ///
    /// Every returned stage has no predecessor.
    pub fn into_pipeline(mut self) -> Vec<Command> {
        let mut next = self.predecessor.take();
        let mut stages = vec![self];
        while let Some(mut stage) = next {
            next = stage.predecessor.take();
            stages.push(*stage);
        }
        stages.reverse();
        stages
    }
}

impl Drop for Command {
    fn drop(&mut self) {
        // Unlink iteratively so long chains do not recurse once per stage.
        let mut next = self.predecessor.take();
        while let Some(mut stage) = next {
            next = stage.predecessor.take();
        }
    }
}

/// Iterator over a chain, head first. See [`Command::stages`].
pub struct Stages<'a> {
    next: Option<&'a Command>,
}

impl<'a> Iterator for Stages<'a> {
    type Item = &'a Command;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.predecessor.as_deref();
        Some(current)
    }
}
