/// Events reported while a relaxation runs.
#[derive(Debug, Clone)]
pub enum Progress {
    RelaxStart {
        iterations: usize,
    },
    Iteration {
        index: usize,
        /// Largest single-atom displacement applied in this step, in Å.
        max_displacement: f64,
        total_energy: f64,
    },
    RelaxFinish,
    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// Whether anyone is listening; lets callers skip computing values that
    /// exist only for reporting.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.callback.is_some()
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
