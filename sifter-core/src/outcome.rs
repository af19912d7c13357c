use std::fmt;

/// How a run ended, as seen by the user and the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Records were extracted and every requested file was written
    Success,
    /// Traversal completed but nothing usable was extracted
    NoData,
    /// Navigation, browser, configuration or output failure
    Failed,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::Failed => 1,
            RunOutcome::NoData => 2,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunOutcome::Success => "success",
            RunOutcome::NoData => "completed with no data",
            RunOutcome::Failed => "failed",
        })
    }
}
