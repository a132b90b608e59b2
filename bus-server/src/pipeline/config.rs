//! Pipeline configuration.

/// Tunables for deriving the timetable view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// How long before departure a bus counts as boarding (minutes).
    pub boarding_window_mins: u16,
}

impl PipelineConfig {
    pub fn new(boarding_window_mins: u16) -> Self {
        Self {
            boarding_window_mins,
        }
    }

    pub fn with_boarding_window(mut self, mins: u16) -> Self {
        self.boarding_window_mins = mins;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            boarding_window_mins: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_boarding_window() {
        assert_eq!(PipelineConfig::default().boarding_window_mins, 30);
        assert_eq!(
            PipelineConfig::default().with_boarding_window(10),
            PipelineConfig::new(10)
        );
    }
}
