use log::info;

/// Standalone top-speed run: a start/stop toggle over the live speed feed.
#[derive(Debug, Default)]
pub struct TopSpeedTest {
    running: bool,
    max_speed_mph: f64,
}

impl TopSpeedTest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn max_speed_mph(&self) -> f64 {
        self.max_speed_mph
    }

    pub fn start(&mut self) {
        self.running = true;
        self.max_speed_mph = 0.0;
    }

    /// Ends the run, returning its top speed and clearing the readout.
    pub fn stop(&mut self) -> f64 {
        let top = self.max_speed_mph;
        self.running = false;
        self.max_speed_mph = 0.0;
        info!("Top speed run finished at {:.1} mph", top);
        top
    }

    /// Flip between running and stopped; returns the finished top speed on stop.
    pub fn toggle(&mut self) -> Option<f64> {
        if self.running {
            Some(self.stop())
        } else {
            self.start();
            None
        }
    }

    pub fn update(&mut self, speed_mph: f64) {
        if self.running {
            self.max_speed_mph = self.max_speed_mph.max(speed_mph);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_max_only_while_running() {
        let mut test = TopSpeedTest::new();
        test.update(50.0);
        assert_eq!(test.max_speed_mph(), 0.0);

        assert_eq!(test.toggle(), None);
        test.update(20.0);
        test.update(64.5);
        test.update(30.0);
        assert_eq!(test.max_speed_mph(), 64.5);

        assert_eq!(test.toggle(), Some(64.5));
        assert!(!test.is_running());
        assert_eq!(test.max_speed_mph(), 0.0);
    }
}
