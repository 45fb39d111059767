use std::time::Duration;

/// Lets a frame through when at least `interval` has passed since the last
/// one it let through. Rejected frames are simply dropped.
#[derive(Clone, Debug)]
pub struct AdmissionGate {
    interval: Duration,
    last_admitted: Option<Duration>,
}

impl AdmissionGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_admitted: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Admits the frame captured at `timestamp` if the gate is open.
    ///
    /// A timestamp earlier than the last admission means the source
    /// restarted; the gate re-arms from there instead of stalling.
    pub fn try_admit(&mut self, timestamp: Duration) -> bool {
        let open = match self.last_admitted {
            None => true,
            Some(last) if timestamp < last => true,
            Some(last) => timestamp - last >= self.interval,
        };
        if open {
            self.last_admitted = Some(timestamp);
        }
        open
    }
}

/// Which consumers a frame was admitted for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Admission {
    pub inference: bool,
    pub display: bool,
}

impl Admission {
    pub fn is_dropped(&self) -> bool {
        !self.inference && !self.display
    }
}

/// Throttles a native-rate stream to two independent duty cycles.
#[derive(Clone, Debug)]
pub struct FrameAdmissionScheduler {
    inference: AdmissionGate,
    display: AdmissionGate,
    admitted: usize,
    dropped: usize,
}

impl FrameAdmissionScheduler {
    pub fn new(process_interval: Duration, display_interval: Duration) -> Self {
        Self {
            inference: AdmissionGate::new(process_interval),
            display: AdmissionGate::new(display_interval),
            admitted: 0,
            dropped: 0,
        }
    }

    pub fn admit(&mut self, timestamp: Duration) -> Admission {
        let admission = Admission {
            inference: self.inference.try_admit(timestamp),
            display: self.display.try_admit(timestamp),
        };
        if admission.inference {
            self.admitted += 1;
        }
        if admission.is_dropped() {
            self.dropped += 1;
        }
        admission
    }

    /// Frames admitted for inference so far.
    pub fn admitted(&self) -> usize {
        self.admitted
    }

    /// Frames neither gate wanted.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_first_frame_is_admitted() {
        let mut gate = AdmissionGate::new(ms(100));
        assert!(gate.try_admit(ms(5_000)));
    }

    #[test]
    fn test_admitted_timestamps_respect_interval() {
        let mut gate = AdmissionGate::new(ms(100));
        // 60 fps with a little jitter.
        let admitted: Vec<Duration> = (0..300u64)
            .map(|i| ms(i * 16 + (i % 3)))
            .filter(|&t| gate.try_admit(t))
            .collect();

        assert!(admitted.len() > 10);
        for pair in admitted.windows(2) {
            assert!(pair[1] - pair[0] >= ms(100), "{:?}", pair);
        }
    }

    #[test]
    fn test_exact_interval_is_admitted() {
        let mut gate = AdmissionGate::new(ms(100));
        assert!(gate.try_admit(ms(0)));
        assert!(!gate.try_admit(ms(99)));
        assert!(gate.try_admit(ms(100)));
    }

    #[test]
    fn test_rejected_frames_do_not_move_the_gate() {
        let mut gate = AdmissionGate::new(ms(100));
        gate.try_admit(ms(0));
        for t in [10, 20, 30, 90] {
            assert!(!gate.try_admit(ms(t)));
        }
        assert!(gate.try_admit(ms(100)));
    }

    #[test]
    fn test_source_restart_rearms() {
        let mut gate = AdmissionGate::new(ms(100));
        gate.try_admit(ms(10_000));
        assert!(gate.try_admit(ms(0)));
        assert!(!gate.try_admit(ms(50)));
    }

    #[test]
    fn test_scheduler_runs_gates_independently() {
        let mut scheduler = FrameAdmissionScheduler::new(ms(100), ms(33));
        let admissions: Vec<Admission> = (0..30u64).map(|i| scheduler.admit(ms(i * 10))).collect();

        let inference = admissions.iter().filter(|a| a.inference).count();
        let display = admissions.iter().filter(|a| a.display).count();
        // 0..290 ms: inference at 0,100,200; display every 40 ms (next 10 ms tick after 33).
        assert_eq!(inference, 3);
        assert_eq!(display, 8);
        assert_eq!(scheduler.admitted(), 3);
        assert_eq!(
            scheduler.dropped(),
            admissions.iter().filter(|a| a.is_dropped()).count()
        );
    }
}
