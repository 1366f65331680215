use std::time::{Duration, Instant};

/// Gates cycles to a minimum wall-clock spacing. The first frame always passes.
pub struct SamplingPolicy {
    min_interval: Duration,
    last_sample: Option<Instant>,
}

impl SamplingPolicy {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_sample: None,
        }
    }

    pub fn should_sample(&mut self, now: Instant) -> bool {
        let due = match self.last_sample {
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
            None => true,
        };
        if due {
            self.last_sample = Some(now);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spacing() {
        let mut policy = SamplingPolicy::new(Duration::from_millis(150));
        let start = Instant::now();

        assert!(policy.should_sample(start));
        assert!(!policy.should_sample(start + Duration::from_millis(10)));
        assert!(!policy.should_sample(start + Duration::from_millis(149)));
        assert!(policy.should_sample(start + Duration::from_millis(150)));
        assert!(!policy.should_sample(start + Duration::from_millis(200)));
        assert!(policy.should_sample(start + Duration::from_millis(400)));
    }

    #[test]
    fn test_zero_interval_samples_everything() {
        let mut policy = SamplingPolicy::new(Duration::ZERO);
        let now = Instant::now();
        assert!(policy.should_sample(now));
        assert!(policy.should_sample(now));
    }
}
