#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Paused,
    Playing,
}

/// Minimal host-side clock. The timeline never mutates it directly; it only
/// asks for seeks.
#[derive(Debug, Clone)]
pub struct Playback {
    pub transport: Transport,
    pub current_time: f64,
    pub duration: f64,
    pub rate: f64,
}

impl Default for Playback {
    fn default() -> Self {
        Self {
            transport: Transport::Paused,
            current_time: 0.0,
            duration: 0.0,
            rate: 1.0,
        }
    }
}

impl Playback {
    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration.max(0.0);
        self.current_time = self.current_time.min(self.duration);
    }

    pub fn toggle_play(&mut self) {
        self.transport = match self.transport {
            Transport::Playing => Transport::Paused,
            Transport::Paused => {
                if self.duration > 0.0 && self.current_time >= self.duration {
                    self.current_time = 0.0;
                }
                Transport::Playing
            }
        };
    }

    pub fn is_playing(&self) -> bool {
        self.transport == Transport::Playing
    }

    pub fn seek(&mut self, time: f64) {
        self.current_time = if self.duration > 0.0 {
            time.clamp(0.0, self.duration)
        } else {
            0.0
        };
    }

    pub fn advance(&mut self, dt: f64) {
        if self.transport == Transport::Playing {
            self.current_time += dt * self.rate;
        }
        if self.current_time < 0.0 {
            self.current_time = 0.0;
        }
        if self.duration > 0.0 && self.current_time >= self.duration {
            self.current_time = self.duration;
            self.transport = Transport::Paused;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_stops_at_duration() {
        let mut p = Playback::default();
        p.set_duration(10.0);
        p.toggle_play();
        p.advance(4.0);
        assert_eq!(p.current_time, 4.0);
        p.advance(20.0);
        assert_eq!(p.current_time, 10.0);
        assert!(!p.is_playing());
    }

    #[test]
    fn seek_is_clamped_by_host() {
        let mut p = Playback::default();
        p.set_duration(30.0);
        p.seek(45.0);
        assert_eq!(p.current_time, 30.0);
        p.seek(-2.0);
        assert_eq!(p.current_time, 0.0);
    }

    #[test]
    fn play_from_end_restarts() {
        let mut p = Playback::default();
        p.set_duration(5.0);
        p.seek(5.0);
        p.toggle_play();
        assert_eq!(p.current_time, 0.0);
        assert!(p.is_playing());
    }
}
