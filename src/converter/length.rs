//! Note length statistics, clock detection and length text

/// Occurrence count per raw length code of one channel
#[derive(Debug, Clone)]
pub struct LengthHistogram {
    counts: [u32; 256],
}

impl LengthHistogram {
    pub fn new() -> Self {
        Self { counts: [0; 256] }
    }

    pub fn record(&mut self, length: u32) {
        if let Some(count) = self.counts.get_mut(length as usize) {
            *count += 1;
        }
    }

    pub fn count(&self, length: u32) -> u32 {
        self.counts.get(length as usize).copied().unwrap_or(0)
    }

    /// Sum of counts over a family of lengths
    fn score(&self, family: &[u32]) -> u32 {
        family.iter().map(|&len| self.count(len)).sum()
    }
}

impl Default for LengthHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Candidate clocks with the lengths obtained by halving them, in priority order
const CLOCK_FAMILIES: [(u32, &[u32]); 4] = [
    (192, &[192, 96, 48, 24, 12, 6, 3]),
    (144, &[144, 72, 36, 18, 9]),
    (128, &[128, 64, 32, 16, 8, 4, 2]),
    (112, &[112, 56, 28, 14, 7]),
];

/// Time base of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timebase {
    /// Ticks per whole note
    pub clock: u32,
    /// Default length as a divisor of the whole note
    pub default_length: u32,
}

impl Timebase {
    pub fn new(clock: u32, default_length: u32) -> Self {
        Self {
            clock,
            default_length,
        }
    }

    /// Infer clock and default length from a length histogram
    pub fn detect(histogram: &LengthHistogram) -> Self {
        let scores: Vec<(u32, u32)> = CLOCK_FAMILIES
            .iter()
            .map(|&(clock, family)| (clock, histogram.score(family)))
            .collect();

        tracing::debug!("----------------");
        for &(clock, score) in &scores {
            tracing::debug!("{:3}: {:4}", clock, score);
        }
        for row in 0..20u32 {
            let counts: Vec<String> = (0..10)
                .map(|col| format!("{:4}", histogram.count(row * 10 + col)))
                .collect();
            tracing::debug!("{:3}: {}", row * 10, counts.join(" "));
        }

        // earlier candidates win ties
        let mut best = scores[0];
        for &candidate in &scores[1..] {
            if candidate.1 > best.1 {
                best = candidate;
            }
        }
        let clock = best.0;

        let mut default_length = 1;
        for i in 1..7 {
            if histogram.count(clock >> i) > histogram.count(clock / default_length) {
                default_length = 1 << i;
            }
        }

        Self::new(clock, default_length)
    }

    /// Header token declaring this time base
    pub fn header(&self) -> String {
        format!("C{}l{}", self.clock, self.default_length)
    }

    /// Shortest MML length text for `len` ticks
    ///
    /// Returns an empty string for the default length, a divisor (`8`), a
    /// dotted divisor (`8.`, or `.` for the dotted default), or the absolute
    /// tick count (`%5`) when no fraction fits.
    pub fn format_length(&self, len: u32) -> String {
        if len == 0 {
            return "%0".to_string();
        }

        if self.clock % len == 0 {
            let divisor = self.clock / len;
            if divisor == self.default_length {
                String::new()
            } else {
                divisor.to_string()
            }
        } else if len % 3 == 0 && self.clock % (len / 3 * 2) == 0 {
            let divisor = self.clock / (len / 3 * 2);
            if divisor == self.default_length {
                ".".to_string()
            } else {
                format!("{}.", divisor)
            }
        } else {
            format!("%{}", len)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tick count of a length text produced by [`Timebase::format_length`]
    fn parse_length(tb: &Timebase, text: &str) -> Option<u32> {
        if let Some(ticks) = text.strip_prefix('%') {
            return ticks.parse().ok();
        }

        let (digits, dotted) = match text.strip_suffix('.') {
            Some(digits) => (digits, true),
            None => (text, false),
        };
        let divisor = if digits.is_empty() {
            tb.default_length
        } else {
            digits.parse().ok()?
        };
        if divisor == 0 || tb.clock % divisor != 0 {
            return None;
        }

        let ticks = tb.clock / divisor;
        if dotted {
            Some(ticks + ticks / 2)
        } else {
            Some(ticks)
        }
    }

    fn histogram(entries: &[(u32, u32)]) -> LengthHistogram {
        let mut h = LengthHistogram::new();
        for &(len, count) in entries {
            for _ in 0..count {
                h.record(len);
            }
        }
        h
    }

    #[test]
    fn test_detect_192() {
        let tb = Timebase::detect(&histogram(&[(192, 1), (96, 2), (48, 5)]));
        assert_eq!(tb.clock, 192);
        assert_eq!(tb.default_length, 4);
    }

    #[test]
    fn test_detect_144() {
        let tb = Timebase::detect(&histogram(&[(144, 2), (72, 3)]));
        assert_eq!(tb.clock, 144);
        assert_eq!(tb.default_length, 2);
    }

    #[test]
    fn test_detect_tie_prefers_earlier() {
        // 24 counts for 192, 16 for 128, equal scores
        let tb = Timebase::detect(&histogram(&[(24, 3), (16, 3)]));
        assert_eq!(tb.clock, 192);

        let tb = Timebase::detect(&histogram(&[(36, 2), (56, 2)]));
        assert_eq!(tb.clock, 144);

        let tb = Timebase::detect(&LengthHistogram::new());
        assert_eq!(tb, Timebase::new(192, 1));
    }

    #[test]
    fn test_default_length_needs_strictly_more() {
        // 48 and 24 are equally common: the longer one stays the default
        let tb = Timebase::detect(&histogram(&[(48, 4), (24, 4)]));
        assert_eq!(tb.default_length, 4);

        let tb = Timebase::detect(&histogram(&[(48, 4), (24, 5)]));
        assert_eq!(tb.default_length, 8);
    }

    #[test]
    fn test_format_length() {
        let tb = Timebase::new(192, 4);
        assert_eq!(tb.format_length(48), "");
        assert_eq!(tb.format_length(24), "8");
        assert_eq!(tb.format_length(72), ".");
        assert_eq!(tb.format_length(36), "8.");
        assert_eq!(tb.format_length(5), "%5");
        assert_eq!(tb.format_length(0), "%0");
    }

    #[test]
    fn test_length_text_round_trip() {
        let tb = Timebase::new(192, 48);
        let mut kinds = [false; 4];
        for len in 1..=192 {
            let text = tb.format_length(len);
            match text.as_str() {
                "" => kinds[0] = true,
                t if t.starts_with('%') => kinds[3] = true,
                t if t.ends_with('.') => kinds[2] = true,
                _ => kinds[1] = true,
            }
            assert_eq!(parse_length(&tb, &text), Some(len), "len {} as '{}'", len, text);
        }
        assert!(kinds.iter().all(|&k| k));
    }
}
