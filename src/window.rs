use std::fmt;

/// Years covered by a single API request.
pub const WINDOW_YEARS: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWindow {
    pub start: i32,
    pub end: i32,
}

impl YearWindow {
    /// Windows of `size` years stepping from `min_year` while the start is
    /// still <= `max_year`. The last window runs past `max_year` unless
    /// `clamp` is set.
    pub fn span(min_year: i32, max_year: i32, size: i32, clamp: bool) -> Vec<YearWindow> {
        if size <= 0 || min_year > max_year {
            return Vec::new();
        }

        let mut out = Vec::new();
        let mut start = min_year;
        while start <= max_year {
            let mut end = start.saturating_add(size - 1);
            if clamp && end > max_year {
                end = max_year;
            }
            out.push(YearWindow { start, end });
            match start.checked_add(size) {
                Some(next) => start = next,
                None => break,
            }
        }
        out
    }

    /// Number of requests `span` issues for one series.
    pub fn request_count(min_year: i32, max_year: i32, size: i32) -> usize {
        if size <= 0 || min_year > max_year {
            return 0;
        }
        let years = (i64::from(max_year) - i64::from(min_year) + 1) as u64;
        years.div_ceil(size as u64) as usize
    }
}

impl fmt::Display for YearWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
