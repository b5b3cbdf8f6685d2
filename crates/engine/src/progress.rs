// Encoder status line parsing
//
// ffmpeg prints a header block containing
//   Duration: 03:03:46.53, start: 0.000000, bitrate: 4753 kb/s
// followed by status lines that it keeps rewriting in place:
//   size=    3428kB time=00:04:14.63 bitrate= 110.3kbits/s speed=78.1x

/// Lines shorter than this carry no status fields.
const MIN_LINE_CHARS: usize = 5;

/// Shortest clock text worth splitting ("0:00:00").
const MIN_CLOCK_CHARS: usize = 7;

const DURATION_KEY: &str = "Duration";
const DURATION_MARKER: &str = "Duration:";
/// Offset from the start of `Duration` to the first clock digit ("Duration: ").
const DURATION_VALUE_OFFSET: usize = 10;
const TIME_KEY: &str = "time=";
const SPEED_KEY: &str = "speed=";

/// Progress fields derived from one job's encoder output.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressState {
    /// Total media duration in seconds, 0 until the `Duration:` line is seen
    pub duration_secs: f64,
    /// Most recent `time=` value in seconds
    pub elapsed_secs: f64,
    /// Most recent `speed=` multiplier
    pub speed: f64,
    /// `100 * elapsed / duration`, unclamped
    pub percent: f64,
}

impl ProgressState {
    fn recompute_percent(&mut self) {
        self.percent = if self.duration_secs > 0.0 {
            100.0 * (self.elapsed_secs / self.duration_secs)
        } else {
            0.0
        };
    }
}

/// Update `state` from one line of encoder output.
///
/// Never fails: a field whose text is missing or malformed is reset to 0.
/// When a line carries both `time=` and `Duration:`, the elapsed time is
/// applied first and the duration second.
pub fn parse_status_line(line: &str, state: &mut ProgressState) {
    if line.chars().count() < MIN_LINE_CHARS {
        return;
    }

    if let Some(pos) = line.find(TIME_KEY) {
        let start = pos + TIME_KEY.len();
        state.elapsed_secs = text_until(line, start, ' ')
            .and_then(parse_clock)
            .unwrap_or(0.0);
        state.speed = parse_speed(line).unwrap_or(0.0);
        state.recompute_percent();
    }

    if line.contains(DURATION_MARKER) {
        state.duration_secs = line
            .find(DURATION_KEY)
            .and_then(|pos| text_until(line, pos + DURATION_VALUE_OFFSET, ','))
            .and_then(parse_clock)
            .unwrap_or(0.0);
    }
}

/// Text from byte offset `start` up to (not including) the next `delim`.
/// `None` when the delimiter is missing or the slice would be empty.
fn text_until(line: &str, start: usize, delim: char) -> Option<&str> {
    let rest = line.get(start..)?;
    let end = rest.find(delim)?;
    if end == 0 {
        return None;
    }
    Some(&rest[..end])
}

/// `HH:MM:SS.ff` to seconds. Extra colon-separated parts are ignored.
fn parse_clock(text: &str) -> Option<f64> {
    if text.chars().count() < MIN_CLOCK_CHARS {
        return None;
    }
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() < 3 {
        return None;
    }
    let hours = parts[0].trim().parse::<i64>().ok()?;
    let minutes = parts[1].trim().parse::<i64>().ok()?;
    let seconds = parts[2].trim().parse::<f64>().ok()?;
    Some((hours * 3600 + minutes * 60) as f64 + seconds)
}

fn parse_speed(line: &str) -> Option<f64> {
    let start = line.find(SPEED_KEY)? + SPEED_KEY.len();
    let text = text_until(line, start, 'x')?.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_duration_line() {
        let mut state = ProgressState::default();
        parse_status_line(
            "  Duration: 01:02:03.45, start: 0.000000, bitrate: 4753 kb/s",
            &mut state,
        );
        assert!(approx(state.duration_secs, 3723.45));
        assert_eq!(state.elapsed_secs, 0.0);
        assert_eq!(state.percent, 0.0);
    }

    #[test]
    fn test_status_line_with_known_duration() {
        let mut state = ProgressState {
            duration_secs: 10.0,
            ..Default::default()
        };
        parse_status_line(
            "frame=100 fps=20 q=10 size=500kB time=00:00:05.00 bitrate=128kbits/s speed=2.0x",
            &mut state,
        );
        assert!(approx(state.elapsed_secs, 5.0));
        assert!(approx(state.speed, 2.0));
        assert!(approx(state.percent, 50.0));
    }

    #[test]
    fn test_speed_with_padding() {
        let mut state = ProgressState::default();
        parse_status_line(
            "size=    3428kB time=00:04:14.63 bitrate= 110.3kbits/s speed=78.1x",
            &mut state,
        );
        assert!(approx(state.elapsed_secs, 254.63));
        assert!(approx(state.speed, 78.1));
        // No duration yet
        assert_eq!(state.percent, 0.0);
    }

    #[test]
    fn test_empty_speed_is_zero() {
        let mut state = ProgressState {
            speed: 3.0,
            ..Default::default()
        };
        parse_status_line("size=1kB time=00:00:01.00 bitrate=1kbits/s speed=x", &mut state);
        assert_eq!(state.speed, 0.0);
        assert!(approx(state.elapsed_secs, 1.0));
    }

    #[test]
    fn test_missing_speed_is_zero() {
        let mut state = ProgressState {
            speed: 3.0,
            ..Default::default()
        };
        parse_status_line("size=1kB time=00:00:01.00 bitrate=1kbits/s", &mut state);
        assert_eq!(state.speed, 0.0);
    }

    #[test]
    fn test_unavailable_time_resets_elapsed() {
        let mut state = ProgressState {
            duration_secs: 100.0,
            elapsed_secs: 40.0,
            percent: 40.0,
            speed: 1.0,
        };
        parse_status_line("size=N/A time=N/A bitrate=N/A speed=N/A", &mut state);
        assert_eq!(state.elapsed_secs, 0.0);
        assert_eq!(state.speed, 0.0);
        assert_eq!(state.percent, 0.0);
        assert_eq!(state.duration_secs, 100.0);
    }

    #[test]
    fn test_time_at_end_of_line_resets_elapsed() {
        let mut state = ProgressState {
            elapsed_secs: 4.0,
            ..Default::default()
        };
        parse_status_line("frame=1 time=00:00:09.00", &mut state);
        assert_eq!(state.elapsed_secs, 0.0);
    }

    #[test]
    fn test_malformed_duration_resets() {
        let mut state = ProgressState {
            duration_secs: 50.0,
            ..Default::default()
        };
        parse_status_line("  Duration: N/A, start: 0.000000, bitrate: N/A", &mut state);
        assert_eq!(state.duration_secs, 0.0);

        state.duration_secs = 50.0;
        parse_status_line("  Duration: aa:bb:cc.dd, start: 0", &mut state);
        assert_eq!(state.duration_secs, 0.0);

        state.duration_secs = 50.0;
        parse_status_line("  Duration: 0123456789, start: 0", &mut state);
        assert_eq!(state.duration_secs, 0.0);
    }

    #[test]
    fn test_short_lines_are_ignored() {
        let before = ProgressState {
            duration_secs: 12.0,
            elapsed_secs: 6.0,
            speed: 1.5,
            percent: 50.0,
        };
        for line in ["", "x", "time", "t=1"] {
            let mut state = before;
            parse_status_line(line, &mut state);
            assert_eq!(state, before, "line {:?} changed state", line);
        }
    }

    #[test]
    fn test_both_fields_on_one_line() {
        let mut state = ProgressState::default();
        parse_status_line(
            "Duration: 00:00:20.00, start: 0 time=00:00:05.00 speed=1.0x",
            &mut state,
        );
        assert!(approx(state.duration_secs, 20.0));
        assert!(approx(state.elapsed_secs, 5.0));
        // Elapsed is applied before the duration on the same line
        assert_eq!(state.percent, 0.0);

        parse_status_line("time=00:00:05.00 speed=1.0x", &mut state);
        assert!(approx(state.percent, 25.0));
    }

    #[test]
    fn test_overshoot_is_not_clamped() {
        let mut state = ProgressState {
            duration_secs: 10.0,
            ..Default::default()
        };
        parse_status_line("size=1kB time=00:00:12.00 speed=1.0x", &mut state);
        assert!(approx(state.percent, 120.0));
    }

    #[test]
    fn test_non_ascii_line_does_not_panic() {
        let mut state = ProgressState::default();
        parse_status_line("Duration:é", &mut state);
        parse_status_line("Durationéé: 00:00:01.00, x", &mut state);
        parse_status_line("time=ééééééé speed=éx", &mut state);
    }
}
