use std::time::{SystemTime, UNIX_EPOCH};

/// Largest supported fraction-of-second width (microseconds).
pub const MAX_FRACTION_DIGITS: u8 = 6;

/// How the prefix timestamp is rendered, captured once per emitted chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StampFormat {
    pub enabled: bool,
    pub fraction_digits: u8,
    pub with_date: bool,
}

impl StampFormat {
    pub const DISABLED: StampFormat = StampFormat {
        enabled: false,
        fraction_digits: 0,
        with_date: false,
    };

    /// Snapshot of the process-wide timestamp settings.
    pub fn current() -> StampFormat {
        StampFormat {
            enabled: crate::config::timestamp(),
            fraction_digits: crate::config::timestamp_fraction_digits(),
            with_date: crate::config::timestamp_date(),
        }
    }
}

/// Wall-clock time, already shifted into the rendering time zone.
///
/// # Examples
///
/// ```
/// use chanlog::ClockTime;
///
/// let time = ClockTime::from_unix(86_399, 123_456, 0);
/// let mut out = String::new();
/// time.write_clock(&mut out, 3, false);
/// assert_eq!(out, "23:59:59.123");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ClockTime {
    seconds: i64,
    micros: u32,
}

impl ClockTime {
    /// The current time in the local time zone (UTC without `local-time`).
    pub fn now() -> ClockTime {
        let (seconds, micros) = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => (since.as_secs() as i64, since.subsec_micros()),
            Err(before) => {
                let before = before.duration();
                let mut seconds = -(before.as_secs() as i64);
                let mut micros = before.subsec_micros();
                if micros > 0 {
                    seconds -= 1;
                    micros = 1_000_000 - micros;
                }
                (seconds, micros)
            }
        };
        ClockTime::from_unix(seconds, micros, local_offset_seconds(seconds))
    }

    /// Builds a clock time from seconds since the Unix epoch and a UTC offset.
    ///
    /// `micros` is clamped to `0..1_000_000`.
    pub fn from_unix(unix_seconds: i64, micros: u32, offset_seconds: i64) -> ClockTime {
        ClockTime {
            seconds: unix_seconds.saturating_add(offset_seconds),
            micros: micros.min(999_999),
        }
    }

    /// Appends `HH:MM:SS` (or `YYYY-MM-DD HH:MM:SS`) and, when
    /// `fraction_digits > 0`, a `.` followed by that many zero-padded digits
    /// of the second.
    pub fn write_clock(&self, out: &mut String, fraction_digits: u8, with_date: bool) {
        debug_assert!(fraction_digits <= MAX_FRACTION_DIGITS);
        let fraction_digits = fraction_digits.min(MAX_FRACTION_DIGITS);

        let days = self.seconds.div_euclid(SECONDS_PER_DAY);
        let today = self.seconds.rem_euclid(SECONDS_PER_DAY);

        if with_date {
            let Date(year, month, day) = to_date(days as i32);
            if year < 0 {
                out.push('-');
            }
            let year = year.unsigned_abs();
            push_2digit_number(out, (year / 100) as usize);
            push_2digit_number(out, (year % 100) as usize);
            out.push('-');
            push_2digit_number(out, month as usize);
            out.push('-');
            push_2digit_number(out, day as usize);
            out.push(' ');
        }

        push_2digit_number(out, (today / 3600) as usize);
        out.push(':');
        push_2digit_number(out, (today % 3600 / 60) as usize);
        out.push(':');
        push_2digit_number(out, (today % 60) as usize);

        if fraction_digits > 0 {
            let divider = 10u32.pow((MAX_FRACTION_DIGITS - fraction_digits) as u32);
            let fraction = self.micros / divider;
            let mut buffer = itoa::Buffer::new();
            let digits = buffer.format(fraction);
            out.push('.');
            for _ in digits.len()..fraction_digits as usize {
                out.push('0');
            }
            out.push_str(digits);
        }
    }

    /// Length in bytes of what [`ClockTime::write_clock`] appends for years
    /// 0 through 9999.
    pub const fn rendered_len(fraction_digits: u8, with_date: bool) -> usize {
        let clock = if with_date { 10 + 1 + 8 } else { 8 };
        if fraction_digits == 0 {
            clock
        } else {
            clock + 1 + fraction_digits as usize
        }
    }
}

#[cfg(feature = "local-time")]
fn local_offset_seconds(unix_seconds: i64) -> i64 {
    match jiff::Timestamp::from_second(unix_seconds) {
        Ok(timestamp) => jiff::tz::TimeZone::system()
            .to_offset(timestamp)
            .seconds() as i64,
        Err(_) => 0,
    }
}

#[cfg(not(feature = "local-time"))]
fn local_offset_seconds(_unix_seconds: i64) -> i64 {
    0
}

const SECONDS_PER_DAY: i64 = 86_400;

// Precomputed lookup table for formatting two decimal digits (00-99) quickly.
#[rustfmt::skip]
const DEC_DIGITS_LUT: &[u8; 200] = b"\
    0001020304050607080910111213141516171819\
    2021222324252627282930313233343536373839\
    4041424344454647484950515253545556575859\
    6061626364656667686970717273747576777879\
    8081828384858687888990919293949596979899";

fn push_2digit_number(out: &mut String, value: usize) {
    let index = (value % 100) * 2;
    out.push(DEC_DIGITS_LUT[index] as char);
    out.push(DEC_DIGITS_LUT[index + 1] as char);
}

struct Date(i32, u32, u32);

/// Converts days since 1970-01-01 into a proleptic Gregorian date.
fn to_date(n_u: i32) -> Date {
    const S: u32 = 82;
    const K: u32 = 719468 + 146097 * S;
    const L: u32 = 400 * S;
    let n = (n_u as u32).wrapping_add(K);

    let n_1 = 4 * n + 3;
    let c = n_1 / 146097;
    let n_c = n_1 % 146097 / 4;

    let n_2 = 4 * n_c + 3;
    let p_2 = 2939745 as u64 * (n_2 as u64);
    let z = (p_2 >> 32) as u32;
    let n_y = (p_2 as u32) / (2939745 * 4);
    let y = 100 * c + z;

    let n_3 = 2141 * n_y + 197913;
    let m = n_3 >> 16;
    let d = (n_3 & 0xffff) / 2141;

    let j = n_y >= 306;
    let y_g = ((y - L) + (j as u32)) as i32;
    let m_g = if j { m - 12 } else { m };
    let d_g = d + 1;

    Date(y_g, m_g, d_g)
}

#[cfg(test)]
mod test {
    use super::*;

    fn render(time: ClockTime, fraction_digits: u8, with_date: bool) -> String {
        let mut out = String::new();
        time.write_clock(&mut out, fraction_digits, with_date);
        out
    }

    #[test]
    fn clock_fmt() {
        let epoch = ClockTime::from_unix(0, 0, 0);
        assert_eq!(render(epoch, 0, false), "00:00:00");
        assert_eq!(render(epoch, 0, true), "1970-01-01 00:00:00");
        assert_eq!(render(epoch, 6, true), "1970-01-01 00:00:00.000000");

        let before = ClockTime::from_unix(-1, 999_999, 0);
        assert_eq!(render(before, 6, true), "1969-12-31 23:59:59.999999");

        // 2025-04-17T09:56:52Z
        let spring = ClockTime::from_unix(1_744_883_812, 232_000, 0);
        assert_eq!(render(spring, 3, true), "2025-04-17 09:56:52.232");
        assert_eq!(render(spring, 1, false), "09:56:52.2");
    }

    #[test]
    fn fraction_is_zero_padded() {
        let time = ClockTime::from_unix(0, 5_000, 0);
        assert_eq!(render(time, 3, false), "00:00:00.005");
        assert_eq!(render(time, 4, false), "00:00:00.0050");
        assert_eq!(render(time, 2, false), "00:00:00.00");
        assert_eq!(render(ClockTime::from_unix(0, 7, 0), 6, false), "00:00:00.000007");
    }

    #[test]
    fn offset_shifts_the_clock() {
        let time = ClockTime::from_unix(0, 0, 2 * 3600 + 30 * 60);
        assert_eq!(render(time, 0, false), "02:30:00");
        let time = ClockTime::from_unix(0, 0, -3600);
        assert_eq!(render(time, 0, true), "1969-12-31 23:00:00");
    }

    #[test]
    fn rendered_len_matches_output() {
        let now = ClockTime::now();
        for digits in 0..=MAX_FRACTION_DIGITS {
            for with_date in [false, true] {
                assert_eq!(
                    render(now, digits, with_date).len(),
                    ClockTime::rendered_len(digits, with_date)
                );
            }
        }
    }
}
