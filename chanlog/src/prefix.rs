use crate::timestamp::{ClockTime, StampFormat};

/// Puts `[timestamp]label` at the start of every line.
///
/// Text arrives in arbitrary chunks; the prefixer remembers whether the last
/// chunk ended a line so a line split across calls is prefixed exactly once,
/// and an unfinished trailing fragment is never prefixed ahead of time.
///
/// ```
/// use chanlog::prefix::Prefixer;
/// use chanlog::StampFormat;
///
/// let mut prefixer = Prefixer::new("> ");
/// let plain = StampFormat::DISABLED;
/// assert_eq!(prefixer.add_prefix("one\ntw", &plain), "> one\n> tw");
/// assert_eq!(prefixer.add_prefix("o\n", &plain), "o\n");
/// assert_eq!(prefixer.add_prefix("three", &plain), "> three");
/// ```
#[derive(Debug, Clone)]
pub struct Prefixer {
    label: String,
    at_line_start: bool,
}

impl Prefixer {
    pub fn new(label: impl Into<String>) -> Prefixer {
        Prefixer {
            label: label.into(),
            at_line_start: true,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// True when the next chunk starts a new line.
    pub fn at_line_start(&self) -> bool {
        self.at_line_start
    }

    /// The prefix for a line starting now.
    pub fn prefix(&self, format: &StampFormat) -> String {
        let mut out = String::new();
        self.push_prefix(&mut out, format);
        out
    }

    fn push_prefix(&self, out: &mut String, format: &StampFormat) {
        if format.enabled {
            ClockTime::now().write_clock(out, format.fraction_digits, format.with_date);
        }
        out.push_str(&self.label);
    }

    /// Returns `text` with a prefix inserted at every line start.
    pub fn add_prefix(&mut self, text: &str, format: &StampFormat) -> String {
        if text.is_empty() {
            return String::new();
        }
        let mut out = String::with_capacity(text.len() + 32);
        for line in text.split_inclusive('\n') {
            if self.at_line_start {
                self.push_prefix(&mut out, format);
            }
            out.push_str(line);
            self.at_line_start = line.ends_with('\n');
        }
        out
    }
}
