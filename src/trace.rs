//! Numbered lowering trace.
//!
//! Each step gets the next sequence number, starting at 1, whether or not
//! the lines are being kept. Steps also go to the `log` facade at debug
//! level so an embedding application can route them.

#[derive(Clone, Debug, Default)]
pub struct Trace {
    enabled: bool,
    count: usize,
    lines: Vec<String>,
}

impl Trace {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            count: 0,
            lines: Vec::new(),
        }
    }

    pub fn step(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.count += 1;
        log::debug!("{}. {}", self.count, message);
        if self.enabled {
            let number = format!("{}.", self.count);
            self.lines.push(format!("{:<5}{}", number, message));
        }
    }

    /// Steps recorded so far, enabled or not.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}
