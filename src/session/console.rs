//! Console seam for the session controller.
//!
//! All prompts, tables and error lines go through [`Console`], and input
//! arrives one line at a time, so the whole transition table can be driven
//! by scripted input in tests without a terminal.

use std::io::{self, BufRead, Write};

pub trait Console {
    /// Prints `prompt` without a trailing newline and reads one input line.
    /// `Ok(None)` means end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    /// Writes text as-is, without appending a newline.
    fn write(&mut self, text: &str);

    /// Writes one full line.
    fn write_line(&mut self, line: &str);
}

/// Console over real stdin/stdout.
pub struct StdConsole;

impl Console for StdConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn write(&mut self, text: &str) {
        print!("{text}");
        let _ = io::stdout().flush();
    }

    fn write_line(&mut self, line: &str) {
        println!("{line}");
    }
}

/// Scripted console for controller tests: canned input lines, captured
/// output.
#[cfg(test)]
pub struct ScriptedConsole {
    inputs: std::collections::VecDeque<String>,
    pub output: String,
}

#[cfg(test)]
impl ScriptedConsole {
    pub fn with_inputs(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            output: String::new(),
        }
    }

    pub fn count_lines_containing(&self, needle: &str) -> usize {
        self.output
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }
}

#[cfg(test)]
impl Console for ScriptedConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.output.push_str(prompt);
        Ok(self.inputs.pop_front())
    }

    fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn write_line(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }
}
