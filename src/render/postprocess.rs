//! Output post-processing.

use thiserror::Error;

/// Errors raised by a post-processor.
#[derive(Debug, Error)]
pub enum PostProcessError {
    #[error("post-processor '{name}' failed: {reason}")]
    Failed { name: &'static str, reason: String },
}

/// Rewrites rendered text before it is handed to nginx.
pub trait PostProcessor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Transform the raw configuration.
    fn process(&self, raw: &str) -> Result<String, PostProcessError>;
}

/// Collapses runs of blank lines into a single blank line.
///
/// Lines holding only whitespace count as blank and are emptied.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqueezeBlankLines;

impl PostProcessor for SqueezeBlankLines {
    fn name(&self) -> &'static str {
        "squeeze-blank-lines"
    }

    fn process(&self, raw: &str) -> Result<String, PostProcessError> {
        let mut out = String::with_capacity(raw.len());
        let mut previous_blank = false;

        for line in raw.lines() {
            let blank = line.trim().is_empty();
            if blank && previous_blank {
                continue;
            }
            if !blank {
                out.push_str(line);
            }
            out.push('\n');
            previous_blank = blank;
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squeeze_blank_lines() {
        let raw = "a;\n\n\n   \nb;\n\t\nc;\n";
        let squeezed = SqueezeBlankLines.process(raw).unwrap();
        assert_eq!(squeezed, "a;\n\nb;\n\nc;\n");
    }

    #[test]
    fn test_squeeze_keeps_indentation() {
        let raw = "http {\n    x;\n}\n";
        assert_eq!(SqueezeBlankLines.process(raw).unwrap(), raw);
    }
}
