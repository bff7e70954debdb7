//! Failure reports.
//!
//! A [`ParseFailure`] is a snapshot of where a parse went wrong: the furthest
//! (rule, offset) the engine recorded, resolved against the source text into a
//! line, a column and the offending line itself. All renderings are derived from
//! those fields, so a failure can outlive the input it came from.

use std::fmt;

use crate::ParseErrorKind;
use crate::engine::Halt;
use crate::grammar::Rule;
use crate::input::Input;

/// Where and why a parse failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub kind: ParseErrorKind,
    /// The rule blamed for the failure
    pub rule: Rule,
    /// Byte offset into the input
    pub offset: usize,
    /// 1-based
    pub line: usize,
    /// 1-based, in code points
    pub column: usize,
    /// The source line containing the failure, without its terminator
    pub source_line: String,
    /// The code point at the failure offset; `None` at end of input
    pub found: Option<char>,
}

impl ParseFailure {
    pub(crate) fn new(kind: ParseErrorKind, rule: Rule, offset: usize, input: Input<'_>) -> Self {
        let offset = offset.min(input.len());
        let location = input.location(offset);
        ParseFailure {
            kind,
            rule,
            offset,
            line: location.line,
            column: location.column,
            source_line: input.line_text(offset).to_owned(),
            found: input.char_at(offset),
        }
    }

    /// A rule or terminal missed. Failures at the end of the input mean the text
    /// stopped short rather than going wrong.
    pub(crate) fn syntax(rule: Rule, offset: usize, input: Input<'_>) -> Self {
        let kind = if offset >= input.len() {
            ParseErrorKind::Incomplete
        } else {
            ParseErrorKind::InvalidSyntax
        };
        ParseFailure::new(kind, rule, offset, input)
    }

    /// The parse was aborted
    pub(crate) fn halted(halt: Halt, rule: Rule, offset: usize, input: Input<'_>) -> Self {
        let kind = match halt {
            Halt::DepthExceeded { .. } => ParseErrorKind::TooDeeplyNested,
            Halt::StepsExhausted { .. } | Halt::CaptureMismatch { .. } => {
                ParseErrorKind::ImplementationLimit
            }
        };
        ParseFailure::new(kind, rule, offset, input)
    }

    pub fn rule_name(&self) -> &'static str {
        self.rule.name()
    }

    /// The definition of the blamed rule
    pub fn rendered(&self) -> &'static str {
        self.rule.rendered()
    }

    fn found_text(&self) -> String {
        match self.found {
            Some(c) => c.escape_debug().to_string(),
            None => "end of input".to_owned(),
        }
    }

    /// `"<kind>: "` for aborted parses, empty for ordinary syntax failures
    fn halt_prefix(&self) -> String {
        match self.kind {
            ParseErrorKind::TooDeeplyNested | ParseErrorKind::ImplementationLimit => {
                format!("{}: ", self.kind.describe())
            }
            _ => String::new(),
        }
    }

    /// The source line with a caret under the failing column
    pub fn caret(&self) -> String {
        format!(
            "{}\n{}^",
            self.source_line,
            " ".repeat(self.column.saturating_sub(1))
        )
    }

    /// `@line:column failed rule 'name', got 'c'`, led by the kind when the
    /// parse was aborted
    pub fn oneline(&self) -> String {
        format!(
            "{}@{}:{} failed rule '{}', got '{}'",
            self.halt_prefix(),
            self.line,
            self.column,
            self.rule_name(),
            self.found_text()
        )
    }

    /// Multi-line report for humans
    pub fn report(&self) -> String {
        let mut lines = vec![
            format!("On line {}, column {}:", self.line, self.column),
            format!("  {}", self.kind.describe()),
            format!(
                "  failed to match rule '{}' = {}",
                self.rule_name(),
                self.rendered()
            ),
            format!("  got: {}", self.found_text()),
        ];
        lines.extend(self.caret().lines().map(|line| format!("  {line}")));
        lines.join("\n")
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}line {}, column {}: failed rule '{}' = '{}'",
            self.halt_prefix(),
            self.line,
            self.column,
            self.rule_name(),
            self.rendered()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure_at(text: &str, offset: usize) -> ParseFailure {
        ParseFailure::syntax(Rule::List, offset, Input::new(text))
    }

    #[test]
    fn test_failure_at_end_is_incomplete() {
        let failure = failure_at("(a b", 4);
        assert_eq!(failure.kind, ParseErrorKind::Incomplete);
        assert_eq!((failure.line, failure.column), (1, 5));
        assert_eq!(failure.found, None);
        assert_eq!(failure.caret(), "(a b\n    ^");
        assert_eq!(failure.oneline(), "@1:5 failed rule 'list', got 'end of input'");
        assert_eq!(
            failure.to_string(),
            r#"line 1, column 5: failed rule 'list' = '"(" skip pairs skip ")"'"#
        );
    }

    #[test]
    fn test_failure_inside_input() {
        let failure = failure_at("(a\n  ] b)", 5);
        assert_eq!(failure.kind, ParseErrorKind::InvalidSyntax);
        assert_eq!((failure.line, failure.column), (2, 3));
        assert_eq!(failure.source_line, "  ] b)");
        assert_eq!(failure.found, Some(']'));
        assert_eq!(failure.caret(), "  ] b)\n  ^");
        assert_eq!(failure.oneline(), "@2:3 failed rule 'list', got ']'");
    }

    #[test]
    fn test_report_lists_everything() {
        let report = failure_at("(x\ty", 2).report();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "On line 1, column 3:");
        assert_eq!(lines[1], "  invalid syntax");
        assert!(lines[2].contains("'list'"));
        assert_eq!(lines[3], r"  got: \t");
        assert_eq!(lines[4], "  (x\ty");
        assert_eq!(lines[5], "    ^");
    }

    #[test]
    fn test_halts_map_to_kinds() {
        let input = Input::new("((");
        let deep = ParseFailure::halted(Halt::DepthExceeded { limit: 2 }, Rule::List, 1, input);
        assert_eq!(deep.kind, ParseErrorKind::TooDeeplyNested);
        let budget = ParseFailure::halted(Halt::StepsExhausted { limit: 9 }, Rule::Root, 0, input);
        assert_eq!(budget.kind, ParseErrorKind::ImplementationLimit);
    }

    #[test]
    fn test_halted_renderings_name_the_limit() {
        let input = Input::new("((");
        let deep = ParseFailure::halted(Halt::DepthExceeded { limit: 2 }, Rule::List, 1, input);
        assert_eq!(
            deep.to_string(),
            r#"expression too deeply nested: line 1, column 2: failed rule 'list' = '"(" skip pairs skip ")"'"#
        );
        assert_eq!(
            deep.oneline(),
            "expression too deeply nested: @1:2 failed rule 'list', got '('"
        );

        let budget = ParseFailure::halted(Halt::StepsExhausted { limit: 9 }, Rule::Root, 0, input);
        assert!(budget.to_string().starts_with("parse step budget exhausted: line 1, column 1:"));
        assert!(budget.oneline().starts_with("parse step budget exhausted: @1:1"));

        // ordinary failures keep the bare form
        assert!(failure_at("((", 2).to_string().starts_with("line 1"));
    }
}
