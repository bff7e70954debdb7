//! Packrat engine with support for directly left-recursive rules.
//!
//! A [`Parser`] owns everything one parse call needs: the input, the current
//! position, the memo table and the furthest-failure record. Rule bodies live in a
//! [`Grammar`] and call back into the parser through [`Parser::apply`] for sub-rules
//! and through the combinators in [`combinators`] for everything else.
//!
//! ## Memo entries
//!
//! Every application is keyed by (rule, arguments, position). An entry is in one of
//! two states:
//!
//! - **in progress**: the rule body is currently running at this position. Hitting
//!   such an entry means the rule re-entered itself without consuming input; the
//!   entry's marker is flagged and the inner application fails.
//! - **settled**: the body finished; the outcome and the end position are replayed
//!   on every later hit.
//!
//! ## Growing left recursion
//!
//! When a body succeeds and its marker was flagged while it ran, the first answer
//! becomes a seed. The body is re-run from the same start with the seed stored in
//! the entry, so the recursive self-application now succeeds and the body can
//! extend it. This repeats while each attempt ends strictly further than the last;
//! the longest answer is kept. Rules that never re-enter themselves run once.
//!
//! ## Recursion
//!
//! Rule bodies call each other recursively, one Rust call chain per nested rule.
//! Each body runs through `stacker`, which switches to a new stack segment when
//! the current one runs low, so deep nesting and long lists cannot overflow the
//! caller's thread stack. `ParseConfig::max_depth` is an optional policy bound on
//! top of that.
//!
//! ## Failures
//!
//! Two kinds of failure travel through [`Step`]: [`Failure::Miss`] is ordinary
//! backtracking and is recovered by choice, repetition and lookahead, while
//! [`Failure::Halt`] aborts the whole parse (resource limits, internal capture
//! mismatches) and is never recovered.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::ParseConfig;
use crate::ast::Value;
use crate::input::Input;

pub mod combinators;

/// Remaining stack below which a rule body runs on a freshly allocated segment
const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each extra stack segment
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

/// Integer arguments of a parameterized rule. Empty for ordinary rules.
pub type RuleArgs = SmallVec<[u32; 3]>;

/// Result of running a rule body or combinator
pub type Step<T> = Result<T, Failure>;

/// A set of rule bodies the engine can apply
pub trait Grammar: Sized {
    /// One tag per production
    type Rule: Copy + Eq + Hash + Debug;

    /// Run the body of `rule` at the parser's current position
    fn invoke(parser: &mut Parser<'_, Self>, rule: Self::Rule, args: &[u32]) -> Step<Capture>;
}

/// Why a parse was aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// Rule bodies nested deeper than the configured limit
    DepthExceeded { limit: usize },
    /// More rule applications than the configured budget
    StepsExhausted { limit: usize },
    /// A rule produced a different kind of capture than its caller expected
    CaptureMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Failure of a rule, combinator or terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Recoverable: the caller may rewind and try something else
    Miss,
    /// Unrecoverable: the parse stops
    Halt(Halt),
}

/// Output of a rule body
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    Unit,
    Text(String),
    Value(Value),
    Values(Vec<Value>),
}

impl Capture {
    fn kind(&self) -> &'static str {
        match self {
            Capture::Unit => "unit",
            Capture::Text(_) => "text",
            Capture::Value(_) => "value",
            Capture::Values(_) => "values",
        }
    }

    fn mismatch(&self, expected: &'static str) -> Failure {
        Failure::Halt(Halt::CaptureMismatch {
            expected,
            found: self.kind(),
        })
    }

    pub fn into_value(self) -> Step<Value> {
        match self {
            Capture::Value(value) => Ok(value),
            other => Err(other.mismatch("value")),
        }
    }

    pub fn into_text(self) -> Step<String> {
        match self {
            Capture::Text(text) => Ok(text),
            other => Err(other.mismatch("text")),
        }
    }

    pub fn into_values(self) -> Step<Vec<Value>> {
        match self {
            Capture::Values(values) => Ok(values),
            other => Err(other.mismatch("values")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoKey<R> {
    rule: R,
    args: RuleArgs,
    pos: usize,
}

/// Marker installed while a rule body runs
#[derive(Debug, Clone, Copy, Default)]
struct LeftRecursion {
    detected: bool,
}

#[derive(Debug, Clone)]
enum Answer {
    InProgress(LeftRecursion),
    /// `None` is a settled failure
    Settled(Option<Capture>),
}

#[derive(Debug, Clone)]
struct MemoEntry {
    answer: Answer,
    end: usize,
    uses: usize,
}

impl MemoEntry {
    fn in_progress(pos: usize) -> Self {
        MemoEntry {
            answer: Answer::InProgress(LeftRecursion::default()),
            end: pos,
            uses: 1,
        }
    }

    fn left_recursion_detected(&self) -> bool {
        matches!(self.answer, Answer::InProgress(LeftRecursion { detected: true }))
    }

    fn settle(&mut self, outcome: Option<Capture>, end: usize) {
        self.answer = Answer::Settled(outcome);
        self.end = end;
    }
}

/// Furthest point any rule or terminal failed at during one parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureState<R> {
    furthest: Option<(R, usize)>,
}

impl<R: Copy> FailureState<R> {
    fn new() -> Self {
        FailureState { furthest: None }
    }

    /// Equal offsets replace the record, so an enclosing rule failing where an inner
    /// one failed takes over the report.
    fn record(&mut self, rule: R, offset: usize) {
        match self.furthest {
            Some((_, furthest)) if offset < furthest => {}
            _ => self.furthest = Some((rule, offset)),
        }
    }

    pub fn furthest(&self) -> Option<(R, usize)> {
        self.furthest
    }

    pub fn offset(&self) -> usize {
        self.furthest.map_or(0, |(_, offset)| offset)
    }
}

/// Where and why a parse was aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halted<R> {
    pub halt: Halt,
    pub rule: Option<R>,
    pub offset: usize,
}

/// Counters describing the work done by one parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Calls to `apply`, including memo hits
    pub applications: usize,
    /// Rule bodies actually executed, including growth re-runs
    pub invocations: usize,
    /// Applications answered from the memo table
    pub memo_hits: usize,
    /// Distinct (rule, args, position) keys in the memo table
    pub memo_entries: usize,
    /// Memo markers flagged as left-recursive
    pub left_recursions: usize,
    /// Re-runs of left-recursive bodies while growing a seed
    pub growth_iterations: usize,
    /// Uses of the busiest memo entry
    pub max_entry_uses: usize,
}

/// State of one parse call
pub struct Parser<'src, G: Grammar> {
    input: Input<'src>,
    pos: usize,
    memo: HashMap<MemoKey<G::Rule>, MemoEntry>,
    failure: FailureState<G::Rule>,
    /// Innermost rule whose body is running
    current: Option<G::Rule>,
    depth: usize,
    config: ParseConfig,
    stats: ParseStats,
    halted: Option<Halted<G::Rule>>,
}

impl<'src, G: Grammar> Parser<'src, G> {
    pub fn new(text: &'src str, config: ParseConfig) -> Self {
        Parser {
            input: Input::new(text),
            pos: 0,
            memo: HashMap::new(),
            failure: FailureState::new(),
            current: None,
            depth: 0,
            config,
            stats: ParseStats::default(),
            halted: None,
        }
    }

    pub fn input(&self) -> Input<'src> {
        self.input
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Move back to a previously saved position
    pub fn restore(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Unconsumed input
    pub fn rest(&self) -> &'src str {
        self.input.rest(self.pos)
    }

    /// Text consumed since `start`
    pub fn text_since(&self, start: usize) -> &'src str {
        self.input.slice(start, self.pos)
    }

    pub fn failure(&self) -> &FailureState<G::Rule> {
        &self.failure
    }

    pub fn halted(&self) -> Option<&Halted<G::Rule>> {
        self.halted.as_ref()
    }

    pub fn stats(&self) -> ParseStats {
        let mut stats = self.stats;
        stats.memo_entries = self.memo.len();
        stats.max_entry_uses = self.memo.values().map(|entry| entry.uses).max().unwrap_or(0);
        stats
    }

    /// Record a failure of the innermost running rule at the current position
    pub fn fail<T>(&mut self) -> Step<T> {
        if let Some(rule) = self.current {
            self.failure.record(rule, self.pos);
        }
        Err(Failure::Miss)
    }

    /// Record an abort. The first abort wins; it is the one that unwinds the parse.
    fn halt(&mut self, halt: Halt, rule: Option<G::Rule>) -> Failure {
        if self.halted.is_none() {
            warn!(?halt, ?rule, offset = self.pos, "parse aborted");
            self.halted = Some(Halted {
                halt,
                rule,
                offset: self.pos,
            });
        }
        Failure::Halt(halt)
    }

    /// Apply an ordinary rule at the current position
    pub fn apply(&mut self, rule: G::Rule) -> Step<Capture> {
        self.apply_with(rule, &[])
    }

    /// Apply a rule that must produce a value
    pub fn apply_value(&mut self, rule: G::Rule) -> Step<Value> {
        self.apply(rule)?.into_value()
    }

    /// Apply a rule that must produce text
    pub fn apply_text(&mut self, rule: G::Rule) -> Step<String> {
        self.apply(rule)?.into_text()
    }

    /// Apply a (possibly parameterized) rule at the current position, through the memo
    /// table.
    pub fn apply_with(&mut self, rule: G::Rule, args: &[u32]) -> Step<Capture> {
        self.stats.applications += 1;
        if let Some(limit) = self.config.max_steps
            && self.stats.applications > limit
        {
            return Err(self.halt(Halt::StepsExhausted { limit }, Some(rule)));
        }

        let key = MemoKey {
            rule,
            args: RuleArgs::from_slice(args),
            pos: self.pos,
        };

        if let Some(entry) = self.memo.get_mut(&key) {
            entry.uses += 1;
            self.stats.memo_hits += 1;
            return match &mut entry.answer {
                Answer::InProgress(marker) => {
                    if !marker.detected {
                        self.stats.left_recursions += 1;
                        trace!(?rule, pos = key.pos, "left recursion detected");
                    }
                    marker.detected = true;
                    Err(Failure::Miss)
                }
                Answer::Settled(outcome) => {
                    self.pos = entry.end;
                    outcome.clone().ok_or(Failure::Miss)
                }
            };
        }

        let start = self.pos;
        self.memo.insert(key.clone(), MemoEntry::in_progress(start));

        let outcome = match self.invoke(rule, args) {
            Ok(capture) => Some(capture),
            Err(Failure::Miss) => None,
            Err(halt) => return Err(halt),
        };

        let end = self.pos;
        let entry = self
            .memo
            .entry(key.clone())
            .or_insert_with(|| MemoEntry::in_progress(start));
        let detected = entry.left_recursion_detected();
        entry.settle(outcome.clone(), end);

        match outcome {
            // no seed when the first attempt fails, so nothing to grow
            Some(seed) if detected => self.grow(&key, start, seed),
            Some(capture) => Ok(capture),
            None => Err(Failure::Miss),
        }
    }

    /// Re-run a left-recursive body until its answer stops getting longer
    fn grow(&mut self, key: &MemoKey<G::Rule>, start: usize, seed: Capture) -> Step<Capture> {
        let mut best = seed;
        let mut end = self.pos;
        let mut iterations = 0usize;

        loop {
            self.pos = start;
            iterations += 1;
            self.stats.growth_iterations += 1;

            match self.invoke(key.rule, &key.args) {
                Ok(capture) if self.pos > end => {
                    end = self.pos;
                    best = capture;
                    if let Some(entry) = self.memo.get_mut(key) {
                        entry.settle(Some(best.clone()), end);
                    }
                }
                Ok(_) | Err(Failure::Miss) => break,
                Err(halt) => return Err(halt),
            }
        }

        debug!(rule = ?key.rule, start, end, iterations, "left recursion grown");
        self.pos = end;
        Ok(best)
    }

    /// Run a rule body directly, bypassing the memo table.
    ///
    /// A failing body is rewound to its start and recorded as a failure of `rule`.
    fn invoke(&mut self, rule: G::Rule, args: &[u32]) -> Step<Capture> {
        if let Some(limit) = self.config.max_depth
            && self.depth >= limit
        {
            return Err(self.halt(Halt::DepthExceeded { limit }, Some(rule)));
        }

        let start = self.pos;
        self.depth += 1;
        self.stats.invocations += 1;
        let caller = self.current.replace(rule);

        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            G::invoke(self, rule, args)
        });

        self.current = caller;
        self.depth -= 1;

        if let Err(Failure::Miss) = result {
            self.pos = start;
            self.failure.record(rule, start);
        }
        result
    }
}
