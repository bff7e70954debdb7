//! Combinators and terminals.
//!
//! Every combinator saves the position it started at and puts it back when it
//! reports [`Failure::Miss`], so a caller can always try an alternative from the
//! same place. [`Failure::Halt`] passes straight through all of them.

use nom::IResult;

use super::{Failure, Grammar, Parser, Step};

/// One branch of an ordered choice
pub type Alternative<G, T> = fn(&mut Parser<'_, G>) -> Step<T>;

impl<'src, G: Grammar> Parser<'src, G> {
    // === Terminals ===

    /// Match `text` exactly
    pub fn literal(&mut self, text: &str) -> Step<()> {
        if self.rest().starts_with(text) {
            self.pos += text.len();
            Ok(())
        } else {
            self.fail()
        }
    }

    /// Run a nom recognizer against the unconsumed input and consume what it matched
    pub fn scan<F>(&mut self, recognizer: F) -> Step<&'src str>
    where
        F: FnOnce(&'src str) -> IResult<&'src str, &'src str>,
    {
        let rest = self.rest();
        match recognizer(rest) {
            Ok((remaining, matched)) => {
                self.pos += rest.len() - remaining.len();
                Ok(matched)
            }
            Err(_) => self.fail(),
        }
    }

    /// Consume one code point satisfying `predicate`
    pub fn char_where(&mut self, predicate: impl FnOnce(char) -> bool) -> Step<char> {
        match self.rest().chars().next() {
            Some(c) if predicate(c) => {
                self.pos += c.len_utf8();
                Ok(c)
            }
            _ => self.fail(),
        }
    }

    /// Consume any one code point
    pub fn any_char(&mut self) -> Step<char> {
        self.char_where(|_| true)
    }

    // === Combinators ===

    /// Ordered choice: the first alternative that succeeds wins
    pub fn first_of<T>(&mut self, alternatives: &[Alternative<G, T>]) -> Step<T> {
        let start = self.pos;
        for alternative in alternatives {
            match alternative(self) {
                Err(Failure::Miss) => self.pos = start,
                done => return done,
            }
        }
        Err(Failure::Miss)
    }

    /// Sequence: run `body`, rewinding to the start if any part of it misses
    pub fn sequence<T>(&mut self, body: impl FnOnce(&mut Self) -> Step<T>) -> Step<T> {
        let start = self.pos;
        let result = body(self);
        if let Err(Failure::Miss) = result {
            self.pos = start;
        }
        result
    }

    /// Zero or more, greedily. Stops after an item that consumed nothing.
    pub fn many<T>(&mut self, mut item: impl FnMut(&mut Self) -> Step<T>) -> Step<Vec<T>> {
        let mut items = Vec::new();
        loop {
            let start = self.pos;
            match item(self) {
                Ok(value) => {
                    items.push(value);
                    if self.pos == start {
                        break;
                    }
                }
                Err(Failure::Miss) => {
                    self.pos = start;
                    break;
                }
                Err(halt) => return Err(halt),
            }
        }
        Ok(items)
    }

    /// Between `min` and `max` items, greedily
    pub fn repeat_between<T>(
        &mut self,
        min: usize,
        max: usize,
        mut item: impl FnMut(&mut Self) -> Step<T>,
    ) -> Step<Vec<T>> {
        let start = self.pos;
        let mut items = Vec::new();
        while items.len() < max {
            let before = self.pos;
            match item(self) {
                Ok(value) => items.push(value),
                Err(Failure::Miss) => {
                    self.pos = before;
                    break;
                }
                Err(halt) => return Err(halt),
            }
        }
        if items.len() < min {
            self.pos = start;
            return Err(Failure::Miss);
        }
        Ok(items)
    }

    /// Zero or one
    pub fn optional<T>(&mut self, item: impl FnOnce(&mut Self) -> Step<T>) -> Step<Option<T>> {
        let start = self.pos;
        match item(self) {
            Ok(value) => Ok(Some(value)),
            Err(Failure::Miss) => {
                self.pos = start;
                Ok(None)
            }
            Err(halt) => Err(halt),
        }
    }

    /// Negative lookahead: succeeds, consuming nothing, exactly when `item` misses
    pub fn not_ahead<T>(&mut self, item: impl FnOnce(&mut Self) -> Step<T>) -> Step<()> {
        let start = self.pos;
        match item(self) {
            Ok(_) => {
                self.pos = start;
                self.fail()
            }
            Err(Failure::Miss) => {
                self.pos = start;
                Ok(())
            }
            Err(halt) => Err(halt),
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use nom::Parser as _;
    use nom::bytes::complete::tag;
    use nom::character::complete::alpha1;
    use nom::combinator::recognize;
    use nom::sequence::pair;

    use crate::ParseConfig;
    use crate::engine::{Capture, Failure, Grammar, Parser, Step};

    /// Grammar with no rules of its own; the tests drive combinators directly
    struct Bare;

    impl Grammar for Bare {
        type Rule = ();

        fn invoke(_: &mut Parser<'_, Self>, _: (), _: &[u32]) -> Step<Capture> {
            Ok(Capture::Unit)
        }
    }

    fn parser(text: &str) -> Parser<'_, Bare> {
        Parser::new(text, ParseConfig::default())
    }

    fn letter_a(p: &mut Parser<'_, Bare>) -> Step<char> {
        p.char_where(|c| c == 'a')
    }

    fn letter_b(p: &mut Parser<'_, Bare>) -> Step<char> {
        p.char_where(|c| c == 'b')
    }

    fn a_then_b(p: &mut Parser<'_, Bare>) -> Step<char> {
        p.sequence(|p| {
            p.literal("a")?;
            letter_b(p)
        })
    }

    #[test]
    fn test_terminals() {
        let mut p = parser("héllo world");
        assert_eq!(p.literal("hé"), Ok(()));
        assert_eq!(p.pos(), 3);
        assert_eq!(p.literal("x"), Err(Failure::Miss));
        assert_eq!(p.pos(), 3);
        assert_eq!(p.scan(|s| alpha1(s)), Ok("llo"));
        assert_eq!(p.any_char(), Ok(' '));
        assert_eq!(
            p.scan(|s| recognize(pair(tag("wor"), tag("ld"))).parse(s)),
            Ok("world")
        );
        assert!(p.at_end());
        assert_eq!(p.any_char(), Err(Failure::Miss));
    }

    #[test]
    fn test_first_of_rewinds_between_alternatives() {
        let mut p = parser("ac");
        // a_then_b consumes "a" before missing; letter_a must still see the "a"
        assert_eq!(p.first_of(&[a_then_b, letter_a]), Ok('a'));
        assert_eq!(p.pos(), 1);

        let mut p = parser("zz");
        assert_eq!(p.first_of(&[a_then_b, letter_a]), Err(Failure::Miss));
        assert_eq!(p.pos(), 0);
    }

    #[test]
    fn test_many_and_bounds() {
        let mut p = parser("aaab");
        assert_eq!(p.many(letter_a).unwrap().len(), 3);
        assert_eq!(p.many(letter_a).unwrap().len(), 0);
        assert_eq!(p.pos(), 3);

        let mut p = parser("aaaaa");
        assert_eq!(p.repeat_between(1, 3, letter_a).unwrap().len(), 3);
        assert_eq!(p.pos(), 3);
        assert_eq!(p.repeat_between(3, 4, letter_a), Err(Failure::Miss));
        assert_eq!(p.pos(), 3);
        assert_eq!(p.repeat_between(0, 4, letter_a).unwrap().len(), 2);
        assert!(p.at_end());
    }

    #[test]
    fn test_many_stops_on_empty_match() {
        let mut p = parser("b");
        let items = p.many(|p| p.optional(letter_a)).unwrap();
        assert_eq!(items, vec![None]);
        assert_eq!(p.pos(), 0);
    }

    #[test]
    fn test_lookahead_and_optional() {
        let mut p = parser("ab");
        assert_eq!(p.not_ahead(letter_b), Ok(()));
        assert_eq!(p.not_ahead(letter_a), Err(Failure::Miss));
        assert_eq!(p.pos(), 0);
        assert_eq!(p.optional(letter_b), Ok(None));
        assert_eq!(p.optional(letter_a), Ok(Some('a')));

        let mut end = parser("");
        assert_eq!(end.not_ahead(|p| p.any_char()), Ok(()));
    }
}
