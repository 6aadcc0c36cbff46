use super::{Annotation, AnnotationError};
use regex::Regex;
use tracing::{trace, warn};

/// How the body of an annotation is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    /// `<sentinel><id>(<body>)`
    Parenthesized,
    /// A line starting with `<sentinel><id>`, the rest of the line is the body.
    Line,
}

/// What separates two `key<field separator>value` pairs inside a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairSeparator {
    Char(char),
    Whitespace,
}

/// The concrete syntax of an annotation dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syntax {
    pub sentinel: char,
    pub block: Block,
    pub pair_separator: PairSeparator,
    pub field_separator: char,
}

impl Syntax {
    /// `@id(key,value;key,value)`
    pub fn csv() -> Self {
        Self {
            sentinel: '@',
            block: Block::Parenthesized,
            pair_separator: PairSeparator::Char(';'),
            field_separator: ',',
        }
    }

    /// `+id key,value key,value` on a line of its own.
    pub fn label() -> Self {
        Self {
            sentinel: '+',
            block: Block::Line,
            pair_separator: PairSeparator::Whitespace,
            field_separator: ',',
        }
    }
}

/// Extracts annotation records from free-form text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parser {
    syntax: Syntax,
}

impl Default for Parser {
    fn default() -> Self {
        Self::csv()
    }
}

impl Parser {
    pub fn new(syntax: Syntax) -> Self {
        Self { syntax }
    }

    pub fn csv() -> Self {
        Self::new(Syntax::csv())
    }

    pub fn label() -> Self {
        Self::new(Syntax::label())
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    /// Populate `record` from the first annotation in `text` carrying the
    /// record's identifier.
    ///
    /// Returns [`AnnotationError::NotPresent`] when `text` holds no such
    /// annotation. Later occurrences are ignored.
    pub fn parse<A>(&self, text: &str, record: &mut A) -> Result<(), AnnotationError>
    where
        A: Annotation + ?Sized,
    {
        let identifier = record.identifier().to_string();
        let pattern = self.pattern(&identifier)?;

        let mut occurrences = pattern.captures_iter(text);
        let first = occurrences
            .next()
            .ok_or_else(|| AnnotationError::NotPresent {
                identifier: identifier.clone(),
            })?;
        let ignored = occurrences.count();
        if ignored > 0 {
            warn!(%identifier, ignored, "Only the first annotation is used");
        }

        let body = first.get(1).map(|m| m.as_str()).unwrap_or_default();
        for token in self.pairs(body) {
            let Some((key, value)) = token.split_once(self.syntax.field_separator) else {
                trace!(%identifier, token, "Skipping token without a value");
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            let value = unquote(value.trim());

            if !record.assign(key, value)? {
                trace!(%identifier, key, "Ignoring unknown key");
            }
        }

        Ok(())
    }

    fn pattern(&self, identifier: &str) -> Result<Regex, AnnotationError> {
        let marker = regex::escape(&format!("{}{}", self.syntax.sentinel, identifier));
        let source = match self.syntax.block {
            Block::Parenthesized => format!(r"{marker}\(([^)]*)\)"),
            Block::Line => format!(r"(?m)^[ \t]*{marker}(?:[ \t]+([^\r\n]*?))?[ \t\r]*$"),
        };

        Regex::new(&source).map_err(|error| AnnotationError::Pattern {
            identifier: identifier.to_string(),
            error,
        })
    }

    fn pairs<'a>(&self, body: &'a str) -> Vec<&'a str> {
        match self.syntax.pair_separator {
            PairSeparator::Char(separator) => body.split(separator).collect(),
            PairSeparator::Whitespace => split_unquoted_whitespace(body),
        }
    }
}

/// Split on runs of whitespace that are not inside double quotes.
fn split_unquoted_whitespace(body: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    let mut quoted = false;

    for (index, c) in body.char_indices() {
        if c == '"' {
            quoted = !quoted;
        }
        if c.is_whitespace() && !quoted {
            if let Some(begin) = start.take() {
                tokens.push(&body[begin..index]);
            }
        } else if start.is_none() {
            start = Some(index);
        }
    }
    if let Some(begin) = start {
        tokens.push(&body[begin..]);
    }

    tokens
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    crate::annotation! {
        #[derive(Debug, PartialEq)]
        struct Test: "test" {
            name: String => "name",
            version: u32 => "version",
            enabled: Option<bool> => "enabled",
        }
    }

    crate::annotation! {
        #[derive(Debug)]
        struct Cool: "CoolAnnotation" {
            name: String => "name",
        }
    }

    #[test]
    fn parse_csv() {
        let mut record = Test::default();
        Parser::csv()
            .parse("@test(name,x;version,2)", &mut record)
            .unwrap();

        assert_eq!(
            record,
            Test {
                name: "x".to_string(),
                version: 2,
                enabled: None,
            }
        );
    }

    #[test]
    fn parse_from_a_comment_block() {
        let text = "/*\n * Loads the logo.\n * @test( name , \"logo\" ; version,3;enabled,true)\n */\nfn main() {}\n";
        let mut record = Test::default();
        Parser::csv().parse(text, &mut record).unwrap();

        assert_eq!(record.name, "logo");
        assert_eq!(record.version, 3);
        assert_eq!(record.enabled, Some(true));
    }

    #[test]
    fn missing_annotation_is_not_present() {
        let mut record = Test::default();
        let error = Parser::csv()
            .parse("no marker here", &mut record)
            .unwrap_err();

        assert!(error.is_not_present(), "{error:?}");
        assert_eq!(record, Test::default());
    }

    #[test]
    fn longer_identifiers_do_not_match() {
        let mut record = Cool::default();
        let error = Parser::csv()
            .parse("@CoolAnnotationHe(name,x)", &mut record)
            .unwrap_err();

        assert!(error.is_not_present(), "{error:?}");
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let mut record = Test::default();
        let error = Parser::csv()
            .parse("@test(version,two)", &mut record)
            .unwrap_err();

        assert!(!error.is_not_present());
        match error {
            AnnotationError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "version");
                assert_eq!(value, "two");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_keys_and_bare_tokens_are_ignored() {
        let mut record = Test::default();
        Parser::csv()
            .parse("@test(color,red;orphan;name,y)", &mut record)
            .unwrap();

        assert_eq!(record.name, "y");
        assert_eq!(record.version, 0);
    }

    #[test]
    fn values_keep_inner_separators() {
        let mut record = Test::default();
        Parser::csv()
            .parse("@test(name,a,b)", &mut record)
            .unwrap();

        assert_eq!(record.name, "a,b");
    }

    #[test]
    #[tracing_test::traced_test]
    fn first_annotation_wins() {
        let mut record = Test::default();
        Parser::csv()
            .parse("@test(name,first) @test(name,second)", &mut record)
            .unwrap();

        assert_eq!(record.name, "first");
        assert!(logs_contain("Only the first annotation is used"));
    }

    #[test]
    fn parse_label() {
        let text = "# Build settings\n  +test name,\"label value\" version,7\n+testing name,other\n";
        let mut record = Test::default();
        Parser::label().parse(text, &mut record).unwrap();

        assert_eq!(record.name, "label value");
        assert_eq!(record.version, 7);
    }

    #[test]
    fn label_requires_the_marker_at_line_start() {
        let mut record = Test::default();
        let error = Parser::label()
            .parse("see +test name,x", &mut record)
            .unwrap_err();

        assert!(error.is_not_present());
    }

    #[test]
    fn label_without_pairs() {
        let mut record = Test::default();
        Parser::label().parse("+test\n", &mut record).unwrap();

        assert_eq!(record, Test::default());
    }

    #[test]
    fn quoted_whitespace_stays_in_the_value() {
        assert_eq!(
            split_unquoted_whitespace("  a,1   b,\"x y\"\tc,3 "),
            vec!["a,1", "b,\"x y\"", "c,3"]
        );
    }

    #[test]
    fn custom_syntax() {
        let parser = Parser::new(Syntax {
            sentinel: '#',
            block: Block::Parenthesized,
            pair_separator: PairSeparator::Char('|'),
            field_separator: '=',
        });
        let mut record = Test::default();
        parser.parse("#test(name=z|version=9)", &mut record).unwrap();

        assert_eq!(record.name, "z");
        assert_eq!(record.version, 9);
    }
}
