//! Tokenizer and parser for the XPath subset produced by the selector translator.
//!
//! Supported: absolute location paths built from `/` and `//`, the child,
//! descendant, descendant-or-self, self, parent and sibling axes, name and `*`
//! node tests, and predicates over attributes, literals, numbers, `=`/`!=`,
//! `and`/`or`, and the functions `contains`, `starts-with`, `concat`, `not`,
//! `position` and `last`.

use super::QueryError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    ColonColon,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    At,
    Star,
    Eq,
    NotEq,
    Name(String),
    Literal(String),
    Number(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    SelfAxis,
    Parent,
    FollowingSibling,
    PrecedingSibling,
}

impl Axis {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "self" => Axis::SelfAxis,
            "parent" => Axis::Parent,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// Element with this local name (ASCII case-insensitive).
    Name(String),
    /// Any element (`*`).
    AnyElement,
    /// Any node, including the document root (`node()`).
    AnyNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Contains,
    StartsWith,
    Concat,
    Not,
    Position,
    Last,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "contains" => Function::Contains,
            "starts-with" => Function::StartsWith,
            "concat" => Function::Concat,
            "not" => Function::Not,
            "position" => Function::Position,
            "last" => Function::Last,
            _ => return None,
        })
    }

    fn accepts(self, arity: usize) -> bool {
        match self {
            Function::Contains | Function::StartsWith => arity == 2,
            Function::Concat => arity >= 2,
            Function::Not => arity == 1,
            Function::Position | Function::Last => arity == 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Literal(String),
    Attribute(String),
    Eq(Box<Expr>, Box<Expr>),
    NotEq(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    /// The implicit `descendant-or-self::node()` step that `//` stands for.
    fn descendant_or_self() -> Self {
        Step {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::AnyNode,
            predicates: Vec::new(),
        }
    }
}

/// Location path, evaluated from the document root.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    pub steps: Vec<Step>,
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, QueryError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '/' => {
                if matches!(chars.peek(), Some((_, '/'))) {
                    chars.next();
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            ':' => match chars.next() {
                Some((_, ':')) => Token::ColonColon,
                _ => return Err(QueryError::UnexpectedChar { offset, found: ':' }),
            },
            '!' => match chars.next() {
                Some((_, '=')) => Token::NotEq,
                _ => return Err(QueryError::UnexpectedChar { offset, found: '!' }),
            },
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '@' => Token::At,
            '*' => Token::Star,
            '=' => Token::Eq,
            '\'' | '"' => {
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some((_, ch)) if ch == c => break,
                        Some((_, ch)) => literal.push(ch),
                        None => return Err(QueryError::UnterminatedLiteral { offset }),
                    }
                }
                Token::Literal(literal)
            }
            c if c.is_ascii_digit() => {
                let mut number = String::from(c);
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_ascii_digit() || ch == '.' {
                        number.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = number
                    .parse()
                    .map_err(|_| QueryError::InvalidNumber { offset, text: number })?;
                Token::Number(value)
            }
            c if is_name_start(c) => {
                let mut name = String::from(c);
                while let Some(&(_, ch)) = chars.peek() {
                    if is_name_char(ch) {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Name(name)
            }
            found => return Err(QueryError::UnexpectedChar { offset, found }),
        };
        tokens.push((offset, token));
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, token)| token)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|(_, token)| token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.end)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, token)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self) -> QueryError {
        match self.peek() {
            Some(token) => QueryError::UnexpectedToken {
                offset: self.offset(),
                found: format!("{:?}", token),
            },
            None => QueryError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), QueryError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn location_path(&mut self) -> Result<LocationPath, QueryError> {
        let mut steps = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.pos += 1;
                }
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    steps.push(Step::descendant_or_self());
                }
                _ if steps.is_empty() => return Err(self.unexpected()),
                _ => break,
            }
            steps.push(self.step()?);
        }
        Ok(LocationPath { steps })
    }

    fn step(&mut self) -> Result<Step, QueryError> {
        let mut axis = Axis::Child;
        if let (Some(Token::Name(name)), Some(Token::ColonColon)) = (self.peek(), self.peek_at(1)) {
            axis = Axis::from_name(name).ok_or_else(|| QueryError::UnknownAxis(name.clone()))?;
            self.pos += 2;
        }

        let test = match self.next() {
            Some(Token::Star) => NodeTest::AnyElement,
            Some(Token::Name(name)) if name == "node" && self.peek() == Some(&Token::LParen) => {
                self.expect(&Token::LParen)?;
                self.expect(&Token::RParen)?;
                NodeTest::AnyNode
            }
            Some(Token::Name(name)) => NodeTest::Name(name),
            Some(_) => {
                self.pos -= 1;
                return Err(self.unexpected());
            }
            None => return Err(QueryError::UnexpectedEnd),
        };

        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            self.pos += 1;
            predicates.push(self.or_expr()?);
            self.expect(&Token::RBracket)?;
        }

        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn or_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.and_expr()?;
        while matches!(self.peek(), Some(Token::Name(name)) if name == "or") {
            self.pos += 1;
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.equality_expr()?;
        while matches!(self.peek(), Some(Token::Name(name)) if name == "and") {
            self.pos += 1;
            let right = self.equality_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality_expr(&mut self) -> Result<Expr, QueryError> {
        let left = self.primary()?;
        match self.peek() {
            Some(Token::Eq) => {
                self.pos += 1;
                Ok(Expr::Eq(Box::new(left), Box::new(self.primary()?)))
            }
            Some(Token::NotEq) => {
                self.pos += 1;
                Ok(Expr::NotEq(Box::new(left), Box::new(self.primary()?)))
            }
            _ => Ok(left),
        }
    }

    fn primary(&mut self) -> Result<Expr, QueryError> {
        match self.next() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Literal(text)) => Ok(Expr::Literal(text)),
            Some(Token::At) => match self.next() {
                Some(Token::Name(name)) => Ok(Expr::Attribute(name)),
                Some(_) => {
                    self.pos -= 1;
                    Err(self.unexpected())
                }
                None => Err(QueryError::UnexpectedEnd),
            },
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) if self.peek() == Some(&Token::LParen) => {
                let function =
                    Function::from_name(&name).ok_or_else(|| QueryError::UnknownFunction(name.clone()))?;
                self.pos += 1;
                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    args.push(self.or_expr()?);
                    while self.peek() == Some(&Token::Comma) {
                        self.pos += 1;
                        args.push(self.or_expr()?);
                    }
                }
                self.expect(&Token::RParen)?;
                if !function.accepts(args.len()) {
                    return Err(QueryError::Arity { function: name, given: args.len() });
                }
                Ok(Expr::Call(function, args))
            }
            Some(_) => {
                self.pos -= 1;
                Err(self.unexpected())
            }
            None => Err(QueryError::UnexpectedEnd),
        }
    }
}

/// Parses an absolute location path.
pub fn parse(expression: &str) -> Result<LocationPath, QueryError> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(QueryError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: expression.len(),
    };
    let path = parser.location_path()?;
    if parser.peek().is_some() {
        return Err(QueryError::TrailingInput {
            offset: parser.offset(),
        });
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(tag: &str) -> NodeTest {
        NodeTest::Name(tag.to_string())
    }

    #[test]
    fn descendant_then_child() {
        let path = parse("//div/p").unwrap();
        assert_eq!(path.steps.len(), 3);
        assert_eq!(path.steps[0].axis, Axis::DescendantOrSelf);
        assert_eq!(path.steps[1].test, name("div"));
        assert_eq!(path.steps[2].axis, Axis::Child);
        assert_eq!(path.steps[2].test, name("p"));
    }

    #[test]
    fn explicit_axes_and_position() {
        let path = parse("//h1/following-sibling::*[1]/self::p").unwrap();
        let sibling = &path.steps[2];
        assert_eq!(sibling.axis, Axis::FollowingSibling);
        assert_eq!(sibling.test, NodeTest::AnyElement);
        assert_eq!(sibling.predicates, vec![Expr::Number(1.0)]);
        assert_eq!(path.steps[3].axis, Axis::SelfAxis);
    }

    #[test]
    fn class_containment_predicate() {
        let path =
            parse("//*[contains(concat(' ', @class, ' '), concat(' ', 'foo', ' '))]").unwrap();
        match &path.steps[1].predicates[0] {
            Expr::Call(Function::Contains, args) => {
                assert_eq!(args.len(), 2);
                assert!(matches!(&args[0], Expr::Call(Function::Concat, inner) if inner[1] == Expr::Attribute("class".into())));
            }
            other => panic!("unexpected predicate {:?}", other),
        }
    }

    #[test]
    fn attribute_equality_with_either_quote() {
        for query in ["//a[@href=\"x\"]", "//a[@href='x']"] {
            let path = parse(query).unwrap();
            assert_eq!(
                path.steps[1].predicates[0],
                Expr::Eq(
                    Box::new(Expr::Attribute("href".into())),
                    Box::new(Expr::Literal("x".into()))
                )
            );
        }
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert!(matches!(parse(""), Err(QueryError::Empty)));
        assert!(matches!(parse("//div//~//p"), Err(QueryError::UnexpectedChar { found: '~', .. })));
        assert!(matches!(parse("//a:hover"), Err(QueryError::UnexpectedChar { found: ':', .. })));
        assert!(matches!(parse("//"), Err(QueryError::UnexpectedEnd)));
        assert!(matches!(parse("//p[@id='x'"), Err(QueryError::UnexpectedEnd)));
        assert!(matches!(parse("//p[@id='x]"), Err(QueryError::UnterminatedLiteral { .. })));
        assert!(matches!(parse("//ancestor::p"), Err(QueryError::UnknownAxis(_))));
        assert!(matches!(parse("//p[count(@a)]"), Err(QueryError::UnknownFunction(_))));
        assert!(matches!(parse("//p[not()]"), Err(QueryError::Arity { .. })));
        assert!(matches!(parse("div"), Err(QueryError::UnexpectedToken { .. })));
        assert!(matches!(parse("//div]"), Err(QueryError::TrailingInput { .. })));
    }
}
