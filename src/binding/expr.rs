// ============================================================================
// spark-bind - Binding Expressions
// Parser for `type:expression, type2:expression2` declarations
// ============================================================================
//
// Grammar:
//
//   declarations := declaration ( ',' declaration )*
//   declaration  := name ':' expr
//   expr         := literal | '$' name | name | name '(' args ')'
//                 | '{' ( key ':' expr ),* '}' | '[' expr,* ']'
//   literal      := 'text' | "text" | number | true | false | null
//
// Calls are limited to the fixed modifier set; their arity is checked here so
// a misdeclared binding fails when the view is built, not when it first
// renders.
// ============================================================================

use serde_json::Value;

use crate::binding::modifier::Modifier;
use crate::core::constants::SOURCE_PREFIX;
use crate::core::error::{Error, Result};

// =============================================================================
// AST
// =============================================================================

/// Unresolved binding expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A string, number, boolean or null literal.
    Literal(Value),
    /// `$name`: a whole binding source.
    Source(String),
    /// A bare property name, resolved against the default sources.
    Property(String),
    /// `{key: expr, ...}`
    Object(Vec<(String, Expr)>),
    /// `[expr, ...]`
    Array(Vec<Expr>),
    /// A modifier applied to argument expressions.
    Call(Modifier, Vec<Expr>),
}

impl Expr {
    /// Visit every property and source reference, depth first.
    pub fn walk_refs(&self, visit: &mut impl FnMut(&Expr)) {
        match self {
            Expr::Source(_) | Expr::Property(_) => visit(self),
            Expr::Literal(_) => {}
            Expr::Object(fields) => fields.iter().for_each(|(_, expr)| expr.walk_refs(visit)),
            Expr::Array(items) | Expr::Call(_, items) => {
                items.iter().for_each(|expr| expr.walk_refs(visit))
            }
        }
    }
}

/// One `type:expression` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Binding type, naming the handler.
    pub kind: String,
    pub expr: Expr,
}

// =============================================================================
// PARSER
// =============================================================================

/// Parse a comma-separated declaration list.
///
/// # Example
///
/// ```
/// use spark_bind::binding::{parse_declarations, Expr};
///
/// let decls = parse_declarations("text:firstName, toggle:not(active)").unwrap();
/// assert_eq!(decls.len(), 2);
/// assert_eq!(decls[0].kind, "text");
/// assert_eq!(decls[0].expr, Expr::Property("firstName".into()));
/// ```
pub fn parse_declarations(source: &str) -> Result<Vec<Declaration>> {
    let mut parser = Parser::new(source);
    let mut declarations = Vec::new();

    parser.skip_ws();
    if parser.at_end() {
        return Ok(declarations);
    }

    loop {
        parser.skip_ws();
        let kind = parser.name()?;
        parser.expect(':')?;
        let expr = parser.expr()?;
        declarations.push(Declaration { kind, expr });

        parser.skip_ws();
        if parser.at_end() {
            break;
        }
        parser.expect(',')?;
    }
    Ok(declarations)
}

/// Parse a single expression.
pub fn parse_expr(source: &str) -> Result<Expr> {
    let mut parser = Parser::new(source);
    let expr = parser.expr()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::MalformedBinding {
            source_text: self.source.to_string(),
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, ch: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> Result<()> {
        if self.eat(ch) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{ch}`")))
        }
    }

    fn name(&mut self) -> Result<String> {
        self.skip_ws();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected a name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn expr(&mut self) -> Result<Expr> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("expected an expression")),
            Some('\'') | Some('"') => Ok(Expr::Literal(Value::String(self.string()?))),
            Some('{') => self.object(),
            Some('[') => self.array(),
            Some(c) if c == SOURCE_PREFIX => {
                self.pos += 1;
                Ok(Expr::Source(self.name()?))
            }
            Some(c) if c.is_ascii_digit() || c == '-' => self.number(),
            Some(_) => {
                let start = self.pos;
                let name = self.name()?;
                if self.eat('(') {
                    return self.call(&name, start);
                }
                Ok(match name.as_str() {
                    "true" => Expr::Literal(Value::Bool(true)),
                    "false" => Expr::Literal(Value::Bool(false)),
                    "null" => Expr::Literal(Value::Null),
                    _ => Expr::Property(name),
                })
            }
        }
    }

    fn string(&mut self) -> Result<String> {
        let Some(quote) = self.peek() else {
            return Err(self.error("expected a string"));
        };
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(escaped) => out.push(escaped),
                        None => return Err(self.error("unterminated string")),
                    }
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(c) => out.push(c),
            }
            self.pos += 1;
        }
    }

    fn number(&mut self) -> Result<Expr> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if let Ok(int) = text.parse::<i64>() {
            return Ok(Expr::Literal(Value::from(int)));
        }
        text.parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(|n| Expr::Literal(Value::Number(n)))
            .ok_or_else(|| self.error(format!("invalid number `{text}`")))
    }

    fn object(&mut self) -> Result<Expr> {
        self.expect('{')?;
        let mut fields = Vec::new();
        if self.eat('}') {
            return Ok(Expr::Object(fields));
        }
        loop {
            self.skip_ws();
            let key = match self.peek() {
                Some('\'') | Some('"') => self.string()?,
                _ => self.name()?,
            };
            self.expect(':')?;
            fields.push((key, self.expr()?));
            if self.eat('}') {
                return Ok(Expr::Object(fields));
            }
            self.expect(',')?;
        }
    }

    fn array(&mut self) -> Result<Expr> {
        self.expect('[')?;
        let mut items = Vec::new();
        if self.eat(']') {
            return Ok(Expr::Array(items));
        }
        loop {
            items.push(self.expr()?);
            if self.eat(']') {
                return Ok(Expr::Array(items));
            }
            self.expect(',')?;
        }
    }

    fn call(&mut self, name: &str, start: usize) -> Result<Expr> {
        let Some(modifier) = Modifier::from_name(name) else {
            self.pos = start;
            return Err(Error::modifier(name, "not a known modifier"));
        };

        let mut args = Vec::new();
        if !self.eat(')') {
            loop {
                args.push(self.expr()?);
                if self.eat(')') {
                    break;
                }
                self.expect(',')?;
            }
        }
        modifier.check_arity(args.len())?;
        Ok(Expr::Call(modifier, args))
    }
}

// =============================================================================
// TESTS
// =============================================================================
