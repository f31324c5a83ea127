//! Recursive-descent parser for the function language

use super::ast::{BinaryOp, ErrorKind, Expr, Function, FunctionBody, LogicalOp, Stmt, UnaryOp};
use super::lexer::{tokenize, Token, TokenKind};
use super::CompileError;
use crate::value::format_number;
use std::sync::Arc;

const RESERVED: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "default", "delete",
    "do", "else", "export", "extends", "false", "finally", "for", "function", "if", "import", "in",
    "instanceof", "let", "new", "null", "return", "super", "switch", "this", "throw", "true", "try",
    "typeof", "var", "void", "while", "with", "yield",
];

/// Deepest nesting of expressions and statements accepted
pub(crate) const MAX_NESTING_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy)]
enum Operator {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

/// Parse source consisting of exactly one function expression
pub(crate) fn parse_function(source: &str) -> Result<Function, CompileError> {
    let mut parser = Parser::new(source)?;
    let function = parser.function_expression()?;
    parser.eat_punct(";");
    parser.expect_eof()?;
    Ok(function)
}

/// Parse a statement list (function body text)
pub(crate) fn parse_statements(source: &str) -> Result<Vec<Stmt>, CompileError> {
    let mut parser = Parser::new(source)?;
    let mut statements = Vec::new();
    while !parser.at_eof() {
        statements.push(parser.statement()?);
    }
    Ok(statements)
}

/// Parse a single expression
pub(crate) fn parse_expression(source: &str) -> Result<Expr, CompileError> {
    let mut parser = Parser::new(source)?;
    let expr = parser.expression()?;
    parser.expect_eof()?;
    Ok(expr)
}

/// Whether `name` can be bound as a parameter or variable
pub(crate) fn is_bindable_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(super::lexer::is_ident_start)
        && chars.all(super::lexer::is_ident_continue)
        && !RESERVED.contains(&name)
        && !matches!(name, "undefined" | "NaN" | "Infinity")
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Result<Self, CompileError> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            pos: 0,
            depth: 0,
        })
    }

    /// Run `parse` one nesting level deeper
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(CompileError::new(
                format!("nesting deeper than {MAX_NESTING_DEPTH} levels"),
                self.peek().start,
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // ---- token helpers ----

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + ahead).min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !matches!(token.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        token
    }

    fn previous_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .map_or(0, |i| self.tokens[i].end)
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn is_punct(&self, punct: &str) -> bool {
        matches!(self.peek().kind, TokenKind::Punct(p) if p == punct)
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Ident(name) if name == keyword)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.is_punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<(), CompileError> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected '{punct}'")))
        }
    }

    fn expect_eof(&self) -> Result<(), CompileError> {
        if self.at_eof() {
            Ok(())
        } else {
            Err(self.unexpected("expected end of input"))
        }
    }

    fn binding_name(&mut self) -> Result<String, CompileError> {
        match &self.peek().kind {
            TokenKind::Ident(name) if is_bindable_identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("expected identifier")),
        }
    }

    fn unexpected(&self, context: &str) -> CompileError {
        let token = self.peek();
        let found = match &token.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", &self.source[token.start..token.end]),
        };
        CompileError::new(format!("{context}, found {found}"), token.start)
    }

    /// `(a, b) =>` or `a =>` starts at the current token
    fn is_arrow_ahead(&self) -> bool {
        match &self.peek().kind {
            TokenKind::Ident(name) if !RESERVED.contains(&name.as_str()) => {
                let next = self.peek_at(1);
                matches!(next.kind, TokenKind::Punct("=>")) && !next.newline_before
            }
            TokenKind::Punct("(") => {
                let mut depth = 0usize;
                for (offset, token) in self.tokens[self.pos..].iter().enumerate() {
                    match token.kind {
                        TokenKind::Punct("(" | "[" | "{") => depth += 1,
                        TokenKind::Punct(")" | "]" | "}") => {
                            depth = depth.saturating_sub(1);
                            if depth == 0 {
                                let next = self.peek_at(offset + 1);
                                return matches!(next.kind, TokenKind::Punct("=>"))
                                    && !next.newline_before;
                            }
                        }
                        TokenKind::Eof => return false,
                        _ => {}
                    }
                }
                false
            }
            _ => false,
        }
    }

    // ---- functions ----

    fn function_expression(&mut self) -> Result<Function, CompileError> {
        if self.is_keyword("function") {
            self.function_keyword()
        } else if self.is_arrow_ahead() {
            self.arrow()
        } else if self.is_keyword("async") {
            Err(self.unexpected("async functions are not supported"))
        } else {
            Err(self.unexpected("expected a function"))
        }
    }

    fn arrow(&mut self) -> Result<Function, CompileError> {
        let start = self.peek().start;
        let params = if self.eat_punct("(") {
            self.parameter_list()?
        } else {
            vec![self.binding_name()?]
        };
        self.expect_punct("=>")?;
        let body = if self.is_punct("{") {
            FunctionBody::Block(self.block()?)
        } else {
            FunctionBody::Expr(self.assignment()?)
        };
        Ok(Function {
            params,
            body,
            source: self.source[start..self.previous_end()].to_string(),
        })
    }

    fn function_keyword(&mut self) -> Result<Function, CompileError> {
        let start = self.peek().start;
        self.advance();
        // Optional name; it is not bound inside the body
        if !self.is_punct("(") {
            self.binding_name()?;
        }
        self.expect_punct("(")?;
        let params = self.parameter_list()?;
        let body = FunctionBody::Block(self.block()?);
        Ok(Function {
            params,
            body,
            source: self.source[start..self.previous_end()].to_string(),
        })
    }

    /// Parameters after the opening parenthesis, consuming the closing one
    fn parameter_list(&mut self) -> Result<Vec<String>, CompileError> {
        let mut params: Vec<String> = Vec::new();
        while !self.eat_punct(")") {
            let at = self.peek().start;
            let name = self.binding_name()?;
            if params.contains(&name) {
                return Err(CompileError::new(format!("duplicate parameter '{name}'"), at));
            }
            params.push(name);
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(params)
    }

    fn block(&mut self) -> Result<Vec<Stmt>, CompileError> {
        self.expect_punct("{")?;
        let mut statements = Vec::new();
        while !self.eat_punct("}") {
            if self.at_eof() {
                return Err(self.unexpected("expected '}'"));
            }
            statements.push(self.statement()?);
        }
        Ok(statements)
    }

    // ---- statements ----

    fn statement(&mut self) -> Result<Stmt, CompileError> {
        self.nested(Self::single_statement)
    }

    fn single_statement(&mut self) -> Result<Stmt, CompileError> {
        if self.eat_punct(";") {
            return Ok(Stmt::Empty);
        }
        if self.is_punct("{") {
            return self.block().map(Stmt::Block);
        }
        if self.is_keyword("const") || self.is_keyword("let") || self.is_keyword("var") {
            return self.declaration();
        }
        if self.eat_keyword("return") {
            let value = if self.at_statement_end() {
                None
            } else {
                Some(self.expression()?)
            };
            self.terminator()?;
            return Ok(Stmt::Return(value));
        }
        if self.is_keyword("throw") {
            self.advance();
            if self.peek().newline_before {
                return Err(self.unexpected("illegal newline after throw"));
            }
            let value = self.expression()?;
            self.terminator()?;
            return Ok(Stmt::Throw(value));
        }
        if self.eat_keyword("if") {
            self.expect_punct("(")?;
            let test = self.expression()?;
            self.expect_punct(")")?;
            let consequent = Box::new(self.statement()?);
            let alternate = if self.eat_keyword("else") {
                Some(Box::new(self.statement()?))
            } else {
                None
            };
            return Ok(Stmt::If {
                test,
                consequent,
                alternate,
            });
        }
        if self.is_keyword("function") {
            return Err(self.unexpected(
                "function declarations are not supported, bind an arrow function with const",
            ));
        }

        let at = self.peek().start;
        let expr = self.expression()?;
        if self.eat_punct("=") {
            let Expr::Ident(name) = expr else {
                return Err(CompileError::new("invalid assignment target", at));
            };
            let value = self.assignment()?;
            self.terminator()?;
            return Ok(Stmt::Assign { name, value });
        }
        self.terminator()?;
        Ok(Stmt::Expr(expr))
    }

    fn declaration(&mut self) -> Result<Stmt, CompileError> {
        let mutable = !self.is_keyword("const");
        self.advance();
        let mut declarations = Vec::new();
        loop {
            let at = self.peek().start;
            let name = self.binding_name()?;
            let init = if self.eat_punct("=") {
                Some(self.assignment()?)
            } else if mutable {
                None
            } else {
                return Err(CompileError::new(
                    format!("missing initializer in const declaration '{name}'"),
                    at,
                ));
            };
            declarations.push((name, init));
            if !self.eat_punct(",") {
                break;
            }
        }
        self.terminator()?;
        Ok(Stmt::Declare {
            declarations,
            mutable,
        })
    }

    fn at_statement_end(&self) -> bool {
        self.is_punct(";") || self.is_punct("}") || self.at_eof() || self.peek().newline_before
    }

    /// Explicit `;`, or automatic insertion before `}`, end of input or a newline
    fn terminator(&mut self) -> Result<(), CompileError> {
        if self.eat_punct(";") || self.at_statement_end() {
            Ok(())
        } else {
            Err(self.unexpected("expected ';'"))
        }
    }

    // ---- expressions ----

    fn expression(&mut self) -> Result<Expr, CompileError> {
        let first = self.assignment()?;
        if !self.is_punct(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_punct(",") {
            items.push(self.assignment()?);
        }
        Ok(Expr::Sequence(items))
    }

    fn assignment(&mut self) -> Result<Expr, CompileError> {
        self.nested(|parser| {
            if parser.is_keyword("function") || parser.is_arrow_ahead() {
                return parser
                    .function_expression()
                    .map(|f| Expr::Function(Arc::new(f)));
            }
            parser.conditional()
        })
    }

    fn conditional(&mut self) -> Result<Expr, CompileError> {
        let test = self.binary(0)?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let consequent = self.assignment()?;
        self.expect_punct(":")?;
        let alternate = self.assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn operator(&self) -> Option<(u8, Operator)> {
        let TokenKind::Punct(punct) = self.peek().kind else {
            return None;
        };
        let entry = match punct {
            "??" => (1, Operator::Logical(LogicalOp::Nullish)),
            "||" => (1, Operator::Logical(LogicalOp::Or)),
            "&&" => (2, Operator::Logical(LogicalOp::And)),
            "==" => (3, Operator::Binary(BinaryOp::Eq)),
            "!=" => (3, Operator::Binary(BinaryOp::Ne)),
            "===" => (3, Operator::Binary(BinaryOp::StrictEq)),
            "!==" => (3, Operator::Binary(BinaryOp::StrictNe)),
            "<" => (4, Operator::Binary(BinaryOp::Lt)),
            "<=" => (4, Operator::Binary(BinaryOp::Le)),
            ">" => (4, Operator::Binary(BinaryOp::Gt)),
            ">=" => (4, Operator::Binary(BinaryOp::Ge)),
            "+" => (5, Operator::Binary(BinaryOp::Add)),
            "-" => (5, Operator::Binary(BinaryOp::Sub)),
            "*" => (6, Operator::Binary(BinaryOp::Mul)),
            "/" => (6, Operator::Binary(BinaryOp::Div)),
            "%" => (6, Operator::Binary(BinaryOp::Rem)),
            _ => return None,
        };
        Some(entry)
    }

    fn binary(&mut self, min_precedence: u8) -> Result<Expr, CompileError> {
        let mut left = self.unary()?;
        while let Some((precedence, operator)) = self.operator() {
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = Box::new(self.binary(precedence + 1)?);
            let left_box = Box::new(left);
            left = match operator {
                Operator::Binary(op) => Expr::Binary {
                    op,
                    left: left_box,
                    right,
                },
                Operator::Logical(op) => Expr::Logical {
                    op,
                    left: left_box,
                    right,
                },
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        let op = if self.eat_punct("!") {
            UnaryOp::Not
        } else if self.eat_punct("-") {
            UnaryOp::Neg
        } else if self.eat_punct("+") {
            UnaryOp::Plus
        } else if self.eat_keyword("typeof") {
            UnaryOp::TypeOf
        } else {
            return self.postfix();
        };
        let operand = self.nested(Self::unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat_punct(".") {
                let TokenKind::Ident(name) = self.peek().kind.clone() else {
                    return Err(self.unexpected("expected property name"));
                };
                self.advance();
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Box::new(Expr::Str(name)),
                };
            } else if self.eat_punct("[") {
                let property = self.expression()?;
                self.expect_punct("]")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Box::new(property),
                };
            } else if self.eat_punct("(") {
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Arguments after the opening parenthesis, consuming the closing one
    fn arguments(&mut self) -> Result<Vec<Expr>, CompileError> {
        let mut args = Vec::new();
        while !self.eat_punct(")") {
            args.push(self.assignment()?);
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            TokenKind::Punct("(") => {
                self.advance();
                let expr = self.expression()?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            TokenKind::Punct("[") => {
                self.advance();
                let mut items = Vec::new();
                while !self.eat_punct("]") {
                    items.push(self.assignment()?);
                    if !self.eat_punct(",") {
                        self.expect_punct("]")?;
                        break;
                    }
                }
                Ok(Expr::Array(items))
            }
            TokenKind::Punct("{") => {
                self.advance();
                self.object_literal()
            }
            TokenKind::Ident(name) => self.identifier_expression(&name, token.start),
            _ => Err(self.unexpected("unexpected token")),
        }
    }

    fn identifier_expression(&mut self, name: &str, at: usize) -> Result<Expr, CompileError> {
        let literal = match name {
            "true" => Some(Expr::Bool(true)),
            "false" => Some(Expr::Bool(false)),
            "null" => Some(Expr::Null),
            "undefined" => Some(Expr::Undefined),
            "NaN" => Some(Expr::Number(f64::NAN)),
            "Infinity" => Some(Expr::Number(f64::INFINITY)),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(literal);
        }
        match name {
            "function" => self.function_keyword().map(|f| Expr::Function(Arc::new(f))),
            "new" => {
                self.advance();
                let TokenKind::Ident(constructor) = self.peek().kind.clone() else {
                    return Err(self.unexpected("expected constructor name"));
                };
                let Some(kind) = ErrorKind::from_name(&constructor) else {
                    return Err(CompileError::new(
                        format!("unsupported constructor '{constructor}'"),
                        at,
                    ));
                };
                self.advance();
                let args = if self.eat_punct("(") {
                    self.arguments()?
                } else {
                    Vec::new()
                };
                Ok(Expr::NewError { kind, args })
            }
            _ if RESERVED.contains(&name) => Err(CompileError::new(
                format!("unexpected keyword '{name}'"),
                at,
            )),
            _ => {
                self.advance();
                Ok(Expr::Ident(name.to_string()))
            }
        }
    }

    /// Object literal after the opening brace, consuming the closing one
    fn object_literal(&mut self) -> Result<Expr, CompileError> {
        let mut entries = Vec::new();
        while !self.eat_punct("}") {
            let token = self.advance();
            let (key, shorthand) = match token.kind {
                TokenKind::Ident(name) => {
                    let shorthand = is_bindable_identifier(&name);
                    (name, shorthand)
                }
                TokenKind::Str(s) => (s, false),
                TokenKind::Number(n) => (format_number(n), false),
                _ => return Err(CompileError::new("expected property key", token.start)),
            };
            let value = if self.eat_punct(":") {
                self.assignment()?
            } else if shorthand {
                Expr::Ident(key.clone())
            } else {
                return Err(self.unexpected("expected ':'"));
            };
            entries.push((key, value));
            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(Expr::Object(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_forms() {
        let concise = parse_function("x => x * 2").unwrap();
        assert_eq!(concise.params, vec!["x".to_string()]);
        assert!(matches!(concise.body, FunctionBody::Expr(_)));

        let block = parse_function("(a, b) => { const c = a + b; return c }").unwrap();
        assert_eq!(block.params, vec!["a".to_string(), "b".to_string()]);
        let FunctionBody::Block(statements) = block.body else {
            panic!("expected block body");
        };
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn function_keyword_form_records_source() {
        let f = parse_function("  function handler(e) { return e; };  ").unwrap();
        assert_eq!(f.source, "function handler(e) { return e; }");
    }

    #[test]
    fn precedence() {
        let expr = parse_expression("1 + 2 * 3 === 7 && !false").unwrap();
        let Expr::Logical { op: LogicalOp::And, left, .. } = expr else {
            panic!("expected && at the root");
        };
        assert!(matches!(*left, Expr::Binary { op: BinaryOp::StrictEq, .. }));
    }

    #[test]
    fn object_literal_in_parens() {
        let f = parse_function("() => ({ a: 1, 'b': [2], c })").unwrap();
        let FunctionBody::Expr(Expr::Object(entries)) = f.body else {
            panic!("expected object body");
        };
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn newline_terminates_statements() {
        let statements = parse_statements("let a = 1\na = a + 1\nreturn a").unwrap();
        assert_eq!(statements.len(), 3);
        assert!(matches!(statements[1], Stmt::Assign { .. }));
    }

    #[test]
    fn rejections() {
        assert!(parse_function("1 + 2").is_err());
        assert!(parse_function("(a, a) => a").is_err());
        assert!(parse_function("async () => 1").is_err());
        assert!(parse_function("() => new Date()").is_err());
        assert!(parse_statements("const a").is_err());
        assert!(parse_statements("a b").is_err());
        assert!(parse_statements("1 = 2").is_err());
        assert!(parse_function("() => 1 extra").is_err());
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = |depth: usize| format!("() => {}1{}", "(".repeat(depth), ")".repeat(depth));
        assert!(parse_function(&nested(100)).is_ok());

        let err = parse_function(&nested(10_000)).unwrap_err();
        assert!(err.message().contains("nesting"), "{}", err.message());
        assert!(parse_expression(&"!".repeat(10_000)).is_err());
        assert!(parse_statements(&format!("{}{}", "{".repeat(10_000), "}".repeat(10_000))).is_err());
        assert!(parse_function(&format!("{}1", "x => ".repeat(10_000))).is_err());
    }

    #[test]
    fn bindable_identifiers() {
        assert!(is_bindable_identifier("value"));
        assert!(is_bindable_identifier("$el"));
        assert!(!is_bindable_identifier("return"));
        assert!(!is_bindable_identifier("undefined"));
        assert!(!is_bindable_identifier("1a"));
        assert!(!is_bindable_identifier(""));
    }
}
