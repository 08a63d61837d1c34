/// Recursive-descent parser for the kernel expression language.
///
/// ```text
/// program   := (expr NEWLINE+)* expr?
/// expr      := term ('+' term)*
/// term      := primary ('/' primary)*
/// primary   := call | name | literal | list | '(' expr ')'
/// call      := IDENT '(' (expr (',' expr)*)? (',' IDENT '=' expr)* ','? ')'
/// list      := '[' (expr (',' expr)*)? ','? ']'
/// ```
///
/// `/` binds tighter than `+` and both associate to the left, so
/// `A + B / 2 + C` reads as `(A + (B / 2)) + C`.

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::core::lexer::{tokenize, Token, TokenKind};
use crate::schema::expr::{BinOpKind, Expr, Literal, Program};

/// Deepest bracket nesting accepted before the parser gives up.
pub const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("syntax error at line {line}, column {column}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// Parse a complete kernel source into its statements.
pub fn parse(source: &str) -> Result<Program, SyntaxError> {
    let mut parser = Parser::new(tokenize(source)?);
    parser.program()
}

/// Parse a source holding exactly one expression.
pub fn parse_expr(source: &str) -> Result<Expr, SyntaxError> {
    let mut parser = Parser::new(tokenize(source)?);
    parser.skip_newlines();
    let expr = parser.expr()?;
    parser.skip_newlines();
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> &Token {
        // tokenize always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind_at(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn error_here(&self, message: impl Into<String>) -> SyntaxError {
        let tok = self.peek();
        SyntaxError::new(tok.line, tok.column, message)
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        let found = self.peek().kind.describe();
        self.error_here(format!("expected {}, found {}", expected, found))
    }

    fn skip_newlines(&mut self) {
        while self.peek().kind == TokenKind::Newline {
            self.advance();
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, SyntaxError> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_eof(&self) -> Result<(), SyntaxError> {
        if self.peek().kind == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    fn program(&mut self) -> Result<Program, SyntaxError> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while self.peek().kind != TokenKind::Eof {
            statements.push(self.expr()?);
            match self.peek().kind {
                TokenKind::Newline => self.skip_newlines(),
                TokenKind::Eof => {}
                _ => return Err(self.unexpected("end of line")),
            }
        }
        Ok(Program { statements })
    }

    fn expr(&mut self) -> Result<Expr, SyntaxError> {
        let outer = self.depth;
        let mut left = self.term()?;
        while self.peek().kind == TokenKind::Plus {
            // each chained operator nests the tree one level deeper
            self.descend()?;
            self.advance();
            // an operator at the end of a line continues the statement
            self.skip_newlines();
            let right = self.term()?;
            left = Expr::binop(BinOpKind::Compose, left, right);
        }
        self.depth = outer;
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, SyntaxError> {
        let outer = self.depth;
        let mut left = self.primary()?;
        while self.peek().kind == TokenKind::Slash {
            self.descend()?;
            self.advance();
            self.skip_newlines();
            let right = self.primary()?;
            left = Expr::binop(BinOpKind::Dilute, left, right);
        }
        self.depth = outer;
        Ok(left)
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        self.descend()?;
        let result = self.primary_inner();
        self.depth -= 1;
        result
    }

    /// Brackets and chained operators share one nesting budget, so the
    /// depth of any accepted tree stays under [`MAX_NESTING`].
    fn descend(&mut self) -> Result<(), SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_here(format!(
                "expression nested deeper than {} levels",
                MAX_NESTING
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn primary_inner(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                if self.peek().kind == TokenKind::LParen {
                    self.call(name)
                } else {
                    Ok(Expr::Name(name))
                }
            }
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Number(n)))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Str(s)))
            }
            TokenKind::LBracket => self.list(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn call(&mut self, name: String) -> Result<Expr, SyntaxError> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();

        while self.peek().kind != TokenKind::RParen {
            let is_keyword = matches!(self.peek().kind, TokenKind::Ident(_))
                && *self.peek_kind_at(1) == TokenKind::Equals;

            if is_keyword {
                let key_tok = self.advance();
                let key = match key_tok.kind {
                    TokenKind::Ident(key) => key,
                    _ => unreachable!("checked above"),
                };
                if !seen.insert(key.clone()) {
                    return Err(SyntaxError::new(
                        key_tok.line,
                        key_tok.column,
                        format!("duplicate keyword argument '{}'", key),
                    ));
                }
                self.advance(); // '='
                let value = self.expr()?;
                kwargs.push((key, value));
            } else {
                if !kwargs.is_empty() {
                    return Err(self.error_here("positional argument follows keyword argument"));
                }
                args.push(self.expr()?);
            }

            match self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {}
                _ => return Err(self.unexpected("',' or ')'")),
            }
        }
        self.advance(); // ')'

        Ok(Expr::Call { name, args, kwargs })
    }

    fn list(&mut self) -> Result<Expr, SyntaxError> {
        self.expect(TokenKind::LBracket, "'['")?;
        let mut items = Vec::new();
        while self.peek().kind != TokenKind::RBracket {
            items.push(self.expr()?);
            match self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RBracket => {}
                _ => return Err(self.unexpected("',' or ']'")),
            }
        }
        self.advance(); // ']'
        Ok(Expr::List(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_call() {
        let e = parse_expr("Fear(Tim)").unwrap();
        assert_eq!(e, Expr::call("Fear", vec![Expr::name("Tim")]));
    }

    #[test]
    fn parse_keyword_arguments() {
        let e = parse_expr("Journey(Lily, state=Routine, insight=Learn(Share))").unwrap();
        match e {
            Expr::Call { name, args, kwargs } => {
                assert_eq!(name, "Journey");
                assert_eq!(args, vec![Expr::name("Lily")]);
                assert_eq!(kwargs.len(), 2);
                assert_eq!(kwargs[0].0, "state");
                assert_eq!(kwargs[1].1, Expr::call("Learn", vec![Expr::name("Share")]));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn dilute_binds_tighter_than_compose() {
        let e = parse_expr("A + B / 2 + C").unwrap();
        let expected = Expr::binop(
            BinOpKind::Compose,
            Expr::binop(
                BinOpKind::Compose,
                Expr::name("A"),
                Expr::binop(BinOpKind::Dilute, Expr::name("B"), Expr::number(2.0)),
            ),
            Expr::name("C"),
        );
        assert_eq!(e, expected);
    }

    #[test]
    fn dilute_is_left_associative() {
        let e = parse_expr("A / 2 / 5").unwrap();
        let expected = Expr::binop(
            BinOpKind::Dilute,
            Expr::binop(BinOpKind::Dilute, Expr::name("A"), Expr::number(2.0)),
            Expr::number(5.0),
        );
        assert_eq!(e, expected);
    }

    #[test]
    fn grouping_overrides_precedence() {
        let e = parse_expr("(A + B) / 10").unwrap();
        assert!(matches!(e, Expr::BinOp { op: BinOpKind::Dilute, .. }));
    }

    #[test]
    fn parse_lists_and_literals() {
        let e = parse_expr("Longing([Dragons, 'flight', 3],)").unwrap();
        assert_eq!(
            e,
            Expr::call(
                "Longing",
                vec![Expr::List(vec![
                    Expr::name("Dragons"),
                    Expr::string("flight"),
                    Expr::number(3.0),
                ])]
            )
        );
    }

    #[test]
    fn parse_multiline_program() {
        let p = parse("Tim(Character, Brave)\nFear(Tim)\n\nBrave(Tim)\n").unwrap();
        assert_eq!(p.statements.len(), 3);
    }

    #[test]
    fn statements_may_span_lines_inside_parens() {
        let src = "Cautionary(Tim,\n    event=Accident(Tim),\n    lesson=Warning(Mom, Tim)\n)";
        let p = parse(src).unwrap();
        assert_eq!(p.statements.len(), 1);
    }

    #[test]
    fn trailing_operator_continues_line() {
        let p = parse("Happy(Tim) +\nJoy(Tim)").unwrap();
        assert_eq!(p.statements.len(), 1);
    }

    #[test]
    fn empty_source_is_empty_program() {
        assert!(parse("   \n# nothing\n").unwrap().statements.is_empty());
    }

    #[test]
    fn reject_positional_after_keyword() {
        let err = parse_expr("A(x=1, y)").unwrap_err();
        assert!(err.message.contains("positional"));
    }

    #[test]
    fn reject_duplicate_keyword() {
        assert!(parse_expr("A(x=1, x=2)").is_err());
    }

    #[test]
    fn reject_unbalanced() {
        assert!(parse("A(B").is_err());
        assert!(parse("A(B))").is_err());
        assert!(parse("[A, B").is_err());
    }

    #[test]
    fn reject_host_language_constructs() {
        assert!(parse("if x: A()").is_err());
        assert!(parse("A.b(c)").is_err());
        assert!(parse("x = A()").is_err());
        assert!(parse("A() - B()").is_err());
        assert!(parse("lambda: A").is_err());
    }

    #[test]
    fn reject_two_expressions_on_one_line() {
        let err = parse("A() B()").unwrap_err();
        assert_eq!(err.column, 5);
    }

    #[test]
    fn nesting_limit() {
        let deep = format!("{}x{}", "A(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        assert!(parse(&deep).is_err());
        let ok = format!("{}x{}", "A(".repeat(10), ")".repeat(10));
        assert!(parse(&ok).is_ok());
    }

    #[test]
    fn operator_chains_count_toward_nesting_limit() {
        let dilutions = format!("Storm(){}", " / 2".repeat(MAX_NESTING + 1));
        let err = parse(&dilutions).unwrap_err();
        assert!(err.message.contains("nested deeper"), "{}", err.message);

        let compositions = vec!["wolf"; MAX_NESTING + 2].join(" + ");
        assert!(parse(&compositions).is_err());

        let short = vec!["wolf"; 100].join(" + ");
        assert!(parse(&short).is_ok());
        assert!(parse(&format!("Storm(){}", " / 2".repeat(100))).is_ok());
    }

    #[test]
    fn nesting_budget_is_restored_between_statements() {
        let line = format!("Storm(){}", " / 2".repeat(MAX_NESTING - 10));
        let source = vec![line; 5].join("\n");
        assert_eq!(parse(&source).unwrap().statements.len(), 5);
    }

    #[test]
    fn display_round_trip() {
        let src = "Journey(Sophie, state=Routine + Longing([Dragons, Flight]) + Loneliness / 10, catalyst=Surprise + Wind)";
        let first = parse_expr(src).unwrap();
        let second = parse_expr(&first.to_string()).unwrap();
        assert_eq!(first, second);
    }
}
