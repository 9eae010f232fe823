//! Recursive-descent parser for counter expressions.
//!
//! ```text
//! expr    := or
//! or      := and ( "||" and )*
//! and     := not ( "&&" not )*
//! not     := "!" not | cmp
//! cmp     := sum ( ("==" | "!=" | "<" | "<=" | ">" | ">=") sum )*
//! sum     := product ( ("+" | "-") product )*
//! product := unary ( ("*" | "/" | "//" | "%") unary )*
//! unary   := "-" unary | primary
//! primary := INT | FLOAT | "true" | "false" | IDENT | "(" expr ")"
//! ```

use crate::expr::ast::{BinaryOp, CmpOp, Expr};
use crate::expr::lexer::{Token, TokenKind};
use crate::expr::ExprError;

/// Deepest nesting of parentheses and prefix operators
const MAX_DEPTH: usize = 64;

/// Most binary, logical and comparison operators in one expression.
/// Left-associative chains nest one level per operator, so this bounds
/// the depth of the tree that evaluation and drop recurse over.
const MAX_OPERATORS: usize = 1024;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    operators: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            operators: 0,
        }
    }

    /// Consume the operator token at the cursor, charging it to the budget
    fn operator(&mut self) -> Result<(), ExprError> {
        if self.operators >= MAX_OPERATORS {
            return Err(ExprError::TooDeep {
                col: self.peek().col,
            });
        }
        self.operators += 1;
        self.advance();
        Ok(())
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ExprError>,
    ) -> Result<T, ExprError> {
        if self.depth >= MAX_DEPTH {
            return Err(ExprError::TooDeep {
                col: self.peek().col,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Parse one complete expression; trailing tokens are an error.
    pub fn parse(mut self) -> Result<Expr, ExprError> {
        let expr = self.parse_or_expr()?;
        self.expect(&TokenKind::Eof, "end of expression")?;
        Ok(expr)
    }

    fn parse_or_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_and_expr()?;
        while self.peek_kind() == &TokenKind::Or {
            self.operator()?;
            let right = self.parse_and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_not_expr()?;
        while self.peek_kind() == &TokenKind::And {
            self.operator()?;
            let right = self.parse_not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&TokenKind::Not) {
            let inner = self.nested(Self::parse_not_expr)?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_cmp_expr()
    }

    fn parse_cmp_expr(&mut self) -> Result<Expr, ExprError> {
        let first = self.parse_sum_expr()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Eq => CmpOp::Eq,
                TokenKind::Ne => CmpOp::Ne,
                TokenKind::Lt => CmpOp::Lt,
                TokenKind::Le => CmpOp::Le,
                TokenKind::Gt => CmpOp::Gt,
                TokenKind::Ge => CmpOp::Ge,
                _ => break,
            };
            self.operator()?;
            rest.push((op, self.parse_sum_expr()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare(Box::new(first), rest))
        }
    }

    fn parse_sum_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_product_expr()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.operator()?;
            let right = self.parse_product_expr()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_product_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::SlashSlash => BinaryOp::FloorDiv,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.operator()?;
            let right = self.parse_unary_expr()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&TokenKind::Minus) {
            let inner = self.nested(Self::parse_unary_expr)?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_primary_expr()
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ExprError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Integer(v) => Ok(Expr::Int(v)),
            TokenKind::Float(v) => Ok(Expr::Float(v)),
            TokenKind::True => Ok(Expr::Bool(true)),
            TokenKind::False => Ok(Expr::Bool(false)),
            TokenKind::Ident(name) => Ok(Expr::Var(name)),
            TokenKind::LParen => {
                let inner = self.nested(Self::parse_or_expr)?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            other => Err(ExprError::UnexpectedToken {
                col: token.col,
                found: other.to_string(),
                expected: "a value".to_string(),
            }),
        }
    }

    // Helpers

    fn peek(&self) -> &Token {
        // the lexer always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<(), ExprError> {
        if self.eat(kind) {
            Ok(())
        } else {
            let token = self.peek();
            Err(ExprError::UnexpectedToken {
                col: token.col,
                found: token.kind.to_string(),
                expected: expected.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::lexer::tokenize;

    fn parse(src: &str) -> Result<Expr, ExprError> {
        Parser::new(tokenize(src)?).parse()
    }

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::Var(name.to_string()))
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse("a || b && c").unwrap();
        assert_eq!(
            expr,
            Expr::Or(var("a"), Box::new(Expr::And(var("b"), var("c"))))
        );
    }

    #[test]
    fn test_product_binds_tighter_than_sum() {
        let expr = parse("a + b * 2").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Add,
                var("a"),
                Box::new(Expr::Binary(BinaryOp::Mul, var("b"), Box::new(Expr::Int(2))))
            )
        );
    }

    #[test]
    fn test_left_associative_subtraction() {
        let expr = parse("a - b - c").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Sub,
                Box::new(Expr::Binary(BinaryOp::Sub, var("a"), var("b"))),
                var("c")
            )
        );
    }

    #[test]
    fn test_chained_comparison() {
        let expr = parse("0 < a <= 10").unwrap();
        assert_eq!(
            expr,
            Expr::Compare(
                Box::new(Expr::Int(0)),
                vec![(CmpOp::Lt, Expr::Var("a".into())), (CmpOp::Le, Expr::Int(10))]
            )
        );
    }

    #[test]
    fn test_not_and_parentheses() {
        let expr = parse("!(a == 1)").unwrap();
        assert_eq!(
            expr,
            Expr::Not(Box::new(Expr::Compare(
                var("a"),
                vec![(CmpOp::Eq, Expr::Int(1))]
            )))
        );
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(
            parse("--1").unwrap(),
            Expr::Neg(Box::new(Expr::Neg(Box::new(Expr::Int(1)))))
        );
    }

    #[test]
    fn test_errors_report_column() {
        match parse("a < ") {
            Err(ExprError::UnexpectedToken { col, .. }) => assert_eq!(col, 5),
            other => panic!("unexpected {:?}", other),
        }
        match parse("(a < 1") {
            Err(ExprError::UnexpectedToken { expected, .. }) => assert_eq!(expected, "')'"),
            other => panic!("unexpected {:?}", other),
        }
        match parse("a b") {
            Err(ExprError::UnexpectedToken { col, found, .. }) => {
                assert_eq!(col, 3);
                assert_eq!(found, "b");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_variables_in_source_order() {
        let expr = parse("NumIRInsts > 10 && NumLLVMBytesOutput < NumIRInsts * 2").unwrap();
        assert_eq!(
            expr.variables(),
            vec!["NumIRInsts", "NumLLVMBytesOutput", "NumIRInsts"]
        );
    }

    #[test]
    fn test_nesting_limit() {
        let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(parse(&shallow).unwrap(), Expr::Int(1));

        let deep = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        assert!(matches!(parse(&deep), Err(ExprError::TooDeep { .. })));
        assert!(matches!(parse(&"-".repeat(500)), Err(ExprError::TooDeep { .. })));
    }

    #[test]
    fn test_long_operator_chains_are_rejected() {
        let sum = vec!["1"; 100_000].join("+");
        match parse(&sum) {
            Err(ExprError::TooDeep { col }) => assert_eq!(col, 2 * MAX_OPERATORS + 2),
            other => panic!("unexpected {:?}", other),
        }

        let conjunction = vec!["a"; 5_000].join(" && ");
        assert!(matches!(parse(&conjunction), Err(ExprError::TooDeep { .. })));

        let within_budget = vec!["1"; MAX_OPERATORS + 1].join("+");
        assert!(parse(&within_budget).is_ok());
    }
}
