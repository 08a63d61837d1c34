use std::fmt;

/// The two binary operators of the kernel language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOpKind {
    /// `+`: ordered co-occurrence of two results.
    Compose,
    /// `/`: divides the salience of the left result.
    Dilute,
}

impl BinOpKind {
    pub fn symbol(&self) -> char {
        match self {
            Self::Compose => '+',
            Self::Dilute => '/',
        }
    }
}

/// A literal value written directly in kernel source.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Number(f64),
}

/// A node of a parsed kernel expression. Trees are immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Call {
        name: String,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
    BinOp {
        op: BinOpKind,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Name(String),
    Literal(Literal),
    List(Vec<Expr>),
}

impl Expr {
    pub fn call(name: &str, args: Vec<Expr>) -> Self {
        Self::Call {
            name: name.to_string(),
            args,
            kwargs: Vec::new(),
        }
    }

    pub fn name(name: &str) -> Self {
        Self::Name(name.to_string())
    }

    pub fn number(n: f64) -> Self {
        Self::Literal(Literal::Number(n))
    }

    pub fn string(s: &str) -> Self {
        Self::Literal(Literal::Str(s.to_string()))
    }

    pub fn binop(op: BinOpKind, left: Expr, right: Expr) -> Self {
        Self::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// The identifier that best names this sub-tree: the call or name itself,
    /// or the head of the left operand of an operator.
    pub fn head_name(&self) -> Option<&str> {
        match self {
            Self::Call { name, .. } | Self::Name(name) => Some(name),
            Self::BinOp { left, .. } => left.head_name(),
            Self::List(items) => items.first().and_then(Expr::head_name),
            Self::Literal(_) => None,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::BinOp {
                op: BinOpKind::Compose,
                ..
            } => 1,
            Self::BinOp {
                op: BinOpKind::Dilute,
                ..
            } => 2,
            _ => 3,
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, min: u8) -> fmt::Result {
    if expr.precedence() < min {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            other => write!(f, "{}", other)?,
        }
    }
    f.write_str("\"")
}

/// Canonical source form. Parsing the output yields an identical tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call { name, args, kwargs } => {
                write!(f, "{}(", name)?;
                let mut first = true;
                for arg in args {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "{}", arg)?;
                }
                for (key, value) in kwargs {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "{}={}", key, value)?;
                }
                f.write_str(")")
            }
            Self::BinOp { op, left, right } => {
                let level = match op {
                    BinOpKind::Compose => 1,
                    BinOpKind::Dilute => 2,
                };
                // Left-associative: the right operand needs parentheses at the
                // same precedence level.
                write_operand(f, left, level)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right, level + 1)
            }
            Self::Name(name) => f.write_str(name),
            Self::Literal(Literal::Number(n)) => write!(f, "{}", n),
            Self::Literal(Literal::Str(s)) => write_string(f, s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A parsed kernel source: top-level statements in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Expr>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stmt) in self.statements.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_call_with_kwargs() {
        let e = Expr::Call {
            name: "Journey".to_string(),
            args: vec![Expr::name("Lily")],
            kwargs: vec![("state".to_string(), Expr::name("Routine"))],
        };
        assert_eq!(e.to_string(), "Journey(Lily, state=Routine)");
    }

    #[test]
    fn display_parenthesizes_right_nested_compose() {
        let e = Expr::binop(
            BinOpKind::Compose,
            Expr::name("A"),
            Expr::binop(BinOpKind::Compose, Expr::name("B"), Expr::name("C")),
        );
        assert_eq!(e.to_string(), "A + (B + C)");
    }

    #[test]
    fn display_parenthesizes_compose_under_dilute() {
        let e = Expr::binop(
            BinOpKind::Dilute,
            Expr::binop(BinOpKind::Compose, Expr::name("A"), Expr::name("B")),
            Expr::number(10.0),
        );
        assert_eq!(e.to_string(), "(A + B) / 10");
    }

    #[test]
    fn display_escapes_strings() {
        let e = Expr::List(vec![Expr::string("say \"hi\""), Expr::number(0.5)]);
        assert_eq!(e.to_string(), r#"["say \"hi\"", 0.5]"#);
    }

    #[test]
    fn head_name_follows_left_operand() {
        let e = Expr::binop(BinOpKind::Dilute, Expr::call("X", vec![]), Expr::number(0.0));
        assert_eq!(e.head_name(), Some("X"));
        assert_eq!(Expr::number(1.0).head_name(), None);
    }
}
