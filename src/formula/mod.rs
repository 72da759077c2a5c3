//! Modifier Formulas
//!
//! A modifier formula turns a modifier's level and the surrounding event values
//! into an adjusted stat value. Two forms exist:
//! - **Simple**: a leveled value (`flat + each_level * level`) combined with the
//!   stat through a fallback mode. `Boost` adds the leveled value to the stat;
//!   `Percent` multiplies the stat by `1 + leveled value`. Both assume the
//!   convention that variable slot 0 is the level and slot 1 is the stat value
//!   being adjusted.
//! - **Expression**: a postfix token program over a named variable set. Programs
//!   are validated at construction (operand discipline, exactly one result);
//!   evaluation is then total, with IEEE float semantics for division by zero
//!   and friends.
//!
//! Config form: a `amount` field (object or bare number meaning `each_level`)
//! for simple formulas, or a `formula` token array for expressions. The wire
//! form is self-describing given the variable set and fallback mode, which the
//! surrounding rule supplies after reading its own `percent` flag.

use serde::{Deserialize, Deserializer, Serialize};

use crate::tool::ModifierEntry;
use crate::wire::{WireError, WireReader, WireWriter};

/// Variable slot holding the modifier level
pub const LEVEL_SLOT: usize = 0;
/// Variable slot holding the stat value being adjusted
pub const STAT_SLOT: usize = 1;

/// Formula parse/validation errors, surfaced at load time
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormulaError {
    #[error("Formula config needs either `amount` or `formula`")]
    MissingFormula,
    #[error("Formula config has both `amount` and `formula`")]
    AmbiguousFormula,
    #[error("Empty formula")]
    Empty,
    #[error("Unknown token `{0}` in formula")]
    UnknownToken(String),
    #[error("Operator `{op}` at token {index} has too few operands")]
    StackUnderflow { op: &'static str, index: usize },
    #[error("Formula leaves {depth} values on the stack, expected exactly 1")]
    UnbalancedStack { depth: usize },
    #[error("Variable index {index} out of range for {count} variables")]
    BadVariable { index: u8, count: usize },
}

/// A named, ordered variable set a formula evaluates over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variables {
    names: &'static [&'static str],
}

impl Variables {
    pub const fn new(names: &'static [&'static str]) -> Self {
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<u8> {
        self.names.iter().position(|n| *n == name).map(|i| i as u8)
    }

    pub fn name(&self, index: u8) -> Option<&'static str> {
        self.names.get(index as usize).copied()
    }
}

/// How a simple formula combines its leveled value with the stat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackFormula {
    /// `stat + leveled` — additive boost
    Boost,
    /// `stat * (1 + leveled)` — percent multiplier
    Percent,
}

impl FallbackFormula {
    fn apply(&self, values: &[f32], leveled: f32) -> f32 {
        let stat = values.get(STAT_SLOT).copied().unwrap_or(0.0);
        match self {
            Self::Boost => stat + leveled,
            Self::Percent => stat * (1.0 + leveled),
        }
    }
}

/// A value that scales with modifier level: `flat + each_level * level`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct LeveledValue {
    #[serde(default)]
    pub flat: f32,
    #[serde(default)]
    pub each_level: f32,
}

impl LeveledValue {
    pub fn flat(value: f32) -> Self {
        Self {
            flat: value,
            each_level: 0.0,
        }
    }

    pub fn each_level(value: f32) -> Self {
        Self {
            flat: 0.0,
            each_level: value,
        }
    }

    pub fn leveled(&self, level: f32) -> f32 {
        self.flat + self.each_level * level
    }
}

// A bare number in config means per-level scaling, the common case
impl<'de> Deserialize<'de> for LeveledValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Scaling(f32),
            Full {
                #[serde(default)]
                flat: f32,
                #[serde(default)]
                each_level: f32,
            },
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Scaling(v) => LeveledValue::each_level(v),
            Raw::Full { flat, each_level } => LeveledValue { flat, each_level },
        })
    }
}

/// Binary operators available in expression formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
    Pow,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Min => "min",
            Self::Max => "max",
            Self::Pow => "pow",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "min" => Self::Min,
            "max" => Self::Max,
            "pow" => Self::Pow,
            _ => return None,
        })
    }

    fn apply(&self, a: f32, b: f32) -> f32 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => a / b,
            Self::Min => a.min(b),
            Self::Max => a.max(b),
            Self::Pow => a.powf(b),
        }
    }

    fn opcode(&self) -> u8 {
        match self {
            Self::Add => 0,
            Self::Sub => 1,
            Self::Mul => 2,
            Self::Div => 3,
            Self::Min => 4,
            Self::Max => 5,
            Self::Pow => 6,
        }
    }

    fn from_opcode(opcode: u8) -> Result<Self, WireError> {
        Ok(match opcode {
            0 => Self::Add,
            1 => Self::Sub,
            2 => Self::Mul,
            3 => Self::Div,
            4 => Self::Min,
            5 => Self::Max,
            6 => Self::Pow,
            tag => {
                return Err(WireError::UnknownTag {
                    what: "formula operator",
                    tag,
                })
            }
        })
    }
}

/// One postfix token
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    Constant(f32),
    Variable(u8),
    Op(BinOp),
}

/// A validated postfix expression over a variable set
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    tokens: Vec<Token>,
}

impl Expression {
    /// Validates operand discipline: every operator finds two operands and the
    /// program leaves exactly one value behind.
    pub fn new(tokens: Vec<Token>, variable_count: usize) -> Result<Self, FormulaError> {
        if tokens.is_empty() {
            return Err(FormulaError::Empty);
        }
        let mut depth: usize = 0;
        for (index, token) in tokens.iter().enumerate() {
            match token {
                Token::Constant(_) => depth += 1,
                Token::Variable(i) => {
                    if *i as usize >= variable_count {
                        return Err(FormulaError::BadVariable {
                            index: *i,
                            count: variable_count,
                        });
                    }
                    depth += 1;
                }
                Token::Op(op) => {
                    if depth < 2 {
                        return Err(FormulaError::StackUnderflow {
                            op: op.symbol(),
                            index,
                        });
                    }
                    depth -= 1;
                }
            }
        }
        if depth != 1 {
            return Err(FormulaError::UnbalancedStack { depth });
        }
        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Total over validated programs; unset variable slots read as 0
    pub fn evaluate(&self, values: &[f32]) -> f32 {
        let mut stack: Vec<f32> = Vec::with_capacity(8);
        for token in &self.tokens {
            match token {
                Token::Constant(c) => stack.push(*c),
                Token::Variable(i) => {
                    stack.push(values.get(*i as usize).copied().unwrap_or(0.0))
                }
                Token::Op(op) => {
                    let b = stack.pop().unwrap_or(0.0);
                    let a = stack.pop().unwrap_or(0.0);
                    stack.push(op.apply(a, b));
                }
            }
        }
        stack.pop().unwrap_or(0.0)
    }
}

/// Raw token as it appears in config: a number, or a variable/operator name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawToken {
    Number(f32),
    Name(String),
}

/// The formula-owned slice of a rule's config object
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FormulaConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<LeveledValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<Vec<RawToken>>,
}

#[derive(Debug, Clone, PartialEq)]
enum FormulaKind {
    Simple(LeveledValue),
    Expression(Expression),
}

// Wire kind tags
const KIND_SIMPLE: u8 = 0;
const KIND_EXPRESSION: u8 = 1;
const TOKEN_CONSTANT: u8 = 0;
const TOKEN_VARIABLE: u8 = 1;
const TOKEN_OP: u8 = 2;

/// A modifier formula: simple leveled value or postfix expression, bound to a
/// variable set and a fallback mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifierFormula {
    kind: FormulaKind,
    fallback: FallbackFormula,
    variables: Variables,
}

impl ModifierFormula {
    pub fn simple(value: LeveledValue, fallback: FallbackFormula, variables: Variables) -> Self {
        debug_assert!(variables.len() > STAT_SLOT, "variable set too small for fallback");
        Self {
            kind: FormulaKind::Simple(value),
            fallback,
            variables,
        }
    }

    pub fn expression(
        expression: Expression,
        fallback: FallbackFormula,
        variables: Variables,
    ) -> Self {
        Self {
            kind: FormulaKind::Expression(expression),
            fallback,
            variables,
        }
    }

    pub fn fallback(&self) -> FallbackFormula {
        self.fallback
    }

    pub fn variables(&self) -> Variables {
        self.variables
    }

    /// The level fed into slot 0 for this modifier entry
    pub fn compute_level(&self, entry: &ModifierEntry) -> f32 {
        entry.level as f32
    }

    /// Evaluates the formula; `values` must follow the variable-set order
    pub fn apply(&self, values: &[f32]) -> f32 {
        debug_assert_eq!(values.len(), self.variables.len());
        match &self.kind {
            FormulaKind::Simple(value) => {
                let level = values.get(LEVEL_SLOT).copied().unwrap_or(0.0);
                self.fallback.apply(values, value.leveled(level))
            }
            FormulaKind::Expression(expr) => expr.evaluate(values),
        }
    }

    /// Builds a formula from the config fields, resolving variable names
    pub fn from_config(
        config: &FormulaConfig,
        variables: Variables,
        fallback: FallbackFormula,
    ) -> Result<Self, FormulaError> {
        match (&config.amount, &config.formula) {
            (Some(_), Some(_)) => Err(FormulaError::AmbiguousFormula),
            (Some(amount), None) => Ok(Self::simple(*amount, fallback, variables)),
            (None, Some(tokens)) => {
                let mut parsed = Vec::with_capacity(tokens.len());
                for token in tokens {
                    parsed.push(match token {
                        RawToken::Number(n) => Token::Constant(*n),
                        RawToken::Name(name) => match variables.index_of(name) {
                            Some(index) => Token::Variable(index),
                            None => match BinOp::from_symbol(name) {
                                Some(op) => Token::Op(op),
                                None => return Err(FormulaError::UnknownToken(name.clone())),
                            },
                        },
                    });
                }
                let expr = Expression::new(parsed, variables.len())?;
                Ok(Self::expression(expr, fallback, variables))
            }
            (None, None) => Err(FormulaError::MissingFormula),
        }
    }

    pub fn to_config(&self) -> FormulaConfig {
        match &self.kind {
            FormulaKind::Simple(value) => FormulaConfig {
                amount: Some(*value),
                formula: None,
            },
            FormulaKind::Expression(expr) => FormulaConfig {
                amount: None,
                formula: Some(
                    expr.tokens()
                        .iter()
                        .map(|token| match token {
                            Token::Constant(c) => RawToken::Number(*c),
                            // Variable indices were validated against this set
                            Token::Variable(i) => RawToken::Name(
                                self.variables.name(*i).unwrap_or("?").to_string(),
                            ),
                            Token::Op(op) => RawToken::Name(op.symbol().to_string()),
                        })
                        .collect(),
                ),
            },
        }
    }

    pub fn encode(&self, w: &mut WireWriter) {
        match &self.kind {
            FormulaKind::Simple(value) => {
                w.write_u8(KIND_SIMPLE);
                w.write_f32(value.flat);
                w.write_f32(value.each_level);
            }
            FormulaKind::Expression(expr) => {
                w.write_u8(KIND_EXPRESSION);
                w.write_u16(expr.tokens().len() as u16);
                for token in expr.tokens() {
                    match token {
                        Token::Constant(c) => {
                            w.write_u8(TOKEN_CONSTANT);
                            w.write_f32(*c);
                        }
                        Token::Variable(i) => {
                            w.write_u8(TOKEN_VARIABLE);
                            w.write_u8(*i);
                        }
                        Token::Op(op) => {
                            w.write_u8(TOKEN_OP);
                            w.write_u8(op.opcode());
                        }
                    }
                }
            }
        }
    }

    pub fn decode(
        r: &mut WireReader<'_>,
        variables: Variables,
        fallback: FallbackFormula,
    ) -> Result<Self, WireError> {
        match r.read_u8()? {
            KIND_SIMPLE => {
                let flat = r.read_f32()?;
                let each_level = r.read_f32()?;
                Ok(Self::simple(
                    LeveledValue { flat, each_level },
                    fallback,
                    variables,
                ))
            }
            KIND_EXPRESSION => {
                let count = r.read_u16()?;
                let mut tokens = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    tokens.push(match r.read_u8()? {
                        TOKEN_CONSTANT => Token::Constant(r.read_f32()?),
                        TOKEN_VARIABLE => Token::Variable(r.read_u8()?),
                        TOKEN_OP => Token::Op(BinOp::from_opcode(r.read_u8()?)?),
                        tag => {
                            return Err(WireError::UnknownTag {
                                what: "formula token",
                                tag,
                            })
                        }
                    });
                }
                let expr = Expression::new(tokens, variables.len())?;
                Ok(Self::expression(expr, fallback, variables))
            }
            tag => Err(WireError::UnknownTag {
                what: "formula kind",
                tag,
            }),
        }
    }
}
