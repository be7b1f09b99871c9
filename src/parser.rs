use crate::ast::{is_project_node, Node, Token, TokenKind};
use crate::lexer::{LexError, Lexer};
use crate::value::Value;

/// Errors that can occur while parsing an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Lexer failure
    Lex(LexError),
    /// A token that cannot appear at this position
    UnexpectedToken(String),
    /// Function name not in the built-in table
    UnknownFunction(String),
    /// Wrong number of arguments for a function
    InvalidFunctionCall(String),
    /// An argument position that requires a different kind of argument
    InvalidFunctionArgument {
        function: String,
        want: &'static str,
    },
    /// An index literal that does not fit an integer
    InvalidIndex(String),
    /// A backtick literal that is not valid JSON
    InvalidJsonLiteral(String),
    /// A quoted identifier with an invalid escape sequence
    InvalidQuotedString(String),
    /// A slice step of zero
    InvalidSliceStep,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Lex(e) => write!(f, "{}", e),
            ParseError::UnexpectedToken(s) => write!(f, "unexpected token {:?}", s),
            ParseError::UnknownFunction(s) => write!(f, "call to unknown function {:?}", s),
            ParseError::InvalidFunctionCall(s) => write!(f, "invalid call to function {:?}", s),
            ParseError::InvalidFunctionArgument { function, want } => {
                write!(
                    f,
                    "invalid argument to function {:?} when expecting {}",
                    function, want
                )
            }
            ParseError::InvalidIndex(s) => write!(f, "invalid index {:?}", s),
            ParseError::InvalidJsonLiteral(s) => write!(f, "invalid json literal {:?}", s),
            ParseError::InvalidQuotedString(s) => write!(f, "invalid quoted string {:?}", s),
            ParseError::InvalidSliceStep => write!(f, "invalid slice step value"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::Lex(e)
    }
}

/// Binding power of each operator token. Zero means the token cannot
/// continue an expression.
fn precedence(kind: TokenKind) -> u8 {
    match kind {
        TokenKind::Pipe => 2,
        TokenKind::Or => 3,
        TokenKind::And => 4,
        TokenKind::Equal
        | TokenKind::Greater
        | TokenKind::GreaterOrEqual
        | TokenKind::Less
        | TokenKind::LessOrEqual
        | TokenKind::NotEqual => 5,
        TokenKind::Add | TokenKind::Subtract => 6,
        TokenKind::Asterisk
        | TokenKind::Divide
        | TokenKind::IntegerDivide
        | TokenKind::Modulo
        | TokenKind::Multiply => 7,
        TokenKind::Flatten => 8,
        TokenKind::ObjectWildcard => 9,
        TokenKind::Filter => 10,
        TokenKind::Dot => 11,
        TokenKind::Not => 12,
        TokenKind::ArrayWildcard | TokenKind::OpenSqBrace => 13,
        _ => 0,
    }
}

/// Parse an expression into an operation tree.
pub fn parse(expression: &str) -> Result<Node, ParseError> {
    let mut lexer = Lexer::new(expression);
    let curr = lexer.next_token()?;
    let next = lexer.next_token()?;

    let mut parser = Parser { lexer, curr, next };
    parser.parse()
}

/// Pratt parser with two-token lookahead.
struct Parser<'a> {
    lexer: Lexer<'a>,
    curr: Token<'a>,
    next: Token<'a>,
}

impl<'a> Parser<'a> {
    fn advance(&mut self) -> Result<(), ParseError> {
        self.curr = self.next;
        self.next = self.lexer.next_token()?;
        Ok(())
    }

    fn advance2(&mut self) -> Result<(), ParseError> {
        self.curr = self.lexer.next_token()?;
        self.next = self.lexer.next_token()?;
        Ok(())
    }

    fn unexpected(token: Token<'_>) -> ParseError {
        ParseError::UnexpectedToken(token.text.to_string())
    }

    fn parse(&mut self) -> Result<Node, ParseError> {
        let node = self.expression(1)?;

        if self.curr.kind != TokenKind::End {
            return Err(Self::unexpected(self.curr));
        }

        Ok(node)
    }

    fn expression(&mut self, prec: u8) -> Result<Node, ParseError> {
        let mut node = self.primary_expression()?;

        let mut new_prec = precedence(self.curr.kind);
        while new_prec > prec {
            match self.curr.kind {
                TokenKind::Add => {
                    self.advance()?;
                    let right = self.expression(new_prec)?;
                    node = Node::Add {
                        left: Box::new(node),
                        right: Box::new(right),
                    };
                }
                TokenKind::And => {
                    self.advance()?;
                    let right = self.expression(new_prec)?;
                    node = Node::And {
                        left: Box::new(node),
                        right: Box::new(right),
                    };
                }
                TokenKind::ArrayWildcard => {
                    self.advance()?;
                    match self.projection(precedence(TokenKind::ObjectWildcard))? {
                        Some(right) => {
                            node = Node::ProjectArray {
                                left: Box::new(node),
                                right: Box::new(right),
                            };
                        }
                        None => {
                            node = Node::PruneArray {
                                child: Box::new(node),
                            };
                        }
                    }
                }
                TokenKind::Asterisk | TokenKind::Multiply => {
                    self.advance()?;
                    let right = self.expression(new_prec)?;
                    node = Node::Multiply {
                        left: Box::new(node),
                        right: Box::new(right),
                    };
                }
                TokenKind::Divide => {
                    self.advance()?;
                    let right = self.expression(new_prec)?;
                    node = Node::Divide {
                        left: Box::new(node),
                        right: Box::new(right),
                    };
                }
                TokenKind::Dot => node = self.dot_continuation(node, new_prec)?,
                TokenKind::Equal => {
                    self.advance()?;
                    let right = self.expression(new_prec)?;
                    node = Node::Equal {
                        left: Box::new(node),
                        right: Box::new(right),
                    };
                }
                TokenKind::Filter => {
                    self.advance()?;
                    let filter = self.filter()?;
                    match self.projection(new_prec)? {
                        Some(right) => {
                            node = Node::FilterProject {
                                left: Box::new(node),
                                filter: Box::new(filter),
                                right: Box::new(right),
                            };
                        }
                        None => {
                            node = Node::Filter {
                                child: Box::new(node),
                                filter: Box::new(filter),
                            };
                        }
                    }
                }
                TokenKind::Flatten => {
                    self.advance()?;
                    match self.projection(new_prec)? {
                        Some(right) => {
                            node = Node::FlattenProject {
                                left: Box::new(node),
                                right: Box::new(right),
                            };
                        }
                        None => {
                            node = Node::Flatten {
                                child: Box::new(node),
                            };
                        }
                    }
                }
                TokenKind::Greater => {
                    self.advance()?;
                    let right = self.expression(new_prec)?;
                    node = Node::Greater {
                        left: Box::new(node),
                        right: Box::new(right),
                    };
                }
                TokenKind::GreaterOrEqual => {
                    self.advance()?;
                    let right = self.expression(new_prec)?;
                    node = Node::GreaterOrEqual {
                        left: Box::new(node),
                        right: Box::new(right),
                    };
                }
                TokenKind::IntegerDivide => {
                    self.advance()?;
                    let right = self.expression(new_prec)?;
                    node = Node::IntegerDivide {
                        left: Box::new(node),
                        right: Box::new(right),
                    };
                }
                TokenKind::Less => {
                    self.advance()?;
                    let right = self.expression(new_prec)?;
                    node = Node::Less {
                        left: Box::new(node),
                        right: Box::new(right),
                    };
                }
                TokenKind::LessOrEqual => {
                    self.advance()?;
                    let right = self.expression(new_prec)?;
                    node = Node::LessOrEqual {
                        left: Box::new(node),
                        right: Box::new(right),
                    };
                }
                TokenKind::Modulo => {
                    self.advance()?;
                    let right = self.expression(new_prec)?;
                    node = Node::Modulo {
                        left: Box::new(node),
                        right: Box::new(right),
                    };
                }
                TokenKind::NotEqual => {
                    self.advance()?;
                    let right = self.expression(new_prec)?;
                    node = Node::NotEqual {
                        left: Box::new(node),
                        right: Box::new(right),
                    };
                }
                TokenKind::ObjectWildcard => {
                    self.advance()?;
                    match self.projection(new_prec)? {
                        Some(right) => {
                            node = Node::ProjectObject {
                                left: Box::new(node),
                                right: Box::new(right),
                            };
                        }
                        None => {
                            node = Node::ObjectValues {
                                child: Box::new(node),
                            };
                        }
                    }
                }
                TokenKind::OpenSqBrace => {
                    self.advance()?;
                    let (indexed, project) = self.index(Some(node))?;
                    node = indexed;

                    if project {
                        if let Some(right) = self.projection(new_prec)? {
                            node = Node::ProjectArray {
                                left: Box::new(node),
                                right: Box::new(right),
                            };
                        }
                    }
                }
                TokenKind::Or => {
                    self.advance()?;
                    let right = self.expression(new_prec)?;
                    node = Node::Or {
                        left: Box::new(node),
                        right: Box::new(right),
                    };
                }
                TokenKind::Pipe => {
                    self.advance()?;
                    let right = self.expression(new_prec)?;
                    node = Node::Pipe {
                        left: Box::new(node),
                        right: Box::new(right),
                    };
                }
                TokenKind::Subtract => {
                    self.advance()?;
                    let right = self.expression(new_prec)?;
                    node = Node::Subtract {
                        left: Box::new(node),
                        right: Box::new(right),
                    };
                }
                _ => return Ok(node),
            }

            new_prec = precedence(self.curr.kind);
        }

        Ok(node)
    }

    /// An infix `.` continuation. Identifier continuations after a
    /// projection stay inside the projection; a plain field access becomes
    /// the compact `PipeField` form; anything binding tighter on the right
    /// becomes a pipe.
    fn dot_continuation(&mut self, node: Node, new_prec: u8) -> Result<Node, ParseError> {
        match self.next.kind {
            TokenKind::ArrayWildcard => {
                self.advance2()?;

                Ok(Node::SelectArraySingle {
                    child: Box::new(node),
                    field: Box::new(Node::ObjectValuesCurrent),
                })
            }
            TokenKind::OpenBrace => {
                self.advance2()?;
                self.select_object(Some(node))
            }
            TokenKind::OpenSqBrace => {
                self.advance2()?;
                self.select_array(Some(node))
            }
            TokenKind::QuotedIdentifier => {
                self.advance()?;

                if is_project_node(&node) {
                    let right = self.expression(new_prec)?;

                    Ok(Node::ProjectArray {
                        left: Box::new(node),
                        right: Box::new(right),
                    })
                } else if precedence(self.next.kind) > new_prec {
                    let right = self.expression(new_prec)?;

                    Ok(Node::Pipe {
                        left: Box::new(node),
                        right: Box::new(right),
                    })
                } else {
                    let field = parse_quoted_identifier(self.curr.text)?;
                    self.advance()?;

                    Ok(Node::PipeField {
                        left: Box::new(node),
                        field,
                    })
                }
            }
            TokenKind::UnquotedIdentifier => {
                self.advance()?;

                if is_project_node(&node) {
                    let right = self.expression(new_prec)?;

                    Ok(Node::ProjectArray {
                        left: Box::new(node),
                        right: Box::new(right),
                    })
                } else if self.next.kind == TokenKind::OpenParen
                    || precedence(self.next.kind) > new_prec
                {
                    let right = self.expression(new_prec)?;

                    Ok(Node::Pipe {
                        left: Box::new(node),
                        right: Box::new(right),
                    })
                } else {
                    let field = self.curr.text.to_string();
                    self.advance()?;

                    Ok(Node::PipeField {
                        left: Box::new(node),
                        field,
                    })
                }
            }
            _ => Err(Self::unexpected(self.curr)),
        }
    }

    /// Parse the predicate of a `[?...]` form up to its closing bracket.
    fn filter(&mut self) -> Result<Node, ParseError> {
        let node = self.expression(1)?;

        if self.curr.kind != TokenKind::CloseSqBrace {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;
        Ok(node)
    }

    /// Try to parse a projection body. Returns `None` when the current
    /// token cannot continue a projection, in which case the caller emits a
    /// pruner instead of a projector.
    fn projection(&mut self, prec: u8) -> Result<Option<Node>, ParseError> {
        let mut node = match self.curr.kind {
            TokenKind::Dot => match self.next.kind {
                TokenKind::ArrayWildcard => {
                    self.advance2()?;

                    Node::SelectArraySingleCurrent {
                        field: Box::new(Node::ObjectValuesCurrent),
                    }
                }
                TokenKind::OpenBrace => {
                    self.advance2()?;
                    self.select_object(None)?
                }
                TokenKind::OpenSqBrace => {
                    self.advance2()?;
                    self.select_array(None)?
                }
                TokenKind::QuotedIdentifier | TokenKind::UnquotedIdentifier => {
                    self.advance()?;
                    self.expression(prec)?
                }
                _ => return Err(Self::unexpected(self.curr)),
            },
            TokenKind::Filter => {
                self.advance()?;
                let filter = self.filter()?;

                Node::FilterCurrent {
                    filter: Box::new(filter),
                }
            }
            TokenKind::ObjectWildcard => {
                if self.next.kind == TokenKind::End {
                    self.advance()?;

                    Node::ObjectValuesCurrent
                } else {
                    // Re-read `.*` as `*` so it parses as an object
                    // wildcard acting on the current value.
                    let text = self.curr.text;
                    self.curr = Token::new(TokenKind::Asterisk, &text[1..]);
                    self.expression(prec)?
                }
            }
            TokenKind::OpenSqBrace => {
                self.advance()?;
                self.index(None)?.0
            }
            _ => return Ok(None),
        };

        let mut new_prec = precedence(self.curr.kind);
        while new_prec > prec {
            match self.curr.kind {
                TokenKind::Dot => match self.next.kind {
                    TokenKind::ArrayWildcard => {
                        self.advance2()?;

                        node = Node::SelectArraySingle {
                            child: Box::new(node),
                            field: Box::new(Node::ObjectValuesCurrent),
                        };
                    }
                    TokenKind::OpenBrace => {
                        self.advance2()?;
                        node = self.select_object(Some(node))?;
                    }
                    TokenKind::OpenSqBrace => {
                        self.advance2()?;
                        node = self.select_array(Some(node))?;
                    }
                    TokenKind::QuotedIdentifier | TokenKind::UnquotedIdentifier => {
                        node = self.dot_continuation(node, new_prec)?;
                    }
                    _ => return Err(Self::unexpected(self.curr)),
                },
                TokenKind::Filter => {
                    self.advance()?;
                    let filter = self.filter()?;

                    node = Node::Filter {
                        child: Box::new(node),
                        filter: Box::new(filter),
                    };
                }
                TokenKind::ObjectWildcard => {
                    let text = self.curr.text;
                    self.curr = Token::new(TokenKind::Asterisk, &text[1..]);
                    let right = self.expression(new_prec)?;

                    node = Node::ProjectObject {
                        left: Box::new(node),
                        right: Box::new(right),
                    };
                }
                TokenKind::OpenSqBrace => {
                    self.advance()?;
                    node = self.index(Some(node))?.0;
                }
                _ => return Err(Self::unexpected(self.curr)),
            }

            new_prec = precedence(self.curr.kind);
        }

        Ok(Some(node))
    }

    fn parse_index_literal(&self) -> Result<i64, ParseError> {
        self.curr
            .text
            .parse::<i64>()
            .map_err(|_| ParseError::InvalidIndex(self.curr.text.to_string()))
    }

    /// Parse the inside of a `[...]` index or slice form. The boolean is
    /// true for slices, which project, and false for plain indexes, which
    /// do not.
    fn index(&mut self, child: Option<Node>) -> Result<(Node, bool), ParseError> {
        let mut have_start = false;
        let mut start = 0i64;
        if self.curr.kind == TokenKind::IntegerLiteral {
            start = self.parse_index_literal()?;

            if self.next.kind == TokenKind::CloseSqBrace {
                self.advance2()?;

                let node = match child {
                    None => {
                        if (0..=255).contains(&start) {
                            Node::SmallIndexCurrent(start as u8)
                        } else {
                            Node::IndexCurrent { index: start }
                        }
                    }
                    Some(child) => Node::Index {
                        child: Box::new(child),
                        index: start,
                    },
                };

                return Ok((node, false));
            } else if self.next.kind == TokenKind::Colon {
                self.advance2()?;
            } else {
                return Err(Self::unexpected(self.next));
            }

            have_start = true;
        } else if self.curr.kind == TokenKind::Colon {
            self.advance()?;
        } else {
            return Err(Self::unexpected(self.curr));
        }

        let mut have_stop = false;
        let mut stop = i64::MAX;
        if self.curr.kind == TokenKind::IntegerLiteral {
            stop = self.parse_index_literal()?;

            if self.next.kind == TokenKind::CloseSqBrace {
                self.advance2()?;
                return Ok((slice_node(child, start, stop), true));
            } else if self.next.kind == TokenKind::Colon {
                self.advance2()?;
            } else {
                return Err(Self::unexpected(self.next));
            }

            have_stop = true;
        } else if self.curr.kind == TokenKind::CloseSqBrace {
            self.advance()?;
            return Ok((slice_node(child, start, i64::MAX), true));
        } else if self.curr.kind == TokenKind::Colon {
            self.advance()?;
        } else {
            return Err(Self::unexpected(self.curr));
        }

        let mut step = 1i64;
        if self.curr.kind == TokenKind::IntegerLiteral {
            if self.next.kind != TokenKind::CloseSqBrace {
                return Err(Self::unexpected(self.next));
            }

            step = self.parse_index_literal()?;

            if step == 0 {
                return Err(ParseError::InvalidSliceStep);
            }

            if step < 0 {
                if !have_start {
                    start = i64::MAX;
                }

                if !have_stop {
                    stop = i64::MIN;
                }
            }

            self.advance2()?;
        } else if self.curr.kind == TokenKind::CloseSqBrace {
            self.advance()?;
        } else {
            return Err(Self::unexpected(self.curr));
        }

        if step == 1 {
            return Ok((slice_node(child, start, stop), true));
        }

        let node = match child {
            None => Node::SliceStepCurrent { start, stop, step },
            Some(child) => Node::SliceStep {
                child: Box::new(child),
                start,
                stop,
                step,
            },
        };

        Ok((node, true))
    }

    /// Parse `let $name = expr [, ...] in body`.
    fn let_bindings(&mut self) -> Result<Node, ParseError> {
        let mut bindings = Vec::new();
        loop {
            if self.curr.kind != TokenKind::Variable {
                return Err(Self::unexpected(self.curr));
            }

            if self.next.kind != TokenKind::Assign {
                return Err(Self::unexpected(self.next));
            }

            let name = self.curr.text[1..].to_string();
            self.advance2()?;

            let node = self.expression(1)?;
            bindings.push((name, node));

            if self.curr.kind == TokenKind::In {
                self.advance()?;
                break;
            }

            if self.curr.kind != TokenKind::Comma {
                return Err(Self::unexpected(self.curr));
            }

            self.advance()?;
        }

        let child = self.expression(1)?;

        Ok(Node::DefineVariables {
            bindings,
            child: Box::new(child),
        })
    }

    fn primary_expression(&mut self) -> Result<Node, ParseError> {
        match self.curr.kind {
            TokenKind::Add => {
                self.advance()?;
                let child = self.expression(precedence(TokenKind::Add))?;

                Ok(Node::AssertNumber {
                    child: Box::new(child),
                })
            }
            TokenKind::ArrayWildcard => {
                self.advance()?;

                match self.projection(precedence(TokenKind::ObjectWildcard))? {
                    Some(right) => Ok(Node::ProjectArrayCurrent {
                        right: Box::new(right),
                    }),
                    None => Ok(Node::PruneArrayCurrent),
                }
            }
            TokenKind::Asterisk => {
                self.advance()?;

                match self.projection(precedence(TokenKind::ObjectWildcard))? {
                    Some(right) => Ok(Node::ProjectObjectCurrent {
                        right: Box::new(right),
                    }),
                    None => Ok(Node::ObjectValuesCurrent),
                }
            }
            TokenKind::Current => {
                self.advance()?;
                Ok(Node::Current)
            }
            TokenKind::Filter => {
                self.advance()?;
                let filter = self.filter()?;

                match self.projection(precedence(TokenKind::Filter))? {
                    Some(right) => Ok(Node::FilterProjectCurrent {
                        filter: Box::new(filter),
                        right: Box::new(right),
                    }),
                    None => Ok(Node::FilterCurrent {
                        filter: Box::new(filter),
                    }),
                }
            }
            TokenKind::Flatten => {
                self.advance()?;

                match self.projection(precedence(TokenKind::Flatten))? {
                    Some(right) => Ok(Node::FlattenProjectCurrent {
                        right: Box::new(right),
                    }),
                    None => Ok(Node::FlattenCurrent),
                }
            }
            TokenKind::JsonLiteral => {
                let value = parse_json_literal(self.curr.text)?;
                self.advance()?;

                Ok(match value {
                    Value::Bool(b) => Node::Bool(b),
                    Value::Null => Node::Null,
                    value => Node::Literal(value),
                })
            }
            TokenKind::Let => {
                self.advance()?;
                self.let_bindings()
            }
            TokenKind::Not => {
                self.advance()?;
                let child = self.expression(precedence(TokenKind::Not))?;

                Ok(Node::Not {
                    child: Box::new(child),
                })
            }
            TokenKind::OpenParen => {
                self.advance()?;
                let node = self.expression(1)?;

                if self.curr.kind != TokenKind::CloseParen {
                    return Err(Self::unexpected(self.curr));
                }

                self.advance()?;
                Ok(node)
            }
            TokenKind::OpenBrace => {
                self.advance()?;
                self.select_object(None)
            }
            TokenKind::OpenSqBrace => {
                self.advance()?;

                if self.curr.kind == TokenKind::IntegerLiteral
                    || self.curr.kind == TokenKind::Colon
                {
                    let (mut node, project) = self.index(None)?;

                    if project {
                        if let Some(right) =
                            self.projection(precedence(TokenKind::OpenSqBrace))?
                        {
                            node = Node::ProjectArray {
                                left: Box::new(node),
                                right: Box::new(right),
                            };
                        }
                    }

                    Ok(node)
                } else {
                    self.select_array(None)
                }
            }
            TokenKind::QuotedIdentifier => {
                let field = parse_quoted_identifier(self.curr.text)?;
                self.advance()?;

                Ok(Node::Field(field))
            }
            TokenKind::Root => {
                self.advance()?;
                Ok(Node::Root)
            }
            TokenKind::StringLiteral => {
                let value = parse_string_literal(self.curr.text);
                self.advance()?;

                Ok(Node::Literal(Value::String(value)))
            }
            TokenKind::Subtract => {
                self.advance()?;
                let child = self.expression(precedence(TokenKind::Subtract))?;

                Ok(Node::Negate {
                    child: Box::new(child),
                })
            }
            TokenKind::UnquotedIdentifier => {
                if self.next.kind == TokenKind::OpenParen {
                    self.function()
                } else {
                    let field = self.curr.text.to_string();
                    self.advance()?;

                    Ok(Node::Field(field))
                }
            }
            TokenKind::Variable => {
                let name = self.curr.text[1..].to_string();
                self.advance()?;

                Ok(Node::Variable(name))
            }
            _ => Err(Self::unexpected(self.curr)),
        }
    }

    /// Parse a `[a, b, ...]` multiselect list, specializing the
    /// single-entry form.
    fn select_array(&mut self, child: Option<Node>) -> Result<Node, ParseError> {
        let mut fields = Vec::new();
        loop {
            let field = self.expression(1)?;

            match self.curr.kind {
                TokenKind::Comma => {
                    fields.push(field);
                    self.advance()?;
                }
                TokenKind::CloseSqBrace => {
                    self.advance()?;

                    if fields.is_empty() {
                        return Ok(match child {
                            None => Node::SelectArraySingleCurrent {
                                field: Box::new(field),
                            },
                            Some(child) => Node::SelectArraySingle {
                                child: Box::new(child),
                                field: Box::new(field),
                            },
                        });
                    }

                    fields.push(field);

                    return Ok(match child {
                        None => Node::SelectArrayCurrent { fields },
                        Some(child) => Node::SelectArray {
                            child: Box::new(child),
                            fields,
                        },
                    });
                }
                _ => return Err(Self::unexpected(self.curr)),
            }
        }
    }

    /// Parse a `{key: expr, ...}` multiselect hash, specializing the
    /// single-entry form.
    fn select_object(&mut self, child: Option<Node>) -> Result<Node, ParseError> {
        let mut fields = Vec::new();
        loop {
            let key = match self.curr.kind {
                TokenKind::QuotedIdentifier => parse_quoted_identifier(self.curr.text)?,
                TokenKind::UnquotedIdentifier => self.curr.text.to_string(),
                _ => return Err(Self::unexpected(self.curr)),
            };

            if self.next.kind != TokenKind::Colon {
                return Err(Self::unexpected(self.next));
            }

            self.advance2()?;

            let field = self.expression(1)?;

            match self.curr.kind {
                TokenKind::Comma => {
                    fields.push((key, field));
                    self.advance()?;
                }
                TokenKind::CloseBrace => {
                    self.advance()?;

                    if fields.is_empty() {
                        return Ok(match child {
                            None => Node::SelectObjectSingleCurrent {
                                key,
                                field: Box::new(field),
                            },
                            Some(child) => Node::SelectObjectSingle {
                                child: Box::new(child),
                                key,
                                field: Box::new(field),
                            },
                        });
                    }

                    fields.push((key, field));

                    return Ok(match child {
                        None => Node::SelectObjectCurrent { fields },
                        Some(child) => Node::SelectObject {
                            child: Box::new(child),
                            fields,
                        },
                    });
                }
                _ => return Err(Self::unexpected(self.curr)),
            }
        }
    }

    /// Parse a function call. The name has been seen as the current token
    /// and the next token is the opening parenthesis; each built-in has its
    /// argument shape checked here, at parse time.
    fn function(&mut self) -> Result<Node, ParseError> {
        let name = self.curr.text.to_string();
        self.advance2()?;

        match name.as_str() {
            "abs" => Ok(Node::Abs(Box::new(self.function_1_arg(&name)?))),
            "avg" => Ok(Node::Avg(Box::new(self.function_1_arg(&name)?))),
            "ceil" => Ok(Node::Ceil(Box::new(self.function_1_arg(&name)?))),
            "contains" => Ok(Node::Contains(self.function_2_arg(&name)?)),
            "ends_with" => Ok(Node::EndsWith(self.function_2_arg(&name)?)),
            "find_first" => {
                let (arg1, arg2, arg3, arg4) = self.function_2_to_4_arg(&name)?;

                match (arg3, arg4) {
                    (None, _) => Ok(Node::FindFirst(Box::new([arg1, arg2]))),
                    (Some(arg3), None) => Ok(Node::FindFirstFrom(Box::new([arg1, arg2, arg3]))),
                    (Some(arg3), Some(arg4)) => {
                        Ok(Node::FindFirstBetween(Box::new([arg1, arg2, arg3, arg4])))
                    }
                }
            }
            "find_last" => {
                let (arg1, arg2, arg3, arg4) = self.function_2_to_4_arg(&name)?;

                match (arg3, arg4) {
                    (None, _) => Ok(Node::FindLast(Box::new([arg1, arg2]))),
                    (Some(arg3), None) => Ok(Node::FindLastFrom(Box::new([arg1, arg2, arg3]))),
                    (Some(arg3), Some(arg4)) => {
                        Ok(Node::FindLastBetween(Box::new([arg1, arg2, arg3, arg4])))
                    }
                }
            }
            "floor" => Ok(Node::Floor(Box::new(self.function_1_arg(&name)?))),
            "from_items" => Ok(Node::FromItems(Box::new(self.function_1_arg(&name)?))),
            "group_by" => Ok(Node::GroupBy(self.function_2_exp_arg(&name)?)),
            "items" => Ok(Node::Items(Box::new(self.function_1_arg(&name)?))),
            "join" => Ok(Node::Join(self.function_2_arg(&name)?)),
            "keys" => Ok(Node::Keys(Box::new(self.function_1_arg(&name)?))),
            "length" => Ok(Node::Length(Box::new(self.function_1_arg(&name)?))),
            "lower" => Ok(Node::Lower(Box::new(self.function_1_arg(&name)?))),
            "map" => Ok(Node::Map(self.function_2_map_arg(&name)?)),
            "max" => Ok(Node::Max(Box::new(self.function_1_arg(&name)?))),
            "max_by" => Ok(Node::MaxBy(self.function_2_exp_arg(&name)?)),
            "merge" => Ok(Node::Merge(self.function_var_arg(&name)?)),
            "min" => Ok(Node::Min(Box::new(self.function_1_arg(&name)?))),
            "min_by" => Ok(Node::MinBy(self.function_2_exp_arg(&name)?)),
            "not_null" => self.function_not_null(),
            "pad_left" => {
                let (arg1, arg2, arg3) = self.function_2_to_3_arg(&name)?;

                match arg3 {
                    None => Ok(Node::PadSpaceLeft(Box::new([arg1, arg2]))),
                    Some(arg3) => Ok(Node::PadLeft(Box::new([arg1, arg2, arg3]))),
                }
            }
            "pad_right" => {
                let (arg1, arg2, arg3) = self.function_2_to_3_arg(&name)?;

                match arg3 {
                    None => Ok(Node::PadSpaceRight(Box::new([arg1, arg2]))),
                    Some(arg3) => Ok(Node::PadRight(Box::new([arg1, arg2, arg3]))),
                }
            }
            "replace" => {
                let (arg1, arg2, arg3, arg4) = self.function_3_to_4_arg(&name)?;

                match arg4 {
                    None => Ok(Node::Replace(Box::new([arg1, arg2, arg3]))),
                    Some(arg4) => Ok(Node::ReplaceCount(Box::new([arg1, arg2, arg3, arg4]))),
                }
            }
            "reverse" => Ok(Node::Reverse(Box::new(self.function_1_arg(&name)?))),
            "sort" => Ok(Node::Sort(Box::new(self.function_1_arg(&name)?))),
            "sort_by" => Ok(Node::SortBy(self.function_2_exp_arg(&name)?)),
            "split" => {
                let (arg1, arg2, arg3) = self.function_2_to_3_arg(&name)?;

                match arg3 {
                    None => Ok(Node::Split(Box::new([arg1, arg2]))),
                    Some(arg3) => Ok(Node::SplitCount(Box::new([arg1, arg2, arg3]))),
                }
            }
            "starts_with" => Ok(Node::StartsWith(self.function_2_arg(&name)?)),
            "sum" => Ok(Node::Sum(Box::new(self.function_1_arg(&name)?))),
            "to_array" => Ok(Node::ToArray(Box::new(self.function_1_arg(&name)?))),
            "to_number" => Ok(Node::ToNumber(Box::new(self.function_1_arg(&name)?))),
            "to_string" => Ok(Node::ToString(Box::new(self.function_1_arg(&name)?))),
            "trim" => {
                let (arg1, arg2) = self.function_1_to_2_arg(&name)?;

                match arg2 {
                    None => Ok(Node::TrimSpace(Box::new(arg1))),
                    Some(arg2) => Ok(Node::Trim(Box::new([arg1, arg2]))),
                }
            }
            "trim_left" => {
                let (arg1, arg2) = self.function_1_to_2_arg(&name)?;

                match arg2 {
                    None => Ok(Node::TrimSpaceLeft(Box::new(arg1))),
                    Some(arg2) => Ok(Node::TrimLeft(Box::new([arg1, arg2]))),
                }
            }
            "trim_right" => {
                let (arg1, arg2) = self.function_1_to_2_arg(&name)?;

                match arg2 {
                    None => Ok(Node::TrimSpaceRight(Box::new(arg1))),
                    Some(arg2) => Ok(Node::TrimRight(Box::new([arg1, arg2]))),
                }
            }
            "type" => Ok(Node::Type(Box::new(self.function_1_arg(&name)?))),
            "upper" => Ok(Node::Upper(Box::new(self.function_1_arg(&name)?))),
            "values" => Ok(Node::Values(Box::new(self.function_1_arg(&name)?))),
            "zip" => Ok(Node::Zip(self.function_var_arg(&name)?)),
            _ => Err(ParseError::UnknownFunction(name)),
        }
    }

    fn function_1_arg(&mut self, name: &str) -> Result<Node, ParseError> {
        if self.curr.kind == TokenKind::CloseParen {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        let arg = self.expression(1)?;

        if self.curr.kind == TokenKind::Comma {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        if self.curr.kind != TokenKind::CloseParen {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;
        Ok(arg)
    }

    fn function_1_to_2_arg(&mut self, name: &str) -> Result<(Node, Option<Node>), ParseError> {
        if self.curr.kind == TokenKind::CloseParen {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        let arg1 = self.expression(1)?;

        if self.curr.kind == TokenKind::CloseParen {
            self.advance()?;
            return Ok((arg1, None));
        }

        if self.curr.kind != TokenKind::Comma {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;

        let arg2 = self.expression(1)?;

        if self.curr.kind == TokenKind::Comma {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        if self.curr.kind != TokenKind::CloseParen {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;
        Ok((arg1, Some(arg2)))
    }

    fn function_2_arg(&mut self, name: &str) -> Result<Box<[Node; 2]>, ParseError> {
        if self.curr.kind == TokenKind::CloseParen {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        let arg1 = self.expression(1)?;

        if self.curr.kind == TokenKind::CloseParen {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        if self.curr.kind != TokenKind::Comma {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;

        let arg2 = self.expression(1)?;

        if self.curr.kind == TokenKind::Comma {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        if self.curr.kind != TokenKind::CloseParen {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;
        Ok(Box::new([arg1, arg2]))
    }

    /// Two arguments where the second must be an `&expr` expression
    /// reference.
    fn function_2_exp_arg(&mut self, name: &str) -> Result<Box<[Node; 2]>, ParseError> {
        if self.curr.kind == TokenKind::CloseParen {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        let arg1 = self.expression(1)?;

        if self.curr.kind == TokenKind::CloseParen {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        if self.curr.kind != TokenKind::Comma {
            return Err(Self::unexpected(self.curr));
        }

        if self.next.kind != TokenKind::Expression {
            return Err(ParseError::InvalidFunctionArgument {
                function: name.to_string(),
                want: "expression",
            });
        }

        self.advance2()?;

        let arg2 = self.expression(1)?;

        if self.curr.kind == TokenKind::Comma {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        if self.curr.kind != TokenKind::CloseParen {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;
        Ok(Box::new([arg1, arg2]))
    }

    /// Two arguments where the *first* must be an `&expr` expression
    /// reference (the `map` shape).
    fn function_2_map_arg(&mut self, name: &str) -> Result<Box<[Node; 2]>, ParseError> {
        if self.curr.kind == TokenKind::CloseParen {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        if self.curr.kind != TokenKind::Expression {
            return Err(ParseError::InvalidFunctionArgument {
                function: name.to_string(),
                want: "expression",
            });
        }

        self.advance()?;

        let arg1 = self.expression(1)?;

        if self.curr.kind == TokenKind::CloseParen {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        if self.curr.kind != TokenKind::Comma {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;

        let arg2 = self.expression(1)?;

        if self.curr.kind == TokenKind::Comma {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        if self.curr.kind != TokenKind::CloseParen {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;
        Ok(Box::new([arg1, arg2]))
    }

    fn function_2_to_3_arg(&mut self, name: &str) -> Result<(Node, Node, Option<Node>), ParseError> {
        if self.curr.kind == TokenKind::CloseParen {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        let arg1 = self.expression(1)?;

        if self.curr.kind == TokenKind::CloseParen {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        if self.curr.kind != TokenKind::Comma {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;

        let arg2 = self.expression(1)?;

        if self.curr.kind == TokenKind::CloseParen {
            self.advance()?;
            return Ok((arg1, arg2, None));
        }

        if self.curr.kind != TokenKind::Comma {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;

        let arg3 = self.expression(1)?;

        if self.curr.kind == TokenKind::Comma {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        if self.curr.kind != TokenKind::CloseParen {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;
        Ok((arg1, arg2, Some(arg3)))
    }

    #[allow(clippy::type_complexity)]
    fn function_2_to_4_arg(
        &mut self,
        name: &str,
    ) -> Result<(Node, Node, Option<Node>, Option<Node>), ParseError> {
        if self.curr.kind == TokenKind::CloseParen {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        let arg1 = self.expression(1)?;

        if self.curr.kind == TokenKind::CloseParen {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        if self.curr.kind != TokenKind::Comma {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;

        let arg2 = self.expression(1)?;

        if self.curr.kind == TokenKind::CloseParen {
            self.advance()?;
            return Ok((arg1, arg2, None, None));
        }

        if self.curr.kind != TokenKind::Comma {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;

        let arg3 = self.expression(1)?;

        if self.curr.kind == TokenKind::CloseParen {
            self.advance()?;
            return Ok((arg1, arg2, Some(arg3), None));
        }

        if self.curr.kind != TokenKind::Comma {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;

        let arg4 = self.expression(1)?;

        if self.curr.kind == TokenKind::Comma {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        if self.curr.kind != TokenKind::CloseParen {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;
        Ok((arg1, arg2, Some(arg3), Some(arg4)))
    }

    #[allow(clippy::type_complexity)]
    fn function_3_to_4_arg(
        &mut self,
        name: &str,
    ) -> Result<(Node, Node, Node, Option<Node>), ParseError> {
        if self.curr.kind == TokenKind::CloseParen {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        let arg1 = self.expression(1)?;

        if self.curr.kind == TokenKind::CloseParen {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        if self.curr.kind != TokenKind::Comma {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;

        let arg2 = self.expression(1)?;

        if self.curr.kind == TokenKind::CloseParen {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        if self.curr.kind != TokenKind::Comma {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;

        let arg3 = self.expression(1)?;

        if self.curr.kind == TokenKind::CloseParen {
            self.advance()?;
            return Ok((arg1, arg2, arg3, None));
        }

        if self.curr.kind != TokenKind::Comma {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;

        let arg4 = self.expression(1)?;

        if self.curr.kind == TokenKind::Comma {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        if self.curr.kind != TokenKind::CloseParen {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;
        Ok((arg1, arg2, arg3, Some(arg4)))
    }

    /// `not_null` has two specialized shapes: a single argument, and two
    /// arguments where the second is a literal default. Everything else is
    /// the general first-non-null form.
    fn function_not_null(&mut self) -> Result<Node, ParseError> {
        if self.curr.kind == TokenKind::CloseParen {
            return Err(ParseError::InvalidFunctionCall("not_null".to_string()));
        }

        let node = self.expression(1)?;

        if self.curr.kind == TokenKind::CloseParen {
            self.advance()?;

            return Ok(Node::NotNullDefault {
                argument: Box::new(node),
                default: Value::Null,
            });
        }

        if self.curr.kind != TokenKind::Comma {
            return Err(Self::unexpected(self.curr));
        }

        self.advance()?;

        if self.next.kind == TokenKind::CloseParen {
            match self.curr.kind {
                TokenKind::JsonLiteral => {
                    let value = parse_json_literal(self.curr.text)?;
                    self.advance2()?;

                    return Ok(Node::NotNullDefault {
                        argument: Box::new(node),
                        default: value,
                    });
                }
                TokenKind::StringLiteral => {
                    let value = parse_string_literal(self.curr.text);
                    self.advance2()?;

                    return Ok(Node::NotNullDefault {
                        argument: Box::new(node),
                        default: Value::String(value),
                    });
                }
                _ => {}
            }
        }

        let mut nodes = vec![node];
        loop {
            let node = self.expression(1)?;
            nodes.push(node);

            if self.curr.kind == TokenKind::Comma {
                self.advance()?;
                continue;
            }

            if self.curr.kind == TokenKind::CloseParen {
                self.advance()?;
                return Ok(Node::NotNull(nodes));
            }

            return Err(Self::unexpected(self.curr));
        }
    }

    fn function_var_arg(&mut self, name: &str) -> Result<Vec<Node>, ParseError> {
        if self.curr.kind == TokenKind::CloseParen {
            return Err(ParseError::InvalidFunctionCall(name.to_string()));
        }

        let mut nodes = Vec::new();
        loop {
            let node = self.expression(1)?;
            nodes.push(node);

            if self.curr.kind == TokenKind::Comma {
                self.advance()?;
                continue;
            }

            if self.curr.kind == TokenKind::CloseParen {
                self.advance()?;
                return Ok(nodes);
            }

            return Err(Self::unexpected(self.curr));
        }
    }
}

fn slice_node(child: Option<Node>, start: i64, stop: i64) -> Node {
    match child {
        None => Node::SliceCurrent { start, stop },
        Some(child) => Node::Slice {
            child: Box::new(child),
            start,
            stop,
        },
    }
}

/// Strip the surrounding quotes of a quoted identifier and resolve the
/// standard JSON escapes, including UTF-16 surrogate pairs.
pub(crate) fn parse_quoted_identifier(s: &str) -> Result<String, ParseError> {
    let v = &s[1..s.len() - 1];
    if !v.contains('\\') {
        return Ok(v.to_string());
    }

    let invalid = || ParseError::InvalidQuotedString(s.to_string());

    let mut out = String::with_capacity(v.len());
    let mut chars = v.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('"') => out.push('"'),
            Some('/') => out.push('/'),
            Some('\\') => out.push('\\'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000c}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let unit = hex4(&mut chars).ok_or_else(invalid)?;

                if (0xd800..0xdc00).contains(&unit) {
                    if chars.next() != Some('\\') || chars.next() != Some('u') {
                        return Err(invalid());
                    }

                    let low = hex4(&mut chars).ok_or_else(invalid)?;
                    if !(0xdc00..0xe000).contains(&low) {
                        return Err(invalid());
                    }

                    let c = 0x10000 + ((unit - 0xd800) << 10) + (low - 0xdc00);
                    out.push(char::from_u32(c).ok_or_else(invalid)?);
                } else {
                    out.push(char::from_u32(unit).ok_or_else(invalid)?);
                }
            }
            _ => return Err(invalid()),
        }
    }

    Ok(out)
}

fn hex4(chars: &mut std::str::Chars<'_>) -> Option<u32> {
    let mut r = 0u32;
    for _ in 0..4 {
        let d = chars.next()?.to_digit(16)?;
        r = r * 16 + d;
    }

    Some(r)
}

/// Strip the surrounding quotes of a raw string literal. Only `\'` and
/// `\\` are escapes; any other backslash sequence is kept as-is.
pub(crate) fn parse_string_literal(s: &str) -> String {
    let v = &s[1..s.len() - 1];
    if !v.contains('\\') {
        return v.to_string();
    }

    let mut out = String::with_capacity(v.len());
    let mut chars = v.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

/// Strip the backticks of a JSON literal, resolve the `` \` `` escape, and
/// decode the remaining text as JSON. Numbers keep their textual form.
pub(crate) fn parse_json_literal(s: &str) -> Result<Value, ParseError> {
    let v = s[1..s.len() - 1].replace("\\`", "`");
    if v.is_empty() {
        return Err(ParseError::InvalidJsonLiteral(s.to_string()));
    }

    let decoded: serde_json::Value = serde_json::from_str(&v)
        .map_err(|_| ParseError::InvalidJsonLiteral(s.to_string()))?;

    Ok(Value::from(decoded))
}
