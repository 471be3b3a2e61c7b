//! Recursive descent parser producing [`Script`] trees.
//!
//! The only recovery performed is for a missing `end` at end of input: the
//! open construct is returned without a terminator position and an error is
//! recorded. Any other error aborts the parse and no tree is produced.

use smol_str::SmolStr;

use crate::base::{TextRange, TextSize};

use super::SyntaxError;
use super::ast::*;
use super::lexer::{Lexeme, Token, tokenize};

/// Result of parsing one document.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseOutput {
    /// `None` when the text could not be parsed.
    pub script: Option<Script>,
    pub errors: Vec<SyntaxError>,
}

impl ParseOutput {
    pub fn is_clean(&self) -> bool {
        self.script.is_some() && self.errors.is_empty()
    }
}

/// Parse a whole script.
pub fn parse(text: &str) -> ParseOutput {
    let (tokens, lex_errors) = tokenize(text);
    if !lex_errors.is_empty() {
        return ParseOutput {
            script: None,
            errors: lex_errors,
        };
    }

    let mut parser = Parser::new(tokens);
    match parser.script(TextSize::of(text)) {
        Ok(script) => ParseOutput {
            script: Some(script),
            errors: parser.errors,
        },
        Err(err) => {
            parser.errors.push(err);
            ParseOutput {
                script: None,
                errors: parser.errors,
            }
        }
    }
}

type PResult<T> = Result<T, SyntaxError>;

struct Parser<'a> {
    tokens: Vec<Lexeme<'a>>,
    pos: usize,
    last_end: TextSize,
    errors: Vec<SyntaxError>,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Lexeme<'a>>) -> Self {
        Self {
            tokens,
            pos: 0,
            last_end: TextSize::from(0),
            errors: Vec::new(),
        }
    }

    // ========================================================================
    // TOKEN CURSOR
    // ========================================================================

    fn current(&self) -> Lexeme<'a> {
        self.nth(0)
    }

    fn nth(&self, n: usize) -> Lexeme<'a> {
        let last = self.tokens.len().saturating_sub(1);
        self.tokens[(self.pos + n).min(last)]
    }

    fn peek(&self) -> Token {
        self.current().kind
    }

    fn at(&self, kind: Token) -> bool {
        self.peek() == kind
    }

    fn bump(&mut self) -> Lexeme<'a> {
        let lexeme = self.current();
        if lexeme.kind != Token::Eof {
            self.pos += 1;
            self.last_end = lexeme.range.end();
        }
        lexeme
    }

    fn eat(&mut self, kind: Token) -> Option<Lexeme<'a>> {
        if self.at(kind) { Some(self.bump()) } else { None }
    }

    fn expect(&mut self, kind: Token, what: &str) -> PResult<Lexeme<'a>> {
        self.eat(kind).ok_or_else(|| self.unexpected(what))
    }

    fn unexpected(&self, what: &str) -> SyntaxError {
        let found = self.current();
        let found_text = match found.kind {
            Token::Eof => "end of file".to_string(),
            Token::Newline => "end of line".to_string(),
            _ => format!("'{}'", found.text),
        };
        SyntaxError::new(format!("Expected {what} but found {found_text}"), found.range)
    }

    fn skip_newlines(&mut self) {
        while self.peek().is_terminator() {
            self.bump();
        }
    }

    fn end_of_statement(&mut self) -> PResult<()> {
        match self.peek() {
            Token::Newline | Token::Semicolon => {
                self.bump();
                Ok(())
            }
            Token::Eof => Ok(()),
            _ => Err(self.unexpected("end of line")),
        }
    }

    /// Consume a closing `end`; at end of input record the error and go on.
    fn expect_end(&mut self, construct: &str) -> PResult<Option<TextSize>> {
        match self.peek() {
            Token::End => Ok(Some(self.bump().range.start())),
            Token::Eof => {
                self.errors.push(SyntaxError::new(
                    format!("Missing 'end' for {construct}"),
                    self.current().range,
                ));
                Ok(None)
            }
            _ => Err(self.unexpected("'end'")),
        }
    }

    fn span_from(&self, start: TextSize) -> TextRange {
        TextRange::new(start, self.last_end.max(start))
    }

    // ========================================================================
    // NAMES
    // ========================================================================

    fn ident(&mut self) -> PResult<Ident> {
        let lexeme = self.expect(Token::Ident, "identifier")?;
        Ok(Ident::new(lexeme.text, lexeme.range))
    }

    fn qualified_name(&mut self) -> PResult<QualifiedName> {
        let mut segments = vec![self.ident()?];
        while self.at(Token::Dot) && self.nth(1).kind == Token::Ident {
            self.bump();
            segments.push(self.ident()?);
        }
        Ok(QualifiedName { segments })
    }

    // ========================================================================
    // SCRIPT LEVEL
    // ========================================================================

    fn script(&mut self, len: TextSize) -> PResult<Script> {
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            if self.at(Token::Eof) {
                break;
            }
            items.push(self.script_item()?);
        }
        Ok(Script {
            items,
            range: TextRange::new(TextSize::from(0), len),
        })
    }

    fn script_item(&mut self) -> PResult<ScriptItem> {
        let start = self.current().range.start();
        match self.peek() {
            Token::Requires => {
                self.bump();
                let package = self.expect(Token::String, "package name")?;
                let range = self.span_from(start);
                self.end_of_statement()?;
                Ok(ScriptItem::Requires(RequiresDecl {
                    package: unquote(package.text),
                    range,
                }))
            }
            Token::Pin => {
                self.bump();
                let name = self.qualified_name()?;
                let range = self.span_from(start);
                self.end_of_statement()?;
                Ok(ScriptItem::Pin(PinDecl { name, range }))
            }
            Token::Namespace => {
                self.bump();
                let name = self.qualified_name()?;
                let range = self.span_from(start);
                self.end_of_statement()?;
                Ok(ScriptItem::Namespace(NamespaceDecl { name, range }))
            }
            _ => {
                let modifiers = self.modifiers();
                match self.peek() {
                    Token::Class => Ok(ScriptItem::Class(self.class(modifiers, start)?)),
                    Token::Interface => {
                        Ok(ScriptItem::Interface(self.interface(modifiers, start)?))
                    }
                    Token::Enum => Ok(ScriptItem::Enum(self.enumeration(modifiers, start)?)),
                    _ => Err(self.unexpected("class, interface or enumeration")),
                }
            }
        }
    }

    fn modifiers(&mut self) -> Modifiers {
        let mut list = Vec::new();
        loop {
            let modifier = match self.peek() {
                Token::Public => Modifier::Public,
                Token::Protected => Modifier::Protected,
                Token::Private => Modifier::Private,
                Token::Static => Modifier::Static,
                Token::Abstract => Modifier::Abstract,
                Token::Fixed => Modifier::Fixed,
                Token::Native => Modifier::Native,
                _ => break,
            };
            list.push((modifier, self.bump().range));
        }
        Modifiers { list }
    }

    fn implements_list(&mut self) -> PResult<Vec<QualifiedName>> {
        let mut list = Vec::new();
        if self.eat(Token::Implements).is_some() {
            list.push(self.qualified_name()?);
            while self.eat(Token::Comma).is_some() {
                list.push(self.qualified_name()?);
            }
        }
        Ok(list)
    }

    fn class(&mut self, modifiers: Modifiers, start: TextSize) -> PResult<ClassDecl> {
        self.expect(Token::Class, "'class'")?;
        let name = self.ident()?;
        let extends = match self.eat(Token::Extends) {
            Some(_) => Some(self.qualified_name()?),
            None => None,
        };
        let implements = self.implements_list()?;
        let body_start = self.last_end;
        self.end_of_statement()?;

        let (members, end) = self.members("class", false)?;
        Ok(ClassDecl {
            modifiers,
            name,
            extends,
            implements,
            members,
            body_start,
            end,
            range: self.span_from(start),
        })
    }

    fn interface(&mut self, modifiers: Modifiers, start: TextSize) -> PResult<InterfaceDecl> {
        self.expect(Token::Interface, "'interface'")?;
        let name = self.ident()?;
        let implements = self.implements_list()?;
        let body_start = self.last_end;
        self.end_of_statement()?;

        let (members, end) = self.members("interface", true)?;
        Ok(InterfaceDecl {
            modifiers,
            name,
            implements,
            members,
            body_start,
            end,
            range: self.span_from(start),
        })
    }

    fn members(&mut self, construct: &str, in_interface: bool) -> PResult<(Vec<Member>, Option<TextSize>)> {
        let mut members = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek(), Token::End | Token::Eof) {
                break;
            }
            members.push(self.member(in_interface)?);
        }
        let end = self.expect_end(construct)?;
        Ok((members, end))
    }

    fn member(&mut self, in_interface: bool) -> PResult<Member> {
        let start = self.current().range.start();
        let modifiers = self.modifiers();
        match self.peek() {
            Token::Class => Ok(Member::Class(self.class(modifiers, start)?)),
            Token::Interface => Ok(Member::Interface(self.interface(modifiers, start)?)),
            Token::Enum => Ok(Member::Enum(self.enumeration(modifiers, start)?)),
            Token::Func => Ok(Member::Function(self.function(modifiers, start, in_interface)?)),
            Token::Var => {
                let decl = self.var_decl(modifiers, start)?;
                self.end_of_statement()?;
                Ok(Member::Variable(decl))
            }
            _ => Err(self.unexpected("class member")),
        }
    }

    fn enumeration(&mut self, modifiers: Modifiers, start: TextSize) -> PResult<EnumDecl> {
        self.expect(Token::Enum, "'enum'")?;
        let name = self.ident()?;
        let body_start = self.last_end;
        self.end_of_statement()?;

        let mut members = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek(), Token::End | Token::Eof) {
                break;
            }
            let member_name = self.ident()?;
            let value = match self.eat(Token::Assign) {
                Some(_) => Some(self.expr()?),
                None => None,
            };
            let range = self.span_from(member_name.range.start());
            self.end_of_statement()?;
            members.push(EnumMember {
                name: member_name,
                value,
                range,
            });
        }
        let end = self.expect_end("enumeration")?;
        Ok(EnumDecl {
            modifiers,
            name,
            members,
            body_start,
            end,
            range: self.span_from(start),
        })
    }

    fn function(&mut self, modifiers: Modifiers, start: TextSize, in_interface: bool) -> PResult<FuncDecl> {
        self.expect(Token::Func, "'func'")?;

        let (return_type, name) =
            if self.at(Token::Ident) && self.nth(1).kind == Token::LParen {
                (None, self.ident()?)
            } else {
                let return_type = self.qualified_name()?;
                let lexeme = self.current();
                let name = if lexeme.kind == Token::Ident || lexeme.kind.is_operator() {
                    self.bump();
                    Ident::new(lexeme.text, lexeme.range)
                } else {
                    return Err(self.unexpected("function name"));
                };
                (Some(return_type), name)
            };

        let params_start = self.expect(Token::LParen, "'('")?.range.start();
        let params = self.params(Token::RParen)?;
        self.expect(Token::RParen, "')'")?;

        let ctor_call = if return_type.is_none()
            && matches!(self.peek(), Token::Super | Token::This)
            && self.nth(1).kind == Token::LParen
        {
            let keyword = self.bump();
            let kind = if keyword.kind == Token::Super {
                CtorCallKind::Super
            } else {
                CtorCallKind::This
            };
            let args = self.call_args()?;
            Some(CtorCall {
                kind,
                keyword: keyword.range,
                args,
                range: self.span_from(keyword.range.start()),
            })
        } else {
            None
        };

        let bodyless = in_interface
            || modifiers.has(Modifier::Abstract)
            || modifiers.has(Modifier::Native);
        let body = if bodyless {
            self.end_of_statement()?;
            None
        } else {
            let mut body = self.body(&[Token::End])?;
            body.end = self.expect_end("function")?.or(body.end);
            Some(body)
        };

        Ok(FuncDecl {
            modifiers,
            return_type,
            name,
            params,
            ctor_call,
            body,
            params_start,
            range: self.span_from(start),
        })
    }

    fn params(&mut self, close: Token) -> PResult<Vec<Param>> {
        let mut params = Vec::new();
        if self.at(close) || self.peek().is_terminator() {
            return Ok(params);
        }
        loop {
            let ty = self.qualified_name()?;
            let name = self.ident()?;
            params.push(Param {
                range: ty.range().cover(name.range),
                ty,
                name,
            });
            if self.eat(Token::Comma).is_none() {
                break;
            }
        }
        Ok(params)
    }

    fn var_decl(&mut self, modifiers: Modifiers, start: TextSize) -> PResult<VarDecl> {
        self.expect(Token::Var, "'var'")?;
        let ty = self.qualified_name()?;
        let mut declarators = Vec::new();
        loop {
            let name = self.ident()?;
            let init = match self.eat(Token::Assign) {
                Some(_) => Some(self.expr()?),
                None => None,
            };
            declarators.push(VarDeclarator {
                range: self.span_from(name.range.start()),
                name,
                init,
            });
            if self.eat(Token::Comma).is_none() {
                break;
            }
        }
        Ok(VarDecl {
            modifiers,
            ty,
            declarators,
            range: self.span_from(start),
        })
    }

    // ========================================================================
    // STATEMENTS
    // ========================================================================

    /// Statements up to one of `terminators` (not consumed) or end of input.
    fn body(&mut self, terminators: &[Token]) -> PResult<Body> {
        let start = self.last_end;
        let mut stmts = Vec::new();
        loop {
            self.skip_newlines();
            let kind = self.peek();
            if kind == Token::Eof {
                return Ok(Body {
                    stmts,
                    start,
                    end: None,
                });
            }
            if terminators.contains(&kind) {
                return Ok(Body {
                    stmts,
                    start,
                    end: Some(self.current().range.start()),
                });
            }
            stmts.push(self.stmt()?);
        }
    }

    fn stmt(&mut self) -> PResult<Stmt> {
        let start = self.current().range.start();
        match self.peek() {
            Token::Var => {
                let decl = self.var_decl(Modifiers::default(), start)?;
                self.end_of_statement()?;
                Ok(Stmt::Var(decl))
            }
            Token::If => self.if_stmt(start),
            Token::Select => self.select_stmt(start),
            Token::For => self.for_stmt(start),
            Token::While => {
                self.bump();
                let cond = self.expr()?;
                let body = self.closed_body("while")?;
                Ok(Stmt::While(WhileStmt {
                    cond,
                    body,
                    range: self.span_from(start),
                }))
            }
            Token::Try => self.try_stmt(start),
            Token::Return | Token::Throw => {
                let keyword = self.bump().kind;
                let value = if self.peek().is_terminator() || self.at(Token::Eof) {
                    None
                } else {
                    Some(self.expr()?)
                };
                let range = self.span_from(start);
                self.end_of_statement()?;
                Ok(if keyword == Token::Return {
                    Stmt::Return(value, range)
                } else {
                    Stmt::Throw(value, range)
                })
            }
            Token::Break | Token::Continue => {
                let keyword = self.bump();
                self.end_of_statement()?;
                Ok(if keyword.kind == Token::Break {
                    Stmt::Break(keyword.range)
                } else {
                    Stmt::Continue(keyword.range)
                })
            }
            _ => {
                let expr = self.expr()?;
                self.end_of_statement()?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn closed_body(&mut self, construct: &str) -> PResult<Body> {
        let mut body = self.body(&[Token::End])?;
        body.end = self.expect_end(construct)?.or(body.end);
        Ok(body)
    }

    fn if_stmt(&mut self, start: TextSize) -> PResult<Stmt> {
        self.expect(Token::If, "'if'")?;
        let cond = self.expr()?;
        let then_body = self.body(&[Token::Elif, Token::Else, Token::End])?;

        let mut elifs = Vec::new();
        while self.eat(Token::Elif).is_some() {
            let cond = self.expr()?;
            let body = self.body(&[Token::Elif, Token::Else, Token::End])?;
            elifs.push(ElifClause { cond, body });
        }
        let else_body = match self.eat(Token::Else) {
            Some(_) => Some(self.body(&[Token::End])?),
            None => None,
        };
        self.expect_end("if")?;

        Ok(Stmt::If(IfStmt {
            cond,
            then_body,
            elifs,
            else_body,
            range: self.span_from(start),
        }))
    }

    fn select_stmt(&mut self, start: TextSize) -> PResult<Stmt> {
        self.expect(Token::Select, "'select'")?;
        let value = self.expr()?;
        self.end_of_statement()?;

        let mut cases = Vec::new();
        let mut else_body = None;
        loop {
            self.skip_newlines();
            match self.peek() {
                Token::Case => {
                    self.bump();
                    let mut values = vec![self.expr()?];
                    while self.eat(Token::Comma).is_some() {
                        values.push(self.expr()?);
                    }
                    let body = self.body(&[Token::Case, Token::Else, Token::End])?;
                    cases.push(CaseClause { values, body });
                }
                Token::Else if else_body.is_none() => {
                    self.bump();
                    else_body = Some(self.body(&[Token::End])?);
                }
                _ => break,
            }
        }
        self.expect_end("select")?;

        Ok(Stmt::Select(SelectStmt {
            value,
            cases,
            else_body,
            range: self.span_from(start),
        }))
    }

    fn for_stmt(&mut self, start: TextSize) -> PResult<Stmt> {
        self.expect(Token::For, "'for'")?;
        let var = self.postfix()?;
        self.expect(Token::Assign, "'='")?;
        let from = self.expr()?;
        let downto = match self.peek() {
            Token::To => false,
            Token::Downto => true,
            _ => return Err(self.unexpected("'to' or 'downto'")),
        };
        self.bump();
        let to = self.expr()?;
        let step = match self.eat(Token::Step) {
            Some(_) => Some(self.expr()?),
            None => None,
        };
        let body = self.closed_body("for")?;

        Ok(Stmt::For(ForStmt {
            var,
            from,
            to,
            step,
            downto,
            body,
            range: self.span_from(start),
        }))
    }

    fn try_stmt(&mut self, start: TextSize) -> PResult<Stmt> {
        self.expect(Token::Try, "'try'")?;
        let body = self.body(&[Token::Catch, Token::End])?;

        let mut catches = Vec::new();
        while self.eat(Token::Catch).is_some() {
            let ty = self.qualified_name()?;
            let var = self.ident()?;
            let mut catch_body = self.body(&[Token::Catch, Token::End])?;
            catch_body.start = ty.range().start();
            catches.push(CatchClause {
                ty,
                var,
                body: catch_body,
            });
        }
        self.expect_end("try")?;

        Ok(Stmt::Try(TryStmt {
            body,
            catches,
            range: self.span_from(start),
        }))
    }

    // ========================================================================
    // EXPRESSIONS
    // ========================================================================

    fn expr(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let lhs = self.inline_if()?;
        let op = match self.peek() {
            Token::Assign => BinaryOp::Assign,
            Token::MulAssign => BinaryOp::MulAssign,
            Token::DivAssign => BinaryOp::DivAssign,
            Token::ModAssign => BinaryOp::ModAssign,
            Token::AddAssign => BinaryOp::AddAssign,
            Token::SubAssign => BinaryOp::SubAssign,
            Token::ShlAssign => BinaryOp::ShlAssign,
            Token::ShrAssign => BinaryOp::ShrAssign,
            Token::AndAssign => BinaryOp::AndAssign,
            Token::OrAssign => BinaryOp::OrAssign,
            Token::XorAssign => BinaryOp::XorAssign,
            _ => return Ok(lhs),
        };
        let op_range = self.bump().range;
        let rhs = self.assignment()?;
        Ok(binary(op, op_range, lhs, rhs))
    }

    fn inline_if(&mut self) -> PResult<Expr> {
        let cond = self.logic()?;
        if self.eat(Token::If).is_none() {
            return Ok(cond);
        }
        let if_true = self.inline_if()?;
        self.expect(Token::Else, "'else'")?;
        let if_false = self.inline_if()?;
        let range = cond.range.cover(if_false.range);
        Ok(Expr {
            kind: ExprKind::InlineIf {
                cond: Box::new(cond),
                if_true: Box::new(if_true),
                if_false: Box::new(if_false),
            },
            range,
        })
    }

    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> PResult<Expr>,
        op_for: fn(Token) -> Option<BinaryOp>,
    ) -> PResult<Expr> {
        let mut lhs = next(self)?;
        while let Some(op) = op_for(self.peek()) {
            let op_range = self.bump().range;
            let rhs = next(self)?;
            lhs = binary(op, op_range, lhs, rhs);
        }
        Ok(lhs)
    }

    fn logic(&mut self) -> PResult<Expr> {
        self.binary_level(Self::compare, |t| match t {
            Token::And | Token::AmpAmp => Some(BinaryOp::LogicAnd),
            Token::Or | Token::PipePipe => Some(BinaryOp::LogicOr),
            _ => None,
        })
    }

    fn compare(&mut self) -> PResult<Expr> {
        self.binary_level(Self::bitwise, |t| match t {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::Ne),
            Token::Lt => Some(BinaryOp::Lt),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Le => Some(BinaryOp::Le),
            Token::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn bitwise(&mut self) -> PResult<Expr> {
        self.binary_level(Self::additive, |t| match t {
            Token::Amp => Some(BinaryOp::BitAnd),
            Token::Pipe => Some(BinaryOp::BitOr),
            Token::Caret => Some(BinaryOp::BitXor),
            Token::Shl => Some(BinaryOp::Shl),
            Token::Shr => Some(BinaryOp::Shr),
            _ => None,
        })
    }

    fn additive(&mut self) -> PResult<Expr> {
        self.binary_level(Self::multiplicative, |t| match t {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn multiplicative(&mut self) -> PResult<Expr> {
        self.binary_level(Self::special, |t| match t {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Percent => Some(BinaryOp::Mod),
            _ => None,
        })
    }

    fn special(&mut self) -> PResult<Expr> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Cast => SpecialOp::Cast,
                Token::Castable => SpecialOp::Castable,
                Token::Typeof => SpecialOp::Typeof,
                _ => return Ok(expr),
            };
            self.bump();
            let target = self.qualified_name()?;
            let range = expr.range.cover(target.range());
            expr = Expr {
                kind: ExprKind::Special {
                    op,
                    expr: Box::new(expr),
                    target,
                },
                range,
            };
        }
    }

    fn unary(&mut self) -> PResult<Expr> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Bang | Token::Not => UnaryOp::Not,
            Token::Tilde => UnaryOp::BitNot,
            Token::PlusPlus => UnaryOp::PreInc,
            Token::MinusMinus => UnaryOp::PreDec,
            _ => return self.postfix(),
        };
        let op_range = self.bump().range;
        let operand = self.unary()?;
        Ok(Expr {
            range: op_range.cover(operand.range),
            kind: ExprKind::Unary {
                op,
                op_range,
                operand: Box::new(operand),
            },
        })
    }

    fn postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.member_chain()?;
        loop {
            let op = match self.peek() {
                Token::PlusPlus => UnaryOp::PostInc,
                Token::MinusMinus => UnaryOp::PostDec,
                _ => return Ok(expr),
            };
            let op_range = self.bump().range;
            expr = Expr {
                range: expr.range.cover(op_range),
                kind: ExprKind::Unary {
                    op,
                    op_range,
                    operand: Box::new(expr),
                },
            };
        }
    }

    fn member_chain(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        while self.eat(Token::Dot).is_some() {
            let name = self.ident()?;
            let args = if self.at(Token::LParen) {
                Some(self.call_args()?)
            } else {
                None
            };
            expr = Expr {
                range: self.span_from(expr.range.start()),
                kind: ExprKind::Member {
                    object: Some(Box::new(expr)),
                    name,
                    args,
                },
            };
        }
        Ok(expr)
    }

    fn call_args(&mut self) -> PResult<Vec<Expr>> {
        self.expect(Token::LParen, "'('")?;
        let mut args = Vec::new();
        self.skip_newlines();
        if self.eat(Token::RParen).is_some() {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            self.skip_newlines();
            if self.eat(Token::Comma).is_none() {
                break;
            }
            self.skip_newlines();
        }
        self.expect(Token::RParen, "')'")?;
        Ok(args)
    }

    fn primary(&mut self) -> PResult<Expr> {
        let lexeme = self.current();
        let literal = |value: Literal| -> PResult<Expr> {
            Ok(Expr {
                kind: ExprKind::Literal(value),
                range: lexeme.range,
            })
        };
        match lexeme.kind {
            Token::Int => {
                self.bump();
                literal(Literal::Int(lexeme.text.parse().unwrap_or(i64::MAX)))
            }
            Token::HexInt => {
                self.bump();
                literal(Literal::Int(
                    i64::from_str_radix(&lexeme.text[2..], 16).unwrap_or(i64::MAX),
                ))
            }
            Token::Float => {
                self.bump();
                literal(Literal::Float(lexeme.text.parse().unwrap_or(0.0)))
            }
            Token::String => {
                self.bump();
                literal(Literal::String(unquote(lexeme.text)))
            }
            Token::Byte => {
                self.bump();
                let value = unquote(lexeme.text).bytes().next().unwrap_or(0);
                literal(Literal::Byte(value))
            }
            Token::True | Token::False => {
                self.bump();
                literal(Literal::Bool(lexeme.kind == Token::True))
            }
            Token::Null => {
                self.bump();
                literal(Literal::Null)
            }
            Token::This | Token::Super => {
                self.bump();
                Ok(Expr {
                    kind: if lexeme.kind == Token::This {
                        ExprKind::This
                    } else {
                        ExprKind::Super
                    },
                    range: lexeme.range,
                })
            }
            Token::Ident => {
                let name = self.ident()?;
                let args = if self.at(Token::LParen) {
                    Some(self.call_args()?)
                } else {
                    None
                };
                Ok(Expr {
                    range: self.span_from(name.range.start()),
                    kind: ExprKind::Member {
                        object: None,
                        name,
                        args,
                    },
                })
            }
            Token::LParen => {
                self.bump();
                self.skip_newlines();
                let mut inner = self.expr()?;
                self.skip_newlines();
                self.expect(Token::RParen, "')'")?;
                inner.range = self.span_from(lexeme.range.start());
                Ok(inner)
            }
            Token::Block => {
                self.bump();
                let params = self.params(Token::End)?;
                let body = self.closed_body("block")?;
                Ok(Expr {
                    kind: ExprKind::Block { params, body },
                    range: self.span_from(lexeme.range.start()),
                })
            }
            _ => Err(self.unexpected("expression")),
        }
    }
}

fn binary(op: BinaryOp, op_range: TextRange, lhs: Expr, rhs: Expr) -> Expr {
    Expr {
        range: lhs.range.cover(rhs.range),
        kind: ExprKind::Binary {
            op,
            op_range,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
    }
}

/// Strip the surrounding quotes and resolve the common escapes.
fn unquote(text: &str) -> SmolStr {
    let inner = text
        .get(1..text.len().saturating_sub(1))
        .unwrap_or_default();
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    SmolStr::from(out)
}
