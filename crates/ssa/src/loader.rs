use std::path::Path;

use crate::lexer::{tokenize, Spanned, Token};
use crate::{
    BasicKind, BinaryOp, BlockSpec, CalleeSpec, Constant, Error, Field, FunctionDecl,
    InstructionSpec, Literal, MethodSpec, Parameter, Program, ProgramBuilder, ReceiverSpec,
    Result, Signature, StatementSpec, TypeId, UnaryOp, ValueSpec,
};

/// Reads and parses a program listing from a file.
pub fn load(path: impl AsRef<Path>) -> Result<Program> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })?;

    tracing::debug!(path = %path.display(), bytes = source.len(), "loading program");
    parse(&source)
}

/// Parses a program listing.
pub fn parse(source: &str) -> Result<Program> {
    let tokens = tokenize(source).map_err(|line| Error::Parse {
        line,
        message: "unrecognized input".to_owned(),
    })?;

    let mut parser = Parser {
        tokens,
        pos: 0,
        builder: ProgramBuilder::new(),
    };
    parser.listing()?;
    parser.builder.build()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    builder: ProgramBuilder,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|t| t.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Steps back over a token taken by [Parser::advance].
    fn retreat(&mut self, token: Option<Token>) {
        if token.is_some() {
            self.pos -= 1;
        }
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            line: self.line(),
            message: message.into(),
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, what: &str) -> Error {
        match self.peek() {
            Some(token) => self.error(format!("expected {what}, found {token:?}")),
            None => self.error(format!("expected {what}, found end of input")),
        }
    }

    fn ident(&mut self, what: &str) -> Result<String> {
        match self.peek() {
            Some(Token::Ident(_)) => match self.advance() {
                Some(Token::Ident(name)) => Ok(name),
                _ => Err(Error::InternalError("token changed while parsing".into())),
            },
            _ => Err(self.unexpected(what)),
        }
    }

    fn int(&mut self, what: &str) -> Result<i64> {
        match self.peek() {
            Some(&Token::Int(value)) => {
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn block_index(&mut self) -> Result<usize> {
        let index = self.int("block index")?;
        usize::try_from(index).map_err(|_| self.error(format!("invalid block index {index}")))
    }

    /// End of a line or of the input.
    fn end_of_line(&mut self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(Token::Newline) => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(self.unexpected("end of line")),
        }
    }

    fn skip_newlines(&mut self) {
        while self.eat(&Token::Newline) {}
    }

    fn listing(&mut self) -> Result<()> {
        self.skip_newlines();
        if self.peek().is_none() {
            return Err(Error::NoPackage);
        }

        self.expect(Token::Package, "package clause")?;
        let name = self.ident("package name")?;
        self.builder.package(name)?;
        self.end_of_line()?;

        loop {
            self.skip_newlines();
            match self.peek() {
                None => return Ok(()),
                Some(Token::Type) => self.type_decl()?,
                Some(Token::Func | Token::Synthetic) => self.func_decl()?,
                Some(_) => return Err(self.unexpected("declaration")),
            }
        }
    }

    fn type_decl(&mut self) -> Result<()> {
        self.expect(Token::Type, "type")?;
        let name = self.ident("type name")?;
        if BasicKind::from_name(&name).is_some() {
            return Err(self.error(format!("cannot redeclare predeclared type {name}")));
        }
        let underlying = self.ty()?;
        let types = self.builder.types_mut();
        let named = types.declare_named(&name);
        types.define_named(named, underlying)?;
        self.end_of_line()
    }

    fn ty(&mut self) -> Result<TypeId> {
        match self.advance() {
            Some(Token::Star) => {
                let elem = self.ty()?;
                Ok(self.builder.types_mut().pointer(elem))
            }
            Some(Token::Chan) => {
                let elem = self.ty()?;
                Ok(self.builder.types_mut().chan(elem))
            }
            Some(Token::Interface) => {
                let methods = self.braced(Self::method_spec)?;
                Ok(self.builder.types_mut().interface(methods))
            }
            Some(Token::Struct) => {
                let fields = self.braced(Self::field)?;
                Ok(self.builder.types_mut().structure(fields))
            }
            Some(Token::Ident(name)) => {
                let types = self.builder.types_mut();
                Ok(match BasicKind::from_name(&name) {
                    Some(kind) => types.basic(kind),
                    None if name == "any" => types.any(),
                    None => types.declare_named(&name),
                })
            }
            other => {
                self.retreat(other);
                Err(self.unexpected("type"))
            }
        }
    }

    /// Parses `{ item; item \n item }`.
    fn braced<T>(&mut self, mut item: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        self.expect(Token::LBrace, "{")?;
        let mut items = Vec::new();
        loop {
            while self.eat(&Token::Newline) || self.eat(&Token::Semicolon) {}
            if self.eat(&Token::RBrace) {
                return Ok(items);
            }
            items.push(item(self)?);
        }
    }

    fn method_spec(&mut self) -> Result<MethodSpec> {
        let name = self.ident("method name")?;
        self.expect(Token::LParen, "(")?;
        let mut params = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                params.push(self.ty()?);
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(Token::Comma, ", or )")?;
            }
        }
        let result = self.result_type()?;
        Ok(MethodSpec {
            name,
            signature: Signature { params, result },
        })
    }

    fn field(&mut self) -> Result<Field> {
        let name = self.ident("field name")?;
        let ty = self.ty()?;
        Ok(Field { name, ty })
    }

    /// An optional result type before the end of a signature.
    fn result_type(&mut self) -> Result<Option<TypeId>> {
        match self.peek() {
            None
            | Some(
                Token::Newline | Token::Semicolon | Token::RBrace | Token::LBrace | Token::Comma,
            ) => Ok(None),
            Some(_) => self.ty().map(Some),
        }
    }

    fn func_decl(&mut self) -> Result<()> {
        let synthetic = self.eat(&Token::Synthetic).then(|| "synthetic".to_owned());
        self.expect(Token::Func, "func")?;

        let receiver = if self.eat(&Token::LParen) {
            let name = self.ident("receiver name")?;
            let pointer = self.eat(&Token::Star);
            let type_name = self.ident("receiver type")?;
            if BasicKind::from_name(&type_name).is_some() {
                return Err(self.error(format!("cannot define methods on {type_name}")));
            }
            self.expect(Token::RParen, ")")?;
            Some(ReceiverSpec {
                name,
                named: self.builder.types_mut().declare_named(&type_name),
                pointer,
            })
        } else {
            None
        };

        let name = self.ident("function name")?;
        self.expect(Token::LParen, "(")?;
        let mut params = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                let name = self.ident("parameter name")?;
                let ty = self.ty()?;
                params.push(Parameter { name, ty });
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(Token::Comma, ", or )")?;
            }
        }
        let result = self.result_type()?;

        let id = self.builder.declare(FunctionDecl {
            name,
            receiver,
            params,
            result,
            synthetic,
        })?;

        if self.eat(&Token::LBrace) {
            self.end_of_line()?;
            let blocks = self.blocks()?;
            self.builder.define(id, blocks)?;
        }
        self.end_of_line()
    }

    fn blocks(&mut self) -> Result<Vec<BlockSpec>> {
        let mut blocks: Vec<BlockSpec> = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.unexpected("}")),
                Some(Token::RBrace) => {
                    self.pos += 1;
                    return Ok(blocks);
                }
                Some(Token::Newline) => self.pos += 1,
                Some(Token::Int(_)) => {
                    let index = self.block_index()?;
                    if index != blocks.len() {
                        return Err(self.error(format!(
                            "expected block {expected}, found block {index}",
                            expected = blocks.len()
                        )));
                    }
                    self.expect(Token::Colon, ":")?;

                    // Anything following the label is commentary
                    let mut comment = None;
                    while !matches!(self.peek(), None | Some(Token::Newline)) {
                        if let (None, Some(Token::Ident(name))) = (&comment, self.peek()) {
                            comment = Some(name.clone());
                        }
                        self.pos += 1;
                    }
                    self.end_of_line()?;
                    blocks.push(BlockSpec {
                        comment,
                        statements: Vec::new(),
                    });
                }
                Some(_) => {
                    let statement = self.statement()?;
                    self.end_of_line()?;
                    match blocks.last_mut() {
                        Some(block) => block.statements.push(statement),
                        None => return Err(self.error("instruction outside of a block")),
                    }
                }
            }
        }
    }

    fn statement(&mut self) -> Result<StatementSpec> {
        if let (Some(Token::Ident(_)), Some(Token::Assign)) = (self.peek(), self.peek_nth(1)) {
            let register = self.ident("register")?;
            self.pos += 1;
            let instruction = self.value_instruction()?;
            return Ok(StatementSpec {
                register: Some(register),
                instruction,
            });
        }

        let instruction = match self.peek() {
            Some(Token::Star) => {
                self.pos += 1;
                let addr = self.value()?;
                self.expect(Token::Assign, "=")?;
                let value = self.value()?;
                InstructionSpec::Store { addr, value }
            }
            Some(Token::If) => {
                self.pos += 1;
                let cond = self.value()?;
                self.expect(Token::Goto, "goto")?;
                let then_block = self.block_index()?;
                self.expect(Token::Else, "else")?;
                let else_block = self.block_index()?;
                InstructionSpec::If {
                    cond,
                    then_block,
                    else_block,
                }
            }
            Some(Token::Jump) => {
                self.pos += 1;
                InstructionSpec::Jump {
                    target: self.block_index()?,
                }
            }
            Some(Token::Return) => {
                self.pos += 1;
                let value = match self.peek() {
                    None | Some(Token::Newline) => None,
                    Some(_) => Some(self.value()?),
                };
                InstructionSpec::Return { value }
            }
            Some(Token::Panic) => {
                self.pos += 1;
                InstructionSpec::Panic {
                    value: self.value()?,
                }
            }
            Some(Token::Call | Token::Invoke) => self.call()?,
            _ => return Err(self.unexpected("instruction")),
        };

        Ok(StatementSpec {
            register: None,
            instruction,
        })
    }

    /// The right hand side of `tN = ...`.
    fn value_instruction(&mut self) -> Result<InstructionSpec> {
        let op = match self.peek() {
            Some(Token::Minus) if !matches!(self.peek_nth(1), Some(Token::Int(_))) => {
                Some(UnaryOp::Neg)
            }
            Some(Token::Bang) => Some(UnaryOp::Not),
            Some(Token::Star) => Some(UnaryOp::Deref),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            return Ok(InstructionSpec::UnOp {
                op,
                x: self.value()?,
            });
        }

        match self.peek() {
            Some(Token::Call | Token::Invoke) => return self.call(),
            Some(Token::Phi) => {
                self.pos += 1;
                self.expect(Token::LBracket, "[")?;
                let mut edges = Vec::new();
                loop {
                    let block = self.block_index()?;
                    self.expect(Token::Colon, ":")?;
                    edges.push((block, self.value()?));
                    if self.eat(&Token::RBracket) {
                        break;
                    }
                    self.expect(Token::Comma, ", or ]")?;
                }
                return Ok(InstructionSpec::Phi { edges });
            }
            Some(Token::Local) => {
                self.pos += 1;
                return Ok(InstructionSpec::Alloc { ty: self.ty()? });
            }
            Some(Token::Make) => {
                self.pos += 1;
                let interface = self.ty()?;
                self.expect(Token::Arrow, "<-")?;
                let x = self.value()?;
                return Ok(InstructionSpec::MakeInterface { interface, x });
            }
            _ => {}
        }

        let x = self.value()?;
        let op = match self.advance() {
            Some(Token::Plus) => BinaryOp::Add,
            Some(Token::Minus) => BinaryOp::Sub,
            Some(Token::Star) => BinaryOp::Mul,
            Some(Token::Slash) => BinaryOp::Div,
            Some(Token::Percent) => BinaryOp::Rem,
            Some(Token::Amp) => BinaryOp::And,
            Some(Token::Pipe) => BinaryOp::Or,
            Some(Token::Caret) => BinaryOp::Xor,
            Some(Token::AmpCaret) => BinaryOp::AndNot,
            Some(Token::Shl) => BinaryOp::Shl,
            Some(Token::Shr) => BinaryOp::Shr,
            Some(Token::EqEq) => BinaryOp::Eq,
            Some(Token::NotEq) => BinaryOp::Ne,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            other => {
                self.retreat(other);
                return Err(self.unexpected("binary operator"));
            }
        };
        let y = self.value()?;
        Ok(InstructionSpec::BinOp { op, x, y })
    }

    fn call(&mut self) -> Result<InstructionSpec> {
        let invoke = match self.advance() {
            Some(Token::Call) => false,
            Some(Token::Invoke) => true,
            _ => return Err(Error::InternalError("call expected".into())),
        };

        let target = self.ident("callee")?;
        let callee = if invoke {
            let (receiver, method) = target
                .rsplit_once('.')
                .ok_or_else(|| self.error(format!("invoke target {target} has no method")))?;
            CalleeSpec::Invoke {
                receiver: ValueSpec::Name(receiver.to_owned()),
                method: method.to_owned(),
            }
        } else {
            CalleeSpec::Function(target)
        };

        self.expect(Token::LParen, "(")?;
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.value()?);
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(Token::Comma, ", or )")?;
            }
        }

        Ok(InstructionSpec::Call { callee, args })
    }

    /// A name, or a constant written as `literal:type`.
    fn value(&mut self) -> Result<ValueSpec> {
        let literal = match self.advance() {
            Some(Token::Ident(name)) => return Ok(ValueSpec::Name(name)),
            Some(Token::Int(value)) => Literal::Int(value),
            Some(Token::Minus) => match self.advance() {
                Some(Token::Int(value)) => Literal::Int(-value),
                other => {
                    self.retreat(other);
                    return Err(self.unexpected("integer"));
                }
            },
            Some(Token::Str(value)) => Literal::Str(value),
            Some(Token::True) => Literal::Bool(true),
            Some(Token::False) => Literal::Bool(false),
            Some(Token::Nil) => Literal::Nil,
            other => {
                self.retreat(other);
                return Err(self.unexpected("value"));
            }
        };

        self.expect(Token::Colon, ": and constant type")?;
        let ty = self.ty()?;
        Ok(ValueSpec::Const(Constant { value: literal, ty }))
    }
}
