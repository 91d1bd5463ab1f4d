use logos::Logos;

/// Tokens of an SSA listing. Newlines are significant: every instruction occupies one line.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip r"#[^\n]*")]
pub(crate) enum Token {
    #[token("package")]
    Package,
    #[token("type")]
    Type,
    #[token("func")]
    Func,
    #[token("synthetic")]
    Synthetic,
    #[token("interface")]
    Interface,
    #[token("struct")]
    Struct,
    #[token("chan")]
    Chan,
    #[token("if")]
    If,
    #[token("goto")]
    Goto,
    #[token("else")]
    Else,
    #[token("jump")]
    Jump,
    #[token("return")]
    Return,
    #[token("panic")]
    Panic,
    #[token("call")]
    Call,
    #[token("invoke")]
    Invoke,
    #[token("phi")]
    Phi,
    #[token("local")]
    Local,
    #[token("make")]
    Make,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("nil")]
    Nil,

    /// Identifiers may be qualified with dots, as in `Square.Area` or `if.then`.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*", |lex| lex.slice().to_owned())]
    Ident(String),
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    Str(String),

    #[token("\n")]
    Newline,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token("=")]
    Assign,
    #[token("<-")]
    Arrow,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("&^")]
    AmpCaret,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("!")]
    Bang,
}

fn unescape(quoted: &str) -> Option<String> {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            _ => return None,
        }
    }
    Some(out)
}

/// A token and the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub line: usize,
}

/// Splits a listing into tokens, reporting the line of the first unrecognized input.
pub(crate) fn tokenize(source: &str) -> std::result::Result<Vec<Spanned>, usize> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut lexer = Token::lexer(source);
    while let Some(token) = lexer.next() {
        let token = token.map_err(|_| line)?;
        let newline = token == Token::Newline;
        tokens.push(Spanned { token, line });
        if newline {
            line += 1;
        }
    }
    Ok(tokens)
}
