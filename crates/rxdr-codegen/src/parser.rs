//! Parser for XDR protocol definition files (.x files).
//!
//! A recursive-descent parser over the token stream of [`crate::lexer`].
//! Every definition lands in a [`SymbolTable`]; errors are reported to the
//! table and parsing resumes after the next top-level `;`.

use std::collections::HashMap;

use crate::ast::*;
use crate::error::Diagnostic;
use crate::lexer::{parse_integer, tokenize, Keyword, Token, TokenKind};

type PResult<T> = std::result::Result<T, Diagnostic>;

/// Parse one file's contents into `table`.
pub fn parse_source(table: &mut SymbolTable, file: &str, src: &str) {
    table.add_file(file);
    let (tokens, diagnostics) = tokenize(file, src);
    for diagnostic in diagnostics {
        table.report(diagnostic);
    }
    let mut parser = Parser {
        file,
        tokens,
        pos: 0,
        table,
        containers: Vec::new(),
    };
    parser.run();
}

struct Parser<'a> {
    file: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    table: &'a mut SymbolTable,
    /// Names of the aggregates being parsed, innermost last. Anonymous
    /// types are named after them.
    containers: Vec<String>,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    /// Consume a token. The trailing `Eof` is never consumed.
    fn next(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn is_punct(&self, c: char) -> bool {
        self.peek().kind == TokenKind::Punct(c)
    }

    fn eat_punct(&mut self, c: char) -> bool {
        let found = self.is_punct(c);
        if found {
            self.next();
        }
        found
    }

    fn expect_punct(&mut self, c: char) -> PResult<()> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", c)))
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        let found = self.peek().kind == TokenKind::Keyword(keyword);
        if found {
            self.next();
        }
        found
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> PResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(&TokenKind::Keyword(keyword).to_string()))
        }
    }

    fn expect_ident(&mut self) -> PResult<String> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.next();
                Ok(name)
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    fn error_at(&self, line: usize, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(self.file, line, message)
    }

    fn unexpected(&self, what: &str) -> Diagnostic {
        let token = self.peek();
        self.error_at(token.line, format!("expected {}, found {}", what, token.kind))
    }

    fn define(&mut self, ident: Ident, kind: DefKind, comment: Option<String>, line: usize) {
        self.table.insert(Definition {
            ident,
            kind,
            comment,
            file: self.file.to_string(),
            line,
        });
    }

    fn within<T>(&mut self, container: &str, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        self.containers.push(container.to_string());
        let result = f(self);
        self.containers.pop();
        result
    }

    /// The trailing comment on the line of the last consumed token, if
    /// it was written after a token at or past `start`.
    fn line_comment_since(&self, start: usize) -> Option<String> {
        let last = self.pos.checked_sub(1)?;
        let line = self.tokens[last].line;
        self.tokens[start..self.pos]
            .iter()
            .rev()
            .take_while(|t| t.line == line)
            .find_map(|t| t.line_comment.clone())
    }

    fn run(&mut self) {
        while !self.at_eof() {
            self.definition_or_recover();
        }
    }

    fn definition_or_recover(&mut self) {
        let start = self.pos;
        if let Err(diagnostic) = self.definition() {
            self.table.report(diagnostic);
            let depth = self.tokens[start..self.pos]
                .iter()
                .map(|t| match t.kind {
                    TokenKind::Punct('{') => 1,
                    TokenKind::Punct('}') => -1,
                    _ => 0,
                })
                .sum();
            self.recover(depth);
        }
    }

    /// Skip to just past the next `;` outside the braces the failed
    /// definition opened.
    fn recover(&mut self, mut depth: i32) {
        loop {
            match self.next().kind {
                TokenKind::Eof => return,
                TokenKind::Punct('{') => depth += 1,
                TokenKind::Punct('}') => depth -= 1,
                TokenKind::Punct(';') if depth <= 0 => return,
                _ => {}
            }
        }
    }

    fn definition(&mut self) -> PResult<()> {
        let token = self.next();
        let TokenKind::Keyword(keyword) = token.kind else {
            return Err(self.error_at(
                token.line,
                format!("expected a definition, found {}", token.kind),
            ));
        };
        match keyword {
            Keyword::Const => {
                let name = self.expect_ident()?;
                self.expect_punct('=')?;
                let value = self.value()?;
                self.expect_punct(';')?;
                self.define(
                    Ident::constant(name),
                    DefKind::Const(value),
                    token.comment,
                    token.line,
                );
            }
            Keyword::Typedef => {
                let decl = self
                    .declaration()?
                    .ok_or_else(|| self.error_at(token.line, "cannot typedef void"))?;
                self.expect_punct(';')?;
                // `typedef struct { ... } name;` already defined `name`.
                if decl.qual == Qualifier::Scalar && decl.ty == TypeSpec::Named(decl.ident.xid.clone())
                {
                    return Ok(());
                }
                self.define(
                    Ident::ty(&decl.ident.xid),
                    DefKind::Typedef(decl),
                    token.comment,
                    token.line,
                );
            }
            Keyword::Enum | Keyword::Struct | Keyword::Union => {
                let name = self.expect_ident()?;
                let kind = self.within(&name, |p| p.body(keyword))?;
                self.expect_punct(';')?;
                self.define(Ident::ty(name), kind, token.comment, token.line);
            }
            Keyword::Program => self.program(token)?,
            Keyword::Namespace => {
                self.expect_ident()?;
                self.expect_punct('{')?;
                while !self.is_punct('}') && !self.at_eof() {
                    self.definition_or_recover();
                }
                self.expect_punct('}')?;
                self.eat_punct(';');
            }
            _ => {
                return Err(self.error_at(
                    token.line,
                    format!("expected a definition, found {}", token.kind),
                ))
            }
        }
        Ok(())
    }

    fn body(&mut self, keyword: Keyword) -> PResult<DefKind> {
        Ok(match keyword {
            Keyword::Enum => DefKind::Enum(self.enum_body()?),
            Keyword::Struct => DefKind::Struct(self.struct_body()?),
            _ => DefKind::Union(self.union_body()?),
        })
    }

    fn value(&mut self) -> PResult<Value> {
        let token = self.next();
        match token.kind {
            TokenKind::Number(literal) => match parse_integer(&literal) {
                Some(value) => Ok(Value::Int { value, literal }),
                None => Err(self.error_at(token.line, format!("integer {} out of range", literal))),
            },
            TokenKind::Ident(name) => Ok(Value::Ident(name)),
            other => Err(self.error_at(token.line, format!("expected a constant, found {}", other))),
        }
    }

    fn type_spec(&mut self) -> PResult<TypeSpec> {
        let token = self.next();
        Ok(match token.kind {
            TokenKind::Keyword(Keyword::Unsigned) => {
                if self.eat_keyword(Keyword::Hyper) {
                    TypeSpec::UnsignedHyper
                } else {
                    self.eat_keyword(Keyword::Int);
                    TypeSpec::UnsignedInt
                }
            }
            TokenKind::Keyword(Keyword::Int) => TypeSpec::Int,
            TokenKind::Keyword(Keyword::Hyper) => TypeSpec::Hyper,
            TokenKind::Keyword(Keyword::Float) => TypeSpec::Float,
            TokenKind::Keyword(Keyword::Double) => TypeSpec::Double,
            TokenKind::Keyword(Keyword::Quadruple) => TypeSpec::Quadruple,
            TokenKind::Keyword(Keyword::Bool) => TypeSpec::Bool,
            TokenKind::Keyword(Keyword::Opaque) => TypeSpec::Opaque,
            TokenKind::Keyword(Keyword::String) => TypeSpec::String,
            TokenKind::Keyword(keyword @ (Keyword::Struct | Keyword::Enum | Keyword::Union)) => {
                match &self.peek().kind {
                    // C-style reference: `struct foo *next`
                    TokenKind::Ident(name) => {
                        let name = name.clone();
                        self.next();
                        TypeSpec::Named(name)
                    }
                    _ => self.anonymous(keyword, token.line)?,
                }
            }
            TokenKind::Ident(name) => TypeSpec::Named(name),
            other => {
                return Err(self.error_at(token.line, format!("expected a type, found {}", other)))
            }
        })
    }

    /// Lift an inline `struct {...}`, `enum {...}` or `union switch...`
    /// into a definition of its own and refer to it by name.
    fn anonymous(&mut self, keyword: Keyword, line: usize) -> PResult<TypeSpec> {
        let (field, plain) = self
            .declared_name()
            .ok_or_else(|| self.error_at(line, "anonymous type without a declaration"))?;
        let name = match self.containers.last() {
            Some(container) => format!("XdrAnon_{}_{}", container, field),
            None if plain => field,
            None => format!("XdrAnon_{}", field),
        };
        let kind = self.within(&name, |p| p.body(keyword))?;
        self.define(Ident::ty(&name), kind, None, line);
        Ok(TypeSpec::Named(name))
    }

    /// Look past the braces of an inline type for the name it declares.
    /// The flag is set for a plain `name;` without pointer or bound.
    fn declared_name(&self) -> Option<(String, bool)> {
        let mut depth = 0;
        let mut i = self.pos;
        loop {
            match &self.tokens.get(i)?.kind {
                TokenKind::Eof => return None,
                TokenKind::Punct('{') => depth += 1,
                TokenKind::Punct('}') => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        i += 1;
        let mut pointer = false;
        while self.tokens.get(i)?.kind == TokenKind::Punct('*') {
            pointer = true;
            i += 1;
        }
        let TokenKind::Ident(name) = &self.tokens.get(i)?.kind else {
            return None;
        };
        let plain = !pointer && self.tokens.get(i + 1)?.kind == TokenKind::Punct(';');
        Some((name.clone(), plain))
    }

    /// `type name`, `type *name`, `type name[n]`, `type name<n>` or `void`.
    fn declaration(&mut self) -> PResult<Option<Decl>> {
        let start = self.peek().clone();
        if self.eat_keyword(Keyword::Void) {
            return Ok(None);
        }
        let ty = self.type_spec()?;
        let optional = self.eat_punct('*');
        let name = self.expect_ident()?;
        let qual = if optional {
            Qualifier::Optional
        } else if self.eat_punct('[') {
            let n = self.value()?;
            self.expect_punct(']')?;
            Qualifier::Array(n)
        } else if self.eat_punct('<') {
            let bound = if self.is_punct('>') {
                None
            } else {
                Some(self.value()?)
            };
            self.expect_punct('>')?;
            Qualifier::Vector(bound)
        } else {
            Qualifier::Scalar
        };
        match (&ty, &qual) {
            (TypeSpec::String, Qualifier::Vector(_))
            | (TypeSpec::Opaque, Qualifier::Array(_) | Qualifier::Vector(_)) => {}
            (TypeSpec::String, _) => {
                return Err(self.error_at(
                    start.line,
                    format!("string {} must be declared as {}<>", name, name),
                ))
            }
            (TypeSpec::Opaque, _) => {
                return Err(self.error_at(
                    start.line,
                    format!("opaque {} needs a length, [n] or <n>", name),
                ))
            }
            _ => {}
        }
        Ok(Some(Decl {
            ident: Ident::field(name),
            ty,
            qual,
            comment: start.comment,
            line_comment: None,
            line: start.line,
        }))
    }

    /// A declaration followed by `;`, with its trailing comment.
    fn field(&mut self) -> PResult<Option<Decl>> {
        let start = self.pos;
        let mut decl = self.declaration()?;
        self.expect_punct(';')?;
        if let Some(decl) = &mut decl {
            decl.line_comment = self.line_comment_since(start);
        }
        Ok(decl)
    }

    fn enum_body(&mut self) -> PResult<EnumDef> {
        self.expect_punct('{')?;
        let mut tags: Vec<EnumTag> = Vec::new();
        let mut values: HashMap<String, i64> = HashMap::new();
        let mut next = Some(0i64);
        loop {
            let start = self.pos;
            let token = self.peek().clone();
            let name = self.expect_ident()?;
            let value = if self.eat_punct('=') {
                self.value()?
            } else {
                match next {
                    Some(v) => Value::int(v),
                    None => {
                        return Err(self.error_at(
                            token.line,
                            format!("cannot infer the value of {}", name),
                        ))
                    }
                }
            };
            let resolved = match &value {
                Value::Ident(other) => values
                    .get(other)
                    .copied()
                    .or_else(|| self.table.resolve(&value)),
                Value::Int { value, .. } => Some(*value),
            };
            if let Some(v) = resolved {
                values.insert(name.clone(), v);
            }
            next = resolved.and_then(|v| v.checked_add(1));
            let more = self.eat_punct(',');
            let line_comment = self.line_comment_since(start);
            tags.push(EnumTag {
                ident: Ident::constant(name),
                value,
                comment: token.comment.or(line_comment),
            });
            if !more || self.is_punct('}') {
                break;
            }
        }
        self.expect_punct('}')?;
        Ok(EnumDef { tags })
    }

    fn struct_body(&mut self) -> PResult<StructDef> {
        self.expect_punct('{')?;
        let mut fields: Vec<Decl> = Vec::new();
        while !self.is_punct('}') {
            let line = self.peek().line;
            let decl = self
                .field()?
                .ok_or_else(|| self.error_at(line, "void is only allowed in union arms"))?;
            if fields.iter().any(|f| f.ident.xid == decl.ident.xid) {
                return Err(self.error_at(line, format!("duplicate field {}", decl.ident.xid)));
            }
            fields.push(decl);
        }
        self.expect_punct('}')?;
        Ok(StructDef { fields })
    }

    fn union_body(&mut self) -> PResult<UnionDef> {
        self.expect_keyword(Keyword::Switch)?;
        self.expect_punct('(')?;
        let line = self.peek().line;
        let discriminant = self
            .declaration()?
            .ok_or_else(|| self.error_at(line, "union discriminant cannot be void"))?;
        self.expect_punct(')')?;
        self.expect_punct('{')?;
        let mut arms = Vec::new();
        let mut seen_default = false;
        while !self.is_punct('}') {
            let mut arm = UnionArm {
                cases: Vec::new(),
                is_default: false,
                decl: None,
            };
            loop {
                let line = self.peek().line;
                if self.eat_keyword(Keyword::Case) {
                    arm.cases.push(self.value()?);
                    self.expect_punct(':')?;
                } else if self.eat_keyword(Keyword::Default) {
                    if seen_default {
                        return Err(self.error_at(line, "duplicate default arm"));
                    }
                    seen_default = true;
                    arm.is_default = true;
                    self.expect_punct(':')?;
                } else {
                    break;
                }
            }
            if arm.cases.is_empty() && !arm.is_default {
                return Err(self.unexpected("case or default"));
            }
            arm.decl = self.field()?;
            arms.push(arm);
        }
        if arms.is_empty() {
            return Err(self.unexpected("case or default"));
        }
        self.expect_punct('}')?;
        Ok(UnionDef { discriminant, arms })
    }

    fn proc_type(&mut self) -> PResult<Option<TypeSpec>> {
        if self.eat_keyword(Keyword::Void) {
            Ok(None)
        } else {
            self.type_spec().map(Some)
        }
    }

    fn program(&mut self, token: Token) -> PResult<()> {
        let name = self.expect_ident()?;
        self.expect_punct('{')?;
        let mut versions = Vec::new();
        while !self.is_punct('}') {
            self.expect_keyword(Keyword::Version)?;
            let version = self.expect_ident()?;
            self.expect_punct('{')?;
            let mut procedures = Vec::new();
            while !self.is_punct('}') {
                let result = self.proc_type()?;
                let proc_name = self.expect_ident()?;
                self.expect_punct('(')?;
                let mut args = Vec::new();
                if !self.is_punct(')') {
                    loop {
                        args.extend(self.proc_type()?);
                        if !self.eat_punct(',') {
                            break;
                        }
                    }
                }
                self.expect_punct(')')?;
                self.expect_punct('=')?;
                let number = self.value()?;
                self.expect_punct(';')?;
                procedures.push(Procedure {
                    ident: Ident::constant(proc_name),
                    number,
                    result,
                    args,
                });
            }
            self.expect_punct('}')?;
            self.expect_punct('=')?;
            let number = self.value()?;
            self.expect_punct(';')?;
            versions.push(VersionDef {
                ident: Ident::constant(version),
                number,
                procedures,
            });
        }
        self.expect_punct('}')?;
        self.expect_punct('=')?;
        let number = self.value()?;
        self.expect_punct(';')?;
        self.define(
            Ident::constant(name),
            DefKind::Program(ProgramDef { number, versions }),
            token.comment,
            token.line,
        );
        Ok(())
    }
}
