//! Text IR reader.
//!
//! Reads the LLVM-assembly-like subset described in the crate docs into a
//! [`Module`]. Reading happens in two sweeps over the tokenized lines: the
//! first registers every `define`/`declare` header so calls can name
//! functions declared later in the file, the second builds function bodies.
//!
//! Module-level global variables (`@name = ...`) are not interpreted: each
//! line is kept verbatim and `@name` becomes an opaque `ptr` value that
//! instructions may read.
//!
//! Forward references to values (a `phi` reading a value defined further
//! down) become placeholders that are swapped for the real definition with
//! [`Module::replace_all_uses_with`] once it is read.

mod lexer;

use crate::ir::{
    ArithFlags, BlockId, FuncId, FunctionBuilder, InstId, IntPredicate, Module, Opcode, Type,
    ValueId, ValueKind, MAX_INT_BITS,
};
use anyhow::{anyhow, bail, Context, Result};
use lexer::{global_definition_name, tokenize, Token};
use std::collections::{HashMap, HashSet};

/// Parse a module from its text form.
///
/// Errors carry the 1-based source line as context, e.g. `line 7: unknown opcode 'fadd'`
/// when displayed with `{:#}`.
pub fn parse_module(source: &str) -> Result<Module> {
    let mut module = Module::new("");
    let mut lines = Vec::new();
    // Every `@name` in scope: globals and functions.
    let mut symbols: HashMap<String, ValueId> = HashMap::new();

    for (idx, text) in source.lines().enumerate() {
        let number = idx + 1;
        let trimmed = text.trim();
        if let Some(rest) = trimmed.strip_prefix("; ModuleID =") {
            module.name = rest.trim().trim_matches('\'').to_string();
            continue;
        }
        if trimmed.starts_with("target ") {
            module.target_lines.push(trimmed.to_string());
            continue;
        }
        if trimmed.starts_with("attributes ") || trimmed.starts_with('!') {
            continue;
        }
        if trimmed.starts_with('@') {
            let name = global_definition_name(trimmed).with_context(|| format!("line {number}"))?;
            if symbols.contains_key(&name) {
                bail!("line {number}: redefinition of @{name}");
            }
            let global = module.add_global(name.clone(), trimmed);
            symbols.insert(name, module.global(global).as_value());
            continue;
        }
        let tokens = tokenize(text).with_context(|| format!("line {number}"))?;
        if tokens.first().is_some_and(|t| t.is_word("source_filename")) {
            match tokens.as_slice() {
                [_, eq, Token::Str(s)] if eq.is_punct('=') => {
                    module.source_filename = Some(s.clone());
                }
                _ => bail!("line {number}: malformed source_filename"),
            }
            continue;
        }
        if !tokens.is_empty() {
            lines.push(SourceLine { number, tokens });
        }
    }

    // Sweep 1: function headers.
    let mut definitions = Vec::new();
    for line in &lines {
        let first = &line.tokens[0];
        if !(first.is_word("define") || first.is_word("declare")) {
            continue;
        }
        let header = parse_header(&line.tokens).with_context(|| format!("line {}", line.number))?;
        if symbols.contains_key(&header.name) {
            bail!("line {}: redefinition of @{}", line.number, header.name);
        }
        let param_tys: Vec<Type> = header.params.iter().map(|(ty, _)| *ty).collect();
        let func = module.add_function(header.name.clone(), header.ret_ty, &param_tys);
        for (i, (_, name)) in header.params.iter().enumerate() {
            let param = module.function(func).params()[i];
            module.set_value_name(param, name.clone().filter(|n| !is_numeric(n)));
        }
        let f = module.function_mut(func);
        f.linkage = header.linkage;
        f.attrs = header.attrs;
        f.vararg = header.vararg;
        symbols.insert(header.name, module.function(func).as_value());
        if header.is_definition {
            definitions.push((func, line.number, header.params));
        }
    }

    // Sweep 2: bodies.
    let mut definitions = definitions.into_iter();
    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        let at = || format!("line {}", line.number);
        match &line.tokens[0] {
            t if t.is_word("define") => {
                let Some((func, header_line, params)) = definitions.next() else {
                    bail!("{}: function header out of sync", at());
                };
                let mut parser = BodyParser::new(&mut module, &symbols, func, &params)
                    .with_context(|| format!("line {header_line}"))?;
                i += parser.parse_body(&lines[i + 1..])?;
            }
            t if t.is_word("declare") => {}
            other => bail!("{}: unexpected '{}' at top level", at(), other),
        }
        i += 1;
    }

    module.verify().context("malformed module")?;
    Ok(module)
}

struct SourceLine {
    number: usize,
    tokens: Vec<Token>,
}

fn is_numeric(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

fn type_from_word(word: &str) -> Option<Type> {
    match word {
        "void" => Some(Type::Void),
        "ptr" => Some(Type::Ptr),
        _ => {
            let bits: u32 = word.strip_prefix('i')?.parse().ok()?;
            Some(Type::Int(bits))
        }
    }
}

// ── Token stream ─────────────────────────────────────────────────────────────

struct TokenStream<'t> {
    toks: &'t [Token],
    pos: usize,
}

impl<'t> TokenStream<'t> {
    fn new(toks: &'t [Token]) -> Self {
        Self { toks, pos: 0 }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.toks.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'t Token> {
        self.toks.get(self.pos + offset)
    }

    fn next(&mut self) -> Result<&'t Token> {
        let tok = self
            .toks
            .get(self.pos)
            .ok_or_else(|| anyhow!("unexpected end of line"))?;
        self.pos += 1;
        Ok(tok)
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek().is_some_and(|t| t.is_punct(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) -> Result<()> {
        match self.next()? {
            t if t.is_punct(c) => Ok(()),
            other => bail!("expected '{}' but found '{}'", c, other),
        }
    }

    fn eat_word(&mut self, w: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_word(w)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, w: &str) -> Result<()> {
        match self.next()? {
            t if t.is_word(w) => Ok(()),
            other => bail!("expected '{}' but found '{}'", w, other),
        }
    }

    fn word(&mut self) -> Result<&'t str> {
        match self.next()? {
            Token::Word(w) => Ok(w),
            other => bail!("expected a keyword but found '{}'", other),
        }
    }

    fn local(&mut self) -> Result<&'t str> {
        match self.next()? {
            Token::Local(n) => Ok(n),
            other => bail!("expected a local name but found '{}'", other),
        }
    }

    fn int(&mut self) -> Result<i64> {
        match self.next()? {
            Token::Int(v) => Ok(*v),
            other => bail!("expected an integer but found '{}'", other),
        }
    }

    fn at_type(&self) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if type_from_word(w).is_some())
    }

    fn ty(&mut self) -> Result<Type> {
        let tok = self.next()?;
        let ty = match tok {
            Token::Word(w) => type_from_word(w),
            _ => None,
        };
        match ty {
            Some(Type::Int(bits)) if bits == 0 || bits > MAX_INT_BITS => {
                bail!("integer type '{}' is wider than i{}", tok, MAX_INT_BITS)
            }
            Some(ty) => Ok(ty),
            None => bail!("expected a type but found '{}'", tok),
        }
    }

    /// Skip attribute keywords (`noundef`, `signext`, `align 8`, ...) that
    /// precede a value in argument and parameter lists.
    fn skip_value_attrs(&mut self) {
        while let Some(tok) = self.peek() {
            match tok {
                Token::Word(w) if !matches!(w.as_str(), "true" | "false" | "null") => {
                    self.pos += 1;
                    if w == "align" && matches!(self.peek(), Some(Token::Int(_))) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }
}

// ── Function headers ─────────────────────────────────────────────────────────

struct Header {
    name: String,
    ret_ty: Type,
    linkage: Vec<String>,
    params: Vec<(Type, Option<String>)>,
    vararg: bool,
    attrs: Vec<String>,
    is_definition: bool,
}

fn parse_header(toks: &[Token]) -> Result<Header> {
    let mut ts = TokenStream::new(toks);
    let is_definition = match ts.word()? {
        "define" => true,
        "declare" => false,
        other => bail!("expected 'define' or 'declare' but found '{}'", other),
    };

    let mut linkage = Vec::new();
    while !ts.at_type() {
        linkage.push(ts.word()?.to_string());
    }
    let ret_ty = ts.ty()?;
    let name = match ts.next()? {
        Token::Global(n) => n.clone(),
        other => bail!("expected a function name but found '{}'", other),
    };

    ts.expect_punct('(')?;
    let mut params = Vec::new();
    let mut vararg = false;
    if !ts.eat_punct(')') {
        loop {
            if matches!(ts.peek(), Some(Token::Ellipsis)) {
                ts.pos += 1;
                vararg = true;
                ts.expect_punct(')')?;
                break;
            }
            let ty = ts.ty()?;
            if ty.is_void() {
                bail!("parameter of @{} cannot be void", name);
            }
            ts.skip_value_attrs();
            let pname = match ts.peek() {
                Some(Token::Local(n)) => {
                    ts.pos += 1;
                    Some(n.clone())
                }
                _ => None,
            };
            params.push((ty, pname));
            if ts.eat_punct(')') {
                break;
            }
            ts.expect_punct(',')?;
        }
    }

    let mut attrs = Vec::new();
    loop {
        match ts.peek() {
            Some(Token::Word(w)) => attrs.push(w.clone()),
            Some(Token::AttrRef(a)) => attrs.push(format!("#{}", a)),
            _ => break,
        }
        ts.pos += 1;
    }

    if is_definition {
        ts.expect_punct('{')?;
    }
    if let Some(tok) = ts.peek() {
        bail!("unexpected '{}' after function header", tok);
    }

    Ok(Header {
        name,
        ret_ty,
        linkage,
        params,
        vararg,
        attrs,
        is_definition,
    })
}

// ── Function bodies ──────────────────────────────────────────────────────────

struct BodyParser<'a> {
    b: FunctionBuilder<'a>,
    symbols: &'a HashMap<String, ValueId>,
    /// Local names (as written, sigil stripped) in scope.
    values: HashMap<String, ValueId>,
    blocks: HashMap<String, BlockId>,
    placed: HashSet<BlockId>,
    /// Next implicit slot number for unnamed values and blocks.
    next_slot: u64,
    /// The last instruction read was a terminator.
    terminated: bool,
}

impl<'a> BodyParser<'a> {
    fn new(
        module: &'a mut Module,
        symbols: &'a HashMap<String, ValueId>,
        func: FuncId,
        params: &[(Type, Option<String>)],
    ) -> Result<Self> {
        let mut parser = Self {
            b: FunctionBuilder::new(module, func),
            symbols,
            values: HashMap::new(),
            blocks: HashMap::new(),
            placed: HashSet::new(),
            next_slot: 0,
            terminated: false,
        };
        for (i, (_, name)) in params.iter().enumerate() {
            let key = parser.claim_slot(name.as_deref())?;
            if parser.values.contains_key(&key) {
                bail!("redefinition of %{}", key);
            }
            let param = parser.b.param(i);
            parser.values.insert(key, param);
        }
        Ok(parser)
    }

    /// Read the lines following the header, up to and including the
    /// closing brace. Returns the number of lines consumed.
    fn parse_body(&mut self, lines: &[SourceLine]) -> Result<usize> {
        for (n, line) in lines.iter().enumerate() {
            let at = || format!("line {}", line.number);
            if line.tokens.len() == 1 && line.tokens[0].is_punct('}') {
                self.finish().with_context(at)?;
                return Ok(n + 1);
            }
            self.parse_line(&line.tokens).with_context(at)?;
        }
        let func = self.b.func();
        bail!(
            "unexpected end of input: missing '}}' after the body of @{}",
            self.module().function(func).name
        )
    }

    /// Returns the scope key for a definition, advancing the implicit slot
    /// counter past any numbered name.
    fn claim_slot(&mut self, name: Option<&str>) -> Result<String> {
        let key = match name {
            Some(n) => n.to_string(),
            None => self.next_slot.to_string(),
        };
        if let Ok(slot) = key.parse::<u64>() {
            self.next_slot = slot
                .checked_add(1)
                .ok_or_else(|| anyhow!("slot number %{} is out of range", key))?;
        }
        Ok(key)
    }

    fn module(&mut self) -> &mut Module {
        self.b.module()
    }

    fn parse_line(&mut self, toks: &[Token]) -> Result<()> {
        if let Some(Token::Label(label)) = toks.first() {
            if toks.len() > 1 {
                bail!("unexpected '{}' after label", toks[1]);
            }
            return self.start_block(label);
        }
        self.parse_instruction(toks)
    }

    fn block_ref(&mut self, name: &str) -> BlockId {
        if let Some(&bb) = self.blocks.get(name) {
            return bb;
        }
        let func = self.b.func();
        let label = (!is_numeric(name)).then(|| name.to_string());
        let bb = self.module().create_block(func, label);
        self.blocks.insert(name.to_string(), bb);
        bb
    }

    fn place_block(&mut self, bb: BlockId) {
        self.module().append_block(bb);
        self.placed.insert(bb);
        self.b.position_at_end(bb);
        self.terminated = false;
    }

    fn start_block(&mut self, label: &str) -> Result<()> {
        self.claim_slot(Some(label))?;
        let bb = self.block_ref(label);
        if self.placed.contains(&bb) {
            bail!("redefinition of label %{}", label);
        }
        self.place_block(bb);
        Ok(())
    }

    /// Open an unlabeled block when an instruction starts the body or
    /// follows a terminator.
    fn ensure_block(&mut self) -> Result<()> {
        if self.b.current_block().is_some() && !self.terminated {
            return Ok(());
        }
        let key = self.claim_slot(None)?;
        let bb = self.block_ref(&key);
        self.place_block(bb);
        Ok(())
    }

    fn value_ref(&mut self, ty: Type, tok: &Token) -> Result<ValueId> {
        match tok {
            Token::Local(name) => {
                if let Some(&v) = self.values.get(name) {
                    let actual = self.module().value(v).ty;
                    if actual != ty {
                        bail!("%{} has type {} but is used as {}", name, actual, ty);
                    }
                    return Ok(v);
                }
                let label = (!is_numeric(name)).then(|| name.clone());
                let v = self.module().placeholder(ty, label);
                self.values.insert(name.clone(), v);
                Ok(v)
            }
            Token::Int(raw) => match ty {
                Type::Int(bits) => Ok(self.module().const_int(bits, *raw)),
                _ => bail!("integer constant {} used as {}", raw, ty),
            },
            Token::Word(w) if w == "true" || w == "false" => {
                if ty != Type::I1 {
                    bail!("'{}' used as {}", w, ty);
                }
                Ok(self.module().const_int(1, i64::from(w == "true")))
            }
            Token::Word(w) if w == "null" => {
                if ty != Type::Ptr {
                    bail!("'null' used as {}", ty);
                }
                Ok(self.module().null())
            }
            Token::Global(name) => {
                let v = *self
                    .symbols
                    .get(name)
                    .ok_or_else(|| anyhow!("use of undefined global @{}", name))?;
                if ty != Type::Ptr {
                    bail!("@{} used as {}", name, ty);
                }
                Ok(v)
            }
            other => bail!("expected a value but found '{}'", other),
        }
    }

    fn operand(&mut self, ts: &mut TokenStream<'_>, ty: Type) -> Result<ValueId> {
        let tok = ts.next()?;
        self.value_ref(ty, tok)
    }

    fn typed_operand(&mut self, ts: &mut TokenStream<'_>) -> Result<(Type, ValueId)> {
        let ty = ts.ty()?;
        let v = self.operand(ts, ty)?;
        Ok((ty, v))
    }

    fn label_operand(&mut self, ts: &mut TokenStream<'_>) -> Result<BlockId> {
        ts.expect_word("label")?;
        let name = ts.local()?;
        Ok(self.block_ref(name))
    }

    /// Bind a result name, resolving any placeholder created by an earlier forward reference.
    fn define(&mut self, name: &str, value: ValueId) -> Result<()> {
        if let Some(&existing) = self.values.get(name) {
            let (kind, expected) = {
                let data = self.module().value(existing);
                (data.kind.clone(), data.ty)
            };
            if kind != ValueKind::Placeholder {
                bail!("redefinition of %{}", name);
            }
            let actual = self.module().value(value).ty;
            if expected != actual {
                bail!("%{} is defined as {} but was used as {}", name, actual, expected);
            }
            self.module().replace_all_uses_with(existing, value);
        }
        let key = self.claim_slot(Some(name))?;
        self.values.insert(key, value);
        let label = (!is_numeric(name)).then(|| name.to_string());
        self.module().set_value_name(value, label);
        Ok(())
    }

    fn parse_instruction(&mut self, toks: &[Token]) -> Result<()> {
        let mut ts = TokenStream::new(toks);
        let result_name = match (ts.peek(), ts.peek_at(1)) {
            (Some(Token::Local(n)), Some(eq)) if eq.is_punct('=') => {
                ts.pos += 2;
                Some(n.as_str())
            }
            _ => None,
        };

        let mut mnemonic = ts.word()?;
        if matches!(mnemonic, "tail" | "musttail" | "notail") {
            mnemonic = ts.word()?;
        }
        let opcode =
            Opcode::from_mnemonic(mnemonic).ok_or_else(|| anyhow!("unknown opcode '{}'", mnemonic))?;

        self.ensure_block()?;
        let id = self.parse_operation(opcode, &mut ts)?;
        self.parse_trailer(&mut ts, id)?;

        let result = self.module().inst(id).result();
        let ty = self.module().inst(id).ty;
        match result_name {
            Some(_) if ty.is_void() => bail!("cannot name the void result of '{}'", opcode),
            Some(name) => self.define(name, result)?,
            None if !ty.is_void() => {
                let key = self.claim_slot(None)?;
                self.values.insert(key, result);
            }
            None => {}
        }
        self.terminated = opcode.is_terminator();
        Ok(())
    }

    fn parse_operation(&mut self, opcode: Opcode, ts: &mut TokenStream<'_>) -> Result<InstId> {
        let id = match opcode {
            op if op.is_binary() => {
                let mut flags = ArithFlags::default();
                loop {
                    if ts.eat_word("nuw") {
                        flags.nuw = true;
                    } else if ts.eat_word("nsw") {
                        flags.nsw = true;
                    } else if ts.eat_word("exact") {
                        flags.exact = true;
                    } else {
                        break;
                    }
                }
                let (ty, lhs) = self.typed_operand(ts)?;
                if ty.int_width().is_none() {
                    bail!("'{}' requires integer operands, found {}", op, ty);
                }
                ts.expect_punct(',')?;
                let rhs = self.operand(ts, ty)?;
                let id = self.b.push(op, ty, vec![lhs, rhs]);
                self.module().inst_mut(id).flags = flags;
                id
            }
            Opcode::ICmp => {
                let pred_name = ts.word()?;
                let pred = IntPredicate::from_name(pred_name)
                    .ok_or_else(|| anyhow!("unknown icmp predicate '{}'", pred_name))?;
                let (ty, lhs) = self.typed_operand(ts)?;
                ts.expect_punct(',')?;
                let rhs = self.operand(ts, ty)?;
                let id = self.b.push(Opcode::ICmp, Type::I1, vec![lhs, rhs]);
                self.module().inst_mut(id).predicate = Some(pred);
                id
            }
            Opcode::Select => {
                let (cond_ty, cond) = self.typed_operand(ts)?;
                if cond_ty != Type::I1 {
                    bail!("select condition must be i1, found {}", cond_ty);
                }
                ts.expect_punct(',')?;
                let (ty, if_true) = self.typed_operand(ts)?;
                ts.expect_punct(',')?;
                let (other_ty, if_false) = self.typed_operand(ts)?;
                if ty != other_ty {
                    bail!("select arms differ in type: {} vs {}", ty, other_ty);
                }
                self.b.push(Opcode::Select, ty, vec![cond, if_true, if_false])
            }
            Opcode::Phi => {
                let ty = ts.ty()?;
                let mut values = Vec::new();
                let mut blocks = Vec::new();
                loop {
                    ts.expect_punct('[')?;
                    values.push(self.operand(ts, ty)?);
                    ts.expect_punct(',')?;
                    let label = ts.local()?;
                    blocks.push(self.block_ref(label));
                    ts.expect_punct(']')?;
                    // A comma not followed by '[' starts the trailer.
                    let more = ts.peek().is_some_and(|t| t.is_punct(','))
                        && ts.peek_at(1).is_some_and(|t| t.is_punct('['));
                    if !more {
                        break;
                    }
                    ts.pos += 1;
                }
                let id = self.b.push(Opcode::Phi, ty, values);
                self.module().inst_mut(id).targets = blocks;
                id
            }
            Opcode::Call => self.parse_call(ts)?,
            Opcode::Ret => {
                if ts.eat_word("void") {
                    self.b.ret(None)
                } else {
                    let (_, v) = self.typed_operand(ts)?;
                    self.b.ret(Some(v))
                }
            }
            Opcode::Br => {
                if matches!(ts.peek(), Some(t) if t.is_word("label")) {
                    let target = self.label_operand(ts)?;
                    self.b.br(target)
                } else {
                    let (ty, cond) = self.typed_operand(ts)?;
                    if ty != Type::I1 {
                        bail!("branch condition must be i1, found {}", ty);
                    }
                    ts.expect_punct(',')?;
                    let if_true = self.label_operand(ts)?;
                    ts.expect_punct(',')?;
                    let if_false = self.label_operand(ts)?;
                    self.b.cond_br(cond, if_true, if_false)
                }
            }
            Opcode::Alloca => {
                let ty = ts.ty()?;
                let ptr = self.b.alloca(ty);
                self.inst_of(ptr)
            }
            Opcode::Load => {
                let ty = ts.ty()?;
                ts.expect_punct(',')?;
                ts.expect_word("ptr")?;
                let ptr = self.operand(ts, Type::Ptr)?;
                let v = self.b.load(ty, ptr);
                self.inst_of(v)
            }
            Opcode::Store => {
                let (_, value) = self.typed_operand(ts)?;
                ts.expect_punct(',')?;
                ts.expect_word("ptr")?;
                let ptr = self.operand(ts, Type::Ptr)?;
                self.b.store(value, ptr)
            }
            Opcode::Unreachable => self.b.unreachable(),
            op => bail!("unsupported opcode '{}'", op),
        };
        Ok(id)
    }

    fn inst_of(&mut self, v: ValueId) -> InstId {
        match self.module().defining_inst(v) {
            Some(id) => id,
            None => unreachable!("builder results are instruction values"),
        }
    }

    fn parse_call(&mut self, ts: &mut TokenStream<'_>) -> Result<InstId> {
        // Calling convention and return attributes.
        while !ts.at_type() {
            ts.word()?;
        }
        let ret_ty = ts.ty()?;
        // Explicit function type, e.g. `call i32 (ptr, ...) @printf(...)`.
        if ts.peek().is_some_and(|t| t.is_punct('(')) {
            while !ts.next()?.is_punct(')') {}
        }
        let callee_tok = ts.next()?;
        if !matches!(callee_tok, Token::Global(_) | Token::Local(_)) {
            bail!("expected a callee but found '{}'", callee_tok);
        }
        let callee = self.value_ref(Type::Ptr, callee_tok)?;

        ts.expect_punct('(')?;
        let mut operands = Vec::new();
        if !ts.eat_punct(')') {
            loop {
                let ty = ts.ty()?;
                ts.skip_value_attrs();
                operands.push(self.operand(ts, ty)?);
                if ts.eat_punct(')') {
                    break;
                }
                ts.expect_punct(',')?;
            }
        }
        operands.push(callee);
        Ok(self.b.push(Opcode::Call, ret_ty, operands))
    }

    /// `, align N`, attribute group references and debug metadata after an instruction.
    fn parse_trailer(&mut self, ts: &mut TokenStream<'_>, id: InstId) -> Result<()> {
        while let Some(tok) = ts.peek() {
            match tok {
                Token::AttrRef(_) => ts.pos += 1,
                Token::Metadata(_) => return Ok(()),
                t if t.is_punct(',') => {
                    ts.pos += 1;
                    if ts.eat_word("align") {
                        let align = ts.int()?;
                        let align = u32::try_from(align)
                            .map_err(|_| anyhow!("invalid alignment {}", align))?;
                        self.module().inst_mut(id).align = Some(align);
                    } else if matches!(ts.peek(), Some(Token::Metadata(_))) {
                        return Ok(());
                    } else {
                        bail!("unexpected '{}' after instruction", ts.next()?);
                    }
                }
                other => bail!("unexpected '{}' after instruction", other),
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let func = self.b.func();
        if self.module().function(func).blocks().is_empty() {
            bail!("function body requires at least one basic block");
        }
        if !self.terminated {
            bail!("function body must end with a terminator");
        }
        let mut undefined: Vec<&String> = self
            .blocks
            .iter()
            .filter(|(_, bb)| !self.placed.contains(*bb))
            .map(|(name, _)| name)
            .collect();
        undefined.sort();
        if let Some(name) = undefined.first() {
            bail!("use of undefined label %{}", name);
        }
        let mut unresolved: Vec<&String> = Vec::new();
        for (name, &v) in &self.values {
            if self.b.module().value(v).kind == ValueKind::Placeholder {
                unresolved.push(name);
            }
        }
        unresolved.sort();
        if let Some(name) = unresolved.first() {
            bail!("use of undefined value %{}", name);
        }
        Ok(())
    }
}
