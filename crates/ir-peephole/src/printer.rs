//! Text IR printer.
//!
//! Emits a [`Module`] in the same format the reader accepts. Unnamed values
//! and blocks are renumbered per function in slot order (unnamed
//! parameters, then for each block its label followed by its unnamed
//! results), so output stays readable after instructions have been erased.

use crate::ir::{BlockId, FuncId, Function, InstId, Module, Opcode, ValueId, ValueKind};
use std::collections::HashMap;

/// Render the whole module as text.
pub fn print_module(module: &Module) -> String {
    let mut out = String::new();

    if !module.name.is_empty() {
        out.push_str(&format!("; ModuleID = '{}'\n", module.name));
    }
    if let Some(file) = &module.source_filename {
        out.push_str(&format!("source_filename = \"{}\"\n", file));
    }
    for line in &module.target_lines {
        out.push_str(line);
        out.push('\n');
    }

    let mut globals = module.globals().peekable();
    if globals.peek().is_some() && !out.is_empty() {
        out.push('\n');
    }
    for (_, global) in globals {
        out.push_str(&global.definition);
        out.push('\n');
    }

    for (id, func) in module.functions() {
        if !out.is_empty() {
            out.push('\n');
        }
        if func.is_declaration() {
            out.push_str(&declaration(module, func));
        } else {
            out.push_str(&FunctionPrinter::new(module, id).print());
        }
    }
    out
}

/// `%name` or `@name`, quoting names the lexer would split.
fn sigil_name(sigil: char, name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | '-'));
    if plain {
        format!("{sigil}{name}")
    } else {
        format!("{sigil}\"{name}\"")
    }
}

fn header_prefix(keyword: &str, func: &Function) -> String {
    let mut s = String::from(keyword);
    for word in &func.linkage {
        s.push(' ');
        s.push_str(word);
    }
    s.push_str(&format!(" {} {}(", func.ret_ty, sigil_name('@', &func.name)));
    s
}

fn header_suffix(func: &Function, s: &mut String) {
    s.push(')');
    for attr in &func.attrs {
        s.push(' ');
        s.push_str(attr);
    }
}

fn declaration(module: &Module, func: &Function) -> String {
    let mut s = header_prefix("declare", func);
    s.push_str(&param_types(module, func));
    header_suffix(func, &mut s);
    s.push('\n');
    s
}

/// Parameter types only, as in a declaration or the explicit function type
/// of a vararg call.
fn param_types(module: &Module, func: &Function) -> String {
    let mut parts: Vec<String> = func
        .params()
        .iter()
        .map(|&p| module.value(p).ty.to_string())
        .collect();
    if func.vararg {
        parts.push("...".to_string());
    }
    parts.join(", ")
}

struct FunctionPrinter<'m> {
    module: &'m Module,
    func: FuncId,
    value_slots: HashMap<ValueId, u32>,
    block_slots: HashMap<BlockId, u32>,
}

impl<'m> FunctionPrinter<'m> {
    fn new(module: &'m Module, func: FuncId) -> Self {
        let mut printer = Self {
            module,
            func,
            value_slots: HashMap::new(),
            block_slots: HashMap::new(),
        };
        printer.number_slots();
        printer
    }

    fn number_slots(&mut self) {
        let module = self.module;
        let func = module.function(self.func);
        let mut next = 0u32;
        for &param in func.params() {
            if module.value(param).name.is_none() {
                self.value_slots.insert(param, next);
                next += 1;
            }
        }
        for &bb in func.blocks() {
            if module.block(bb).name.is_none() {
                self.block_slots.insert(bb, next);
                next += 1;
            }
            for &id in module.block(bb).insts() {
                let inst = module.inst(id);
                let result = inst.result();
                if !inst.ty.is_void() && module.value(result).name.is_none() {
                    self.value_slots.insert(result, next);
                    next += 1;
                }
            }
        }
    }

    fn local(&self, v: ValueId) -> String {
        let data = self.module.value(v);
        match (&data.name, self.value_slots.get(&v)) {
            (Some(name), _) => sigil_name('%', name),
            (None, Some(slot)) => format!("%{slot}"),
            (None, None) => format!("%<badref {v}>"),
        }
    }

    fn value(&self, v: ValueId) -> String {
        let data = self.module.value(v);
        match &data.kind {
            ValueKind::ConstInt(c) => c.to_string(),
            ValueKind::Null => "null".to_string(),
            ValueKind::Function(f) => sigil_name('@', &self.module.function(*f).name),
            ValueKind::Global(g) => sigil_name('@', &self.module.global(*g).name),
            ValueKind::Argument { .. } | ValueKind::Inst(_) | ValueKind::Placeholder => {
                self.local(v)
            }
        }
    }

    fn typed(&self, v: ValueId) -> String {
        format!("{} {}", self.module.value(v).ty, self.value(v))
    }

    fn label(&self, bb: BlockId) -> String {
        match (&self.module.block(bb).name, self.block_slots.get(&bb)) {
            (Some(name), _) => sigil_name('%', name),
            (None, Some(slot)) => format!("%{slot}"),
            (None, None) => format!("%<badref {bb}>"),
        }
    }

    fn print(&self) -> String {
        let module = self.module;
        let func = module.function(self.func);

        let mut s = header_prefix("define", func);
        let mut params: Vec<String> = func.params().iter().map(|&p| self.typed(p)).collect();
        if func.vararg {
            params.push("...".to_string());
        }
        s.push_str(&params.join(", "));
        header_suffix(func, &mut s);
        s.push_str(" {\n");

        for (i, &bb) in func.blocks().iter().enumerate() {
            let label = self.label(bb);
            let label = &label[1..];
            if i > 0 {
                s.push('\n');
                s.push_str(&format!("{label}:\n"));
            } else if module.block(bb).name.is_some() {
                s.push_str(&format!("{label}:\n"));
            }
            for &id in module.block(bb).insts() {
                s.push_str("  ");
                s.push_str(&self.instruction(id));
                s.push('\n');
            }
        }
        s.push_str("}\n");
        s
    }

    fn instruction(&self, id: InstId) -> String {
        let module = self.module;
        let inst = module.inst(id);
        let ops = inst.operands();

        let mut s = String::new();
        if !inst.ty.is_void() {
            s.push_str(&format!("{} = ", self.local(inst.result())));
        }
        s.push_str(inst.opcode.mnemonic());

        match inst.opcode {
            op if op.is_binary() => {
                if inst.flags.nuw {
                    s.push_str(" nuw");
                }
                if inst.flags.nsw {
                    s.push_str(" nsw");
                }
                if inst.flags.exact {
                    s.push_str(" exact");
                }
                s.push_str(&format!(" {}, {}", self.typed(ops[0]), self.value(ops[1])));
            }
            Opcode::ICmp => {
                let pred = inst.predicate.map(|p| p.as_str()).unwrap_or("eq");
                s.push_str(&format!(" {pred} {}, {}", self.typed(ops[0]), self.value(ops[1])));
            }
            Opcode::Select => {
                s.push_str(&format!(
                    " {}, {}, {}",
                    self.typed(ops[0]),
                    self.typed(ops[1]),
                    self.typed(ops[2])
                ));
            }
            Opcode::Phi => {
                let incoming: Vec<String> = ops
                    .iter()
                    .zip(&inst.targets)
                    .map(|(&v, &bb)| format!("[ {}, {} ]", self.value(v), self.label(bb)))
                    .collect();
                s.push_str(&format!(" {} {}", inst.ty, incoming.join(", ")));
            }
            Opcode::Call => {
                let (callee, args) = match ops.split_last() {
                    Some((callee, args)) => (*callee, args),
                    None => return format!("{s} <missing callee>"),
                };
                s.push_str(&format!(" {}", inst.ty));
                // Vararg callees need their function type spelled out.
                if let Some(f) = module.called_function(id) {
                    let callee_fn = module.function(f);
                    if callee_fn.vararg {
                        s.push_str(&format!(" ({})", param_types(module, callee_fn)));
                    }
                }
                let args: Vec<String> = args.iter().map(|&a| self.typed(a)).collect();
                s.push_str(&format!(" {}({})", self.value(callee), args.join(", ")));
            }
            Opcode::Alloca => {
                if let Some(ty) = inst.alloc_ty {
                    s.push_str(&format!(" {ty}"));
                }
            }
            Opcode::Load => {
                s.push_str(&format!(" {}, {}", inst.ty, self.typed(ops[0])));
            }
            Opcode::Store => {
                s.push_str(&format!(" {}, {}", self.typed(ops[0]), self.typed(ops[1])));
            }
            Opcode::Ret => match ops.first() {
                Some(&v) => s.push_str(&format!(" {}", self.typed(v))),
                None => s.push_str(" void"),
            },
            Opcode::Br => match (ops.first(), inst.targets.as_slice()) {
                (Some(&cond), [t, f]) => s.push_str(&format!(
                    " {}, label {}, label {}",
                    self.typed(cond),
                    self.label(*t),
                    self.label(*f)
                )),
                (_, targets) => {
                    for t in targets {
                        s.push_str(&format!(" label {}", self.label(*t)));
                    }
                }
            },
            _ => {}
        }

        if let Some(align) = inst.align {
            s.push_str(&format!(", align {align}"));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FunctionBuilder, Type};
    use crate::parser::parse_module;

    #[test]
    fn renumbers_unnamed_values_after_erase() {
        let mut m = Module::new("m");
        let f = m.add_function("f", Type::I32, &[Type::I32]);
        let mut b = FunctionBuilder::new(&mut m, f);
        b.block(None);
        let x = b.param(0);
        let zero = b.const_int(Type::I32, 0);
        let five = b.const_int(Type::I32, 5);
        let sum = b.add(x, zero);
        let prod = b.mul(sum, five);
        b.ret(Some(prod));

        let before = print_module(&m);
        assert!(before.contains("  %2 = add i32 %0, 0\n"), "{before}");
        assert!(before.contains("  %3 = mul i32 %2, 5\n"), "{before}");

        let add = m.defining_inst(sum).unwrap();
        m.replace_all_uses_with(sum, x);
        m.erase_inst(add);
        let after = print_module(&m);
        assert!(after.contains("  %2 = mul i32 %0, 5\n"), "{after}");
        assert!(after.contains("  ret i32 %2\n"), "{after}");
    }

    #[test]
    fn prints_declarations_and_vararg_calls() {
        let src = "
define i32 @main() {
  %1 = call i32 (ptr, ...) @printf(ptr null, i32 3)
  call void @exit(i32 0)
  ret i32 0
}

declare i32 @printf(ptr, ...)

declare void @exit(i32)
";
        let text = print_module(&parse_module(src).unwrap());
        assert!(text.contains("%1 = call i32 (ptr, ...) @printf(ptr null, i32 3)"), "{text}");
        assert!(text.contains("  call void @exit(i32 0)\n"), "{text}");
        assert!(text.contains("declare i32 @printf(ptr, ...)\n"), "{text}");
        assert!(text.contains("declare void @exit(i32)\n"), "{text}");
    }

    #[test]
    fn reprints_what_it_reads() {
        let src = "; ModuleID = 'loop.c'
source_filename = \"loop.c\"

define dso_local i32 @count(i32 noundef %n) #0 {
entry:
  %p = alloca i32, align 4
  store i32 %n, ptr %p, align 4
  br label %head

head:
  %i = phi i32 [ 0, %entry ], [ %next, %head ]
  %next = add nuw nsw i32 %i, 1
  %done = icmp sge i32 %next, %n
  %pick = select i1 %done, i32 %next, i32 -1
  br i1 %done, label %exit, label %head

exit:
  %v = load i32, ptr %p, align 4
  ret i32 %pick
}
";
        let text = print_module(&parse_module(src).unwrap());
        let expected = src.replace("i32 noundef %n", "i32 %n");
        assert_eq!(text, expected);
    }

    #[test]
    fn reprints_global_definitions_verbatim() {
        let src = r#"; ModuleID = 'hello.c'
target triple = "x86_64-pc-linux-gnu"

@.str = private unnamed_addr constant [13 x i8] c"hello world\0A\00", align 1
@counter = dso_local global i32 0, align 4

define i32 @main() {
  %1 = call i32 (ptr, ...) @printf(ptr @.str)
  store i32 %1, ptr @counter, align 4
  ret i32 0
}

declare i32 @printf(ptr, ...)
"#;
        assert_eq!(print_module(&parse_module(src).unwrap()), src);
    }

    #[test]
    fn quotes_unusual_names() {
        assert_eq!(sigil_name('@', "main"), "@main");
        assert_eq!(sigil_name('%', "odd name"), "%\"odd name\"");
    }
}
