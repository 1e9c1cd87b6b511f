//! Call-site counting.
//!
//! Tallies `call` instructions by the name of their statically known
//! callee. Calls through a function pointer have no such name and are
//! counted separately.

use crate::ir::{Module, Opcode};
use std::collections::BTreeMap;

/// Call-site tallies for one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Direct calls per callee name, ordered by name.
    pub by_name: BTreeMap<String, usize>,
    /// Calls whose callee is not a known function.
    pub indirect: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.by_name.values().sum::<usize>() + self.indirect
    }

    /// One report line per callee, sorted by name, followed by an indirect
    /// call line when there were any.
    pub fn report_lines(&self, module_name: &str) -> Vec<String> {
        let mut lines: Vec<String> = self
            .by_name
            .iter()
            .map(|(name, count)| {
                format!("The Number of Function Call {name} in the Module {module_name} is {count}")
            })
            .collect();
        if self.indirect > 0 {
            lines.push(format!(
                "The Number of Indirect Function Call in the Module {module_name} is {}",
                self.indirect
            ));
        }
        lines
    }
}

/// Count every call site in `module`.
pub fn count_calls(module: &Module) -> CallCounts {
    let mut counts = CallCounts::default();
    for (_, func) in module.functions() {
        for &bb in func.blocks() {
            for &id in module.block(bb).insts() {
                if module.inst(id).opcode != Opcode::Call {
                    continue;
                }
                match module.called_function(id) {
                    Some(callee) => {
                        let name = &module.function(callee).name;
                        *counts.by_name.entry(name.clone()).or_insert(0) += 1;
                    }
                    None => counts.indirect += 1,
                }
            }
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FunctionBuilder, Type};

    #[test]
    fn counts_by_callee_regardless_of_order() {
        let mut m = Module::new("calls.c");
        let foo = m.add_function("foo", Type::Void, &[]);
        let bar = m.add_function("bar", Type::I32, &[Type::I32]);
        let main = m.add_function("main", Type::Void, &[]);
        let mut b = FunctionBuilder::new(&mut m, main);
        let entry = b.block(None);
        let exit = b.block(Some("exit"));
        b.call(foo, &[]);
        b.ret(None);
        b.position_at_end(entry);
        let one = b.const_int(Type::I32, 1);
        b.call(foo, &[]);
        b.call(bar, &[one]);
        b.call(foo, &[]);
        b.br(exit);
        m.verify().unwrap();

        let counts = count_calls(&m);
        let expected: BTreeMap<String, usize> =
            [("bar".to_string(), 1), ("foo".to_string(), 3)].into();
        assert_eq!(counts.by_name, expected);
        assert_eq!(counts.indirect, 0);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn indirect_calls_are_tallied_separately() {
        let mut m = Module::new("m");
        let f = m.add_function("f", Type::Void, &[Type::Ptr]);
        let mut b = FunctionBuilder::new(&mut m, f);
        b.block(None);
        let fp = b.param(0);
        b.call_indirect(Type::Void, fp, &[]);
        b.call_indirect(Type::Void, fp, &[]);
        b.ret(None);

        let counts = count_calls(&m);
        assert!(counts.by_name.is_empty());
        assert_eq!(counts.indirect, 2);
        assert_eq!(
            counts.report_lines("m"),
            vec!["The Number of Indirect Function Call in the Module m is 2"]
        );
    }

    #[test]
    fn report_lines_are_sorted_by_name() {
        let counts = CallCounts {
            by_name: [("zeta".to_string(), 2), ("alpha".to_string(), 5)].into(),
            indirect: 0,
        };
        assert_eq!(
            counts.report_lines("prog"),
            vec![
                "The Number of Function Call alpha in the Module prog is 5",
                "The Number of Function Call zeta in the Module prog is 2",
            ]
        );
    }

    #[test]
    fn module_without_calls_reports_nothing() {
        let m = Module::new("empty");
        assert!(count_calls(&m).report_lines("empty").is_empty());
    }
}
