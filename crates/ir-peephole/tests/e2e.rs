//! End-to-end integration tests for ir-peephole.
//!
//! These tests drive the complete pipeline: text → IR → pass → text.

use anyhow::Result;
use ir_peephole::{count_calls_in_source, simplify_source, PeepholeOptions};

/// Helper to run the default pipeline.
fn simplify(source: &str) -> Result<(String, usize)> {
    let (text, stats) = simplify_source(source, &PeepholeOptions::default())?;
    Ok((text, stats.eliminated))
}

#[test]
fn test_add_zero_feeds_mul() -> Result<()> {
    let src = "
define i32 @f(i32 %x) {
  %1 = add i32 %x, 0
  %2 = mul i32 %1, 5
  ret i32 %2
}
";
    let (out, eliminated) = simplify(src)?;

    println!("Simplified module:\n{}", out);

    assert_eq!(eliminated, 1);
    assert_eq!(
        out,
        "define i32 @f(i32 %x) {\n  %1 = mul i32 %x, 5\n  ret i32 %1\n}\n"
    );
    Ok(())
}

#[test]
fn test_mul_one_on_the_left() -> Result<()> {
    let src = "
define i32 @f(i32 %x) {
  %1 = mul i32 1, %x
  %2 = sub i32 %1, %1
  ret i32 %2
}
";
    let (out, eliminated) = simplify(src)?;

    assert_eq!(eliminated, 1);
    assert!(!out.contains("mul"));
    assert!(out.contains("  %1 = sub i32 %x, %x\n"), "{out}");
    Ok(())
}

#[test]
fn test_wide_zero_is_kept() -> Result<()> {
    let src = "
define i64 @f(i64 %x) {
  %1 = add i64 %x, 0
  ret i64 %1
}
";
    let (out, eliminated) = simplify(src)?;

    assert_eq!(eliminated, 0);
    assert!(out.contains("  %1 = add i64 %x, 0\n"), "{out}");
    Ok(())
}

#[test]
fn test_non_identity_constants_are_kept() -> Result<()> {
    let src = "
define i32 @f(i32 %x) {
  %a = add i32 %x, 1
  %b = mul i32 %a, 0
  %c = add i32 2, 3
  %d = sub i32 %b, 0
  %e = add i32 %c, %d
  ret i32 %e
}
";
    let (out, eliminated) = simplify(src)?;

    assert_eq!(eliminated, 0);
    let (reprinted, _) = simplify(&out)?;
    assert_eq!(reprinted, out);
    Ok(())
}

#[test]
fn test_survivors_keep_their_relative_order() -> Result<()> {
    let src = "
define i32 @f(i32 %x, i32 %y) {
entry:
  %a = add i32 %x, 0
  %b = mul i32 %a, %y
  %c = mul i32 1, %b
  %d = xor i32 %c, %x
  %e = add nsw i32 0, %d
  %f = icmp slt i32 %e, %y
  %g = select i1 %f, i32 %e, i32 %y
  ret i32 %g
}
";
    let (out, eliminated) = simplify(src)?;

    assert_eq!(eliminated, 3);
    let expected = "define i32 @f(i32 %x, i32 %y) {
entry:
  %b = mul i32 %x, %y
  %d = xor i32 %b, %x
  %f = icmp slt i32 %d, %y
  %g = select i1 %f, i32 %d, i32 %y
  ret i32 %g
}
";
    assert_eq!(out, expected);
    Ok(())
}

#[test]
fn test_uses_in_other_blocks_are_rewritten() -> Result<()> {
    let src = "
define i32 @f(i32 %x, i1 %c) {
entry:
  %v = mul i32 %x, 1
  br i1 %c, label %then, label %exit

then:
  %w = add i32 %v, 7
  br label %exit

exit:
  %r = phi i32 [ %v, %entry ], [ %w, %then ]
  ret i32 %r
}
";
    let (out, eliminated) = simplify(src)?;

    assert_eq!(eliminated, 1);
    assert!(out.contains("  %w = add i32 %x, 7\n"), "{out}");
    assert!(out.contains("  %r = phi i32 [ %x, %entry ], [ %w, %then ]\n"), "{out}");
    Ok(())
}

#[test]
fn test_output_reads_back_and_is_stable() -> Result<()> {
    let src = "; ModuleID = 'stable.c'
source_filename = \"stable.c\"

define dso_local i32 @main(i32 noundef %0, ptr noundef %1) #0 {
  %3 = alloca i32, align 4
  store i32 %0, ptr %3, align 4
  %4 = load i32, ptr %3, align 4
  %5 = add nsw i32 %4, 0
  %6 = call i32 (ptr, ...) @printf(ptr noundef %1, i32 noundef %5)
  %7 = mul nsw i32 %6, 1
  ret i32 %7
}

declare i32 @printf(ptr noundef, ...) #1

attributes #0 = { noinline nounwind }
attributes #1 = { nounwind }
";
    let (once, first) = simplify(src)?;
    let (twice, second) = simplify(&once)?;

    println!("Simplified module:\n{}", once);

    assert_eq!(first, 2);
    assert_eq!(second, 0);
    assert_eq!(once, twice);
    assert!(once.starts_with("; ModuleID = 'stable.c'\nsource_filename = \"stable.c\"\n"));
    assert!(once.contains("  %5 = call i32 (ptr, ...) @printf(ptr %1, i32 %4)\n"), "{once}");
    assert!(once.contains("  ret i32 %5\n"), "{once}");
    assert!(once.contains("declare i32 @printf(ptr, ...) #1\n"), "{once}");
    Ok(())
}

#[test]
fn test_verify_option_accepts_valid_module() -> Result<()> {
    let src = "
define void @f(i32 %x) {
  %1 = add i32 0, %x
  ret void
}
";
    let options = PeepholeOptions {
        verify: true,
        ..Default::default()
    };
    let (out, stats) = simplify_source(src, &options)?;

    assert_eq!(stats.eliminated, 1);
    assert_eq!(out, "define void @f(i32 %x) {\n  ret void\n}\n");
    Ok(())
}

#[test]
fn test_call_counts() -> Result<()> {
    let src = "; ModuleID = 'calls.c'
define void @main() {
  call void @foo()
  %1 = call i32 @bar(i32 1)
  call void @foo()
  br label %2

2:
  call void @foo()
  ret void
}

declare void @foo()
declare i32 @bar(i32)
";
    let lines = count_calls_in_source(src)?;

    assert_eq!(
        lines,
        vec![
            "The Number of Function Call bar in the Module calls.c is 1",
            "The Number of Function Call foo in the Module calls.c is 3",
        ]
    );
    Ok(())
}

#[test]
fn test_call_counts_report_indirect_calls() -> Result<()> {
    let src = "
define void @main(ptr %fp) {
  call void %fp()
  call void @main(ptr %fp)
  ret void
}
";
    let lines = count_calls_in_source(src)?;

    assert_eq!(
        lines,
        vec![
            "The Number of Function Call main in the Module  is 1",
            "The Number of Indirect Function Call in the Module  is 1",
        ]
    );
    Ok(())
}

#[test]
fn test_call_counts_with_string_literals() -> Result<()> {
    let src = r#"; ModuleID = 'hello.c'
source_filename = "hello.c"
target triple = "x86_64-pc-linux-gnu"

@.str = private unnamed_addr constant [13 x i8] c"hello world\0A\00", align 1
@.str.1 = private unnamed_addr constant [4 x i8] c"%d\0A\00", align 1

; Function Attrs: noinline nounwind optnone uwtable
define dso_local i32 @main() #0 {
  %1 = alloca i32, align 4
  store i32 0, ptr %1, align 4
  %2 = call i32 (ptr, ...) @printf(ptr noundef @.str)
  %3 = add nsw i32 %2, 0
  %4 = call i32 (ptr, ...) @printf(ptr noundef @.str.1, i32 noundef %3)
  ret i32 0
}

declare i32 @printf(ptr noundef, ...) #1

attributes #0 = { noinline nounwind optnone uwtable }
attributes #1 = { "frame-pointer"="all" }

!llvm.module.flags = !{!0}
!0 = !{i32 1, !"wchar_size", i32 4}
"#;
    let lines = count_calls_in_source(src)?;
    assert_eq!(
        lines,
        vec!["The Number of Function Call printf in the Module hello.c is 2"]
    );

    let (out, eliminated) = simplify(src)?;
    assert_eq!(eliminated, 1);
    assert!(
        out.contains("@.str.1 = private unnamed_addr constant [4 x i8] c\"%d\\0A\\00\", align 1\n"),
        "{out}"
    );
    assert!(
        out.contains("  %3 = call i32 (ptr, ...) @printf(ptr @.str.1, i32 %2)\n"),
        "{out}"
    );
    Ok(())
}

#[test]
fn test_long_block_of_identities() -> Result<()> {
    use std::fmt::Write;

    let mut src = String::from("define i32 @f(i32 %x) {\n");
    let mut prev = "%x".to_string();
    for i in 0..20_000 {
        if i % 2 == 0 {
            writeln!(src, "  %v{i} = add i32 {prev}, 0")?;
        } else {
            writeln!(src, "  %v{i} = xor i32 {prev}, %x")?;
        }
        prev = format!("%v{i}");
    }
    writeln!(src, "  ret i32 {prev}\n}}")?;

    let options = PeepholeOptions {
        verify: true,
        ..Default::default()
    };
    let (out, stats) = simplify_source(&src, &options)?;
    assert_eq!(stats.eliminated, 10_000);
    assert!(out.contains("  %v1 = xor i32 %x, %x\n"), "{}", &out[..200]);
    assert!(!out.contains(" add "));
    Ok(())
}

#[test]
fn test_parse_error_reports_line() {
    let src = "define i32 @f(i32 %x) {\n  %1 = add i32 %x, 0\n  %2 = fadd i32 %1, 1\n  ret i32 %2\n}\n";
    let err = simplify(src).unwrap_err();
    let msg = format!("{:#}", err);
    assert!(msg.contains("failed to parse module"), "{msg}");
    assert!(msg.contains("line 3"), "{msg}");
    assert!(msg.contains("unknown opcode 'fadd'"), "{msg}");
}
