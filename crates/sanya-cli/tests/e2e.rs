//! End-to-end scenarios (§8 "End-to-end scenarios"): compile and run a
//! small program through the actual `sanya` binary and assert on its
//! exit code and stdout, mirroring the shape of the teacher's
//! `crates/test-programs` tests (build something, run it, check the
//! observable result) without any WASI machinery.

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn sanya_bin() -> &'static str {
    env!("CARGO_BIN_EXE_sanya")
}

fn run(source: &str) -> Output {
    let mut child = Command::new(sanya_bin())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn sanya");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(source.as_bytes())
        .unwrap();
    child.wait_with_output().expect("failed to wait on sanya")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).trim_end().to_string()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

#[test]
fn constant_main_prints_the_fixnum() {
    let out = run("(define main (lambda () 42))");
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "42");
}

#[test]
fn primitive_addition() {
    let out = run("(define main (lambda () (+# 1 2)))");
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "3");
}

#[test]
fn deep_tail_recursion_does_not_overflow_the_native_stack() {
    let out = run(
        "(define f (lambda (n) (if (<# n 2) 1 (f (-# n 1)))))\
         (define main (lambda () (f 1000000)))",
    );
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "1");
}

#[test]
fn cons_allocation_survives_many_gc_cycles() {
    let out = run(
        "(define build (lambda (n acc) (if (<# n 1) acc (build (-# n 1) (cons# n acc)))))\
         (define len (lambda (xs n) (if (null?# xs) n (len (cdr# xs) (+# n 1)))))\
         (define main (lambda () (len (build 1000000 (quote ())) 0)))",
    );
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "1000000");
}

#[test]
fn calling_a_non_closure_traps_with_a_diagnostic_and_nonzero_exit() {
    let out = run("(define main (lambda () ((quote not-a-closure))))");
    assert!(!out.status.success());
    let err = stderr(&out);
    assert!(err.contains("Not a closure"), "{err}");
    assert!(err.contains("Stack trace"), "{err}");
}

#[test]
fn arity_mismatch_traps_with_a_diagnostic_and_nonzero_exit() {
    let out = run("(define f (lambda (x) x)) (define main (lambda () (f 1 2)))");
    assert!(!out.status.success());
    let err = stderr(&out);
    assert!(err.contains("Argument count mismatch"), "{err}");
    assert!(err.contains('f'), "{err}");
}

#[test]
fn missing_main_is_a_startup_error() {
    let out = run("(define f (lambda () 1))");
    assert!(!out.status.success());
    assert!(stderr(&out).contains("main"));
}

#[test]
fn explicit_user_error_traps_and_prints_the_payload() {
    let out = run("(define main (lambda () (error# 99)))");
    assert!(!out.status.success());
    let err = stderr(&out);
    assert!(err.contains("User error"), "{err}");
    assert!(err.contains("99"), "{err}");
}

#[test]
fn parse_failure_exits_nonzero() {
    let out = run("(define main");
    assert!(!out.status.success());
    assert!(stderr(&out).contains("parse error"));
}
