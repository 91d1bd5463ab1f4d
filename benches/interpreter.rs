use std::rc::Rc;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use ssa::{CallGraph, Program};
use ssa_interp::api::{Recorder, WordApi};
use ssa_interp::Interpreter;

const SUM: &str = r#"
package main

type Counter interface { Next(n int) int }
type Step struct { by int }

func (s Step) Next(n int) int {
0: entry
    t0 = n + 1:int
    return t0
}

func sum(c Counter, n int) int {
0: entry
    jump 1
1: for.loop
    t0 = phi [0: 0:int, 2: t3]
    t1 = phi [0: 0:int, 2: t4]
    t2 = t1 < n
    if t2 goto 2 else 3
2: for.body
    t3 = t0 + t1
    t4 = invoke c.Next(t1)
    jump 1
3: for.done
    return t0
}

synthetic func run(c Counter) int {
0: entry
    t0 = call sum(c, 1000:int)
    return t0
}

func main() int {
0: entry
    t0 = local Step
    t1 = *t0
    t2 = make Counter <- t1
    t3 = call run(t2)
    return t3
}
"#;

fn program() -> Rc<Program> {
    Rc::new(ssa::parse(SUM).expect("failed to parse benchmark program"))
}

fn setup_interpreter(program: &Rc<Program>) -> (Interpreter, Recorder) {
    let mut interpreter = Interpreter::new(Rc::clone(program), "main");
    let mut api = Recorder::new();
    assert_eq!(interpreter.start(&mut api), 0);
    (interpreter, api)
}

pub fn interpreter(c: &mut Criterion) {
    let program = program();

    c.bench_function("parse", |b| {
        b.iter(|| ssa::parse(SUM).expect("failed to parse program"))
    });

    c.bench_function("call_graph", |b| {
        b.iter(|| {
            let mut graph = CallGraph::cha(&program);
            graph.delete_synthetic_nodes(&program);
            graph
        })
    });

    c.bench_function("frame_step", |b| {
        b.iter_batched(
            || setup_interpreter(&program),
            |(mut interpreter, mut api)| {
                while !interpreter.frame_step(&mut api) {}
                interpreter
            },
            BatchSize::SmallInput,
        )
    });

    let sum = program.package().func("sum").expect("sum is a member");
    let statements: Vec<_> = program.function(sum).instructions().collect();
    c.bench_function("step", |b| {
        b.iter_batched(
            || setup_interpreter(&program).0,
            |mut interpreter| {
                let mut api = WordApi::new(Some(0));
                for &instruction in &statements {
                    interpreter
                        .step(&mut api, instruction)
                        .expect("failed to step instruction");
                }
                api.finish()
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, interpreter);
criterion_main!(benches);
