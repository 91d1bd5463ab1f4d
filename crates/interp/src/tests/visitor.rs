use ssa::Literal;

use crate::api::{BinOpKind, Event, Recorder, Var};
use crate::tests::{find, load, ABS_SUM};
use crate::{Error, Interpreter, Result};

#[test]
fn binop_reports_operands() -> Result<()> {
    let program = load(ABS_SUM)?;
    let mut interpreter = Interpreter::new(program.clone(), "main");
    let mut api = Recorder::new();

    let t0 = find(&program, "main", "t0");
    let next = interpreter.step(&mut api, t0)?;
    assert_eq!(next, Some(find(&program, "main", "t1")));
    assert_eq!(
        api.take(),
        vec![Event::BinOp {
            register: 0,
            op: BinOpKind::Add,
            lhs: Var::Parameter(0),
            rhs: Var::Parameter(1),
        }]
    );

    interpreter.step(&mut api, find(&program, "main", "t1"))?;
    assert_eq!(
        api.take(),
        vec![Event::BinOp {
            register: 1,
            op: BinOpKind::Gt,
            lhs: Var::Local(0),
            rhs: Var::Const(Literal::Int(0)),
        }]
    );
    Ok(())
}

#[test]
fn branch_reports_both_targets() -> Result<()> {
    let program = load(ABS_SUM)?;
    let mut interpreter = Interpreter::new(program.clone(), "main");
    let mut api = Recorder::new();

    let branch = find(&program, "main", "2");
    let then = find(&program, "main", "3");
    let otherwise = find(&program, "main", "t2");
    let next = interpreter.step(&mut api, branch)?;
    assert_eq!(next, Some(then));
    assert_eq!(api.last_block, Some(0));

    let [Event::If {
        expr,
        positive,
        negative,
    }] = api.events.as_slice()
    else {
        panic!("expected a branch, got {:?}", api.events);
    };
    assert_eq!(*expr, Var::Local(1));
    assert_eq!(interpreter.registry().instruction(*positive)?, then);
    assert_eq!(interpreter.registry().instruction(*negative)?, otherwise);
    Ok(())
}

#[test]
fn return_and_negation() -> Result<()> {
    let program = load(ABS_SUM)?;
    let mut interpreter = Interpreter::new(program.clone(), "main");
    let mut api = Recorder::new();

    let ret = find(&program, "main", "3");
    assert_eq!(interpreter.step(&mut api, ret)?, None);
    assert_eq!(api.take(), vec![Event::Return(Some(Var::Local(0)))]);

    interpreter.step(&mut api, find(&program, "main", "t2"))?;
    assert_eq!(
        api.take(),
        vec![Event::BinOp {
            register: 2,
            op: BinOpKind::Sub,
            lhs: Var::Const(Literal::Int(0)),
            rhs: Var::Local(0),
        }]
    );

    // Stepping never touches the frame stack
    assert!(interpreter.frames().is_empty());
    Ok(())
}

const MISC: &str = r#"
package main

func misc(x int, b bool) int {
0: entry
    t0 = x & 1:int
    t1 = !b
    if t1 goto 1 else 2
1: left
    jump 3
2: right
    jump 3
3: join
    t2 = phi [1: x, 2: t0]
    total = t2 + x
    return total
}
"#;

#[test]
fn unreported_operators() -> Result<()> {
    let program = load(MISC)?;
    let mut interpreter = Interpreter::new(program.clone(), "misc");
    let mut api = Recorder::new();

    interpreter.step(&mut api, find(&program, "misc", "t0"))?;
    assert!(api.take().is_empty());

    interpreter.step(&mut api, find(&program, "misc", "t1"))?;
    assert_eq!(
        api.take(),
        vec![Event::BinOp {
            register: 1,
            op: BinOpKind::Eq,
            lhs: Var::Parameter(1),
            rhs: Var::Const(Literal::Bool(false)),
        }]
    );
    Ok(())
}

#[test]
fn phi_follows_last_block() -> Result<()> {
    let program = load(MISC)?;
    let mut interpreter = Interpreter::new(program.clone(), "misc");
    let phi = find(&program, "misc", "t2");

    let mut api = Recorder::new();
    let left_jump = find(&program, "misc", "3");
    let next = interpreter.step(&mut api, left_jump)?;
    assert_eq!(next, Some(phi));
    assert_eq!(api.last_block, Some(1));
    interpreter.step(&mut api, phi)?;
    assert_eq!(
        api.take(),
        vec![Event::Variable {
            register: 2,
            value: Var::Parameter(0),
        }]
    );

    api.last_block = Some(2);
    interpreter.step(&mut api, phi)?;
    assert_eq!(
        api.take(),
        vec![Event::Variable {
            register: 2,
            value: Var::Local(0),
        }]
    );

    api.last_block = Some(0);
    let err = interpreter.step(&mut api, phi).unwrap_err();
    assert!(matches!(
        err,
        Error::UnknownPredecessor {
            last_block: Some(0),
            block: 3,
        }
    ));
    Ok(())
}

#[test]
fn register_without_number() -> Result<()> {
    let program = load(MISC)?;
    let mut interpreter = Interpreter::new(program.clone(), "misc");
    let mut api = Recorder::new();

    let err = interpreter
        .step(&mut api, find(&program, "misc", "total"))
        .unwrap_err();
    assert!(matches!(err, Error::RegisterName(name) if name == "total"));
    Ok(())
}
