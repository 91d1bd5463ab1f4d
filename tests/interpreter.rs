mod common;

use assert_fs::prelude::*;
use assert_fs::TempDir;

use ssa::Literal;
use ssa_interp::api::{method, var_kind, BinOpKind, Event, Recorder, Var, WordApi};
use ssa_interp::registry::Handle;
use ssa_interp::value::Value;
use ssa_interp::{Bridge, Config, Error, Result};

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

fn run(bridge: &mut Bridge, api: &mut Recorder) {
    for _ in 0..10_000 {
        if bridge.frame_step(api) {
            return;
        }
    }
    panic!("program did not terminate");
}

#[test]
fn constant_round_trip() -> Result<()> {
    let mut bridge = common::bridge("constant.ssa")?;
    let mut api = Recorder::new();
    assert_eq!(bridge.start(&mut api), 0);
    assert!(api.events.is_empty());
    run(&mut bridge, &mut api);
    assert_eq!(bridge.result(), Some(&Value::Int(7)));
    Ok(())
}

#[test]
fn stepping_scenario() -> Result<()> {
    let mut bridge = common::bridge("abs_sum.ssa")?;
    let main = bridge.main()?;
    let statements = bridge.statements_of(main)?;
    let [add] = bridge.entry_points(main)?[..] else {
        panic!("expected a single entry point");
    };

    let mut api = Recorder::new();
    let compare = bridge.step(&mut api, add)?;
    assert_eq!(compare, statements[1]);
    assert_eq!(
        api.take(),
        vec![Event::BinOp {
            register: 0,
            op: BinOpKind::Add,
            lhs: Var::Parameter(0),
            rhs: Var::Parameter(1),
        }]
    );

    let branch = bridge.step(&mut api, compare)?;
    assert_eq!(
        api.take(),
        vec![Event::BinOp {
            register: 1,
            op: BinOpKind::Gt,
            lhs: Var::Local(0),
            rhs: Var::Const(Literal::Int(0)),
        }]
    );

    // the branch ends its block, so its lexical successor opens the first target
    let next = bridge.step(&mut api, branch)?;
    assert_eq!(
        api.take(),
        vec![Event::If {
            expr: Var::Local(1),
            positive: statements[3],
            negative: statements[4],
        }]
    );
    assert_eq!(next, statements[3]);
    assert_eq!(api.last_block, Some(0));

    // a return has no lexical successor
    assert_eq!(bridge.step(&mut api, statements[3])?, Handle::NIL);
    assert_eq!(api.take(), vec![Event::Return(Some(Var::Local(0)))]);
    assert_eq!(bridge.step(&mut api, statements[6])?, Handle::NIL);
    Ok(())
}

#[test]
fn stepping_words() -> Result<()> {
    let mut bridge = common::bridge("abs_sum.ssa")?;
    let main = bridge.main()?;
    let statements = bridge.statements_of(main)?;

    let mut api = WordApi::new(None);
    bridge.step(&mut api, statements[5])?;
    assert_eq!(
        api.finish(),
        vec![method::BIN_OP, 8, 2, var_kind::CONST, 0, var_kind::LOCAL, 0, -1]
    );

    let mut api = WordApi::new(Some(3));
    bridge.step(&mut api, statements[6])?;
    assert_eq!(api.finish(), vec![method::RETURN, var_kind::LOCAL, 2, 3]);

    let mut api = WordApi::new(None);
    assert_eq!(bridge.start(&mut api), 0);
    assert_eq!(
        api.finish(),
        vec![
            method::REGISTER_READING,
            0,
            method::REGISTER_READING,
            1,
            -1
        ]
    );
    Ok(())
}

#[test]
fn interface_program() -> Result<()> {
    let mut bridge = common::bridge("shapes.ssa")?;
    let mut api = Recorder::new();
    assert_eq!(bridge.start(&mut api), 0);
    run(&mut bridge, &mut api);

    assert_eq!(bridge.result(), Some(&Value::Unit));
    assert_eq!(bridge.interpreter().exit_code(), None);
    assert_eq!(bridge.interpreter().output(), &["total 19".to_owned()]);

    // running again starts from a clean state
    assert_eq!(bridge.start(&mut api), 0);
    run(&mut bridge, &mut api);
    assert_eq!(bridge.interpreter().output().len(), 1);
    Ok(())
}

#[test]
fn faults_are_recovered() -> TestResult {
    let temp = TempDir::new()?;
    let file = temp.child("exit.ssa");
    file.write_str(
        r#"
package main

func main(n int) {
0: entry
    t0 = n == 0:int
    if t0 goto 1 else 2
1: if.zero
    call exit(4:int)
    return
2: if.nonzero
    panic "unreachable":string
}
"#,
    )?;

    let mut bridge = Bridge::initialize(file.path(), "main", false)?;
    let mut api = Recorder::new();
    assert_eq!(bridge.start(&mut api), 0);
    run(&mut bridge, &mut api);
    assert_eq!(bridge.interpreter().exit_code(), Some(4));
    assert_eq!(bridge.result(), None);
    assert!(bridge.interpreter().is_done());

    temp.close()?;
    Ok(())
}

#[test]
fn initialization_failures() -> TestResult {
    common::initialize_logger();
    let temp = TempDir::new()?;

    let missing = temp.child("missing.ssa");
    assert!(matches!(
        Bridge::initialize(missing.path(), "main", false),
        Err(Error::Load(ssa::Error::Io { .. }))
    ));

    let empty = temp.child("empty.ssa");
    empty.write_str("# nothing here\n")?;
    assert!(matches!(
        Bridge::initialize(empty.path(), "main", false),
        Err(Error::Load(ssa::Error::NoPackage))
    ));

    let library = temp.child("library.ssa");
    library.write_str("package util\n\nfunc f() {\n0: entry\n    return\n}\n")?;
    assert!(matches!(
        Bridge::initialize(library.path(), "f", false),
        Err(Error::Load(ssa::Error::NoMainPackage(name))) if name == "util"
    ));

    let broken = temp.child("broken.ssa");
    broken.write_str("package main\n\nfunc main() {\n0: entry\n    return @\n}\n")?;
    assert!(matches!(
        Bridge::initialize(broken.path(), "main", false),
        Err(Error::Load(ssa::Error::Parse { line: 5, .. }))
    ));

    assert!(matches!(
        Bridge::initialize(common::fixture("constant.ssa"), "start", false),
        Err(Error::EntryNotFound(name)) if name == "start"
    ));

    temp.close()?;
    Ok(())
}

#[test]
fn configuration_file() -> TestResult {
    common::initialize_logger();
    let temp = TempDir::new()?;
    let file = temp.child("session.toml");
    file.write_str("enable_tracing = true\ndump_ssa = true\n")?;

    let config = Config::from_toml(&std::fs::read_to_string(file.path())?)?;
    let program = ssa::load(common::fixture("abs_sum.ssa"))?;
    let mut bridge = Bridge::with_config(program, "main", config)?;
    assert!(!bridge.config().debug_log);

    let mut api = Recorder::new();
    assert_eq!(bridge.start(&mut api), 0);
    run(&mut bridge, &mut api);
    assert_eq!(bridge.result(), Some(&Value::Int(0)));

    temp.close()?;
    Ok(())
}
