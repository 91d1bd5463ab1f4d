use ssa::Literal;

use crate::api::*;
use crate::registry::Handle;
use crate::tests::{find, load, ABS_SUM};
use crate::{Config, Interpreter, Result};

#[test]
fn empty_record() {
    assert_eq!(WordApi::new(None).finish(), vec![-1, -1]);
    assert_eq!(WordApi::new(Some(4)).finish(), vec![-1, 4]);
}

#[test]
fn operand_encoding() {
    let mut api = WordApi::new(None);
    api.mk_bin_op(
        3,
        BinOpKind::Mod,
        Var::Const(Literal::Bool(true)),
        Var::Const(Literal::Str("s".into())),
    );
    api.mk_variable(4, Var::Parameter(2));
    api.mk_return(None);
    api.mk_int_register_reading("p1", 1);
    api.set_last_block(7);

    assert_eq!(
        api.finish(),
        vec![
            method::BIN_OP, 11, 3, var_kind::CONST, 1, var_kind::ILLEGAL, -1,
            method::VARIABLE, 4, var_kind::PARAMETER, 2,
            method::RETURN, var_kind::ILLEGAL, -1,
            method::REGISTER_READING, 1,
            7,
        ]
    );
}

#[test]
fn stepping_words() -> Result<()> {
    let program = load(ABS_SUM)?;
    let mut interpreter = Interpreter::new(program.clone(), "main");

    let mut api = WordApi::new(None);
    interpreter.step(&mut api, find(&program, "main", "t0"))?;
    assert_eq!(
        api.finish(),
        vec![method::BIN_OP, 7, 0, var_kind::PARAMETER, 0, var_kind::PARAMETER, 1, -1]
    );

    let mut api = WordApi::new(None);
    interpreter.step(&mut api, find(&program, "main", "2"))?;
    let positive = interpreter.registry_mut().handle(find(&program, "main", "3"));
    let negative = interpreter.registry_mut().handle(find(&program, "main", "t2"));
    assert_ne!(positive, Handle::NIL);
    assert_eq!(
        api.finish(),
        vec![method::IF, 1, positive.raw() as i64, negative.raw() as i64, 0]
    );
    Ok(())
}

#[test]
fn reportable_operators() {
    assert_eq!(BinOpKind::from_op(ssa::BinaryOp::Rem), Some(BinOpKind::Mod));
    assert_eq!(BinOpKind::from_op(ssa::BinaryOp::Shl), None);
    assert_eq!(BinOpKind::Eq.code(), 1);
    assert_eq!(BinOpKind::Add.code(), 7);
}

#[test]
fn config_from_toml() -> Result<()> {
    let config = Config::from_toml("dump_ssa = true\n")?;
    assert_eq!(
        config,
        Config {
            dump_ssa: true,
            ..Config::default()
        }
    );
    assert_eq!(Config::from_toml("")?, Config::default());
    assert!(Config::debug().debug_log);
    assert!(!Config::debug().enable_tracing);

    assert!(matches!(
        Config::from_toml("verbose = true"),
        Err(crate::Error::Config(_))
    ));
    Ok(())
}
