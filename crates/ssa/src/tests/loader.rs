use crate::tests::SHAPES;
use crate::*;

const MAX2: &str = r#"
package main

# Returns the larger argument
func max2(x int, y int) int {
0: entry
    t0 = x > y
    if t0 goto 1 else 2
1: if.then
    return x
2: if.else
    return y
}
"#;

const SUM: &str = r#"
package main

func sum(n int) int {
0: entry
    jump 1
1: for.loop
    t0 = phi [2: t3, 0: 0:int]
    t1 = phi [0: 0:int, 2: t4]
    t2 = t1 < n
    if t2 goto 2 else 3
2: for.body
    t3 = t0 + t1
    t4 = t1 + 1:int
    jump 1
3: for.done
    return t0
}
"#;

fn build_error(source: &str) -> String {
    match parse(source) {
        Err(Error::Build(message)) => message,
        other => panic!("expected build error, got {other:?}"),
    }
}

fn parse_error_line(source: &str) -> usize {
    match parse(source) {
        Err(Error::Parse { line, .. }) => line,
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn max2_blocks() -> Result<()> {
    let program = parse(MAX2)?;
    assert!(program.main_package().is_some());

    let id = program.package().func("max2").expect("max2 is a member");
    let function = program.function(id);
    assert_eq!(function.params().len(), 2);
    assert_eq!(function.blocks().len(), 3);

    let entry = &function.blocks()[0];
    assert_eq!(entry.comment(), Some("entry"));
    assert_eq!(entry.succs(), &[1, 2]);
    assert!(entry.preds().is_empty());
    assert_eq!(function.blocks()[1].preds(), &[0]);
    assert_eq!(function.blocks()[2].comment(), Some("if.else"));

    let t0 = program.instruction(entry.instructions()[0]);
    let register = t0.register.as_ref().expect("t0 defines a register");
    assert_eq!(register.number(), Some(0));
    assert_eq!(program.types().basic_kind(register.ty), Some(BasicKind::Bool));
    assert_eq!(
        t0.kind,
        InstructionKind::BinOp {
            op: BinaryOp::Gt,
            x: Operand::Parameter(0),
            y: Operand::Parameter(1),
        }
    );
    Ok(())
}

#[test]
fn phi_edges_follow_predecessors() -> Result<()> {
    let program = parse(SUM)?;
    let id = program.package().func("sum").expect("sum is a member");
    let function = program.function(id);
    let header = &function.blocks()[1];
    assert_eq!(header.preds(), &[0, 2]);

    let t0 = program.instruction(header.instructions()[0]);
    let InstructionKind::Phi { edges } = &t0.kind else {
        panic!("expected phi, got {:?}", t0.kind);
    };
    assert!(matches!(edges[0], Operand::Const(_)));
    let t3 = function.blocks()[2].instructions()[0];
    assert_eq!(edges[1], Operand::Register(t3));

    // Both phis are typed through their constant edges
    for &instruction in &header.instructions()[..2] {
        let ty = program.instruction(instruction).register.as_ref().map(|r| r.ty);
        assert_eq!(ty.and_then(|ty| program.types().basic_kind(ty)), Some(BasicKind::Int));
    }
    Ok(())
}

#[test]
fn methods_are_not_members() -> Result<()> {
    let program = parse(SHAPES)?;
    assert!(program.package().func("Area").is_none());
    assert!(program.package().func("Square.Area").is_none());

    let (id, method) = program
        .functions()
        .find(|(_, f)| f.name() == "Square.Area")
        .expect("method is loaded");
    let square = program.types().named("Square").expect("Square is declared");
    assert_eq!(method.receiver(), Some(square));
    assert_eq!(method.params()[0].name, "s");
    assert_eq!(program.types().pointer_elem(method.params()[0].ty), Some(square));
    assert_eq!(program.lookup_method(square, "Area"), None);

    let wrapper = program.package().func("wrapper").expect("wrapper is a member");
    assert_eq!(program.function(wrapper).synthetic(), Some("synthetic"));
    assert!(program.function(id).synthetic().is_none());
    Ok(())
}

#[test]
fn init_is_synthetic() -> Result<()> {
    let program = parse("package main\nfunc init() {\n0: entry\n    return\n}\n")?;
    let init = program.package().func("init").expect("init is a member");
    assert_eq!(program.function(init).synthetic(), Some("package initializer"));
    Ok(())
}

#[test]
fn external_function() -> Result<()> {
    let program = parse("package lib\nfunc helper(x int) int\n")?;
    assert!(program.main_package().is_none());
    let helper = program.package().func("helper").expect("helper is a member");
    assert!(program.function(helper).is_external());
    Ok(())
}

#[test]
fn display_reparses() -> Result<()> {
    for source in [MAX2, SUM, SHAPES] {
        let listing = parse(source)?.display().to_string();
        let reparsed = parse(&listing)?.display().to_string();
        assert_eq!(listing, reparsed);
    }
    Ok(())
}

#[test]
fn negative_constants() -> Result<()> {
    let program =
        parse("package main\nfunc f() int {\n0:\n    t0 = -5:int - -2:int\n    return t0\n}\n")?;
    let f = program.package().func("f").expect("f is a member");
    let t0 = program.function(f).blocks()[0].instructions()[0];
    let InstructionKind::BinOp { x, y, .. } = &program.instruction(t0).kind else {
        panic!("expected binop");
    };
    let int = |operand: &Operand| match operand {
        Operand::Const(Constant {
            value: Literal::Int(value),
            ..
        }) => *value,
        other => panic!("expected constant, got {other:?}"),
    };
    assert_eq!((int(x), int(y)), (-5, -2));
    Ok(())
}

#[test]
fn missing_package() {
    assert!(matches!(parse(""), Err(Error::NoPackage)));
    assert!(matches!(parse("\n# nothing\n"), Err(Error::NoPackage)));
}

#[test]
fn syntax_errors_report_line() {
    assert_eq!(parse_error_line("package main\nfunc f( {\n"), 2);
    assert_eq!(parse_error_line("package main\n\nfunc f() {\n1: entry\n    return\n}\n"), 4);
    assert_eq!(parse_error_line("package main\n$\n"), 2);
    assert_eq!(parse_error_line("package main\nfunc f() {\n0:\n    t0 = 1:int ? 2:int\n}\n"), 4);
}

#[test]
fn invalid_programs() {
    let message = build_error("package main\nfunc f() int {\n0:\n    return t9\n}\n");
    assert!(message.contains("undefined value t9"), "{message}");

    let message = build_error("package main\nfunc f() {\n0:\n    t0 = 1:int + 2:int\n}\n");
    assert!(message.contains("does not end in a control instruction"), "{message}");

    let message = build_error("package main\nfunc f() {\n0:\n    jump 4\n}\n");
    assert!(message.contains("missing block 4"), "{message}");

    let message = build_error("package main\nfunc f(x Missing) {\n0:\n    return\n}\n");
    assert!(message.contains("undefined type Missing"), "{message}");

    let message =
        build_error("package main\nfunc f() {\n0:\n    t0 = call println(1:int)\n    return\n}\n");
    assert!(message.contains("has no result"), "{message}");

    let message = build_error("package main\nfunc f() {\n0:\n    jump 1\n1: empty\n}\n");
    assert!(message.contains("block 1 is empty"), "{message}");

    let message = build_error(
        r#"
package main

func add(a int, b int) int {
0: entry
    t0 = a + b
    return t0
}

func main() int {
0: entry
    t0 = call add(1:int)
    return t0
}
"#,
    );
    assert!(message.contains("add expects 2 arguments, got 1"), "{message}");

    let message = build_error(
        r#"
package main

type Shape interface { Area() int }
type Circle struct { radius int }

func (c Circle) Area() int {
0: entry
    return 3:int
}

func main(c Circle) int {
0: entry
    t0 = invoke c.Area()
    return t0
}
"#,
    );
    assert!(message.contains("non-interface type Circle"), "{message}");

    let message = build_error(
        r#"
package main

type Shape interface { Area() int }

func main(s Shape) {
0: entry
    invoke s.Area(1:int)
    return
}
"#,
    );
    assert!(message.contains("Area expects 0 arguments, got 1"), "{message}");
}
