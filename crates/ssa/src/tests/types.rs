use crate::tests::SHAPES;
use crate::*;

fn named(program: &Program, name: &str) -> TypeId {
    program
        .types()
        .named(name)
        .unwrap_or_else(|| panic!("{name} is declared"))
}

#[test]
fn interning() {
    let mut types = TypeUniverse::new();
    let int = types.int();
    assert_eq!(types.int(), int);
    assert_eq!(types.pointer(int), types.pointer(int));
    assert_ne!(types.pointer(int), types.chan(int));

    let area = MethodSpec {
        name: "Area".into(),
        signature: Signature {
            params: Vec::new(),
            result: Some(int),
        },
    };
    let perimeter = MethodSpec {
        name: "Perimeter".into(),
        signature: Signature::default(),
    };
    let a = types.interface(vec![area.clone(), perimeter.clone()]);
    let b = types.interface(vec![perimeter, area]);
    assert_eq!(a, b);
    assert_eq!(types.interface(Vec::new()), types.any());
}

#[test]
fn display() {
    let mut types = TypeUniverse::new();
    let int = types.int();
    let ptr = types.pointer(int);
    let chan = types.chan(ptr);
    assert_eq!(types.display(chan).to_string(), "chan *int");
    assert_eq!(types.display(types.any()).to_string(), "interface{}");

    let string = types.string();
    let shape = types.interface(vec![MethodSpec {
        name: "Name".into(),
        signature: Signature {
            params: vec![int],
            result: Some(string),
        },
    }]);
    assert_eq!(types.display(shape).to_string(), "interface { Name(int) string }");
}

#[test]
fn recursive_named_type() {
    let mut types = TypeUniverse::new();
    let t = types.declare_named("T");
    assert!(matches!(types.define_named(t, t), Err(Error::Build(_))));

    let int = types.int();
    types.define_named(t, int).expect("first definition succeeds");
    assert!(matches!(types.define_named(t, int), Err(Error::Build(_))));
    assert_eq!(types.underlying(t), int);
}

#[test]
fn pointer_receivers_only_on_pointers() -> Result<()> {
    let mut program = parse(SHAPES)?;
    let square = named(&program, "Square");
    let circle = named(&program, "Circle");
    let shape = named(&program, "Shape");

    assert!(program.types().method_set(square).is_empty());
    assert!(!program.types().implements(square, shape));
    assert_eq!(program.types().method_set(circle).len(), 1);
    assert!(program.types().implements(circle, shape));

    // Interning `*Square` here requires a mutable universe
    let square_ptr = {
        let types = &mut program.types;
        types.pointer(square)
    };
    let circle_ptr = program.types.pointer(circle);
    let types = program.types();
    assert!(types.implements(square_ptr, shape));
    assert!(types.implements(circle_ptr, shape));
    assert!(types.lookup_method(square_ptr, "Area").is_some());
    assert!(types.lookup_method(square, "Area").is_none());
    Ok(())
}

#[test]
fn signatures_must_match() -> Result<()> {
    let program = parse(SHAPES)?;
    let label = named(&program, "Label");
    let shape = named(&program, "Shape");
    let types = program.types();

    assert_eq!(types.method_set(label).len(), 1);
    assert!(!types.implements(label, shape));
    assert!(!types.assignable_to(label, shape));
    assert!(types.assignable_to(label, types.any()));
    Ok(())
}

#[test]
fn assignability() -> Result<()> {
    let program = parse(SHAPES)?;
    let circle = named(&program, "Circle");
    let shape = named(&program, "Shape");
    let types = program.types();

    assert!(types.assignable_to(circle, circle));
    assert!(types.assignable_to(circle, shape));
    assert!(types.assignable_to(shape, shape));
    assert!(!types.assignable_to(shape, circle));
    assert!(types.is_interface(shape));
    assert!(!types.is_interface(circle));
    Ok(())
}
