mod api;
mod visitor;

use std::rc::Rc;

use ssa::{InstructionId, Program};

use crate::Result;

/// `x := a + b; if x > 0 { return x } else { return -x }`
pub(crate) const ABS_SUM: &str = r#"
package main

func main(a int, b int) int {
0: entry
    t0 = a + b
    t1 = t0 > 0:int
    if t1 goto 1 else 2
1: if.then
    return t0
2: if.else
    t2 = -t0
    return t2
}
"#;

pub(crate) fn load(source: &str) -> Result<Rc<Program>> {
    Ok(Rc::new(ssa::parse(source)?))
}

/// The instruction defining `register` in `function`, or the `index`th instruction of the
/// function when `register` is a number.
pub(crate) fn find(program: &Program, function: &str, register: &str) -> InstructionId {
    let id = program
        .package()
        .func(function)
        .unwrap_or_else(|| panic!("{function} is a member"));
    let mut instructions = program.function(id).instructions();
    match register.parse::<usize>() {
        Ok(index) => instructions.nth(index),
        Err(_) => instructions.find(|&i| program.instruction(i).name() == Some(register)),
    }
    .unwrap_or_else(|| panic!("{function} has instruction {register}"))
}
