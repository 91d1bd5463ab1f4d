use crate::tests::SHAPES;
use crate::*;

fn function(program: &Program, name: &str) -> FunctionId {
    program
        .functions()
        .find(|(_, f)| f.name() == name)
        .map(|(id, _)| id)
        .unwrap_or_else(|| panic!("{name} is loaded"))
}

/// The call instruction of `function` that defines `register`.
fn site(program: &Program, function: FunctionId, register: &str) -> InstructionId {
    program
        .function(function)
        .instructions()
        .find(|&id| program.instruction(id).name() == Some(register))
        .unwrap_or_else(|| panic!("{register} is defined"))
}

#[test]
fn invoke_reaches_implementations() -> Result<()> {
    let program = parse(SHAPES)?;
    let graph = CallGraph::cha(&program);

    let area = function(&program, "area");
    let mut callees = graph.callees_at(site(&program, area, "t0"));
    callees.sort();
    assert_eq!(
        callees,
        vec![
            function(&program, "Square.Area"),
            function(&program, "Circle.Area")
        ]
    );

    // Label.Area returns a string so Label is not a Shape
    let label = function(&program, "Label.Area");
    assert!(graph.contains(label));
    assert!(graph.call_sites(label).is_empty());
    Ok(())
}

#[test]
fn static_calls_and_builtins() -> Result<()> {
    let program = parse(SHAPES)?;
    let graph = CallGraph::cha(&program);

    let main = function(&program, "main");
    let wrapper = function(&program, "wrapper");
    let area = function(&program, "area");
    assert_eq!(graph.callees_at(site(&program, main, "t2")), vec![wrapper]);
    assert_eq!(graph.callees_at(site(&program, main, "t6")), vec![area]);

    // println has no node in the graph
    let outgoing = graph.node(main).expect("main is a node").outgoing();
    assert_eq!(outgoing.len(), 2);
    Ok(())
}

#[test]
fn synthetic_nodes_are_bypassed() -> Result<()> {
    let program = parse(SHAPES)?;
    let mut graph = CallGraph::cha(&program);
    graph.delete_synthetic_nodes(&program);

    let main = function(&program, "main");
    let wrapper = function(&program, "wrapper");
    let area = function(&program, "area");
    assert!(!graph.contains(wrapper));
    assert!(graph.edges().all(|e| e.caller != wrapper && e.callee != wrapper));

    let through_wrapper = site(&program, main, "t2");
    assert_eq!(graph.callees_at(through_wrapper), vec![area]);

    let mut sites = graph.call_sites(area);
    sites.sort();
    assert_eq!(sites, vec![through_wrapper, site(&program, main, "t6")]);
    Ok(())
}
