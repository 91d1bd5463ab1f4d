mod callgraph;
mod loader;
mod types;

/// Loads with interfaces, pointer receivers and a synthetic wrapper.
pub(crate) const SHAPES: &str = r#"
package main

type Shape interface { Area() int }
type Square struct { side int }
type Circle struct { radius int }
type Label string

func (s *Square) Area() int {
0: entry
    return 16:int
}

func (c Circle) Area() int {
0: entry
    return 3:int
}

func (l Label) Area() string {
0: entry
    return "none":string
}

func area(s Shape) int {
0: entry
    t0 = invoke s.Area()
    return t0
}

synthetic func wrapper(s Shape) int {
0: entry
    t0 = call area(s)
    return t0
}

func main() {
0: entry
    t0 = local Square
    t1 = make Shape <- t0
    t2 = call wrapper(t1)
    t3 = local Circle
    t4 = *t3
    t5 = make Shape <- t4
    t6 = call area(t5)
    t7 = t2 + t6
    call println(t7)
    return
}
"#;
