/*!
Pluggable strongly-connected-component computation over an
[`ImplicationGraph`], abstracting the third-party SCC library the spec
leaves out of scope (`spec.md` §4.5's `ComputeSCC` interface).

Two implementations are provided, selected once per IGR call: [`TarjanScc`]
(the textbook iterative algorithm) and [`UnionFindScc`] (Kosaraju's two-pass
algorithm, using a union-find structure to merge each discovered component
rather than building explicit component vectors).

Both return a representative-literal array indexed by [`Lit::index`], with
duality enforced afterward: `scc[flip(l)]` is forced to `flip(scc[l])`
regardless of what either algorithm computed independently for the flipped
side, since the underlying graph is self-dual by construction and numerical
choice of representative (lowest literal index visited) need not respect
that symmetry on its own.
*/
use crate::structures::literal::{Lit, FIRST_LIT_INDEX};

use super::ImplicationGraph;

/// An SCC algorithm over the binary implication graph: for every literal,
/// returns the representative literal of its strongly-connected component.
pub trait ComputeScc {
    fn compute(&self, graph: &ImplicationGraph) -> Vec<Lit>;
}

/// Resolves a reduced node's live children/parents for algorithms that only
/// want to see active literals, and ignores already-folded nodes (they keep
/// whatever representative they were folded to and are skipped during the
/// component search).
fn live_children(graph: &ImplicationGraph, lit: Lit) -> Vec<Lit> {
    graph
        .node(lit)
        .read()
        .children
        .iter()
        .map(|&(l, _)| graph.resolve(l))
        .collect()
}

fn live_parents(graph: &ImplicationGraph, lit: Lit) -> Vec<Lit> {
    graph
        .node(lit)
        .read()
        .parents
        .iter()
        .map(|&(l, _)| graph.resolve(l))
        .collect()
}

fn enforce_duality(graph: &ImplicationGraph, mut raw: Vec<Lit>) -> Vec<Lit> {
    let mut finalized = vec![false; raw.len()];
    for lit in graph.literals() {
        let idx = lit.index();
        if finalized[idx] {
            continue;
        }
        let rep = raw[idx];
        raw[idx] = rep;
        raw[lit.flip().index()] = rep.flip();
        finalized[idx] = true;
        finalized[lit.flip().index()] = true;
    }
    raw
}

/// The textbook iterative Tarjan's algorithm, run over the `children`
/// adjacency. Iterative (rather than recursive) so a long implication chain
/// cannot overflow the call stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarjanScc;

impl ComputeScc for TarjanScc {
    fn compute(&self, graph: &ImplicationGraph) -> Vec<Lit> {
        let bound = 2 * graph.max_var() as usize + 2;
        let mut index = vec![None; bound];
        let mut lowlink = vec![0u32; bound];
        let mut on_stack = vec![false; bound];
        let mut scc_stack = Vec::new();
        let mut raw = vec![Lit::from_index(0); bound];
        let mut next_index = 0u32;

        // Explicit work-stack frame: the literal being visited, its resolved
        // children, and how far through them we've iterated.
        struct Frame {
            lit: Lit,
            children: Vec<Lit>,
            pos: usize,
        }

        for start in FIRST_LIT_INDEX..bound {
            let start_lit = Lit::from_index(start);
            if graph.node(start_lit).read().reduced || index[start].is_some() {
                continue;
            }

            let mut work: Vec<Frame> = vec![Frame {
                lit: start_lit,
                children: live_children(graph, start_lit),
                pos: 0,
            }];
            index[start] = Some(next_index);
            lowlink[start] = next_index;
            next_index += 1;
            scc_stack.push(start_lit);
            on_stack[start] = true;

            while let Some(frame) = work.last_mut() {
                let v = frame.lit.index();
                if frame.pos < frame.children.len() {
                    let w = frame.children[frame.pos];
                    frame.pos += 1;
                    let wi = w.index();
                    if index[wi].is_none() {
                        index[wi] = Some(next_index);
                        lowlink[wi] = next_index;
                        next_index += 1;
                        scc_stack.push(w);
                        on_stack[wi] = true;
                        work.push(Frame {
                            lit: w,
                            children: live_children(graph, w),
                            pos: 0,
                        });
                    } else if on_stack[wi] {
                        lowlink[v] = lowlink[v].min(index[wi].unwrap());
                    }
                } else {
                    let finished = frame.lit;
                    let fi = finished.index();
                    work.pop();
                    if let Some(parent) = work.last() {
                        let pi = parent.lit.index();
                        lowlink[pi] = lowlink[pi].min(lowlink[fi]);
                    }
                    if lowlink[fi] == index[fi].unwrap() {
                        let mut members = Vec::new();
                        loop {
                            let member = scc_stack.pop().unwrap();
                            on_stack[member.index()] = false;
                            members.push(member);
                            if member == finished {
                                break;
                            }
                        }
                        let rep = *members.iter().min().unwrap();
                        for m in members {
                            raw[m.index()] = rep;
                        }
                    }
                }
            }
        }

        for lit in graph.literals() {
            if graph.node(lit).read().reduced {
                raw[lit.index()] = lit;
            }
        }

        enforce_duality(graph, raw)
    }
}

/// Kosaraju's algorithm: a finish-order DFS over `children`, then a second
/// DFS over `parents` (the graph's reverse edges are already stored
/// natively) in reverse finish order, merging each discovered component with
/// a union-find structure instead of collecting explicit member lists.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnionFindScc;

struct Dsu {
    parent: Vec<u32>,
}

impl Dsu {
    fn new(n: usize) -> Self {
        Dsu {
            parent: (0..n as u32).collect(),
        }
    }

    fn find(&mut self, x: u32) -> u32 {
        if self.parent[x as usize] != x {
            let root = self.find(self.parent[x as usize]);
            self.parent[x as usize] = root;
        }
        self.parent[x as usize]
    }

    fn union(&mut self, a: u32, b: u32) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            // Keep the lower index as root, for a deterministic representative.
            if ra < rb {
                self.parent[rb as usize] = ra;
            } else {
                self.parent[ra as usize] = rb;
            }
        }
    }
}

impl ComputeScc for UnionFindScc {
    fn compute(&self, graph: &ImplicationGraph) -> Vec<Lit> {
        let bound = 2 * graph.max_var() as usize + 2;
        let mut visited = vec![false; bound];
        let mut finish_order = Vec::with_capacity(bound);

        for start in FIRST_LIT_INDEX..bound {
            let start_lit = Lit::from_index(start);
            if visited[start] || graph.node(start_lit).read().reduced {
                continue;
            }
            let mut stack: Vec<(Lit, usize, Vec<Lit>)> =
                vec![(start_lit, 0, live_children(graph, start_lit))];
            visited[start] = true;
            while let Some((lit, pos, children)) = stack.last_mut() {
                if *pos < children.len() {
                    let w = children[*pos];
                    *pos += 1;
                    if !visited[w.index()] {
                        visited[w.index()] = true;
                        let wc = live_children(graph, w);
                        stack.push((w, 0, wc));
                    }
                } else {
                    finish_order.push(*lit);
                    stack.pop();
                }
            }
        }

        let mut dsu = Dsu::new(bound);
        let mut visited2 = vec![false; bound];
        for &lit in finish_order.iter().rev() {
            if visited2[lit.index()] {
                continue;
            }
            let mut stack = vec![lit];
            visited2[lit.index()] = true;
            while let Some(cur) = stack.pop() {
                dsu.union(lit.index() as u32, cur.index() as u32);
                for p in live_parents(graph, cur) {
                    if !visited2[p.index()] {
                        visited2[p.index()] = true;
                        stack.push(p);
                    }
                }
            }
        }

        let mut raw = vec![Lit::from_index(0); bound];
        for lit in graph.literals() {
            if graph.node(lit).read().reduced {
                raw[lit.index()] = lit;
                continue;
            }
            let root = dsu.find(lit.index() as u32);
            raw[lit.index()] = Lit::from_index(root as usize);
        }

        enforce_duality(graph, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagate::Propagator;
    use crate::structures::clause::ClauseId;

    fn triangle() -> ImplicationGraph {
        let g = ImplicationGraph::new(3);
        let a = Lit::pos(1);
        let b = Lit::pos(2);
        let c = Lit::pos(3);
        g.build([
            (a.flip(), b, ClauseId(0)),
            (b.flip(), a, ClauseId(1)),
            (a.flip(), c, ClauseId(2)),
            (c.flip(), a, ClauseId(3)),
        ]);
        g
    }

    #[test]
    fn tarjan_and_union_find_agree_on_component_membership() {
        let g = triangle();
        let tarjan = TarjanScc.compute(&g);
        let uf = UnionFindScc.compute(&g);

        let a = Lit::pos(1);
        let b = Lit::pos(2);
        let c = Lit::pos(3);
        assert_eq!(tarjan[a.index()], tarjan[b.index()]);
        assert_eq!(tarjan[a.index()], tarjan[c.index()]);
        assert_eq!(uf[a.index()], uf[b.index()]);
        assert_eq!(uf[a.index()], uf[c.index()]);
    }

    #[test]
    fn duality_is_enforced_on_the_output() {
        let g = triangle();
        for algo in [&TarjanScc as &dyn ComputeScc, &UnionFindScc as &dyn ComputeScc] {
            let scc = algo.compute(&g);
            for lit in g.literals() {
                assert_eq!(scc[lit.flip().index()], scc[lit.index()].flip());
            }
        }
    }

    #[test]
    fn singleton_literals_are_their_own_representative() {
        let g = ImplicationGraph::new(2);
        let prop = Propagator::new(2);
        let _ = &prop;
        let scc = TarjanScc.compute(&g);
        for lit in g.literals() {
            assert_eq!(scc[lit.index()], lit);
        }
    }
}
