//! Pattern matcher: finds tuples of entities analogical to a pattern
//! tuple over a [`Gnosis`] graph. See `spec.md` §4.7.
//!
//! A pattern is a small directed graph of entities (a [`Sequence`]); a
//! match is an assignment of one candidate entity per pattern element
//! such that every edge of the pattern graph holds between the
//! corresponding candidates. Matches are delivered to a callback as
//! they are found; the callback decides whether the search continues.

use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tracing::{info, trace, warn};

use gnosis_codec::Identity;
use gnosis_collections::{Sequence, Signature};
use gnosis_core::{Gnosis, GnosisError};

/// Max number of elements in a pattern.
pub const PATTERN_CAPACITY: usize = 16;

/// Default worker thread count.
pub const DEFAULT_NUMBER_OF_THREADS: usize = 3;

#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub pattern_capacity: usize,
    pub number_of_threads: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            pattern_capacity: PATTERN_CAPACITY,
            number_of_threads: DEFAULT_NUMBER_OF_THREADS,
        }
    }
}

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("pattern has fewer than two elements")]
    PatternTooSmall,
    #[error("pattern too large: {size}; limit: {limit}")]
    PatternTooLarge { size: usize, limit: usize },
    #[error("mask contains a pattern element")]
    MaskOverlapsPattern,
    #[error(transparent)]
    Gnosis(#[from] GnosisError),
}

pub type Result<T> = std::result::Result<T, MatchError>;

struct Node {
    global: Identity,
    candidates: Vec<Identity>,
    complexity: f64,
}

#[derive(Clone, Copy)]
struct Edge {
    from: usize,
    into: usize,
    rc: f64,
}

enum Instruction {
    Stop,
    Init,
    Node { node: usize, jump: usize },
    Edge { from: usize, into: usize, jump: usize },
    Call { jump: usize },
}

/// Searches for entity tuples analogical to `pattern`, excluding any
/// sign in `mask` from consideration. `f` is invoked with each match;
/// returning `false` stops the search early (within the calling
/// thread). Returns `Ok(false)` without searching if the pattern graph
/// is disconnected or any pattern element has no candidates.
pub fn analogic<F>(
    gnosis: &Gnosis,
    pattern: &[Identity],
    mask: &Signature,
    f: F,
    config: &MatchConfig,
) -> Result<bool>
where
    F: Fn(&Sequence) -> bool + Sync,
{
    let n = pattern.len();
    if n < 2 {
        return Err(MatchError::PatternTooSmall);
    }
    if n > config.pattern_capacity {
        return Err(MatchError::PatternTooLarge {
            size: n,
            limit: config.pattern_capacity,
        });
    }
    for &p in pattern {
        if mask.contains(p) {
            return Err(MatchError::MaskOverlapsPattern);
        }
    }

    // External syndrome of each pattern element, used first to build the
    // pattern's own adjacency matrix, then pared down into a selection
    // syndrome for candidate search.
    let external: Vec<Signature> = pattern.iter().map(|&id| gnosis.signature(id)).collect();

    let adjacency: Vec<Vec<bool>> = (0..n)
        .map(|i| (0..n).map(|j| external[i].contains(pattern[j])).collect())
        .collect();

    let mut selection: Vec<Signature> = external;
    for i in 0..n {
        for sign in mask.iter() {
            selection[i].remove(sign);
        }
        for &p in pattern {
            selection[i].remove(p);
        }
    }

    if !is_connected(&adjacency, n) {
        warn!("pattern graph is not fully connected");
        return Ok(false);
    }

    let mut node: Vec<Node> = pattern
        .iter()
        .map(|&global| Node {
            global,
            candidates: Vec::new(),
            complexity: 0.0,
        })
        .collect();

    let refs: Vec<&Signature> = selection.iter().collect();
    gnosis.select(&refs, |i, id| {
        if id != node[i].global && !gnosis.signature(id).is_empty() {
            node[i].candidates.push(id);
        }
    })?;

    // A pattern element that relates to itself can only be matched by a
    // candidate that also relates to itself.
    for i in 0..n {
        if gnosis.is(pattern[i], pattern[i]) {
            let before = node[i].candidates.len();
            node[i].candidates.retain(|&c| gnosis.is(c, c));
            trace!(element = i, before, after = node[i].candidates.len(), "self-loop reduction");
        }
    }

    for n_i in node.iter_mut() {
        n_i.complexity = (n_i.candidates.len() as f64).log10();
    }

    if let Some(i) = node.iter().position(|n_i| n_i.candidates.is_empty()) {
        warn!(element = i, "no candidates for pattern element");
        return Ok(false);
    }

    let mut edges = Vec::new();
    for i in 0..n {
        for j in 0..n {
            if !adjacency[i][j] {
                continue;
            }
            let rc: f64 = (0..n)
                .filter(|&p| p != i && p != j)
                .map(|p| node[p].complexity)
                .sum();
            edges.push(Edge { from: i, into: j, rc });
        }
    }
    // Stable sort: ties keep ascending discovery order, matching the
    // order edges were pushed above.
    edges.sort_by(|a, b| b.rc.partial_cmp(&a.rc).unwrap());

    let complexity: Vec<f64> = node.iter().map(|n_i| n_i.complexity).collect();
    let code = compile(&edges, &complexity, n);
    info!(instructions = code.len(), pattern_size = n, "pattern compiled");

    let outer_node = match code.get(2) {
        Some(Instruction::Node { node, .. }) => *node,
        _ => unreachable!("code always opens with STOP, INIT, NODE"),
    };

    let total_tests = AtomicUsize::new(0);
    let threads = if config.number_of_threads == 0 {
        1
    } else {
        config.number_of_threads
    };

    let run = |nt: usize, t: usize| {
        interpret(gnosis, &code, &node, outer_node, nt, t, &f, &total_tests);
    };

    if threads == 1 {
        run(1, 0);
    } else {
        std::thread::scope(|scope| {
            for t in 0..threads {
                let run = &run;
                scope.spawn(move || run(threads, t));
            }
        });
    }

    info!(tests = total_tests.load(Ordering::Relaxed), "pattern search finished");
    Ok(true)
}

fn is_connected(adjacency: &[Vec<bool>], n: usize) -> bool {
    let mut visited = vec![false; n];
    let mut stack = vec![0usize];
    visited[0] = true;
    while let Some(u) = stack.pop() {
        for v in 0..n {
            if (adjacency[u][v] || adjacency[v][u]) && !visited[v] {
                visited[v] = true;
                stack.push(v);
            }
        }
    }
    visited.into_iter().all(|v| v)
}

/// Builds the instruction sequence that enumerates assignments of
/// candidates to nodes consistent with every pattern edge, starting
/// from the edge with the largest residual complexity.
fn compile(edges: &[Edge], complexity: &[f64], n: usize) -> Vec<Instruction> {
    let mut assigned = vec![false; n];
    let mut tested = vec![false; edges.len()];

    let seed = edges[0];
    assigned[seed.from] = true;
    assigned[seed.into] = true;
    tested[0] = true;

    let mut code = vec![Instruction::Stop, Instruction::Init];
    let mut jump = 1usize;
    code.push(Instruction::Node { node: seed.from, jump });
    jump = code.len() - 1;
    code.push(Instruction::Node { node: seed.into, jump });
    jump = code.len() - 1;

    for (i, edge) in edges.iter().enumerate() {
        if assigned[edge.from] && assigned[edge.into] {
            code.push(Instruction::Edge {
                from: edge.from,
                into: edge.into,
                jump,
            });
            tested[i] = true;
        }
    }

    loop {
        let remaining: f64 = (0..n).filter(|&i| !assigned[i]).map(|i| complexity[i]).sum();

        // Candidate next edges: exactly one endpoint already assigned.
        // Scored by the complexity that would remain unassigned after
        // following this edge — lower is better, so later nodes are
        // chosen from ever-shrinking candidate pools.
        let mut candidates: Vec<(usize, f64)> = Vec::new();
        for (i, edge) in edges.iter().enumerate() {
            if tested[i] {
                continue;
            }
            let from_in = assigned[edge.from];
            let into_in = assigned[edge.into];
            if from_in == into_in {
                continue;
            }
            let unassigned_node = if from_in { edge.into } else { edge.from };
            candidates.push((i, remaining - complexity[unassigned_node]));
        }
        if candidates.is_empty() {
            break;
        }
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

        let (best_idx, _) = candidates[0];
        let best_edge = edges[best_idx];
        let next_node = if assigned[best_edge.from] { best_edge.into } else { best_edge.from };

        code.push(Instruction::Node { node: next_node, jump });
        jump = code.len() - 1;
        assigned[next_node] = true;

        for &(i, _) in &candidates {
            let edge = edges[i];
            if assigned[edge.from] && assigned[edge.into] {
                tested[i] = true;
                code.push(Instruction::Edge {
                    from: edge.from,
                    into: edge.into,
                    jump,
                });
            }
        }
    }

    code.push(Instruction::Call { jump });
    code
}

/// One worker's traversal of `code`. `t`/`nt` stride the outer node's
/// candidate list so each thread explores a disjoint slice of the
/// search space.
#[allow(clippy::too_many_arguments)]
fn interpret<F>(
    gnosis: &Gnosis,
    code: &[Instruction],
    node: &[Node],
    outer_node: usize,
    nt: usize,
    t: usize,
    f: &F,
    total_tests: &AtomicUsize,
) where
    F: Fn(&Sequence) -> bool + Sync,
{
    const EXIT: usize = 0;
    const OUTER: usize = 2;

    let n = node.len();
    let mut det = vec![false; n];
    let mut num: Vec<isize> = (0..n)
        .map(|i| if i == outer_node { t as isize - 1 } else { -1 })
        .collect();
    let len: Vec<usize> = node.iter().map(|n_i| n_i.candidates.len()).collect();
    let mut var: Vec<Identity> = vec![0; n];

    let mut o = 1usize; // START: the INIT instruction

    loop {
        match &code[o] {
            Instruction::Stop => break,
            Instruction::Init => {
                det.iter_mut().for_each(|d| *d = false);
                o += 1;
            }
            Instruction::Node { node: cursor, jump } => {
                let mut complete;
                loop {
                    if *cursor == outer_node {
                        num[*cursor] += nt as isize;
                    } else {
                        num[*cursor] += 1;
                    }
                    if num[*cursor] >= len[*cursor] as isize {
                        complete = true;
                        break;
                    }
                    var[*cursor] = node[*cursor].candidates[num[*cursor] as usize];
                    let twin = (0..n).any(|k| k != *cursor && det[k] && var[k] == var[*cursor]);
                    if !twin {
                        complete = false;
                        break;
                    }
                }
                if complete {
                    if o == OUTER {
                        o = EXIT;
                    } else {
                        det[*cursor] = false;
                        num[*cursor] = -1;
                        o = *jump;
                    }
                } else {
                    det[*cursor] = true;
                    o += 1;
                }
            }
            Instruction::Edge { from, into, jump } => {
                total_tests.fetch_add(1, Ordering::Relaxed);
                if gnosis.is(var[*from], var[*into]) {
                    o += 1;
                } else {
                    o = *jump;
                }
            }
            Instruction::Call { jump } => {
                let mut q = Sequence::new();
                for &v in &var {
                    q.append(v);
                }
                if f(&q) {
                    o = *jump;
                } else {
                    o = EXIT;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gnosis_core::CoreConfig;

    fn small_gnosis() -> Gnosis {
        Gnosis::new(
            "match-test",
            CoreConfig {
                number_of_segments: 2,
                capacity_of_segment: 1024,
                ..CoreConfig::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn rejects_single_element_pattern() {
        let g = small_gnosis();
        let a = g.entity().unwrap();
        let err = analogic(&g, &[a], &Signature::new(), |_| true, &MatchConfig::default());
        assert!(matches!(err, Err(MatchError::PatternTooSmall)));
    }

    #[test]
    fn rejects_mask_overlapping_pattern() {
        let g = small_gnosis();
        let a = g.entity().unwrap();
        let b = g.entity().unwrap();
        let mut mask = Signature::new();
        mask.insert(a).unwrap();
        let err = analogic(&g, &[a, b], &mask, |_| true, &MatchConfig::default());
        assert!(matches!(err, Err(MatchError::MaskOverlapsPattern)));
    }

    #[test]
    fn disconnected_pattern_reports_false_without_search() {
        let g = small_gnosis();
        let a = g.entity().unwrap();
        let b = g.entity().unwrap();
        let ok = analogic(&g, &[a, b], &Signature::new(), |_| true, &MatchConfig::default()).unwrap();
        assert!(!ok);
    }

    #[test]
    fn finds_matching_pair_related_the_same_way_as_the_pattern() {
        let g = small_gnosis();
        let rel = g.entity().unwrap();
        let a = g.entity().unwrap();
        g.incl(a, rel).unwrap();

        let z = g.entity().unwrap();
        let x = g.entity().unwrap();
        let y = g.entity().unwrap();
        g.incl(x, y).unwrap();
        g.incl(y, z).unwrap();

        let found = std::sync::Mutex::new(Vec::new());
        let ok = analogic(
            &g,
            &[a, rel],
            &Signature::new(),
            |q| {
                found.lock().unwrap().push((q.get(0).unwrap(), q.get(1).unwrap()));
                true
            },
            &MatchConfig {
                pattern_capacity: PATTERN_CAPACITY,
                number_of_threads: 1,
            },
        )
        .unwrap();
        assert!(ok);
        let matches = found.lock().unwrap();
        assert!(matches.iter().any(|&(p, q)| p == x && q == y));
    }
}
