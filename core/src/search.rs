use log::{debug, trace};

use crate::callback::SearchCallback;
use crate::edge::Edge;
use crate::error::SearchResult;
use crate::name::TableSet;

/// Pending edges of one table on the traversal stack.
struct Frame {
    edges: std::vec::IntoIter<Edge>,
}

/// Depth-first closure over the edges a callback reports.
///
/// Seeds are processed in order; each unvisited seed starts a pre-order walk
/// that descends into every accepted, unvisited edge target before moving on
/// to the next edge. The result lists each table once, in first-discovery
/// order. Seeds are not passed through `accepts`.
///
/// The walk keeps its own frame stack instead of recursing, so schema depth
/// never bounds the host stack. Any callback error aborts the search.
pub fn depth_first_search<C, I, S>(start_nodes: I, callback: &mut C) -> SearchResult<TableSet>
where
    C: SearchCallback + ?Sized,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut visited = TableSet::new(callback.case_sensitivity());

    for seed in start_nodes {
        let seed = seed.as_ref();
        if visited.contains(seed) {
            continue;
        }
        walk(seed, callback, &mut visited)?;
    }

    debug!("search complete: {} table(s)", visited.len());
    Ok(visited)
}

fn walk<C>(root: &str, callback: &mut C, visited: &mut TableSet) -> SearchResult<()>
where
    C: SearchCallback + ?Sized,
{
    visited.insert(root);
    debug!("visiting {} (seed)", root);
    let mut stack = vec![Frame {
        edges: callback.edges_from(root)?.into_iter(),
    }];

    while let Some(frame) = stack.last_mut() {
        let Some(edge) = frame.edges.next() else {
            stack.pop();
            continue;
        };

        let target = edge.target();
        if visited.contains(target) {
            continue;
        }
        if !callback.accepts(target)? {
            trace!("{} rejected via {}", target, edge);
            continue;
        }

        visited.insert(target);
        debug!("visiting {} via {}", target, edge);
        stack.push(Frame {
            edges: callback.edges_from(target)?.into_iter(),
        });
    }

    Ok(())
}
