//! # Install-time cycle detection.
//!
//! The registry is acyclic at all times. Before a manifold is accepted, a
//! depth-first search walks from each of the new node's inputs through the
//! existing edges; reaching the new node again closes a cycle.
//!
//! Edges may point at names that are not installed yet (forward references):
//! such nodes simply have no outgoing edges.

use std::collections::HashSet;

use crate::error::InstallError;

/// Rejects `name` if its `inputs` would close a cycle.
///
/// `inputs_of` looks up the declared inputs of an already installed manifold.
/// The reported cycle starts and ends with `name`; `member` is the input of
/// `name` through which the cycle runs (`name` itself for a self-loop).
pub(crate) fn check_acyclic<'g, F>(
    name: &str,
    inputs: &[String],
    inputs_of: F,
) -> Result<(), InstallError>
where
    F: Fn(&str) -> Option<&'g [String]>,
{
    let mut seen = HashSet::new();
    for input in inputs {
        let mut path = vec![name.to_string()];
        if reaches(&inputs_of, name, input, &mut path, &mut seen) {
            return Err(InstallError::CycleDetected {
                name: name.to_string(),
                member: input.clone(),
                cycle: path,
            });
        }
    }
    Ok(())
}

fn reaches<'g, F>(
    inputs_of: &F,
    target: &str,
    node: &str,
    path: &mut Vec<String>,
    seen: &mut HashSet<String>,
) -> bool
where
    F: Fn(&str) -> Option<&'g [String]>,
{
    path.push(node.to_string());
    if node == target {
        return true;
    }
    if seen.insert(node.to_string()) {
        for next in inputs_of(node).unwrap_or_default() {
            if reaches(inputs_of, target, next, path, seen) {
                return true;
            }
        }
    }
    path.pop();
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn graph(edges: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        edges
            .iter()
            .map(|(n, ins)| (n.to_string(), ins.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    fn check(g: &HashMap<String, Vec<String>>, name: &str, inputs: &[&str]) -> Result<(), InstallError> {
        let inputs: Vec<String> = inputs.iter().map(|s| s.to_string()).collect();
        check_acyclic(name, &inputs, |n| g.get(n).map(Vec::as_slice))
    }

    #[test]
    fn acyclic_and_forward_references_pass() {
        let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["a", "b", "later"])]);
        assert!(check(&g, "d", &["c", "b", "nowhere"]).is_ok());
    }

    #[test]
    fn closing_edge_reports_the_cycle() {
        // a -> b -> c, and c is pending on d; installing d with input a closes it.
        let g = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &["d"])]);
        let err = check(&g, "d", &["a"]).unwrap_err();
        assert_eq!(
            err,
            InstallError::CycleDetected {
                name: "d".into(),
                member: "a".into(),
                cycle: vec!["d".into(), "a".into(), "b".into(), "c".into(), "d".into()],
            }
        );
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let g = graph(&[]);
        let err = check(&g, "a", &["a"]).unwrap_err();
        match err {
            InstallError::CycleDetected { member, cycle, .. } => {
                assert_eq!(member, "a");
                assert_eq!(cycle, vec!["a".to_string(), "a".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["a"])]);
        assert!(check(&g, "d", &["b", "c"]).is_ok());
    }
}
