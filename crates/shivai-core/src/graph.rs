//! Dependency graph over registered plugins.
//!
//! Nodes live in an arena indexed by registration order; edges are kept as
//! adjacency lists in both directions. Cycles are found with Tarjan's
//! strongly-connected components, load order with Kahn's algorithm.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

/// A dependency edge whose target is not registered.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MissingDependency {
    pub plugin: String,
    pub dependency: String,
}

#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    /// node -> nodes it depends on
    requires: Vec<Vec<usize>>,
    /// node -> nodes that depend on it
    required_by: Vec<Vec<usize>>,
    missing: Vec<MissingDependency>,
}

impl DependencyGraph {
    /// Build a graph from `(name, dependencies)` pairs in registration order.
    pub fn build<'a, I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a BTreeSet<String>)>,
    {
        let nodes: Vec<(&str, &BTreeSet<String>)> = nodes.into_iter().collect();
        let mut graph = DependencyGraph {
            names: Vec::with_capacity(nodes.len()),
            index: HashMap::with_capacity(nodes.len()),
            requires: vec![Vec::new(); nodes.len()],
            required_by: vec![Vec::new(); nodes.len()],
            missing: Vec::new(),
        };

        for (i, (name, _)) in nodes.iter().enumerate() {
            graph.names.push(name.to_string());
            graph.index.insert(name.to_string(), i);
        }

        for (i, (name, deps)) in nodes.iter().enumerate() {
            for dep in deps.iter() {
                match graph.index.get(dep.as_str()) {
                    Some(&j) => {
                        graph.requires[i].push(j);
                        graph.required_by[j].push(i);
                    }
                    None => graph.missing.push(MissingDependency {
                        plugin: name.to_string(),
                        dependency: dep.clone(),
                    }),
                }
            }
        }

        graph
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Dependencies that name no registered plugin.
    pub fn missing(&self) -> &[MissingDependency] {
        &self.missing
    }

    /// Every dependency cycle, each as the set of member names.
    ///
    /// Members are listed in registration order; cycles are ordered by their
    /// earliest member.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut tarjan = Tarjan::new(self.len());
        for v in 0..self.len() {
            if tarjan.index[v].is_none() {
                tarjan.visit(v, &self.requires);
            }
        }

        let mut cycles: Vec<Vec<usize>> = tarjan
            .components
            .into_iter()
            .filter(|c| c.len() > 1 || self.requires[c[0]].contains(&c[0]))
            .map(|mut c| {
                c.sort_unstable();
                c
            })
            .collect();
        cycles.sort_by_key(|c| c[0]);

        cycles
            .into_iter()
            .map(|c| c.into_iter().map(|i| self.names[i].clone()).collect())
            .collect()
    }

    /// Load order: every plugin after all of its dependencies.
    ///
    /// Ties go to the earlier registration. Cycle members and anything that
    /// transitively depends on them are left out.
    pub fn topological_order(&self) -> Vec<String> {
        let blocked: HashSet<usize> = self
            .cycles()
            .iter()
            .flatten()
            .filter_map(|name| self.index.get(name).copied())
            .collect();

        let mut in_degree: Vec<usize> = self.requires.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<usize>> = (0..self.len())
            .filter(|&v| in_degree[v] == 0 && !blocked.contains(&v))
            .map(Reverse)
            .collect();

        let mut order = Vec::with_capacity(self.len());
        while let Some(Reverse(v)) = ready.pop() {
            order.push(self.names[v].clone());
            for &dependent in &self.required_by[v] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 && !blocked.contains(&dependent) {
                    ready.push(Reverse(dependent));
                }
            }
        }
        order
    }

    /// Plugins that depend on `name`, directly or transitively, ordered so
    /// that each one comes before the plugins it depends on.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        let Some(&start) = self.index.get(name) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(v) = stack.pop() {
            for &d in &self.required_by[v] {
                if d != start && seen.insert(d) {
                    stack.push(d);
                }
            }
        }

        let position: HashMap<String, usize> = self
            .topological_order()
            .into_iter()
            .enumerate()
            .map(|(i, n)| (n, i))
            .collect();
        let mut dependents: Vec<usize> = seen.into_iter().collect();
        dependents.sort_by_key(|&v| {
            Reverse((position.get(&self.names[v]).copied().unwrap_or(usize::MAX), v))
        });
        dependents.into_iter().map(|v| self.names[v].clone()).collect()
    }

    /// Direct dependencies of `name` that are registered.
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.index
            .get(name)
            .map(|&v| self.requires[v].iter().map(|&d| self.names[d].clone()).collect())
            .unwrap_or_default()
    }
}

struct Tarjan {
    counter: usize,
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    components: Vec<Vec<usize>>,
}

impl Tarjan {
    fn new(n: usize) -> Self {
        Self {
            counter: 0,
            index: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            components: Vec::new(),
        }
    }

    // Iterative to keep deep chains off the call stack.
    fn visit(&mut self, root: usize, edges: &[Vec<usize>]) {
        let mut work: Vec<(usize, usize)> = vec![(root, 0)];
        self.open(root);

        while let Some(&(v, next)) = work.last() {
            if let Some(&w) = edges[v].get(next) {
                if let Some(top) = work.last_mut() {
                    top.1 += 1;
                }
                match self.index[w] {
                    None => {
                        self.open(w);
                        work.push((w, 0));
                    }
                    Some(w_index) if self.on_stack[w] => {
                        self.lowlink[v] = self.lowlink[v].min(w_index);
                    }
                    Some(_) => {}
                }
                continue;
            }

            work.pop();
            if let Some(&(parent, _)) = work.last() {
                self.lowlink[parent] = self.lowlink[parent].min(self.lowlink[v]);
            }
            if Some(self.lowlink[v]) == self.index[v] {
                let mut component = Vec::new();
                while let Some(w) = self.stack.pop() {
                    self.on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                self.components.push(component);
            }
        }
    }

    fn open(&mut self, v: usize) {
        self.index[v] = Some(self.counter);
        self.lowlink[v] = self.counter;
        self.counter += 1;
        self.stack.push(v);
        self.on_stack[v] = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn graph(spec: &[(&str, &[&str])]) -> DependencyGraph {
        let owned: Vec<(String, BTreeSet<String>)> = spec
            .iter()
            .map(|(n, d)| (n.to_string(), deps(d)))
            .collect();
        DependencyGraph::build(owned.iter().map(|(n, d)| (n.as_str(), d)))
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn test_order_respects_every_edge() {
        let g = graph(&[
            ("ui", &["core", "speech"]),
            ("speech", &["core"]),
            ("core", &[]),
            ("notes", &["storage"]),
            ("storage", &["core"]),
        ]);
        let order = g.topological_order();
        assert_eq!(order.len(), 5);
        for (plugin, requires) in [
            ("ui", "core"),
            ("ui", "speech"),
            ("speech", "core"),
            ("notes", "storage"),
            ("storage", "core"),
        ] {
            assert!(position(&order, requires) < position(&order, plugin));
        }
    }

    #[test]
    fn test_ties_follow_registration_order() {
        let g = graph(&[("b", &[]), ("a", &[]), ("c", &[])]);
        assert_eq!(g.topological_order(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_cycle_detected_and_isolated() {
        let g = graph(&[
            ("a", &["b"]),
            ("b", &["c"]),
            ("c", &["a"]),
            ("d", &[]),
            ("e", &["a"]),
        ]);
        assert_eq!(g.cycles(), vec![vec!["a", "b", "c"]]);
        assert_eq!(g.topological_order(), vec!["d"]);
    }

    #[test]
    fn test_two_separate_cycles() {
        let g = graph(&[("x", &["y"]), ("y", &["x"]), ("p", &["q"]), ("q", &["p"])]);
        let cycles = g.cycles();
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0], vec!["x", "y"]);
        assert_eq!(cycles[1], vec!["p", "q"]);
    }

    #[test]
    fn test_missing_dependency_reported() {
        let g = graph(&[("camera", &["drivers"])]);
        assert_eq!(
            g.missing(),
            &[MissingDependency {
                plugin: "camera".into(),
                dependency: "drivers".into()
            }]
        );
        assert_eq!(g.topological_order(), vec!["camera"]);
    }

    #[test]
    fn test_dependents_listed_deepest_first() {
        let g = graph(&[
            ("core", &[]),
            ("speech", &["core"]),
            ("ui", &["speech"]),
            ("other", &[]),
        ]);
        assert_eq!(g.dependents_of("core"), vec!["ui", "speech"]);
        assert!(g.dependents_of("other").is_empty());
        assert!(g.dependents_of("missing").is_empty());
        assert_eq!(g.dependencies_of("ui"), vec!["speech"]);
    }

    #[test]
    fn test_long_chain() {
        let names: Vec<String> = (0..500).map(|i| format!("p{}", i)).collect();
        let owned: Vec<(String, BTreeSet<String>)> = names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let deps = if i == 0 {
                    BTreeSet::new()
                } else {
                    deps(&[names[i - 1].as_str()])
                };
                (n.clone(), deps)
            })
            .collect();
        let g = DependencyGraph::build(owned.iter().map(|(n, d)| (n.as_str(), d)));
        assert!(g.cycles().is_empty());
        assert_eq!(g.topological_order(), names);
    }
}
