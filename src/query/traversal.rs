//! Compiling a parsed [`Traversal`] into a plan and walking it over a store.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::mpsc;

use crate::model::Direction;
use crate::query::parser::{Arg, Call, Traversal};
use crate::query::QueryError;
use crate::store::QuadStore;

/// Upper bound on start vertices when `V()` is called without ids.
pub const MAX_START_VERTICES: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub enum Start {
    All,
    Vertices(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Follow quads away from (`Subject`) or towards (`Object`) the current
    /// vertex; `None` predicates means any predicate.
    Walk {
        from: Vec<Direction>,
        predicates: Option<Vec<String>>,
        tags: Vec<String>,
    },
    Has { predicate: String, object: String },
    Is(Vec<String>),
    Tag(Vec<String>),
    Unique,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub start: Start,
    pub steps: Vec<Step>,
    pub limit: Option<usize>,
}

fn strings(call: &Call, arg: &Arg) -> Result<Vec<String>, QueryError> {
    match arg {
        Arg::Str(s) => Ok(vec![s.clone()]),
        Arg::List(items) => Ok(items.clone()),
        Arg::Null => Ok(Vec::new()),
        other => Err(QueryError::Execution(format!(
            "{}() expects strings, got {}",
            call.name, other
        ))),
    }
}

fn all_strings(call: &Call) -> Result<Vec<String>, QueryError> {
    let mut out = Vec::new();
    for arg in &call.args {
        out.extend(strings(call, arg)?);
    }
    Ok(out)
}

fn arity(call: &Call, max: usize) -> Result<(), QueryError> {
    if call.args.len() > max {
        return Err(QueryError::Execution(format!(
            "{}() takes at most {} argument(s), got {}",
            call.name,
            max,
            call.args.len()
        )));
    }
    Ok(())
}

fn walk(call: &Call, from: Vec<Direction>) -> Result<Step, QueryError> {
    arity(call, 2)?;
    let predicates = match call.args.first() {
        None | Some(Arg::Null) => None,
        Some(arg) => Some(strings(call, arg)?),
    };
    let tags = match call.args.get(1) {
        None => Vec::new(),
        Some(arg) => strings(call, arg)?,
    };
    Ok(Step::Walk {
        from,
        predicates,
        tags,
    })
}

impl Traversal {
    /// Resolve step names and arguments. Every problem found here is an
    /// execution error, not a parse error.
    pub fn compile(&self) -> Result<Plan, QueryError> {
        let ids = all_strings(&self.root)?;
        let start = if ids.is_empty() {
            Start::All
        } else {
            Start::Vertices(ids)
        };

        let mut steps = Vec::new();
        let mut limit = None;
        let mut terminated = false;

        for call in &self.calls {
            if terminated {
                return Err(QueryError::Execution(format!(
                    "{}() cannot follow a terminal step",
                    call.name
                )));
            }
            match call.name.as_str() {
                "Out" => steps.push(walk(call, vec![Direction::Subject])?),
                "In" => steps.push(walk(call, vec![Direction::Object])?),
                "Both" => steps.push(walk(call, vec![Direction::Subject, Direction::Object])?),
                "Has" => match call.args.as_slice() {
                    [Arg::Str(predicate), Arg::Str(object)] => steps.push(Step::Has {
                        predicate: predicate.clone(),
                        object: object.clone(),
                    }),
                    _ => {
                        return Err(QueryError::Execution(
                            "Has() expects a predicate and an object string".to_string(),
                        ))
                    }
                },
                "Is" => steps.push(Step::Is(all_strings(call)?)),
                "Tag" | "As" => {
                    let names = all_strings(call)?;
                    if names.is_empty() {
                        return Err(QueryError::Execution(format!(
                            "{}() needs at least one tag name",
                            call.name
                        )));
                    }
                    steps.push(Step::Tag(names));
                }
                "Unique" => {
                    arity(call, 0)?;
                    steps.push(Step::Unique);
                }
                "All" => {
                    arity(call, 0)?;
                    terminated = true;
                }
                "GetLimit" => match call.args.as_slice() {
                    [Arg::Num(n)] if *n >= 0.0 && n.fract() == 0.0 => {
                        limit = Some(*n as usize);
                        terminated = true;
                    }
                    _ => {
                        return Err(QueryError::Execution(
                            "GetLimit() expects a non-negative integer".to_string(),
                        ))
                    }
                },
                other => {
                    return Err(QueryError::Execution(format!("unknown step {other}()")));
                }
            }
        }

        if !terminated {
            return Err(QueryError::Execution(
                "query has no terminal step; end it with .All() or .GetLimit(n)".to_string(),
            ));
        }

        Ok(Plan {
            start,
            steps,
            limit,
        })
    }
}

#[derive(Debug, Clone)]
struct Path {
    vertex: String,
    tags: BTreeMap<String, String>,
}

impl Path {
    fn binding(&self) -> Value {
        let mut object = Map::new();
        for (tag, value) in &self.tags {
            object.insert(tag.clone(), Value::String(value.clone()));
        }
        object.insert("id".to_string(), Value::String(self.vertex.clone()));
        Value::Object(object)
    }
}

impl Plan {
    /// Walk the plan depth-first, sending one binding per finished path.
    ///
    /// Stops after `cap` items (or the plan's own limit if smaller), or as
    /// soon as the receiver goes away. Returns how many items were sent.
    pub async fn execute(
        &self,
        store: &dyn QuadStore,
        tx: &mpsc::Sender<Value>,
        cap: usize,
    ) -> Result<usize, QueryError> {
        let cap = self.limit.map_or(cap, |limit| limit.min(cap));
        if cap == 0 {
            return Ok(0);
        }

        let roots = match &self.start {
            Start::All => store.vertices(MAX_START_VERTICES).await?,
            Start::Vertices(ids) => {
                let mut present = Vec::with_capacity(ids.len());
                for id in ids {
                    if store.contains_vertex(id).await? {
                        present.push(id.clone());
                    }
                }
                present
            }
        };

        let mut stack: Vec<(usize, Path)> = roots
            .into_iter()
            .rev()
            .map(|vertex| {
                (
                    0,
                    Path {
                        vertex,
                        tags: BTreeMap::new(),
                    },
                )
            })
            .collect();
        let mut seen: Vec<HashSet<String>> = vec![HashSet::new(); self.steps.len()];
        let mut sent = 0;

        while let Some((depth, path)) = stack.pop() {
            let Some(step) = self.steps.get(depth) else {
                if tx.send(path.binding()).await.is_err() {
                    log::debug!("Result receiver dropped after {} items", sent);
                    break;
                }
                sent += 1;
                if sent >= cap {
                    break;
                }
                continue;
            };

            let children = advance(step, path, store, &mut seen[depth]).await?;
            stack.extend(children.into_iter().rev().map(|child| (depth + 1, child)));
        }

        Ok(sent)
    }
}

async fn advance(
    step: &Step,
    path: Path,
    store: &dyn QuadStore,
    seen: &mut HashSet<String>,
) -> Result<Vec<Path>, QueryError> {
    match step {
        Step::Walk {
            from,
            predicates,
            tags,
        } => {
            let mut children = Vec::new();
            for &direction in from {
                for quad in store.quads_at(direction, &path.vertex).await? {
                    if let Some(allowed) = predicates {
                        if !allowed.contains(&quad.predicate) {
                            continue;
                        }
                    }
                    let mut child = Path {
                        vertex: quad.get(direction.reverse()).to_string(),
                        tags: path.tags.clone(),
                    };
                    for tag in tags {
                        child.tags.insert(tag.clone(), quad.predicate.clone());
                    }
                    children.push(child);
                }
            }
            Ok(children)
        }
        Step::Has { predicate, object } => {
            let matched = store
                .quads_at(Direction::Subject, &path.vertex)
                .await?
                .iter()
                .any(|q| &q.predicate == predicate && &q.object == object);
            Ok(if matched { vec![path] } else { Vec::new() })
        }
        Step::Is(vertices) => Ok(if vertices.contains(&path.vertex) {
            vec![path]
        } else {
            Vec::new()
        }),
        Step::Tag(names) => {
            let mut path = path;
            for name in names {
                path.tags.insert(name.clone(), path.vertex.clone());
            }
            Ok(vec![path])
        }
        Step::Unique => Ok(if seen.insert(path.vertex.clone()) {
            vec![path]
        } else {
            Vec::new()
        }),
    }
}
