use anyhow::{anyhow, Result};
use lae_core::Matrix2D;
use lae_engine::{parse_graph, LinearAlgebraEngine, RunOutcome};
use serde::Serialize;

/// Document written to the output file.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OutputDocument {
    Result(Matrix2D),
    Error(String),
}

impl OutputDocument {
    pub fn is_error(&self) -> bool {
        matches!(self, OutputDocument::Error(_))
    }
}

impl From<Result<Matrix2D>> for OutputDocument {
    fn from(result: Result<Matrix2D>) -> Self {
        match result {
            Ok(m) => OutputDocument::Result(m),
            Err(e) => OutputDocument::Error(format!("{:#}", e)),
        }
    }
}

/// Parse `json` as a graph and resolve its root.
pub fn evaluate(engine: &mut LinearAlgebraEngine, json: &str) -> Result<Matrix2D> {
    let (mut graph, root) = parse_graph(json)?;
    match engine.run(&mut graph, root)? {
        RunOutcome::Resolved(m) => Ok(m),
        RunOutcome::Stuck { pending } => Err(anyhow!(
            "graph is stuck with {} unresolved operations",
            pending.len()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_and_error_documents() {
        let ok = OutputDocument::Result(vec![vec![1.0, 2.5]]);
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"result":[[1.0,2.5]]}"#);

        let err = OutputDocument::Error("Unknown operator: /".into());
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#"{"error":"Unknown operator: /"}"#
        );
        assert!(err.is_error());
    }

    #[test]
    fn evaluates_json_graphs() {
        let mut engine = LinearAlgebraEngine::new(2).unwrap();
        let out = evaluate(
            &mut engine,
            r#"{"operator": "T", "operands": [[[1, 2], [3, 4]]]}"#,
        )
        .unwrap();
        assert_eq!(out, vec![vec![1.0, 3.0], vec![2.0, 4.0]]);
    }

    #[test]
    fn parse_errors_become_error_documents() {
        let mut engine = LinearAlgebraEngine::new(1).unwrap();
        let doc = OutputDocument::from(evaluate(
            &mut engine,
            r#"{"operator": "^", "operands": [[[1]]]}"#,
        ));
        assert_eq!(doc, OutputDocument::Error("Unknown operator: ^".into()));
    }
}
