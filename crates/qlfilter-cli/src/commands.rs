//! Module: commands
//! Responsibility: run one parsed CLI command against the configured schema.
//! Does not own: argument parsing or entity decoding.
//! Boundary: prints results to stdout; errors bubble to `main`.

use crate::{
    cli::{Cli, Command},
    entities,
    error::CliError,
};
use qlfilter::prelude::*;
use serde::Serialize;
use serde_json::Value as Json;
use std::path::Path;

pub fn run(cli: &Cli) -> Result<(), CliError> {
    let support = FilterSupport::load(&cli.config)?;
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    match &cli.command {
        Command::Fields { kind } => fields(&support, kind.as_deref()),
        Command::Parse { filter } => {
            println!("{}", support.parse(filter)?);
            Ok(())
        }
        Command::Compile { kind, filter } => {
            known_kind(&support, kind)?;
            println!("{}", support.compile(kind, filter)?);
            Ok(())
        }
        Command::Jpql { kind, filter, json } => {
            known_kind(&support, kind)?;
            let query = support.to_jpql(kind, filter)?;
            print_query(&query, *json)
        }
        Command::Match {
            kind,
            filter,
            entities,
            direct,
        } => select(&support, kind, filter, entities, *direct),
    }
}

fn known_kind(support: &FilterSupport, kind: &str) -> Result<(), CliError> {
    match support.registry().kind(kind) {
        Some(_) => Ok(()),
        None => Err(CliError::UnknownKind(kind.to_string())),
    }
}

// ============================================================================
// Output
// ============================================================================

fn fields(support: &FilterSupport, kind: Option<&str>) -> Result<(), CliError> {
    let kinds: Vec<String> = match kind {
        Some(kind) => {
            known_kind(support, kind)?;
            vec![kind.to_string()]
        }
        None => support
            .registry()
            .kinds()
            .map(|kind| kind.name().to_string())
            .collect(),
    };

    for kind in kinds {
        println!("{kind}:");
        for field in support.expected_fields(&kind) {
            println!("  {field}");
        }
    }

    Ok(())
}

///
/// QueryOutput
///
/// JSON shape of a rendered query; parameters keep their scalar type.
///

#[derive(Serialize)]
struct QueryOutput<'a> {
    query: &'a str,
    parameters: Vec<Json>,
}

fn print_query(query: &JpqlQuery, json: bool) -> Result<(), CliError> {
    if json {
        let output = QueryOutput {
            query: &query.text,
            parameters: query.parameters.iter().map(parameter).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", query.text);
    for (index, value) in query.parameters.iter().enumerate() {
        println!("  ?{} = {value}", index + 1);
    }

    Ok(())
}

fn parameter(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Text(text) | Value::Symbol(text) => Json::String(text.clone()),
        Value::Integer(number) => Json::from(*number),
        Value::Bool(flag) => Json::Bool(*flag),
    }
}

// ============================================================================
// Evaluation
// ============================================================================

fn select(
    support: &FilterSupport,
    kind: &str,
    filter: &str,
    path: &Path,
    direct: bool,
) -> Result<(), CliError> {
    known_kind(support, kind)?;
    let (documents, dataset) = entities::load(support.registry(), kind, path)?;

    let selected = if direct {
        let node = support.parse(filter)?;
        support.matcher(kind).filter(&node, &dataset)?
    } else {
        support.filter(kind, filter, &dataset)?
    };
    tracing::debug!(total = dataset.len(), selected = selected.len(), direct, "filter evaluated");

    let output: Vec<&Json> = dataset
        .iter()
        .zip(&documents)
        .filter(|(entity, _)| selected.iter().any(|chosen| std::ptr::eq(*chosen, *entity)))
        .map(|(_, document)| document)
        .collect();
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
